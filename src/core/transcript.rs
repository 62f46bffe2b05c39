/// Output transcripts — RON-serialized output histories.
///
/// A transcript lists produced nodes in order. Hook tags with the same
/// `(name, activation)` pair refer to one hook activation:
///
/// ```ron
/// [
///     Text(text: "You stand before "),
///     Text(text: "a heavy oak door.", hooks: [(name: "door")]),
///     LineBreak,
///     Link(label: "Knock", then: Some("Nobody answers.")),
/// ]
/// ```
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::story::Story;
use crate::core::style::{Style, StyleEntry};
use crate::schema::hook::Hook;
use crate::schema::output::{fragment, Fragment, OutputNode};

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A hook tag on a transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookTag {
    pub name: String,
    /// Distinguishes separate activations of the same name.
    #[serde(default)]
    pub activation: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TranscriptEntry {
    Text {
        text: String,
        #[serde(default)]
        hooks: Vec<HookTag>,
    },
    Link {
        label: String,
        /// Text emitted when the link is activated.
        #[serde(default)]
        then: Option<String>,
        #[serde(default)]
        hooks: Vec<HookTag>,
    },
    LineBreak,
}

/// A recorded output history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    pub entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Load a transcript from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Transcript, TranscriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a transcript from a RON string.
    pub fn parse_ron(input: &str) -> Result<Transcript, TranscriptError> {
        Ok(ron::from_str(input)?)
    }

    /// Append this transcript's nodes to `story`'s output history, opening
    /// one hook activation per distinct hook tag.
    pub fn replay_into(&self, story: &Story) {
        let cx = story.context();
        let mut activations: FxHashMap<HookTag, Hook> = FxHashMap::default();

        let mut style_for = |tags: &[HookTag]| {
            let entries = tags
                .iter()
                .map(|tag| {
                    let hook = activations
                        .entry(tag.clone())
                        .or_insert_with(|| cx.hook(&tag.name))
                        .clone();
                    StyleEntry::hook(hook)
                })
                .collect();
            Style::from_entries(entries)
        };

        for entry in &self.entries {
            let node = match entry {
                TranscriptEntry::Text { text, hooks } => OutputNode::text(text.clone(), style_for(hooks)),
                TranscriptEntry::Link { label, then, hooks } => {
                    OutputNode::link(label.clone(), link_action(story, then.clone()), style_for(hooks))
                }
                TranscriptEntry::LineBreak => OutputNode::line_break(Style::default()),
            };
            story.record(node);
        }

        tracing::debug!(
            entries = self.entries.len(),
            hooks = activations.len(),
            "replayed transcript"
        );
    }
}

fn link_action(story: &Story, then: Option<String>) -> Fragment {
    let cx = story.context().clone();
    fragment(move || then.iter().map(|text| cx.text(text.clone())).collect::<Vec<_>>())
}
