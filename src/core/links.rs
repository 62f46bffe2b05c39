/// Link materialization — rewrites the active enchantment's region into links.
use regex::Regex;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::core::style::{StyleScope, StyleStack};
use crate::schema::enchantment::{Enchantment, ReferenceType};
use crate::schema::output::{Fragment, OutputKind, OutputNode, Thread};

/// A piece of text split at pattern boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text between matches.
    Gap(&'a str),
    /// Text covered by one match.
    Match(&'a str),
}

/// Split `content` into gaps and matches, left to right. Empty gaps are
/// omitted; concatenating every segment reproduces `content`.
pub fn split_occurrences<'a>(content: &'a str, pattern: &Regex) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut start = 0;
    for m in pattern.find_iter(content) {
        if m.start() > start {
            segments.push(Segment::Gap(&content[start..m.start()]));
        }
        segments.push(Segment::Match(m.as_str()));
        start = m.end();
    }
    if start < content.len() {
        segments.push(Segment::Gap(&content[start..]));
    }
    segments
}

/// Rewrite the region of the most recently pushed enchantment into links
/// that run `link_action`.
///
/// Meant to be invoked inside a fragment replayed by
/// [`execute`](crate::core::executor::execute). Each affected text node is
/// processed under its own original style, so the links inherit whatever
/// styling the text had. Text references become links at each match with
/// the surrounding text kept as text; hook references become one link per
/// node labelled with the node's full text. Non-text nodes are dropped.
pub fn materialize_links(style: &StyleStack, link_action: Fragment) -> Thread {
    let enchantment = style.last_enchantment();
    if enchantment.is_none() {
        tracing::debug!("no active enchantment, nothing to materialize");
    }
    Box::new(MaterializeLinks {
        pending: VecDeque::new(),
        scope: None,
        style: style.clone(),
        enchantment,
        next_affected: 0,
        link_action,
    })
}

struct MaterializeLinks {
    pending: VecDeque<OutputNode>,
    // Held while `pending` drains so the nodes are emitted under it.
    scope: Option<StyleScope>,
    style: StyleStack,
    enchantment: Option<Rc<Enchantment>>,
    next_affected: usize,
    link_action: Fragment,
}

impl MaterializeLinks {
    fn materialize(&mut self, enchantment: &Enchantment, content: &str) {
        let style = self.style.snapshot();
        match (enchantment.reference_type, &enchantment.occurrences) {
            (ReferenceType::Text, Some(pattern)) => {
                for segment in split_occurrences(content, pattern) {
                    let node = match segment {
                        Segment::Gap(text) => OutputNode::text(text, style.clone()),
                        Segment::Match(text) => {
                            OutputNode::link(text, Rc::clone(&self.link_action), style.clone())
                        }
                    };
                    self.pending.push_back(node);
                }
            }
            _ => {
                self.pending
                    .push_back(OutputNode::link(content, Rc::clone(&self.link_action), style));
            }
        }
    }
}

impl Iterator for MaterializeLinks {
    type Item = OutputNode;

    fn next(&mut self) -> Option<OutputNode> {
        loop {
            if let Some(node) = self.pending.pop_front() {
                return Some(node);
            }
            self.scope = None;

            let enchantment = Rc::clone(self.enchantment.as_ref()?);
            let affected = enchantment.affected.get(self.next_affected)?;
            self.next_affected += 1;

            let OutputKind::Text(content) = affected.kind() else {
                tracing::trace!(kind = ?affected.kind(), "skipping non-text node");
                continue;
            };

            self.scope = Some(self.style.apply_all(affected.style()));
            self.materialize(&enchantment, content);
        }
    }
}
