/// Story execution context — style stack, hook activations and output history.
///
/// `StoryContext` is what fragments capture: it holds no history, so
/// closures stored inside recorded nodes never keep the history alive.
/// `Story` adds the append-only output history and the driver that pulls
/// threads into it.
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::style::{ScopedThread, StyleEntry, StyleStack};
use crate::core::transcript::{Transcript, TranscriptError};
use crate::schema::hook::{Hook, HookRegistry};
use crate::schema::output::{Fragment, OutputKind, OutputNode, Thread};

/// Per-execution runtime state shared by every fragment of one story.
#[derive(Debug, Clone, Default)]
pub struct StoryContext {
    style: StyleStack,
    hooks: Rc<RefCell<HookRegistry>>,
    // Label only: the action closure usually captures this context.
    link_in_action: Rc<RefCell<Option<String>>>,
}

impl StoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style(&self) -> &StyleStack {
        &self.style
    }

    /// Open a fresh activation of the hook `name`.
    pub fn hook(&self, name: &str) -> Hook {
        self.hooks.borrow_mut().activate(name)
    }

    pub fn hook_activations(&self, name: &str) -> u32 {
        self.hooks.borrow().activation_count(name)
    }

    /// Label of the link whose action is currently running, if any.
    pub fn link_in_action(&self) -> Option<String> {
        self.link_in_action.borrow().clone()
    }

    pub fn text(&self, content: impl Into<String>) -> OutputNode {
        OutputNode::text(content, self.style.snapshot())
    }

    pub fn link(&self, label: impl Into<String>, action: Fragment) -> OutputNode {
        OutputNode::link(label, action, self.style.snapshot())
    }

    pub fn embed(&self, generator: Fragment) -> OutputNode {
        OutputNode::embed(generator, self.style.snapshot())
    }

    pub fn line_break(&self) -> OutputNode {
        OutputNode::line_break(self.style.snapshot())
    }

    /// Replay `fragment` inside a fresh activation of the hook `name`.
    /// The activation is opened when the returned thread is first pulled.
    pub fn hooked(&self, name: &str, fragment: Fragment) -> Thread {
        let cx = self.clone();
        let name = name.to_string();
        Box::new(
            std::iter::once_with(move || {
                let hook = cx.hook(&name);
                ScopedThread::new(&cx.style, StyleEntry::hook(hook), fragment)
            })
            .flatten(),
        )
    }

    /// Mark `label` as the link in action and return the label it replaced.
    fn replace_link_in_action(&self, label: Option<String>) -> Option<String> {
        std::mem::replace(&mut *self.link_in_action.borrow_mut(), label)
    }
}

/// A link's action thread. The link stays marked as in action until the
/// thread runs dry or is dropped, then the previous mark is restored.
struct LinkActionThread {
    inner: Thread,
    cx: StoryContext,
    previous: Option<Option<String>>,
}

impl LinkActionThread {
    fn release(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.cx.replace_link_in_action(previous);
        }
    }
}

impl Iterator for LinkActionThread {
    type Item = OutputNode;

    fn next(&mut self) -> Option<OutputNode> {
        let node = self.inner.next();
        if node.is_none() {
            self.release();
        }
        node
    }
}

impl Drop for LinkActionThread {
    fn drop(&mut self) {
        self.release();
    }
}

/// A running story: its context plus the output history produced so far.
#[derive(Debug, Clone, Default)]
pub struct Story {
    cx: StoryContext,
    output: Rc<RefCell<Vec<OutputNode>>>,
}

impl Story {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> StoryBuilder {
        StoryBuilder {
            transcript_path: None,
            transcript: None,
        }
    }

    pub fn context(&self) -> &StoryContext {
        &self.cx
    }

    pub fn style(&self) -> &StyleStack {
        self.cx.style()
    }

    /// Run `f` against the output history as it stands right now.
    pub fn with_output<R>(&self, f: impl FnOnce(&[OutputNode]) -> R) -> R {
        f(&self.output.borrow())
    }

    pub fn output(&self) -> Vec<OutputNode> {
        self.output.borrow().clone()
    }

    pub fn output_len(&self) -> usize {
        self.output.borrow().len()
    }

    /// Pull `thread` to completion, expanding embedded fragments in place,
    /// and append every produced node to the history. Returns the number of
    /// nodes recorded.
    ///
    /// Embedded fragments are invoked while their parent threads are still
    /// alive, so any scope a parent holds stays open for the nested output.
    pub fn run(&self, thread: Thread) -> usize {
        let mut stack: Vec<Thread> = vec![thread];
        let mut recorded = 0;
        while let Some(top) = stack.last_mut() {
            match top.next() {
                None => {
                    stack.pop();
                }
                Some(node) => {
                    let generator = match node.kind() {
                        OutputKind::EmbedFragment(generator) => Some(Rc::clone(generator)),
                        _ => None,
                    };
                    match generator {
                        Some(generator) => stack.push(generator()),
                        None => {
                            self.record(node);
                            recorded += 1;
                        }
                    }
                }
            }
        }
        recorded
    }

    /// Run a single node, expanding it if it is a fragment.
    pub fn emit(&self, node: OutputNode) -> usize {
        self.run(Box::new(std::iter::once(node)))
    }

    /// Mark `node` as the link being activated and return its action thread.
    /// Returns `None` when `node` is not a link.
    ///
    /// The mark lasts while the returned thread is alive and not exhausted.
    pub fn activate_link(&self, node: &OutputNode) -> Option<Thread> {
        let link = node.as_link()?;
        tracing::debug!(label = %link.label, "activating link");
        let previous = self.cx.replace_link_in_action(Some(link.label.clone()));
        Some(Box::new(LinkActionThread {
            inner: (link.action)(),
            cx: self.cx.clone(),
            previous: Some(previous),
        }))
    }

    pub(crate) fn record(&self, node: OutputNode) {
        self.output.borrow_mut().push(node);
    }
}

/// Builder for constructing a `Story` with a pre-recorded output history.
pub struct StoryBuilder {
    transcript_path: Option<PathBuf>,
    /// Directly provided transcript (for testing without files).
    transcript: Option<Transcript>,
}

impl StoryBuilder {
    /// Load the output history from a RON transcript file at build time.
    pub fn transcript(mut self, path: impl AsRef<Path>) -> Self {
        self.transcript_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide a transcript directly (for testing without files).
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn build(self) -> Result<Story, TranscriptError> {
        let story = Story::new();

        if let Some(transcript) = &self.transcript {
            transcript.replay_into(&story);
        }

        // File transcripts continue after any directly provided one
        if let Some(path) = &self.transcript_path {
            let transcript = Transcript::load_from_ron(path)?;
            transcript.replay_into(&story);
        }

        Ok(story)
    }
}
