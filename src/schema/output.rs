/// Output node model — rendered story content and the lazy threads that produce it.
use std::fmt;
use std::rc::Rc;

use super::hook::Hook;
use crate::core::style::Style;

/// A lazy, single-pass sequence of output nodes.
pub type Thread = Box<dyn Iterator<Item = OutputNode>>;

/// A zero-argument computation producing a fresh thread each time it is called.
pub type Fragment = Rc<dyn Fn() -> Thread>;

/// Wrap a closure returning any node sequence into a [`Fragment`].
pub fn fragment<F, I>(f: F) -> Fragment
where
    F: Fn() -> I + 'static,
    I: IntoIterator<Item = OutputNode>,
    I::IntoIter: 'static,
{
    Rc::new(move || Box::new(f().into_iter()) as Thread)
}

/// An interactive node: a label and the fragment run when it is activated.
#[derive(Clone)]
pub struct Link {
    pub label: String,
    pub action: Fragment,
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").field("label", &self.label).finish_non_exhaustive()
    }
}

/// What a node renders as.
#[derive(Clone)]
pub enum OutputKind {
    Text(String),
    Link(Link),
    /// A nested fragment, expanded in place by the story driver.
    EmbedFragment(Fragment),
    LineBreak,
}

impl fmt::Debug for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(content) => f.debug_tuple("Text").field(content).finish(),
            Self::Link(link) => fmt::Debug::fmt(link, f),
            Self::EmbedFragment(_) => f.write_str("EmbedFragment"),
            Self::LineBreak => f.write_str("LineBreak"),
        }
    }
}

/// A single piece of produced output together with the style entries
/// that were visible when it was produced.
#[derive(Debug, Clone)]
pub struct OutputNode {
    kind: OutputKind,
    style: Style,
}

impl OutputNode {
    pub fn new(kind: OutputKind, style: Style) -> Self {
        Self { kind, style }
    }

    pub fn text(content: impl Into<String>, style: Style) -> Self {
        Self::new(OutputKind::Text(content.into()), style)
    }

    pub fn link(label: impl Into<String>, action: Fragment, style: Style) -> Self {
        Self::new(
            OutputKind::Link(Link {
                label: label.into(),
                action,
            }),
            style,
        )
    }

    pub fn embed(generator: Fragment, style: Style) -> Self {
        Self::new(OutputKind::EmbedFragment(generator), style)
    }

    pub fn line_break(style: Style) -> Self {
        Self::new(OutputKind::LineBreak, style)
    }

    pub fn kind(&self) -> &OutputKind {
        &self.kind
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Displayed text: the content of a text node or the label of a link.
    pub fn display_text(&self) -> Option<&str> {
        match &self.kind {
            OutputKind::Text(content) => Some(content),
            OutputKind::Link(link) => Some(&link.label),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, OutputKind::Text(_))
    }

    pub fn as_link(&self) -> Option<&Link> {
        match &self.kind {
            OutputKind::Link(link) => Some(link),
            _ => None,
        }
    }

    /// The first hook in this node's style named `name`, if any.
    pub fn hook_named(&self, name: &str) -> Option<&Hook> {
        self.style.hooks().find(|hook| hook.name == name)
    }
}

/// Render nodes as plain text: links as `[label]`, line breaks as newlines.
/// Unexpanded fragments render as nothing.
pub fn render_plain(nodes: &[OutputNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node.kind() {
            OutputKind::Text(content) => out.push_str(content),
            OutputKind::Link(link) => {
                out.push('[');
                out.push_str(&link.label);
                out.push(']');
            }
            OutputKind::LineBreak => out.push('\n'),
            OutputKind::EmbedFragment(_) => {}
        }
    }
    out
}
