/// Ambient style context — the stack of entries visible to produced output.
///
/// Entries are pushed through [`StyleScope`] guards which truncate the stack
/// back to the depth they found it at when dropped. Nodes take an immutable
/// [`Style`] snapshot of the stack at the moment they are created.
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::schema::enchantment::Enchantment;
use crate::schema::hook::Hook;
use crate::schema::output::{Fragment, OutputNode, Thread};
use crate::schema::value::Value;

/// Key of a style entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleKey {
    Hook,
    Enchantment,
    Custom(String),
}

impl StyleKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hook => "hook",
            Self::Enchantment => "enchantment",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for StyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for StyleKey {
    fn from(name: &str) -> Self {
        match name {
            "hook" => Self::Hook,
            "enchantment" => Self::Enchantment,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Value of a style entry.
#[derive(Debug, Clone)]
pub enum StyleValue {
    Hook(Hook),
    Enchantment(Rc<Enchantment>),
    Value(Value),
}

#[derive(Debug, Clone)]
pub struct StyleEntry {
    pub key: StyleKey,
    pub value: StyleValue,
}

impl StyleEntry {
    pub fn new(key: impl Into<StyleKey>, value: StyleValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn hook(hook: Hook) -> Self {
        Self::new(StyleKey::Hook, StyleValue::Hook(hook))
    }

    pub fn enchantment(enchantment: Rc<Enchantment>) -> Self {
        Self::new(StyleKey::Enchantment, StyleValue::Enchantment(enchantment))
    }
}

/// Immutable snapshot of style entries, oldest first. Multiple entries may
/// share a key.
#[derive(Debug, Clone)]
pub struct Style {
    entries: Rc<[StyleEntry]>,
}

impl Default for Style {
    fn default() -> Self {
        Self::from_entries(Vec::new())
    }
}

impl Style {
    pub fn from_entries(entries: Vec<StyleEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[StyleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values stored under `key`, most recently pushed last.
    pub fn values<'a>(&'a self, key: &'a StyleKey) -> impl Iterator<Item = &'a StyleValue> + 'a {
        self.entries
            .iter()
            .filter(move |entry| &entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn hooks(&self) -> impl Iterator<Item = &Hook> {
        self.entries.iter().filter_map(|entry| match (&entry.key, &entry.value) {
            (StyleKey::Hook, StyleValue::Hook(hook)) => Some(hook),
            _ => None,
        })
    }

    pub fn enchantments(&self) -> impl Iterator<Item = &Rc<Enchantment>> {
        self.entries.iter().filter_map(|entry| match (&entry.key, &entry.value) {
            (StyleKey::Enchantment, StyleValue::Enchantment(e)) => Some(e),
            _ => None,
        })
    }
}

/// The live style stack shared by every scope of one story execution.
#[derive(Debug, Clone, Default)]
pub struct StyleStack {
    entries: Rc<RefCell<Vec<StyleEntry>>>,
}

impl StyleStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one entry, visible until the returned scope is dropped.
    #[must_use = "the entry is released as soon as the scope is dropped"]
    pub fn apply(&self, key: impl Into<StyleKey>, value: StyleValue) -> StyleScope {
        self.apply_entries(std::iter::once(StyleEntry::new(key, value)))
    }

    /// Push every entry of `style`, in order.
    #[must_use = "the entries are released as soon as the scope is dropped"]
    pub fn apply_all(&self, style: &Style) -> StyleScope {
        self.apply_entries(style.entries().iter().cloned())
    }

    fn apply_entries(&self, entries: impl IntoIterator<Item = StyleEntry>) -> StyleScope {
        let mut stack = self.entries.borrow_mut();
        let depth = stack.len();
        stack.extend(entries);
        StyleScope {
            stack: self.clone(),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn snapshot(&self) -> Style {
        Style::from_entries(self.entries.borrow().clone())
    }

    /// Values currently visible under `key`, most recently pushed last.
    pub fn values(&self, key: &StyleKey) -> Vec<StyleValue> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| &entry.key == key)
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// The most recently pushed enchantment, if any scope holds one.
    pub fn last_enchantment(&self) -> Option<Rc<Enchantment>> {
        self.entries
            .borrow()
            .iter()
            .rev()
            .find_map(|entry| match (&entry.key, &entry.value) {
                (StyleKey::Enchantment, StyleValue::Enchantment(e)) => Some(Rc::clone(e)),
                _ => None,
            })
    }

    fn truncate(&self, depth: usize) {
        self.entries.borrow_mut().truncate(depth);
    }
}

/// Guard returned by [`StyleStack::apply`]. Restores the stack to its
/// prior depth on drop.
///
/// Scopes must be released in reverse order of creation: dropping an outer
/// scope first also removes the entries of every scope opened after it.
#[derive(Debug)]
pub struct StyleScope {
    stack: StyleStack,
    depth: usize,
}

impl Drop for StyleScope {
    fn drop(&mut self) {
        debug_assert!(
            self.stack.depth() >= self.depth,
            "style scope released after an enclosing scope"
        );
        self.stack.truncate(self.depth);
    }
}

/// A thread that replays `fragment` under one extra style entry.
///
/// The entry is pushed on the first pull, before the fragment is invoked,
/// and released once the fragment runs dry or the thread is dropped.
pub struct ScopedThread {
    // Declared before `scope` so nested scopes unwind first.
    inner: Option<Thread>,
    scope: Option<StyleScope>,
    pending: Option<(StyleStack, StyleEntry, Fragment)>,
}

impl ScopedThread {
    pub fn new(stack: &StyleStack, entry: StyleEntry, fragment: Fragment) -> Self {
        Self {
            inner: None,
            scope: None,
            pending: Some((stack.clone(), entry, fragment)),
        }
    }
}

impl Iterator for ScopedThread {
    type Item = OutputNode;

    fn next(&mut self) -> Option<OutputNode> {
        if let Some((stack, entry, fragment)) = self.pending.take() {
            self.scope = Some(stack.apply_entries(std::iter::once(entry)));
            self.inner = Some(fragment());
        }
        let node = self.inner.as_mut().and_then(|inner| inner.next());
        if node.is_none() {
            self.inner = None;
            self.scope = None;
        }
        node
    }
}
