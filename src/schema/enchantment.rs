use regex::Regex;
use std::fmt;

use super::hook::Hook;
use super::output::OutputNode;
use super::value::Value;

/// How an enchantment's region was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Text,
    Hook,
    Other,
}

/// What the caller intends to do with the matched region. The engine
/// records it; the surrounding runtime decides how to present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnchantCommand {
    #[default]
    None,
    Replace,
    Append,
    Prepend,
}

/// What an enchantment should look for in the output history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// Nodes tagged with a hook of this name.
    Hook(String),
    /// Literal occurrences of this string inside text nodes.
    Text(String),
}

impl Reference {
    pub fn hook(name: impl Into<String>) -> Self {
        Self::Hook(name.into())
    }

    /// A text reference built from any value's string form.
    pub fn text(value: impl fmt::Display) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&str> for Reference {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Reference {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for Reference {
    fn from(value: Value) -> Self {
        Self::text(value)
    }
}

impl From<&Hook> for Reference {
    fn from(hook: &Hook) -> Self {
        Self::Hook(hook.name.clone())
    }
}

/// A matched, grouped region of the output history.
#[derive(Debug, Clone)]
pub struct Enchantment {
    pub reference_type: ReferenceType,
    pub command: EnchantCommand,
    pub affected: Vec<OutputNode>,
    /// Set for hook references.
    pub hook: Option<Hook>,
    /// Set for text references; re-run against affected text to find the spans.
    pub occurrences: Option<Regex>,
}

impl fmt::Display for Enchantment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {:?} (affects {})",
            self.command,
            self.reference_type,
            self.affected.len()
        )
    }
}
