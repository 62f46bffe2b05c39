/// Hooks — named, taggable regions of story output.
use rustc_hash::FxHashMap;

use super::output::OutputNode;

/// Newtype wrapper for hook activation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(pub u64);

/// One activation of a named hook.
///
/// Every node produced while the activation is open carries the same
/// `Hook` value in its style. Two activations of the same name compare
/// unequal, which is what lets the matcher tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hook {
    pub name: String,
    pub activation: HookId,
}

impl Hook {
    pub fn same_activation(&self, other: &Hook) -> bool {
        self.activation == other.activation
    }
}

/// Allocates hook activations for one story execution.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    next_id: u64,
    activations: FxHashMap<String, u32>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh activation of `name`.
    pub fn activate(&mut self, name: &str) -> Hook {
        let activation = HookId(self.next_id);
        self.next_id += 1;
        *self.activations.entry(name.to_string()).or_insert(0) += 1;
        Hook {
            name: name.to_string(),
            activation,
        }
    }

    /// How many times `name` has been activated so far.
    pub fn activation_count(&self, name: &str) -> u32 {
        self.activations.get(name).copied().unwrap_or(0)
    }
}

/// Nodes of `output` that sit inside any activation of the hook `name`.
pub fn nodes_in_hook<'a>(
    output: &'a [OutputNode],
    name: &'a str,
) -> impl Iterator<Item = &'a OutputNode> + 'a {
    output.iter().filter(move |node| node.hook_named(name).is_some())
}
