/// Matcher — locates enchantable regions in an output history.
use regex::Regex;

use crate::schema::enchantment::{EnchantCommand, Enchantment, Reference, ReferenceType};
use crate::schema::output::{OutputKind, OutputNode};

/// Scan `output` for regions matching `reference`, in source order.
///
/// Hook references group consecutive matches from the same hook activation
/// into one enchantment; nodes in between that carry no such hook do not
/// break the group. Text references produce one enchantment per text node
/// containing the literal at least once. Unmatched references are not an
/// error: the result is simply empty.
pub fn find_enchantments(
    output: &[OutputNode],
    reference: &Reference,
    command: EnchantCommand,
) -> Vec<Enchantment> {
    let enchantments = match reference {
        Reference::Hook(name) => match_hook(output, name, command),
        Reference::Text(literal) => match_text(output, literal, command),
    };
    tracing::debug!(
        ?reference,
        scanned = output.len(),
        matches = enchantments.len(),
        "matched enchantments"
    );
    enchantments
}

fn match_hook(output: &[OutputNode], name: &str, command: EnchantCommand) -> Vec<Enchantment> {
    let mut enchantments: Vec<Enchantment> = Vec::new();

    for node in output {
        let Some(hook) = node.hook_named(name) else {
            continue;
        };

        // Extend the running group only while the activation is unchanged
        let extends_last = enchantments
            .last()
            .and_then(|last| last.hook.as_ref())
            .is_some_and(|last_hook| last_hook.same_activation(hook));

        if !extends_last {
            enchantments.push(Enchantment {
                reference_type: ReferenceType::Hook,
                command,
                affected: Vec::new(),
                hook: Some(hook.clone()),
                occurrences: None,
            });
        }

        if let Some(last) = enchantments.last_mut() {
            last.affected.push(node.clone());
        }
    }

    enchantments
}

fn match_text(output: &[OutputNode], literal: &str, command: EnchantCommand) -> Vec<Enchantment> {
    let Some(occurrences) = literal_pattern(literal) else {
        return Vec::new();
    };

    output
        .iter()
        .filter(|node| match node.kind() {
            OutputKind::Text(content) => occurrences.is_match(content),
            _ => false,
        })
        .map(|node| Enchantment {
            reference_type: ReferenceType::Text,
            command,
            affected: vec![node.clone()],
            hook: None,
            occurrences: Some(occurrences.clone()),
        })
        .collect()
}

/// Compile `literal` into a pattern matching exactly that text.
/// An empty literal matches nothing.
pub fn literal_pattern(literal: &str) -> Option<Regex> {
    if literal.is_empty() {
        return None;
    }
    match Regex::new(&regex::escape(literal)) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            tracing::warn!(error = %e, "text reference could not be compiled, matching nothing");
            None
        }
    }
}
