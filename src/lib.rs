//! Story Enchant — runtime text enchantment for interactive story output.
//!
//! Finds regions of already-produced output (by hook or by literal text),
//! replays caller-supplied fragments under each region's style context, and
//! rewrites regions into clickable links without touching the original
//! history.

pub mod core;
pub mod schema;

pub use crate::core::enchant::EnchantHookOptions;
pub use crate::core::story::{Story, StoryBuilder, StoryContext};
pub use crate::schema::enchantment::{EnchantCommand, Enchantment, Reference, ReferenceType};
pub use crate::schema::output::{fragment, Fragment, OutputKind, OutputNode, Thread};
