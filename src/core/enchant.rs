/// Enchantment entry points — compose matching, replay and link materialization.
use std::rc::Rc;

use crate::core::executor::execute;
use crate::core::links::materialize_links;
use crate::core::matcher::find_enchantments;
use crate::core::story::{Story, StoryContext};
use crate::schema::enchantment::{EnchantCommand, Reference};
use crate::schema::hook::Hook;
use crate::schema::output::{Fragment, OutputNode, Thread};

/// Optional transformations applied by [`Story::enchant_hook`] to its fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnchantHookOptions {
    /// Re-open a fresh activation of the same hook around the replacement,
    /// so it can itself be enchanted later.
    pub wrap: bool,
    /// Emit the label of the link being activated before the fragment's output.
    pub link_text_prefix: bool,
}

impl StoryContext {
    /// Emit the label of the link currently being activated, then `fragment`.
    pub fn prefix_with_link_text(&self, fragment: Fragment) -> Thread {
        let cx = self.clone();
        let prefix = std::iter::once_with(move || match cx.link_in_action() {
            Some(label) => Some(cx.text(label)),
            None => {
                tracing::debug!("no link in action, skipping link text prefix");
                None
            }
        })
        .flatten();
        Box::new(prefix.chain(std::iter::once_with(move || fragment()).flatten()))
    }

    /// Replay `fragment` under a fresh activation of `hook_name`.
    pub fn wrap_with_hook(&self, hook_name: &str, fragment: Fragment) -> Thread {
        self.hooked(hook_name, fragment)
    }
}

impl Story {
    /// Open a fresh activation of the hook `name`.
    pub fn hook(&self, name: &str) -> Hook {
        self.context().hook(name)
    }

    /// A reference to every region tagged with the hook `name`.
    pub fn hook_ref(&self, name: &str) -> Reference {
        Reference::hook(name)
    }

    /// Match `reference` against the output history as it stands now and
    /// return a fragment node that replays `fragment` once per match.
    ///
    /// Matching happens immediately; replay is deferred until the returned
    /// node is expanded.
    pub fn enchant(
        &self,
        reference: impl Into<Reference>,
        command: EnchantCommand,
        fragment: Fragment,
    ) -> OutputNode {
        let reference = reference.into();
        let enchantments: Vec<_> = self
            .with_output(|output| find_enchantments(output, &reference, command))
            .into_iter()
            .map(Rc::new)
            .collect();

        let style = self.style().clone();
        self.context().embed(Rc::new(move || {
            execute(&style, enchantments.clone(), Rc::clone(&fragment))
        }))
    }

    /// Replace every region matching `reference` with links running `link_action`.
    pub fn enchant_into_link(&self, reference: impl Into<Reference>, link_action: Fragment) -> OutputNode {
        let style = self.style().clone();
        self.enchant(
            reference,
            EnchantCommand::Replace,
            Rc::new(move || materialize_links(&style, Rc::clone(&link_action))),
        )
    }

    /// Enchant the hook `hook_name`, optionally prefixing the fragment with
    /// the active link's label and wrapping it in a fresh hook activation.
    ///
    /// Matching is deferred until the returned thread is pulled, so hooks
    /// produced between this call and consumption are included.
    pub fn enchant_hook(
        &self,
        hook_name: &str,
        command: EnchantCommand,
        fragment: Fragment,
        options: EnchantHookOptions,
    ) -> Thread {
        let cx = self.context().clone();

        let fragment = if options.link_text_prefix {
            let cx = cx.clone();
            let inner = fragment;
            Rc::new(move || cx.prefix_with_link_text(Rc::clone(&inner))) as Fragment
        } else {
            fragment
        };

        let fragment = if options.wrap {
            let name = hook_name.to_string();
            let inner = fragment;
            Rc::new(move || cx.wrap_with_hook(&name, Rc::clone(&inner))) as Fragment
        } else {
            fragment
        };

        let story = self.clone();
        let reference = self.hook_ref(hook_name);
        Box::new(std::iter::once_with(move || story.enchant(reference, command, fragment)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::output::{fragment, render_plain};
    use std::cell::Cell;

    fn text_fragment(cx: &StoryContext, content: &'static str) -> Fragment {
        let cx = cx.clone();
        fragment(move || vec![cx.text(content)])
    }

    #[test]
    fn matching_uses_history_at_call_time() {
        let story = Story::new();
        let cx = story.context().clone();
        story.emit(cx.text("The north gate."));

        let node = story.enchant("north", EnchantCommand::Replace, text_fragment(&cx, "!"));
        story.emit(cx.text("Another north road."));

        assert_eq!(story.emit(node), 1);
    }

    #[test]
    fn replay_is_deferred_until_expanded() {
        let story = Story::new();
        let cx = story.context().clone();
        story.emit(cx.text("north"));

        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let inner = cx.clone();
        let node = story.enchant(
            "north",
            EnchantCommand::Replace,
            fragment(move || {
                counter.set(counter.get() + 1);
                vec![inner.text("x")]
            }),
        );
        assert_eq!(calls.get(), 0);
        story.emit(node);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn enchant_into_link_example() {
        let story = Story::new();
        let cx = story.context().clone();
        story.emit(cx.text("Go north or south."));

        let before = story.output_len();
        story.emit(story.enchant_into_link("north", text_fragment(&cx, "You head north.")));
        let output = story.output();

        assert_eq!(render_plain(&output[before..]), "Go [north] or south.");
        assert_eq!(story.style().depth(), 0);
    }

    #[test]
    fn enchant_hook_defers_matching() {
        let story = Story::new();
        let cx = story.context().clone();
        let thread = story.enchant_hook(
            "door",
            EnchantCommand::Replace,
            text_fragment(&cx, "It opens."),
            EnchantHookOptions::default(),
        );

        // Produced after the call but before consumption
        story.run(cx.hooked("door", text_fragment(&cx, "A door.")));

        let before = story.output_len();
        story.run(thread);
        assert_eq!(render_plain(&story.output()[before..]), "It opens.");
    }

    #[test]
    fn wrap_opens_fresh_hook_activation() {
        let story = Story::new();
        let cx = story.context().clone();
        story.run(cx.hooked("door", text_fragment(&cx, "A door.")));
        let original = story.output()[0].hook_named("door").cloned().unwrap();

        let before = story.output_len();
        story.run(story.enchant_hook(
            "door",
            EnchantCommand::Replace,
            text_fragment(&cx, "An open door."),
            EnchantHookOptions {
                wrap: true,
                ..Default::default()
            },
        ));

        let output = story.output();
        let replacement = &output[before];
        let wrapped = replacement.hook_named("door").unwrap();
        assert!(!wrapped.same_activation(&original));
        assert_eq!(cx.hook_activations("door"), 2);

        // The replacement can be enchanted again on its own
        let again = story.with_output(|output| {
            find_enchantments(output, &Reference::hook("door"), EnchantCommand::Replace).len()
        });
        assert_eq!(again, 2);
    }

    #[test]
    fn link_text_prefix_comes_first() {
        let story = Story::new();
        let cx = story.context().clone();
        story.run(cx.hooked("door", text_fragment(&cx, "A door.")));

        let action_story = story.clone();
        let action_cx = cx.clone();
        let action = fragment(move || {
            action_story.enchant_hook(
                "door",
                EnchantCommand::Append,
                text_fragment(&action_cx, " creaks open."),
                EnchantHookOptions {
                    link_text_prefix: true,
                    ..Default::default()
                },
            )
        });
        let link = cx.link("Push", action);

        let thread = story.activate_link(&link).unwrap();
        let before = story.output_len();
        story.run(thread);
        assert_eq!(render_plain(&story.output()[before..]), "Push creaks open.");
    }

    #[test]
    fn prefix_sits_inside_wrapped_activation() {
        let story = Story::new();
        let cx = story.context().clone();
        story.run(cx.hooked("door", text_fragment(&cx, "A door.")));
        let original = story.output()[0].hook_named("door").cloned().unwrap();

        let action_story = story.clone();
        let action_cx = cx.clone();
        let action = fragment(move || {
            action_story.enchant_hook(
                "door",
                EnchantCommand::Replace,
                text_fragment(&action_cx, " opens."),
                EnchantHookOptions {
                    wrap: true,
                    link_text_prefix: true,
                },
            )
        });
        let link = cx.link("Push", action);

        let before = story.output_len();
        story.run(story.activate_link(&link).unwrap());
        let output = story.output();
        let produced = &output[before..];

        let texts: Vec<_> = produced.iter().filter_map(|n| n.display_text()).collect();
        assert_eq!(texts, vec!["Push", " opens."]);
        let prefix_hook = produced[0].hook_named("door").unwrap();
        let body_hook = produced[1].hook_named("door").unwrap();
        assert!(prefix_hook.same_activation(body_hook));
        assert!(!prefix_hook.same_activation(&original));
        assert_eq!(produced[0].style().hooks().count(), 1);
        assert_eq!(cx.hook_activations("door"), 2);
    }

    #[test]
    fn finished_action_no_longer_prefixes() {
        let story = Story::new();
        let cx = story.context().clone();
        story.run(cx.hooked("door", text_fragment(&cx, "A door.")));

        let link = cx.link("Push", text_fragment(&cx, "You push."));
        story.run(story.activate_link(&link).unwrap());

        let before = story.output_len();
        story.run(story.enchant_hook(
            "door",
            EnchantCommand::Replace,
            text_fragment(&cx, " opens."),
            EnchantHookOptions {
                link_text_prefix: true,
                ..Default::default()
            },
        ));
        assert_eq!(render_plain(&story.output()[before..]), " opens.");
    }

    #[test]
    fn prefix_without_active_link_is_skipped() {
        let cx = StoryContext::new();
        let nodes: Vec<_> = cx.prefix_with_link_text(text_fragment(&cx, "body")).collect();
        assert_eq!(render_plain(&nodes), "body");
    }

    #[test]
    fn missing_hook_produces_nothing() {
        let story = Story::new();
        let cx = story.context().clone();
        story.emit(cx.text("Nothing tagged."));
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let node = story.enchant(
            story.hook_ref("missing"),
            EnchantCommand::Replace,
            fragment(move || {
                counter.set(counter.get() + 1);
                Vec::new()
            }),
        );
        assert_eq!(story.emit(node), 0);
        assert_eq!(calls.get(), 0);
    }
}
