/// Enchantment executor — replays a fragment once per matched region.
use std::rc::Rc;

use crate::core::style::{ScopedThread, StyleEntry, StyleStack};
use crate::schema::enchantment::Enchantment;
use crate::schema::output::{Fragment, Thread};

/// Replay `fragment` once for each enchantment, in order, with that
/// enchantment pushed onto `style` for the duration of the replay.
///
/// The returned thread is lazy: nothing is pushed or invoked until it is
/// pulled, and dropping it part-way releases the active enchantment.
pub fn execute(style: &StyleStack, enchantments: Vec<Rc<Enchantment>>, fragment: Fragment) -> Thread {
    let style = style.clone();
    Box::new(enchantments.into_iter().flat_map(move |enchantment| {
        tracing::trace!(%enchantment, "replaying fragment");
        ScopedThread::new(&style, StyleEntry::enchantment(enchantment), Rc::clone(&fragment))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::story::StoryContext;
    use crate::schema::enchantment::{EnchantCommand, ReferenceType};
    use crate::schema::output::{fragment, OutputNode};
    use std::cell::Cell;

    fn enchantment(label: &str) -> Rc<Enchantment> {
        Rc::new(Enchantment {
            reference_type: ReferenceType::Text,
            command: EnchantCommand::Replace,
            affected: vec![OutputNode::text(label, Default::default())],
            hook: None,
            occurrences: None,
        })
    }

    fn counting_fragment(cx: &StoryContext, calls: Rc<Cell<usize>>) -> Fragment {
        let cx = cx.clone();
        fragment(move || {
            calls.set(calls.get() + 1);
            vec![cx.text("replayed")]
        })
    }

    #[test]
    fn no_enchantments_no_invocations() {
        let cx = StoryContext::new();
        let calls = Rc::new(Cell::new(0));
        let produced: Vec<_> = execute(cx.style(), Vec::new(), counting_fragment(&cx, calls.clone())).collect();
        assert!(produced.is_empty());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn one_invocation_per_enchantment_in_order() {
        let cx = StoryContext::new();
        let calls = Rc::new(Cell::new(0));
        let list = vec![enchantment("first"), enchantment("second"), enchantment("third")];
        let produced: Vec<_> = execute(cx.style(), list, counting_fragment(&cx, calls.clone())).collect();

        assert_eq!(calls.get(), 3);
        assert_eq!(produced.len(), 3);
        let sources: Vec<_> = produced
            .iter()
            .map(|node| {
                let enchantments: Vec<_> = node.style().enchantments().collect();
                assert_eq!(enchantments.len(), 1);
                enchantments[0].affected[0].display_text().unwrap().to_string()
            })
            .collect();
        assert_eq!(sources, vec!["first", "second", "third"]);
        assert_eq!(cx.style().depth(), 0);
    }

    #[test]
    fn only_one_enchantment_active_at_a_time() {
        let cx = StoryContext::new();
        let inner = cx.clone();
        let f = fragment(move || {
            let depth = inner.style().depth();
            vec![inner.text(depth.to_string())]
        });
        let produced: Vec<_> = execute(cx.style(), vec![enchantment("a"), enchantment("b")], f).collect();
        let depths: Vec<_> = produced.iter().filter_map(|n| n.display_text()).collect();
        assert_eq!(depths, vec!["1", "1"]);
    }

    #[test]
    fn nothing_happens_until_pulled() {
        let cx = StoryContext::new();
        let calls = Rc::new(Cell::new(0));
        let thread = execute(cx.style(), vec![enchantment("a")], counting_fragment(&cx, calls.clone()));
        assert_eq!(calls.get(), 0);
        assert_eq!(cx.style().depth(), 0);
        drop(thread);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn early_drop_releases_context() {
        let cx = StoryContext::new();
        let inner = cx.clone();
        let f = fragment(move || vec![inner.text("one"), inner.text("two")]);
        let mut thread = execute(cx.style(), vec![enchantment("a"), enchantment("b")], f);

        assert!(thread.next().is_some());
        assert_eq!(cx.style().depth(), 1);
        drop(thread);
        assert_eq!(cx.style().depth(), 0);
    }
}
