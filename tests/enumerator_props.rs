//! Purpose: Check the enumerator laws over every kind of producer.
//! Exports: Property tests only (no runtime exports).
//! Role: Compare in-memory, lazy and binary-proxy enumerators against the plain element list.
//! Invariants: Batches concatenate to the sequence; reset, skip and clone agree with indexing.

use proptest::prelude::*;
use strenum::api::{
    EnumObject, EnumString, ForeignEnum, Generated, Progress, SequenceEnumerator, Snapshot,
};

fn texts(batch: &strenum::api::Batch) -> Vec<String> {
    batch.items.iter().map(|item| item.to_string_lossy()).collect()
}

fn element() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 \u{e9}\u{2603}]{0,8}"
}

/// Same elements behind three producers: in-memory, lazy, and the binary proxy.
fn producers(items: &[String]) -> Vec<Box<dyn EnumString>> {
    let lazy = items.to_vec();
    let exported = EnumObject::from_enumerator(SequenceEnumerator::from_sequence(
        Snapshot::new(items.iter().map(String::as_str)),
    ));
    let snapshot: Box<dyn EnumString> = Box::new(SequenceEnumerator::from_sequence(
        Snapshot::new(items.iter().map(String::as_str)),
    ));
    let generated: Box<dyn EnumString> =
        Box::new(SequenceEnumerator::from_sequence(Generated::from_iterator(lazy)));
    let proxy: Box<dyn EnumString> =
        Box::new(unsafe { ForeignEnum::from_raw(exported) }.expect("handle"));
    vec![snapshot, generated, proxy]
}

proptest! {
    #[test]
    fn batches_concatenate_to_the_sequence(
        items in proptest::collection::vec(element(), 0..24),
        counts in proptest::collection::vec(0usize..6, 0..12),
    ) {
        for mut en in producers(&items) {
            let mut seen = Vec::new();
            for &count in &counts {
                let batch = en.next(count).expect("next");
                prop_assert!(batch.len() <= count);
                let expected = Progress::classify(count, batch.len());
                prop_assert_eq!(batch.progress, expected);
                seen.extend(texts(&batch));
            }
            let rest = en.next(items.len() + 1).expect("next");
            prop_assert!(!rest.progress.is_complete());
            seen.extend(texts(&rest));
            prop_assert_eq!(&seen, &items);
        }
    }

    #[test]
    fn reset_returns_to_first_element(
        items in proptest::collection::vec(element(), 1..16),
        advance in 0usize..20,
    ) {
        for mut en in producers(&items) {
            en.skip(advance).expect("skip");
            en.reset().expect("reset");
            let batch = en.next(1).expect("next");
            prop_assert_eq!(texts(&batch), vec![items[0].clone()]);
            prop_assert_eq!(batch.progress, Progress::Complete);
        }
    }

    #[test]
    fn clone_keeps_position_while_original_moves(
        items in proptest::collection::vec(element(), 1..16),
        k in 0usize..16,
        further in 1usize..16,
    ) {
        let k = k.min(items.len() - 1);
        for mut en in producers(&items) {
            en.skip(k).expect("skip");
            let mut clone = en.clone_enum().expect("clone");
            en.next(further).expect("next");
            let batch = clone.next(1).expect("next");
            prop_assert_eq!(texts(&batch), vec![items[k].clone()]);
        }
    }

    #[test]
    fn skip_then_next_returns_offset_element(
        items in proptest::collection::vec(element(), 0..16),
        start in 0usize..8,
        count in 0usize..20,
    ) {
        for mut en in producers(&items) {
            en.skip(start).expect("skip");
            let cursor = start.min(items.len());
            let skipped = en.skip(count).expect("skip");
            prop_assert_eq!(skipped.is_complete(), cursor + count <= items.len());
            let batch = en.next(1).expect("next");
            match items.get(cursor + count) {
                Some(item) => {
                    prop_assert_eq!(texts(&batch), vec![item.clone()]);
                }
                None => {
                    prop_assert_eq!(batch.progress, Progress::Exhausted);
                }
            }
        }
    }
}
