//! Property tests for tap composition.

use proptest::prelude::*;
use spool_stream::{RenderTree, StringSink};

#[derive(Debug, Clone)]
enum Op {
    Tap(u8),
    Untap,
    Write(String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..10).prop_map(Op::Tap),
        Just(Op::Untap),
        "[a-z]{1,4}".prop_map(Op::Write),
    ]
}

/// Wraps with a marker unique to the tap, so composition order is visible.
fn marker(id: u8, s: &str) -> String {
    format!("<{id}>{s}</{id}>")
}

proptest! {
    /// Every write equals the installed markers applied newest-first.
    #[test]
    fn writes_compose_innermost_first(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let sink = StringSink::new();
        let (_tree, mut chunk) = RenderTree::start(sink.clone());
        let mut model: Vec<u8> = Vec::new();
        let mut expected = String::new();

        for op in ops {
            match op {
                Op::Tap(id) => {
                    chunk.tap(move |s| marker(id, s)).unwrap();
                    model.push(id);
                }
                Op::Untap => {
                    let result = chunk.untap();
                    prop_assert_eq!(result.is_ok(), model.pop().is_some());
                }
                Op::Write(text) => {
                    chunk.write(&text).unwrap();
                    expected.push_str(
                        &model.iter().rev().fold(text, |acc, id| marker(*id, &acc)),
                    );
                }
            }
        }

        while chunk.tap_depth() > 0 {
            chunk.untap().unwrap();
        }
        chunk.end().unwrap();
        prop_assert_eq!(sink.contents(), expected);
    }

    /// Untapping more than was tapped always fails.
    #[test]
    fn extra_untap_is_rejected(taps in 0usize..6) {
        let (_tree, mut chunk) = RenderTree::start(StringSink::new());
        for i in 0..taps {
            chunk.tap(move |s| format!("{i}{s}")).unwrap();
        }
        for _ in 0..taps {
            prop_assert!(chunk.untap().is_ok());
        }
        prop_assert!(chunk.untap().is_err());
    }
}
