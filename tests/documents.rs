use proptest::prelude::*;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};

use beamflow::document::{AddressingError, Document, Return, Selector, Target};

#[test]
fn merge_is_right_biased_on_kwargs() {
    let left = Document::builder().with_kwarg("a", json!(1)).build();
    let right = Document::builder()
        .with_kwarg("a", json!(2))
        .with_kwarg("b", json!(3))
        .build();

    let merged = left.merge([&right]);
    assert_eq!(merged.kwargs().get("a"), Some(&json!(2)));
    assert_eq!(merged.kwargs().get("b"), Some(&json!(3)));
    assert_eq!(merged.kwargs().len(), 2);
}

#[test]
fn merge_concatenates_args_in_document_order() {
    let left = Document::builder()
        .with_arg(json!(1))
        .with_arg(json!(2))
        .build();
    let right = Document::builder().with_arg(json!(3)).build();

    let merged = left.merge([&right]);
    assert_eq!(merged.args(), &[json!(1), json!(2), json!(3)]);
}

#[test]
fn merge_leaves_inputs_untouched_and_issues_fresh_uid() {
    let left = Document::builder().with_kwarg("a", json!(1)).build();
    let right = Document::builder().with_kwarg("a", json!(2)).build();
    let left_before = left.clone();
    let right_before = right.clone();

    let merged = left.merge([&right]);

    assert_eq!(left, left_before);
    assert_eq!(right, right_before);
    assert_ne!(merged.uid(), left.uid());
    assert_ne!(merged.uid(), right.uid());
}

#[test]
fn get_return_unwraps_single_arg() {
    let doc = Document::builder().with_arg(json!("only")).build();
    assert_eq!(doc.get_return(), Return::Value(json!("only")));
}

#[test]
fn get_return_yields_kwargs_map_when_only_kwargs() {
    let doc = Document::builder().with_kwarg("x", json!(7)).build();
    match doc.get_return() {
        Return::Keyword(kwargs) => {
            assert_eq!(kwargs.len(), 1);
            assert_eq!(kwargs.get("x"), Some(&json!(7)));
        }
        other => panic!("expected keyword return, got {other:?}"),
    }
}

#[test]
fn get_return_yields_sequence_for_several_args() {
    let doc = Document::builder()
        .with_arg(json!(1))
        .with_arg(json!(2))
        .build();
    assert_eq!(doc.get_return(), Return::Positional(vec![json!(1), json!(2)]));
}

#[test]
fn get_return_is_ambiguous_when_both_payloads_present() {
    let doc = Document::builder()
        .with_arg(json!(1))
        .with_kwarg("x", json!(2))
        .build();
    match doc.get_return() {
        Return::Document(inner) => assert_eq!(*inner, doc),
        other => panic!("expected document return, got {other:?}"),
    }
}

#[test]
fn get_addresses_args_and_kwargs() {
    let doc = Document::builder()
        .with_arg(json!("positional"))
        .with_kwarg("key", json!("keyword"))
        .build();

    assert_eq!(doc.get(&Selector::arg(0)).unwrap(), &json!("positional"));
    assert_eq!(doc.get(&Selector::kwarg("key")).unwrap(), &json!("keyword"));
    assert!(matches!(
        doc.get(&Selector::arg(5)),
        Err(AddressingError::MissingArg { index: 5, len: 1 })
    ));
    assert!(matches!(
        doc.get(&Selector::kwarg("ghost")),
        Err(AddressingError::MissingKwarg { key }) if key == "ghost"
    ));
}

#[test]
fn select_rewires_fields_between_payloads() {
    let doc = Document::builder()
        .with_arg(json!(10))
        .with_arg(json!(20))
        .with_kwarg("a", json!(5))
        .build();

    let projected = doc
        .select([
            (Selector::kwarg("a"), Target::Args),
            (Selector::arg(1), Target::kwarg("b")),
        ])
        .expect("both sources exist");

    assert_eq!(projected.args(), &[json!(5)]);
    assert_eq!(projected.kwargs().len(), 1);
    assert_eq!(projected.kwargs().get("b"), Some(&json!(20)));
}

#[test]
fn select_preserves_attributes_and_renames_uid() {
    let doc = Document::builder()
        .with_kwarg("q", json!([0.1, 0.2]))
        .with_attribute("detector", json!("pilatus300"))
        .build();

    let projected = doc.select_kwarg("q").expect("q exists");
    assert_eq!(
        projected.attributes().get("detector"),
        Some(&json!("pilatus300"))
    );
    assert_ne!(projected.uid(), doc.uid());
}

#[test]
fn select_on_missing_field_fails_and_leaves_input_unmodified() {
    let doc = Document::builder().with_kwarg("present", json!(1)).build();
    let before = doc.clone();

    let result = doc.select([(Selector::kwarg("absent"), Target::Args)]);
    assert!(matches!(
        result,
        Err(AddressingError::MissingKwarg { key }) if key == "absent"
    ));
    assert_eq!(doc, before);
}

#[test]
fn add_args_extends_never_overwrites() {
    let mut doc = Document::builder().with_arg(json!(1)).build();
    doc.add_args([json!(2), json!(3)]);
    assert_eq!(doc.args(), &[json!(1), json!(2), json!(3)]);
}

#[test]
fn stack_collects_each_slot_in_document_order() {
    let a = Document::builder()
        .with_arg(json!(1))
        .with_kwarg("q", json!([0.1]))
        .build();
    let b = Document::builder()
        .with_arg(json!(2))
        .with_kwarg("q", json!([0.2]))
        .build();

    let stacked = Document::stack([&a, &b]);
    assert_eq!(stacked.args(), &[json!([1, 2])]);
    assert_eq!(stacked.kwargs().get("q"), Some(&json!([[0.1], [0.2]])));
}

#[test]
fn stack_tolerates_ragged_documents() {
    let a = Document::builder()
        .with_arg(json!(1))
        .with_arg(json!(2))
        .build();
    let b = Document::builder().with_arg(json!(3)).build();

    let stacked = Document::stack([&a, &b]);
    assert_eq!(stacked.args(), &[json!([1, 3]), json!([2])]);
}

#[test]
fn fingerprint_ignores_attributes_and_uid() {
    let a = Document::builder()
        .with_arg(json!([1, 2]))
        .with_kwarg("mask", json!("circular"))
        .with_attribute("run", json!("alpha"))
        .build();
    let b = Document::builder()
        .with_arg(json!([1, 2]))
        .with_kwarg("mask", json!("circular"))
        .with_attribute("run", json!("beta"))
        .build();

    assert_ne!(a.uid(), b.uid());
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn fingerprint_distinguishes_payloads() {
    let a = Document::builder().with_kwarg("x", json!(1)).build();
    let b = Document::builder().with_kwarg("x", json!(2)).build();
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn kwargs_to_attributes_folds_payload_into_metadata() {
    let doc = Document::builder()
        .with_arg(json!("first"))
        .with_kwarg("beam_x", json!(733.1))
        .build();

    let shuttled = doc.kwargs_to_attributes();
    assert!(shuttled.args().is_empty());
    assert!(shuttled.kwargs().is_empty());
    assert_eq!(shuttled.attributes().get("beam_x"), Some(&json!(733.1)));
    assert_eq!(shuttled.attributes().get("arg_0000"), Some(&json!("first")));
}

#[test]
fn attributes_as_kwargs_exposes_metadata_as_payload() {
    let doc = Document::builder()
        .with_attribute("wavelength", json!(1.54))
        .build();

    let exposed = doc.attributes_as_kwargs();
    assert_eq!(exposed.kwargs().get("wavelength"), Some(&json!(1.54)));
    assert!(exposed.attributes().is_empty());
}

#[test]
fn merge_covers_provenance_and_checkpoint_maps() {
    let mut left = Document::empty();
    left.add_provenance([("origin".to_string(), json!("detector-a"))])
        .add_checkpoint([("frame".to_string(), json!(3))]);

    let mut right = Document::empty();
    right
        .add_provenance([("origin".to_string(), json!("detector-b"))])
        .add_checkpoint([("offset".to_string(), json!(12))]);

    let merged = left.merge([&right]);
    assert_eq!(merged.provenance().get("origin"), Some(&json!("detector-b")));
    assert_eq!(merged.checkpoint().get("frame"), Some(&json!(3)));
    assert_eq!(merged.checkpoint().get("offset"), Some(&json!(12)));
}

#[test]
fn merged_statistics_are_last_writer_wins() {
    use beamflow::document::{RunStatistics, RunStatus};

    let mut base = Document::empty();
    base.add_statistics(&RunStatistics {
        status: Some(RunStatus::Success),
        runtime: Some(0.5),
        ..RunStatistics::default()
    });

    let mut newer = Document::empty();
    newer.add_statistics(&RunStatistics {
        status: Some(RunStatus::Failure),
        error_message: Some("boom".to_string()),
        ..RunStatistics::default()
    });

    let merged = base.merge([&newer]);
    assert_eq!(merged.statistics().status, Some(RunStatus::Failure));
    // Fields the newer document left unset survive from the older one.
    assert_eq!(merged.statistics().runtime, Some(0.5));
    assert_eq!(merged.statistics().error_message.as_deref(), Some("boom"));
}

proptest! {
    /// For every key present in both documents, merge takes the right-hand
    /// value; args always concatenate.
    #[test]
    fn merge_right_bias_holds_for_arbitrary_kwargs(
        left in proptest::collection::hash_map("[a-d]{1,2}", any::<i64>(), 0..6),
        right in proptest::collection::hash_map("[a-d]{1,2}", any::<i64>(), 0..6),
        left_args in proptest::collection::vec(any::<i64>(), 0..4),
        right_args in proptest::collection::vec(any::<i64>(), 0..4),
    ) {
        let mut l = Document::empty();
        l.add_args(left_args.iter().map(|v| json!(v)));
        l.add_kwargs(left.iter().map(|(k, v)| (k.clone(), json!(v))));

        let mut r = Document::empty();
        r.add_args(right_args.iter().map(|v| json!(v)));
        r.add_kwargs(right.iter().map(|(k, v)| (k.clone(), json!(v))));

        let merged = l.merge([&r]);

        prop_assert_eq!(merged.args().len(), left_args.len() + right_args.len());
        for (key, value) in &right {
            prop_assert_eq!(merged.kwargs().get(key), Some(&json!(value)));
        }
        for (key, value) in &left {
            if !right.contains_key(key) {
                prop_assert_eq!(merged.kwargs().get(key), Some(&json!(value)));
            }
        }
    }

    /// Fingerprints are insensitive to kwarg insertion order.
    #[test]
    fn fingerprint_is_order_insensitive(
        entries in proptest::collection::hash_map("[a-f]{1,3}", any::<i64>(), 1..6),
    ) {
        let pairs: Vec<(String, Value)> = entries
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        let forward: FxHashMap<String, Value> = pairs.iter().cloned().collect();
        let reversed: FxHashMap<String, Value> = pairs.iter().rev().cloned().collect();

        let a = Document::new(Vec::new(), forward, Default::default());
        let b = Document::new(Vec::new(), reversed, Default::default());
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
