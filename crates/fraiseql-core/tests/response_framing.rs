//! Response framing properties: validity, re-casing, typename injection.

use fraiseql_core::db::RowBytes;
use fraiseql_core::response::build_list_response;
use fraiseql_core::utils::casing::to_camel_case;
use proptest::prelude::*;

/// Strategy: snake_case identifiers as the database produces them.
/// Segments start with a letter so distinct keys stay distinct after
/// camelization.
fn snake_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}(_[a-z][a-z0-9]{0,5}){0,3}"
}

/// Strategy: scalar JSON values including strings needing escapes.
fn scalar_value() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        any::<i64>().prop_map(serde_json::Value::from),
        any::<bool>().prop_map(serde_json::Value::from),
        Just(serde_json::Value::Null),
        "[ -~]{0,12}".prop_map(serde_json::Value::from),
    ]
}

proptest! {
    /// For any set of snake_case rows, the builder emits valid JSON whose
    /// keys are the camelCase forms and whose values survive untouched.
    #[test]
    fn framed_response_is_valid_and_recased(
        rows in proptest::collection::vec(
            proptest::collection::btree_map(snake_key(), scalar_value(), 0..6),
            0..8,
        )
    ) {
        let row_bytes: Vec<RowBytes> = rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> =
                    row.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                RowBytes::new(serde_json::Value::Object(object).to_string())
            })
            .collect();

        let response = build_list_response("items", Some("Item"), row_bytes)
            .expect("framing never fails on valid rows");

        // Property 1: output parses as JSON.
        let parsed: serde_json::Value =
            serde_json::from_slice(response.as_slice()).expect("valid JSON document");
        let array = parsed["data"]["items"].as_array().expect("framed array");
        prop_assert_eq!(array.len(), rows.len());

        for (input, output) in rows.iter().zip(array) {
            let object = output.as_object().expect("row object");

            // Property 2: typename injected on every row object.
            prop_assert_eq!(object.get("__typename"), Some(&serde_json::json!("Item")));

            // Property 3: every snake key is present under its camel form
            // with the identical value.
            for (key, value) in input {
                let camel = to_camel_case(key);
                prop_assert_eq!(
                    object.get(&camel),
                    Some(value),
                    "key {} must surface as {}", key, camel
                );
            }
        }
    }

    /// Casing is a pure ASCII transform: no multi-byte corruption, stable
    /// under repetition.
    #[test]
    fn camelization_is_idempotent(key in snake_key()) {
        let once = to_camel_case(&key);
        let twice = to_camel_case(&once);
        prop_assert_eq!(once, twice);
    }
}

/// Row counts at the upper end of the framing property (spec: ≥10⁵ rows).
#[test]
fn large_row_sets_frame_correctly() {
    let rows: Vec<RowBytes> = (0..120_000)
        .map(|i| RowBytes::new(format!(r#"{{"id": {i}, "row_label": "r{i}"}}"#)))
        .collect();
    let expected_payload: usize = rows.iter().map(RowBytes::len).sum();

    let response = build_list_response("items", Some("Item"), rows).expect("frames");
    assert!(response.len() > expected_payload, "envelope plus typename per row");

    let parsed: serde_json::Value = serde_json::from_slice(response.as_slice()).expect("valid");
    let array = parsed["data"]["items"].as_array().expect("array");
    assert_eq!(array.len(), 120_000);
    assert_eq!(array[119_999]["rowLabel"], "r119999");
}
