use std::collections::BTreeMap;

use serde_json::json;
use trustmeta_canonical::{
    encode, CanonicalizationError, Canonicalizer, EncodeLimits, Value, WriteSink,
};

fn canonical(json: serde_json::Value) -> String {
    let value = Value::from_json(&json).unwrap();
    String::from_utf8(encode(&value).unwrap()).unwrap()
}

#[test]
fn mapping_keys_are_sorted() {
    assert_eq!(canonical(json!({"y": 2, "x": 3})), r#"{"x":3,"y":2}"#);
}

#[test]
fn key_order_is_bytewise_not_locale_aware() {
    let value = json!({"b": 1, "B": 2, "a": 3, "é": 4, "_": 5, "aa": 6});
    assert_eq!(
        canonical(value),
        r#"{"B":2,"_":5,"a":3,"aa":6,"b":1,"é":4}"#
    );
}

#[test]
fn only_quote_and_backslash_are_escaped() {
    assert_eq!(canonical(json!("a\"b\\c")), r#""a\"b\\c""#);

    let raw = "tab\tnl\nbell\u{7}ünï☃";
    let bytes = encode(&Value::from(raw)).unwrap();
    let mut expected = b"\"".to_vec();
    expected.extend_from_slice(raw.as_bytes());
    expected.push(b'"');
    assert_eq!(bytes, expected);
}

#[test]
fn empty_containers() {
    assert_eq!(canonical(json!([])), "[]");
    assert_eq!(canonical(json!({})), "{}");
    assert_eq!(canonical(json!("")), r#""""#);
}

#[test]
fn nesting_and_sequences_keep_order() {
    assert_eq!(canonical(json!({"A": [99]})), r#"{"A":[99]}"#);
    assert_eq!(canonical(json!([1, 2, 3])), "[1,2,3]");
    assert_eq!(canonical(json!([3, 1, 2])), "[3,1,2]");
    assert_eq!(
        canonical(json!({"outer": {"b": [true, false, null], "a": {}}})),
        r#"{"outer":{"a":{},"b":[true,false,null]}}"#
    );
}

#[test]
fn integers_are_exact() {
    assert_eq!(encode(&Value::from(-0i64)).unwrap(), b"0");
    assert_eq!(encode(&Value::Integer(-0)).unwrap(), b"0");
    assert_eq!(
        canonical(json!(u64::MAX)),
        "18446744073709551615"
    );
    assert_eq!(canonical(json!(i64::MIN)), "-9223372036854775808");
    assert_eq!(
        encode(&Value::Integer(i128::MAX)).unwrap(),
        b"170141183460469231731687303715884105727"
    );
    assert_eq!(canonical(json!(-7)), "-7");
}

#[test]
fn integers_past_64_bits_keep_full_precision() {
    let parse = |text: &str| -> Value {
        let json: serde_json::Value = serde_json::from_str(text).unwrap();
        Value::from_json(&json).unwrap()
    };
    assert_eq!(
        encode(&parse("18446744073709551616")).unwrap(),
        b"18446744073709551616"
    );
    assert_eq!(
        encode(&parse("-170141183460469231731687303715884105728")).unwrap(),
        b"-170141183460469231731687303715884105728"
    );
    assert_eq!(
        parse("-170141183460469231731687303715884105728"),
        Value::Integer(i128::MIN)
    );
}

#[test]
fn floats_are_rejected() {
    let err = Value::from_json(&json!({"expires": 1.5})).unwrap_err();
    assert!(matches!(err, CanonicalizationError::ValueKind { ref path, .. } if path == "$.expires"));

    let err = Canonicalizer::default()
        .encode_json(&json!([0, 1e100]))
        .unwrap_err();
    assert!(matches!(err, CanonicalizationError::ValueKind { ref path, .. } if path == "$[1]"));
}

#[test]
fn encoding_is_deterministic_regardless_of_insertion_order() {
    let mut forward = BTreeMap::new();
    let mut backward = BTreeMap::new();
    let keys = ["targets", "snapshot", "root", "timestamp"];
    for (idx, key) in keys.iter().enumerate() {
        forward.insert(key.to_string(), Value::from(idx));
    }
    for (idx, key) in keys.iter().enumerate().rev() {
        backward.insert(key.to_string(), Value::from(idx));
    }
    let a = encode(&Value::Mapping(forward)).unwrap();
    let b = encode(&Value::Mapping(backward)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, encode(&Value::from_json(&serde_json::from_slice(&a).unwrap()).unwrap()).unwrap());
}

#[test]
fn no_whitespace_is_emitted() {
    let bytes = canonical(json!({
        "signed": {"keys": {"k1": {"keytype": "ed25519"}}, "roles": [1, 2]},
        "signatures": []
    }));
    assert!(!bytes.contains(' '));
    assert!(!bytes.contains('\n'));
}

#[test]
fn depth_limit_is_enforced_on_encode() {
    let mut value = Value::from(1);
    for _ in 0..10 {
        value = Value::Sequence(vec![value]);
    }
    let canonicalizer = Canonicalizer::new(EncodeLimits::default().with_max_depth(9));
    let err = canonicalizer.encode(&value).unwrap_err();
    assert!(matches!(err, CanonicalizationError::DepthExceeded { max: 9, .. }));

    let roomy = Canonicalizer::new(EncodeLimits::default().with_max_depth(10));
    assert_eq!(roomy.encode(&value).unwrap(), b"[[[[[[[[[[1]]]]]]]]]]");
}

#[test]
fn write_sink_matches_buffered_output() {
    let value = Value::from_json(&json!({"b": ["x\"y", 2], "a": null})).unwrap();
    let mut sink = WriteSink::new(Vec::new());
    Canonicalizer::default().encode_to(&value, &mut sink).unwrap();
    assert_eq!(sink.into_inner().unwrap(), encode(&value).unwrap());
}

#[test]
fn encode_serialize_goes_through_the_same_grammar() {
    #[derive(serde::Serialize)]
    struct Version {
        major: u32,
        minor: u32,
        fix: u32,
    }

    let bytes = Canonicalizer::default()
        .encode_serialize(&Version {
            major: 1,
            minor: 0,
            fix: 2,
        })
        .unwrap();
    assert_eq!(bytes, br#"{"fix":2,"major":1,"minor":0}"#);
}
