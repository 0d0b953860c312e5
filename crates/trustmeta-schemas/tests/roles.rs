use chrono::{TimeZone, Utc};
use serde_json::json;
use trustmeta_canonical::Value;
use trustmeta_schemas::{
    catalog, check_any_role, check_role, check_signable, expires_at, is_expired, wrap, Role,
    ShapeError,
};

fn value(json: serde_json::Value) -> Value {
    Value::from_json(&json).unwrap()
}

fn root_payload() -> Value {
    value(json!({
        "_type": "Root",
        "version": 1,
        "consistent_snapshot": false,
        "compression_algorithms": ["gz"],
        "expires": "2030-01-01T00:00:00Z",
        "keys": {
            "4e777de0": {
                "keytype": "ed25519",
                "keyval": {"public": "72378e5b"}
            }
        },
        "roles": {
            "root": {"keyids": ["4e777de0"], "threshold": 1},
            "targets": {"keyids": ["4e777de0"], "threshold": 1},
            "snapshot": {"keyids": ["4e777de0"], "threshold": 1},
            "timestamp": {"keyids": ["4e777de0"], "threshold": 1}
        }
    }))
}

fn targets_payload() -> Value {
    value(json!({
        "_type": "Targets",
        "version": 4,
        "expires": "2029-06-30T12:00:00Z",
        "targets": {
            "pkg/app-1.0.tar.gz": {
                "length": 31337,
                "hashes": {"sha256": "a1b2c3"},
                "custom": {"mode": "0644"}
            }
        },
        "delegations": {
            "keys": {},
            "roles": [
                {"name": "unclaimed", "keyids": [], "threshold": 1, "paths": ["pkg/*"]}
            ]
        }
    }))
}

#[test]
fn accepts_well_formed_roles() {
    check_role(&root_payload(), Role::Root).unwrap();
    check_role(&targets_payload(), Role::Targets).unwrap();

    let snapshot = value(json!({
        "_type": "Snapshot",
        "version": 9,
        "expires": "2029-01-01T00:00:00Z",
        "meta": {"targets.json": {"version": 4}}
    }));
    assert_eq!(check_any_role(&snapshot).unwrap(), Role::Snapshot);

    let mirrors = value(json!({
        "_type": "Mirrors",
        "version": 1,
        "expires": "2029-01-01T00:00:00Z",
        "mirrors": [{
            "url_prefix": "https://mirror.example.org",
            "metadata_path": "metadata",
            "targets_path": "targets",
            "confined_target_dirs": [""]
        }]
    }));
    assert_eq!(check_any_role(&mirrors).unwrap(), Role::Mirrors);
}

#[test]
fn reports_the_location_of_shape_errors() {
    let mut payload = root_payload();
    if let Value::Mapping(map) = &mut payload {
        if let Some(Value::Mapping(roles)) = map.get_mut("roles") {
            roles.insert(
                "root".into(),
                value(json!({"keyids": ["4e777de0"], "threshold": 0})),
            );
        }
    }
    let err = check_role(&payload, Role::Root).unwrap_err();
    assert!(
        matches!(err, ShapeError::Mismatch { ref path, .. } if path == "$.roles.root.threshold"),
        "{err}"
    );
}

#[test]
fn rejects_wrong_type_tag_and_unknown_roles() {
    let err = check_role(&root_payload(), Role::Targets).unwrap_err();
    assert!(matches!(err, ShapeError::Mismatch { ref path, .. } if path == "$._type"));

    let err = check_any_role(&value(json!({"_type": "Release"}))).unwrap_err();
    assert!(err.to_string().contains("'Release'"));
    assert!(check_any_role(&value(json!([]))).is_err());
}

#[test]
fn role_names_parse_case_insensitively() {
    assert_eq!("timestamp".parse::<Role>().unwrap(), Role::Timestamp);
    assert_eq!("Root".parse::<Role>().unwrap(), Role::Root);
    assert!("release".parse::<Role>().is_err());
    assert_eq!(Role::detect(&targets_payload()), Some(Role::Targets));
}

#[test]
fn primitive_shapes_follow_metadata_conventions() {
    let c = catalog();
    assert!(c.iso8601_datetime.matches(&Value::from("2015-10-21T13:20:00Z")));
    assert!(!c.iso8601_datetime.matches(&Value::from("2015-10-21T13:20:00+00:00")));
    assert!(c.unix_timestamp.matches(&Value::from(2_147_483_647u32)));
    assert!(!c.unix_timestamp.matches(&Value::from(2_147_483_648u32)));
    assert!(c.rsa_key_bits.matches(&Value::from(4096)));
    assert!(!c.rsa_key_bits.matches(&Value::from(1024)));
    assert!(c.hash_algorithms.matches(&value(json!(["sha256", "sha512"]))));
    assert!(!c.hash_algorithms.matches(&value(json!(["blake2"]))));
    assert!(c.ed25519_key.matches(&value(json!({
        "keytype": "ed25519",
        "keyid": "abcd",
        "keyval": {"public": "ff"}
    }))));
    assert!(!c.rsa_key.matches(&value(json!({
        "keytype": "ed25519",
        "keyid": "abcd",
        "keyval": {"public": "ff"}
    }))));
}

#[test]
fn envelope_shape_is_checked_with_signed_prefix() {
    let mut bad = targets_payload();
    if let Value::Mapping(map) = &mut bad {
        map.insert("version".into(), Value::from(-1));
    }
    let envelope = wrap(bad).unwrap();
    let err = check_signable(&envelope, None).unwrap_err();
    assert!(
        matches!(err, ShapeError::Mismatch { ref path, .. } if path == "$.signed.version"),
        "{err}"
    );

    let envelope = wrap(root_payload()).unwrap();
    assert_eq!(check_signable(&envelope, Some(Role::Root)).unwrap(), Role::Root);
    assert!(catalog().signable.matches(&Value::from(envelope)));
}

#[test]
fn expiry_is_parsed_from_iso8601() {
    let payload = root_payload();
    let expected = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(expires_at(&payload).unwrap(), expected);
    assert!(!is_expired(&payload, Utc.with_ymd_and_hms(2029, 12, 31, 23, 59, 59).unwrap()).unwrap());
    assert!(is_expired(&payload, expected).unwrap());

    let err = expires_at(&value(json!({"expires": "tomorrow"}))).unwrap_err();
    assert!(matches!(err, ShapeError::Mismatch { ref path, .. } if path == "$.expires"));
    assert!(matches!(
        expires_at(&value(json!({}))).unwrap_err(),
        ShapeError::MissingField { .. }
    ));
}
