//! Shapes of the top-level role metadata and the pieces they are built from.
//!
//! The catalog is assembled once on first use and is immutable afterwards.
//! Object shapes allow fields they do not list, so newer metadata with
//! additional fields keeps validating against older clients.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use trustmeta_canonical::{Path, Value};

use crate::shape::{Shape, ShapeError};
use crate::signable::Signable;

/// Largest value of a unix timestamp field (the 32-bit signed limit).
pub const UNIX_TIMESTAMP_MAX: i128 = 2_147_483_647;

/// Format of every `expires` field.
pub const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Shape catalog for metadata documents.
#[derive(Debug)]
pub struct Catalog {
    /// `YYYY-MM-DDTHH:MM:SSZ`.
    pub iso8601_datetime: Shape,
    /// Seconds since the epoch, `0..=2147483647`.
    pub unix_timestamp: Shape,
    /// Hex digest text.
    pub hash: Shape,
    /// `{"sha256": "<hex>", ...}`.
    pub hash_dict: Shape,
    /// Hex text.
    pub hex: Shape,
    /// Key identifier.
    pub keyid: Shape,
    /// List of key identifiers.
    pub keyids: Shape,
    /// Signature method name.
    pub sig_method: Shape,
    /// Relative path.
    pub relpath: Shape,
    /// List of relative paths.
    pub relpaths: Shape,
    /// Absolute path.
    pub path: Shape,
    /// List of absolute paths.
    pub paths: Shape,
    /// URL.
    pub url: Shape,
    /// `{"major", "minor", "fix"}` version triple.
    pub version: Shape,
    /// Metadata version number.
    pub metadata_version: Shape,
    /// Length in bytes.
    pub length: Shape,
    /// Name.
    pub name: Shape,
    /// List of names.
    pub names: Shape,
    /// Supported hash algorithm names.
    pub hash_algorithms: Shape,
    /// Boolean.
    pub boolean: Shape,
    /// Signature threshold.
    pub threshold: Shape,
    /// Role name.
    pub rolename: Shape,
    /// Minimum RSA modulus size.
    pub rsa_key_bits: Shape,
    /// Number of hashed bins.
    pub num_bins: Shape,
    /// Public and optional private key material.
    pub keyval: Shape,
    /// Supported key types.
    pub keytype: Shape,
    /// Key as stored in metadata.
    pub key: Shape,
    /// Key carrying its key id.
    pub anykey: Shape,
    /// List of [`Catalog::anykey`].
    pub anykey_list: Shape,
    /// RSA key.
    pub rsa_key: Shape,
    /// Ed25519 key.
    pub ed25519_key: Shape,
    /// Length, hashes and optional version/custom data of a file.
    pub fileinfo: Shape,
    /// `{"version": n}`.
    pub versioninfo: Shape,
    /// Relative path to [`Catalog::versioninfo`].
    pub version_dict: Shape,
    /// Relative path to [`Catalog::fileinfo`].
    pub file_dict: Shape,
    /// A file path paired with its file info.
    pub targetinfo: Shape,
    /// List of [`Catalog::targetinfo`].
    pub targetinfos: Shape,
    /// Signature record.
    pub signature: Shape,
    /// List of signature records.
    pub signatures: Shape,
    /// Signable envelope with any payload.
    pub signable: Shape,
    /// Key id to key.
    pub key_dict: Shape,
    /// Key id to anything.
    pub key_db: Shape,
    /// Hex prefix of a path hash.
    pub path_hash_prefix: Shape,
    /// List of path hash prefixes.
    pub path_hash_prefixes: Shape,
    /// Delegated or top-level role entry.
    pub role: Shape,
    /// Role name to role.
    pub role_dict: Shape,
    /// Ordered roles.
    pub role_list: Shape,
    /// Keys and roles delegated by a targets role.
    pub delegations: Shape,
    /// Compression extension (`""` or `"gz"`).
    pub compression: Shape,
    /// List of compression extensions.
    pub compressions: Shape,
    /// Free-form custom data.
    pub custom: Shape,
    /// Relative path to custom data.
    pub path_fileinfo: Shape,
    /// Repository mirror.
    pub mirror: Shape,
    /// Mirror name to mirror.
    pub mirror_dict: Shape,
    /// Root role payload.
    pub root: Shape,
    /// Targets role payload.
    pub targets: Shape,
    /// Snapshot role payload.
    pub snapshot: Shape,
    /// Timestamp role payload.
    pub timestamp: Shape,
    /// Mirror list payload.
    pub mirrorlist: Shape,
    /// Any of the role payloads.
    pub any_role: Shape,
}

impl Catalog {
    fn build() -> Self {
        let iso8601_datetime = Shape::pattern(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z");
        let hash = Shape::pattern(r"[a-fA-F0-9]+");
        let hash_dict = Shape::dict_of(Shape::AnyString, hash.clone());
        let hex = Shape::pattern(r"[a-fA-F0-9]+");
        let keyid = hash.clone();
        let keyids = Shape::list_of(keyid.clone());
        let relpath = Shape::AnyString;
        let relpaths = Shape::list_of(relpath.clone());
        let path = Shape::AnyString;
        let metadata_version = Shape::integer_at_least(0);
        let length = Shape::integer_at_least(0);
        let name = Shape::AnyString;
        let hash_algorithms = Shape::list_of(Shape::one_of(
            ["md5", "sha1", "sha224", "sha256", "sha384", "sha512"].map(Shape::exact),
        ));
        let threshold = Shape::integer_at_least(1);
        let rolename = Shape::AnyString;
        let keyval = Shape::object(
            "KEYVAL",
            [
                ("public", Shape::AnyString),
                ("private", Shape::optional(Shape::AnyString)),
            ],
        );
        let keytype = Shape::one_of([Shape::exact("rsa"), Shape::exact("ed25519")]);
        let key = Shape::object(
            "KEY",
            [
                ("keytype", Shape::AnyString),
                ("keyval", keyval.clone()),
                ("expires", Shape::optional(iso8601_datetime.clone())),
            ],
        );
        let anykey = Shape::object(
            "ANYKEY",
            [
                ("keytype", keytype.clone()),
                ("keyid", keyid.clone()),
                (
                    "keyid_hash_algorithms",
                    Shape::optional(hash_algorithms.clone()),
                ),
                ("keyval", keyval.clone()),
                ("expires", Shape::optional(iso8601_datetime.clone())),
            ],
        );
        let typed_key = |name: &str, keytype: &str| {
            Shape::object(
                name,
                [
                    ("keytype", Shape::exact(keytype)),
                    ("keyid", keyid.clone()),
                    (
                        "keyid_hash_algorithms",
                        Shape::optional(hash_algorithms.clone()),
                    ),
                    ("keyval", keyval.clone()),
                ],
            )
        };
        let rsa_key = typed_key("RSAKEY", "rsa");
        let ed25519_key = typed_key("ED25519KEY", "ed25519");
        let custom = Shape::object("CUSTOM", Vec::<(String, Shape)>::new());
        let fileinfo = Shape::object(
            "FILEINFO",
            [
                ("length", length.clone()),
                ("hashes", hash_dict.clone()),
                ("version", Shape::optional(metadata_version.clone())),
                ("custom", Shape::optional(custom.clone())),
            ],
        );
        let versioninfo = Shape::object("VERSIONINFO", [("version", metadata_version.clone())]);
        let version_dict = Shape::dict_of(relpath.clone(), versioninfo.clone());
        let file_dict = Shape::dict_of(relpath.clone(), fileinfo.clone());
        let targetinfo = Shape::object(
            "TARGETINFO",
            [("filepath", relpath.clone()), ("fileinfo", fileinfo.clone())],
        );
        let signature = Shape::object(
            "SIGNATURE",
            [
                ("keyid", keyid.clone()),
                ("method", Shape::AnyString),
                ("sig", hex.clone()),
            ],
        );
        let signatures = Shape::list_of(signature.clone());
        let signable = Shape::object(
            "SIGNABLE",
            [("signed", Shape::Any), ("signatures", signatures.clone())],
        );
        let key_dict = Shape::dict_of(keyid.clone(), key.clone());
        let path_hash_prefix = hex.clone();
        let path_hash_prefixes = Shape::list_of(path_hash_prefix.clone());
        let role = Shape::object(
            "ROLE",
            [
                ("name", Shape::optional(rolename.clone())),
                ("keyids", keyids.clone()),
                ("threshold", threshold.clone()),
                ("backtrack", Shape::optional(Shape::Boolean)),
                ("paths", Shape::optional(relpaths.clone())),
                (
                    "path_hash_prefixes",
                    Shape::optional(path_hash_prefixes.clone()),
                ),
            ],
        );
        let role_dict = Shape::dict_of(rolename.clone(), role.clone());
        let role_list = Shape::list_of(role.clone());
        let delegations = Shape::object(
            "DELEGATIONS",
            [("keys", key_dict.clone()), ("roles", role_list.clone())],
        );
        let compression = Shape::one_of([Shape::exact(""), Shape::exact("gz")]);
        let compressions = Shape::list_of(compression.clone());
        let mirror = Shape::object(
            "MIRROR",
            [
                ("url_prefix", Shape::AnyString),
                ("metadata_path", relpath.clone()),
                ("targets_path", relpath.clone()),
                ("confined_target_dirs", relpaths.clone()),
                ("custom", Shape::optional(custom.clone())),
            ],
        );

        let root = Shape::object(
            "ROOT",
            [
                ("_type", Shape::exact(Role::Root.type_name())),
                ("version", metadata_version.clone()),
                ("consistent_snapshot", Shape::Boolean),
                ("compression_algorithms", compressions.clone()),
                ("expires", iso8601_datetime.clone()),
                ("keys", key_dict.clone()),
                ("roles", role_dict.clone()),
            ],
        );
        let targets = Shape::object(
            "TARGETS",
            [
                ("_type", Shape::exact(Role::Targets.type_name())),
                ("version", metadata_version.clone()),
                ("expires", iso8601_datetime.clone()),
                ("targets", file_dict.clone()),
                ("delegations", Shape::optional(delegations.clone())),
            ],
        );
        let meta_role = |name: &str, role: Role| {
            Shape::object(
                name,
                [
                    ("_type", Shape::exact(role.type_name())),
                    ("version", metadata_version.clone()),
                    ("expires", iso8601_datetime.clone()),
                    ("meta", version_dict.clone()),
                ],
            )
        };
        let snapshot = meta_role("SNAPSHOT", Role::Snapshot);
        let timestamp = meta_role("TIMESTAMP", Role::Timestamp);
        let mirrorlist = Shape::object(
            "MIRRORLIST",
            [
                ("_type", Shape::exact(Role::Mirrors.type_name())),
                ("version", metadata_version.clone()),
                ("expires", iso8601_datetime.clone()),
                ("mirrors", Shape::list_of(mirror.clone())),
            ],
        );
        let any_role = Shape::one_of([
            root.clone(),
            targets.clone(),
            snapshot.clone(),
            timestamp.clone(),
            mirrorlist.clone(),
        ]);

        Self {
            unix_timestamp: Shape::integer(0, UNIX_TIMESTAMP_MAX),
            hash_dict,
            sig_method: Shape::AnyString,
            paths: Shape::list_of(path.clone()),
            path,
            url: Shape::AnyString,
            version: Shape::object(
                "VERSION",
                [
                    ("major", Shape::integer_at_least(0)),
                    ("minor", Shape::integer_at_least(0)),
                    ("fix", Shape::integer_at_least(0)),
                ],
            ),
            length,
            names: Shape::list_of(name.clone()),
            name,
            hash_algorithms,
            boolean: Shape::Boolean,
            threshold,
            rolename,
            rsa_key_bits: Shape::integer_at_least(2048),
            num_bins: Shape::integer_at_least(1),
            keyval,
            keytype,
            key,
            anykey_list: Shape::list_of(anykey.clone()),
            anykey,
            rsa_key,
            ed25519_key,
            fileinfo,
            versioninfo,
            version_dict,
            file_dict,
            targetinfos: Shape::list_of(targetinfo.clone()),
            targetinfo,
            signature,
            signatures,
            signable,
            key_db: Shape::dict_of(keyid.clone(), Shape::Any),
            key_dict,
            keyids,
            keyid,
            hash,
            hex,
            path_hash_prefix,
            path_hash_prefixes,
            role,
            role_dict,
            role_list,
            delegations,
            compression,
            compressions,
            path_fileinfo: Shape::dict_of(relpath.clone(), custom.clone()),
            custom,
            relpaths,
            relpath,
            mirror_dict: Shape::dict_of(Shape::AnyString, mirror.clone()),
            mirror,
            metadata_version,
            iso8601_datetime,
            root,
            targets,
            snapshot,
            timestamp,
            mirrorlist,
            any_role,
        }
    }

    /// Shape of the payload of `role`.
    pub fn role(&self, role: Role) -> &Shape {
        match role {
            Role::Root => &self.root,
            Role::Targets => &self.targets,
            Role::Snapshot => &self.snapshot,
            Role::Timestamp => &self.timestamp,
            Role::Mirrors => &self.mirrorlist,
        }
    }
}

/// The shared catalog.
pub fn catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(Catalog::build)
}

/// Top-level metadata roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Root of trust: keys and thresholds of the other roles.
    Root,
    /// Target files and delegations.
    Targets,
    /// Versions of all other metadata.
    Snapshot,
    /// Freshness of the snapshot.
    Timestamp,
    /// Mirror list.
    Mirrors,
}

impl Role {
    /// All roles, in catalog order.
    pub const ALL: [Role; 5] = [
        Role::Root,
        Role::Targets,
        Role::Snapshot,
        Role::Timestamp,
        Role::Mirrors,
    ];

    /// Value of the payload's `_type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            Role::Root => "Root",
            Role::Targets => "Targets",
            Role::Snapshot => "Snapshot",
            Role::Timestamp => "Timestamp",
            Role::Mirrors => "Mirrors",
        }
    }

    /// Shape of this role's payload.
    pub fn shape(&self) -> &'static Shape {
        catalog().role(*self)
    }

    /// Role named by the payload's `_type` field, if any.
    pub fn detect(payload: &Value) -> Option<Role> {
        let type_name = payload.get("_type")?.as_str()?;
        Role::ALL.into_iter().find(|r| r.type_name() == type_name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Unknown role name.
#[derive(thiserror::Error, Debug)]
#[error("unknown role '{0}' (expected root, targets, snapshot, timestamp or mirrors)")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.type_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Checks `payload` against the shape of `role`.
pub fn check_role(payload: &Value, role: Role) -> Result<(), ShapeError> {
    role.shape().check_match(payload)
}

/// Detects the role from `_type` and checks the payload against it.
pub fn check_any_role(payload: &Value) -> Result<Role, ShapeError> {
    let role = Role::detect(payload).ok_or_else(|| {
        ShapeError::mismatch(
            &Path::root().push_field("_type"),
            "one of Root, Targets, Snapshot, Timestamp, Mirrors",
            payload
                .get("_type")
                .map(|v| match v.as_str() {
                    Some(s) => format!("'{}'", s),
                    None => v.kind().to_string(),
                })
                .unwrap_or_else(|| "nothing".to_string()),
        )
    })?;
    check_role(payload, role)?;
    Ok(role)
}

/// Checks the signed payload of `signable` against `role`, or against the
/// role named by its `_type` when `role` is `None`.
pub fn check_signable(signable: &Signable, role: Option<Role>) -> Result<Role, ShapeError> {
    let result = match role {
        Some(role) => check_role(signable.signed(), role).map(|_| role),
        None => check_any_role(signable.signed()),
    };
    result.map_err(prefix_signed)
}

fn prefix_signed(err: ShapeError) -> ShapeError {
    let rebase = |path: String| path.replacen('$', "$.signed", 1);
    match err {
        ShapeError::Mismatch {
            path,
            expected,
            found,
        } => ShapeError::Mismatch {
            path: rebase(path),
            expected,
            found,
        },
        ShapeError::MissingField {
            path,
            object,
            field,
        } => ShapeError::MissingField {
            path: rebase(path),
            object,
            field,
        },
        ShapeError::UnexpectedField { path, field } => ShapeError::UnexpectedField {
            path: rebase(path),
            field,
        },
        ShapeError::NoAlternative { path, alternatives } => ShapeError::NoAlternative {
            path: rebase(path),
            alternatives,
        },
    }
}

/// Parses the `expires` field of a role payload.
pub fn expires_at(payload: &Value) -> Result<DateTime<Utc>, ShapeError> {
    let path = Path::root().push_field("expires");
    let raw = payload
        .get("expires")
        .ok_or_else(|| ShapeError::MissingField {
            path: Path::root().to_string(),
            object: "role metadata".into(),
            field: "expires".into(),
        })?;
    let text = raw
        .as_str()
        .ok_or_else(|| ShapeError::mismatch(&path, "an ISO 8601 datetime", raw.kind().to_string()))?;
    NaiveDateTime::parse_from_str(text, ISO8601_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ShapeError::mismatch(&path, "an ISO 8601 datetime", format!("'{}' ({})", text, e)))
}

/// True when the payload's `expires` is at or before `now`.
pub fn is_expired(payload: &Value, now: DateTime<Utc>) -> Result<bool, ShapeError> {
    Ok(expires_at(payload)? <= now)
}
