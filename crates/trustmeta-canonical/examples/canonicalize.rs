use serde_json::json;
use trustmeta_canonical::{digest_hex, Canonicalizer, HashAlg, Value};

fn main() {
    let canonicalizer = Canonicalizer::default();
    let payload = json!({
        "_type": "Timestamp",
        "version": 12,
        "expires": "2030-01-01T00:00:00Z",
        "meta": {
            "snapshot.json": {"version": 12}
        }
    });

    let value = match Value::from_json(&payload) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("payload rejected: {}", err);
            std::process::exit(1);
        }
    };

    match (
        canonicalizer.encode(&value),
        digest_hex(&value, HashAlg::Sha256, &canonicalizer),
    ) {
        (Ok(bytes), Ok(digest)) => {
            println!("{}", String::from_utf8_lossy(&bytes));
            println!("sha256 {}", digest);
        }
        (Err(err), _) | (_, Err(err)) => {
            eprintln!("canonicalization failed: {}", err);
            std::process::exit(1);
        }
    }
}
