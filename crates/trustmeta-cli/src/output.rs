//! Output formatting utilities.

use chrono::{DateTime, Utc};
use serde_json::json;
use trustmeta_schemas::{Role, Signable};

/// Formats an envelope as pretty JSON.
pub fn format_envelope(envelope: &Signable) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(envelope)
}

/// Result of checking one metadata document.
pub struct CheckReport {
    pub role: Role,
    pub expires: DateTime<Utc>,
    pub expired: bool,
    pub signatures: Option<usize>,
}

impl CheckReport {
    pub fn to_json(&self) -> serde_json::Value {
        let mut report = json!({
            "role": self.role.type_name(),
            "expires": self.expires.to_rfc3339(),
            "expired": self.expired,
        });
        if let Some(count) = self.signatures {
            report["signatures"] = json!(count);
        }
        report
    }

    pub fn print_table(&self) {
        println!("{:<12} {}", "ROLE", self.role);
        println!("{:<12} {}", "EXPIRES", self.expires.format("%Y-%m-%dT%H:%M:%SZ"));
        println!(
            "{:<12} {}",
            "STATUS",
            if self.expired { "EXPIRED" } else { "valid" }
        );
        if let Some(count) = self.signatures {
            println!("{:<12} {}", "SIGNATURES", count);
        }
    }
}
