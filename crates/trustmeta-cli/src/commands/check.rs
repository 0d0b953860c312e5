//! Check command implementation.

use chrono::Utc;
use trustmeta_canonical::EncodeLimits;
use trustmeta_schemas::{check_any_role, check_role, check_signable, expires_at, Role};

use crate::input;
use crate::output::CheckReport;

pub fn run(
    input: Option<String>,
    role: Option<Role>,
    signable: bool,
    strict: bool,
    json_output: bool,
    limits: EncodeLimits,
) -> Result<(), Box<dyn std::error::Error>> {
    let (payload, role, signatures) = if signable {
        let envelope = input::read_signable(input.as_deref(), &limits)?;
        let role = check_signable(&envelope, role).map_err(|e| format!("Invalid metadata: {}", e))?;
        let count = envelope.signatures().len();
        (envelope.into_parts().0, role, Some(count))
    } else {
        let payload = input::read_value(input.as_deref(), &limits)?;
        let role = match role {
            Some(role) => check_role(&payload, role).map(|_| role),
            None => check_any_role(&payload),
        }
        .map_err(|e| format!("Invalid metadata: {}", e))?;
        (payload, role, None)
    };

    let expires = expires_at(&payload)?;
    let report = CheckReport {
        role,
        expires,
        expired: expires <= Utc::now(),
        signatures,
    };
    tracing::debug!(role = %report.role, expired = report.expired, "checked metadata");

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        report.print_table();
    }

    if strict && report.expired {
        return Err(format!("{} metadata expired at {}", report.role, report.expires).into());
    }
    Ok(())
}
