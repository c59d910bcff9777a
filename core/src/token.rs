use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT bearer token without verifying it.
///
/// Bearer tokens are opaque to the client; this only recovers an expiry
/// hint when the login response did not include `expires_at`. Returns
/// `None` for anything that is not a JWT with a numeric `exp`.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    if token.split('.').count() != 3 {
        return None;
    }

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    let exp = data.claims.exp?;
    Utc.timestamp_opt(exp, 0).single()
}

/// Read a server timestamp: RFC 3339, `YYYY-MM-DD HH:MM:SS` taken as UTC,
/// or epoch seconds as a number or numeric string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(naive.and_utc());
            }
            let secs = s.parse::<i64>().ok()?;
            Utc.timestamp_opt(secs, 0).single()
        }
        _ => None,
    }
}
