//! Payment provider webhook signature verification.
//!
//! The provider signs the raw request body with HMAC-SHA256 over
//! `"{timestamp}.{body}"` and sends `t=<unix ts>,v1=<hex digest>` in the
//! signature header. Timestamps older than the tolerance are rejected to
//! blunt replay.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now_ts: i64) -> Result<()> {
    let (timestamp, signatures) = parse_header(header)?;

    if (now_ts - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::InvalidSignature);
    }

    let mut signed_payload = format!("{timestamp}.").into_bytes();
    signed_payload.extend_from_slice(payload);

    for candidate in signatures {
        let Ok(candidate) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::InvalidSignature)?;
        mac.update(&signed_payload);
        if mac.verify_slice(&candidate).is_ok() {
            return Ok(());
        }
    }
    Err(AppError::InvalidSignature)
}

fn parse_header(header: &str) -> Result<(i64, Vec<&str>)> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    match (timestamp, signatures.is_empty()) {
        (Some(ts), false) => Ok((ts, signatures)),
        _ => Err(AppError::InvalidSignature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let ts = 1_700_000_000;
        let header = format!("t={ts},v1={}", sign(payload, SECRET, ts));
        assert!(verify_signature(payload, &header, SECRET, ts).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let ts = 1_700_000_000;
        let header = format!("t={ts},v1={}", sign(payload, "wrong_secret", ts));
        assert!(verify_signature(payload, &header, SECRET, ts).is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let tampered = br#"{"type":"payment_intent.succeeded","amount":0}"#;
        let ts = 1_700_000_000;
        let header = format!("t={ts},v1={}", sign(payload, SECRET, ts));
        assert!(verify_signature(tampered, &header, SECRET, ts).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = br#"{}"#;
        let ts = 1_700_000_000;
        let header = format!("t={ts},v1={}", sign(payload, SECRET, ts));
        let now = ts + SIGNATURE_TOLERANCE_SECS + 1;
        assert!(verify_signature(payload, &header, SECRET, now).is_err());
    }

    #[test]
    fn test_second_scheme_entry_accepted() {
        // Providers may send multiple v1 entries during secret rotation.
        let payload = br#"{}"#;
        let ts = 1_700_000_000;
        let header = format!(
            "t={ts},v1={},v1={}",
            sign(payload, "old_secret", ts),
            sign(payload, SECRET, ts)
        );
        assert!(verify_signature(payload, &header, SECRET, ts).is_ok());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature(b"{}", "v1=abcdef", SECRET, 0).is_err());
        assert!(verify_signature(b"{}", "t=123", SECRET, 123).is_err());
        assert!(verify_signature(b"{}", "", SECRET, 0).is_err());
    }
}
