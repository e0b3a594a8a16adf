//! Access token codec. Decodes the claims segment of the compact token for
//! display purposes only; the signature is never checked here and the result
//! must not feed authorization decisions. Every failure degrades to `None` so
//! malformed input can never crash a view.

use base64ct::{Base64Unpadded, Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::types::User;

/// Header used by [`encode_unsigned`]; the codec ignores headers on decode.
const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

/// Decoded token payload. Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Projects the identity shown by the views.
    #[must_use]
    pub fn user(&self) -> User {
        User {
            id: self.sub.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }

    /// Expiry as a wall-clock instant, `None` when it predates the epoch.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        let secs = u64::try_from(self.exp).ok()?;
        UNIX_EPOCH.checked_add(Duration::from_secs(secs))
    }

    /// Whether the claims are expired at `now_millis`.
    #[must_use]
    pub const fn is_expired_at(&self, now_millis: i64) -> bool {
        self.exp.saturating_mul(1000) < now_millis
    }
}

/// Decodes the payload segment of `token` into [`Claims`].
///
/// Accepts both the URL-safe and the standard base64 alphabet, with or without
/// padding. Returns `None` for anything that is not a well-formed token.
#[must_use]
pub fn decode(token: &str) -> Option<Claims> {
    let Some(payload) = token.split('.').nth(1) else {
        debug!("token has no payload segment");
        return None;
    };

    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = match Base64Unpadded::decode_vec(&normalized) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("token payload is not valid base64: {err}");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(claims) => Some(claims),
        Err(err) => {
            debug!("token payload is not a claims record: {err}");
            None
        }
    }
}

/// Fail-closed expiry check against the system clock.
#[must_use]
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_millis())
}

/// Expiry check against an explicit clock. Undecodable tokens are expired.
#[must_use]
pub fn is_expired_at(token: &str, now_millis: i64) -> bool {
    decode(token).map_or(true, |claims| claims.is_expired_at(now_millis))
}

/// Milliseconds since the Unix epoch, saturating on clock skew.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

/// Builds an unsigned `header.payload.` token carrying `claims`.
///
/// Useful for fixtures and local tooling; servers must reject these.
///
/// # Errors
/// Returns an error if the claims cannot be serialized.
pub fn encode_unsigned(claims: &Claims) -> serde_json::Result<String> {
    let header = Base64UrlUnpadded::encode_string(UNSIGNED_HEADER.as_bytes());
    let payload = Base64UrlUnpadded::encode_string(&serde_json::to_vec(claims)?);
    Ok(format!("{header}.{payload}."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64ct::Base64;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn claims(exp: i64) -> Claims {
        Claims {
            sub: "0b7e4c1e-6a43-4f0e-9f4b-2f7d2c2f9a10".to_string(),
            email: "a@b.com".to_string(),
            role: "USER".to_string(),
            iat: exp - 900,
            exp,
        }
    }

    fn token_with_payload(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2ln")
    }

    #[test]
    fn decode_round_trips_claims() -> serde_json::Result<()> {
        let original = claims(1_700_000_900);
        let token = encode_unsigned(&original)?;
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(decode(&token), Some(original));
        Ok(())
    }

    #[test]
    fn decode_handles_non_ascii_payloads() -> serde_json::Result<()> {
        let mut original = claims(1_700_000_900);
        original.email = "zoë@exämple.com".to_string();
        original.role = "管理者".to_string();
        let token = encode_unsigned(&original)?;
        assert_eq!(decode(&token), Some(original));
        Ok(())
    }

    #[test]
    fn decode_accepts_standard_alphabet_and_padding() -> serde_json::Result<()> {
        let original = claims(1_700_000_900);
        let json = serde_json::to_vec(&original)?;

        let padded = token_with_payload(&Base64::encode_string(&json));
        assert_eq!(decode(&padded), Some(original.clone()));

        let url_safe = token_with_payload(&Base64UrlUnpadded::encode_string(&json));
        assert_eq!(decode(&url_safe), Some(original));
        Ok(())
    }

    #[test]
    fn decode_accepts_two_segment_tokens() -> serde_json::Result<()> {
        let original = claims(1_700_000_900);
        let payload = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&original)?);
        assert_eq!(decode(&format!("header.{payload}")), Some(original));
        Ok(())
    }

    #[test]
    fn decode_is_total_over_garbage() {
        let inputs = [
            "",
            ".",
            "..",
            "...",
            "no-dots-at-all",
            "a.b.c",
            "a.%%%%.c",
            "a.@@@@@@@@.c",
            "é.é.é",
            "a.\u{0}\u{1}.c",
            "a.eyJ.c",
            "a.=.c",
            "a.====.c",
            "a.A.c",
        ];
        for input in inputs {
            assert_eq!(decode(input), None, "input {input:?} should not decode");
        }
    }

    #[test]
    fn decode_rejects_non_claims_json() {
        let not_json = Base64UrlUnpadded::encode_string(b"definitely not json");
        assert_eq!(decode(&token_with_payload(&not_json)), None);

        let array = Base64UrlUnpadded::encode_string(b"[1,2,3]");
        assert_eq!(decode(&token_with_payload(&array)), None);

        let missing_exp =
            Base64UrlUnpadded::encode_string(br#"{"sub":"1","email":"a@b.com","role":"USER","iat":1}"#);
        assert_eq!(decode(&token_with_payload(&missing_exp)), None);

        let invalid_utf8 = Base64UrlUnpadded::encode_string(&[0xff, 0xfe, 0xfd]);
        assert_eq!(decode(&token_with_payload(&invalid_utf8)), None);
    }

    #[test]
    fn expiry_matches_claims_for_valid_tokens() -> serde_json::Result<()> {
        for exp_offset in [-3600_i64, -1, 0, 1, 3600] {
            let exp = NOW_MS / 1000 + exp_offset;
            let token = encode_unsigned(&claims(exp))?;
            assert_eq!(
                is_expired_at(&token, NOW_MS),
                exp * 1000 < NOW_MS,
                "offset {exp_offset}"
            );
        }
        Ok(())
    }

    #[test]
    fn expiry_boundary_is_strict() -> serde_json::Result<()> {
        let token = encode_unsigned(&claims(NOW_MS / 1000))?;
        assert!(!is_expired_at(&token, NOW_MS));
        assert!(is_expired_at(&token, NOW_MS + 1));
        Ok(())
    }

    #[test]
    fn undecodable_tokens_are_always_expired() {
        for input in ["", "garbage", "a.b.c", "a.%%%.c"] {
            assert!(is_expired_at(input, 0));
            assert!(is_expired_at(input, i64::MIN));
            assert!(is_expired(input));
        }
    }

    #[test]
    fn extreme_expiry_does_not_overflow() -> serde_json::Result<()> {
        let token = encode_unsigned(&claims(i64::MAX))?;
        assert!(!is_expired_at(&token, NOW_MS));
        let token = encode_unsigned(&claims(i64::MIN + 900))?;
        assert!(is_expired_at(&token, NOW_MS));
        Ok(())
    }

    #[test]
    fn claims_project_user() {
        let claims = claims(1_700_000_900);
        let user = claims.user();
        assert_eq!(user.id, claims.sub);
        assert_eq!(user.email, claims.email);
        assert_eq!(user.role, claims.role);
    }

    #[test]
    fn expires_at_converts_seconds() {
        let claims = claims(1_700_000_900);
        assert_eq!(
            claims.expires_at(),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_900))
        );
        assert_eq!(Claims { exp: -1, ..claims }.expires_at(), None);
    }

    #[test]
    fn now_millis_is_after_2023() {
        assert!(now_millis() > NOW_MS);
    }
}
