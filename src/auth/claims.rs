//! Unverified JWT claim inspection used to derive token expiry.
//!
//! The backend issues Cognito JWTs. Signatures are the server's concern; the client only reads
//! the `exp` claim to decide when a token should be refreshed ahead of time.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

#[derive(Deserialize)]
struct ExpiryClaims {
	exp: Option<i64>,
}

/// Reads the `exp` claim from a JWT-shaped token without verifying its signature.
///
/// Returns `None` for opaque tokens, malformed payloads, or payloads without `exp`.
pub fn jwt_expiry(token: &str) -> Option<OffsetDateTime> {
	let mut segments = token.split('.');
	let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

	if segments.next().is_some() {
		return None;
	}

	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	let claims: ExpiryClaims = serde_json::from_slice(&bytes).ok()?;

	OffsetDateTime::from_unix_timestamp(claims.exp?).ok()
}
