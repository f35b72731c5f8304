//! Decides, per request path, whether an access token is attached.

// self
use crate::{
	_prelude::*,
	auth::TokenKind,
	http::{AUTHORIZATION, HeaderMap, authorization_value},
	session::SessionState,
};

/// Path-based token attachment policy.
///
/// Exempt paths (login and friends) never carry an `Authorization` header and are never checked
/// for staleness. Every other path gets the stored access token when one exists.
#[derive(Clone, Debug, Default)]
pub struct AuthGate {
	exempt_prefixes: Vec<String>,
}
impl AuthGate {
	/// Creates a gate that exempts every path starting with one of `prefixes`.
	pub fn new<I, S>(prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { exempt_prefixes: prefixes.into_iter().map(Into::into).collect() }
	}

	/// Returns `true` when `path` bypasses authentication entirely.
	pub fn is_exempt(&self, path: &str) -> bool {
		self.exempt_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
	}

	/// Attaches the stored access token to `headers` unless `path` is exempt.
	///
	/// Returns `true` when a token was attached, which is the signal to run the refresh
	/// coordinator. Stored credentials are only read.
	pub async fn attach(
		&self,
		path: &str,
		headers: &mut HeaderMap,
		session: &SessionState,
	) -> Result<bool> {
		if self.is_exempt(path) {
			return Ok(false);
		}

		match session.token(TokenKind::Access).await? {
			Some(token) => {
				headers.insert(AUTHORIZATION, authorization_value(&token)?);

				Ok(true)
			},
			None => Ok(false),
		}
	}
}
