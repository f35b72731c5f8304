//! Credential kinds, redacted token secrets, and token expiry helpers.

pub mod claims;
pub mod secret;

pub use claims::*;
pub use secret::*;

// self
use crate::_prelude::*;

/// The two credentials a session carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
	/// Short-lived credential attached to authenticated requests.
	Access,
	/// Longer-lived credential used to obtain a new access token.
	Refresh,
}
impl TokenKind {
	/// Returns a stable label suitable for log fields and storage keys.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Access => "access",
			TokenKind::Refresh => "refresh",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
