//! Pipeline error taxonomy plus construction-time configuration failures.

// self
use crate::_prelude::*;

/// Pipeline-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured failure returned by every pipeline request.
///
/// Values are cloneable so a single refresh outcome can be handed to every caller that joined it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
	/// Backend answered with a 4xx status.
	#[error("Client error {status}: {message}.")]
	ClientError {
		/// HTTP status code.
		status: u16,
		/// Message from the structured error body, or `No message`.
		message: String,
	},
	/// Backend answered with a 5xx status.
	#[error("Server error {status}: {message}.")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Message from the structured error body, or `No message`.
		message: String,
	},
	/// Any other status, or a transport failure without a response (status `0`).
	#[error("Unexpected status {status}: {message}.")]
	UnknownStatus {
		/// HTTP status code, `0` when no response arrived.
		status: u16,
		/// Diagnostic message.
		message: String,
	},
	/// Response body was missing or did not decode into the expected type.
	#[error("Data corruption on status {status}: {message}.")]
	DataCorruption {
		/// HTTP status code of the response.
		status: u16,
		/// Decoding diagnostic.
		message: String,
	},
	/// Local failure while constructing, encoding, or persisting request state.
	#[error("{message}")]
	ErrorDomain {
		/// Diagnostic message.
		message: String,
	},
	/// The transport reported that the request was canceled.
	#[error("Request was canceled.")]
	Canceled,
}
impl Error {
	/// Message returned when the stored refresh token can no longer be used.
	pub const ACCESS_TOKEN_EXPIRED: &'static str = "Access Token expired";
	/// Message returned when every refresh attempt failed.
	pub const UNAUTHORIZED: &'static str = "Unauthorized: Missing or invalid access token.";

	pub(crate) fn domain(message: impl Into<String>) -> Self {
		Self::ErrorDomain { message: message.into() }
	}

	pub(crate) fn unauthorized(message: &str) -> Self {
		Self::ClientError { status: 401, message: message.into() }
	}

	/// Returns the HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::ClientError { status, .. }
			| Self::ServerError { status, .. }
			| Self::UnknownStatus { status, .. }
			| Self::DataCorruption { status, .. } => Some(*status),
			Self::ErrorDomain { .. } | Self::Canceled => None,
		}
	}

	/// Returns the human-readable message carried by the error.
	pub fn message(&self) -> &str {
		match self {
			Self::ClientError { message, .. }
			| Self::ServerError { message, .. }
			| Self::UnknownStatus { message, .. }
			| Self::DataCorruption { message, .. }
			| Self::ErrorDomain { message } => message,
			Self::Canceled => "Canceled",
		}
	}

	/// Returns `true` for 401/403 client errors, which end the session.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, Self::ClientError { status: 401 | 403, .. })
	}
}
impl From<crate::store::StoreError> for Error {
	fn from(e: crate::store::StoreError) -> Self {
		Self::domain(e.to_string())
	}
}

/// Configuration and validation failures raised while assembling a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The static client key is empty.
	#[error("Client key must not be empty.")]
	MissingClientKey,
	/// A service endpoint does not form a valid URL.
	#[error("Endpoint for service `{service}` is not a valid URL.")]
	InvalidEndpoint {
		/// Service label.
		service: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A service endpoint does not use HTTPS.
	#[error("Endpoint for service `{service}` must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Service label.
		service: String,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A configured path does not start with `/`.
	#[error("Path `{path}` must start with `/`.")]
	InvalidPath {
		/// Offending path.
		path: String,
	},
	/// Refresh attempt budget is outside the supported range.
	#[error("Refresh attempts must be between 1 and {max}, got {attempts}.")]
	InvalidRefreshAttempts {
		/// Requested attempt budget.
		attempts: u8,
		/// Largest supported budget.
		max: u8,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
