//! Diagnostic events emitted through `tracing` when the feature is enabled.

// self
use crate::{_prelude::*, request::TaskKind};

/// Logs a non-success status: 5xx at error level, 3xx and 4xx as warnings.
pub fn log_status_failure(status: u16, message: &str, url: &str) {
	#[cfg(feature = "tracing")]
	{
		if status >= 500 {
			tracing::error!(status, message, url, "Request failed.");
		} else if status >= 300 {
			tracing::warn!(status, message, url, "Request failed.");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (status, message, url);
	}
}

/// Logs the logout triggered by a 401/403 response.
pub fn log_auth_logout(status: u16, url: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(status, url, "Logging out user, auth error.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (status, url);
	}
}

/// Logs a success response whose body was missing or undecodable.
pub fn log_data_corruption(status: u16, detail: &str, url: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(status, detail, url, "Response body could not be decoded.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (status, detail, url);
	}
}

/// Logs a transport failure that produced no response.
pub fn log_transport_failure(message: &str, url: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(message, url, "Request produced no response.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (message, url);
	}
}

/// Logs that the refresh token is no longer usable and the session ends.
pub fn log_refresh_token_expired(refresh_url: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(refresh_url, "Refresh token expired, logging out user.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = refresh_url;
	}
}

/// Logs a failed refresh attempt that will be retried.
pub fn log_refresh_retry(attempt: u8, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(attempt, %error, "Failed refreshing the access token, trying again.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, error);
	}
}

/// Logs that every refresh attempt failed.
pub fn log_refresh_exhausted(attempts: u8, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(attempts, %error, "Failed refreshing the access token after retries.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempts, error);
	}
}

/// Logs the start of a cancellation sweep over one task category.
pub fn log_stopping(kind: TaskKind, count: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(kind = kind.as_str(), count, "Stopping all requests.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, count);
	}
}

/// Logs the end of a cancellation sweep over one task category.
pub fn log_stopped(kind: TaskKind) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(kind = kind.as_str(), "Stopped all requests.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = kind;
	}
}
