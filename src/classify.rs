//! Maps raw transport outcomes onto typed values or the [`Error`] taxonomy.

// self
use crate::{
	_prelude::*,
	codec,
	http::{RawOutcome, TransportFailure},
	obs::{self, LogoutReason},
	session::{SessionEvent, SessionNotifier},
};

/// Whether a 401/403 response ends the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthFailurePolicy {
	/// Post [`SessionEvent::UserShouldLogout`] before returning the error.
	#[default]
	Logout,
	/// Return the error without touching the session.
	Ignore,
}

/// Structured error body sent by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
	/// Human-readable failure description.
	#[serde(default)]
	pub message: Option<String>,
}
impl ErrorResponse {
	const NO_MESSAGE: &'static str = "No message";

	fn message_from(body: &[u8]) -> String {
		serde_json::from_slice::<ErrorResponse>(body)
			.ok()
			.and_then(|response| response.message)
			.unwrap_or_else(|| Self::NO_MESSAGE.into())
	}
}

/// Classifies responses and elevates auth failures to the session.
#[derive(Clone)]
pub struct ResponseClassifier {
	notifier: Arc<dyn SessionNotifier>,
}
impl ResponseClassifier {
	/// Creates a classifier posting logout events to `notifier`.
	pub fn new(notifier: Arc<dyn SessionNotifier>) -> Self {
		Self { notifier }
	}

	/// Decodes a 2xx body into `T`, or maps the outcome onto an [`Error`].
	pub fn classify<T>(
		&self,
		outcome: RawOutcome,
		url: &str,
		policy: AuthFailurePolicy,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let (status, body) = match outcome {
			RawOutcome::Response { status, body } => (status, body),
			RawOutcome::Failed(TransportFailure::Canceled) => return Err(Error::Canceled),
			RawOutcome::Failed(TransportFailure::Network { message }) => {
				obs::log_transport_failure(&message, url);

				return Err(Error::UnknownStatus { status: 0, message });
			},
		};

		match status {
			200..=299 => Self::decode(status, &body, url),
			400..=499 => {
				let message = ErrorResponse::message_from(&body);

				obs::log_status_failure(status, &message, url);

				if matches!(status, 401 | 403) && policy == AuthFailurePolicy::Logout {
					obs::log_auth_logout(status, url);
					obs::record_logout(LogoutReason::AuthRejected);
					self.notifier.post(SessionEvent::UserShouldLogout);
				}

				Err(Error::ClientError { status, message })
			},
			500..=599 => {
				let message = ErrorResponse::message_from(&body);

				obs::log_status_failure(status, &message, url);

				Err(Error::ServerError { status, message })
			},
			_ => {
				let message = ErrorResponse::message_from(&body);

				obs::log_status_failure(status, &message, url);

				Err(Error::UnknownStatus { status, message })
			},
		}
	}

	fn decode<T>(status: u16, body: &[u8], url: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		if body.is_empty() {
			obs::log_data_corruption(status, "No data", url);

			return Err(Error::DataCorruption { status, message: "No data".into() });
		}

		codec::decode_json(body).map_err(|detail| {
			obs::log_data_corruption(status, &detail, url);

			Error::DataCorruption { status, message: format!("Decoding error: {detail}") }
		})
	}
}
impl Debug for ResponseClassifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseClassifier").finish_non_exhaustive()
	}
}
