//! Transport primitives: prepared requests, raw outcomes, and the transport seam.
//!
//! Requests travel as [`http`](::http) crate types. [`HttpTransport`] is the pipeline's only
//! dependency on an HTTP stack. It receives a fully prepared [`TransportRequest`] and reports
//! exactly one [`RawOutcome`]; classification into the error taxonomy happens later in
//! [`crate::classify`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::header::AsHeaderName;
// self
use crate::{_prelude::*, auth::TokenSecret};

pub use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};

/// Header carrying the static client key on every request.
pub const CLIENT_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-client-token-ios");

/// Converts caller-supplied header pairs into a [`HeaderMap`].
///
/// Names are case-insensitive and a later pair replaces an earlier one with the same name. A name
/// or value that cannot appear on the wire fails with [`Error::ErrorDomain`].
pub fn header_map<I, K, V>(pairs: I) -> Result<HeaderMap>
where
	I: IntoIterator<Item = (K, V)>,
	K: AsRef<str>,
	V: AsRef<str>,
{
	let mut headers = HeaderMap::new();

	for (name, value) in pairs {
		let name = name.as_ref();
		let name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| Error::domain(format!("Invalid header name `{name}`")))?;
		let value = HeaderValue::from_str(value.as_ref())
			.map_err(|_| Error::domain(format!("Invalid value for header `{}`", name.as_str())))?;

		headers.insert(name, value);
	}

	Ok(headers)
}

/// `Authorization` value carrying `token` verbatim, flagged sensitive.
pub fn authorization_value(token: &TokenSecret) -> Result<HeaderValue> {
	let mut value = HeaderValue::from_str(token.expose())
		.map_err(|_| Error::domain("Access token is not a valid header value"))?;

	value.set_sensitive(true);

	Ok(value)
}

/// A fully prepared request ready for the transport.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Final header set, including client and auth headers.
	pub headers: HeaderMap,
	/// Encoded body, if any.
	pub body: Option<Vec<u8>>,
}
impl TransportRequest {
	/// Returns the named header as text, or `None` when absent or not visible ASCII.
	pub fn header<K>(&self, name: K) -> Option<&str>
	where
		K: AsHeaderName,
	{
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}
}

/// Transport-level failure without a usable response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportFailure {
	/// The request was canceled before a response arrived.
	Canceled,
	/// DNS, TCP, TLS, or timeout failure.
	Network {
		/// Transport diagnostic.
		message: String,
	},
}

/// What the transport observed for one sent request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawOutcome {
	/// A response arrived.
	Response {
		/// HTTP status code.
		status: u16,
		/// Response body; empty when the server sent none.
		body: Vec<u8>,
	},
	/// No response arrived.
	Failed(TransportFailure),
}
impl RawOutcome {
	/// Shorthand for a response with a UTF-8 body.
	pub fn response(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self::Response { status, body: body.into() }
	}

	/// Shorthand for a network failure.
	pub fn network(message: impl Into<String>) -> Self {
		Self::Failed(TransportFailure::Network { message: message.into() })
	}

	/// Status code of the response, if one arrived.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Response { status, .. } => Some(*status),
			Self::Failed(_) => None,
		}
	}
}

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = RawOutcome> + 'a + Send>>;

/// Abstraction over HTTP stacks able to send a prepared request.
///
/// Implementations never classify responses; they report the status and body as received, or a
/// [`TransportFailure`] when nothing arrived. Dropping the returned future must abort the request,
/// which is how the cancellation registry stops in-flight work.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves once the full response body is read.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring an optional timeout.
	pub fn with_timeout(
		timeout: Option<std::time::Duration>,
	) -> Result<Self, crate::error::ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self(builder.build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = match builder.send().await {
				Ok(response) => response,
				Err(e) => return RawOutcome::network(e.to_string()),
			};
			let status = response.status().as_u16();
			// A body that cannot be read is reported as absent.
			let body = response.bytes().await.map(|bytes| bytes.to_vec()).unwrap_or_default();

			RawOutcome::Response { status, body }
		})
	}
}
