//! Request preparation and transport dispatch.
//!
//! The executor turns a method, URL, optional parameters, and caller header pairs into a
//! [`TransportRequest`], stamps the client key header, and hands it to the [`HttpTransport`].
//! Anything that cannot be put on the wire is rejected here as [`Error::ErrorDomain`], before
//! the transport sees it.
//! Every dispatched request holds a ticket in the [`CancellationRegistry`] until the transport
//! resolves, so [`CancellationRegistry::stop_all`] can abort it.

// self
use crate::{
	_prelude::*,
	cancel::CancellationRegistry,
	codec,
	http::{
		self, CLIENT_TOKEN_HEADER, CONTENT_TYPE, HeaderValue, HttpTransport, Method, RawOutcome,
		TransportFailure, TransportRequest,
	},
	request::{ParameterEncoding, Parameters, TaskKind},
};

/// Builds and dispatches transport requests.
#[derive(Clone)]
pub struct RequestExecutor {
	transport: Arc<dyn HttpTransport>,
	registry: CancellationRegistry,
	client_key: String,
}
impl RequestExecutor {
	/// Creates an executor sending through `transport` and tracking tasks in `registry`.
	pub fn new(
		transport: Arc<dyn HttpTransport>,
		registry: CancellationRegistry,
		client_key: impl Into<String>,
	) -> Self {
		Self { transport, registry, client_key: client_key.into() }
	}

	/// Registry that tracks requests dispatched by this executor.
	pub fn registry(&self) -> &CancellationRegistry {
		&self.registry
	}

	/// Assembles a transport request.
	///
	/// The client key header is always set and overrides any caller value. JSON parameters become
	/// the body with `Content-Type: application/json`; URL encodings are rejected.
	pub fn prepare<I, K, V>(
		&self,
		method: Method,
		url: &str,
		parameters: Option<&Parameters>,
		encoding: ParameterEncoding,
		headers: I,
	) -> Result<TransportRequest>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let url = Url::parse(url).map_err(|_| Error::domain("Invalid url construct"))?;
		let mut headers = http::header_map(headers)?;
		let client_key = HeaderValue::from_str(&self.client_key)
			.map_err(|_| Error::domain("Client key is not a valid header value"))?;

		headers.insert(CLIENT_TOKEN_HEADER, client_key);

		let body = match parameters {
			None => None,
			Some(parameters) => match encoding {
				ParameterEncoding::Json => {
					let value = parameters
						.value()
						.map_err(|_| Error::domain("Parameters encoding failed"))?;
					let body = codec::encode_json(value)
						.map_err(|_| Error::domain("Parameters encoding failed"))?;

					headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

					Some(body)
				},
				ParameterEncoding::Url | ParameterEncoding::UrlNoBrackets =>
					return Err(Error::domain("URL encoding not implemented")),
			},
		};

		Ok(TransportRequest { method, url, headers, body })
	}

	/// Sends `request`, resolving to [`TransportFailure::Canceled`] if the registry stops it first.
	pub async fn execute(&self, request: TransportRequest, kind: TaskKind) -> RawOutcome {
		let ticket = self.registry.register(kind);

		tokio::select! {
			biased;
			_ = ticket.cancelled() => RawOutcome::Failed(TransportFailure::Canceled),
			outcome = self.transport.send(request) => outcome,
		}
	}
}
impl Debug for RequestExecutor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor")
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}
