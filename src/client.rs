//! High-level client tying the pipeline stages together.

// self
use crate::{
	_prelude::*,
	cancel::{CancellationRegistry, StopSummary},
	classify::{AuthFailurePolicy, ResponseClassifier},
	config::ClientConfig,
	executor::RequestExecutor,
	gate::AuthGate,
	http::{HttpTransport, Method},
	obs::FlowSpan,
	refresh::{RefreshMetrics, TokenRefreshCoordinator},
	request::{ApiRequest, ParameterEncoding, TaskKind},
	session::{SessionNotifier, SessionState},
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport};

/// Issues typed backend requests with transparent bearer handling.
///
/// Each request flows through the auth gate, the refresh coordinator (only when a token was
/// attached), the executor, and finally the classifier. Clones share the session, the
/// cancellation registry, and the refresh counters.
#[derive(Clone)]
pub struct ApiClient {
	config: Arc<ClientConfig>,
	session: Arc<SessionState>,
	gate: AuthGate,
	refresh: TokenRefreshCoordinator,
	executor: RequestExecutor,
	classifier: ResponseClassifier,
}
impl ApiClient {
	/// Creates a client that sends through the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		session: Arc<SessionState>,
		notifier: Arc<dyn SessionNotifier>,
		transport: Arc<dyn HttpTransport>,
	) -> Self {
		let executor =
			RequestExecutor::new(transport, CancellationRegistry::default(), &config.client_key);
		let classifier = ResponseClassifier::new(notifier.clone());
		let refresh = TokenRefreshCoordinator::new(
			executor.clone(),
			classifier.clone(),
			notifier,
			config.refresh_url(),
			config.preemptive_window,
			config.max_refresh_attempts,
		);

		Self {
			gate: AuthGate::new(config.exempt_prefixes.iter().cloned()),
			config: Arc::new(config),
			session,
			refresh,
			executor,
			classifier,
		}
	}

	/// Returns the configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns the session whose credentials the client uses.
	pub fn session(&self) -> &Arc<SessionState> {
		&self.session
	}

	/// Returns the registry tracking in-flight requests.
	pub fn registry(&self) -> &CancellationRegistry {
		self.executor.registry()
	}

	/// Returns the refresh call counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.refresh.metrics()
	}

	/// Sends `request` and decodes the 2xx body into `T`.
	pub async fn request<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let span = FlowSpan::request(&request.method, &request.service, &request.path);
		let result = span.instrument(self.dispatch(request)).await;

		span.finish(&result);

		result
	}

	/// Sends an unauthenticated `GET` to an absolute URL, e.g. a pre-signed asset link.
	pub async fn fetch_url<T, I, K, V>(&self, url: &str, headers: I) -> Result<T>
	where
		T: DeserializeOwned,
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let prepared =
			self.executor.prepare(Method::GET, url, None, ParameterEncoding::Json, headers)?;
		let outcome = self.executor.execute(prepared, TaskKind::Data).await;

		self.classifier.classify(outcome, url, AuthFailurePolicy::Logout)
	}

	/// Cancels every in-flight request.
	pub fn stop_all(&self) -> StopSummary {
		self.registry().stop_all()
	}

	/// Cancels in-flight work and clears the session's credentials.
	pub async fn logout(&self) -> Result<StopSummary> {
		let summary = self.stop_all();

		self.session.end().await?;

		Ok(summary)
	}

	async fn dispatch<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let ApiRequest { method, service, path, parameters, encoding, headers, task } = request;
		let endpoint = self.config.service(&service).ok_or_else(|| {
			Error::domain(format!("No endpoint registered for service `{service}`"))
		})?;
		let url = endpoint.complete_url(&path);
		let mut prepared =
			self.executor.prepare(method, &url, parameters.as_ref(), encoding, headers)?;

		if endpoint.access_token_required
			&& self.gate.attach(&path, &mut prepared.headers, &self.session).await?
		{
			self.refresh.authorize(&self.session, &mut prepared.headers).await?;
		}

		let outcome = self.executor.execute(prepared, task).await;

		self.classifier.classify(outcome, &url, AuthFailurePolicy::Logout)
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient {
	/// Creates a client backed by a reqwest transport honoring the configured timeout.
	pub fn new(
		config: ClientConfig,
		session: Arc<SessionState>,
		notifier: Arc<dyn SessionNotifier>,
	) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::with_timeout(config.request_timeout)?;

		Ok(Self::with_transport(config, session, notifier, Arc::new(transport)))
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("session", &self.session)
			.field("refresh", &self.refresh)
			.finish_non_exhaustive()
	}
}
