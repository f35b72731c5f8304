//! Shared doubles and builders for integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use bearer_pipeline::{
	ApiClient,
	config::{ClientConfig, ServiceEndpoint},
	http::{HttpTransport, RawOutcome, TransportFuture, TransportRequest},
	session::{SessionEvent, SessionNotifier, SessionState},
	store::MemoryStore,
};

pub const CLIENT_KEY: &str = "ios-test-key";
pub const API_DOMAIN: &str = "road2crypto.test";

/// Builds an unsigned JWT whose `exp` claim lies `offset` from now.
pub fn jwt_expiring_in(offset: Duration) -> String {
	let exp = (OffsetDateTime::now_utc() + offset).unix_timestamp();

	format!(
		"{}.{}.signature",
		URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
		URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"user-1","exp":{exp}}}"#))
	)
}

/// Access token that falls inside the default 60 second preemptive window.
pub fn stale_access_token() -> String {
	jwt_expiring_in(Duration::seconds(30))
}

/// Access token well outside the preemptive window.
pub fn fresh_access_token() -> String {
	jwt_expiring_in(Duration::hours(1))
}

/// Counts logout notifications.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
	logouts: AtomicUsize,
}
impl RecordingNotifier {
	pub fn logouts(&self) -> usize {
		self.logouts.load(Ordering::SeqCst)
	}
}
impl SessionNotifier for RecordingNotifier {
	fn post(&self, event: SessionEvent) {
		match event {
			SessionEvent::UserShouldLogout => self.logouts.fetch_add(1, Ordering::SeqCst),
		};
	}
}

enum Step {
	Respond(RawOutcome),
	Hang,
}

/// Transport that answers from per-path queues and records every request it receives.
///
/// Unscripted paths answer `404` with a structured error body.
#[derive(Default)]
pub struct ScriptedTransport {
	steps: Mutex<HashMap<String, VecDeque<Step>>>,
	requests: Mutex<Vec<TransportRequest>>,
	delay: Option<StdDuration>,
}
impl ScriptedTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Delays every response, so concurrent callers overlap.
	pub fn with_delay(mut self, delay: StdDuration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn respond(&self, path: &str, outcome: RawOutcome) -> &Self {
		self.push(path, Step::Respond(outcome));

		self
	}

	pub fn respond_json(&self, path: &str, status: u16, body: &str) -> &Self {
		self.respond(path, RawOutcome::response(status, body))
	}

	/// Queues a response that never arrives.
	pub fn hang(&self, path: &str) -> &Self {
		self.push(path, Step::Hang);

		self
	}

	pub fn requests(&self) -> Vec<TransportRequest> {
		self.requests.lock().clone()
	}

	pub fn calls(&self, path: &str) -> usize {
		self.requests.lock().iter().filter(|request| request.url.path() == path).count()
	}

	fn push(&self, path: &str, step: Step) {
		self.steps.lock().entry(path.to_owned()).or_default().push_back(step);
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let step = self.steps.lock().get_mut(request.url.path()).and_then(VecDeque::pop_front);
		let delay = self.delay;

		self.requests.lock().push(request);

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			match step {
				Some(Step::Respond(outcome)) => outcome,
				Some(Step::Hang) => std::future::pending::<RawOutcome>().await,
				None => RawOutcome::response(404, r#"{"message":"unscripted"}"#),
			}
		})
	}
}

pub struct Harness {
	pub client: ApiClient,
	pub store: MemoryStore,
	pub notifier: Arc<RecordingNotifier>,
	pub transport: Arc<ScriptedTransport>,
}

pub fn api_endpoint() -> ServiceEndpoint {
	ServiceEndpoint::https("api.", API_DOMAIN)
}

/// Builds a client over `transport` with the store seeded as given.
pub fn scripted_harness(transport: ScriptedTransport, access: &str, refresh: &str) -> Harness {
	let config = ClientConfig::builder(CLIENT_KEY, api_endpoint())
		.build()
		.expect("Scripted test configuration should build.");

	scripted_harness_with(config, transport, access, refresh)
}

pub fn scripted_harness_with(
	config: ClientConfig,
	transport: ScriptedTransport,
	access: &str,
	refresh: &str,
) -> Harness {
	let store = MemoryStore::with_tokens(access, refresh);
	let notifier = Arc::new(RecordingNotifier::default());
	let transport = Arc::new(transport);
	let client = ApiClient::with_transport(
		config,
		Arc::new(SessionState::new(Arc::new(store.clone()))),
		notifier.clone(),
		transport.clone(),
	);

	Harness { client, store, notifier, transport }
}

/// Builds a reqwest-backed client pointed at a local mock server.
#[cfg(feature = "reqwest")]
pub fn mock_server_client(
	base_url: &str,
	store: MemoryStore,
) -> (ApiClient, Arc<RecordingNotifier>) {
	let api = ServiceEndpoint::from_base_url(base_url).expect("Mock server URL should parse.");
	let config = ClientConfig::builder(CLIENT_KEY, api)
		.allow_insecure_http()
		.request_timeout(StdDuration::from_secs(5))
		.build()
		.expect("Mock server configuration should build.");
	let notifier = Arc::new(RecordingNotifier::default());
	let session = Arc::new(SessionState::new(Arc::new(store)));
	let client = ApiClient::new(config, session, notifier.clone())
		.expect("Reqwest-backed client should build.");

	(client, notifier)
}
