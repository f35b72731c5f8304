//! Bounded-retry, single-flight access-token refresh.
//!
//! [`TokenRefreshCoordinator::authorize`] runs after the auth gate attached a token. Fresh tokens
//! pass straight through. Otherwise the caller takes the session's refresh guard and either
//! reuses the outcome of a sequence that finished while it waited, or drives a new sequence
//! through [`RefreshStep`] transitions:
//!
//! ```text
//! Checking ──▶ Expired                        (refresh token missing or past expiry)
//!    │    └──▶ Succeeded(current)             (another caller already refreshed)
//!    ▼
//! Refreshing{1} ──▶ Refreshing{n+1} ──▶ Exhausted
//!    └──────────────────┴──▶ Succeeded(new)
//! ```
//!
//! `Expired` and `Exhausted` post [`SessionEvent::UserShouldLogout`] once per sequence.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
	classify::{AuthFailurePolicy, ResponseClassifier},
	executor::RequestExecutor,
	http::{AUTHORIZATION, HeaderMap, Method, authorization_value},
	obs::{self, FlowSpan, LogoutReason},
	request::{ParameterEncoding, Parameters, TaskKind},
	session::{SessionEvent, SessionNotifier, SessionState},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
}

/// States of one refresh sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshStep {
	/// Inspecting stored credentials.
	Checking,
	/// Sending refresh call number `attempt` (1-based).
	Refreshing {
		/// Attempt about to be made.
		attempt: u8,
	},
	/// A usable access token is available.
	Succeeded(TokenSecret),
	/// Every attempt failed.
	Exhausted,
	/// The refresh token can no longer be used.
	Expired,
}

struct RefreshingMark<'a>(&'a SessionState);
impl<'a> RefreshingMark<'a> {
	fn set(session: &'a SessionState) -> Self {
		session.mark_refreshing(true);

		Self(session)
	}
}
impl Drop for RefreshingMark<'_> {
	fn drop(&mut self) {
		self.0.mark_refreshing(false);
	}
}

/// Keeps the session's access token usable, refreshing it when stale.
#[derive(Clone)]
pub struct TokenRefreshCoordinator {
	executor: RequestExecutor,
	classifier: ResponseClassifier,
	notifier: Arc<dyn SessionNotifier>,
	refresh_url: String,
	preemptive_window: Duration,
	max_attempts: u8,
	metrics: Arc<RefreshMetrics>,
}
impl TokenRefreshCoordinator {
	/// Creates a coordinator that refreshes through `executor` against `refresh_url`.
	pub fn new(
		executor: RequestExecutor,
		classifier: ResponseClassifier,
		notifier: Arc<dyn SessionNotifier>,
		refresh_url: impl Into<String>,
		preemptive_window: Duration,
		max_attempts: u8,
	) -> Self {
		Self {
			executor,
			classifier,
			notifier,
			refresh_url: refresh_url.into(),
			preemptive_window,
			max_attempts: max_attempts.max(1),
			metrics: Default::default(),
		}
	}

	/// Counters for refresh calls made by this coordinator.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns `true` when `token` expires within the preemptive window. Unknown expiries are
	/// fresh.
	pub fn is_stale(
		&self,
		session: &SessionState,
		token: &TokenSecret,
		now: OffsetDateTime,
	) -> bool {
		session
			.expiry_of(TokenKind::Access, token)
			.is_some_and(|expiry| expiry - now <= self.preemptive_window)
	}

	/// Ensures `headers` carry a usable access token.
	///
	/// Fails with `ClientError(401, ..)` when the session has to end; the caller must then drop
	/// the pending request.
	pub async fn authorize(&self, session: &SessionState, headers: &mut HeaderMap) -> Result<()> {
		let observed = session.generation();

		if let Some(token) = self.usable_token(session, OffsetDateTime::now_utc()).await? {
			headers.insert(AUTHORIZATION, authorization_value(&token)?);

			return Ok(());
		}

		let span = FlowSpan::refresh(observed);
		let result = span
			.instrument(async {
				let _singleflight = session.refresh_guard.lock().await;

				if let Some(outcome) = session.published_since(observed) {
					self.metrics.record_joined();

					return outcome;
				}

				let _mark = RefreshingMark::set(session);
				let outcome = self.run(session).await;

				session.publish(outcome.clone());

				outcome
			})
			.await;

		span.finish(&result);
		headers.insert(AUTHORIZATION, authorization_value(&result?)?);

		Ok(())
	}

	async fn usable_token(
		&self,
		session: &SessionState,
		now: OffsetDateTime,
	) -> Result<Option<TokenSecret>> {
		if session.refresh_token_expired(now).await? {
			return Ok(None);
		}

		let token = session.token(TokenKind::Access).await?;

		Ok(token.filter(|token| !self.is_stale(session, token, now)))
	}

	async fn run(&self, session: &SessionState) -> Result<TokenSecret> {
		let mut step = RefreshStep::Checking;

		loop {
			step = match step {
				RefreshStep::Succeeded(token) => return Ok(token),
				RefreshStep::Expired => {
					obs::log_refresh_token_expired(&self.refresh_url);
					obs::record_logout(LogoutReason::RefreshExpired);
					self.notifier.post(SessionEvent::UserShouldLogout);

					return Err(Error::unauthorized(Error::ACCESS_TOKEN_EXPIRED));
				},
				RefreshStep::Exhausted => {
					obs::record_logout(LogoutReason::RefreshExhausted);
					self.notifier.post(SessionEvent::UserShouldLogout);

					return Err(Error::unauthorized(Error::UNAUTHORIZED));
				},
				step => self.advance(step, session).await?,
			};
		}
	}

	/// Computes the successor of a non-terminal step.
	async fn advance(&self, step: RefreshStep, session: &SessionState) -> Result<RefreshStep> {
		match step {
			RefreshStep::Checking => {
				let now = OffsetDateTime::now_utc();

				if session.refresh_token_expired(now).await? {
					return Ok(RefreshStep::Expired);
				}

				Ok(match self.usable_token(session, now).await? {
					Some(token) => RefreshStep::Succeeded(token),
					None => RefreshStep::Refreshing { attempt: 1 },
				})
			},
			RefreshStep::Refreshing { attempt } => match self.refresh_once(session).await {
				Ok(token) => Ok(RefreshStep::Succeeded(token)),
				// A canceled call ends the sequence without a logout.
				Err(Error::Canceled) => Err(Error::Canceled),
				Err(e) if attempt < self.max_attempts => {
					obs::log_refresh_retry(attempt, &e);

					Ok(RefreshStep::Refreshing { attempt: attempt + 1 })
				},
				Err(e) => {
					obs::log_refresh_exhausted(attempt, &e);

					Ok(RefreshStep::Exhausted)
				},
			},
			terminal => Ok(terminal),
		}
	}

	async fn refresh_once(&self, session: &SessionState) -> Result<TokenSecret> {
		self.metrics.record_attempt();

		let result = self.exchange(session).await;

		match &result {
			Ok(_) => self.metrics.record_success(),
			Err(_) => self.metrics.record_failure(),
		}

		result
	}

	async fn exchange(&self, session: &SessionState) -> Result<TokenSecret> {
		let refresh_token = session
			.token(TokenKind::Refresh)
			.await?
			.ok_or_else(|| Error::unauthorized(Error::ACCESS_TOKEN_EXPIRED))?;
		let parameters =
			Parameters::from_serialize(&RefreshRequest { refresh_token: refresh_token.expose() });
		let request = self.executor.prepare(
			Method::POST,
			&self.refresh_url,
			Some(&parameters),
			ParameterEncoding::Json,
			std::iter::empty::<(&str, &str)>(),
		)?;
		let outcome = self.executor.execute(request, TaskKind::Data).await;
		let status = outcome.status().unwrap_or_default();
		let response: RefreshResponse =
			self.classifier.classify(outcome, &self.refresh_url, AuthFailurePolicy::Ignore)?;
		let access = TokenSecret::new(response.access_token);

		if access.is_empty() {
			const EMPTY_TOKEN: &str = "accessToken: empty token";

			obs::log_data_corruption(status, EMPTY_TOKEN, &self.refresh_url);

			return Err(Error::DataCorruption {
				status,
				message: format!("Decoding error: {EMPTY_TOKEN}"),
			});
		}

		session.store().set(TokenKind::Access, access.clone()).await?;

		match response
			.expires_in
			.and_then(|seconds| OffsetDateTime::now_utc().checked_add(Duration::seconds(seconds)))
		{
			Some(expires_at) => session.record_expiry(TokenKind::Access, expires_at),
			None => session.forget_expiry(TokenKind::Access),
		}

		Ok(access)
	}
}
impl Debug for TokenRefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefreshCoordinator")
			.field("refresh_url", &self.refresh_url)
			.field("preemptive_window", &self.preemptive_window)
			.field("max_attempts", &self.max_attempts)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		cancel::CancellationRegistry,
		http::{HttpTransport, RawOutcome, TransportFuture, TransportRequest},
		store::MemoryStore,
	};

	#[derive(Default)]
	struct Countdown {
		failures_left: AtomicUsize,
		calls: AtomicUsize,
	}
	impl HttpTransport for Countdown {
		fn send(&self, _: TransportRequest) -> TransportFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let failed = self
				.failures_left
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
				.is_ok();

			Box::pin(async move {
				if failed {
					RawOutcome::response(500, "")
				} else {
					RawOutcome::response(200, r#"{"accessToken":"access-2","expiresIn":3600}"#)
				}
			})
		}
	}

	#[derive(Default)]
	struct Logouts(AtomicUsize);
	impl SessionNotifier for Logouts {
		fn post(&self, _: SessionEvent) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	struct Fixed(RawOutcome);
	impl HttpTransport for Fixed {
		fn send(&self, _: TransportRequest) -> TransportFuture<'_> {
			let outcome = self.0.clone();

			Box::pin(async move { outcome })
		}
	}

	fn coordinator_over(
		transport: Arc<dyn HttpTransport>,
		max_attempts: u8,
	) -> (TokenRefreshCoordinator, Arc<Logouts>) {
		let logouts = Arc::new(Logouts::default());
		let executor = RequestExecutor::new(transport, CancellationRegistry::default(), "ios-key");
		let coordinator = TokenRefreshCoordinator::new(
			executor,
			ResponseClassifier::new(logouts.clone()),
			logouts.clone(),
			"https://api.road2crypto.com/auth/refresh",
			Duration::seconds(60),
			max_attempts,
		);

		(coordinator, logouts)
	}

	fn coordinator(
		failures: usize,
		max_attempts: u8,
	) -> (TokenRefreshCoordinator, Arc<Countdown>, Arc<Logouts>) {
		let transport = Arc::new(Countdown {
			failures_left: AtomicUsize::new(failures),
			calls: AtomicUsize::new(0),
		});
		let (coordinator, logouts) = coordinator_over(transport.clone(), max_attempts);

		(coordinator, transport, logouts)
	}

	fn session() -> SessionState {
		SessionState::new(Arc::new(MemoryStore::with_tokens("access-1", "refresh-1")))
	}

	#[test]
	fn staleness_uses_the_preemptive_window() {
		let (coordinator, ..) = coordinator(0, 2);
		let session = session();
		let token = TokenSecret::new("access-1");
		let now = OffsetDateTime::now_utc();

		assert!(!coordinator.is_stale(&session, &token, now));

		session.record_expiry(TokenKind::Access, now + Duration::seconds(61));

		assert!(!coordinator.is_stale(&session, &token, now));

		session.record_expiry(TokenKind::Access, now + Duration::seconds(60));

		assert!(coordinator.is_stale(&session, &token, now));
	}

	#[tokio::test]
	async fn checking_moves_to_expired_or_refreshing() {
		let (coordinator, ..) = coordinator(0, 2);
		let session = session();

		assert_eq!(
			coordinator.advance(RefreshStep::Checking, &session).await,
			Ok(RefreshStep::Succeeded(TokenSecret::new("access-1")))
		);

		session.record_expiry(TokenKind::Access, OffsetDateTime::now_utc());

		assert_eq!(
			coordinator.advance(RefreshStep::Checking, &session).await,
			Ok(RefreshStep::Refreshing { attempt: 1 })
		);

		session.record_expiry(TokenKind::Refresh, OffsetDateTime::now_utc() - Duration::minutes(1));

		assert_eq!(
			coordinator.advance(RefreshStep::Checking, &session).await,
			Ok(RefreshStep::Expired)
		);
	}

	#[tokio::test]
	async fn failed_attempts_retry_then_exhaust() {
		let (coordinator, transport, logouts) = coordinator(5, 2);
		let session = session();

		assert_eq!(
			coordinator.advance(RefreshStep::Refreshing { attempt: 1 }, &session).await,
			Ok(RefreshStep::Refreshing { attempt: 2 })
		);
		assert_eq!(
			coordinator.advance(RefreshStep::Refreshing { attempt: 2 }, &session).await,
			Ok(RefreshStep::Exhausted)
		);
		assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
		assert_eq!(logouts.0.load(Ordering::SeqCst), 0);
		assert_eq!(coordinator.metrics().failures(), 2);
	}

	#[tokio::test]
	async fn successful_refresh_persists_token_and_expiry() {
		let (coordinator, _, logouts) = coordinator(1, 2);
		let session = session();
		let mut headers = HeaderMap::new();

		session.record_expiry(TokenKind::Access, OffsetDateTime::now_utc());
		coordinator
			.authorize(&session, &mut headers)
			.await
			.expect("Second attempt should refresh the token.");

		let stored = session
			.token(TokenKind::Access)
			.await
			.expect("Store read should succeed.")
			.expect("Refreshed token should be stored.");

		assert_eq!(stored.expose(), "access-2");
		assert_eq!(headers[AUTHORIZATION], "access-2");
		assert!(!coordinator.is_stale(&session, &stored, OffsetDateTime::now_utc()));
		assert_eq!(coordinator.metrics().attempts(), 2);
		assert_eq!(coordinator.metrics().successes(), 1);
		assert_eq!(logouts.0.load(Ordering::SeqCst), 0);
		assert_eq!(session.generation(), 1);
	}

	#[tokio::test]
	async fn empty_refreshed_token_reports_the_received_status() {
		let transport = Arc::new(Fixed(RawOutcome::response(201, r#"{"accessToken":""}"#)));
		let (coordinator, logouts) = coordinator_over(transport, 1);
		let session = session();

		assert_eq!(
			coordinator.exchange(&session).await,
			Err(Error::DataCorruption {
				status: 201,
				message: "Decoding error: accessToken: empty token".into(),
			})
		);
		assert_eq!(
			session.token(TokenKind::Access).await.expect("Store read should succeed."),
			Some(TokenSecret::new("access-1"))
		);
		assert_eq!(logouts.0.load(Ordering::SeqCst), 0);
	}
}
