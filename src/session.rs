//! Explicitly owned session state and the logout notification channel.
//!
//! [`SessionState`] replaces ambient auth singletons: it owns the credential store handle, the
//! recorded token expiries, and the single-flight bookkeeping the refresh coordinator relies on.
//! A session is seeded at login with [`SessionState::begin`] and torn down with
//! [`SessionState::end`].

// std
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
// crates.io
use tokio::sync::broadcast;
// self
use crate::{
	_prelude::*,
	auth::{self, TokenKind, TokenSecret},
	store::{CredentialStore, StoreError},
};

/// Session-level events posted by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionEvent {
	/// Credentials can no longer be trusted; the app should log the user out.
	UserShouldLogout,
}

/// One-way channel consumed by session management outside the pipeline.
pub trait SessionNotifier
where
	Self: Send + Sync,
{
	/// Posts an event. Must not block.
	fn post(&self, event: SessionEvent);
}

/// [`SessionNotifier`] backed by a Tokio broadcast channel.
#[derive(Clone, Debug)]
pub struct BroadcastNotifier(broadcast::Sender<SessionEvent>);
impl BroadcastNotifier {
	const DEFAULT_CAPACITY: usize = 16;

	/// Creates a notifier whose channel buffers `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));

		Self(sender)
	}

	/// Subscribes to events posted after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.0.subscribe()
	}
}
impl Default for BroadcastNotifier {
	fn default() -> Self {
		Self::new(Self::DEFAULT_CAPACITY)
	}
}
impl SessionNotifier for BroadcastNotifier {
	fn post(&self, event: SessionEvent) {
		// Sending only fails when nobody listens.
		let _ = self.0.send(event);
	}
}

/// Whether a refresh sequence currently owns the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshState {
	/// No refresh sequence is running.
	Idle,
	/// A refresh sequence is running; new callers join it.
	Refreshing,
}

#[derive(Debug)]
pub(crate) struct PublishedRefresh {
	generation: u64,
	outcome: Result<TokenSecret>,
}

/// Credentials and refresh bookkeeping for one authenticated session.
pub struct SessionState {
	store: Arc<dyn CredentialStore>,
	expiries: Mutex<HashMap<TokenKind, OffsetDateTime>>,
	pub(crate) refresh_guard: AsyncMutex<()>,
	refreshing: AtomicBool,
	generation: AtomicU64,
	published: Mutex<Option<PublishedRefresh>>,
}
impl SessionState {
	/// Wraps a credential store.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self {
			store,
			expiries: Default::default(),
			refresh_guard: AsyncMutex::new(()),
			refreshing: AtomicBool::new(false),
			generation: AtomicU64::new(0),
			published: Default::default(),
		}
	}

	/// Returns the credential store backing the session.
	pub fn store(&self) -> &dyn CredentialStore {
		self.store.as_ref()
	}

	/// Seeds the session with freshly issued credentials at login.
	///
	/// Waits for a running refresh sequence to finish so it cannot overwrite the new tokens.
	pub async fn begin(
		&self,
		access: impl Into<TokenSecret>,
		refresh: impl Into<TokenSecret>,
	) -> Result<(), StoreError> {
		let _singleflight = self.refresh_guard.lock().await;

		self.reset();
		self.store.set(TokenKind::Access, access.into()).await?;
		self.store.set(TokenKind::Refresh, refresh.into()).await
	}

	/// Clears every credential at logout.
	///
	/// Waits for a running refresh sequence to finish, so a token it obtains is cleared too.
	pub async fn end(&self) -> Result<(), StoreError> {
		let _singleflight = self.refresh_guard.lock().await;

		self.reset();
		self.store.clear().await
	}

	/// Records an explicit expiry for a token, overriding any JWT `exp` claim.
	pub fn record_expiry(&self, kind: TokenKind, expires_at: OffsetDateTime) {
		self.expiries.lock().insert(kind, expires_at);
	}

	/// Drops a recorded expiry so the JWT `exp` claim applies again.
	pub fn forget_expiry(&self, kind: TokenKind) {
		self.expiries.lock().remove(&kind);
	}

	/// Resolves the expiry of `secret`: the recorded instant first, then its JWT `exp` claim.
	pub fn expiry_of(&self, kind: TokenKind, secret: &TokenSecret) -> Option<OffsetDateTime> {
		self.expiries.lock().get(&kind).copied().or_else(|| auth::jwt_expiry(secret.expose()))
	}

	/// Reads a token through the store, treating empty strings as absent.
	pub async fn token(&self, kind: TokenKind) -> Result<Option<TokenSecret>> {
		Ok(self.store.get(kind).await?.filter(|secret| !secret.is_empty()))
	}

	/// Returns `true` when the refresh token is missing or known to be past its expiry.
	pub async fn refresh_token_expired(&self, now: OffsetDateTime) -> Result<bool> {
		let expired = match self.token(TokenKind::Refresh).await? {
			Some(secret) =>
				self.expiry_of(TokenKind::Refresh, &secret).is_some_and(|expiry| expiry <= now),
			None => true,
		};

		Ok(expired)
	}

	/// Reports whether a refresh sequence currently owns the session.
	pub fn refresh_state(&self) -> RefreshState {
		if self.refreshing.load(Ordering::Acquire) {
			RefreshState::Refreshing
		} else {
			RefreshState::Idle
		}
	}

	/// Number of refresh sequences completed so far.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	pub(crate) fn mark_refreshing(&self, refreshing: bool) {
		self.refreshing.store(refreshing, Ordering::Release);
	}

	/// Publishes the outcome of the sequence that just finished and advances the generation.
	pub(crate) fn publish(&self, outcome: Result<TokenSecret>) {
		let mut published = self.published.lock();
		let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

		*published = Some(PublishedRefresh { generation, outcome });
	}

	/// Returns the latest published outcome when a sequence finished after `observed`.
	pub(crate) fn published_since(&self, observed: u64) -> Option<Result<TokenSecret>> {
		self.published
			.lock()
			.as_ref()
			.filter(|published| published.generation > observed)
			.map(|published| published.outcome.clone())
	}

	fn reset(&self) {
		self.expiries.lock().clear();
		*self.published.lock() = None;
	}
}
impl Debug for SessionState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionState")
			.field("refresh_state", &self.refresh_state())
			.field("generation", &self.generation())
			.finish()
	}
}
