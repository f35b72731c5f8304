//! Thread-safe in-memory [`CredentialStore`] for tests, previews, and ephemeral sessions.

// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
	store::{CredentialStore, StoreFuture},
};

type TokenMap = Arc<RwLock<HashMap<TokenKind, TokenSecret>>>;

/// Thread-safe storage backend that keeps tokens in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(TokenMap);
impl MemoryStore {
	/// Creates a store seeded with both session tokens.
	pub fn with_tokens(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		let store = Self::default();

		{
			let mut map = store.0.write();

			map.insert(TokenKind::Access, access.into());
			map.insert(TokenKind::Refresh, refresh.into());
		}

		store
	}

	/// Returns the current token without going through the async contract.
	pub fn peek(&self, kind: TokenKind) -> Option<TokenSecret> {
		self.0.read().get(&kind).cloned()
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&kind).cloned()) })
	}

	fn set(&self, kind: TokenKind, value: TokenSecret) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(kind, value);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().clear();

			Ok(())
		})
	}
}
