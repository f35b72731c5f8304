//! Backend endpoint definitions and validated client configuration.
//!
//! URLs are assembled by concatenating a service's prefix, subdomain, and domain with the request
//! path, so a single [`ServiceEndpoint`] describes one backend host and every call made to it.

// self
use crate::{_prelude::*, error::ConfigError};

/// Identifies which backend service a request targets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
	/// Main application API.
	#[default]
	Api,
	/// Additional service registered by name.
	Named(String),
}
impl ServiceKind {
	/// Builds a named service identifier.
	pub fn named(name: impl Into<String>) -> Self {
		Self::Named(name.into())
	}

	/// Returns a stable label suitable for log fields and error messages.
	pub fn as_str(&self) -> &str {
		match self {
			ServiceKind::Api => "api",
			ServiceKind::Named(name) => name,
		}
	}
}
impl Display for ServiceKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Host description for one backend service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoint {
	/// Scheme prefix such as `https://`.
	pub url_prefix: String,
	/// Subdomain including its trailing dot, e.g. `api.`; may be empty.
	pub subdomain: String,
	/// Domain (and optional port).
	pub domain: String,
	/// Whether requests to this service go through the auth gate.
	pub access_token_required: bool,
}
impl ServiceEndpoint {
	/// Creates an endpoint that requires an access token.
	pub fn new(
		url_prefix: impl Into<String>,
		subdomain: impl Into<String>,
		domain: impl Into<String>,
	) -> Self {
		Self {
			url_prefix: url_prefix.into(),
			subdomain: subdomain.into(),
			domain: domain.into(),
			access_token_required: true,
		}
	}

	/// Creates an HTTPS endpoint for `subdomain` + `domain`.
	pub fn https(subdomain: impl Into<String>, domain: impl Into<String>) -> Self {
		Self::new("https://", subdomain, domain)
	}

	/// Splits a base URL such as `http://127.0.0.1:8080` into prefix and domain.
	///
	/// The domain is rebuilt from the parsed host, port, and path; query and fragment are dropped.
	pub fn from_base_url(base: &str) -> Result<Self, ConfigError> {
		let invalid =
			|source: url::ParseError| ConfigError::InvalidEndpoint { service: base.into(), source };
		let parsed = Url::parse(base).map_err(invalid)?;
		let host = parsed
			.host_str()
			.filter(|host| !host.is_empty())
			.ok_or_else(|| invalid(url::ParseError::EmptyHost))?;
		let mut domain = match parsed.port() {
			Some(port) => format!("{host}:{port}"),
			None => host.to_owned(),
		};

		domain.push_str(parsed.path().trim_end_matches('/'));

		Ok(Self::new(format!("{}://", parsed.scheme()), "", domain))
	}

	/// Marks the service as public so no access token is ever attached.
	pub fn without_access_token(mut self) -> Self {
		self.access_token_required = false;

		self
	}

	/// Returns the scheme, subdomain, and domain joined together.
	pub fn base(&self) -> String {
		format!("{}{}{}", self.url_prefix, self.subdomain, self.domain)
	}

	/// Appends `path` to the endpoint base.
	pub fn complete_url(&self, path: &str) -> String {
		format!("{}{path}", self.base())
	}

	fn validate(
		&self,
		service: &ServiceKind,
		allow_insecure_http: bool,
	) -> Result<(), ConfigError> {
		let url = Url::parse(&self.base()).map_err(|source| ConfigError::InvalidEndpoint {
			service: service.to_string(),
			source,
		})?;

		if url.scheme() != "https" && !allow_insecure_http {
			return Err(ConfigError::InsecureEndpoint {
				service: service.to_string(),
				url: url.to_string(),
			});
		}

		Ok(())
	}
}

/// Validated pipeline configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Static key sent as `x-client-token-ios` on every request.
	pub client_key: String,
	/// Main application API, which also serves the refresh endpoint.
	pub api: ServiceEndpoint,
	/// Additional services registered by name; an [`ServiceKind::Api`] entry here is ignored.
	pub services: HashMap<ServiceKind, ServiceEndpoint>,
	/// Path prefixes that never carry an access token.
	pub exempt_prefixes: Vec<String>,
	/// Path on the main API that exchanges a refresh token for a new access token.
	pub refresh_path: String,
	/// Access tokens expiring within this window are refreshed before use.
	pub preemptive_window: Duration,
	/// Refresh calls attempted before the session is abandoned.
	pub max_refresh_attempts: u8,
	/// Optional transport timeout; the transport default applies when unset.
	pub request_timeout: Option<std::time::Duration>,
}
impl ClientConfig {
	/// Creates a new builder for the provided client key and main API endpoint.
	pub fn builder(client_key: impl Into<String>, api: ServiceEndpoint) -> ClientConfigBuilder {
		ClientConfigBuilder::new(client_key, api)
	}

	/// Returns the endpoint registered for `service`.
	pub fn service(&self, service: &ServiceKind) -> Option<&ServiceEndpoint> {
		match service {
			ServiceKind::Api => Some(&self.api),
			named => self.services.get(named),
		}
	}

	/// Absolute URL of the refresh endpoint on the main API.
	pub fn refresh_url(&self) -> String {
		self.api.complete_url(&self.refresh_path)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	client_key: String,
	api: ServiceEndpoint,
	services: HashMap<ServiceKind, ServiceEndpoint>,
	exempt_prefixes: Vec<String>,
	refresh_path: String,
	preemptive_window: Duration,
	max_refresh_attempts: u8,
	request_timeout: Option<std::time::Duration>,
	allow_insecure_http: bool,
}
impl ClientConfigBuilder {
	/// Largest supported refresh attempt budget.
	pub const MAX_REFRESH_ATTEMPTS: u8 = 5;

	const DEFAULT_EXEMPT_PREFIX: &'static str = "/auth/login";
	const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);
	const DEFAULT_REFRESH_ATTEMPTS: u8 = 2;
	const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";

	/// Creates a builder seeded with defaults.
	pub fn new(client_key: impl Into<String>, api: ServiceEndpoint) -> Self {
		Self {
			client_key: client_key.into(),
			api,
			services: HashMap::new(),
			exempt_prefixes: vec![Self::DEFAULT_EXEMPT_PREFIX.into()],
			refresh_path: Self::DEFAULT_REFRESH_PATH.into(),
			preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW,
			max_refresh_attempts: Self::DEFAULT_REFRESH_ATTEMPTS,
			request_timeout: None,
			allow_insecure_http: false,
		}
	}

	/// Registers (or replaces) a service; [`ServiceKind::Api`] replaces the main API.
	pub fn service(mut self, kind: ServiceKind, endpoint: ServiceEndpoint) -> Self {
		match kind {
			ServiceKind::Api => self.api = endpoint,
			named => {
				self.services.insert(named, endpoint);
			},
		}

		self
	}

	/// Adds a path prefix that bypasses token attachment.
	pub fn exempt_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.exempt_prefixes.push(prefix.into());

		self
	}

	/// Replaces the exempt path prefixes.
	pub fn exempt_prefixes<I, S>(mut self, prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exempt_prefixes = prefixes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the preemptive refresh window (defaults to 60 seconds).
	pub fn preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Overrides the refresh attempt budget (defaults to 2).
	pub fn max_refresh_attempts(mut self, attempts: u8) -> Self {
		self.max_refresh_attempts = attempts;

		self
	}

	/// Sets a transport timeout.
	pub fn request_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Permits plain-HTTP endpoints, for local mock servers.
	pub fn allow_insecure_http(mut self) -> Self {
		self.allow_insecure_http = true;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		if self.client_key.trim().is_empty() {
			return Err(ConfigError::MissingClientKey);
		}
		if !(1..=Self::MAX_REFRESH_ATTEMPTS).contains(&self.max_refresh_attempts) {
			return Err(ConfigError::InvalidRefreshAttempts {
				attempts: self.max_refresh_attempts,
				max: Self::MAX_REFRESH_ATTEMPTS,
			});
		}

		self.api.validate(&ServiceKind::Api, self.allow_insecure_http)?;

		for (kind, endpoint) in &self.services {
			endpoint.validate(kind, self.allow_insecure_http)?;
		}
		for path in self.exempt_prefixes.iter().chain([&self.refresh_path]) {
			validate_path(path)?;
		}

		Ok(ClientConfig {
			client_key: self.client_key,
			api: self.api,
			services: self.services,
			exempt_prefixes: self.exempt_prefixes,
			refresh_path: self.refresh_path,
			preemptive_window: self.preemptive_window,
			max_refresh_attempts: self.max_refresh_attempts,
			request_timeout: self.request_timeout,
		})
	}
}

fn validate_path(path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidPath { path: path.into() })
	}
}
