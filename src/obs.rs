//! Optional observability helpers for pipeline flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit `bearer_pipeline.request` and `bearer_pipeline.refresh` spans,
//!   plus the diagnostic events in [`log`](self::log).
//! - Enable `metrics` to publish `bearer_pipeline_flow_total` (by `flow` and `outcome`),
//!   `bearer_pipeline_logout_total` (by `reason`), and `bearer_pipeline_canceled_total`
//!   (by `task`).

mod log;
mod metrics;
mod tracing;

pub use log::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// A caller-issued backend request.
	Request,
	/// An access-token refresh sequence.
	Refresh,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Request => "request",
			FlowKind::Refresh => "refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a pipeline flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Why the pipeline asked the app to log the user out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogoutReason {
	/// An authenticated request came back 401 or 403.
	AuthRejected,
	/// The refresh token was missing or past its expiry.
	RefreshExpired,
	/// Every refresh attempt failed.
	RefreshExhausted,
}
impl LogoutReason {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			LogoutReason::AuthRejected => "auth_rejected",
			LogoutReason::RefreshExpired => "refresh_expired",
			LogoutReason::RefreshExhausted => "refresh_exhausted",
		}
	}
}
