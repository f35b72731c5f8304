//! Counters published through the global `metrics` recorder when the feature is enabled.

// self
use crate::{
	obs::{FlowKind, FlowOutcome, LogoutReason},
	request::TaskKind,
};

/// Increments `bearer_pipeline_flow_total`, labeled by `flow` and `outcome`.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"bearer_pipeline_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Increments `bearer_pipeline_logout_total`, labeled by `reason`.
pub fn record_logout(reason: LogoutReason) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("bearer_pipeline_logout_total", "reason" => reason.as_str()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = reason;
	}
}

/// Adds `count` to `bearer_pipeline_canceled_total`, labeled by `task`.
pub fn record_canceled(kind: TaskKind, count: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("bearer_pipeline_canceled_total", "task" => kind.as_str())
			.increment(count as u64);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, count);
	}
}
