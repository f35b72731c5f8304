//! Spans covering caller requests and refresh sequences.

// self
use crate::{
	_prelude::*,
	config::ServiceKind,
	http::Method,
	obs::{self, FlowKind, FlowOutcome},
};

/// Future returned by [`FlowSpan::instrument`]; the input future itself without `tracing`.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; the input future itself without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span around one pipeline flow.
///
/// Opening a span counts a [`FlowOutcome::Attempt`]; [`FlowSpan::finish`] records the result on
/// both the span and the flow counter.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a `bearer_pipeline.request` span tagged with the method, service, and path.
	pub fn request(method: &Method, service: &ServiceKind, path: &str) -> Self {
		obs::record_flow_outcome(FlowKind::Request, FlowOutcome::Attempt);

		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"bearer_pipeline.request",
				method = method.as_str(),
				service = service.as_str(),
				path,
				outcome = tracing::field::Empty,
				status = tracing::field::Empty,
			);

			Self { kind: FlowKind::Request, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, service, path);

			Self { kind: FlowKind::Request }
		}
	}

	/// Opens a `bearer_pipeline.refresh` span for the sequence following `generation`.
	pub fn refresh(generation: u64) -> Self {
		obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Attempt);

		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"bearer_pipeline.refresh",
				generation,
				outcome = tracing::field::Empty,
				status = tracing::field::Empty,
			);

			Self { kind: FlowKind::Refresh, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = generation;

			Self { kind: FlowKind::Refresh }
		}
	}

	/// Flow covered by the span.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Records the flow's result. Failures carrying a status code tag the span with it.
	pub fn finish<T>(&self, result: &Result<T>) {
		let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());

			if let Some(status) = result.as_ref().err().and_then(Error::status) {
				self.span.record("status", status);
			}
		}

		obs::record_flow_outcome(self.kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn spans_cover_requests_and_refreshes() {
		let request = FlowSpan::request(&Method::GET, &ServiceKind::Api, "/api/v1/coins");
		let refresh = FlowSpan::refresh(3);

		assert_eq!(request.kind(), FlowKind::Request);
		assert_eq!(refresh.kind(), FlowKind::Refresh);

		let value = refresh.instrument(async { 42 }).await;

		assert_eq!(value, 42);

		request.finish(&Ok::<_, Error>(value));
		refresh.finish(&Err::<(), _>(Error::unauthorized(Error::UNAUTHORIZED)));
	}
}
