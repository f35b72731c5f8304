//! Global cancellation of outstanding requests.
//!
//! Every executing request holds a [`TaskTicket`] for the duration of its transport call. The
//! registry can cancel all of them at once, e.g. on logout or app teardown; there is no
//! per-request targeting.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
// self
use crate::{_prelude::*, obs, request::TaskKind};

#[derive(Debug)]
struct RegisteredTask {
	kind: TaskKind,
	token: CancellationToken,
}

#[derive(Debug, Default)]
struct RegistryInner {
	next_id: AtomicU64,
	tasks: Mutex<HashMap<u64, RegisteredTask>>,
}

/// Tracks in-flight requests by category and cancels them on demand.
#[derive(Clone, Debug, Default)]
pub struct CancellationRegistry(Arc<RegistryInner>);
impl CancellationRegistry {
	/// Registers a new in-flight task; dropping the ticket deregisters it.
	pub fn register(&self, kind: TaskKind) -> TaskTicket {
		let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
		let token = CancellationToken::new();

		self.0.tasks.lock().insert(id, RegisteredTask { kind, token: token.clone() });

		TaskTicket { id, kind, token, registry: self.0.clone() }
	}

	/// Number of registered tasks in `kind`.
	pub fn outstanding(&self, kind: TaskKind) -> usize {
		self.0.tasks.lock().values().filter(|task| task.kind == kind).count()
	}

	/// Cancels every registered task. Categories without tasks are skipped.
	pub fn stop_all(&self) -> StopSummary {
		let drained: Vec<RegisteredTask> =
			self.0.tasks.lock().drain().map(|(_, task)| task).collect();
		let mut summary = StopSummary::default();

		for kind in TaskKind::ALL {
			let tasks: Vec<&RegisteredTask> =
				drained.iter().filter(|task| task.kind == kind).collect();

			if tasks.is_empty() {
				continue;
			}

			obs::log_stopping(kind, tasks.len());
			tasks.iter().for_each(|task| task.token.cancel());
			obs::log_stopped(kind);
			obs::record_canceled(kind, tasks.len());
			summary.record(kind, tasks.len());
		}

		summary
	}
}

/// Registration handle held by an executing request.
#[derive(Debug)]
pub struct TaskTicket {
	id: u64,
	kind: TaskKind,
	token: CancellationToken,
	registry: Arc<RegistryInner>,
}
impl TaskTicket {
	/// Category the ticket was registered under.
	pub fn kind(&self) -> TaskKind {
		self.kind
	}

	/// Returns `true` once [`CancellationRegistry::stop_all`] canceled this task.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Resolves when the task is canceled.
	pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
		self.token.cancelled()
	}
}
impl Drop for TaskTicket {
	fn drop(&mut self) {
		self.registry.tasks.lock().remove(&self.id);
	}
}

/// Per-category counts of tasks canceled by [`CancellationRegistry::stop_all`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StopSummary {
	/// Canceled data tasks.
	pub data: usize,
	/// Canceled upload tasks.
	pub upload: usize,
	/// Canceled download tasks.
	pub download: usize,
}
impl StopSummary {
	/// Total number of canceled tasks.
	pub fn total(&self) -> usize {
		self.data + self.upload + self.download
	}

	/// Returns `true` when nothing was canceled.
	pub fn is_empty(&self) -> bool {
		self.total() == 0
	}

	fn record(&mut self, kind: TaskKind, count: usize) {
		match kind {
			TaskKind::Data => self.data += count,
			TaskKind::Upload => self.upload += count,
			TaskKind::Download => self.download += count,
		}
	}
}
