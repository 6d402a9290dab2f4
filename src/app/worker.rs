use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::app::error::AppError;
use crate::app::executor::CommandExecutor;
use crate::app::models::{CommandEntry, CommandKind, DeviceTarget, ExecutionOutcome};

pub type ExecutionEmitter = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionEvent {
    pub job_id: String,
    pub trace_id: String,
    pub serial: String,
    pub title: String,
    pub kind: CommandKind,
    pub outcome: Option<ExecutionOutcome>,
    pub error: Option<AppError>,
}

/// Emitter that forwards events into a channel the shell drains on its own thread.
pub fn channel_emitter() -> (ExecutionEmitter, Receiver<ExecutionEvent>) {
    let (tx, rx) = mpsc::channel::<ExecutionEvent>();
    let emitter: ExecutionEmitter = Arc::new(move |event| {
        if tx.send(event).is_err() {
            warn!("execution event dropped: receiver closed");
        }
    });
    (emitter, rx)
}

/// Moves executions off the caller's thread. Each submission gets its own
/// thread; there is no queue and no cap on concurrent jobs.
#[derive(Clone)]
pub struct ExecutionWorker {
    executor: Arc<CommandExecutor>,
    emitter: ExecutionEmitter,
}

impl ExecutionWorker {
    pub fn new(executor: Arc<CommandExecutor>, emitter: ExecutionEmitter) -> Self {
        Self { executor, emitter }
    }

    /// Starts the job and returns its id; the result arrives as one event.
    pub fn submit(&self, target: DeviceTarget, entry: CommandEntry, trace_id: String) -> String {
        let job_id = Uuid::new_v4().to_string();
        let executor = Arc::clone(&self.executor);
        let emitter = Arc::clone(&self.emitter);
        let job_id_thread = job_id.clone();

        std::thread::spawn(move || {
            let result = executor.run(&target, &entry, &trace_id);
            let (outcome, error) = match result {
                Ok(outcome) => (Some(outcome), None),
                Err(err) => (None, Some(err)),
            };
            (emitter)(ExecutionEvent {
                job_id: job_id_thread,
                trace_id,
                serial: target.serial,
                title: entry.title,
                kind: entry.kind,
                outcome,
                error,
            });
        });

        job_id
    }
}
