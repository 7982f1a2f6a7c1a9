//! Background thread that runs generation jobs and hands their events back
//! over a channel, so the session only ever mutates state on its own thread.

use crate::error::{NarrationError, Result};
use crate::generation::{GenerationEvent, GenerationEventKind, GenerationJob, run_generation};
use crate::synthesis::SynthesisClient;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub struct GenerationWorker {
    client: Arc<dyn SynthesisClient>,
    tx: Sender<GenerationEvent>,
    rx: Receiver<GenerationEvent>,
    running: Vec<JoinHandle<()>>,
}

impl GenerationWorker {
    pub fn new(client: Arc<dyn SynthesisClient>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            client,
            tx,
            rx,
            running: Vec::new(),
        }
    }

    pub fn submit(&mut self, job: GenerationJob) -> Result<()> {
        self.reap();
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let request_id = job.request_id;
        let handle = thread::Builder::new()
            .name(format!("narration-{request_id}"))
            .spawn(move || {
                run_generation(client.as_ref(), &job, |event| {
                    if tx.send(event).is_err() {
                        debug!(request_id, "Event receiver dropped");
                    }
                });
            })
            .map_err(|err| NarrationError::NetworkError(format!("spawning worker: {err}")))?;
        debug!(request_id, "Generation job submitted");
        self.running.push(handle);
        Ok(())
    }

    /// Events that have already arrived, in delivery order.
    pub fn drain(&self) -> Vec<GenerationEvent> {
        self.rx.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<GenerationEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Generation channel disconnected");
                None
            }
        }
    }

    /// Block until `request_id` reports its terminal event, returning every
    /// event seen on the way. Gives up after `timeout` of silence.
    pub fn wait_for(&self, request_id: u64, timeout: Duration) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv_timeout(timeout) {
            let terminal = event.request_id == request_id
                && matches!(
                    event.kind,
                    GenerationEventKind::Completed { .. } | GenerationEventKind::Failed { .. }
                );
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    fn reap(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = self
            .running
            .drain(..)
            .partition(|handle| handle.is_finished());
        self.running = running;
        for handle in finished {
            if handle.join().is_err() {
                warn!("Generation thread panicked");
            }
        }
    }
}
