//! Single-assignment job result.
//!
//! Several stages of a job may try to settle its result. Only the first
//! attempt takes effect; later `resolve`/`reject` calls are no-ops.

use std::sync::{Mutex, PoisonError};

use frameforge_common::error::{FrameforgeError, FrameforgeResult};
use tokio::sync::oneshot;

/// Write side of a job result.
#[derive(Debug)]
pub struct Settlement<T> {
    sender: Mutex<Option<oneshot::Sender<FrameforgeResult<T>>>>,
}

impl<T> Settlement<T> {
    /// Create a settlement and the receiver its outcome is delivered to.
    pub fn new() -> (Self, oneshot::Receiver<FrameforgeResult<T>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Fulfill the result. Returns `false` if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Reject the result. Returns `false` if it was already settled.
    pub fn reject(&self, error: FrameforgeError) -> bool {
        self.settle(Err(error))
    }

    pub fn is_settled(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn settle(&self, outcome: FrameforgeResult<T>) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => {
                // A dropped receiver means nobody awaits the job any more.
                let _ = tx.send(outcome);
                true
            }
            None => {
                if let Err(e) = &outcome {
                    tracing::debug!(error = %e, "Ignoring rejection of an already settled job");
                } else {
                    tracing::debug!("Ignoring resolution of an already settled job");
                }
                false
            }
        }
    }
}
