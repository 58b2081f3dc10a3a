//! Result reconciliation: maps dispatch outcomes onto displayed state
//!
//! Every dispatch takes a ticket with a sequence number. Only a completion
//! carrying the latest ticket may change what is displayed; anything older is
//! a stale response and is dropped.

use crate::error::DetectError;
use crate::request::{DetectionResponse, DetectionResult};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl DetectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionState::Idle => "idle",
            DetectionState::Pending => "pending",
            DetectionState::Succeeded => "succeeded",
            DetectionState::Failed => "failed",
        }
    }
}

/// Identifies one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DispatchTicket {
    seq: u64,
}

/// What a completion did to the displayed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied(DetectionResult),
    Failed(String),
    Stale,
}

#[derive(Debug)]
pub struct Reconciler {
    state: DetectionState,
    latest_seq: u64,
    result: Option<DetectionResult>,
    failure_count: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            state: DetectionState::Idle,
            latest_seq: 0,
            result: None,
            failure_count: 0,
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.result.as_ref()
    }

    /// Diagnostics emitted so far, one per failed dispatch
    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Enter `Pending` for a new dispatch. Allowed from every state.
    pub fn begin(&mut self) -> DispatchTicket {
        self.latest_seq += 1;
        self.state = DetectionState::Pending;
        debug!("Dispatch #{} pending", self.latest_seq);
        DispatchTicket {
            seq: self.latest_seq,
        }
    }

    /// Settle a dispatch. Failures never touch the displayed result.
    pub fn complete(
        &mut self,
        ticket: DispatchTicket,
        outcome: Result<DetectionResponse, DetectError>,
    ) -> Completion {
        if ticket.seq != self.latest_seq {
            debug!(
                "Discarding stale response for dispatch #{} (latest #{})",
                ticket.seq, self.latest_seq
            );
            return Completion::Stale;
        }

        match outcome {
            Ok(response) => {
                let result = DetectionResult::from(response);
                debug!(
                    "Dispatch #{} succeeded: {} person(s)",
                    ticket.seq, result.person_count
                );
                self.result = Some(result.clone());
                self.state = DetectionState::Succeeded;
                Completion::Applied(result)
            }
            Err(err) => {
                error!(class = ?err.class(), "Detection request #{} failed: {}", ticket.seq, err);
                let message = err.to_string();
                self.failure_count += 1;
                self.state = DetectionState::Failed;
                Completion::Failed(message)
            }
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
