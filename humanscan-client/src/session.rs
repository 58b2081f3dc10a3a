//! Detection session: the single owner of all client-side state
//!
//! The preview image, the threshold field and the reconciler live here and are
//! only changed through the methods below. A dispatch is split into
//! prepare / send / apply so that the network call does not borrow the
//! session and several dispatches may be in flight at once.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::image::{read_image, SelectedImage};
use crate::reconciler::{Completion, DetectionState, DispatchTicket, Reconciler};
use crate::request::{DetectionRequest, DetectionResponse, DetectionResult};
use crate::threshold::{ThresholdEdit, ThresholdField};
use crate::transport::{DetectionService, HttpDetectionService};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A dispatch that passed the precondition check and holds its request
#[derive(Debug, Clone)]
pub struct PendingDispatch {
    ticket: DispatchTicket,
    request: DetectionRequest,
}

impl PendingDispatch {
    pub fn ticket(&self) -> DispatchTicket {
        self.ticket
    }

    /// Perform the call. Never fails; the outcome is carried to [`DetectionSession::apply`].
    pub async fn send<S: DetectionService + ?Sized>(self, service: &S) -> CompletedDispatch {
        let outcome = service.detect(&self.request).await;
        CompletedDispatch {
            ticket: self.ticket,
            outcome,
        }
    }
}

/// A finished call waiting to be reconciled
#[derive(Debug)]
pub struct CompletedDispatch {
    ticket: DispatchTicket,
    outcome: Result<DetectionResponse>,
}

/// Snapshot of both display regions
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub preview: Option<String>,
    pub threshold_text: String,
    pub threshold: f64,
    pub state: DetectionState,
    pub annotated_image: Option<String>,
    pub person_count: Option<u64>,
    pub failure_count: u64,
}

pub struct DetectionSession<S: DetectionService> {
    service: Arc<S>,
    config: ClientConfig,
    selected_image: Option<SelectedImage>,
    threshold: ThresholdField,
    reconciler: Reconciler,
}

impl DetectionSession<HttpDetectionService> {
    /// Session talking to the configured HTTP endpoint
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let service = HttpDetectionService::from_config(&config)?;
        Ok(Self::new(service, config))
    }
}

impl<S: DetectionService> DetectionSession<S> {
    pub fn new(service: S, config: ClientConfig) -> Self {
        let threshold = ThresholdField::new(config.default_threshold, config.threshold_policy);
        Self {
            service: Arc::new(service),
            config,
            selected_image: None,
            threshold,
            reconciler: Reconciler::new(),
        }
    }

    pub fn service(&self) -> Arc<S> {
        Arc::clone(&self.service)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn selected_image(&self) -> Option<&SelectedImage> {
        self.selected_image.as_ref()
    }

    pub fn threshold(&self) -> &ThresholdField {
        &self.threshold
    }

    pub fn state(&self) -> DetectionState {
        self.reconciler.state()
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.reconciler.result()
    }

    /// Read the chosen file and make it the selected image.
    ///
    /// Returns `false` when no file was chosen. A new selection replaces the
    /// previous one wholesale and leaves any displayed result alone.
    pub async fn select_image(&mut self, path: Option<&Path>) -> Result<bool> {
        match read_image(path, self.config.max_image_bytes).await? {
            Some(image) => {
                info!("Selected {} image ({} base64 chars)", image.mime(), image.payload_len());
                self.selected_image = Some(image);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Select an already-encoded image
    pub fn set_image(&mut self, image: SelectedImage) {
        self.selected_image = Some(image);
    }

    pub fn edit_threshold(&mut self, raw: &str) -> ThresholdEdit {
        self.threshold.edit(raw)
    }

    /// Check the precondition, build the request and move to `Pending`.
    ///
    /// Without a selected image nothing changes and no request exists.
    pub fn prepare_dispatch(&mut self) -> Result<PendingDispatch> {
        let request = DetectionRequest::build(self.selected_image.as_ref(), &self.threshold)?;
        let ticket = self.reconciler.begin();
        Ok(PendingDispatch { ticket, request })
    }

    pub fn apply(&mut self, completed: CompletedDispatch) -> Completion {
        self.reconciler.complete(completed.ticket, completed.outcome)
    }

    /// Prepare, send and apply one dispatch.
    ///
    /// Only the precondition error is returned as `Err`; transport failures
    /// come back as [`Completion::Failed`].
    pub async fn dispatch(&mut self) -> Result<Completion> {
        let pending = self.prepare_dispatch()?;
        let service = self.service();
        let completed = pending.send(service.as_ref()).await;
        Ok(self.apply(completed))
    }

    pub fn view(&self) -> SessionView {
        let result = self.reconciler.result();
        SessionView {
            preview: self.selected_image.as_ref().map(|i| i.as_data_uri().to_string()),
            threshold_text: self.threshold.text().to_string(),
            threshold: self.threshold.value(),
            state: self.reconciler.state(),
            annotated_image: result.map(|r| r.annotated_image.clone()),
            person_count: result.map(|r| r.person_count),
            failure_count: self.reconciler.failure_count(),
        }
    }
}

