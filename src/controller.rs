//! The conversion controller: one submission at a time, start to finish.
//!
//! ## Submission flow
//!
//! ```text
//! submit(form)
//!  │
//!  ├─ 0. Claim     single-slot guard; a second caller gets ConvertError::Busy
//!  ├─ 1. Validate  missing file → Error(reason), no request built
//!  ├─ 2. Build     FormState → ConversionRequest (pure)
//!  ├─ 3. Send      status = Loading; the only long suspension point
//!  ├─ 4. Handle    non-2xx → Error(detail); 2xx → Download
//!  ├─ 5. Deliver   hand the file to the download sink
//!  └─ 6. Settle    status = Success | Error; guard released
//! ```
//!
//! The guard is released by `Drop`, so the in-flight flag is cleared on every
//! exit path: early validation failure, error, cancellation, a panic inside
//! the transport or sink, or the caller dropping the submission future. A
//! guard dropped before the submission settled writes the terminal status
//! itself and calls `on_submit_complete`:
//!
//! | Exit                      | Status                                 |
//! |---------------------------|----------------------------------------|
//! | future dropped            | `Error("Conversion cancelled")`        |
//! | panic while unwinding     | `Error("Internal error: conversion aborted by a panic")` |

use crate::config::{ControllerConfig, Deployment};
use crate::download::{DownloadReceipt, DownloadSink, FsDownloadSink};
use crate::error::ConvertError;
use crate::form::FormState;
use crate::pipeline::request::build_request;
use crate::pipeline::response::interpret;
use crate::pipeline::transport::{HttpTransport, Transport};
use crate::pipeline::validate::{validate, Validation};
use crate::status::{ConversionStatus, NoopStatusObserver, SessionSnapshot, StatusCallback};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives submissions against one conversion service.
///
/// # Example
/// ```rust,no_run
/// use audio_producer::{load_attachment, ControllerConfig, ConversionController, FormState};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let controller = ConversionController::new(
///     ControllerConfig::builder()
///         .base_url("http://localhost:8000")
///         .output_dir("converted")
///         .build()?,
/// )?;
///
/// let form = FormState::new()
///     .with_audio(load_attachment("take1.wav").await?)
///     .with_cover(load_attachment("cover.jpg").await?)
///     .with_field("title", "Song")
///     .with_field("album", "Demo");
///
/// match controller.submit(&form).await {
///     Ok(receipt) => println!("saved {:?}", receipt.location),
///     Err(_) => eprintln!("{}", controller.status().message),
/// }
/// # Ok(())
/// # }
/// ```
pub struct ConversionController {
    deployment: Deployment,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn DownloadSink>,
    observer: StatusCallback,
    status: Mutex<ConversionStatus>,
    in_flight: AtomicBool,
}

impl std::fmt::Debug for ConversionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionController")
            .field("deployment", &self.deployment.name)
            .field("status", &self.status())
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

impl ConversionController {
    /// Create a controller.
    ///
    /// Uses the configured transport, sink and observer when present;
    /// otherwise an [`HttpTransport`] for `config.url()`, an
    /// [`FsDownloadSink`] on `config.output_dir` and a no-op observer.
    pub fn new(config: ControllerConfig) -> Result<Self, ConvertError> {
        let transport: Arc<dyn Transport> = match config.transport {
            Some(ref t) => Arc::clone(t),
            None => Arc::new(HttpTransport::new(&config)?),
        };
        let sink: Arc<dyn DownloadSink> = match config.sink {
            Some(ref s) => Arc::clone(s),
            None => Arc::new(FsDownloadSink::new(config.output_dir.clone())),
        };
        let observer: StatusCallback = config
            .status_observer
            .clone()
            .unwrap_or_else(|| Arc::new(NoopStatusObserver));

        debug!("Controller ready: {:?}", config);

        Ok(Self {
            deployment: config.deployment,
            transport,
            sink,
            observer,
            status: Mutex::new(ConversionStatus::idle()),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Current status.
    pub fn status(&self) -> ConversionStatus {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether a submission currently holds the controller.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            in_flight: self.is_in_flight(),
        }
    }

    /// Put the status back to `Idle`. Ignored while a submission is running.
    ///
    /// Holds the submission slot for the write, so a submission starting
    /// concurrently cannot have its `Loading` overwritten.
    pub fn reset(&self) {
        if let Some(mut guard) = SubmissionGuard::claim(self) {
            self.set_status(ConversionStatus::idle());
            guard.settle();
        }
    }

    /// Submit `form` and wait for the outcome.
    ///
    /// The returned error is also written to the status channel, except for
    /// [`ConvertError::Busy`], which leaves the running submission's status
    /// untouched.
    pub async fn submit(&self, form: &FormState) -> Result<DownloadReceipt, ConvertError> {
        self.submit_with_cancel(form, CancellationToken::new()).await
    }

    /// Like [`ConversionController::submit`], aborting the outstanding
    /// request when `cancel` fires. A cancelled submission settles to
    /// `Error("Conversion cancelled")`.
    pub async fn submit_with_cancel(
        &self,
        form: &FormState,
        cancel: CancellationToken,
    ) -> Result<DownloadReceipt, ConvertError> {
        let mut guard = SubmissionGuard::claim(self).ok_or_else(|| {
            warn!("Submission rejected: a conversion is already in progress");
            ConvertError::Busy
        })?;

        self.observer.on_submit_start();
        let start = Instant::now();
        info!("Submitting form to '{}' deployment", self.deployment.name);

        let result = self.run(form, &cancel).await;

        let settled = match &result {
            Ok(_) => ConversionStatus::success(),
            Err(e) => ConversionStatus::error(e.status_message()),
        };
        self.set_status(settled.clone());
        guard.settle();

        match &result {
            Ok(receipt) => info!(
                "Conversion complete: '{}' ({} bytes) in {}ms",
                receipt.file_name,
                receipt.bytes,
                start.elapsed().as_millis()
            ),
            Err(e) => warn!(
                "Conversion failed after {}ms: {}",
                start.elapsed().as_millis(),
                e
            ),
        }

        self.observer.on_submit_complete(&settled);
        result
    }

    /// Synchronous wrapper around [`ConversionController::submit`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from
    /// inside an async context.
    pub fn submit_blocking(&self, form: &FormState) -> Result<DownloadReceipt, ConvertError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {e}")))?
            .block_on(self.submit(form))
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    async fn run(
        &self,
        form: &FormState,
        cancel: &CancellationToken,
    ) -> Result<DownloadReceipt, ConvertError> {
        // ── Step 1: Validate ─────────────────────────────────────────────
        if let Validation::Invalid(reason) = validate(form, &self.deployment) {
            debug!("Validation failed: {}", reason);
            return Err(ConvertError::Validation { reason });
        }

        // ── Step 2: Build the multipart payload ──────────────────────────
        let request = build_request(form, &self.deployment)?;

        // ── Step 3: Send ─────────────────────────────────────────────────
        self.set_status(ConversionStatus::loading());
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConvertError::Cancelled),
            response = self.transport.send(request) => response?,
        };

        // ── Step 4: Interpret ────────────────────────────────────────────
        let download = interpret(response, form, &self.deployment)?;

        // ── Step 5: Deliver ──────────────────────────────────────────────
        self.sink.deliver(download).await
    }

    fn set_status(&self, status: ConversionStatus) {
        {
            let mut current = self.status.lock().unwrap_or_else(|e| e.into_inner());
            *current = status.clone();
        }
        debug!("Status → {:?}: {}", status.state, status.message);
        self.observer.on_status(&status);
    }
}

/// Text of the status written when a submission unwinds from a panic.
const PANIC_MESSAGE: &str = "conversion aborted by a panic";

/// Holds the controller's single submission slot until dropped.
struct SubmissionGuard<'a> {
    controller: &'a ConversionController,
    /// Set once the terminal status has been written.
    settled: bool,
}

impl<'a> SubmissionGuard<'a> {
    fn claim(controller: &'a ConversionController) -> Option<Self> {
        controller
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                controller,
                settled: false,
            })
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let error = if std::thread::panicking() {
                ConvertError::Internal(PANIC_MESSAGE.to_string())
            } else {
                ConvertError::Cancelled
            };
            warn!("Submission ended without settling: {}", error);
            let status = ConversionStatus::error(error.status_message());
            self.controller.set_status(status.clone());
            self.controller.observer.on_submit_complete(&status);
        }
        self.controller.in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::MemoryDownloadSink;
    use crate::form::Attachment;
    use crate::pipeline::request::ConversionRequest;
    use crate::pipeline::transport::TransportResponse;
    use async_trait::async_trait;

    struct FixedTransport(TransportResponse);

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, _: ConversionRequest) -> Result<TransportResponse, ConvertError> {
            Ok(self.0.clone())
        }
    }

    fn controller(status: u16, body: &[u8]) -> ConversionController {
        let config = ControllerConfig::builder()
            .transport(Arc::new(FixedTransport(TransportResponse {
                status,
                content_type: None,
                body: body.to_vec(),
            })))
            .sink(Arc::new(MemoryDownloadSink::new()))
            .build()
            .unwrap();
        ConversionController::new(config).unwrap()
    }

    fn full_form() -> FormState {
        FormState::new()
            .with_audio(Attachment::new("a.wav", "audio/wav", vec![1]))
            .with_cover(Attachment::new("c.jpg", "image/jpeg", vec![2]))
            .with_field("title", "Song")
    }

    #[test]
    fn starts_idle() {
        let c = controller(200, b"");
        assert_eq!(c.status(), ConversionStatus::idle());
        assert!(!c.is_in_flight());
    }

    #[test]
    fn guard_is_single_slot_and_released_on_drop() {
        let c = controller(200, b"");
        let first = SubmissionGuard::claim(&c).expect("first claim");
        assert!(c.is_in_flight());
        assert!(SubmissionGuard::claim(&c).is_none());
        drop(first);
        assert!(!c.is_in_flight());
        assert!(SubmissionGuard::claim(&c).is_some());
    }

    #[test]
    fn dropped_guard_settles_loading_to_cancelled() {
        let c = controller(200, b"");
        let guard = SubmissionGuard::claim(&c).unwrap();
        c.set_status(ConversionStatus::loading());
        drop(guard);
        assert_eq!(c.status(), ConversionStatus::error("Conversion cancelled"));
    }

    #[test]
    fn settled_guard_leaves_status_alone() {
        let c = controller(200, b"");
        let mut guard = SubmissionGuard::claim(&c).unwrap();
        c.set_status(ConversionStatus::success());
        guard.settle();
        drop(guard);
        assert_eq!(c.status(), ConversionStatus::success());
        assert!(!c.is_in_flight());
    }

    #[test]
    fn guard_dropped_by_panic_reports_internal_error() {
        let c = controller(200, b"");
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = SubmissionGuard::claim(&c).unwrap();
            c.set_status(ConversionStatus::loading());
            panic!("boom");
        }));
        assert!(outcome.is_err());
        assert_eq!(
            c.status(),
            ConversionStatus::error("Internal error: conversion aborted by a panic")
        );
        assert!(!c.is_in_flight());
    }

    #[test]
    fn reset_does_not_touch_a_claimed_slot() {
        let c = controller(200, b"");
        let guard = SubmissionGuard::claim(&c).unwrap();
        c.set_status(ConversionStatus::loading());
        c.reset();
        assert!(c.status().is_loading());
        drop(guard);
    }

    #[tokio::test]
    async fn success_settles_and_releases() {
        let c = controller(200, b"mp3");
        let receipt = c.submit(&full_form()).await.unwrap();
        assert_eq!(receipt.file_name, "Song.mp3");
        assert_eq!(c.snapshot().status, ConversionStatus::success());
        assert!(!c.snapshot().in_flight);
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let c = controller(500, b"");
        assert!(c.submit(&full_form()).await.is_err());
        assert_eq!(c.status().message, "Conversion failed");
        c.reset();
        assert_eq!(c.status(), ConversionStatus::idle());
    }

    #[test]
    fn submit_blocking_outside_runtime() {
        let c = controller(200, b"mp3");
        let receipt = c.submit_blocking(&full_form()).unwrap();
        assert_eq!(receipt.bytes, 3);
    }
}
