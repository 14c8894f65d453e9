//! The user-visible status channel and its observer trait.
//!
//! A controller owns exactly one [`ConversionStatus`]. It moves
//! `Idle → Loading → {Success, Error}`; `Success` and `Error` are resting
//! states and the next submission starts again from `Loading`.
//!
//! Inject an [`Arc<dyn StatusObserver>`] via
//! [`crate::config::ControllerConfigBuilder::status_observer`] to be told
//! about every transition: a terminal spinner, a log line, a channel into a
//! UI event loop.
//!
//! # Example
//!
//! ```rust
//! use audio_producer::{ConversionStatus, StatusObserver, ControllerConfig};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct History(Mutex<Vec<String>>);
//!
//! impl StatusObserver for History {
//!     fn on_status(&self, status: &ConversionStatus) {
//!         self.0.lock().unwrap().push(status.message.clone());
//!     }
//! }
//!
//! let config = ControllerConfig::builder()
//!     .status_observer(Arc::new(History::default()))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Message shown while the service is working.
pub const LOADING_MESSAGE: &str = "Converting audio...";

/// Message shown after the converted file was handed to the download sink.
pub const SUCCESS_MESSAGE: &str = "✓ Conversion successful! Download started.";

/// The four states of the status machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// A request is outstanding.
    Loading,
    /// The last submission produced a download.
    Success,
    /// The last submission failed; `message` says why.
    Error,
}

/// The single user-facing feedback channel of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversionStatus {
    pub state: StatusState,
    pub message: String,
}

impl ConversionStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            state: StatusState::Loading,
            message: LOADING_MESSAGE.to_string(),
        }
    }

    pub fn success() -> Self {
        Self {
            state: StatusState::Success,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: StatusState::Error,
            message: message.into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == StatusState::Loading
    }

    /// `Success` or `Error`: the submission is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, StatusState::Success | StatusState::Error)
    }
}

/// Point-in-time view of a controller, for hosts and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: ConversionStatus,
    pub in_flight: bool,
}

/// Called by the controller as a submission progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls happen on whatever task runs the submission
/// and must not block.
pub trait StatusObserver: Send + Sync {
    /// Called once when a submission has claimed the controller.
    fn on_submit_start(&self) {}

    /// Called on every status write.
    fn on_status(&self, status: &ConversionStatus) {
        let _ = status;
    }

    /// Called once with the terminal status of a submission.
    fn on_submit_complete(&self, status: &ConversionStatus) {
        let _ = status;
    }
}

/// Observer used when none is configured.
pub struct NoopStatusObserver;

impl StatusObserver for NoopStatusObserver {}

/// Convenience alias matching the type stored in [`crate::config::ControllerConfig`].
pub type StatusCallback = Arc<dyn StatusObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        starts: Mutex<usize>,
        seen: Mutex<Vec<StatusState>>,
        last: Mutex<Option<ConversionStatus>>,
    }

    impl StatusObserver for Recording {
        fn on_submit_start(&self) {
            *self.starts.lock().unwrap() += 1;
        }

        fn on_status(&self, status: &ConversionStatus) {
            self.seen.lock().unwrap().push(status.state);
        }

        fn on_submit_complete(&self, status: &ConversionStatus) {
            *self.last.lock().unwrap() = Some(status.clone());
        }
    }

    #[test]
    fn constructors_carry_fixed_messages() {
        assert_eq!(ConversionStatus::idle().state, StatusState::Idle);
        assert_eq!(ConversionStatus::loading().message, "Converting audio...");
        assert_eq!(
            ConversionStatus::success().message,
            "✓ Conversion successful! Download started."
        );
        assert_eq!(ConversionStatus::error("boom").message, "boom");
    }

    #[test]
    fn terminal_states() {
        assert!(!ConversionStatus::idle().is_terminal());
        assert!(!ConversionStatus::loading().is_terminal());
        assert!(ConversionStatus::loading().is_loading());
        assert!(ConversionStatus::success().is_terminal());
        assert!(ConversionStatus::error("x").is_terminal());
    }

    #[test]
    fn status_serialises_with_lowercase_state() {
        let json = serde_json::to_string(&ConversionStatus::error("bad")).unwrap();
        assert_eq!(json, r#"{"state":"error","message":"bad"}"#);
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let cb: StatusCallback = Arc::new(NoopStatusObserver);
        cb.on_submit_start();
        cb.on_status(&ConversionStatus::loading());
        cb.on_submit_complete(&ConversionStatus::success());
    }

    #[test]
    fn recording_observer_receives_events() {
        let rec = Recording::default();
        rec.on_submit_start();
        rec.on_status(&ConversionStatus::loading());
        rec.on_status(&ConversionStatus::error("nope"));
        rec.on_submit_complete(&ConversionStatus::error("nope"));

        assert_eq!(*rec.starts.lock().unwrap(), 1);
        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![StatusState::Loading, StatusState::Error]
        );
        assert_eq!(
            rec.last.lock().unwrap().as_ref().map(|s| s.message.as_str()),
            Some("nope")
        );
    }
}
