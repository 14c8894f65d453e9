//! # audio-producer
//!
//! Submit an audio file, optional cover art and metadata to an
//! audio-producer conversion service, and save the MP3 it returns.
//!
//! ## Why this crate?
//!
//! The transcoding and tagging happen on the server. What is left on the
//! client is small but easy to get wrong: which multipart parts to send and
//! when to leave one out, how to read a failure body, what to call the
//! downloaded file, and how to keep two submissions from racing each other.
//! This crate does that part, behind one [`ConversionController`] whose
//! single [`ConversionStatus`] tells the user what is going on.
//!
//! ## Submission Overview
//!
//! ```text
//! FormState
//!  │
//!  ├─ 1. Validate  audio (and cover, when the deployment needs one) present?
//!  ├─ 2. Build     multipart parts in contract order, blank optionals dropped
//!  ├─ 3. Send      POST /api/convert           status: Loading
//!  ├─ 4. Handle    2xx → MP3 blob │ else → {"detail": ...}
//!  └─ 5. Deliver   save <name>.mp3             status: Success | Error
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use audio_producer::{load_attachment, ControllerConfig, ConversionController, Deployment, FormState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ControllerConfig::builder()
//!         .base_url("http://localhost:8000")
//!         .deployment(Deployment::topic_speaker())
//!         .build()?;
//!     let controller = ConversionController::new(config)?;
//!
//!     let form = FormState::new()
//!         .with_audio(load_attachment("keynote.m4a").await?)
//!         .with_field("topic", "My Talk! #1");
//!
//!     let receipt = controller.submit(&form).await?;
//!     println!("{:?}", receipt.location); // Some("./My Talk 1.mp3")
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `audio-producer` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! audio-producer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod form;
pub mod pipeline;
pub mod status;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ControllerConfig, ControllerConfigBuilder, Deployment, NamingRule};
pub use controller::ConversionController;
pub use download::{Download, DownloadReceipt, DownloadSink, FsDownloadSink, MemoryDownloadSink};
pub use error::ConvertError;
pub use form::{Attachment, FormState};
pub use pipeline::input::{guess_mime, load_attachment};
pub use pipeline::request::{build_request, ConversionRequest, Part, PartBody};
pub use pipeline::response::GENERIC_FAILURE_MESSAGE;
pub use pipeline::transport::{HttpTransport, Transport, TransportResponse};
pub use pipeline::validate::{validate, Validation};
pub use status::{
    ConversionStatus, NoopStatusObserver, SessionSnapshot, StatusCallback, StatusObserver,
    StatusState,
};
pub use tokio_util::sync::CancellationToken;
