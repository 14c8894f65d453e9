//! Pipeline stages of one submission.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the network step can be replaced without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ validate ──▶ request ──▶ transport ──▶ response ──▶ naming
//! (files)    (gate)      (parts)     (HTTP)        (status)     (file name)
//! ```
//!
//! 1. [`input`]    : load a path into an `Attachment` with a guessed MIME type
//! 2. [`validate`] : reject a form missing a required file before any I/O
//! 3. [`request`]  : map the form onto the deployment's multipart contract;
//!    pure and deterministic
//! 4. [`transport`]: one POST, one fully read response; the only stage with
//!    network I/O
//! 5. [`response`] : turn the response into a download or a service error
//! 6. [`naming`]   : per-deployment download name rules

pub mod input;
pub mod naming;
pub mod request;
pub mod response;
pub mod transport;
pub mod validate;
