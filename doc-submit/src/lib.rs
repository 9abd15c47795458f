//! # Doc Submit
//!
//! `doc-submit` sends document creation requests to the registry API
//! (`POST /api/v3/lk/documents/create`) without ever exceeding a configured
//! number of requests per rolling time window.
//!
//! ## The Gated Stack
//! A [`DocumentSubmitter`] is a small [Tower](https://github.com/tower-rs/tower)
//! stack:
//!
//! 1. **Encoding**: The [`Document`] is serialized to JSON with fixed snake_case
//!    wire names before anything else happens, so a bad payload never consumes
//!    an admission.
//! 2. **Admission**: [`GateLayer`] waits on a shared [`rate_gate::RateGate`] until
//!    the request may go out. Waiting can be bounded per request by a deadline
//!    or a cancellation token, and per layer by a maximum wait.
//! 3. **Transport**: [`HttpTransport`] POSTs the body with the `Signature`
//!    header and returns whatever status and body the registry answered with.
//!
//! Errors are never swallowed or retried; every failure comes back to the caller
//! as a [`SubmitError`].
//!
//! ```rust,no_run
//! use doc_submit::{Document, DocumentSubmitter, SubmitterConfig};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), doc_submit::SubmitError> {
//! let config = SubmitterConfig::from_host("https://ismp.crpt.ru")?
//!     .with_limit(5)
//!     .with_window(Duration::from_secs(60));
//! let submitter = DocumentSubmitter::from_config(&config)?;
//!
//! let result = submitter.submit(&Document::default(), "signature").await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

mod config;
mod document;
mod error;
mod layer;
mod service;
mod submission;
mod submitter;
mod transport;


pub use config::DEFAULT_HOST;
pub use config::SubmitterConfig;
pub use document::Description;
pub use document::Document;
pub use document::Product;
pub use error::SubmitError;
pub use layer::GateLayer;
pub use service::GateService;
pub use submission::Submission;
pub use submission::SubmissionResult;
pub use submitter::DocumentSubmitter;
pub use transport::CREATE_DOCUMENT_PATH;
pub use transport::HttpTransport;
pub use transport::SIGNATURE_HEADER;
