//! Identifier-driven extraction pipeline.
//!
//! A request lists every object under `<identifier>/`, classifies each one by extension, runs
//! the matching long-running extraction job to completion, concatenates the extracted text in
//! listing order and hands the result to a summarizer.

/// Ordered accumulation of extracted text.
pub mod aggregate;
/// Extension-based routing of listed objects.
pub mod classify;
/// Job polling with attempt and deadline bounds.
pub mod poller;
/// Request orchestration and the [`PipelineApi`] abstraction.
pub mod service;
/// Requests, job lifecycle, outcomes and errors.
pub mod types;

pub use aggregate::{AggregatedDocument, AggregatedPart};
pub use classify::{classify, classify_object};
pub use poller::{PollPolicy, poll_until_terminal};
pub use service::{PipelineApi, PipelineService, PipelineSettings};
pub use types::{
    BatchRequest, Classification, ExtractionJob, ExtractionKind, JobStatus, PipelineError,
    PipelineOutcome,
};
