#![deny(missing_docs)]

//! Core library for the docpipe extraction service: a REST surface over object storage plus a
//! batch pipeline that extracts text from stored documents and recordings and summarizes it.

/// HTTP routing and REST handlers.
pub mod api;
/// AWS SDK adapters.
pub mod aws;
/// JSON-file configuration management.
pub mod config;
/// Long-running extraction job contract.
pub mod jobs;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Identifier-driven extraction and summarization pipeline.
pub mod pipeline;
/// Function invocation and relational query contracts.
pub mod services;
/// Object storage contract, in-memory backend and transfer helpers.
pub mod storage;
/// Summarization providers.
pub mod summarization;
