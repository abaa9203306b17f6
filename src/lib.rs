#![deny(missing_docs)]

//! Core library for the docdex ingestion pipeline.

/// Blob store client for listing and downloading source documents.
pub mod blob;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Layout-analysis client for table detection and extraction.
pub mod layout;
/// Structured logging and tracing setup.
pub mod logging;
/// PDF decoding helpers: prose text and embedded images.
pub mod pdf;
/// Document processing pipeline: chunking, extraction, assembly.
pub mod processing;
/// Queue notifications for newly indexed files.
pub mod queue;
mod retry;
/// Search index integration: schema, batched writes, deletion.
pub mod search;
/// Vision-description client for image understanding.
pub mod vision;
