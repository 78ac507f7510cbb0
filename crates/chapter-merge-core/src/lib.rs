//! # chapter-merge core
//!
//! Storage-agnostic logic for chapter-merge: data models, the chapter title
//! parser, naming policy, DOCX assembly, segment reconciliation, checklist
//! tracking, the capped event log, the store abstraction, and the
//! [`library::Library`] service that ties them together.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O.

pub mod assemble;
pub mod checklist;
pub mod library;
pub mod log;
pub mod merge;
pub mod models;
pub mod naming;
pub mod store;
pub mod title;

pub use library::{ImportReport, Library, LibraryOptions};
pub use merge::MergeOutcome;
