//! # chapter-merge
//!
//! Consolidates chapter submissions into ordered DOCX documents.
//!
//! Producers deliver `MERGE` events (a chapter title and its raw text) and
//! `CHECKLIST` events (the chapters a folder is expected to contain). Each
//! submission is parsed for its chapter number, routed to a target document
//! (one per chapter, or one per integer chapter when grouping is on),
//! upserted as a segment, and the document is reassembled. Checklists track
//! completion and flag duplicate chapter indices.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌───────────────────┐   ┌──────────┐
//! │ JSONL/stdin │──▶│ MergeQueue │──▶│ Library (core)    │──▶│  SQLite  │
//! │ HTTP /events│   │ one worker │   │ parse, merge, DOCX│   │  store   │
//! └─────────────┘   └────────────┘   └─────────┬─────────┘   └──────────┘
//!                                              │
//!                            ┌─────────────────┤
//!                            ▼                 ▼
//!                       ┌──────────┐     ┌──────────┐
//!                       │   CLI    │     │  export  │
//!                       │  (chm)   │     │ zip/dir  │
//!                       └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! chm init
//! chm merge --title "Chapter 1" --file ch1.txt
//! chm ingest events.jsonl
//! chm checklist show
//! chm export archive
//! chm serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection and library loading |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` |
//! | [`queue`] | Single-flight merge queue |
//! | [`events`] | Inbound event decoding |
//! | [`ingest`] | Event dispatch and the `ingest` / `merge` commands |
//! | [`docs`] | Document listing and preview |
//! | [`extract`] | Paragraph text from assembled DOCX |
//! | [`export`] | Archive and directory export |
//! | [`server`] | HTTP event endpoint |

pub mod checklist_cmd;
pub mod config;
pub mod db;
pub mod docs;
pub mod events;
pub mod export;
pub mod extract;
pub mod folders;
pub mod ingest;
pub mod log_cmd;
pub mod migrate;
pub mod queue;
pub mod server;
pub mod sqlite_store;
