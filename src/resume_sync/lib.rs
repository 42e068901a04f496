//! # resume-sync Architecture
//!
//! resume-sync is the client-side state layer of a resume editor: it keeps
//! the document being edited durable across reloads, and caches the user's
//! job records for the session with optimistic status changes on top.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs, cli/)                               │
//! │  - Parses arguments, prints, owns the process exit code     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Facade (api.rs)                                        │
//! │  - Sequences stores and remote calls                        │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                              │
//!                 ▼                              ▼
//! ┌───────────────────────────────┐  ┌──────────────────────────┐
//! │  Document Store (document.rs) │  │  Session Cache           │
//! │  - Active resume + selection  │  │  (session.rs)            │
//! │  - Debounced + immediate      │  │  - Job records + overlay │
//! │    writes                     │  │  - Staleness             │
//! └───────────────────────────────┘  └──────────────────────────┘
//!                 │                              │
//!                 ▼                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/)                                           │
//! │  - StorageAdapter: quota degradation + write queue          │
//! │  - FsBackend (durable), MemBackend (session, tests)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: Stores Never Fail the Caller on Storage
//!
//! The in-memory state of both stores is the truth for the running session.
//! Storage errors are logged through `tracing` and absorbed; remote errors
//! are returned from the [`api`] facade unchanged.
//!
//! ## No Singletons
//!
//! Every store is a value built over an explicit adapter. Two independent
//! stores over the same backend are how tests simulate a page reload.
//!
//! ## Module Overview
//!
//! - [`api`]: the facade, and the only place remote calls are sequenced
//! - [`document`]: the durable document store
//! - [`session`]: the session record cache
//! - [`store`]: backends, the adapter and `doctor`
//! - [`diff`]: field-level diff of two resumes
//! - [`model`]: resume and job record types
//! - [`remote`]: the server seam
//! - [`config`]: configuration
//! - [`error`]: error types

pub mod api;
pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod model;
pub mod remote;
pub mod session;
pub mod store;
