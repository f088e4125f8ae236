//! taskbox - local task and project store
//!
//! This library provides a keyed JSON document store with debounced
//! auto-save, used by the `taskbox` CLI to persist tasks and projects.
//!
//! # Core Concepts
//!
//! - **Backends**: named key-value collections (in-memory or JSONL files)
//! - **Entity store**: typed CRUD, bulk writes and JSON import/export over a
//!   backend, tolerant of records that no longer decode
//! - **Auto-save**: writes reach the backend immediately; the durability
//!   flush is debounced until the store has been quiet for a while
//!
//! # Module Organization
//!
//! - `backend`: backend contract plus memory and file implementations
//! - `codec`: entity trait and JSON encode/decode helpers
//! - `scheduler`: debounced flush task
//! - `store`: generic `EntityStore<T>`
//! - `task` / `project`: domain records and their store specializations
//! - `config`: configuration loading from `.taskbox.toml`
//! - `error`: error types and result aliases
//! - `lock`: collection locking and atomic file replacement
//! - `cli` / `output`: command-line interface

pub mod backend;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod project;
pub mod scheduler;
pub mod store;
pub mod task;

pub use codec::Entity;
pub use error::{Error, Result};
pub use project::{ProjectRecord, ProjectStore};
pub use store::{EntityStore, StoreOptions};
pub use task::{TaskRecord, TaskStatus, TaskStore};
