//! # specdex
//!
//! An incremental context indexer for specification documents.
//!
//! specdex scans a project's documentation tree, routes each file to a
//! semantic collection by directory and file pattern, diffs content
//! fingerprints against the last indexed state, and applies the minimal set
//! of insert/update/delete operations to a vector store. Unchanged files
//! cost one hash; nothing is re-embedded without need.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────┐   ┌──────────┐   ┌─────────┐   ┌──────────┐
//! │ Scanner │──▶│ Resolver │──▶│ Planner │──▶│ Executor │
//! │  walk   │   │  routes  │   │  diff   │   │  apply   │
//! └─────────┘   └──────────┘   └────┬────┘   └────┬─────┘
//!                                   │             │
//!                            ┌──────┴─────┐  ┌────┴─────┐
//!                            │ Fingerprint│  │  Vector  │
//!                            │   store    │  │  store   │
//!                            └────────────┘  └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and the collection route table |
//! | [`models`] | Core data types |
//! | [`resolver`] | Path-to-collection routing |
//! | [`scanner`] | Filesystem walk and document loading |
//! | [`fingerprint`] | Content hashing and the fingerprint database |
//! | [`planner`] | Diffing scanned state against indexed state |
//! | [`executor`] | Batched, retrying plan application |
//! | [`store`] | Vector-store abstraction and backends |
//! | [`pipeline`] | End-to-end reindex entry point |
//! | [`report`] | Run reports and exit-status mapping |
//! | [`progress`] | Progress reporting to stderr |
//! | [`error`] | Error types |

pub mod config;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod models;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod store;
