//! Artifact resolution layer
//!
//! Decides which local copy of a runner image is authoritative, compares it
//! against the remote registry, and fetches an update when authorized.
//! Step packages share the registry plumbing but are fetched by exact version.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   Catalog   │────▶│  Selector   │──┐
//! │ (local list)│     │ (candidate) │  │   ┌─────────────┐     ┌─────────────┐
//! └─────────────┘     └─────────────┘  ├──▶│   Engine    │────▶│   Fetcher   │
//! ┌─────────────┐                      │   │ (decision)  │     │   (pull)    │
//! │  Registry   │──────────────────────┘   └─────────────┘     └─────────────┘
//! │  (remote)   │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`catalog`]: Local artifact enumeration (docker image store)
//! - [`selector`]: Tag and timestamp rules for picking the local candidate
//! - [`engine`]: Local/remote reconciliation into a [`types::Decision`]
//! - [`registry`]: Registry traits for remote metadata and content
//! - [`registries`]: Concrete registries (step packages, runner images)
//! - [`fetcher`]: Pulling artifacts the engine decided to fetch
//! - [`resolver`]: Ties catalog, registry and engine together per family
//! - [`package`]: Exact-version step package downloads
//! - [`error`]: Error types
//! - [`types`]: Descriptors, policy and decisions

pub mod catalog;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod package;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod types;
