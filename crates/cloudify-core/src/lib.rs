//! # cloudify-core
//!
//! Core types and utilities for talking to a Cloudify manager REST service.
//!
//! This crate provides the shared error type, client configuration, the list
//! envelope returned by collection endpoints and the [`transport::Transport`]
//! abstraction used by the per-resource client crates.
//!
//! ## Modules
//!
//! - [`error`] - Error type and HTTP status mapping
//! - [`client`] - HTTP tuning knobs (timeouts, connection pooling)
//! - [`config`] - Validated manager connection configuration
//! - [`query`] - Query parameter builder
//! - [`types`] - List envelopes and pagination metadata
//! - [`transport`] - Request model, transport trait and reqwest implementation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use transport::{ApiRequest, FilePart, HttpTransport, RequestBody, Transport};
pub use types::{ListMetadata, ListResponse, Pagination};
