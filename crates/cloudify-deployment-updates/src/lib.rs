//! Deployment updates client for the Cloudify manager.
//!
//! A deployment update stages a new blueprint revision against a running
//! deployment, lets the manager compute the steps between the two, and then
//! commits, finalizes or reverts the change. [`DeploymentUpdatesClient`] drives
//! that lifecycle one request at a time; every call returns the manager's
//! current [`DeploymentUpdate`] snapshot.

#![deny(missing_docs)]

pub mod client;
pub mod models;
pub mod packager;
pub mod source;

pub use client::{DeploymentUpdatesClient, DeploymentUpdatesClientBuilder};
pub use models::{
    CommitOptions, DeploymentUpdate, DeploymentUpdateState, Inputs, ListParams, Step,
    StepAction, UpdateOptions,
};
pub use packager::{BlueprintPackager, TarPackager};
pub use source::{classify_archive_location, ArchiveLocation, BlueprintSource};

/// Convenient result alias using the shared error type.
pub type Result<T> = cloudify_core::Result<T>;
