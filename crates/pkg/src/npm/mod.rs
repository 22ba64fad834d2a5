//! Thin surface over the external package manager.
//!
//! The [`NpmClient`] trait is what the pipeline and rollback engine talk to;
//! [`CliNpmClient`] shells out to the `npm` binary through the command
//! executor. Tests inject an in-memory fake instead.

mod client;

pub use client::{cleanup_tarball, CliNpmClient, NpmClient, PackInfo, PublishOptions};
