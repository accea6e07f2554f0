//! Typed client and server plumbing for the cluster management REST API.
//!
//! - [`client`]: request builders bound to API paths, response wrappers and polling
//! - [`server`]: service traits and the router that dispatches requests to them
//! - [`model`]: resource types whose unset fields are left out of the JSON
//! - [`memory`]: in-memory implementation of the server traits
//! - [`config`] and [`cli`]: the `ocm` command line

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod server;

pub use client::Connection;
pub use error::{ApiError, Error, Result};
