//! HTTP host for oxide-mvc dispatchers.
//!
//! - [`config`]: command-line and environment configuration, logging setup
//! - [`app`]: the demo widget catalogue
//! - [`server`]: the hyper transport

pub mod app;
pub mod config;
pub mod server;
