//! Negotiator API Library Crate
//!
//! This library contains the HTTP side of the negotiator backend: configuration,
//! application state, API handlers and routing. The `api` binary is a thin
//! wrapper around this library that also starts the pipeline poller.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
