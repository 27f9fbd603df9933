//! Core library for the negotiator backend: prompt composition, the pipeline
//! poller and the clients it talks to.

pub mod negotiation;
pub mod outputs;
pub mod pipeline;
pub mod realtime_session;
pub mod relay;
pub mod schedule;
