#![deny(missing_docs)]
//! Command bot core library.
//!
//! Command registry, dispatcher, request context, pending interactions and
//! the per-entity document store. Platform adapters plug in through
//! [`transport::ChatTransport`].

/// Process-scoped application state.
pub mod app;
/// Command plug-ins and registry.
pub mod commands;
/// Configuration management.
pub mod config;
/// Event dispatch and the per-invocation helper.
pub mod dispatch;
/// Transport-neutral inbound events.
pub mod event;
/// Pending follow-up interactions.
pub mod pending;
/// Per-user and per-thread document storage.
pub mod storage;
/// Outbound transport abstraction.
pub mod transport;

#[cfg(test)]
pub mod testing;
