//! # Integration Tests
//!
//! End-to-end recording scenarios against `MockCarlaClient`; no simulator
//! needed.
//!
//! - `recording`: happy-path sessions, frame numbering, interrupts
//! - `failures`: connection/spawn/write failures and teardown
//! - `config`: shipped example configuration

#[cfg(test)]
mod support;

#[cfg(test)]
mod config;

#[cfg(test)]
mod failures;

#[cfg(test)]
mod recording;
