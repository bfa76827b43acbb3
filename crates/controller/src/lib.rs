//! Single-zone irrigation controller.
//!
//! Each power cycle runs exactly once: decide whether the pump is due, water
//! if so, record the result locally and in the cloud channel, sleep, reboot.
//! Every external collaborator sits behind a small trait so the cycle runs
//! the same on a board, on a host, and under test.

pub mod clock;
pub mod cloud;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod decision;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod feed;
pub mod reboot;
pub mod relay;
pub mod resolver;
pub mod retained;
pub mod schedule;
pub mod sntp;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;
