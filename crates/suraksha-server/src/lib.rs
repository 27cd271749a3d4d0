//! # suraksha-server
//!
//! HTTP server library for the suraksha panic button.
//!
//! This library provides the API handlers, state management and logging
//! setup; the binary wires them to a BLE transport.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
