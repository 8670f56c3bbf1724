//! jetson-agent
//!
//! The remote UCI chess-engine gateway: ties `jetson-core`'s registry
//! model and `jetson-protocol`'s wire formats together into a running
//! async TCP service.

pub mod config;
pub mod error;
pub mod listener;
pub mod mgmt;
pub mod pipes;
pub mod root;
pub mod scan;
pub mod session;
pub mod supervisor;
