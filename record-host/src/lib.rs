//! JSON-lines host for the capture controller.
//!
//! Reads [`record_core::MethodCall`]s and lifecycle signals from one stream
//! and writes replies and channel events to another, driving a
//! [`record_core::MainContext`] over the simulated device.

pub mod bridge;
pub mod config;
pub mod delegate;
pub mod error;

pub use bridge::{run, Incoming, Outgoing};
pub use config::HostConfig;
pub use delegate::{ChannelDelegate, LineWriter};
pub use error::HostError;
