//! Command channel codec: method calls in, replies and events out.

pub mod command;
pub mod method_call;
