pub mod controller;
pub mod main_context;
pub mod metering;
pub mod permission;
