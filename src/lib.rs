//! Library crate for adb-port-finder exposing reusable modules.
pub mod bridge;
pub mod config;
pub mod console;
pub mod error;
pub mod ports;
pub mod scanner;
pub mod session;
pub mod types;
