//! mailgate core library
//!
//! Exposes a mail client's search, read, compose, contacts and calendar
//! operations to a local agent: a loopback HTTP gateway with bearer-token
//! authentication embedded in the mail client process, and a stdio
//! JSON-RPC bridge the agent host spawns.

pub mod bridge;
pub mod compose;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod rpc;
pub mod sanitize;
pub mod search;
pub mod store;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};
pub use models::*;

/// Application name for config paths
pub const APP_NAME: &str = "mailgate";
