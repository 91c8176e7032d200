//! Bridge RPC protocol
//!
//! This module carries the bridge service over a network boundary:
//! - [`messages`] defines the request and response records
//! - [`transport`] frames them on any byte stream
//! - [`dispatch`] routes a decoded request to the service
//! - [`server`] and [`client`] are the TCP endpoints

pub mod client;
pub mod dispatch;
pub mod messages;
pub mod server;
pub mod transport;

pub use client::Client;
pub use dispatch::dispatch;
pub use messages::{BlockLocation, FileStatus, Reply, Request, Response};
pub use server::{serve_connection, Server, ServerMode};
