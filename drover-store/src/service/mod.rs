//! Shared log service: a standalone process owning the writer.
//!
//! Other processes reach the database through a line-delimited JSON
//! protocol over TCP and discover a running service through the HTTP
//! `/info` endpoint that every service exposes `HTTP_PORT_OFFSET` below
//! its TCP port.

mod client;
mod discover;
mod http;
mod protocol;
mod server;

pub use client::RemoteStore;
pub use discover::discover_service;
pub use protocol::{Request, Response, ServiceInfo};
pub use server::{LogService, LogServiceConfig};
