//! NTRIP / DGPS-IP differential GNSS correction stream client
//!
//! Given a service URI (`ntrip://` or `dgpsip://`), negotiates a session
//! with the broadcaster and streams raw correction bytes. RTCM frame
//! decoding, TLS, and automatic nearest-mountpoint selection are out of
//! scope — see `DESIGN.md`.

pub mod client;
pub mod config;
pub mod connection;
pub mod dgpsip;
pub mod reader;
pub mod reporter;
pub mod request;
pub mod response;
pub mod sourcetable;
pub mod uri;

mod error;
pub use error::NtripClientError;

pub use client::{connect, connect_with_config, DgnssHandle};
pub use config::ClientConfig;
