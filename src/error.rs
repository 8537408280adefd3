//! NTRIP / DGPS-IP client error types

/// Errors produced while classifying a service URI, negotiating an NTRIP
/// session, or running the periodic position reporter.
#[derive(Debug, thiserror::Error)]
pub enum NtripClientError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    /// Service URI matched no supported scheme and `strict-dgnss` is set.
    #[error("unknown or unspecified DGNSS protocol for service {0}")]
    UnknownProtocol(String),

    /// URI had no mountpoint, or an impossible credential layout.
    #[error("malformed NTRIP URI: {0}")]
    MalformedUri(String),

    /// The socket factory (DNS + TCP connect) failed.
    #[error("connect failed to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// A request write completed short (or failed outright).
    #[error("short write while sending {0} request")]
    WriteShort(&'static str),

    /// First sourcetable bytes were not `SOURCETABLE 200 OK\r\n`.
    #[error("unexpected sourcetable banner: {0:?}")]
    UnexpectedBanner(String),

    /// `ENDSOURCETABLE` was reached with no matching mountpoint.
    #[error("mountpoint {0} not found in sourcetable")]
    MountpointNotFound(String),

    /// Selected mountpoint requires an unknown format, non-`none`
    /// compression, or digest/unknown authentication.
    #[error("mountpoint {mountpoint} requires unsupported capability: {reason}")]
    UnsupportedCapability { mountpoint: String, reason: String },

    /// GET response contained `401 Unauthorized`.
    #[error("not authorized for mountpoint {0}")]
    Unauthorized(String),

    /// GET response contained a secondary `SOURCETABLE` (mountpoint
    /// unknown at data-fetch time).
    #[error("broadcaster doesn't recognize mountpoint {0}")]
    RemoteRejected(String),

    /// GET response contained none of the recognized success/failure
    /// tokens.
    #[error("unrecognized response from broadcaster for mountpoint {0}")]
    ProtocolError(String),

    /// A single sourcetable line exceeded the fixed line buffer.
    #[error("sourcetable line exceeded the {0} byte buffer")]
    BufferFull(usize),

    /// The connection record is in the terminal `Err` state; the caller
    /// must discard it and start over from a fresh record.
    #[error("connection is in the terminal error state")]
    Terminal,
}
