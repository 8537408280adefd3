//! Top-level client configuration
//!
//! A single service URI names the broadcaster, scheme and all, rather
//! than separate host/port/TLS flags.

#[cfg_attr(feature = "clap", derive(clap::Args))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ClientConfig {
    /// Service URI, e.g. `ntrip://rtk2go.com:2101/MOUNT` or
    /// `dgpsip://gps.example.com:2102`.
    #[cfg_attr(feature = "clap", clap(long = "service", env = "DGNSS_SERVICE"))]
    pub service: String,

    /// `user:pass`, or empty for an unauthenticated mountpoint.
    #[cfg_attr(
        feature = "clap",
        clap(long = "credentials", env = "DGNSS_CREDENTIALS", default_value = "")
    )]
    pub credentials: String,

    /// Sourcetable line-buffer capacity, in bytes.
    #[cfg_attr(
        feature = "clap",
        clap(long = "buffer-capacity", env = "DGNSS_BUFFER_CAPACITY", default_value_t = crate::reader::DEFAULT_BUFFER_CAPACITY)
    )]
    pub buffer_capacity: usize,
}
