//! Incremental sourcetable reader
//!
//! Parses a broadcaster's `SOURCETABLE 200 OK` response across however
//! many partial reads it takes to arrive, committing the first `STR;`
//! record whose mountpoint matches the one requested.

use crate::error::NtripClientError;
use crate::sourcetable::{Authentication, CompressionEncryption, FieldIter, StreamDescriptor};

const SOURCETABLE_BANNER: &str = "SOURCETABLE 200 OK\r\n";
const END_SOURCETABLE: &str = "ENDSOURCETABLE";
const STR_PREFIX: &str = "STR;";
const CAS_PREFIX: &str = "CAS;";
const NET_PREFIX: &str = "NET;";
const CRLF: &str = "\r\n";

/// Default line-buffer capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// What happened on the most recent attempt to pull bytes from the probe
/// socket. The async transport is the only code that constructs this;
/// everything else here is synchronous and independently testable.
pub enum ReadOutcome<'a> {
    /// `n > 0` bytes were read.
    Data(&'a [u8]),
    /// The read would have blocked (no data currently available).
    WouldBlock,
    /// The remote end closed the connection (`n == 0`).
    Eof,
}

/// Result of feeding one [`ReadOutcome`] into the driver.
#[derive(Debug, PartialEq, Eq)]
pub enum DriverStep {
    /// More data is needed before a verdict can be reached.
    NeedMore,
    /// The requested mountpoint has been located and committed.
    Matched,
}

/// Stateful sourcetable reader, one per connection attempt.
pub struct SourcetableReader {
    buf: Vec<u8>,
    capacity: usize,
    sourcetable_parse: bool,
    matched: bool,
}

impl SourcetableReader {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SourcetableReader {
            buf: Vec::with_capacity(capacity),
            capacity,
            sourcetable_parse: false,
            matched: false,
        }
    }

    pub fn sourcetable_parse(&self) -> bool {
        self.sourcetable_parse
    }

    /// Feed one read's worth of bytes (or lack thereof) into the driver
    /// and advance the descriptor for `requested_mountpoint` in place
    /// when a match commits.
    pub fn feed(
        &mut self,
        requested_mountpoint: &str,
        outcome: ReadOutcome<'_>,
        descriptor: &mut StreamDescriptor,
    ) -> Result<DriverStep, NtripClientError> {
        match outcome {
            ReadOutcome::WouldBlock => {
                if self.sourcetable_parse && !self.matched {
                    // no more data yet, no match either
                    return Ok(DriverStep::NeedMore);
                }
                if self.matched {
                    return Ok(DriverStep::Matched);
                }
                // EAGAIN before the banner has even been read.
                return Err(NtripClientError::UnexpectedBanner(
                    "no data before banner".to_string(),
                ));
            },
            ReadOutcome::Eof => {
                if self.matched {
                    return Ok(DriverStep::Matched);
                }
                return Err(NtripClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "ntrip stream unexpected close during sourcetable read",
                )));
            },
            ReadOutcome::Data(chunk) => {
                if self.buf.len() + chunk.len() > self.capacity {
                    return Err(NtripClientError::BufferFull(self.capacity));
                }
                self.buf.extend_from_slice(chunk);
            },
        }

        if !self.sourcetable_parse {
            if self.buf.len() < SOURCETABLE_BANNER.len() {
                return Ok(DriverStep::NeedMore);
            }
            if &self.buf[..SOURCETABLE_BANNER.len()] != SOURCETABLE_BANNER.as_bytes() {
                return Err(NtripClientError::UnexpectedBanner(
                    String::from_utf8_lossy(&self.buf[..self.buf.len().min(64)]).to_string(),
                ));
            }
            self.buf.drain(..SOURCETABLE_BANNER.len());
            self.sourcetable_parse = true;
        }

        loop {
            // str_starts_with(ENDSOURCETABLE) doesn't require a trailing
            // CRLF to already be present.
            if self.buf.starts_with(END_SOURCETABLE.as_bytes()) {
                return if self.matched {
                    Ok(DriverStep::Matched)
                } else {
                    Err(NtripClientError::MountpointNotFound(
                        requested_mountpoint.to_string(),
                    ))
                };
            }

            let Some(eol) = find_subslice(&self.buf, CRLF.as_bytes()) else {
                if self.buf.len() >= self.capacity.saturating_sub(1) {
                    return Err(NtripClientError::BufferFull(self.capacity));
                }
                return Ok(DriverStep::NeedMore);
            };

            let line = std::str::from_utf8(&self.buf[..eol])
                .map_err(|_| {
                    NtripClientError::UnexpectedBanner("non-UTF8 sourcetable line".to_string())
                })?
                .to_string();

            if let Some(body) = line.strip_prefix(STR_PREFIX) {
                let hold = StreamDescriptor::parse_str_fields(FieldIter::new(body));
                if hold.mountpoint == requested_mountpoint && !self.matched {
                    if hold.format == crate::sourcetable::StreamFormat::Unknown {
                        return Err(NtripClientError::UnsupportedCapability {
                            mountpoint: requested_mountpoint.to_string(),
                            reason: "unsupported stream format".to_string(),
                        });
                    }
                    if hold.compr_encryp != CompressionEncryption::None {
                        return Err(NtripClientError::UnsupportedCapability {
                            mountpoint: requested_mountpoint.to_string(),
                            reason: "compression/encryption algorithm not supported".to_string(),
                        });
                    }
                    if hold.authentication != Authentication::None
                        && hold.authentication != Authentication::Basic
                    {
                        return Err(NtripClientError::UnsupportedCapability {
                            mountpoint: requested_mountpoint.to_string(),
                            reason: "authentication method not supported".to_string(),
                        });
                    }

                    descriptor.mountpoint = hold.mountpoint.clone();
                    descriptor.format = hold.format;
                    descriptor.carrier = hold.carrier;
                    descriptor.latitude = hold.latitude;
                    descriptor.longitude = hold.longitude;
                    descriptor.nmea = hold.nmea;
                    descriptor.compr_encryp = hold.compr_encryp;
                    descriptor.authentication = hold.authentication;
                    descriptor.fee = hold.fee;
                    descriptor.bitrate = hold.bitrate;
                    descriptor.set = true;
                    self.matched = true;
                }
            } else if line.starts_with(CAS_PREFIX) {
                tracing::debug!("NTRIP: skipping CAS record {line:?}");
            } else if line.starts_with(NET_PREFIX) {
                tracing::debug!("NTRIP: skipping NET record {line:?}");
            }

            self.buf.drain(..eol + CRLF.len());
        }
    }
}

impl Default for SourcetableReader {
    fn default() -> Self {
        Self::new()
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
