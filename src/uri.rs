//! Service URI classification and NTRIP URI parsing

use crate::error::NtripClientError;

/// Default `rtcm-sc104/tcp` port used when the service database has no
/// entry for it.
pub const DEFAULT_RTCM_PORT: &str = "2101";

const NTRIP_SCHEME: &str = "ntrip://";
const DGPSIP_SCHEME: &str = "dgpsip://";

/// Which sibling protocol a service string names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scheme {
    Ntrip,
    DgpsIp,
    Unknown,
}

/// Classify a service string by its scheme prefix.
///
/// Matching is case-insensitive on the prefix only; everything after the
/// `://` is handled verbatim by the respective parser.
pub fn classify(service: &str) -> Scheme {
    let lower_prefix = |n: usize| service.get(..n).map(|s| s.to_ascii_lowercase());

    if lower_prefix(NTRIP_SCHEME.len()).as_deref() == Some(NTRIP_SCHEME) {
        Scheme::Ntrip
    } else if lower_prefix(DGPSIP_SCHEME.len()).as_deref() == Some(DGPSIP_SCHEME) {
        Scheme::DgpsIp
    } else {
        Scheme::Unknown
    }
}

/// Strip a scheme prefix the [`classify`] caller already recognized.
pub fn strip_scheme(scheme: Scheme, service: &str) -> &str {
    match scheme {
        Scheme::Ntrip => &service[NTRIP_SCHEME.len()..],
        Scheme::DgpsIp => &service[DGPSIP_SCHEME.len()..],
        Scheme::Unknown => service,
    }
}

/// Looks up a TCP port by service name, standing in for `getservbyname(3)`.
///
/// The default implementation never resolves anything (most systems carry
/// no `rtcm-sc104` entry in `/etc/services`), so callers fall back to
/// [`DEFAULT_RTCM_PORT`]. Exists so tests, and any embedded target without
/// a service database at all, don't depend on host configuration.
pub trait ServiceResolver {
    fn resolve(&self, service: &str, proto: &str) -> Option<u16>;
}

/// The resolver used when the caller doesn't supply one.
#[derive(Clone, Copy, Default)]
pub struct NullServiceResolver;

impl ServiceResolver for NullServiceResolver {
    fn resolve(&self, _service: &str, _proto: &str) -> Option<u16> {
        None
    }
}

/// The four components of an `ntrip://` URI, post-scheme.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct NtripUri {
    /// Empty iff the input had no `user[:pass]@` prefix.
    pub credentials: String,
    pub host: String,
    pub port: String,
    pub mountpoint: String,
}

/// Parse the post-scheme remainder of an `ntrip://` URI.
///
/// `[user[:pass]@]host[:port]/mountpoint`, tolerant of `@` and `:`
/// appearing inside the credentials themselves.
pub fn parse_ntrip_uri(
    remainder: &str,
    resolver: &dyn ServiceResolver,
) -> Result<NtripUri, NtripClientError> {
    // Step 1: rightmost '@', only significant if some ':' precedes it.
    let (credentials, caster) = match remainder.rfind('@') {
        Some(at) if remainder[..at].contains(':') => {
            (remainder[..at].to_string(), &remainder[at + 1..])
        },
        _ => (String::new(), remainder),
    };

    // Step 2: first '/' splits caster from mountpoint.
    let slash = caster
        .find('/')
        .ok_or_else(|| NtripClientError::MalformedUri(format!("no mountpoint in {remainder:?}")))?;
    let (host_port, mountpoint) = (&caster[..slash], &caster[slash + 1..]);

    // Step 3: first ':' in the pre-'/' portion splits host from port.
    let (host, port) = match host_port.find(':') {
        Some(colon) => (
            host_port[..colon].to_string(),
            host_port[colon + 1..].to_string(),
        ),
        None => (
            host_port.to_string(),
            resolver
                .resolve("rtcm-sc104", "tcp")
                .map(|p| p.to_string())
                .unwrap_or_else(|| DEFAULT_RTCM_PORT.to_string()),
        ),
    };

    if host.is_empty() {
        return Err(NtripClientError::MalformedUri(format!(
            "empty host in {remainder:?}"
        )));
    }

    Ok(NtripUri {
        credentials,
        host,
        port,
        mountpoint: mountpoint.to_string(),
    })
}
