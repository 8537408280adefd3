//! Response classifier for the post-GET handshake reply

use crate::error::NtripClientError;

const UNAUTHORIZED: &str = "401 Unauthorized";
const SOURCETABLE: &str = "SOURCETABLE 200 OK";
const ICY_OK: &str = "ICY 200 OK";

/// Classify one read's worth of the GET response. Checks are substring
/// searches over the buffer as a whole, case-sensitive on the tokens, in
/// the order specified.
pub fn classify_get_response(buf: &[u8], mountpoint: &str) -> Result<(), NtripClientError> {
    let text = String::from_utf8_lossy(buf);

    if text.contains(UNAUTHORIZED) {
        return Err(NtripClientError::Unauthorized(mountpoint.to_string()));
    }
    if text.contains(SOURCETABLE) {
        return Err(NtripClientError::RemoteRejected(mountpoint.to_string()));
    }
    if text.contains(ICY_OK) {
        return Ok(());
    }
    Err(NtripClientError::ProtocolError(mountpoint.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icy_ok_succeeds() {
        assert!(classify_get_response(b"ICY 200 OK\r\n\r\n", "MP1").is_ok());
    }

    #[test]
    fn unauthorized_fails() {
        let err = classify_get_response(b"HTTP/1.1 401 Unauthorized\r\n\r\n", "MP1").unwrap_err();
        assert!(matches!(err, NtripClientError::Unauthorized(_)));
    }

    #[test]
    fn secondary_sourcetable_is_remote_rejected() {
        let err =
            classify_get_response(b"SOURCETABLE 200 OK\r\nENDSOURCETABLE\r\n", "MP1").unwrap_err();
        assert!(matches!(err, NtripClientError::RemoteRejected(_)));
    }

    #[test]
    fn unrecognized_response_is_protocol_error() {
        let err = classify_get_response(b"HTTP/1.1 500 Internal Server Error\r\n", "MP1")
            .unwrap_err();
        assert!(matches!(err, NtripClientError::ProtocolError(_)));
    }

    #[test]
    fn checks_unauthorized_before_sourcetable() {
        let err = classify_get_response(
            b"401 Unauthorized\r\nSOURCETABLE 200 OK\r\n",
            "MP1",
        )
        .unwrap_err();
        assert!(matches!(err, NtripClientError::Unauthorized(_)));
    }
}
