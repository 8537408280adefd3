//! HTTP-ish request writers and the Basic-auth encoder

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::NtripClientError;
use crate::sourcetable::Authentication;

fn user_agent() -> String {
    format!("NTRIP {}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Build the `GET /` probe request.
pub fn probe_request(host: &str) -> String {
    format!(
        "GET / HTTP/1.1\r\n\
         Ntrip-Version: Ntrip/2.0\r\n\
         User-Agent: {}\r\n\
         Host: {}\r\n\
         Connection: close\r\n\
         \r\n",
        user_agent(),
        host,
    )
}

/// Build the `GET /<mountpoint>` data request, including the precomputed
/// `Authorization:` header line when present.
pub fn get_request(host: &str, mountpoint: &str, auth_header: &str) -> String {
    format!(
        "GET /{} HTTP/1.1\r\n\
         Ntrip-Version: Ntrip/2.0\r\n\
         User-Agent: {}\r\n\
         Host: {}\r\n\
         Accept: rtk/rtcm, dgps/rtcm\r\n\
         {}\
         Connection: close\r\n\
         \r\n",
        mountpoint,
        user_agent(),
        host,
        auth_header,
    )
}

/// Write a pre-built request, failing with `WriteShort` on any error
/// (partial write or I/O error alike — the distinction isn't observable
/// through `AsyncWriteExt::write_all`).
pub async fn send_request(
    sock: &mut (impl AsyncWrite + Unpin),
    request: &str,
    label: &'static str,
) -> Result<(), NtripClientError> {
    sock.write_all(request.as_bytes())
        .await
        .map_err(|_| NtripClientError::WriteShort(label))?;
    sock.flush().await.map_err(|_| NtripClientError::WriteShort(label))?;
    Ok(())
}

/// Encode the `Authorization:` header line for the given authentication
/// kind. `none` and `digest` both yield an empty string — digest
/// mountpoints never reach this point because the sourcetable capability
/// gate already rejected them.
pub fn encode_authorization(authentication: Authentication, credentials: &str) -> String {
    match authentication {
        Authentication::Basic => {
            let encoded =
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, credentials);
            format!("Authorization: Basic {}\r\n", encoded)
        },
        Authentication::None | Authentication::Digest | Authentication::Unknown => String::new(),
    }
}
