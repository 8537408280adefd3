//! Top-level client façade
//!
//! Dispatches a service URI to either the NTRIP state machine
//! ([`crate::connection`]) or the DGPS/IP raw opener ([`crate::dgpsip`]),
//! and hands the caller a [`Stream`] of raw correction-data chunks. RTCM
//! frame decoding is out of scope — callers that want parsed messages run
//! their own decoder over the byte stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::connection::NtripConnection;
use crate::dgpsip::{dgpsip_open, parse_dgpsip_uri};
use crate::error::NtripClientError;
use crate::reader::DEFAULT_BUFFER_CAPACITY;
use crate::uri::{classify, parse_ntrip_uri, strip_scheme, NullServiceResolver, Scheme};

const READ_CHUNK: usize = 4096;

/// A live session streaming raw correction bytes from a broadcaster.
pub struct DgnssHandle {
    _rx_handle: JoinHandle<()>,
    rx: UnboundedReceiver<Vec<u8>>,
}

impl Stream for DgnssHandle {
    type Item = Vec<u8>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Connect to `service` (an `ntrip://` or `dgpsip://` URI) and stream its
/// raw correction bytes.
pub async fn connect(service: &str, credentials: &str) -> Result<DgnssHandle, NtripClientError> {
    connect_with_capacity(service, credentials, DEFAULT_BUFFER_CAPACITY).await
}

/// Connect using a [`ClientConfig`], including its sourcetable buffer
/// capacity.
pub async fn connect_with_config(config: &ClientConfig) -> Result<DgnssHandle, NtripClientError> {
    connect_with_capacity(&config.service, &config.credentials, config.buffer_capacity).await
}

async fn connect_with_capacity(
    service: &str,
    credentials: &str,
    buffer_capacity: usize,
) -> Result<DgnssHandle, NtripClientError> {
    let socket = match classify(service) {
        Scheme::Ntrip => {
            let remainder = strip_scheme(Scheme::Ntrip, service);
            let parsed = parse_ntrip_uri(remainder, &NullServiceResolver)?;
            let creds = if parsed.credentials.is_empty() {
                credentials.to_string()
            } else {
                parsed.credentials
            };
            debug!("connecting to NTRIP caster {}:{}{}", parsed.host, parsed.port, parsed.mountpoint);
            let mut conn =
                NtripConnection::new(parsed.host, parsed.port, parsed.mountpoint, creds)
                    .with_buffer_capacity(buffer_capacity);
            conn.connect().await?;
            conn.into_socket().ok_or(NtripClientError::Terminal)?
        },
        Scheme::DgpsIp => {
            if !cfg!(feature = "dgpsip") {
                return Err(NtripClientError::UnknownProtocol(service.to_string()));
            }
            let remainder = strip_scheme(Scheme::DgpsIp, service);
            let (host, port) = parse_dgpsip_uri(remainder);
            debug!("connecting to DGPS/IP broadcaster {host}:{port}");
            dgpsip_open(&host, port).await?
        },
        Scheme::Unknown => {
            if cfg!(feature = "strict-dgnss") || !cfg!(feature = "dgpsip") {
                return Err(NtripClientError::UnknownProtocol(service.to_string()));
            }
            warn!("unrecognized scheme in {service:?}, falling back to DGPS/IP");
            let (host, port) = parse_dgpsip_uri(service);
            dgpsip_open(&host, port).await?
        },
    };

    Ok(spawn_forwarder(socket))
}

fn spawn_forwarder(mut socket: TcpStream) -> DgnssHandle {
    let (tx, rx) = unbounded_channel();
    let rx_handle = tokio::task::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) => {
                    debug!("dgnss stream closed by remote");
                    break;
                },
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                },
                Err(e) => {
                    warn!("dgnss stream read error: {e}");
                    break;
                },
            }
        }
    });

    DgnssHandle {
        _rx_handle: rx_handle,
        rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn str_line(mountpoint: &str) -> String {
        let fields = [
            mountpoint, "id", "RTCM 3.0", "", "0", "", "", "", "0", "0", "0", "", "", "none", "N",
            "0", "9600",
        ];
        format!("STR;{};\r\n", fields.join(";"))
    }

    #[tokio::test]
    async fn ntrip_service_streams_raw_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await.unwrap();
            let body = format!(
                "SOURCETABLE 200 OK\r\n{}ENDSOURCETABLE\r\n",
                str_line("MP1")
            );
            sock.write_all(body.as_bytes()).await.unwrap();
            drop(sock);

            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await.unwrap();
            sock.write_all(b"ICY 200 OK\r\n\r\n").await.unwrap();
            sock.write_all(b"\xd3\x00\x01\xffcorrection-bytes").await.unwrap();
        });

        let service = format!("ntrip://{}:{}/MP1", addr.ip(), addr.port());
        let mut handle = connect(&service, "").await.unwrap();
        let chunk = handle.next().await.unwrap();
        assert!(!chunk.is_empty());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn dgpsip_service_streams_without_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"raw-dgps-bytes").await.unwrap();
        });

        let service = format!("dgpsip://{}:{}", addr.ip(), addr.port());
        let mut handle = connect(&service, "").await.unwrap();
        let chunk = handle.next().await.unwrap();
        assert_eq!(chunk, b"raw-dgps-bytes");

        server.await.unwrap();
    }
}
