//! Connection state machine
//!
//! Drives one NTRIP session end to end: probe, sourcetable match, GET,
//! established stream. Each call to [`NtripConnection::step`] performs
//! exactly one state transition — one connect-and-write, or one read.
//! There is never more than one socket open at a time; the
//! `SentProbe -> SentGet` transition closes the probe socket before
//! opening the data socket.

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::error::NtripClientError;
use crate::reader::{DriverStep, ReadOutcome, SourcetableReader};
use crate::request::{encode_authorization, get_request, probe_request, send_request};
use crate::response::classify_get_response;
use crate::sourcetable::StreamDescriptor;

/// One read's worth of scratch space for both the probe and GET legs.
const READ_CHUNK: usize = 4096;

/// Connection lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnState {
    Init,
    SentProbe,
    SentGet,
    Established,
    Err,
}

/// One NTRIP connection attempt, from bare host/port/mountpoint to an
/// established byte stream.
pub struct NtripConnection {
    pub stream: StreamDescriptor,
    pub host: String,
    pub port: String,
    pub mountpoint: String,
    pub credentials: String,
    pub auth_header: String,
    pub conn_state: ConnState,
    pub sourcetable_parse: bool,
    pub works: bool,
    socket: Option<TcpStream>,
    reader: SourcetableReader,
    get_buf: Vec<u8>,
}

impl NtripConnection {
    pub fn new(host: impl Into<String>, port: impl Into<String>, mountpoint: impl Into<String>, credentials: impl Into<String>) -> Self {
        NtripConnection {
            stream: StreamDescriptor::default(),
            host: host.into(),
            port: port.into(),
            mountpoint: mountpoint.into(),
            credentials: credentials.into(),
            auth_header: String::new(),
            conn_state: ConnState::Init,
            sourcetable_parse: false,
            works: false,
            socket: None,
            reader: SourcetableReader::new(),
            get_buf: Vec::new(),
        }
    }

    /// Override the sourcetable line-buffer capacity. Only matters before
    /// the first call to [`step`](Self::step); has no effect afterward.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.reader = SourcetableReader::with_capacity(capacity);
        self
    }

    fn host_header(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect_socket(&self) -> Result<TcpStream, NtripClientError> {
        TcpStream::connect((self.host.as_str(), self.port.parse::<u16>().unwrap_or(0)))
            .await
            .map_err(|source| NtripClientError::ConnectFailed {
                host: self.host.clone(),
                port: self.port.clone(),
                source,
            })
    }

    fn fail(&mut self, err: NtripClientError) -> NtripClientError {
        self.conn_state = ConnState::Err;
        self.socket = None;
        err
    }

    /// Perform exactly one state transition. Returns the state reached
    /// (which may be the same state, e.g. `SentProbe -> SentProbe` while
    /// the sourcetable is still arriving).
    pub async fn step(&mut self) -> Result<ConnState, NtripClientError> {
        match self.conn_state {
            ConnState::Init => {
                let mut sock = match self.connect_socket().await {
                    Ok(s) => s,
                    Err(e) => return Err(self.fail(e)),
                };
                let request = probe_request(&self.host_header());
                if let Err(e) = send_request(&mut sock, &request, "probe").await {
                    return Err(self.fail(e));
                }
                self.socket = Some(sock);
                self.conn_state = ConnState::SentProbe;
                Ok(self.conn_state)
            },

            ConnState::SentProbe => {
                let Some(sock) = self.socket.as_mut() else {
                    return Err(self.fail(NtripClientError::Terminal));
                };
                let mut buf = [0u8; READ_CHUNK];
                let outcome = match sock.read(&mut buf).await {
                    Ok(0) => ReadOutcome::Eof,
                    Ok(n) => ReadOutcome::Data(&buf[..n]),
                    Err(e) => return Err(self.fail(NtripClientError::Io(e))),
                };

                let step = match self
                    .reader
                    .feed(&self.mountpoint, outcome, &mut self.stream)
                {
                    Ok(step) => step,
                    Err(e) => return Err(self.fail(e)),
                };
                self.sourcetable_parse = self.reader.sourcetable_parse();

                match step {
                    DriverStep::NeedMore => Ok(self.conn_state),
                    DriverStep::Matched => {
                        // close the probe socket before opening the data one.
                        self.socket = None;
                        self.auth_header = encode_authorization(
                            self.stream.authentication,
                            &self.credentials,
                        );

                        let mut sock = match self.connect_socket().await {
                            Ok(s) => s,
                            Err(e) => return Err(self.fail(e)),
                        };
                        let request =
                            get_request(&self.host_header(), &self.mountpoint, &self.auth_header);
                        if let Err(e) = send_request(&mut sock, &request, "get").await {
                            return Err(self.fail(e));
                        }
                        self.socket = Some(sock);
                        self.conn_state = ConnState::SentGet;
                        Ok(self.conn_state)
                    },
                }
            },

            ConnState::SentGet => {
                let Some(sock) = self.socket.as_mut() else {
                    return Err(self.fail(NtripClientError::Terminal));
                };
                let mut buf = [0u8; READ_CHUNK];
                match sock.read(&mut buf).await {
                    Ok(0) => {
                        return Err(self.fail(NtripClientError::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "ntrip stream closed before GET response",
                        ))));
                    },
                    Ok(n) => self.get_buf.extend_from_slice(&buf[..n]),
                    Err(e) => return Err(self.fail(NtripClientError::Io(e))),
                }

                match classify_get_response(&self.get_buf, &self.mountpoint) {
                    Ok(()) => {
                        self.works = true;
                        self.conn_state = ConnState::Established;
                        Ok(self.conn_state)
                    },
                    Err(e) => Err(self.fail(e)),
                }
            },

            ConnState::Established => Ok(ConnState::Established),

            ConnState::Err => Err(NtripClientError::Terminal),
        }
    }

    /// Drive [`step`](Self::step) until the connection is established,
    /// propagating the first error encountered. `step` never returns the
    /// `Err` state directly — a failed transition always comes back as
    /// `Err(_)` from `step` itself — so this loop only has to watch for
    /// `Established`.
    pub async fn connect(&mut self) -> Result<(), NtripClientError> {
        loop {
            if self.step().await? == ConnState::Established {
                return Ok(());
            }
        }
    }

    /// Hand back the established socket for the caller to read correction
    /// bytes from. Only meaningful once `conn_state == Established`.
    pub fn into_socket(self) -> Option<TcpStream> {
        self.socket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn str_line(mountpoint: &str, authentication: &str) -> String {
        let fields = [
            mountpoint, "id", "RTCM 3.0", "", "0", "", "", "", "0", "0", "0", "", "", "none",
            authentication, "0", "9600",
        ];
        format!("STR;{};\r\n", fields.join(";"))
    }

    /// Drives a fake broadcaster over a loopback listener through the
    /// full probe -> sourcetable -> GET handshake.
    #[tokio::test]
    async fn full_handshake_reaches_established() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            // probe leg
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let n = sock.read(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).starts_with("GET / HTTP/1.1"));
            let body = format!(
                "SOURCETABLE 200 OK\r\n{}ENDSOURCETABLE\r\n",
                str_line("MP1", "N")
            );
            sock.write_all(body.as_bytes()).await.unwrap();
            sock.shutdown().await.unwrap();
            drop(sock);

            // GET leg, fresh socket per the one-socket-per-state invariant.
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let n = sock.read(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).starts_with("GET /MP1 HTTP/1.1"));
            sock.write_all(b"ICY 200 OK\r\n\r\n").await.unwrap();
            sock
        });

        let mut conn = NtripConnection::new(
            addr.ip().to_string(),
            addr.port().to_string(),
            "MP1",
            "",
        );
        conn.connect().await.unwrap();
        assert_eq!(conn.conn_state, ConnState::Established);
        assert!(conn.works);
        assert_eq!(conn.stream.mountpoint, "MP1");
        assert_eq!(conn.stream.authentication, crate::sourcetable::Authentication::None);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_mountpoint_transitions_to_err() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await.unwrap();
            let body = format!(
                "SOURCETABLE 200 OK\r\n{}ENDSOURCETABLE\r\n",
                str_line("OTHER", "N")
            );
            sock.write_all(body.as_bytes()).await.unwrap();
            sock.shutdown().await.unwrap();
        });

        let mut conn =
            NtripConnection::new(addr.ip().to_string(), addr.port().to_string(), "MP1", "");
        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, NtripClientError::MountpointNotFound(_)));
        assert_eq!(conn.conn_state, ConnState::Err);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn basic_auth_header_reaches_get_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await.unwrap();
            let body = format!(
                "SOURCETABLE 200 OK\r\n{}ENDSOURCETABLE\r\n",
                str_line("MP1", "B")
            );
            sock.write_all(body.as_bytes()).await.unwrap();
            sock.shutdown().await.unwrap();
            drop(sock);

            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let n = sock.read(&mut buf).await.unwrap();
            let req = String::from_utf8_lossy(&buf[..n]).to_string();
            assert!(req.contains("Authorization: Basic YWxpY2U6c2VjcmV0\r\n"));
            sock.write_all(b"ICY 200 OK\r\n\r\n").await.unwrap();
        });

        let mut conn = NtripConnection::new(
            addr.ip().to_string(),
            addr.port().to_string(),
            "MP1",
            "alice:secret",
        );
        conn.connect().await.unwrap();
        assert_eq!(conn.conn_state, ConnState::Established);

        server.await.unwrap();
    }
}
