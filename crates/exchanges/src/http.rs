//! Monoio-native HTTP/HTTPS client
//!
//! One TLS connection per request (`Connection: close`), rustls over a
//! monoio `TcpStream`. Bodies are read until the peer closes, then framed by
//! `Transfer-Encoding: chunked` or `Content-Length` when present.

use crate::errors::{ExchangeError, Result};
use monoio::io::{AsyncReadRent, AsyncWriteRentExt};
use monoio::net::TcpStream;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection};
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, OnceLock};
use tracing::debug;

const READ_CHUNK: usize = 8192;

/// Shared rustls client configuration with the webpki root store
pub fn tls_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    CONFIG
        .get_or_init(|| {
            let mut root_store = rustls::RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Arc::new(
                ClientConfig::builder()
                    .with_root_certificates(root_store)
                    .with_no_client_auth(),
            )
        })
        .clone()
}

/// Open a TCP connection and wrap it in a client TLS session for `host`
pub async fn connect_tls(host: &str, port: u16) -> Result<TlsStream> {
    let tcp_stream = TcpStream::connect(format!("{host}:{port}"))
        .await
        .map_err(|e| ExchangeError::NetworkError(format!("TCP connect to {host}:{port} failed: {e}")))?;

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| ExchangeError::NetworkError(format!("Invalid server name: {e:?}")))?;

    let tls_conn = ClientConnection::new(tls_config(), server_name)
        .map_err(|e| ExchangeError::NetworkError(format!("TLS setup failed: {e}")))?;

    Ok(TlsStream::new(tcp_stream, tls_conn))
}

/// Monoio-native HTTPS client
pub struct MonoioHttpsClient {
    user_agent: String,
}

/// HTTP response with a decoded body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl MonoioHttpsClient {
    pub fn new() -> Self {
        Self {
            user_agent: "CryptoBot/0.1".to_string(),
        }
    }

    /// HTTPS GET
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request_with_headers("GET", url, None, &[]).await
    }

    /// Make an HTTPS request with extra headers
    pub async fn request_with_headers(
        &self,
        method: &str,
        url: &str,
        body: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let parsed_url = url::Url::parse(url)?;

        let host = parsed_url
            .host_str()
            .ok_or_else(|| ExchangeError::InvalidUrl("No host in URL".to_string()))?;
        let port = parsed_url.port().unwrap_or(443);

        let mut path_and_query = if parsed_url.path().is_empty() {
            "/".to_string()
        } else {
            parsed_url.path().to_string()
        };
        if let Some(query) = parsed_url.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        let mut tls_stream = connect_tls(host, port).await?;
        let request = build_request(method, host, &path_and_query, &self.user_agent, body, headers);

        debug!("{} {} ({} bytes)", method, path_and_query.split('?').next().unwrap_or(""), request.len());

        tls_stream.write_all(request.as_bytes()).await?;
        let response_data = tls_stream.read_to_end().await?;

        parse_http_response(&response_data)
    }
}

impl Default for MonoioHttpsClient {
    fn default() -> Self {
        Self::new()
    }
}

fn build_request(
    method: &str,
    host: &str,
    path_and_query: &str,
    user_agent: &str,
    body: Option<&str>,
    headers: &[(&str, &str)],
) -> String {
    let content_length = body.map(|b| b.len()).unwrap_or(0);
    let mut request = format!(
        "{method} {path_and_query} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: {user_agent}\r\n\
         Accept: application/json\r\n\
         Connection: close\r\n\
         Content-Length: {content_length}\r\n"
    );

    for (key, value) in headers {
        request.push_str(key);
        request.push_str(": ");
        request.push_str(value);
        request.push_str("\r\n");
    }

    request.push_str("\r\n");
    if let Some(body) = body {
        request.push_str(body);
    }
    request
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a raw HTTP/1.1 response read until connection close
pub fn parse_http_response(data: &[u8]) -> Result<HttpResponse> {
    let header_end = find_subslice(data, b"\r\n\r\n").ok_or_else(|| {
        ExchangeError::NetworkError("Invalid HTTP response: no header terminator".to_string())
    })?;

    let header_part = String::from_utf8_lossy(&data[..header_end]);
    let raw_body = &data[header_end + 4..];

    let mut lines = header_part.lines();
    let status_line = lines
        .next()
        .ok_or_else(|| ExchangeError::NetworkError("Empty response".to_string()))?;

    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ExchangeError::NetworkError(format!("Invalid status line: {status_line}")))?;

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let mut response = HttpResponse {
        status,
        headers,
        body: String::new(),
    };

    let chunked = response
        .header("transfer-encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));

    let body = if chunked {
        decode_chunked(raw_body)?
    } else if let Some(len) = response.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        raw_body[..len.min(raw_body.len())].to_vec()
    } else {
        raw_body.to_vec()
    };

    response.body = String::from_utf8_lossy(&body).into_owned();
    Ok(response)
}

/// Decode a `Transfer-Encoding: chunked` body
pub fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());

    loop {
        let line_end = find_subslice(data, b"\r\n")
            .ok_or_else(|| ExchangeError::InvalidResponse("Truncated chunk header".to_string()))?;
        let size_line = String::from_utf8_lossy(&data[..line_end]);
        // Chunk extensions follow a ';'
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| ExchangeError::InvalidResponse(format!("Invalid chunk size: {size_hex}")))?;

        data = &data[line_end + 2..];
        if size == 0 {
            break;
        }
        if data.len() < size {
            return Err(ExchangeError::InvalidResponse("Truncated chunk body".to_string()));
        }

        out.extend_from_slice(&data[..size]);
        data = &data[size..];
        if data.starts_with(b"\r\n") {
            data = &data[2..];
        }
    }

    Ok(out)
}

/// TLS session over a monoio TCP stream
pub struct TlsStream {
    stream: TcpStream,
    tls_conn: ClientConnection,
    write_buf: Vec<u8>,
    handshake_complete: bool,
}

impl TlsStream {
    pub fn new(stream: TcpStream, tls_conn: ClientConnection) -> Self {
        Self {
            stream,
            tls_conn,
            write_buf: Vec::with_capacity(READ_CHUNK),
            handshake_complete: false,
        }
    }

    /// Drive the TLS handshake to completion
    pub async fn complete_handshake(&mut self) -> Result<()> {
        if self.handshake_complete {
            return Ok(());
        }

        loop {
            self.flush_tls().await?;

            if !self.tls_conn.is_handshaking() {
                self.handshake_complete = true;
                return Ok(());
            }

            if self.tls_conn.wants_read() {
                if self.read_tls_from_tcp().await? == 0 {
                    return Err(ExchangeError::NetworkError(
                        "Connection closed during handshake".to_string(),
                    ));
                }
            } else if !self.tls_conn.wants_write() {
                return Err(ExchangeError::NetworkError("TLS handshake stalled".to_string()));
            }
        }
    }

    /// Encrypt and send application data
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.complete_handshake().await?;

        self.tls_conn
            .writer()
            .write_all(data)
            .map_err(|e| ExchangeError::NetworkError(format!("TLS application write failed: {e}")))?;

        self.flush_tls().await
    }

    /// Read decrypted bytes into `buf`; `Ok(0)` means the peer closed
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.complete_handshake().await?;

        loop {
            match self.tls_conn.reader().read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                // Peer dropped TCP without close_notify
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(0),
                Err(e) => return Err(ExchangeError::NetworkError(format!("TLS read failed: {e}"))),
            }

            if self.read_tls_from_tcp().await? == 0 {
                return Ok(0);
            }
            // Key updates and other post-handshake records may need a reply
            self.flush_tls().await?;
        }
    }

    /// Read decrypted bytes until the peer closes the connection
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut response_data = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            let n = self.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            response_data.extend_from_slice(&chunk[..n]);
        }

        Ok(response_data)
    }

    async fn flush_tls(&mut self) -> Result<()> {
        while self.tls_conn.wants_write() {
            self.write_buf.clear();
            self.tls_conn
                .write_tls(&mut self.write_buf)
                .map_err(|e| ExchangeError::NetworkError(format!("TLS write failed: {e}")))?;

            if !self.write_buf.is_empty() {
                let buf = std::mem::take(&mut self.write_buf);
                let (result, buf) = self.stream.write_all(buf).await;
                self.write_buf = buf;
                result.map_err(|e| ExchangeError::NetworkError(format!("TCP write failed: {e}")))?;
            }
        }
        Ok(())
    }

    async fn read_tls_from_tcp(&mut self) -> Result<usize> {
        let (result, buf) = self.stream.read(vec![0u8; READ_CHUNK]).await;
        let bytes_read = result.map_err(|e| ExchangeError::NetworkError(format!("TCP read failed: {e}")))?;
        if bytes_read == 0 {
            return Ok(0);
        }

        let mut cursor = std::io::Cursor::new(&buf[..bytes_read]);
        while (cursor.position() as usize) < bytes_read {
            self.tls_conn
                .read_tls(&mut cursor)
                .map_err(|e| ExchangeError::NetworkError(format!("TLS read_tls failed: {e}")))?;
            self.tls_conn
                .process_new_packets()
                .map_err(|e| ExchangeError::NetworkError(format!("TLS process failed: {e}")))?;
        }

        Ok(bytes_read)
    }
}
