//! Monoio-native WebSocket client
//!
//! RFC 6455 client framing over the crate's `TlsStream`. Pings are answered
//! automatically; fragmented text messages are reassembled before they are
//! handed to the caller.

use crate::errors::{ExchangeError, Result};
use crate::http::{TlsStream, connect_tls};
use cryptobot_core::id_gen::random_bytes;
use cryptobot_core::PerfTimer;

use base64::Engine;
use sha1::{Digest, Sha1};
use tracing::{debug, info};
use url::Url;

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const MAX_HANDSHAKE_LEN: usize = 16 * 1024;

/// WebSocket opcode constants
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xa,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(OpCode::Continuation),
            0x1 => Some(OpCode::Text),
            0x2 => Some(OpCode::Binary),
            0x8 => Some(OpCode::Close),
            0x9 => Some(OpCode::Ping),
            0xa => Some(OpCode::Pong),
            _ => None,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

/// WebSocket frame header
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub fin: bool,
    pub opcode: OpCode,
    pub mask: Option<[u8; 4]>,
    pub payload_len: u64,
}

/// WebSocket frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Client frame; clients always mask
    fn masked(opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            header: FrameHeader {
                fin: true,
                opcode,
                mask: Some(random_bytes::<4>()),
                payload_len: payload.len() as u64,
            },
            payload,
        }
    }

    pub fn pong(data: Vec<u8>) -> Self {
        Self::masked(OpCode::Pong, data)
    }

    pub fn close(code: u16, reason: &str) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        Self::masked(OpCode::Close, payload)
    }

    fn apply_mask(payload: &mut [u8], mask: &[u8; 4]) {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= mask[i % 4];
        }
    }

    /// Serialize frame to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.payload.len() + 14);

        let first_byte = if self.header.fin { 0x80 } else { 0x00 } | (self.header.opcode as u8);
        frame.push(first_byte);

        let mask_bit = if self.header.mask.is_some() { 0x80 } else { 0x00 };
        if self.header.payload_len < 126 {
            frame.push(mask_bit | (self.header.payload_len as u8));
        } else if self.header.payload_len < 65536 {
            frame.push(mask_bit | 126);
            frame.extend_from_slice(&(self.header.payload_len as u16).to_be_bytes());
        } else {
            frame.push(mask_bit | 127);
            frame.extend_from_slice(&self.header.payload_len.to_be_bytes());
        }

        let mut payload = self.payload.clone();
        if let Some(mask) = &self.header.mask {
            frame.extend_from_slice(mask);
            Self::apply_mask(&mut payload, mask);
        }
        frame.extend_from_slice(&payload);

        frame
    }

    /// Parse one frame from the front of `data`.
    ///
    /// Returns `Ok(None)` when more bytes are needed.
    pub fn from_bytes(data: &[u8]) -> Result<Option<(Self, usize)>> {
        if data.len() < 2 {
            return Ok(None);
        }

        let first_byte = data[0];
        let second_byte = data[1];

        let fin = (first_byte & 0x80) != 0;
        let opcode = OpCode::from_u8(first_byte & 0x0f).ok_or_else(|| {
            ExchangeError::InvalidResponse(format!("Invalid WebSocket opcode {:#x}", first_byte & 0x0f))
        })?;

        let masked = (second_byte & 0x80) != 0;
        let mut offset = 2;
        let payload_len = match second_byte & 0x7f {
            126 => {
                if data.len() < offset + 2 {
                    return Ok(None);
                }
                let len = u16::from_be_bytes([data[2], data[3]]) as u64;
                offset += 2;
                len
            }
            127 => {
                if data.len() < offset + 8 {
                    return Ok(None);
                }
                let mut len_bytes = [0u8; 8];
                len_bytes.copy_from_slice(&data[2..10]);
                offset += 8;
                u64::from_be_bytes(len_bytes)
            }
            len => len as u64,
        };

        // Control frames are never fragmented and carry at most 125 bytes
        if opcode.is_control() && (!fin || payload_len > 125) {
            return Err(ExchangeError::InvalidResponse(format!(
                "Malformed {opcode:?} control frame"
            )));
        }

        let mask = if masked {
            if data.len() < offset + 4 {
                return Ok(None);
            }
            let mask = [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]];
            offset += 4;
            Some(mask)
        } else {
            None
        };

        let end = usize::try_from(payload_len)
            .ok()
            .and_then(|len| offset.checked_add(len))
            .ok_or_else(|| ExchangeError::InvalidResponse("WebSocket frame too large".to_string()))?;
        if data.len() < end {
            return Ok(None);
        }

        let mut payload = data[offset..end].to_vec();
        if let Some(mask) = &mask {
            Self::apply_mask(&mut payload, mask);
        }

        let frame = Frame {
            header: FrameHeader {
                fin,
                opcode,
                mask,
                payload_len,
            },
            payload,
        };
        Ok(Some((frame, end)))
    }
}

/// `Sec-WebSocket-Accept` value expected for a given key
pub fn accept_key(ws_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(ws_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

fn validate_handshake_response(response: &str, ws_key: &str) -> Result<()> {
    let status_ok = response
        .lines()
        .next()
        .is_some_and(|line| line.split_whitespace().nth(1) == Some("101"));
    if !status_ok {
        let status = response.lines().next().unwrap_or_default();
        return Err(ExchangeError::NetworkError(format!("WebSocket handshake failed: {status}")));
    }

    let expected = accept_key(ws_key);
    let accepted = response.lines().filter_map(|l| l.split_once(':')).any(|(k, v)| {
        k.trim().eq_ignore_ascii_case("sec-websocket-accept") && v.trim() == expected
    });
    if !accepted {
        return Err(ExchangeError::NetworkError(
            "WebSocket handshake failed: invalid accept key".to_string(),
        ));
    }

    Ok(())
}

/// Monoio-native WebSocket client
pub struct MonoioWebSocket {
    stream: TlsStream,
    url: Url,
    connected: bool,
    close_sent: bool,
    buffer: Vec<u8>,
}

impl MonoioWebSocket {
    /// Open a `wss://` connection and perform the upgrade handshake
    pub async fn connect(url: Url) -> Result<Self> {
        let timer = PerfTimer::start("websocket_connect");

        let host = url
            .host_str()
            .ok_or_else(|| ExchangeError::InvalidUrl("No host in WebSocket URL".to_string()))?
            .to_string();
        let port = url.port().unwrap_or(443);

        let mut tls_stream = connect_tls(&host, port).await?;
        tls_stream.complete_handshake().await?;
        debug!("✅ TLS established to {}:{}", host, port);

        let mut websocket = Self {
            stream: tls_stream,
            url,
            connected: false,
            close_sent: false,
            buffer: Vec::with_capacity(8192),
        };
        websocket.perform_handshake(&host).await?;

        timer.log_elapsed();
        info!("✅ WebSocket connected: {}", websocket.url);
        Ok(websocket)
    }

    async fn perform_handshake(&mut self, host: &str) -> Result<()> {
        let ws_key = base64::engine::general_purpose::STANDARD.encode(random_bytes::<16>());

        let path = if self.url.path().is_empty() { "/" } else { self.url.path() };
        let query = self.url.query().map(|q| format!("?{q}")).unwrap_or_default();

        let request = format!(
            "GET {path}{query} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {ws_key}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        self.stream.write_all(request.as_bytes()).await?;

        // Frames may arrive in the same read as the response headers
        let mut chunk = vec![0u8; 4096];
        let header_end = loop {
            if let Some(pos) = self.buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if self.buffer.len() > MAX_HANDSHAKE_LEN {
                return Err(ExchangeError::NetworkError("WebSocket handshake response too large".to_string()));
            }
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(ExchangeError::NetworkError(
                    "Connection closed during WebSocket handshake".to_string(),
                ));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        };

        let response = String::from_utf8_lossy(&self.buffer[..header_end]).into_owned();
        self.buffer.drain(..header_end);
        validate_handshake_response(&response, &ws_key)?;

        self.connected = true;
        Ok(())
    }

    pub async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        if !self.connected || self.close_sent {
            return Err(ExchangeError::NetworkError("WebSocket not connected".to_string()));
        }

        self.stream.write_all(&frame.to_bytes()).await?;

        if frame.header.opcode == OpCode::Close {
            self.close_sent = true;
        }
        Ok(())
    }

    /// Next frame from the peer, answering pings along the way
    pub async fn receive_frame(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(ExchangeError::NetworkError("WebSocket not connected".to_string()));
        }

        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((frame, consumed)) = Frame::from_bytes(&self.buffer)? {
                self.buffer.drain(..consumed);

                match frame.header.opcode {
                    OpCode::Ping => {
                        debug!("Received ping, sending pong");
                        self.send_frame(Frame::pong(frame.payload)).await?;
                        continue;
                    }
                    OpCode::Close => {
                        debug!("Received close frame");
                        if !self.close_sent {
                            let _ = self.send_frame(Frame::close(1000, "")).await;
                        }
                        self.connected = false;
                        return Ok(frame);
                    }
                    _ => return Ok(frame),
                }
            }

            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                self.connected = false;
                return Err(ExchangeError::NetworkError("WebSocket connection closed by peer".to_string()));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Next complete text message, reassembling fragments
    pub async fn receive_text(&mut self) -> Result<String> {
        let mut message: Vec<u8> = Vec::new();
        let mut in_text = false;

        loop {
            let frame = self.receive_frame().await?;
            match frame.header.opcode {
                OpCode::Text => {
                    message = frame.payload;
                    in_text = true;
                }
                OpCode::Continuation if in_text => message.extend_from_slice(&frame.payload),
                OpCode::Close => {
                    return Err(ExchangeError::NetworkError("WebSocket closed by server".to_string()));
                }
                OpCode::Pong | OpCode::Binary | OpCode::Continuation | OpCode::Ping => continue,
            }

            if frame.header.fin {
                return String::from_utf8(message)
                    .map_err(|e| ExchangeError::InvalidResponse(format!("Invalid UTF-8 in text frame: {e}")));
            }
        }
    }

    /// Send a close frame; the peer's reply is not awaited
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        if !self.connected || self.close_sent {
            return Ok(());
        }

        debug!("🔌 Closing WebSocket {}", self.url);
        self.send_frame(Frame::close(code, reason)).await?;
        self.connected = false;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected && !self.close_sent
    }
}
