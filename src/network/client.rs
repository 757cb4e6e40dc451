//! SCGI Client
//!
//! State machine per call, strictly sequential, tanpa retry:
//! resolve -> connect -> send -> receive headers -> validate status -> receive body

use std::time::Instant;

use tracing::{debug, trace, warn};

use super::framing::{encode_request, ResponseHead};
use super::Connection;
use crate::config::RelayConfig;
use crate::error::{Stage, TransportError};

/// Client stateless untuk listener SCGI daemon
///
/// Alamat daemon di-resolve ulang setiap request, tidak ada connection pool.
#[derive(Debug, Clone)]
pub struct ScgiClient {
    config: RelayConfig,
}

impl ScgiClient {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Kirim satu dokumen, kembalikan body response mentah
    pub fn request(&self, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        let deadline = self.config.timeout().map(|t| Instant::now() + t);

        // 1. Resolve
        let daemon = self.config.daemon_address()?;
        let addr = daemon.socket_addr()?;
        debug!(%daemon, %addr, "resolved scgi listener");

        // 2. Connect
        let mut conn = Connection::connect(addr, deadline).map_err(|source| {
            if source.kind() == std::io::ErrorKind::TimedOut {
                TransportError::Timeout {
                    stage: Stage::Connect,
                }
            } else {
                TransportError::ConnectFailed {
                    addr: daemon.to_string(),
                    source,
                }
            }
        })?;

        // 3. Send
        let message = encode_request(body);
        debug!(bytes = message.len(), body = body.len(), "sending scgi request");
        conn.write_all(&message)
            .map_err(|e| TransportError::from_io(e, Stage::Send))?;

        // 4. Receive headers
        let head = read_head(&mut conn)?;

        // 5. Validate status
        if let Err(err) = head.ensure_ok() {
            warn!(status = ?head.get("status"), "daemon rejected request");
            return Err(err);
        }

        // 6. Receive body
        let len = head.content_length()?;
        let response = conn
            .read_exact(len)
            .map_err(|e| TransportError::from_io(e, Stage::ReceiveBody))?;
        debug!(bytes = response.len(), "received scgi response");
        Ok(response)
    }
}

/// Baca header sampai baris kosong
fn read_head(conn: &mut Connection) -> Result<ResponseHead, TransportError> {
    let mut head = ResponseHead::new();
    loop {
        let line = conn
            .read_line()
            .map_err(|e| TransportError::from_io(e, Stage::ReceiveHeaders))?;
        if line.is_empty() {
            return Ok(head);
        }

        let line = String::from_utf8_lossy(&line);
        trace!(header = %line, "response header");
        head.push_line(&line)?;
    }
}
