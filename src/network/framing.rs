//! SCGI Framing
//!
//! Request layout:
//! ┌──────────────────────────────────────────────────────────┐
//! │ "<len>:"  decimal byte length header block               │
//! ├──────────────────────────────────────────────────────────┤
//! │ NAME\0VALUE\0 ...  (CONTENT_LENGTH pertama, lalu SCGI=1)  │
//! ├──────────────────────────────────────────────────────────┤
//! │ ","                                                      │
//! ├──────────────────────────────────────────────────────────┤
//! │ body (dokumen XML-RPC), tanpa delimiter                  │
//! └──────────────────────────────────────────────────────────┘
//!
//! Response: baris header CGI (`Name: value`), baris kosong, lalu body
//! sepanjang `content-length`.

use std::collections::HashMap;

use crate::error::TransportError;

/// Header setelah CONTENT_LENGTH, urutan tetap
const FIXED_HEADERS: [(&str, &str); 3] = [
    ("SCGI", "1"),
    ("REQUEST_METHOD", "POST"),
    ("SERVER_PROTOCOL", "HTTP/1.1"),
];

#[inline]
fn push_header(block: &mut Vec<u8>, name: &str, value: &str) {
    block.extend_from_slice(name.as_bytes());
    block.push(0);
    block.extend_from_slice(value.as_bytes());
    block.push(0);
}

/// Header block (tanpa length prefix dan koma)
pub fn header_block(body_len: usize) -> Vec<u8> {
    let mut block = Vec::with_capacity(80);
    push_header(&mut block, "CONTENT_LENGTH", &body_len.to_string());
    for (name, value) in FIXED_HEADERS {
        push_header(&mut block, name, value);
    }
    block
}

/// Encode request SCGI lengkap: `<len>:<headers>,<body>`
pub fn encode_request(body: &[u8]) -> Vec<u8> {
    let block = header_block(body.len());
    let prefix = block.len().to_string();

    let mut message = Vec::with_capacity(prefix.len() + block.len() + body.len() + 2);
    message.extend_from_slice(prefix.as_bytes());
    message.push(b':');
    message.extend_from_slice(&block);
    message.push(b',');
    message.extend_from_slice(body);
    message
}

/// Parse satu baris header `name:␠*value`
pub fn parse_header_line(line: &str) -> Result<(String, String), TransportError> {
    match line.split_once(':') {
        Some((name, value)) if !name.is_empty() => Ok((
            name.to_ascii_lowercase(),
            value.trim_start_matches(' ').to_string(),
        )),
        _ => Err(TransportError::MalformedHeader(line.to_string())),
    }
}

/// Header response, nama sudah lower-case
#[derive(Debug, Default, Clone)]
pub struct ResponseHead {
    headers: HashMap<String, String>,
}

impl ResponseHead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tambah satu baris header mentah
    pub fn push_line(&mut self, line: &str) -> Result<(), TransportError> {
        let (name, value) = parse_header_line(line)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Tiga karakter pertama header `status` sebagai kode desimal
    pub fn status_code(&self) -> Result<u16, TransportError> {
        let status = self
            .get("status")
            .ok_or(TransportError::MissingHeader("status"))?;
        status
            .get(..3)
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| TransportError::InvalidStatus(status.to_string()))
    }

    /// Gagal kecuali status 200
    pub fn ensure_ok(&self) -> Result<(), TransportError> {
        match self.status_code()? {
            200 => Ok(()),
            code => Err(TransportError::BadStatus(code)),
        }
    }

    pub fn content_length(&self) -> Result<usize, TransportError> {
        let raw = self
            .get("content-length")
            .ok_or(TransportError::MissingHeader("content-length"))?;
        raw.trim()
            .parse::<usize>()
            .map_err(|_| TransportError::MalformedHeader(format!("content-length: {raw}")))
    }
}
