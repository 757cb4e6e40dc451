//! Error taxonomy untuk semua stage relay
//!
//! - `TransportError`: resolve, connect, send, receive (SCGI layer)
//! - `DecodeError`: dokumen XML-RPC yang tidak bisa di-decode
//! - `RpcError`: apa yang dilihat caller dari façade
//! - `ConfigError`: file konfigurasi relay

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Stage transport tempat deadline habis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Send,
    ReceiveHeaders,
    ReceiveBody,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Send => "send",
            Stage::ReceiveHeaders => "receive headers",
            Stage::ReceiveBody => "receive body",
        };
        f.write_str(name)
    }
}

/// Errors dari SCGI transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Tidak ada baris `scgi_port = host:port` di config daemon
    #[error("no scgi_port entry found in {}", path.display())]
    NoScgiPort { path: PathBuf },

    #[error("cannot read daemon config {}: {source}", path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid daemon address: {0}")]
    InvalidAddress(String),

    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Read/write failure, diteruskan apa adanya
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed response header: {0:?}")]
    MalformedHeader(String),

    #[error("response is missing the {0} header")]
    MissingHeader(&'static str),

    #[error("daemon answered with status {0}")]
    BadStatus(u16),

    #[error("unparsable response status {0:?}")]
    InvalidStatus(String),

    #[error("deadline elapsed during {stage}")]
    Timeout { stage: Stage },
}

impl TransportError {
    /// Map I/O error dari stage tertentu; `TimedOut` menjadi `Timeout`
    pub fn from_io(err: io::Error, stage: Stage) -> Self {
        if err.kind() == io::ErrorKind::TimedOut {
            Self::Timeout { stage }
        } else {
            Self::Io(err)
        }
    }
}

/// Errors saat decode dokumen XML-RPC
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unrecognized XML-RPC element <{0}>")]
    UnknownTag(String),

    #[error("<{0}> has no child element")]
    EmptyElement(String),

    #[error("invalid <{tag}> value {text:?}")]
    InvalidScalar { tag: String, text: String },

    #[error("struct member without <name>")]
    MissingMemberName,

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("response body is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("document root is <{0}>, expected <methodCall>")]
    NotAMethodCall(String),
}

/// Error yang dikembalikan façade ke caller
#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("daemon fault {code}: {message}")]
    Fault { code: i64, message: String },
}

/// Errors saat load konfigurasi relay
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid relay config: {0}")]
    Parse(#[from] toml::de::Error),
}
