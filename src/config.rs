//! Relay configuration
//!
//! Dua sumber:
//! - `RelayConfig`: setting relay sendiri (TOML), path config daemon + deadline
//! - Config daemon (`.rtorrent.rc`): baris `scgi_port = host:port`

use std::fmt;
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TransportError};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RC_FILE: &str = ".rtorrent.rc";

/// Setting relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Path config daemon yang berisi `scgi_port`
    pub rtorrent_rc: PathBuf,
    /// Deadline per call dalam milidetik, 0 = tanpa batas
    pub timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            rtorrent_rc: dirs::home_dir()
                .unwrap_or_default()
                .join(DEFAULT_RC_FILE),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RelayConfig {
    /// Load dari file TOML; key yang tidak ada memakai default
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Deadline per call, `None` jika tidak dibatasi
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Baca config daemon dan ambil alamat SCGI
    ///
    /// Dibaca ulang setiap call supaya perubahan config daemon langsung terlihat.
    pub fn daemon_address(&self) -> Result<DaemonAddress, TransportError> {
        let text = fs::read_to_string(&self.rtorrent_rc).map_err(|source| {
            TransportError::ConfigUnreadable {
                path: self.rtorrent_rc.clone(),
                source,
            }
        })?;

        match DaemonAddress::from_rc_str(&text) {
            Some(Ok(addr)) => Ok(addr),
            Some(Err(err)) => Err(err),
            None => Err(TransportError::NoScgiPort {
                path: self.rtorrent_rc.clone(),
            }),
        }
    }
}

/// Alamat listener SCGI daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonAddress {
    pub host: String,
    pub port: u16,
}

fn scgi_port_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:scgi_port|network\.scgi\.open_port)[ \t]*=[ \t]*([^\s:]+):(\S+)")
            .expect("scgi_port pattern is valid")
    })
}

impl DaemonAddress {
    /// Cari baris `scgi_port` pertama (juga bentuk baru `network.scgi.open_port`)
    ///
    /// `None` jika tidak ada baris sama sekali, `Some(Err)` jika port rusak.
    pub fn from_rc_str(text: &str) -> Option<Result<Self, TransportError>> {
        let caps = scgi_port_pattern().captures(text)?;
        let host = caps[1].to_string();
        let raw_port = &caps[2];

        Some(
            raw_port
                .parse::<u16>()
                .map(|port| Self { host, port })
                .map_err(|_| TransportError::InvalidAddress(format!("bad port {raw_port:?}"))),
        )
    }

    /// Resolve host ke socket address pertama
    pub fn socket_addr(&self) -> Result<SocketAddr, TransportError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::InvalidAddress(format!("{self}: {e}")))?
            .next()
            .ok_or_else(|| TransportError::InvalidAddress(format!("{self}: no address")))
    }
}

impl fmt::Display for DaemonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
