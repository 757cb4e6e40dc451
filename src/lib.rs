//! rtrelay - XML-RPC over SCGI untuk rTorrent
//!
//! Arsitektur:
//! - `xmlrpc`: value codec, method call framer, multicall/batchcall builder
//! - `network`: SCGI framing + transport non-blocking dengan deadline
//! - `rpc`: façade `call` / `multicall` / `batchcall` / `relay`
//! - `config`: setting relay dan lokasi listener SCGI daemon

pub mod config;
pub mod error;
pub mod network;
pub mod rpc;
pub mod xmlrpc;

pub use config::{DaemonAddress, RelayConfig};
pub use error::{ConfigError, DecodeError, RpcError, Stage, TransportError};
pub use network::ScgiClient;
pub use rpc::{RelayReply, RpcClient, Transport};
pub use xmlrpc::{MethodCall, MethodResponse, Row, RpcValue, Target};
