//! Network Layer: SCGI Transport
//!
//! Menggunakan mio untuk non-blocking I/O dengan deadline per call.
//!
//! Fitur:
//! - Byte-exact SCGI framing (length prefix, NUL separator, koma)
//! - Satu connection per request, tanpa pooling
//! - Setiap stage blocking dibatasi satu deadline

mod client;
mod connection;
mod framing;

pub use client::ScgiClient;
pub use connection::Connection;
pub use framing::{encode_request, header_block, parse_header_line, ResponseHead};
