//! Protocol Layer: XML-RPC Codec
//!
//! Prinsip desain:
//! - Closed value set: `RpcValue` adalah enum, encoder total
//! - Stateless: semua fungsi bebas, aman dipakai dari banyak thread
//! - Decode eksplisit: tag tidak dikenal adalah error, bukan default

mod call;
mod multicall;
mod value;

pub use call::{build_call, decode_document, parse_response, Fault, MethodCall, MethodResponse};
pub use multicall::{normalize_command, to_camel_case, Batchcall, Multicall, Row, Target};
pub use value::{decode_node, encode_value, escape_xml, RpcValue};
