//! RPC Call Façade
//!
//! Menyambungkan codec XML-RPC ke transport. Error transport dibawa apa
//! adanya sampai ke caller supaya "daemon tidak bisa dihubungi" bisa
//! dibedakan dari "daemon tidak mengembalikan data".

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DecodeError, RpcError, TransportError};
use crate::network::ScgiClient;
use crate::xmlrpc::{
    parse_response, Batchcall, MethodCall, MethodResponse, Multicall, Row, RpcValue, Target,
};

/// Satu round trip dokumen ke daemon
pub trait Transport {
    fn round_trip(&self, document: &[u8]) -> Result<Vec<u8>, TransportError>;
}

impl Transport for ScgiClient {
    fn round_trip(&self, document: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.request(document)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn round_trip(&self, document: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).round_trip(document)
    }
}

/// Jawaban entry point relay: `{"xml": ..}` atau `{"error": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayReply {
    Xml(String),
    Error(String),
}

/// Client RPC di atas transport apa pun
#[derive(Debug, Clone)]
pub struct RpcClient<T> {
    transport: T,
}

impl<T: Transport> RpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Panggil satu method
    pub fn call(&self, method: &str, params: Vec<RpcValue>) -> Result<RpcValue, RpcError> {
        self.execute(&MethodCall::new(method, params))
    }

    /// Serialize, kirim, decode
    pub fn execute(&self, call: &MethodCall) -> Result<RpcValue, RpcError> {
        debug!(method = %call.method_name, params = call.params.len(), "rpc call");

        let body = self.transport.round_trip(call.to_xml().as_bytes())?;
        let document = String::from_utf8(body).map_err(DecodeError::from)?;

        match parse_response(&document)? {
            MethodResponse::Success(value) => Ok(value),
            MethodResponse::Fault(fault) => {
                warn!(
                    method = %call.method_name,
                    code = fault.code,
                    "daemon fault: {}",
                    fault.message
                );
                Err(RpcError::Fault {
                    code: fault.code,
                    message: fault.message,
                })
            }
        }
    }

    /// Satu command set untuk semua object di namespace `target`
    pub fn multicall<S: AsRef<str>>(
        &self,
        target: Target,
        hash: &str,
        filter: &str,
        commands: &[S],
    ) -> Result<Vec<Row>, RpcError> {
        let multicall = Multicall::new(target, hash, filter)
            .commands(commands.iter().map(|c| c.as_ref().to_string()));
        let response = self.execute(&multicall.to_call())?;
        Ok(multicall.remap(response)?)
    }

    /// Banyak command untuk satu object via `system.multicall`
    pub fn batchcall<S: AsRef<str>>(
        &self,
        target: Target,
        hash: &str,
        commands: &[S],
    ) -> Result<Row, RpcError> {
        let batch = Batchcall::new(target, hash)
            .commands(commands.iter().map(|c| c.as_ref().to_string()));
        let response = self.execute(&batch.to_call())?;
        Ok(batch.remap(response)?)
    }

    /// Teruskan dokumen XML-RPC yang sudah jadi, tidak pernah panic
    pub fn relay(&self, payload: &str) -> RelayReply {
        match self.transport.round_trip(payload.as_bytes()) {
            Ok(body) => match String::from_utf8(body) {
                Ok(xml) => RelayReply::Xml(xml),
                Err(err) => {
                    let err = DecodeError::from(err);
                    warn!(error = %err, "relay reply is not UTF-8");
                    RelayReply::Error(err.to_string())
                }
            },
            Err(err) => {
                warn!(error = %err, "relay failed");
                RelayReply::Error(err.to_string())
            }
        }
    }
}
