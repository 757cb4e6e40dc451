//! Method Call/Response Framer
//!
//! Membungkus value codec menjadi dokumen `<methodCall>` lengkap,
//! dan membuka `<methodResponse>` menjadi result atau fault.

use roxmltree::{Document, Node};

use super::value::{decode_node, encode_value, escape_xml, RpcValue};
use crate::error::DecodeError;

const XML_PROLOG: &str = "<?xml version=\"1.0\"?>";

/// Satu panggilan XML-RPC
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method_name: String,
    pub params: Vec<RpcValue>,
}

impl MethodCall {
    pub fn new(method_name: impl Into<String>, params: Vec<RpcValue>) -> Self {
        Self {
            method_name: method_name.into(),
            params,
        }
    }

    /// Serialize ke dokumen XML-RPC
    pub fn to_xml(&self) -> String {
        build_call(&self.method_name, &self.params)
    }

    /// Parse dokumen `<methodCall>` kembali ke name + params
    pub fn parse(document: &str) -> Result<Self, DecodeError> {
        let doc = Document::parse(document)?;
        let root = doc.root_element();
        let root_tag = root.tag_name().name();
        if root_tag != "methodCall" {
            return Err(DecodeError::NotAMethodCall(root_tag.to_string()));
        }

        let mut method_name = None;
        let mut params = Vec::new();
        for child in root.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "methodName" => method_name = Some(child.text().unwrap_or("").trim().to_string()),
                "params" => {
                    for param in child.children().filter(Node::is_element) {
                        params.push(decode_node(param)?);
                    }
                }
                other => return Err(DecodeError::UnknownTag(other.to_string())),
            }
        }

        let method_name =
            method_name.ok_or_else(|| DecodeError::EmptyElement("methodCall".to_string()))?;
        Ok(Self {
            method_name,
            params,
        })
    }
}

/// Fault XML-RPC (`faultCode` / `faultString`)
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub code: i64,
    pub message: String,
}

impl Fault {
    fn from_value(value: &RpcValue) -> Self {
        let members = value.as_struct();
        let code = members
            .and_then(|m| m.get("faultCode"))
            .and_then(RpcValue::as_i64)
            .unwrap_or(0);
        let message = members
            .and_then(|m| m.get("faultString"))
            .and_then(RpcValue::as_str)
            .unwrap_or("")
            .to_string();
        Self { code, message }
    }
}

/// Hasil decode `<methodResponse>`
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(RpcValue),
    Fault(Fault),
}

/// Build dokumen `<methodCall>`
///
/// Method name di-escape, walaupun nama command daemon biasanya
/// hanya berisi karakter aman.
pub fn build_call(method_name: &str, params: &[RpcValue]) -> String {
    let mut out = String::with_capacity(128 + params.len() * 64);
    out.push_str(XML_PROLOG);
    out.push_str("<methodCall><methodName>");
    out.push_str(&escape_xml(method_name));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Decode root dokumen apa adanya (fault ikut transparan)
pub fn decode_document(document: &str) -> Result<RpcValue, DecodeError> {
    let doc = Document::parse(document)?;
    decode_node(doc.root_element())
}

/// Decode `<methodResponse>`, membedakan payload fault dari result biasa
pub fn parse_response(document: &str) -> Result<MethodResponse, DecodeError> {
    let doc = Document::parse(document)?;
    let root = doc.root_element();

    let is_fault = match root.tag_name().name() {
        "fault" => true,
        "methodResponse" => root
            .children()
            .find(Node::is_element)
            .is_some_and(|child| child.tag_name().name() == "fault"),
        _ => false,
    };

    let value = decode_node(root)?;
    if is_fault {
        Ok(MethodResponse::Fault(Fault::from_value(&value)))
    } else {
        Ok(MethodResponse::Success(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_METHODS_RESPONSE: &str = "<methodResponse><params><param><value><array><data>\
        <value><string>d.multicall2</string></value>\
        </data></array></value></param></params></methodResponse>";

    #[test]
    fn test_build_call_layout() {
        let xml = build_call("d.name", &[RpcValue::from("ABCDEF")]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\"?><methodCall><methodName>d.name</methodName><params>\
             <param><value><string>ABCDEF</string></value></param></params></methodCall>"
        );
    }

    #[test]
    fn test_build_call_without_params() {
        let xml = build_call("system.listMethods", &[]);
        assert!(xml.ends_with("<methodName>system.listMethods</methodName><params></params></methodCall>"));
    }

    #[test]
    fn test_method_name_is_escaped() {
        let xml = build_call("a<b", &[]);
        assert!(xml.contains("<methodName>a&lt;b</methodName>"));
        assert_eq!(MethodCall::parse(&xml).unwrap().method_name, "a<b");
    }

    #[test]
    fn test_parse_list_methods() {
        let response = parse_response(LIST_METHODS_RESPONSE).unwrap();
        assert_eq!(
            response,
            MethodResponse::Success(RpcValue::Array(vec![RpcValue::from("d.multicall2")]))
        );
    }

    #[test]
    fn test_parse_fault() {
        let xml = "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><i4>-506</i4></value></member>\
            <member><name>faultString</name><value><string>Method 'x' not defined</string></value></member>\
            </struct></value></fault></methodResponse>";

        match parse_response(xml).unwrap() {
            MethodResponse::Fault(fault) => {
                assert_eq!(fault.code, -506);
                assert_eq!(fault.message, "Method 'x' not defined");
            }
            other => panic!("expected fault, got {other:?}"),
        }

        // decode_document tetap bisa membaca struct fault
        let raw = decode_document(xml).unwrap();
        assert!(raw.as_struct().unwrap().contains_key("faultString"));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("not xml"), Err(DecodeError::Xml(_))));
        assert!(matches!(
            parse_response("<methodResponse><params/></methodResponse>"),
            Err(DecodeError::EmptyElement(_))
        ));
    }

    #[test]
    fn test_method_call_parse_roundtrip() {
        let call = MethodCall::new(
            "d.multicall2",
            vec![RpcValue::from(""), RpcValue::from("main"), RpcValue::from("d.hash=")],
        );
        assert_eq!(MethodCall::parse(&call.to_xml()).unwrap(), call);
    }

    #[test]
    fn test_method_call_parse_rejects_response() {
        assert!(matches!(
            MethodCall::parse(LIST_METHODS_RESPONSE),
            Err(DecodeError::NotAMethodCall(_))
        ));
    }
}
