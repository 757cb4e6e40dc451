//! XML-RPC Value Codec
//!
//! `RpcValue` <-> fragment `<value>`. Encoder total atas semua variant,
//! decoder dispatch berdasarkan tag name dan gagal secara eksplisit
//! untuk tag yang tidak dikenal.

use std::borrow::Cow;
use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use roxmltree::Node;
use serde::Serialize;

use crate::error::DecodeError;

/// Format compact XML-RPC (`19980717T14:08:55`)
const COMPACT_DATETIME: &str = "%Y%m%dT%H:%M:%S";

/// Nilai XML-RPC
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RpcValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    DateTime(DateTime<Utc>),
    Array(Vec<RpcValue>),
    Struct(BTreeMap<String, RpcValue>),
    Binary(Vec<u8>),
}

impl RpcValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RpcValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, RpcValue>> {
        match self {
            Self::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Encode ke fragment `<value>..</value>`
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        encode_value(self, &mut out);
        out
    }
}

impl From<&str> for RpcValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for RpcValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for RpcValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for RpcValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<i64> for RpcValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for RpcValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<DateTime<Utc>> for RpcValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<Vec<RpcValue>> for RpcValue {
    fn from(v: Vec<RpcValue>) -> Self {
        Self::Array(v)
    }
}

impl From<BTreeMap<String, RpcValue>> for RpcValue {
    fn from(v: BTreeMap<String, RpcValue>) -> Self {
        Self::Struct(v)
    }
}

/// Escape lima karakter reserved XML, plus `\r`
///
/// Parser XML menormalisasi `\r` literal menjadi `\n`, jadi harus ditulis
/// sebagai character reference.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>', '&', '\'', '"', '\r']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

/// Encode value (rekursif) langsung ke output buffer
pub fn encode_value(value: &RpcValue, out: &mut String) {
    out.push_str("<value>");
    match value {
        RpcValue::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape_xml(s));
            out.push_str("</string>");
        }
        RpcValue::Boolean(b) => {
            out.push_str(if *b {
                "<boolean>1</boolean>"
            } else {
                "<boolean>0</boolean>"
            });
        }
        RpcValue::Integer(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        RpcValue::Double(d) => {
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        RpcValue::DateTime(dt) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true));
            out.push_str("</dateTime.iso8601>");
        }
        RpcValue::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        RpcValue::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape_xml(name));
                out.push_str("</name>");
                encode_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        RpcValue::Binary(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
    }
    out.push_str("</value>");
}

/// Decode node XML-RPC ke `RpcValue`
pub fn decode_node(node: Node<'_, '_>) -> Result<RpcValue, DecodeError> {
    let tag = node.tag_name().name();
    match tag {
        "string" => Ok(RpcValue::String(node_text(node).to_string())),
        "boolean" => {
            let text = node_text(node).trim();
            Ok(RpcValue::Boolean(text == "true" || text == "1"))
        }
        "int" | "i4" | "i8" => parse_scalar(node, |t| t.parse::<i64>().ok().map(RpcValue::Integer)),
        "double" => parse_scalar(node, |t| t.parse::<f64>().ok().map(RpcValue::Double)),
        "dateTime.iso8601" => parse_scalar(node, |t| parse_datetime(t).map(RpcValue::DateTime)),
        "base64" => parse_scalar(node, |t| {
            let compact: String = t.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            STANDARD.decode(compact).ok().map(RpcValue::Binary)
        }),
        "array" => match first_element(node) {
            Some(data) if data.tag_name().name() == "data" => decode_node(data),
            Some(other) => Err(DecodeError::UnexpectedShape(format!(
                "<array> expects <data>, found <{}>",
                other.tag_name().name()
            ))),
            None => Ok(RpcValue::Array(Vec::new())),
        },
        "data" => node
            .children()
            .filter(Node::is_element)
            .map(decode_node)
            .collect::<Result<Vec<_>, _>>()
            .map(RpcValue::Array),
        "struct" => {
            let mut members = BTreeMap::new();
            for member in node.children().filter(Node::is_element) {
                let (name, value) = decode_member(member)?;
                // Nama duplikat: yang terakhir menang
                members.insert(name, value);
            }
            Ok(RpcValue::Struct(members))
        }
        "member" => {
            let (name, value) = decode_member(node)?;
            Ok(RpcValue::Struct(BTreeMap::from([(name, value)])))
        }
        "value" => match first_element(node) {
            Some(child) => decode_node(child),
            // Tanpa type tag berarti string
            None => Ok(RpcValue::String(node_text(node).to_string())),
        },
        "methodResponse" | "params" | "param" | "fault" => match first_element(node) {
            Some(child) => decode_node(child),
            None => Err(DecodeError::EmptyElement(tag.to_string())),
        },
        other => Err(DecodeError::UnknownTag(other.to_string())),
    }
}

/// Decode satu `<member>` menjadi pasangan (name, value)
fn decode_member(member: Node<'_, '_>) -> Result<(String, RpcValue), DecodeError> {
    let tag = member.tag_name().name();
    if tag != "member" {
        return Err(DecodeError::UnknownTag(tag.to_string()));
    }

    let mut name = None;
    let mut value = None;
    for child in member.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "name" => name = Some(node_text(child).to_string()),
            "value" => value = Some(decode_node(child)?),
            other => return Err(DecodeError::UnknownTag(other.to_string())),
        }
    }

    let name = name.ok_or(DecodeError::MissingMemberName)?;
    let value = value.ok_or_else(|| DecodeError::EmptyElement("member".to_string()))?;
    Ok((name, value))
}

fn parse_scalar(
    node: Node<'_, '_>,
    parse: impl FnOnce(&str) -> Option<RpcValue>,
) -> Result<RpcValue, DecodeError> {
    let text = node_text(node).trim();
    parse(text).ok_or_else(|| DecodeError::InvalidScalar {
        tag: node.tag_name().name().to_string(),
        text: text.to_string(),
    })
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, COMPACT_DATETIME)
        .ok()
        .map(|naive| naive.and_utc())
}

#[inline]
fn node_text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("")
}

#[inline]
fn first_element<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(Node::is_element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn decode_str(xml: &str) -> Result<RpcValue, DecodeError> {
        let doc = roxmltree::Document::parse(xml)?;
        decode_node(doc.root_element())
    }

    #[test]
    fn test_escape_reserved_characters() {
        let value = RpcValue::from("<a&b>'\"");
        let xml = value.to_xml();
        assert_eq!(
            xml,
            "<value><string>&lt;a&amp;b&gt;&apos;&quot;</string></value>"
        );
        assert_eq!(decode_str(&xml).unwrap(), value);
    }

    #[test]
    fn test_carriage_return_survives() {
        let value = RpcValue::from("line1\r\nline2\rend\ttab");
        let xml = value.to_xml();
        assert!(!xml.contains('\r'));
        assert!(xml.contains("line1&#13;\nline2&#13;end"));
        assert_eq!(decode_str(&xml).unwrap(), value);
    }

    #[test]
    fn test_escape_borrows_plain_text() {
        assert!(matches!(escape_xml("d.name="), Cow::Borrowed(_)));
    }

    #[test]
    fn test_scalar_tags() {
        assert_eq!(RpcValue::from(42).to_xml(), "<value><int>42</int></value>");
        assert_eq!(RpcValue::from(true).to_xml(), "<value><boolean>1</boolean></value>");
        assert_eq!(RpcValue::from(1.5).to_xml(), "<value><double>1.5</double></value>");
        assert_eq!(
            RpcValue::Binary(b"rtorrent".to_vec()).to_xml(),
            "<value><base64>cnRvcnJlbnQ=</base64></value>"
        );
    }

    #[test]
    fn test_datetime_encoding() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap();
        assert_eq!(
            RpcValue::from(dt).to_xml(),
            "<value><dateTime.iso8601>2024-03-09T12:30:00.000Z</dateTime.iso8601></value>"
        );
    }

    #[test]
    fn test_decode_compact_datetime() {
        let value = decode_str("<dateTime.iso8601>19980717T14:08:55</dateTime.iso8601>").unwrap();
        let expected = Utc.with_ymd_and_hms(1998, 7, 17, 14, 8, 55).unwrap();
        assert_eq!(value, RpcValue::DateTime(expected));
    }

    #[test]
    fn test_decode_integers() {
        assert_eq!(decode_str("<i4>7</i4>").unwrap(), RpcValue::Integer(7));
        assert_eq!(
            decode_str("<i8>8589934592</i8>").unwrap(),
            RpcValue::Integer(8_589_934_592)
        );
        assert!(matches!(
            decode_str("<int>seven</int>"),
            Err(DecodeError::InvalidScalar { .. })
        ));
    }

    #[test]
    fn test_decode_boolean() {
        assert_eq!(decode_str("<boolean>1</boolean>").unwrap(), RpcValue::Boolean(true));
        assert_eq!(decode_str("<boolean>true</boolean>").unwrap(), RpcValue::Boolean(true));
        assert_eq!(decode_str("<boolean>0</boolean>").unwrap(), RpcValue::Boolean(false));
    }

    #[test]
    fn test_decode_empty_array() {
        assert_eq!(
            decode_str("<array><data/></array>").unwrap(),
            RpcValue::Array(Vec::new())
        );
    }

    #[test]
    fn test_decode_array_without_data() {
        let err = decode_str("<array><value><int>1</int></value></array>").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedShape(_)), "{err:?}");
    }

    #[test]
    fn test_decode_untyped_value_is_string() {
        assert_eq!(
            decode_str("<value>plain</value>").unwrap(),
            RpcValue::from("plain")
        );
        assert_eq!(decode_str("<value><string/></value>").unwrap(), RpcValue::from(""));
    }

    #[test]
    fn test_decode_struct_last_member_wins() {
        let xml = "<struct>\
            <member><name>state</name><value><int>0</int></value></member>\
            <member><name>state</name><value><int>1</int></value></member>\
            </struct>";
        let value = decode_str(xml).unwrap();
        assert_eq!(value.as_struct().unwrap()["state"], RpcValue::Integer(1));
    }

    #[test]
    fn test_decode_ignores_whitespace_between_elements() {
        let xml = "<array>\n  <data>\n    <value><i4>1</i4></value>\n    <value>two</value>\n  </data>\n</array>";
        assert_eq!(
            decode_str(xml).unwrap(),
            RpcValue::Array(vec![RpcValue::Integer(1), RpcValue::from("two")])
        );
    }

    #[test]
    fn test_decode_unknown_tag() {
        match decode_str("<nil/>") {
            Err(DecodeError::UnknownTag(tag)) => assert_eq!(tag, "nil"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_member_without_name() {
        let xml = "<struct><member><value><int>1</int></value></member></struct>";
        assert!(matches!(decode_str(xml), Err(DecodeError::MissingMemberName)));
    }

    #[test]
    fn test_nested_roundtrip() {
        let value = RpcValue::Array(vec![
            RpcValue::Struct(BTreeMap::from([
                ("name".to_string(), RpcValue::from("ubuntu.iso")),
                ("ratio".to_string(), RpcValue::from(1.25)),
            ])),
            RpcValue::Array(vec![]),
            RpcValue::from(false),
        ]);
        assert_eq!(decode_str(&value.to_xml()).unwrap(), value);
    }
}
