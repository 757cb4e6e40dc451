//! Multicall / Batchcall Builder
//!
//! Dua strategi agregasi di atas method call biasa:
//! - Multicall: satu method untuk banyak object (`d.multicall2`, `t.multicall`, ...)
//! - Batchcall: banyak method untuk satu object via `system.multicall`
//!
//! Keduanya me-remap hasil posisional ke field bernama (camelCase).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::call::MethodCall;
use super::value::RpcValue;
use crate::error::DecodeError;

/// Satu baris hasil: camelCase command -> value
pub type Row = BTreeMap<String, RpcValue>;

/// Namespace object di daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Download,
    Tracker,
    File,
    Peer,
}

impl Target {
    /// Prefix command, misal `d.`
    #[inline]
    pub fn prefix(&self) -> &'static str {
        match self {
            Target::Download => "d.",
            Target::Tracker => "t.",
            Target::File => "f.",
            Target::Peer => "p.",
        }
    }

    /// Nama method multicall untuk namespace ini
    pub fn multicall_method(&self) -> String {
        match self {
            Target::Download => "d.multicall2".to_string(),
            other => format!("{}multicall", other.prefix()),
        }
    }

    /// Tambahkan prefix namespace jika belum ada
    fn qualify(&self, name: &str) -> String {
        if name.starts_with(self.prefix()) {
            name.to_string()
        } else {
            format!("{}{}", self.prefix(), name)
        }
    }

    /// Key hasil untuk command; `up.rate` dan `d.up.rate=` sama-sama `upRate`
    fn result_key(&self, command: &str) -> String {
        to_camel_case(&self.qualify(command))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end_matches('.') {
            "d" | "download" => Ok(Target::Download),
            "t" | "tracker" => Ok(Target::Tracker),
            "f" | "file" => Ok(Target::File),
            "p" | "peer" => Ok(Target::Peer),
            other => Err(format!("unknown target namespace {other:?}")),
        }
    }
}

/// Command string -> key camelCase
///
/// Segment namespace pertama dibuang: `d.complete=` -> `complete`,
/// `t.get_url=` -> `getUrl`.
pub fn to_camel_case(command: &str) -> String {
    let body = match command.split_once('.') {
        Some((_, rest)) => rest,
        None => command,
    };

    let mut out = String::with_capacity(body.len());
    let words = body
        .split(|c: char| matches!(c, '.' | ',' | '_' | '=') || c.is_whitespace())
        .filter(|w| !w.is_empty());

    for (i, word) in words.enumerate() {
        if i == 0 {
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Normalisasi command multicall: tanpa `=` berarti "tanpa argumen"
pub fn normalize_command(target: Target, command: &str) -> String {
    if command.contains('=') {
        command.to_string()
    } else {
        format!("{}=", target.qualify(command))
    }
}

/// Satu method untuk semua object yang lolos filter
#[derive(Debug, Clone)]
pub struct Multicall {
    target: Target,
    hash: String,
    filter: String,
    commands: Vec<String>,
}

impl Multicall {
    pub fn new(target: Target, hash: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            target,
            hash: hash.into(),
            filter: filter.into(),
            commands: Vec::new(),
        }
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    /// Build method call: `(hash, filter, ...commands)`
    pub fn to_call(&self) -> MethodCall {
        let mut params = Vec::with_capacity(self.commands.len() + 2);
        params.push(RpcValue::from(self.hash.as_str()));
        params.push(RpcValue::from(self.filter.as_str()));
        params.extend(
            self.commands
                .iter()
                .map(|c| RpcValue::String(normalize_command(self.target, c))),
        );
        MethodCall::new(self.target.multicall_method(), params)
    }

    /// Zip setiap baris response dengan daftar command
    pub fn remap(&self, response: RpcValue) -> Result<Vec<Row>, DecodeError> {
        let RpcValue::Array(rows) = response else {
            return Err(DecodeError::UnexpectedShape(
                "multicall response is not an array".to_string(),
            ));
        };

        rows.into_iter()
            .map(|row| match row {
                RpcValue::Array(values) => Ok(self
                    .commands
                    .iter()
                    .map(|c| self.target.result_key(c))
                    .zip(values)
                    .collect::<Row>()),
                _ => Err(DecodeError::UnexpectedShape(
                    "multicall row is not an array".to_string(),
                )),
            })
            .collect()
    }
}

/// Banyak method berbeda untuk satu object, via `system.multicall`
#[derive(Debug, Clone)]
pub struct Batchcall {
    target: Target,
    hash: String,
    commands: Vec<String>,
}

impl Batchcall {
    pub fn new(target: Target, hash: impl Into<String>) -> Self {
        Self {
            target,
            hash: hash.into(),
            commands: Vec::new(),
        }
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    /// Satu entry `{methodName, params}` per command
    ///
    /// `d.custom.set=foo,bar` menjadi method `d.custom.set` dengan
    /// params `[hash, "foo", "bar"]`.
    fn entry(&self, command: &str) -> RpcValue {
        let (name, args) = command.split_once('=').unwrap_or((command, ""));

        let mut params = vec![RpcValue::from(self.hash.as_str())];
        if !args.is_empty() {
            params.extend(args.split(',').map(RpcValue::from));
        }

        RpcValue::Struct(BTreeMap::from([
            (
                "methodName".to_string(),
                RpcValue::String(self.target.qualify(name)),
            ),
            ("params".to_string(), RpcValue::Array(params)),
        ]))
    }

    pub fn to_call(&self) -> MethodCall {
        let entries = self.commands.iter().map(|c| self.entry(c)).collect();
        MethodCall::new("system.multicall", vec![RpcValue::Array(entries)])
    }

    /// Zip 1:1 dengan command; hasil satu elemen di-unwrap
    pub fn remap(&self, response: RpcValue) -> Result<Row, DecodeError> {
        let RpcValue::Array(results) = response else {
            return Err(DecodeError::UnexpectedShape(
                "system.multicall response is not an array".to_string(),
            ));
        };

        Ok(self
            .commands
            .iter()
            .zip(results)
            .map(|(command, result)| {
                let value = match result {
                    RpcValue::Array(mut values) if values.len() == 1 => values.remove(0),
                    // Fault per entry (struct) dibiarkan apa adanya
                    other => other,
                };
                (self.target.result_key(command), value)
            })
            .collect())
    }
}
