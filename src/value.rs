//! The wire value representation and the bidirectional codec.
//!
//! [`Value`] is the engine's tagged representation of data; [`HostValue`] is
//! what host code works with. [`encode`] classifies a host value by its
//! structure into exactly one wire variant, and [`decode`] is the inverse.
//! Round-tripping is identity for primitives and lists, and identity up to
//! key order for records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::errors::Error;

/// A scalar crossing the engine boundary.
///
/// Time is carried as milliseconds since the Unix epoch on the wire; the
/// host side always sees a [`DateTime<Utc>`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Prim {
    Number(f64),
    String(String),
    Boolean(bool),
    Time(i64),
}

/// The engine's tagged runtime representation of a datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Prim(Prim),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

/// A native host value.
///
/// `Null` exists so that absent host data (JSON null and friends) is
/// representable; it refuses to cross the boundary. `Block` is a callback
/// received from the engine and likewise never encodes back toward it.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    Num(f64),
    Str(String),
    Bool(bool),
    Time(DateTime<Utc>),
    List(Vec<HostValue>),
    Record(BTreeMap<String, HostValue>),
    Block(Block),
}

impl HostValue {
    /// Build a record from `(name, value)` pairs. Later duplicates win.
    pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<HostValue>,
    {
        HostValue::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list from anything convertible to host values.
    pub fn list<V: Into<HostValue>>(items: impl IntoIterator<Item = V>) -> Self {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_num(&self) -> Result<f64, Error> {
        match self {
            HostValue::Num(n) => Ok(*n),
            other => Err(type_mismatch("number", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, Error> {
        match self {
            HostValue::Str(s) => Ok(s),
            other => Err(type_mismatch("string", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self {
            HostValue::Bool(b) => Ok(*b),
            other => Err(type_mismatch("boolean", other)),
        }
    }

    pub fn as_time(&self) -> Result<DateTime<Utc>, Error> {
        match self {
            HostValue::Time(t) => Ok(*t),
            other => Err(type_mismatch("time", other)),
        }
    }

    pub fn as_list(&self) -> Result<&[HostValue], Error> {
        match self {
            HostValue::List(items) => Ok(items),
            other => Err(type_mismatch("list", other)),
        }
    }

    pub fn as_record(&self) -> Result<&BTreeMap<String, HostValue>, Error> {
        match self {
            HostValue::Record(fields) => Ok(fields),
            other => Err(type_mismatch("record", other)),
        }
    }

    pub fn as_block(&self) -> Result<&Block, Error> {
        match self {
            HostValue::Block(block) => Ok(block),
            other => Err(type_mismatch("block", other)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Num(_) => "number",
            HostValue::Str(_) => "string",
            HostValue::Bool(_) => "boolean",
            HostValue::Time(_) => "time",
            HostValue::List(_) => "list",
            HostValue::Record(_) => "record",
            HostValue::Block(_) => "block",
        }
    }
}

fn type_mismatch(wanted: &str, got: &HostValue) -> Error {
    Error::InvalidValue(format!("expected {wanted}, got {}", got.kind()))
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        HostValue::Num(n)
    }
}

impl From<i64> for HostValue {
    fn from(n: i64) -> Self {
        HostValue::Num(n as f64)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        HostValue::Num(n as f64)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Str(s.to_owned())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Str(s)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for HostValue {
    fn from(t: DateTime<Utc>) -> Self {
        HostValue::Time(t)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(items: Vec<HostValue>) -> Self {
        HostValue::List(items)
    }
}

impl From<Block> for HostValue {
    fn from(block: Block) -> Self {
        HostValue::Block(block)
    }
}

/// Convert a native host value into the engine's tagged representation.
///
/// Classification is structural and total over the recognized shapes;
/// anything else fails with [`Error::InvalidValue`]. Absent data is a
/// programming error that must surface immediately, so `Null` is rejected
/// rather than coerced to some default.
pub fn encode(val: &HostValue) -> Result<Value, Error> {
    match val {
        HostValue::Null => Err(Error::InvalidValue(
            "null cannot cross the engine boundary".into(),
        )),
        HostValue::Num(n) => Ok(Value::Prim(Prim::Number(*n))),
        HostValue::Str(s) => Ok(Value::Prim(Prim::String(s.clone()))),
        HostValue::Bool(b) => Ok(Value::Prim(Prim::Boolean(*b))),
        HostValue::Time(t) => Ok(Value::Prim(Prim::Time(t.timestamp_millis()))),
        HostValue::List(items) => {
            let encoded: Vec<Value> = items.iter().map(encode).collect::<Result<_, _>>()?;
            Ok(Value::List(encoded))
        }
        HostValue::Record(fields) => {
            let mut encoded = BTreeMap::new();
            for (name, field) in fields {
                encoded.insert(name.clone(), encode(field)?);
            }
            Ok(Value::Record(encoded))
        }
        HostValue::Block(_) => Err(Error::InvalidValue(
            "a callback cannot be encoded back toward the engine".into(),
        )),
    }
}

/// Convert an engine value back into a native host value.
pub fn decode(val: Value) -> Result<HostValue, Error> {
    Ok(match val {
        Value::Prim(Prim::Number(n)) => HostValue::Num(n),
        Value::Prim(Prim::String(s)) => HostValue::Str(s),
        Value::Prim(Prim::Boolean(b)) => HostValue::Bool(b),
        Value::Prim(Prim::Time(ms)) => HostValue::Time(
            DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| Error::InvalidValue(format!("timestamp out of range: {ms}")))?,
        ),
        Value::List(items) => {
            HostValue::List(items.into_iter().map(decode).collect::<Result<_, _>>()?)
        }
        Value::Record(fields) => {
            let mut decoded = BTreeMap::new();
            for (name, field) in fields {
                decoded.insert(name, decode(field)?);
            }
            HostValue::Record(decoded)
        }
    })
}
