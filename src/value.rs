//! The closed set of value kinds that temp data can carry.

use std::collections::BTreeMap;

use serde_json::Value;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Ticks (100 ns units since 0001-01-01T00:00:00) at the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Ticks at 9999-12-31T23:59:59.9999999.
const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

const NANOS_PER_TICK: i128 = 100;

/// The mapping a backend loads and saves in one piece.
pub type TempMap = BTreeMap<String, TempValue>;

/// A single temp data value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TempValue {
    String(String),
    Int32(i32),
    Int64(i64),
    Bool(bool),
    DateTime(Timestamp),
    Guid(Uuid),
    Enum(EnumValue),
    StringList(Vec<String>),
    /// An empty map is dropped by the codec and reads back as absent.
    StringMap(BTreeMap<String, String>),
}

impl TempValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TempValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            TempValue::Int32(value) => Some(*value),
            _ => None,
        }
    }

    /// Widens 32-bit values as well.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TempValue::Int32(value) => Some(i64::from(*value)),
            TempValue::Int64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TempValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            TempValue::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            TempValue::Guid(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            TempValue::Enum(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            TempValue::StringList(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_string_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            TempValue::StringMap(value) => Some(value),
            _ => None,
        }
    }
}

impl From<String> for TempValue {
    fn from(value: String) -> Self {
        TempValue::String(value)
    }
}

impl From<&str> for TempValue {
    fn from(value: &str) -> Self {
        TempValue::String(value.to_owned())
    }
}

impl From<i32> for TempValue {
    fn from(value: i32) -> Self {
        TempValue::Int32(value)
    }
}

impl From<i64> for TempValue {
    fn from(value: i64) -> Self {
        TempValue::Int64(value)
    }
}

impl From<bool> for TempValue {
    fn from(value: bool) -> Self {
        TempValue::Bool(value)
    }
}

impl From<Timestamp> for TempValue {
    fn from(value: Timestamp) -> Self {
        TempValue::DateTime(value)
    }
}

impl From<Uuid> for TempValue {
    fn from(value: Uuid) -> Self {
        TempValue::Guid(value)
    }
}

impl From<EnumValue> for TempValue {
    fn from(value: EnumValue) -> Self {
        TempValue::Enum(value)
    }
}

impl From<Vec<String>> for TempValue {
    fn from(value: Vec<String>) -> Self {
        TempValue::StringList(value)
    }
}

impl From<BTreeMap<String, String>> for TempValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        TempValue::StringMap(value)
    }
}

/// Converts loosely typed JSON into a temp value, rejecting anything outside the supported kinds.
impl TryFrom<Value> for TempValue {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(value) => Ok(TempValue::String(value)),
            Value::Bool(value) => Ok(TempValue::Bool(value)),
            Value::Number(number) => match number.as_i64() {
                Some(n) => Ok(i32::try_from(n).map_or(TempValue::Int64(n), TempValue::Int32)),
                None => Err(Error::UnsupportedType(format!("number {number}"))),
            },
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(item) => Ok(item),
                    other => Err(unsupported_json("array element", &other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(TempValue::StringList),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, item)| match item {
                    Value::String(item) => Ok((key, item)),
                    other => Err(unsupported_json("object value", &other)),
                })
                .collect::<Result<BTreeMap<_, _>>>()
                .map(TempValue::StringMap),
            Value::Null => Err(Error::UnsupportedType("null".into())),
        }
    }
}

fn unsupported_json(position: &str, value: &Value) -> Error {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Error::UnsupportedType(format!("{kind} as {position}"))
}

/// How a [`Timestamp`] relates to a time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DateTimeKind {
    #[default]
    Unspecified = 0,
    Utc = 1,
    Local = 2,
}

impl DateTimeKind {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DateTimeKind::Unspecified),
            1 => Some(DateTimeKind::Utc),
            2 => Some(DateTimeKind::Local),
            _ => None,
        }
    }
}

/// A calendar timestamp with 100 ns precision and a kind flag.
///
/// Ticks count 100 ns intervals since 0001-01-01T00:00:00 and are always in
/// `0..=3_155_378_975_999_999_999` (the end of year 9999).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    ticks: i64,
    kind: DateTimeKind,
}

impl Timestamp {
    /// Returns `None` if `ticks` is outside the representable range.
    pub fn new(ticks: i64, kind: DateTimeKind) -> Option<Self> {
        (0..=MAX_TICKS)
            .contains(&ticks)
            .then_some(Self { ticks, kind })
    }

    /// Sub-tick precision is truncated.
    pub fn from_datetime(datetime: PrimitiveDateTime, kind: DateTimeKind) -> Option<Self> {
        let nanos = datetime.assume_utc().unix_timestamp_nanos();
        let ticks = nanos.div_euclid(NANOS_PER_TICK) + i128::from(UNIX_EPOCH_TICKS);
        Self::new(i64::try_from(ticks).ok()?, kind)
    }

    /// Converts to UTC first; the result has [`DateTimeKind::Utc`].
    pub fn from_utc(datetime: OffsetDateTime) -> Option<Self> {
        let utc = datetime.to_offset(UtcOffset::UTC);
        Self::from_datetime(PrimitiveDateTime::new(utc.date(), utc.time()), DateTimeKind::Utc)
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn kind(&self) -> DateTimeKind {
        self.kind
    }

    pub fn to_datetime(&self) -> Option<PrimitiveDateTime> {
        let nanos = i128::from(self.ticks - UNIX_EPOCH_TICKS) * NANOS_PER_TICK;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        Some(PrimitiveDateTime::new(datetime.date(), datetime.time()))
    }

    /// Interprets the wall-clock value as UTC regardless of kind.
    pub fn to_utc(&self) -> Option<OffsetDateTime> {
        self.to_datetime().map(PrimitiveDateTime::assume_utc)
    }
}

/// An enum that can travel through temp data as a discriminant plus its type name.
pub trait TempEnum: Sized {
    /// Fully qualified name used to match the value on the receiving side.
    const TYPE_NAME: &'static str;

    fn discriminant(&self) -> i32;

    fn from_discriminant(discriminant: i32) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    type_name: String,
    discriminant: i32,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, discriminant: i32) -> Self {
        Self {
            type_name: type_name.into(),
            discriminant,
        }
    }

    pub fn of<E: TempEnum>(value: &E) -> Self {
        Self::new(E::TYPE_NAME, value.discriminant())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn discriminant(&self) -> i32 {
        self.discriminant
    }

    /// Re-boxes the value as `E`, or `None` if it was produced by a different enum type.
    pub fn to_enum<E: TempEnum>(&self) -> Option<E> {
        if self.type_name != E::TYPE_NAME {
            return None;
        }
        E::from_discriminant(self.discriminant)
    }
}

impl<E: TempEnum> From<&E> for EnumValue {
    fn from(value: &E) -> Self {
        EnumValue::of(value)
    }
}
