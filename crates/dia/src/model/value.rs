//! Scalar value types for Dia.
//!
//! Scalars are plain data: they carry no identity and are copied into
//! every position that holds them. Composites live in the [`Graph`]
//! arena and are referred to by [`NodeId`].
//!
//! [`Graph`]: crate::model::Graph

use std::fmt;

use num_bigint::BigInt;

use crate::model::NodeId;

/// The closed set of value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Kind {
    Boolean = 1,
    Integer = 2,
    Decimal = 3,
    Timestamp = 4,
    Duration = 5,
    String = 6,
    Symbol = 7,
    Blob = 8,
    Sequence = 9,
    Record = 10,
}

impl Kind {
    /// All kinds, in tag order.
    pub const ALL: [Kind; 10] = [
        Kind::Boolean,
        Kind::Integer,
        Kind::Decimal,
        Kind::Timestamp,
        Kind::Duration,
        Kind::String,
        Kind::Symbol,
        Kind::Blob,
        Kind::Sequence,
        Kind::Record,
    ];

    /// Creates a Kind from its binary tag.
    pub fn from_tag(tag: u8) -> Option<Kind> {
        match tag {
            1 => Some(Kind::Boolean),
            2 => Some(Kind::Integer),
            3 => Some(Kind::Decimal),
            4 => Some(Kind::Timestamp),
            5 => Some(Kind::Duration),
            6 => Some(Kind::String),
            7 => Some(Kind::Symbol),
            8 => Some(Kind::Blob),
            9 => Some(Kind::Sequence),
            10 => Some(Kind::Record),
            _ => None,
        }
    }

    /// Returns the binary tag of this kind.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns true for kinds that own children and have identity.
    pub fn is_composite(self) -> bool {
        matches!(self, Kind::Sequence | Kind::Record)
    }

    /// The name used in reference tokens and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Boolean => "Bool",
            Kind::Integer => "Int",
            Kind::Decimal => "Decimal",
            Kind::Timestamp => "Timestamp",
            Kind::Duration => "Duration",
            Kind::String => "String",
            Kind::Symbol => "Symbol",
            Kind::Blob => "Blob",
            Kind::Sequence => "Sequence",
            Kind::Record => "Record",
        }
    }

    /// Looks a kind up by its reference-token name.
    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// The lowercase keyword used after `null.` in Axon text.
    pub fn keyword(self) -> &'static str {
        match self {
            Kind::Boolean => "bool",
            Kind::Integer => "int",
            Kind::Decimal => "decimal",
            Kind::Timestamp => "timestamp",
            Kind::Duration => "duration",
            Kind::String => "string",
            Kind::Symbol => "symbol",
            Kind::Blob => "blob",
            Kind::Sequence => "sequence",
            Kind::Record => "record",
        }
    }

    /// Looks a kind up by its `null.` keyword.
    pub fn from_keyword(keyword: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.keyword() == keyword)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arbitrary-precision decimal: value = mantissa * 10^exponent.
///
/// Decimals are not normalized; `50E-1` and `5E0` are different values
/// and both survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub mantissa: BigInt,
    pub exponent: i32,
}

impl Decimal {
    pub fn new(mantissa: impl Into<BigInt>, exponent: i32) -> Self {
        Self {
            mantissa: mantissa.into(),
            exponent,
        }
    }
}

/// An instant with the UTC offset it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Microseconds since the Unix epoch, in UTC.
    pub epoch_us: i64,
    /// Signed UTC offset in minutes (e.g., +330 for +05:30).
    pub offset_min: i16,
}

impl Timestamp {
    pub fn new(epoch_us: i64, offset_min: i16) -> Self {
        Self {
            epoch_us,
            offset_min,
        }
    }
}

/// A signed span of time with nanosecond precision.
///
/// Stored normalized: `nanos` is always below one second and carries the
/// positive fraction, so -1.25s is `{ seconds: -2, nanos: 750_000_000 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Duration {
    pub seconds: i64,
    pub nanos: u32,
}

impl Duration {
    pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Builds a duration from a total count of nanoseconds.
    pub fn from_total_nanos(total: i128) -> Option<Self> {
        let per = Self::NANOS_PER_SECOND as i128;
        let seconds = i64::try_from(total.div_euclid(per)).ok()?;
        let nanos = total.rem_euclid(per) as u32;
        Some(Self { seconds, nanos })
    }

    /// Returns the total number of nanoseconds.
    pub fn total_nanos(self) -> i128 {
        self.seconds as i128 * Self::NANOS_PER_SECOND as i128 + self.nanos as i128
    }
}

/// The payload of a scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The distinguished null state of a kind (`null.int`, `null.record`, ...).
    Null(Kind),
    Bool(bool),
    Integer(BigInt),
    Decimal(Decimal),
    Timestamp(Timestamp),
    Duration(Duration),
    String(String),
    Symbol(String),
    Blob(Vec<u8>),
}

impl Payload {
    /// Returns the kind of this payload.
    pub fn kind(&self) -> Kind {
        match self {
            Payload::Null(kind) => *kind,
            Payload::Bool(_) => Kind::Boolean,
            Payload::Integer(_) => Kind::Integer,
            Payload::Decimal(_) => Kind::Decimal,
            Payload::Timestamp(_) => Kind::Timestamp,
            Payload::Duration(_) => Kind::Duration,
            Payload::String(_) => Kind::String,
            Payload::Symbol(_) => Kind::Symbol,
            Payload::Blob(_) => Kind::Blob,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null(_))
    }
}

/// A non-composite value with its annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    /// Insertion-ordered annotations; duplicates are allowed.
    pub annotations: Vec<String>,
    pub payload: Payload,
}

impl Scalar {
    pub fn new(payload: Payload) -> Self {
        Self {
            annotations: Vec::new(),
            payload,
        }
    }

    /// A null of the given kind without annotations.
    pub fn null(kind: Kind) -> Self {
        Self::new(Payload::Null(kind))
    }

    /// Appends an annotation.
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }
}

/// A value slot: either a scalar held inline or a composite node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Composite(NodeId),
}

impl Value {
    /// A null of the given kind.
    pub fn null(kind: Kind) -> Self {
        Value::Scalar(Scalar::null(kind))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::Scalar(Scalar::new(Payload::String(s.into())))
    }

    pub fn symbol(s: impl Into<String>) -> Self {
        Value::Scalar(Scalar::new(Payload::Symbol(s.into())))
    }

    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Scalar(Scalar::new(Payload::Blob(bytes.into())))
    }

    pub fn decimal(mantissa: impl Into<BigInt>, exponent: i32) -> Self {
        Value::Scalar(Scalar::new(Payload::Decimal(Decimal::new(mantissa, exponent))))
    }

    pub fn timestamp(epoch_us: i64, offset_min: i16) -> Self {
        Value::Scalar(Scalar::new(Payload::Timestamp(Timestamp::new(epoch_us, offset_min))))
    }

    pub fn duration(seconds: i64, nanos: u32) -> Self {
        Value::Scalar(Scalar::new(Payload::Duration(Duration::new(seconds, nanos))))
    }

    /// Returns the node id if this is a composite.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Composite(id) => Some(*id),
            Value::Scalar(_) => None,
        }
    }

    /// Returns the scalar if this is not a composite.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::Composite(_) => None,
        }
    }

    /// Returns the scalar payload if this is not a composite.
    pub fn payload(&self) -> Option<&Payload> {
        self.as_scalar().map(|s| &s.payload)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<Payload> for Value {
    fn from(p: Payload) -> Self {
        Value::Scalar(Scalar::new(p))
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Composite(id)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Payload::Bool(b).into()
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Payload::Integer(BigInt::from(n)).into()
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Payload::Integer(BigInt::from(n)).into()
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Payload::Integer(BigInt::from(n)).into()
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Payload::Integer(n).into()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Payload::Timestamp(t).into()
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Payload::Duration(d).into()
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Payload::Decimal(d).into()
    }
}
