//! Value model: SQL values, value tags and typed arguments

use crate::error::{DatabaseError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value travelling between application code and a driver.
///
/// Values read from a result row and values bound into an expression share
/// this type. Temporal values are naive: drivers render and read them in the
/// session time zone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
	#[default]
	Null,
	Int(i64),
	Float(f64),
	Text(String),
	Bytes(Vec<u8>),
	Date(NaiveDate),
	Time(NaiveTime),
	DateTime(NaiveDateTime),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(s) => Some(s),
			_ => None,
		}
	}

	/// Lenient integer cast.
	///
	/// Mirrors the casting rules of loosely typed SQL clients: `NULL` is `0`,
	/// floats are truncated, strings contribute their leading numeric prefix
	/// (`"12abc"` is `12`, `"abc"` is `0`) and temporal values become
	/// seconds (since the epoch for dates and datetimes, since midnight for
	/// times).
	pub fn to_int(&self) -> i64 {
		match self {
			Value::Null => 0,
			Value::Int(i) => *i,
			Value::Float(f) => float_to_int(*f),
			Value::Text(s) => parse_int_prefix(s),
			Value::Bytes(b) => parse_int_prefix(&String::from_utf8_lossy(b)),
			Value::Date(d) => d.and_time(NaiveTime::MIN).and_utc().timestamp(),
			Value::Time(t) => i64::from(t.num_seconds_from_midnight()),
			Value::DateTime(dt) => dt.and_utc().timestamp(),
		}
	}

	/// Lenient float cast, following the same rules as [`Value::to_int`].
	pub fn to_float(&self) -> f64 {
		match self {
			Value::Null => 0.0,
			Value::Int(i) => *i as f64,
			Value::Float(f) => *f,
			Value::Text(s) => parse_float_prefix(s),
			Value::Bytes(b) => parse_float_prefix(&String::from_utf8_lossy(b)),
			other => other.to_int() as f64,
		}
	}

	/// The value as a datetime, if it is temporal.
	///
	/// Dates are taken at midnight and times on the Unix epoch day.
	pub fn to_datetime(&self) -> Option<NaiveDateTime> {
		match self {
			Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
			Value::Time(t) => Some(NaiveDate::default().and_time(*t)),
			Value::DateTime(dt) => Some(*dt),
			_ => None,
		}
	}

	/// Convert to a JSON value for serde-based row hydration.
	///
	/// Temporal values use the string layouts chrono's serde support reads
	/// back, and bytes become an array of numbers.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Null => serde_json::Value::Null,
			Value::Int(i) => serde_json::Value::from(*i),
			Value::Float(f) => serde_json::Number::from_f64(*f)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::Text(s) => serde_json::Value::String(s.clone()),
			Value::Bytes(b) => serde_json::Value::from(b.clone()),
			Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
			Value::Time(t) => serde_json::Value::String(t.format("%H:%M:%S%.f").to_string()),
			Value::DateTime(dt) => {
				serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
			}
		}
	}
}

/// String form of a value, as used for result-pair keys.
///
/// `NULL` displays as an empty string.
impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => Ok(()),
			Value::Int(i) => write!(f, "{}", i),
			Value::Float(v) => write!(f, "{}", v),
			Value::Text(s) => f.write_str(s),
			Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
			Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
			Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
			Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
		}
	}
}

fn float_to_int(f: f64) -> i64 {
	if f.is_finite() { f.trunc() as i64 } else { 0 }
}

/// Longest prefix of `s` (after leading whitespace) that reads as a number.
fn numeric_prefix(s: &str) -> &str {
	let s = s.trim_start();
	let bytes = s.as_bytes();
	let mut end = 0;
	if matches!(bytes.first(), Some(b'+' | b'-')) {
		end = 1;
	}
	let int_start = end;
	while end < bytes.len() && bytes[end].is_ascii_digit() {
		end += 1;
	}
	let mut digits = end - int_start;
	if end < bytes.len() && bytes[end] == b'.' {
		let frac_start = end + 1;
		let mut frac_end = frac_start;
		while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
			frac_end += 1;
		}
		if digits > 0 || frac_end > frac_start {
			digits += frac_end - frac_start;
			end = frac_end;
		}
	}
	if digits == 0 {
		return "";
	}
	if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
		let mut exp_end = end + 1;
		if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
			exp_end += 1;
		}
		let exp_digits_start = exp_end;
		while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
			exp_end += 1;
		}
		if exp_end > exp_digits_start {
			end = exp_end;
		}
	}
	&s[..end]
}

fn parse_int_prefix(s: &str) -> i64 {
	let prefix = numeric_prefix(s);
	prefix
		.parse::<i64>()
		.unwrap_or_else(|_| float_to_int(prefix.parse::<f64>().unwrap_or(0.0)))
}

fn parse_float_prefix(s: &str) -> f64 {
	numeric_prefix(s).parse::<f64>().unwrap_or(0.0)
}

macro_rules! impl_value_from {
	($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
		$(
			impl From<$ty> for Value {
				fn from($v: $ty) -> Self {
					$body
				}
			}

			impl From<$ty> for Arg {
				fn from(v: $ty) -> Self {
					Arg::untagged(Value::from(v))
				}
			}
		)*
	};
}

impl_value_from! {
	i64 => |v| Value::Int(v),
	i32 => |v| Value::Int(i64::from(v)),
	i16 => |v| Value::Int(i64::from(v)),
	u32 => |v| Value::Int(i64::from(v)),
	u64 => |v| Value::Int(i64::try_from(v).unwrap_or(i64::MAX)),
	usize => |v| Value::Int(i64::try_from(v).unwrap_or(i64::MAX)),
	bool => |v| Value::Int(i64::from(v)),
	f64 => |v| Value::Float(v),
	f32 => |v| Value::Float(f64::from(v)),
	&str => |v| Value::Text(v.to_string()),
	String => |v| Value::Text(v),
	&String => |v| Value::Text(v.clone()),
	Vec<u8> => |v| Value::Bytes(v),
	&[u8] => |v| Value::Bytes(v.to_vec()),
	NaiveDate => |v| Value::Date(v),
	NaiveTime => |v| Value::Time(v),
	NaiveDateTime => |v| Value::DateTime(v),
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or(Value::Null)
	}
}

macro_rules! impl_try_from_value {
	($($ty:ty => $pat:pat => $out:expr),* $(,)?) => {
		$(
			impl TryFrom<Value> for $ty {
				type Error = DatabaseError;

				fn try_from(value: Value) -> Result<Self> {
					match value {
						$pat => Ok($out),
						other => Err(DatabaseError::TypeMismatch(format!(
							"Cannot convert {:?} to {}",
							other,
							stringify!($ty)
						))),
					}
				}
			}
		)*
	};
}

impl_try_from_value! {
	i64 => Value::Int(i) => i,
	f64 => Value::Float(f) => f,
	String => Value::Text(s) => s,
	Vec<u8> => Value::Bytes(b) => b,
	NaiveDate => Value::Date(d) => d,
	NaiveTime => Value::Time(t) => t,
	NaiveDateTime => Value::DateTime(dt) => dt,
}

/// Declared SQL kind of a value, selecting its escaping strategy.
///
/// Each tag has a stable single-character code shared by every driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueTag {
	Blob,
	Float,
	Int,
	Text,
	/// Column identifier
	Field,
	/// Table identifier
	Table,
	Date,
	Time,
	DateTime,
	/// Integer seconds since the Unix epoch, converted by the engine
	UnixTime,
}

impl ValueTag {
	pub const ALL: [ValueTag; 10] = [
		ValueTag::Blob,
		ValueTag::Float,
		ValueTag::Int,
		ValueTag::Text,
		ValueTag::Field,
		ValueTag::Table,
		ValueTag::Date,
		ValueTag::Time,
		ValueTag::DateTime,
		ValueTag::UnixTime,
	];

	pub const fn code(self) -> char {
		match self {
			ValueTag::Blob => 'l',
			ValueTag::Float => 'f',
			ValueTag::Int => 'n',
			ValueTag::Text => 's',
			ValueTag::Field => 'c',
			ValueTag::Table => 'i',
			ValueTag::Date => 'd',
			ValueTag::Time => 't',
			ValueTag::DateTime => 'x',
			ValueTag::UnixTime => 'u',
		}
	}

	/// Tag implied by a value's runtime kind, `None` for `NULL`.
	pub fn infer(value: &Value) -> Option<ValueTag> {
		match value {
			Value::Null => None,
			Value::Int(_) => Some(ValueTag::Int),
			Value::Float(_) => Some(ValueTag::Float),
			Value::Text(_) => Some(ValueTag::Text),
			Value::Bytes(_) => Some(ValueTag::Blob),
			Value::Date(_) => Some(ValueTag::Date),
			Value::Time(_) => Some(ValueTag::Time),
			Value::DateTime(_) => Some(ValueTag::DateTime),
		}
	}

	pub fn is_identifier(self) -> bool {
		matches!(self, ValueTag::Field | ValueTag::Table)
	}

	pub fn is_temporal(self) -> bool {
		matches!(self, ValueTag::Date | ValueTag::Time | ValueTag::DateTime)
	}
}

impl TryFrom<char> for ValueTag {
	type Error = DatabaseError;

	fn try_from(code: char) -> Result<Self> {
		ValueTag::ALL
			.into_iter()
			.find(|tag| tag.code() == code)
			.ok_or_else(|| DatabaseError::Usage(format!("Unknown value tag '{}'", code)))
	}
}

impl fmt::Display for ValueTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.code())
	}
}

/// A value bound into an expression, optionally with a declared tag.
///
/// Without a tag the driver infers one from the value's runtime kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
	pub value: Value,
	pub tag: Option<ValueTag>,
}

impl Arg {
	pub fn untagged(value: impl Into<Value>) -> Self {
		Self {
			value: value.into(),
			tag: None,
		}
	}

	pub fn tagged(value: impl Into<Value>, tag: ValueTag) -> Self {
		Self {
			value: value.into(),
			tag: Some(tag),
		}
	}

	/// A column identifier
	pub fn field(name: impl Into<String>) -> Self {
		Self::tagged(Value::Text(name.into()), ValueTag::Field)
	}

	/// A table identifier
	pub fn table(name: impl Into<String>) -> Self {
		Self::tagged(Value::Text(name.into()), ValueTag::Table)
	}

	pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
		Self::tagged(Value::Bytes(bytes.into()), ValueTag::Blob)
	}

	pub fn unix_time(seconds: i64) -> Self {
		Self::tagged(Value::Int(seconds), ValueTag::UnixTime)
	}
}

impl From<Value> for Arg {
	fn from(value: Value) -> Self {
		Self::untagged(value)
	}
}

impl<T: Into<Value>> From<Option<T>> for Arg {
	fn from(v: Option<T>) -> Self {
		Self::untagged(Value::from(v))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(ValueTag::Blob, 'l')]
	#[case(ValueTag::Float, 'f')]
	#[case(ValueTag::Int, 'n')]
	#[case(ValueTag::Text, 's')]
	#[case(ValueTag::Field, 'c')]
	#[case(ValueTag::Table, 'i')]
	#[case(ValueTag::Date, 'd')]
	#[case(ValueTag::Time, 't')]
	#[case(ValueTag::DateTime, 'x')]
	#[case(ValueTag::UnixTime, 'u')]
	fn test_tag_codes_are_stable(#[case] tag: ValueTag, #[case] code: char) {
		assert_eq!(tag.code(), code);
		assert_eq!(ValueTag::try_from(code).unwrap(), tag);
	}

	#[rstest]
	fn test_unknown_tag_is_usage_error() {
		// Act
		let result = ValueTag::try_from('z');

		// Assert
		assert!(matches!(result, Err(DatabaseError::Usage(_))));
	}

	#[rstest]
	#[case(Value::Null, None)]
	#[case(Value::Int(1), Some(ValueTag::Int))]
	#[case(Value::Float(1.5), Some(ValueTag::Float))]
	#[case(Value::from("x"), Some(ValueTag::Text))]
	#[case(Value::Bytes(vec![1]), Some(ValueTag::Blob))]
	fn test_infer_tag(#[case] value: Value, #[case] expected: Option<ValueTag>) {
		assert_eq!(ValueTag::infer(&value), expected);
	}

	#[rstest]
	#[case("42", 42)]
	#[case("  -7 apples", -7)]
	#[case("12.9", 12)]
	#[case("1e3", 1000)]
	#[case("abc", 0)]
	#[case("", 0)]
	fn test_lenient_int_cast_from_text(#[case] input: &str, #[case] expected: i64) {
		assert_eq!(Value::from(input).to_int(), expected);
	}

	#[rstest]
	#[case(Value::Null, 0)]
	#[case(Value::Float(3.99), 3)]
	#[case(Value::Float(-3.99), -3)]
	#[case(Value::Float(f64::NAN), 0)]
	#[case(Value::from(true), 1)]
	fn test_lenient_int_cast(#[case] value: Value, #[case] expected: i64) {
		assert_eq!(value.to_int(), expected);
	}

	#[rstest]
	#[case("2.5kg", 2.5)]
	#[case(".5", 0.5)]
	#[case("-", 0.0)]
	fn test_lenient_float_cast(#[case] input: &str, #[case] expected: f64) {
		assert_eq!(Value::from(input).to_float(), expected);
	}

	#[rstest]
	fn test_display_matches_string_cast() {
		// Arrange
		let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
		let datetime = date.and_hms_opt(13, 5, 0).unwrap();

		// Act & Assert
		assert_eq!(Value::Null.to_string(), "");
		assert_eq!(Value::Int(7).to_string(), "7");
		assert_eq!(Value::Float(2.0).to_string(), "2");
		assert_eq!(Value::Date(date).to_string(), "2024-02-29");
		assert_eq!(Value::DateTime(datetime).to_string(), "2024-02-29 13:05:00");
	}

	#[rstest]
	fn test_option_converts_to_null() {
		let none: Option<i64> = None;
		assert_eq!(Value::from(none), Value::Null);
		assert_eq!(Value::from(Some(3)), Value::Int(3));
	}

	#[rstest]
	fn test_try_from_value_mismatch() {
		// Act
		let result = i64::try_from(Value::from("nope"));

		// Assert
		assert!(matches!(result, Err(DatabaseError::TypeMismatch(_))));
	}

	#[rstest]
	fn test_arg_constructors_set_tags() {
		assert_eq!(Arg::field("id").tag, Some(ValueTag::Field));
		assert_eq!(Arg::table("users").tag, Some(ValueTag::Table));
		assert_eq!(Arg::unix_time(0).tag, Some(ValueTag::UnixTime));
		assert_eq!(Arg::from(5).tag, None);
	}
}
