//! Concrete drivers
//!
//! Both SQL drivers keep a single engine connection and a private
//! current-thread runtime they block on, and read each statement's output
//! into [`BufferedResults`](crate::buffer::BufferedResults).

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mysql")]
pub use mysql::MySqlDriver;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

use chrono::Local;
use quarry_core::{Value, ValueTag};

/// Engine-specific quoting, from which value escaping is derived.
pub trait EscapeRules {
	/// Quote an identifier, doubling embedded quote characters.
	fn quote_identifier(&self, name: &str) -> String;

	/// Escape and quote a string literal.
	fn quote_text(&self, text: &str) -> String;

	/// Expression converting epoch seconds to a datetime.
	fn from_unixtime(&self, seconds: i64) -> String;

	fn quote_blob(&self, bytes: &[u8]) -> String {
		let mut out = String::with_capacity(bytes.len() * 2 + 3);
		out.push_str("X'");
		for b in bytes {
			out.push_str(&format!("{:02X}", b));
		}
		out.push('\'');
		out
	}

	/// Escape `value` under `tag`, inferring the tag when absent.
	///
	/// Numeric tags cast leniently, temporal tags fall back to the current
	/// local time for non-temporal input, and non-finite floats render as
	/// `NULL`.
	fn escape_value(&self, value: &Value, tag: Option<ValueTag>) -> String {
		let Some(tag) = tag.or_else(|| ValueTag::infer(value)) else {
			return "NULL".to_string();
		};
		match tag {
			ValueTag::Int => value.to_int().to_string(),
			ValueTag::Float => {
				let f = value.to_float();
				// Whole floats keep a fractional part so they read back as REAL
				if f.is_finite() {
					format!("{:?}", f)
				} else {
					"NULL".to_string()
				}
			}
			ValueTag::Text => self.quote_text(&value.to_string()),
			ValueTag::Blob => match value {
				Value::Bytes(bytes) => self.quote_blob(bytes),
				other => self.quote_blob(other.to_string().as_bytes()),
			},
			ValueTag::Date | ValueTag::Time | ValueTag::DateTime => {
				let dt = value
					.to_datetime()
					.unwrap_or_else(|| Local::now().naive_local());
				let layout = match tag {
					ValueTag::Date => "%Y-%m-%d",
					ValueTag::Time => "%H:%M:%S",
					_ => "%Y-%m-%d %H:%M:%S",
				};
				self.quote_text(&dt.format(layout).to_string())
			}
			ValueTag::UnixTime => self.from_unixtime(value.to_int()),
			ValueTag::Field | ValueTag::Table => self.quote_identifier(&value.to_string()),
		}
	}
}

#[cfg(any(feature = "mysql", feature = "sqlite"))]
pub(crate) use runtime::{block_runtime, query_error};

#[cfg(any(feature = "mysql", feature = "sqlite"))]
mod runtime {
	use quarry_core::DatabaseError;

	/// Runtime the blocking drivers drive sqlx futures on.
	pub(crate) fn block_runtime() -> Result<tokio::runtime::Runtime, DatabaseError> {
		tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(|e| DatabaseError::Connection(format!("Failed to start runtime: {}", e)))
	}

	/// Map an sqlx failure of `sql` to a query error.
	///
	/// `native_code` extracts the engine's own error number when the
	/// generic SQLSTATE-style code is not what the engine reports natively.
	pub(crate) fn query_error(
		err: sqlx::Error,
		sql: &str,
		native_code: impl Fn(&(dyn sqlx::error::DatabaseError + 'static)) -> Option<String>,
	) -> DatabaseError {
		match err.as_database_error() {
			Some(db) => DatabaseError::Query {
				code: native_code(db).or_else(|| db.code().map(|c| c.into_owned())),
				message: db.message().to_string(),
				query: sql.to_string(),
			},
			None => DatabaseError::Query {
				code: None,
				message: err.to_string(),
				query: sql.to_string(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;
	use rstest::{fixture, rstest};

	struct AnsiRules;

	impl EscapeRules for AnsiRules {
		fn quote_identifier(&self, name: &str) -> String {
			format!("\"{}\"", name.replace('"', "\"\""))
		}

		fn quote_text(&self, text: &str) -> String {
			format!("'{}'", text.replace('\'', "''"))
		}

		fn from_unixtime(&self, seconds: i64) -> String {
			format!("TO_TIMESTAMP({})", seconds)
		}
	}

	#[fixture]
	fn rules() -> AnsiRules {
		AnsiRules
	}

	#[rstest]
	#[case(Value::Int(5), None, "5")]
	#[case(Value::Float(1.25), None, "1.25")]
	#[case(Value::Float(2.0), None, "2.0")]
	#[case(Value::Null, None, "NULL")]
	#[case(Value::from("it's"), None, "'it''s'")]
	#[case(Value::from("12abc"), Some(ValueTag::Int), "12")]
	#[case(Value::from("2.5"), Some(ValueTag::Float), "2.5")]
	#[case(Value::Float(f64::NAN), None, "NULL")]
	#[case(Value::Int(7), Some(ValueTag::Text), "'7'")]
	#[case(Value::Bytes(vec![0x00, 0xff]), None, "X'00FF'")]
	#[case(Value::Int(86400), Some(ValueTag::UnixTime), "TO_TIMESTAMP(86400)")]
	#[case(Value::from("users"), Some(ValueTag::Table), "\"users\"")]
	#[case(Value::from("a\"b"), Some(ValueTag::Field), "\"a\"\"b\"")]
	fn test_escape_by_tag(
		rules: AnsiRules,
		#[case] value: Value,
		#[case] tag: Option<ValueTag>,
		#[case] expected: &str,
	) {
		assert_eq!(rules.escape_value(&value, tag), expected);
	}

	#[rstest]
	fn test_temporal_tags_format_values(rules: AnsiRules) {
		// Arrange
		let dt = NaiveDate::from_ymd_opt(2023, 7, 1)
			.unwrap()
			.and_hms_opt(8, 30, 15)
			.unwrap();
		let value = Value::DateTime(dt);

		// Act & Assert
		assert_eq!(rules.escape_value(&value, Some(ValueTag::Date)), "'2023-07-01'");
		assert_eq!(rules.escape_value(&value, Some(ValueTag::Time)), "'08:30:15'");
		assert_eq!(rules.escape_value(&value, None), "'2023-07-01 08:30:15'");
	}

	#[rstest]
	fn test_temporal_tag_defaults_to_now(rules: AnsiRules) {
		// Act
		let escaped = rules.escape_value(&Value::from("garbage"), Some(ValueTag::Date));

		// Assert
		let today = Local::now().format("'%Y-%m-%d'").to_string();
		assert_eq!(escaped, today);
	}
}
