//! Driver capability
//!
//! A [`Driver`] adapts one database engine: it connects, escapes values by
//! tag, runs native SQL and hands out rows from the results it produced.
//! Results are addressed through opaque [`ResultHandle`]s owned by the
//! driver.
//!
//! Every operation blocks the calling thread until the engine answers.
//! Drivers are not synchronized; one driver serves one thread at a time.

use quarry_core::{DriverSettings, FetchMode, Result, Row, Value, ValueTag};
use std::fmt;

/// Driver-issued identifier of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultHandle(u64);

impl ResultHandle {
	pub const fn new(id: u64) -> Self {
		Self(id)
	}

	pub const fn id(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ResultHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Engine adapter used by a connection.
pub trait Driver {
	/// Registered driver name, e.g. `mysql`.
	fn name(&self) -> &'static str;

	/// Open the connection and force UTF-8 as the session encoding.
	fn connect(&mut self, settings: &DriverSettings) -> Result<()>;

	/// Close the connection. Fails when not connected.
	fn disconnect(&mut self) -> Result<()>;

	fn is_connected(&self) -> bool;

	/// Render `value` as an SQL literal or identifier.
	///
	/// Without a tag the tag is inferred from the value, and `NULL` renders
	/// as `NULL`.
	fn escape(&self, value: &Value, tag: Option<ValueTag>) -> String;

	/// Run one SQL statement.
	///
	/// Failures carry the engine's own error code and message along with
	/// the statement text.
	fn native_query(&mut self, sql: &str) -> Result<ResultHandle>;

	/// Start a transaction, or set a savepoint when `savepoint` is given.
	fn begin(&mut self, savepoint: Option<&str>) -> Result<()>;

	/// Commit, or release `savepoint`.
	fn commit(&mut self, savepoint: Option<&str>) -> Result<()>;

	/// Roll back, or roll back to `savepoint`.
	fn rollback(&mut self, savepoint: Option<&str>) -> Result<()>;

	/// Next row of `handle`, `None` once exhausted.
	fn fetch_array(&mut self, handle: ResultHandle, mode: FetchMode) -> Result<Option<Row>>;

	/// Next row of `handle` as a field-name keyed object.
	fn fetch_object(
		&mut self,
		handle: ResultHandle,
	) -> Result<Option<serde_json::Map<String, serde_json::Value>>> {
		Ok(self
			.fetch_array(handle, FetchMode::Assoc)?
			.map(|row| row.to_json_object()))
	}

	/// Number of rows in the result.
	fn num_rows(&self, handle: ResultHandle) -> Result<u64>;

	/// Rows changed by the statement that produced `handle`.
	fn affected_rows(&self, handle: ResultHandle) -> Result<u64>;

	/// Id generated by the last insert on this connection.
	///
	/// `sequence` names the sequence on engines that use them; engines with
	/// auto-increment columns ignore it.
	fn last_insert_id(&self, sequence: Option<&str>) -> Result<u64>;

	/// Release the result.
	fn free(&mut self, handle: ResultHandle) -> Result<()>;

	/// Move the cursor of `handle` to `row`.
	///
	/// Returns `false` when `row` is out of range. Drivers without random
	/// access fail with [`quarry_core::DatabaseError::NotSupported`].
	fn seek(&mut self, handle: ResultHandle, row: u64) -> Result<bool>;
}

impl fmt::Debug for dyn Driver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Driver")
			.field("name", &self.name())
			.field("connected", &self.is_connected())
			.finish()
	}
}

/// Validate a savepoint name.
///
/// Names are embedded in SQL unquoted, so only alphanumerics and `_` are
/// allowed, and the first character must not be a digit.
pub fn validate_savepoint_name(name: &str) -> Result<()> {
	use quarry_core::DatabaseError;

	if name.is_empty() {
		return Err(DatabaseError::Usage(
			"Savepoint name cannot be empty".to_string(),
		));
	}

	if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
		return Err(DatabaseError::Usage(format!(
			"Savepoint name '{}' contains invalid characters. Only alphanumeric characters and underscores are allowed",
			name
		)));
	}

	if let Some(first_char) = name.chars().next()
		&& first_char.is_ascii_digit()
	{
		return Err(DatabaseError::Usage(format!(
			"Savepoint name '{}' cannot start with a number",
			name
		)));
	}

	Ok(())
}

/// Transaction statements shared by the SQL drivers.
///
/// Returns the statement to run for `begin`/`commit`/`rollback` with an
/// optional savepoint.
pub(crate) fn transaction_sql(op: TransactionOp, savepoint: Option<&str>) -> Result<String> {
	let Some(name) = savepoint else {
		return Ok(match op {
			TransactionOp::Begin => "BEGIN".to_string(),
			TransactionOp::Commit => "COMMIT".to_string(),
			TransactionOp::Rollback => "ROLLBACK".to_string(),
		});
	};
	validate_savepoint_name(name)?;
	Ok(match op {
		TransactionOp::Begin => format!("SAVEPOINT {}", name),
		TransactionOp::Commit => format!("RELEASE SAVEPOINT {}", name),
		TransactionOp::Rollback => format!("ROLLBACK TO SAVEPOINT {}", name),
	})
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransactionOp {
	Begin,
	Commit,
	Rollback,
}

#[cfg(test)]
mod tests {
	use super::*;
	use quarry_core::DatabaseError;
	use rstest::rstest;

	#[rstest]
	#[case("sp1")]
	#[case("_outer")]
	#[case("before_update")]
	fn test_valid_savepoint_names(#[case] name: &str) {
		assert!(validate_savepoint_name(name).is_ok());
	}

	#[rstest]
	#[case("")]
	#[case("1sp")]
	#[case("sp; DROP TABLE users")]
	#[case("sp-1")]
	fn test_invalid_savepoint_names(#[case] name: &str) {
		assert!(matches!(validate_savepoint_name(name), Err(DatabaseError::Usage(_))));
	}

	#[rstest]
	#[case(TransactionOp::Begin, None, "BEGIN")]
	#[case(TransactionOp::Commit, None, "COMMIT")]
	#[case(TransactionOp::Rollback, None, "ROLLBACK")]
	#[case(TransactionOp::Begin, Some("sp"), "SAVEPOINT sp")]
	#[case(TransactionOp::Commit, Some("sp"), "RELEASE SAVEPOINT sp")]
	#[case(TransactionOp::Rollback, Some("sp"), "ROLLBACK TO SAVEPOINT sp")]
	fn test_transaction_sql(
		#[case] op: TransactionOp,
		#[case] savepoint: Option<&str>,
		#[case] expected: &str,
	) {
		assert_eq!(transaction_sql(op, savepoint).unwrap(), expected);
	}
}
