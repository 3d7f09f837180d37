//! MySQL driver

use super::{EscapeRules, block_runtime, query_error};
use crate::buffer::{BufferedResult, BufferedResults};
use crate::driver::{Driver, ResultHandle, TransactionOp, transaction_sql};
use futures::TryStreamExt;
use quarry_core::{DatabaseError, DriverSettings, FetchMode, Result, Row, Value, ValueTag};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{Column, Connection, Either, Row as SqlxRow, ValueRef};
use tokio::runtime::Runtime;
use tracing::{debug, trace};

const DEFAULT_CHARSET: &str = "utf8mb4";

/// Driver for MySQL and MariaDB.
///
/// Identifiers are quoted with backticks and string literals are escaped
/// the way `mysql_real_escape_string` does, assuming the server does not
/// run with `NO_BACKSLASH_ESCAPES`.
pub struct MySqlDriver {
	// Dropped before `runtime`.
	conn: Option<MySqlConnection>,
	runtime: Option<Runtime>,
	results: BufferedResults,
	last_insert_id: u64,
}

impl MySqlDriver {
	pub fn new() -> Self {
		Self {
			conn: None,
			runtime: None,
			results: BufferedResults::new(),
			last_insert_id: 0,
		}
	}

	fn execute(&mut self, sql: &str) -> Result<()> {
		let (Some(runtime), Some(conn)) = (&self.runtime, &mut self.conn) else {
			return Err(DatabaseError::not_connected());
		};
		debug!(sql = %sql, "Executing MySQL statement");
		runtime
			.block_on(sqlx::raw_sql(sql).execute(conn))
			.map(|_| ())
			.map_err(|e| map_error(e, sql))
	}

	fn transaction(&mut self, op: TransactionOp, savepoint: Option<&str>) -> Result<()> {
		let sql = transaction_sql(op, savepoint)?;
		self.execute(&sql)
	}
}

impl Default for MySqlDriver {
	fn default() -> Self {
		Self::new()
	}
}

impl EscapeRules for MySqlDriver {
	fn quote_identifier(&self, name: &str) -> String {
		format!("`{}`", name.replace('`', "``"))
	}

	fn quote_text(&self, text: &str) -> String {
		let mut out = String::with_capacity(text.len() + 2);
		out.push('\'');
		for c in text.chars() {
			match c {
				'\0' => out.push_str("\\0"),
				'\n' => out.push_str("\\n"),
				'\r' => out.push_str("\\r"),
				'\\' => out.push_str("\\\\"),
				'\'' => out.push_str("\\'"),
				'"' => out.push_str("\\\""),
				'\x1a' => out.push_str("\\Z"),
				other => out.push(other),
			}
		}
		out.push('\'');
		out
	}

	fn from_unixtime(&self, seconds: i64) -> String {
		format!("FROM_UNIXTIME({})", seconds)
	}
}

fn map_error(err: sqlx::Error, sql: &str) -> DatabaseError {
	query_error(err, sql, |db| {
		db.try_downcast_ref::<MySqlDatabaseError>()
			.map(|e| e.number().to_string())
	})
}

fn connect_options(settings: &DriverSettings, charset: &str) -> MySqlConnectOptions {
	let mut options = MySqlConnectOptions::new()
		.host(settings.server.as_deref().unwrap_or("localhost"))
		.charset(charset);
	if let Some(port) = settings.port {
		options = options.port(port);
	}
	if let Some(username) = &settings.username {
		options = options.username(username);
	}
	if let Some(password) = &settings.password {
		options = options.password(password);
	}
	if let Some(database) = &settings.database {
		options = options.database(database);
	}
	options
}

fn valid_charset(charset: &str) -> bool {
	!charset.is_empty() && charset.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decode one column, trying the richest type first.
fn decode_value(row: &MySqlRow, index: usize) -> Value {
	match row.try_get_raw(index) {
		Ok(raw) if !raw.is_null() => {}
		_ => return Value::Null,
	}
	if let Ok(v) = row.try_get::<i64, _>(index) {
		Value::Int(v)
	} else if let Ok(v) = row.try_get::<u64, _>(index) {
		i64::try_from(v)
			.map(Value::Int)
			.unwrap_or_else(|_| Value::Text(v.to_string()))
	} else if let Ok(v) = row.try_get::<f64, _>(index) {
		Value::Float(v)
	} else if let Ok(v) = row.try_get::<f32, _>(index) {
		Value::Float(f64::from(v))
	} else if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(index) {
		Value::DateTime(v)
	} else if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(index) {
		Value::Date(v)
	} else if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(index) {
		Value::Time(v)
	} else if let Ok(v) = row.try_get::<String, _>(index) {
		Value::Text(v)
	} else if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
		// Binary-collation text columns arrive as bytes
		match String::from_utf8(v) {
			Ok(s) => Value::Text(s),
			Err(e) => Value::Bytes(e.into_bytes()),
		}
	} else if let Ok(v) = row.try_get_unchecked::<String, _>(index) {
		// DECIMAL and other textual wire types
		Value::Text(v)
	} else {
		Value::Null
	}
}

async fn collect(conn: &mut MySqlConnection, sql: &str) -> sqlx::Result<(BufferedResult, u64)> {
	let mut stream = sqlx::raw_sql(sql).fetch_many(conn);
	let mut columns: Option<Vec<String>> = None;
	let mut rows = Vec::new();
	let mut affected = 0;
	let mut last_id = 0;
	while let Some(item) = stream.try_next().await? {
		match item {
			Either::Left(done) => {
				affected += done.rows_affected();
				if done.last_insert_id() != 0 {
					last_id = done.last_insert_id();
				}
			}
			Either::Right(row) => {
				if columns.is_none() {
					columns = Some(row.columns().iter().map(|c| c.name().to_string()).collect());
				}
				rows.push((0..row.len()).map(|i| decode_value(&row, i)).collect());
			}
		}
	}
	Ok((
		BufferedResult::new(columns.unwrap_or_default(), rows, affected),
		last_id,
	))
}

impl Driver for MySqlDriver {
	fn name(&self) -> &'static str {
		"mysql"
	}

	fn connect(&mut self, settings: &DriverSettings) -> Result<()> {
		if self.is_connected() {
			self.disconnect()?;
		}

		let charset = settings.option("charset").unwrap_or(DEFAULT_CHARSET).to_string();
		if !valid_charset(&charset) {
			return Err(DatabaseError::Config(format!("Invalid charset '{}'", charset)));
		}

		let runtime = block_runtime()?;
		let options = connect_options(settings, &charset);
		let mut conn = runtime
			.block_on(MySqlConnection::connect_with(&options))
			.map_err(|e| DatabaseError::Connection(e.to_string()))?;

		let set_names = format!("SET NAMES {}", charset);
		runtime
			.block_on(sqlx::raw_sql(&set_names).execute(&mut conn))
			.map_err(|e| DatabaseError::Connection(format!("Failed to set encoding: {}", e)))?;

		debug!(
			server = settings.server.as_deref().unwrap_or("localhost"),
			database = settings.database.as_deref().unwrap_or(""),
			charset = %charset,
			"Connected to MySQL"
		);
		self.conn = Some(conn);
		self.runtime = Some(runtime);
		Ok(())
	}

	fn disconnect(&mut self) -> Result<()> {
		let (Some(conn), Some(runtime)) = (self.conn.take(), self.runtime.take()) else {
			return Err(DatabaseError::not_connected());
		};
		self.results.clear();
		runtime
			.block_on(conn.close())
			.map_err(|e| DatabaseError::Connection(e.to_string()))?;
		debug!("Disconnected from MySQL");
		Ok(())
	}

	fn is_connected(&self) -> bool {
		self.conn.is_some()
	}

	fn escape(&self, value: &Value, tag: Option<ValueTag>) -> String {
		self.escape_value(value, tag)
	}

	fn native_query(&mut self, sql: &str) -> Result<ResultHandle> {
		let (Some(runtime), Some(conn)) = (&self.runtime, &mut self.conn) else {
			return Err(DatabaseError::not_connected());
		};
		debug!(sql = %sql, "Executing MySQL query");
		let (result, last_id) = runtime
			.block_on(collect(conn, sql))
			.map_err(|e| map_error(e, sql))?;
		if last_id != 0 {
			self.last_insert_id = last_id;
		}
		Ok(self.results.insert(result))
	}

	fn begin(&mut self, savepoint: Option<&str>) -> Result<()> {
		self.transaction(TransactionOp::Begin, savepoint)
	}

	fn commit(&mut self, savepoint: Option<&str>) -> Result<()> {
		self.transaction(TransactionOp::Commit, savepoint)
	}

	fn rollback(&mut self, savepoint: Option<&str>) -> Result<()> {
		self.transaction(TransactionOp::Rollback, savepoint)
	}

	fn fetch_array(&mut self, handle: ResultHandle, mode: FetchMode) -> Result<Option<Row>> {
		trace!(%handle, ?mode, "Fetching MySQL row");
		self.results.fetch(handle, mode)
	}

	fn num_rows(&self, handle: ResultHandle) -> Result<u64> {
		self.results.num_rows(handle)
	}

	fn affected_rows(&self, handle: ResultHandle) -> Result<u64> {
		self.results.affected_rows(handle)
	}

	fn last_insert_id(&self, _sequence: Option<&str>) -> Result<u64> {
		if !self.is_connected() {
			return Err(DatabaseError::not_connected());
		}
		Ok(self.last_insert_id)
	}

	fn free(&mut self, handle: ResultHandle) -> Result<()> {
		self.results.free(handle)
	}

	fn seek(&mut self, handle: ResultHandle, row: u64) -> Result<bool> {
		trace!(%handle, row, "Seeking MySQL result");
		self.results.seek(handle, row)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn driver() -> MySqlDriver {
		MySqlDriver::new()
	}

	#[rstest]
	#[case("plain", "'plain'")]
	#[case("it's", "'it\\'s'")]
	#[case("say \"hi\"", "'say \\\"hi\\\"'")]
	#[case("a\\b", "'a\\\\b'")]
	#[case("line\nbreak\r", "'line\\nbreak\\r'")]
	#[case("nul\0ctrl\x1a", "'nul\\0ctrl\\Z'")]
	fn test_text_escaping(driver: MySqlDriver, #[case] input: &str, #[case] expected: &str) {
		assert_eq!(driver.escape(&Value::from(input), None), expected);
	}

	#[rstest]
	fn test_identifiers_use_backticks(driver: MySqlDriver) {
		// Act
		let field = driver.escape(&Value::from("na`me"), Some(ValueTag::Field));
		let table = driver.escape(&Value::from("users"), Some(ValueTag::Table));

		// Assert
		assert_eq!(field, "`na``me`");
		assert_eq!(table, "`users`");
	}

	#[rstest]
	fn test_unix_time_uses_from_unixtime(driver: MySqlDriver) {
		let escaped = driver.escape(&Value::Int(1_700_000_000), Some(ValueTag::UnixTime));
		assert_eq!(escaped, "FROM_UNIXTIME(1700000000)");
	}

	#[rstest]
	fn test_query_without_connection_fails(mut driver: MySqlDriver) {
		// Act
		let result = driver.native_query("SELECT 1");

		// Assert
		assert!(matches!(result, Err(DatabaseError::Connection(_))));
		assert!(!driver.is_connected());
	}

	#[rstest]
	fn test_disconnect_without_connection_fails(mut driver: MySqlDriver) {
		assert!(matches!(driver.disconnect(), Err(DatabaseError::Connection(_))));
	}

	#[rstest]
	#[case("utf8mb4", true)]
	#[case("latin1", true)]
	#[case("utf8; DROP", false)]
	#[case("", false)]
	fn test_charset_validation(#[case] charset: &str, #[case] valid: bool) {
		assert_eq!(valid_charset(charset), valid);
	}
}
