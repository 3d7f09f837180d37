//! SQLite driver

use super::{EscapeRules, block_runtime, query_error};
use crate::buffer::{BufferedResult, BufferedResults};
use crate::driver::{Driver, ResultHandle, TransactionOp, transaction_sql};
use futures::TryStreamExt;
use quarry_core::{DatabaseError, DriverSettings, FetchMode, Result, Row, Value, ValueTag};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Either, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;
use tokio::runtime::Runtime;
use tracing::{debug, trace};

const MEMORY_DATABASE: &str = ":memory:";

/// Driver for SQLite databases, on disk or in memory.
///
/// `database` is the file path; `:memory:` opens a private in-memory
/// database. The `create` option (`true` by default) controls whether a
/// missing file is created.
pub struct SqliteDriver {
	// Dropped before `runtime`.
	conn: Option<SqliteConnection>,
	runtime: Option<Runtime>,
	results: BufferedResults,
	last_insert_id: u64,
}

impl SqliteDriver {
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
		debug!(sql = %sql, "Executing SQLite statement");
		runtime
			.block_on(sqlx::raw_sql(sql).execute(conn))
			.map(|_| ())
			.map_err(|e| map_error(e, sql))
	}
}

impl Default for SqliteDriver {
	fn default() -> Self {
		Self::new()
	}
}

impl EscapeRules for SqliteDriver {
	fn quote_identifier(&self, name: &str) -> String {
		format!("\"{}\"", name.replace('"', "\"\""))
	}

	fn quote_text(&self, text: &str) -> String {
		format!("'{}'", text.replace('\'', "''"))
	}

	fn from_unixtime(&self, seconds: i64) -> String {
		format!("datetime({}, 'unixepoch')", seconds)
	}
}

fn map_error(err: sqlx::Error, sql: &str) -> DatabaseError {
	query_error(err, sql, |_| None)
}

fn connect_options(settings: &DriverSettings) -> Result<SqliteConnectOptions> {
	let database = settings.database.as_deref().unwrap_or(MEMORY_DATABASE);
	if database == MEMORY_DATABASE {
		return SqliteConnectOptions::from_str("sqlite::memory:")
			.map_err(|e| DatabaseError::Config(e.to_string()));
	}
	let create = settings
		.option("create")
		.map(|v| !matches!(v, "false" | "0" | "no"))
		.unwrap_or(true);
	Ok(SqliteConnectOptions::new()
		.filename(database)
		.create_if_missing(create))
}

fn decode_value(row: &SqliteRow, index: usize) -> Value {
	match row.try_get_raw(index) {
		Ok(raw) if !raw.is_null() => {}
		_ => return Value::Null,
	}
	// Declared column type decides whether text holds a temporal value
	let declared = row.column(index).type_info().name().to_ascii_uppercase();
	let temporal = match declared.as_str() {
		"DATETIME" | "TIMESTAMP" => row.try_get::<chrono::NaiveDateTime, _>(index).ok().map(Value::DateTime),
		"DATE" => row.try_get::<chrono::NaiveDate, _>(index).ok().map(Value::Date),
		"TIME" => row.try_get::<chrono::NaiveTime, _>(index).ok().map(Value::Time),
		_ => None,
	};
	if let Some(value) = temporal {
		return value;
	}
	decode_dynamic(row, index).unwrap_or(Value::Null)
}

/// Decode by the value's storage class.
fn decode_dynamic(row: &SqliteRow, index: usize) -> Option<Value> {
	let raw = row.try_get_raw(index).ok()?;
	let storage = raw.type_info().name().to_string();
	match storage.as_str() {
		"INTEGER" => row.try_get_unchecked::<i64, _>(index).ok().map(Value::Int),
		"REAL" => row.try_get_unchecked::<f64, _>(index).ok().map(Value::Float),
		"BLOB" => row.try_get_unchecked::<Vec<u8>, _>(index).ok().map(Value::Bytes),
		_ => row.try_get_unchecked::<String, _>(index).ok().map(Value::Text),
	}
}

async fn collect(conn: &mut SqliteConnection, sql: &str) -> sqlx::Result<(BufferedResult, u64)> {
	let mut stream = sqlx::raw_sql(sql).fetch_many(conn);
	let mut columns: Option<Vec<String>> = None;
	let mut rows = Vec::new();
	let mut affected = 0;
	let mut last_id = 0;
	while let Some(item) = stream.try_next().await? {
		match item {
			Either::Left(done) => {
				affected += done.rows_affected();
				last_id = u64::try_from(done.last_insert_rowid()).unwrap_or_default();
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

impl Driver for SqliteDriver {
	fn name(&self) -> &'static str {
		"sqlite"
	}

	fn connect(&mut self, settings: &DriverSettings) -> Result<()> {
		if self.is_connected() {
			self.disconnect()?;
		}

		let runtime = block_runtime()?;
		let options = connect_options(settings)?;
		let mut conn = runtime
			.block_on(SqliteConnection::connect_with(&options))
			.map_err(|e| DatabaseError::Connection(e.to_string()))?;

		runtime
			.block_on(sqlx::raw_sql("PRAGMA encoding = 'UTF-8'").execute(&mut conn))
			.map_err(|e| DatabaseError::Connection(format!("Failed to set encoding: {}", e)))?;

		debug!(
			database = settings.database.as_deref().unwrap_or(MEMORY_DATABASE),
			"Connected to SQLite"
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
		debug!("Disconnected from SQLite");
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
		debug!(sql = %sql, "Executing SQLite query");
		let (result, last_id) = runtime
			.block_on(collect(conn, sql))
			.map_err(|e| map_error(e, sql))?;
		if last_id != 0 {
			self.last_insert_id = last_id;
		}
		Ok(self.results.insert(result))
	}

	fn begin(&mut self, savepoint: Option<&str>) -> Result<()> {
		let sql = transaction_sql(TransactionOp::Begin, savepoint)?;
		self.execute(&sql)
	}

	fn commit(&mut self, savepoint: Option<&str>) -> Result<()> {
		let sql = transaction_sql(TransactionOp::Commit, savepoint)?;
		self.execute(&sql)
	}

	/// A plain rollback outside a transaction succeeds without effect, as it
	/// does on MySQL.
	fn rollback(&mut self, savepoint: Option<&str>) -> Result<()> {
		let sql = transaction_sql(TransactionOp::Rollback, savepoint)?;
		match self.execute(&sql) {
			Err(DatabaseError::Query { message, .. })
				if savepoint.is_none() && message.contains("no transaction is active") =>
			{
				trace!("Rollback outside a transaction ignored");
				Ok(())
			}
			other => other,
		}
	}

	fn fetch_array(&mut self, handle: ResultHandle, mode: FetchMode) -> Result<Option<Row>> {
		trace!(%handle, ?mode, "Fetching SQLite row");
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
		trace!(%handle, row, "Seeking SQLite result");
		self.results.seek(handle, row)
	}
}
