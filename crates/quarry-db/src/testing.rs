//! In-process driver for tests
//!
//! [`RecordingDriver`] speaks no engine protocol. It records every call,
//! answers queries from a queue of scripted results and can be told to fail
//! chosen statements. Identifiers are quoted with backticks and strings with
//! doubled single quotes.

use crate::buffer::{BufferedResult, BufferedResults};
use crate::driver::{Driver, ResultHandle, validate_savepoint_name};
use crate::drivers::EscapeRules;
use quarry_core::{DatabaseError, DriverSettings, FetchMode, Result, Row, Value, ValueTag};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
	Connect,
	Disconnect,
	NativeQuery(String),
	Begin(Option<String>),
	Commit(Option<String>),
	Rollback(Option<String>),
	Seek(ResultHandle, u64),
	Free(ResultHandle),
}

#[derive(Debug, Default)]
struct Shared {
	calls: Vec<DriverCall>,
	responses: VecDeque<BufferedResult>,
	fail_patterns: Vec<String>,
	fail_rollback: bool,
	unseekable: bool,
	last_insert_id: u64,
}

/// Shared view of a [`RecordingDriver`]'s state, usable after the driver
/// has been handed to a connection.
#[derive(Debug, Clone, Default)]
pub struct DriverLog(Rc<RefCell<Shared>>);

impl DriverLog {
	pub fn calls(&self) -> Vec<DriverCall> {
		self.0.borrow().calls.clone()
	}

	/// SQL text of every `native_query` call, in order.
	pub fn queries(&self) -> Vec<String> {
		self.0
			.borrow()
			.calls
			.iter()
			.filter_map(|call| match call {
				DriverCall::NativeQuery(sql) => Some(sql.clone()),
				_ => None,
			})
			.collect()
	}

	pub fn clear(&self) {
		self.0.borrow_mut().calls.clear();
	}
}

/// Recording driver; starts out connected.
#[derive(Debug)]
pub struct RecordingDriver {
	shared: DriverLog,
	connected: bool,
	results: BufferedResults,
}

impl RecordingDriver {
	pub fn new() -> Self {
		Self {
			shared: DriverLog::default(),
			connected: true,
			results: BufferedResults::new(),
		}
	}

	pub fn log(&self) -> DriverLog {
		self.shared.clone()
	}

	/// Queue the result returned by the next successful query.
	///
	/// Queries find an empty result once the queue runs dry.
	pub fn push_result(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
		let columns = columns.iter().map(|c| c.to_string()).collect();
		self.shared
			.0
			.borrow_mut()
			.responses
			.push_back(BufferedResult::new(columns, rows, 0));
	}

	/// Queue a result reporting `affected` changed rows.
	pub fn push_affected(&self, affected: u64) {
		self.shared
			.0
			.borrow_mut()
			.responses
			.push_back(BufferedResult::new(Vec::new(), Vec::new(), affected));
	}

	/// Fail every query whose text contains `pattern`.
	pub fn fail_on(&self, pattern: impl Into<String>) {
		self.shared.0.borrow_mut().fail_patterns.push(pattern.into());
	}

	pub fn fail_rollback(&self, fail: bool) {
		self.shared.0.borrow_mut().fail_rollback = fail;
	}

	/// Make `seek` report that the backend has no random access.
	pub fn set_unseekable(&self) {
		self.shared.0.borrow_mut().unseekable = true;
	}

	pub fn set_last_insert_id(&self, id: u64) {
		self.shared.0.borrow_mut().last_insert_id = id;
	}

	fn record(&self, call: DriverCall) {
		self.shared.0.borrow_mut().calls.push(call);
	}

	fn ensure_connected(&self) -> Result<()> {
		if self.connected {
			Ok(())
		} else {
			Err(DatabaseError::not_connected())
		}
	}

	fn transaction(&mut self, call: DriverCall, savepoint: Option<&str>) -> Result<()> {
		self.ensure_connected()?;
		if let Some(name) = savepoint {
			validate_savepoint_name(name)?;
		}
		let failing_rollback =
			matches!(call, DriverCall::Rollback(_)) && self.shared.0.borrow().fail_rollback;
		self.record(call);
		if failing_rollback {
			return Err(DatabaseError::query(Some("2006"), "server has gone away", "ROLLBACK"));
		}
		Ok(())
	}
}

impl Default for RecordingDriver {
	fn default() -> Self {
		Self::new()
	}
}

impl EscapeRules for RecordingDriver {
	fn quote_identifier(&self, name: &str) -> String {
		format!("`{}`", name.replace('`', "``"))
	}

	fn quote_text(&self, text: &str) -> String {
		format!("'{}'", text.replace('\'', "''"))
	}

	fn from_unixtime(&self, seconds: i64) -> String {
		format!("FROM_UNIXTIME({})", seconds)
	}
}

impl Driver for RecordingDriver {
	fn name(&self) -> &'static str {
		"recording"
	}

	fn connect(&mut self, _settings: &DriverSettings) -> Result<()> {
		self.record(DriverCall::Connect);
		self.connected = true;
		Ok(())
	}

	fn disconnect(&mut self) -> Result<()> {
		self.ensure_connected()?;
		self.record(DriverCall::Disconnect);
		self.connected = false;
		self.results.clear();
		Ok(())
	}

	fn is_connected(&self) -> bool {
		self.connected
	}

	fn escape(&self, value: &Value, tag: Option<ValueTag>) -> String {
		self.escape_value(value, tag)
	}

	fn native_query(&mut self, sql: &str) -> Result<ResultHandle> {
		self.ensure_connected()?;
		self.record(DriverCall::NativeQuery(sql.to_string()));
		let mut shared = self.shared.0.borrow_mut();
		if shared.fail_patterns.iter().any(|p| sql.contains(p.as_str())) {
			return Err(DatabaseError::query(
				Some("1064"),
				"You have an error in your SQL syntax",
				sql,
			));
		}
		let result = shared.responses.pop_front().unwrap_or_default();
		drop(shared);
		Ok(self.results.insert(result))
	}

	fn begin(&mut self, savepoint: Option<&str>) -> Result<()> {
		self.transaction(DriverCall::Begin(savepoint.map(str::to_string)), savepoint)
	}

	fn commit(&mut self, savepoint: Option<&str>) -> Result<()> {
		self.transaction(DriverCall::Commit(savepoint.map(str::to_string)), savepoint)
	}

	fn rollback(&mut self, savepoint: Option<&str>) -> Result<()> {
		self.transaction(DriverCall::Rollback(savepoint.map(str::to_string)), savepoint)
	}

	fn fetch_array(&mut self, handle: ResultHandle, mode: FetchMode) -> Result<Option<Row>> {
		self.results.fetch(handle, mode)
	}

	fn num_rows(&self, handle: ResultHandle) -> Result<u64> {
		self.results.num_rows(handle)
	}

	fn affected_rows(&self, handle: ResultHandle) -> Result<u64> {
		self.results.affected_rows(handle)
	}

	fn last_insert_id(&self, _sequence: Option<&str>) -> Result<u64> {
		self.ensure_connected()?;
		Ok(self.shared.0.borrow().last_insert_id)
	}

	fn free(&mut self, handle: ResultHandle) -> Result<()> {
		self.record(DriverCall::Free(handle));
		self.results.free(handle)
	}

	fn seek(&mut self, handle: ResultHandle, row: u64) -> Result<bool> {
		self.record(DriverCall::Seek(handle, row));
		if self.shared.0.borrow().unseekable {
			return Err(DatabaseError::NotSupported(
				"Result does not support seeking".to_string(),
			));
		}
		self.results.seek(handle, row)
	}
}
