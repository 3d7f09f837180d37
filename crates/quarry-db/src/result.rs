//! Query results
//!
//! A [`ResultSet`] is the handle side of a statement's output. Rows are
//! pulled from the driver on demand; the handle is released by [`ResultSet::free`]
//! or when the result set is dropped.

use crate::connection::Connection;
use crate::driver::ResultHandle;
use crate::iter::{ArrayFetcher, ObjectFetcher, ResultIter};
use indexmap::IndexMap;
use quarry_core::{DatabaseError, FetchMode, FieldKey, Result, Row, Value};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{trace, warn};

/// Output of a query.
///
/// `row_num` counts the rows handed out through the fetch methods. After a
/// [`ResultSet::seek`] it restarts at the target row.
pub struct ResultSet<'c> {
	conn: &'c Connection,
	handle: Option<ResultHandle>,
	row_num: u64,
}

impl<'c> ResultSet<'c> {
	pub(crate) fn new(conn: &'c Connection, handle: ResultHandle) -> Self {
		Self {
			conn,
			handle: Some(handle),
			row_num: 0,
		}
	}

	pub fn connection(&self) -> &'c Connection {
		self.conn
	}

	pub fn handle(&self) -> Option<ResultHandle> {
		self.handle
	}

	pub fn row_num(&self) -> u64 {
		self.row_num
	}

	fn live_handle(&self) -> Result<ResultHandle> {
		self.handle
			.ok_or_else(|| DatabaseError::Usage("Result has already been freed".to_string()))
	}

	/// Next row in `mode`, `None` at the end.
	pub fn fetch_array(&mut self, mode: FetchMode) -> Result<Option<Row>> {
		let handle = self.live_handle()?;
		let row = self
			.conn
			.with_driver(|driver| driver.fetch_array(handle, mode))?;
		if row.is_some() {
			self.row_num += 1;
		}
		trace!(%handle, row_num = self.row_num, "Fetched row");
		Ok(row)
	}

	/// Next row, addressable by column name only.
	pub fn fetch_assoc(&mut self) -> Result<Option<Row>> {
		self.fetch_array(FetchMode::Assoc)
	}

	/// Next row, addressable by ordinal only.
	pub fn fetch_row(&mut self) -> Result<Option<Row>> {
		self.fetch_array(FetchMode::Num)
	}

	/// Next row deserialized into `T`.
	///
	/// The row is presented to serde as a map from column name to value.
	///
	/// ```no_run
	/// # use quarry_db::Connection;
	/// #[derive(serde::Deserialize)]
	/// struct User {
	/// 	id: i64,
	/// 	name: String,
	/// }
	///
	/// # let conn = Connection::new();
	/// let mut result = conn.native_query("SELECT id, name FROM users")?;
	/// while let Some(user) = result.fetch_object::<User>()? {
	/// 	println!("{} {}", user.id, user.name);
	/// }
	/// # Ok::<(), quarry_core::DatabaseError>(())
	/// ```
	pub fn fetch_object<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
		let handle = self.live_handle()?;
		let Some(object) = self.conn.with_driver(|driver| driver.fetch_object(handle))? else {
			return Ok(None);
		};
		self.row_num += 1;
		let value = serde_json::from_value(serde_json::Value::Object(object))?;
		Ok(Some(value))
	}

	/// Remaining rows in `mode`.
	pub fn fetch_all_array(&mut self, mode: FetchMode) -> Result<Vec<Row>> {
		let mut rows = Vec::new();
		while let Some(row) = self.fetch_array(mode)? {
			rows.push(row);
		}
		Ok(rows)
	}

	pub fn fetch_all_assoc(&mut self) -> Result<Vec<Row>> {
		self.fetch_all_array(FetchMode::Assoc)
	}

	pub fn fetch_all_rows(&mut self) -> Result<Vec<Row>> {
		self.fetch_all_array(FetchMode::Num)
	}

	pub fn fetch_all_objects<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
		let mut objects = Vec::new();
		while let Some(object) = self.fetch_object()? {
			objects.push(object);
		}
		Ok(objects)
	}

	/// Map `key_field` to `val_field` over the remaining rows.
	///
	/// Keys are the string form of the key column; a later row with an equal
	/// key overwrites the earlier value but keeps its position. Both fields
	/// are checked on the first row only, so an empty result gives an empty
	/// map.
	pub fn fetch_pairs(
		&mut self,
		key_field: impl Into<FieldKey>,
		val_field: impl Into<FieldKey>,
	) -> Result<IndexMap<String, Value>> {
		let key_field = key_field.into();
		let val_field = val_field.into();
		let mut pairs = IndexMap::new();
		let mut checked = false;
		while let Some(row) = self.fetch_array(FetchMode::Both)? {
			if !checked {
				require_field(&row, &key_field)?;
				require_field(&row, &val_field)?;
				checked = true;
			}
			let key = row.get(&key_field).map(Value::to_string).unwrap_or_default();
			let value = row.get(&val_field).cloned().unwrap_or_default();
			pairs.insert(key, value);
		}
		Ok(pairs)
	}

	/// `field` of the next row, `None` when there are no more rows.
	pub fn fetch_one(&mut self, field: impl Into<FieldKey>) -> Result<Option<Value>> {
		let field = field.into();
		let Some(row) = self.fetch_array(FetchMode::Both)? else {
			return Ok(None);
		};
		require_field(&row, &field)?;
		Ok(row.take(field))
	}

	/// `field` of every remaining row.
	pub fn fetch_column(&mut self, field: impl Into<FieldKey>) -> Result<Vec<Value>> {
		let field = field.into();
		let mut column = Vec::new();
		while let Some(row) = self.fetch_array(FetchMode::Both)? {
			if column.is_empty() {
				require_field(&row, &field)?;
			}
			column.push(row.take(&field).unwrap_or_default());
		}
		Ok(column)
	}

	/// Move to `row` and reset the row counter to it.
	///
	/// Returns `false`, leaving the counter alone, when `row` is out of
	/// range. Fails when the driver cannot seek.
	pub fn seek(&mut self, row: u64) -> Result<bool> {
		let handle = self.live_handle()?;
		let moved = self.conn.with_driver(|driver| driver.seek(handle, row))?;
		if moved {
			self.row_num = row;
		}
		Ok(moved)
	}

	/// Number of rows the driver reports for this result.
	pub fn count(&self) -> Result<u64> {
		let handle = self.live_handle()?;
		self.conn.with_driver(|driver| driver.num_rows(handle))
	}

	/// Rows changed by the statement that produced this result.
	pub fn affected_rows(&self) -> Result<u64> {
		let handle = self.live_handle()?;
		self.conn.with_driver(|driver| driver.affected_rows(handle))
	}

	/// Iterate the remaining rows, each fetched in `mode`.
	pub fn iter(&mut self, mode: FetchMode) -> Result<ResultIter<'_, 'c, ArrayFetcher>> {
		ResultIter::new(self, ArrayFetcher::new(mode))
	}

	/// Iterate the remaining rows deserialized into `T`.
	pub fn objects<T: DeserializeOwned>(&mut self) -> Result<ResultIter<'_, 'c, ObjectFetcher<T>>> {
		ResultIter::new(self, ObjectFetcher::new())
	}

	/// Release the driver resources now.
	pub fn free(mut self) -> Result<()> {
		self.release()
	}

	fn release(&mut self) -> Result<()> {
		match self.handle.take() {
			Some(handle) => self.conn.with_driver(|driver| driver.free(handle)),
			None => Ok(()),
		}
	}
}

fn require_field(row: &Row, field: &FieldKey) -> Result<()> {
	if row.contains(field) {
		Ok(())
	} else {
		Err(DatabaseError::FieldNotFound(field.to_string()))
	}
}

impl Drop for ResultSet<'_> {
	fn drop(&mut self) {
		if let Err(err) = self.release() {
			// Results of a disconnected driver are already gone
			if !matches!(err, DatabaseError::Connection(_)) {
				warn!(error = %err, "Failed to free result");
			}
		}
	}
}

impl fmt::Debug for ResultSet<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResultSet")
			.field("handle", &self.handle)
			.field("row_num", &self.row_num)
			.finish()
	}
}
