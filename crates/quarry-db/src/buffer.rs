//! Client-side result buffering
//!
//! Drivers read a statement's full output before returning its handle, then
//! serve rows from this store. Buffering gives every driver `num_rows` and
//! random-access `seek`.

use crate::driver::ResultHandle;
use quarry_core::{DatabaseError, FetchMode, Result, Row, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Output of one statement.
#[derive(Debug, Clone, Default)]
pub struct BufferedResult {
	pub columns: Arc<[String]>,
	pub rows: Vec<Vec<Value>>,
	pub affected_rows: u64,
	cursor: usize,
}

impl BufferedResult {
	pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>, affected_rows: u64) -> Self {
		Self {
			columns: columns.into(),
			rows,
			affected_rows,
			cursor: 0,
		}
	}
}

/// Open results of one driver, by handle.
#[derive(Debug, Default)]
pub struct BufferedResults {
	results: HashMap<ResultHandle, BufferedResult>,
	next_id: u64,
}

impl BufferedResults {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, result: BufferedResult) -> ResultHandle {
		self.next_id += 1;
		let handle = ResultHandle::new(self.next_id);
		self.results.insert(handle, result);
		handle
	}

	fn get(&self, handle: ResultHandle) -> Result<&BufferedResult> {
		self.results.get(&handle).ok_or_else(|| invalid_handle(handle))
	}

	fn get_mut(&mut self, handle: ResultHandle) -> Result<&mut BufferedResult> {
		self.results
			.get_mut(&handle)
			.ok_or_else(|| invalid_handle(handle))
	}

	pub fn fetch(&mut self, handle: ResultHandle, mode: FetchMode) -> Result<Option<Row>> {
		let result = self.get_mut(handle)?;
		let Some(values) = result.rows.get(result.cursor) else {
			return Ok(None);
		};
		let row = Row::new(Arc::clone(&result.columns), values.clone(), mode);
		result.cursor += 1;
		Ok(Some(row))
	}

	pub fn num_rows(&self, handle: ResultHandle) -> Result<u64> {
		Ok(self.get(handle)?.rows.len() as u64)
	}

	pub fn affected_rows(&self, handle: ResultHandle) -> Result<u64> {
		Ok(self.get(handle)?.affected_rows)
	}

	/// Position the cursor on `row`; `false` when out of range.
	///
	/// Seeking to row 0 of an empty result succeeds.
	pub fn seek(&mut self, handle: ResultHandle, row: u64) -> Result<bool> {
		let result = self.get_mut(handle)?;
		match usize::try_from(row) {
			Ok(row) if row == 0 || row < result.rows.len() => {
				result.cursor = row;
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	pub fn free(&mut self, handle: ResultHandle) -> Result<()> {
		self.results
			.remove(&handle)
			.map(|_| ())
			.ok_or_else(|| invalid_handle(handle))
	}

	pub fn len(&self) -> usize {
		self.results.len()
	}

	pub fn is_empty(&self) -> bool {
		self.results.is_empty()
	}

	pub fn clear(&mut self) {
		self.results.clear();
	}
}

fn invalid_handle(handle: ResultHandle) -> DatabaseError {
	DatabaseError::Usage(format!("Invalid result handle {}", handle))
}
