//! Restartable iteration over result sets

use crate::result::ResultSet;
use quarry_core::{DatabaseError, FetchMode, Result, Row};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// How a [`ResultIter`] pulls its next item.
pub trait Fetcher {
	type Item;

	fn fetch(&self, result: &mut ResultSet<'_>) -> Result<Option<Self::Item>>;
}

/// Rows in a fixed fetch mode.
#[derive(Debug, Clone, Copy)]
pub struct ArrayFetcher {
	mode: FetchMode,
}

impl ArrayFetcher {
	pub fn new(mode: FetchMode) -> Self {
		Self { mode }
	}
}

impl Fetcher for ArrayFetcher {
	type Item = Row;

	fn fetch(&self, result: &mut ResultSet<'_>) -> Result<Option<Row>> {
		result.fetch_array(self.mode)
	}
}

/// Rows deserialized into `T`.
#[derive(Debug)]
pub struct ObjectFetcher<T> {
	_marker: PhantomData<fn() -> T>,
}

impl<T> ObjectFetcher<T> {
	pub fn new() -> Self {
		Self {
			_marker: PhantomData,
		}
	}
}

impl<T> Default for ObjectFetcher<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: DeserializeOwned> Fetcher for ObjectFetcher<T> {
	type Item = T;

	fn fetch(&self, result: &mut ResultSet<'_>) -> Result<Option<T>> {
		result.fetch_object()
	}
}

/// Cursor over a [`ResultSet`].
///
/// The iterator reads one row ahead: [`ResultIter::current`] is the row
/// under the cursor and [`ResultIter::key`] its position. The position
/// starts at the number of rows the result had already handed out.
/// [`ResultIter::rewind`] goes back to the first row with a driver seek,
/// unless the cursor is already at position 0. Once the rows run out the
/// cursor stays invalid until rewound.
///
/// As an [`Iterator`] it yields the current item and advances.
pub struct ResultIter<'r, 'c, F: Fetcher> {
	result: &'r mut ResultSet<'c>,
	fetcher: F,
	position: u64,
	current: Option<F::Item>,
	pending: Option<DatabaseError>,
}

impl<'r, 'c, F: Fetcher> ResultIter<'r, 'c, F> {
	pub fn new(result: &'r mut ResultSet<'c>, fetcher: F) -> Result<Self> {
		let position = result.row_num();
		let current = fetcher.fetch(result)?;
		Ok(Self {
			result,
			fetcher,
			position,
			current,
			pending: None,
		})
	}

	pub fn current(&self) -> Option<&F::Item> {
		self.current.as_ref()
	}

	pub fn key(&self) -> u64 {
		self.position
	}

	pub fn valid(&self) -> bool {
		self.current.is_some()
	}

	/// Move to the next row.
	pub fn advance(&mut self) -> Result<()> {
		self.current = self.fetcher.fetch(self.result)?;
		if self.current.is_some() {
			self.position += 1;
		}
		Ok(())
	}

	/// Return to the first row.
	pub fn rewind(&mut self) -> Result<()> {
		if self.position == 0 {
			return Ok(());
		}
		self.position = 0;
		self.pending = None;
		self.result.seek(0)?;
		self.current = self.fetcher.fetch(self.result)?;
		Ok(())
	}

	/// Number of rows in the underlying result.
	pub fn row_count(&self) -> Result<u64> {
		self.result.count()
	}
}

impl<F: Fetcher> Iterator for ResultIter<'_, '_, F> {
	type Item = Result<F::Item>;

	fn next(&mut self) -> Option<Self::Item> {
		if let Some(err) = self.pending.take() {
			return Some(Err(err));
		}
		let item = self.current.take()?;
		if let Err(err) = self.advance() {
			self.pending = Some(err);
		}
		Some(Ok(item))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::connection::Connection;
	use crate::testing::{DriverCall, RecordingDriver};
	use quarry_core::Value;
	use rstest::{fixture, rstest};

	#[fixture]
	fn driver() -> RecordingDriver {
		let driver = RecordingDriver::new();
		driver.push_result(
			&["n"],
			vec![vec![Value::Int(10)], vec![Value::Int(20)], vec![Value::Int(30)]],
		);
		driver
	}

	fn values(rows: Vec<Row>) -> Vec<Value> {
		rows.into_iter().filter_map(|r| r.take(0)).collect()
	}

	#[rstest]
	fn test_iterates_all_rows(driver: RecordingDriver) {
		// Arrange
		let conn = Connection::from_driver(Box::new(driver));
		let mut result = conn.native_query("SELECT n FROM t").unwrap();

		// Act
		let rows: Vec<Row> = result
			.iter(FetchMode::Num)
			.unwrap()
			.collect::<Result<_>>()
			.unwrap();

		// Assert
		assert_eq!(values(rows), vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
	}

	#[rstest]
	fn test_cursor_protocol(driver: RecordingDriver) {
		// Arrange
		let conn = Connection::from_driver(Box::new(driver));
		let mut result = conn.native_query("SELECT n FROM t").unwrap();
		let mut iter = result.iter(FetchMode::Assoc).unwrap();

		// Act & Assert
		assert!(iter.valid());
		assert_eq!(iter.key(), 0);
		iter.advance().unwrap();
		assert_eq!(iter.key(), 1);
		assert_eq!(iter.current().and_then(|r| r.get("n")), Some(&Value::Int(20)));
		iter.advance().unwrap();
		iter.advance().unwrap();
		assert!(!iter.valid());
		assert_eq!(iter.key(), 2);
		assert_eq!(iter.row_count().unwrap(), 3);
	}

	#[rstest]
	fn test_rewind_seeks_to_start(driver: RecordingDriver) {
		// Arrange
		let log = driver.log();
		let conn = Connection::from_driver(Box::new(driver));
		let mut result = conn.native_query("SELECT n FROM t").unwrap();
		let mut iter = result.iter(FetchMode::Num).unwrap();
		let drained: Vec<_> = iter.by_ref().collect::<Result<_>>().unwrap();

		// Act
		iter.rewind().unwrap();
		let again: Vec<Row> = iter.collect::<Result<_>>().unwrap();

		// Assert
		assert_eq!(drained.len(), 3);
		assert_eq!(values(again), vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
		assert!(log.calls().iter().any(|c| matches!(c, DriverCall::Seek(_, 0))));
	}

	#[rstest]
	fn test_rewind_at_start_does_not_seek(driver: RecordingDriver) {
		// Arrange
		let log = driver.log();
		let conn = Connection::from_driver(Box::new(driver));
		let mut result = conn.native_query("SELECT n FROM t").unwrap();
		let mut iter = result.iter(FetchMode::Num).unwrap();

		// Act
		iter.rewind().unwrap();

		// Assert
		assert!(iter.valid());
		assert!(!log.calls().iter().any(|c| matches!(c, DriverCall::Seek(..))));
	}

	#[rstest]
	fn test_key_starts_at_rows_already_fetched(driver: RecordingDriver) {
		// Arrange
		let conn = Connection::from_driver(Box::new(driver));
		let mut result = conn.native_query("SELECT n FROM t").unwrap();
		result.fetch_row().unwrap();

		// Act
		let iter = result.iter(FetchMode::Num).unwrap();

		// Assert
		assert_eq!(iter.key(), 1);
		assert_eq!(iter.current().and_then(|r| r.get(0)), Some(&Value::Int(20)));
	}

	#[rstest]
	fn test_object_iterator(driver: RecordingDriver) {
		#[derive(serde::Deserialize)]
		struct Item {
			n: i64,
		}

		// Arrange
		let conn = Connection::from_driver(Box::new(driver));
		let mut result = conn.native_query("SELECT n FROM t").unwrap();

		// Act
		let total: i64 = result
			.objects::<Item>()
			.unwrap()
			.map(|item| item.map(|i| i.n))
			.sum::<Result<i64>>()
			.unwrap();

		// Assert
		assert_eq!(total, 60);
	}
}
