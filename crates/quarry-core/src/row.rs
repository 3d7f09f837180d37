//! Result rows and fetch modes

use crate::error::{DatabaseError, Result};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shape of a fetched row.
///
/// The numeric codes are part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FetchMode {
	/// Addressable by column name
	Assoc,
	/// Addressable by ordinal
	Num,
	/// Addressable by both
	#[default]
	Both,
}

impl FetchMode {
	pub const fn code(self) -> u8 {
		match self {
			FetchMode::Assoc => 1,
			FetchMode::Num => 2,
			FetchMode::Both => 3,
		}
	}

	pub fn allows_names(self) -> bool {
		matches!(self, FetchMode::Assoc | FetchMode::Both)
	}

	pub fn allows_indices(self) -> bool {
		matches!(self, FetchMode::Num | FetchMode::Both)
	}
}

impl TryFrom<u8> for FetchMode {
	type Error = DatabaseError;

	fn try_from(code: u8) -> Result<Self> {
		match code {
			1 => Ok(FetchMode::Assoc),
			2 => Ok(FetchMode::Num),
			3 => Ok(FetchMode::Both),
			other => Err(DatabaseError::Usage(format!("Unknown fetch mode {}", other))),
		}
	}
}

/// Column selector: ordinal or name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
	Index(usize),
	Name(String),
}

impl From<usize> for FieldKey {
	fn from(i: usize) -> Self {
		FieldKey::Index(i)
	}
}

impl From<i32> for FieldKey {
	fn from(i: i32) -> Self {
		FieldKey::Index(usize::try_from(i).unwrap_or(usize::MAX))
	}
}

impl From<&str> for FieldKey {
	fn from(s: &str) -> Self {
		FieldKey::Name(s.to_string())
	}
}

impl From<String> for FieldKey {
	fn from(s: String) -> Self {
		FieldKey::Name(s)
	}
}

impl From<&FieldKey> for FieldKey {
	fn from(key: &FieldKey) -> Self {
		key.clone()
	}
}

impl fmt::Display for FieldKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldKey::Index(i) => write!(f, "{}", i),
			FieldKey::Name(name) => f.write_str(name),
		}
	}
}

/// One fetched row.
///
/// Column names are shared between all rows of a result. Lookups honour the
/// mode the row was fetched with: an [`FetchMode::Assoc`] row cannot be read
/// by ordinal and a [`FetchMode::Num`] row cannot be read by name. When a
/// result carries two columns with the same name, name lookups see the last
/// one.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
	mode: FetchMode,
	columns: Arc<[String]>,
	values: Vec<Value>,
}

impl Row {
	pub fn new(columns: Arc<[String]>, values: Vec<Value>, mode: FetchMode) -> Self {
		Self {
			mode,
			columns,
			values,
		}
	}

	pub fn mode(&self) -> FetchMode {
		self.mode
	}

	pub fn columns(&self) -> &[String] {
		&self.columns
	}

	pub fn values(&self) -> &[Value] {
		&self.values
	}

	pub fn into_values(self) -> Vec<Value> {
		self.values
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	fn position(&self, key: &FieldKey) -> Option<usize> {
		match key {
			FieldKey::Index(i) if self.mode.allows_indices() && *i < self.values.len() => Some(*i),
			FieldKey::Name(name) if self.mode.allows_names() => {
				self.columns.iter().rposition(|c| c == name)
			}
			_ => None,
		}
	}

	pub fn contains(&self, key: impl Into<FieldKey>) -> bool {
		self.position(&key.into()).is_some()
	}

	pub fn get(&self, key: impl Into<FieldKey>) -> Option<&Value> {
		self.position(&key.into()).and_then(|i| self.values.get(i))
	}

	/// Typed column access.
	pub fn get_as<T>(&self, key: impl Into<FieldKey>) -> Result<T>
	where
		T: TryFrom<Value, Error = DatabaseError>,
	{
		let key = key.into();
		self.get(&key)
			.cloned()
			.ok_or_else(|| DatabaseError::FieldNotFound(key.to_string()))
			.and_then(T::try_from)
	}

	/// Take one column's value out of the row.
	pub fn take(mut self, key: impl Into<FieldKey>) -> Option<Value> {
		let i = self.position(&key.into())?;
		Some(self.values.swap_remove(i))
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.columns
			.iter()
			.map(String::as_str)
			.zip(self.values.iter())
	}

	/// Column name to value, in column order.
	pub fn to_map(&self) -> IndexMap<String, Value> {
		self.iter()
			.map(|(name, value)| (name.to_string(), value.clone()))
			.collect()
	}

	/// JSON object view used to hydrate rows into user types.
	pub fn to_json_object(&self) -> serde_json::Map<String, serde_json::Value> {
		self.iter()
			.map(|(name, value)| (name.to_string(), value.to_json()))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn columns() -> Arc<[String]> {
		vec!["id".to_string(), "name".to_string()].into()
	}

	fn row(columns: Arc<[String]>, mode: FetchMode) -> Row {
		Row::new(columns, vec![Value::Int(1), Value::from("alice")], mode)
	}

	#[rstest]
	#[case(FetchMode::Assoc, 1)]
	#[case(FetchMode::Num, 2)]
	#[case(FetchMode::Both, 3)]
	fn test_fetch_mode_codes(#[case] mode: FetchMode, #[case] code: u8) {
		assert_eq!(mode.code(), code);
		assert_eq!(FetchMode::try_from(code).unwrap(), mode);
	}

	#[rstest]
	fn test_unknown_fetch_mode_is_usage_error() {
		assert!(matches!(FetchMode::try_from(0u8), Err(DatabaseError::Usage(_))));
	}

	#[rstest]
	fn test_both_mode_reads_by_name_and_index(columns: Arc<[String]>) {
		// Arrange
		let row = row(columns, FetchMode::Both);

		// Act & Assert
		assert_eq!(row.get("name"), Some(&Value::from("alice")));
		assert_eq!(row.get(0), Some(&Value::Int(1)));
	}

	#[rstest]
	fn test_assoc_mode_rejects_index(columns: Arc<[String]>) {
		let row = row(columns, FetchMode::Assoc);
		assert_eq!(row.get(0), None);
		assert!(row.contains("id"));
	}

	#[rstest]
	fn test_num_mode_rejects_name(columns: Arc<[String]>) {
		let row = row(columns, FetchMode::Num);
		assert_eq!(row.get("id"), None);
		assert!(row.contains(1));
	}

	#[rstest]
	fn test_duplicate_column_name_resolves_to_last() {
		// Arrange
		let columns: Arc<[String]> = vec!["id".to_string(), "id".to_string()].into();
		let row = Row::new(columns, vec![Value::Int(1), Value::Int(2)], FetchMode::Both);

		// Act & Assert
		assert_eq!(row.get("id"), Some(&Value::Int(2)));
		assert_eq!(row.to_map().len(), 1);
	}

	#[rstest]
	fn test_get_as_reports_missing_field(columns: Arc<[String]>) {
		// Arrange
		let row = row(columns, FetchMode::Both);

		// Act
		let id: i64 = row.get_as("id").unwrap();
		let missing = row.get_as::<i64>("email");

		// Assert
		assert_eq!(id, 1);
		assert!(matches!(missing, Err(DatabaseError::FieldNotFound(name)) if name == "email"));
	}

	#[rstest]
	fn test_json_object_for_hydration(columns: Arc<[String]>) {
		let object = row(columns, FetchMode::Both).to_json_object();
		assert_eq!(object["id"], serde_json::json!(1));
		assert_eq!(object["name"], serde_json::json!("alice"));
	}
}
