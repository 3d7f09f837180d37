//! Driver lookup by settings `type`

use crate::driver::Driver;
use quarry_core::{DatabaseError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Constructor of a fresh, unconnected driver.
pub type DriverFactory = Box<dyn Fn() -> Box<dyn Driver>>;

/// Maps driver names to factories.
///
/// [`DriverRegistry::default`] knows the drivers compiled into the crate
/// (`mysql` and `sqlite`, each behind its cargo feature).
pub struct DriverRegistry {
	factories: BTreeMap<String, DriverFactory>,
}

impl DriverRegistry {
	/// A registry without any drivers.
	pub fn empty() -> Self {
		Self {
			factories: BTreeMap::new(),
		}
	}

	/// Register `factory` under `name`, replacing any previous entry.
	pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
	where
		F: Fn() -> Box<dyn Driver> + 'static,
	{
		self.factories.insert(name.into(), Box::new(factory));
		self
	}

	pub fn contains(&self, name: &str) -> bool {
		self.factories.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.factories.keys().map(String::as_str)
	}

	/// Instantiate the driver registered as `name`.
	pub fn create(&self, name: &str) -> Result<Box<dyn Driver>> {
		self.factories
			.get(name)
			.map(|factory| factory())
			.ok_or_else(|| DatabaseError::UnknownDriver(name.to_string()))
	}
}

impl Default for DriverRegistry {
	fn default() -> Self {
		#[allow(unused_mut)]
		let mut registry = Self::empty();
		#[cfg(feature = "mysql")]
		registry.register("mysql", || Box::new(crate::drivers::MySqlDriver::new()));
		#[cfg(feature = "sqlite")]
		registry.register("sqlite", || Box::new(crate::drivers::SqliteDriver::new()));
		registry
	}
}

impl fmt::Debug for DriverRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.factories.keys()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::RecordingDriver;
	use rstest::rstest;

	#[rstest]
	fn test_unknown_driver() {
		// Arrange
		let registry = DriverRegistry::empty();

		// Act
		let result = registry.create("oracle");

		// Assert
		assert!(matches!(result, Err(DatabaseError::UnknownDriver(name)) if name == "oracle"));
	}

	#[rstest]
	fn test_register_custom_driver() {
		// Arrange
		let mut registry = DriverRegistry::empty();
		registry.register("recording", || Box::new(RecordingDriver::new()));

		// Act
		let driver = registry.create("recording").unwrap();

		// Assert
		assert_eq!(driver.name(), "recording");
		assert_eq!(registry.names().collect::<Vec<_>>(), vec!["recording"]);
	}

	#[cfg(all(feature = "mysql", feature = "sqlite"))]
	#[rstest]
	fn test_default_registry_has_builtin_drivers() {
		let registry = DriverRegistry::default();
		assert!(registry.contains("mysql"));
		assert!(registry.contains("sqlite"));
	}
}
