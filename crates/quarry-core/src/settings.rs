//! Connection settings
//!
//! [`ConnectionSettings`] is what an application hands to a connection: it
//! names the driver (`type`), the table prefix and the engine parameters.
//! The driver itself only ever sees [`DriverSettings`], the same map with
//! `type` and the prefix removed.

use crate::error::{DatabaseError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Settings for opening a connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
	/// Registered driver name (`mysql`, `sqlite`, ...)
	#[serde(rename = "type")]
	pub driver: String,

	/// Replacement for the `#__` table-prefix marker
	#[serde(default, alias = "prefix")]
	pub table_prefix: String,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub server: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,

	/// Database (schema) name, or file path for file-based engines
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub database: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub port: Option<u16>,

	/// Driver-specific extras, forwarded untouched
	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub options: IndexMap<String, String>,
}

impl ConnectionSettings {
	pub fn new(driver: impl Into<String>) -> Self {
		Self {
			driver: driver.into(),
			table_prefix: String::new(),
			server: None,
			username: None,
			password: None,
			database: None,
			port: None,
			options: IndexMap::new(),
		}
	}

	/// MySQL settings for `server`.
	///
	/// # Examples
	///
	/// ```
	/// use quarry_core::settings::ConnectionSettings;
	///
	/// let settings = ConnectionSettings::mysql("localhost", "app", "secret", "shop");
	/// assert_eq!(settings.driver, "mysql");
	/// assert_eq!(settings.database.as_deref(), Some("shop"));
	/// ```
	pub fn mysql(
		server: impl Into<String>,
		username: impl Into<String>,
		password: impl Into<String>,
		database: impl Into<String>,
	) -> Self {
		Self {
			server: Some(server.into()),
			username: Some(username.into()),
			password: Some(password.into()),
			database: Some(database.into()),
			..Self::new("mysql")
		}
	}

	/// SQLite settings; `:memory:` opens a private in-memory database.
	pub fn sqlite(path: impl Into<String>) -> Self {
		Self {
			database: Some(path.into()),
			..Self::new("sqlite")
		}
	}

	pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.table_prefix = prefix.into();
		self
	}

	pub fn with_port(mut self, port: u16) -> Self {
		self.port = Some(port);
		self
	}

	pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.options.insert(key.into(), value.into());
		self
	}

	/// Parse settings from a TOML document.
	///
	/// ```
	/// use quarry_core::settings::ConnectionSettings;
	///
	/// let settings = ConnectionSettings::from_toml_str(r#"
	/// type = "sqlite"
	/// database = ":memory:"
	/// prefix = "app_"
	/// "#).unwrap();
	/// assert_eq!(settings.table_prefix, "app_");
	/// ```
	pub fn from_toml_str(text: &str) -> Result<Self> {
		toml::from_str(text).map_err(|e| DatabaseError::Config(e.to_string()))
	}

	pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|e| {
			DatabaseError::Config(format!("Cannot read {}: {}", path.display(), e))
		})?;
		Self::from_toml_str(&text)
	}

	/// Build settings from a flat key/value map.
	///
	/// `type` is required. `prefix` (or `table_prefix`) sets the table
	/// prefix, the well-known keys fill their fields and every other key
	/// lands in [`ConnectionSettings::options`].
	pub fn from_map<I, K, V>(entries: I) -> Result<Self>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut driver = None;
		let mut settings = Self::new(String::new());
		for (key, value) in entries {
			let key = key.into();
			let value = value.into();
			match key.as_str() {
				"type" => driver = Some(value),
				"prefix" | "table_prefix" => settings.table_prefix = value,
				"server" => settings.server = Some(value),
				"username" => settings.username = Some(value),
				"password" => settings.password = Some(value),
				"database" => settings.database = Some(value),
				"port" => {
					let port = value
						.parse::<u16>()
						.map_err(|_| DatabaseError::Config(format!("Invalid port '{}'", value)))?;
					settings.port = Some(port);
				}
				_ => {
					settings.options.insert(key, value);
				}
			}
		}
		settings.driver = driver
			.filter(|d| !d.is_empty())
			.ok_or_else(|| DatabaseError::Config("Missing driver 'type'".to_string()))?;
		Ok(settings)
	}

	/// The part of the settings a driver receives.
	pub fn driver_settings(&self) -> DriverSettings {
		DriverSettings {
			server: self.server.clone(),
			username: self.username.clone(),
			password: self.password.clone(),
			database: self.database.clone(),
			port: self.port,
			options: self.options.clone(),
		}
	}
}

impl fmt::Debug for ConnectionSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConnectionSettings")
			.field("driver", &self.driver)
			.field("table_prefix", &self.table_prefix)
			.field("server", &self.server)
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "***"))
			.field("database", &self.database)
			.field("port", &self.port)
			.field("options", &self.options)
			.finish()
	}
}

/// Engine parameters forwarded to a driver's `connect`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DriverSettings {
	pub server: Option<String>,
	pub username: Option<String>,
	pub password: Option<String>,
	pub database: Option<String>,
	pub port: Option<u16>,
	pub options: IndexMap<String, String>,
}

impl DriverSettings {
	pub fn option(&self, key: &str) -> Option<&str> {
		self.options.get(key).map(String::as_str)
	}
}

impl fmt::Debug for DriverSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DriverSettings")
			.field("server", &self.server)
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "***"))
			.field("database", &self.database)
			.field("port", &self.port)
			.field("options", &self.options)
			.finish()
	}
}
