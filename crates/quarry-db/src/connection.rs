//! Connections
//!
//! A [`Connection`] owns at most one driver. It resolves the table prefix,
//! renders expressions against the driver's escaping rules and wraps the
//! driver's result handles in [`ResultSet`]s.
//!
//! Query methods take `&self` so that several result sets and builders can
//! borrow one connection at a time; the driver sits in a `RefCell`. A
//! connection is not `Sync` and must stay on one thread.

use crate::driver::{Driver, ResultHandle};
use crate::expr::{SqlContext, SqlExpr, TABLE_PREFIX_MARKER};
use crate::registry::DriverRegistry;
use crate::result::ResultSet;
use crate::select::Select;
use quarry_core::{ConnectionSettings, DatabaseError, Result, Value, ValueTag};
use std::cell::RefCell;
use std::fmt;
use tracing::{debug, warn};

/// Rendering context backed by a driver.
struct DriverContext<'a> {
	driver: &'a dyn Driver,
	prefix: &'a str,
}

impl SqlContext for DriverContext<'_> {
	fn escape(&self, value: &Value, tag: Option<ValueTag>) -> String {
		self.driver.escape(value, tag)
	}

	fn table_prefix(&self) -> &str {
		self.prefix
	}
}

/// Database connection.
///
/// # Examples
///
/// ```no_run
/// use quarry_core::ConnectionSettings;
/// use quarry_db::{Connection, sql_expr};
///
/// let settings = ConnectionSettings::mysql("localhost", "app", "secret", "shop")
/// 	.with_table_prefix("shop_");
/// let conn = Connection::open(&settings)?;
/// let mut result = conn.query(sql_expr!("SELECT name FROM #__users WHERE id = %1", 7))?;
/// let name = result.fetch_one("name")?;
/// # Ok::<(), quarry_core::DatabaseError>(())
/// ```
pub struct Connection {
	driver: RefCell<Option<Box<dyn Driver>>>,
	registry: DriverRegistry,
	table_prefix: String,
}

impl Connection {
	/// An unconnected connection using the built-in drivers.
	pub fn new() -> Self {
		Self::with_registry(DriverRegistry::default())
	}

	pub fn with_registry(registry: DriverRegistry) -> Self {
		Self {
			driver: RefCell::new(None),
			registry,
			table_prefix: String::new(),
		}
	}

	/// Connect with the built-in drivers.
	pub fn open(settings: &ConnectionSettings) -> Result<Self> {
		let mut conn = Self::new();
		conn.connect(settings)?;
		Ok(conn)
	}

	/// Wrap a driver that is already connected.
	pub fn from_driver(driver: Box<dyn Driver>) -> Self {
		let mut conn = Self::new();
		conn.attach(driver);
		conn
	}

	pub fn registry(&self) -> &DriverRegistry {
		&self.registry
	}

	pub fn registry_mut(&mut self) -> &mut DriverRegistry {
		&mut self.registry
	}

	/// Connect through the driver registered as `settings.driver`.
	///
	/// A driver already attached is disconnected first. The new driver only
	/// replaces it once it has connected.
	pub fn connect(&mut self, settings: &ConnectionSettings) -> Result<()> {
		if self.is_connected() {
			self.disconnect()?;
		}
		let mut driver = self.registry.create(&settings.driver)?;
		debug!(
			driver = %settings.driver,
			server = settings.server.as_deref().unwrap_or(""),
			database = settings.database.as_deref().unwrap_or(""),
			"Connecting"
		);
		driver.connect(&settings.driver_settings())?;
		self.table_prefix = settings.table_prefix.clone();
		*self.driver.get_mut() = Some(driver);
		Ok(())
	}

	/// Attach `driver`, dropping the current one.
	///
	/// The previous driver is disconnected; a failure to do so is logged.
	pub fn attach(&mut self, driver: Box<dyn Driver>) {
		if let Some(mut previous) = self.driver.get_mut().take()
			&& previous.is_connected()
			&& let Err(err) = previous.disconnect()
		{
			warn!(error = %err, driver = previous.name(), "Failed to disconnect replaced driver");
		}
		*self.driver.get_mut() = Some(driver);
	}

	/// Disconnect and drop the driver.
	pub fn disconnect(&mut self) -> Result<()> {
		let mut driver = self
			.driver
			.get_mut()
			.take()
			.ok_or_else(DatabaseError::not_connected)?;
		debug!(driver = driver.name(), "Disconnecting");
		driver.disconnect()
	}

	pub fn is_connected(&self) -> bool {
		self.driver
			.try_borrow()
			.map(|d| d.as_ref().is_some_and(|d| d.is_connected()))
			.unwrap_or(true)
	}

	/// Name of the attached driver.
	pub fn driver_name(&self) -> Option<&'static str> {
		self.driver
			.try_borrow()
			.ok()
			.and_then(|d| d.as_ref().map(|d| d.name()))
	}

	pub fn table_prefix(&self) -> &str {
		&self.table_prefix
	}

	pub fn set_table_prefix(&mut self, prefix: impl Into<String>) {
		self.table_prefix = prefix.into();
	}

	/// Replace the table-prefix marker in `name` and nothing else.
	///
	/// ```
	/// use quarry_db::Connection;
	///
	/// let mut conn = Connection::new();
	/// conn.set_table_prefix("app_");
	/// assert_eq!(conn.to_native_table_name("#__users"), "app_users");
	/// assert_eq!(conn.to_native_table_name("users"), "users");
	/// ```
	pub fn to_native_table_name(&self, name: &str) -> String {
		name.replace(TABLE_PREFIX_MARKER, &self.table_prefix)
	}

	/// Run `f` against the driver.
	pub(crate) fn with_driver<T>(&self, f: impl FnOnce(&mut dyn Driver) -> Result<T>) -> Result<T> {
		let mut slot = self
			.driver
			.try_borrow_mut()
			.map_err(|_| DatabaseError::Usage("Connection is already in use".to_string()))?;
		let driver = slot.as_deref_mut().ok_or_else(DatabaseError::not_connected)?;
		f(driver)
	}

	/// Run `f` with a rendering context for this connection.
	pub fn render_with<T>(&self, f: impl FnOnce(&dyn SqlContext) -> T) -> Result<T> {
		let slot = self
			.driver
			.try_borrow()
			.map_err(|_| DatabaseError::Usage("Connection is already in use".to_string()))?;
		let driver = slot.as_deref().ok_or_else(DatabaseError::not_connected)?;
		let ctx = DriverContext {
			driver,
			prefix: &self.table_prefix,
		};
		Ok(f(&ctx))
	}

	/// Escape a value with the driver's rules.
	pub fn escape(&self, value: impl Into<Value>, tag: Option<ValueTag>) -> Result<String> {
		let value = value.into();
		self.render_with(|ctx| ctx.escape(&value, tag))
	}

	/// Render an expression to native SQL.
	pub fn render(&self, expr: &SqlExpr) -> Result<String> {
		self.render_with(|ctx| expr.render(ctx))
	}

	/// Render `expr` and run it.
	pub fn query(&self, expr: impl Into<SqlExpr>) -> Result<ResultSet<'_>> {
		let sql = self.render(&expr.into())?;
		self.native_query(&sql)
	}

	/// Run native SQL text as is.
	///
	/// When the driver reports a failure the connection issues one rollback
	/// before returning the error, so no transaction is left open. A failing
	/// rollback is logged and the original error is returned.
	pub fn native_query(&self, sql: &str) -> Result<ResultSet<'_>> {
		let handle = self.with_driver(|driver| execute_or_rollback(driver, sql))?;
		Ok(ResultSet::new(self, handle))
	}

	/// A new SELECT builder bound to this connection.
	pub fn select(&self) -> Select<'_> {
		Select::new(self)
	}

	pub fn begin(&self, savepoint: Option<&str>) -> Result<()> {
		debug!(savepoint, "Begin transaction");
		self.with_driver(|driver| driver.begin(savepoint))
	}

	pub fn commit(&self, savepoint: Option<&str>) -> Result<()> {
		debug!(savepoint, "Commit transaction");
		self.with_driver(|driver| driver.commit(savepoint))
	}

	pub fn rollback(&self, savepoint: Option<&str>) -> Result<()> {
		debug!(savepoint, "Rollback transaction");
		self.with_driver(|driver| driver.rollback(savepoint))
	}

	pub fn last_insert_id(&self, sequence: Option<&str>) -> Result<u64> {
		self.with_driver(|driver| driver.last_insert_id(sequence))
	}
}

fn execute_or_rollback(driver: &mut dyn Driver, sql: &str) -> Result<ResultHandle> {
	debug!(driver = driver.name(), sql = %sql, "Executing query");
	driver.native_query(sql).inspect_err(|err| {
		debug!(error = %err, "Query failed, rolling back");
		if let Err(rollback_err) = driver.rollback(None) {
			warn!(error = %rollback_err, "Rollback after failed query failed");
		}
	})
}

impl Default for Connection {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		if let Some(mut driver) = self.driver.get_mut().take()
			&& driver.is_connected()
			&& let Err(err) = driver.disconnect()
		{
			warn!(error = %err, driver = driver.name(), "Failed to disconnect on drop");
		}
	}
}

impl fmt::Debug for Connection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Connection")
			.field("driver", &self.driver_name())
			.field("connected", &self.is_connected())
			.field("table_prefix", &self.table_prefix)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql_expr;
	use crate::testing::{DriverCall, RecordingDriver};
	use rstest::{fixture, rstest};

	#[fixture]
	fn driver() -> RecordingDriver {
		RecordingDriver::new()
	}

	#[rstest]
	fn test_query_renders_prefix_and_arguments(driver: RecordingDriver) {
		// Arrange
		let log = driver.log();
		let mut conn = Connection::from_driver(Box::new(driver));
		conn.set_table_prefix("app_");

		// Act
		conn.query(sql_expr!("SELECT * FROM #__users WHERE name = %1", "o'neil"))
			.unwrap();

		// Assert
		assert_eq!(
			log.queries(),
			vec!["SELECT * FROM app_users WHERE name = 'o''neil'".to_string()]
		);
	}

	#[rstest]
	fn test_failed_query_rolls_back_once(driver: RecordingDriver) {
		// Arrange
		let log = driver.log();
		driver.fail_on("BROKEN");
		let conn = Connection::from_driver(Box::new(driver));

		// Act
		let result = conn.native_query("BROKEN SQL");

		// Assert
		assert!(matches!(result, Err(DatabaseError::Query { ref query, .. }) if query == "BROKEN SQL"));
		assert_eq!(
			log.calls(),
			vec![
				DriverCall::NativeQuery("BROKEN SQL".to_string()),
				DriverCall::Rollback(None),
			]
		);
	}

	#[rstest]
	fn test_failed_rollback_keeps_query_error(driver: RecordingDriver) {
		// Arrange
		driver.fail_on("BROKEN");
		driver.fail_rollback(true);
		let conn = Connection::from_driver(Box::new(driver));

		// Act
		let result = conn.native_query("BROKEN");

		// Assert
		assert!(matches!(result, Err(DatabaseError::Query { .. })));
	}

	#[rstest]
	fn test_successful_query_does_not_roll_back(driver: RecordingDriver) {
		// Arrange
		let log = driver.log();
		let conn = Connection::from_driver(Box::new(driver));

		// Act
		conn.native_query("SELECT 1").unwrap();

		// Assert
		assert!(!log.calls().contains(&DriverCall::Rollback(None)));
	}

	#[rstest]
	fn test_unconnected_connection() {
		// Arrange
		let conn = Connection::with_registry(DriverRegistry::empty());

		// Act
		let result = conn.native_query("SELECT 1");

		// Assert
		assert!(matches!(result, Err(DatabaseError::Connection(_))));
		assert!(!conn.is_connected());
		assert_eq!(conn.driver_name(), None);
	}

	#[rstest]
	fn test_connect_unknown_driver() {
		// Arrange
		let mut conn = Connection::with_registry(DriverRegistry::empty());
		let settings = ConnectionSettings::new("nosuch");

		// Act
		let result = conn.connect(&settings);

		// Assert
		assert!(matches!(result, Err(DatabaseError::UnknownDriver(_))));
	}

	#[rstest]
	fn test_connect_replaces_driver_and_prefix() {
		// Arrange
		let first = RecordingDriver::new();
		let first_log = first.log();
		let mut registry = DriverRegistry::empty();
		registry.register("recording", || Box::new(RecordingDriver::new()));
		let mut conn = Connection::with_registry(registry);
		conn.attach(Box::new(first));
		let settings = ConnectionSettings::new("recording").with_table_prefix("p_");

		// Act
		conn.connect(&settings).unwrap();

		// Assert
		assert!(first_log.calls().contains(&DriverCall::Disconnect));
		assert_eq!(conn.table_prefix(), "p_");
		assert_eq!(conn.driver_name(), Some("recording"));
		assert!(conn.is_connected());
	}

	#[rstest]
	fn test_transactions_delegate(driver: RecordingDriver) {
		// Arrange
		let log = driver.log();
		let conn = Connection::from_driver(Box::new(driver));

		// Act
		conn.begin(None).unwrap();
		conn.begin(Some("sp")).unwrap();
		conn.rollback(Some("sp")).unwrap();
		conn.commit(None).unwrap();

		// Assert
		assert_eq!(
			log.calls(),
			vec![
				DriverCall::Begin(None),
				DriverCall::Begin(Some("sp".to_string())),
				DriverCall::Rollback(Some("sp".to_string())),
				DriverCall::Commit(None),
			]
		);
	}

	#[rstest]
	fn test_escape_through_connection(driver: RecordingDriver) {
		let conn = Connection::from_driver(Box::new(driver));
		assert_eq!(conn.escape("x", Some(ValueTag::Field)).unwrap(), "`x`");
		assert_eq!(conn.escape(3, None).unwrap(), "3");
	}
}
