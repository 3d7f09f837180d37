//! # Quarry
//!
//! A database-agnostic SQL layer: expressions rendered safely against the
//! active driver's escaping rules, a SELECT builder and pluggable drivers.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`core`]: errors, values, rows and connection settings
//! - [`db`]: connections, drivers, expressions, the SELECT builder and results
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use quarry::prelude::*;
//!
//! let settings = ConnectionSettings::from_toml_str(
//! 	r#"
//! 	type = "mysql"
//! 	prefix = "shop_"
//! 	server = "localhost"
//! 	username = "shop"
//! 	password = "secret"
//! 	database = "shop"
//! 	"#,
//! )?;
//! let conn = Connection::open(&settings)?;
//!
//! let mut select = conn.select();
//! select
//! 	.from("#__products", fields!["id", ("title", "name")])?
//! 	.where_(sql_expr!("price < %1", 10.5))
//! 	.order("name");
//!
//! let titles = select.exec()?.fetch_pairs("id", "title")?;
//! # Ok::<(), DatabaseError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `mysql` (default): MySQL driver
//! - `sqlite` (default): SQLite driver
//! - `testing`: recording in-process driver for tests

pub use quarry_core as core;
pub use quarry_db as db;

pub use quarry_core::{
	Arg, ConnectionSettings, DatabaseError, DriverSettings, FetchMode, FieldKey, Result, Row,
	Value, ValueTag,
};
pub use quarry_db::{
	Connection, Driver, DriverRegistry, ResultHandle, ResultIter, ResultSet, Select, SqlExpr,
	fields, sql_expr,
};

/// Prelude module for convenient imports
pub mod prelude {
	pub use quarry_db::prelude::*;
}
