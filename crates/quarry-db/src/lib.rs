//! # Quarry Database
//!
//! Connections, drivers and the SELECT builder of the quarry SQL layer.
//!
//! ## Modules
//!
//! - **`expr`**: templated and raw SQL expressions
//! - **`driver`**: the capability trait every engine implements
//! - **`drivers`**: the built-in MySQL and SQLite drivers
//! - **`connection`**: prefix resolution, rendering and transactions
//! - **`select`**: the SELECT statement builder
//! - **`result`** / **`iter`**: fetching rows from a query
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry_db::prelude::*;
//!
//! let settings = ConnectionSettings::sqlite("shop.db").with_table_prefix("shop_");
//! let conn = Connection::open(&settings)?;
//!
//! let mut select = conn.select();
//! select
//! 	.from(("u", "#__users"), ["id", "name"])?
//! 	.where_(sql_expr!("u.age > %1", 18))
//! 	.order("name DESC");
//!
//! let mut result = select.exec()?;
//! for row in result.iter(FetchMode::Assoc)? {
//! 	let row = row?;
//! 	println!("{:?}", row.get("name"));
//! }
//! # Ok::<(), DatabaseError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `mysql` (default): MySQL driver
//! - `sqlite` (default): SQLite driver
//! - `testing`: the recording in-process driver in [`testing`]

pub mod buffer;
pub mod connection;
pub mod driver;
pub mod drivers;
pub mod expr;
pub mod iter;
pub mod registry;
pub mod result;
pub mod select;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use connection::Connection;
pub use driver::{Driver, ResultHandle};
pub use expr::{SqlContext, SqlExpr};
pub use iter::ResultIter;
pub use registry::DriverRegistry;
pub use result::ResultSet;
pub use select::{FieldSpec, IntoFields, JoinKind, Select, TableSpec};

pub use quarry_core::{
	Arg, ConnectionSettings, DatabaseError, DriverSettings, FetchMode, FieldKey, Result, Row,
	Value, ValueTag,
};

/// Prelude module for convenient imports
pub mod prelude {
	pub use crate::{
		Arg, Connection, ConnectionSettings, DatabaseError, Driver, FetchMode, FieldKey,
		FieldSpec, Result, ResultSet, Row, Select, SqlExpr, TableSpec, Value, ValueTag, fields,
		sql_expr,
	};
}
