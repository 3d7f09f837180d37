//! # Quarry Core
//!
//! Engine-independent building blocks of the quarry SQL layer: the error
//! type, the value model with its escaping tags, result rows with their
//! fetch modes, and connection settings.
//!
//! Nothing in this crate performs I/O; drivers and the query builder live in
//! `quarry-db`.

pub mod error;
pub mod row;
pub mod settings;
pub mod value;

pub use error::{DatabaseError, Result};
pub use row::{FetchMode, FieldKey, Row};
pub use settings::{ConnectionSettings, DriverSettings};
pub use value::{Arg, Value, ValueTag};

pub use chrono;
