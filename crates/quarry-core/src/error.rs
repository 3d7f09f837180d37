//! Error types shared by every layer of the SQL stack

use thiserror::Error;

/// Errors raised by drivers, connections, the SELECT builder and results.
///
/// Driver-level failures travel up unchanged: a [`DatabaseError::Query`]
/// produced by a driver reaches the caller of `Connection::query` or
/// `Select::exec` exactly as the driver reported it.
#[derive(Debug, Error)]
pub enum DatabaseError {
	/// Connecting to or disconnecting from the engine failed, or an
	/// operation needed a live connection and there was none.
	#[error("Connection error: {0}")]
	Connection(String),

	/// The engine rejected a statement.
	#[error("Query error{}: {message} (query: {query})", .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
	Query {
		/// Engine-native error code, when the engine reports one
		code: Option<String>,
		/// Engine-native error message
		message: String,
		/// The exact SQL text that failed
		query: String,
	},

	/// A requested column is absent from a result row.
	#[error("Field \"{0}\" does not exist")]
	FieldNotFound(String),

	/// The query being built contradicts itself (e.g. one alias bound to
	/// two different tables).
	#[error("Consistency error: {0}")]
	Consistency(String),

	/// The API was called in a way that can only be a programming mistake.
	#[error("Usage error: {0}")]
	Usage(String),

	/// No driver is registered under the requested type name.
	#[error("SQL driver '{0}' does not exist")]
	UnknownDriver(String),

	/// The driver or backend cannot perform the operation.
	#[error("Not supported: {0}")]
	NotSupported(String),

	/// A value could not be converted to the requested Rust type.
	#[error("Type mismatch: {0}")]
	TypeMismatch(String),

	/// Connection settings could not be read.
	#[error("Configuration error: {0}")]
	Config(String),

	/// A row could not be hydrated into the requested type.
	#[error("Failed to hydrate row: {0}")]
	Hydration(#[from] serde_json::Error),
}

impl DatabaseError {
	/// Build a [`DatabaseError::Query`] from its parts.
	pub fn query(
		code: Option<impl Into<String>>,
		message: impl Into<String>,
		query: impl Into<String>,
	) -> Self {
		Self::Query {
			code: code.map(Into::into),
			message: message.into(),
			query: query.into(),
		}
	}

	/// The error returned by operations that need a connected driver.
	pub fn not_connected() -> Self {
		Self::Connection("Not connected to database".to_string())
	}

	/// Whether this error was reported by the engine for a statement.
	pub fn is_query_error(&self) -> bool {
		matches!(self, Self::Query { .. })
	}
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, DatabaseError>;
