//! SQL expressions
//!
//! An [`SqlExpr`] is a fragment of SQL that can be rendered safely: either a
//! template whose `%N` placeholders are replaced by escaped arguments, or a
//! raw string passed through untouched.

use quarry_core::{Arg, Value, ValueTag};

/// Marker replaced by the connection's table prefix.
pub const TABLE_PREFIX_MARKER: &str = "#__";

/// Delimiter that turns a column-list string into a raw expression.
pub const RAW_DELIMITER: char = '#';

/// What rendering needs from a connection: value escaping and the table
/// prefix.
pub trait SqlContext {
	fn escape(&self, value: &Value, tag: Option<ValueTag>) -> String;

	fn table_prefix(&self) -> &str;

	/// Replace the table-prefix marker in `name`.
	fn resolve_prefix(&self, name: &str) -> String {
		name.replace(TABLE_PREFIX_MARKER, self.table_prefix())
	}
}

/// A renderable SQL fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
	/// Template with 1-based `%N` placeholders
	Templated { query: String, args: Vec<Arg> },
	/// Text emitted verbatim
	Raw(String),
}

impl SqlExpr {
	pub fn templated(query: impl Into<String>, args: Vec<Arg>) -> Self {
		SqlExpr::Templated {
			query: query.into(),
			args,
		}
	}

	pub fn raw(text: impl Into<String>) -> Self {
		SqlExpr::Raw(text.into())
	}

	/// Append one argument to a templated expression.
	///
	/// Arguments of a raw expression are meaningless; the call leaves it
	/// unchanged.
	pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
		if let SqlExpr::Templated { args, .. } = &mut self {
			args.push(arg.into());
		}
		self
	}

	pub fn is_raw(&self) -> bool {
		matches!(self, SqlExpr::Raw(_))
	}

	/// `#text#` shorthand for a raw expression.
	///
	/// ```
	/// use quarry_db::expr::SqlExpr;
	///
	/// assert_eq!(SqlExpr::from_hash_delimited("#NOW()#"), Some(SqlExpr::raw("NOW()")));
	/// assert_eq!(SqlExpr::from_hash_delimited("##"), None);
	/// assert_eq!(SqlExpr::from_hash_delimited("name"), None);
	/// ```
	pub fn from_hash_delimited(text: &str) -> Option<SqlExpr> {
		if text.chars().count() <= 2 {
			return None;
		}
		text.strip_prefix(RAW_DELIMITER)
			.and_then(|rest| rest.strip_suffix(RAW_DELIMITER))
			.map(SqlExpr::raw)
	}

	/// Render the expression to SQL.
	///
	/// For templates the table-prefix marker is substituted first, then a
	/// single left-to-right scan replaces each `%N` (the longest run of
	/// digits after `%`) with the escaped `N`th argument. Substituted text is
	/// never scanned again, and a placeholder without a matching argument
	/// stays as written.
	pub fn render(&self, ctx: &dyn SqlContext) -> String {
		match self {
			SqlExpr::Raw(text) => text.clone(),
			SqlExpr::Templated { query, args } => {
				let query = ctx.resolve_prefix(query);
				substitute(&query, args, ctx)
			}
		}
	}
}

fn substitute(query: &str, args: &[Arg], ctx: &dyn SqlContext) -> String {
	let mut out = String::with_capacity(query.len());
	let mut rest = query;
	while let Some(pos) = rest.find('%') {
		out.push_str(&rest[..pos]);
		let after = &rest[pos + 1..];
		let digits = after.bytes().take_while(u8::is_ascii_digit).count();
		let arg = after[..digits]
			.parse::<usize>()
			.ok()
			.and_then(|n| n.checked_sub(1))
			.and_then(|i| args.get(i));
		match arg {
			Some(arg) => out.push_str(&ctx.escape(&arg.value, arg.tag)),
			None => {
				out.push('%');
				out.push_str(&after[..digits]);
			}
		}
		rest = &after[digits..];
	}
	out.push_str(rest);
	out
}

impl From<&str> for SqlExpr {
	fn from(query: &str) -> Self {
		SqlExpr::templated(query, Vec::new())
	}
}

impl From<String> for SqlExpr {
	fn from(query: String) -> Self {
		SqlExpr::templated(query, Vec::new())
	}
}

impl From<&SqlExpr> for SqlExpr {
	fn from(expr: &SqlExpr) -> Self {
		expr.clone()
	}
}

/// Build a templated [`SqlExpr`].
///
/// ```
/// use quarry_db::sql_expr;
/// use quarry_db::expr::SqlExpr;
///
/// let expr = sql_expr!("age > %1 AND name = %2", 18, "bob");
/// assert!(matches!(expr, SqlExpr::Templated { ref args, .. } if args.len() == 2));
/// ```
#[macro_export]
macro_rules! sql_expr {
	($query:expr $(,)?) => {
		$crate::expr::SqlExpr::templated($query, ::std::vec::Vec::new())
	};
	($query:expr, $($arg:expr),+ $(,)?) => {
		$crate::expr::SqlExpr::templated(
			$query,
			::std::vec![$($crate::Arg::from($arg)),+],
		)
	};
}
