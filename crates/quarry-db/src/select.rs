//! SELECT query builder
//!
//! [`Select`] accumulates the clauses of one SELECT statement and renders
//! them in the fixed clause order:
//!
//! ```text
//! SELECT [DISTINCT] <fields> [FROM <tables>] [<joins>] [WHERE <cond>]
//!     [GROUP BY <cols>] [HAVING <cond>] [ORDER BY <cols>] [LIMIT n [OFFSET m]]
//! ```
//!
//! Builder calls mutate the builder and return it for chaining. Clauses are
//! only ever added, and [`Select::render`] can be called at any point.
//!
//! ## Tables and fields
//!
//! Each table is registered under its alias (its native name when no alias
//! is given). Declaring an alias again with the same table merges the new
//! fields into it; declaring it for a different table is an error.
//!
//! Fields render in the order they were added, across all tables. When more
//! than one named table takes part, every column name is qualified with its
//! table's alias. Expression fields are left as written.
//!
//! ```
//! use quarry_db::{sql_expr, Connection};
//! use quarry_db::testing::RecordingDriver;
//!
//! let mut conn = Connection::from_driver(Box::new(RecordingDriver::new()));
//! conn.set_table_prefix("app_");
//!
//! let mut select = conn.select();
//! select
//! 	.from("#__users", ["id", "name"])?
//! 	.where_(sql_expr!("age > %1", 18))
//! 	.order("name")
//! 	.limit(5, None);
//!
//! assert_eq!(
//! 	select.render()?,
//! 	"SELECT `id`, `name` FROM `app_users` WHERE age > 18 ORDER BY `name` ASC LIMIT 5"
//! );
//! # Ok::<(), quarry_core::DatabaseError>(())
//! ```

use crate::connection::Connection;
use crate::expr::{SqlContext, SqlExpr};
use crate::result::ResultSet;
use once_cell::sync::Lazy;
use quarry_core::{DatabaseError, Result, Value, ValueTag};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

static ORDER_DIRECTION: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"(?is)^(.*?)\s+(ASC|DESC)$").expect("order direction pattern is valid")
});

/// A column reference: an identifier or an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
	/// Identifier, optionally dotted (`table.column`)
	Name(String),
	Expr(SqlExpr),
}

impl FieldRef {
	/// Interpret a column-list string.
	///
	/// `#...#` strings become raw expressions, anything else an identifier.
	pub fn parse(text: &str) -> Self {
		match SqlExpr::from_hash_delimited(text) {
			Some(expr) => FieldRef::Expr(expr),
			None => FieldRef::Name(text.to_string()),
		}
	}
}

/// One entry of a column list, with an optional output alias.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
	pub field: FieldRef,
	pub alias: Option<String>,
}

impl FieldSpec {
	pub fn new(field: FieldRef) -> Self {
		Self { field, alias: None }
	}

	pub fn aliased(alias: impl Into<String>, field: impl Into<FieldSpec>) -> Self {
		Self {
			alias: Some(alias.into()),
			..field.into()
		}
	}
}

impl From<&str> for FieldSpec {
	fn from(text: &str) -> Self {
		Self::new(FieldRef::parse(text))
	}
}

impl From<String> for FieldSpec {
	fn from(text: String) -> Self {
		Self::new(FieldRef::parse(&text))
	}
}

impl From<SqlExpr> for FieldSpec {
	fn from(expr: SqlExpr) -> Self {
		Self::new(FieldRef::Expr(expr))
	}
}

/// `(alias, column)`
impl From<(&str, &str)> for FieldSpec {
	fn from((alias, field): (&str, &str)) -> Self {
		Self::aliased(alias, field)
	}
}

/// `(alias, expression)`
impl From<(&str, SqlExpr)> for FieldSpec {
	fn from((alias, expr): (&str, SqlExpr)) -> Self {
		Self::aliased(alias, expr)
	}
}

/// Anything that reads as a column list.
///
/// `()` is the empty list. Single fields, arrays, vectors and slices of
/// field specs all qualify; mixed lists are easiest to write with
/// [`fields!`](crate::fields).
pub trait IntoFields {
	fn into_fields(self) -> Vec<FieldSpec>;
}

impl IntoFields for () {
	fn into_fields(self) -> Vec<FieldSpec> {
		Vec::new()
	}
}

impl IntoFields for FieldSpec {
	fn into_fields(self) -> Vec<FieldSpec> {
		vec![self]
	}
}

impl IntoFields for &str {
	fn into_fields(self) -> Vec<FieldSpec> {
		vec![self.into()]
	}
}

impl IntoFields for String {
	fn into_fields(self) -> Vec<FieldSpec> {
		vec![self.into()]
	}
}

impl IntoFields for SqlExpr {
	fn into_fields(self) -> Vec<FieldSpec> {
		vec![self.into()]
	}
}

impl IntoFields for (&str, &str) {
	fn into_fields(self) -> Vec<FieldSpec> {
		vec![self.into()]
	}
}

impl IntoFields for (&str, SqlExpr) {
	fn into_fields(self) -> Vec<FieldSpec> {
		vec![self.into()]
	}
}

impl<T: Into<FieldSpec>, const N: usize> IntoFields for [T; N] {
	fn into_fields(self) -> Vec<FieldSpec> {
		self.into_iter().map(Into::into).collect()
	}
}

impl<T: Into<FieldSpec>> IntoFields for Vec<T> {
	fn into_fields(self) -> Vec<FieldSpec> {
		self.into_iter().map(Into::into).collect()
	}
}

impl<T: Into<FieldSpec> + Clone> IntoFields for &[T] {
	fn into_fields(self) -> Vec<FieldSpec> {
		self.iter().cloned().map(Into::into).collect()
	}
}

/// Build a mixed column list.
///
/// ```
/// use quarry_db::{fields, sql_expr};
/// use quarry_db::select::FieldSpec;
///
/// let list: Vec<FieldSpec> = fields!["id", ("full_name", "name"), sql_expr!("COUNT(*)")];
/// assert_eq!(list.len(), 3);
/// assert_eq!(list[1].alias.as_deref(), Some("full_name"));
/// ```
#[macro_export]
macro_rules! fields {
	($($field:expr),* $(,)?) => {
		::std::vec![$($crate::select::FieldSpec::from($field)),*]
	};
}

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
	pub name: String,
	pub alias: Option<String>,
}

impl TableSpec {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			alias: None,
		}
	}

	pub fn aliased(alias: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			alias: Some(alias.into()),
		}
	}

	/// Build from an `{alias: name}` map, which must hold exactly one entry.
	pub fn try_from_map<I, K, V>(map: I) -> Result<Self>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut entries = map.into_iter();
		match (entries.next(), entries.next()) {
			(Some((alias, name)), None) => Ok(Self::aliased(alias, name)),
			(None, _) => Err(DatabaseError::Usage("Empty table alias map".to_string())),
			(Some(_), Some(_)) => Err(DatabaseError::Usage(
				"Table alias map must contain exactly one entry".to_string(),
			)),
		}
	}
}

impl From<&str> for TableSpec {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for TableSpec {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}

/// `(alias, table)`
impl From<(&str, &str)> for TableSpec {
	fn from((alias, name): (&str, &str)) -> Self {
		Self::aliased(alias, name)
	}
}

/// Join flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
	Inner,
	Left,
	Right,
	FullOuter,
	Natural,
	Cross,
}

impl JoinKind {
	pub fn keyword(self) -> &'static str {
		match self {
			JoinKind::Inner => "INNER",
			JoinKind::Left => "LEFT",
			JoinKind::Right => "RIGHT",
			JoinKind::FullOuter => "FULL OUTER",
			JoinKind::Natural => "NATURAL",
			JoinKind::Cross => "CROSS",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
enum JoinPredicate {
	None,
	On(SqlExpr),
	Using(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
enum TableRole {
	/// Holder of table-less columns
	Detached,
	From,
	Join(JoinKind, JoinPredicate),
}

#[derive(Debug, Clone)]
struct FieldInfo {
	order: u64,
	field: FieldRef,
	alias: Option<String>,
}

#[derive(Debug, Clone)]
struct TableInfo {
	name: String,
	alias: String,
	role: TableRole,
	fields: Vec<FieldInfo>,
}

#[derive(Debug, Clone, PartialEq)]
enum OrderItem {
	Column { field: FieldRef, descending: bool },
	Expr(SqlExpr),
}

/// SELECT statement under construction.
///
/// Holds the connection it was created from, which supplies escaping, the
/// table prefix and execution.
#[derive(Clone)]
pub struct Select<'c> {
	conn: &'c Connection,
	distinct: bool,
	tables: Vec<TableInfo>,
	aliases: HashMap<String, usize>,
	named_tables: usize,
	next_field: u64,
	where_: Vec<SqlExpr>,
	group: Vec<FieldRef>,
	having: Vec<SqlExpr>,
	order: Vec<OrderItem>,
	limit: Option<(u64, Option<u64>)>,
}

impl<'c> Select<'c> {
	pub fn new(conn: &'c Connection) -> Self {
		Self {
			conn,
			distinct: false,
			tables: Vec::new(),
			aliases: HashMap::new(),
			named_tables: 0,
			next_field: 0,
			where_: Vec::new(),
			group: Vec::new(),
			having: Vec::new(),
			order: Vec::new(),
			limit: None,
		}
	}

	pub fn distinct(&mut self) -> &mut Self {
		self.distinct = true;
		self
	}

	/// Select `fields` from `table`.
	///
	/// An empty field list selects `*`.
	pub fn from(&mut self, table: impl Into<TableSpec>, fields: impl IntoFields) -> Result<&mut Self> {
		let mut fields = fields.into_fields();
		if fields.is_empty() {
			fields.push(FieldSpec::from("*"));
		}
		self.register(table.into(), TableRole::From, fields)?;
		Ok(self)
	}

	/// Alias of [`Select::join_inner`].
	pub fn join(
		&mut self,
		table: impl Into<TableSpec>,
		condition: impl Into<SqlExpr>,
		fields: impl IntoFields,
	) -> Result<&mut Self> {
		self.join_inner(table, condition, fields)
	}

	pub fn join_inner(
		&mut self,
		table: impl Into<TableSpec>,
		condition: impl Into<SqlExpr>,
		fields: impl IntoFields,
	) -> Result<&mut Self> {
		self.add_join(JoinKind::Inner, table, JoinPredicate::On(condition.into()), fields)
	}

	pub fn join_left(
		&mut self,
		table: impl Into<TableSpec>,
		condition: impl Into<SqlExpr>,
		fields: impl IntoFields,
	) -> Result<&mut Self> {
		self.add_join(JoinKind::Left, table, JoinPredicate::On(condition.into()), fields)
	}

	pub fn join_right(
		&mut self,
		table: impl Into<TableSpec>,
		condition: impl Into<SqlExpr>,
		fields: impl IntoFields,
	) -> Result<&mut Self> {
		self.add_join(JoinKind::Right, table, JoinPredicate::On(condition.into()), fields)
	}

	/// `FULL OUTER JOIN ... ON`
	pub fn join_outer(
		&mut self,
		table: impl Into<TableSpec>,
		condition: impl Into<SqlExpr>,
		fields: impl IntoFields,
	) -> Result<&mut Self> {
		self.add_join(JoinKind::FullOuter, table, JoinPredicate::On(condition.into()), fields)
	}

	pub fn join_natural(&mut self, table: impl Into<TableSpec>, fields: impl IntoFields) -> Result<&mut Self> {
		self.add_join(JoinKind::Natural, table, JoinPredicate::None, fields)
	}

	pub fn join_cross(&mut self, table: impl Into<TableSpec>, fields: impl IntoFields) -> Result<&mut Self> {
		self.add_join(JoinKind::Cross, table, JoinPredicate::None, fields)
	}

	/// Alias of [`Select::join_inner_using`].
	pub fn join_using<I, S>(
		&mut self,
		table: impl Into<TableSpec>,
		columns: I,
		fields: impl IntoFields,
	) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.join_inner_using(table, columns, fields)
	}

	pub fn join_inner_using<I, S>(
		&mut self,
		table: impl Into<TableSpec>,
		columns: I,
		fields: impl IntoFields,
	) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.add_join(JoinKind::Inner, table, using(columns), fields)
	}

	pub fn join_left_using<I, S>(
		&mut self,
		table: impl Into<TableSpec>,
		columns: I,
		fields: impl IntoFields,
	) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.add_join(JoinKind::Left, table, using(columns), fields)
	}

	pub fn join_right_using<I, S>(
		&mut self,
		table: impl Into<TableSpec>,
		columns: I,
		fields: impl IntoFields,
	) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.add_join(JoinKind::Right, table, using(columns), fields)
	}

	/// `FULL OUTER JOIN ... USING`
	pub fn join_outer_using<I, S>(
		&mut self,
		table: impl Into<TableSpec>,
		columns: I,
		fields: impl IntoFields,
	) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.add_join(JoinKind::FullOuter, table, using(columns), fields)
	}

	/// Add fields that belong to no table, such as `NOW()`.
	///
	/// Bare strings are taken as SQL expressions rather than identifiers,
	/// and these fields are never qualified with a table.
	pub fn column(&mut self, fields: impl IntoFields) -> &mut Self {
		let fields = fields
			.into_fields()
			.into_iter()
			.map(|spec| match spec.field {
				FieldRef::Name(text) => FieldSpec {
					field: FieldRef::Expr(SqlExpr::from(text)),
					alias: spec.alias,
				},
				FieldRef::Expr(_) => spec,
			})
			.collect();
		let index = self.table_index(String::new(), String::new(), TableRole::Detached);
		self.add_fields(index, fields);
		self
	}

	/// Add a WHERE condition; conditions are joined with `AND`.
	pub fn where_(&mut self, condition: impl Into<SqlExpr>) -> &mut Self {
		self.where_.push(condition.into());
		self
	}

	/// Add a HAVING condition; conditions are joined with `AND`.
	pub fn having(&mut self, condition: impl Into<SqlExpr>) -> &mut Self {
		self.having.push(condition.into());
		self
	}

	/// Add GROUP BY columns. Aliases in the list are ignored.
	pub fn group(&mut self, columns: impl IntoFields) -> &mut Self {
		self.group
			.extend(columns.into_fields().into_iter().map(|spec| spec.field));
		self
	}

	/// Add ORDER BY columns.
	///
	/// A trailing `ASC` or `DESC` (any case) on a column sets its direction,
	/// which defaults to ascending. Expressions are used as given.
	pub fn order(&mut self, columns: impl IntoFields) -> &mut Self {
		for spec in columns.into_fields() {
			let item = match spec.field {
				FieldRef::Expr(expr) => OrderItem::Expr(expr),
				FieldRef::Name(text) => match ORDER_DIRECTION.captures(&text) {
					Some(caps) => OrderItem::Column {
						field: FieldRef::parse(caps[1].trim()),
						descending: caps[2].eq_ignore_ascii_case("DESC"),
					},
					None => OrderItem::Column {
						field: FieldRef::Name(text),
						descending: false,
					},
				},
			};
			self.order.push(item);
		}
		self
	}

	/// Set the row cap and offset. The last call wins.
	pub fn limit(&mut self, count: u64, offset: Option<u64>) -> &mut Self {
		self.limit = Some((count, offset));
		self
	}

	/// Render the statement to native SQL.
	pub fn render(&self) -> Result<String> {
		self.conn.render_with(|ctx| self.render_in(ctx))
	}

	/// Render and run the statement.
	pub fn exec(&self) -> Result<ResultSet<'c>> {
		let sql = self.render()?;
		self.conn.native_query(&sql)
	}

	fn add_join(
		&mut self,
		kind: JoinKind,
		table: impl Into<TableSpec>,
		predicate: JoinPredicate,
		fields: impl IntoFields,
	) -> Result<&mut Self> {
		self.register(table.into(), TableRole::Join(kind, predicate), fields.into_fields())?;
		Ok(self)
	}

	fn register(&mut self, table: TableSpec, role: TableRole, fields: Vec<FieldSpec>) -> Result<()> {
		let name = self.conn.to_native_table_name(&table.name);
		let alias = match table.alias {
			Some(alias) => alias,
			None => name.clone(),
		};
		let conflict = self
			.aliases
			.get(&alias)
			.is_some_and(|&index| self.tables[index].name != name);
		if conflict {
			return Err(DatabaseError::Consistency(format!(
				"Alias '{}' already exists",
				alias
			)));
		}
		let index = self.table_index(name, alias, role);
		self.add_fields(index, fields);
		Ok(())
	}

	/// Index of the table registered as `alias`, creating it if needed.
	fn table_index(&mut self, name: String, alias: String, role: TableRole) -> usize {
		if let Some(&index) = self.aliases.get(&alias) {
			return index;
		}
		if !name.is_empty() {
			self.named_tables += 1;
		}
		let index = self.tables.len();
		self.aliases.insert(alias.clone(), index);
		self.tables.push(TableInfo {
			name,
			alias,
			role,
			fields: Vec::new(),
		});
		index
	}

	fn add_fields(&mut self, index: usize, fields: Vec<FieldSpec>) {
		for spec in fields {
			let info = FieldInfo {
				order: self.next_field,
				field: spec.field,
				alias: spec.alias,
			};
			self.next_field += 1;
			let table = &mut self.tables[index];
			// An alias names one output column per table
			match info
				.alias
				.as_ref()
				.and_then(|a| table.fields.iter().position(|f| f.alias.as_ref() == Some(a)))
			{
				Some(existing) => table.fields[existing] = info,
				None => table.fields.push(info),
			}
		}
	}

	fn qualify_fields(&self) -> bool {
		self.named_tables > 1
	}

	fn render_in(&self, ctx: &dyn SqlContext) -> String {
		let mut sql = String::from("SELECT");
		if self.distinct {
			sql.push_str(" DISTINCT");
		}
		sql.push(' ');
		sql.push_str(&self.render_fields(ctx));
		self.render_from(ctx, &mut sql);
		self.render_joins(ctx, &mut sql);
		if !self.where_.is_empty() {
			sql.push_str(" WHERE ");
			sql.push_str(&render_conditions(ctx, &self.where_));
		}
		if !self.group.is_empty() {
			let group: Vec<String> = self.group.iter().map(|f| render_field_ref(ctx, f)).collect();
			sql.push_str(" GROUP BY ");
			sql.push_str(&group.join(", "));
		}
		if !self.having.is_empty() {
			sql.push_str(" HAVING ");
			sql.push_str(&render_conditions(ctx, &self.having));
		}
		if !self.order.is_empty() {
			let order: Vec<String> = self
				.order
				.iter()
				.map(|item| match item {
					OrderItem::Expr(expr) => expr.render(ctx),
					OrderItem::Column { field, descending } => format!(
						"{} {}",
						render_field_ref(ctx, field),
						if *descending { "DESC" } else { "ASC" }
					),
				})
				.collect();
			sql.push_str(" ORDER BY ");
			sql.push_str(&order.join(", "));
		}
		if let Some((count, offset)) = self.limit {
			sql.push_str(&format!(" LIMIT {}", count));
			if let Some(offset) = offset {
				sql.push_str(&format!(" OFFSET {}", offset));
			}
		}
		sql
	}

	fn render_fields(&self, ctx: &dyn SqlContext) -> String {
		let qualify = self.qualify_fields();
		let mut fields: Vec<(u64, Option<&str>, &FieldInfo)> = self
			.tables
			.iter()
			.flat_map(|table| {
				let owner = (qualify && table.role != TableRole::Detached).then_some(table.alias.as_str());
				// Expressions and dotted names carry their own references
				table.fields.iter().map(move |f| {
					let owner = owner.filter(|_| matches!(&f.field, FieldRef::Name(name) if !name.contains('.')));
					(f.order, owner, f)
				})
			})
			.collect();
		fields.sort_by_key(|(order, _, _)| *order);
		fields
			.into_iter()
			.map(|(_, owner, info)| {
				let mut out = String::new();
				if let Some(owner) = owner {
					out.push_str(&escape_ident(ctx, owner, ValueTag::Table));
					out.push('.');
				}
				out.push_str(&render_field_ref(ctx, &info.field));
				if let Some(alias) = &info.alias {
					out.push_str(" AS ");
					out.push_str(&escape_ident(ctx, alias, ValueTag::Field));
				}
				out
			})
			.collect::<Vec<_>>()
			.join(", ")
	}

	fn render_from(&self, ctx: &dyn SqlContext, sql: &mut String) {
		let from: Vec<String> = self
			.tables
			.iter()
			.filter(|t| t.role == TableRole::From)
			.map(|t| render_table(ctx, t))
			.collect();
		if !from.is_empty() {
			sql.push_str(" FROM ");
			sql.push_str(&from.join(", "));
		}
	}

	fn render_joins(&self, ctx: &dyn SqlContext, sql: &mut String) {
		for table in &self.tables {
			let TableRole::Join(kind, predicate) = &table.role else {
				continue;
			};
			sql.push(' ');
			sql.push_str(kind.keyword());
			sql.push_str(" JOIN ");
			sql.push_str(&render_table(ctx, table));
			match predicate {
				JoinPredicate::None => {}
				JoinPredicate::On(condition) => {
					sql.push_str(" ON ");
					sql.push_str(&condition.render(ctx));
				}
				JoinPredicate::Using(columns) => {
					let columns: Vec<String> = columns
						.iter()
						.map(|c| escape_ident(ctx, c, ValueTag::Field))
						.collect();
					sql.push_str(" USING (");
					sql.push_str(&columns.join(", "));
					sql.push(')');
				}
			}
		}
	}
}

fn using<I, S>(columns: I) -> JoinPredicate
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	JoinPredicate::Using(columns.into_iter().map(Into::into).collect())
}

fn escape_ident(ctx: &dyn SqlContext, name: &str, tag: ValueTag) -> String {
	ctx.escape(&Value::Text(name.to_string()), Some(tag))
}

fn render_table(ctx: &dyn SqlContext, table: &TableInfo) -> String {
	let mut out = escape_ident(ctx, &table.name, ValueTag::Table);
	if table.alias != table.name {
		out.push_str(" AS ");
		out.push_str(&escape_ident(ctx, &table.alias, ValueTag::Table));
	}
	out
}

/// Escape an identifier, part by part when dotted.
///
/// Leading parts name tables and go through prefix resolution; a trailing
/// `*` stays bare.
fn render_field_ref(ctx: &dyn SqlContext, field: &FieldRef) -> String {
	let name = match field {
		FieldRef::Expr(expr) => return expr.render(ctx),
		FieldRef::Name(name) => name,
	};
	let mut parts: Vec<&str> = name.split('.').collect();
	let column = parts.pop().unwrap_or_default();
	let mut out: Vec<String> = parts
		.into_iter()
		.map(|table| escape_ident(ctx, &ctx.resolve_prefix(table), ValueTag::Table))
		.collect();
	out.push(if column == "*" {
		column.to_string()
	} else {
		escape_ident(ctx, column, ValueTag::Field)
	});
	out.join(".")
}

fn render_conditions(ctx: &dyn SqlContext, conditions: &[SqlExpr]) -> String {
	let rendered: Vec<String> = conditions.iter().map(|c| c.render(ctx)).collect();
	if rendered.len() > 1 {
		rendered
			.iter()
			.map(|c| format!("({})", c))
			.collect::<Vec<_>>()
			.join(" AND ")
	} else {
		rendered.join(" AND ")
	}
}

impl fmt::Debug for Select<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Select")
			.field("distinct", &self.distinct)
			.field("tables", &self.tables)
			.field("where", &self.where_)
			.field("group", &self.group)
			.field("having", &self.having)
			.field("order", &self.order)
			.field("limit", &self.limit)
			.finish()
	}
}
