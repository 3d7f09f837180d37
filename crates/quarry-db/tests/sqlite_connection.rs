//! Connection, builder and result behavior against an in-memory SQLite
//! database.

#![cfg(feature = "sqlite")]

use chrono::{NaiveDate, NaiveTime};
use quarry_db::prelude::*;
use rstest::{fixture, rstest};
use serde::Deserialize;

#[fixture]
fn conn() -> Connection {
	let settings = ConnectionSettings::sqlite(":memory:").with_table_prefix("app_");
	let conn = Connection::open(&settings).unwrap();
	conn.query("CREATE TABLE #__users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)")
		.unwrap();
	conn.query(
		"CREATE TABLE #__orders (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, total REAL NOT NULL)",
	)
	.unwrap();
	for (name, age) in [("alice", 34), ("bob", 17), ("carol", 25), ("dave", 41)] {
		conn.query(sql_expr!(
			"INSERT INTO #__users (name, age) VALUES (%1, %2)",
			name,
			age
		))
		.unwrap();
	}
	conn.query("INSERT INTO #__orders (user_id, total) VALUES (1, 12.5), (1, 7.5), (3, 40.0)")
		.unwrap();
	conn
}

fn user_count(conn: &Connection) -> i64 {
	conn.query("SELECT COUNT(*) AS n FROM #__users")
		.unwrap()
		.fetch_one("n")
		.unwrap()
		.map(|v| v.to_int())
		.unwrap()
}

#[rstest]
fn test_builder_query_returns_filtered_rows(conn: Connection) {
	// Arrange
	let mut select = conn.select();
	select
		.from("#__users", ["id", "name"])
		.unwrap()
		.where_(sql_expr!("age > %1", 18))
		.order("name DESC")
		.limit(2, None);

	// Act
	let mut result = select.exec().unwrap();
	let names = result.fetch_column("name").unwrap();

	// Assert
	assert_eq!(
		select.render().unwrap(),
		"SELECT \"id\", \"name\" FROM \"app_users\" WHERE age > 18 ORDER BY \"name\" DESC LIMIT 2"
	);
	assert_eq!(names, vec![Value::from("dave"), Value::from("carol")]);
}

#[rstest]
fn test_join_with_aggregate(conn: Connection) {
	// Arrange
	let mut select = conn.select();
	select
		.from(("u", "#__users"), "name")
		.unwrap()
		.join_left(
			("o", "#__orders"),
			"o.user_id = u.id",
			("spent", sql_expr!("COALESCE(SUM(o.total), 0)")),
		)
		.unwrap()
		.group("u.name")
		.having(sql_expr!("COUNT(o.id) > %1", 0))
		.order("u.name");

	// Act
	let mut result = select.exec().unwrap();
	let totals = result.fetch_pairs("name", "spent").unwrap();

	// Assert
	assert_eq!(totals.len(), 2);
	assert_eq!(totals.get("alice"), Some(&Value::Float(20.0)));
	assert_eq!(totals.get("carol"), Some(&Value::Float(40.0)));
}

#[rstest]
fn test_text_arguments_are_escaped(conn: Connection) {
	// Arrange
	let name = "O'Brien\"; DROP TABLE app_users; --";

	// Act
	conn.query(sql_expr!(
		"INSERT INTO #__users (name, age) VALUES (%1, %2)",
		name,
		Option::<i64>::None
	))
	.unwrap();
	let mut result = conn
		.query(sql_expr!("SELECT name, age FROM #__users WHERE name = %1", name))
		.unwrap();
	let row = result.fetch_assoc().unwrap().unwrap();

	// Assert
	assert_eq!(row.get("name"), Some(&Value::from(name)));
	assert_eq!(row.get("age"), Some(&Value::Null));
	assert_eq!(user_count(&conn), 5);
}

#[rstest]
fn test_insert_reports_affected_rows_and_id(conn: Connection) {
	// Act
	let result = conn
		.query(sql_expr!("INSERT INTO #__users (name, age) VALUES (%1, %2)", "erin", 29))
		.unwrap();

	// Assert
	assert_eq!(result.affected_rows().unwrap(), 1);
	assert_eq!(conn.last_insert_id(None).unwrap(), 5);
}

#[rstest]
fn test_rows_deserialize_into_structs(conn: Connection) {
	#[derive(Debug, Deserialize, PartialEq)]
	struct User {
		id: i64,
		name: String,
		age: Option<i64>,
	}

	// Arrange
	let mut select = conn.select();
	select.from("#__users", ()).unwrap().where_("age < 30").order("id");

	// Act
	let mut result = select.exec().unwrap();
	let users: Vec<User> = result.fetch_all_objects().unwrap();

	// Assert
	assert_eq!(
		users,
		vec![
			User {
				id: 2,
				name: "bob".to_string(),
				age: Some(17),
			},
			User {
				id: 3,
				name: "carol".to_string(),
				age: Some(25),
			},
		]
	);
}

#[rstest]
fn test_iterator_rewinds_buffered_result(conn: Connection) {
	// Arrange
	let mut result = conn.query("SELECT name FROM #__users ORDER BY id").unwrap();
	let mut iter = result.iter(FetchMode::Num).unwrap();

	// Act
	let first: Vec<Row> = iter.by_ref().collect::<Result<_>>().unwrap();
	iter.rewind().unwrap();
	let second: Vec<Row> = iter.collect::<Result<_>>().unwrap();

	// Assert
	assert_eq!(first.len(), 4);
	assert_eq!(first, second);
}

#[rstest]
fn test_rollback_discards_changes(conn: Connection) {
	// Arrange
	conn.begin(None).unwrap();
	conn.query("DELETE FROM #__users").unwrap();

	// Act
	conn.rollback(None).unwrap();

	// Assert
	assert_eq!(user_count(&conn), 4);
}

#[rstest]
fn test_commit_keeps_changes(conn: Connection) {
	// Arrange
	conn.begin(None).unwrap();
	conn.query("DELETE FROM #__users WHERE age < 18").unwrap();

	// Act
	conn.commit(None).unwrap();

	// Assert
	assert_eq!(user_count(&conn), 3);
}

#[rstest]
fn test_savepoint_rollback_keeps_outer_work(conn: Connection) {
	// Arrange
	conn.begin(None).unwrap();
	conn.query("DELETE FROM #__users WHERE name = 'bob'").unwrap();
	conn.begin(Some("cleanup")).unwrap();
	conn.query("DELETE FROM #__users").unwrap();

	// Act
	conn.rollback(Some("cleanup")).unwrap();
	conn.commit(None).unwrap();

	// Assert
	assert_eq!(user_count(&conn), 3);
}

#[rstest]
fn test_failed_query_rolls_back_open_transaction(conn: Connection) {
	// Arrange
	conn.begin(None).unwrap();
	conn.query("DELETE FROM #__users").unwrap();

	// Act
	let err = conn.query("SELECT * FROM #__missing").unwrap_err();

	// Assert
	match err {
		DatabaseError::Query { query, .. } => assert_eq!(query, "SELECT * FROM app_missing"),
		other => panic!("expected a query error, got {other:?}"),
	}
	assert_eq!(user_count(&conn), 4);
}

#[rstest]
#[case(Arg::from(42), Value::Int(42))]
#[case(Arg::from(0.1), Value::Float(0.1))]
#[case(Arg::from(2.0), Value::Float(2.0))]
#[case(Arg::tagged(Value::from("7.5kg"), ValueTag::Float), Value::Float(7.5))]
#[case(Arg::tagged(Value::from("12 apples"), ValueTag::Int), Value::Int(12))]
#[case(Arg::from("h\u{e9}llo 'quoted'"), Value::from("h\u{e9}llo 'quoted'"))]
#[case(Arg::blob(vec![0xff_u8, 0x00, 0x27]), Value::Bytes(vec![0xff, 0x00, 0x27]))]
#[case(Arg::from(Option::<i64>::None), Value::Null)]
#[case(Arg::unix_time(86_400), Value::from("1970-01-02 00:00:00"))]
fn test_literal_round_trip(conn: Connection, #[case] arg: Arg, #[case] expected: Value) {
	// Act
	let value = conn
		.query(SqlExpr::templated("SELECT %1 AS v", vec![arg]))
		.unwrap()
		.fetch_one("v")
		.unwrap();

	// Assert
	assert_eq!(value, Some(expected));
}

#[rstest]
fn test_temporal_round_trip_through_typed_columns(conn: Connection) {
	// Arrange
	let date = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
	let time = NaiveTime::from_hms_opt(8, 30, 15).unwrap();
	let stamp = date.and_time(time);
	conn.query("CREATE TABLE #__events (d DATE, t TIME, dt DATETIME)").unwrap();

	// Act
	conn.query(sql_expr!(
		"INSERT INTO #__events (d, t, dt) VALUES (%1, %2, %3)",
		Arg::tagged(Value::DateTime(stamp), ValueTag::Date),
		Arg::tagged(Value::DateTime(stamp), ValueTag::Time),
		stamp
	))
	.unwrap();
	let row = conn
		.query("SELECT d, t, dt FROM #__events")
		.unwrap()
		.fetch_assoc()
		.unwrap()
		.unwrap();

	// Assert
	assert_eq!(row.get("d"), Some(&Value::Date(date)));
	assert_eq!(row.get("t"), Some(&Value::Time(time)));
	assert_eq!(row.get("dt"), Some(&Value::DateTime(stamp)));
}

#[rstest]
fn test_identifier_tags_name_columns_and_tables(conn: Connection) {
	// Act
	let value = conn
		.query(sql_expr!(
			"SELECT %1 AS v FROM %2 WHERE id = %3",
			Arg::field("name"),
			Arg::table("app_users"),
			1
		))
		.unwrap()
		.fetch_one("v")
		.unwrap();

	// Assert
	assert_eq!(value, Some(Value::from("alice")));
}
