//! The facade exposes the whole stack through one import.

use quarry::db::testing::RecordingDriver;
use quarry::prelude::*;
use rstest::rstest;

#[rstest]
fn test_prelude_builds_and_runs_a_select() {
	// Arrange
	let driver = RecordingDriver::new();
	driver.push_result(&["id", "name"], vec![vec![Value::from(1), Value::from("ada")]]);
	let log = driver.log();
	let mut conn = Connection::from_driver(Box::new(driver));
	conn.set_table_prefix("app_");

	// Act
	let mut select = conn.select();
	select.from("#__users", fields!["id", "name"]).unwrap();
	let pairs = select.exec().unwrap().fetch_pairs("id", "name").unwrap();

	// Assert
	assert_eq!(log.queries(), vec!["SELECT `id`, `name` FROM `app_users`".to_string()]);
	assert_eq!(pairs.get("1"), Some(&Value::from("ada")));
}
