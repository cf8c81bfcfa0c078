/// # Integration Tests Module
///
/// End-to-end checks that run builder state through the prefixer, a grammar,
/// the database facade and a real SQLite connection.

#[cfg(test)]
mod tests {
    use crate::assert_querykit_error;
    use crate::builder::{Clauses, Direction, Raw};
    use crate::core::db::{Connection, ConnectionResult, Database, Query, SqliteConnection};
    use crate::core::{QuerykitError, Row, Value};
    use crate::grammar::{CommonGrammar, MySqlGrammar};
    use crate::test_utils::{items_database, CountingConnection};
    use std::error::Error as _;

    #[test]
    fn test_update() {
        let database = items_database();

        assert_eq!(
            database.table("items").where_null("value").update([("value", 12)]).unwrap(),
            1
        );
        let row = database
            .select_first("SELECT * FROM pre_items WHERE id = ?", &[Value::from(3)])
            .unwrap()
            .unwrap();
        assert_eq!(row["name"], Value::from("Pen"));
        assert_eq!(row["value"], Value::Integer(12));

        assert_eq!(
            database
                .table("items")
                .update([("name", Value::from("Lol")), ("value", Value::Null)])
                .unwrap(),
            4
        );
        let rows = database.select("SELECT * FROM pre_items", &[]).unwrap();
        assert_eq!(rows.len(), 4);
        for row in rows {
            assert_eq!(row["name"], Value::from("Lol"));
            assert!(row["value"].is_null());
        }

        assert_querykit_error!(Query::new(&database).update([("foo", "bar")]), IncorrectQuery, "update without table");
        assert_querykit_error!(
            database.table("items").update(Vec::<(&str, Value)>::new()),
            InvalidArgument,
            "update without values"
        );
    }

    #[test]
    fn test_update_with_expressions() {
        let database = items_database();

        let affected = database
            .table("items")
            .where_cmp("value", ">", 0)
            .update([("value", Raw::new("value * ?", [2]))])
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(
            database.table("items").where_eq("name", "Banana").first().unwrap().unwrap()["value"],
            Value::Float(246.8)
        );

        let max_id = crate::builder::QueryBuilder::table("items").add_max("id", "m");
        database
            .table("items")
            .where_eq("name", "Pen")
            .update([("value", max_id)])
            .unwrap();
        assert_eq!(
            database.table("items").where_eq("name", "Pen").first().unwrap().unwrap()["value"],
            Value::Integer(4)
        );
    }

    #[test]
    fn test_delete() {
        let database = items_database();

        assert_eq!(database.table("items").where_cmp("value", "<", 0).delete().unwrap(), 1);
        let ids: Vec<Value> = database
            .select("SELECT id FROM pre_items ORDER BY id", &[])
            .unwrap()
            .into_iter()
            .map(|row| row["id"].clone())
            .collect();
        assert_eq!(ids, vec![Value::Integer(1), Value::Integer(3), Value::Integer(4)]);

        assert_eq!(database.table("items").delete().unwrap(), 3);
        assert!(database.select("SELECT * FROM pre_items", &[]).unwrap().is_empty());

        assert_querykit_error!(Query::new(&database).delete(), IncorrectQuery, "delete without table");
    }

    #[test]
    fn test_add_tables_to_column_names() {
        let database = items_database();

        let query = database.table("items").add_select("name");
        let explicit = query.add_tables_to_column_names().unwrap();
        assert_eq!(query.builder(), database.table("items").add_select("name").builder());
        assert_eq!(
            explicit.builder(),
            database.table("items").add_select("items.name").builder()
        );

        let rows = explicit.order_by("id", Direction::Asc).limit(2).get().unwrap();
        let names: Vec<&Value> = rows.iter().map(|row| &row["name"]).collect();
        assert_eq!(names, vec![&Value::from("Banana"), &Value::from("Apple")]);
    }

    #[test]
    fn test_errors() {
        let database = items_database();

        let err = database.table("animals").offset(10).get().unwrap_err();
        match &err {
            QuerykitError::IncorrectQuery { .. } => {}
            other => panic!("Expected IncorrectQuery, got {:?}", other),
        }
        assert!(err
            .source()
            .unwrap()
            .downcast_ref::<crate::grammar::CompileError>()
            .is_some());

        assert_querykit_error!(database.table("animals").get(), Database, "missing table");

        let err = database.table("items").where_cmp("value", "<=>", 1).get().unwrap_err();
        match &err {
            QuerykitError::InvalidArgument { .. } => {}
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
        assert!(err
            .source()
            .unwrap()
            .downcast_ref::<crate::grammar::CompileError>()
            .is_some());
    }

    #[test]
    fn test_database_error_carries_compiled_statement() {
        let database = items_database();

        let err = database.table("animals").where_eq("name", "Cat").get().unwrap_err();
        assert_eq!(err.query(), Some(r#"SELECT * FROM "pre_animals" WHERE "name" = ?"#));
        assert_eq!(err.values(), &[Value::from("Cat")]);
        assert!(err.to_string().contains("no such table: pre_animals"));
    }

    #[test]
    fn test_aggregates() {
        let database = items_database();
        let items = database.table("items");

        assert_eq!(items.count("*").unwrap(), 4);
        assert_eq!(items.count_all().unwrap(), 4);
        assert_eq!(items.count("value").unwrap(), 3);
        assert_eq!(items.clone().where_cmp("value", ">", 0).count("*").unwrap(), 1);
        assert_eq!(items.sum("value").unwrap(), Some(Value::Float(113.4)));
        assert_eq!(items.min("value").unwrap(), Some(Value::Integer(-10)));
        assert_eq!(items.max("value").unwrap(), Some(Value::Float(123.4)));
        assert_eq!(items.max("name").unwrap(), Some(Value::from("Pen")));
        let avg = items.avg("value").unwrap().unwrap();
        assert!((avg - 37.8).abs() < 1e-9);
        assert_eq!(items.count(Raw::sql("DISTINCT name")).unwrap(), 4);

        let nothing = database.table("items").where_eq("name", "Orange");
        assert_eq!(nothing.count_all().unwrap(), 0);
        assert_eq!(nothing.avg("value").unwrap(), None);
        assert_eq!(nothing.sum("value").unwrap(), None);
        assert_eq!(nothing.min("value").unwrap(), None);
        assert_eq!(nothing.max("value").unwrap(), None);

        assert_querykit_error!(database.table("animals").count("*"), Database, "count on missing table");
    }

    /// Returns the same rows for every select.
    #[derive(Debug)]
    struct FixedRows(Vec<Row>);

    impl Connection for FixedRows {
        fn select(&self, _sql: &str, _bindings: &[Value]) -> ConnectionResult<Vec<Row>> {
            Ok(self.0.clone())
        }

        fn execute(&self, _sql: &str, _bindings: &[Value]) -> ConnectionResult<usize> {
            Ok(0)
        }

        fn insert_get_id(&self, _sql: &str, _bindings: &[Value]) -> ConnectionResult<i64> {
            Ok(0)
        }

        fn statement(&self, _sql: &str, _bindings: &[Value]) -> ConnectionResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_aggregate_invalid_return_values() {
        let text = Database::new(FixedRows(vec![Row::from([(
            "aggregate".to_string(),
            Value::from("abc"),
        )])]));
        assert_querykit_error!(text.table("items").count("*"), InvalidReturnValue, "text count");
        assert_querykit_error!(text.table("items").avg("value"), InvalidReturnValue, "text avg");
        assert_eq!(text.table("items").max("value").unwrap(), Some(Value::from("abc")));

        let empty = Database::new(FixedRows(Vec::new()));
        assert_querykit_error!(empty.table("items").count("*"), InvalidReturnValue, "no rows");

        let renamed = Database::new(FixedRows(vec![Row::from([("other".to_string(), Value::from(1))])]));
        assert_querykit_error!(renamed.table("items").sum("value"), InvalidReturnValue, "missing alias");
    }

    #[test]
    fn test_chunk() {
        let database = items_database();
        let query = database.table("items").order_by("id", Direction::Asc).limit(1).offset(3);

        let mut pages = Vec::new();
        query
            .chunk(2, |rows| {
                pages.push(rows.iter().map(|row| row["name"].clone()).collect::<Vec<_>>());
            })
            .unwrap();
        assert_eq!(
            pages,
            vec![
                vec![Value::from("Banana"), Value::from("Apple")],
                vec![Value::from("Pen"), Value::from("Bottle")],
            ]
        );
        assert_eq!((query.builder().limit, query.builder().offset), (Some(1), Some(3)));

        let mut sizes = Vec::new();
        query.chunk(3, |rows| sizes.push(rows.len())).unwrap();
        assert_eq!(sizes, vec![3, 1]);

        let mut called = false;
        database
            .table("items")
            .where_eq("name", "Orange")
            .chunk(10, |_| called = true)
            .unwrap();
        assert!(!called);
    }

    #[test]
    fn test_chunk_zero_size_runs_nothing() {
        let (connection, calls) = CountingConnection::new(SqliteConnection::open_in_memory().unwrap());
        let database = Database::new(connection);

        let result = database.table("items").chunk(0, |_| panic!("callback must not run"));
        assert_querykit_error!(result, InvalidArgument, "zero chunk size");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_oversized_page_and_limit() {
        let database = items_database();
        let query = database.table("items").order_by("id", Direction::Asc);

        let mut sizes = Vec::new();
        query.chunk(usize::MAX, |rows| sizes.push(rows.len())).unwrap();
        assert_eq!(sizes, vec![4]);

        assert_eq!(query.clone().limit(i64::MAX as u64).get().unwrap().len(), 4);
        assert_querykit_error!(query.clone().limit(u64::MAX).get(), InvalidArgument, "limit above i64::MAX");
        assert_querykit_error!(
            query.clone().limit(1).offset(u64::MAX).first(),
            InvalidArgument,
            "offset above i64::MAX"
        );
    }

    #[test]
    fn test_ordered_writes_depend_on_grammar() {
        let common = Database::with_grammar(SqliteConnection::open_in_memory().unwrap(), CommonGrammar::new(), "");
        common.statement("CREATE TABLE t (id INTEGER)", &[]).unwrap();
        assert_querykit_error!(
            common.table("t").order_by_desc("id").limit(1).delete(),
            IncorrectQuery,
            "ordered delete on common grammar"
        );

        let mysql = Database::with_grammar(SqliteConnection::open_in_memory().unwrap(), MySqlGrammar::new(), "");
        let compiled = mysql.table("t").order_by_desc("id").limit(1).to_sql().unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM `t` ORDER BY `id` DESC LIMIT 1");
    }
}
