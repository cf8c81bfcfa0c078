#[cfg(test)]
mod query_tests {
    use chrono::NaiveDate;
    use querykit::grammar::Driver;
    use querykit::prelude::*;

    fn shop_database() -> Database {
        let config = DatabaseConfig::new("sqlite::memory:").driver("sqlite").prefix("shop_");
        let database = Database::create(&config).unwrap();
        database
            .statement(
                "CREATE TABLE shop_owners (id INTEGER PRIMARY KEY, name TEXT);
                 CREATE TABLE shop_items (
                     id INTEGER PRIMARY KEY,
                     owner_id INTEGER REFERENCES shop_owners (id),
                     name TEXT,
                     price NUMERIC,
                     added TEXT
                 );
                 INSERT INTO shop_owners (name) VALUES ('Anny'), ('Bob');
                 INSERT INTO shop_items (owner_id, name, price, added) VALUES
                     (1, 'Banana', 2.5, '2024-01-10'),
                     (1, 'Apple', 1, '2024-02-01'),
                     (2, 'Pen', NULL, '2024-02-15'),
                     (2, 'Bottle', 7, '2024-03-20'),
                     (NULL, 'Mug', 4, '2024-04-01');",
                &[],
            )
            .unwrap();
        database
    }

    fn names(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|row| row["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_filters() {
        let database = shop_database();
        assert_eq!(database.grammar().dialect(), Driver::Sqlite);

        let rows = database
            .table("items")
            .where_in("name", ["Banana", "Pen", "Cup"])
            .order_by("id", Direction::Asc)
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["Banana", "Pen"]);

        let rows = database
            .table("items")
            .where_between("price", 2, 5)
            .order_by_desc("price")
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["Mug", "Banana"]);

        let rows = database
            .table("items")
            .where_not_null("owner_id")
            .where_group(|g| g.where_cmp("price", "<", 2).or_where_null("price"))
            .order_by("id", Direction::Asc)
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["Apple", "Pen"]);

        let rows = database
            .table("items")
            .where_cmp("name", "like", "B%")
            .order_by("name", Direction::Asc)
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["Banana", "Bottle"]);

        let none: Vec<&str> = Vec::new();
        assert!(database.table("items").where_in("name", none).get().unwrap().is_empty());
    }

    #[test]
    fn test_date_bindings() {
        let database = shop_database();
        let since = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();

        assert_eq!(database.table("items").where_cmp("added", ">=", Value::from(since)).count("*").unwrap(), 3);
    }

    #[test]
    fn test_joins_and_subqueries() {
        let database = shop_database();

        let rows = database
            .table(("items", "i"))
            .select_as("i.name", "name")
            .select_as("o.name", "owner")
            .join(("owners", "o"), "i.owner_id", "=", "o.id")
            .where_eq("o.name", "Bob")
            .order_by("i.id", Direction::Asc)
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["Pen", "Bottle"]);
        assert_eq!(rows[0]["owner"], Value::from("Bob"));

        let rows = database
            .table(("items", "i"))
            .left_join(("owners", "o"), "i.owner_id", "=", "o.id")
            .where_null("o.id")
            .select(["i.name"])
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["Mug"]);

        let anny = QueryBuilder::table("owners").add_select("id").where_eq("name", "Anny");
        let total = database.table("items").where_in_query("owner_id", anny).sum("price").unwrap();
        assert_eq!(total, Some(Value::Float(3.5)));

        let owner_count = QueryBuilder::table("owners").add_count("*", "c");
        let rows = database
            .table("items")
            .add_select("name")
            .select_as(owner_count, "owners")
            .where_eq("name", "Mug")
            .get()
            .unwrap();
        assert_eq!(rows[0]["owners"], Value::Integer(2));
    }

    #[test]
    fn test_raw_fragments() {
        let database = shop_database();

        let rows = database
            .table("items")
            .select_raw("UPPER(name) AS name", Vec::<Value>::new())
            .where_raw(Raw::new("price * ? > ?", [2, 10]))
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["BOTTLE"]);

        let max = database.table("items").max(Raw::sql("LENGTH(name)")).unwrap();
        assert_eq!(max, Some(Value::Integer(6)));
    }

    #[test]
    fn test_pagination_does_not_leak() {
        let database = shop_database();
        let query = database.table("items").order_by("id", Direction::Asc).limit(2);

        assert_eq!(query.count("*").unwrap(), 5);
        assert_eq!(query.get().unwrap().len(), 2);
        assert_eq!(query.clone().offset(4).get().unwrap().len(), 1);
        assert_eq!(
            query.first().unwrap().map(|row| row["name"].clone()),
            Some(Value::from("Banana"))
        );

        let mut seen = Vec::new();
        query.chunk(2, |rows| seen.extend(names(&rows))).unwrap();
        assert_eq!(seen, ["Banana", "Apple", "Pen", "Bottle", "Mug"]);
        assert_eq!(query.get().unwrap().len(), 2);
    }

    #[test]
    fn test_writes() {
        let database = shop_database();

        let updated = database
            .table("items")
            .where_null("price")
            .update([("price", Expr::from(3)), ("name", Expr::from(Raw::new("name || ?", ["!"])))])
            .unwrap();
        assert_eq!(updated, 1);
        let pen = database.table("items").where_eq("name", "Pen!").first().unwrap().unwrap();
        assert_eq!(pen["price"], Value::Integer(3));

        let deleted = database.table("items").where_ne("owner_id", 1).delete().unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(database.table("items").count("*").unwrap(), 3);

        let err = database.table("items").limit(1).delete().unwrap_err();
        assert!(matches!(err, QuerykitError::IncorrectQuery { .. }));
        assert_eq!(database.table("items").count("*").unwrap(), 3);
    }

    #[test]
    fn test_invalid_arguments() {
        let database = shop_database();

        for result in [
            database.table("items").where_cmp("price", "===", 1).get(),
            database.table("items").add_select("").get(),
            database.table("items").where_eq("name", "Pen").select(["items."]).get(),
        ] {
            assert!(matches!(result, Err(QuerykitError::InvalidArgument { .. })));
        }

        let err = database.table("items").chunk(0, |_| {}).unwrap_err();
        assert!(matches!(err, QuerykitError::InvalidArgument { .. }));
    }
}
