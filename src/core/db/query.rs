/// Query Execution Module
///
/// A [`Query`] is a [`QueryBuilder`] bound to the [`Database`] it runs on.
/// Clause methods come from [`Clauses`]; the methods here compile a snapshot
/// of the accumulated state and execute it. The receiver is never changed by
/// execution.

use crate::builder::{AggregateFunction, Clauses, Column, Condition, Criterion, Expr, QueryBuilder};
use crate::core::db::database::Database;
use crate::core::error::translate;
use crate::core::value::{Row, Value};
use crate::core::{QuerykitError, Result};
use crate::grammar::{CompileError, CompiledQuery, Grammar, MAX_ROW_COUNT};
use tracing::debug;

/// Alias the aggregate helpers select their result under.
const AGGREGATE_ALIAS: &str = "aggregate";

/// Query builder with execution methods.
#[derive(Debug, Clone)]
pub struct Query<'db> {
    database: &'db Database,
    builder: QueryBuilder,
}

impl<'db> Query<'db> {
    /// Creates an empty query. Use [`Database::table`] to start one with a
    /// target table.
    pub fn new(database: &'db Database) -> Self {
        Query {
            database,
            builder: QueryBuilder::new(),
        }
    }

    pub fn database(&self) -> &'db Database {
        self.database
    }

    /// The accumulated clauses, without the table prefix.
    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn into_builder(self) -> QueryBuilder {
        self.builder
    }

    /// Compiles the select statement this query would run, prefix included.
    pub fn to_sql(&self) -> Result<CompiledQuery> {
        self.compile(self.builder.clone(), |grammar, query| grammar.compile_select(query))
    }

    /// Runs the query and returns every row.
    pub fn get(&self) -> Result<Vec<Row>> {
        let compiled = self.to_sql()?;
        self.database.select(&compiled.sql, &compiled.bindings)
    }

    /// Runs the query with a limit of one and returns the row, if any.
    pub fn first(&self) -> Result<Option<Row>> {
        let snapshot = self.builder.clone().limit(1);
        let compiled = self.compile(snapshot, |grammar, query| grammar.compile_select(query))?;
        self.database.select_first(&compiled.sql, &compiled.bindings)
    }

    /// Counts the rows matching the query. Pass `"*"` to count all rows.
    pub fn count<C: Into<Column>>(&self, column: C) -> Result<i64> {
        let value = self.aggregate(AggregateFunction::Count, column.into())?;
        value.as_i64().ok_or_else(|| {
            QuerykitError::invalid_return_value(format!(
                "the count aggregate returned a non-integer value {}",
                value
            ))
        })
    }

    /// Counts every row matching the query, same as `count("*")`.
    pub fn count_all(&self) -> Result<i64> {
        self.count("*")
    }

    /// Average of `column`, `None` when no row matches.
    pub fn avg<C: Into<Column>>(&self, column: C) -> Result<Option<f64>> {
        match self.aggregate(AggregateFunction::Avg, column.into())? {
            Value::Null => Ok(None),
            value => value.as_f64().map(Some).ok_or_else(|| {
                QuerykitError::invalid_return_value(format!(
                    "the avg aggregate returned a non-numeric value {}",
                    value
                ))
            }),
        }
    }

    /// Sum of `column`, `None` when no row matches.
    pub fn sum<C: Into<Column>>(&self, column: C) -> Result<Option<Value>> {
        self.nullable_aggregate(AggregateFunction::Sum, column.into())
    }

    /// Smallest value of `column`, `None` when no row matches.
    pub fn min<C: Into<Column>>(&self, column: C) -> Result<Option<Value>> {
        self.nullable_aggregate(AggregateFunction::Min, column.into())
    }

    /// Largest value of `column`, `None` when no row matches.
    pub fn max<C: Into<Column>>(&self, column: C) -> Result<Option<Value>> {
        self.nullable_aggregate(AggregateFunction::Max, column.into())
    }

    /// Walks the result in pages of `size` rows, handing each page to
    /// `callback`.
    ///
    /// Pages are fetched at offsets `0, size, 2 * size, ...` until a page is
    /// empty or shorter than `size`. Any limit or offset set on the query is
    /// replaced for each page.
    ///
    /// # Errors
    ///
    /// Returns `QuerykitError::InvalidArgument` if `size` is zero, before
    /// anything is executed. Sizes beyond `i64::MAX` are capped there, the
    /// largest limit SQL accepts.
    pub fn chunk<F>(&self, size: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(Vec<Row>),
    {
        if size == 0 {
            return Err(QuerykitError::invalid_argument(
                "chunk size must be greater than zero",
            ));
        }

        let page_size = u64::try_from(size).unwrap_or(u64::MAX).min(MAX_ROW_COUNT);
        let mut offset = 0;
        loop {
            debug!("Fetching a chunk of {} rows at offset {}", page_size, offset);
            let rows = self.clone().offset(offset).limit(page_size).get()?;
            if rows.is_empty() {
                break;
            }

            let fetched = rows.len();
            callback(rows);
            if (fetched as u64) < page_size {
                break;
            }
            offset += page_size;
        }
        Ok(())
    }

    /// Updates the matching rows and returns how many were affected.
    ///
    /// Values are literals, [`Raw`](crate::builder::Raw) expressions or
    /// subqueries.
    pub fn update<I, K, V>(&self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expr>,
    {
        let mut snapshot = self.builder.clone();
        snapshot.set_updates(values);
        let compiled = self.compile(snapshot, |grammar, query| grammar.compile_update(query))?;
        self.database.update(&compiled.sql, &compiled.bindings)
    }

    /// Deletes the matching rows and returns how many were removed.
    pub fn delete(&self) -> Result<usize> {
        let compiled = self.compile(self.builder.clone(), |grammar, query| grammar.compile_delete(query))?;
        self.database.delete(&compiled.sql, &compiled.bindings)
    }

    /// Returns a copy of the query where every unqualified column name in
    /// the select list, the where conditions and the order list is qualified
    /// with the table alias (or name). Subqueries and raw fragments keep
    /// their own names.
    pub fn add_tables_to_column_names(&self) -> Result<Query<'db>> {
        let qualifier = match &self.builder.table {
            Some(table) => table.qualifier().to_string(),
            None => {
                return Err(QuerykitError::IncorrectQuery {
                    message: "the query has no table to qualify column names with".to_string(),
                    source: None,
                })
            }
        };

        let mut builder = self.builder.clone();
        for item in &mut builder.columns {
            qualify_column(&mut item.column, &qualifier, true);
        }
        qualify_conditions(&mut builder.wheres, &qualifier);
        for order in &mut builder.orders {
            qualify_column(&mut order.column, &qualifier, false);
        }

        Ok(Query {
            database: self.database,
            builder,
        })
    }

    fn aggregate(&self, function: AggregateFunction, column: Column) -> Result<Value> {
        let snapshot = self
            .builder
            .clone()
            .clear_select()
            .clear_offset()
            .clear_limit()
            .add_aggregate(function, column, AGGREGATE_ALIAS);
        let compiled = self.compile(snapshot, |grammar, query| grammar.compile_select(query))?;

        let mut row = self
            .database
            .select_first(&compiled.sql, &compiled.bindings)?
            .ok_or_else(|| {
                QuerykitError::invalid_return_value(format!(
                    "the {} aggregate returned no rows",
                    function.as_sql()
                ))
            })?;
        row.swap_remove(AGGREGATE_ALIAS).ok_or_else(|| {
            QuerykitError::invalid_return_value(format!(
                "the {} aggregate row has no \"{}\" column",
                function.as_sql(),
                AGGREGATE_ALIAS
            ))
        })
    }

    fn nullable_aggregate(&self, function: AggregateFunction, column: Column) -> Result<Option<Value>> {
        let value = self.aggregate(function, column)?;
        Ok((!value.is_null()).then_some(value))
    }

    /// Prefixes tables on `builder` and hands it to the grammar.
    fn compile<F>(&self, builder: QueryBuilder, compile: F) -> Result<CompiledQuery>
    where
        F: FnOnce(&dyn Grammar, &QueryBuilder) -> std::result::Result<CompiledQuery, CompileError>,
    {
        let prefixed = self.database.prefixer().apply(builder);
        compile(self.database.grammar(), &prefixed).map_err(|e| translate(e, None))
    }
}

impl Clauses for Query<'_> {
    fn clauses_mut(&mut self) -> &mut QueryBuilder {
        &mut self.builder
    }
}

fn qualify_name(name: &mut String, qualifier: &str) {
    if !name.contains('.') {
        *name = format!("{}.{}", qualifier, name);
    }
}

/// `star` allows `*` to become `table.*`; it stays bare inside aggregates
/// and order items.
fn qualify_column(column: &mut Column, qualifier: &str, star: bool) {
    match column {
        Column::Name(name) if name == "*" && !star => {}
        Column::Name(name) => qualify_name(name, qualifier),
        Column::Aggregate { column, .. } => qualify_column(column, qualifier, false),
        Column::Raw(_) | Column::Subquery(_) => {}
    }
}

fn qualify_conditions(conditions: &mut [Condition], qualifier: &str) {
    for condition in conditions {
        match &mut condition.criterion {
            Criterion::Compare { column, .. }
            | Criterion::Null { column, .. }
            | Criterion::In { column, .. }
            | Criterion::Between { column, .. } => qualify_column(column, qualifier, false),
            Criterion::Columns { left, right, .. } => {
                qualify_name(left, qualifier);
                qualify_name(right, qualifier);
            }
            Criterion::Group(group) => qualify_conditions(group, qualifier),
            Criterion::Raw(_) => {}
        }
    }
}
