//! Query builder base
//!
//! Database-agnostic structures describing a query, and the fluent
//! [`Clauses`] trait that accumulates clauses on them. Grammars compile these
//! structures to SQL; [`Query`](crate::Query) adds execution on top.

pub mod prefixer;

pub use prefixer::TablePrefixer;

use crate::core::value::Value;
use indexmap::IndexMap;

/// A raw SQL fragment inserted verbatim, with the values for its placeholders.
///
/// Placeholders are written as `?`. The grammar renumbers them in place, so
/// under PostgreSQL `a > ?` compiles to `a > $n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Raw {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl Raw {
    /// Creates a fragment with bound values.
    pub fn new<S, I, V>(sql: S, bindings: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Raw {
            sql: sql.into(),
            bindings: bindings.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a fragment without bound values.
    pub fn sql<S: Into<String>>(sql: S) -> Self {
        Raw {
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }
}

/// Aggregate functions understood by every grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Avg,
    Sum,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// Something that produces a column value: a (possibly qualified) column
/// name, a raw expression, a subquery or an aggregate over one of those.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Name(String),
    Raw(Raw),
    Subquery(Box<QueryBuilder>),
    Aggregate {
        function: AggregateFunction,
        column: Box<Column>,
    },
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::Name(name.to_string())
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::Name(name)
    }
}

impl From<&String> for Column {
    fn from(name: &String) -> Self {
        Column::Name(name.clone())
    }
}

impl From<Raw> for Column {
    fn from(raw: Raw) -> Self {
        Column::Raw(raw)
    }
}

impl From<QueryBuilder> for Column {
    fn from(query: QueryBuilder) -> Self {
        Column::Subquery(Box::new(query))
    }
}

/// A value operand: a literal bound as a parameter, a raw expression or a
/// subquery.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Value(Value),
    Raw(Raw),
    Subquery(Box<QueryBuilder>),
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Value(value)
    }
}

impl From<Raw> for Expr {
    fn from(raw: Raw) -> Self {
        Expr::Raw(raw)
    }
}

impl From<QueryBuilder> for Expr {
    fn from(query: QueryBuilder) -> Self {
        Expr::Subquery(Box::new(query))
    }
}

impl<T: Into<Value>> From<Option<T>> for Expr {
    fn from(value: Option<T>) -> Self {
        Expr::Value(value.into())
    }
}

macro_rules! impl_expr_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Value(value.into())
                }
            }
        )*
    };
}

impl_expr_from_scalar!(bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, String, &str, &String, Vec<u8>);

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// The name columns of this table are qualified with.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        TableRef {
            name: name.to_string(),
            alias: None,
        }
    }
}

impl From<String> for TableRef {
    fn from(name: String) -> Self {
        TableRef { name, alias: None }
    }
}

impl From<(&str, &str)> for TableRef {
    fn from((name, alias): (&str, &str)) -> Self {
        TableRef {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }
}

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub column: Column,
    pub alias: Option<String>,
}

/// How a condition attaches to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    And,
    Or,
}

/// Right-hand side of an `IN` predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum InValues {
    List(Vec<Expr>),
    Subquery(Box<QueryBuilder>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Compare {
        column: Column,
        operator: String,
        value: Expr,
    },
    Columns {
        left: String,
        operator: String,
        right: String,
    },
    Null {
        column: Column,
        negated: bool,
    },
    In {
        column: Column,
        values: InValues,
        negated: bool,
    },
    Between {
        column: Column,
        low: Expr,
        high: Expr,
        negated: bool,
    },
    Raw(Raw),
    Group(Vec<Condition>),
}

/// A where (or join) condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub joiner: Joiner,
    pub criterion: Criterion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: Column,
    pub direction: Direction,
}

/// Accumulated state of a query.
///
/// Empty select list means `*`. `updates` is only read by update compilers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    pub table: Option<TableRef>,
    pub columns: Vec<SelectItem>,
    pub wheres: Vec<Condition>,
    pub joins: Vec<Join>,
    pub orders: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub updates: IndexMap<String, Expr>,
}

impl QueryBuilder {
    /// Creates a builder with no target table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder targeting `table`.
    pub fn table<T: Into<TableRef>>(table: T) -> Self {
        QueryBuilder {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    /// Replaces the values an update assigns.
    pub fn set_updates<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expr>,
    {
        self.updates = values
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .collect();
    }
}

/// Fluent clause construction shared by [`QueryBuilder`] and
/// [`Query`](crate::Query).
pub trait Clauses: Sized {
    /// Builder state the clause methods write to.
    fn clauses_mut(&mut self) -> &mut QueryBuilder;

    /// Sets the target table.
    fn from_table<T: Into<TableRef>>(mut self, table: T) -> Self {
        self.clauses_mut().table = Some(table.into());
        self
    }

    /// Replaces the select list.
    fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.clauses_mut().columns = columns
            .into_iter()
            .map(|column| SelectItem {
                column: column.into(),
                alias: None,
            })
            .collect();
        self
    }

    /// Appends a column to the select list.
    fn add_select<C: Into<Column>>(mut self, column: C) -> Self {
        self.clauses_mut().columns.push(SelectItem {
            column: column.into(),
            alias: None,
        });
        self
    }

    /// Appends an aliased column to the select list.
    fn select_as<C: Into<Column>, A: Into<String>>(mut self, column: C, alias: A) -> Self {
        self.clauses_mut().columns.push(SelectItem {
            column: column.into(),
            alias: Some(alias.into()),
        });
        self
    }

    /// Appends a raw expression to the select list.
    fn select_raw<S, I, V>(self, sql: S, bindings: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_select(Raw::new(sql, bindings))
    }

    /// Empties the select list.
    fn clear_select(mut self) -> Self {
        self.clauses_mut().columns.clear();
        self
    }

    /// Appends an aggregate to the select list.
    fn add_aggregate<C: Into<Column>, A: Into<String>>(
        self,
        function: AggregateFunction,
        column: C,
        alias: A,
    ) -> Self {
        self.select_as(
            Column::Aggregate {
                function,
                column: Box::new(column.into()),
            },
            alias,
        )
    }

    fn add_count<C: Into<Column>, A: Into<String>>(self, column: C, alias: A) -> Self {
        self.add_aggregate(AggregateFunction::Count, column, alias)
    }

    fn add_avg<C: Into<Column>, A: Into<String>>(self, column: C, alias: A) -> Self {
        self.add_aggregate(AggregateFunction::Avg, column, alias)
    }

    fn add_sum<C: Into<Column>, A: Into<String>>(self, column: C, alias: A) -> Self {
        self.add_aggregate(AggregateFunction::Sum, column, alias)
    }

    fn add_min<C: Into<Column>, A: Into<String>>(self, column: C, alias: A) -> Self {
        self.add_aggregate(AggregateFunction::Min, column, alias)
    }

    fn add_max<C: Into<Column>, A: Into<String>>(self, column: C, alias: A) -> Self {
        self.add_aggregate(AggregateFunction::Max, column, alias)
    }

    /// Adds a condition joined with the given connector.
    fn add_condition(mut self, joiner: Joiner, criterion: Criterion) -> Self {
        self.clauses_mut().wheres.push(Condition { joiner, criterion });
        self
    }

    /// Adds `column <operator> value`. The operator is validated at compile time.
    fn where_cmp<C, V>(self, column: C, operator: &str, value: V) -> Self
    where
        C: Into<Column>,
        V: Into<Expr>,
    {
        self.add_condition(
            Joiner::And,
            Criterion::Compare {
                column: column.into(),
                operator: operator.to_string(),
                value: value.into(),
            },
        )
    }

    fn or_where_cmp<C, V>(self, column: C, operator: &str, value: V) -> Self
    where
        C: Into<Column>,
        V: Into<Expr>,
    {
        self.add_condition(
            Joiner::Or,
            Criterion::Compare {
                column: column.into(),
                operator: operator.to_string(),
                value: value.into(),
            },
        )
    }

    fn where_eq<C: Into<Column>, V: Into<Expr>>(self, column: C, value: V) -> Self {
        self.where_cmp(column, "=", value)
    }

    fn or_where_eq<C: Into<Column>, V: Into<Expr>>(self, column: C, value: V) -> Self {
        self.or_where_cmp(column, "=", value)
    }

    fn where_ne<C: Into<Column>, V: Into<Expr>>(self, column: C, value: V) -> Self {
        self.where_cmp(column, "!=", value)
    }

    fn where_null<C: Into<Column>>(self, column: C) -> Self {
        self.add_condition(
            Joiner::And,
            Criterion::Null {
                column: column.into(),
                negated: false,
            },
        )
    }

    fn where_not_null<C: Into<Column>>(self, column: C) -> Self {
        self.add_condition(
            Joiner::And,
            Criterion::Null {
                column: column.into(),
                negated: true,
            },
        )
    }

    fn or_where_null<C: Into<Column>>(self, column: C) -> Self {
        self.add_condition(
            Joiner::Or,
            Criterion::Null {
                column: column.into(),
                negated: false,
            },
        )
    }

    fn where_in<C, I, V>(self, column: C, values: I) -> Self
    where
        C: Into<Column>,
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        self.add_condition(
            Joiner::And,
            Criterion::In {
                column: column.into(),
                values: InValues::List(values.into_iter().map(Into::into).collect()),
                negated: false,
            },
        )
    }

    fn where_not_in<C, I, V>(self, column: C, values: I) -> Self
    where
        C: Into<Column>,
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        self.add_condition(
            Joiner::And,
            Criterion::In {
                column: column.into(),
                values: InValues::List(values.into_iter().map(Into::into).collect()),
                negated: true,
            },
        )
    }

    /// Adds `column IN (subquery)`.
    fn where_in_query<C: Into<Column>>(self, column: C, query: QueryBuilder) -> Self {
        self.add_condition(
            Joiner::And,
            Criterion::In {
                column: column.into(),
                values: InValues::Subquery(Box::new(query)),
                negated: false,
            },
        )
    }

    fn where_between<C, L, H>(self, column: C, low: L, high: H) -> Self
    where
        C: Into<Column>,
        L: Into<Expr>,
        H: Into<Expr>,
    {
        self.add_condition(
            Joiner::And,
            Criterion::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
                negated: false,
            },
        )
    }

    /// Compares two columns.
    fn where_column<L: Into<String>, R: Into<String>>(self, left: L, operator: &str, right: R) -> Self {
        self.add_condition(
            Joiner::And,
            Criterion::Columns {
                left: left.into(),
                operator: operator.to_string(),
                right: right.into(),
            },
        )
    }

    fn where_raw(self, raw: Raw) -> Self {
        self.add_condition(Joiner::And, Criterion::Raw(raw))
    }

    /// Adds a parenthesized group of conditions built by `build`.
    fn where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        let group = build(QueryBuilder::new()).wheres;
        self.add_condition(Joiner::And, Criterion::Group(group))
    }

    fn or_where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        let group = build(QueryBuilder::new()).wheres;
        self.add_condition(Joiner::Or, Criterion::Group(group))
    }

    /// Adds an inner join on `first <operator> second`.
    fn join<T: Into<TableRef>>(mut self, table: T, first: &str, operator: &str, second: &str) -> Self {
        self.clauses_mut().joins.push(Join {
            kind: JoinKind::Inner,
            table: table.into(),
            conditions: vec![join_condition(first, operator, second)],
        });
        self
    }

    /// Adds a left join on `first <operator> second`.
    fn left_join<T: Into<TableRef>>(mut self, table: T, first: &str, operator: &str, second: &str) -> Self {
        self.clauses_mut().joins.push(Join {
            kind: JoinKind::Left,
            table: table.into(),
            conditions: vec![join_condition(first, operator, second)],
        });
        self
    }

    fn order_by<C: Into<Column>>(mut self, column: C, direction: Direction) -> Self {
        self.clauses_mut().orders.push(Order {
            column: column.into(),
            direction,
        });
        self
    }

    fn order_by_desc<C: Into<Column>>(self, column: C) -> Self {
        self.order_by(column, Direction::Desc)
    }

    fn limit(mut self, limit: u64) -> Self {
        self.clauses_mut().limit = Some(limit);
        self
    }

    fn offset(mut self, offset: u64) -> Self {
        self.clauses_mut().offset = Some(offset);
        self
    }

    fn clear_limit(mut self) -> Self {
        self.clauses_mut().limit = None;
        self
    }

    fn clear_offset(mut self) -> Self {
        self.clauses_mut().offset = None;
        self
    }
}

fn join_condition(first: &str, operator: &str, second: &str) -> Condition {
    Condition {
        joiner: Joiner::And,
        criterion: Criterion::Columns {
            left: first.to_string(),
            operator: operator.to_string(),
            right: second.to_string(),
        },
    }
}

impl Clauses for QueryBuilder {
    fn clauses_mut(&mut self) -> &mut QueryBuilder {
        self
    }
}
