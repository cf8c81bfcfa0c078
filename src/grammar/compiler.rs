use super::{CompileError, CompiledQuery, Grammar};
use crate::builder::{
    Column, Condition, Criterion, Direction, Expr, InValues, JoinKind, Joiner, QueryBuilder, Raw, TableRef,
};
use crate::core::value::Value;

const OPERATORS: &[&str] = &["=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE"];

type CompileResult<T> = Result<T, CompileError>;

/// Walks a builder in SQL text order, collecting bound values as it goes so
/// placeholder positions always match the bindings.
pub(super) struct Compiler<'g, G: Grammar + ?Sized> {
    grammar: &'g G,
    bindings: Vec<Value>,
}

impl<'g, G: Grammar + ?Sized> Compiler<'g, G> {
    pub(super) fn new(grammar: &'g G) -> Self {
        Compiler {
            grammar,
            bindings: Vec::new(),
        }
    }

    pub(super) fn finish(self, sql: String) -> CompiledQuery {
        CompiledQuery {
            sql,
            bindings: self.bindings,
        }
    }

    pub(super) fn select(&mut self, query: &QueryBuilder) -> CompileResult<String> {
        if query.table.is_none() && query.columns.is_empty() {
            return Err(CompileError::InvalidQuery(
                "a select query needs a table or at least one column".to_string(),
            ));
        }

        let mut sql = String::from("SELECT ");
        if query.columns.is_empty() {
            sql.push('*');
        } else {
            let mut items = Vec::with_capacity(query.columns.len());
            for item in &query.columns {
                let mut column = self.column(&item.column)?;
                if let Some(alias) = &item.alias {
                    column.push_str(" AS ");
                    column.push_str(&self.identifier(alias)?);
                }
                items.push(column);
            }
            sql.push_str(&items.join(", "));
        }

        if let Some(table) = &query.table {
            sql.push_str(" FROM ");
            sql.push_str(&self.table(table)?);
        }

        for join in &query.joins {
            sql.push_str(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            sql.push_str(&self.table(&join.table)?);
            match self.conditions(&join.conditions)? {
                Some(on) => {
                    sql.push_str(" ON ");
                    sql.push_str(&on);
                }
                None => {
                    return Err(CompileError::InvalidQuery(format!(
                        "join with {} has no conditions",
                        join.table.name
                    )))
                }
            }
        }

        self.push_where(&mut sql, query)?;
        self.push_order(&mut sql, query)?;
        sql.push_str(&self.grammar.compile_limit_offset(query.limit, query.offset)?);
        Ok(sql)
    }

    pub(super) fn update(&mut self, query: &QueryBuilder) -> CompileResult<String> {
        let table = self.write_target(query, "update")?;
        if query.updates.is_empty() {
            return Err(CompileError::InvalidArgument("no values to update".to_string()));
        }

        let mut sql = format!("UPDATE {} SET ", table);
        let mut assignments = Vec::with_capacity(query.updates.len());
        for (column, value) in &query.updates {
            let column = self.identifier(column)?;
            let value = self.expr(value)?;
            assignments.push(format!("{} = {}", column, value));
        }
        sql.push_str(&assignments.join(", "));

        self.push_where(&mut sql, query)?;
        self.push_order(&mut sql, query)?;
        sql.push_str(&self.grammar.compile_limit_offset(query.limit, None)?);
        Ok(sql)
    }

    pub(super) fn delete(&mut self, query: &QueryBuilder) -> CompileResult<String> {
        let table = self.write_target(query, "delete")?;

        let mut sql = format!("DELETE FROM {}", table);
        self.push_where(&mut sql, query)?;
        self.push_order(&mut sql, query)?;
        sql.push_str(&self.grammar.compile_limit_offset(query.limit, None)?);
        Ok(sql)
    }

    /// Checks the clauses an update or delete may carry and returns the
    /// compiled target table.
    fn write_target(&mut self, query: &QueryBuilder, statement: &str) -> CompileResult<String> {
        let table = query.table.as_ref().ok_or_else(|| {
            CompileError::InvalidQuery(format!("the {} query has no target table", statement))
        })?;
        if !query.joins.is_empty() {
            return Err(CompileError::InvalidQuery(format!(
                "joins are not supported in a {} query",
                statement
            )));
        }
        if query.offset.is_some() {
            return Err(CompileError::InvalidQuery(format!(
                "an offset is not supported in a {} query",
                statement
            )));
        }
        if (query.limit.is_some() || !query.orders.is_empty()) && !self.grammar.supports_ordered_writes() {
            return Err(CompileError::InvalidQuery(format!(
                "the {} grammar does not support ORDER BY or LIMIT in a {} query",
                self.grammar.dialect().name(),
                statement
            )));
        }
        self.table(table)
    }

    fn push_where(&mut self, sql: &mut String, query: &QueryBuilder) -> CompileResult<()> {
        if let Some(conditions) = self.conditions(&query.wheres)? {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions);
        }
        Ok(())
    }

    fn push_order(&mut self, sql: &mut String, query: &QueryBuilder) -> CompileResult<()> {
        if query.orders.is_empty() {
            return Ok(());
        }
        let mut items = Vec::with_capacity(query.orders.len());
        for order in &query.orders {
            let direction = match order.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            items.push(format!("{} {}", self.column(&order.column)?, direction));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&items.join(", "));
        Ok(())
    }

    fn identifier(&self, name: &str) -> CompileResult<String> {
        if name.trim().is_empty() || name.split('.').any(str::is_empty) {
            return Err(CompileError::InvalidArgument(format!(
                "\"{}\" is not a valid identifier",
                name
            )));
        }
        Ok(self.grammar.quote_identifier(name))
    }

    fn table(&self, table: &TableRef) -> CompileResult<String> {
        let mut sql = self.identifier(&table.name)?;
        if let Some(alias) = &table.alias {
            sql.push_str(" AS ");
            sql.push_str(&self.identifier(alias)?);
        }
        Ok(sql)
    }

    fn bind(&mut self, value: &Value) -> String {
        self.bindings.push(value.clone());
        self.grammar.placeholder(self.bindings.len())
    }

    /// Emits a raw fragment, binding its values in order. Each `?` outside a
    /// quoted string or identifier becomes the grammar's placeholder for the
    /// next value. Values beyond the last `?` are still bound.
    fn raw(&mut self, raw: &Raw) -> String {
        let mut sql = String::with_capacity(raw.sql.len());
        let mut values = raw.bindings.iter();
        let mut quote: Option<char> = None;

        for ch in raw.sql.chars() {
            match (quote, ch) {
                (Some(open), _) => {
                    if ch == open {
                        quote = None;
                    }
                    sql.push(ch);
                }
                (None, '\'' | '"' | '`') => {
                    quote = Some(ch);
                    sql.push(ch);
                }
                (None, '?') => match values.next() {
                    Some(value) => sql.push_str(&self.bind(value)),
                    None => sql.push(ch),
                },
                (None, _) => sql.push(ch),
            }
        }
        self.bindings.extend(values.cloned());
        sql
    }

    fn column(&mut self, column: &Column) -> CompileResult<String> {
        match column {
            Column::Name(name) => self.identifier(name),
            Column::Raw(raw) => Ok(self.raw(raw)),
            Column::Subquery(query) => Ok(format!("({})", self.select(query)?)),
            Column::Aggregate { function, column } => {
                let inner = match column.as_ref() {
                    Column::Name(name) if name == "*" => "*".to_string(),
                    other => self.column(other)?,
                };
                Ok(format!("{}({})", function.as_sql(), inner))
            }
        }
    }

    fn expr(&mut self, expr: &Expr) -> CompileResult<String> {
        match expr {
            Expr::Value(value) => Ok(self.bind(value)),
            Expr::Raw(raw) => Ok(format!("({})", self.raw(raw))),
            Expr::Subquery(query) => Ok(format!("({})", self.select(query)?)),
        }
    }

    fn operator(&self, operator: &str) -> CompileResult<String> {
        let normalized = operator.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        if OPERATORS.contains(&normalized.as_str()) {
            Ok(normalized)
        } else {
            Err(CompileError::InvalidArgument(format!(
                "unsupported comparison operator \"{}\"",
                operator
            )))
        }
    }

    /// Compiles a condition list, `None` when it produces nothing.
    fn conditions(&mut self, conditions: &[Condition]) -> CompileResult<Option<String>> {
        let mut sql = String::new();
        for condition in conditions {
            let Some(criterion) = self.criterion(&condition.criterion)? else {
                continue;
            };
            if !sql.is_empty() {
                sql.push_str(match condition.joiner {
                    Joiner::And => " AND ",
                    Joiner::Or => " OR ",
                });
            }
            sql.push_str(&criterion);
        }
        Ok((!sql.is_empty()).then_some(sql))
    }

    fn criterion(&mut self, criterion: &Criterion) -> CompileResult<Option<String>> {
        let sql = match criterion {
            Criterion::Compare {
                column,
                operator,
                value,
            } => {
                let column = self.column(column)?;
                let operator = self.operator(operator)?;
                format!("{} {} {}", column, operator, self.expr(value)?)
            }
            Criterion::Columns {
                left,
                operator,
                right,
            } => {
                let left = self.identifier(left)?;
                let operator = self.operator(operator)?;
                format!("{} {} {}", left, operator, self.identifier(right)?)
            }
            Criterion::Null { column, negated } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                format!("{} {}", self.column(column)?, keyword)
            }
            Criterion::In {
                column,
                values,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                match values {
                    InValues::List(list) if list.is_empty() => {
                        // Nothing is in an empty set.
                        if *negated { "(1 = 1)" } else { "(0 = 1)" }.to_string()
                    }
                    InValues::List(list) => {
                        let column = self.column(column)?;
                        let mut items = Vec::with_capacity(list.len());
                        for value in list {
                            items.push(self.expr(value)?);
                        }
                        format!("{} {} ({})", column, keyword, items.join(", "))
                    }
                    InValues::Subquery(query) => {
                        let column = self.column(column)?;
                        format!("{} {} ({})", column, keyword, self.select(query)?)
                    }
                }
            }
            Criterion::Between {
                column,
                low,
                high,
                negated,
            } => {
                let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                let column = self.column(column)?;
                let low = self.expr(low)?;
                format!("{} {} {} AND {}", column, keyword, low, self.expr(high)?)
            }
            Criterion::Raw(raw) => format!("({})", self.raw(raw)),
            Criterion::Group(conditions) => match self.conditions(conditions)? {
                Some(group) => format!("({})", group),
                None => return Ok(None),
            },
        };
        Ok(Some(sql))
    }
}
