//! Table prefixing
//!
//! Rewrites a builder so every table it references carries the database's
//! table prefix.

use super::{Column, Condition, Criterion, Expr, InValues, QueryBuilder, TableRef};
use std::collections::HashSet;

/// Prepends a fixed prefix to table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePrefixer {
    prefix: String,
}

impl TablePrefixer {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        TablePrefixer {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `prefix + table`.
    pub fn add_table_prefix(&self, table: &str) -> String {
        format!("{}{}", self.prefix, table)
    }

    /// Prefixes a table reference inside a query. A schema qualifier
    /// (`main.items`) stays in front of the prefix.
    fn prefix_table_name(&self, table: &str) -> String {
        match table.rsplit_once('.') {
            Some((schema, name)) => format!("{}.{}", schema, self.add_table_prefix(name)),
            None => self.add_table_prefix(table),
        }
    }

    /// Prefixes the tables of `query`, its joins, qualified column names and
    /// every nested subquery. Qualifiers that are aliases are left alone, as
    /// are raw fragments.
    pub fn apply(&self, query: QueryBuilder) -> QueryBuilder {
        if self.prefix.is_empty() {
            return query;
        }
        self.apply_scoped(query, &HashSet::new())
    }

    fn apply_scoped(&self, mut query: QueryBuilder, outer: &HashSet<String>) -> QueryBuilder {
        let mut aliases = outer.clone();
        aliases.extend(query.table.iter().filter_map(|t| t.alias.clone()));
        aliases.extend(query.joins.iter().filter_map(|j| j.table.alias.clone()));

        query.table = query.table.map(|t| self.prefix_table(t));
        query.columns = query
            .columns
            .into_iter()
            .map(|mut item| {
                item.column = self.prefix_column(item.column, &aliases);
                item
            })
            .collect();
        query.joins = query
            .joins
            .into_iter()
            .map(|mut join| {
                join.table = self.prefix_table(join.table);
                join.conditions = self.prefix_conditions(join.conditions, &aliases);
                join
            })
            .collect();
        query.wheres = self.prefix_conditions(query.wheres, &aliases);
        query.orders = query
            .orders
            .into_iter()
            .map(|mut order| {
                order.column = self.prefix_column(order.column, &aliases);
                order
            })
            .collect();
        query.updates = query
            .updates
            .into_iter()
            .map(|(column, value)| (column, self.prefix_expr(value, &aliases)))
            .collect();
        query
    }

    fn prefix_table(&self, table: TableRef) -> TableRef {
        TableRef {
            name: self.prefix_table_name(&table.name),
            alias: table.alias,
        }
    }

    fn prefix_name(&self, name: String, aliases: &HashSet<String>) -> String {
        match name.rsplit_once('.') {
            Some((qualifier, column)) if !aliases.contains(qualifier) => {
                format!("{}.{}", self.prefix_table_name(qualifier), column)
            }
            _ => name,
        }
    }

    fn prefix_column(&self, column: Column, aliases: &HashSet<String>) -> Column {
        match column {
            Column::Name(name) => Column::Name(self.prefix_name(name, aliases)),
            Column::Raw(raw) => Column::Raw(raw),
            Column::Subquery(query) => Column::Subquery(Box::new(self.apply_scoped(*query, aliases))),
            Column::Aggregate { function, column } => Column::Aggregate {
                function,
                column: Box::new(self.prefix_column(*column, aliases)),
            },
        }
    }

    fn prefix_expr(&self, expr: Expr, aliases: &HashSet<String>) -> Expr {
        match expr {
            Expr::Subquery(query) => Expr::Subquery(Box::new(self.apply_scoped(*query, aliases))),
            other => other,
        }
    }

    fn prefix_conditions(&self, conditions: Vec<Condition>, aliases: &HashSet<String>) -> Vec<Condition> {
        conditions
            .into_iter()
            .map(|condition| Condition {
                joiner: condition.joiner,
                criterion: self.prefix_criterion(condition.criterion, aliases),
            })
            .collect()
    }

    fn prefix_criterion(&self, criterion: Criterion, aliases: &HashSet<String>) -> Criterion {
        match criterion {
            Criterion::Compare {
                column,
                operator,
                value,
            } => Criterion::Compare {
                column: self.prefix_column(column, aliases),
                operator,
                value: self.prefix_expr(value, aliases),
            },
            Criterion::Columns {
                left,
                operator,
                right,
            } => Criterion::Columns {
                left: self.prefix_name(left, aliases),
                operator,
                right: self.prefix_name(right, aliases),
            },
            Criterion::Null { column, negated } => Criterion::Null {
                column: self.prefix_column(column, aliases),
                negated,
            },
            Criterion::In {
                column,
                values,
                negated,
            } => Criterion::In {
                column: self.prefix_column(column, aliases),
                values: match values {
                    InValues::List(list) => {
                        InValues::List(list.into_iter().map(|v| self.prefix_expr(v, aliases)).collect())
                    }
                    InValues::Subquery(query) => {
                        InValues::Subquery(Box::new(self.apply_scoped(*query, aliases)))
                    }
                },
                negated,
            },
            Criterion::Between {
                column,
                low,
                high,
                negated,
            } => Criterion::Between {
                column: self.prefix_column(column, aliases),
                low: self.prefix_expr(low, aliases),
                high: self.prefix_expr(high, aliases),
                negated,
            },
            Criterion::Raw(raw) => Criterion::Raw(raw),
            Criterion::Group(conditions) => Criterion::Group(self.prefix_conditions(conditions, aliases)),
        }
    }
}
