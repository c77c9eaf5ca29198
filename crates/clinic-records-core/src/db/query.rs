//! Predicate trees for repository finders.
//!
//! Each finder is a [`Query`] over one table, optionally filtered by a
//! [`Predicate`] and limited to N rows, rendered to SQL by one of the terminal
//! operations: select, count, exists or delete. Column names are static
//! identifiers; values are always bound as parameters.

use rusqlite::types::Value;

/// A boolean condition over the columns of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`
    Equals { column: &'static str, value: Value },
    /// `column > value`
    After { column: &'static str, value: Value },
    /// Case-sensitive prefix match.
    StartingWith { column: &'static str, prefix: String },
    /// Case-sensitive substring match.
    Containing { column: &'static str, needle: String },
    /// Column value is one of `values`; never true for an empty list.
    In { column: &'static str, values: Vec<Value> },
    /// Both predicates hold.
    And(Box<Predicate>, Box<Predicate>),
    /// At least one row of `table` whose `foreign_key` points at the outer row
    /// satisfies `predicate`.
    Related {
        table: &'static str,
        foreign_key: &'static str,
        predicate: Box<Predicate>,
    },
}

impl Predicate {
    pub fn equals(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Equals {
            column,
            value: value.into(),
        }
    }

    pub fn after(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::After {
            column,
            value: value.into(),
        }
    }

    pub fn starting_with(column: &'static str, prefix: impl Into<String>) -> Self {
        Predicate::StartingWith {
            column,
            prefix: prefix.into(),
        }
    }

    pub fn containing(column: &'static str, needle: impl Into<String>) -> Self {
        Predicate::Containing {
            column,
            needle: needle.into(),
        }
    }

    pub fn is_in<I, V>(column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn related(table: &'static str, foreign_key: &'static str, predicate: Predicate) -> Self {
        Predicate::Related {
            table,
            foreign_key,
            predicate: Box::new(predicate),
        }
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Append the SQL for this predicate, qualifying columns with `scope`.
    fn render(&self, scope: &str, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Predicate::Equals { column, value } => {
                sql.push_str(&format!("{}.{} = ?", scope, column));
                params.push(value.clone());
            }
            Predicate::After { column, value } => {
                sql.push_str(&format!("{}.{} > ?", scope, column));
                params.push(value.clone());
            }
            Predicate::StartingWith { column, prefix } => {
                // instr() is case-sensitive, unlike LIKE, and needs no escaping
                sql.push_str(&format!("instr({}.{}, ?) = 1", scope, column));
                params.push(Value::Text(prefix.clone()));
            }
            Predicate::Containing { column, needle } => {
                sql.push_str(&format!("instr({}.{}, ?) > 0", scope, column));
                params.push(Value::Text(needle.clone()));
            }
            Predicate::In { column, values } => {
                if values.is_empty() {
                    sql.push_str("0");
                    return;
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{}.{} IN ({})", scope, column, placeholders));
                params.extend(values.iter().cloned());
            }
            Predicate::And(left, right) => {
                sql.push('(');
                left.render(scope, sql, params);
                sql.push_str(" AND ");
                right.render(scope, sql, params);
                sql.push(')');
            }
            Predicate::Related {
                table,
                foreign_key,
                predicate,
            } => {
                sql.push_str(&format!(
                    "EXISTS (SELECT 1 FROM {table} WHERE {table}.{fk} = {scope}.id AND ",
                    table = table,
                    fk = foreign_key,
                    scope = scope,
                ));
                predicate.render(table, sql, params);
                sql.push(')');
            }
        }
    }
}

/// SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<Value>,
}

/// A filtered, optionally limited view of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: &'static str,
    predicate: Option<Predicate>,
    limit: Option<usize>,
}

impl Query {
    /// All rows of `table`.
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            predicate: None,
            limit: None,
        }
    }

    /// Restrict to rows matching `predicate`, in conjunction with any
    /// existing filter.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Keep at most `n` rows when selecting.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// `SELECT columns ... ORDER BY id [LIMIT n]`
    pub fn select(&self, columns: &[&str]) -> Rendered {
        let columns = columns
            .iter()
            .map(|column| format!("{}.{}", self.table, column))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {} FROM {}", columns, self.table);
        let params = self.push_where(&mut sql);
        sql.push_str(&format!(" ORDER BY {}.id", self.table));
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        Rendered { sql, params }
    }

    /// `SELECT COUNT(*) ...`
    pub fn count(&self) -> Rendered {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let params = self.push_where(&mut sql);
        Rendered { sql, params }
    }

    /// `SELECT EXISTS (SELECT 1 ...)`
    pub fn exists(&self) -> Rendered {
        let mut sql = format!("SELECT EXISTS (SELECT 1 FROM {}", self.table);
        let params = self.push_where(&mut sql);
        sql.push(')');
        Rendered { sql, params }
    }

    /// `DELETE FROM ...`
    pub fn delete(&self) -> Rendered {
        let mut sql = format!("DELETE FROM {}", self.table);
        let params = self.push_where(&mut sql);
        Rendered { sql, params }
    }

    /// `SELECT id ...`, for use as a subquery.
    pub fn ids(&self) -> Rendered {
        let mut sql = format!("SELECT {}.id FROM {}", self.table, self.table);
        let params = self.push_where(&mut sql);
        Rendered { sql, params }
    }

    fn push_where(&self, sql: &mut String) -> Vec<Value> {
        let mut params = Vec::new();
        if let Some(predicate) = &self.predicate {
            sql.push_str(" WHERE ");
            predicate.render(self.table, sql, &mut params);
        }
        params
    }
}
