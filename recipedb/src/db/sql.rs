//! SQL dialect adapter for PostgreSQL.
//!
//! The builders in this module assemble statements from structured pieces
//! (tables, columns, join clauses, predicates) and produce a [`Statement`]:
//! the SQL text with numbered placeholders (`$1..$n`) plus the arguments in
//! placeholder order. While a statement is being assembled placeholders are
//! written as `?` and renumbered once, at render time, so fragments can be
//! composed in any order without tracking positions by hand.
//!
//! Values always travel as arguments. The only things spliced into the SQL
//! text are identifiers (validated) and static expressions owned by this
//! crate, such as [`CURRENT_UNIX_TIME`].
//!
//! A builder that is given something it cannot render (an invalid
//! identifier, mismatched column and value counts, an update without a
//! predicate) fails in [`try_build`](Select::try_build). The infallible
//! `build` variants log the failure and hand back an empty statement, which
//! the repositories refuse to execute.

use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use thiserror::Error;
use tracing::error;

/// Server-side current time as whole seconds since the Unix epoch.
pub const CURRENT_UNIX_TIME: &str = "extract(epoch FROM NOW())";

/// A single bound argument.
///
/// Every variant carries an `Option` so nullable columns bind a typed NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    BigInt(Option<i64>),
    Double(Option<f64>),
    Bool(Option<bool>),
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
    BigIntArray(Vec<i64>),
}

impl SqlValue {
    /// Comma-joined text encoding used for multi-valued text columns.
    pub fn list(items: &[String]) -> Self {
        SqlValue::Text(Some(items.join(",")))
    }

    /// Identifier array, bound as `int8[]`.
    pub fn ids(ids: &[u64]) -> Self {
        SqlValue::BigIntArray(ids.iter().copied().map(to_bigint).collect())
    }

    fn bind<'q>(&'q self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlValue::BigInt(v) => query.bind(*v),
            SqlValue::Double(v) => query.bind(*v),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_deref()),
            SqlValue::Bytes(v) => query.bind(v.as_deref()),
            SqlValue::BigIntArray(v) => query.bind(v.as_slice()),
        }
    }
}

/// Postgres has no unsigned integers; identifiers and timestamps beyond
/// `i64::MAX` saturate rather than wrap.
fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

macro_rules! sql_value_from {
    ($($ty:ty => $variant:ident($conv:expr)),+ $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(Some(($conv)(value)))
                }
            }

            impl From<Option<$ty>> for SqlValue {
                fn from(value: Option<$ty>) -> Self {
                    SqlValue::$variant(value.map($conv))
                }
            }
        )+
    };
}

sql_value_from!(
    u64 => BigInt(to_bigint),
    u32 => BigInt(i64::from),
    u16 => BigInt(i64::from),
    u8 => BigInt(i64::from),
    i64 => BigInt(std::convert::identity),
    f64 => Double(std::convert::identity),
    f32 => Double(f64::from),
    bool => Bool(std::convert::identity),
    String => Text(std::convert::identity),
    &str => Text(str::to_owned),
    Vec<u8> => Bytes(std::convert::identity),
);

/// Reasons a builder refuses to render.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("statement has no {0}")]
    Missing(&'static str),

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("{columns} columns but {values} values")]
    ColumnCountMismatch { columns: usize, values: usize },

    #[error("fragment {fragment:?} has {placeholders} placeholders but {args} arguments")]
    PlaceholderMismatch {
        fragment: String,
        placeholders: usize,
        args: usize,
    },
}

/// A rendered, executable statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    sql: String,
    args: Vec<SqlValue>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }

    /// True for the placeholder produced when a builder failed.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Wraps the statement as `SELECT EXISTS (...)`.
    pub fn exists(self) -> Self {
        if self.is_empty() {
            return self;
        }
        Statement {
            sql: format!("SELECT EXISTS ({})", self.sql),
            args: self.args,
        }
    }

    /// Binds every argument, in order, onto a sqlx query.
    pub fn query(&self) -> Query<'_, Postgres, PgArguments> {
        self.args.iter().fold(sqlx::query::<Postgres>(&self.sql), |query, arg| arg.bind(query))
    }
}

/// A piece of SQL with `?` placeholders and the arguments that fill them.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    sql: String,
    args: Vec<SqlValue>,
}

impl Fragment {
    fn checked(sql: String, args: Vec<SqlValue>) -> Result<Self, BuildError> {
        let placeholders = sql.matches('?').count();
        if placeholders != args.len() {
            return Err(BuildError::PlaceholderMismatch {
                fragment: sql,
                placeholders,
                args: args.len(),
            });
        }
        Ok(Fragment { sql, args })
    }
}

/// Accepts `name` or `table.name` where each part is a plain SQL identifier.
fn checked_identifier(identifier: &str) -> Result<&str, BuildError> {
    let valid = !identifier.is_empty()
        && identifier.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(identifier)
    } else {
        Err(BuildError::InvalidIdentifier(identifier.to_string()))
    }
}

fn comparison(column: &str, operator: &str, value: SqlValue) -> Result<Fragment, BuildError> {
    let column = checked_identifier(column)?;
    Ok(Fragment {
        sql: format!("{column} {operator} ?"),
        args: vec![value],
    })
}

/// Accumulates SQL text and arguments in rendering order.
#[derive(Default)]
struct Writer {
    sql: String,
    args: Vec<SqlValue>,
}

impl Writer {
    fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn push_fragment(&mut self, fragment: Fragment) {
        self.sql.push_str(&fragment.sql);
        self.args.extend(fragment.args);
    }

    fn push_value(&mut self, value: SqlValue) {
        self.sql.push('?');
        self.args.push(value);
    }

    fn push_predicates(&mut self, predicates: Vec<Fragment>) {
        for (i, predicate) in predicates.into_iter().enumerate() {
            self.push(if i == 0 { " WHERE " } else { " AND " });
            self.push_fragment(predicate);
        }
    }

    fn push_list(&mut self, items: &[String]) {
        self.push(&items.join(", "));
    }

    fn finish(self) -> Statement {
        Statement {
            sql: number_placeholders(&self.sql),
            args: self.args,
        }
    }
}

fn number_placeholders(sql: &str) -> String {
    let mut numbered = String::with_capacity(sql.len() + 8);
    let mut position = 0usize;
    for c in sql.chars() {
        if c == '?' {
            position += 1;
            numbered.push('$');
            numbered.push_str(&position.to_string());
        } else {
            numbered.push(c);
        }
    }
    numbered
}

fn log_build_failure(kind: &str, err: &BuildError) {
    error!(statement = kind, error = %err, "failed to build statement");
}

macro_rules! predicate_methods {
    () => {
        /// Adds `column = value`.
        pub fn where_eq(self, column: &str, value: impl Into<SqlValue>) -> Self {
            self.compare(column, "=", value.into())
        }

        /// Adds `column > value`.
        pub fn where_gt(self, column: &str, value: impl Into<SqlValue>) -> Self {
            self.compare(column, ">", value.into())
        }

        /// Adds `column >= value`.
        pub fn where_gte(self, column: &str, value: impl Into<SqlValue>) -> Self {
            self.compare(column, ">=", value.into())
        }

        /// Adds `column < value`.
        pub fn where_lt(self, column: &str, value: impl Into<SqlValue>) -> Self {
            self.compare(column, "<", value.into())
        }

        /// Adds `column IS NULL`.
        pub fn where_null(mut self, column: &str) -> Self {
            let fragment = checked_identifier(column).map(|column| Fragment {
                sql: format!("{column} IS NULL"),
                args: Vec::new(),
            });
            self.push_predicate(fragment);
            self
        }

        /// Adds a hand-written predicate; its `?` placeholders must match `args`.
        pub fn where_raw(mut self, sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
            let fragment = Fragment::checked(sql.into(), args);
            self.push_predicate(fragment);
            self
        }

        fn compare(mut self, column: &str, operator: &str, value: SqlValue) -> Self {
            let fragment = comparison(column, operator, value);
            self.push_predicate(fragment);
            self
        }

        fn push_predicate(&mut self, fragment: Result<Fragment, BuildError>) {
            match fragment {
                Ok(fragment) => self.predicates.push(fragment),
                Err(err) => self.fail(err),
            }
        }

        fn fail(&mut self, err: BuildError) {
            self.error.get_or_insert(err);
        }
    };
}

/// `SELECT` builder.
#[derive(Debug, Clone, Default)]
pub struct Select {
    columns: Vec<String>,
    from: String,
    joins: Vec<Fragment>,
    predicates: Vec<Fragment>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    error: Option<BuildError>,
}

impl Select {
    pub fn from_table(table: &str) -> Self {
        let mut select = Select::default();
        match checked_identifier(table) {
            Ok(table) => select.from = table.to_string(),
            Err(err) => select.fail(err),
        }
        select
    }

    /// Appends identifier columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            match checked_identifier(column.as_ref()) {
                Ok(column) => self.columns.push(column.to_string()),
                Err(err) => self.fail(err),
            }
        }
        self
    }

    /// Appends a computed column, such as an aggregate or sub-select.
    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        match Fragment::checked(expression.into(), Vec::new()) {
            Ok(fragment) => self.columns.push(fragment.sql),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Appends `JOIN <clause>`.
    pub fn join(self, clause: impl Into<String>) -> Self {
        self.join_with(clause, Vec::new())
    }

    /// Appends `JOIN <clause>` where the clause carries its own placeholders.
    pub fn join_with(mut self, clause: impl Into<String>, args: Vec<SqlValue>) -> Self {
        match Fragment::checked(clause.into(), args) {
            Ok(fragment) => self.joins.push(fragment),
            Err(err) => self.fail(err),
        }
        self
    }

    predicate_methods!();

    pub fn group_by(mut self, column: &str) -> Self {
        match checked_identifier(column) {
            Ok(column) => self.group_by.push(column.to_string()),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Appends an ordering term. Ordering never carries arguments.
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        match Fragment::checked(clause.into(), Vec::new()) {
            Ok(fragment) => self.order_by.push(fragment.sql),
            Err(err) => self.fail(err),
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn try_build(self) -> Result<Statement, BuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.from.is_empty() {
            return Err(BuildError::Missing("table"));
        }
        if self.columns.is_empty() {
            return Err(BuildError::Missing("columns"));
        }

        let mut writer = Writer::default();
        writer.push("SELECT ");
        writer.push_list(&self.columns);
        writer.push(" FROM ");
        writer.push(&self.from);
        for join in self.joins {
            writer.push(" JOIN ");
            writer.push_fragment(join);
        }
        writer.push_predicates(self.predicates);
        if !self.group_by.is_empty() {
            writer.push(" GROUP BY ");
            writer.push_list(&self.group_by);
        }
        if !self.order_by.is_empty() {
            writer.push(" ORDER BY ");
            writer.push_list(&self.order_by);
        }
        if let Some(limit) = self.limit {
            writer.push(" LIMIT ");
            writer.push_value(limit.into());
        }
        if let Some(offset) = self.offset {
            writer.push(" OFFSET ");
            writer.push_value(offset.into());
        }
        Ok(writer.finish())
    }

    pub fn build(self) -> Statement {
        self.try_build().unwrap_or_else(|err| {
            log_build_failure("select", &err);
            Statement::default()
        })
    }
}

/// `INSERT` builder for a single row.
#[derive(Debug, Clone, Default)]
pub struct Insert {
    table: String,
    columns: Vec<String>,
    values: Vec<SqlValue>,
    returning: Vec<String>,
    error: Option<BuildError>,
}

impl Insert {
    pub fn into_table(table: &str) -> Self {
        let mut insert = Insert::default();
        match checked_identifier(table) {
            Ok(table) => insert.table = table.to_string(),
            Err(err) => insert.error = Some(err),
        }
        insert
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            match checked_identifier(column.as_ref()) {
                Ok(column) => self.columns.push(column.to_string()),
                Err(err) => {
                    self.error.get_or_insert(err);
                }
            }
        }
        self
    }

    pub fn values(mut self, values: impl IntoIterator<Item = SqlValue>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.returning.extend(columns.into_iter().map(|c| c.as_ref().to_string()));
        self
    }

    pub fn try_build(self) -> Result<Statement, BuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.table.is_empty() {
            return Err(BuildError::Missing("table"));
        }
        if self.columns.is_empty() {
            return Err(BuildError::Missing("columns"));
        }
        if self.columns.len() != self.values.len() {
            return Err(BuildError::ColumnCountMismatch {
                columns: self.columns.len(),
                values: self.values.len(),
            });
        }

        let mut writer = Writer::default();
        writer.push("INSERT INTO ");
        writer.push(&self.table);
        writer.push(" (");
        writer.push_list(&self.columns);
        writer.push(") VALUES (");
        for (i, value) in self.values.into_iter().enumerate() {
            if i > 0 {
                writer.push(",");
            }
            writer.push_value(value);
        }
        writer.push(")");
        if !self.returning.is_empty() {
            writer.push(" RETURNING ");
            writer.push_list(&self.returning);
        }
        Ok(writer.finish())
    }

    pub fn build(self) -> Statement {
        self.try_build().unwrap_or_else(|err| {
            log_build_failure("insert", &err);
            Statement::default()
        })
    }
}

/// `UPDATE` builder. Refuses to render without at least one predicate.
#[derive(Debug, Clone, Default)]
pub struct Update {
    table: String,
    assignments: Vec<Fragment>,
    predicates: Vec<Fragment>,
    returning: Vec<String>,
    error: Option<BuildError>,
}

impl Update {
    pub fn table(table: &str) -> Self {
        let mut update = Update::default();
        match checked_identifier(table) {
            Ok(table) => update.table = table.to_string(),
            Err(err) => update.fail(err),
        }
        update
    }

    /// Adds `column = value`.
    pub fn set(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        match comparison(column, "=", value.into()) {
            Ok(assignment) => self.assignments.push(assignment),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Adds `column = <expression>` for a static server-side expression.
    pub fn set_expression(mut self, column: &str, expression: &'static str) -> Self {
        let fragment = checked_identifier(column)
            .and_then(|column| Fragment::checked(format!("{column} = {expression}"), Vec::new()));
        match fragment {
            Ok(fragment) => self.assignments.push(fragment),
            Err(err) => self.fail(err),
        }
        self
    }

    predicate_methods!();

    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.returning.extend(columns.into_iter().map(|c| c.as_ref().to_string()));
        self
    }

    pub fn try_build(self) -> Result<Statement, BuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.table.is_empty() {
            return Err(BuildError::Missing("table"));
        }
        if self.assignments.is_empty() {
            return Err(BuildError::Missing("assignments"));
        }
        if self.predicates.is_empty() {
            return Err(BuildError::Missing("predicates"));
        }

        let mut writer = Writer::default();
        writer.push("UPDATE ");
        writer.push(&self.table);
        writer.push(" SET ");
        for (i, assignment) in self.assignments.into_iter().enumerate() {
            if i > 0 {
                writer.push(", ");
            }
            writer.push_fragment(assignment);
        }
        writer.push_predicates(self.predicates);
        if !self.returning.is_empty() {
            writer.push(" RETURNING ");
            writer.push_list(&self.returning);
        }
        Ok(writer.finish())
    }

    pub fn build(self) -> Statement {
        self.try_build().unwrap_or_else(|err| {
            log_build_failure("update", &err);
            Statement::default()
        })
    }
}
