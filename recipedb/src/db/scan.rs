//! Positional row decoding.
//!
//! Entity reads select columns in a fixed order (see
//! [`TableSchema::select_columns`](crate::db::schema::TableSchema::select_columns)),
//! so decoding walks the row left to right instead of looking columns up by
//! name. Unsigned values are stored as `BIGINT`; reading a negative value is
//! a decode error rather than a silent wrap.

use std::error::Error as StdError;

use sqlx::postgres::PgRow;
use sqlx::{Decode, Postgres, Row, Type};

/// Cursor over the columns of one row.
pub struct RowScanner<'r> {
    row: &'r PgRow,
    position: usize,
}

impl<'r> RowScanner<'r> {
    pub fn new(row: &'r PgRow) -> Self {
        Self { row, position: 0 }
    }

    /// Decodes the next column.
    pub fn next<T>(&mut self) -> Result<T, sqlx::Error>
    where
        T: Decode<'r, Postgres> + Type<Postgres>,
    {
        let value = self.row.try_get(self.position)?;
        self.position += 1;
        Ok(value)
    }

    /// Decodes the next `BIGINT` column into an unsigned type.
    pub fn unsigned<T>(&mut self) -> Result<T, sqlx::Error>
    where
        T: TryFrom<i64>,
        T::Error: StdError + Send + Sync + 'static,
    {
        let index = self.position;
        let raw: i64 = self.next()?;
        narrow(index, raw)
    }

    /// Decodes the next nullable `BIGINT` column into an unsigned type.
    pub fn optional_unsigned<T>(&mut self) -> Result<Option<T>, sqlx::Error>
    where
        T: TryFrom<i64>,
        T::Error: StdError + Send + Sync + 'static,
    {
        let index = self.position;
        let raw: Option<i64> = self.next()?;
        raw.map(|raw| narrow(index, raw)).transpose()
    }

    /// Decodes the next comma-joined text column. An empty string is an
    /// empty list.
    pub fn list(&mut self) -> Result<Vec<String>, sqlx::Error> {
        let raw: String = self.next()?;
        Ok(decode_list(&raw))
    }
}

fn narrow<T>(index: usize, raw: i64) -> Result<T, sqlx::Error>
where
    T: TryFrom<i64>,
    T::Error: StdError + Send + Sync + 'static,
{
    T::try_from(raw).map_err(|err| sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: Box::new(err),
    })
}

pub fn decode_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(',').map(str::to_string).collect()
    }
}
