//! Column decoding helpers shared by the row scanners.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Error as SqlError, Row};

use crate::error::{Result, StorageError};

/// Formats a `DateTime<Utc>` as fixed-width ISO 8601 TEXT for SQLite.
///
/// Nanosecond precision keeps stored values equal to their input, and the
/// fixed width keeps string comparison chronological.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.9fZ").to_string()
}

/// Reads a TEXT timestamp column written by [`format_datetime`].
pub(crate) fn datetime_column(row: &Row<'_>, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let idx = row.as_ref().column_index(name)?;
    let raw: String = row.get(idx)?;
    parse_datetime(idx, &raw)
}

/// Nullable variant of [`datetime_column`].
pub(crate) fn opt_datetime_column(
    row: &Row<'_>,
    name: &str,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let idx = row.as_ref().column_index(name)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_datetime(idx, &s)).transpose()
}

fn parse_datetime(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SqlError::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads a TEXT column holding one of the closed enums.
pub(crate) fn enum_column<T>(row: &Row<'_>, name: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let idx = row.as_ref().column_index(name)?;
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| SqlError::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Nullable variant of [`enum_column`].
pub(crate) fn opt_enum_column<T>(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let idx = row.as_ref().column_index(name)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|e| SqlError::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Maps `QueryReturnedNoRows` to [`StorageError::NotFound`].
pub(crate) fn or_not_found<T>(
    result: rusqlite::Result<T>,
    entity: &str,
    id: impl ToString,
) -> Result<T> {
    result.map_err(|e| match e {
        SqlError::QueryReturnedNoRows => StorageError::not_found(entity, id),
        other => StorageError::from(other),
    })
}

/// Converts a 0-row `DELETE`/`UPDATE` into [`StorageError::NotFound`].
pub(crate) fn expect_affected(affected: usize, entity: &str, id: impl ToString) -> Result<()> {
    if affected == 0 {
        return Err(StorageError::not_found(entity, id));
    }
    Ok(())
}
