//! SQL value types shared by the SQLite and PostgreSQL stores.
//!
//! Rows read from either store are decoded into [`Row`], a column-name keyed
//! list of [`SqlValue`]s. Accessors on [`Row`] are lenient: SQLite stores
//! booleans as integers and timestamps as text, so the accessors coerce
//! between representations instead of failing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Type hint for NULL values to ensure correct target encoding.
///
/// PostgreSQL needs a concrete parameter type even for NULL, so every NULL
/// carries the type of the column it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
}

/// SQL value enum for type-safe parameter binding and row decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL with type hint for correct parameter encoding.
    Null(SqlNullType),

    /// Boolean value.
    Bool(bool),

    /// 64-bit signed integer.
    Int(i64),

    /// 64-bit floating point.
    Float(f64),

    /// Text data of any length.
    Text(String),

    /// Timestamp normalized to UTC.
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Get the SqlNullType for this value.
    #[must_use]
    pub fn null_type(&self) -> SqlNullType {
        match self {
            SqlValue::Null(t) => *t,
            SqlValue::Bool(_) => SqlNullType::Bool,
            SqlValue::Int(_) => SqlNullType::Int,
            SqlValue::Float(_) => SqlNullType::Float,
            SqlValue::Text(_) => SqlNullType::Text,
            SqlValue::Timestamp(_) => SqlNullType::Timestamp,
        }
    }

    /// PostgreSQL cast suffix for a placeholder bound to this value.
    ///
    /// Casting every placeholder lets PostgreSQL apply assignment casts
    /// (bigint -> integer, timestamptz -> timestamp) instead of failing
    /// parameter type inference.
    #[must_use]
    pub fn pg_cast(&self) -> &'static str {
        match self.null_type() {
            SqlNullType::Bool => "::boolean",
            SqlNullType::Int => "::bigint",
            SqlNullType::Float => "::double precision",
            SqlNullType::Text => "::text",
            SqlNullType::Timestamp => "::timestamptz",
        }
    }

    /// Optional text, NULL when absent.
    pub fn opt_text(v: Option<&str>) -> Self {
        match v {
            Some(s) => SqlValue::Text(s.to_string()),
            None => SqlValue::Null(SqlNullType::Text),
        }
    }

    /// Optional integer, NULL when absent.
    pub fn opt_int(v: Option<i64>) -> Self {
        match v {
            Some(i) => SqlValue::Int(i),
            None => SqlValue::Null(SqlNullType::Int),
        }
    }

    /// Optional float, NULL when absent.
    pub fn opt_float(v: Option<f64>) -> Self {
        match v {
            Some(f) => SqlValue::Float(f),
            None => SqlValue::Null(SqlNullType::Float),
        }
    }

    /// Optional timestamp, NULL when absent.
    pub fn opt_timestamp(v: Option<DateTime<Utc>>) -> Self {
        match v {
            Some(t) => SqlValue::Timestamp(t),
            None => SqlValue::Null(SqlNullType::Timestamp),
        }
    }

    /// Render as text for stores that keep everything as TEXT (SQLite timestamps).
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null(_) => None,
            SqlValue::Bool(b) => Some(if *b { "1".into() } else { "0".into() }),
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Timestamp(t) => Some(t.to_rfc3339()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

/// Parse the timestamp spellings found in the stores and documents.
///
/// Accepts RFC 3339, the `YYYY-MM-DD HH:MM:SS[.fff]` form SQLite writes for
/// `CURRENT_TIMESTAMP`, the `T`-separated form without an offset, and a bare
/// date. Values without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// One decoded result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column value.
    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Builder form of [`Row::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Column names in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value by column name; `None` when the column was not selected.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|idx| &self.values[idx])
    }

    /// Value by position.
    pub fn get_idx(&self, idx: usize) -> Option<&SqlValue> {
        self.values.get(idx)
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(SqlValue::as_text)
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Bool(b) => Some(*b as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn float(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            SqlValue::Float(f) => Some(*f),
            SqlValue::Int(i) => Some(*i as f64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn bool(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(i) => Some(*i != 0),
            SqlValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "1" | "t" | "true" | "yes" => Some(true),
                "0" | "f" | "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn timestamp(&self, column: &str) -> Option<DateTime<Utc>> {
        match self.get(column)? {
            SqlValue::Timestamp(t) => Some(*t),
            SqlValue::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::Null(SqlNullType::Text).is_null());
        assert!(!SqlValue::Int(42).is_null());
    }

    #[test]
    fn test_pg_cast_follows_null_hint() {
        assert_eq!(SqlValue::Null(SqlNullType::Int).pg_cast(), "::bigint");
        assert_eq!(SqlValue::Text("x".into()).pg_cast(), "::text");
        assert_eq!(SqlValue::opt_timestamp(None).pg_cast(), "::timestamptz");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 7, 6, 21, 56, 3).unwrap();
        assert_eq!(parse_timestamp("2025-07-06 21:56:03"), Some(expected));
        assert_eq!(parse_timestamp("2025-07-06T21:56:03"), Some(expected));
        assert_eq!(parse_timestamp("2025-07-06T21:56:03+00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-07-06"),
            Some(Utc.with_ymd_and_hms(2025, 7, 6, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_row_accessors_coerce_sqlite_storage() {
        let row = Row::new()
            .with("id", 3i64)
            .with("admin_approved", 1i64)
            .with("quality_score", 1i64)
            .with("created_at", "2025-07-06 21:56:03")
            .with("title", "Intro");

        assert_eq!(row.int("ID"), Some(3));
        assert_eq!(row.bool("admin_approved"), Some(true));
        assert_eq!(row.float("quality_score"), Some(1.0));
        assert!(row.timestamp("created_at").is_some());
        assert_eq!(row.text("title").as_deref(), Some("Intro"));
        assert_eq!(row.text("missing"), None);
    }

    #[test]
    fn test_null_reads_as_none() {
        let mut row = Row::new();
        row.push("author", SqlValue::Null(SqlNullType::Text));
        assert_eq!(row.text("author"), None);
        assert_eq!(row.int("author"), None);
    }
}
