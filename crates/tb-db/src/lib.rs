//! Storage layer for time billing.
//!
//! Provides persistence for recorded time, invoices and payments using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! Calendar dates are stored as TEXT in `YYYY-MM-DD` form and timestamps as
//! TEXT in RFC 3339 (e.g., `2025-01-15T10:30:00.000Z`), so lexicographic
//! ordering matches chronological ordering. Durations are stored as integer
//! milliseconds.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tb_core::{TimeRecord, ValidationError};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored date could not be parsed.
    #[error("invalid date in {table}: {value}")]
    InvalidDate {
        table: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row failed domain validation.
    #[error("invalid time entry {id}: {source}")]
    InvalidEntry {
        id: i64,
        #[source]
        source: ValidationError,
    },
    /// No invoice exists with the given number.
    #[error("invoice {0} not found")]
    InvoiceNotFound(i64),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An invoice ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub rate: f64,
    /// Reconciled billed time.
    pub billed: Duration,
    pub amount: f64,
}

/// A stored invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRecord {
    pub number: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub rate: f64,
    pub billed: Duration,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// A stored payment against an invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub id: i64,
    pub invoice_number: i64,
    pub paid_on: NaiveDate,
    pub amount: f64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            -- Raw recorded time, exact to the millisecond
            CREATE TABLE IF NOT EXISTS time_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                project TEXT NOT NULL,
                activity TEXT NOT NULL,
                duration_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_time_entries_date ON time_entries(date);

            -- billed_ms: reconciled total, a whole number of tenth hours
            CREATE TABLE IF NOT EXISTS invoices (
                number INTEGER PRIMARY KEY AUTOINCREMENT,
                period_start TEXT NOT NULL,
                period_end TEXT NOT NULL,
                rate REAL NOT NULL,
                billed_ms INTEGER NOT NULL,
                amount REAL NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                invoice_number INTEGER NOT NULL,
                paid_on TEXT NOT NULL,
                amount REAL NOT NULL,
                FOREIGN KEY (invoice_number) REFERENCES invoices(number) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_payments_invoice ON payments(invoice_number);
            ",
        )?;
        Ok(())
    }

    /// Stores a time entry and returns its ID.
    pub fn insert_time_entry(&mut self, record: &TimeRecord) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO time_entries (date, project, activity, duration_ms) VALUES (?, ?, ?, ?)",
            params![
                format_date(record.date),
                record.project.as_str(),
                record.activity.as_str(),
                record.duration.num_milliseconds(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, project = %record.project, "stored time entry");
        Ok(id)
    }

    /// Lists time entries dated within `[from, to]`, inclusive.
    ///
    /// Entries are ordered by date, then by the order they were recorded.
    pub fn list_time_entries(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimeRecord>, DbError> {
        if to < from {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, date, project, activity, duration_ms
            FROM time_entries
            WHERE date >= ? AND date <= ?
            ORDER BY date ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([format_date(from), format_date(to)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            let (id, date, project, activity, duration_ms) = row?;
            let date = parse_date(&date, "time_entries")?;
            let record =
                TimeRecord::new(date, project, activity, Duration::milliseconds(duration_ms))
                    .map_err(|source| DbError::InvalidEntry { id, source })?;
            entries.push(record);
        }
        Ok(entries)
    }

    /// Stores an invoice, assigning it the next invoice number.
    pub fn insert_invoice(&mut self, invoice: &NewInvoice) -> Result<InvoiceRecord, DbError> {
        self.insert_invoice_at(invoice, Utc::now())
    }

    fn insert_invoice_at(
        &mut self,
        invoice: &NewInvoice,
        created_at: DateTime<Utc>,
    ) -> Result<InvoiceRecord, DbError> {
        self.conn.execute(
            "
            INSERT INTO invoices (period_start, period_end, rate, billed_ms, amount, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                format_date(invoice.period_start),
                format_date(invoice.period_end),
                invoice.rate,
                invoice.billed.num_milliseconds(),
                invoice.amount,
                format_timestamp(created_at),
            ],
        )?;
        let number = self.conn.last_insert_rowid();
        tracing::info!(number, amount = invoice.amount, "stored invoice");
        self.get_invoice(number)
    }

    /// Returns the invoice with the given number.
    pub fn get_invoice(&self, number: i64) -> Result<InvoiceRecord, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT number, period_start, period_end, rate, billed_ms, amount, created_at
                FROM invoices
                WHERE number = ?
                ",
                [number],
                raw_invoice,
            )
            .optional()?;
        row.ok_or(DbError::InvoiceNotFound(number))?.parse()
    }

    /// Lists all invoices ordered by number.
    pub fn list_invoices(&self) -> Result<Vec<InvoiceRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT number, period_start, period_end, rate, billed_ms, amount, created_at
            FROM invoices
            ORDER BY number ASC
            ",
        )?;
        let rows = stmt.query_map([], raw_invoice)?;
        let mut invoices = Vec::new();
        for row in rows {
            invoices.push(row?.parse()?);
        }
        Ok(invoices)
    }

    /// Records a payment against an existing invoice.
    pub fn insert_payment(
        &mut self,
        invoice_number: i64,
        paid_on: NaiveDate,
        amount: f64,
    ) -> Result<PaymentRecord, DbError> {
        // Surface a missing invoice by number rather than as a constraint failure
        self.get_invoice(invoice_number)?;
        self.conn.execute(
            "INSERT INTO payments (invoice_number, paid_on, amount) VALUES (?, ?, ?)",
            params![invoice_number, format_date(paid_on), amount],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(invoice_number, amount, "stored payment");
        Ok(PaymentRecord {
            id,
            invoice_number,
            paid_on,
            amount,
        })
    }

    /// Lists payments for an invoice ordered by date.
    pub fn list_payments(&self, invoice_number: i64) -> Result<Vec<PaymentRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, invoice_number, paid_on, amount
            FROM payments
            WHERE invoice_number = ?
            ORDER BY paid_on ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([invoice_number], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;
        let mut payments = Vec::new();
        for row in rows {
            let (id, invoice_number, paid_on, amount) = row?;
            payments.push(PaymentRecord {
                id,
                invoice_number,
                paid_on: parse_date(&paid_on, "payments")?,
                amount,
            });
        }
        Ok(payments)
    }

    /// Returns the total paid against an invoice.
    pub fn amount_paid(&self, invoice_number: i64) -> Result<f64, DbError> {
        let paid = self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM payments WHERE invoice_number = ?",
            [invoice_number],
            |row| row.get(0),
        )?;
        Ok(paid)
    }
}

/// Invoice columns as read from SQLite, before date parsing.
struct RawInvoice {
    number: i64,
    period_start: String,
    period_end: String,
    rate: f64,
    billed_ms: i64,
    amount: f64,
    created_at: String,
}

fn raw_invoice(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawInvoice> {
    Ok(RawInvoice {
        number: row.get(0)?,
        period_start: row.get(1)?,
        period_end: row.get(2)?,
        rate: row.get(3)?,
        billed_ms: row.get(4)?,
        amount: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl RawInvoice {
    fn parse(self) -> Result<InvoiceRecord, DbError> {
        Ok(InvoiceRecord {
            number: self.number,
            period_start: parse_date(&self.period_start, "invoices")?,
            period_end: parse_date(&self.period_end, "invoices")?,
            rate: self.rate,
            billed: Duration::milliseconds(self.billed_ms),
            amount: self.amount,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str, table: &'static str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| DbError::InvalidDate {
        table,
        value: value.to_string(),
        source,
    })
}

fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::InvalidDate {
            table: "invoices",
            value: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn entry(month: u32, day: u32, project: &str, activity: &str, minutes: i64) -> TimeRecord {
        TimeRecord::new(
            date(month, day),
            project,
            activity,
            Duration::minutes(minutes),
        )
        .unwrap()
    }

    fn january_invoice() -> NewInvoice {
        NewInvoice {
            period_start: date(1, 1),
            period_end: date(1, 31),
            rate: 100.0,
            billed: Duration::minutes(282),
            amount: 470.0,
        }
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "time_entries"),
            vec!["id", "date", "project", "activity", "duration_ms"]
        );
        assert_eq!(
            table_columns(&db.conn, "invoices"),
            vec![
                "number",
                "period_start",
                "period_end",
                "rate",
                "billed_ms",
                "amount",
                "created_at",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "payments"),
            vec!["id", "invoice_number", "paid_on", "amount"]
        );
    }

    #[test]
    fn reopening_database_keeps_data() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("tb.db");

        {
            let mut db = Database::open(&path).unwrap();
            db.insert_time_entry(&entry(1, 6, "acme", "design", 30))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let entries = db.list_time_entries(date(1, 1), date(1, 31)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn time_entries_filtered_by_inclusive_range() {
        let mut db = Database::open_in_memory().unwrap();
        for record in [
            entry(1, 31, "acme", "design", 10),
            entry(2, 1, "acme", "design", 20),
            entry(2, 28, "globex", "support", 30),
            entry(3, 1, "globex", "support", 40),
        ] {
            db.insert_time_entry(&record).unwrap();
        }

        let february = db.list_time_entries(date(2, 1), date(2, 28)).unwrap();

        let minutes: Vec<_> = february
            .iter()
            .map(|r| r.duration.num_minutes())
            .collect();
        assert_eq!(minutes, vec![20, 30]);
    }

    #[test]
    fn time_entries_keep_recording_order_within_a_day() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_time_entry(&entry(1, 8, "globex", "support", 5))
            .unwrap();
        db.insert_time_entry(&entry(1, 7, "acme", "review", 15))
            .unwrap();
        db.insert_time_entry(&entry(1, 8, "acme", "design", 25))
            .unwrap();

        let entries = db.list_time_entries(date(1, 1), date(1, 31)).unwrap();

        let projects: Vec<_> = entries.iter().map(|r| r.project.as_str()).collect();
        assert_eq!(projects, vec!["acme", "globex", "acme"]);
        assert_eq!(entries[0], entry(1, 7, "acme", "review", 15));
    }

    #[test]
    fn time_entries_keep_millisecond_precision() {
        let mut db = Database::open_in_memory().unwrap();
        let record = TimeRecord::new(
            date(1, 6),
            "acme",
            "design",
            Duration::milliseconds(8_388_123),
        )
        .unwrap();
        db.insert_time_entry(&record).unwrap();

        let entries = db.list_time_entries(date(1, 6), date(1, 6)).unwrap();
        assert_eq!(entries, vec![record]);
    }

    #[test]
    fn reversed_range_is_empty() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_time_entry(&entry(1, 6, "acme", "design", 30))
            .unwrap();
        let entries = db.list_time_entries(date(1, 31), date(1, 1)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn invoices_are_numbered_sequentially() {
        let mut db = Database::open_in_memory().unwrap();
        let created_at = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();

        let first = db.insert_invoice_at(&january_invoice(), created_at).unwrap();
        let second = db.insert_invoice_at(&january_invoice(), created_at).unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(first.billed, Duration::minutes(282));
        assert_eq!(first.created_at, created_at);
        assert_eq!(first.period_end, date(1, 31));
        assert_eq!(db.list_invoices().unwrap(), vec![first, second]);
    }

    #[test]
    fn missing_invoice_is_reported() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_invoice(7).unwrap_err();
        assert!(matches!(err, DbError::InvoiceNotFound(7)));
    }

    #[test]
    fn payments_accumulate_against_invoice() {
        let mut db = Database::open_in_memory().unwrap();
        let invoice = db.insert_invoice(&january_invoice()).unwrap();

        assert!(db.amount_paid(invoice.number).unwrap().abs() < f64::EPSILON);

        db.insert_payment(invoice.number, date(2, 20), 200.0)
            .unwrap();
        db.insert_payment(invoice.number, date(2, 10), 70.0)
            .unwrap();

        let payments = db.list_payments(invoice.number).unwrap();
        let dates: Vec<_> = payments.iter().map(|p| p.paid_on).collect();
        assert_eq!(dates, vec![date(2, 10), date(2, 20)]);
        assert!((db.amount_paid(invoice.number).unwrap() - 270.0).abs() < f64::EPSILON);
    }

    #[test]
    fn payment_for_missing_invoice_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let err = db.insert_payment(3, date(2, 1), 10.0).unwrap_err();
        assert!(matches!(err, DbError::InvoiceNotFound(3)));
        assert!(db.list_payments(3).unwrap().is_empty());
    }
}
