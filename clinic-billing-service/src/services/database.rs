//! Database service for clinic-billing-service.

use crate::models::{
    AccountingSummary, Invoice, InvoiceBalance, InvoiceItem, InvoiceListEntry, InvoiceStatus,
    ListInvoicesFilter, NewInvoice, Payment, StatusChange, StatusTransition,
    DEFAULT_PAYMENT_METHOD,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::numbering::{
    base_invoice_number, candidate_invoice_number, MAX_NUMBER_ATTEMPTS,
};
use chrono::{NaiveDate, Utc};
use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "id, invoice_number, patient_id, patient_name, patient_contact, \
     invoice_date, status, subtotal_cents, tax_cents, discount_cents, total_cents, currency, \
     notes, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, invoice_id, amount_cents, payment_date, method, notes, created_at";

pub const DUPLICATE_NUMBER_MESSAGE: &str = "Invoice number already exists.";
const AUTO_PAYMENT_NOTE: &str = "Auto-recorded: invoice created as paid";
const SETTLEMENT_NOTE: &str = "Auto-recorded: invoice marked as paid";

fn duplicate_number_error() -> AppError {
    AppError::Conflict(anyhow::anyhow!(DUPLICATE_NUMBER_MESSAGE))
}

/// Map an insert failure, treating a unique violation as a number conflict.
fn map_insert_error(e: sqlx::Error, what: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            duplicate_number_error()
        }
        _ => AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", what, e)),
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a connection pool with foreign keys enforced.
    #[instrument(skip(database_url), fields(service = "clinic-billing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to SQLite"
        );

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30));

        // An in-memory database lives exactly as long as its connection.
        if database_url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.idle_timeout(Duration::from_secs(600));
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create tables and indexes if they are missing.
    ///
    /// Applied migrations are tracked in the database itself, so concurrent or
    /// repeated calls are harmless.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        info!("Ensuring invoicing schema");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Invoicing schema ready");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Whether an invoice already uses `invoice_number`.
    #[instrument(skip(self))]
    pub async fn invoice_number_exists(&self, invoice_number: &str) -> Result<bool, AppError> {
        let existing = sqlx::query_scalar::<_, String>(
            "SELECT id FROM invoices WHERE invoice_number = ? LIMIT 1",
        )
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check invoice number: {}", e))
        })?;

        Ok(existing.is_some())
    }

    /// Pick the number for a new invoice: the caller's if it is free, otherwise a
    /// generated one.
    async fn resolve_invoice_number(&self, requested: Option<&str>) -> Result<String, AppError> {
        if let Some(number) = requested {
            if self.invoice_number_exists(number).await? {
                return Err(duplicate_number_error());
            }
            return Ok(number.to_string());
        }

        let base = base_invoice_number(Utc::now());
        for attempt in 0..MAX_NUMBER_ATTEMPTS {
            let candidate = candidate_invoice_number(&base, attempt);
            if !self.invoice_number_exists(&candidate).await? {
                return Ok(candidate);
            }
            warn!(candidate = %candidate, attempt = attempt, "Invoice number collision");
        }

        Err(AppError::Conflict(anyhow::anyhow!(
            "Unable to generate a unique invoice number."
        )))
    }

    /// Persist an invoice, its items and, when created as paid, the settling
    /// payment, all in one transaction.
    #[instrument(skip(self, input), fields(patient = %input.patient_name, status = %input.status))]
    pub async fn create_invoice(
        &self,
        input: &NewInvoice,
    ) -> Result<(Invoice, Option<Payment>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let invoice_number = self
            .resolve_invoice_number(input.invoice_number.as_deref())
            .await?;

        let invoice_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let subtotal_cents = input.subtotal_cents();
        let total_cents = input.total_cents();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                id, invoice_number, patient_id, patient_name, patient_contact, invoice_date,
                status, subtotal_cents, tax_cents, discount_cents, total_cents, currency, notes,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(&invoice_id)
        .bind(&invoice_number)
        .bind(&input.patient_id)
        .bind(&input.patient_name)
        .bind(&input.patient_contact)
        .bind(input.invoice_date)
        .bind(input.status.as_str())
        .bind(subtotal_cents)
        .bind(input.tax_cents)
        .bind(input.discount_cents)
        .bind(total_cents)
        .bind(&input.currency)
        .bind(&input.notes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "create invoice"))?;

        for item in &input.items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, item_name, unit_price_cents, quantity, line_total_cents, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&invoice_id)
            .bind(&item.name)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert invoice item: {}", e))
            })?;
        }

        let payment = if input.status == InvoiceStatus::Paid && total_cents > 0 {
            Some(
                Self::insert_payment(
                    &mut tx,
                    &invoice_id,
                    total_cents,
                    input.invoice_date,
                    DEFAULT_PAYMENT_METHOD,
                    Some(AUTO_PAYMENT_NOTE),
                )
                .await?,
            )
        } else {
            None
        };

        tx.commit().await.map_err(|e| map_insert_error(e, "commit invoice"))?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total_cents = invoice.total_cents,
            item_count = input.items.len(),
            auto_payment = payment.is_some(),
            "Invoice created"
        );

        Ok((invoice, payment))
    }

    async fn insert_payment(
        tx: &mut Transaction<'_, Sqlite>,
        invoice_id: &str,
        amount_cents: i64,
        payment_date: NaiveDate,
        method: &str,
        notes: Option<&str>,
    ) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (id, invoice_id, amount_cents, payment_date, method, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(invoice_id)
        .bind(amount_cents)
        .bind(payment_date)
        .bind(method)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))
    }

    /// Get an invoice by ID.
    #[instrument(skip(self))]
    pub async fn get_invoice(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Line items of an invoice, in insertion order.
    #[instrument(skip(self))]
    pub async fn get_invoice_items(&self, invoice_id: &str) -> Result<Vec<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_items"])
            .start_timer();

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT id, invoice_id, item_name, unit_price_cents, quantity, line_total_cents, created_at
            FROM invoice_items
            WHERE invoice_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice items: {}", e))
        })?;

        timer.observe_duration();

        Ok(items)
    }

    /// Payments recorded against an invoice, in insertion order.
    #[instrument(skip(self))]
    pub async fn get_payments(&self, invoice_id: &str) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ? ORDER BY rowid"
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    /// List invoices, most recent first, with paid and outstanding amounts.
    #[instrument(skip(self, filter), fields(status = ?filter.status))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceListEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let status = filter.status.map(|s| s.as_str());
        let query = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let invoices = sqlx::query_as::<_, InvoiceListEntry>(
            r#"
            SELECT
                i.id, i.invoice_number, i.patient_name, i.patient_contact, i.invoice_date,
                i.status, i.total_cents,
                COALESCE((SELECT SUM(p.amount_cents) FROM payments p WHERE p.invoice_id = i.id), 0)
                    AS paid_cents,
                MAX(0, i.total_cents - COALESCE(
                    (SELECT SUM(p.amount_cents) FROM payments p WHERE p.invoice_id = i.id), 0))
                    AS outstanding_cents,
                (SELECT GROUP_CONCAT(it.item_name, ', ') FROM invoice_items it WHERE it.invoice_id = i.id)
                    AS service
            FROM invoices i
            WHERE (?1 IS NULL OR i.status = ?1)
              AND (?2 IS NULL
                   OR instr(lower(i.invoice_number), lower(?2)) > 0
                   OR instr(lower(i.patient_name), lower(?2)) > 0)
            ORDER BY i.invoice_date DESC, i.created_at DESC, i.rowid DESC
            "#,
        )
        .bind(status)
        .bind(query)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Move an invoice to a new status. Marking it paid records a payment for
    /// whatever is still outstanding; both writes commit together.
    ///
    /// Returns `None` when the invoice does not exist.
    #[instrument(skip(self, change), fields(status = %change.status))]
    pub async fn update_invoice_status(
        &self,
        invoice_id: &str,
        change: &StatusChange,
    ) -> Result<Option<StatusTransition>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice_status"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        // Write first so the transaction holds the write lock before reading payments.
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = ?, updated_at = ?
            WHERE id = ?
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(change.status.as_str())
        .bind(Utc::now())
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice status: {}", e))
        })?;

        let Some(invoice) = invoice else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        let mut payment = None;
        if change.status == InvoiceStatus::Paid {
            let paid_cents = sqlx::query_scalar::<_, i64>(
                "SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE invoice_id = ?",
            )
            .bind(invoice_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e))
            })?;

            let outstanding_cents = (invoice.total_cents - paid_cents).max(0);
            if outstanding_cents > 0 {
                payment = Some(
                    Self::insert_payment(
                        &mut tx,
                        invoice_id,
                        outstanding_cents,
                        change.payment_date.unwrap_or(invoice.invoice_date),
                        change.method.as_deref().unwrap_or(DEFAULT_PAYMENT_METHOD),
                        Some(change.notes.as_deref().unwrap_or(SETTLEMENT_NOTE)),
                    )
                    .await?,
                );
            }
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit status change: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.id,
            status = %invoice.status,
            settled_cents = payment.as_ref().map(|p| p.amount_cents).unwrap_or(0),
            "Invoice status updated"
        );

        Ok(Some(StatusTransition { invoice, payment }))
    }

    // -------------------------------------------------------------------------
    // Accounting
    // -------------------------------------------------------------------------

    /// Clinic-wide cash and receivables.
    #[instrument(skip(self))]
    pub async fn accounting_summary(&self) -> Result<AccountingSummary, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["accounting_summary"])
            .start_timer();

        let balances = sqlx::query_as::<_, InvoiceBalance>(
            r#"
            SELECT
                i.status, i.total_cents,
                COALESCE((SELECT SUM(p.amount_cents) FROM payments p WHERE p.invoice_id = i.id), 0)
                    AS paid_cents
            FROM invoices i
            WHERE i.status != 'void'
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load invoice balances: {}", e))
        })?;

        let cash_received_cents =
            sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(amount_cents), 0) FROM payments")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e))
                })?;

        timer.observe_duration();

        AccountingSummary::from_balances(cash_received_cents, &balances).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Accounting totals exceed the supported range"
            ))
        })
    }
}
