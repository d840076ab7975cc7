use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::application::DataAccess;
use crate::domain::{
    AccountMovement, AdjustmentPeriod, Client, ClientId, ClientRef, ClientStatus, Invoice,
    InvoiceStatus, Job, JobStatus, JobType, MovementKind, OccasionalClient, PriceAdjustment,
    TenantId,
};

use super::MIGRATION_001_INITIAL;

const DATE_FORMAT: &str = "%Y-%m-%d";

const CLIENT_COLUMNS: &str =
    "id, tenant_id, client_number, name, tax_id, email, phone, address, status, \
     subscription_value, adjustment_period, last_adjustment_date, consumed_hours, \
     included_hours, notes, created_at";

const OCCASIONAL_COLUMNS: &str =
    "id, tenant_id, client_number, name, tax_id, email, phone, notes, created_at";

const ADJUSTMENT_COLUMNS: &str =
    "id, tenant_id, client_id, adjustment_date, previous_adjustment_date, old_value, \
     new_value, rate, note, created_at";

const INVOICE_COLUMNS: &str =
    "id, tenant_id, client_id, occasional_client_id, number, issue_date, period, items, \
     tax_rate, subtotal, tax, total, status, payment_date, notes, created_at";

const JOB_COLUMNS: &str =
    "id, tenant_id, job_number, client_id, occasional_client_id, request_date, \
     completion_date, description, job_type, status, hours_spent, value, invoice_id, notes, \
     created_at";

const MOVEMENT_COLUMNS: &str =
    "id, tenant_id, client_id, occasional_client_id, sequence, date, kind, description, \
     debit, credit, balance, invoice_id, recorded_at";

/// SQLite-backed storage for clients, adjustments, invoices and account movements.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Get the next movement sequence number and increment the counter.
    async fn next_sequence(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'movement_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    /// Insert a movement on an open connection, assigning its sequence and
    /// advisory running balance.
    async fn insert_movement(
        conn: &mut SqliteConnection,
        movement: &mut AccountMovement,
    ) -> Result<()> {
        movement.sequence = Self::next_sequence(conn).await?;

        let (client_id, occasional_id) = movement.client.columns();
        let previous: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT balance FROM account_movements
            WHERE tenant_id = ? AND client_id IS ? AND occasional_client_id IS ?
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(movement.tenant_id.to_string())
        .bind(client_id.map(|id| id.to_string()))
        .bind(occasional_id.map(|id| id.to_string()))
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to read previous balance")?;
        movement.balance = previous.unwrap_or(0).saturating_add(movement.net());

        sqlx::query(
            r#"
            INSERT INTO account_movements (id, tenant_id, client_id, occasional_client_id, sequence, date, kind, description, debit, credit, balance, invoice_id, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement.id.to_string())
        .bind(movement.tenant_id.to_string())
        .bind(client_id.map(|id| id.to_string()))
        .bind(occasional_id.map(|id| id.to_string()))
        .bind(movement.sequence)
        .bind(format_date(movement.date))
        .bind(movement.kind.as_str())
        .bind(&movement.description)
        .bind(movement.debit)
        .bind(movement.credit)
        .bind(movement.balance)
        .bind(movement.invoice_id.map(|id| id.to_string()))
        .bind(movement.recorded_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save account movement")?;

        Ok(())
    }

    fn row_to_client(row: &SqliteRow) -> Result<Client> {
        let status_str: String = row.get("status");
        let period_str: Option<String> = row.get("adjustment_period");
        let last_str: Option<String> = row.get("last_adjustment_date");

        Ok(Client {
            id: uuid_column(row, "id")?,
            tenant_id: uuid_column(row, "tenant_id")?,
            client_number: row.get("client_number"),
            name: row.get("name"),
            tax_id: row.get("tax_id"),
            email: row.get("email"),
            phone: row.get("phone"),
            address: row.get("address"),
            status: ClientStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid client status: {}", status_str))?,
            subscription_value: row.get("subscription_value"),
            adjustment_period: period_str
                .map(|s| {
                    AdjustmentPeriod::from_str(&s)
                        .ok_or_else(|| anyhow::anyhow!("Invalid adjustment period: {}", s))
                })
                .transpose()?,
            last_adjustment_date: last_str.as_deref().map(parse_date).transpose()?,
            consumed_hours: row.get("consumed_hours"),
            included_hours: row.get("included_hours"),
            notes: row.get("notes"),
            created_at: timestamp_column(row, "created_at")?,
        })
    }

    fn row_to_occasional_client(row: &SqliteRow) -> Result<OccasionalClient> {
        Ok(OccasionalClient {
            id: uuid_column(row, "id")?,
            tenant_id: uuid_column(row, "tenant_id")?,
            client_number: row.get("client_number"),
            name: row.get("name"),
            tax_id: row.get("tax_id"),
            email: row.get("email"),
            phone: row.get("phone"),
            notes: row.get("notes"),
            created_at: timestamp_column(row, "created_at")?,
        })
    }

    fn row_to_adjustment(row: &SqliteRow) -> Result<PriceAdjustment> {
        let date_str: String = row.get("adjustment_date");
        let previous_str: Option<String> = row.get("previous_adjustment_date");
        let rate_str: String = row.get("rate");

        Ok(PriceAdjustment {
            id: uuid_column(row, "id")?,
            tenant_id: uuid_column(row, "tenant_id")?,
            client_id: uuid_column(row, "client_id")?,
            adjustment_date: parse_date(&date_str)?,
            previous_adjustment_date: previous_str.as_deref().map(parse_date).transpose()?,
            old_value: row.get("old_value"),
            new_value: row.get("new_value"),
            rate: rate_str
                .parse::<Decimal>()
                .with_context(|| format!("Invalid adjustment rate: {}", rate_str))?,
            note: row.get("note"),
            created_at: timestamp_column(row, "created_at")?,
        })
    }

    fn row_to_invoice(row: &SqliteRow) -> Result<Invoice> {
        let issue_str: String = row.get("issue_date");
        let payment_str: Option<String> = row.get("payment_date");
        let items_json: String = row.get("items");
        let tax_rate_str: String = row.get("tax_rate");
        let status_str: String = row.get("status");

        Ok(Invoice {
            id: uuid_column(row, "id")?,
            tenant_id: uuid_column(row, "tenant_id")?,
            client: client_ref_columns(row)?,
            number: row.get("number"),
            issue_date: parse_date(&issue_str)?,
            period: row.get("period"),
            items: serde_json::from_str(&items_json).context("Invalid invoice items")?,
            tax_rate: tax_rate_str
                .parse::<Decimal>()
                .with_context(|| format!("Invalid tax rate: {}", tax_rate_str))?,
            subtotal: row.get("subtotal"),
            tax: row.get("tax"),
            total: row.get("total"),
            status: InvoiceStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid invoice status: {}", status_str))?,
            payment_date: payment_str.as_deref().map(parse_date).transpose()?,
            notes: row.get("notes"),
            created_at: timestamp_column(row, "created_at")?,
        })
    }

    fn row_to_job(row: &SqliteRow) -> Result<Job> {
        let request_str: String = row.get("request_date");
        let completion_str: Option<String> = row.get("completion_date");
        let type_str: String = row.get("job_type");
        let status_str: String = row.get("status");

        Ok(Job {
            id: uuid_column(row, "id")?,
            tenant_id: uuid_column(row, "tenant_id")?,
            job_number: row.get("job_number"),
            client: client_ref_columns(row)?,
            request_date: parse_date(&request_str)?,
            completion_date: completion_str.as_deref().map(parse_date).transpose()?,
            description: row.get("description"),
            job_type: JobType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid job type: {}", type_str))?,
            status: JobStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid job status: {}", status_str))?,
            hours_spent: row.get("hours_spent"),
            value: row.get("value"),
            invoice_id: optional_uuid_column(row, "invoice_id")?,
            notes: row.get("notes"),
            created_at: timestamp_column(row, "created_at")?,
        })
    }

    fn row_to_movement(row: &SqliteRow) -> Result<AccountMovement> {
        let date_str: String = row.get("date");
        let kind_str: String = row.get("kind");
        let recorded_str: String = row.get("recorded_at");

        Ok(AccountMovement {
            id: uuid_column(row, "id")?,
            tenant_id: uuid_column(row, "tenant_id")?,
            client: client_ref_columns(row)?,
            sequence: row.get("sequence"),
            date: parse_date(&date_str)?,
            kind: MovementKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid movement kind: {}", kind_str))?,
            description: row.get("description"),
            debit: row.get("debit"),
            credit: row.get("credit"),
            balance: row.get("balance"),
            invoice_id: optional_uuid_column(row, "invoice_id")?,
            recorded_at: DateTime::parse_from_rfc3339(&recorded_str)
                .context("Invalid recorded_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl DataAccess for Repository {
    // ========================
    // Escalation
    // ========================

    async fn fetch_clients_due_for_adjustment(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<Vec<Client>> {
        let query = format!(
            "SELECT {} FROM clients \
             WHERE tenant_id = ? AND status = 'active' \
             AND next_adjustment_date IS NOT NULL AND next_adjustment_date <= ? \
             ORDER BY next_adjustment_date, name",
            CLIENT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .bind(format_date(as_of))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch clients due for adjustment")?;

        rows.iter().map(Self::row_to_client).collect()
    }

    async fn persist_adjustment(&self, client: &Client, record: &PriceAdjustment) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE clients
            SET subscription_value = ?, last_adjustment_date = ?, next_adjustment_date = ?
            WHERE id = ? AND tenant_id = ?
              AND subscription_value = ? AND last_adjustment_date IS ?
            "#,
        )
        .bind(client.subscription_value)
        .bind(client.last_adjustment_date.map(format_date))
        .bind(client.next_adjustment_date().map(format_date))
        .bind(client.id.to_string())
        .bind(client.tenant_id.to_string())
        .bind(record.old_value)
        .bind(record.previous_adjustment_date.map(format_date))
        .execute(&mut *tx)
        .await
        .context("Failed to update client value")?;

        // Zero rows means the client is gone or was re-priced since it was read
        if updated.rows_affected() != 1 {
            bail!(
                "Client {} not found or changed since it was read; adjustment not applied",
                client.id
            );
        }

        sqlx::query(
            r#"
            INSERT INTO price_adjustments (id, tenant_id, client_id, adjustment_date, previous_adjustment_date, old_value, new_value, rate, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.tenant_id.to_string())
        .bind(record.client_id.to_string())
        .bind(format_date(record.adjustment_date))
        .bind(record.previous_adjustment_date.map(format_date))
        .bind(record.old_value)
        .bind(record.new_value)
        .bind(record.rate.to_string())
        .bind(&record.note)
        .bind(record.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save price adjustment")?;

        tx.commit().await.context("Failed to commit adjustment")?;
        Ok(())
    }

    async fn list_adjustments(
        &self,
        tenant_id: TenantId,
        client_id: Option<ClientId>,
    ) -> Result<Vec<PriceAdjustment>> {
        let mut query = format!(
            "SELECT {} FROM price_adjustments WHERE tenant_id = ?",
            ADJUSTMENT_COLUMNS
        );
        if client_id.is_some() {
            query.push_str(" AND client_id = ?");
        }
        query.push_str(" ORDER BY adjustment_date, created_at");

        let mut sql_query = sqlx::query(&query).bind(tenant_id.to_string());
        if let Some(id) = client_id {
            sql_query = sql_query.bind(id.to_string());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list price adjustments")?;

        rows.iter().map(Self::row_to_adjustment).collect()
    }

    // ========================
    // Ledger
    // ========================

    async fn fetch_movements(
        &self,
        tenant_id: TenantId,
        client: ClientRef,
    ) -> Result<Vec<AccountMovement>> {
        let column = match client {
            ClientRef::Regular(_) => "client_id",
            ClientRef::Occasional(_) => "occasional_client_id",
        };
        let query = format!(
            "SELECT {} FROM account_movements WHERE tenant_id = ? AND {} = ? ORDER BY sequence",
            MOVEMENT_COLUMNS, column
        );
        let rows = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .bind(client.id().to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch account movements")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    async fn fetch_all_movements(&self, tenant_id: TenantId) -> Result<Vec<AccountMovement>> {
        let query = format!(
            "SELECT {} FROM account_movements WHERE tenant_id = ? ORDER BY sequence",
            MOVEMENT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch account movements")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    async fn persist_movement(&self, movement: &mut AccountMovement) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Self::insert_movement(&mut *tx, movement).await?;
        tx.commit().await.context("Failed to commit movement")?;
        Ok(())
    }

    // ========================
    // Clients
    // ========================

    async fn save_client(&self, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, tenant_id, client_number, name, tax_id, email, phone, address, status, subscription_value, adjustment_period, last_adjustment_date, next_adjustment_date, consumed_hours, included_hours, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(client.id.to_string())
        .bind(client.tenant_id.to_string())
        .bind(&client.client_number)
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.status.as_str())
        .bind(client.subscription_value)
        .bind(client.adjustment_period.map(|p| p.as_str()))
        .bind(client.last_adjustment_date.map(format_date))
        .bind(client.next_adjustment_date().map(format_date))
        .bind(client.consumed_hours)
        .bind(client.included_hours)
        .bind(&client.notes)
        .bind(client.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save client")?;
        Ok(())
    }

    async fn update_client(&self, client: &Client) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE clients
            SET name = ?, tax_id = ?, email = ?, phone = ?, address = ?, status = ?,
                subscription_value = ?, adjustment_period = ?, last_adjustment_date = ?,
                next_adjustment_date = ?, consumed_hours = ?, included_hours = ?, notes = ?
            WHERE id = ? AND tenant_id = ?
            "#,
        )
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.status.as_str())
        .bind(client.subscription_value)
        .bind(client.adjustment_period.map(|p| p.as_str()))
        .bind(client.last_adjustment_date.map(format_date))
        .bind(client.next_adjustment_date().map(format_date))
        .bind(client.consumed_hours)
        .bind(client.included_hours)
        .bind(&client.notes)
        .bind(client.id.to_string())
        .bind(client.tenant_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update client")?;

        if updated.rows_affected() != 1 {
            bail!("Client {} not found for tenant {}", client.id, client.tenant_id);
        }
        Ok(())
    }

    async fn get_client_by_name(&self, tenant_id: TenantId, name: &str) -> Result<Option<Client>> {
        let query = format!(
            "SELECT {} FROM clients WHERE tenant_id = ? AND name = ?",
            CLIENT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch client by name")?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    async fn list_clients(&self, tenant_id: TenantId) -> Result<Vec<Client>> {
        let query = format!(
            "SELECT {} FROM clients WHERE tenant_id = ? ORDER BY name",
            CLIENT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list clients")?;

        rows.iter().map(Self::row_to_client).collect()
    }

    async fn last_client_number(&self, tenant_id: TenantId) -> Result<Option<String>> {
        // Numbers are zero-padded but may outgrow the padding, so order numerically
        sqlx::query_scalar(
            "SELECT client_number FROM clients WHERE tenant_id = ? ORDER BY CAST(client_number AS INTEGER) DESC LIMIT 1",
        )
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch last client number")
    }

    async fn save_occasional_client(&self, client: &OccasionalClient) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO occasional_clients (id, tenant_id, client_number, name, tax_id, email, phone, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(client.id.to_string())
        .bind(client.tenant_id.to_string())
        .bind(&client.client_number)
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.notes)
        .bind(client.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save occasional client")?;
        Ok(())
    }

    async fn get_occasional_client_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<Option<OccasionalClient>> {
        let query = format!(
            "SELECT {} FROM occasional_clients WHERE tenant_id = ? AND name = ?",
            OCCASIONAL_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch occasional client by name")?;

        row.as_ref().map(Self::row_to_occasional_client).transpose()
    }

    async fn list_occasional_clients(&self, tenant_id: TenantId) -> Result<Vec<OccasionalClient>> {
        let query = format!(
            "SELECT {} FROM occasional_clients WHERE tenant_id = ? ORDER BY name",
            OCCASIONAL_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list occasional clients")?;

        rows.iter().map(Self::row_to_occasional_client).collect()
    }

    async fn last_occasional_client_number(&self, tenant_id: TenantId) -> Result<Option<String>> {
        sqlx::query_scalar(
            "SELECT client_number FROM occasional_clients WHERE tenant_id = ? ORDER BY CAST(client_number AS INTEGER) DESC LIMIT 1",
        )
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch last occasional client number")
    }

    // ========================
    // Invoices
    // ========================

    async fn persist_invoice(
        &self,
        invoice: &Invoice,
        movement: &mut AccountMovement,
    ) -> Result<()> {
        let (client_id, occasional_id) = invoice.client.columns();
        let items_json = serde_json::to_string(&invoice.items)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO invoices (id, tenant_id, client_id, occasional_client_id, number, issue_date, period, items, tax_rate, subtotal, tax, total, status, payment_date, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice.id.to_string())
        .bind(invoice.tenant_id.to_string())
        .bind(client_id.map(|id| id.to_string()))
        .bind(occasional_id.map(|id| id.to_string()))
        .bind(&invoice.number)
        .bind(format_date(invoice.issue_date))
        .bind(&invoice.period)
        .bind(&items_json)
        .bind(invoice.tax_rate.to_string())
        .bind(invoice.subtotal)
        .bind(invoice.tax)
        .bind(invoice.total)
        .bind(invoice.status.as_str())
        .bind(invoice.payment_date.map(format_date))
        .bind(&invoice.notes)
        .bind(invoice.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save invoice")?;

        Self::insert_movement(&mut *tx, movement).await?;

        tx.commit().await.context("Failed to commit invoice")?;
        Ok(())
    }

    async fn update_invoice(
        &self,
        invoice: &Invoice,
        revision: Option<&mut AccountMovement>,
    ) -> Result<()> {
        let items_json = serde_json::to_string(&invoice.items)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE invoices
            SET period = ?, items = ?, tax_rate = ?, subtotal = ?, tax = ?, total = ?, notes = ?
            WHERE id = ? AND tenant_id = ? AND status != 'paid'
            "#,
        )
        .bind(&invoice.period)
        .bind(&items_json)
        .bind(invoice.tax_rate.to_string())
        .bind(invoice.subtotal)
        .bind(invoice.tax)
        .bind(invoice.total)
        .bind(&invoice.notes)
        .bind(invoice.id.to_string())
        .bind(invoice.tenant_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update invoice")?;

        if updated.rows_affected() != 1 {
            bail!("Invoice {} is missing or already paid", invoice.number);
        }

        if let Some(movement) = revision {
            Self::insert_movement(&mut *tx, movement).await?;
        }

        tx.commit().await.context("Failed to commit invoice update")?;
        Ok(())
    }

    async fn persist_payment(
        &self,
        invoice: &Invoice,
        movement: &mut AccountMovement,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE invoices
            SET status = ?, payment_date = ?
            WHERE id = ? AND tenant_id = ? AND status != 'paid'
            "#,
        )
        .bind(invoice.status.as_str())
        .bind(invoice.payment_date.map(format_date))
        .bind(invoice.id.to_string())
        .bind(invoice.tenant_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to mark invoice paid")?;

        if updated.rows_affected() != 1 {
            bail!("Invoice {} is missing or already paid", invoice.number);
        }

        Self::insert_movement(&mut *tx, movement).await?;

        tx.commit().await.context("Failed to commit payment")?;
        Ok(())
    }

    async fn update_invoice_status(&self, invoice: &Invoice) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE invoices SET status = ? WHERE id = ? AND tenant_id = ? AND status != 'paid'",
        )
        .bind(invoice.status.as_str())
        .bind(invoice.id.to_string())
        .bind(invoice.tenant_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update invoice status")?;

        if updated.rows_affected() != 1 {
            bail!("Invoice {} is missing or already paid", invoice.number);
        }
        Ok(())
    }

    async fn get_invoice_by_number(
        &self,
        tenant_id: TenantId,
        number: &str,
    ) -> Result<Option<Invoice>> {
        let query = format!(
            "SELECT {} FROM invoices WHERE tenant_id = ? AND number = ?",
            INVOICE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch invoice by number")?;

        row.as_ref().map(Self::row_to_invoice).transpose()
    }

    async fn list_invoices(&self, tenant_id: TenantId) -> Result<Vec<Invoice>> {
        let query = format!(
            "SELECT {} FROM invoices WHERE tenant_id = ? ORDER BY issue_date, number",
            INVOICE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list invoices")?;

        rows.iter().map(Self::row_to_invoice).collect()
    }

    // ========================
    // Jobs
    // ========================

    async fn save_job(&self, job: &Job) -> Result<()> {
        let (client_id, occasional_id) = job.client.columns();
        sqlx::query(
            r#"
            INSERT INTO jobs (id, tenant_id, job_number, client_id, occasional_client_id, request_date, completion_date, description, job_type, status, hours_spent, value, invoice_id, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.tenant_id.to_string())
        .bind(&job.job_number)
        .bind(client_id.map(|id| id.to_string()))
        .bind(occasional_id.map(|id| id.to_string()))
        .bind(format_date(job.request_date))
        .bind(job.completion_date.map(format_date))
        .bind(&job.description)
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(job.hours_spent)
        .bind(job.value)
        .bind(job.invoice_id.map(|id| id.to_string()))
        .bind(&job.notes)
        .bind(job.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save job")?;
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE jobs
            SET completion_date = ?, description = ?, job_type = ?, status = ?,
                hours_spent = ?, value = ?, invoice_id = ?, notes = ?
            WHERE id = ? AND tenant_id = ?
            "#,
        )
        .bind(job.completion_date.map(format_date))
        .bind(&job.description)
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(job.hours_spent)
        .bind(job.value)
        .bind(job.invoice_id.map(|id| id.to_string()))
        .bind(&job.notes)
        .bind(job.id.to_string())
        .bind(job.tenant_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update job")?;

        if updated.rows_affected() != 1 {
            bail!("Job {} not found for tenant {}", job.job_number, job.tenant_id);
        }
        Ok(())
    }

    async fn get_job_by_number(&self, tenant_id: TenantId, number: &str) -> Result<Option<Job>> {
        let query = format!(
            "SELECT {} FROM jobs WHERE tenant_id = ? AND job_number = ?",
            JOB_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch job")?;

        row.as_ref().map(Self::row_to_job).transpose()
    }

    async fn list_jobs(&self, tenant_id: TenantId, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let mut query = format!("SELECT {} FROM jobs WHERE tenant_id = ?", JOB_COLUMNS);
        if status.is_some() {
            query.push_str(" AND status = ?");
        }
        query.push_str(" ORDER BY request_date DESC, CAST(job_number AS INTEGER) DESC");

        let mut sql_query = sqlx::query(&query).bind(tenant_id.to_string());
        if let Some(status) = status {
            sql_query = sql_query.bind(status.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list jobs")?;

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn last_job_number(&self, tenant_id: TenantId) -> Result<Option<String>> {
        sqlx::query_scalar(
            "SELECT job_number FROM jobs WHERE tenant_id = ? ORDER BY CAST(job_number AS INTEGER) DESC LIMIT 1",
        )
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch last job number")
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("Invalid date: {}", s))
}

fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let value: String = row.get(column);
    Uuid::parse_str(&value).with_context(|| format!("Invalid {}: {}", column, value))
}

fn optional_uuid_column(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let value: Option<String> = row.get(column);
    value
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .with_context(|| format!("Invalid {}", column))
}

fn timestamp_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column);
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("Invalid {} timestamp", column))?
        .with_timezone(&Utc))
}

fn client_ref_columns(row: &SqliteRow) -> Result<ClientRef> {
    let regular = optional_uuid_column(row, "client_id")?;
    let occasional = optional_uuid_column(row, "occasional_client_id")?;
    ClientRef::from_columns(regular, occasional)
        .ok_or_else(|| anyhow::anyhow!("Row must reference exactly one client"))
}
