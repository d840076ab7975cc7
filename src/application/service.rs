use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    AccountMovement, AdjustmentPeriod, AdjustmentPreview, AppliedAdjustment, Cents, Client,
    ClientError, ClientRef, ClientStatus, Invoice, InvoiceItem, InvoiceTotals, Job, JobError,
    JobStatus, JobType, MovementKind, OccasionalClient, PriceAdjustment, RateTable, Statement,
    TenantId, apply_adjustment_with_note, compute_all_balances, compute_balances,
    due_for_adjustment, next_client_number, next_job_number, preview_adjustment, record_invoice,
    record_invoice_revision, record_payment,
};

use super::{AppError, DataAccess};
use crate::storage::Repository;

/// Application service providing the billing use cases.
/// Every operation takes the tenant explicitly; nothing is scoped implicitly.
pub struct BillingService<R> {
    repo: R,
    rates: RateTable,
}

/// Input for registering a subscription client
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub subscription_value: Cents,
    /// Indexation period and the date the current price took effect
    pub adjustment: Option<(AdjustmentPeriod, NaiveDate)>,
    pub included_hours: f64,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Changes to a subscription client. `None` leaves a field as it is; an
/// empty string clears an optional contact field.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub subscription_value: Option<Cents>,
    pub adjustment_period: Option<AdjustmentPeriod>,
    /// Date the current price took effect; restarts the adjustment schedule
    pub adjusted_since: Option<NaiveDate>,
    /// Stop indexing the client
    pub clear_schedule: bool,
    pub status: Option<ClientStatus>,
    pub included_hours: Option<f64>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Input for registering a one-off client
#[derive(Debug, Clone, Default)]
pub struct NewOccasionalClient {
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Input for issuing an invoice
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Client name (regular or occasional)
    pub client: String,
    pub number: String,
    pub issue_date: NaiveDate,
    pub period: Option<String>,
    pub items: Vec<InvoiceItem>,
    /// Defaults to the invoice default VAT rate
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
}

/// Input for recording a job
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Client name (regular or occasional)
    pub client: String,
    pub request_date: NaiveDate,
    pub description: String,
    pub job_type: JobType,
    pub value: Cents,
    pub notes: Option<String>,
}

/// Current balance of one client
#[derive(Debug, Clone)]
pub struct ClientAccount {
    pub name: String,
    pub client: ClientRef,
    pub balance: Cents,
}

/// Result of settling an invoice
#[derive(Debug, Clone)]
pub struct PaymentResult {
    pub invoice: Invoice,
    pub movement: AccountMovement,
}

impl BillingService<Repository> {
    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, rates: RateTable) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::with_rates(repo, rates))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, rates: RateTable) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::with_rates(repo, rates))
    }
}

impl<R: DataAccess> BillingService<R> {
    /// Create a service using the built-in monthly rate table.
    pub fn new(repo: R) -> Self {
        Self::with_rates(repo, RateTable::default())
    }

    pub fn with_rates(repo: R, rates: RateTable) -> Self {
        Self { repo, rates }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Rate offered to the operator for adjustments made on `as_of`.
    pub fn suggested_rate(&self, as_of: NaiveDate) -> Decimal {
        self.rates.suggested_rate(as_of)
    }

    // ========================
    // Client operations
    // ========================

    /// Register a subscription client with the next free client number.
    #[instrument(skip(self, new_client), fields(name = %new_client.name))]
    pub async fn create_client(
        &self,
        tenant_id: TenantId,
        new_client: NewClient,
    ) -> Result<Client, AppError> {
        if new_client.subscription_value < 0 {
            return Err(AppError::InvalidAmount(
                "Subscription value must not be negative".to_string(),
            ));
        }
        if !new_client.included_hours.is_finite() || new_client.included_hours < 0.0 {
            return Err(AppError::InvalidAmount(
                "Included hours must not be negative".to_string(),
            ));
        }
        self.ensure_name_available(tenant_id, &new_client.name)
            .await?;

        let last = self.repo.last_client_number(tenant_id).await?;
        let mut client = Client::new(
            tenant_id,
            next_client_number(last.as_deref()),
            new_client.name,
            new_client.subscription_value,
        )
        .with_included_hours(new_client.included_hours);

        if let Some((period, since)) = new_client.adjustment {
            client = client.with_adjustment_schedule(period, since);
        }
        client.tax_id = new_client.tax_id;
        client.email = new_client.email;
        client.phone = new_client.phone;
        client.address = new_client.address;
        client.notes = new_client.notes;

        self.repo.save_client(&client).await?;
        info!(client_number = %client.client_number, "client created");
        Ok(client)
    }

    /// Get a subscription client by name.
    pub async fn get_client(&self, tenant_id: TenantId, name: &str) -> Result<Client, AppError> {
        self.repo
            .get_client_by_name(tenant_id, name)
            .await?
            .ok_or_else(|| AppError::ClientNotFound(name.to_string()))
    }

    pub async fn list_clients(&self, tenant_id: TenantId) -> Result<Vec<Client>, AppError> {
        Ok(self.repo.list_clients(tenant_id).await?)
    }

    /// Apply `changes` to a subscription client. The next adjustment date
    /// is re-derived from the resulting period and last adjustment date.
    #[instrument(skip(self, changes))]
    pub async fn edit_client(
        &self,
        tenant_id: TenantId,
        name: &str,
        changes: ClientUpdate,
    ) -> Result<Client, AppError> {
        let mut client = self.get_client(tenant_id, name).await?;

        if let Some(new_name) = changes.name.filter(|n| n != &client.name) {
            if new_name.trim().is_empty() {
                return Err(AppError::InvalidAmount(
                    "Client name must not be empty".to_string(),
                ));
            }
            self.ensure_name_available(tenant_id, &new_name).await?;
            client.name = new_name;
        }
        if let Some(value) = changes.subscription_value {
            client.set_subscription_value(value)?;
        }
        if changes.clear_schedule {
            client.clear_schedule();
        } else if changes.adjustment_period.is_some() || changes.adjusted_since.is_some() {
            let period = changes
                .adjustment_period
                .or(client.adjustment_period)
                .ok_or(ClientError::MissingSchedulePeriod)?;
            client.reschedule(period, changes.adjusted_since)?;
        }
        if let Some(status) = changes.status {
            client.status = status;
        }
        if let Some(hours) = changes.included_hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(AppError::InvalidAmount(
                    "Included hours must not be negative".to_string(),
                ));
            }
            client.included_hours = hours;
        }
        replace_optional(&mut client.tax_id, changes.tax_id);
        replace_optional(&mut client.email, changes.email);
        replace_optional(&mut client.phone, changes.phone);
        replace_optional(&mut client.address, changes.address);
        replace_optional(&mut client.notes, changes.notes);

        self.repo.update_client(&client).await?;
        info!(
            client_number = %client.client_number,
            next_adjustment = ?client.next_adjustment_date(),
            "client updated"
        );
        Ok(client)
    }

    /// Register a one-off client.
    #[instrument(skip(self, new_client), fields(name = %new_client.name))]
    pub async fn create_occasional_client(
        &self,
        tenant_id: TenantId,
        new_client: NewOccasionalClient,
    ) -> Result<OccasionalClient, AppError> {
        self.ensure_name_available(tenant_id, &new_client.name)
            .await?;

        let last = self.repo.last_occasional_client_number(tenant_id).await?;
        let mut client = OccasionalClient::new(
            tenant_id,
            next_client_number(last.as_deref()),
            new_client.name,
        );
        client.tax_id = new_client.tax_id;
        client.email = new_client.email;
        client.phone = new_client.phone;
        client.notes = new_client.notes;

        self.repo.save_occasional_client(&client).await?;
        info!(client_number = %client.client_number, "occasional client created");
        Ok(client)
    }

    pub async fn list_occasional_clients(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<OccasionalClient>, AppError> {
        Ok(self.repo.list_occasional_clients(tenant_id).await?)
    }

    /// Add worked hours to a client's consumed counter.
    #[instrument(skip(self))]
    pub async fn record_hours(
        &self,
        tenant_id: TenantId,
        name: &str,
        hours: f64,
    ) -> Result<Client, AppError> {
        let mut client = self.get_client(tenant_id, name).await?;
        client.record_hours(hours)?;
        self.repo.update_client(&client).await?;

        if client.overage_hours() > 0.0 {
            warn!(
                overage = client.overage_hours(),
                "client is over its included hours"
            );
        }
        Ok(client)
    }

    /// Find a client of either kind by name. Regular clients win on a clash.
    pub async fn resolve_client(
        &self,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<ClientRef, AppError> {
        if let Some(client) = self.repo.get_client_by_name(tenant_id, name).await? {
            return Ok(ClientRef::from(&client));
        }
        if let Some(client) = self
            .repo
            .get_occasional_client_by_name(tenant_id, name)
            .await?
        {
            return Ok(ClientRef::from(&client));
        }
        Err(AppError::ClientNotFound(name.to_string()))
    }

    /// Map of client ids (both kinds) to display names.
    pub async fn client_names(
        &self,
        tenant_id: TenantId,
    ) -> Result<HashMap<Uuid, String>, AppError> {
        let mut names: HashMap<Uuid, String> = self
            .repo
            .list_clients(tenant_id)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        names.extend(
            self.repo
                .list_occasional_clients(tenant_id)
                .await?
                .into_iter()
                .map(|c| (c.id, c.name)),
        );
        Ok(names)
    }

    async fn ensure_name_available(&self, tenant_id: TenantId, name: &str) -> Result<(), AppError> {
        let taken = self.repo.get_client_by_name(tenant_id, name).await?.is_some()
            || self
                .repo
                .get_occasional_client_by_name(tenant_id, name)
                .await?
                .is_some();
        if taken {
            return Err(AppError::ClientAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    // ========================
    // Price escalation
    // ========================

    /// Active clients due for an adjustment on `as_of`.
    pub async fn clients_due(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<Vec<Client>, AppError> {
        let clients = self
            .repo
            .fetch_clients_due_for_adjustment(tenant_id, as_of)
            .await?;
        Ok(clients
            .into_iter()
            .filter(|c| due_for_adjustment(c, as_of))
            .collect())
    }

    /// What applying `rate` (or the suggested rate) would do to every due client.
    pub async fn preview_adjustments(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
        rate: Option<Decimal>,
    ) -> Result<Vec<AdjustmentPreview>, AppError> {
        let rate = rate.unwrap_or_else(|| self.suggested_rate(as_of));
        self.clients_due(tenant_id, as_of)
            .await?
            .iter()
            .map(|client| preview_adjustment(client, rate).map_err(AppError::from))
            .collect()
    }

    /// Re-price one client and record the adjustment.
    ///
    /// Without `force` the client must be due on `effective_date`. The client
    /// update and its audit record are persisted together or not at all.
    #[instrument(skip(self))]
    pub async fn apply_adjustment(
        &self,
        tenant_id: TenantId,
        name: &str,
        rate: Option<Decimal>,
        effective_date: NaiveDate,
        note: Option<String>,
        force: bool,
    ) -> Result<AppliedAdjustment, AppError> {
        let client = self.get_client(tenant_id, name).await?;

        if !force && !due_for_adjustment(&client, effective_date) {
            return Err(AppError::AdjustmentNotDue {
                next_due: client.next_adjustment_date(),
                name: client.name,
            });
        }

        let rate = rate.unwrap_or_else(|| self.suggested_rate(effective_date));
        let applied = apply_adjustment_with_note(&client, rate, effective_date, note)?;
        self.repo
            .persist_adjustment(&applied.client, &applied.record)
            .await?;

        info!(
            old_value = applied.record.old_value,
            new_value = applied.record.new_value,
            %rate,
            "adjustment applied"
        );
        Ok(applied)
    }

    /// Apply the same rate to every client due on `as_of`.
    /// Each client is committed on its own; the first failure stops the run.
    #[instrument(skip(self))]
    pub async fn apply_due_adjustments(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
        rate: Option<Decimal>,
    ) -> Result<Vec<AppliedAdjustment>, AppError> {
        let rate = rate.unwrap_or_else(|| self.suggested_rate(as_of));
        let due = self.clients_due(tenant_id, as_of).await?;
        debug!(count = due.len(), "clients due for adjustment");

        let mut results = Vec::with_capacity(due.len());
        for client in due {
            let applied = apply_adjustment_with_note(&client, rate, as_of, None)?;
            self.repo
                .persist_adjustment(&applied.client, &applied.record)
                .await?;
            results.push(applied);
        }

        info!(applied = results.len(), "batch adjustment finished");
        Ok(results)
    }

    /// Adjustment history for one client, or for the whole tenant.
    pub async fn adjustment_history(
        &self,
        tenant_id: TenantId,
        name: Option<&str>,
    ) -> Result<Vec<PriceAdjustment>, AppError> {
        let client_id = match name {
            Some(name) => Some(self.get_client(tenant_id, name).await?.id),
            None => None,
        };
        Ok(self.repo.list_adjustments(tenant_id, client_id).await?)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Account statement for a client, recomputed from its full history.
    pub async fn statement(&self, tenant_id: TenantId, name: &str) -> Result<Statement, AppError> {
        let client = self.resolve_client(tenant_id, name).await?;
        self.statement_for(tenant_id, client).await
    }

    pub async fn statement_for(
        &self,
        tenant_id: TenantId,
        client: ClientRef,
    ) -> Result<Statement, AppError> {
        let movements = self.repo.fetch_movements(tenant_id, client).await?;
        Ok(compute_balances(&movements)?)
    }

    /// Current balance of every client, sorted by name.
    pub async fn account_balances(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ClientAccount>, AppError> {
        let movements = self.repo.fetch_all_movements(tenant_id).await?;
        let balances = compute_all_balances(&movements)?;

        let regular = self.repo.list_clients(tenant_id).await?;
        let occasional = self.repo.list_occasional_clients(tenant_id).await?;

        let mut accounts: Vec<ClientAccount> = regular
            .iter()
            .map(|c| (c.name.clone(), ClientRef::from(c)))
            .chain(
                occasional
                    .iter()
                    .map(|c| (c.name.clone(), ClientRef::from(c))),
            )
            .map(|(name, client)| ClientAccount {
                balance: balances.get(&client).copied().unwrap_or(0),
                name,
                client,
            })
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    /// Record a manual credit or debit note.
    #[instrument(skip(self))]
    pub async fn record_note(
        &self,
        tenant_id: TenantId,
        name: &str,
        kind: MovementKind,
        amount: Cents,
        date: NaiveDate,
        description: &str,
    ) -> Result<AccountMovement, AppError> {
        let client = self.resolve_client(tenant_id, name).await?;
        let mut movement =
            AccountMovement::note(tenant_id, client, kind, amount, date, description)?;
        self.repo.persist_movement(&mut movement).await?;
        info!(sequence = movement.sequence, "note recorded");
        Ok(movement)
    }

    // ========================
    // Invoice operations
    // ========================

    /// Issue an invoice and debit its total to the client's account.
    #[instrument(skip(self, new_invoice), fields(number = %new_invoice.number))]
    pub async fn issue_invoice(
        &self,
        tenant_id: TenantId,
        new_invoice: NewInvoice,
    ) -> Result<Invoice, AppError> {
        if self
            .repo
            .get_invoice_by_number(tenant_id, &new_invoice.number)
            .await?
            .is_some()
        {
            return Err(AppError::InvoiceAlreadyExists(new_invoice.number));
        }

        let client = self.resolve_client(tenant_id, &new_invoice.client).await?;
        let mut invoice = Invoice::new(
            tenant_id,
            client,
            new_invoice.number,
            new_invoice.issue_date,
        );
        if let Some(rate) = new_invoice.tax_rate {
            invoice.set_tax_rate(rate)?;
        }
        invoice.replace_items(new_invoice.items)?;
        ensure_positive_total(&invoice)?;
        invoice.period = new_invoice.period.filter(|p| !p.trim().is_empty());
        invoice.notes = new_invoice.notes;

        let mut movement = record_invoice(&invoice);
        self.repo.persist_invoice(&invoice, &mut movement).await?;

        info!(total = invoice.total, "invoice issued");
        Ok(invoice)
    }

    /// Replace an invoice's items (and optionally its tax rate).
    ///
    /// The ledger is never rewritten: a change in total appends a debit or
    /// credit note dated `revision_date` for the difference.
    #[instrument(skip(self, items))]
    pub async fn edit_invoice(
        &self,
        tenant_id: TenantId,
        number: &str,
        items: Vec<InvoiceItem>,
        tax_rate: Option<Decimal>,
        revision_date: NaiveDate,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.get_invoice(tenant_id, number).await?;
        let previous_total = invoice.total;

        if let Some(rate) = tax_rate {
            invoice.set_tax_rate(rate)?;
        }
        invoice.replace_items(items)?;
        ensure_positive_total(&invoice)?;

        let mut revision = record_invoice_revision(&invoice, previous_total, revision_date);
        self.repo
            .update_invoice(&invoice, revision.as_mut())
            .await?;

        info!(
            previous_total,
            total = invoice.total,
            revised = revision.is_some(),
            "invoice edited"
        );
        Ok(invoice)
    }

    pub async fn mark_invoice_sent(
        &self,
        tenant_id: TenantId,
        number: &str,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.get_invoice(tenant_id, number).await?;
        invoice.mark_sent()?;
        self.repo.update_invoice_status(&invoice).await?;
        Ok(invoice)
    }

    pub async fn mark_invoice_expired(
        &self,
        tenant_id: TenantId,
        number: &str,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.get_invoice(tenant_id, number).await?;
        invoice.mark_expired()?;
        self.repo.update_invoice_status(&invoice).await?;
        Ok(invoice)
    }

    /// Mark an invoice paid and credit its total to the client's account.
    /// Fails if the invoice is already paid, so exactly one payment is recorded.
    #[instrument(skip(self))]
    pub async fn mark_invoice_paid(
        &self,
        tenant_id: TenantId,
        number: &str,
        payment_date: NaiveDate,
    ) -> Result<PaymentResult, AppError> {
        let mut invoice = self.get_invoice(tenant_id, number).await?;
        invoice.mark_paid(payment_date)?;

        let mut movement = record_payment(&invoice)?;
        self.repo.persist_payment(&invoice, &mut movement).await?;

        info!(total = invoice.total, "invoice paid");
        Ok(PaymentResult { invoice, movement })
    }

    pub async fn get_invoice(
        &self,
        tenant_id: TenantId,
        number: &str,
    ) -> Result<Invoice, AppError> {
        self.repo
            .get_invoice_by_number(tenant_id, number)
            .await?
            .ok_or_else(|| AppError::InvoiceNotFound(number.to_string()))
    }

    pub async fn list_invoices(&self, tenant_id: TenantId) -> Result<Vec<Invoice>, AppError> {
        Ok(self.repo.list_invoices(tenant_id).await?)
    }

    pub async fn invoice_totals(&self, tenant_id: TenantId) -> Result<InvoiceTotals, AppError> {
        let invoices = self.list_invoices(tenant_id).await?;
        Ok(InvoiceTotals::from_invoices(&invoices))
    }

    // ========================
    // Jobs
    // ========================

    /// Record a pending job for a client of either kind.
    #[instrument(skip(self, new_job), fields(client = %new_job.client))]
    pub async fn create_job(&self, tenant_id: TenantId, new_job: NewJob) -> Result<Job, AppError> {
        let client = self.resolve_client(tenant_id, &new_job.client).await?;
        let last = self.repo.last_job_number(tenant_id).await?;

        let mut job = Job::new(
            tenant_id,
            next_job_number(last.as_deref()),
            client,
            new_job.request_date,
            new_job.description,
        )?
        .with_type(new_job.job_type)
        .with_value(new_job.value)?;
        job.notes = new_job.notes.filter(|n| !n.trim().is_empty());

        self.repo.save_job(&job).await?;
        info!(job_number = %job.job_number, "job created");
        Ok(job)
    }

    pub async fn get_job(&self, tenant_id: TenantId, number: &str) -> Result<Job, AppError> {
        self.repo
            .get_job_by_number(tenant_id, number)
            .await?
            .ok_or_else(|| AppError::JobNotFound(number.to_string()))
    }

    pub async fn list_jobs(
        &self,
        tenant_id: TenantId,
        status: Option<JobStatus>,
    ) -> Result<Vec<Job>, AppError> {
        Ok(self.repo.list_jobs(tenant_id, status).await?)
    }

    /// Move a job forward to `status`. Completion is dated `on`.
    #[instrument(skip(self))]
    pub async fn update_job_status(
        &self,
        tenant_id: TenantId,
        number: &str,
        status: JobStatus,
        on: NaiveDate,
    ) -> Result<Job, AppError> {
        let mut job = self.get_job(tenant_id, number).await?;
        job.advance(status, on)?;
        self.repo.update_job(&job).await?;
        info!(status = %job.status, "job status updated");
        Ok(job)
    }

    /// Add hours worked on a job.
    #[instrument(skip(self))]
    pub async fn log_job_hours(
        &self,
        tenant_id: TenantId,
        number: &str,
        hours: f64,
    ) -> Result<Job, AppError> {
        let mut job = self.get_job(tenant_id, number).await?;
        job.log_hours(hours)?;
        self.repo.update_job(&job).await?;
        debug!(hours_spent = job.hours_spent, "job hours logged");
        Ok(job)
    }

    /// Link a completed job to the invoice that bills it.
    #[instrument(skip(self))]
    pub async fn invoice_job(
        &self,
        tenant_id: TenantId,
        number: &str,
        invoice_number: &str,
    ) -> Result<Job, AppError> {
        let mut job = self.get_job(tenant_id, number).await?;
        let invoice = self.get_invoice(tenant_id, invoice_number).await?;
        if invoice.client != job.client {
            return Err(JobError::ClientMismatch(job.job_number).into());
        }

        job.mark_invoiced(invoice.id)?;
        self.repo.update_job(&job).await?;
        info!(invoice = %invoice.number, "job invoiced");
        Ok(job)
    }
}

fn replace_optional(field: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *field = Some(value).filter(|v| !v.trim().is_empty());
    }
}

fn ensure_positive_total(invoice: &Invoice) -> Result<(), AppError> {
    if invoice.total <= 0 {
        return Err(AppError::InvalidAmount(format!(
            "Invoice {} must have a positive total",
            invoice.number
        )));
    }
    Ok(())
}
