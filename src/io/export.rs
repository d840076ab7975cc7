use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{BillingService, DataAccess};
use crate::domain::{
    AccountMovement, Client, Invoice, Job, OccasionalClient, PriceAdjustment, TenantId,
    format_cents,
};

/// Everything one tenant owns, for backup or hand-off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub tenant_id: TenantId,
    pub clients: Vec<Client>,
    pub occasional_clients: Vec<OccasionalClient>,
    pub adjustments: Vec<PriceAdjustment>,
    pub invoices: Vec<Invoice>,
    pub jobs: Vec<Job>,
    pub movements: Vec<AccountMovement>,
}

/// Exporter for converting one tenant's billing data to CSV or JSON
pub struct Exporter<'a, R> {
    service: &'a BillingService<R>,
    tenant_id: TenantId,
}

impl<'a, R: DataAccess> Exporter<'a, R> {
    pub fn new(service: &'a BillingService<R>, tenant_id: TenantId) -> Self {
        Self { service, tenant_id }
    }

    /// Export a client's account statement, with running balances, to CSV
    pub async fn export_statement_csv<W: Write>(&self, client: &str, writer: W) -> Result<usize> {
        let statement = self.service.statement(self.tenant_id, client).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "date",
            "sequence",
            "kind",
            "description",
            "debit",
            "credit",
            "balance",
        ])?;

        for movement in &statement.movements {
            csv_writer.write_record([
                movement.date.to_string(),
                movement.sequence.to_string(),
                movement.kind.as_str().to_string(),
                movement.description.clone(),
                format_cents(movement.debit),
                format_cents(movement.credit),
                format_cents(movement.balance),
            ])?;
        }

        csv_writer.flush()?;
        Ok(statement.movements.len())
    }

    /// Export price adjustment history (one client or all) to CSV
    pub async fn export_adjustments_csv<W: Write>(
        &self,
        client: Option<&str>,
        writer: W,
    ) -> Result<usize> {
        let adjustments = self
            .service
            .adjustment_history(self.tenant_id, client)
            .await?;
        let names = self.service.client_names(self.tenant_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "date",
            "client",
            "old_value",
            "new_value",
            "rate_percent",
            "note",
        ])?;

        for adjustment in &adjustments {
            csv_writer.write_record([
                adjustment.adjustment_date.to_string(),
                names
                    .get(&adjustment.client_id)
                    .cloned()
                    .unwrap_or_else(|| adjustment.client_id.to_string()),
                format_cents(adjustment.old_value),
                format_cents(adjustment.new_value),
                adjustment.rate.to_string(),
                adjustment.note.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(adjustments.len())
    }

    /// Export invoices to CSV
    pub async fn export_invoices_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let invoices = self.service.list_invoices(self.tenant_id).await?;
        let names = self.service.client_names(self.tenant_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "number",
            "issue_date",
            "client",
            "period",
            "subtotal",
            "tax",
            "total",
            "status",
            "payment_date",
        ])?;

        for invoice in &invoices {
            csv_writer.write_record([
                invoice.number.clone(),
                invoice.issue_date.to_string(),
                names
                    .get(&invoice.client.id())
                    .cloned()
                    .unwrap_or_default(),
                invoice.period.clone().unwrap_or_default(),
                format_cents(invoice.subtotal),
                format_cents(invoice.tax),
                format_cents(invoice.total),
                invoice.status.as_str().to_string(),
                invoice
                    .payment_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(invoices.len())
    }

    /// Export jobs to CSV
    pub async fn export_jobs_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let jobs = self.service.list_jobs(self.tenant_id, None).await?;
        let names = self.service.client_names(self.tenant_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "number",
            "request_date",
            "completion_date",
            "client",
            "description",
            "type",
            "status",
            "hours",
            "value",
        ])?;

        for job in &jobs {
            csv_writer.write_record([
                job.job_number.clone(),
                job.request_date.to_string(),
                job.completion_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                names.get(&job.client.id()).cloned().unwrap_or_default(),
                job.description.clone(),
                job.job_type.as_str().to_string(),
                job.status.as_str().to_string(),
                job.hours_spent.to_string(),
                format_cents(job.value),
            ])?;
        }

        csv_writer.flush()?;
        Ok(jobs.len())
    }

    /// Export the tenant's full data set as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<TenantSnapshot> {
        let tenant_id = self.tenant_id;
        let repo = self.service.repository();

        let snapshot = TenantSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            tenant_id,
            clients: repo.list_clients(tenant_id).await?,
            occasional_clients: repo.list_occasional_clients(tenant_id).await?,
            adjustments: repo.list_adjustments(tenant_id, None).await?,
            invoices: repo.list_invoices(tenant_id).await?,
            jobs: repo.list_jobs(tenant_id, None).await?,
            movements: repo.fetch_all_movements(tenant_id).await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
