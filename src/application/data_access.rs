use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    AccountMovement, Client, ClientId, ClientRef, Invoice, Job, JobStatus, OccasionalClient,
    PriceAdjustment, TenantId,
};

/// Persistence collaborator. Every call is scoped to one tenant.
///
/// Implementations must return a client's complete movement history from
/// `fetch_movements`, and must commit each multi-row write (`persist_adjustment`,
/// `persist_invoice`, `update_invoice`, `persist_payment`) as a single unit.
/// Errors are reported as-is; callers do not retry.
#[async_trait]
pub trait DataAccess: Send + Sync {
    // Escalation

    /// Active clients whose next adjustment date is on or before `as_of`.
    async fn fetch_clients_due_for_adjustment(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<Vec<Client>>;

    /// Write the re-priced client and its audit record atomically.
    async fn persist_adjustment(&self, client: &Client, record: &PriceAdjustment) -> Result<()>;

    async fn list_adjustments(
        &self,
        tenant_id: TenantId,
        client_id: Option<ClientId>,
    ) -> Result<Vec<PriceAdjustment>>;

    // Ledger

    /// Full movement history for one client, in any order.
    async fn fetch_movements(
        &self,
        tenant_id: TenantId,
        client: ClientRef,
    ) -> Result<Vec<AccountMovement>>;

    /// Full movement history for every client of the tenant.
    async fn fetch_all_movements(&self, tenant_id: TenantId) -> Result<Vec<AccountMovement>>;

    /// Append a movement, assigning its sequence number.
    async fn persist_movement(&self, movement: &mut AccountMovement) -> Result<()>;

    // Clients

    async fn save_client(&self, client: &Client) -> Result<()>;

    async fn update_client(&self, client: &Client) -> Result<()>;

    async fn get_client_by_name(&self, tenant_id: TenantId, name: &str) -> Result<Option<Client>>;

    async fn list_clients(&self, tenant_id: TenantId) -> Result<Vec<Client>>;

    async fn last_client_number(&self, tenant_id: TenantId) -> Result<Option<String>>;

    async fn save_occasional_client(&self, client: &OccasionalClient) -> Result<()>;

    async fn get_occasional_client_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<Option<OccasionalClient>>;

    async fn list_occasional_clients(&self, tenant_id: TenantId) -> Result<Vec<OccasionalClient>>;

    async fn last_occasional_client_number(&self, tenant_id: TenantId) -> Result<Option<String>>;

    // Invoices

    /// Insert the invoice with its items and its issuing movement atomically.
    async fn persist_invoice(
        &self,
        invoice: &Invoice,
        movement: &mut AccountMovement,
    ) -> Result<()>;

    /// Replace the invoice's fields and items, appending the revision movement
    /// if any, atomically.
    async fn update_invoice(
        &self,
        invoice: &Invoice,
        revision: Option<&mut AccountMovement>,
    ) -> Result<()>;

    /// Mark the invoice paid and append its payment movement atomically.
    async fn persist_payment(&self, invoice: &Invoice, movement: &mut AccountMovement)
    -> Result<()>;

    async fn update_invoice_status(&self, invoice: &Invoice) -> Result<()>;

    async fn get_invoice_by_number(
        &self,
        tenant_id: TenantId,
        number: &str,
    ) -> Result<Option<Invoice>>;

    async fn list_invoices(&self, tenant_id: TenantId) -> Result<Vec<Invoice>>;

    // Jobs

    async fn save_job(&self, job: &Job) -> Result<()>;

    async fn update_job(&self, job: &Job) -> Result<()>;

    async fn get_job_by_number(&self, tenant_id: TenantId, number: &str) -> Result<Option<Job>>;

    /// Jobs of the tenant, optionally only those in `status`, newest request first.
    async fn list_jobs(&self, tenant_id: TenantId, status: Option<JobStatus>) -> Result<Vec<Job>>;

    async fn last_job_number(&self, tenant_id: TenantId) -> Result<Option<String>>;
}
