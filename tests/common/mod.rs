// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use retainer::application::{BillingService, NewClient, NewInvoice, NewOccasionalClient};
use retainer::domain::{
    AdjustmentPeriod, Cents, Client, Invoice, InvoiceItem, OccasionalClient, RateTable, TenantId,
};
use retainer::storage::Repository;
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

pub type TestService = BillingService<Repository>;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(TestService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = BillingService::init(db_path.to_str().unwrap(), RateTable::default()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a YYYY-MM-DD string
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn new_tenant() -> TenantId {
    Uuid::new_v4()
}

/// A single untaxed-quantity line item
pub fn item(description: &str, quantity: i64, unit_price: Cents) -> InvoiceItem {
    InvoiceItem::new(description, Decimal::from(quantity), unit_price).unwrap()
}

/// Test fixtures for clients and invoices
pub struct Fixtures;

impl Fixtures {
    /// Subscription client indexed every `period` starting at `since`
    pub async fn indexed_client(
        service: &TestService,
        tenant: TenantId,
        name: &str,
        value: Cents,
        period: AdjustmentPeriod,
        since: &str,
    ) -> Result<Client> {
        Ok(service
            .create_client(
                tenant,
                NewClient {
                    name: name.to_string(),
                    subscription_value: value,
                    adjustment: Some((period, parse_date(since))),
                    ..Default::default()
                },
            )
            .await?)
    }

    /// Subscription client without indexation
    pub async fn flat_client(
        service: &TestService,
        tenant: TenantId,
        name: &str,
        value: Cents,
    ) -> Result<Client> {
        Ok(service
            .create_client(
                tenant,
                NewClient {
                    name: name.to_string(),
                    subscription_value: value,
                    ..Default::default()
                },
            )
            .await?)
    }

    pub async fn occasional_client(
        service: &TestService,
        tenant: TenantId,
        name: &str,
    ) -> Result<OccasionalClient> {
        Ok(service
            .create_occasional_client(
                tenant,
                NewOccasionalClient {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await?)
    }

    /// Invoice with one line and no VAT, so the total equals `amount`
    pub async fn untaxed_invoice(
        service: &TestService,
        tenant: TenantId,
        client: &str,
        number: &str,
        date: &str,
        amount: Cents,
    ) -> Result<Invoice> {
        Ok(service
            .issue_invoice(
                tenant,
                NewInvoice {
                    client: client.to_string(),
                    number: number.to_string(),
                    issue_date: parse_date(date),
                    period: None,
                    items: vec![item("Services", 1, amount)],
                    tax_rate: Some(Decimal::ZERO),
                    notes: None,
                },
            )
            .await?)
    }
}
