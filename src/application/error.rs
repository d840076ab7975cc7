use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{AdjustmentError, ClientError, InvoiceError, JobError, LedgerError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Client already exists: {0}")]
    ClientAlreadyExists(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Invoice already exists: {0}")]
    InvoiceAlreadyExists(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Client '{name}' is not due for adjustment (next adjustment: {})", display_date(.next_due))]
    AdjustmentNotDue {
        name: String,
        next_due: Option<NaiveDate>,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Adjustment(#[from] AdjustmentError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

fn display_date(date: &Option<NaiveDate>) -> String {
    date.map_or_else(|| "never".to_string(), |d| d.to_string())
}
