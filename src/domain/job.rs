use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ClientRef, InvoiceId, TenantId, next_client_number};

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    /// Covered by the client's subscription
    Subscription,
    OneOff,
    Urgent,
    Remote,
    OnSite,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Subscription => "subscription",
            JobType::OneOff => "one-off",
            JobType::Urgent => "urgent",
            JobType::Remote => "remote",
            JobType::OnSite => "on-site",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "subscription" | "abono" => Some(JobType::Subscription),
            "one-off" | "oneoff" | "eventual" => Some(JobType::OneOff),
            "urgent" | "urgencia" => Some(JobType::Urgent),
            "remote" | "remoto" => Some(JobType::Remote),
            "on-site" | "onsite" | "presencial" => Some(JobType::OnSite),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job progress. Moves forward only, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Invoiced,
    Collected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in-progress",
            JobStatus::Completed => "completed",
            JobStatus::Invoiced => "invoiced",
            JobStatus::Collected => "collected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" | "pendiente" => Some(JobStatus::Pending),
            "in-progress" | "in_progress" | "en_proceso" => Some(JobStatus::InProgress),
            "completed" | "terminado" => Some(JobStatus::Completed),
            "invoiced" | "facturado" => Some(JobStatus::Invoiced),
            "collected" | "cobrado" => Some(JobStatus::Collected),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work requested by a client of either kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    /// Sequential per tenant, zero-padded ("0001")
    pub job_number: String,
    pub client: ClientRef,
    pub request_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub description: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub hours_spent: f64,
    /// Agreed price of the job
    pub value: Cents,
    /// Set once the job is billed
    pub invoice_id: Option<InvoiceId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// A new pending job. The description must not be blank.
    pub fn new(
        tenant_id: TenantId,
        job_number: impl Into<String>,
        client: ClientRef,
        request_date: NaiveDate,
        description: impl Into<String>,
    ) -> Result<Self, JobError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(JobError::EmptyDescription);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            job_number: job_number.into(),
            client,
            request_date,
            completion_date: None,
            description,
            job_type: JobType::Remote,
            status: JobStatus::Pending,
            hours_spent: 0.0,
            value: 0,
            invoice_id: None,
            notes: None,
            created_at: Utc::now(),
        })
    }

    pub fn with_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self
    }

    pub fn with_value(mut self, value: Cents) -> Result<Self, JobError> {
        if value < 0 {
            return Err(JobError::NegativeValue(value));
        }
        self.value = value;
        Ok(self)
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Still open for work (not yet completed).
    pub fn is_open(&self) -> bool {
        self.status < JobStatus::Completed
    }

    /// Add hours worked. Billed jobs are closed to further hours.
    pub fn log_hours(&mut self, hours: f64) -> Result<(), JobError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(JobError::InvalidHours(hours));
        }
        if self.status >= JobStatus::Invoiced {
            return Err(JobError::AlreadyBilled(self.job_number.clone()));
        }
        self.hours_spent += hours;
        Ok(())
    }

    /// pending -> in-progress
    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::InProgress, &[JobStatus::Pending])
    }

    /// pending | in-progress -> completed, on `completion_date`.
    pub fn complete(&mut self, completion_date: NaiveDate) -> Result<(), JobError> {
        if completion_date < self.request_date {
            return Err(JobError::CompletedBeforeRequest {
                number: self.job_number.clone(),
                request_date: self.request_date,
            });
        }
        self.transition(
            JobStatus::Completed,
            &[JobStatus::Pending, JobStatus::InProgress],
        )?;
        self.completion_date = Some(completion_date);
        Ok(())
    }

    /// completed -> invoiced, linking the invoice that bills the job.
    pub fn mark_invoiced(&mut self, invoice_id: InvoiceId) -> Result<(), JobError> {
        self.transition(JobStatus::Invoiced, &[JobStatus::Completed])?;
        self.invoice_id = Some(invoice_id);
        Ok(())
    }

    /// invoiced -> collected
    pub fn mark_collected(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Collected, &[JobStatus::Invoiced])
    }

    /// Move to `status` through the matching transition. Reaching
    /// `Invoiced` needs an invoice, so it goes through [`Job::mark_invoiced`].
    pub fn advance(&mut self, status: JobStatus, on: NaiveDate) -> Result<(), JobError> {
        match status {
            JobStatus::InProgress => self.start(),
            JobStatus::Completed => self.complete(on),
            JobStatus::Invoiced => Err(JobError::InvoiceRequired(self.job_number.clone())),
            JobStatus::Collected => self.mark_collected(),
            JobStatus::Pending => Err(JobError::InvalidTransition {
                number: self.job_number.clone(),
                from: self.status,
                to: status,
            }),
        }
    }

    fn transition(&mut self, to: JobStatus, allowed_from: &[JobStatus]) -> Result<(), JobError> {
        if !allowed_from.contains(&self.status) {
            return Err(JobError::InvalidTransition {
                number: self.job_number.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Next zero-padded job number after the highest one in use.
pub fn next_job_number(last: Option<&str>) -> String {
    next_client_number(last)
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobError {
    EmptyDescription,
    InvalidHours(f64),
    NegativeValue(Cents),
    AlreadyBilled(String),
    InvoiceRequired(String),
    ClientMismatch(String),
    CompletedBeforeRequest {
        number: String,
        request_date: NaiveDate,
    },
    InvalidTransition {
        number: String,
        from: JobStatus,
        to: JobStatus,
    },
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::EmptyDescription => write!(f, "Job description must not be empty"),
            JobError::InvalidHours(hours) => {
                write!(f, "Hours must be a non-negative number, got {}", hours)
            }
            JobError::NegativeValue(value) => {
                write!(f, "Job value must not be negative, got {} cents", value)
            }
            JobError::AlreadyBilled(number) => write!(f, "Job {} is already billed", number),
            JobError::InvoiceRequired(number) => {
                write!(f, "Job {} can only be marked invoiced against an invoice", number)
            }
            JobError::ClientMismatch(number) => {
                write!(f, "Invoice belongs to a different client than job {}", number)
            }
            JobError::CompletedBeforeRequest {
                number,
                request_date,
            } => write!(
                f,
                "Job {} cannot be completed before its request date {}",
                number, request_date
            ),
            JobError::InvalidTransition { number, from, to } => {
                write!(f, "Job {} cannot go from {} to {}", number, from, to)
            }
        }
    }
}

impl std::error::Error for JobError {}
