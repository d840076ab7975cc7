use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AdjustmentPeriod, Cents, advance};

/// Opaque identity of the business that owns a row. Never shared across tenants.
pub type TenantId = Uuid;
pub type ClientId = Uuid;
pub type OccasionalClientId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" | "activo" => Some(ClientStatus::Active),
            "inactive" | "inactivo" => Some(ClientStatus::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A regular, subscription-bearing client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub tenant_id: TenantId,
    /// Sequential per tenant, zero-padded ("0001")
    pub client_number: String,
    pub name: String,
    /// Tax identification number (CUIT or equivalent)
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: ClientStatus,
    /// Current recurring price
    pub subscription_value: Cents,
    pub adjustment_period: Option<AdjustmentPeriod>,
    pub last_adjustment_date: Option<NaiveDate>,
    pub consumed_hours: f64,
    pub included_hours: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        tenant_id: TenantId,
        client_number: impl Into<String>,
        name: impl Into<String>,
        subscription_value: Cents,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            client_number: client_number.into(),
            name: name.into(),
            tax_id: None,
            email: None,
            phone: None,
            address: None,
            status: ClientStatus::Active,
            subscription_value,
            adjustment_period: None,
            last_adjustment_date: None,
            consumed_hours: 0.0,
            included_hours: 0.0,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Configure inflation indexation starting from `last_adjustment_date`.
    pub fn with_adjustment_schedule(
        mut self,
        period: AdjustmentPeriod,
        last_adjustment_date: NaiveDate,
    ) -> Self {
        self.adjustment_period = Some(period);
        self.last_adjustment_date = Some(last_adjustment_date);
        self
    }

    pub fn with_included_hours(mut self, hours: f64) -> Self {
        self.included_hours = hours;
        self
    }

    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.tax_id = Some(tax_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Always derived from the last adjustment date and the period, so it cannot drift.
    pub fn next_adjustment_date(&self) -> Option<NaiveDate> {
        match (self.last_adjustment_date, self.adjustment_period) {
            (Some(last), Some(period)) => Some(advance(last, period)),
            _ => None,
        }
    }

    /// Change the indexation period, optionally restarting it from `since`.
    /// The next adjustment date follows from the new inputs.
    pub fn reschedule(
        &mut self,
        period: AdjustmentPeriod,
        since: Option<NaiveDate>,
    ) -> Result<(), ClientError> {
        let since = since
            .or(self.last_adjustment_date)
            .ok_or(ClientError::MissingScheduleStart)?;
        self.adjustment_period = Some(period);
        self.last_adjustment_date = Some(since);
        Ok(())
    }

    /// Stop indexing this client. The last adjustment date is kept for reference.
    pub fn clear_schedule(&mut self) {
        self.adjustment_period = None;
    }

    pub fn set_subscription_value(&mut self, value: Cents) -> Result<(), ClientError> {
        if value < 0 {
            return Err(ClientError::NegativeValue(value));
        }
        self.subscription_value = value;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == ClientStatus::Active
    }

    /// Add worked hours to the consumed counter.
    pub fn record_hours(&mut self, hours: f64) -> Result<(), ClientError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(ClientError::InvalidHours(hours));
        }
        self.consumed_hours += hours;
        Ok(())
    }

    /// Hours left in the included quota (never negative).
    pub fn remaining_hours(&self) -> f64 {
        (self.included_hours - self.consumed_hours).max(0.0)
    }

    /// Hours consumed beyond the included quota.
    pub fn overage_hours(&self) -> f64 {
        (self.consumed_hours - self.included_hours).max(0.0)
    }
}

/// A client engaged for a single job, with no subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccasionalClient {
    pub id: OccasionalClientId,
    pub tenant_id: TenantId,
    pub client_number: String,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OccasionalClient {
    pub fn new(
        tenant_id: TenantId,
        client_number: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            client_number: client_number.into(),
            name: name.into(),
            tax_id: None,
            email: None,
            phone: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.tax_id = Some(tax_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Who a movement or invoice belongs to. Exactly one kind of client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ClientRef {
    Regular(ClientId),
    Occasional(OccasionalClientId),
}

impl ClientRef {
    pub fn id(&self) -> Uuid {
        match self {
            ClientRef::Regular(id) | ClientRef::Occasional(id) => *id,
        }
    }

    /// Split into the (regular, occasional) column pair used by storage.
    pub fn columns(&self) -> (Option<ClientId>, Option<OccasionalClientId>) {
        match self {
            ClientRef::Regular(id) => (Some(*id), None),
            ClientRef::Occasional(id) => (None, Some(*id)),
        }
    }

    pub fn from_columns(
        regular: Option<ClientId>,
        occasional: Option<OccasionalClientId>,
    ) -> Option<Self> {
        match (regular, occasional) {
            (Some(id), None) => Some(ClientRef::Regular(id)),
            (None, Some(id)) => Some(ClientRef::Occasional(id)),
            _ => None,
        }
    }
}

impl From<&Client> for ClientRef {
    fn from(client: &Client) -> Self {
        ClientRef::Regular(client.id)
    }
}

impl From<&OccasionalClient> for ClientRef {
    fn from(client: &OccasionalClient) -> Self {
        ClientRef::Occasional(client.id)
    }
}

/// Next zero-padded client number after the highest one in use.
/// Example: None -> "0001", Some("0041") -> "0042"
pub fn next_client_number(last: Option<&str>) -> String {
    let next = last
        .and_then(|n| n.trim().parse::<u64>().ok())
        .map_or(1, |n| n + 1);
    format!("{:04}", next)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    InvalidHours(f64),
    NegativeValue(Cents),
    MissingSchedulePeriod,
    MissingScheduleStart,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::InvalidHours(hours) => {
                write!(f, "Hours must be a non-negative number, got {}", hours)
            }
            ClientError::NegativeValue(value) => {
                write!(f, "Subscription value must not be negative, got {} cents", value)
            }
            ClientError::MissingSchedulePeriod => {
                write!(f, "An adjustment period is required to schedule adjustments")
            }
            ClientError::MissingScheduleStart => {
                write!(f, "A start date is required to schedule adjustments")
            }
        }
    }
}

impl std::error::Error for ClientError {}
