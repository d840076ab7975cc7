use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Client, ClientId, TenantId, advance, scale_cents};

pub type AdjustmentId = Uuid;

/// Immutable audit entry written every time a subscription price is re-indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAdjustment {
    pub id: AdjustmentId,
    pub tenant_id: TenantId,
    pub client_id: ClientId,
    pub adjustment_date: NaiveDate,
    /// Last adjustment date before this one; `None` for a first adjustment.
    pub previous_adjustment_date: Option<NaiveDate>,
    pub old_value: Cents,
    pub new_value: Cents,
    /// Percentage applied (e.g. 4.2 means +4.2%)
    pub rate: Decimal,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl PriceAdjustment {
    pub fn increase(&self) -> Cents {
        self.new_value - self.old_value
    }
}

/// The outcome of an adjustment: the re-priced client and its audit record.
/// Callers must persist both together or neither.
#[derive(Debug, Clone)]
pub struct AppliedAdjustment {
    pub client: Client,
    pub record: PriceAdjustment,
}

/// What an adjustment would do, without applying it.
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentPreview {
    pub client_id: ClientId,
    pub client_name: String,
    pub current_value: Cents,
    pub rate: Decimal,
    pub new_value: Cents,
    pub increase: Cents,
    pub next_adjustment_date: Option<NaiveDate>,
}

/// True when the client has a scheduled adjustment on or before `as_of`.
pub fn due_for_adjustment(client: &Client, as_of: NaiveDate) -> bool {
    client
        .next_adjustment_date()
        .is_some_and(|next| next <= as_of)
}

/// `current_value * (1 + rate_percent / 100)`, rounded to the nearest cent.
pub fn compute_adjustment(
    current_value: Cents,
    rate_percent: Decimal,
) -> Result<Cents, AdjustmentError> {
    if rate_percent.is_sign_negative() && !rate_percent.is_zero() {
        return Err(AdjustmentError::NegativeRate(rate_percent));
    }
    if current_value < 0 {
        return Err(AdjustmentError::NegativeValue(current_value));
    }

    let factor = rate_percent
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|r| r.checked_add(Decimal::ONE))
        .ok_or(AdjustmentError::Overflow)?;

    scale_cents(current_value, factor).ok_or(AdjustmentError::Overflow)
}

/// Re-price a client effective on `effective_date`.
///
/// Produces the updated client (new value, last date = `effective_date`,
/// next date re-derived from the period) and exactly one audit record.
pub fn apply_adjustment(
    client: &Client,
    rate_percent: Decimal,
    effective_date: NaiveDate,
) -> Result<AppliedAdjustment, AdjustmentError> {
    apply_adjustment_with_note(client, rate_percent, effective_date, None)
}

/// Same as [`apply_adjustment`] with an operator-supplied note.
pub fn apply_adjustment_with_note(
    client: &Client,
    rate_percent: Decimal,
    effective_date: NaiveDate,
    note: Option<String>,
) -> Result<AppliedAdjustment, AdjustmentError> {
    let period = client
        .adjustment_period
        .ok_or(AdjustmentError::MissingPeriod {
            client_id: client.id,
        })?;
    let new_value = compute_adjustment(client.subscription_value, rate_percent)?;

    let record = PriceAdjustment {
        id: Uuid::new_v4(),
        tenant_id: client.tenant_id,
        client_id: client.id,
        adjustment_date: effective_date,
        previous_adjustment_date: client.last_adjustment_date,
        old_value: client.subscription_value,
        new_value,
        rate: rate_percent,
        note: note.unwrap_or_else(|| format!("Automatic inflation adjustment ({})", period)),
        created_at: Utc::now(),
    };

    let mut client = client.clone();
    client.subscription_value = new_value;
    client.last_adjustment_date = Some(effective_date);
    debug_assert_eq!(
        client.next_adjustment_date(),
        Some(advance(effective_date, period))
    );

    Ok(AppliedAdjustment { client, record })
}

/// Preview the adjustment for a client at the given rate.
pub fn preview_adjustment(
    client: &Client,
    rate_percent: Decimal,
) -> Result<AdjustmentPreview, AdjustmentError> {
    let new_value = compute_adjustment(client.subscription_value, rate_percent)?;
    Ok(AdjustmentPreview {
        client_id: client.id,
        client_name: client.name.clone(),
        current_value: client.subscription_value,
        rate: rate_percent,
        new_value,
        increase: new_value - client.subscription_value,
        next_adjustment_date: client.next_adjustment_date(),
    })
}

/// Parse an operator-entered percentage such as "4.2" or "4.2%".
pub fn parse_rate(input: &str) -> Result<Decimal, AdjustmentError> {
    let trimmed = input.trim().trim_end_matches('%').trim();
    let rate: Decimal = trimmed
        .parse()
        .map_err(|_| AdjustmentError::InvalidRate(input.to_string()))?;
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(AdjustmentError::NegativeRate(rate));
    }
    Ok(rate)
}

/// Published monthly inflation rates, indexed by calendar month.
/// Seeds the rate suggested to the operator; it never constrains the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Decimal>", into = "Vec<Decimal>")]
pub struct RateTable {
    rates: [Decimal; 12],
}

impl RateTable {
    /// Build from exactly 12 non-negative percentages, January first.
    pub fn from_rates(rates: &[Decimal]) -> Result<Self, AdjustmentError> {
        let rates: [Decimal; 12] = rates
            .try_into()
            .map_err(|_| AdjustmentError::InvalidRateTable(rates.len()))?;
        if let Some(negative) = rates.iter().find(|r| r.is_sign_negative() && !r.is_zero()) {
            return Err(AdjustmentError::NegativeRate(*negative));
        }
        Ok(Self { rates })
    }

    pub fn suggested_rate(&self, date: NaiveDate) -> Decimal {
        self.rates[date.month0() as usize]
    }

    pub fn rates(&self) -> &[Decimal; 12] {
        &self.rates
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            rates: [
                Decimal::new(25, 0),
                Decimal::new(20, 0),
                Decimal::new(13, 0),
                Decimal::new(88, 1),
                Decimal::new(42, 1),
                Decimal::new(46, 1),
                Decimal::new(40, 1),
                Decimal::new(42, 1),
                Decimal::new(35, 1),
                Decimal::new(27, 1),
                Decimal::new(24, 1),
                Decimal::new(27, 1),
            ],
        }
    }
}

impl TryFrom<Vec<Decimal>> for RateTable {
    type Error = AdjustmentError;

    fn try_from(rates: Vec<Decimal>) -> Result<Self, Self::Error> {
        Self::from_rates(&rates)
    }
}

impl From<RateTable> for Vec<Decimal> {
    fn from(table: RateTable) -> Self {
        table.rates.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustmentError {
    NegativeRate(Decimal),
    NegativeValue(Cents),
    InvalidRate(String),
    InvalidRateTable(usize),
    MissingPeriod { client_id: ClientId },
    Overflow,
}

impl std::fmt::Display for AdjustmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdjustmentError::NegativeRate(rate) => {
                write!(f, "Adjustment rate must not be negative, got {}%", rate)
            }
            AdjustmentError::NegativeValue(value) => {
                write!(f, "Subscription value must not be negative, got {} cents", value)
            }
            AdjustmentError::InvalidRate(input) => write!(f, "Invalid rate: {}", input),
            AdjustmentError::InvalidRateTable(len) => {
                write!(f, "Rate table needs 12 monthly entries, got {}", len)
            }
            AdjustmentError::MissingPeriod { client_id } => {
                write!(f, "Client {} has no adjustment period configured", client_id)
            }
            AdjustmentError::Overflow => write!(f, "Adjusted value is too large"),
        }
    }
}

impl std::error::Error for AdjustmentError {}
