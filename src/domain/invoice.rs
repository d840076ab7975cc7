use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ClientRef, TenantId, percent_of, scale_cents};

pub type InvoiceId = Uuid;

/// Default VAT percentage applied to new invoices.
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(21, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Issued,
    Sent,
    Paid,
    Expired,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "issued" | "emitida" => Some(InvoiceStatus::Issued),
            "sent" | "enviada" => Some(InvoiceStatus::Sent),
            "paid" | "cobrada" => Some(InvoiceStatus::Paid),
            "expired" | "vencida" => Some(InvoiceStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Cents,
    /// quantity × unit_price, rounded to the cent
    pub total: Cents,
}

impl InvoiceItem {
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Cents,
    ) -> Result<Self, InvoiceError> {
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(InvoiceError::NegativeQuantity(quantity));
        }
        if unit_price < 0 {
            return Err(InvoiceError::NegativeAmount(unit_price));
        }
        let total = scale_cents(unit_price, quantity).ok_or(InvoiceError::Overflow)?;
        Ok(Self {
            description: description.into(),
            quantity,
            unit_price,
            total,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub tenant_id: TenantId,
    pub client: ClientRef,
    pub number: String,
    pub issue_date: NaiveDate,
    /// Billing period label, e.g. "March 2024"
    pub period: Option<String>,
    /// Owned by the invoice; replaced wholesale on edit
    pub items: Vec<InvoiceItem>,
    pub tax_rate: Decimal,
    pub subtotal: Cents,
    pub tax: Cents,
    pub total: Cents,
    pub status: InvoiceStatus,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// A new, empty invoice in the issued state.
    pub fn new(
        tenant_id: TenantId,
        client: ClientRef,
        number: impl Into<String>,
        issue_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            client,
            number: number.into(),
            issue_date,
            period: None,
            items: Vec::new(),
            tax_rate: DEFAULT_TAX_RATE,
            subtotal: 0,
            tax: 0,
            total: 0,
            status: InvoiceStatus::Issued,
            payment_date: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_tax_rate(mut self, tax_rate: Decimal) -> Result<Self, InvoiceError> {
        self.set_tax_rate(tax_rate)?;
        Ok(self)
    }

    pub fn with_items(mut self, items: Vec<InvoiceItem>) -> Result<Self, InvoiceError> {
        self.replace_items(items)?;
        Ok(self)
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    pub fn set_tax_rate(&mut self, tax_rate: Decimal) -> Result<(), InvoiceError> {
        self.ensure_editable()?;
        if tax_rate.is_sign_negative() && !tax_rate.is_zero() {
            return Err(InvoiceError::NegativeTaxRate(tax_rate));
        }
        let previous = std::mem::replace(&mut self.tax_rate, tax_rate);
        self.recompute_totals().inspect_err(|_| self.tax_rate = previous)
    }

    /// Replace all line items and recompute totals. Items with a blank
    /// description are dropped.
    pub fn replace_items(&mut self, items: Vec<InvoiceItem>) -> Result<(), InvoiceError> {
        self.ensure_editable()?;
        let items: Vec<InvoiceItem> = items
            .into_iter()
            .filter(|item| !item.description.trim().is_empty())
            .collect();
        let previous = std::mem::replace(&mut self.items, items);
        self.recompute_totals().inspect_err(|_| self.items = previous)
    }

    /// issued -> sent
    pub fn mark_sent(&mut self) -> Result<(), InvoiceError> {
        self.transition(InvoiceStatus::Sent, &[InvoiceStatus::Issued])
    }

    /// issued | sent -> expired
    pub fn mark_expired(&mut self) -> Result<(), InvoiceError> {
        self.transition(
            InvoiceStatus::Expired,
            &[InvoiceStatus::Issued, InvoiceStatus::Sent],
        )
    }

    /// Any unpaid state -> paid. Happens at most once.
    pub fn mark_paid(&mut self, payment_date: NaiveDate) -> Result<(), InvoiceError> {
        self.transition(
            InvoiceStatus::Paid,
            &[
                InvoiceStatus::Issued,
                InvoiceStatus::Sent,
                InvoiceStatus::Expired,
            ],
        )?;
        self.payment_date = Some(payment_date);
        Ok(())
    }

    fn transition(
        &mut self,
        to: InvoiceStatus,
        allowed_from: &[InvoiceStatus],
    ) -> Result<(), InvoiceError> {
        if self.is_paid() {
            return Err(InvoiceError::AlreadyPaid(self.number.clone()));
        }
        if !allowed_from.contains(&self.status) {
            return Err(InvoiceError::InvalidTransition {
                number: self.number.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), InvoiceError> {
        if self.is_paid() {
            return Err(InvoiceError::AlreadyPaid(self.number.clone()));
        }
        Ok(())
    }

    fn recompute_totals(&mut self) -> Result<(), InvoiceError> {
        let subtotal = self
            .items
            .iter()
            .try_fold(0 as Cents, |acc, item| acc.checked_add(item.total))
            .ok_or(InvoiceError::Overflow)?;
        let tax = percent_of(subtotal, self.tax_rate).ok_or(InvoiceError::Overflow)?;
        let total = subtotal.checked_add(tax).ok_or(InvoiceError::Overflow)?;

        self.subtotal = subtotal;
        self.tax = tax;
        self.total = total;
        Ok(())
    }
}

/// Collected vs. outstanding amounts across a set of invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub count: usize,
    pub collected: Cents,
    pub pending: Cents,
}

impl InvoiceTotals {
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        invoices.iter().fold(Self::default(), |mut totals, invoice| {
            totals.count += 1;
            if invoice.is_paid() {
                totals.collected = totals.collected.saturating_add(invoice.total);
            } else {
                totals.pending = totals.pending.saturating_add(invoice.total);
            }
            totals
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    AlreadyPaid(String),
    InvalidTransition {
        number: String,
        from: InvoiceStatus,
        to: InvoiceStatus,
    },
    NegativeQuantity(Decimal),
    NegativeAmount(Cents),
    NegativeTaxRate(Decimal),
    Overflow,
}

impl std::fmt::Display for InvoiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceError::AlreadyPaid(number) => write!(f, "Invoice {} is already paid", number),
            InvoiceError::InvalidTransition { number, from, to } => {
                write!(f, "Invoice {} cannot go from {} to {}", number, from, to)
            }
            InvoiceError::NegativeQuantity(qty) => {
                write!(f, "Quantity must not be negative, got {}", qty)
            }
            InvoiceError::NegativeAmount(amount) => {
                write!(f, "Unit price must not be negative, got {} cents", amount)
            }
            InvoiceError::NegativeTaxRate(rate) => {
                write!(f, "Tax rate must not be negative, got {}%", rate)
            }
            InvoiceError::Overflow => write!(f, "Invoice amount is too large"),
        }
    }
}

impl std::error::Error for InvoiceError {}
