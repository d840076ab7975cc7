use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ClientRef, InvoiceId, LedgerError, TenantId};

pub type MovementId = Uuid;

/// Kind of an account movement. Each kind lands on a fixed side of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// An invoice was issued to the client (debit)
    InvoiceIssued,
    /// The client paid (credit)
    PaymentReceived,
    /// Amount forgiven or returned to the client (credit)
    CreditNote,
    /// Extra amount charged to the client (debit)
    DebitNote,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::InvoiceIssued => "invoice",
            MovementKind::PaymentReceived => "payment",
            MovementKind::CreditNote => "credit_note",
            MovementKind::DebitNote => "debit_note",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "invoice" | "factura" => Some(MovementKind::InvoiceIssued),
            "payment" | "pago" => Some(MovementKind::PaymentReceived),
            "credit_note" | "credit" | "nota_credito" => Some(MovementKind::CreditNote),
            "debit_note" | "debit" | "nota_debito" => Some(MovementKind::DebitNote),
            _ => None,
        }
    }

    /// True when this kind increases what the client owes.
    pub fn is_debit(&self) -> bool {
        matches!(self, MovementKind::InvoiceIssued | MovementKind::DebitNote)
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in a client's account. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMovement {
    pub id: MovementId,
    pub tenant_id: TenantId,
    pub client: ClientRef,
    /// Insertion order assigned by storage; 0 until persisted
    pub sequence: i64,
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub description: String,
    pub debit: Cents,
    pub credit: Cents,
    /// Advisory only. The authoritative balance is recomputed from full history.
    pub balance: Cents,
    pub invoice_id: Option<InvoiceId>,
    pub recorded_at: DateTime<Utc>,
}

impl AccountMovement {
    /// Create a movement, placing `amount` on the side dictated by `kind`.
    pub fn new(
        tenant_id: TenantId,
        client: ClientRef,
        kind: MovementKind,
        amount: Cents,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        let (debit, credit) = if kind.is_debit() {
            (amount, 0)
        } else {
            (0, amount)
        };
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            client,
            sequence: 0,
            date,
            kind,
            description: description.into(),
            debit,
            credit,
            balance: 0,
            invoice_id: None,
            recorded_at: Utc::now(),
        }
    }

    /// A manual credit or debit note. The amount must be positive.
    pub fn note(
        tenant_id: TenantId,
        client: ClientRef,
        kind: MovementKind,
        amount: Cents,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        if !matches!(kind, MovementKind::CreditNote | MovementKind::DebitNote) {
            return Err(LedgerError::NotANote(kind));
        }
        if amount <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        Ok(Self::new(tenant_id, client, kind, amount, date, description))
    }

    pub fn with_invoice(mut self, invoice_id: InvoiceId) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }

    /// Signed effect on the client's balance.
    pub fn net(&self) -> Cents {
        self.debit - self.credit
    }

    /// Exactly one of debit/credit must carry the magnitude; neither may be negative.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let well_formed = self.debit >= 0
            && self.credit >= 0
            && ((self.debit > 0) != (self.credit > 0));
        if well_formed {
            Ok(())
        } else {
            Err(LedgerError::MalformedMovement {
                id: self.id,
                debit: self.debit,
                credit: self.credit,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn client() -> ClientRef {
        ClientRef::Regular(Uuid::new_v4())
    }

    #[test]
    fn test_kind_places_amount_on_its_side() {
        let tenant = Uuid::new_v4();
        let c = client();
        let d = date("2024-01-01");

        let invoice = AccountMovement::new(tenant, c, MovementKind::InvoiceIssued, 500, d, "");
        assert_eq!((invoice.debit, invoice.credit), (500, 0));

        let payment = AccountMovement::new(tenant, c, MovementKind::PaymentReceived, 500, d, "");
        assert_eq!((payment.debit, payment.credit), (0, 500));

        let credit = AccountMovement::new(tenant, c, MovementKind::CreditNote, 70, d, "");
        assert_eq!(credit.net(), -70);

        let debit = AccountMovement::new(tenant, c, MovementKind::DebitNote, 70, d, "");
        assert_eq!(debit.net(), 70);
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(
            MovementKind::from_str("factura"),
            Some(MovementKind::InvoiceIssued)
        );
        assert_eq!(
            MovementKind::from_str("nota_credito"),
            Some(MovementKind::CreditNote)
        );
        assert_eq!(MovementKind::from_str("refund"), None);
    }

    #[test]
    fn test_validate() {
        let mut movement = AccountMovement::new(
            Uuid::new_v4(),
            client(),
            MovementKind::InvoiceIssued,
            100,
            date("2024-01-01"),
            "",
        );
        assert!(movement.validate().is_ok());

        movement.credit = 30;
        assert!(matches!(
            movement.validate(),
            Err(LedgerError::MalformedMovement { .. })
        ));

        movement.debit = 0;
        movement.credit = 0;
        assert!(movement.validate().is_err());

        movement.debit = -10;
        assert!(movement.validate().is_err());
    }

    #[test]
    fn test_note_requires_positive_amount_and_note_kind() {
        let tenant = Uuid::new_v4();
        let d = date("2024-01-01");

        assert_eq!(
            AccountMovement::note(tenant, client(), MovementKind::CreditNote, 0, d, "x"),
            Err(LedgerError::NonPositiveAmount(0))
        );
        assert_eq!(
            AccountMovement::note(tenant, client(), MovementKind::PaymentReceived, 10, d, "x"),
            Err(LedgerError::NotANote(MovementKind::PaymentReceived))
        );

        let note =
            AccountMovement::note(tenant, client(), MovementKind::CreditNote, 250, d, "Discount")
                .unwrap();
        assert_eq!(note.credit, 250);
    }
}
