use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::{AccountMovement, Cents, ClientRef, Invoice, MovementId, MovementKind};

/// A client's account derived from its full movement history.
///
/// Positive balances mean the client owes the business; negative balances are
/// credit in the client's favour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// Chronological, each with `balance` set to the running total after it
    pub movements: Vec<AccountMovement>,
    pub balance: Cents,
    pub total_debit: Cents,
    pub total_credit: Cents,
}

/// Compute running balances for one client's movements.
///
/// Movements are ordered by date, then by storage sequence, then by their
/// position in `movements`. Any stored balance is ignored and overwritten.
pub fn compute_balances(movements: &[AccountMovement]) -> Result<Statement, LedgerError> {
    if let Some(first) = movements.first() {
        for movement in movements {
            movement.validate()?;
            if movement.client != first.client {
                return Err(LedgerError::MixedClients {
                    expected: first.client,
                    found: movement.client,
                });
            }
        }
    }

    let mut sorted = movements.to_vec();
    // Stable sort: equal (date, sequence) keep their input order
    sorted.sort_by_key(|m| (m.date, m.sequence));

    let mut running: Cents = 0;
    let mut total_debit: Cents = 0;
    let mut total_credit: Cents = 0;

    for movement in &mut sorted {
        running = running
            .checked_add(movement.net())
            .ok_or(LedgerError::Overflow)?;
        total_debit = total_debit
            .checked_add(movement.debit)
            .ok_or(LedgerError::Overflow)?;
        total_credit = total_credit
            .checked_add(movement.credit)
            .ok_or(LedgerError::Overflow)?;
        movement.balance = running;
    }

    Ok(Statement {
        movements: sorted,
        balance: running,
        total_debit,
        total_credit,
    })
}

/// Current balance for every client appearing in `movements`.
pub fn compute_all_balances(
    movements: &[AccountMovement],
) -> Result<HashMap<ClientRef, Cents>, LedgerError> {
    let mut balances: HashMap<ClientRef, Cents> = HashMap::new();

    for movement in movements {
        movement.validate()?;
        let balance = balances.entry(movement.client).or_insert(0);
        *balance = balance
            .checked_add(movement.net())
            .ok_or(LedgerError::Overflow)?;
    }

    Ok(balances)
}

/// The debit raised when an invoice is issued.
pub fn record_invoice(invoice: &Invoice) -> AccountMovement {
    let description = match invoice.period.as_deref() {
        Some(period) if !period.is_empty() => format!("Invoice {} - {}", invoice.number, period),
        _ => format!("Invoice {}", invoice.number),
    };
    AccountMovement::new(
        invoice.tenant_id,
        invoice.client,
        MovementKind::InvoiceIssued,
        invoice.total,
        invoice.issue_date,
        description,
    )
    .with_invoice(invoice.id)
}

/// The credit raised when an invoice is paid. The invoice must already be paid.
pub fn record_payment(invoice: &Invoice) -> Result<AccountMovement, LedgerError> {
    let payment_date = match invoice.payment_date {
        Some(date) if invoice.is_paid() => date,
        _ => return Err(LedgerError::InvoiceNotPaid(invoice.number.clone())),
    };
    Ok(AccountMovement::new(
        invoice.tenant_id,
        invoice.client,
        MovementKind::PaymentReceived,
        invoice.total,
        payment_date,
        format!("Payment of invoice {}", invoice.number),
    )
    .with_invoice(invoice.id))
}

/// The note that reconciles the ledger after an invoice total changed on edit.
/// Returns `None` when the total is unchanged.
pub fn record_invoice_revision(
    invoice: &Invoice,
    previous_total: Cents,
    date: NaiveDate,
) -> Option<AccountMovement> {
    let difference = invoice.total - previous_total;
    let kind = match difference {
        0 => return None,
        d if d > 0 => MovementKind::DebitNote,
        _ => MovementKind::CreditNote,
    };
    Some(
        AccountMovement::new(
            invoice.tenant_id,
            invoice.client,
            kind,
            difference.abs(),
            date,
            format!("Revision of invoice {}", invoice.number),
        )
        .with_invoice(invoice.id),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    MalformedMovement {
        id: MovementId,
        debit: Cents,
        credit: Cents,
    },
    MixedClients {
        expected: ClientRef,
        found: ClientRef,
    },
    InvoiceNotPaid(String),
    NonPositiveAmount(Cents),
    NotANote(MovementKind),
    Overflow,
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::MalformedMovement { id, debit, credit } => write!(
                f,
                "Malformed movement {}: exactly one of debit ({}) or credit ({}) must be positive",
                id, debit, credit
            ),
            LedgerError::MixedClients { expected, found } => write!(
                f,
                "Movements belong to different clients ({} and {})",
                expected.id(),
                found.id()
            ),
            LedgerError::InvoiceNotPaid(number) => {
                write!(f, "Invoice {} has not been paid", number)
            }
            LedgerError::NonPositiveAmount(amount) => {
                write!(f, "Amount must be positive, got {} cents", amount)
            }
            LedgerError::NotANote(kind) => {
                write!(f, "Only credit or debit notes can be recorded manually, got {}", kind)
            }
            LedgerError::Overflow => write!(f, "Balance is too large"),
        }
    }
}

impl std::error::Error for LedgerError {}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{InvoiceItem, InvoiceStatus, TenantId};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn movement(
        tenant: TenantId,
        client: ClientRef,
        day: &str,
        debit: Cents,
        credit: Cents,
    ) -> AccountMovement {
        let mut m = AccountMovement::new(
            tenant,
            client,
            MovementKind::InvoiceIssued,
            0,
            date(day),
            "",
        );
        m.debit = debit;
        m.credit = credit;
        m
    }

    fn sample_invoice(total_cents: Cents) -> Invoice {
        Invoice::new(
            Uuid::new_v4(),
            ClientRef::Regular(Uuid::new_v4()),
            "A-0001",
            date("2024-03-01"),
        )
        .with_tax_rate(Decimal::ZERO)
        .unwrap()
        .with_items(vec![InvoiceItem::new("Support", Decimal::ONE, total_cents).unwrap()])
        .unwrap()
    }

    #[test]
    fn test_compute_balances_empty() {
        let statement = compute_balances(&[]).unwrap();
        assert!(statement.movements.is_empty());
        assert_eq!(statement.balance, 0);
    }

    #[test]
    fn test_running_balances() {
        let tenant = Uuid::new_v4();
        let client = ClientRef::Regular(Uuid::new_v4());
        let movements = vec![
            movement(tenant, client, "2024-01-01", 100, 0),
            movement(tenant, client, "2024-01-02", 0, 40),
            movement(tenant, client, "2024-01-03", 50, 0),
        ];

        let statement = compute_balances(&movements).unwrap();
        let balances: Vec<Cents> = statement.movements.iter().map(|m| m.balance).collect();

        assert_eq!(balances, vec![100, 60, 110]);
        assert_eq!(statement.balance, 110);
        assert_eq!(statement.total_debit, 150);
        assert_eq!(statement.total_credit, 40);
    }

    #[test]
    fn test_unordered_input_is_sorted_by_date() {
        let tenant = Uuid::new_v4();
        let client = ClientRef::Regular(Uuid::new_v4());
        let movements = vec![
            movement(tenant, client, "2024-01-03", 50, 0),
            movement(tenant, client, "2024-01-01", 100, 0),
            movement(tenant, client, "2024-01-02", 0, 40),
        ];

        let statement = compute_balances(&movements).unwrap();
        let balances: Vec<Cents> = statement.movements.iter().map(|m| m.balance).collect();
        assert_eq!(balances, vec![100, 60, 110]);
    }

    #[test]
    fn test_same_day_ties_use_sequence_then_input_order() {
        let tenant = Uuid::new_v4();
        let client = ClientRef::Regular(Uuid::new_v4());

        let mut payment = movement(tenant, client, "2024-01-01", 0, 100);
        payment.sequence = 2;
        let mut invoice = movement(tenant, client, "2024-01-01", 100, 0);
        invoice.sequence = 1;

        let statement = compute_balances(&[payment.clone(), invoice.clone()]).unwrap();
        assert_eq!(statement.movements[0].id, invoice.id);
        assert_eq!(statement.movements[0].balance, 100);
        assert_eq!(statement.movements[1].balance, 0);

        // Unsequenced movements keep input order
        let a = movement(tenant, client, "2024-01-01", 0, 30);
        let b = movement(tenant, client, "2024-01-01", 10, 0);
        let statement = compute_balances(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(statement.movements[0].id, a.id);
        assert_eq!(statement.movements[0].balance, -30);
        assert_eq!(statement.movements[1].balance, -20);
    }

    #[test]
    fn test_stored_balance_is_ignored() {
        let tenant = Uuid::new_v4();
        let client = ClientRef::Regular(Uuid::new_v4());
        let mut m = movement(tenant, client, "2024-01-01", 100, 0);
        m.balance = 99999;

        let statement = compute_balances(&[m]).unwrap();
        assert_eq!(statement.movements[0].balance, 100);
        assert_eq!(statement.balance, 100);
    }

    #[test]
    fn test_compute_balances_is_idempotent() {
        let tenant = Uuid::new_v4();
        let client = ClientRef::Regular(Uuid::new_v4());
        let movements = vec![
            movement(tenant, client, "2024-02-01", 0, 500),
            movement(tenant, client, "2024-01-01", 700, 0),
        ];

        let first = compute_balances(&movements).unwrap();
        let second = compute_balances(&movements).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_movement_rejected() {
        let tenant = Uuid::new_v4();
        let client = ClientRef::Regular(Uuid::new_v4());

        let both = movement(tenant, client, "2024-01-01", 50, 30);
        assert!(matches!(
            compute_balances(&[both]),
            Err(LedgerError::MalformedMovement {
                debit: 50,
                credit: 30,
                ..
            })
        ));

        let neither = movement(tenant, client, "2024-01-01", 0, 0);
        assert!(matches!(
            compute_balances(&[neither]),
            Err(LedgerError::MalformedMovement { .. })
        ));
    }

    #[test]
    fn test_mixed_clients_rejected() {
        let tenant = Uuid::new_v4();
        let a = movement(tenant, ClientRef::Regular(Uuid::new_v4()), "2024-01-01", 10, 0);
        let b = movement(tenant, ClientRef::Occasional(Uuid::new_v4()), "2024-01-01", 10, 0);
        assert!(matches!(
            compute_balances(&[a, b]),
            Err(LedgerError::MixedClients { .. })
        ));
    }

    #[test]
    fn test_compute_all_balances() {
        let tenant = Uuid::new_v4();
        let alice = ClientRef::Regular(Uuid::new_v4());
        let bob = ClientRef::Occasional(Uuid::new_v4());

        let movements = vec![
            movement(tenant, alice, "2024-01-01", 1000, 0),
            movement(tenant, bob, "2024-01-01", 300, 0),
            movement(tenant, alice, "2024-01-05", 0, 1200),
        ];

        let balances = compute_all_balances(&movements).unwrap();
        assert_eq!(balances.get(&alice), Some(&-200));
        assert_eq!(balances.get(&bob), Some(&300));
    }

    #[test]
    fn test_record_invoice() {
        let invoice = sample_invoice(12100).with_period("March 2024");
        let movement = record_invoice(&invoice);

        assert_eq!(movement.kind, MovementKind::InvoiceIssued);
        assert_eq!(movement.debit, 12100);
        assert_eq!(movement.credit, 0);
        assert_eq!(movement.date, invoice.issue_date);
        assert_eq!(movement.client, invoice.client);
        assert_eq!(movement.invoice_id, Some(invoice.id));
        assert_eq!(movement.description, "Invoice A-0001 - March 2024");
    }

    #[test]
    fn test_record_payment_requires_paid_invoice() {
        let mut invoice = sample_invoice(5000);
        assert_eq!(
            record_payment(&invoice),
            Err(LedgerError::InvoiceNotPaid("A-0001".to_string()))
        );

        invoice.mark_paid(date("2024-03-20")).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);

        let payment = record_payment(&invoice).unwrap();
        assert_eq!(payment.kind, MovementKind::PaymentReceived);
        assert_eq!(payment.credit, 5000);
        assert_eq!(payment.debit, 0);
        assert_eq!(payment.date, date("2024-03-20"));
        assert_eq!(payment.description, "Payment of invoice A-0001");
    }

    #[test]
    fn test_payment_decreases_balance_by_invoice_total() {
        let mut invoice = sample_invoice(8000);
        let issued = record_invoice(&invoice);
        let before = compute_balances(&[issued.clone()]).unwrap().balance;

        invoice.mark_paid(date("2024-03-10")).unwrap();
        let paid = record_payment(&invoice).unwrap();
        let after = compute_balances(&[issued, paid]).unwrap().balance;

        assert_eq!(before - after, invoice.total);
        assert!(after < before);
    }

    #[test]
    fn test_record_invoice_revision() {
        let invoice = sample_invoice(10000);
        let d = date("2024-03-05");

        assert!(record_invoice_revision(&invoice, 10000, d).is_none());

        let up = record_invoice_revision(&invoice, 8000, d).unwrap();
        assert_eq!(up.kind, MovementKind::DebitNote);
        assert_eq!(up.debit, 2000);

        let down = record_invoice_revision(&invoice, 12500, d).unwrap();
        assert_eq!(down.kind, MovementKind::CreditNote);
        assert_eq!(down.credit, 2500);
    }
}
