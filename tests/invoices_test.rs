mod common;

use anyhow::Result;
use common::{Fixtures, item, new_tenant, parse_date, test_service};
use retainer::application::{AppError, NewInvoice};
use retainer::domain::{InvoiceError, InvoiceStatus, MovementKind};
use rust_decimal::Decimal;

fn invoice_for(client: &str, number: &str, date: &str) -> NewInvoice {
    NewInvoice {
        client: client.to_string(),
        number: number.to_string(),
        issue_date: parse_date(date),
        period: Some("March 2024".to_string()),
        items: vec![item("Monthly support", 1, 100000), item("Extra hours", 3, 8000)],
        tax_rate: None,
        notes: None,
    }
}

#[tokio::test]
async fn test_issue_invoice_with_default_vat() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;

    let invoice = service
        .issue_invoice(tenant, invoice_for("Acme", "F-0001", "2024-03-31"))
        .await?;
    assert_eq!(invoice.subtotal, 124000);
    assert_eq!(invoice.tax, 26040);
    assert_eq!(invoice.total, 150040);
    assert_eq!(invoice.status, InvoiceStatus::Issued);

    // Stored items round-trip through the database
    let stored = service.get_invoice(tenant, "F-0001").await?;
    assert_eq!(stored.items, invoice.items);
    assert_eq!(stored.tax_rate, Decimal::from(21));
    assert_eq!(stored.period.as_deref(), Some("March 2024"));

    let statement = service.statement(tenant, "Acme").await?;
    assert_eq!(statement.movements.len(), 1);
    let movement = &statement.movements[0];
    assert_eq!(movement.kind, MovementKind::InvoiceIssued);
    assert_eq!(movement.debit, 150040);
    assert_eq!(movement.description, "Invoice F-0001 - March 2024");
    assert_eq!(movement.invoice_id, Some(invoice.id));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_invoice_number_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;

    service
        .issue_invoice(tenant, invoice_for("Acme", "F-0001", "2024-03-31"))
        .await?;
    let result = service
        .issue_invoice(tenant, invoice_for("Acme", "F-0001", "2024-04-30"))
        .await;
    assert!(matches!(result, Err(AppError::InvoiceAlreadyExists(_))));
    assert_eq!(service.statement(tenant, "Acme").await?.movements.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_invoice_for_unknown_client_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();

    let result = service
        .issue_invoice(tenant, invoice_for("Nobody", "F-0001", "2024-03-31"))
        .await;
    assert!(matches!(result, Err(AppError::ClientNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_empty_invoice_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;

    let mut new_invoice = invoice_for("Acme", "F-0001", "2024-03-31");
    new_invoice.items = vec![item("   ", 1, 5000)];
    let result = service.issue_invoice(tenant, new_invoice).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    assert!(service.list_invoices(tenant).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invoice_paid_exactly_once() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;
    Fixtures::untaxed_invoice(&service, tenant, "Acme", "F-0001", "2024-03-01", 40000).await?;

    let result = service
        .mark_invoice_paid(tenant, "F-0001", parse_date("2024-03-15"))
        .await?;
    assert_eq!(result.invoice.status, InvoiceStatus::Paid);
    assert_eq!(result.movement.credit, 40000);
    assert_eq!(result.movement.description, "Payment of invoice F-0001");

    let second = service
        .mark_invoice_paid(tenant, "F-0001", parse_date("2024-03-20"))
        .await;
    assert!(matches!(
        second,
        Err(AppError::Invoice(InvoiceError::AlreadyPaid(_)))
    ));

    let statement = service.statement(tenant, "Acme").await?;
    let payments = statement
        .movements
        .iter()
        .filter(|m| m.kind == MovementKind::PaymentReceived)
        .count();
    assert_eq!(payments, 1);
    assert_eq!(statement.balance, 0);

    let stored = service.get_invoice(tenant, "F-0001").await?;
    assert_eq!(stored.payment_date, Some(parse_date("2024-03-15")));

    Ok(())
}

#[tokio::test]
async fn test_status_transitions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;
    Fixtures::untaxed_invoice(&service, tenant, "Acme", "F-0001", "2024-03-01", 40000).await?;

    let sent = service.mark_invoice_sent(tenant, "F-0001").await?;
    assert_eq!(sent.status, InvoiceStatus::Sent);
    assert!(matches!(
        service.mark_invoice_sent(tenant, "F-0001").await,
        Err(AppError::Invoice(InvoiceError::InvalidTransition { .. }))
    ));

    let expired = service.mark_invoice_expired(tenant, "F-0001").await?;
    assert_eq!(expired.status, InvoiceStatus::Expired);
    assert_eq!(
        service.get_invoice(tenant, "F-0001").await?.status,
        InvoiceStatus::Expired
    );

    // Expired invoices can still be collected
    service
        .mark_invoice_paid(tenant, "F-0001", parse_date("2024-05-01"))
        .await?;
    assert!(service.mark_invoice_expired(tenant, "F-0001").await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_edit_appends_revision_notes() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;
    Fixtures::untaxed_invoice(&service, tenant, "Acme", "F-0001", "2024-03-01", 40000).await?;

    // Increase: 40000 -> 55000
    let edited = service
        .edit_invoice(
            tenant,
            "F-0001",
            vec![item("Services", 1, 40000), item("Travel", 1, 15000)],
            None,
            parse_date("2024-03-05"),
        )
        .await?;
    assert_eq!(edited.total, 55000);

    // Decrease: 55000 -> 30000
    service
        .edit_invoice(
            tenant,
            "F-0001",
            vec![item("Services", 1, 30000)],
            None,
            parse_date("2024-03-06"),
        )
        .await?;

    // Unchanged total: no movement
    service
        .edit_invoice(
            tenant,
            "F-0001",
            vec![item("Services (revised)", 1, 30000)],
            None,
            parse_date("2024-03-07"),
        )
        .await?;

    let statement = service.statement(tenant, "Acme").await?;
    let kinds: Vec<MovementKind> = statement.movements.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![
            MovementKind::InvoiceIssued,
            MovementKind::DebitNote,
            MovementKind::CreditNote
        ]
    );
    assert_eq!(statement.movements[1].debit, 15000);
    assert_eq!(statement.movements[2].credit, 25000);
    assert_eq!(statement.balance, 30000);
    assert_eq!(
        statement.movements[2].description,
        "Revision of invoice F-0001"
    );

    let stored = service.get_invoice(tenant, "F-0001").await?;
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].description, "Services (revised)");

    Ok(())
}

#[tokio::test]
async fn test_tax_change_on_edit() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;
    Fixtures::untaxed_invoice(&service, tenant, "Acme", "F-0001", "2024-03-01", 10000).await?;

    let edited = service
        .edit_invoice(
            tenant,
            "F-0001",
            vec![item("Services", 1, 10000)],
            Some(Decimal::new(105, 1)),
            parse_date("2024-03-02"),
        )
        .await?;
    assert_eq!(edited.tax, 1050);
    assert_eq!(edited.total, 11050);
    assert_eq!(service.statement(tenant, "Acme").await?.balance, 11050);

    Ok(())
}

#[tokio::test]
async fn test_paid_invoice_cannot_be_edited() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;
    Fixtures::untaxed_invoice(&service, tenant, "Acme", "F-0001", "2024-03-01", 40000).await?;
    service
        .mark_invoice_paid(tenant, "F-0001", parse_date("2024-03-10"))
        .await?;

    let result = service
        .edit_invoice(
            tenant,
            "F-0001",
            vec![item("Services", 1, 1)],
            None,
            parse_date("2024-03-11"),
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::Invoice(InvoiceError::AlreadyPaid(_)))
    ));
    assert_eq!(service.get_invoice(tenant, "F-0001").await?.total, 40000);

    Ok(())
}

#[tokio::test]
async fn test_invoice_totals() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    Fixtures::flat_client(&service, tenant, "Acme", 100000).await?;

    Fixtures::untaxed_invoice(&service, tenant, "Acme", "F-0001", "2024-01-01", 10000).await?;
    Fixtures::untaxed_invoice(&service, tenant, "Acme", "F-0002", "2024-02-01", 20000).await?;
    Fixtures::untaxed_invoice(&service, tenant, "Acme", "F-0003", "2024-03-01", 30000).await?;
    service
        .mark_invoice_paid(tenant, "F-0002", parse_date("2024-02-15"))
        .await?;

    let totals = service.invoice_totals(tenant).await?;
    assert_eq!(totals.count, 3);
    assert_eq!(totals.collected, 20000);
    assert_eq!(totals.pending, 40000);

    let numbers: Vec<String> = service
        .list_invoices(tenant)
        .await?
        .into_iter()
        .map(|i| i.number)
        .collect();
    assert_eq!(numbers, vec!["F-0001", "F-0002", "F-0003"]);

    Ok(())
}
