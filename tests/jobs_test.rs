mod common;

use anyhow::Result;
use common::{Fixtures, new_tenant, parse_date, test_service};
use retainer::application::{AppError, NewJob};
use retainer::domain::{ClientRef, JobError, JobStatus, JobType};

fn new_job(client: &str, date: &str, description: &str) -> NewJob {
    NewJob {
        client: client.to_string(),
        request_date: parse_date(date),
        description: description.to_string(),
        job_type: JobType::Remote,
        value: 0,
        notes: None,
    }
}

#[tokio::test]
async fn test_jobs_are_numbered_per_tenant() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();
    let other_tenant = new_tenant();

    let client = Fixtures::flat_client(&service, tenant, "Acme", 50000).await?;
    let walk_in = Fixtures::occasional_client(&service, tenant, "Walk-in").await?;
    Fixtures::flat_client(&service, other_tenant, "Acme", 50000).await?;

    let first = service
        .create_job(tenant, new_job("Acme", "2024-03-01", "Printer setup"))
        .await?;
    let second = service
        .create_job(
            tenant,
            NewJob {
                job_type: JobType::OnSite,
                value: 15000,
                notes: Some("Bring cables".to_string()),
                ..new_job("Walk-in", "2024-03-02", "Network audit")
            },
        )
        .await?;
    let elsewhere = service
        .create_job(other_tenant, new_job("Acme", "2024-03-01", "Backup"))
        .await?;

    assert_eq!(first.job_number, "0001");
    assert_eq!(first.status, JobStatus::Pending);
    assert_eq!(first.client, ClientRef::from(&client));
    assert_eq!(second.job_number, "0002");
    assert_eq!(second.client, ClientRef::from(&walk_in));
    assert_eq!(elsewhere.job_number, "0001");

    let loaded = service.get_job(tenant, "0002").await?;
    assert_eq!(loaded.job_type, JobType::OnSite);
    assert_eq!(loaded.value, 15000);
    assert_eq!(loaded.notes.as_deref(), Some("Bring cables"));

    assert_eq!(service.list_jobs(tenant, None).await?.len(), 2);
    assert_eq!(service.list_jobs(other_tenant, None).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_job_moves_forward_to_collected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();

    Fixtures::flat_client(&service, tenant, "Acme", 50000).await?;
    service
        .create_job(tenant, new_job("Acme", "2024-03-01", "Server migration"))
        .await?;

    let job = service
        .update_job_status(tenant, "0001", JobStatus::InProgress, parse_date("2024-03-02"))
        .await?;
    assert_eq!(job.status, JobStatus::InProgress);
    assert_eq!(job.completion_date, None);

    service.log_job_hours(tenant, "0001", 2.5).await?;
    let job = service.log_job_hours(tenant, "0001", 1.0).await?;
    assert_eq!(job.hours_spent, 3.5);

    let job = service
        .update_job_status(tenant, "0001", JobStatus::Completed, parse_date("2024-03-05"))
        .await?;
    assert_eq!(job.completion_date, Some(parse_date("2024-03-05")));

    // Invoicing goes through the invoice link
    let result = service
        .update_job_status(tenant, "0001", JobStatus::Invoiced, parse_date("2024-03-06"))
        .await;
    assert!(matches!(
        result,
        Err(AppError::Job(JobError::InvoiceRequired(_)))
    ));

    let invoice =
        Fixtures::untaxed_invoice(&service, tenant, "Acme", "A-0001", "2024-03-06", 20000)
            .await?;
    let job = service.invoice_job(tenant, "0001", "A-0001").await?;
    assert_eq!(job.status, JobStatus::Invoiced);
    assert_eq!(job.invoice_id, Some(invoice.id));

    // Billed jobs take no more hours
    assert!(matches!(
        service.log_job_hours(tenant, "0001", 1.0).await,
        Err(AppError::Job(JobError::AlreadyBilled(_)))
    ));

    let job = service
        .update_job_status(tenant, "0001", JobStatus::Collected, parse_date("2024-03-20"))
        .await?;
    assert_eq!(job.status, JobStatus::Collected);

    let reloaded = service.get_job(tenant, "0001").await?;
    assert_eq!(reloaded.status, JobStatus::Collected);
    assert_eq!(reloaded.hours_spent, 3.5);
    assert_eq!(reloaded.invoice_id, Some(invoice.id));

    Ok(())
}

#[tokio::test]
async fn test_job_transitions_are_checked() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();

    Fixtures::flat_client(&service, tenant, "Acme", 50000).await?;
    service
        .create_job(tenant, new_job("Acme", "2024-03-10", "Firewall rules"))
        .await?;

    assert!(matches!(
        service
            .update_job_status(tenant, "0001", JobStatus::Completed, parse_date("2024-03-09"))
            .await,
        Err(AppError::Job(JobError::CompletedBeforeRequest { .. }))
    ));
    assert!(matches!(
        service
            .update_job_status(tenant, "0001", JobStatus::Collected, parse_date("2024-03-11"))
            .await,
        Err(AppError::Job(JobError::InvalidTransition { .. }))
    ));

    // A pending job can be completed directly
    service
        .update_job_status(tenant, "0001", JobStatus::Completed, parse_date("2024-03-10"))
        .await?;
    assert!(matches!(
        service
            .update_job_status(tenant, "0001", JobStatus::InProgress, parse_date("2024-03-11"))
            .await,
        Err(AppError::Job(JobError::InvalidTransition { .. }))
    ));

    // Failed transitions leave the stored job alone
    let job = service.get_job(tenant, "0001").await?;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.completion_date, Some(parse_date("2024-03-10")));

    Ok(())
}

#[tokio::test]
async fn test_invoice_must_belong_to_the_job_client() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();

    Fixtures::flat_client(&service, tenant, "Acme", 50000).await?;
    Fixtures::flat_client(&service, tenant, "Globex", 50000).await?;
    service
        .create_job(tenant, new_job("Acme", "2024-03-01", "Printer setup"))
        .await?;
    service
        .update_job_status(tenant, "0001", JobStatus::Completed, parse_date("2024-03-02"))
        .await?;
    Fixtures::untaxed_invoice(&service, tenant, "Globex", "G-0001", "2024-03-03", 10000).await?;

    assert!(matches!(
        service.invoice_job(tenant, "0001", "G-0001").await,
        Err(AppError::Job(JobError::ClientMismatch(_)))
    ));
    assert!(matches!(
        service.invoice_job(tenant, "0001", "missing").await,
        Err(AppError::InvoiceNotFound(_))
    ));

    let job = service.get_job(tenant, "0001").await?;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.invoice_id, None);

    Ok(())
}

#[tokio::test]
async fn test_list_jobs_by_status() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();

    Fixtures::flat_client(&service, tenant, "Acme", 50000).await?;
    for (date, description) in [
        ("2024-03-01", "Printer setup"),
        ("2024-03-05", "Backup check"),
        ("2024-03-03", "Mail filters"),
    ] {
        service
            .create_job(tenant, new_job("Acme", date, description))
            .await?;
    }
    service
        .update_job_status(tenant, "0002", JobStatus::InProgress, parse_date("2024-03-06"))
        .await?;

    let pending = service.list_jobs(tenant, Some(JobStatus::Pending)).await?;
    let numbers: Vec<&str> = pending.iter().map(|j| j.job_number.as_str()).collect();
    assert_eq!(numbers, vec!["0003", "0001"]);

    let in_progress = service
        .list_jobs(tenant, Some(JobStatus::InProgress))
        .await?;
    assert_eq!(in_progress.len(), 1);
    assert_eq!(in_progress[0].description, "Backup check");

    assert!(
        service
            .list_jobs(tenant, Some(JobStatus::Collected))
            .await?
            .is_empty()
    );

    Ok(())
}

#[tokio::test]
async fn test_job_lookups_fail_cleanly() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let tenant = new_tenant();

    assert!(matches!(
        service
            .create_job(tenant, new_job("Nobody", "2024-03-01", "Anything"))
            .await,
        Err(AppError::ClientNotFound(_))
    ));

    Fixtures::flat_client(&service, tenant, "Acme", 50000).await?;
    assert!(matches!(
        service
            .create_job(tenant, new_job("Acme", "2024-03-01", "   "))
            .await,
        Err(AppError::Job(JobError::EmptyDescription))
    ));
    assert!(matches!(
        service
            .create_job(
                tenant,
                NewJob {
                    value: -100,
                    ..new_job("Acme", "2024-03-01", "Refund")
                },
            )
            .await,
        Err(AppError::Job(JobError::NegativeValue(-100)))
    ));

    assert!(matches!(
        service.get_job(tenant, "0001").await,
        Err(AppError::JobNotFound(_))
    ));

    // Another tenant's jobs are invisible
    service
        .create_job(tenant, new_job("Acme", "2024-03-01", "Printer setup"))
        .await?;
    assert!(matches!(
        service.get_job(new_tenant(), "0001").await,
        Err(AppError::JobNotFound(_))
    ));

    Ok(())
}
