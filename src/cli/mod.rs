use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

use crate::application::{
    BillingService, ClientUpdate, NewClient, NewInvoice, NewJob, NewOccasionalClient,
};
use crate::config::{FileConfig, Settings, load_config};
use crate::domain::{
    AdjustmentPeriod, AppliedAdjustment, Cents, ClientStatus, InvoiceItem, JobStatus, JobType,
    MovementKind, TenantId, format_cents, parse_cents, parse_rate,
};
use crate::storage::Repository;

type Service = BillingService<Repository>;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Retainer - billing for small service businesses
#[derive(Parser)]
#[command(name = "retainer")]
#[command(
    about = "Subscription price indexation, invoicing and client accounts for small service businesses"
)]
#[command(version)]
pub struct Cli {
    /// Database file path (defaults to retainer.db)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Tenant (business) id every command operates on
    #[arg(short, long, global = true)]
    pub tenant: Option<Uuid>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Subscription client management
    #[command(subcommand)]
    Client(ClientCommands),

    /// One-off client management
    #[command(subcommand)]
    Occasional(OccasionalCommands),

    /// Subscription price indexation
    #[command(subcommand)]
    Adjust(AdjustCommands),

    /// Invoice management
    #[command(subcommand)]
    Invoice(InvoiceCommands),

    /// Job tracking
    #[command(subcommand)]
    Job(JobCommands),

    /// Show a client's account statement with running balances
    Statement {
        /// Client name
        client: String,

        /// Also write the statement to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show the current balance of every client
    Balances,

    /// Record a manual credit or debit note on a client's account
    Note {
        /// Client name
        client: String,

        /// Amount (e.g., "150.00")
        amount: String,

        /// Note kind: credit or debit
        #[arg(long)]
        kind: String,

        /// Description of the note
        #[arg(long)]
        description: String,

        /// Date of the note (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Export data (CSV or JSON)
    Export {
        /// Export type: statement, adjustments, invoices, jobs, full
        export_type: String,

        /// Client name (required for statement, optional for adjustments)
        #[arg(long)]
        client: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a subscription client
    Add {
        /// Client name
        name: String,

        /// Current subscription value (e.g., "15000.00")
        #[arg(long)]
        value: String,

        /// Indexation period: quarterly, four-monthly, semiannual
        #[arg(long)]
        period: Option<String>,

        /// Date the current value took effect (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        since: Option<String>,

        /// Hours included in the subscription
        #[arg(long, default_value_t = 0.0)]
        hours: f64,

        /// Tax identification number
        #[arg(long)]
        tax_id: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Change a client's details, price or indexation schedule
    Edit {
        /// Client name
        name: String,

        /// New client name
        #[arg(long)]
        rename: Option<String>,

        /// New subscription value (e.g., "15000.00")
        #[arg(long)]
        value: Option<String>,

        /// Indexation period: quarterly, four-monthly, semiannual
        #[arg(long)]
        period: Option<String>,

        /// Date the current value took effect (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,

        /// Stop indexing this client
        #[arg(long, conflicts_with_all = ["period", "since"])]
        no_indexation: bool,

        /// Status: active or inactive
        #[arg(long)]
        status: Option<String>,

        /// Hours included in the subscription
        #[arg(long)]
        hours: Option<f64>,

        /// Tax identification number (empty to clear)
        #[arg(long)]
        tax_id: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List subscription clients
    List,

    /// Show client details
    Show {
        /// Client name
        name: String,
    },

    /// Record worked hours for a client
    Hours {
        /// Client name
        name: String,

        /// Hours worked
        hours: f64,
    },
}

#[derive(Subcommand)]
pub enum OccasionalCommands {
    /// Register a one-off client
    Add {
        /// Client name
        name: String,

        #[arg(long)]
        tax_id: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List one-off clients
    List,
}

#[derive(Subcommand)]
pub enum AdjustCommands {
    /// List clients due for an adjustment, with the projected new value
    Due {
        /// Reference date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Rate in percent (defaults to the month's suggested rate)
        #[arg(long)]
        rate: Option<String>,
    },

    /// Apply an adjustment to one client, or to every due client with --all
    Apply {
        /// Client name
        name: Option<String>,

        /// Adjust every client due on the effective date
        #[arg(long, conflicts_with = "name")]
        all: bool,

        /// Rate in percent (defaults to the month's suggested rate)
        #[arg(long)]
        rate: Option<String>,

        /// Effective date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Note stored with the adjustment record
        #[arg(long, conflicts_with = "all")]
        note: Option<String>,

        /// Adjust even if the client is not due yet
        #[arg(long, conflicts_with = "all")]
        force: bool,
    },

    /// Show adjustment history
    History {
        /// Client name (omit for all clients)
        client: Option<String>,
    },

    /// Show the monthly rate table used for suggestions
    Rates,
}

#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// Issue an invoice and debit it to the client's account
    Issue {
        /// Invoice number
        number: String,

        /// Client name (subscription or one-off)
        #[arg(long)]
        client: String,

        /// Line item as "description:quantity:unit_price" (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,

        /// Issue date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Billing period label (e.g., "March 2024")
        #[arg(long)]
        period: Option<String>,

        /// VAT rate in percent (defaults to the configured rate)
        #[arg(long)]
        tax: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Replace an unpaid invoice's items
    Edit {
        /// Invoice number
        number: String,

        /// Line item as "description:quantity:unit_price" (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,

        /// VAT rate in percent (keeps the current rate if omitted)
        #[arg(long)]
        tax: Option<String>,

        /// Date of the revision note, if the total changes (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List invoices
    List,

    /// Show invoice details
    Show {
        /// Invoice number
        number: String,
    },

    /// Mark an invoice as sent
    Send {
        /// Invoice number
        number: String,
    },

    /// Mark an invoice as paid and credit the client's account
    Pay {
        /// Invoice number
        number: String,

        /// Payment date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Mark an invoice as expired
    Expire {
        /// Invoice number
        number: String,
    },
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// Record a new job for a client
    Add {
        /// Client name (subscription or one-off)
        client: String,

        /// What was requested
        #[arg(long)]
        description: String,

        /// Job type: subscription, one-off, urgent, remote, on-site
        #[arg(long = "type", default_value = "remote")]
        job_type: String,

        /// Agreed price (e.g., "250.00")
        #[arg(long, default_value = "0")]
        value: String,

        /// Request date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List jobs
    List {
        /// Only jobs in this status
        #[arg(long)]
        status: Option<String>,
    },

    /// Show job details
    Show {
        /// Job number
        number: String,
    },

    /// Move a job forward: in-progress, completed, collected
    Status {
        /// Job number
        number: String,

        /// New status
        status: String,

        /// Completion date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Log hours worked on a job
    Hours {
        /// Job number
        number: String,

        /// Hours worked
        hours: f64,
    },

    /// Link a completed job to the invoice that bills it
    Invoice {
        /// Job number
        number: String,

        /// Invoice number
        invoice: String,
    },
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => load_config(path)?,
            None => FileConfig::default(),
        };
        Ok(Settings::resolve(file, self.database.clone(), self.tenant))
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.settings()?;

        if matches!(self.command, Commands::Init) {
            BillingService::init(&settings.database, settings.rates.clone()).await?;
            println!("Database initialized: {}", settings.database);
            match settings.tenant {
                Some(tenant) => println!("Tenant: {}", tenant),
                None => {
                    let tenant = Uuid::new_v4();
                    println!("New tenant id: {}", tenant);
                    println!(
                        "Pass it with --tenant or set `tenant = \"{}\"` in your config file.",
                        tenant
                    );
                }
            }
            return Ok(());
        }

        let tenant = settings.tenant()?;
        let service = BillingService::connect(&settings.database, settings.rates.clone()).await?;

        match self.command {
            Commands::Init => {}

            Commands::Client(cmd) => run_client_command(&service, tenant, cmd).await?,

            Commands::Occasional(cmd) => run_occasional_command(&service, tenant, cmd).await?,

            Commands::Adjust(cmd) => run_adjust_command(&service, tenant, cmd).await?,

            Commands::Invoice(cmd) => {
                run_invoice_command(&service, tenant, settings.tax_rate, cmd).await?
            }

            Commands::Job(cmd) => run_job_command(&service, tenant, cmd).await?,

            Commands::Statement { client, export } => {
                run_statement_command(&service, tenant, &client, export).await?
            }

            Commands::Balances => run_balances_command(&service, tenant).await?,

            Commands::Note {
                client,
                amount,
                kind,
                description,
                date,
            } => {
                let kind = match MovementKind::from_str(&kind) {
                    Some(k @ (MovementKind::CreditNote | MovementKind::DebitNote)) => k,
                    _ => anyhow::bail!("Invalid note kind '{}'. Valid kinds: credit, debit", kind),
                };
                let amount = parse_amount(&amount)?;
                let date = parse_date_or_today(date.as_deref())?;

                let movement = service
                    .record_note(tenant, &client, kind, amount, date, &description)
                    .await?;
                println!(
                    "Recorded {} of {} for {} on {}",
                    movement.kind,
                    format_cents(amount),
                    client,
                    movement.date
                );
            }

            Commands::Export {
                export_type,
                client,
                output,
            } => {
                run_export_command(
                    &service,
                    tenant,
                    &export_type,
                    client.as_deref(),
                    output.as_deref(),
                )
                .await?
            }
        }

        Ok(())
    }
}

async fn run_client_command(
    service: &Service,
    tenant: TenantId,
    cmd: ClientCommands,
) -> Result<()> {
    match cmd {
        ClientCommands::Add {
            name,
            value,
            period,
            since,
            hours,
            tax_id,
            email,
            phone,
            address,
            notes,
        } => {
            let subscription_value = parse_amount(&value)?;
            let adjustment = match period {
                Some(period) => {
                    let period = parse_period(&period)?;
                    Some((period, parse_date_or_today(since.as_deref())?))
                }
                None => None,
            };

            let client = service
                .create_client(
                    tenant,
                    NewClient {
                        name,
                        subscription_value,
                        adjustment,
                        included_hours: hours,
                        tax_id,
                        email,
                        phone,
                        address,
                        notes,
                    },
                )
                .await?;

            println!(
                "Created client #{}: {} ({})",
                client.client_number,
                client.name,
                format_cents(client.subscription_value)
            );
            if let Some(next) = client.next_adjustment_date() {
                println!("  Next adjustment: {}", next);
            }
        }

        ClientCommands::Edit {
            name,
            rename,
            value,
            period,
            since,
            no_indexation,
            status,
            hours,
            tax_id,
            email,
            phone,
            address,
            notes,
        } => {
            let changes = ClientUpdate {
                name: rename,
                subscription_value: value.as_deref().map(parse_amount).transpose()?,
                adjustment_period: period.as_deref().map(parse_period).transpose()?,
                adjusted_since: since.as_deref().map(parse_date).transpose()?,
                clear_schedule: no_indexation,
                status: status.as_deref().map(parse_client_status).transpose()?,
                included_hours: hours,
                tax_id,
                email,
                phone,
                address,
                notes,
            };
            let client = service.edit_client(tenant, &name, changes).await?;

            println!(
                "Updated client #{}: {} ({}, {})",
                client.client_number,
                client.name,
                format_cents(client.subscription_value),
                client.status
            );
            match client.next_adjustment_date() {
                Some(next) => println!("  Next adjustment: {}", next),
                None => println!("  Indexation:      none"),
            }
        }

        ClientCommands::List => {
            let clients = service.list_clients(tenant).await?;
            if clients.is_empty() {
                println!("No clients found.");
            } else {
                println!(
                    "{:<6} {:<24} {:>12} {:<13} {:<12} {:<8}",
                    "NO.", "NAME", "VALUE", "PERIOD", "NEXT ADJ.", "STATUS"
                );
                println!("{}", "-".repeat(80));
                for client in clients {
                    println!(
                        "{:<6} {:<24} {:>12} {:<13} {:<12} {:<8}",
                        client.client_number,
                        truncate(&client.name, 24),
                        format_cents(client.subscription_value),
                        client
                            .adjustment_period
                            .map(|p| p.as_str())
                            .unwrap_or("-"),
                        client
                            .next_adjustment_date()
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        client.status
                    );
                }
            }
        }

        ClientCommands::Show { name } => {
            let client = service.get_client(tenant, &name).await?;
            let statement = service.statement(tenant, &name).await?;
            let adjustments = service.adjustment_history(tenant, Some(&name)).await?;

            println!("Client #{}: {}", client.client_number, client.name);
            println!("  ID:              {}", client.id);
            println!("  Status:          {}", client.status);
            if let Some(tax_id) = &client.tax_id {
                println!("  Tax ID:          {}", tax_id);
            }
            if let Some(email) = &client.email {
                println!("  Email:           {}", email);
            }
            if let Some(phone) = &client.phone {
                println!("  Phone:           {}", phone);
            }
            if let Some(address) = &client.address {
                println!("  Address:         {}", address);
            }
            println!();
            println!(
                "  Subscription:    {}",
                format_cents(client.subscription_value)
            );
            match client.adjustment_period {
                Some(period) => {
                    println!("  Indexation:      {}", period);
                    if let Some(last) = client.last_adjustment_date {
                        println!("  Last adjustment: {}", last);
                    }
                    if let Some(next) = client.next_adjustment_date() {
                        println!("  Next adjustment: {}", next);
                    }
                }
                None => println!("  Indexation:      none"),
            }
            println!("  Adjustments:     {}", adjustments.len());
            println!();
            println!(
                "  Hours:           {:.1} used of {:.1} ({:.1} remaining, {:.1} over)",
                client.consumed_hours,
                client.included_hours,
                client.remaining_hours(),
                client.overage_hours()
            );
            println!("  Balance:         {}", format_cents(statement.balance));
            if let Some(notes) = &client.notes {
                println!("  Notes:           {}", notes);
            }
        }

        ClientCommands::Hours { name, hours } => {
            let client = service.record_hours(tenant, &name, hours).await?;
            println!(
                "{}: {:.1} of {:.1} hours used",
                client.name, client.consumed_hours, client.included_hours
            );
            if client.overage_hours() > 0.0 {
                println!("  Over quota by {:.1} hours", client.overage_hours());
            }
        }
    }
    Ok(())
}

async fn run_occasional_command(
    service: &Service,
    tenant: TenantId,
    cmd: OccasionalCommands,
) -> Result<()> {
    match cmd {
        OccasionalCommands::Add {
            name,
            tax_id,
            email,
            phone,
            notes,
        } => {
            let client = service
                .create_occasional_client(
                    tenant,
                    NewOccasionalClient {
                        name,
                        tax_id,
                        email,
                        phone,
                        notes,
                    },
                )
                .await?;
            println!(
                "Created occasional client #{}: {}",
                client.client_number, client.name
            );
        }

        OccasionalCommands::List => {
            let clients = service.list_occasional_clients(tenant).await?;
            if clients.is_empty() {
                println!("No occasional clients found.");
            } else {
                println!("{:<6} {:<30} {:<30}", "NO.", "NAME", "EMAIL");
                println!("{}", "-".repeat(68));
                for client in clients {
                    println!(
                        "{:<6} {:<30} {:<30}",
                        client.client_number,
                        truncate(&client.name, 30),
                        client.email.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_adjust_command(
    service: &Service,
    tenant: TenantId,
    cmd: AdjustCommands,
) -> Result<()> {
    match cmd {
        AdjustCommands::Due { date, rate } => {
            let as_of = parse_date_or_today(date.as_deref())?;
            let rate = rate.as_deref().map(parse_rate).transpose()?;
            let previews = service.preview_adjustments(tenant, as_of, rate).await?;

            if previews.is_empty() {
                println!("No clients due for adjustment on {}.", as_of);
            } else {
                println!(
                    "{:<24} {:<12} {:>12} {:>7} {:>12} {:>10}",
                    "CLIENT", "DUE", "CURRENT", "RATE", "NEW", "INCREASE"
                );
                println!("{}", "-".repeat(82));
                let mut total_increase: Cents = 0;
                for preview in &previews {
                    total_increase += preview.increase;
                    println!(
                        "{:<24} {:<12} {:>12} {:>6}% {:>12} {:>10}",
                        truncate(&preview.client_name, 24),
                        preview
                            .next_adjustment_date
                            .map(|d| d.to_string())
                            .unwrap_or_default(),
                        format_cents(preview.current_value),
                        preview.rate,
                        format_cents(preview.new_value),
                        format_cents(preview.increase)
                    );
                }
                println!("{}", "-".repeat(82));
                println!(
                    "{} client(s) due, total monthly increase {}",
                    previews.len(),
                    format_cents(total_increase)
                );
            }
        }

        AdjustCommands::Apply {
            name,
            all,
            rate,
            date,
            note,
            force,
        } => {
            let effective_date = parse_date_or_today(date.as_deref())?;
            let rate = rate.as_deref().map(parse_rate).transpose()?;

            if all {
                let applied = service
                    .apply_due_adjustments(tenant, effective_date, rate)
                    .await?;
                if applied.is_empty() {
                    println!("No clients due for adjustment on {}.", effective_date);
                }
                for adjustment in &applied {
                    print_applied(adjustment);
                }
            } else {
                let name = name.context("Client name required (or use --all)")?;
                let applied = service
                    .apply_adjustment(tenant, &name, rate, effective_date, note, force)
                    .await?;
                print_applied(&applied);
            }
        }

        AdjustCommands::History { client } => {
            let adjustments = service
                .adjustment_history(tenant, client.as_deref())
                .await?;
            let names = service.client_names(tenant).await?;

            if adjustments.is_empty() {
                println!("No adjustments recorded.");
            } else {
                println!(
                    "{:<12} {:<24} {:>12} {:>12} {:>7}  {}",
                    "DATE", "CLIENT", "OLD", "NEW", "RATE", "NOTE"
                );
                println!("{}", "-".repeat(100));
                for adjustment in adjustments {
                    let name = names
                        .get(&adjustment.client_id)
                        .map(String::as_str)
                        .unwrap_or("?");
                    println!(
                        "{:<12} {:<24} {:>12} {:>12} {:>6}%  {}",
                        adjustment.adjustment_date,
                        truncate(name, 24),
                        format_cents(adjustment.old_value),
                        format_cents(adjustment.new_value),
                        adjustment.rate,
                        truncate(&adjustment.note, 30)
                    );
                }
            }
        }

        AdjustCommands::Rates => {
            let current_month = today().format("%B").to_string();
            println!("{:<12} {:>7}", "MONTH", "RATE");
            println!("{}", "-".repeat(20));
            for (month, rate) in MONTHS.iter().zip(service.rates().rates()) {
                let marker = if *month == current_month { " *" } else { "" };
                println!("{:<12} {:>6}%{}", month, rate, marker);
            }
        }
    }
    Ok(())
}

fn print_applied(applied: &AppliedAdjustment) {
    println!(
        "Adjusted {}: {} -> {} (+{}%)",
        applied.client.name,
        format_cents(applied.record.old_value),
        format_cents(applied.record.new_value),
        applied.record.rate
    );
    if let Some(next) = applied.client.next_adjustment_date() {
        println!("  Next adjustment: {}", next);
    }
}

async fn run_invoice_command(
    service: &Service,
    tenant: TenantId,
    default_tax_rate: Decimal,
    cmd: InvoiceCommands,
) -> Result<()> {
    match cmd {
        InvoiceCommands::Issue {
            number,
            client,
            items,
            date,
            period,
            tax,
            notes,
        } => {
            let items = items
                .iter()
                .map(|s| parse_item(s))
                .collect::<Result<Vec<_>>>()?;
            let tax_rate = match tax {
                Some(t) => parse_rate(&t)?,
                None => default_tax_rate,
            };

            let invoice = service
                .issue_invoice(
                    tenant,
                    NewInvoice {
                        client,
                        number,
                        issue_date: parse_date_or_today(date.as_deref())?,
                        period,
                        items,
                        tax_rate: Some(tax_rate),
                        notes,
                    },
                )
                .await?;
            println!(
                "Issued invoice {}: {} (subtotal {}, tax {})",
                invoice.number,
                format_cents(invoice.total),
                format_cents(invoice.subtotal),
                format_cents(invoice.tax)
            );
        }

        InvoiceCommands::Edit {
            number,
            items,
            tax,
            date,
        } => {
            let items = items
                .iter()
                .map(|s| parse_item(s))
                .collect::<Result<Vec<_>>>()?;
            let tax_rate = tax.as_deref().map(parse_rate).transpose()?;
            let revision_date = parse_date_or_today(date.as_deref())?;

            let invoice = service
                .edit_invoice(tenant, &number, items, tax_rate, revision_date)
                .await?;
            println!(
                "Updated invoice {}: total {}",
                invoice.number,
                format_cents(invoice.total)
            );
        }

        InvoiceCommands::List => {
            let invoices = service.list_invoices(tenant).await?;
            let names = service.client_names(tenant).await?;

            if invoices.is_empty() {
                println!("No invoices found.");
            } else {
                println!(
                    "{:<12} {:<12} {:<24} {:>12} {:<8}",
                    "NUMBER", "DATE", "CLIENT", "TOTAL", "STATUS"
                );
                println!("{}", "-".repeat(72));
                for invoice in &invoices {
                    let name = names
                        .get(&invoice.client.id())
                        .map(String::as_str)
                        .unwrap_or("?");
                    println!(
                        "{:<12} {:<12} {:<24} {:>12} {:<8}",
                        truncate(&invoice.number, 12),
                        invoice.issue_date,
                        truncate(name, 24),
                        format_cents(invoice.total),
                        invoice.status
                    );
                }

                let totals = service.invoice_totals(tenant).await?;
                println!("{}", "-".repeat(72));
                println!(
                    "{} invoice(s): collected {}, pending {}",
                    totals.count,
                    format_cents(totals.collected),
                    format_cents(totals.pending)
                );
            }
        }

        InvoiceCommands::Show { number } => {
            let invoice = service.get_invoice(tenant, &number).await?;
            let names = service.client_names(tenant).await?;

            println!("Invoice {}", invoice.number);
            println!(
                "  Client:   {}",
                names
                    .get(&invoice.client.id())
                    .map(String::as_str)
                    .unwrap_or("?")
            );
            println!("  Issued:   {}", invoice.issue_date);
            if let Some(period) = &invoice.period {
                println!("  Period:   {}", period);
            }
            println!("  Status:   {}", invoice.status);
            if let Some(paid) = invoice.payment_date {
                println!("  Paid on:  {}", paid);
            }
            println!();
            println!(
                "  {:<30} {:>8} {:>12} {:>12}",
                "ITEM", "QTY", "UNIT", "TOTAL"
            );
            println!("  {}", "-".repeat(65));
            for item in &invoice.items {
                println!(
                    "  {:<30} {:>8} {:>12} {:>12}",
                    truncate(&item.description, 30),
                    item.quantity,
                    format_cents(item.unit_price),
                    format_cents(item.total)
                );
            }
            println!("  {}", "-".repeat(65));
            println!("  {:<52} {:>12}", "Subtotal", format_cents(invoice.subtotal));
            println!(
                "  {:<52} {:>12}",
                format!("VAT {}%", invoice.tax_rate),
                format_cents(invoice.tax)
            );
            println!("  {:<52} {:>12}", "Total", format_cents(invoice.total));
        }

        InvoiceCommands::Send { number } => {
            let invoice = service.mark_invoice_sent(tenant, &number).await?;
            println!("Invoice {} marked as {}", invoice.number, invoice.status);
        }

        InvoiceCommands::Pay { number, date } => {
            let payment_date = parse_date_or_today(date.as_deref())?;
            let result = service
                .mark_invoice_paid(tenant, &number, payment_date)
                .await?;
            println!(
                "Invoice {} paid on {}: {} credited",
                result.invoice.number,
                payment_date,
                format_cents(result.movement.credit)
            );
        }

        InvoiceCommands::Expire { number } => {
            let invoice = service.mark_invoice_expired(tenant, &number).await?;
            println!("Invoice {} marked as {}", invoice.number, invoice.status);
        }
    }
    Ok(())
}

async fn run_statement_command(
    service: &Service,
    tenant: TenantId,
    client: &str,
    export: Option<PathBuf>,
) -> Result<()> {
    let statement = service.statement(tenant, client).await?;

    println!("Account statement: {}", client);
    if statement.movements.is_empty() {
        println!("No movements recorded.");
    } else {
        println!(
            "{:<12} {:<36} {:>12} {:>12} {:>12}",
            "DATE", "DESCRIPTION", "DEBIT", "CREDIT", "BALANCE"
        );
        println!("{}", "-".repeat(88));
        for movement in &statement.movements {
            println!(
                "{:<12} {:<36} {:>12} {:>12} {:>12}",
                movement.date,
                truncate(&movement.description, 36),
                amount_or_blank(movement.debit),
                amount_or_blank(movement.credit),
                format_cents(movement.balance)
            );
        }
        println!("{}", "-".repeat(88));
        println!(
            "{:<49} {:>12} {:>12} {:>12}",
            "TOTAL",
            format_cents(statement.total_debit),
            format_cents(statement.total_credit),
            format_cents(statement.balance)
        );
    }

    if let Some(path) = export {
        use crate::io::Exporter;

        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        let count = Exporter::new(service, tenant)
            .export_statement_csv(client, file)
            .await?;
        eprintln!("Exported {} movements to {}", count, path.display());
    }
    Ok(())
}

async fn run_balances_command(service: &Service, tenant: TenantId) -> Result<()> {
    let accounts = service.account_balances(tenant).await?;
    if accounts.is_empty() {
        println!("No clients found.");
        return Ok(());
    }

    println!("{:<30} {:<12} {:>14}", "CLIENT", "KIND", "BALANCE");
    println!("{}", "-".repeat(58));
    let mut total: Cents = 0;
    for account in &accounts {
        total += account.balance;
        let kind = match account.client {
            crate::domain::ClientRef::Regular(_) => "subscription",
            crate::domain::ClientRef::Occasional(_) => "occasional",
        };
        println!(
            "{:<30} {:<12} {:>14}",
            truncate(&account.name, 30),
            kind,
            format_cents(account.balance)
        );
    }
    println!("{}", "-".repeat(58));
    println!("{:<43} {:>14}", "TOTAL RECEIVABLE", format_cents(total));
    Ok(())
}

async fn run_export_command(
    service: &Service,
    tenant: TenantId,
    export_type: &str,
    client: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service, tenant);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "statement" => {
            let client = client.context("--client is required for a statement export")?;
            let count = exporter.export_statement_csv(client, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} movements", count);
            }
        }
        "adjustments" => {
            let count = exporter.export_adjustments_csv(client, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} adjustments", count);
            }
        }
        "invoices" => {
            let count = exporter.export_invoices_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} invoices", count);
            }
        }
        "jobs" => {
            let count = exporter.export_jobs_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} jobs", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported tenant {}: {} clients, {} occasional clients, {} invoices, \
                     {} jobs, {} movements",
                    snapshot.tenant_id,
                    snapshot.clients.len(),
                    snapshot.occasional_clients.len(),
                    snapshot.invoices.len(),
                    snapshot.jobs.len(),
                    snapshot.movements.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: statement, adjustments, invoices, jobs, \
                 full",
                export_type
            );
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn amount_or_blank(cents: Cents) -> String {
    if cents == 0 {
        String::new()
    } else {
        format_cents(cents)
    }
}

async fn run_job_command(service: &Service, tenant: TenantId, cmd: JobCommands) -> Result<()> {
    match cmd {
        JobCommands::Add {
            client,
            description,
            job_type,
            value,
            date,
            notes,
        } => {
            let job = service
                .create_job(
                    tenant,
                    NewJob {
                        client,
                        request_date: parse_date_or_today(date.as_deref())?,
                        description,
                        job_type: parse_job_type(&job_type)?,
                        value: parse_amount(&value)?,
                        notes,
                    },
                )
                .await?;
            println!(
                "Created job #{}: {} ({})",
                job.job_number,
                job.description,
                format_cents(job.value)
            );
        }

        JobCommands::List { status } => {
            let status = status.as_deref().map(parse_job_status).transpose()?;
            let jobs = service.list_jobs(tenant, status).await?;
            let names = service.client_names(tenant).await?;

            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<6} {:<12} {:<20} {:<28} {:<12} {:>6} {:>12}",
                    "NO.", "REQUESTED", "CLIENT", "DESCRIPTION", "STATUS", "HOURS", "VALUE"
                );
                println!("{}", "-".repeat(102));
                for job in jobs {
                    let client = names
                        .get(&job.client.id())
                        .map(String::as_str)
                        .unwrap_or("?");
                    println!(
                        "{:<6} {:<12} {:<20} {:<28} {:<12} {:>6.1} {:>12}",
                        job.job_number,
                        job.request_date,
                        truncate(client, 20),
                        truncate(&job.description, 28),
                        job.status.as_str(),
                        job.hours_spent,
                        format_cents(job.value)
                    );
                }
            }
        }

        JobCommands::Show { number } => {
            let job = service.get_job(tenant, &number).await?;
            let names = service.client_names(tenant).await?;

            println!("Job #{}: {}", job.job_number, job.description);
            println!(
                "  Client:     {}",
                names
                    .get(&job.client.id())
                    .map(String::as_str)
                    .unwrap_or("?")
            );
            println!("  Type:       {}", job.job_type);
            println!("  Status:     {}", job.status);
            println!("  Requested:  {}", job.request_date);
            if let Some(completed) = job.completion_date {
                println!("  Completed:  {}", completed);
            }
            println!("  Hours:      {:.1}", job.hours_spent);
            println!("  Value:      {}", format_cents(job.value));
            if let Some(notes) = &job.notes {
                println!("  Notes:      {}", notes);
            }
        }

        JobCommands::Status {
            number,
            status,
            date,
        } => {
            let status = parse_job_status(&status)?;
            let on = parse_date_or_today(date.as_deref())?;
            let job = service
                .update_job_status(tenant, &number, status, on)
                .await?;
            println!("Job #{} is now {}", job.job_number, job.status);
        }

        JobCommands::Hours { number, hours } => {
            let job = service.log_job_hours(tenant, &number, hours).await?;
            println!(
                "Job #{}: {:.1} hours logged",
                job.job_number, job.hours_spent
            );
        }

        JobCommands::Invoice { number, invoice } => {
            let job = service.invoice_job(tenant, &number, &invoice).await?;
            println!("Job #{} billed on invoice {}", job.job_number, invoice);
        }
    }
    Ok(())
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}

fn parse_date_or_today(date_str: Option<&str>) -> Result<NaiveDate> {
    date_str.map(parse_date).transpose().map(|d| d.unwrap_or_else(today))
}

fn parse_amount(amount: &str) -> Result<Cents> {
    let cents =
        parse_cents(amount).map_err(|e| anyhow::anyhow!("Invalid amount '{}': {}", amount, e))?;
    if cents < 0 {
        anyhow::bail!("Amount must not be negative: {}", amount);
    }
    Ok(cents)
}

fn parse_period(period: &str) -> Result<AdjustmentPeriod> {
    AdjustmentPeriod::from_str(period).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid period '{}'. Valid periods: quarterly, four-monthly, semiannual",
            period
        )
    })
}

fn parse_client_status(status: &str) -> Result<ClientStatus> {
    ClientStatus::from_str(status).ok_or_else(|| {
        anyhow::anyhow!("Invalid status '{}'. Valid statuses: active, inactive", status)
    })
}

fn parse_job_type(job_type: &str) -> Result<JobType> {
    JobType::from_str(job_type).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid job type '{}'. Valid types: subscription, one-off, urgent, remote, on-site",
            job_type
        )
    })
}

fn parse_job_status(status: &str) -> Result<JobStatus> {
    JobStatus::from_str(status).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid job status '{}'. Valid statuses: pending, in-progress, completed, \
             invoiced, collected",
            status
        )
    })
}

/// Parse "description:quantity:unit_price". The description may itself contain colons.
fn parse_item(raw: &str) -> Result<InvoiceItem> {
    let mut parts = raw.rsplitn(3, ':');
    let (price, quantity, description) = match (parts.next(), parts.next(), parts.next()) {
        (Some(price), Some(quantity), Some(description)) => (price, quantity, description),
        _ => anyhow::bail!(
            "Invalid item '{}'. Expected \"description:quantity:unit_price\"",
            raw
        ),
    };

    let quantity: Decimal = quantity
        .trim()
        .parse()
        .with_context(|| format!("Invalid quantity in item '{}'", raw))?;
    let unit_price = parse_amount(price)?;

    Ok(InvoiceItem::new(description.trim(), quantity, unit_price)?)
}
