use crate::infra::{
    DemoAddressBook, DemoLeads, DemoPayments, DemoQuoteDesk, InMemorySessionRepository,
};
use chrono::{Datelike, Local, NaiveDate, Weekday};
use clap::Args;
use movequote::error::AppError;
use movequote::workflows::wizard::{
    FunnelReport, HeavyItem, HomeType, MoveAction, MoveSide, MoveTime, QuoteFetchState,
    QuoteWizardService, SessionId, WizardGateways, WizardServiceError, WizardSession,
    WizardSettings,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Move date (YYYY-MM-DD). Defaults to two weeks from today; Sundays have no crews.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) move_date: Option<NaiveDate>,
    /// Vendor id to book. Defaults to the cheapest quote.
    #[arg(long)]
    pub(crate) vendor: Option<String>,
    /// Deposit charged at checkout, in cents
    #[arg(long, default_value_t = 5_000)]
    pub(crate) deposit_cents: u32,
    /// Stop at the review step without paying
    #[arg(long)]
    pub(crate) skip_payment: bool,
}

type DemoService = QuoteWizardService<InMemorySessionRepository>;

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        move_date,
        vendor,
        deposit_cents,
        skip_payment,
    } = args;

    let move_date = move_date.unwrap_or_else(default_move_date);
    let leads = Arc::new(DemoLeads::default());
    let gateways = WizardGateways {
        suggestions: Arc::new(DemoAddressBook),
        quotes: Arc::new(DemoQuoteDesk),
        payments: Arc::new(DemoPayments::default()),
        leads: leads.clone(),
    };
    let service = QuoteWizardService::new(
        Arc::new(InMemorySessionRepository::default()),
        gateways,
        WizardSettings {
            deposit_cents,
            ..WizardSettings::default()
        },
    );

    println!("Moving quote wizard demo");
    let session = service.start()?;
    let id = session.id.clone();
    render_step(&service, &session);

    let origin = first_suggestion(&service, "123 Main").await?;
    let destination = first_suggestion(&service, "456 Oak").await?;
    println!("- Address autocomplete picked '{origin}' and '{destination}'");

    service.apply(
        &id,
        &[
            MoveAction::SetOrigin(origin),
            MoveAction::SetDestination(destination),
            MoveAction::SetMoveDate(Some(move_date)),
            MoveAction::SetMoveTime(Some(MoveTime::Morning)),
        ],
    )?;
    advance(&service, &id)?;

    service.apply(
        &id,
        &[
            MoveAction::SetHomeType {
                side: MoveSide::Origin,
                home_type: HomeType::House,
            },
            MoveAction::SetRooms {
                side: MoveSide::Origin,
                rooms: Some(3),
            },
            MoveAction::SetStairs {
                side: MoveSide::Origin,
                stairs: Some(1),
            },
            MoveAction::SetHeavyItem {
                side: MoveSide::Origin,
                item: HeavyItem::Piano,
                included: true,
            },
        ],
    )?;
    advance(&service, &id)?;

    service.apply(
        &id,
        &[
            MoveAction::SetHomeType {
                side: MoveSide::Destination,
                home_type: HomeType::Apartment,
            },
            MoveAction::SetFloor {
                side: MoveSide::Destination,
                floor: Some(3),
            },
            MoveAction::SetElevator {
                side: MoveSide::Destination,
                enabled: true,
            },
        ],
    )?;
    advance(&service, &id)?;

    let session = service.fetch_quotes(&id).await?;
    match &session.quotes {
        QuoteFetchState::Loaded { quotes } => {
            println!("  Quotes for {move_date}:");
            for quote in quotes {
                println!(
                    "    - {} ({}): ${:.2} | crew of {} | {:.1} h",
                    quote.vendor_name,
                    quote.vendor_id,
                    quote.total_price,
                    quote.crew_size,
                    quote.estimated_hours.unwrap_or_default()
                );
            }
        }
        other => {
            println!(
                "  {}",
                other.message().unwrap_or("No quotes were requested.")
            );
            render_step(&service, &session);
            return Ok(());
        }
    }

    let vendor_id = match vendor {
        Some(vendor_id) => vendor_id,
        None => session
            .quotes
            .quotes()
            .iter()
            .min_by(|a, b| a.total_price.total_cmp(&b.total_price))
            .map(|quote| quote.vendor_id.clone())
            .unwrap_or_default(),
    };
    match service.select_quote(&id, &vendor_id) {
        Ok(session) => render_step(&service, &session),
        Err(err @ WizardServiceError::QuoteNotOffered(_)) => {
            println!("  Selection rejected: {err}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }
    advance(&service, &id)?;

    service.apply(
        &id,
        &[
            MoveAction::SetFirstName("Jordan".to_string()),
            MoveAction::SetLastName("Avery".to_string()),
            MoveAction::SetEmail("jordan.avery@example.com".to_string()),
            MoveAction::SetPhone("512-555-0188".to_string()),
        ],
    )?;
    advance(&service, &id)?;

    let session = service.start_checkout(&id).await?;
    let Some(checkout) = session.checkout.clone() else {
        println!(
            "  Checkout failed: {}",
            session.payment_error.as_deref().unwrap_or("unknown error")
        );
        return Ok(());
    };
    println!("  Checkout ready at {}", checkout.checkout_url);

    if !skip_payment {
        let return_url = format!(
            "https://movers.demo.invalid/?session_id={}#/step7",
            checkout.checkout_session_id
        );
        let session = service.resume(&id, &return_url).await?;
        render_step(&service, &session);
        println!(
            "  Booking {} confirmed | lead {}",
            session.details.payment.booking_id.as_deref().unwrap_or("-"),
            session.details.payment.lead_id.as_deref().unwrap_or("-")
        );
        println!("  Leads stored: {}", leads.leads().len());
    }

    render_report(&service.report()?);
    Ok(())
}

fn default_move_date() -> NaiveDate {
    let date = Local::now().date_naive() + chrono::Duration::days(14);
    if date.weekday() == Weekday::Sun {
        date + chrono::Duration::days(1)
    } else {
        date
    }
}

async fn first_suggestion(service: &DemoService, query: &str) -> Result<String, AppError> {
    let suggestions = service.suggest_addresses(query).await?;
    Ok(suggestions
        .into_iter()
        .next()
        .unwrap_or_else(|| query.to_string()))
}

fn advance(service: &DemoService, id: &SessionId) -> Result<(), AppError> {
    let session = service.next(id)?;
    render_step(service, &session);
    Ok(())
}

fn render_step(service: &DemoService, session: &WizardSession) {
    let snapshot = service.snapshot(session);
    let progress: Vec<String> = snapshot
        .footer
        .steps
        .iter()
        .map(|entry| {
            if entry.current {
                format!("[{}]", entry.label)
            } else {
                entry.label.to_string()
            }
        })
        .collect();

    println!(
        "\nStep {} of {}: {} ({})",
        snapshot.step_index + 1,
        progress.len(),
        snapshot.step.label(),
        snapshot.fragment
    );
    println!("  Progress: {}", progress.join(" > "));
    match &snapshot.footer.continue_label {
        Some(label) => println!(
            "  Footer: {}{}",
            label,
            if snapshot.footer.continue_enabled {
                ""
            } else {
                " (disabled)"
            }
        ),
        None => println!("  Footer: no further steps"),
    }
}

fn render_report(report: &FunnelReport) {
    println!("\nFunnel report");
    println!(
        "- {} sessions | {} bookings | {:.0}% conversion | {} deposits",
        report.total_sessions,
        report.bookings,
        report.conversion_rate() * 100.0,
        report.deposits_collected
    );
    for entry in report.steps.iter().filter(|entry| entry.sessions > 0) {
        println!("  - {}: {} session(s)", entry.step_label, entry.sessions);
    }
    for vendor in &report.vendors {
        println!(
            "  - {} booked {} time(s), ${:.2} total",
            vendor.vendor_name, vendor.bookings, vendor.booked_value
        );
    }
}
