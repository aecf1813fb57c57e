use std::sync::Arc;

use chrono::{TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use internship_placement::config::AppConfig;
use internship_placement::error::AppError;
use internship_placement::telemetry;
use internship_placement::workflows::placement::{
    ApplicantId, ApplicationId, ApplicationStatusView, InMemoryApplicationRepository,
    InMemoryOpportunityRepository, ManualClock, Opportunity, OpportunityId, PlacementService,
    RecordingNotifier, WaitlistEntry,
};
use serde::Serialize;
use tracing::info;

type DemoService = PlacementService<
    InMemoryApplicationRepository,
    InMemoryOpportunityRepository,
    RecordingNotifier,
>;

#[derive(Parser, Debug)]
#[command(
    name = "placement",
    about = "Walk through internship placement workflows against in-memory stores",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the placement walkthrough (default command)
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
struct DemoArgs {
    /// Emit the walkthrough as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ScenarioReport {
    title: &'static str,
    notes: Vec<String>,
    applications: Vec<ApplicationStatusView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    waitlist: Vec<WaitlistEntry>,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Demo(args) => run_demo(args),
    }
}

fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(?config.environment, "running placement walkthrough");

    let opportunities = InMemoryOpportunityRepository::with_opportunities([
        Opportunity::new(OpportunityId::from("O1"), "Backend engineering intern", 1),
        Opportunity::new(OpportunityId::from("O2"), "Data science intern", 3),
        Opportunity::new(OpportunityId::from("O3"), "Product design intern", 2),
    ]);
    let clock = ManualClock::starting_at(
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
    );
    let service = PlacementService::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(opportunities),
        Arc::new(RecordingNotifier::default()),
        config.placement.clone(),
    )
    .with_clock(Arc::new(clock.clone()));

    let step = || clock.advance(chrono::Duration::minutes(1));
    let first = accept_then_waitlist(&service, &step)?;
    let (a, b) = (
        first.applications[0].application_id.clone(),
        first.applications[1].application_id.clone(),
    );
    let reports = vec![
        first,
        withdraw_and_promote(&service, &step, &a, &b)?,
        reject_withdrawal(&service, &step)?,
        reorder_waitlist(&service, &step)?,
        duplicate_enqueue(&service, &step)?,
    ];

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        render_reports(&reports);
    }

    Ok(())
}

fn submit(
    service: &DemoService,
    applicant: &str,
    opportunity: &str,
) -> Result<ApplicationId, AppError> {
    let record = service.submit_application(
        &ApplicantId::from(applicant),
        &OpportunityId::from(opportunity),
    )?;
    Ok(record.application_id)
}

fn views(
    service: &DemoService,
    ids: &[&ApplicationId],
) -> Result<Vec<ApplicationStatusView>, AppError> {
    ids.iter()
        .map(|id| {
            service
                .get(id)
                .map(|record| ApplicationStatusView::from(&record))
                .map_err(AppError::from)
        })
        .collect()
}

fn accept_then_waitlist(
    service: &DemoService,
    step: &dyn Fn(),
) -> Result<ScenarioReport, AppError> {
    let o1 = OpportunityId::from("O1");
    let a = submit(service, "A", "O1")?;
    step();
    let b = submit(service, "B", "O1")?;
    step();

    service.decide(&a, true)?;
    let accepted = service.accept_offer(&a)?;
    let entry = service.enqueue_waitlist(&o1, &b)?;

    let notes = vec![
        format!(
            "A accepted; occupancy {} of 1, opportunity filled: {}",
            service.occupancy(&o1)?,
            accepted.opportunity_filled()
        ),
        format!(
            "B waitlisted at position {}",
            service.waitlist_position(&o1, &entry.application_id).unwrap_or(0)
        ),
    ];

    Ok(ScenarioReport {
        title: "Offer accepted, second applicant waitlisted",
        notes,
        applications: views(service, &[&a, &b])?,
        waitlist: service.waitlist(&o1),
    })
}

fn withdraw_and_promote(
    service: &DemoService,
    step: &dyn Fn(),
    a: &ApplicationId,
    b: &ApplicationId,
) -> Result<ScenarioReport, AppError> {
    let o1 = OpportunityId::from("O1");

    service.request_withdrawal(a)?;
    step();
    let outcome = service.resolve_withdrawal(a, true)?;

    let notes = vec![
        format!("A withdrawn; {} now open", o1),
        match outcome.promoted() {
            Some(record) => format!("{} promoted from the waitlist", record.applicant_id),
            None => "no applicant promoted".to_string(),
        },
        format!("O1 waitlist size now {}", service.waitlist_size(&o1)),
    ];

    Ok(ScenarioReport {
        title: "Confirmed withdrawal promotes the waitlist head",
        notes,
        applications: views(service, &[a, b])?,
        waitlist: service.waitlist(&o1),
    })
}

fn reject_withdrawal(service: &DemoService, step: &dyn Fn()) -> Result<ScenarioReport, AppError> {
    let c = submit(service, "C", "O2")?;
    step();
    let requested = service.request_withdrawal(&c)?;
    let rejected = service.resolve_withdrawal(&c, false)?;

    let notes = vec![
        format!(
            "C requested withdrawal from {}",
            requested
                .application
                .previous_status()
                .map(|status| status.label())
                .unwrap_or("unknown")
        ),
        format!("rejection restored C to {}", rejected.application.status()),
    ];

    Ok(ScenarioReport {
        title: "Rejected withdrawal restores the prior status",
        notes,
        applications: views(service, &[&c])?,
        waitlist: Vec::new(),
    })
}

fn reorder_waitlist(service: &DemoService, step: &dyn Fn()) -> Result<ScenarioReport, AppError> {
    let o2 = OpportunityId::from("O2");
    let mut ids = Vec::new();
    for applicant in ["X", "Y", "Z"] {
        let id = submit(service, applicant, "O2")?;
        service.enqueue_waitlist(&o2, &id)?;
        step();
        ids.push(id);
    }

    let reordered = service.reorder_waitlist(&o2, &ids[1], 0)?;
    let order = reordered
        .iter()
        .map(|entry| format!("{}({})", entry.application_id, entry.priority))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(ScenarioReport {
        title: "Staff moves Y to the front of the O2 waitlist",
        notes: vec![format!("order after reorder: [{order}]")],
        applications: views(service, &ids.iter().collect::<Vec<_>>())?,
        waitlist: reordered,
    })
}

fn duplicate_enqueue(service: &DemoService, step: &dyn Fn()) -> Result<ScenarioReport, AppError> {
    let o3 = OpportunityId::from("O3");
    let d = submit(service, "D", "O3")?;
    step();
    service.enqueue_waitlist(&o3, &d)?;

    let note = match service.enqueue_waitlist(&o3, &d) {
        Ok(_) => "second enqueue unexpectedly succeeded".to_string(),
        Err(err) => format!("second enqueue refused ({}): {err}", err.reason_code()),
    };

    Ok(ScenarioReport {
        title: "Duplicate waitlist entry is refused",
        notes: vec![note, format!("O3 waitlist size {}", service.waitlist_size(&o3))],
        applications: views(service, &[&d])?,
        waitlist: service.waitlist(&o3),
    })
}

fn render_reports(reports: &[ScenarioReport]) {
    println!("Internship placement walkthrough");

    for (index, report) in reports.iter().enumerate() {
        println!("\n{}. {}", index + 1, report.title);
        for note in &report.notes {
            println!("- {note}");
        }
        for view in &report.applications {
            let previous = match view.previous_status {
                Some(previous) => format!(" (was {previous})"),
                None => String::new(),
            };
            println!(
                "  {} | applicant {} | {} | {}{}",
                view.application_id, view.applicant_id, view.opportunity_id, view.status, previous
            );
        }
        if !report.waitlist.is_empty() {
            println!("  waitlist:");
            for entry in &report.waitlist {
                println!(
                    "  - #{} {} (added {})",
                    entry.priority,
                    entry.application_id,
                    entry.added_at.format("%H:%M")
                );
            }
        }
    }
}
