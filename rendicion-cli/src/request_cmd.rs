use anyhow::{Context, Result};
use clap::Subcommand;
use rendicion_core::{
    DraftStore, ExpenseRequest, KnownOrganization, Organization, ReportSession, RequestForm,
    RequestStep,
};

use crate::config::Config;
use crate::prompt::{ask, confirm, parse_amount, parse_date, Answer};
use crate::state::{self, FileDraftStore};

#[derive(Subcommand, Debug)]
pub enum RequestCommand {
    /// Create a request with the step-by-step form (resumes a saved draft)
    New {
        /// Discard any saved draft and start empty
        #[arg(long, default_value_t = false)]
        fresh: bool,
    },

    /// List requests, pending first
    List {
        #[arg(long, default_value_t = false)]
        pending: bool,

        #[arg(long, default_value_t = false)]
        completed: bool,
    },

    /// Show one request in full
    Show { id: String },

    /// Delete a pending request
    Delete {
        id: String,

        /// Do not ask for confirmation
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

pub fn run(cmd: RequestCommand, cfg: &Config) -> Result<()> {
    match cmd {
        RequestCommand::New { fresh } => new_request(cfg, fresh),
        RequestCommand::List { pending, completed } => list(cfg, pending, completed),
        RequestCommand::Show { id } => show(cfg, &id),
        RequestCommand::Delete { id, yes } => delete(&id, yes),
    }
}

enum Flow {
    Next,
    Back,
    Quit,
}

fn new_request(cfg: &Config, fresh: bool) -> Result<()> {
    let mut drafts = FileDraftStore::<RequestForm>::for_request_form()?;
    if fresh {
        drafts.clear()?;
    }

    let mut form = match drafts.load()? {
        Some(saved) => {
            println!(
                "Resuming draft saved {}",
                saved.saved_at.format("%Y-%m-%d %H:%M UTC")
            );
            saved.draft
        }
        None => RequestForm::default(),
    };
    if form.date.is_none() {
        form.date = Some(cfg.today()?);
    }

    println!("New expense request. Enter '<' to go back, 'q' to save and quit.\n");

    let mut step = RequestStep::PersonalData;
    loop {
        println!("\n== Step {}/{}: {} ==", step.number(), RequestStep::COUNT, title(step));

        let flow = match step {
            RequestStep::PersonalData => personal_data(&mut form)?,
            RequestStep::Purpose => purpose(&mut form)?,
            RequestStep::Amount => amount(&mut form, cfg)?,
            RequestStep::Review => {
                print_form(&form, cfg);
                if confirm("Submit this request?")? {
                    Flow::Next
                } else {
                    Flow::Back
                }
            }
        };

        match flow {
            Flow::Quit => {
                drafts.save(&form)?;
                println!("Draft saved to {}", drafts.path().display());
                return Ok(());
            }
            Flow::Back => {
                drafts.save(&form)?;
                step = step.previous();
                continue;
            }
            Flow::Next => {}
        }

        if let Err(e) = form.validate_step(step, &cfg.validation) {
            println!("✗ {e}");
            continue;
        }
        drafts.save(&form)?;

        if step == RequestStep::Review {
            break;
        }
        step = step.next();
    }

    let validated = match form.validate(&cfg.validation) {
        Ok(v) => v,
        Err(e) => {
            println!("✗ {e}");
            println!("Draft kept; run `rendicion request new` to fix it.");
            return Ok(());
        }
    };

    let mut ledger = state::load_ledger()?;
    let id = state::new_request_id();
    let created = ledger.create(validated, id)?.clone();
    state::save_ledger(&ledger)?;
    drafts.clear()?;

    println!("\n✓ Request {} created.", created.id);
    println!(
        "  Report due by {} ({} days). Start it with: rendicion report {}",
        created.due_date(cfg.report.due_days),
        cfg.report.due_days,
        created.id
    );
    Ok(())
}

fn title(step: RequestStep) -> &'static str {
    match step {
        RequestStep::PersonalData => "Personal data",
        RequestStep::Purpose => "Purpose",
        RequestStep::Amount => "Amount",
        RequestStep::Review => "Review",
    }
}

/// Ask for one text field; `Some(flow)` when the user wants to leave the step.
fn text_field(label: &str, value: &mut String) -> Result<Option<Flow>> {
    match ask(label, value)? {
        Answer::Text(t) => {
            *value = t;
            Ok(None)
        }
        Answer::Back => Ok(Some(Flow::Back)),
        Answer::Quit => Ok(Some(Flow::Quit)),
    }
}

fn personal_data(form: &mut RequestForm) -> Result<Flow> {
    if let Some(f) = text_field("Applicant (first and last name)", &mut form.applicant_name)? {
        return Ok(f);
    }
    if let Some(f) = text_field("Pay to (first and last name)", &mut form.payee_name)? {
        return Ok(f);
    }

    loop {
        let mut raw = form.date.map(|d| d.to_string()).unwrap_or_default();
        if let Some(f) = text_field("Date (YYYY-MM-DD)", &mut raw)? {
            return Ok(f);
        }
        match parse_date(&raw) {
            Some(d) => {
                form.date = Some(d);
                return Ok(Flow::Next);
            }
            None => println!("✗ not a date: {raw}"),
        }
    }
}

fn purpose(form: &mut RequestForm) -> Result<Flow> {
    if let Some(f) = text_field("Purpose of the expense", &mut form.reason)? {
        return Ok(f);
    }

    println!("Organization:");
    for (i, org) in KnownOrganization::ALL.iter().enumerate() {
        println!("  {}. {}", i + 1, org.name());
    }
    println!("  {}. Other", KnownOrganization::ALL.len() + 1);

    let mut raw = form
        .organization
        .as_ref()
        .map(|o| o.name().to_string())
        .unwrap_or_default();
    if let Some(f) = text_field("Organization (number or name)", &mut raw)? {
        return Ok(f);
    }

    let org = match raw.trim().parse::<usize>() {
        Ok(n) if (1..=KnownOrganization::ALL.len()).contains(&n) => {
            Organization::Known(KnownOrganization::ALL[n - 1])
        }
        Ok(n) if n == KnownOrganization::ALL.len() + 1 => {
            let mut other = match &form.organization {
                Some(Organization::Other(s)) => s.clone(),
                _ => String::new(),
            };
            if let Some(f) = text_field("Which organization?", &mut other)? {
                return Ok(f);
            }
            Organization::Other(other)
        }
        _ => Organization::from(raw),
    };
    form.organization = Some(org);
    Ok(Flow::Next)
}

fn amount(form: &mut RequestForm, cfg: &Config) -> Result<Flow> {
    loop {
        let mut raw = form.amount.map(|a| a.to_string()).unwrap_or_default();
        if let Some(f) = text_field(&format!("Amount ({})", cfg.report.currency), &mut raw)? {
            return Ok(f);
        }
        match parse_amount(&raw) {
            Some(a) => {
                form.amount = Some(a);
                return Ok(Flow::Next);
            }
            None => println!("✗ not an amount: {raw}"),
        }
    }
}

fn print_form(form: &RequestForm, cfg: &Config) {
    let or_dash = |s: &str| if s.trim().is_empty() { "-".to_string() } else { s.to_string() };
    println!("Applicant:    {}", or_dash(&form.applicant_name));
    println!("Pay to:       {}", or_dash(&form.payee_name));
    println!(
        "Date:         {}",
        form.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("Purpose:      {}", or_dash(&form.reason));
    println!(
        "Organization: {}",
        form.organization
            .as_ref()
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".into())
    );
    println!(
        "Amount:       {}",
        form.amount
            .map(|a| cfg.money(a))
            .unwrap_or_else(|| "-".into())
    );
}

fn list(cfg: &Config, only_pending: bool, only_completed: bool) -> Result<()> {
    let ledger = state::load_ledger()?;
    if ledger.is_empty() {
        println!("No requests yet. Create one with: rendicion request new");
        return Ok(());
    }

    let summary = ledger.summary(cfg.today()?, cfg.report.due_days);
    println!(
        "{} pending ({}) | reported this month: {}",
        summary.pending_count,
        cfg.money(summary.pending_total),
        cfg.money(summary.reported_this_month)
    );
    if let Some((id, due)) = &summary.most_urgent {
        println!("Most urgent: {id}, report due {due}");
    }
    println!();

    let show_pending = only_pending || !only_completed;
    let show_completed = only_completed || !only_pending;

    if show_pending {
        println!("## Pending\n");
        for r in ledger.pending() {
            print_row(r, cfg);
        }
        println!();
    }
    if show_completed {
        println!("## Completed\n");
        for r in ledger.completed() {
            print_row(r, cfg);
        }
    }
    Ok(())
}

fn print_row(r: &ExpenseRequest, cfg: &Config) {
    println!(
        "- {} | {} | {} | {} | due {}",
        r.id,
        r.date,
        r.organization,
        cfg.money(r.amount),
        r.due_date(cfg.report.due_days)
    );
}

fn show(cfg: &Config, id: &str) -> Result<()> {
    let ledger = state::load_ledger()?;
    let r = ledger
        .find(id)
        .with_context(|| format!("no request with id {id}"))?;

    println!("Request {} ({})", r.id, r.status.label());
    println!("Applicant:    {}", r.applicant_name);
    println!("Pay to:       {}", r.payee_name);
    println!("Date:         {}", r.date);
    println!("Due:          {}", r.due_date(cfg.report.due_days));
    println!("Organization: {}", r.organization);
    println!("Purpose:      {}", r.reason);
    println!("Amount:       {}", cfg.money(r.amount));

    if r.is_pending() {
        let drafts = FileDraftStore::<ReportSession>::for_report(&r.id)?;
        if let Some(saved) = drafts.load()? {
            println!(
                "\nReport draft: {} item(s), saved {}",
                saved.draft.store().len(),
                saved.saved_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        return Ok(());
    }

    println!("\nLeader:       {}", r.leader_name.as_deref().unwrap_or("-"));
    match (r.incident_occurred, r.incident_details.as_deref()) {
        (Some(true), Some(details)) => println!("Incident:     {details}"),
        _ => println!("Incident:     none"),
    }
    if let Some(exp) = &r.spiritual_experience {
        println!("Experience:   {} at {}", exp.date, exp.location);
        println!("  Participants: {}", exp.participants.join(", "));
        println!("  Context:      {}", exp.context);
        println!("  Learning:     {}", exp.learning);
        if !exp.photos.is_empty() {
            println!("  Photos:       {}", exp.photos.join(", "));
        }
    }
    if !r.receipt_images.is_empty() {
        println!("Receipts:");
        for img in &r.receipt_images {
            println!("  - {img}");
        }
    }
    Ok(())
}

fn delete(id: &str, yes: bool) -> Result<()> {
    let mut ledger = state::load_ledger()?;
    if !yes && !confirm(&format!("Delete request {id}?"))? {
        println!("Nothing deleted.");
        return Ok(());
    }

    let removed = ledger.delete(id)?;
    state::save_ledger(&ledger)?;
    FileDraftStore::<ReportSession>::for_report(&removed.id)?.clear()?;
    println!("Deleted request {} ({})", removed.id, removed.organization);
    Ok(())
}
