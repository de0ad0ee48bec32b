//! Interactive report wizard for one request.
//!
//! Every completed step is autosaved to `drafts/report-<id>.json`; the draft is
//! removed once the report is submitted and the request marked completed.

use anyhow::{Context, Result};
use rendicion_core::{
    CoreError, DraftStore, ReportFinalizer, ReportSession, ReportStep, ScanTicket,
};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::ocr::GeminiExtractor;
use crate::prompt::{confirm, parse_amount, parse_date, parse_yes_no, prompt};
use crate::scan_cmd::{print_items, print_reconciliation, print_summary, scan_paths};
use crate::state::{self, FileDraftStore};

/// What the loop should do after handling one step.
enum Next {
    Continue,
    Quit,
}

pub async fn run(id: &str, cfg: &Config) -> Result<()> {
    let mut ledger = state::load_ledger()?;
    let request = ledger
        .find(id)
        .with_context(|| format!("no request with id {id}"))?
        .clone();

    let mut drafts = FileDraftStore::<ReportSession>::for_report(id)?;
    let saved = drafts.load()?;
    let resume = match &saved {
        Some(s) => confirm(&format!(
            "Resume the report draft saved {}?",
            s.saved_at.format("%Y-%m-%d %H:%M UTC")
        ))?,
        None => false,
    };
    let mut session = match saved {
        Some(s) if resume => s.draft.resumed(),
        _ => ReportSession::new(&request, cfg.today()?)?,
    };

    let finalizer = ReportFinalizer::new(cfg.reconcile());
    println!("Enter '<' to go back, 'q' to save and quit.");

    while !session.step().is_terminal() {
        println!("\n[{:>3}%] {}", session.step().progress(), heading(session.step()));

        let next = match session.step() {
            ReportStep::Signature => {
                let line = prompt("Signature (your full name or a path to a signature image)")?;
                match line.as_str() {
                    "q" | "Q" => Next::Quit,
                    "<" => {
                        back(&mut session);
                        Next::Continue
                    }
                    signature => match session.submit(&request, signature, &finalizer) {
                        Ok(update) => {
                            let r = update.reconciliation;
                            ledger.complete(update)?;
                            state::save_ledger(&ledger)?;
                            drafts.clear()?;
                            info!(id, "report submitted");
                            println!("\n✓ Report submitted. Request {id} is now completed.\n");
                            print_reconciliation(&r, cfg);
                            return Ok(());
                        }
                        Err(e) => handle::<()>(Err(e)),
                    },
                }
            }
            _ => step(&mut session, cfg).await?,
        };

        if let Next::Quit = next {
            drafts.save(&session)?;
            println!("Draft saved to {}", drafts.path().display());
            return Ok(());
        }
        drafts.save(&session)?;
    }

    Ok(())
}

fn heading(step: ReportStep) -> &'static str {
    use ReportStep::*;
    match step {
        Welcome => "Welcome",
        LeaderName => "Leader",
        ExpenseHub => "Expenses",
        AddMethod => "Add an expense",
        AddManualDesc => "Manual expense: description",
        AddManualAmount => "Manual expense: amount",
        AddManualReceiptNumber => "Manual expense: receipt number",
        Scanning => "Scan receipts",
        IncidentCheck => "Incidents",
        IncidentDetails => "Incident details",
        ExperienceDate => "Spiritual experience: date",
        ExperienceParticipants => "Spiritual experience: participants",
        ExperienceLocation => "Spiritual experience: location",
        ExperienceContext => "Spiritual experience: context",
        ExperienceLearning => "Spiritual experience: learning",
        ExperiencePhotos => "Spiritual experience: photos",
        Signature => "Signature",
        Submitted => "Submitted",
    }
}

fn back(session: &mut ReportSession) {
    if let Err(e) = session.previous() {
        println!("✗ {e}");
    }
}

/// Print a recoverable error and stay on the step.
fn handle<T>(res: rendicion_core::Result<T>) -> Next {
    if let Err(e) = res {
        println!("✗ {e}");
    }
    Next::Continue
}

async fn step(session: &mut ReportSession, cfg: &Config) -> Result<Next> {
    use ReportStep::*;

    let line = match session.step() {
        Welcome => {
            println!("Report for request {}.", session.request_id());
            prompt("Press Enter to start")?
        }
        ExpenseHub => {
            print_hub(session, cfg);
            prompt("[a]dd, [r]emove <n>, [c]ontinue")?
        }
        AddMethod => prompt("[m]anual or [s]can receipts")?,
        IncidentCheck => prompt("Was there any incident during the activity? [s/n]")?,
        ExperienceParticipants => {
            list("Participants", &session.experience().participants);
            prompt("Add a participant (blank to continue, -n to remove)")?
        }
        ExperiencePhotos => {
            list("Photos", &session.experience().photos);
            prompt("Add a photo path (blank to continue, -n to remove)")?
        }
        LeaderName => prompt("Leader's first and last name")?,
        AddManualDesc => prompt("Description")?,
        AddManualAmount => prompt(&format!("Amount ({})", cfg.report.currency))?,
        AddManualReceiptNumber => prompt("Receipt number (optional)")?,
        IncidentDetails => prompt("Describe what happened")?,
        ExperienceDate => prompt(&format!("Date [{}]", session.experience().date))?,
        ExperienceLocation => prompt("Where did it take place?")?,
        ExperienceContext => prompt("What was the context?")?,
        ExperienceLearning => prompt("What did you learn?")?,
        Scanning => {
            // only reachable from a stale snapshot
            return Ok(handle(session.close_scan()));
        }
        Signature | Submitted => return Ok(Next::Continue),
    };

    match line.as_str() {
        "q" | "Q" => return Ok(Next::Quit),
        "<" => {
            back(session);
            return Ok(Next::Continue);
        }
        _ => {}
    }

    let next = match session.step() {
        Welcome => handle(session.begin()),
        LeaderName => handle(session.submit_leader_name(&line)),
        ExpenseHub => hub_command(session, &line),
        AddMethod => match line.to_lowercase().as_str() {
            "m" => handle(session.choose_manual()),
            "s" => match session.begin_scan() {
                Ok(ticket) => scan(session, ticket, cfg).await?,
                Err(e) => handle::<()>(Err(e)),
            },
            _ => {
                println!("✗ choose m or s");
                Next::Continue
            }
        },
        AddManualDesc => handle(session.submit_manual_description(&line)),
        AddManualAmount => match parse_amount(&line) {
            Some(a) => handle(session.submit_manual_amount(a)),
            None => {
                println!("✗ not an amount: {line}");
                Next::Continue
            }
        },
        AddManualReceiptNumber => match session.submit_manual_receipt_number(Some(&line)) {
            Ok(item) => {
                println!("✓ added {} ({})", item.description, cfg.money(item.amount));
                Next::Continue
            }
            Err(e) => handle::<()>(Err(e)),
        },
        IncidentCheck => match parse_yes_no(&line) {
            Some(occurred) => handle(session.answer_incident(occurred)),
            None => {
                println!("✗ answer s or n");
                Next::Continue
            }
        },
        IncidentDetails => handle(session.submit_incident_details(&line)),
        ExperienceDate => {
            let date = if line.is_empty() {
                Some(session.experience().date)
            } else {
                parse_date(&line)
            };
            match date {
                Some(d) => handle(session.submit_experience_date(d)),
                None => {
                    println!("✗ not a date: {line}");
                    Next::Continue
                }
            }
        }
        ExperienceParticipants => list_command(
            &line,
            |s| s.submit_participants(),
            |s, v| s.add_participant(v),
            |s, i| s.remove_participant(i),
            session,
        ),
        ExperienceLocation => handle(session.submit_location(&line)),
        ExperienceContext => handle(session.submit_context(&line)),
        ExperienceLearning => handle(session.submit_learning(&line)),
        ExperiencePhotos => list_command(
            &line,
            |s| s.submit_photos(),
            |s, v| s.add_photo(v),
            |s, i| s.remove_photo(i),
            session,
        ),
        Scanning | Signature | Submitted => Next::Continue,
    };
    Ok(next)
}

fn print_hub(session: &ReportSession, cfg: &Config) {
    let groups = session.store().grouped_view();
    if groups.is_empty() {
        println!("No expenses yet.");
    }
    for (i, g) in groups.iter().enumerate() {
        let label = if g.is_scanned() {
            format!(
                "{} {}",
                g.vendor().unwrap_or("Receipt"),
                g.receipt_number().unwrap_or("")
            )
        } else {
            "Manual".to_string()
        };
        println!("{}. {} ({})", i + 1, label.trim(), cfg.money(g.total()));
        let items: Vec<_> = g.items.iter().map(|it| (*it).clone()).collect();
        print_items(&items, cfg);
    }
    println!();
    print_reconciliation(&session.reconciliation(&cfg.reconcile()), cfg);
}

fn hub_command(session: &mut ReportSession, line: &str) -> Next {
    let mut parts = line.split_whitespace();
    match parts.next().map(str::to_lowercase).as_deref() {
        Some("a") => handle(session.add_expense()),
        Some("c") => handle(session.finish_expenses()),
        Some("r") => {
            let key = parts
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .and_then(|n| session.store().grouped_view().get(n).map(|g| g.key.to_string()));
            match key {
                Some(key) => match session.remove_group(&key) {
                    Ok(n) => {
                        println!("✓ removed {n} item(s)");
                        Next::Continue
                    }
                    Err(e) => handle::<()>(Err(e)),
                },
                None => {
                    println!("✗ usage: r <group number>");
                    Next::Continue
                }
            }
        }
        _ => {
            println!("✗ unknown command");
            Next::Continue
        }
    }
}

fn list(title: &str, values: &[String]) {
    if values.is_empty() {
        println!("{title}: none");
        return;
    }
    println!("{title}:");
    for (i, v) in values.iter().enumerate() {
        println!("  {}. {v}", i + 1);
    }
}

/// Blank finishes the list, `-n` removes entry n, anything else is added.
fn list_command(
    line: &str,
    finish: impl FnOnce(&mut ReportSession) -> rendicion_core::Result<ReportStep>,
    add: impl FnOnce(&mut ReportSession, &str) -> rendicion_core::Result<()>,
    remove: impl FnOnce(&mut ReportSession, usize) -> Option<String>,
    session: &mut ReportSession,
) -> Next {
    if line.is_empty() {
        return handle(finish(session));
    }
    if let Some(n) = line.strip_prefix('-').and_then(|n| n.parse::<usize>().ok()) {
        match n.checked_sub(1).and_then(|i| remove(session, i)) {
            Some(v) => println!("✓ removed {v}"),
            None => println!("✗ no entry {n}"),
        }
        return Next::Continue;
    }
    handle(add(session, line))
}

/// Run one scan batch under `ticket`, then let the user confirm or discard it.
async fn scan(session: &mut ReportSession, ticket: ScanTicket, cfg: &Config) -> Result<Next> {
    let extractor = match GeminiExtractor::from_config(&cfg.ocr) {
        Ok(e) => e,
        Err(e) => {
            println!("✗ {e:#}");
            return Ok(handle(session.close_scan()));
        }
    };

    let raw = prompt("Receipt image paths (space separated, blank to cancel)")?;
    let paths: Vec<PathBuf> = raw.split_whitespace().map(PathBuf::from).collect();
    if paths.is_empty() {
        return Ok(handle(session.close_scan()));
    }

    let summary = scan_paths(&extractor, &paths, session.known_receipt_numbers()).await;
    print_summary(&summary, cfg);

    if summary.is_empty() {
        return Ok(handle(session.close_scan()));
    }
    if !confirm(&format!("Add {} item(s) to the report?", summary.new_items.len()))? {
        return Ok(handle(session.close_scan()));
    }

    match session.confirm_scan(ticket, summary.new_items) {
        Ok(_) => Ok(Next::Continue),
        Err(CoreError::StaleScan(t)) => {
            println!("✗ scan {t} was closed; results discarded");
            Ok(Next::Continue)
        }
        Err(e) => Ok(handle::<()>(Err(e))),
    }
}
