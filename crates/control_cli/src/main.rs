mod config;

use caseflow_audit_spec::{ActionKind, Actor, CaseId, CaseKind, Decision, Disposition, Role, Satisfaction, Visibility};
use caseflow_notify::{notify_committed, LogDispatcher, NotificationDispatcher, OutboxDispatcher};
use caseflow_store::{CaseQuery, CaseService, FileCaseStore, StoreError};
use caseflow_workflow::{table_for, ActionRequest, CaseSummary, CaseView, OpenCase, Payload};
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::{load_config, resolve_root, Config, ConfigError};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "caseflow", version, about = "Escalation case workflow engine")]
struct Args {
    /// Config file (defaults to ./caseflow.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store root; beats CASEFLOW_ROOT and the config file
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a critical insight case raised by 1-on-1 analysis
    OpenInsight {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        details: String,
        #[arg(long)]
        supervisor_id: String,
        #[arg(long)]
        employee_id: String,
    },

    /// Record a supervisor declining a recommendation
    OpenDeclined {
        #[arg(long)]
        supervisor_id: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        employee_id: Option<String>,
    },

    /// File a complaint on behalf of an employee
    FileComplaint {
        #[arg(long)]
        complainant_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        details: String,
    },

    /// Apply one action to a case
    Apply {
        #[arg(long)]
        case_id: String,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        actor_id: String,
        #[arg(long)]
        action: ActionKind,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        satisfaction: Option<Satisfaction>,
        #[arg(long)]
        decision: Option<Decision>,
        #[arg(long)]
        disposition: Option<Disposition>,
        /// Repeatable; roles for assign/unassign
        #[arg(long = "assignee")]
        assignees: Vec<Role>,
        #[arg(long)]
        visibility: Option<Visibility>,
        /// Reject unless the trail still has this many records
        #[arg(long)]
        expected_len: Option<usize>,
    },

    /// Print a case with its derived status and trail
    Show {
        #[arg(long)]
        case_id: String,
        /// Hide internal events and notes
        #[arg(long, default_value_t = false)]
        external: bool,
    },

    /// List cases
    List {
        #[arg(long)]
        kind: Option<CaseKind>,
        #[arg(long)]
        assigned_to: Option<Role>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, default_value_t = false)]
        include_terminal: bool,
    },

    /// Verify a case trail's hash chain and replay
    Verify {
        #[arg(long)]
        case_id: String,
    },

    /// Dump the transition table of a case kind
    Table {
        #[arg(long)]
        kind: CaseKind,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

fn init_logging(configured: &str) {
    let filter = EnvFilter::try_from_env("CASEFLOW_LOG")
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries command output only
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn dispatcher_for(cfg: &Config) -> Option<Box<dyn NotificationDispatcher>> {
    if !cfg.notifications.enabled {
        return None;
    }
    Some(match &cfg.notifications.outbox {
        Some(path) => Box::new(OutboxDispatcher::new(path.clone())),
        None => Box::new(LogDispatcher),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn run() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let mut cfg = load_config(args.config.as_deref())?;
    cfg.store.root = resolve_root(&cfg.store.root, std::env::var("CASEFLOW_ROOT").ok(), args.root.clone());
    init_logging(&cfg.logging.filter);
    debug!(root = %cfg.store.root.display(), "store root resolved");

    let service = CaseService::new(FileCaseStore::new(cfg.store.root.clone()));

    match args.cmd {
        Command::OpenInsight { subject, details, supervisor_id, employee_id } => {
            let open = OpenCase::critical_insight(supervisor_id, employee_id, subject, details);
            let case = service.open(open, Utc::now())?;
            print_json(&CaseSummary::from(&case))?;
        }

        Command::OpenDeclined { supervisor_id, subject, reason, employee_id } => {
            let mut open = OpenCase::declined_recommendation(supervisor_id, subject, reason);
            if let Some(emp) = employee_id {
                open = open.with_party(Role::Employee, emp);
            }
            let case = service.open(open, Utc::now())?;
            print_json(&CaseSummary::from(&case))?;
        }

        Command::FileComplaint { complainant_id, title, details } => {
            let case = service.open(OpenCase::complaint(complainant_id, title, details), Utc::now())?;
            print_json(&CaseSummary::from(&case))?;
        }

        Command::Apply {
            case_id,
            role,
            actor_id,
            action,
            text,
            satisfaction,
            decision,
            disposition,
            assignees,
            visibility,
            expected_len,
        } => {
            let payload = Payload {
                text,
                satisfaction,
                decision,
                disposition,
                roles: assignees,
                visibility,
            };
            let mut req = ActionRequest::new(Actor::new(role, actor_id), action, payload);
            if let Some(n) = expected_len {
                req = req.expecting(n);
            }

            let applied = service.apply(&CaseId(case_id), req, Utc::now())?;
            let notification = match dispatcher_for(&cfg) {
                Some(d) => notify_committed(d.as_ref(), &applied).await,
                None => None,
            };

            print_json(&json!({
                "case": CaseSummary::from(&applied.case),
                "event": {
                    "seq": applied.event.seq,
                    "event": applied.event.event.event,
                    "hash": applied.event.hash,
                },
                "spawned": applied.spawned.as_ref().map(CaseSummary::from),
                "notified": notification.map(|n| n.recipients),
            }))?;
        }

        Command::Show { case_id, external } => {
            let case = service.get(&CaseId(case_id))?;
            let view = if external { CaseView::external(&case) } else { CaseView::internal(&case) };
            print_json(&view)?;
        }

        Command::List { kind, assigned_to, parent, include_terminal } => {
            let q = CaseQuery {
                kind,
                assigned_to,
                parent: parent.map(CaseId),
                include_terminal,
            };
            print_json(&service.query(&q)?)?;
        }

        Command::Verify { case_id } => {
            let case_id = CaseId(case_id);
            let last_hash = service.verify(&case_id)?;
            print_json(&json!({ "case_id": case_id, "ok": true, "last_hash": last_hash }))?;
        }

        Command::Table { kind } => {
            let table = table_for(kind);
            print_json(&json!({
                "kind": kind,
                "initial": table.initial().code(),
                "rules": table.describe(),
            }))?;
        }
    }

    Ok(())
}
