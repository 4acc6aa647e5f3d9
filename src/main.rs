//! design-board: design service project board CLI.

use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};
use clap::Parser;
use design_board::capability::Principal;
use design_board::chat::{ChatSession, KeywordResponder, LogNotifier, SimulatedAgentResponder};
use design_board::cli::{AdmitArgs, Cli, Command, ConvertArgs, GroupCommand, TaskCommand};
use design_board::clock::SystemClock;
use design_board::config::Config;
use design_board::dashboard::{self, DashboardState};
use design_board::format::{self, OutputFormat};
use design_board::ledger;
use design_board::logging::init_logging;
use design_board::membership;
use design_board::repository::{TaskRepository, TaskUpdate};
use design_board::scheduler::Scheduler;
use design_board::snapshot;
use design_board::types::{KanbanColumn, Task};
use design_board::workflow::Transition;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log, cli.verbose)?;

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(path) = &cli.snapshot {
        config.snapshot.path = path.clone();
    }

    let board = snapshot::load_or_empty(&config.snapshot.path)?;
    let repo = TaskRepository::new(board, Arc::new(SystemClock));
    let actor = Principal::new(cli.user.clone(), cli.role.into());
    let out = cli.format;

    match cli.command {
        Command::Group { action } => {
            let mutated = run_group(&repo, &actor, action, out)?;
            if mutated {
                save(&repo, &config.snapshot.path)?;
            }
        }
        Command::Task { action } => {
            run_task(&repo, &actor, action, out)?;
            save(&repo, &config.snapshot.path)?;
        }
        Command::Board { column } => run_board(&repo, column, out)?,
        Command::Timeline { horizon } => run_timeline(&repo, &config, horizon, out)?,
        Command::Convert(args) => run_convert(args, out)?,
        Command::Admit(args) => run_admit(&repo, &config, args, out)?,
        Command::Plans => {
            let plans = membership::plans();
            emit(out, &plans, || format::format_plans_markdown(&plans))?;
        }
        Command::Chat { message, agent } => run_chat(&config, &message.join(" "), agent, out).await?,
        Command::Serve { port } => run_serve(repo, &config, port).await?,
    }

    Ok(())
}

fn save(repo: &TaskRepository, path: &Path) -> Result<()> {
    snapshot::save(path, repo.snapshot_state())
}

/// Print `value` as JSON, or the markdown produced by `markdown`.
fn emit<T, F>(out: OutputFormat, value: &T, markdown: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    match out {
        OutputFormat::Json => println!("{}", format::to_json(value)?),
        OutputFormat::Markdown => print!("{}", markdown()),
    }
    Ok(())
}

fn describe_transition(t: &Transition) -> String {
    if t.changed() {
        format!("Moved `{}` from {} to {}\n", t.task_id, t.from, t.to)
    } else {
        format!("`{}` stays in {}\n", t.task_id, t.from)
    }
}

/// Returns whether the board changed.
fn run_group(repo: &TaskRepository, actor: &Principal, action: GroupCommand, out: OutputFormat) -> Result<bool> {
    match action {
        GroupCommand::Add { title } => {
            let group = repo.add_group(actor, &title)?;
            emit(out, &group, || format!("Created group `{}` {}\n", group.id, group.title))?;
            Ok(true)
        }
        GroupCommand::Delete { id } => {
            let group = repo.delete_group(actor, &id)?;
            emit(out, &group, || {
                format!("Deleted group `{}` with {} task(s)\n", group.id, group.tasks.len())
            })?;
            Ok(true)
        }
        GroupCommand::List => {
            let groups = repo.groups();
            emit(out, &groups, || format::format_groups_markdown(&groups))?;
            Ok(false)
        }
    }
}

fn run_task(repo: &TaskRepository, actor: &Principal, action: TaskCommand, out: OutputFormat) -> Result<()> {
    let print_task = |task: &Task, verb: &str| {
        emit(out, task, || format!("{} {}", verb, format::format_task_short(task)))
    };
    let print_transition = |t: &Transition| emit(out, t, || describe_transition(t));

    match action {
        TaskCommand::Add { group, title, tokens } => {
            let task = repo.add_task(actor, &group, &title, tokens)?;
            print_task(&task, "Requested")
        }
        TaskCommand::Edit { id, title, tokens } => {
            let task = repo.update_task(actor, &id, TaskUpdate { title, tokens })?;
            print_task(&task, "Updated")
        }
        TaskCommand::Delete { id } => {
            let task = repo.delete_task(actor, &id)?;
            print_task(&task, "Deleted")
        }
        TaskCommand::Advance { id } => print_transition(&repo.advance(actor, &id)?),
        TaskCommand::Retreat { id } => print_transition(&repo.retreat(actor, &id)?),
        TaskCommand::Move { id, column } => print_transition(&repo.move_to(actor, &id, column)?),
        TaskCommand::Submit { id } => print_transition(&repo.submit_request(actor, &id)?),
        TaskCommand::Assign { id, agent } => {
            let task = repo.assign_agent(actor, &id, agent.as_deref())?;
            print_task(&task, "Assigned")
        }
    }
}

fn run_board(repo: &TaskRepository, column: Option<KanbanColumn>, out: OutputFormat) -> Result<()> {
    if let Some(column) = column {
        let tasks = repo.tasks_by_column(column);
        return emit(out, &tasks, || format::format_column_markdown(column, &tasks));
    }

    let columns: Vec<_> = repo
        .column_summaries()
        .into_iter()
        .map(|summary| {
            let tasks = repo.tasks_by_column(summary.column);
            (summary, tasks)
        })
        .collect();
    let json_view: Vec<_> = columns
        .iter()
        .map(|(summary, tasks)| json!({ "summary": summary, "tasks": tasks }))
        .collect();
    emit(out, &json_view, || format::format_board_markdown(&columns))
}

fn scheduler_for(config: &Config, horizon: Option<NaiveDate>) -> Scheduler {
    Scheduler::new(
        horizon.unwrap_or_else(|| Local::now().date_naive()),
        config.scheduler.capacity_rule(),
    )
}

fn run_timeline(repo: &TaskRepository, config: &Config, horizon: Option<NaiveDate>, out: OutputFormat) -> Result<()> {
    let timeline = scheduler_for(config, horizon).build(&repo.approved_tasks());
    emit(out, &timeline, || {
        format::format_timeline_markdown(&timeline, config.timeline.visible_days)
    })
}

fn run_convert(args: ConvertArgs, out: OutputFormat) -> Result<()> {
    let tokens = args.resolve_tokens()?;
    let span = ledger::time_from_tokens(tokens);
    let value = json!({
        "tokens": tokens,
        "hours": span.hours,
        "minutes": span.minutes,
        "label": format::task_effort_label(tokens),
    });
    emit(out, &value, || {
        format!("{} = {}\n", format::format_tokens(tokens), ledger::format_duration(tokens))
    })
}

fn run_admit(repo: &TaskRepository, config: &Config, args: AdmitArgs, out: OutputFormat) -> Result<()> {
    let tokens = design_board::repository::validate_tokens(args.tokens)?;
    let scheduler = scheduler_for(config, args.horizon);
    let date = args.date.unwrap_or_else(|| scheduler.horizon());
    let max = args.max.unwrap_or(config.board.max_tokens_per_day);

    let timeline = scheduler.build(&repo.approved_tasks());
    let existing = repo.tasks_on(&timeline, date);

    let candidate = Task {
        id: "candidate".to_string(),
        title: "candidate".to_string(),
        tokens,
        parent_id: String::new(),
        column: KanbanColumn::Request,
        requested_by: String::new(),
        created_at: Utc::now(),
        approved_at: None,
        assigned_agent_id: None,
    };
    let admitted = ledger::can_admit_task_to_day(&existing, &candidate, max);

    let value = json!({
        "date": date,
        "tokens": tokens,
        "day_total": ledger::total_tokens(&existing),
        "max_tokens_per_day": max,
        "admitted": admitted,
    });
    emit(out, &value, || {
        format!(
            "{}: {} {} ({} of {} tokens already planned)\n",
            date,
            format::format_tokens(tokens),
            if admitted { "fits" } else { "does not fit" },
            ledger::total_tokens(&existing),
            max
        )
    })
}

async fn run_chat(config: &Config, message: &str, with_agent: bool, out: OutputFormat) -> Result<()> {
    let assistant = Arc::new(KeywordResponder::new(config.chat.ai_delay())?);
    let agent = Arc::new(SimulatedAgentResponder::new(
        config.chat.agent_delay(),
        config.chat.agent_jitter(),
    ));
    let mut session = ChatSession::new(assistant, agent, Arc::new(LogNotifier), config.chat.connect_delay());

    if with_agent {
        session.request_human_agent().await;
    }
    session.send_message(message).await?;

    let messages = session.messages();
    emit(out, &messages, || {
        messages
            .iter()
            .map(|m| format!("**{:?}**: {}\n\n", m.sender, m.content))
            .collect()
    })
}

async fn run_serve(repo: TaskRepository, config: &Config, port: Option<u16>) -> Result<()> {
    let state = DashboardState::new(repo, config.scheduler.capacity_rule(), config.timeline.window_days);
    let (shutdown, addr) = dashboard::start_server(state, port.unwrap_or(config.dashboard.port)).await?;
    eprintln!("Dashboard available at http://{}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, stopping dashboard");
    let _ = shutdown.send(());
    Ok(())
}
