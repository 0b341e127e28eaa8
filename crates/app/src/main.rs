use std::fmt;
use std::io::{BufRead, Write as _};
use std::sync::Arc;
use std::time::Duration;

use reframe_core::Clock;
use reframe_core::model::{Analysis, TaskId, TransformationPlan};
use services::{
    AdvanceOutcome, AppServices, CoachConfig, FlowState, NotificationSink, Severity,
};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTaskId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTaskId { raw } => write!(f, "invalid --task-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- onboard  [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- tasks    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- complete [--db <sqlite_url>] --task-id <id>");
    eprintln!("  cargo run -p app -- streak   [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- reset    [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:reframe.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  REFRAME_DB_URL, REFRAME_API_BASE_URL, REFRAME_API_TIMEOUT_SECS");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Onboard,
    Tasks,
    Complete,
    Streak,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "onboard" => Some(Self::Onboard),
            "tasks" => Some(Self::Tasks),
            "complete" => Some(Self::Complete),
            "streak" => Some(Self::Streak),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    task_id: Option<TaskId>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("REFRAME_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://reframe.sqlite3".into(), normalize_sqlite_url);
        let mut task_id = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--task-id" => {
                    let value = require_value(args, "--task-id")?;
                    let parsed = value
                        .parse::<TaskId>()
                        .map_err(|_| ArgsError::InvalidTaskId { raw: value.clone() })?;
                    task_id = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, task_id })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Prints notifications to the terminal as they arrive.
struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, severity: Severity, message: &str, _duration: Duration) {
        let prefix = match severity {
            Severity::Info => "note",
            Severity::Success => "done",
            Severity::Error => "error",
        };
        println!("[{prefix}] {message}");
    }
}

fn prompt_line(prompt: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    // Reads block the runtime, which is fine for a terminal front end.
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_analysis(analysis: &Analysis) {
    println!();
    println!("== Analysis ==");
    println!("What it looks like:  {}", analysis.perceived_problem);
    println!("What it really is:   {}", analysis.real_problem);
    println!("Why it happens:      {}", analysis.why_it_happens);
    if !analysis.root_causes.is_empty() {
        println!("Root causes:");
        for cause in &analysis.root_causes {
            println!("  - {cause}");
        }
    }
    if !analysis.action_steps.is_empty() {
        println!("First actions:");
        for step in &analysis.action_steps {
            println!("  - {step}");
        }
    }
    println!(
        "Confidence {}%, clarity {}%",
        analysis.confidence, analysis.clarity_score
    );
    println!();
}

fn print_plan(plan: &TransformationPlan) {
    println!();
    println!("== Your plan ==");
    println!("{}", plan.strategy.overview);
    if let Some(time) = &plan.strategy.estimated_time {
        println!("Estimated time: {time}");
    }
    for step in &plan.steps {
        let duration = step.duration.as_deref().unwrap_or("-");
        println!(
            "  day {:>2}  [{}] {} ({duration})",
            step.day, step.priority, step.title
        );
    }
    println!();
}

async fn run_onboarding(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match app.onboarding().state()? {
            FlowState::Idle => {
                let Some(text) =
                    prompt_line("Describe the problem you want to work on (20+ characters):\n> ")?
                else {
                    return Ok(());
                };
                if let Err(err) = app.onboarding().set_problem(&text).await {
                    eprintln!("{err}");
                    continue;
                }
                println!("Preparing a few follow-up questions...");
                app.onboarding().begin_questions().await?;
            }
            FlowState::QuestionsPending => {
                // Unreachable with a single task driving the flow.
                app.onboarding().begin_questions().await?;
            }
            FlowState::Answering => {
                let Some(question) = app.onboarding().current_prompt()? else {
                    continue;
                };
                let Some(answer) = prompt_line(&format!("{question}\n(empty to skip) > "))? else {
                    return Ok(());
                };
                let outcome = if answer.is_empty() {
                    app.onboarding().skip_question().await?
                } else {
                    app.onboarding().submit_answer(&answer).await?
                };
                if outcome == AdvanceOutcome::Unlocked {
                    println!("Generating your analysis...");
                    let analysis = app.onboarding().view_analysis().await?;
                    print_analysis(&analysis);
                }
            }
            FlowState::Unlocked => {
                let analysis = app.onboarding().view_analysis().await?;
                print_analysis(&analysis);
            }
            FlowState::AnalysisReady => {
                let Some(choice) = prompt_line("Generate your transformation plan? [y/N] ")? else {
                    return Ok(());
                };
                if !choice.eq_ignore_ascii_case("y") {
                    println!("Your analysis is saved. Run `onboard` again when you are ready.");
                    return Ok(());
                }
                println!("Building your plan...");
                let plan = app.launch_transformation().await?;
                print_plan(&plan);
            }
            FlowState::TransformationPending => {
                // Unreachable with a single task driving the flow.
                continue;
            }
            FlowState::TransformationComplete => {
                println!("Plan installed. Run `tasks` to see today's steps.");
                return Ok(());
            }
        }
    }
}

async fn run_tasks(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let tasks = app.tasks().list().await?;
    if tasks.is_empty() {
        println!("No tasks yet. Run `onboard` to build a plan.");
        return Ok(());
    }
    for task in &tasks {
        let mark = if task.is_completed() { "x" } else { " " };
        println!("[{mark}] #{:<4} day {:>2}  {}", task.id(), task.day(), task.title());
        if let Some(notes) = task.notes() {
            println!("            {notes}");
        }
    }
    let stats = app.tasks().stats().await?;
    println!(
        "{} of {} done ({}%)",
        stats.completed, stats.total, stats.completion_rate
    );
    Ok(())
}

async fn run_complete(
    app: &AppServices,
    task_id: Option<TaskId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(id) = task_id else {
        return Err(ArgsError::MissingValue { flag: "--task-id" }.into());
    };
    let task = app.tasks().complete_task(id).await?;
    let streak = app.streaks().record_completion().await?;
    println!("Completed: {}", task.title());
    println!("Streak: {} (best {})", streak.current(), streak.best());
    Ok(())
}

async fn run_streak(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let streak = app.streaks().current().await?;
    println!("Current streak: {}", streak.current());
    println!("Best streak:    {}", streak.best());
    Ok(())
}

async fn run_reset(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    app.onboarding().reset().await?;
    app.tasks().clear_all().await?;
    println!("Session and tasks cleared.");
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Onboard,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Onboard,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // SQLite file creation stays in the binary; the storage crate only ever
    // sees a connectable URL.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(
        &parsed.db_url,
        Clock::default_clock(),
        &CoachConfig::from_env(),
        Arc::new(ConsoleNotifier),
    )
    .await?;

    match cmd {
        Command::Onboard => run_onboarding(&app).await,
        Command::Tasks => run_tasks(&app).await,
        Command::Complete => run_complete(&app, parsed.task_id).await,
        Command::Streak => run_streak(&app).await,
        Command::Reset => run_reset(&app).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
