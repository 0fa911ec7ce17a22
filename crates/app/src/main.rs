use std::fmt;
use std::sync::Arc;

use progress_core::model::{ChildId, DashboardSnapshot, EventAck, EventBody, UserId};
use services::{
    AppLifecycle, Clock, CompletionTracker, EventPoster, HttpProgressApi, Identity,
    ProgressApi, ProgressStateStore, RefreshCoordinator, SyncConfig,
};
use storage::sqlite::SqliteKeyValueStore;
use storage::{KeyValueStore, LocalCache};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidId { flag: &'static str, raw: String },
    MissingIdentity,
    UnknownAction(String),
    MissingActionValue { action: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw:?}"),
            ArgsError::MissingIdentity => write!(f, "--user and --child are required"),
            ArgsError::UnknownAction(action) => write!(f, "unknown action: {action}"),
            ArgsError::MissingActionValue { action } => {
                write!(f, "{action} requires an argument")
            }
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
    eprintln!("  progress dashboard [options]");
    eprintln!("  progress event   <action> [options]");
    eprintln!("  progress offline [show | <action> | level-up | reset] [options]");
    eprintln!();
    eprintln!("Actions:");
    eprintln!("  flashcard <subject> <correct|incorrect>");
    eprintln!("  chore <id>");
    eprintln!("  outdoor <id>");
    eprintln!("  affirmation");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>   (default sqlite:dev.sqlite3)");
    eprintln!("  --user <id>");
    eprintln!("  --child <id>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PROGRESS_DB_URL, PROGRESS_USER_ID, PROGRESS_CHILD_ID");
    eprintln!("  PROGRESS_API_BASE_URL, PROGRESS_API_TOKEN");
    eprintln!("  PROGRESS_FETCH_TIMEOUT_MS, PROGRESS_DEBOUNCE_MS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Dashboard,
    Event,
    Offline,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "dashboard" => Some(Self::Dashboard),
            "event" => Some(Self::Event),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Show,
    Flashcard { subject: String, correct: bool },
    Chore(String),
    Outdoor(String),
    Affirmation,
    LevelUp,
    Reset,
}

impl Action {
    fn parse(words: &[String]) -> Result<Self, ArgsError> {
        let mut words = words.iter().cloned();
        let Some(first) = words.next() else {
            return Ok(Self::Show);
        };
        let action = match first.as_str() {
            "show" => Self::Show,
            "flashcard" => {
                let subject = words.next().ok_or(ArgsError::MissingActionValue {
                    action: "flashcard",
                })?;
                let correct = match words.next().as_deref() {
                    Some("correct") | None => true,
                    Some("incorrect") => false,
                    Some(other) => return Err(ArgsError::UnknownArg(other.to_string())),
                };
                Self::Flashcard { subject, correct }
            }
            "chore" => Self::Chore(
                words
                    .next()
                    .ok_or(ArgsError::MissingActionValue { action: "chore" })?,
            ),
            "outdoor" => Self::Outdoor(
                words
                    .next()
                    .ok_or(ArgsError::MissingActionValue { action: "outdoor" })?,
            ),
            "affirmation" => Self::Affirmation,
            "level-up" => Self::LevelUp,
            "reset" => Self::Reset,
            _ => return Err(ArgsError::UnknownAction(first)),
        };
        match words.next() {
            Some(extra) => Err(ArgsError::UnknownArg(extra)),
            None => Ok(action),
        }
    }

    fn event_body(&self) -> Option<EventBody> {
        match self {
            Action::Flashcard { subject, correct } => Some(EventBody::Flashcard {
                subject: subject.clone(),
                correct: *correct,
                card_id: None,
            }),
            Action::Affirmation => Some(EventBody::AffirmationViewed {
                affirmation_id: None,
            }),
            Action::Chore(id) => Some(EventBody::Chore {
                chore_id: id.clone(),
            }),
            Action::Outdoor(id) => Some(EventBody::Outdoor {
                activity_id: id.clone(),
            }),
            Action::Show | Action::LevelUp | Action::Reset => None,
        }
    }
}

struct Args {
    db_url: String,
    user: UserId,
    child: ChildId,
    action: Action,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PROGRESS_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut user = std::env::var("PROGRESS_USER_ID").ok();
        let mut child = std::env::var("PROGRESS_CHILD_ID").ok();
        let mut words = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user = Some(require_value(args, "--user")?),
                "--child" => child = Some(require_value(args, "--child")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => words.push(arg),
            }
        }

        let (Some(user), Some(child)) = (user, child) else {
            return Err(ArgsError::MissingIdentity);
        };
        let user = UserId::new(user.clone()).map_err(|_| ArgsError::InvalidId {
            flag: "--user",
            raw: user,
        })?;
        let child = ChildId::new(child.clone()).map_err(|_| ArgsError::InvalidId {
            flag: "--child",
            raw: child,
        })?;

        Ok(Self {
            db_url,
            user,
            child,
            action: Action::parse(&words)?,
        })
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

fn print_snapshot(snapshot: &DashboardSnapshot) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

fn print_ack(ack: Option<&EventAck>) -> Result<(), Box<dyn std::error::Error>> {
    match ack {
        Some(ack) => println!("{}", serde_json::to_string_pretty(ack)?),
        None => println!("event not accepted"),
    }
    Ok(())
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn online_coordinator(
    kv: Arc<dyn KeyValueStore>,
    args: &Args,
    config: &SyncConfig,
    clock: Clock,
) -> (RefreshCoordinator, Arc<dyn ProgressApi>) {
    let api = HttpProgressApi::new(config.api.clone());
    if !api.enabled() {
        warn!("PROGRESS_API_BASE_URL is not set, only cached data is available");
    }
    let api: Arc<dyn ProgressApi> = Arc::new(api);
    let coordinator = RefreshCoordinator::new(Arc::clone(&api), LocalCache::new(kv), config, clock);
    coordinator
        .set_identity(Identity::new(args.user.clone(), args.child.clone()))
        .await;
    (coordinator, api)
}

async fn run_dashboard(
    kv: Arc<dyn KeyValueStore>,
    args: &Args,
    config: &SyncConfig,
    clock: Clock,
) -> Result<(), Box<dyn std::error::Error>> {
    let (coordinator, _api) = online_coordinator(kv, args, config, clock).await;
    coordinator.refresh(false).await;

    let state = coordinator.get_state();
    if let Some(error) = &state.error {
        warn!(%error, "showing last known dashboard");
    }
    match &state.data {
        Some(snapshot) => print_snapshot(snapshot),
        None => {
            println!("no dashboard available");
            Ok(())
        }
    }
}

async fn run_event(
    kv: Arc<dyn KeyValueStore>,
    args: &Args,
    config: &SyncConfig,
    clock: Clock,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(body) = args.action.event_body() else {
        return Err(ArgsError::UnknownAction(format!("{:?}", args.action)).into());
    };
    let (coordinator, api) = online_coordinator(kv, args, config, clock).await;
    coordinator.refresh(false).await;
    let poster = EventPoster::new(api, coordinator.clone(), config.fetch_timeout);

    let ack = match &args.action {
        Action::Chore(id) => CompletionTracker::new(poster).complete_chore(id).await,
        Action::Outdoor(id) => {
            CompletionTracker::new(poster)
                .complete_outdoor_activity(id)
                .await
        }
        _ => poster.post_event(body).await,
    };

    // A failed post leaves a debounced refresh behind; run it before exiting.
    coordinator.handle_lifecycle(AppLifecycle::Background).await;
    print_ack(ack.as_ref())
}

async fn run_offline(
    kv: Arc<dyn KeyValueStore>,
    args: &Args,
    clock: Clock,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ProgressStateStore::load(kv, &args.user, &args.child, clock).await;

    match &args.action {
        Action::Show => {}
        Action::Flashcard { subject, correct } => {
            let outcome = store.record_flashcard(subject, *correct).await;
            info!(
                points = outcome.points_awarded,
                unlocked = ?outcome.new_achievement_ids,
                "flashcard recorded"
            );
        }
        Action::Chore(id) => {
            let outcome = store.toggle_chore(id).await;
            info!(completed = outcome.completed, delta = outcome.points_delta, "chore toggled");
        }
        Action::Outdoor(id) => {
            let outcome = store.toggle_outdoor_activity(id).await;
            info!(
                completed = outcome.completed,
                delta = outcome.points_delta,
                "outdoor activity toggled"
            );
        }
        Action::Affirmation => {
            let outcome = store.view_affirmation().await;
            info!(points = outcome.points_awarded, "affirmation viewed");
        }
        Action::LevelUp => match store.level_up().await {
            Some(level) => info!(level, "leveled up"),
            None => {
                let balanced = store.dashboard().balanced;
                println!("{}", balanced.message);
            }
        },
        Action::Reset => {
            store.reset().await;
            info!(child = %args.child, "offline progress reset");
        }
    }

    print_snapshot(&store.dashboard())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if cmd == Command::Dashboard && parsed.action != Action::Show {
        return Err(ArgsError::UnknownAction(format!("{:?}", parsed.action)).into());
    }

    let config = SyncConfig::from_env()?;
    let clock = Clock::default_clock();

    prepare_sqlite_file(&parsed.db_url)?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::open(&parsed.db_url).await?);

    match cmd {
        Command::Dashboard => run_dashboard(kv, &parsed, &config, clock).await,
        Command::Event => run_event(kv, &parsed, &config, clock).await,
        Command::Offline => run_offline(kv, &parsed, clock).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
