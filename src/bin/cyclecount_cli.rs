use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use cyclecount_api::{
    clock::{Clock, SystemClock},
    config::{self, AppConfig, StoreBackend},
    db,
    events::{Event, EventSender},
    models::{
        Component, CountDay, HistoryEntry, Location, ProgressMap, SessionKind,
        SessionScope,
    },
    services::{
        reconciliation::{CountInput, SessionStatus},
        HistoryService, ReconciliationEngine,
    },
    stores::{database::DatabaseStore, workbook::WorkbookStore, Stores},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load application config")?;
    config::init_tracing(config.log_level(), config.log_json);

    match cli.command {
        Commands::Migrate => run_migrations(&config).await?,
        command => {
            let context = CliContext::initialize(config).await?;
            dispatch(&context, command, cli.json).await?
        }
    }

    Ok(())
}

async fn run_migrations(config: &AppConfig) -> Result<()> {
    let pool = db::establish_connection_from_app_config(config)
        .await
        .context("failed to connect to database")?;
    db::run_migrations(&pool).await.context("migrations failed")?;
    println!("Migrations applied");
    Ok(())
}

async fn dispatch(context: &CliContext, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Migrate => Ok(()),
        Commands::Count(args) => handle_count(context, args, json).await,
        Commands::Session(command) => handle_session_command(context, command, json).await,
        Commands::History(command) => handle_history_command(context, command, json).await,
        Commands::Component(command) => handle_component_command(context, command, json).await,
    }
}

#[derive(Parser)]
#[command(name = "cyclecount", about = "Cycle count operations from the terminal", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Submit one scanned count
    Count(CountArgs),
    #[command(subcommand)]
    Session(SessionCommands),
    #[command(subcommand)]
    History(HistoryCommands),
    #[command(subcommand)]
    Component(ComponentCommands),
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Monthly,
    Weekly,
}

impl From<KindArg> for SessionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Monthly => SessionKind::Monthly,
            KindArg::Weekly => SessionKind::Weekly,
        }
    }
}

#[derive(Args, Clone)]
struct ScopeArgs {
    #[arg(long, help = "Location code: MtD, FtP, HSTD or 3PL (weekly defaults to HSTD)")]
    location: Option<String>,
    #[arg(long, value_enum, default_value = "monthly")]
    kind: KindArg,
    #[arg(long, help = "Weekday of a weekly count, Monday through Friday")]
    day: Option<String>,
}

impl ScopeArgs {
    fn to_scope(&self) -> Result<SessionScope> {
        let kind = SessionKind::from(self.kind);
        let location = match (kind, self.location.as_deref()) {
            (SessionKind::Weekly, None) => Location::Hstd,
            (_, raw) => Location::parse(raw)?,
        };
        let day = self.day.as_deref().map(CountDay::parse).transpose()?;
        Ok(SessionScope::new(location, kind, day)?)
    }
}

#[derive(Args)]
struct CountArgs {
    #[arg(long)]
    barcode: String,
    #[arg(long, help = "Counted quantity as typed")]
    quantity: String,
    #[command(flatten)]
    scope: ScopeArgs,
    #[arg(long, action = ArgAction::SetTrue, help = "Record as an admin count")]
    admin: bool,
    #[arg(long, help = "Answer to a conflict prompt: true to override, false to decline")]
    confirm_override: Option<bool>,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Start or resume the current session
    Start(ScopeArgs),
    /// Show counted and uncounted SKUs
    Status(ScopeArgs),
    /// Delete the current session and everything it recorded
    Reset(ScopeArgs),
    /// Take one SKU out of the current session
    RemoveSku(RemoveSkuArgs),
    /// List stored sessions of one kind
    List(ListSessionsArgs),
}

#[derive(Args)]
struct RemoveSkuArgs {
    #[arg(long)]
    barcode: String,
    #[command(flatten)]
    scope: ScopeArgs,
}

#[derive(Args)]
struct ListSessionsArgs {
    #[arg(long, value_enum, default_value = "monthly")]
    kind: KindArg,
    #[arg(long)]
    location: Option<String>,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// This month's scans of one SKU
    Monthly(SkuHistoryArgs),
    /// Delete this month's scans of one SKU
    Clear(SkuHistoryArgs),
}

#[derive(Args)]
struct SkuHistoryArgs {
    #[arg(long)]
    barcode: String,
    #[arg(long)]
    location: String,
}

#[derive(Subcommand)]
enum ComponentCommands {
    /// Stock on hand at one location
    List(ComponentListArgs),
    /// Create or replace a component's quantity at one location (database backend only)
    Set(ComponentSetArgs),
}

#[derive(Args)]
struct ComponentListArgs {
    #[arg(long)]
    location: String,
}

#[derive(Args)]
struct ComponentSetArgs {
    #[arg(long)]
    barcode: String,
    #[arg(long)]
    location: String,
    #[arg(long)]
    quantity: i32,
    #[arg(long, default_value = "")]
    description: String,
}

struct CliContext {
    stores: Stores,
    database: Option<Arc<DatabaseStore>>,
    engine: ReconciliationEngine,
    history: HistoryService,
}

impl CliContext {
    async fn initialize(config: AppConfig) -> Result<Self> {
        let (stores, database) = match config.store_backend() {
            StoreBackend::Database => {
                let pool = db::establish_connection_from_app_config(&config)
                    .await
                    .context("failed to connect to database")?;
                if config.auto_migrate {
                    db::run_migrations(&pool).await.context("migrations failed")?;
                }
                let store = Arc::new(DatabaseStore::new(Arc::new(pool)));
                (Stores::from_shared(store.clone()), Some(store))
            }
            StoreBackend::Workbook => {
                let store = WorkbookStore::from_config(&config.workbook)
                    .context("failed to configure workbook store")?;
                (Stores::from_shared(Arc::new(store)), None)
            }
        };

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
        let event_sender = EventSender::new(event_tx);

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "cyclecount_cli", event = ?event, "received async event");
            }
        });

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let engine = ReconciliationEngine::new(stores.clone(), clock.clone(), event_sender);
        let history = HistoryService::new(stores.history.clone(), clock);

        Ok(Self {
            stores,
            database,
            engine,
            history,
        })
    }
}

async fn handle_count(context: &CliContext, args: CountArgs, json: bool) -> Result<()> {
    let kind = SessionKind::from(args.scope.kind);
    let location = match (kind, args.scope.location) {
        (SessionKind::Weekly, None) => Some(Location::Hstd.to_string()),
        (_, location) => location,
    };
    let day = args.scope.day.as_deref().map(CountDay::parse).transpose()?;

    let mut input = CountInput {
        barcode: Some(args.barcode),
        quantity: Some(args.quantity),
        location,
        kind,
        day,
        actor: Default::default(),
        confirm_override: args.confirm_override,
    };
    if args.admin {
        input = input.as_admin();
    }

    let outcome = context.engine.submit_count(input).await?;
    if json {
        return print_json(&outcome);
    }
    println!(
        "Accepted {} x {} at {} ({}/{} counted, {:.0}%)",
        outcome.quantity,
        outcome.barcode,
        outcome.location,
        outcome.summary.counted,
        outcome.summary.expected,
        outcome.summary.percent
    );
    println!("  {}", outcome.provenance);
    Ok(())
}

async fn handle_session_command(
    context: &CliContext,
    command: SessionCommands,
    json: bool,
) -> Result<()> {
    match command {
        SessionCommands::Start(scope) => {
            let session = context
                .engine
                .start_session(scope.to_scope()?, ProgressMap::new())
                .await?;
            if json {
                return print_json(&session);
            }
            println!(
                "Session {} started {} ({} SKUs counted)",
                session.id,
                session.started_at.to_rfc3339(),
                session.progress.len()
            );
        }
        SessionCommands::Status(scope) => {
            let status = context.engine.session_status(scope.to_scope()?).await?;
            if json {
                return print_json(&status);
            }
            render_status(&status);
        }
        SessionCommands::Reset(scope) => {
            let report = context.engine.reset_session(scope.to_scope()?).await?;
            if json {
                return print_json(&report);
            }
            if report.existed {
                println!(
                    "Reset {}: {} SKUs cleared, {} history rows deleted",
                    report.session_id,
                    report.cleared_barcodes.len(),
                    report.history_deleted
                );
            } else {
                println!("No session {} to reset", report.session_id);
            }
        }
        SessionCommands::RemoveSku(args) => {
            let session = context
                .engine
                .remove_sku(args.scope.to_scope()?, &args.barcode)
                .await?;
            if json {
                return print_json(&session);
            }
            println!(
                "Removed {} from {} ({} SKUs remain)",
                args.barcode,
                session.id,
                session.progress.len()
            );
        }
        SessionCommands::List(args) => {
            let location = args
                .location
                .as_deref()
                .map(|raw| Location::parse(Some(raw)))
                .transpose()?;
            let sessions = context
                .stores
                .sessions
                .list_sessions(args.kind.into(), location)
                .await?;
            if json {
                return print_json(&sessions);
            }
            if sessions.is_empty() {
                println!("No sessions found");
            }
            for session in sessions {
                println!(
                    "- {} • {} SKUs • last updated {}{}",
                    session.id,
                    session.progress.len(),
                    session.last_updated.to_rfc3339(),
                    if session.completed { " • completed" } else { "" }
                );
            }
        }
    }
    Ok(())
}

async fn handle_history_command(
    context: &CliContext,
    command: HistoryCommands,
    json: bool,
) -> Result<()> {
    match command {
        HistoryCommands::Monthly(args) => {
            let location = Location::parse(Some(&args.location))?;
            let entries = context
                .history
                .monthly_for_sku(&args.barcode, location)
                .await?;
            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No scans of {} at {} this month", args.barcode, location);
            }
            entries.iter().for_each(render_history_entry);
        }
        HistoryCommands::Clear(args) => {
            let location = Location::parse(Some(&args.location))?;
            let deleted = context
                .history
                .clear_monthly_for_sku(&args.barcode, location)
                .await?;
            if json {
                return print_json(&serde_json::json!({
                    "barcode": args.barcode,
                    "deleted": deleted,
                }));
            }
            println!("Deleted {} scans of {}", deleted, args.barcode);
        }
    }
    Ok(())
}

async fn handle_component_command(
    context: &CliContext,
    command: ComponentCommands,
    json: bool,
) -> Result<()> {
    match command {
        ComponentCommands::List(args) => {
            let location = Location::parse(Some(&args.location))?;
            let components = context.stores.inventory.list_components().await?;
            if json {
                return print_json(&components);
            }
            for component in &components {
                println!(
                    "- {} • {} • {} on hand at {}",
                    component.barcode,
                    component.description,
                    component.quantity_at(location),
                    location
                );
            }
        }
        ComponentCommands::Set(args) => {
            let database = context
                .database
                .as_ref()
                .context("component set requires the database store backend")?;
            let location = Location::parse(Some(&args.location))?;
            let existing = context.stores.inventory.get_component(&args.barcode).await?;
            let mut component = existing
                .unwrap_or_else(|| Component::new_counted(args.barcode.clone(), location, 0))
                .with_quantity(location, args.quantity);
            if !args.description.is_empty() {
                component.description = args.description;
            }
            database.upsert_component(&component).await?;
            if json {
                return print_json(&component);
            }
            println!(
                "{} now has {} at {} (total {})",
                component.barcode, args.quantity, location, component.total_quantity
            );
        }
    }
    Ok(())
}

fn render_status(status: &SessionStatus) {
    println!(
        "{} • {}/{} counted ({:.0}%){}",
        status.session_id,
        status.summary.counted,
        status.summary.expected,
        status.summary.percent,
        if status.summary.completed { " • completed" } else { "" }
    );
    for sku in &status.skus {
        match sku.quantity {
            Some(quantity) => println!("  ✓ {} = {} ({})", sku.barcode, quantity, sku.note),
            None => println!("  · {} ({})", sku.barcode, sku.note),
        }
    }
}

fn render_history_entry(entry: &HistoryEntry) {
    println!(
        "- {} • qty {} • {} • {}",
        entry.timestamp.to_rfc3339(),
        entry.quantity,
        entry.session_id,
        entry.source
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
