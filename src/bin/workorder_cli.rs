use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use workorder_ledger::{
    commands::workorders::{CreateWorkOrderCommand, ListWorkOrdersCommand, WorkOrderPatch},
    config::{self, AppConfig},
    db::{self, DbPool},
    events::{self, Event, EventSender},
    models::{work_order, WorkOrderKind},
    repositories::WorkOrderDetails,
    services::{
        quantities::{QuantityBucket, QuantityPatch},
        WorkOrderService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Create(args) => handle_create(&context, args, cli.json).await?,
        Commands::Update(args) => handle_update(&context, args, cli.json).await?,
        Commands::Complete(args) => handle_complete(&context, args, cli.json).await?,
        Commands::Delete(args) => handle_delete(&context, args, cli.json).await?,
        Commands::Show(args) => handle_show(&context, args, cli.json).await?,
        Commands::List(args) => handle_list(&context, args, cli.json).await?,
        Commands::Stats(args) => handle_stats(&context, args, cli.json).await?,
        Commands::Migrate => handle_migrate(&context).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "workorder", about = "Work order ledger CLI", version)]
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
    /// Create a work order, generating its display id unless one is given
    Create(CreateArgs),
    /// Patch fields and size quantities of a work order
    Update(UpdateArgs),
    /// Mark a work order as completed
    Complete(IdArgs),
    /// Delete an open work order
    Delete(IdArgs),
    /// Show a work order with its classification entities
    Show(IdArgs),
    /// List work orders, newest first
    List(ListArgs),
    /// Open and completed counts per kind
    Stats(StatsArgs),
    /// Apply pending database migrations
    Migrate,
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long, value_parser = parse_kind, default_value = "repair", help = "Work order kind")]
    kind: WorkOrderKind,
    #[arg(long, help = "Explicit display id; generated when omitted")]
    display_id: Option<String>,
    #[arg(long)]
    laboratory_id: Option<i32>,
    #[arg(long)]
    department_id: Option<i32>,
    #[arg(long)]
    line_id: Option<i32>,
    #[arg(long)]
    size_template_id: Option<i32>,
    #[arg(long)]
    article: Option<String>,
    #[arg(long)]
    reason: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(
        long = "qty",
        value_parser = parse_bucket_count,
        help = "Size quantity as bucket=count, e.g. p01=3 (repeatable)"
    )]
    quantities: Vec<(QuantityBucket, i32)>,
}

#[derive(Args)]
struct UpdateArgs {
    #[arg(help = "Work order id")]
    id: i32,
    #[arg(
        long,
        help = "JSON patch, e.g. '{\"reason\": \"torn seam\", \"notes\": null, \"p01\": 5}'"
    )]
    payload: Option<String>,
    #[arg(
        long = "qty",
        value_parser = parse_bucket_count,
        help = "Size quantity as bucket=count, e.g. p01=3 (repeatable)"
    )]
    quantities: Vec<(QuantityBucket, i32)>,
}

#[derive(Args)]
struct IdArgs {
    #[arg(help = "Work order id")]
    id: i32,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, value_parser = parse_kind)]
    kind: Option<WorkOrderKind>,
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "completed")]
    open: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    completed: bool,
    #[arg(long)]
    page: Option<u64>,
    #[arg(long)]
    per_page: Option<u64>,
}

#[derive(Args)]
struct StatsArgs {
    #[arg(long, value_parser = parse_kind, help = "Restrict to one kind")]
    kind: Option<WorkOrderKind>,
}

#[derive(Serialize)]
struct WorkOrderPage {
    items: Vec<work_order::Model>,
    total: u64,
}

struct CliContext {
    db: Arc<DbPool>,
    service: WorkOrderService,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        if config.auto_migrate {
            db::run_migrations(&db)
                .await
                .context("failed to run database migrations")?;
        }

        let event_sender = spawn_event_processor(&config);
        let service = WorkOrderService::with_database(
            db.clone(),
            event_sender,
            config.work_orders.clone(),
        );

        Ok(Self { db, service })
    }
}

fn spawn_event_processor(config: &AppConfig) -> Arc<EventSender> {
    let (event_tx, event_rx) = mpsc::channel::<Event>(config.event_channel_capacity);
    tokio::spawn(events::process_events(event_rx));
    Arc::new(EventSender::new(event_tx))
}

async fn handle_create(context: &CliContext, args: CreateArgs, json: bool) -> Result<()> {
    let command = CreateWorkOrderCommand {
        kind: args.kind,
        display_id: args.display_id,
        laboratory_id: args.laboratory_id,
        department_id: args.department_id,
        line_id: args.line_id,
        size_template_id: args.size_template_id,
        article: args.article,
        reason: args.reason,
        notes: args.notes,
        quantities: patch_from_pairs(QuantityPatch::new(), &args.quantities),
    };

    let created = context
        .service
        .create(command)
        .await
        .context("failed to create work order")?;

    if json {
        print_json(&created)?;
    } else {
        println!("Created work order");
        render_details(&created);
    }
    Ok(())
}

async fn handle_update(context: &CliContext, args: UpdateArgs, json: bool) -> Result<()> {
    let mut patch: WorkOrderPatch = match args.payload.as_deref() {
        Some(raw) => serde_json::from_str(raw).context("invalid --payload JSON")?,
        None => WorkOrderPatch::default(),
    };
    patch.quantities = patch_from_pairs(patch.quantities, &args.quantities);

    let updated = context
        .service
        .update(args.id, patch)
        .await
        .with_context(|| format!("failed to update work order {}", args.id))?;

    if json {
        print_json(&updated)?;
    } else {
        println!("Updated work order");
        render_details(&updated);
    }
    Ok(())
}

async fn handle_complete(context: &CliContext, args: IdArgs, json: bool) -> Result<()> {
    let completed = context
        .service
        .complete(args.id)
        .await
        .with_context(|| format!("failed to complete work order {}", args.id))?;

    if json {
        print_json(&completed)?;
    } else {
        println!("Completed work order");
        render_details(&completed);
    }
    Ok(())
}

async fn handle_delete(context: &CliContext, args: IdArgs, json: bool) -> Result<()> {
    context
        .service
        .delete(args.id)
        .await
        .with_context(|| format!("failed to delete work order {}", args.id))?;

    if json {
        print_json(&serde_json::json!({ "deleted": args.id }))?;
    } else {
        println!("Deleted work order {}", args.id);
    }
    Ok(())
}

async fn handle_show(context: &CliContext, args: IdArgs, json: bool) -> Result<()> {
    let details = context
        .service
        .get(args.id)
        .await
        .with_context(|| format!("failed to load work order {}", args.id))?;

    if json {
        print_json(&details)?;
    } else {
        render_details(&details);
    }
    Ok(())
}

async fn handle_list(context: &CliContext, args: ListArgs, json: bool) -> Result<()> {
    let completed = match (args.open, args.completed) {
        (true, _) => Some(false),
        (_, true) => Some(true),
        _ => None,
    };
    let query = ListWorkOrdersCommand {
        kind: args.kind,
        completed,
        page: args.page,
        per_page: args.per_page,
    };

    let (items, total) = context
        .service
        .list(query)
        .await
        .context("failed to list work orders")?;

    if json {
        print_json(&WorkOrderPage { items, total })?;
    } else if items.is_empty() {
        println!("No work orders found");
    } else {
        for work_order in &items {
            render_summary(work_order);
        }
        println!("{} of {} work orders", items.len(), total);
    }
    Ok(())
}

async fn handle_stats(context: &CliContext, args: StatsArgs, json: bool) -> Result<()> {
    let kinds: Vec<WorkOrderKind> = match args.kind {
        Some(kind) => vec![kind],
        None => WorkOrderKind::ALL.to_vec(),
    };

    let mut counts = Vec::with_capacity(kinds.len());
    for kind in kinds {
        counts.push(
            context
                .service
                .status_counts(kind)
                .await
                .with_context(|| format!("failed to count {} work orders", kind))?,
        );
    }

    if json {
        print_json(&counts)?;
    } else {
        for count in &counts {
            println!(
                "{:<18} open {:>6}  completed {:>6}  total {:>6}",
                count.kind,
                count.open,
                count.completed,
                count.total()
            );
        }
    }
    Ok(())
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run database migrations")?;
    println!("Migrations applied");
    Ok(())
}

fn parse_kind(value: &str) -> Result<WorkOrderKind, String> {
    value
        .trim()
        .replace('-', "_")
        .parse()
        .map_err(|_| format!("unknown work order kind: {}", value))
}

fn parse_bucket_count(value: &str) -> Result<(QuantityBucket, i32)> {
    let (bucket, count) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("expected bucket=count, got '{}'", value))?;
    let bucket: QuantityBucket = bucket
        .trim()
        .to_lowercase()
        .parse()
        .map_err(|_| anyhow!("unknown size bucket '{}' (expected p01..p20)", bucket))?;
    let count: i32 = count
        .trim()
        .parse()
        .with_context(|| format!("invalid count '{}'", count))?;
    Ok((bucket, count))
}

fn patch_from_pairs(mut patch: QuantityPatch, pairs: &[(QuantityBucket, i32)]) -> QuantityPatch {
    for (bucket, count) in pairs {
        patch.insert(*bucket, *count);
    }
    patch
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_summary(work_order: &work_order::Model) {
    println!(
        "- #{} • {} {} • total {} • {}",
        work_order.id,
        work_order.kind,
        work_order.display_id,
        work_order.total_quantity,
        work_order.state()
    );
}

fn render_details(details: &WorkOrderDetails) {
    let work_order = &details.work_order;
    render_summary(work_order);
    if let Some(closed_at) = work_order.closed_at {
        println!("  closed at: {}", closed_at);
    }
    if let Some(laboratory) = &details.laboratory {
        println!("  laboratory: {}", laboratory.name);
    }
    if let Some(department) = &details.department {
        println!("  department: {}", department.name);
    }
    if let Some(line) = &details.line {
        println!("  line: {}", line.name);
    }
    for (label, value) in [
        ("article", &work_order.article),
        ("reason", &work_order.reason),
        ("notes", &work_order.notes),
    ] {
        if let Some(value) = value {
            println!("  {}: {}", label, value);
        }
    }

    let quantities = work_order.quantities();
    let sizes: Vec<String> = QuantityBucket::iter()
        .filter(|bucket| quantities.get(*bucket) != 0)
        .map(|bucket| {
            let label = details
                .size_template
                .as_ref()
                .and_then(|template| template.label_for(bucket))
                .map(str::to_string)
                .unwrap_or_else(|| bucket.to_string());
            format!("{}={}", label, quantities.get(bucket))
        })
        .collect();
    if !sizes.is_empty() {
        println!("  sizes: {}", sizes.join(", "));
    }
}
