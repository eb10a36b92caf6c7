mod classifier;
mod config;
mod health;
mod keywords;
mod platform;
mod reporter;
mod scheduler;
mod stats;
mod summarizer;
mod visitors;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::classifier::EventClassifier;
use crate::config::{Config, ReportSchedule};
use crate::keywords::KeywordSet;
use crate::platform::telegram::TelegramSink;
use crate::platform::NotificationSink;
use crate::reporter::ScheduledReporter;
use crate::scheduler::Scheduler;
use crate::stats::StatsAggregator;
use crate::summarizer::SummaryGateway;
use crate::visitors::VisitorRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telewatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Summarizer: {}", config.summarizer.provider);
    info!("  Keywords: {}", config.keywords.len());
    info!("  Operator chat: {}", config.telegram.operator_chat_id);

    // Wire up the pipeline
    let registry = VisitorRegistry::open(&config.registry.database_path)?;
    let stats = Arc::new(StatsAggregator::new(config.keywords.clone()));
    let gateway = Arc::new(SummaryGateway::new(config.summarizer.clone()));

    let classifier = Arc::new(EventClassifier::new(
        config.telegram.operator_chat_id,
        KeywordSet::new(config.keywords.clone()),
        registry,
        gateway,
        Arc::clone(&stats),
    ));

    let bot = Bot::new(&config.telegram.bot_token);
    let sink = Arc::new(TelegramSink::new(bot.clone()));

    // Periodic digest
    let reporter = Arc::new(ScheduledReporter::new(
        config.telegram.operator_chat_id,
        Arc::clone(&stats),
        Arc::clone(&sink) as Arc<dyn NotificationSink>,
    ));
    let scheduler = Scheduler::new().await?;
    let job_reporter = Arc::clone(&reporter);
    let task = Box::new(move || {
        let reporter = Arc::clone(&job_reporter);
        Box::pin(async move { reporter.run_once().await })
            as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    match config.report.schedule() {
        ReportSchedule::Cron(expr) => scheduler.add_cron_job(&expr, "digest", task).await?,
        ReportSchedule::Every(every) => scheduler.add_interval_job(every, "digest", task).await?,
    }
    scheduler.start().await?;

    // Keepalive endpoint for the hosting platform
    let bind_addr = config.health.bind_addr;
    tokio::spawn(async move {
        if let Err(e) = health::serve(bind_addr).await {
            error!("Health endpoint failed: {:#}", e);
        }
    });

    // Run the Telegram bot
    info!("Bot is starting...");
    platform::telegram::run(classifier, sink, bot).await?;

    Ok(())
}
