use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tokio::time::sleep;

use meemee::catalog::Catalog;
use meemee::cli::{Cli, Commands};
use meemee::conversation::ConversationEngine;
use meemee::core::export::{leads_to_csv, leads_to_json};
use meemee::core::logging::{log_commerce_configuration, log_leads_configuration};
use meemee::core::utils::is_valid_date;
use meemee::core::{config, init_logger};
use meemee::generation::{GenerationApi, GenerationPoller, HttpGenerationApi, PendingGenerationSweeper, PollPolicy};
use meemee::leads::{LeadFlow, LeadPolicy};
use meemee::payments::{HttpPaymentApi, PaymentService};
use meemee::storage::{create_pool, get_connection, leads, InMemorySessionStore, SessionStore, SqliteSessionStore};
use meemee::telegram::{
    admin_schema, create_bot, create_bot_with_token, lead_schema, schema, setup_admin_commands, setup_bot_commands,
    AdminDeps, AdminNotifier, HandlerDeps, HandlerError, LeadDeps, TelegramReporter,
};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the requested bot or tool.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Panics inside dispatcher tasks are logged; the retry loop restarts them
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // .env first: LOG_FILE_PATH may come from it
    let _ = dotenv();
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { webhook }) => {
            log::info!("Running commerce bot (webhook: {})", webhook);
            run_commerce(webhook || *config::USE_WEBHOOK).await
        }
        Some(Commands::Leads) => {
            log::info!("Running lead bot");
            run_leads().await
        }
        Some(Commands::ExportLeads { date, json, output }) => export_leads(date, json, output),
        None => {
            log::info!("No command specified, running commerce bot");
            run_commerce(*config::USE_WEBHOOK).await
        }
    }
}

async fn run_commerce(use_webhook: bool) -> Result<()> {
    let init_start = std::time::Instant::now();
    log_commerce_configuration();

    let db_pool = Arc::new(create_pool(&config::DATABASE_PATH).context("open commerce database")?);
    let bot = create_bot()?;
    let me = bot.get_me().await.context("getMe failed")?;
    let bot_username = me.username.clone().unwrap_or_else(|| config::BOT_NAME.clone());
    log::info!("Authorized as @{}", bot_username);

    let generation_api: Arc<dyn GenerationApi> = Arc::new(HttpGenerationApi::from_env()?);
    let poller = Arc::new(GenerationPoller::new(
        Arc::clone(&generation_api),
        Arc::clone(&db_pool),
        Arc::new(TelegramReporter::new(bot.clone())),
        PollPolicy::default(),
    ));
    let payments = Arc::new(PaymentService::new(
        Arc::new(HttpPaymentApi::from_env()?),
        Arc::clone(&db_pool),
    ));
    let catalog = Arc::new(Catalog::load()?);
    log::info!("Catalog loaded: {} meme(s)", catalog.len());

    let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(Arc::clone(&db_pool)));
    let engine = Arc::new(ConversationEngine::new(
        sessions,
        Arc::clone(&db_pool),
        generation_api,
        Arc::clone(&poller),
        payments,
        catalog,
    ));

    PendingGenerationSweeper::new(poller, Arc::clone(&db_pool))
        .with_interval(config::poll::sweep_interval())
        .spawn();

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let deps = HandlerDeps::new(
        db_pool,
        engine,
        AdminNotifier::from_env()?,
        config::REQUIRED_CHANNEL.clone(),
        bot_username,
    );
    log::info!("Commerce bot initialized in {:.2}s", init_start.elapsed().as_secs_f64());
    run_dispatcher(bot, schema(deps), use_webhook).await
}

async fn run_leads() -> Result<()> {
    log_leads_configuration();

    let db_pool = Arc::new(create_pool(&config::LEADS_DATABASE_PATH).context("open leads database")?);
    let bot = create_bot()?;
    let flow = Arc::new(LeadFlow::new(
        LeadPolicy::from_env(),
        Arc::new(InMemorySessionStore::new()),
        Arc::clone(&db_pool),
        Arc::new(bot.clone()),
    ));
    let deps = LeadDeps::new(flow, Arc::clone(&db_pool), AdminNotifier::from_env()?);
    let lead_bot = run_dispatcher(bot, lead_schema(deps), false);

    let Some(admin_token) = config::ADMIN_BOT_TOKEN.as_deref() else {
        log::info!("ADMIN_BOT_TOKEN not set, admin bot disabled");
        return lead_bot.await;
    };

    let admin_bot = create_bot_with_token(admin_token)?;
    if let Err(e) = setup_admin_commands(&admin_bot).await {
        log::warn!("[ADMIN] Failed to set commands: {}", e);
    }
    let admin = run_dispatcher(admin_bot, admin_schema(AdminDeps::new(db_pool)), false);

    tokio::try_join!(lead_bot, admin)?;
    Ok(())
}

fn export_leads(date: Option<String>, json: bool, output: Option<String>) -> Result<()> {
    if let Some(date) = date.as_deref() {
        if !is_valid_date(date) {
            anyhow::bail!("Invalid date {:?}, expected YYYY-MM-DD", date);
        }
    }

    let pool = create_pool(&config::LEADS_DATABASE_PATH)?;
    let conn = get_connection(&pool)?;
    let list = match date.as_deref() {
        Some(date) => leads::list_by_date(&conn, date)?,
        None => leads::list_all(&conn)?,
    };
    let content = if json { leads_to_json(&list)? } else { leads_to_csv(&list)? };

    match output {
        Some(path) => {
            std::fs::write(&path, content).with_context(|| format!("write {}", path))?;
            log::info!("Exported {} lead(s) to {}", list.len(), path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Runs a dispatcher until shutdown.
///
/// Webhook mode needs WEBHOOK_URL. Polling restarts the dispatcher after a
/// panic, with exponential backoff, up to MAX_DISPATCHER_RETRIES times.
async fn run_dispatcher(bot: Bot, handler: UpdateHandler<HandlerError>, use_webhook: bool) -> Result<()> {
    let webhook_url = if use_webhook { config::WEBHOOK_URL.clone() } else { None };
    if use_webhook && webhook_url.is_none() {
        log::warn!("Webhook mode requested but WEBHOOK_URL is not set, falling back to polling");
    }

    if let Some(url) = webhook_url {
        let url = url::Url::parse(&url).context("invalid WEBHOOK_URL")?;
        let addr: std::net::SocketAddr = ([0, 0, 0, 0], *config::WEBHOOK_PORT).into();
        log::info!("Starting webhook listener on {} for {}", addr, url);

        let listener = webhooks::axum(bot.clone(), webhooks::Options::new(addr, url))
            .await
            .context("webhook setup failed")?;
        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
            )
            .await;
        return Ok(());
    }

    log::info!("Starting long polling");
    let max_retries = config::retry::MAX_DISPATCHER_RETRIES;
    let mut retry_count = 0;
    loop {
        let bot = bot.clone();
        let handler = handler.clone();

        // Separate task so a panic ends up in the JoinHandle
        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
            Dispatcher::builder(bot, handler)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                return Ok(());
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= max_retries {
                    anyhow::bail!("Dispatcher panicked {} times, giving up", retry_count + 1);
                }
                retry_count += 1;
                log::info!("Restarting dispatcher (attempt {}/{})...", retry_count, max_retries);
                exponential_backoff(retry_count).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                return Ok(());
            }
        }

        sleep(config::retry::dispatcher_delay()).await;
    }
}

/// Exponential backoff delay for retries
async fn exponential_backoff(retry_count: u32) {
    let delay = Duration::from_secs(config::retry::EXPONENTIAL_BACKOFF_BASE.pow(retry_count));
    sleep(delay).await;
}
