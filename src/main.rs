use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info};

use musebot::delivery::{DeliveryTransport, TelegramSender};
use musebot::genai::GenAiClient;
use musebot::generator::PromptGenerator;
use musebot::scheduler::Scheduler;
use musebot::usage::{self, UsageLog};
use musebot::{config, db, handlers};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/musebot.db", cfg.app.data_dir));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    // Usage log writer (best-effort side channel, single-threaded)
    let (usage_log, usage_rx) = UsageLog::channel();
    tokio::spawn(usage::run_writer(pool.clone(), usage_rx));

    let bot = Bot::new(cfg.telegram.bot_token.clone());

    let genai = GenAiClient::from_config(&cfg.openai, usage_log.clone());
    let generator = PromptGenerator::new(Arc::new(genai));
    let transport = DeliveryTransport::new(
        Arc::new(TelegramSender::new(bot.clone())),
        usage_log.clone(),
    );
    let scheduler = Arc::new(Scheduler::new(
        pool.clone(),
        generator,
        transport,
        usage_log,
    ));

    // Daily batch worker
    let batch_scheduler = scheduler.clone();
    let delivery_hour = cfg.app.delivery_hour_utc;
    tokio::spawn(async move {
        batch_scheduler.run_daily(delivery_hour).await;
    });

    info!("starting telegram bot");
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let pool = pool.clone();
        let scheduler = scheduler.clone();
        async move {
            if let Err(err) = handlers::handle_update(&bot, &pool, &scheduler, &msg).await {
                error!(?err, "failed to handle update");
            }
            respond(())
        }
    })
    .await;

    Ok(())
}
