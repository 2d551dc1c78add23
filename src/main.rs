use poise::serenity_prelude as serenity;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod bump;
mod commands;
mod config;
mod database;
mod dispatcher;
mod keep_alive;

use bump::BumpRules;
use config::Config;
use database::Database;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to the event handler and every command.
pub struct Data {
    database: Database,
    rules: BumpRules,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    // Liveness first, so the host sees the process while the gateway connects
    keep_alive::spawn(config.port);

    let database = match Database::new(&config.database_url).await {
        Ok(database) => database,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return;
        }
    };

    let rules = config.rules.clone();
    info!(
        "Tracking bumps from {} (marker {:?}, scope {:?})",
        rules.tracked_bot_id, rules.success_marker, rules.scope
    );

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::ranking(), commands::my_stats(), commands::info()],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(dispatcher::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Slash commands registered");
                Ok(Data { database, rules })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await;

    let mut client = match client {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Discord client: {}", e);
            return;
        }
    };

    info!("Starting bot...");

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }
}
