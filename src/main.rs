use anyhow::{Context, Result};
use clap::Parser;
use mercabot::channels::whatsapp::{WhatsAppAgent, WhatsAppState};
use mercabot::config::Config;
use mercabot::intent::OpenAiExtractor;
use mercabot::sheets::{ServiceAccountKey, SheetsClient, SheetsStore};
use mercabot::shop::{StoreProfile, Storefront};
use mercabot::{gateway, logging};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mercabot", version, about = "WhatsApp storefront bot")]
struct Cli {
    /// Path to the config file (defaults to ~/.mercabot/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging plus a rotated log file
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _guard = logging::init_logging(logging::LogConfig::new().with_debug_mode(cli.debug))
        .context("failed to initialize logging")?;

    let config = Config::load(cli.config.as_deref())?;

    // Datastore
    anyhow::ensure!(
        !config.sheets.spreadsheet_id.is_empty(),
        "SPREADSHEET_ID is not configured"
    );
    let key_path = config
        .sheets
        .service_account_key_path
        .as_ref()
        .context("GOOGLE_SERVICE_ACCOUNT_KEY_PATH is not configured")?;
    let key = ServiceAccountKey::from_file(key_path)
        .with_context(|| format!("failed to load service account key {}", key_path.display()))?;
    let store = Arc::new(SheetsStore::new(SheetsClient::new(
        config.sheets.spreadsheet_id.clone(),
        key,
    )));

    tracing::info!("Loading store profile from Google Sheets...");
    let profile = match store.fetch_profile().await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!("Sheets: profile load failed ({e}); using placeholder texts");
            StoreProfile::default()
        }
    };

    // Intent extractor
    let api_key = config
        .openai
        .api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;
    let extractor =
        Arc::new(OpenAiExtractor::new(api_key).with_model(config.openai.model.clone()));

    let shop = Arc::new(Storefront::new(
        profile,
        store.clone(),
        extractor,
        store.clone(),
        store,
    ));

    // Gateway (QR page) + WhatsApp agent
    let whatsapp_state = Arc::new(WhatsAppState::new());
    let gateway_bind = config.gateway.bind.clone();
    let gateway_port = config.gateway.port;
    let gateway_state = whatsapp_state.clone();
    let gateway_task =
        tokio::spawn(
            async move { gateway::serve(gateway_bind, gateway_port, gateway_state).await },
        );

    let agent_task = WhatsAppAgent::new(shop, whatsapp_state, config.data_dir()).start();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
        result = gateway_task => {
            if let Ok(Err(e)) = result {
                tracing::error!("Gateway stopped: {e}");
            }
        }
        _ = agent_task => {
            tracing::warn!("WhatsApp agent stopped");
        }
    }

    Ok(())
}
