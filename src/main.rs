use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auroramart::api::{self, AppState};
use auroramart::config::Config;
use auroramart::db::Database;
use auroramart::models::{AttributeValue, RawAttributes};
use auroramart::recommend::RecommendationFacade;

#[derive(Parser)]
#[command(name = "aurora")]
#[command(about = "Category prediction and product recommendations for AuroraMart")]
struct Cli {
    /// Directory holding the trained artifacts (overrides AURORAMART_MODELS_DIR)
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// SQLite catalogue path (overrides AURORAMART_DB_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Predict a preferred category from onboarding survey answers
    Predict {
        /// Survey answers, e.g. age=25-34 gender=F household_size=2
        #[arg(value_name = "KEY=VALUE", required = true)]
        attributes: Vec<String>,
    },
    /// Recommend products frequently bought with a SKU
    Recommend {
        sku: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Recommend products for a basket of SKUs
    Basket {
        #[arg(required = true)]
        skus: Vec<String>,

        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show the load state of every model artifact
    Artifacts {
        /// Load every artifact before reporting
        #[arg(long)]
        load: bool,
    },
}

/// Initialize tracing with output to stderr (for one-shot commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "auroramart=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // One-shot commands print JSON on stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_catalogue(config: &Config) -> anyhow::Result<Database> {
    let db = Database::open(config.database_path.clone()).with_context(|| {
        format!(
            "Failed to open catalogue at {}",
            config.database_path.display()
        )
    })?;
    db.migrate()?;
    Ok(db)
}

fn build_facade(config: &Config, db: &Database) -> RecommendationFacade {
    RecommendationFacade::from_config(config, Arc::new(db.clone()))
}

/// Parse `key=value`, reading booleans and numbers the way a form would post them.
fn parse_attribute(pair: &str) -> anyhow::Result<(String, AttributeValue)> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected KEY=VALUE, got '{}'", pair))?;

    let value = value.trim();
    let parsed = if let Ok(b) = value.parse::<bool>() {
        AttributeValue::Bool(b)
    } else if let Ok(n) = value.parse::<i64>() {
        AttributeValue::Integer(n)
    } else if let Ok(f) = value.parse::<f64>() {
        AttributeValue::Float(f)
    } else {
        AttributeValue::Text(value.to_string())
    };

    Ok((key.trim().to_string(), parsed))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve(config: &Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting AuroraMart recommendation server on port {}", port);
    tracing::info!("Model artifacts directory: {}", config.models_dir.display());

    let db = open_catalogue(config)?;
    let facade = build_facade(config, &db);
    let state = AppState::new(db, facade).with_default_limit(config.default_limit);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(
        "AuroraMart server listening on http://127.0.0.1:{}",
        port
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let serving = matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(!serving);

    let mut config = Config::from_env();
    if let Some(dir) = cli.models_dir {
        config = config.with_models_dir(dir);
    }
    if let Some(path) = cli.database {
        config = config.with_database_path(path);
    }

    match cli.command {
        Some(Commands::Serve { port }) => serve(&config, port).await?,
        Some(Commands::Predict { attributes }) => {
            let raw = attributes
                .iter()
                .map(|pair| parse_attribute(pair))
                .collect::<anyhow::Result<RawAttributes>>()?;

            let db = open_catalogue(&config)?;
            print_json(&build_facade(&config, &db).predict_category(&raw))?;
        }
        Some(Commands::Recommend { sku, limit }) => {
            let db = open_catalogue(&config)?;
            let limit = limit.unwrap_or(config.default_limit);
            print_json(&build_facade(&config, &db).recommend_for_product(&sku, limit))?;
        }
        Some(Commands::Basket { skus, limit }) => {
            let db = open_catalogue(&config)?;
            let limit = limit.unwrap_or(config.default_limit);
            print_json(&build_facade(&config, &db).recommend_for_basket(&skus, limit))?;
        }
        Some(Commands::Artifacts { load }) => {
            let db = open_catalogue(&config)?;
            let facade = build_facade(&config, &db);
            let descriptors = if load {
                facade.store().load_all()
            } else {
                facade.artifacts()
            };
            print_json(&descriptors)?;
        }
        None => serve(&config, 3000).await?,
    }

    Ok(())
}
