//! Horta - community garden management backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use horta::{
    audit::{AuditLog, MongoAuditSink, MongoClient},
    config::{Args, LogFormat},
    db::GardenDb,
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("horta={},info", log_level).into()),
        )
        .with((args.log_format == LogFormat::Text).then(|| tracing_subscriber::fmt::layer()))
        .with((args.log_format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json()))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Horta - Community Garden Backend");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Database: {}", args.database_path.display());
    info!(
        "Audit: {}",
        if args.audit_enabled {
            format!("{} / {}", args.mongodb_uri, args.mongodb_db)
        } else {
            "disabled".to_string()
        }
    );
    info!("Access mode: {:?}", args.access_mode);
    info!("Admin groups: {:?}", args.admin_groups);
    info!("Member groups: {:?}", args.member_groups);
    info!("======================================");

    let db = GardenDb::open(&args.database_path)?;

    // The audit trail is optional; the API keeps serving without it
    let audit = if args.audit_enabled {
        match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                info!("Audit trail writing to MongoDB database '{}'", client.db_name());
                AuditLog::new(Arc::new(MongoAuditSink::new(client)))
            }
            Err(e) => {
                warn!("MongoDB connection failed, continuing without audit trail: {}", e);
                AuditLog::disabled()
            }
        }
    } else {
        AuditLog::disabled()
    };

    let state = Arc::new(AppState::new(args, db, audit)?);
    server::run(state).await?;

    Ok(())
}
