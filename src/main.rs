//! GeoIP API - IP geolocation service
//!
//! This is the composition root that wires together all the components.

use geoip_api::adapters::inbound::HttpServer;
use geoip_api::adapters::outbound::{MaxMindAsnReader, MaxMindCityReader};
use geoip_api::application::GeoIpService;
use geoip_api::config::load_config;
use geoip_api::domain::ports::{AsnResolver, LocationResolver};
use geoip_api::infrastructure::{shutdown_signal, ShutdownController};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting GeoIP API listen={} data_dir={}",
        cfg.listen_addr,
        cfg.data_dir
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters (MaxMind)
    let locations: Option<Arc<dyn LocationResolver>> =
        match MaxMindCityReader::from_file(&cfg.city_db_path) {
            Ok(r) => {
                tracing::info!("City DB loaded from {} ({})", cfg.city_db_path, r.database_type());
                Some(Arc::new(r) as Arc<dyn LocationResolver>)
            }
            Err(e) => {
                tracing::error!("failed to load City DB: {:?}", e);
                None
            }
        };

    let owners: Option<Arc<dyn AsnResolver>> = match MaxMindAsnReader::from_file(&cfg.asn_db_path)
    {
        Ok(r) => {
            tracing::info!("ASN DB loaded from {} ({})", cfg.asn_db_path, r.database_type());
            Some(Arc::new(r) as Arc<dyn AsnResolver>)
        }
        Err(e) => {
            tracing::error!("failed to load ASN DB: {:?}", e);
            None
        }
    };

    // 2. Application service
    let service = Arc::new(GeoIpService::new(locations, owners));

    // 3. Inbound adapter with graceful shutdown
    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let server = HttpServer::new(service, cfg.listen_addr.clone()).with_cors(cfg.cors_enabled);
    server
        .run(shutdown, Duration::from_secs(cfg.shutdown_timeout_secs))
        .await
}
