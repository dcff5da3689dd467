use formflow_form_service::fonts::probe_unicode_font;
use formflow_form_service::http::router;
use formflow_form_service::render::PdfBackend;
use formflow_form_service::service::FormService;
use formflow_form_service::storage::FileStorage;
use formflow_form_service::store::Store;
use formflow_utils::config::AppConfig;
use formflow_utils::logging::init_logging;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config load failed ({e}), using built-in defaults");
            AppConfig::default()
        }
    };
    init_logging(&config.logging)?;
    info!("Starting FormFlow Form Service");

    let font = probe_unicode_font(&config.converter.unicode_fonts, &config.converter.fallback_font);

    let backend = Arc::new(PdfBackend::probe(&config.converter).await);
    info!(backend = backend.name(), "pdf backend selected");
    if backend.name() == "library" {
        warn!(
            binary = %config.converter.office_binary,
            "office converter unavailable, layout fidelity reduced"
        );
    }

    let storage = Arc::new(FileStorage::new(&config.storage.upload_dir));
    let service = Arc::new(FormService::new(Store::new(), storage, backend, font));

    // A fresh store has no users; seed one so the create-form surface is
    // usable out of the box.
    let admin_id = service.seed_user("admin", "Administrator").await;
    info!(user_id = %admin_id, "seeded default user");

    let app = router(service, config.server.max_upload_bytes);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Form service listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
