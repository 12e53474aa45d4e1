use crate::cli::ServeArgs;
use crate::infra::{build_gateways, AppState, InMemorySessionRepository};
use crate::routes::with_wizard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use movequote::config::AppConfig;
use movequote::error::AppError;
use movequote::telemetry;
use movequote::workflows::wizard::{QuoteWizardService, WizardSettings};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(deposit_cents) = args.deposit_cents.take() {
        config.wizard.deposit_cents = deposit_cents;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemorySessionRepository::default());
    let gateways = build_gateways(&config)?;
    let wizard_service = Arc::new(QuoteWizardService::new(
        repository,
        gateways,
        WizardSettings {
            deposit_cents: config.wizard.deposit_cents,
            session_ttl: config.wizard.session_ttl(),
        },
    ));

    let app = with_wizard_routes(wizard_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        deposit_cents = config.wizard.deposit_cents,
        "moving quote wizard ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
