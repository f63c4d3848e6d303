use crate::cli::ServeArgs;
use crate::infra::{notification_dispatcher, AppState, InMemorySessionRepository};
use crate::routes::with_survey_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ev_advisor::config::AppConfig;
use ev_advisor::error::AppError;
use ev_advisor::telemetry;
use ev_advisor::workflows::comparison::BrandDirectory;
use ev_advisor::workflows::recommendation::{HttpRankingService, RecommendationAdapter};
use ev_advisor::workflows::survey::{SurveyCatalog, SurveyService};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) fn load_brands(path: Option<&Path>) -> Result<Arc<BrandDirectory>, AppError> {
    let directory = match path {
        Some(path) => {
            let directory = BrandDirectory::from_path(path)?;
            info!(path = %path.display(), brands = directory.len(), "brand directory loaded");
            directory
        }
        None => BrandDirectory::default(),
    };
    Ok(Arc::new(directory))
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        notifier: notification_dispatcher(),
    };

    let ranking = Arc::new(HttpRankingService::new(&config.ranking)?);
    let adapter = Arc::new(RecommendationAdapter::from_config(ranking, &config.ranking));
    let brands = load_brands(config.brand_directory.as_deref())?;
    let survey_service = Arc::new(
        SurveyService::new(
            SurveyCatalog::shared_standard(),
            Arc::new(InMemorySessionRepository::default()),
            adapter,
        )
        .with_brands(brands),
    );

    let app = with_survey_routes(survey_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        ranking = %config.ranking.endpoint,
        placeholders = config.ranking.placeholders.label(),
        "ev advisor ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
