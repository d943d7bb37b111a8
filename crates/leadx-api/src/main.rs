//! 리드 거래소 인증 API 서버.
//!
//! 설정을 로드하고 사용자 저장소와 블랙리스트 저장소를 선택한 뒤,
//! 보안 체인이 적용된 Axum 서버를 시작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use leadx_api::metrics::setup_metrics_recorder;
use leadx_api::middleware::{metrics_layer, security_headers, SecurityChain, Stage};
use leadx_api::routes::{create_api_router, secure};
use leadx_api::state::{memory_store_from_seed, AppState};
use leadx_core::{
    init_logging, AppConfig, CacheStore, CredentialStore, LogConfig, LogFormat, ServerConfig,
};
use leadx_data::{Database, MemoryCache, PgCredentialStore, RedisCache};

/// 메모리 캐시 만료 항목 정리 주기.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// CORS 레이어 생성.
///
/// `CORS_ORIGINS`가 설정되면 해당 origin만 허용하고 자격 증명을 허용합니다.
fn cors_layer() -> CorsLayer {
    let (allow_origin, allow_credentials) = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                (AllowOrigin::any(), false)
            } else {
                info!(count = origins.len(), "CORS configured with allowed origins");
                (AllowOrigin::list(origins), true)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            (AllowOrigin::any(), false)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            header::ORIGIN,
            header::ACCESS_CONTROL_REQUEST_METHOD,
            header::ACCESS_CONTROL_REQUEST_HEADERS,
        ])
        .expose_headers([header::AUTHORIZATION])
        // 와일드카드 origin에는 자격 증명을 허용할 수 없음
        .allow_credentials(allow_credentials)
        // preflight 요청 캐시 시간
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
///
/// `/metrics`는 보안 체인 바깥에 있지만 보안 응답 헤더는 모든 응답에 적용됩니다.
/// CORS가 가장 바깥 레이어이므로 preflight 요청은 보안 체인에 도달하기 전에 응답됩니다.
fn create_router(
    state: Arc<AppState>,
    chain: &SecurityChain,
    metrics_handle: PrometheusHandle,
    server: &ServerConfig,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let api_router = secure(create_api_router(), state, chain);

    let router = Router::new().merge(metrics_router).merge(api_router);

    security_headers(router)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(cors_layer())
}

/// 사용자 저장소 선택.
///
/// `database.url`이 있으면 PostgreSQL, 없으면 설정의 초기 사용자로 채운 메모리 저장소.
async fn create_credential_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn CredentialStore>, Option<Database>)> {
    match &config.database {
        Some(db_config) => {
            let db = Database::connect(db_config)
                .await
                .context("failed to connect to database")?;
            db.migrate().await.context("failed to run migrations")?;
            info!("Using PostgreSQL credential store");
            let store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(db.pool().clone()));
            Ok((store, Some(db)))
        }
        None => {
            if config.users.is_empty() {
                warn!("No database configured and no seed users, every login will fail");
            }
            let store = memory_store_from_seed(&config.users)
                .context("failed to hash seed user passwords")?;
            warn!(
                users = config.users.len(),
                "Using in-memory credential store (development only)"
            );
            let store: Arc<dyn CredentialStore> = Arc::new(store);
            Ok((store, None))
        }
    }
}

/// 블랙리스트 저장소 선택.
///
/// `redis.url`이 있으면 Redis, 없으면 메모리 캐시와 만료 항목 정리 태스크.
async fn create_cache_store(
    config: &AppConfig,
    shutdown: &CancellationToken,
) -> anyhow::Result<Option<Arc<dyn CacheStore>>> {
    if !config.blacklist.enabled {
        info!("Token blacklist disabled");
        return Ok(None);
    }

    match &config.redis {
        Some(redis_config) => {
            let cache: Arc<dyn CacheStore> = Arc::new(
                RedisCache::connect(redis_config)
                    .await
                    .context("failed to connect to redis")?,
            );
            info!("Using Redis token blacklist");
            Ok(Some(cache))
        }
        None => {
            let cache = Arc::new(MemoryCache::new());
            spawn_cache_purge(cache.clone(), shutdown.clone());
            warn!("Using in-memory token blacklist (not shared across instances)");
            let cache: Arc<dyn CacheStore> = cache;
            Ok(Some(cache))
        }
    }
}

/// 메모리 캐시의 만료 항목을 주기적으로 정리합니다.
fn spawn_cache_purge(cache: Arc<MemoryCache>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Cache purge task stopped");
                    break;
                }
                _ = interval.tick() => {
                    let purged = cache.purge_expired().await;
                    if purged > 0 {
                        debug!(purged, "Expired blacklist entries purged");
                    }
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("failed to load configuration")?;

    let mut log_config = LogConfig::from(&config.logging);
    if let Ok(format) = std::env::var("LOG_FORMAT") {
        log_config = log_config.with_format(format.parse().unwrap_or(LogFormat::Pretty));
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!(e))?;

    info!("Starting lead exchange auth server...");

    let metrics_handle = setup_metrics_recorder().context("failed to install metrics recorder")?;
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                error = %e,
                "소켓 주소 설정이 유효하지 않습니다. server.host, server.port를 확인하세요."
            );
            e
        })?;

    // 전역 종료 토큰 (백그라운드 태스크에 종료 전파)
    let shutdown_token = CancellationToken::new();

    let (store, database) = create_credential_store(&config).await?;
    let cache = create_cache_store(&config, &shutdown_token).await?;

    let state = Arc::new(
        AppState::from_config(&config, store, cache, database)
            .context("failed to initialize security state")?,
    );
    info!(version = %state.version, "Application state initialized");

    let chain = SecurityChain::builder()
        .then(Stage::Authenticate)
        .then(Stage::Authorize)
        .build()?;

    let app = create_router(state, &chain, metrics_handle, &config.server);

    info!(%addr, "API server listening");
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    shutdown_token.cancel();
    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
/// 시그널 핸들러 설치에 실패하면 해당 시그널은 무시됩니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
