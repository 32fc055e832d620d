use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use groupsplit::{
    AppState,
    config::Config,
    middleware::{RateLimiter, rate_limit},
    routes,
    store::{GroupRepository, GroupStore, MemoryGroupRepository, PgGroupRepository},
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env();

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 选择持久化实现：配置了数据库就用 Postgres，否则用内存
    let repo: Arc<dyn GroupRepository> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .acquire_timeout(config.persistence_timeout())
                .after_connect(|conn, _meta| {
                    Box::pin(async move {
                        conn.execute("SET application_name = 'groupsplit_backend';")
                            .await?;
                        Ok(())
                    })
                })
                .connect(database_url)
                .await
                .expect("Failed to connect to Postgres");

            let repo = PgGroupRepository::new(pool);
            repo.ensure_schema()
                .await
                .expect("Failed to create database schema");
            tracing::info!("Using PostgreSQL group repository");
            Arc::new(repo)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, groups are kept in memory only");
            Arc::new(MemoryGroupRepository::new())
        }
    };

    let state = AppState {
        store: GroupStore::new(repo, config.persistence_timeout()),
        config: config.clone(),
    };

    let router = routes::create_router(state);

    // 配置了 Redis 才启用限流
    let router = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let redis_client =
                redis::Client::open(redis_url).expect("Failed to create Redis client");
            let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));
            tracing::info!(
                "Rate limiting enabled: {} requests per {:?}",
                config.rate_limit_requests,
                config.rate_limit_window()
            );
            router.layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit))
        }
        None => router,
    };

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        // 设置开发环境的CORS，允许所有来源
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
