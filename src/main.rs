mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod redisdb;
mod routes;
mod tracing_config;
mod utils;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use redisdb::RedisClient;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use axum_client_ip::ClientIpSource;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: db::DBClient,
    pub redis_client: redisdb::RedisClient,
    pub ip_extraction: ClientIpSource,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let _guard = tracing_config::init_tracing();

    let config = Config::init();

    let ip_source = if cfg!(debug_assertions) {
        ClientIpSource::ConnectInfo
    } else {
        ClientIpSource::CfConnectingIp
    };

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>().unwrap())
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let db_client = DBClient::new(pool);

    // nightly purge of unactivated accounts with expired tokens
    db_client.start_cleanup_task().await;

    let manager = redis::Client::open(config.redis_url.clone())
        .unwrap()
        .get_connection_manager()
        .await
        .unwrap(); // no point serving without the rate limiter / token store

    let redis_client = RedisClient::new(manager);

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
        redis_client,
        ip_extraction: ip_source,
    };

    let app = routes::create_router(app_state).layer(cors.clone());

    tracing::info!("Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
