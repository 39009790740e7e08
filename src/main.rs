use std::net::TcpListener;
use std::sync::Arc;

use libris::auth::{RedisBlocklist, TokenBlocklist};
use libris::configuration::get_configuration;
use libris::startup::run;
use libris::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    // Missing or malformed configuration is fatal at startup.
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let connection_string = configuration.database.connection_string();
    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created successfully");

    // The revocation store is mandatory infrastructure; being unable to
    // reach it at startup is fatal, while transient failures later are
    // handled by the fail-open policy in the validator.
    let blocklist: Arc<dyn TokenBlocklist> = Arc::new(
        RedisBlocklist::connect(
            &configuration.redis,
            configuration.jwt.access_token_expiry,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to revocation store: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Revocation store connection error",
            )
        })?,
    );

    let address = format!("127.0.0.1:{}", configuration.application.port);
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, pool, configuration, blocklist)?;
    tracing::info!("Server started successfully");

    server.await
}
