//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, ENV_LOG, LOG_TARGET};
use crate::core::shutdown::ShutdownService;
use crate::data::{ClickhouseService, FactStore};
use crate::domain::FactsService;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub clickhouse: Arc<ClickhouseService>,
    pub facts: Arc<FactsService>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Check) => return Self::check(&cli_config).await,
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config)?;
        Self::start_server(app).await
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        config.validate()?;

        let clickhouse = Arc::new(
            ClickhouseService::new(&config.clickhouse)
                .context("Failed to initialize ClickHouse client")?,
        );
        let facts = Arc::new(FactsService::new(
            clickhouse.clone(),
            config.clickhouse.query_timeout(),
        ));

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            clickhouse,
            facts,
        })
    }

    /// Validate configuration and ping the store, then exit
    async fn check(cli: &CliConfig) -> Result<()> {
        let config = AppConfig::load(cli)?;
        config.validate()?;

        let clickhouse = ClickhouseService::new(&config.clickhouse)
            .context("Failed to initialize ClickHouse client")?;
        clickhouse
            .ping()
            .await
            .with_context(|| format!("ClickHouse at {} is not reachable", config.clickhouse.url))?;

        println!(
            "OK: {} ({} / {})",
            clickhouse.backend_name(),
            config.clickhouse.url,
            config.clickhouse.database
        );
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", LOG_TARGET);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        // An unreachable store at startup is not fatal; /health reports it
        match app.clickhouse.ping().await {
            Ok(()) => tracing::info!(url = %app.config.clickhouse.url, "Connected to ClickHouse"),
            Err(e) => tracing::warn!(
                url = %app.config.clickhouse.url,
                error = %e,
                "ClickHouse not reachable at startup"
            ),
        }

        app.start_background_tasks().await;

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            database = %app.config.clickhouse.database,
            "Starting {}",
            APP_NAME
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(
                self.clickhouse
                    .start_health_check_task(self.shutdown.token()),
            )
            .await;

        tracing::debug!("Background tasks started");
    }
}
