use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use turnpike_core::impls::SimulatedFactory;
use turnpike_core::{AppBuilder, ServiceConfig, api};

#[derive(Parser, Debug)]
#[command(name = "turnpike", about = "Challenge solving service", version)]
struct Cli {
    #[arg(long, env = "TURNPIKE_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "TURNPIKE_PORT", default_value_t = turnpike_core::config::DEFAULT_PORT)]
    port: u16,

    /// worker（ブラウザ）の数
    #[arg(
        long = "thread",
        visible_alias = "workers",
        env = "TURNPIKE_WORKERS",
        default_value_t = turnpike_core::config::DEFAULT_WORKERS
    )]
    workers: usize,

    /// ブラウザを表示して起動する
    #[arg(long, env = "TURNPIKE_HEADED")]
    headed: bool,

    #[arg(long, env = "TURNPIKE_DEBUG")]
    debug: bool,

    /// `/solve` を保護する key（未設定なら保護しない）
    #[arg(long, env = "API_KEY")]
    api_key: Option<String>,

    /// 1 タスクあたりの solve 予算（秒）
    #[arg(long, env = "TURNPIKE_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// simulated backend が token を返すまでの poll 回数
    #[arg(long, env = "TURNPIKE_SIM_POLLS", default_value_t = 3)]
    sim_polls: u32,
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            host: self.host.clone(),
            port: self.port,
            workers: self.workers,
            headless: !self.headed,
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            solve_timeout: Duration::from_secs(self.timeout),
            ..Default::default()
        }
    }
}

/// `RUST_LOG` があればそれを優先。無ければ `--debug` で debug、通常は info。
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let config = cli.service_config();

    info!(
        host = %config.host,
        port = config.port,
        workers = config.workers,
        headless = config.headless,
        solve_timeout_secs = config.solve_timeout.as_secs(),
        "starting turnpike"
    );

    // (A) worker プールを起動してから App を組み立てる（listen より先）
    warn!(
        sim_polls = cli.sim_polls,
        "simulated solver backend is active: tokens are fake (sim-...), not real challenge solutions"
    );
    let factory = SimulatedFactory::new().solving_after(cli.sim_polls);
    let app = AppBuilder::new(config.clone())
        .factory(factory)
        .build()
        .await
        .context("failed to build app")?;

    // (B) 保持期間切れ record の回収
    let reaper = app.spawn_reaper();

    // (C) HTTP
    let router = api::routes(app.clone()).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(addr = %listener.local_addr()?, pool_size = app.pool().size(), "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // (D) 後始末
    reaper.abort();
    app.shutdown().await;
    Ok(())
}
