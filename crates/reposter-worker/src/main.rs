//! Repost worker binary.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reposter_bot::{parse_guild_id, run_bot};
use reposter_media::{
    check_ffmpeg, check_ffprobe, check_ytdlp, BrowserRetriever, ComposerConfig, FfmpegComposer,
    Retriever, RetrieverKind, Transcoder, YtDlpRetriever,
};
use reposter_notify::{Notifier, WebhookNotifier};
use reposter_platform::{PlatformConfig, RetryConfig, TiktokClient, TiktokFeed};
use reposter_store::{spawn_credential_owner, CursorStore, EnvStore};
use reposter_worker::metrics::install_exporter;
use reposter_worker::{
    run_reminder, AccountSettings, Pipeline, PollSettings, Poller, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let store = EnvStore::from_env();
    dotenvy::from_path(store.path()).ok();

    init_tracing()?;
    info!(config_file = %store.path().display(), "Starting reposter");

    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        install_exporter(addr)?;
        info!(%addr, "Serving Prometheus metrics");
    }

    let settings = AccountSettings::load(&store).context("Missing required settings")?;
    let cursor = CursorStore::load(&store)
        .await
        .context("UPLOAD_CURSOR must hold the number of videos already handled")?;
    let guild_id = parse_guild_id(&settings.guild_id)?;
    info!(
        target_user = %settings.target_user,
        cursor = %cursor,
        session_id = %settings.session.masked(),
        "Loaded settings"
    );

    check_ffmpeg()?;
    check_ffprobe()?;

    let retriever: Arc<dyn Retriever> = match config.retriever {
        RetrieverKind::Browser => Arc::new(BrowserRetriever::new(
            config.webdriver_url.clone(),
            config.downloader_url.clone(),
        )),
        RetrieverKind::YtDlp => {
            check_ytdlp()?;
            Arc::new(YtDlpRetriever::new(config.transcode_timeout))
        }
    };
    let transcoder: Arc<dyn Transcoder> = Arc::new(FfmpegComposer::new(ComposerConfig {
        overlay_dir: config.overlay_dir.clone(),
        size_limit_kb: config.size_limit_kb,
        timeout: config.transcode_timeout,
        ..ComposerConfig::default()
    }));

    let platform_config = PlatformConfig::from_env()?;
    let feed = Arc::new(TiktokFeed::new(
        platform_config.clone(),
        RetryConfig::default().with_max_retries(config.feed_retries),
    )?);
    let platform = Arc::new(TiktokClient::new(platform_config));
    let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(settings.webhook_url.clone())?);

    let (credentials, owner) = spawn_credential_owner(settings.session.clone(), store.clone());

    let bot_credentials = credentials.clone();
    let bot_token = settings.bot_token.clone();
    tokio::spawn(async move {
        if let Err(e) = run_bot(&bot_token, guild_id, bot_credentials).await {
            error!(error = %e, "Operator bot stopped");
        }
    });

    tokio::spawn(run_reminder(
        Arc::clone(&notifier),
        settings.operator_id.clone(),
        config.reminder_interval,
    ));

    let pipeline = Arc::new(Pipeline {
        retriever,
        transcoder,
        platform,
        notifier,
        credentials,
        target_user: settings.target_user.clone(),
        operator_id: settings.operator_id.clone(),
    });
    let poller = Poller::new(
        feed,
        Arc::new(store),
        pipeline,
        PollSettings {
            target_user: settings.target_user,
            work_dir: config.work_dir,
            slideshow_policy: config.slideshow_policy,
            poll_interval: config.poll_interval,
        },
    );

    tokio::select! {
        _ = poller.run() => {}
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
    }

    owner.abort();
    if let Err(e) = owner.await {
        if !e.is_cancelled() {
            warn!(error = %e, "Credential owner ended abnormally");
        }
    }

    info!("Reposter shutdown complete");
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reposter=info".parse()?)
        .add_directive("serenity=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
    Ok(())
}
