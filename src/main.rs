//! Intake Relay binary - composition root.
//!
//! 1. Load and validate configuration
//! 2. Connect to Redis for sessions and message claims
//! 3. Build the chat platform client and the field extractor
//! 4. Wire the engine, escalation pipeline, and dispatcher
//! 5. Serve the webhook until Ctrl-C or SIGTERM, then drain in-flight events

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio_util::task::TaskTracker;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use intake_relay::adapters::extractor::{LabelledFieldExtractor, LlmExtractorConfig, LlmFieldExtractor};
use intake_relay::adapters::http::{webhook_routes, WebhookState};
use intake_relay::adapters::lark::{LarkChatPlatform, LarkConfig};
use intake_relay::adapters::redis::{RedisMessageDeduper, RedisSessionStore};
use intake_relay::application::{
    ConversationEngine, DispatchTimeouts, EngineTimeouts, EscalationPipeline, EscalationTimeouts,
    InboundDispatcher, SessionLocks,
};
use intake_relay::config::{AppConfig, ExtractorConfig, ExtractorProvider, ServerConfig};
use intake_relay::domain::intake::FieldSchema;
use intake_relay::ports::{ChatPlatform, ExtractionError, FieldExtractor, MessageDeduper, SessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "starting intake-relay"
    );

    let schema = Arc::new(config.intake.schema()?);
    let triggers = Arc::new(config.intake.triggers());

    // Redis
    let client = redis::Client::open(config.redis.url.as_str())?;
    let conn = tokio::time::timeout(config.redis.timeout(), client.get_multiplexed_tokio_connection()).await??;
    let store: Arc<dyn SessionStore> = Arc::new(RedisSessionStore::new(
        conn.clone(),
        config.redis.session_key_prefix.clone(),
        config.redis.session_ttl_secs,
    ));
    let deduper: Arc<dyn MessageDeduper> = Arc::new(RedisMessageDeduper::new(
        conn,
        config.redis.dedup_key_prefix.clone(),
        config.redis.dedup_ttl_secs,
    ));
    tracing::info!("connected to redis");

    // Chat platform and extractor
    let platform_config = &config.platform;
    let platform: Arc<dyn ChatPlatform> = Arc::new(LarkChatPlatform::new(
        LarkConfig::new(
            platform_config.base_url.clone(),
            platform_config.app_id.clone(),
            platform_config.app_secret.expose_secret().clone(),
        )
        .with_timeout(platform_config.call_timeout()),
    )?);
    let extractor = build_extractor(&config.extractor, &schema)?;
    tracing::info!(extractor = extractor.name(), fields = schema.fields().len(), "intake configured");

    // Application
    let engine = ConversationEngine::new(
        Arc::clone(&store),
        extractor,
        Arc::clone(&schema),
        Arc::clone(&triggers),
    )
    .with_timeouts(EngineTimeouts {
        extractor: config.extractor.timeout(),
        store: config.redis.timeout(),
    });
    let pipeline = EscalationPipeline::new(
        Arc::clone(&platform),
        Arc::clone(&store),
        schema,
        platform_config.handoff_chat_id.clone(),
    )
    .with_timeouts(EscalationTimeouts {
        platform: platform_config.call_timeout(),
        store: config.redis.timeout(),
    });

    let locks = Arc::new(SessionLocks::new(config.intake.lock_idle()));
    spawn_lock_sweeper(Arc::clone(&locks), config.intake.lock_idle());

    let dispatcher = InboundDispatcher::new(
        deduper,
        locks,
        store,
        Arc::new(engine),
        Arc::new(pipeline),
        platform,
        triggers,
    )
    .with_timeouts(DispatchTimeouts {
        store: config.redis.timeout(),
        platform: platform_config.call_timeout(),
    });

    // HTTP
    let tracker = TaskTracker::new();
    let state = WebhookState::new(
        Arc::new(dispatcher),
        platform_config.verification_token(),
        tracker.clone(),
    );
    let app = webhook_routes(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "webhook listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracker.close();
    let grace = config.server.shutdown_grace();
    if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
        tracing::warn!(remaining = tracker.len(), ?grace, "shutdown grace elapsed with events in flight");
    }

    tracing::info!("intake-relay stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if server.json_logs() {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

fn build_extractor(
    config: &ExtractorConfig,
    schema: &FieldSchema,
) -> Result<Arc<dyn FieldExtractor>, ExtractionError> {
    match config.provider {
        ExtractorProvider::Labelled => Ok(Arc::new(LabelledFieldExtractor::new(schema.clone()))),
        ExtractorProvider::Llm => {
            let api_key = config
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().clone())
                .unwrap_or_default();
            let llm = LlmExtractorConfig::new(
                api_key,
                config.base_url.clone().unwrap_or_default(),
                config.model.clone().unwrap_or_default(),
            )
            .with_temperature(config.temperature)
            .with_timeout(config.timeout());
            Ok(Arc::new(LlmFieldExtractor::new(llm, schema.clone())?))
        }
    }
}

/// Drops idle session locks even when traffic is too low to trigger a sweep.
fn spawn_lock_sweeper(locks: Arc<SessionLocks>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            locks.evict_idle();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining");
}
