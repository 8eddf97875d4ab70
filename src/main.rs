use std::{process, sync::Arc, time::Duration};

use stacks::{
    application::{
        collections::CollectionPageService,
        error::{AppError, PartialError},
        partials::{FragmentRequest, PartialDeps, PartialResolver, ProducerRegistry},
        queries::QueryBackends,
        repos::DocumentStore,
    },
    cache::{CacheConfig, FragmentCache},
    config,
    infra::{
        catalog::FixtureCatalog,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Resolve(args) => run_resolve(settings, args).await,
    }
}

struct ApplicationContext {
    resolver: PartialResolver,
    collections: Arc<CollectionPageService>,
}

async fn build_application_context(
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let catalog = Arc::new(FixtureCatalog::load(&settings.catalog.fixture_path).await?);
    let documents: Arc<dyn DocumentStore> = catalog.clone();

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(FragmentCache::new(&cache_config));

    let deps = PartialDeps {
        queries: QueryBackends {
            search: catalog.clone(),
            availability: catalog.clone(),
            trending: catalog.clone(),
            subjects: catalog.clone(),
        },
        fulltext: catalog,
        documents: documents.clone(),
        cache: cache.clone(),
        cache_config: cache_config.clone(),
    };
    let registry = Arc::new(ProducerRegistry::standard()?);

    info!(
        target = "stacks::bootstrap",
        components = ?registry.keys(),
        cache_capacity = cache_config.capacity,
        widget_cache = cache_config.enable_widget_cache,
        "fragment resolver ready"
    );

    Ok(ApplicationContext {
        resolver: PartialResolver::new(registry, deps),
        collections: Arc::new(CollectionPageService::new(
            documents,
            cache,
            cache_config.page_ttl(),
        )),
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let router = http::build_router(HttpState {
        resolver: app.resolver,
        collections: app.collections,
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "stacks::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "stacks::serve", "server stopped");
    Ok(())
}

async fn run_resolve(
    settings: config::Settings,
    args: config::ResolveArgs,
) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let request = FragmentRequest::from_query(args.params);

    let produced = app.resolver.resolve(&args.component, request).await?;
    if let Some(cache_control) = produced.cache_control {
        info!(target = "stacks::resolve", cache_control, "response caching hint");
    }

    let rendered = serde_json::to_string_pretty(&produced.payload).map_err(PartialError::from)?;
    println!("{rendered}");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, then bounds the drain by `grace`.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target = "stacks::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(target = "stacks::serve", error = %err, "failed to listen for SIGTERM");
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

    info!(
        target = "stacks::serve",
        grace_seconds = grace.as_secs(),
        "shutdown requested, draining connections"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        error!(target = "stacks::serve", "graceful shutdown timed out");
        process::exit(1);
    });
}
