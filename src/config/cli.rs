use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Stacks binary.
#[derive(Debug, Parser)]
#[command(name = "stacks", version, about = "Stacks partial fragment server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "STACKS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Stacks HTTP service.
    Serve(Box<ServeArgs>),
    /// Resolve one fragment and print its JSON payload.
    Resolve(ResolveArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CatalogOverride {
    /// Override the fixture catalog file.
    #[arg(long = "catalog-fixture-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub fixture_path: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub catalog: CatalogOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the number of entries the fragment cache holds.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<u64>,

    /// Override the TTL of cached collection pages.
    #[arg(long = "cache-page-ttl-seconds", value_name = "SECONDS")]
    pub cache_page_ttl_seconds: Option<u64>,

    /// Override the TTL of memoized widget fragments.
    #[arg(long = "cache-widget-ttl-seconds", value_name = "SECONDS")]
    pub cache_widget_ttl_seconds: Option<u64>,

    /// Toggle widget fragment memoization.
    #[arg(
        long = "cache-enable-widget-cache",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enable_widget_cache: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub catalog: CatalogOverride,

    /// Component key, e.g. `CarouselLoadMore`.
    #[arg(value_name = "COMPONENT")]
    pub component: String,

    /// Request parameter as `key=value`; repeatable.
    #[arg(long = "param", short = 'p', value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("parameter key must not be empty in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
