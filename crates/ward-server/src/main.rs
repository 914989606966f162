use clap::Parser;
use ward_server::ServerBuilder;
use ward_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};

#[derive(Debug, Parser)]
#[command(name = "ward-station", version, about = "Inpatient ward operations server")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<String>,
}

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    CliArgument,
    EnvironmentVariable,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (WARD_STATION_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    let args = Args::parse();
    let (config_path, source) = resolve_config_path(args.config);

    // Only an explicitly named file has to exist.
    let explicit = match source {
        ConfigSource::Default => None,
        _ => Some(config_path.as_str()),
    };
    let cfg = match load_config(explicit) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    ward_server::init_tracing(&cfg.logging);
    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );

    let server = ServerBuilder::new().with_config(cfg).build();
    server.run().await
}

/// Priority order: `--config`, then `WARD_STATION_CONFIG`, then the default path.
fn resolve_config_path(cli: Option<String>) -> (String, ConfigSource) {
    if let Some(path) = cli {
        return (path, ConfigSource::CliArgument);
    }
    if let Ok(path) = std::env::var("WARD_STATION_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }
    (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
}
