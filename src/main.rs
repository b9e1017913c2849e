use clap::{Parser, Subcommand};
use img_squeeze::config::{self, LogFormat, LoggingConfig};
use img_squeeze::event::{self, EventRequest};
use img_squeeze::form::{FormRules, FormUpload, UploadForm};
use img_squeeze::imaging::DEFAULT_QUALITY;
use img_squeeze::{http, output};
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "img-squeeze")]
#[command(about = "Size-aware JPEG compression service")]
#[command(long_about = "\
Size-aware JPEG compression service

Uploads are decoded, downscaled and re-encoded as JPEG. The upload's byte
size picks the limits:

  > 1 MiB   longer edge capped at 1600px (else 2048px)
  > 3 MiB   quality lowered by 10, never below 60

Quality (compress_size) must be between 60 and 100; default 70.

Entry points:
  serve     HTTP API (POST /compress, multipart field `image`)
  invoke    one serverless event envelope, stdin → stdout
  compress  a local file

Run 'img-squeeze gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stock defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Listen address, overriding server.bind
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Handle one event envelope and print the response envelope
    Invoke {
        /// Event JSON file (stdin when omitted)
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Compress a local image file
    Compress {
        input: PathBuf,
        /// JPEG quality, 60-100
        #[arg(long, default_value_t = DEFAULT_QUALITY)]
        quality: i64,
        /// Output path (defaults to INPUT with a .compressed.jpg extension)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Serve { bind } => {
            let mut service_config = setup(config_path)?;
            if let Some(bind) = bind {
                service_config.server.bind = bind;
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(http::serve(&service_config.server))?;
        }
        Command::Invoke { event } => {
            setup(config_path)?;
            let raw = match event {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let request: EventRequest = serde_json::from_str(&raw)?;
            let response = event::handle_event(&request);
            println!("{}", serde_json::to_string(&response)?);
        }
        Command::Compress {
            input,
            quality,
            output: output_path,
        } => {
            setup(config_path)?;
            let output_path = output_path.unwrap_or_else(|| default_output_path(&input));
            let form = UploadForm {
                image: Some(FormUpload {
                    filename: input
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned()),
                    bytes: std::fs::read(&input)?,
                }),
                compress_size: Some(quality.to_string()),
                return_url: None,
            };
            let result = form.into_request(FormRules::HTTP)?.compress()?;
            std::fs::write(&output_path, &result.encoded_bytes)?;
            output::print_compress_output(&result, quality, &input, &output_path);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config and install logging.
fn setup(config_path: Option<&Path>) -> Result<config::ServiceConfig, Box<dyn std::error::Error>> {
    let service_config = config::load_config(config_path)?;
    init_tracing(&service_config.logging)?;
    Ok(service_config)
}

/// Install the global subscriber. `RUST_LOG` overrides the configured filter.
///
/// Logs go to stderr so `invoke` output stays a clean JSON document.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.filter))?;
    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("compressed.jpg")
}
