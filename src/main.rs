use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use vignette::config::ServiceConfig;
use vignette::imaging::RustCodec;
use vignette::serve::{ImageRequest, ImageService, Outcome, RequestOrigin};

#[derive(Parser)]
#[command(name = "vignette")]
#[command(about = "On-demand image resize cache")]
#[command(long_about = "\
On-demand image resize cache

Renders a fill-cropped variant of a source image at the requested size,
caches it in the cache directory, and serves repeated requests from disk.
Stale variants are evicted automatically when the source image changes;
the whole cache is swept on a configurable interval.

This binary is the thin glue around the vignette library: it runs one
request per invocation. Embed the library behind your HTTP server of
choice to serve requests online.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); defaults apply when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render (or fetch from cache) one variant and write its bytes
    Render {
        /// Source image path, resolved under the configured source root
        src: String,
        /// Target width; defaults to the configured width
        #[arg(short, long)]
        width: Option<u32>,
        /// Target height; derived from the source aspect ratio when omitted
        #[arg(long)]
        height: Option<u32>,
        /// Write variant bytes here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete every cached variant and reset the sweep marker
    Clear,
}

fn load_config(path: Option<&PathBuf>) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(ServiceConfig::load(path)?),
        None => Ok(ServiceConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vignette=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let service = ImageService::new(config, RustCodec::new())?;

    match cli.command {
        Command::Render {
            src,
            width,
            height,
            output,
        } => {
            let request = ImageRequest {
                src,
                width,
                height,
                clear: false,
            };
            match service.handle(&request, RequestOrigin::default())? {
                Outcome::Image(served) => {
                    for (name, value) in served.headers() {
                        eprintln!("{name}: {value}");
                    }
                    match output {
                        Some(path) => std::fs::write(path, &served.bytes)?,
                        None => std::io::stdout().write_all(&served.bytes)?,
                    }
                }
                Outcome::Cleared { .. } => unreachable!("render request never clears"),
            }
        }
        Command::Clear => {
            let deleted = service.force_clear()?;
            eprintln!("cleared {deleted} cache files");
        }
    }
    Ok(())
}
