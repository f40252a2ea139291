use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

use supercrawl::api::create_app;
use supercrawl::client::CrawlClient;
use supercrawl::config::Config;
use supercrawl::csv_export::write_csv;
use supercrawl::data_models::CrawlRequest;
use supercrawl::lifecycle::{Phase, Session};

#[derive(Parser, Debug)]
#[command(name = "supercrawl", version, about = "Submit crawl jobs to a hosted crawl API and export the results")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the crawl form and its JSON API
    Serve {
        /// Listen address, overrides SUPERCRAWL_BIND
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Directory holding index.html, overrides SUPERCRAWL_STATIC_DIR
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Run a single crawl and print the result as JSON
    Crawl {
        url: String,

        #[arg(short, long, default_value = "")]
        instructions: String,

        /// Also write extracted records to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // fmt().init() also installs the log -> tracing bridge
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let client = Arc::new(CrawlClient::new(&config.api).context("failed to build crawl client")?);

    match cli.command {
        Command::Serve { bind, static_dir } => {
            let bind = bind.unwrap_or(config.bind_addr);
            let static_dir = static_dir.unwrap_or(config.static_dir);
            serve(client, bind, static_dir).await
        }
        Command::Crawl {
            url,
            instructions,
            csv,
        } => crawl_once(client, url, instructions, csv).await,
    }
}

async fn serve(client: Arc<CrawlClient>, bind: SocketAddr, static_dir: PathBuf) -> anyhow::Result<()> {
    let session = Arc::new(Session::new(client.clone()));
    let app = create_app(session, &static_dir);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(
        "serving on http://{bind} (pages from {}, crawl api {})",
        static_dir.display(),
        client.endpoint()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("server error")?;
    Ok(())
}

async fn crawl_once(
    client: Arc<CrawlClient>,
    url: String,
    instructions: String,
    csv: Option<PathBuf>,
) -> anyhow::Result<()> {
    let request = CrawlRequest::new(url, instructions)?;
    let session = Session::new(client);
    let mut handle = session.submit(request);

    let mut ticks = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            res = &mut handle => {
                res.context("crawl task panicked")?;
                break;
            }
            _ = ticks.tick() => {
                eprint!("\rcrawling... {:>3}%", session.snapshot().progress);
            }
        }
    }

    let state = session.snapshot();
    eprintln!("\rcrawling... {:>3}%", state.progress);

    match (state.phase, state.result) {
        (Phase::Success, Some(result)) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(path) = csv {
                match result.data.as_deref() {
                    Some(records) => write_csv(records, &path)?,
                    None => tracing::warn!("crawl returned no structured data, skipping csv"),
                }
            }
            Ok(())
        }
        _ => bail!(state.error.unwrap_or_else(|| "crawl did not complete".to_string())),
    }
}
