use clap::{Parser, Subcommand};
use ojs_harvest::config::{self, HarvestConfig};
use ojs_harvest::engine::{Engine, EngineSettings};
use ojs_harvest::imaging::PdfiumRasterizer;
use ojs_harvest::journal::JournalClient;
use ojs_harvest::storage::LocalFs;
use ojs_harvest::transport::ReqwestTransport;
use ojs_harvest::{harvest, output};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "ojs-harvest")]
#[command(about = "Harvest OJS journal articles into repository-ready records")]
#[command(long_about = "\
Harvest OJS journal articles into repository-ready records

For every article of every issue, ojs-harvest collects:

  metadata   Dublin Core from the journal's OAI-PMH endpoint (GetRecord)
  original   the first reachable hosted galley (PDF, HTML download, or a
             locally downloaded file when nothing else works)
  thumbnail  a 159px IIIF image-service rendering, a local page-one render
             of a downloaded file, or the journal's default thumbnail

Output, per journal:

  output/<journal>/
  ├── issues.csv
  ├── articles.csv
  ├── originals/      # downloaded files
  └── thumbnails/     # local renders

Logging goes to stderr and honours RUST_LOG.

Run 'ojs-harvest gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest issues, articles and bundles of a journal
    Harvest {
        /// Journal name from the [journals] table
        #[arg(long)]
        journal: String,
    },
    /// Write issues.csv only
    Issues {
        /// Journal name from the [journals] table
        #[arg(long)]
        journal: String,
    },
    /// Validate the config file without harvesting
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Harvest { journal: name } => {
            let config = config::load_config(&cli.config)?;
            let journal = config.journal(&name)?;
            let settings = EngineSettings::from_config(&config, &name)?;
            init_thread_pool(&config.processing);

            let transport = ReqwestTransport::new()?;
            let rasterizer = PdfiumRasterizer::new(config.thumbnails.pdfium_library.clone());
            let engine = Engine::new(&transport, &LocalFs, &rasterizer, &settings);
            let client = JournalClient::new(&transport, &journal.url, &journal.token);

            println!("==> Harvesting {} \u{2192} {}", name, settings.output_dir.display());
            let report = harvest::harvest_journal(
                &client,
                &engine,
                &journal.journal_title,
                config.harvest.empty_bundle,
            )?;

            let issues_csv = output::write_issues(&LocalFs, &settings.output_dir, &report.issues)?;
            let articles_csv =
                output::write_articles(&LocalFs, &settings.output_dir, &report.articles.rows)?;
            output::print_harvest_report(&report, &[issues_csv, articles_csv]);
        }
        Command::Issues { journal: name } => {
            let config = config::load_config(&cli.config)?;
            let journal = config.journal(&name)?;
            let output_dir = journal.output_dir(&name);

            let transport = ReqwestTransport::new()?;
            let client = JournalClient::new(&transport, &journal.url, &journal.token);
            let rows = harvest::collect_issues(&client, &journal.journal_title)?;

            let path = output::write_issues(&LocalFs, &output_dir, &rows)?;
            output::print_issues(&rows);
            println!("\u{2192} {}", path.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.config.display());
            let config = config::load_config(&cli.config)?;
            print_journals(&config);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores; config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    info!(threads, "article workers");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn print_journals(config: &HarvestConfig) {
    if config.journals.is_empty() {
        println!("    no journals configured");
    }
    for (name, journal) in &config.journals {
        println!("    {} \u{2192} {}", name, journal.url);
        println!("        OAI: {}", journal.oai_endpoint());
        println!("        Output: {}", journal.output_dir(name).display());
    }
}
