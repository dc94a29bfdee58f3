use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing::{debug, error, info};

use packagist_harvest::archive::{Archiver, CommandDownloader, ReleaseSnapshot};
use packagist_harvest::config::HarvestConfig;
use packagist_harvest::enumerator::RankWindow;
use packagist_harvest::harvest::Harvester;
use packagist_harvest::logging;
use packagist_harvest::version::registries::PackagistRegistry;
use packagist_harvest::version::resolver::ComposerLatestResolver;

#[derive(Parser, Debug)]
#[command(name = "packagist-harvest")]
#[command(version, about = "Download the latest archives of the most popular Packagist packages")]
struct Cli {
    /// First popularity rank to download (0-based, inclusive)
    min_package: Option<u32>,

    /// Popularity rank to stop at (exclusive)
    max_package: Option<u32>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory archives are stored in
    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// Also copy this run's archives into a dated snapshot under this directory
    #[arg(long)]
    release_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (Some(min), Some(max)) = (cli.min_package, cli.max_package) else {
        println!("{}", Cli::command().render_usage());
        return Ok(());
    };

    let mut config = match &cli.config {
        Some(path) => HarvestConfig::load(path)?,
        None => HarvestConfig::default(),
    };
    if let Some(dir) = cli.archive_dir.clone() {
        config.archive_dir = Some(dir);
    }
    if let Some(dir) = cli.release_dir.clone() {
        config.release_dir = Some(dir);
    }

    let _guard = logging::init(
        logging::default_level(cli.verbose, cli.quiet),
        config.log_file.as_deref(),
    )?;
    debug!(?cli, "CLI arguments parsed");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(config, RankWindow::new(min, max)))
}

async fn run(config: HarvestConfig, window: RankWindow) -> anyhow::Result<()> {
    let run_date = chrono::Local::now().date_naive();

    let registry = PackagistRegistry::new(
        &config.registry.web_url,
        &config.registry.repo_url,
        Duration::from_millis(config.registry.fetch_timeout_ms),
    )?;
    let downloader = CommandDownloader::new(
        config.downloader.program.clone(),
        config.downloader.args.clone(),
    );

    let mut archiver = Archiver::new(config.archive_dir(), Arc::new(downloader));
    if let Some(release_root) = &config.release_dir {
        let release = ReleaseSnapshot::new(release_root, run_date, window);
        info!("Release snapshot: {:?}", release.dir());
        archiver = archiver.with_release_snapshot(release);
    }

    let harvester = Harvester::new(
        Arc::new(registry),
        Arc::new(ComposerLatestResolver::new(config.branch_priority.clone())),
        archiver,
        config.registry.per_page,
        run_date,
    );

    if let Err(e) = harvester.run(window).await {
        error!("Harvest aborted: {}", e);
        return Err(e.into());
    }
    Ok(())
}
