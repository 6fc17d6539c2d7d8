//! ISL Motif Search CLI
//!
//! Usage:
//!   find-motifs single --constellation kuiper_p1 --max-isl-length 5440 --workers 8
//!   find-motifs multi  --constellation 40_40_53deg --max-isl-length 5014 \
//!                      --levels 0,18,36,90 --baseline baseline_config.txt

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use constellation_store::loader::{load_baseline, load_store};
use constellation_store::{ConstellationConfig, ConstellationStore, DataLayout};
use motif_search::{
    improvement_percent, LatitudeZone, ReportWriter, RunSummary, SearchDriver, ZoneAssembler,
    DEFAULT_LEVELS,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "find-motifs",
    about = "Search ISL motifs for a satellite constellation",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding constellation and city inputs
    #[arg(long, global = true, default_value = "../input_data")]
    input_dir: PathBuf,

    /// Directory results are appended under
    #[arg(long, global = true, default_value = "../output_data_generated")]
    output_dir: PathBuf,

    /// City pair file name under data_cities/
    #[arg(long, global = true, default_value = "city_pairs_rand_5K.txt")]
    city_pairs: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Constellation identifier (40_40_53deg, kuiper_p1, starlink_p1)
    #[arg(short, long)]
    constellation: String,

    /// Maximum ISL length selecting the candidate link set, e.g. 5014
    #[arg(short = 'l', long)]
    max_isl_length: String,

    /// Motifs evaluated concurrently [default: available cores]
    #[arg(short, long)]
    workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Best single motif for the whole constellation, seeded at satellite 0
    Single(SearchArgs),
    /// Zone-by-zone motif assembly compared against a baseline motif
    Multi {
        #[command(flatten)]
        search: SearchArgs,

        /// Ascending latitude boundaries of the zones
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_LEVELS.to_vec())]
        levels: Vec<f64>,

        /// Baseline motif file under the input directory
        #[arg(long, default_value = "baseline_config.txt")]
        baseline: String,
    },
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

fn load(cli: &Cli, search: &SearchArgs) -> Result<(DataLayout, ConstellationStore)> {
    let constellation = ConstellationConfig::from_name(&search.constellation)?;
    let layout = DataLayout::new(&cli.input_dir, &search.constellation, &search.max_isl_length)
        .with_city_pairs(&cli.city_pairs);
    let store = load_store(&layout, constellation)
        .with_context(|| format!("loading inputs from {:?}", cli.input_dir))?;
    Ok((layout, store))
}

fn run_single(cli: &Cli, search: &SearchArgs) -> Result<()> {
    let (_, store) = load(cli, search)?;
    let driver = SearchDriver::new(&store, search.workers.unwrap_or_else(default_workers))?;
    let reports = ReportWriter::single(&cli.output_dir)?;

    let run = ZoneAssembler::new(&driver).single_motif()?;
    reports.write_single_metrics(&run.motifs)?;
    reports.write_single_best(&run.topology)?;

    let mut summary = RunSummary::new("single", &search.constellation, &search.max_isl_length, driver.workers());
    summary.best_metric = run.winner.metric();
    summary.final_metric = run.winner.metric();
    summary.isl_links = run.topology.isl_count();
    summary.winner = Some(run.winner);
    reports.write_summary(&summary)?;

    info!("\n{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    if let Some(winner) = &summary.winner {
        info!("Best motif:  {} {:?}", winner.index, winner.offsets);
    }
    info!("Metric:      {:.6}", summary.best_metric.unwrap_or_default());
    info!("ISLs:        {}", summary.isl_links);
    Ok(())
}

fn run_multi(cli: &Cli, search: &SearchArgs, levels: &[f64], baseline: &str) -> Result<()> {
    let zones = LatitudeZone::from_levels(levels)?;
    let (layout, store) = load(cli, search)?;
    let baseline_config = load_baseline(layout.baseline(baseline))?;
    let driver = SearchDriver::new(&store, search.workers.unwrap_or_else(default_workers))?;
    let reports = ReportWriter::multi(&cli.output_dir)?;
    let assembler = ZoneAssembler::new(&driver);

    let assembly = assembler.assemble(&zones, |report| reports.write_zone(report))?;
    reports.write_overall(&assembly.topology)?;

    let best = assembly
        .best_metric()
        .context("assembly produced no zone winner")?;
    let baseline_run = assembler.baseline(&baseline_config);
    let improvement = improvement_percent(baseline_run.metric(), best);
    reports.write_improvement(improvement)?;

    let mut summary = RunSummary::new("multi", &search.constellation, &search.max_isl_length, driver.workers());
    summary.baseline_metric = Some(baseline_run.metric());
    summary.best_metric = Some(best);
    summary.final_metric = Some(assembly.final_evaluation.score().metric);
    summary.improvement_percent = Some(improvement);
    summary.isl_links = assembly.topology.isl_count();
    summary.zones = assembly.zones;
    reports.write_summary(&summary)?;

    info!("\n{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    for zone in &summary.zones {
        info!(
            "  [{:>4}, {:>4}) {:5} seed {:>3}: motif {:?} metric {:.6}",
            zone.zone.lower,
            zone.zone.upper,
            zone.zone.color.to_string(),
            zone.seed,
            zone.winner.offsets,
            zone.winner.metric().unwrap_or_default()
        );
    }
    info!("Baseline metric: {:.6}", baseline_run.metric());
    info!("Best metric:     {:.6}", best);
    info!("Improvement:     {:.3}%", improvement);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("ISL Motif Search");
    info!("{}", "=".repeat(60));

    match &cli.command {
        Command::Single(search) => run_single(&cli, search),
        Command::Multi {
            search,
            levels,
            baseline,
        } => run_multi(&cli, search, levels, baseline),
    }
}
