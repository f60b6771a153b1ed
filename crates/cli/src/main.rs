//! Watertrace CLI - flow-path traversability of watershed rasters

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use watertrace_algorithms::hydrology::{
    traversability, RunSummary, StatusCode, TraversabilityInputs, TraversabilityParams,
};
use watertrace_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use watertrace_core::Raster;
use watertrace_parallel::ProcessingMode;

/// Georeference tolerance, in map units, when comparing input grids
const ALIGNMENT_TOLERANCE: f64 = 1e-6;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "watertrace")]
#[command(author, version, about = "Flow-path traversability of watershed rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Trace every cell of one watershed and write the six output grids
    Trace {
        /// Land cover raster (class codes)
        land_cover: PathBuf,
        /// D8 flow direction raster
        flow_direction: PathBuf,
        /// Corridor mask raster (non-zero = analysed)
        corridor: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Prefix prepended to every output file name
        #[arg(short, long, default_value = "")]
        prefix: String,
        #[command(flatten)]
        run: RunOptions,
    },
    /// Run every basin/year pair listed in a JSON batch file
    Batch {
        /// Batch configuration file
        config: PathBuf,
        /// Worker threads (0 = all cores, 1 = sequential)
        #[arg(short, long, default_value = "0")]
        threads: usize,
    },
}

#[derive(Args)]
struct RunOptions {
    /// JSON file with traversability parameters
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Longest traced path in cells
    #[arg(long)]
    max_flow_length: Option<usize>,
    /// Fraction of buildup removed per forest cell
    #[arg(long)]
    removal_rate_forest: Option<f64>,
    /// Fraction of buildup removed per other natural cell
    #[arg(long)]
    removal_rate_nonforest: Option<f64>,
    /// Report paths leaving through the first row as off-grid
    #[arg(long)]
    strict_north_edge: bool,
    /// Worker threads (0 = all cores, 1 = sequential)
    #[arg(short, long, default_value = "0")]
    threads: usize,
}

impl RunOptions {
    fn params(&self) -> Result<TraversabilityParams> {
        let mut params = match &self.config {
            Some(path) => load_json::<TraversabilityParams>(path)?,
            None => TraversabilityParams::default(),
        };
        if let Some(v) = self.max_flow_length {
            params.max_flow_length = v;
        }
        if let Some(v) = self.removal_rate_forest {
            params.removal_rate_forest = v;
        }
        if let Some(v) = self.removal_rate_nonforest {
            params.removal_rate_nonforest = v;
        }
        if self.strict_north_edge {
            params.wrap_north_edge = false;
        }
        params.mode = ProcessingMode::from_threads(self.threads);
        params.validate().context("Invalid parameters")?;
        Ok(params)
    }
}

// ─── Batch configuration ────────────────────────────────────────────────

/// A list of basins and years run with shared parameters. Paths may use
/// `{basin}` and `{year}` placeholders.
#[derive(Debug, Deserialize)]
struct BatchConfig {
    #[serde(deserialize_with = "labels")]
    basins: Vec<String>,
    #[serde(deserialize_with = "labels")]
    years: Vec<String>,
    land_cover: String,
    flow_direction: String,
    corridor: String,
    out_dir: String,
    #[serde(default = "default_prefix")]
    prefix: String,
    #[serde(default)]
    params: TraversabilityParams,
}

/// A basin or year written either as a string or a bare number
#[derive(Deserialize)]
#[serde(untagged)]
enum Label {
    Text(String),
    Integer(i64),
}

fn labels<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<Label>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|label| match label {
            Label::Text(text) => text,
            Label::Integer(n) => n.to_string(),
        })
        .collect())
}

fn default_prefix() -> String {
    "{basin}_{year}_".to_string()
}

/// Input and output locations of one run
#[derive(Debug, Clone, PartialEq)]
struct RunPaths {
    land_cover: PathBuf,
    flow_direction: PathBuf,
    corridor: PathBuf,
    out_dir: PathBuf,
    prefix: String,
}

impl RunPaths {
    fn output(&self, layer: &str) -> PathBuf {
        self.out_dir.join(format!("{}{}.tif", self.prefix, layer))
    }
}

impl BatchConfig {
    /// Every basin/year pair, basins outermost
    fn runs(&self) -> Vec<(String, String, RunPaths)> {
        let mut runs = Vec::with_capacity(self.basins.len() * self.years.len());
        for basin in &self.basins {
            for year in &self.years {
                let fill = |template: &str| {
                    template.replace("{basin}", basin).replace("{year}", year)
                };
                let paths = RunPaths {
                    land_cover: fill(&self.land_cover).into(),
                    flow_direction: fill(&self.flow_direction).into(),
                    corridor: fill(&self.corridor).into(),
                    out_dir: fill(&self.out_dir).into(),
                    prefix: fill(&self.prefix),
                };
                runs.push((basin.clone(), year.clone(), paths));
            }
        }
        runs
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_layer(path: &Path, name: &str) -> Result<Raster<i32>> {
    let raster: Raster<i32> = read_geotiff(path)
        .with_context(|| format!("Failed to read {} raster {}", name, path.display()))?;
    info!("{}: {} x {}", name, raster.cols(), raster.rows());
    Ok(raster)
}

fn read_inputs(paths: &RunPaths) -> Result<TraversabilityInputs> {
    let pb = spinner("Reading rasters...");
    let land_cover = read_layer(&paths.land_cover, "land cover")?;
    let flow_direction = read_layer(&paths.flow_direction, "flow direction")?;
    let corridor = read_layer(&paths.corridor, "corridor mask")?;
    pb.finish_and_clear();

    for (name, other) in [("flow direction", &flow_direction), ("corridor mask", &corridor)] {
        if !land_cover
            .transform()
            .is_aligned_with(other.transform(), ALIGNMENT_TOLERANCE)
        {
            warn!("{} georeference differs from land cover; cells are matched by index", name);
        }
    }

    TraversabilityInputs::new(land_cover, flow_direction, corridor)
        .context("Input rasters are not aligned")
}

fn report(summary: &RunSummary) {
    println!("  Traced cells: {} ({} excluded)", summary.traced(), summary.excluded);
    println!("  Reached water: {}", summary.water_reached);
    for status in StatusCode::ALL {
        let count = summary.status(status);
        if count > 0 {
            println!("  {} ({}): {}", status.label(), status.code(), count);
        }
    }
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Read, trace and write one watershed
fn run_traversability(paths: &RunPaths, params: &TraversabilityParams) -> Result<RunSummary> {
    let inputs = read_inputs(paths)?;

    let start = Instant::now();
    let pb = spinner("Tracing flow paths...");
    let run = traversability(&inputs, params).context("Traversability run failed")?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    fs::create_dir_all(&paths.out_dir)
        .with_context(|| format!("Failed to create {}", paths.out_dir.display()))?;
    let pb = spinner("Writing outputs...");
    for (name, layer) in run.outputs.layers() {
        let path = paths.output(name);
        write_geotiff(layer, &path, &GeoTiffOptions::default())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    pb.finish_and_clear();

    done("Traversability", &paths.out_dir, elapsed);
    Ok(run.summary)
}

/// Run every pair, logging failures and carrying on. Returns the number of
/// failed pairs.
fn run_batch(config: &BatchConfig, mode: ProcessingMode) -> Result<usize> {
    let params = TraversabilityParams {
        mode,
        ..config.params.clone()
    };
    params.validate().context("Invalid batch parameters")?;

    let mut failed = 0;
    for (basin, year, paths) in config.runs() {
        info!(basin = %basin, year = %year, "starting run");
        match run_traversability(&paths, &params) {
            Ok(summary) => report(&summary),
            Err(e) => {
                error!(basin = %basin, year = %year, "run failed: {:#}", e);
                failed += 1;
            }
        }
    }
    Ok(failed)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_layer(&input, "input")?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Trace ────────────────────────────────────────────────────
        Commands::Trace {
            land_cover,
            flow_direction,
            corridor,
            out_dir,
            prefix,
            run,
        } => {
            let params = run.params()?;
            let paths = RunPaths {
                land_cover,
                flow_direction,
                corridor,
                out_dir,
                prefix,
            };
            let summary = run_traversability(&paths, &params)?;
            report(&summary);
        }

        // ── Batch ────────────────────────────────────────────────────
        Commands::Batch { config, threads } => {
            let batch: BatchConfig = load_json(&config)?;
            let total = batch.basins.len() * batch.years.len();
            let failed = run_batch(&batch, ProcessingMode::from_threads(threads))?;
            println!("Batch finished: {} of {} runs succeeded", total - failed, total);
            if failed > 0 {
                anyhow::bail!("{} of {} runs failed", failed, total);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use watertrace_core::io::read_geotiff;

    fn write_layer(path: &Path, rows: &[&[i32]]) {
        let raster = Raster::from_rows(rows).unwrap();
        write_geotiff(&raster, path, &GeoTiffOptions::default()).unwrap();
    }

    #[test]
    fn test_batch_config_expands_templates() {
        let config: BatchConfig = serde_json::from_str(
            r#"{
                "basins": ["Esopus", "Rondout"],
                "years": ["1996", "2016"],
                "land_cover": "inputs/{basin}/{basin}_{year}_lc.tif",
                "flow_direction": "inputs/{basin}/{basin}_fdr.tif",
                "corridor": "inputs/{basin}/{basin}_mask.tif",
                "out_dir": "outputs/{basin}",
                "params": { "removal_rate_forest": 0.9 }
            }"#,
        )
        .unwrap();

        let runs = config.runs();
        assert_eq!(runs.len(), 4);
        let (basin, year, paths) = &runs[1];
        assert_eq!((basin.as_str(), year.as_str()), ("Esopus", "2016"));
        assert_eq!(paths.land_cover, PathBuf::from("inputs/Esopus/Esopus_2016_lc.tif"));
        assert_eq!(paths.flow_direction, PathBuf::from("inputs/Esopus/Esopus_fdr.tif"));
        assert_eq!(paths.prefix, "Esopus_2016_");
        assert_eq!(
            paths.output("hydist"),
            PathBuf::from("outputs/Esopus/Esopus_2016_hydist.tif")
        );
        assert_eq!(config.params.removal_rate_forest, 0.9);
        assert_eq!(config.params.max_flow_length, 10);
    }

    #[test]
    fn test_batch_config_accepts_numeric_years() {
        let config: BatchConfig = serde_json::from_str(
            r#"{
                "basins": ["Esopus", 7],
                "years": [1996, 2001, "2016"],
                "land_cover": "{basin}_{year}_lc.tif",
                "flow_direction": "{basin}_fdr.tif",
                "corridor": "{basin}_mask.tif",
                "out_dir": "out"
            }"#,
        )
        .unwrap();

        assert_eq!(config.years, vec!["1996", "2001", "2016"]);
        assert_eq!(config.basins, vec!["Esopus", "7"]);
        let runs = config.runs();
        assert_eq!(runs.len(), 6);
        assert_eq!(runs[0].2.land_cover, PathBuf::from("Esopus_1996_lc.tif"));
        assert_eq!(runs[0].2.prefix, "Esopus_1996_");
    }

    #[test]
    fn test_run_writes_six_layers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths {
            land_cover: dir.path().join("lc.tif"),
            flow_direction: dir.path().join("fdr.tif"),
            corridor: dir.path().join("mask.tif"),
            out_dir: dir.path().join("out"),
            prefix: "test_".to_string(),
        };
        write_layer(&paths.land_cover, &[&[8, 6, 21], &[8, 8, 21]]);
        write_layer(&paths.flow_direction, &[&[1, 1, 1], &[1, 1, 1]]);
        write_layer(&paths.corridor, &[&[1, 1, 1], &[1, 1, 1]]);

        let params = TraversabilityParams {
            mode: ProcessingMode::Sequential,
            ..TraversabilityParams::default()
        };
        let summary = run_traversability(&paths, &params).unwrap();
        assert_eq!(summary.water_reached, 4);

        let hydist: Raster<i32> = read_geotiff(paths.output("hydist")).unwrap();
        assert_eq!(hydist.get(0, 0).unwrap(), 2);
        assert_eq!(hydist.get(0, 2).unwrap(), 999);
        assert_eq!(hydist.nodata(), Some(999));

        let widest: Raster<i32> = read_geotiff(paths.output("buffwidmax")).unwrap();
        assert_eq!(widest.nodata(), Some(-999));
        assert_eq!(widest.get(1, 1).unwrap(), 2);

        let ag: Raster<i32> = read_geotiff(paths.output("buildup_ag")).unwrap();
        assert_eq!(ag.get(0, 1).unwrap(), 2);
        for name in ["buffwid", "buildup_urban", "buildup_ag_and_urban"] {
            assert!(paths.output(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        write_layer(&dir.path().join("good_lc.tif"), &[&[8, 21]]);
        write_layer(&dir.path().join("good_fdr.tif"), &[&[1, 1]]);
        write_layer(&dir.path().join("good_mask.tif"), &[&[1, 1]]);
        let config = BatchConfig {
            basins: vec!["missing".to_string(), "good".to_string()],
            years: vec!["2016".to_string()],
            land_cover: format!("{root}/{{basin}}_lc.tif"),
            flow_direction: format!("{root}/{{basin}}_fdr.tif"),
            corridor: format!("{root}/{{basin}}_mask.tif"),
            out_dir: format!("{root}/out"),
            prefix: default_prefix(),
            params: TraversabilityParams::default(),
        };

        let failed = run_batch(&config, ProcessingMode::Sequential).unwrap();
        assert_eq!(failed, 1);
        assert!(dir.path().join("out/good_2016_hydist.tif").exists());
        assert!(!dir.path().join("out/missing_2016_hydist.tif").exists());
    }

    #[test]
    fn test_run_options_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, r#"{ "max_flow_length": 30, "removal_rate_forest": 0.9 }"#).unwrap();

        let options = RunOptions {
            config: Some(path),
            max_flow_length: None,
            removal_rate_forest: Some(0.5),
            removal_rate_nonforest: None,
            strict_north_edge: true,
            threads: 1,
        };
        let params = options.params().unwrap();
        assert_eq!(params.max_flow_length, 30);
        assert_eq!(params.removal_rate_forest, 0.5);
        assert!(!params.wrap_north_edge);
        assert_eq!(params.mode, ProcessingMode::Sequential);

        let bad = RunOptions {
            config: None,
            max_flow_length: None,
            removal_rate_forest: Some(2.0),
            removal_rate_nonforest: None,
            strict_north_edge: false,
            threads: 0,
        };
        assert!(bad.params().is_err());
    }
}
