use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use isopach::config::Config;
use isopach::macrostrat::{AgeBound, AgeRange, MacrostratClient};
use isopach::pipeline::{self, IsopachRequest, MeshDirectory, SectionLine};

#[derive(Parser, Debug)]
#[command(name = "isopach")]
#[command(about = "Stratigraphic surfaces and isopach maps from well tops and Macrostrat columns")]
#[command(version)]
struct CliArgs {
    /// JSON run configuration; built-in defaults are used when absent
    #[arg(long, global = true, env = "ISOPACH_CONFIG")]
    config: Option<PathBuf>,

    /// Fail instead of replacing existing output files
    #[arg(long, global = true)]
    no_overwrite: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interpolate one depth surface per formation from the well tops
    CreateSurfaces,
    /// Write per-well metadata and the basin outline to a GeoPackage
    SummarizeData,
    /// Map the thickness of Macrostrat units across columns
    IsopachMap {
        /// Output path; `.tif` also writes a thickness raster
        output: PathBuf,
        #[arg(long)]
        strat_name: Option<String>,
        /// Minimum (upper) age, in Ma or as an interval name
        #[arg(long)]
        min_age: Option<AgeBound>,
        /// Maximum (lower) age, in Ma or as an interval name
        #[arg(long)]
        max_age: Option<AgeBound>,
        /// Lithology to filter by
        #[arg(long)]
        lith: Option<String>,
        /// Polygon file to clip columns to
        #[arg(long)]
        bounds: Option<PathBuf>,
        #[arg(long, default_value_t = pipeline::isopach::DEFAULT_PROJECT_ID)]
        project_id: u32,
        /// Output EPSG code
        #[arg(long, default_value_t = 5070)]
        crs: u32,
    },
    /// Sample a model's rasters along the basin cross sections
    CrossSections {
        #[arg(default_value = "loop")]
        model: String,
    },
    /// Convert ASCII horizon grids to GeoTIFF elevations in metres
    ConvertGrids {
        #[arg(default_value = "data/grids_horizons")]
        input: PathBuf,
    },
    /// Grid the meshes of an external geological modeler
    ModelSurfaces {
        /// Directory shared with the modeling tool
        #[arg(long, default_value = "output/loop-work")]
        workdir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    let overwrite = config.overwrite() && !args.no_overwrite;
    let config = config.with_overwrite(overwrite);

    match args.command {
        Command::CreateSurfaces => {
            let written = pipeline::create_surfaces(&config)?;
            info!("Wrote {} surfaces", written.len());
        }
        Command::SummarizeData => {
            pipeline::summarize_data(&config)?;
        }
        Command::IsopachMap {
            output,
            strat_name,
            min_age,
            max_age,
            lith,
            bounds,
            project_id,
            crs,
        } => {
            let ages = AgeRange::new(min_age, max_age);
            ages.validate()?;

            let request = IsopachRequest {
                output,
                strat_name,
                ages,
                lithology: lith,
                bounds,
                project_id,
                crs,
            };
            let client = MacrostratClient::new(config.api_base_url(), config.request_timeout())?;
            let result = pipeline::isopach_map(&config, &client, &request)
                .context("Isopach map failed")?;
            info!(
                "{} columns carry matching units; vector output {}",
                result.columns_with_units,
                result.vector.display()
            );
        }
        Command::CrossSections { model } => {
            pipeline::cross_sections(&config, &model, &SectionLine::williston())?;
        }
        Command::ConvertGrids { input } => {
            pipeline::convert_grids(&config, &input)?;
        }
        Command::ModelSurfaces { workdir } => {
            let mut modeler = MeshDirectory::new(workdir);
            let written = pipeline::model_surfaces(&config, &mut modeler)?;
            info!("Wrote {} modeled surfaces", written.len());
        }
    }

    Ok(())
}
