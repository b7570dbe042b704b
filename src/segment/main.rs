//! Enumeration area segmentation pipeline.
//!
//! Builds a grid over the study area, clips it to the area and trims it
//! along obstacle layers, counts presence layers per cell and writes the
//! stratified enumeration areas as a CSV table and as GeoJSON.

mod config;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use geo_types::{MultiPolygon, Polygon};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use eagrid::clip::{trim_pipeline, ObstacleLayer, ObstacleTrimmer};
use eagrid::count::{count_exhaustive, AuxTable, ProximityCounter};
use eagrid::grid::GridGenerator;
use eagrid::io::{
    ea_features, reproject_cells, write_ea_table, write_geojson, FeatureSource, GeoJsonFile,
    Identity, Reproject,
};
use eagrid::partition::{retain_by_attribute, split_multipart};
use eagrid::stratify::{stratify, PresenceLayer, StratumSummary};
use eagrid::{Cell, CountRecord, Feature, Shape};

use crate::config::{Config, PresenceConfig};

#[derive(Parser, Debug)]
#[command(name = "segment")]
#[command(about = "Segment a study area into stratified enumeration areas")]
struct Args {
    /// Pipeline configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Override the grid cell size
    #[arg(long)]
    cell_size: Option<f64>,

    /// Override the proximity scan miss budget
    #[arg(long)]
    scan_budget: Option<usize>,

    /// Count every shape against every cell instead of the proximity scan
    #[arg(long)]
    exhaustive: bool,

    /// Override the output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    generated_at: DateTime<Utc>,
    cell_size: f64,
    scan_budget: Option<usize>,
    grid_cells: usize,
    final_cells: usize,
    layers: Vec<String>,
    strata: Vec<StratumSummary>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load_from_file(&args.config)
        .with_context(|| format!("Loading {}", args.config.display()))?;
    if let Some(size) = args.cell_size {
        config.grid.cell_size = size;
    }
    if let Some(budget) = args.scan_budget {
        config.count.scan_budget = budget;
    }
    if args.exhaustive {
        config.count.exhaustive = true;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    info!("EA segmentation");
    info!("Study area: {}", config.study_area.display());

    // Study area
    let study_features = GeoJsonFile::new(&config.study_area)
        .read_features()
        .context("Failed to read study area")?;
    let study_area = combine_polygons(&study_features)?;

    // Grid, laid out in the study area's own frame
    let generator = GridGenerator::new(config.grid.cell_size)?;
    let grid = generator.generate(&study_area)?;
    let grid_cells = grid.len();
    info!(
        "Generated {} cells of size {}",
        grid_cells,
        generator.cell_size()
    );

    let projection: Box<dyn Reproject> = match &config.reproject {
        Some(r) => r.build().context("Invalid [reproject] section")?,
        None => Box::new(Identity),
    };
    let grid = reproject_cells(projection.as_ref(), grid)?;
    let containment = study_features
        .iter()
        .map(|f| -> Result<Feature> {
            Ok(Feature {
                geometry: projection.reproject(&f.geometry)?,
                ..f.clone()
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Obstacles
    let mut obstacle_sets = Vec::with_capacity(config.obstacles.len());
    for obstacle in &config.obstacles {
        let features = GeoJsonFile::new(&obstacle.path)
            .read_features()
            .with_context(|| format!("Failed to read obstacle layer {}", obstacle.name))?;
        let mut features = split_multipart(&features);
        if let Some(key) = &obstacle.key {
            features = retain_by_attribute(features, key, obstacle.keep.as_slice());
        }
        obstacle_sets.push(features);
    }
    let layers: Vec<ObstacleLayer<'_>> = config
        .obstacles
        .iter()
        .zip(&obstacle_sets)
        .map(|(obstacle, features)| ObstacleLayer {
            name: &obstacle.name,
            features,
        })
        .collect();

    let trimmer = ObstacleTrimmer::new(config.clip.obstacle_epsilon)?;
    let cells = trim_pipeline(&grid, &containment, &layers, &trimmer)?;
    info!("Final grid: {} cells", cells.len());

    // Presence counts
    if config.presence.is_empty() {
        bail!("At least one presence layer is required");
    }
    let counter = if config.count.exhaustive {
        None
    } else {
        Some(ProximityCounter::new(config.count.scan_budget)?)
    };
    let mut counts = Vec::with_capacity(config.presence.len());
    for layer in &config.presence {
        counts.push(count_layer(&cells, layer, counter.as_ref())?);
    }

    let presence: Vec<PresenceLayer<'_>> = config
        .presence
        .iter()
        .zip(&counts)
        .map(|(layer, records)| PresenceLayer {
            name: &layer.name,
            records,
        })
        .collect();
    let strata = stratify(&cells, &presence)?;

    // Outputs
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let table_path = config.output_dir.join("EA_information.csv");
    write_ea_table(BufWriter::new(File::create(&table_path)?), &strata)?;
    info!("Wrote {}", table_path.display());

    let ea_path = config.output_dir.join("ea.geojson");
    write_geojson(BufWriter::new(File::create(&ea_path)?), &ea_features(&strata))?;
    info!("Wrote {}", ea_path.display());

    let area_path = config.output_dir.join("study_area.geojson");
    write_geojson(BufWriter::new(File::create(&area_path)?), &containment)?;
    info!("Wrote {}", area_path.display());

    for (obstacle, features) in config.obstacles.iter().zip(&obstacle_sets) {
        let path = config.output_dir.join(format!("{}.geojson", obstacle.name));
        write_geojson(BufWriter::new(File::create(&path)?), features)?;
        info!("Wrote {} {} features to {}", features.len(), obstacle.name, path.display());
    }

    let summary = RunSummary {
        generated_at: Utc::now(),
        cell_size: generator.cell_size(),
        scan_budget: counter.as_ref().and_then(ProximityCounter::budget),
        grid_cells,
        final_cells: cells.len(),
        layers: strata.layer_names.clone(),
        strata: strata.summary(),
    };
    for stratum in &summary.strata {
        info!(
            "{}: {} cells ({:.1}%)",
            stratum.category,
            stratum.count,
            stratum.proportion * 100.0
        );
    }
    let summary_path = config.output_dir.join("summary.json");
    serde_json::to_writer_pretty(BufWriter::new(File::create(&summary_path)?), &summary)?;
    info!("Wrote {}", summary_path.display());

    Ok(())
}

/// Merge the study area's polygon parts into one shape for grid layout.
fn combine_polygons(features: &[Feature]) -> Result<Shape> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for feature in features {
        match &feature.geometry {
            Shape::Polygon(p) => polygons.push(p.clone()),
            Shape::MultiPolygon(mp) => polygons.extend(mp.0.iter().cloned()),
            other => bail!(
                "Study area feature {} is a {}, expected a polygon",
                feature.id,
                other.kind()
            ),
        }
    }
    if polygons.is_empty() {
        bail!("Study area has no polygons");
    }
    Ok(Shape::MultiPolygon(MultiPolygon(polygons)))
}

fn count_layer(
    cells: &[Cell],
    layer: &PresenceConfig,
    counter: Option<&ProximityCounter>,
) -> Result<Vec<CountRecord>> {
    let features = GeoJsonFile::new(&layer.path)
        .read_features()
        .with_context(|| format!("Failed to read presence layer {}", layer.name))?;
    let shapes = split_multipart(&features);
    if shapes.is_empty() {
        warn!("Presence layer {} is empty, every cell counts as absent", layer.name);
    }
    let aux = if layer.aggregate.is_empty() {
        None
    } else {
        Some(AuxTable::from_attributes(&shapes, &layer.aggregate)?)
    };

    let Some(counter) = counter else {
        info!("Counting {} exhaustively", layer.name);
        return Ok(count_exhaustive(cells, &shapes, aux.as_ref())?);
    };

    info!("Counting {} with a miss budget of {:?}", layer.name, counter.budget());
    let prepared = counter.prepare(&shapes, aux.as_ref())?;
    let pb = ProgressBar::new(cells.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cells ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut records = Vec::with_capacity(cells.len());
    for cell in cells {
        records.push(counter.count_cell(cell, &prepared)?);
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let present = records.iter().filter(|r| r.intersect).count();
    info!(
        "{}: {} of {} cells with presence",
        layer.name,
        present,
        cells.len()
    );
    Ok(records)
}
