use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use eagrid::clip::DEFAULT_OBSTACLE_EPSILON;
use eagrid::io::{Affine, Identity, Reproject};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub study_area: PathBuf,
    pub output_dir: PathBuf,
    pub grid: GridConfig,
    #[serde(default)]
    pub clip: ClipConfig,
    #[serde(default)]
    pub count: CountConfig,
    #[serde(default)]
    pub reproject: Option<ReprojectConfig>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    #[serde(default)]
    pub presence: Vec<PresenceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GridConfig {
    pub cell_size: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClipConfig {
    #[serde(default = "default_obstacle_epsilon")]
    pub obstacle_epsilon: f64,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            obstacle_epsilon: default_obstacle_epsilon(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CountConfig {
    #[serde(default = "default_scan_budget")]
    pub scan_budget: usize,
    #[serde(default)]
    pub exhaustive: bool,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            scan_budget: default_scan_budget(),
            exhaustive: false,
        }
    }
}

/// Map from the study area's frame to the layers' frame: either a CRS
/// pair resolved by PROJ, or a fixed affine transform.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReprojectConfig {
    #[serde(default)]
    pub source_crs: Option<String>,
    #[serde(default)]
    pub target_crs: Option<String>,
    #[serde(default)]
    pub affine: Option<[f64; 6]>,
}

impl ReprojectConfig {
    /// Resolve to a transform. A CRS pair and an affine map are mutually
    /// exclusive; a lone `source_crs` or `target_crs` is an error.
    pub fn build(&self) -> Result<Box<dyn Reproject>> {
        match (&self.source_crs, &self.target_crs, &self.affine) {
            (Some(source), Some(target), None) => crs_transform(source, target),
            (None, None, Some(coefficients)) => Ok(Box::new(Affine::new(*coefficients)?)),
            (None, None, None) => Ok(Box::new(Identity)),
            (_, _, Some(_)) => bail!("[reproject] takes either source_crs/target_crs or affine, not both"),
            _ => bail!("[reproject] needs both source_crs and target_crs"),
        }
    }
}

#[cfg(feature = "proj-transforms")]
fn crs_transform(source: &str, target: &str) -> Result<Box<dyn Reproject>> {
    Ok(Box::new(eagrid::io::CrsTransform::new(source, target)?))
}

#[cfg(not(feature = "proj-transforms"))]
fn crs_transform(source: &str, target: &str) -> Result<Box<dyn Reproject>> {
    bail!(
        "Reprojecting {} -> {} needs the proj-transforms feature",
        source,
        target
    )
}

/// A linear obstacle layer, optionally filtered to some attribute values
#[derive(Debug, Deserialize, Clone)]
pub struct ObstacleConfig {
    pub name: String,
    pub path: PathBuf,
    pub key: Option<String>,
    #[serde(default)]
    pub keep: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PresenceConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub aggregate: Vec<String>,
}

fn default_obstacle_epsilon() -> f64 {
    DEFAULT_OBSTACLE_EPSILON
}

fn default_scan_budget() -> usize {
    100
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Make relative layer paths relative to the config file's directory.
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.study_area);
        resolve(&mut self.output_dir);
        for obstacle in &mut self.obstacles {
            resolve(&mut obstacle.path);
        }
        for layer in &mut self.presence {
            resolve(&mut layer.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
study_area = "shapefiles/study_area.geojson"
output_dir = "data"

[grid]
cell_size = 500.0

[count]
scan_budget = 40

[[obstacles]]
name = "roads"
path = "shapefiles/roads.geojson"
key = "highway"
keep = ["primary", "secondary"]

[[obstacles]]
name = "rivers"
path = "shapefiles/rivers.geojson"

[[presence]]
name = "fb"
path = "shapefiles/fb.geojsonl.gz"
aggregate = ["population"]

[[presence]]
name = "roof"
path = "shapefiles/roofs.geojson"
"#;

    #[test]
    fn test_parse_sample() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.grid.cell_size, 500.0);
        assert_eq!(config.count.scan_budget, 40);
        assert!(!config.count.exhaustive);
        assert_eq!(config.clip.obstacle_epsilon, DEFAULT_OBSTACLE_EPSILON);
        assert_eq!(config.obstacles.len(), 2);
        assert_eq!(config.obstacles[0].keep, vec!["primary", "secondary"]);
        assert!(config.obstacles[1].key.is_none());
        assert_eq!(config.presence[0].aggregate, vec!["population"]);
        assert!(config.reproject.is_none());
    }

    #[test]
    fn test_paths_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.study_area, dir.path().join("shapefiles/study_area.geojson"));
        assert_eq!(config.presence[1].path, dir.path().join("shapefiles/roofs.geojson"));
    }

    #[test]
    fn test_parse_crs_pair() {
        let text = format!("{}\n[reproject]\nsource_crs = \"EPSG:32735\"\ntarget_crs = \"EPSG:4326\"\n", SAMPLE);
        let config: Config = toml::from_str(&text).unwrap();
        let reproject = config.reproject.unwrap();
        assert_eq!(reproject.source_crs.as_deref(), Some("EPSG:32735"));
        assert_eq!(reproject.target_crs.as_deref(), Some("EPSG:4326"));
        assert!(reproject.affine.is_none());
    }

    #[test]
    fn test_projection_choice() {
        let affine = ReprojectConfig {
            affine: Some([2.0, 0.0, 0.0, 0.0, 2.0, 0.0]),
            ..Default::default()
        };
        assert!(affine.build().is_ok());
        assert!(ReprojectConfig::default().build().is_ok());

        let half = ReprojectConfig {
            source_crs: Some("EPSG:32735".to_string()),
            ..Default::default()
        };
        assert!(half.build().is_err());

        let both = ReprojectConfig {
            source_crs: Some("EPSG:32735".to_string()),
            target_crs: Some("EPSG:4326".to_string()),
            affine: Some([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        };
        assert!(both.build().is_err());
    }

    #[cfg(not(feature = "proj-transforms"))]
    #[test]
    fn test_crs_pair_needs_proj() {
        let crs = ReprojectConfig {
            source_crs: Some("EPSG:32735".to_string()),
            target_crs: Some("EPSG:4326".to_string()),
            affine: None,
        };
        let err = crs.build().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("proj-transforms"));
    }

    #[test]
    fn test_missing_grid_section() {
        assert!(toml::from_str::<Config>("study_area = \"a\"\noutput_dir = \"b\"\n").is_err());
    }
}
