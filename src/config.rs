use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spacing between elements, in layout units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpacingConfig {
    /// Minimum horizontal gap between sibling nodes in a row.
    pub node_spacing: f32,
    /// Vertical distance between consecutive layers inside a cluster.
    pub layer_spacing: f32,
    /// Gap between packed cluster boxes.
    pub cluster_spacing: f32,
    /// Padding between a cluster's member extent and its bounds.
    pub cluster_padding: f32,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            node_spacing: 24.0,
            layer_spacing: 72.0,
            cluster_spacing: 48.0,
            cluster_padding: 20.0,
        }
    }
}

/// Label measurement and node sizing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelConfig {
    pub font_size: f32,
    pub font_family: String,
    /// Labels wider than this wrap onto additional lines.
    pub wrap_width: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    /// Horizontal padding added around the measured label.
    pub padding_x: f32,
    /// Vertical padding added around the measured label.
    pub padding_y: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            font_family: "sans-serif".to_string(),
            wrap_width: 180.0,
            min_node_width: 48.0,
            min_node_height: 28.0,
            padding_x: 12.0,
            padding_y: 8.0,
        }
    }
}

/// Crossing minimizer knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderingConfig {
    /// Number of barycenter sweep passes. Zero disables reordering.
    pub passes: usize,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self { passes: 3 }
    }
}

/// Force-directed refinement knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefineConfig {
    /// Iteration count. Zero disables refinement entirely.
    pub iterations: usize,
    pub repulsion_strength: f32,
    /// Repulsion is inactive beyond this distance.
    pub repulsion_radius: f32,
    pub attraction_strength: f32,
    /// Edge length the attraction force relaxes toward.
    pub ideal_edge_length: f32,
    /// Initial damping factor, decays linearly to zero over the run.
    pub damping: f32,
    /// Extra multiplier applied to vertical displacement so layer
    /// bands survive refinement.
    pub vertical_damping: f32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            iterations: 0,
            repulsion_strength: 500.0,
            repulsion_radius: 160.0,
            attraction_strength: 0.02,
            ideal_edge_length: 120.0,
            damping: 0.3,
            vertical_damping: 0.25,
        }
    }
}

/// Edge routing and label anchor knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Curvature grows with endpoint distance by this ratio.
    pub curvature_ratio: f32,
    pub curvature_min: f32,
    pub curvature_max: f32,
    /// Curvature applied to ordinary non-containment edges.
    pub lone_edge_curvature: f32,
    /// Distance a pair label is pushed past its curve apex.
    pub label_clearance: f32,
    /// Minimum distance between the two label anchors of a pair.
    pub min_label_separation: f32,
    /// Pointer radius for the label proximity query.
    pub label_hit_radius: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            curvature_ratio: 0.15,
            curvature_min: 12.0,
            curvature_max: 48.0,
            lone_edge_curvature: 6.0,
            label_clearance: 10.0,
            min_label_separation: 36.0,
            label_hit_radius: 18.0,
        }
    }
}

/// Immutable layout configuration. Built once, shared by reference
/// through the whole pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub spacing: SpacingConfig,
    pub label: LabelConfig,
    pub ordering: OrderingConfig,
    pub refine: RefineConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },
}

/// Loads a config file, or the defaults when no path is given. Files
/// are parsed as json5 so trailing commas and comments are accepted;
/// missing fields fall back to their defaults.
pub fn load_config(path: Option<&Path>) -> Result<LayoutConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    json5::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
