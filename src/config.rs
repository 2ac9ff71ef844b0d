use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::common::Cost;

/// Process node whose late rip-up iterations enable the forbidden-via
/// heuristic penalty near boundary pins.
pub const GF14_PROCESS_NODE: &str = "GF14_13M_3Mx_2Cx_4Kx_2Hx_2Gx_LB";

#[derive(Parser, Debug)]
#[command(
    name = "drmaze",
    about = "Detailed-routing maze search over a 3-D routing grid.",
    version = "0.1"
)]
pub struct Cli {
    #[arg(long, short, help = "Path to the YAML config file")]
    pub config: Option<String>,
}

/// Process-wide cost-model constants, fixed before any search runs.
#[derive(Serialize, Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RouterConfig {
    /// Multiplier for edges flagged with grid cost.
    pub grid_cost: Cost,
    /// Multiplier for edges crossing fixed shapes.
    pub shape_cost: Cost,
    /// Multiplier for blocked edges; applied to the path width, not the
    /// edge length.
    pub block_cost: Cost,
    /// Multiplier for edges outside the route guides.
    pub guide_cost: Cost,
    /// Multiplier for edges flagged by the design-rule checker.
    pub gg_drc_cost: Cost,
    /// Multiplier for edges carrying violation markers.
    pub gg_marker_cost: Cost,
    /// Lowest layer number open to routing.
    pub bottom_routing_layer: i64,
    /// Process node identifier from the design database.
    pub db_process_node: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            grid_cost: 2,
            shape_cost: 8,
            block_cost: 32,
            guide_cost: 1,
            gg_drc_cost: 8,
            gg_marker_cost: 32,
            bottom_routing_layer: 2,
            db_process_node: String::new(),
        }
    }
}

impl RouterConfig {
    pub fn from_yaml_str(config_str: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(config_str)?;
        config.validate()
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(self)
    }
}

/// Read-only view of the detailed-routing worker that owns this search.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrWorker {
    dr_iter: u32,
    ripup_mode: u32,
}

impl DrWorker {
    pub fn new(dr_iter: u32, ripup_mode: u32) -> Self {
        Self { dr_iter, ripup_mode }
    }

    pub fn dr_iter(&self) -> u32 {
        self.dr_iter
    }

    pub fn ripup_mode(&self) -> u32 {
        self.ripup_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.grid_cost, 2);
        assert_eq!(config.guide_cost, 1);
        assert!(config.db_process_node.is_empty());
    }

    #[test]
    fn test_config_from_yaml() {
        let config = RouterConfig::from_yaml_str(
            "gg_drc_cost: 16\ndb_process_node: GF14_13M_3Mx_2Cx_4Kx_2Hx_2Gx_LB\n",
        )
        .unwrap();
        assert_eq!(config.gg_drc_cost, 16);
        assert_eq!(config.db_process_node, GF14_PROCESS_NODE);
        // Unset keys fall back to the defaults.
        assert_eq!(config.gg_marker_cost, 32);
    }
}
