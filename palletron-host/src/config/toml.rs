//! Host configuration file
//!
//! `palletron.toml` holds the cell profile plus everything that is fixed
//! for the lifetime of the process: motion limits, the simulated gantry,
//! the command link and the tick rate.

use palletron_core::config::{CellConfig, MotionConfig};
use palletron_drivers::sim::SimConfig;
use serde::{Deserialize, Serialize};

use crate::tasks::tick::DEFAULT_TICK_MS;

/// Command link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Address the TCP listener binds to
    pub listen: String,
    /// How long a connection waits for the controller to answer
    pub reply_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7070".into(),
            reply_timeout_ms: 2000,
        }
    }
}

/// Control loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Tick period (ms)
    pub tick_ms: u64,
    /// Run the homing sequence right after startup
    pub home_on_start: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            home_on_start: true,
        }
    }
}

/// Complete host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub cell: CellConfig,
    pub motion: MotionConfig,
    pub simulator: SimConfig,
    pub link: LinkConfig,
    pub runtime: RuntimeConfig,
}

/// Parse a host configuration from TOML text
pub fn parse_config(text: &str) -> Result<HostConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Render a cell profile as TOML, in the same shape as the `[cell]` section
pub fn cell_to_toml(cell: &CellConfig) -> Result<String, toml::ser::Error> {
    #[derive(Serialize)]
    struct Wrapper<'a> {
        cell: &'a CellConfig,
    }
    toml::to_string_pretty(&Wrapper { cell })
}

#[cfg(test)]
mod tests {
    use super::*;
    use palletron_core::config::{FillOrder, RotationConvention};

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.link.listen, "127.0.0.1:7070");
        assert_eq!(config.runtime.tick_ms, 20);
        assert_eq!(config.motion.speed, 50.0);
        assert_eq!(config.cell.grid.rows, 2);
    }

    #[test]
    fn test_partial_sections() {
        let text = r#"
            [motion]
            speed = 80.0

            [link]
            listen = "0.0.0.0:9000"

            [simulator]
            dt_s = 0.1
        "#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.motion.speed, 80.0);
        assert_eq!(config.motion.home_speed, 25.0);
        assert_eq!(config.link.listen, "0.0.0.0:9000");
        assert_eq!(config.link.reply_timeout_ms, 2000);
        assert_eq!(config.simulator.dt_s, 0.1);
        assert_eq!(config.simulator.limits, [1000.0; 3]);
    }

    #[test]
    fn test_cell_section() {
        let text = r#"
            [cell.grid]
            rows = 3
            cols = 4
            fill_order = "serpentine"
            place_height = 60.0

            [cell.grid.spacing]
            dx = 110.0
            dy = 130.0

            [cell.grid.origin]
            x = 100.0
            y = -50.0

            [cell.transform]
            convention = "rpy"
            roll_deg = 180.0
            pitch_deg = 0.0
            yaw_deg = 90.0
            translation = [400.0, 0.0, 900.0]

            [cell.home]
            z = 500.0

            [cell.pick]
            x = -250.0
            z = 40.0
        "#;
        let config = parse_config(text).unwrap();
        let cell = &config.cell;
        assert_eq!(cell.grid.rows, 3);
        assert_eq!(cell.grid.cols, 4);
        assert_eq!(cell.grid.fill_order, FillOrder::Serpentine);
        assert_eq!(cell.grid.place_height, Some(60.0));
        assert_eq!(cell.grid.spacing.dy, 130.0);
        assert_eq!(cell.grid.origin.y, -50.0);
        assert_eq!(cell.grid.origin.z, 0.0);
        assert_eq!(cell.transform.convention, RotationConvention::Rpy);
        assert_eq!(cell.transform.roll_deg, Some(180.0));
        assert_eq!(cell.transform.translation, [400.0, 0.0, 900.0]);
        assert_eq!(cell.home.z, 500.0);
        assert_eq!(cell.pick.x, -250.0);
        assert!(cell.validate().is_ok());
    }

    #[test]
    fn test_matrix_convention() {
        let text = r#"
            [cell.grid]
            rows = 1
            cols = 1

            [cell.grid.spacing]
            dx = 100.0
            dy = 100.0

            [cell.grid.origin]

            [cell.transform]
            convention = "matrix"
            matrix = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]]
            translation = [0.0, 0.0, 1000.0]

            [cell.home]
            [cell.pick]
        "#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.cell.transform.convention, RotationConvention::Matrix);
        assert!(config.cell.validate().is_ok());
    }

    #[test]
    fn test_unknown_fill_order_rejected() {
        let text = r#"
            [cell.grid]
            rows = 2
            cols = 2
            fill_order = "spiral"

            [cell.grid.spacing]
            dx = 100.0
            dy = 100.0

            [cell.grid.origin]
            [cell.home]
            [cell.pick]
        "#;
        assert!(parse_config(text).is_err());
    }

    #[test]
    fn test_cell_toml_round_trip() {
        let mut cell = CellConfig::default();
        cell.grid.rows = 4;
        cell.grid.fill_order = FillOrder::ColumnMajor;

        let text = cell_to_toml(&cell).unwrap();
        let parsed = parse_config(&text).unwrap();
        assert_eq!(parsed.cell.grid.rows, 4);
        assert_eq!(parsed.cell.grid.fill_order, FillOrder::ColumnMajor);
        assert_eq!(parsed.cell.transform.translation, [500.0, 300.0, 800.0]);
        assert!(parsed.cell.validate().is_ok());
    }
}
