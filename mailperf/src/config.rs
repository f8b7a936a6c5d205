//! Report configuration management.
//!
//! Configuration is loaded from an optional YAML file with environment variable overrides. The
//! configuration file path defaults to `mailperf.yaml` but can be specified via `-f` flag or
//! `MAILPERF_CONFIG` environment variable. A missing file is not an error: every field has a
//! default, and the defaults reproduce the fixed paths the report has always used.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `mailperf.yaml`)
//! 2. **Environment variables** - Variables prefixed with `MAILPERF_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `MAILPERF_CHARTS__DPI=150` sets the `charts.dpi` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use mailperf::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Reading runs from {}", config.input.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Read a different metrics dump
//! MAILPERF_INPUT=/tmp/metrics.json
//!
//! # Skip the chart panel entirely
//! MAILPERF_CHARTS__ENABLED=false
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::Error;

/// Largest chart panel side accepted, in pixels
pub const MAX_PANEL_PIXELS: u32 = 20_000;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "MAILPERF_CONFIG", default_value = "mailperf.yaml")]
    pub config: String,

    /// Validate configuration and exit without reading any run records.
    #[arg(long)]
    pub validate: bool,
}

/// Root configuration structure loaded from YAML and environment variables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSON file holding the sequence of run records
    pub input: PathBuf,
    /// Text report destination, fully replaced on every run
    pub report_path: PathBuf,
    /// Chart panel settings
    pub charts: ChartConfig,
}

/// Chart panel output settings.
///
/// Pixel dimensions are `width_inches * dpi` by `height_inches * dpi`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartConfig {
    /// Render the 3x3 chart panel (when false, section 8 notes that rendering was disabled)
    pub enabled: bool,
    /// Image destination; the extension selects the encoder
    pub output_path: PathBuf,
    pub width_inches: f64,
    pub height_inches: f64,
    pub dpi: u32,
    /// Number of bins in the latency histogram
    pub histogram_bins: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("metric analysis/metrics.json"),
            report_path: PathBuf::from("metric analysis/analysis_report.txt"),
            charts: ChartConfig::default(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_path: PathBuf::from("metric analysis/performance_analysis.png"),
            width_inches: 16.0,
            height_inches: 12.0,
            dpi: 300,
            histogram_bins: 20,
        }
    }
}

impl ChartConfig {
    /// Panel size in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        ((self.width_inches * dpi).round() as u32, (self.height_inches * dpi).round() as u32)
    }

    /// Scale a font size given in points to pixels at the configured DPI
    pub fn font_px(&self, points: f64) -> f64 {
        points * f64::from(self.dpi) / 72.0
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "input cannot be empty. Point it at the JSON file holding the run records.".to_string(),
            });
        }

        if self.report_path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "report_path cannot be empty.".to_string(),
            });
        }

        if self.report_path == self.input {
            return Err(Error::Config {
                message: format!("report_path ({}) would overwrite the input file", self.report_path.display()),
            });
        }

        if self.charts.enabled {
            if self.charts.output_path == self.report_path || self.charts.output_path == self.input {
                return Err(Error::Config {
                    message: format!(
                        "charts.output_path ({}) must differ from both input and report_path",
                        self.charts.output_path.display()
                    ),
                });
            }

            if !(self.charts.width_inches > 0.0 && self.charts.height_inches > 0.0) {
                return Err(Error::Config {
                    message: format!(
                        "chart figure size must be positive, got {}x{} inches",
                        self.charts.width_inches, self.charts.height_inches
                    ),
                });
            }

            if self.charts.dpi == 0 || self.charts.dpi > 1200 {
                return Err(Error::Config {
                    message: format!("charts.dpi must be between 1 and 1200, got {}", self.charts.dpi),
                });
            }

            let dpi = f64::from(self.charts.dpi);
            let (width, height) = (self.charts.width_inches * dpi, self.charts.height_inches * dpi);
            if !(width.is_finite() && height.is_finite()) || width.max(height) > f64::from(MAX_PANEL_PIXELS) {
                return Err(Error::Config {
                    message: format!(
                        "chart panel of {}x{} inches at {} DPI exceeds {MAX_PANEL_PIXELS} pixels per side",
                        self.charts.width_inches, self.charts.height_inches, self.charts.dpi
                    ),
                });
            }

            if self.charts.histogram_bins == 0 {
                return Err(Error::Config {
                    message: "charts.histogram_bins cannot be 0".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Optional base config file; a missing file contributes nothing
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("MAILPERF_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("does-not-exist.yaml"))?;

            assert_eq!(config.input, PathBuf::from("metric analysis/metrics.json"));
            assert_eq!(config.report_path, PathBuf::from("metric analysis/analysis_report.txt"));
            assert_eq!(config.charts.output_path, PathBuf::from("metric analysis/performance_analysis.png"));
            assert!(config.charts.enabled);
            assert_eq!(config.charts.pixel_size(), (4800, 3600));

            Ok(())
        });
    }

    #[test]
    fn test_yaml_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
input: runs/metrics.json
charts:
  dpi: 100
  histogram_bins: 30
"#,
            )?;

            jail.set_env("MAILPERF_REPORT_PATH", "out/report.txt");
            jail.set_env("MAILPERF_CHARTS__ENABLED", "false");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.input, PathBuf::from("runs/metrics.json"));
            assert_eq!(config.report_path, PathBuf::from("out/report.txt"));
            assert!(!config.charts.enabled);
            assert_eq!(config.charts.dpi, 100);
            assert_eq!(config.charts.histogram_bins, 30);
            // untouched values keep their defaults
            assert_eq!(config.charts.width_inches, 16.0);

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "input: a.json\nrender_png: true\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_report_cannot_overwrite_input() {
        let config = Config {
            input: PathBuf::from("same.json"),
            report_path: PathBuf::from("same.json"),
            ..Config::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("overwrite the input"));
    }

    #[test]
    fn test_invalid_dpi_rejected_only_when_charts_enabled() {
        let mut config = Config::default();
        config.charts.dpi = 0;
        assert!(config.validate().is_err());

        config.charts.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_panel_rejected() {
        let mut config = Config::default();
        config.charts.width_inches = 1.0e9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pixels per side"), "{err}");

        // 16x12 inches at the 1200 DPI ceiling still fits
        config.charts.width_inches = 16.0;
        config.charts.dpi = 1200;
        assert!(config.validate().is_ok());

        config.charts.height_inches = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_font_scaling_follows_dpi() {
        let charts = ChartConfig {
            dpi: 144,
            ..ChartConfig::default()
        };
        assert_eq!(charts.font_px(12.0), 24.0);
    }
}
