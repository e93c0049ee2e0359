// src/config.rs
// 运行配置：worker 线程、FK 参数、显示参数
use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::sigpro::{FrequencyBand, PipelineError};
use crate::weavess::record_section::{DEFAULT_CANVAS_HEIGHT, DEFAULT_WAVEFORM_HEIGHT};
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub threads: usize,
    pub thread_name: String,
}
impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            thread_name: "waveform-worker".to_owned(),
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FkConfig {
    pub minimum_waveforms_for_spectra: usize,
    /// Channel codes, most preferred first.
    pub channel_prioritization: Vec<String>,
    /// Used for the vertical offset term when a request asks for it.
    pub vertical_velocity_km_s: f64,
    /// Pass bands of the frequency thumbnail strip.
    pub frequency_bands: Vec<FrequencyBand>,
}
impl Default for FkConfig {
    fn default() -> Self {
        Self {
            minimum_waveforms_for_spectra: 3,
            channel_prioritization: ["SHZ", "BHZ", "HHZ", "EHZ"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            vertical_velocity_km_s: 5.8,
            frequency_bands: [(0.5, 2.0), (1.0, 2.5), (1.5, 3.0), (2.0, 4.0), (3.0, 6.0)]
                .iter()
                .map(|&(low, high)| FrequencyBand::new(low, high))
                .collect(),
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSectionConfig {
    pub canvas_height: f64,
    pub waveform_height: f64,
}
impl Default for RecordSectionConfig {
    fn default() -> Self {
        Self {
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            waveform_height: DEFAULT_WAVEFORM_HEIGHT,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width_px: u32,
    /// Fraction of the viewport kept on each zoom-in step.
    pub zoom_step: f64,
    pub min_zoom_secs: f64,
    pub measure_width_px: u32,
    pub cache_capacity: usize,
    pub record_section: RecordSectionConfig,
}
impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width_px: 1000,
            zoom_step: 0.8,
            min_zoom_secs: 0.5,
            measure_width_px: 400,
            cache_capacity: 256,
            record_section: RecordSectionConfig::default(),
        }
    }
}
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub worker: WorkerConfig,
    pub fk: FkConfig,
    pub display: DisplayConfig,
}
impl AppConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.worker.threads == 0 {
            return Err(PipelineError::Config("worker.threads must be at least 1".into()));
        }
        if self.fk.minimum_waveforms_for_spectra == 0 {
            return Err(PipelineError::Config(
                "fk.minimum_waveforms_for_spectra must be at least 1".into(),
            ));
        }
        if self.fk.channel_prioritization.is_empty() {
            return Err(PipelineError::Config(
                "fk.channel_prioritization must list at least one code".into(),
            ));
        }
        for band in &self.fk.frequency_bands {
            if !(band.low_frequency_hz >= 0.0 && band.low_frequency_hz < band.high_frequency_hz) {
                return Err(PipelineError::Config(format!(
                    "fk.frequency_bands entry {}..{} Hz is not a pass band",
                    band.low_frequency_hz, band.high_frequency_hz
                )));
            }
        }
        let section = &self.display.record_section;
        if !(section.canvas_height > 0.0 && section.waveform_height > 0.0) {
            return Err(PipelineError::Config(
                "display.record_section heights must be positive".into(),
            ));
        }
        if self.display.width_px == 0 || self.display.measure_width_px == 0 {
            return Err(PipelineError::Config("display widths must be positive".into()));
        }
        if !(self.display.zoom_step > 0.0 && self.display.zoom_step < 1.0) {
            return Err(PipelineError::Config(format!(
                "display.zoom_step {} must lie in (0, 1)",
                self.display.zoom_step
            )));
        }
        if !(self.display.min_zoom_secs > 0.0) {
            return Err(PipelineError::Config("display.min_zoom_secs must be positive".into()));
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.worker.threads, 2);
        assert_eq!(config.fk.channel_prioritization[0], "SHZ");
    }
    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"fk": {"minimum_waveforms_for_spectra": 4}}"#).unwrap();
        assert_eq!(config.fk.minimum_waveforms_for_spectra, 4);
        assert_eq!(config.fk.vertical_velocity_km_s, 5.8);
        assert_eq!(config.display.width_px, 1000);
    }
    #[test]
    fn bad_values_are_rejected() {
        let mut config = AppConfig::default();
        config.worker.threads = 0;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
        let mut config = AppConfig::default();
        config.display.zoom_step = 1.5;
        assert!(config.validate().is_err());
        let mut config = AppConfig::default();
        config.fk.frequency_bands.push(FrequencyBand::new(4.0, 2.0));
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
        let mut config = AppConfig::default();
        config.display.record_section.waveform_height = 0.0;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }
    #[test]
    fn missing_file_is_io_error() {
        let result = AppConfig::from_path("/nonexistent/seisview.json");
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }
}
