//! Record-section layout: one trace per station, displaced vertically by distance or azimuth.
//!
//! The canvas uses logical units. A station at `d` degrees sits at
//! `canvas_height * (1 - d / 180)`, so the nearest station is drawn at the top. Each trace
//! is centered on the median of its samples in the viewport and scaled so their peak-to-peak
//! range spans `waveform_height`.
use serde::{Deserialize, Serialize};
use crate::config::RecordSectionConfig;
use crate::sigpro::{PipelineError, TimeRange, WaveformSegment, KM_PER_DEG};
use crate::weavess::position::{build_position_buffer, PositionBuffer, PositionBufferRequest};
pub const DEFAULT_CANVAS_HEIGHT: f64 = 180.0 * 200.0;
pub const DEFAULT_WAVEFORM_HEIGHT: f64 = 800.0;
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum RecordSectionOffset {
    DistanceKm(f64),
    AzimuthDeg(f64),
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordSectionLayout {
    #[default]
    Distance,
    Azimuth,
    /// Evenly spaced in input order.
    Linear,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSectionEntry {
    pub id: String,
    pub segment: WaveformSegment,
    pub offset: RecordSectionOffset,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSectionRequest {
    pub entries: Vec<RecordSectionEntry>,
    pub viewport: TimeRange,
    pub width_px: u32,
    #[serde(default)]
    pub layout: RecordSectionLayout,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: f64,
    #[serde(default = "default_waveform_height")]
    pub waveform_height: f64,
}
fn default_canvas_height() -> f64 {
    DEFAULT_CANVAS_HEIGHT
}
fn default_waveform_height() -> f64 {
    DEFAULT_WAVEFORM_HEIGHT
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub id: String,
    pub y_offset: f64,
    /// Degrees for distance and azimuth layouts, the entry index for linear.
    pub value: f64,
}
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSection {
    pub buffers: Vec<PositionBuffer>,
    pub legend: Vec<LegendEntry>,
}
pub fn kilometers_to_degrees(km: f64) -> f64 {
    km / KM_PER_DEG
}
impl RecordSectionRequest {
    /// Request laid out on the logical canvas described by `config`.
    pub fn new(
        entries: Vec<RecordSectionEntry>,
        viewport: TimeRange,
        width_px: u32,
        layout: RecordSectionLayout,
        config: &RecordSectionConfig,
    ) -> Self {
        Self {
            entries,
            viewport,
            width_px,
            layout,
            canvas_height: config.canvas_height,
            waveform_height: config.waveform_height,
        }
    }
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.canvas_height > 0.0 && self.waveform_height > 0.0) {
            return Err(PipelineError::InvalidConfiguration(
                "record section heights must be positive".into(),
            ));
        }
        for entry in &self.entries {
            entry.segment.validate()?;
            let (value, matches) = match (self.layout, entry.offset) {
                (RecordSectionLayout::Distance, RecordSectionOffset::DistanceKm(km)) => (km, km >= 0.0),
                (RecordSectionLayout::Azimuth, RecordSectionOffset::AzimuthDeg(az)) => (az, true),
                (RecordSectionLayout::Linear, _) => (0.0, true),
                (layout, _) => {
                    return Err(PipelineError::InvalidConfiguration(format!(
                        "entry {} has an offset unusable in {layout:?} layout",
                        entry.id
                    )))
                }
            };
            if !value.is_finite() || !matches {
                return Err(PipelineError::InvalidConfiguration(format!(
                    "entry {} has offset {value}",
                    entry.id
                )));
            }
        }
        Ok(())
    }
    fn legend_value(&self, index: usize, offset: RecordSectionOffset) -> (f64, f64) {
        let height = self.canvas_height;
        match (self.layout, offset) {
            (RecordSectionLayout::Distance, RecordSectionOffset::DistanceKm(km)) => {
                let degrees = kilometers_to_degrees(km);
                (height * (1.0 - degrees / 180.0), degrees)
            }
            (RecordSectionLayout::Azimuth, RecordSectionOffset::AzimuthDeg(az)) => {
                let azimuth = az.rem_euclid(360.0);
                (height * (1.0 - azimuth / 360.0), azimuth)
            }
            _ => {
                let n = self.entries.len() as f64;
                (height * (1.0 - (index as f64 + 1.0) / (n + 1.0)), index as f64)
            }
        }
    }
}
pub fn build_record_section(request: &RecordSectionRequest) -> Result<RecordSection, PipelineError> {
    request.validate()?;
    let mut section = RecordSection::default();
    for (index, entry) in request.entries.iter().enumerate() {
        let raw = build_position_buffer(&PositionBufferRequest {
            segment: entry.segment.clone(),
            viewport: request.viewport,
            width_px: request.width_px,
        })?;
        let (y_offset, value) = request.legend_value(index, entry.offset);
        let scaled = match trace_statistics(&entry.segment, &request.viewport) {
            Some((median, range)) => scale_trace(&raw, median, range, y_offset, request.waveform_height),
            None => PositionBuffer::default(),
        };
        section.buffers.push(scaled);
        section.legend.push(LegendEntry {
            id: entry.id.clone(),
            y_offset,
            value,
        });
    }
    Ok(section)
}
/// Median and peak-to-peak range of the raw samples inside `viewport`, independent of how
/// the drawn buffer was decimated.
fn trace_statistics(segment: &WaveformSegment, viewport: &TimeRange) -> Option<(f64, f64)> {
    let (first, last) = segment.index_range(viewport)?;
    let mut values: Vec<f64> = segment.samples[first..=last]
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let median = values[values.len() / 2];
    let range = values[values.len() - 1] - values[0];
    Some((median, if range > 0.0 { range } else { 1.0 }))
}
fn scale_trace(raw: &PositionBuffer, median: f64, range: f64, y_offset: f64, waveform_height: f64) -> PositionBuffer {
    PositionBuffer::from_points(raw.points().map(|(x, y)| {
        let scaled = (y as f64 - median) / range * waveform_height + y_offset;
        (x, scaled as f32)
    }))
}
#[cfg(test)]
mod tests {
    use super::*;
    fn entry(id: &str, offset: RecordSectionOffset) -> RecordSectionEntry {
        let samples: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        RecordSectionEntry {
            id: id.into(),
            segment: WaveformSegment::new(id, 10.0, 0.0, samples),
            offset,
        }
    }
    fn request(entries: Vec<RecordSectionEntry>, layout: RecordSectionLayout) -> RecordSectionRequest {
        RecordSectionRequest {
            entries,
            viewport: TimeRange::new(0.0, 1.9).unwrap(),
            width_px: 100,
            layout,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            waveform_height: DEFAULT_WAVEFORM_HEIGHT,
        }
    }
    #[test]
    fn output_keeps_input_order_and_distance_offsets() {
        let far = entry("far", RecordSectionOffset::DistanceKm(90.0 * KM_PER_DEG));
        let near = entry("near", RecordSectionOffset::DistanceKm(0.0));
        let section = build_record_section(&request(vec![far, near], RecordSectionLayout::Distance)).unwrap();
        let ids: Vec<&str> = section.legend.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["far", "near"]);
        assert!((section.legend[0].value - 90.0).abs() < 1e-9);
        assert!((section.legend[0].y_offset - DEFAULT_CANVAS_HEIGHT / 2.0).abs() < 1e-6);
        assert_eq!(section.legend[1].y_offset, DEFAULT_CANVAS_HEIGHT);
        assert_eq!(section.buffers.len(), 2);
    }
    #[test]
    fn traces_span_waveform_height_around_offset() {
        let near = entry("near", RecordSectionOffset::DistanceKm(0.0));
        let section = build_record_section(&request(vec![near], RecordSectionLayout::Distance)).unwrap();
        let ys: Vec<f32> = section.buffers[0].points().map(|(_, y)| y).collect();
        let max = ys.iter().cloned().fold(f32::MIN, f32::max);
        let min = ys.iter().cloned().fold(f32::MAX, f32::min);
        assert!(((max - min) as f64 - DEFAULT_WAVEFORM_HEIGHT).abs() < 1e-3);
    }
    #[test]
    fn trace_center_does_not_depend_on_width() {
        let samples: Vec<f64> = (0..400).map(|i| if i % 40 == 0 { 10.0 } else { 0.0 }).collect();
        let spiky = RecordSectionEntry {
            id: "spiky".into(),
            segment: WaveformSegment::new("spiky", 10.0, 0.0, samples),
            offset: RecordSectionOffset::DistanceKm(0.0),
        };
        for width_px in [5, 1_000] {
            let mut request = request(vec![spiky.clone()], RecordSectionLayout::Distance);
            request.viewport = TimeRange::new(0.0, 39.9).unwrap();
            request.width_px = width_px;
            let section = build_record_section(&request).unwrap();
            let ys: Vec<f64> = section.buffers[0].points().map(|(_, y)| y as f64).collect();
            let min = ys.iter().cloned().fold(f64::MAX, f64::min);
            let max = ys.iter().cloned().fold(f64::MIN, f64::max);
            assert!((min - DEFAULT_CANVAS_HEIGHT).abs() < 1e-2, "width {width_px}: {min}");
            assert!((max - DEFAULT_CANVAS_HEIGHT - DEFAULT_WAVEFORM_HEIGHT).abs() < 1e-2);
        }
    }
    #[test]
    fn heights_come_from_config() {
        let config = RecordSectionConfig {
            canvas_height: 1_000.0,
            waveform_height: 10.0,
        };
        let near = entry("near", RecordSectionOffset::DistanceKm(0.0));
        let request = RecordSectionRequest::new(
            vec![near],
            TimeRange::new(0.0, 1.9).unwrap(),
            100,
            RecordSectionLayout::Distance,
            &config,
        );
        let section = build_record_section(&request).unwrap();
        assert_eq!(section.legend[0].y_offset, 1_000.0);
        let ys: Vec<f32> = section.buffers[0].points().map(|(_, y)| y).collect();
        let spread = ys.iter().cloned().fold(f32::MIN, f32::max) - ys.iter().cloned().fold(f32::MAX, f32::min);
        assert!((spread - 10.0).abs() < 1e-3);
    }
    #[test]
    fn mismatched_offset_kind_is_rejected() {
        let az = entry("a", RecordSectionOffset::AzimuthDeg(45.0));
        let result = build_record_section(&request(vec![az], RecordSectionLayout::Distance));
        assert!(matches!(result, Err(PipelineError::InvalidConfiguration(_))));
    }
    #[test]
    fn linear_layout_spaces_entries_evenly() {
        let entries = vec![
            entry("a", RecordSectionOffset::AzimuthDeg(10.0)),
            entry("b", RecordSectionOffset::DistanceKm(5.0)),
            entry("c", RecordSectionOffset::DistanceKm(1.0)),
        ];
        let section = build_record_section(&request(entries, RecordSectionLayout::Linear)).unwrap();
        let offsets: Vec<f64> = section.legend.iter().map(|l| l.y_offset).collect();
        let step = DEFAULT_CANVAS_HEIGHT / 4.0;
        for (i, offset) in offsets.iter().enumerate() {
            assert!((offset - (DEFAULT_CANVAS_HEIGHT - step * (i as f64 + 1.0))).abs() < 1e-6);
        }
    }
}
