use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::sigpro::PipelineError;
const INDEX_EPSILON: f64 = 1e-9;
/// Closed interval of epoch seconds. Used both for loaded data and for the zoomed viewport.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_time_secs: f64,
    pub end_time_secs: f64,
}
impl TimeRange {
    pub fn new(start_time_secs: f64, end_time_secs: f64) -> Result<Self, PipelineError> {
        let range = Self {
            start_time_secs,
            end_time_secs,
        };
        range.validate()?;
        Ok(range)
    }
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.start_time_secs.is_finite() || !self.end_time_secs.is_finite() {
            return Err(PipelineError::InvalidConfiguration(
                "time range bounds must be finite".into(),
            ));
        }
        if self.start_time_secs > self.end_time_secs {
            return Err(PipelineError::InvalidConfiguration(format!(
                "time range start {} is after end {}",
                self.start_time_secs, self.end_time_secs
            )));
        }
        Ok(())
    }
    pub fn duration_secs(&self) -> f64 {
        self.end_time_secs - self.start_time_secs
    }
    pub fn contains(&self, time_secs: f64) -> bool {
        time_secs >= self.start_time_secs && time_secs <= self.end_time_secs
    }
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_time_secs <= other.end_time_secs && other.start_time_secs <= self.end_time_secs
    }
    /// Bit-exact key used by caches; two ranges hash equal only if identical.
    pub fn cache_key(&self) -> (u64, u64) {
        (self.start_time_secs.to_bits(), self.end_time_secs.to_bits())
    }
}
/// Immutable run of evenly spaced samples for one channel.
///
/// Samples sit behind an `Arc` so a segment can be handed to a worker by moving the
/// handle; nobody mutates the samples once the segment exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformSegment {
    pub id: String,
    pub sample_rate: f64,
    pub start_time: f64,
    pub samples: Arc<[f64]>,
}
impl WaveformSegment {
    pub fn new(
        id: impl Into<String>,
        sample_rate: f64,
        start_time: f64,
        samples: impl Into<Arc<[f64]>>,
    ) -> Self {
        Self {
            id: id.into(),
            sample_rate,
            start_time,
            samples: samples.into(),
        }
    }
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(PipelineError::InvalidSegment(format!(
                "segment {} has sample rate {}; must be greater than zero",
                self.id, self.sample_rate
            )));
        }
        if !self.start_time.is_finite() {
            return Err(PipelineError::InvalidSegment(format!(
                "segment {} has a non-finite start time",
                self.id
            )));
        }
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration_secs()
    }
    /// Time of sample `index`.
    pub fn time_of(&self, index: usize) -> f64 {
        self.start_time + index as f64 / self.sample_rate
    }
    /// Time covered from the first to the last sample.
    pub fn time_range(&self) -> TimeRange {
        let last = self.samples.len().saturating_sub(1);
        TimeRange {
            start_time_secs: self.start_time,
            end_time_secs: self.time_of(last),
        }
    }
    /// Inclusive index bounds of the samples falling inside `range`, or `None`.
    pub fn index_range(&self, range: &TimeRange) -> Option<(usize, usize)> {
        if self.samples.is_empty() {
            return None;
        }
        let last_index = (self.samples.len() - 1) as f64;
        // Tolerate rounding when a bound sits exactly on a sample time.
        let first = ((range.start_time_secs - self.start_time) * self.sample_rate - INDEX_EPSILON)
            .ceil()
            .max(0.0);
        let last = ((range.end_time_secs - self.start_time) * self.sample_rate + INDEX_EPSILON)
            .floor()
            .min(last_index);
        if first > last {
            return None;
        }
        Some((first as usize, last as usize))
    }
}
/// Position of a channel relative to its array's reference point, in kilometres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPosition {
    pub east_km: f64,
    pub north_km: f64,
    pub vertical_km: f64,
}
/// A waveform segment tagged with the channel that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSegment {
    pub channel: String,
    pub position: ChannelPosition,
    pub segment: WaveformSegment,
}
impl ChannelSegment {
    pub fn new(channel: impl Into<String>, position: ChannelPosition, segment: WaveformSegment) -> Self {
        Self {
            channel: channel.into(),
            position,
            segment,
        }
    }
}
