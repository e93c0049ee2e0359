//! Frequency-wavenumber (FK) spectra.
//!
//! Every analysis window is transformed per channel, then beamed in the frequency domain
//! across the slowness grid:
//!
//! `P(p) = 1/Nf * sum_n |1/M * sum_m X[m,n] * exp(i*2*pi*f_n*tau_m(p))|^2`
//!
//! with `tau_m(p) = p . r_m / KM_PER_DEG` for a slowness `p` in s/deg and a channel offset
//! `r_m` in km. The F-statistic compares beam power with the mean single-channel power.
use ndarray::Array2;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use crate::config::FkConfig;
use crate::sigpro::duration::parse_iso8601_secs;
use crate::sigpro::fft::{band_bins, BandSpectra, SpectrumBuilder};
use crate::sigpro::prioritization::prioritize_with_minimum;
use crate::sigpro::{ChannelSegment, PipelineError, TimeRange};
pub const KM_PER_DEG: f64 = 111.1949266;
const TIME_EPSILON: f64 = 1e-9;
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlownessGrid {
    pub count_x: usize,
    pub count_y: usize,
    pub start_x: f64,
    pub start_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
}
impl SlownessGrid {
    /// Square grid spanning `[-max_slowness, max_slowness]` on both axes.
    pub fn centered(points: usize, max_slowness: f64) -> Self {
        let delta = if points > 1 {
            2.0 * max_slowness / (points - 1) as f64
        } else {
            0.0
        };
        Self {
            count_x: points,
            count_y: points,
            start_x: -max_slowness,
            start_y: -max_slowness,
            delta_x: delta,
            delta_y: delta,
        }
    }
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.count_x == 0 || self.count_y == 0 {
            return Err(PipelineError::InvalidConfiguration(format!(
                "slowness grid must be non-empty, got {}x{}",
                self.count_x, self.count_y
            )));
        }
        let values = [self.start_x, self.start_y, self.delta_x, self.delta_y];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidConfiguration(
                "slowness grid start/delta must be finite".into(),
            ));
        }
        if (self.count_x > 1 && self.delta_x <= 0.0) || (self.count_y > 1 && self.delta_y <= 0.0) {
            return Err(PipelineError::InvalidConfiguration(
                "slowness grid deltas must be positive".into(),
            ));
        }
        Ok(())
    }
    pub fn bin_count(&self) -> usize {
        self.count_x * self.count_y
    }
    /// Physical slowness (s/deg) of bin `(x_bin, y_bin)`.
    pub fn slowness_at(&self, x_bin: usize, y_bin: usize) -> (f64, f64) {
        (
            self.start_x + x_bin as f64 * self.delta_x,
            self.start_y + y_bin as f64 * self.delta_y,
        )
    }
    /// Row-major bin index used for deterministic tie-breaking.
    pub fn bin_index(&self, x_bin: usize, y_bin: usize) -> usize {
        x_bin * self.count_y + y_bin
    }
}
/// Request for an FK computation. `sample_rate` and `sample_count` describe the waveform data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkComputeInput {
    pub start_time: f64,
    pub sample_rate: f64,
    pub sample_count: usize,
    pub channels: Vec<String>,
    pub window_lead: String,
    pub window_length: String,
    pub low_frequency: f64,
    pub high_frequency: f64,
    pub use_channel_vertical_offset: bool,
    pub phase_type: String,
    pub normalize_waveforms: bool,
    pub slowness_grid: SlownessGrid,
}
impl FkComputeInput {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "sample rate {} must be greater than zero",
                self.sample_rate
            )));
        }
        if self.sample_count == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "sample count must be greater than zero".into(),
            ));
        }
        let nyquist = self.sample_rate / 2.0;
        if !(self.low_frequency >= 0.0
            && self.low_frequency < self.high_frequency
            && self.high_frequency <= nyquist)
        {
            return Err(PipelineError::InvalidConfiguration(format!(
                "frequency band [{}, {}] must lie within [0, {nyquist}] Hz",
                self.low_frequency, self.high_frequency
            )));
        }
        self.slowness_grid.validate()?;
        let (lead, length) = self.window_secs()?;
        if !(lead > 0.0 && length > 0.0 && lead.is_finite() && length.is_finite()) {
            return Err(PipelineError::InvalidConfiguration(
                "window lead and length must be positive".into(),
            ));
        }
        let span = self.sample_count as f64 / self.sample_rate;
        if length > span + TIME_EPSILON {
            return Err(PipelineError::InvalidConfiguration(format!(
                "window of {length} s does not fit in {span} s of data"
            )));
        }
        let window_samples = self.window_samples()?;
        if window_samples < 2 {
            return Err(PipelineError::InvalidConfiguration(format!(
                "window of {length} s holds fewer than two samples"
            )));
        }
        if band_bins(window_samples, self.sample_rate, self.low_frequency, self.high_frequency).is_none() {
            return Err(PipelineError::InvalidConfiguration(format!(
                "band [{}, {}] Hz contains no frequency bin for a {length} s window",
                self.low_frequency, self.high_frequency
            )));
        }
        Ok(())
    }
    /// Samples per analysis window. Only meaningful once [`validate`](Self::validate) passed.
    pub fn window_samples(&self) -> Result<usize, PipelineError> {
        let (_, length_secs) = self.window_secs()?;
        Ok((length_secs * self.sample_rate).round() as usize)
    }
    /// Window lead and length, in seconds.
    pub fn window_secs(&self) -> Result<(f64, f64), PipelineError> {
        Ok((
            parse_iso8601_secs(&self.window_lead)?,
            parse_iso8601_secs(&self.window_length)?,
        ))
    }
    pub fn end_time(&self) -> f64 {
        self.start_time + self.sample_count as f64 / self.sample_rate
    }
    pub fn with_band(&self, band: FrequencyBand) -> Self {
        Self {
            low_frequency: band.low_frequency_hz,
            high_frequency: band.high_frequency_hz,
            ..self.clone()
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkSpectrum {
    pub start_time: f64,
    /// Indexed `[x_bin, y_bin]`.
    pub power: Array2<f64>,
    pub fstat: Array2<f64>,
}
/// A requested channel left out of some windows, with the spans it could not cover.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingChannel {
    pub channel: String,
    pub time_ranges: Vec<TimeRange>,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkSpectra {
    pub phase: String,
    pub start_time: f64,
    pub end_time: f64,
    pub window_lead_secs: f64,
    pub window_length_secs: f64,
    pub low_frequency: f64,
    pub high_frequency: f64,
    pub slowness_grid: SlownessGrid,
    pub spectrums: Vec<FkSpectrum>,
    #[serde(default)]
    pub missing_input_channels: Vec<MissingChannel>,
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyBand {
    pub low_frequency_hz: f64,
    pub high_frequency_hz: f64,
}
impl FrequencyBand {
    pub fn new(low_frequency_hz: f64, high_frequency_hz: f64) -> Self {
        Self {
            low_frequency_hz,
            high_frequency_hz,
        }
    }
}
/// FK spectra of one pass band, as shown in the frequency thumbnail strip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkFrequencyThumbnail {
    pub band: FrequencyBand,
    pub spectra: FkSpectra,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkAttributes {
    pub window_index: usize,
    pub x_bin: usize,
    pub y_bin: usize,
    pub slowness_x: f64,
    pub slowness_y: f64,
    pub peak_power: f64,
    pub peak_fstat: f64,
    pub slowness: f64,
    pub slowness_uncertainty: f64,
    pub azimuth_deg: f64,
    pub azimuth_uncertainty_deg: f64,
}
/// Result of the older FK operation; kept separate from [`FkSpectra`] on purpose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFkPowerSpectra {
    pub phase: String,
    pub start_time: f64,
    pub step_size: f64,
    pub window_lead: f64,
    pub window_length: f64,
    pub low_frequency: f64,
    pub high_frequency: f64,
    pub slowness_grid: SlownessGrid,
    pub values: Vec<LegacyFkPowerSpectrum>,
    #[serde(default)]
    pub missing_input_channels: Vec<MissingChannel>,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFkPowerSpectrum {
    pub power: Array2<f64>,
    pub fstat: Array2<f64>,
    pub quality: f64,
    pub attributes: Vec<LegacyFkAttributes>,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFkAttributes {
    pub azimuth: f64,
    pub slowness: f64,
    pub azimuth_uncertainty: f64,
    pub slowness_uncertainty: f64,
    pub peak_fstat: f64,
    pub x_slow: f64,
    pub y_slow: f64,
}
/// Azimuth (deg, clockwise from north) and scalar slowness with grid-derived uncertainties.
struct Polar {
    slowness: f64,
    slowness_uncertainty: f64,
    azimuth_deg: f64,
    azimuth_uncertainty_deg: f64,
}
fn polar_at(grid: &SlownessGrid, slowness_x: f64, slowness_y: f64) -> Polar {
    let slowness = slowness_x.hypot(slowness_y);
    let slowness_uncertainty = 0.5 * grid.delta_x.hypot(grid.delta_y);
    let azimuth_deg = slowness_x.atan2(slowness_y).to_degrees().rem_euclid(360.0);
    let azimuth_uncertainty_deg = if slowness <= slowness_uncertainty {
        180.0
    } else {
        (slowness_uncertainty / slowness).asin().to_degrees()
    };
    Polar {
        slowness,
        slowness_uncertainty,
        azimuth_deg,
        azimuth_uncertainty_deg,
    }
}
/// Channels an FK request beams: the requested subset, prioritized, each sampled at the
/// request's rate. Plans nothing, so the client runs it before queueing a call.
pub fn select_fk_channels(
    input: &FkComputeInput,
    segments: &[ChannelSegment],
    config: &FkConfig,
) -> Result<Vec<ChannelSegment>, PipelineError> {
    let requested: Vec<ChannelSegment> = if input.channels.is_empty() {
        segments.to_vec()
    } else {
        segments
            .iter()
            .filter(|s| input.channels.iter().any(|c| c == &s.channel))
            .cloned()
            .collect()
    };
    let channels = prioritize_with_minimum(
        &requested,
        &config.channel_prioritization,
        config.minimum_waveforms_for_spectra,
    )?;
    for channel in &channels {
        channel.segment.validate()?;
        let mismatch = (channel.segment.sample_rate - input.sample_rate).abs();
        if mismatch > input.sample_rate * 1e-6 {
            return Err(PipelineError::InvalidSegment(format!(
                "channel {} is sampled at {} Hz, expected {} Hz",
                channel.channel, channel.segment.sample_rate, input.sample_rate
            )));
        }
    }
    Ok(channels)
}
/// Which channels each window beams, and what was left out.
struct WindowPlan {
    used: Vec<Vec<usize>>,
    missing: Vec<MissingChannel>,
}
/// Selected channels plus precomputed steering delays, ready to beam any window.
struct Beamformer<'a> {
    input: &'a FkComputeInput,
    channels: Vec<ChannelSegment>,
    minimum: usize,
    builder: SpectrumBuilder,
    window_samples: usize,
    /// Per bin (row-major), per channel delay in seconds.
    delays: Vec<Vec<f64>>,
}
impl<'a> Beamformer<'a> {
    fn prepare(
        input: &'a FkComputeInput,
        segments: &[ChannelSegment],
        config: &FkConfig,
    ) -> Result<Self, PipelineError> {
        input.validate()?;
        let channels = select_fk_channels(input, segments, config)?;
        let window_samples = input.window_samples()?;
        let builder = SpectrumBuilder::new(window_samples, input.sample_rate);
        let grid = &input.slowness_grid;
        let vertical_velocity = config.vertical_velocity_km_s;
        let mut delays = Vec::with_capacity(grid.bin_count());
        for x_bin in 0..grid.count_x {
            for y_bin in 0..grid.count_y {
                let (sx, sy) = grid.slowness_at(x_bin, y_bin);
                let per_channel = channels
                    .iter()
                    .map(|c| {
                        let mut tau = (sx * c.position.east_km + sy * c.position.north_km) / KM_PER_DEG;
                        if input.use_channel_vertical_offset && vertical_velocity > 0.0 {
                            tau += c.position.vertical_km / vertical_velocity;
                        }
                        tau
                    })
                    .collect();
                delays.push(per_channel);
            }
        }
        Ok(Self {
            input,
            channels,
            minimum: config.minimum_waveforms_for_spectra,
            builder,
            window_samples,
            delays,
        })
    }
    /// Start times of every window that fits inside the data, stepping by `step_secs`.
    fn window_starts(&self, step_secs: f64) -> Result<Vec<f64>, PipelineError> {
        let (_, length_secs) = self.input.window_secs()?;
        let data_end = self.input.end_time();
        let mut starts = Vec::new();
        let mut k = 0usize;
        loop {
            let start = self.input.start_time + k as f64 * step_secs;
            if start + length_secs > data_end + TIME_EPSILON {
                break;
            }
            starts.push(start);
            k += 1;
        }
        if starts.is_empty() {
            return Err(PipelineError::InvalidConfiguration(format!(
                "no {length_secs} s window fits in {} s of data",
                data_end - self.input.start_time
            )));
        }
        Ok(starts)
    }
    /// Finite samples of channel `index` covering the window at `start`, if it has them.
    fn window_slice(&self, index: usize, start: f64) -> Option<&[f64]> {
        let segment = &self.channels[index].segment;
        let offset = ((start - segment.start_time) * segment.sample_rate).round();
        if offset < 0.0 || offset as usize + self.window_samples > segment.len() {
            return None;
        }
        let offset = offset as usize;
        let slice = &segment.samples[offset..offset + self.window_samples];
        slice.iter().all(|v| v.is_finite()).then_some(slice)
    }
    /// Drop channels without data for a window; every window must keep the configured minimum.
    fn plan(&self, starts: &[f64]) -> Result<WindowPlan, PipelineError> {
        let length_secs = self.window_samples as f64 / self.input.sample_rate;
        let mut gaps: Vec<Vec<TimeRange>> = vec![Vec::new(); self.channels.len()];
        let mut used = Vec::with_capacity(starts.len());
        for &start in starts {
            let end = start + length_secs;
            let mut covering = Vec::with_capacity(self.channels.len());
            for (index, ranges) in gaps.iter_mut().enumerate() {
                if self.window_slice(index, start).is_some() {
                    covering.push(index);
                    continue;
                }
                match ranges.last_mut() {
                    Some(last) if start <= last.end_time_secs + TIME_EPSILON => {
                        last.end_time_secs = last.end_time_secs.max(end);
                    }
                    _ => ranges.push(TimeRange {
                        start_time_secs: start,
                        end_time_secs: end,
                    }),
                }
            }
            if covering.len() < self.minimum {
                return Err(PipelineError::InsufficientChannels {
                    required: self.minimum,
                    available: covering.len(),
                });
            }
            used.push(covering);
        }
        let missing: Vec<MissingChannel> = self
            .channels
            .iter()
            .zip(gaps)
            .filter(|(_, ranges)| !ranges.is_empty())
            .map(|(channel, time_ranges)| MissingChannel {
                channel: channel.channel.clone(),
                time_ranges,
            })
            .collect();
        for entry in &missing {
            log::debug!(
                "fk: channel {} missing for {} span(s)",
                entry.channel,
                entry.time_ranges.len()
            );
        }
        Ok(WindowPlan { used, missing })
    }
    fn window_spectra(&self, window: usize, start: f64, used: &[usize]) -> Result<BandSpectra, PipelineError> {
        let slices = used
            .iter()
            .map(|&index| {
                self.window_slice(index, start).ok_or_else(|| PipelineError::Beamforming {
                    window,
                    message: format!("channel {} has no data covering {start}", self.channels[index].channel),
                })
            })
            .collect::<Result<Vec<&[f64]>, _>>()?;
        self.builder
            .compute_band(
                &slices,
                self.input.low_frequency,
                self.input.high_frequency,
                self.input.normalize_waveforms,
            )
            .ok_or_else(|| PipelineError::Beamforming {
                window,
                message: "pass band holds no frequency bins".into(),
            })
    }
    fn beam_window(&self, window: usize, start: f64, used: &[usize]) -> Result<FkSpectrum, PipelineError> {
        let spectra = self.window_spectra(window, start, used)?;
        let grid = &self.input.slowness_grid;
        let channel_count = spectra.channel_count() as f64;
        let band_count = spectra.frequencies_hz.len() as f64;
        let mean_power = spectra.mean_channel_power();
        let floor = mean_power * 1e-12 + f64::MIN_POSITIVE;
        let mut power = Array2::<f64>::zeros((grid.count_x, grid.count_y));
        let mut fstat = Array2::<f64>::zeros((grid.count_x, grid.count_y));
        for x_bin in 0..grid.count_x {
            for y_bin in 0..grid.count_y {
                let delays = &self.delays[grid.bin_index(x_bin, y_bin)];
                let mut sum = 0.0;
                for (n, freq) in spectra.frequencies_hz.iter().enumerate() {
                    let mut beam = Complex64::new(0.0, 0.0);
                    for (channel, &index) in spectra.bins.iter().zip(used) {
                        beam += channel[n] * Complex64::from_polar(1.0, 2.0 * PI * freq * delays[index]);
                    }
                    sum += (beam / channel_count).norm_sqr();
                }
                let p = sum / band_count;
                if !p.is_finite() {
                    return Err(PipelineError::Beamforming {
                        window,
                        message: format!("non-finite power at bin ({x_bin}, {y_bin})"),
                    });
                }
                power[[x_bin, y_bin]] = p;
                fstat[[x_bin, y_bin]] = (channel_count - 1.0) * p / (mean_power - p).max(floor);
            }
        }
        Ok(FkSpectrum {
            start_time: start,
            power,
            fstat,
        })
    }
}
/// Compute the FK spectra sequence: one grid per window, windows advancing by the lead.
pub fn compute_fk_spectra(
    input: &FkComputeInput,
    segments: &[ChannelSegment],
    config: &FkConfig,
) -> Result<FkSpectra, PipelineError> {
    let beamformer = Beamformer::prepare(input, segments, config)?;
    let (lead_secs, length_secs) = input.window_secs()?;
    let starts = beamformer.window_starts(lead_secs)?;
    let plan = beamformer.plan(&starts)?;
    log::debug!(
        "fk: {} channels, {} windows, {} bins",
        beamformer.channels.len(),
        starts.len(),
        input.slowness_grid.bin_count()
    );
    let spectrums = starts
        .iter()
        .zip(&plan.used)
        .enumerate()
        .map(|(window, (&start, used))| beamformer.beam_window(window, start, used))
        .collect::<Result<Vec<_>, _>>()?;
    let end_time = starts.last().map(|s| s + length_secs).unwrap_or(input.start_time);
    Ok(FkSpectra {
        phase: input.phase_type.clone(),
        start_time: input.start_time,
        end_time,
        window_lead_secs: lead_secs,
        window_length_secs: length_secs,
        low_frequency: input.low_frequency,
        high_frequency: input.high_frequency,
        slowness_grid: input.slowness_grid,
        spectrums,
        missing_input_channels: plan.missing,
    })
}
/// The same FK request evaluated over each pass band, in band order.
pub fn compute_fk_frequency_thumbnails(
    input: &FkComputeInput,
    segments: &[ChannelSegment],
    config: &FkConfig,
    bands: &[FrequencyBand],
) -> Result<Vec<FkFrequencyThumbnail>, PipelineError> {
    if bands.is_empty() {
        return Err(PipelineError::InvalidConfiguration(
            "no frequency bands to compute thumbnails for".into(),
        ));
    }
    bands
        .iter()
        .map(|&band| {
            let banded = input.with_band(band);
            let spectra = compute_fk_spectra(&banded, segments, config)?;
            Ok(FkFrequencyThumbnail { band, spectra })
        })
        .collect()
}
/// Attributes of the single strongest bin over all windows.
///
/// Ties go to the earliest window, then the lowest row-major bin index.
pub fn get_peak_fk_attributes(spectra: &FkSpectra) -> Result<FkAttributes, PipelineError> {
    let grid = &spectra.slowness_grid;
    let mut best: Option<(usize, usize, usize, f64)> = None;
    for (window, spectrum) in spectra.spectrums.iter().enumerate() {
        if spectrum.power.dim() != (grid.count_x, grid.count_y) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "spectrum {window} has shape {:?}, grid is {}x{}",
                spectrum.power.dim(),
                grid.count_x,
                grid.count_y
            )));
        }
        for ((x_bin, y_bin), &value) in spectrum.power.indexed_iter() {
            if value.is_nan() {
                continue;
            }
            if best.map_or(true, |(.., peak)| value > peak) {
                best = Some((window, x_bin, y_bin, value));
            }
        }
    }
    let (window, x_bin, y_bin, peak_power) = best.ok_or_else(|| {
        PipelineError::InvalidConfiguration("FK spectra contain no power values".into())
    })?;
    let (slowness_x, slowness_y) = grid.slowness_at(x_bin, y_bin);
    let polar = polar_at(grid, slowness_x, slowness_y);
    let peak_fstat = spectra.spectrums[window]
        .fstat
        .get((x_bin, y_bin))
        .copied()
        .unwrap_or(0.0);
    Ok(FkAttributes {
        window_index: window,
        x_bin,
        y_bin,
        slowness_x,
        slowness_y,
        peak_power,
        peak_fstat,
        slowness: polar.slowness,
        slowness_uncertainty: polar.slowness_uncertainty,
        azimuth_deg: polar.azimuth_deg,
        azimuth_uncertainty_deg: polar.azimuth_uncertainty_deg,
    })
}
/// Older FK operation: non-overlapping windows, attributes picked at each window's F-statistic peak.
pub fn compute_legacy_fk_spectra(
    input: &FkComputeInput,
    segments: &[ChannelSegment],
    config: &FkConfig,
) -> Result<LegacyFkPowerSpectra, PipelineError> {
    let beamformer = Beamformer::prepare(input, segments, config)?;
    let (lead_secs, length_secs) = input.window_secs()?;
    let starts = beamformer.window_starts(length_secs)?;
    let plan = beamformer.plan(&starts)?;
    let grid = input.slowness_grid;
    let mut values = Vec::with_capacity(starts.len());
    for (window, (&start, used)) in starts.iter().zip(&plan.used).enumerate() {
        let spectrum = beamformer.beam_window(window, start, used)?;
        let mut peak: Option<((usize, usize), f64)> = None;
        for (bin, &value) in spectrum.fstat.indexed_iter() {
            if value.is_finite() && peak.map_or(true, |(_, best)| value > best) {
                peak = Some((bin, value));
            }
        }
        let ((x_bin, y_bin), peak_fstat) = peak.ok_or_else(|| PipelineError::Beamforming {
            window,
            message: "no finite F-statistic".into(),
        })?;
        let mean_fstat = spectrum.fstat.mean().unwrap_or(0.0);
        let quality = if mean_fstat > 0.0 {
            peak_fstat / mean_fstat
        } else {
            0.0
        };
        let (x_slow, y_slow) = grid.slowness_at(x_bin, y_bin);
        let polar = polar_at(&grid, x_slow, y_slow);
        values.push(LegacyFkPowerSpectrum {
            power: spectrum.power,
            fstat: spectrum.fstat,
            quality,
            attributes: vec![LegacyFkAttributes {
                azimuth: polar.azimuth_deg,
                slowness: polar.slowness,
                azimuth_uncertainty: polar.azimuth_uncertainty_deg,
                slowness_uncertainty: polar.slowness_uncertainty,
                peak_fstat,
                x_slow,
                y_slow,
            }],
        });
    }
    Ok(LegacyFkPowerSpectra {
        phase: input.phase_type.clone(),
        start_time: input.start_time,
        step_size: length_secs,
        window_lead: lead_secs,
        window_length: length_secs,
        low_frequency: input.low_frequency,
        high_frequency: input.high_frequency,
        slowness_grid: grid,
        values,
        missing_input_channels: plan.missing,
    })
}
