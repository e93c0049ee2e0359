use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::sync::Arc;
/// Complex spectra of one analysis window, restricted to a pass band.
#[derive(Clone, Debug)]
pub struct BandSpectra {
    pub frequencies_hz: Vec<f64>,
    pub bins: Vec<Vec<Complex64>>, // channel -> band bins
}
impl BandSpectra {
    pub fn channel_count(&self) -> usize {
        self.bins.len()
    }
    /// Mean single-channel power across the band.
    pub fn mean_channel_power(&self) -> f64 {
        let bands = self.frequencies_hz.len();
        if bands == 0 || self.bins.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .bins
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|c| c.norm_sqr())
            .sum();
        total / (bands * self.bins.len()) as f64
    }
}
/// Forward FFT helper for a fixed window size, with band selection.
pub struct SpectrumBuilder {
    fft_size: usize,
    sample_rate_hz: f64,
    fft: Arc<dyn Fft<f64>>,
}
impl SpectrumBuilder {
    pub fn new(fft_size: usize, sample_rate_hz: f64) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft_size,
            sample_rate_hz,
            fft,
        }
    }
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
    pub fn band_bins(&self, low_hz: f64, high_hz: f64) -> Option<(usize, usize)> {
        band_bins(self.fft_size, self.sample_rate_hz, low_hz, high_hz)
    }
    /// Demean (and optionally RMS-normalize) every channel, transform, and keep band bins.
    pub fn compute_band(
        &self,
        channels: &[&[f64]],
        low_hz: f64,
        high_hz: f64,
        normalize: bool,
    ) -> Option<BandSpectra> {
        let (low, high) = self.band_bins(low_hz, high_hz)?;
        let resolution = self.sample_rate_hz / self.fft_size as f64;
        let frequencies_hz = (low..=high).map(|k| k as f64 * resolution).collect();
        let bins = channels
            .iter()
            .map(|channel| {
                let mut buffer = prepare(channel, self.fft_size, normalize);
                self.fft.process(&mut buffer);
                buffer[low..=high].to_vec()
            })
            .collect();
        Some(BandSpectra {
            frequencies_hz,
            bins,
        })
    }
}
/// Inclusive bin bounds of `[low_hz, high_hz]` for an `fft_size`-point transform, or `None`
/// when no bin falls inside. Needs no plan, so it is safe to call while validating.
pub fn band_bins(fft_size: usize, sample_rate_hz: f64, low_hz: f64, high_hz: f64) -> Option<(usize, usize)> {
    if fft_size == 0 {
        return None;
    }
    let resolution = sample_rate_hz / fft_size as f64;
    let low = (low_hz / resolution).ceil().max(0.0) as usize;
    let high = ((high_hz / resolution).floor() as usize).min(fft_size / 2);
    (low <= high).then_some((low, high))
}
fn prepare(channel: &[f64], fft_size: usize, normalize: bool) -> Vec<Complex64> {
    let used = channel.len().min(fft_size);
    let window = &channel[..used];
    let mean = if used == 0 {
        0.0
    } else {
        window.iter().sum::<f64>() / used as f64
    };
    let mut scale = 1.0;
    if normalize && used > 0 {
        let rms = (window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / used as f64).sqrt();
        if rms > f64::EPSILON {
            scale = 1.0 / rms;
        }
    }
    let mut buffer: Vec<Complex64> = window
        .iter()
        .map(|v| Complex64::new((v - mean) * scale, 0.0))
        .collect();
    buffer.resize(fft_size, Complex64::new(0.0, 0.0));
    buffer
}
