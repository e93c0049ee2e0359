// src/sigpro/mod.rs
// 后台 worker 上运行的信号处理模块
pub mod beam;
pub mod duration;
pub mod error;
pub mod fft;
pub mod fk;
pub mod plot;
pub mod prioritization;
pub mod segment;
// 公开导出常用类型
pub use beam::{fetch_event_beams, EventBeam, EventBeamRequest, StationBeamRequest};
pub use duration::{format_iso8601_secs, parse_iso8601_secs};
pub use error::PipelineError;
pub use fft::{BandSpectra, SpectrumBuilder};
pub use fk::{
    compute_fk_frequency_thumbnails, compute_fk_spectra, compute_legacy_fk_spectra,
    get_peak_fk_attributes, select_fk_channels, FkAttributes, FkComputeInput,
    FkFrequencyThumbnail, FkSpectra, FkSpectrum, FrequencyBand, LegacyFkAttributes,
    LegacyFkPowerSpectra, LegacyFkPowerSpectrum, MissingChannel, SlownessGrid, KM_PER_DEG,
};
pub use plot::{render_fk_png, render_waveform_png, PlotStyle};
pub use prioritization::{prioritize_channels, prioritize_with_minimum};
pub use segment::{ChannelPosition, ChannelSegment, TimeRange, WaveformSegment};
