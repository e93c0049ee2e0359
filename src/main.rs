// src/main.rs
// 演示：合成台阵数据 -> worker 计算 FK -> 生成顶点缓冲 -> 输出 PNG
use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use anyhow::{bail, Context, Result};
use seisview::sigpro::{
    format_iso8601_secs, render_fk_png, render_waveform_png, ChannelPosition, ChannelSegment, FkComputeInput,
    PlotStyle, SlownessGrid, TimeRange, WaveformSegment, KM_PER_DEG,
};
use seisview::store::StoreSnapshot;
use seisview::types::FkComputeRequest;
use seisview::weavess::{
    RecordSectionEntry, RecordSectionLayout, RecordSectionOffset, RecordSectionRequest, WaveformDisplay,
};
use seisview::{spawn_workers, AppConfig};
const SAMPLE_RATE: f64 = 40.0;
const SAMPLE_COUNT: usize = 604;
const START_TIME: f64 = 1_700_000_000.0;
// 合成一个以给定慢度传播的平面波
fn synthesize_array(slowness: (f64, f64)) -> Vec<ChannelSegment> {
    let layout = [(0.0, 0.0), (3.0, 0.5), (-1.5, 2.5), (-2.0, -2.0), (1.0, -3.0)];
    layout
        .iter()
        .enumerate()
        .map(|(i, &(east_km, north_km))| {
            let delay = (slowness.0 * east_km + slowness.1 * north_km) / KM_PER_DEG;
            let samples: Vec<f64> = (0..SAMPLE_COUNT)
                .map(|k| {
                    let t = k as f64 / SAMPLE_RATE - delay;
                    let envelope = (-((t - 7.0) / 3.0).powi(2)).exp();
                    envelope * ((2.0 * PI * 1.0 * t).sin() + 0.6 * (2.0 * PI * 2.25 * t).sin())
                })
                .collect();
            let name = format!("DEMO.DM0{}.SHZ", i + 1);
            ChannelSegment::new(
                name.clone(),
                ChannelPosition {
                    east_km,
                    north_km,
                    vertical_km: 0.0,
                },
                WaveformSegment::new(name, SAMPLE_RATE, START_TIME, samples),
            )
        })
        .collect()
}
fn main() -> Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => AppConfig::from_path(&path).with_context(|| format!("loading {path}"))?,
        None => AppConfig::default(),
    };
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_owned()));
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let pool = spawn_workers(&config).context("starting workers")?;
    let client = pool.client();
    log::info!("{} workers running", pool.thread_count());
    let channels = synthesize_array((4.0, -3.0));
    let input = FkComputeInput {
        start_time: START_TIME,
        sample_rate: SAMPLE_RATE,
        sample_count: SAMPLE_COUNT,
        channels: channels.iter().map(|c| c.channel.clone()).collect(),
        window_lead: "PT1S".to_owned(),
        window_length: "PT4S".to_owned(),
        low_frequency: 0.5,
        high_frequency: 3.0,
        use_channel_vertical_offset: false,
        phase_type: "P".to_owned(),
        normalize_waveforms: true,
        slowness_grid: SlownessGrid::centered(25, 12.0),
    };
    let request = FkComputeRequest {
        input,
        channels: channels.clone(),
    };
    let thumbnails = match config.fk.frequency_bands.is_empty() {
        true => Vec::new(),
        false => client.compute_fk_frequency_thumbnails(&request, &config.fk.frequency_bands)?,
    };
    let spectra = client
        .compute_fk(request)?
        .wait()
        .context("computing FK spectra")?;
    for (band, call) in thumbnails {
        let banded = call.wait().context("computing FK thumbnail")?;
        let peak = client.get_peak_fk_attributes(banded)?.wait()?;
        log::info!(
            "{:.1}-{:.1} Hz: peak F = {:.1}",
            band.low_frequency_hz,
            band.high_frequency_hz,
            peak.peak_fstat
        );
    }
    log::info!(
        "{} FK windows of {} every {}",
        spectra.spectrums.len(),
        format_iso8601_secs(spectra.window_length_secs),
        format_iso8601_secs(spectra.window_lead_secs)
    );
    let peak = client
        .get_peak_fk_attributes(spectra.clone())?
        .wait()
        .context("locating FK peak")?;
    log::info!(
        "peak in window {}: azimuth {:.1} deg, slowness {:.2} s/deg (F = {:.1})",
        peak.window_index,
        peak.azimuth_deg,
        peak.slowness,
        peak.peak_fstat
    );
    println!(
        "azimuth {:.1} +/- {:.1} deg, slowness {:.2} +/- {:.2} s/deg",
        peak.azimuth_deg, peak.azimuth_uncertainty_deg, peak.slowness, peak.slowness_uncertainty
    );
    let domain = channels[0].segment.time_range();
    let mut display = WaveformDisplay::new(client.clone(), domain, &config.display)?;
    for channel in &channels {
        display.add_channel(channel.segment.clone())?;
    }
    let width = display.width_px() as f64;
    display.zoom_in(width / 2.0);
    display.request_buffers()?;
    if display.begin_measure(width * 0.4) {
        display.drag_measure(width * 0.6);
        if let Some(range) = display.release_measure() {
            log::info!("measure window {:.2}..{:.2}", range.start_time_secs, range.end_time_secs);
        }
    }
    display.request_measure_buffers()?;
    while !display.is_idle() {
        let summary = display.poll();
        if summary.failed > 0 {
            bail!("{} buffer requests failed", summary.failed);
        }
        thread::sleep(Duration::from_millis(5));
    }
    let buffers: Vec<_> = (0..display.channel_count())
        .filter_map(|i| display.buffer(i).map(|b| (*b).clone()))
        .collect();
    let snapshot: StoreSnapshot = channels
        .iter()
        .map(|c| (c.channel.clone(), c.segment.samples.clone()))
        .collect();
    client.import_waveform_store(snapshot.clone())?.wait()?;
    let exported = client.export_waveform_store()?.wait()?;
    if exported != snapshot {
        bail!("waveform store did not round-trip");
    }
    let entries = channels
        .iter()
        .map(|c| RecordSectionEntry {
            id: c.channel.clone(),
            segment: c.segment.clone(),
            offset: RecordSectionOffset::DistanceKm(c.position.east_km.hypot(c.position.north_km)),
        })
        .collect();
    let section = client
        .create_record_section(RecordSectionRequest::new(
            entries,
            domain,
            config.display.width_px,
            RecordSectionLayout::Distance,
            &config.display.record_section,
        ))?
        .wait()
        .context("building record section")?;
    for legend in &section.legend {
        log::debug!("record section {} at {:.3} deg", legend.id, legend.value);
    }
    let style = PlotStyle::default();
    let strongest = spectra
        .spectrums
        .get(peak.window_index)
        .context("peak window missing from spectra")?;
    fs::write(out_dir.join("waveforms.png"), render_waveform_png(&buffers, &style)?)?;
    fs::write(out_dir.join("fk.png"), render_fk_png(strongest, &style)?)?;
    let viewport: TimeRange = display.viewport();
    log::info!(
        "wrote {} traces over {:.2}..{:.2} to {}",
        buffers.len(),
        viewport.start_time_secs,
        viewport.end_time_secs,
        out_dir.display()
    );
    pool.shutdown();
    Ok(())
}
