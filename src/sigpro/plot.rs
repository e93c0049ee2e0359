use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::sigpro::error::PipelineError;
use crate::sigpro::fk::FkSpectrum;
use crate::weavess::PositionBuffer;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            background: RGBColor(10, 10, 10),
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA, YELLOW, WHITE],
        }
    }
}
impl PlotStyle {
    /// Palette colour for lane `idx`; white when the palette is empty.
    pub fn trace_color(&self, idx: usize) -> RGBColor {
        match self.palette.len() {
            0 => WHITE,
            n => self.palette[idx % n],
        }
    }
}
fn bounds(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return None;
    }
    if (hi - lo).abs() < f32::EPSILON {
        return Some((lo - 1.0, hi + 1.0));
    }
    Some((lo, hi))
}
/// One lane per buffer, top to bottom, each scaled to its own amplitude range.
pub fn render_waveform_png(
    buffers: &[PositionBuffer],
    style: &PlotStyle,
) -> Result<Vec<u8>, PipelineError> {
    if buffers.iter().all(|b| b.is_empty()) {
        return Err(PipelineError::Plot("no vertices to draw".into()));
    }
    let x_range = bounds(buffers.iter().flat_map(|b| b.points().map(|(x, _)| x)))
        .ok_or_else(|| PipelineError::Plot("no finite x positions".into()))?;
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let lanes = root.split_evenly((buffers.len(), 1));
        for (idx, (lane, trace)) in lanes.iter().zip(buffers).enumerate() {
            let Some(y_range) = bounds(trace.points().map(|(_, y)| y)) else {
                continue;
            };
            let color = style.trace_color(idx);
            let mut chart = ChartBuilder::on(lane)
                .margin(4)
                .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;
            chart.draw_series(LineSeries::new(trace.points(), &color))?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Heat map of one FK power grid, x slowness left to right and y slowness bottom to top.
pub fn render_fk_png(spectrum: &FkSpectrum, style: &PlotStyle) -> Result<Vec<u8>, PipelineError> {
    let (count_x, count_y) = spectrum.power.dim();
    if count_x == 0 || count_y == 0 {
        return Err(PipelineError::Plot("FK grid is empty".into()));
    }
    let (low, high) = bounds(spectrum.power.iter().map(|&v| v as f32))
        .ok_or_else(|| PipelineError::Plot("FK grid has no finite power".into()))?;
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0..count_x as i32, 0..count_y as i32)?;
        chart.draw_series(spectrum.power.indexed_iter().map(|((x, y), &value)| {
            let level = ((value as f32 - low) / (high - low)).clamp(0.0, 1.0) as f64;
            let color = HSLColor(0.66 * (1.0 - level), 0.9, 0.15 + 0.4 * level);
            Rectangle::new(
                [(x as i32, y as i32), (x as i32 + 1, y as i32 + 1)],
                color.filled(),
            )
        }))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PipelineError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| PipelineError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
