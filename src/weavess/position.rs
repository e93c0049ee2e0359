use serde::{Deserialize, Serialize};
use crate::sigpro::{PipelineError, TimeRange, WaveformSegment};
use crate::weavess::mapper;
/// Flat `(x, y)` vertex pairs, x in pixels and increasing, y in raw amplitude.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionBuffer {
    pub vertices: Vec<f32>,
}
impl PositionBuffer {
    pub fn with_capacity(vertex_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count * 2),
        }
    }
    pub fn from_points(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut buffer = Self::default();
        for (x, y) in points {
            buffer.push(x, y);
        }
        buffer
    }
    pub fn push(&mut self, x: f32, y: f32) {
        self.vertices.push(x);
        self.vertices.push(y);
    }
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
    pub fn points(&self) -> impl Iterator<Item = (f32, f32)> + Clone + '_ {
        self.vertices.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }
}
/// Payload of a CREATE_POSITION_BUFFER call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionBufferRequest {
    pub segment: WaveformSegment,
    pub viewport: TimeRange,
    pub width_px: u32,
}
impl PositionBufferRequest {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.segment.validate()?;
        self.viewport.validate()?;
        if self.width_px == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "render width must be at least one pixel".into(),
            ));
        }
        Ok(())
    }
}
pub fn build_position_buffer(request: &PositionBufferRequest) -> Result<PositionBuffer, PipelineError> {
    request.validate()?;
    let segment = &request.segment;
    let viewport = &request.viewport;
    let width = request.width_px;
    let Some((first, last)) = segment.index_range(viewport) else {
        return Ok(PositionBuffer::default());
    };
    let count = last - first + 1;
    let x_of = |index: usize| mapper::project(segment.time_of(index), viewport, width) as f32;
    let columns = width as usize;
    if count <= 2 * columns {
        let mut buffer = PositionBuffer::with_capacity(count);
        for index in first..=last {
            buffer.push(x_of(index), segment.samples[index] as f32);
        }
        return Ok(buffer);
    }
    let mut buffer = PositionBuffer::with_capacity(2 * columns);
    for column in 0..columns {
        let lo = first + column * count / columns;
        let hi = first + (column + 1) * count / columns;
        let (min_index, max_index) = extremes(&segment.samples, lo, hi);
        let (a, b) = if min_index <= max_index {
            (min_index, max_index)
        } else {
            (max_index, min_index)
        };
        buffer.push(x_of(a), segment.samples[a] as f32);
        buffer.push(x_of(b), segment.samples[b] as f32);
    }
    Ok(buffer)
}
/// Indices of the minimum and maximum in `samples[lo..hi]`; first occurrence wins.
fn extremes(samples: &[f64], lo: usize, hi: usize) -> (usize, usize) {
    let mut min_index = lo;
    let mut max_index = lo;
    for index in lo + 1..hi {
        if samples[index] < samples[min_index] {
            min_index = index;
        }
        if samples[index] > samples[max_index] {
            max_index = index;
        }
    }
    (min_index, max_index)
}
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    fn request(samples: Vec<f64>, rate: f64, viewport: (f64, f64), width_px: u32) -> PositionBufferRequest {
        PositionBufferRequest {
            segment: WaveformSegment::new("seg", rate, 0.0, samples),
            viewport: TimeRange::new(viewport.0, viewport.1).unwrap(),
            width_px,
        }
    }
    #[test]
    fn no_overlap_gives_empty_buffer() {
        let buffer = build_position_buffer(&request(vec![1.0; 50], 10.0, (100.0, 200.0), 80)).unwrap();
        assert!(buffer.is_empty());
    }
    #[test]
    fn zero_sample_rate_is_invalid_segment() {
        let result = build_position_buffer(&request(vec![1.0; 50], 0.0, (0.0, 5.0), 80));
        assert!(matches!(result, Err(PipelineError::InvalidSegment(_))));
    }
    #[test]
    fn sparse_data_keeps_every_sample() {
        let samples: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let buffer = build_position_buffer(&request(samples, 10.0, (0.0, 4.9), 100)).unwrap();
        assert_eq!(buffer.vertex_count(), 50);
        let ys: Vec<f32> = buffer.points().map(|(_, y)| y).collect();
        assert_eq!(ys[0], 0.0);
        assert_eq!(ys[49], 49.0);
        let (x0, _) = buffer.points().next().unwrap();
        assert_eq!(x0, 0.0);
    }
    #[test]
    fn dense_data_is_decimated_to_two_per_column() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let width = rng.gen_range(1..400u32);
            let count = rng.gen_range(2 * width as usize + 1..20 * width as usize + 2);
            let samples: Vec<f64> = (0..count).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let rate = 100.0;
            let end = (count - 1) as f64 / rate;
            let buffer = build_position_buffer(&request(samples, rate, (0.0, end), width)).unwrap();
            assert_eq!(buffer.vertex_count(), 2 * width as usize);
            let xs: Vec<f32> = buffer.points().map(|(x, _)| x).collect();
            assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        }
    }
    #[test]
    fn decimation_preserves_spikes() {
        let mut samples = vec![0.0; 10_000];
        samples[5_123] = 50.0;
        samples[7_777] = -30.0;
        let buffer = build_position_buffer(&request(samples, 1_000.0, (0.0, 9.999), 100)).unwrap();
        let ys: Vec<f32> = buffer.points().map(|(_, y)| y).collect();
        assert!(ys.contains(&50.0));
        assert!(ys.contains(&-30.0));
    }
    #[test]
    fn zoomed_viewport_uses_only_overlapping_samples() {
        let samples: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let buffer = build_position_buffer(&request(samples, 10.0, (2.0, 3.0), 200)).unwrap();
        assert_eq!(buffer.vertex_count(), 11);
        assert_eq!(buffer.points().next(), Some((0.0, 20.0)));
        assert_eq!(buffer.points().last(), Some((200.0, 30.0)));
    }
}
