//! Delay-and-sum event beams.
use serde::{Deserialize, Serialize};
use crate::sigpro::fk::KM_PER_DEG;
use crate::sigpro::{ChannelSegment, PipelineError, TimeRange, WaveformSegment};
/// Beam for one station toward a hypothesized arrival.
///
/// `azimuth_deg` and `slowness_s_per_deg` use the same convention as FK attributes
/// (clockwise from north, slowness vector `s * (sin az, cos az)`), so an FK peak can be
/// beamed directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationBeamRequest {
    pub station: String,
    pub channels: Vec<ChannelSegment>,
    pub azimuth_deg: f64,
    pub slowness_s_per_deg: f64,
    pub window: TimeRange,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBeamRequest {
    pub event_hypothesis_id: String,
    pub stations: Vec<StationBeamRequest>,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBeam {
    pub event_hypothesis_id: String,
    pub station: String,
    pub beam: WaveformSegment,
}
/// One beam per requested station, in request order. Any station failure fails the call.
pub fn fetch_event_beams(request: &EventBeamRequest) -> Result<Vec<EventBeam>, PipelineError> {
    request
        .stations
        .iter()
        .map(|station| -> Result<EventBeam, PipelineError> {
            let beam = station_beam(station)?;
            Ok(EventBeam {
                event_hypothesis_id: request.event_hypothesis_id.clone(),
                station: station.station.clone(),
                beam,
            })
        })
        .collect()
}
pub fn station_beam(request: &StationBeamRequest) -> Result<WaveformSegment, PipelineError> {
    request.window.validate()?;
    let first = request.channels.first().ok_or_else(|| {
        PipelineError::InvalidConfiguration(format!("station {} has no channels to beam", request.station))
    })?;
    let rate = first.segment.sample_rate;
    for channel in &request.channels {
        channel.segment.validate()?;
        if (channel.segment.sample_rate - rate).abs() > rate * 1e-6 {
            return Err(PipelineError::InvalidSegment(format!(
                "channel {} is sampled at {} Hz, station {} beams at {} Hz",
                channel.channel, channel.segment.sample_rate, request.station, rate
            )));
        }
    }
    if !(request.azimuth_deg.is_finite() && request.slowness_s_per_deg.is_finite()) {
        return Err(PipelineError::InvalidConfiguration(
            "beam azimuth and slowness must be finite".into(),
        ));
    }
    let azimuth = request.azimuth_deg.to_radians();
    let slowness_x = request.slowness_s_per_deg * azimuth.sin();
    let slowness_y = request.slowness_s_per_deg * azimuth.cos();
    let delays: Vec<f64> = request
        .channels
        .iter()
        .map(|c| (slowness_x * c.position.east_km + slowness_y * c.position.north_km) / KM_PER_DEG)
        .collect();
    let count = (request.window.duration_secs() * rate).floor() as usize + 1;
    let start = request.window.start_time_secs;
    let samples: Vec<f64> = (0..count)
        .map(|k| {
            let t = start + k as f64 / rate;
            let mut sum = 0.0;
            let mut used = 0usize;
            for (channel, tau) in request.channels.iter().zip(&delays) {
                if let Some(value) = interpolate(&channel.segment, t + tau) {
                    sum += value;
                    used += 1;
                }
            }
            if used == 0 {
                0.0
            } else {
                sum / used as f64
            }
        })
        .collect();
    log::debug!(
        "beam {}: {} channels, {} samples",
        request.station,
        request.channels.len(),
        samples.len()
    );
    Ok(WaveformSegment::new(
        format!("{}/beam", request.station),
        rate,
        start,
        samples,
    ))
}
/// Linearly interpolated value at `time`, or `None` outside the segment.
fn interpolate(segment: &WaveformSegment, time: f64) -> Option<f64> {
    if segment.is_empty() {
        return None;
    }
    let position = (time - segment.start_time) * segment.sample_rate;
    let last = (segment.len() - 1) as f64;
    if position < -1e-9 || position > last + 1e-9 {
        return None;
    }
    let position = position.clamp(0.0, last);
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(segment.len() - 1);
    let fraction = position - lower as f64;
    Some(segment.samples[lower] * (1.0 - fraction) + segment.samples[upper] * fraction)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigpro::ChannelPosition;
    use std::f64::consts::PI;
    fn channel(name: &str, east_km: f64, north_km: f64, samples: Vec<f64>, rate: f64) -> ChannelSegment {
        ChannelSegment::new(
            name,
            ChannelPosition {
                east_km,
                north_km,
                vertical_km: 0.0,
            },
            WaveformSegment::new(name, rate, 0.0, samples),
        )
    }
    #[test]
    fn aligned_beam_reproduces_the_source() {
        let rate = 40.0;
        let slowness = (8.0, 0.0);
        let source = |t: f64| (2.0 * PI * 0.5 * t).sin();
        let channels: Vec<ChannelSegment> = [(0.0, 0.0), (2.0, 1.0), (-3.0, 0.5)]
            .iter()
            .enumerate()
            .map(|(i, &(e, n))| {
                let tau = (slowness.0 * e + slowness.1 * n) / KM_PER_DEG;
                let samples = (0..800).map(|k| source(k as f64 / rate - tau)).collect();
                channel(&format!("S.C{i}.SHZ"), e, n, samples, rate)
            })
            .collect();
        let request = StationBeamRequest {
            station: "S".into(),
            channels,
            azimuth_deg: 90.0,
            slowness_s_per_deg: 8.0,
            window: TimeRange::new(2.0, 10.0).unwrap(),
        };
        let beam = station_beam(&request).unwrap();
        assert_eq!(beam.len(), 321);
        for (k, value) in beam.samples.iter().enumerate() {
            let expected = source(2.0 + k as f64 / rate);
            assert!((value - expected).abs() < 5e-3, "sample {k}: {value} vs {expected}");
        }
    }
    #[test]
    fn mixed_sample_rates_are_rejected() {
        let request = StationBeamRequest {
            station: "S".into(),
            channels: vec![
                channel("S.A.SHZ", 0.0, 0.0, vec![0.0; 10], 40.0),
                channel("S.B.SHZ", 1.0, 0.0, vec![0.0; 10], 20.0),
            ],
            azimuth_deg: 0.0,
            slowness_s_per_deg: 5.0,
            window: TimeRange::new(0.0, 0.1).unwrap(),
        };
        assert!(matches!(
            station_beam(&request),
            Err(PipelineError::InvalidSegment(_))
        ));
    }
    #[test]
    fn beams_follow_request_order() {
        let station = |name: &str| StationBeamRequest {
            station: name.into(),
            channels: vec![channel(&format!("{name}.A.SHZ"), 0.0, 0.0, vec![1.0; 20], 10.0)],
            azimuth_deg: 0.0,
            slowness_s_per_deg: 0.0,
            window: TimeRange::new(0.0, 1.0).unwrap(),
        };
        let request = EventBeamRequest {
            event_hypothesis_id: "hyp-1".into(),
            stations: vec![station("ZZ"), station("AA")],
        };
        let beams = fetch_event_beams(&request).unwrap();
        let names: Vec<&str> = beams.iter().map(|b| b.station.as_str()).collect();
        assert_eq!(names, vec!["ZZ", "AA"]);
        assert!(beams[0].beam.samples.iter().all(|&v| v == 1.0));
        let empty = EventBeamRequest {
            event_hypothesis_id: "hyp-2".into(),
            stations: vec![StationBeamRequest {
                channels: Vec::new(),
                ..station("X")
            }],
        };
        assert!(fetch_event_beams(&empty).is_err());
    }
}
