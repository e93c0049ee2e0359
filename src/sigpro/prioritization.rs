//! Channel prioritization used ahead of beamforming.
//!
//! Channel names follow `STATION.SITE.CODE`. For every site the channel whose code appears
//! earliest in the prioritization list wins; sites with no listed code are dropped. The
//! survivors keep the order in which their sites were first seen.
use std::collections::HashMap;
use crate::sigpro::{ChannelSegment, PipelineError};
fn split_channel_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((site, code)) => (site, code),
        None => (name, ""),
    }
}
pub fn prioritize_channels(
    channels: &[ChannelSegment],
    prioritization: &[String],
) -> Vec<ChannelSegment> {
    let mut site_order: Vec<&str> = Vec::new();
    let mut best: HashMap<&str, (usize, &ChannelSegment)> = HashMap::new();
    for channel in channels {
        let (site, code) = split_channel_name(&channel.channel);
        let Some(rank) = prioritization.iter().position(|p| p == code) else {
            log::debug!("dropping {} (code {code:?} not prioritized)", channel.channel);
            continue;
        };
        let replace = match best.get(site) {
            Some((existing, _)) => rank < *existing,
            None => {
                site_order.push(site);
                true
            }
        };
        if replace {
            best.insert(site, (rank, channel));
        }
    }
    site_order
        .into_iter()
        .filter_map(|site| best.get(site).map(|(_, channel)| (*channel).clone()))
        .collect()
}
/// Prioritize and enforce the minimum channel count needed for a beam.
pub fn prioritize_with_minimum(
    channels: &[ChannelSegment],
    prioritization: &[String],
    minimum: usize,
) -> Result<Vec<ChannelSegment>, PipelineError> {
    let selected = prioritize_channels(channels, prioritization);
    if selected.len() < minimum {
        return Err(PipelineError::InsufficientChannels {
            required: minimum,
            available: selected.len(),
        });
    }
    Ok(selected)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigpro::{ChannelPosition, WaveformSegment};
    fn channel(name: &str) -> ChannelSegment {
        ChannelSegment::new(
            name,
            ChannelPosition::default(),
            WaveformSegment::new(name, 40.0, 0.0, vec![0.0; 4]),
        )
    }
    fn list(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }
    #[test]
    fn picks_highest_priority_code_per_site() {
        let channels = vec![
            channel("ASAR.AS01.BHZ"),
            channel("ASAR.AS02.SHZ"),
            channel("ASAR.AS01.SHZ"),
            channel("ASAR.AS03.LHZ"),
        ];
        let chosen = prioritize_channels(&channels, &list(&["SHZ", "BHZ"]));
        let names: Vec<&str> = chosen.iter().map(|c| c.channel.as_str()).collect();
        assert_eq!(names, vec!["ASAR.AS01.SHZ", "ASAR.AS02.SHZ"]);
    }
    #[test]
    fn minimum_is_enforced() {
        let channels = vec![channel("A.S1.SHZ"), channel("A.S2.SHZ")];
        let err = prioritize_with_minimum(&channels, &list(&["SHZ"]), 3).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientChannels {
                required: 3,
                available: 2
            }
        ));
    }
}
