use crate::sigpro::PipelineError;
/// Parse an ISO-8601 duration such as `PT4S`, `PT1M30.5S` or `P1DT2H` into seconds.
///
/// Years and months are rejected since they have no fixed length.
pub fn parse_iso8601_secs(text: &str) -> Result<f64, PipelineError> {
    let invalid = |why: &str| {
        PipelineError::InvalidConfiguration(format!("bad ISO-8601 duration {text:?}: {why}"))
    };
    let body = text
        .trim()
        .strip_prefix('P')
        .ok_or_else(|| invalid("missing leading 'P'"))?;
    if body.is_empty() {
        return Err(invalid("no components"));
    }
    let mut total = 0.0;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;
    for ch in body.chars() {
        match ch {
            'T' => {
                if in_time || !number.is_empty() {
                    return Err(invalid("misplaced 'T'"));
                }
                in_time = true;
            }
            '0'..='9' | '.' | ',' => number.push(if ch == ',' { '.' } else { ch }),
            unit => {
                let value: f64 = number
                    .parse()
                    .map_err(|_| invalid("component without a number"))?;
                number.clear();
                let scale = match (in_time, unit) {
                    (false, 'W') => 604_800.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    (false, 'Y') | (false, 'M') => return Err(invalid("calendar units are not supported")),
                    _ => return Err(invalid("unknown designator")),
                };
                total += value * scale;
                saw_component = true;
            }
        }
    }
    if !number.is_empty() || !saw_component {
        return Err(invalid("trailing number without a designator"));
    }
    Ok(total)
}
/// Format seconds back into the `PT<n>S` form used by compute inputs.
pub fn format_iso8601_secs(secs: f64) -> String {
    format!("PT{secs}S")
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn parses_common_window_durations() {
        assert_eq!(parse_iso8601_secs("PT4S").unwrap(), 4.0);
        assert_eq!(parse_iso8601_secs("PT1M30.5S").unwrap(), 90.5);
        assert_eq!(parse_iso8601_secs("P1DT1H").unwrap(), 90_000.0);
        assert_eq!(parse_iso8601_secs("PT0,25S").unwrap(), 0.25);
    }
    #[test]
    fn rejects_malformed_durations() {
        for bad in ["4S", "P", "PT", "PT4", "P1M", "PTxS", "PT1S2"] {
            assert!(parse_iso8601_secs(bad).is_err(), "{bad} should fail");
        }
    }
    #[test]
    fn format_round_trips() {
        assert_eq!(parse_iso8601_secs(&format_iso8601_secs(2.5)).unwrap(), 2.5);
    }
}
