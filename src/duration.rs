#![forbid(unsafe_code)]

//! Helpers around the platform's compact ISO-8601 durations (`PT1H5M`, `PT45S`).

use log::warn;
use regex::Regex;
use std::sync::OnceLock;

/// Videos at or below this length are Shorts. Not configurable.
pub const SHORT_MAX_SECONDS: u64 = 60;

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
            .expect("duration pattern compiles")
    })
}

/// Parses `P[nD][T[nH][nM][nS]]` into seconds. Every component is optional and
/// a bare `PT`/`P0D` is zero. Returns `None` when the text does not follow the
/// grammar at all.
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let captures = duration_pattern().captures(value.trim())?;
    let component = |index: usize| -> Option<u64> {
        match captures.get(index) {
            Some(matched) => matched.as_str().parse::<u64>().ok(),
            None => Some(0),
        }
    };

    let days = component(1)?;
    let hours = component(2)?;
    let minutes = component(3)?;
    let seconds = component(4)?;
    days.checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

/// Lenient variant used while building summaries: anything unparseable is
/// logged and counted as zero so a single odd record never fails a run.
pub fn duration_seconds_or_zero(video_id: &str, value: Option<&str>) -> u64 {
    let Some(raw) = value else {
        warn!("video {video_id} has no duration; treating it as 0s");
        return 0;
    };
    parse_iso8601_duration(raw).unwrap_or_else(|| {
        warn!("video {video_id} has unparseable duration {raw:?}; treating it as 0s");
        0
    })
}

pub fn is_short(duration_seconds: u64) -> bool {
    duration_seconds <= SHORT_MAX_SECONDS
}

/// Renders durations as `H:MM:SS` or `M:SS` for short clips.
pub fn format_duration(duration: u64) -> String {
    let hours = duration / 3600;
    let minutes = (duration % 3600) / 60;
    let seconds = duration % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_component_subset() {
        for hours in [None, Some(2u64)] {
            for minutes in [None, Some(5u64)] {
                for seconds in [None, Some(10u64)] {
                    let mut encoded = String::from("PT");
                    if let Some(h) = hours {
                        encoded.push_str(&format!("{h}H"));
                    }
                    if let Some(m) = minutes {
                        encoded.push_str(&format!("{m}M"));
                    }
                    if let Some(s) = seconds {
                        encoded.push_str(&format!("{s}S"));
                    }
                    let expected = hours.unwrap_or(0) * 3600
                        + minutes.unwrap_or(0) * 60
                        + seconds.unwrap_or(0);
                    assert_eq!(parse_iso8601_duration(&encoded), Some(expected), "{encoded}");
                }
            }
        }
    }

    #[test]
    fn documented_examples() {
        assert_eq!(parse_iso8601_duration("PT1H5M"), Some(3900));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT"), Some(0));
    }

    #[test]
    fn day_component_and_zero_day_are_accepted() {
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
    }

    #[test]
    fn components_out_of_order_are_rejected() {
        assert_eq!(parse_iso8601_duration("PT5M1H"), None);
        assert_eq!(parse_iso8601_duration("1H5M"), None);
        assert_eq!(parse_iso8601_duration("PT-5S"), None);
        assert_eq!(parse_iso8601_duration(""), None);
    }

    #[test]
    fn lenient_parse_falls_back_to_zero() {
        assert_eq!(duration_seconds_or_zero("a", Some("garbage")), 0);
        assert_eq!(duration_seconds_or_zero("a", None), 0);
        assert_eq!(duration_seconds_or_zero("a", Some("PT3M")), 180);
    }

    #[test]
    fn short_threshold_is_inclusive() {
        assert!(is_short(0));
        assert!(is_short(60));
        assert!(!is_short(61));
    }

    #[test]
    fn format_duration_switches_on_hours() {
        assert_eq!(format_duration(45), "0:45");
        assert_eq!(format_duration(300), "5:00");
        assert_eq!(format_duration(3700), "1:01:40");
    }
}
