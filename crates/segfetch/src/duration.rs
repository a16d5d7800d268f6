use regex::Regex;
use std::sync::LazyLock;

use crate::{SegfetchError, SegfetchResult};

// ISO 8601 duration as written in `MPD@mediaPresentationDuration`, e.g. `P0Y0M0DT0H3M30.000S`.
// Year, month and day components are accepted but do not contribute to the result.
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:\d+Y)?(?:\d+M)?(?:\d+D)?T(\d+)H(\d+)M(\d+(?:\.\d*)?)S$").unwrap()
});

/// Parses a manifest duration into seconds, computed as `hours * 3600 + minutes * 60 + seconds`.
pub fn parse_duration<S>(duration: S) -> SegfetchResult<f64>
where
    S: AsRef<str>,
{
    let duration = duration.as_ref().trim();
    let caps = DURATION_REGEX
        .captures(duration)
        .ok_or_else(|| SegfetchError::FormatError(duration.to_string()))?;

    let component = |i: usize| -> SegfetchResult<f64> {
        caps[i]
            .parse::<f64>()
            .map_err(|_| SegfetchError::FormatError(duration.to_string()))
    };

    let hours = component(1)?;
    let minutes = component(2)?;
    let seconds = component(3)?;
    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}
