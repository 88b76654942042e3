use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("version string is empty")]
    Empty,
    #[error("invalid segment '{segment}' at position {index} in version '{version}'")]
    InvalidSegment {
        version: String,
        index: usize,
        segment: String,
    },
}

/// Returns `true` when `current` orders strictly before `latest`.
///
/// Segments that are not non-negative integers are dropped before comparing,
/// so `"1.x.3"` compares as `"1.3"`. Missing trailing segments count as zero.
#[must_use]
pub fn is_older(current: &str, latest: &str) -> bool {
    compare_versions(current, latest) == Ordering::Less
}

#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = lenient_segments(a);
    let b = lenient_segments(b);
    let len = a.len().max(b.len());

    for idx in 0..len {
        let x = a.get(idx).copied().unwrap_or(0);
        let y = b.get(idx).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }

    Ordering::Equal
}

fn lenient_segments(version: &str) -> Vec<u64> {
    version
        .split('.')
        .filter_map(|segment| segment.parse::<u64>().ok())
        .collect()
}

/// Whether the lenient parser would silently drop any part of `version`.
#[must_use]
pub fn has_dropped_segments(version: &str) -> bool {
    !version.is_empty() && version.split('.').any(|segment| segment.parse::<u64>().is_err())
}

/// Parse every dot-separated segment, rejecting anything that is not a
/// non-negative integer.
///
/// # Errors
/// Returns an error for an empty string or for the first malformed segment.
pub fn parse_segments_strict(version: &str) -> Result<Vec<u64>, VersionParseError> {
    if version.is_empty() {
        return Err(VersionParseError::Empty);
    }

    version
        .split('.')
        .enumerate()
        .map(|(index, segment)| {
            segment
                .parse::<u64>()
                .map_err(|_| VersionParseError::InvalidSegment {
                    version: version.to_string(),
                    index,
                    segment: segment.to_string(),
                })
        })
        .collect()
}
