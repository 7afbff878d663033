use crate::cue::Cue;

/// Map a playback time to the cue being shown at that instant.
///
/// Scans in declaration order and returns the first cue whose half-open
/// interval `[start, end)` contains the time, so overlapping cues resolve
/// to the earliest-declared one. A missing time is treated as 0.
pub fn active_cue(cues: &[Cue], time: Option<f64>) -> Option<usize> {
    let time = time.unwrap_or(0.0);
    cues.iter()
        .position(|cue| time >= cue.start && time < cue.end)
}
