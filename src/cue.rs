use serde::Serialize;

/// A single timed caption entry. Times are seconds from media start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    pub fn empty() -> Self {
        Self {
            start: 0.0,
            end: 0.0,
            text: String::new(),
        }
    }
}

/// Render seconds back into `HH:MM:SS.mmm` form for display.
pub fn format_time(seconds: f64) -> String {
    let total_millis = (seconds * 1000.0).round() as u64;
    let total_secs = total_millis / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}
