use crate::cue::Cue;
use crate::error::VttError;

use anyhow::Context;
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map_res, opt};
use nom::error::VerboseError;
use nom::sequence::preceded;
use nom::IResult;
use regex::Regex;

/// Line-oriented WebVTT parser. Permissive by design: caption generators
/// vary in dialect, so unrecognised lines become cue text or are skipped
/// rather than failing the document.
pub struct Parser {
    emphasis: Regex,
    timing: Regex,
    flush_trailing: bool,
}

/// Parsing mode. Style blocks (`STYLE` or `::cue` selectors) are consumed
/// without producing cues.
enum Mode {
    Normal,
    Style,
}

impl Parser {
    pub fn new() -> Self {
        Self::with_options(false)
    }

    /// `flush_trailing` emits a final cue whose text block is not terminated
    /// by a blank line. Off by default for compatibility: such cues are
    /// normally dropped.
    pub fn with_options(flush_trailing: bool) -> Self {
        Self {
            emphasis: Regex::new(r"(?i)</?em>").unwrap(),
            timing: Regex::new(r"\d{2}:\d{2}:\d{2}\.\d{3}").unwrap(),
            flush_trailing,
        }
    }

    pub fn parse(&self, input: &str) -> Result<Vec<Cue>, anyhow::Error> {
        let input = self.emphasis.replace_all(input, "");

        let mut cues = Vec::new();
        let mut pending = Cue::empty();
        let mut mode = Mode::Normal;

        for line in input.split('\n') {
            // Sequence-number lines carry no information.
            if is_sequence_number(line) {
                continue;
            }

            if line == "STYLE" || line.starts_with("::cue") {
                mode = Mode::Style;
            }
            if let Mode::Style = mode {
                if line.is_empty() || line == "}" {
                    mode = Mode::Normal;
                }
                continue;
            }

            if self.timing.is_match(line) {
                let times: Vec<&str> = line.split(" --> ").collect();
                if times.len() != 2 {
                    continue;
                }
                // Anything after the end timestamp is cue settings; drop it.
                let end = times[1].split(' ').next().unwrap_or("0");
                pending.start = parse_time(times[0].trim())
                    .with_context(|| format!("bad cue timing line: '{}'", line))?;
                pending.end = parse_time(end.trim())
                    .with_context(|| format!("bad cue timing line: '{}'", line))?;
            } else if line.is_empty() {
                if !pending.text.is_empty() {
                    cues.push(std::mem::replace(&mut pending, Cue::empty()));
                }
            } else {
                pending.text.push_str(line);
                pending.text.push('\n');
            }
        }

        if self.flush_trailing && !pending.text.is_empty() {
            cues.push(pending);
        }

        Ok(cues)
    }
}

fn is_sequence_number(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

/// Convert a `H..H:MM:SS.mmm` or `MM:SS.mmm` timestamp to seconds. The
/// fractional part is optional. Anything else is an `InvalidFormat` error.
pub fn parse_time(time: &str) -> Result<f64, VttError> {
    match all_consuming(timestamp)(time) {
        Ok((_, seconds)) => Ok(seconds),
        Err(_) => Err(VttError::InvalidFormat(time.to_string())),
    }
}

fn timestamp(input: &str) -> IResult<&str, f64, VerboseError<&str>> {
    const MILLIS_MAX: usize = 3;
    let take_millis = || {
        map_res(
            take_while_m_n(1, MILLIS_MAX, |c: char| c.is_ascii_digit()),
            move |s: &str| {
                if s.len() < MILLIS_MAX {
                    // A fraction like `.2` means 200 milliseconds, so we
                    // right-pad every string until it reaches a length of
                    // 3 characters.
                    let millis = format!("{:0<3}", s);
                    millis.parse()
                } else {
                    s.parse()
                }
            },
        )
    };
    let component = || map_res(digit1, |s: &str| s.parse::<u64>());

    let (input, first) = component()(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, second) = component()(input)?;
    let (input, third) = opt(preceded(tag(":"), component()))(input)?;
    let (input, millis): (_, Option<u64>) = opt(preceded(tag("."), take_millis()))(input)?;

    // Two components are minutes:seconds, three are hours:minutes:seconds.
    let (hours, minutes, seconds) = match third {
        Some(seconds) => (first, second, seconds),
        None => (0, first, second),
    };

    Ok((
        input,
        hours as f64 * 3600.0
            + minutes as f64 * 60.0
            + seconds as f64
            + millis.unwrap_or(0) as f64 / 1000.0,
    ))
}
