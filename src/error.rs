use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum VttError {
    InvalidFormat(String),
}

impl Error for VttError {}

impl fmt::Display for VttError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VttError::InvalidFormat(time) => write!(fmt, "invalid time format: '{}'", time),
        }
    }
}
