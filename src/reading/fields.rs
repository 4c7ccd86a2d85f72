//! Nullable numeric field parsers.
//!
//! The archives leave a cell blank when nothing was observed, so anything that
//! does not parse is treated as missing rather than as an error.

pub fn parse_f32_or_none(s: &str) -> Option<f32> {
    s.parse::<f32>().ok().filter(|v| v.is_finite())
}

pub fn parse_i16_or_none(s: &str) -> Option<i16> {
    s.parse::<i16>().ok()
}

// -- Tests -------------------------------------------------------------------
