//! Colour constants and string parsing.
//!
//! Colours are plain linear RGBA [`Vec4`]s, the same representation the
//! uniform structs upload. Strings are accepted in three notations:
//!
//! | Notation        | Example            |
//! |-----------------|--------------------|
//! | Hex (RGB)       | `#B22222`          |
//! | Hex (ARGB)      | `#80B22222`        |
//! | Float list      | `0.7, 0.13, 0.13, 1` (alpha optional) |
//! | Name            | `firebrick`, `red`, `transparent`, ... |

use glam::Vec4;
use thiserror::Error;

pub const TRANSPARENT: Vec4 = Vec4::new(0.0, 0.0, 0.0, 0.0);
pub const BLACK: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);
pub const WHITE: Vec4 = Vec4::new(1.0, 1.0, 1.0, 1.0);
pub const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
pub const GREEN: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
pub const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);
pub const YELLOW: Vec4 = Vec4::new(1.0, 1.0, 0.0, 1.0);
/// `#B22222`
pub const FIREBRICK: Vec4 = Vec4::new(178.0 / 255.0, 34.0 / 255.0, 34.0 / 255.0, 1.0);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("empty color string")]
    Empty,
    #[error("bad hex color '{0}'")]
    BadHex(String),
    #[error("bad component list '{0}'")]
    BadComponents(String),
    #[error("unknown color name '{0}'")]
    UnknownName(String),
}

fn named(name: &str) -> Option<Vec4> {
    let color = match name.to_ascii_lowercase().as_str() {
        "transparent" => TRANSPARENT,
        "black" => BLACK,
        "white" => WHITE,
        "red" => RED,
        "green" | "lime" => GREEN,
        "blue" => BLUE,
        "yellow" => YELLOW,
        "firebrick" => FIREBRICK,
        _ => return None,
    };
    Some(color)
}

fn parse_hex(digits: &str, original: &str) -> Result<Vec4, ColorParseError> {
    let bad = || ColorParseError::BadHex(original.to_string());
    if !digits.is_ascii() {
        return Err(bad());
    }
    let byte = |i: usize| -> Result<f32, ColorParseError> {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map(|b| f32::from(b) / 255.0)
            .map_err(|_| bad())
    };
    match digits.len() {
        6 => Ok(Vec4::new(byte(0)?, byte(2)?, byte(4)?, 1.0)),
        // ARGB, the ordering used by XAML-style colour strings
        8 => Ok(Vec4::new(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
        _ => Err(bad()),
    }
}

fn parse_components(text: &str) -> Result<Vec4, ColorParseError> {
    let bad = || ColorParseError::BadComponents(text.to_string());
    let values = text
        .split(',')
        .map(|part| part.trim().parse::<f32>().map_err(|_| bad()))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [r, g, b] => Ok(Vec4::new(*r, *g, *b, 1.0)),
        [r, g, b, a] => Ok(Vec4::new(*r, *g, *b, *a)),
        _ => Err(bad()),
    }
}

/// Parses a colour string (see the module docs for accepted notations).
pub fn parse_color(text: &str) -> Result<Vec4, ColorParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ColorParseError::Empty);
    }
    if let Some(digits) = text.strip_prefix('#') {
        return parse_hex(digits, text);
    }
    if text.contains(',') {
        return parse_components(text);
    }
    named(text).ok_or_else(|| ColorParseError::UnknownName(text.to_string()))
}

/// Converts a colour into the `wgpu` clear-colour representation.
#[must_use]
pub fn to_wgpu(color: Vec4) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.x),
        g: f64::from(color.y),
        b: f64::from(color.z),
        a: f64::from(color.w),
    }
}
