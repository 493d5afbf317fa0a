//! Angle parsing and formatting for equatorial coordinates.
//!
//! Users type coordinates in many notations: decimal degrees, decimal hours,
//! sexagesimal with unit letters (`5h35m17s`, `-5d23m28s`, `30°45'45"`) or
//! separated by colons/spaces. A value without any unit is taken as degrees.

use once_cell::sync::Lazy;
use qtty::Degrees;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Errors raised while normalising a coordinate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("Empty coordinate")]
    Empty,

    #[error("Could not parse angle '{0}'")]
    Malformed(String),

    #[error("Unknown angle unit '{unit}' in '{input}'")]
    UnknownUnit { input: String, unit: String },

    #[error("Minutes and seconds must be below 60 in '{0}'")]
    FieldOutOfRange(String),

    #[error("Declination {0} is outside [-90, 90] degrees")]
    DeclinationOutOfRange(f64),
}

/// A coordinate as received over the wire: either a bare number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AngleInput {
    Number(f64),
    Text(String),
}

impl AngleInput {
    pub fn to_text(&self) -> String {
        match self {
            AngleInput::Number(v) => v.to_string(),
            AngleInput::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for AngleInput {
    fn from(v: f64) -> Self {
        AngleInput::Number(v)
    }
}

impl From<&str> for AngleInput {
    fn from(s: &str) -> Self {
        AngleInput::Text(s.to_string())
    }
}

const NUM: &str = r"\d+(?:\.\d*)?|\.\d+";

static DECIMAL_WITH_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^([+-]?(?:{NUM}))\s*([a-z°]+)$")).expect("valid regex")
});

static SEXAGESIMAL_LETTERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)^([+-])?\s*({NUM})\s*(h|d|°)\s*({NUM})\s*(?:m|')\s*(?:({NUM})\s*(?:s|"|'')?)?$"#
    ))
    .expect("valid regex")
});

static SEXAGESIMAL_SEPARATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^([+-])?\s*(\d+)(?::|\s+)({NUM})(?:(?::|\s+)({NUM}))?$"
    ))
    .expect("valid regex")
});

fn unit_scale(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "d" | "deg" | "degree" | "degrees" | "°" => Some(1.0),
        "h" | "hr" | "hour" | "hours" | "hourangle" => Some(15.0),
        "rad" | "radian" | "radians" => Some(180.0 / std::f64::consts::PI),
        "arcmin" => Some(1.0 / 60.0),
        "arcsec" => Some(1.0 / 3600.0),
        _ => None,
    }
}

fn num(s: &str) -> f64 {
    // Regex groups only capture digits and a dot.
    s.parse().unwrap_or(0.0)
}

fn sexagesimal(
    input: &str,
    negative: bool,
    whole: f64,
    minutes: f64,
    seconds: f64,
    scale: f64,
) -> Result<f64, CoordinateError> {
    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(CoordinateError::FieldOutOfRange(input.to_string()));
    }
    let magnitude = (whole + minutes / 60.0 + seconds / 3600.0) * scale;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Parse a single angle into degrees.
///
/// Unitless input is degrees. Hour units are multiplied by 15.
pub fn parse_angle(input: &str) -> Result<Degrees, CoordinateError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(CoordinateError::Empty);
    }

    if let Ok(v) = text.parse::<f64>() {
        if !v.is_finite() {
            return Err(CoordinateError::Malformed(text.to_string()));
        }
        return Ok(Degrees::new(v));
    }

    if let Some(caps) = SEXAGESIMAL_LETTERS.captures(text) {
        let scale = if caps[3].eq_ignore_ascii_case("h") { 15.0 } else { 1.0 };
        let seconds = caps.get(5).map_or(0.0, |m| num(m.as_str()));
        let value = sexagesimal(
            text,
            caps.get(1).is_some_and(|m| m.as_str() == "-"),
            num(&caps[2]),
            num(&caps[4]),
            seconds,
            scale,
        )?;
        return Ok(Degrees::new(value));
    }

    if let Some(caps) = DECIMAL_WITH_UNIT.captures(text) {
        let unit = &caps[2];
        let scale = unit_scale(unit).ok_or_else(|| CoordinateError::UnknownUnit {
            input: text.to_string(),
            unit: unit.to_string(),
        })?;
        return Ok(Degrees::new(num_signed(&caps[1]) * scale));
    }

    if let Some(caps) = SEXAGESIMAL_SEPARATED.captures(text) {
        let seconds = caps.get(4).map_or(0.0, |m| num(m.as_str()));
        let value = sexagesimal(
            text,
            caps.get(1).is_some_and(|m| m.as_str() == "-"),
            num(&caps[2]),
            num(&caps[3]),
            seconds,
            1.0,
        )?;
        return Ok(Degrees::new(value));
    }

    Err(CoordinateError::Malformed(text.to_string()))
}

fn num_signed(s: &str) -> f64 {
    match s.strip_prefix('-') {
        Some(rest) => -num(rest),
        None => num(s.trim_start_matches('+')),
    }
}

/// Parse a right ascension, wrapped into `[0, 360)` degrees.
pub fn parse_ra(input: &str) -> Result<Degrees, CoordinateError> {
    Ok(parse_angle(input)?.wrap_pos())
}

/// Parse a declination and reject anything beyond the poles.
pub fn parse_dec(input: &str) -> Result<Degrees, CoordinateError> {
    let dec = parse_angle(input)?;
    if !(-90.0..=90.0).contains(&dec.value()) {
        return Err(CoordinateError::DeclinationOutOfRange(dec.value()));
    }
    Ok(dec)
}

/// Normalise a pair of wire coordinates into degrees.
pub fn normalize(ra: &AngleInput, dec: &AngleInput) -> Result<(Degrees, Degrees), CoordinateError> {
    Ok((parse_ra(&ra.to_text())?, parse_dec(&dec.to_text())?))
}

fn split_sexagesimal(value: f64) -> (u32, u32, f64) {
    let whole = value.trunc();
    let minutes = ((value - whole) * 60.0).trunc();
    let seconds = (value - whole - minutes / 60.0) * 3600.0;
    (whole as u32, minutes as u32, seconds)
}

/// `5h 35m 16.80s`
pub fn format_ra_hms(ra: Degrees) -> String {
    let (h, m, s) = split_sexagesimal(ra.wrap_pos().value() / 15.0);
    format!("{}h {}m {:.2}s", h, m, s)
}

/// `-5d 23m 28.00s`
pub fn format_dec_dms(dec: Degrees) -> String {
    let sign = if dec.value() >= 0.0 { '+' } else { '-' };
    let (d, m, s) = split_sexagesimal(dec.value().abs());
    format!("{}{}d {}m {:.2}s", sign, d, m, s)
}

/// Decimal hours and degrees as accepted by the telescope driver:
/// `5.58800h -5.39000d`.
pub fn format_driver_radec(ra: Degrees, dec: Degrees) -> String {
    let sign = if dec.value() >= 0.0 { '+' } else { '-' };
    format!(
        "{:.5}h {}{:.5}d",
        ra.wrap_pos().value() / 15.0,
        sign,
        dec.value().abs()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Degrees, b: f64) -> bool {
        (a.value() - b).abs() < 1e-9
    }

    #[test]
    fn test_unitless_values_are_degrees() {
        assert!(close(parse_angle("83.82").unwrap(), 83.82));
        assert!(close(parse_angle(" -5.39 ").unwrap(), -5.39));
        assert!(close(parse_angle("45:30:00").unwrap(), 45.5));
        assert!(close(parse_angle("-10 30").unwrap(), -10.5));
    }

    #[test]
    fn test_hour_notations() {
        assert!(close(parse_angle("12h30m0s").unwrap(), 187.5));
        assert!(close(parse_angle("12.5h").unwrap(), 187.5));
        assert!(close(parse_angle("1.5 hourangle").unwrap(), 22.5));
    }

    #[test]
    fn test_degree_notations() {
        assert!(close(parse_angle("+30d45m45s").unwrap(), 30.7625));
        assert!(close(parse_angle("30°45'45\"").unwrap(), 30.7625));
        assert!(close(parse_angle("-0d30m").unwrap(), -0.5));
        assert!(close(parse_angle("30.75deg").unwrap(), 30.75));
        assert!(close(
            parse_angle("3.141592653589793rad").unwrap(),
            180.0
        ));
    }

    #[test]
    fn test_malformed_inputs_are_reported() {
        assert_eq!(parse_angle("   "), Err(CoordinateError::Empty));
        assert!(matches!(
            parse_angle("north"),
            Err(CoordinateError::Malformed(_))
        ));
        assert!(matches!(
            parse_angle("12 furlongs"),
            Err(CoordinateError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_angle("10d75m"),
            Err(CoordinateError::FieldOutOfRange(_))
        ));
    }

    #[test]
    fn test_ra_wraps_and_dec_is_bounded() {
        assert!(close(parse_ra("-10").unwrap(), 350.0));
        assert!(close(parse_ra("25h").unwrap(), 15.0));
        assert!(matches!(
            parse_dec("95"),
            Err(CoordinateError::DeclinationOutOfRange(_))
        ));
        assert!(close(parse_dec("-90").unwrap(), -90.0));
    }

    #[test]
    fn test_normalize_accepts_numbers_and_text() {
        let (ra, dec) = normalize(&AngleInput::from(83.82), &AngleInput::from("-5d23m24s")).unwrap();
        assert!(close(ra, 83.82));
        assert!(close(dec, -5.39));
    }

    #[test]
    fn test_angle_input_deserializes_untagged() {
        let n: AngleInput = serde_json::from_str("12.5").unwrap();
        assert_eq!(n, AngleInput::Number(12.5));
        let t: AngleInput = serde_json::from_str("\"12h30m\"").unwrap();
        assert_eq!(t, AngleInput::Text("12h30m".to_string()));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_ra_hms(Degrees::new(187.5)), "12h 30m 0.00s");
        assert_eq!(format_dec_dms(Degrees::new(-30.5)), "-30d 30m 0.00s");
        assert_eq!(
            format_driver_radec(Degrees::new(187.5), Degrees::new(30.75)),
            "12.50000h +30.75000d"
        );
        assert_eq!(
            format_driver_radec(Degrees::new(83.82), Degrees::new(-5.39)),
            "5.58800h -5.39000d"
        );
    }
}
