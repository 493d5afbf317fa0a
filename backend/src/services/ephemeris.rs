//! Solar-system positions for named targets.
//!
//! Planets come from VSOP87A and the Moon from ELP2000, both through
//! `siderust`. Results are geometric geocentric ICRS coordinates (no
//! light-time or aberration), well inside the pointing tolerance of the
//! zenith check.

use chrono::{DateTime, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};
use siderust::bodies::solar_system::{
    Jupiter, Mars, Mercury, Moon, Neptune, Saturn, Uranus, Venus,
};
use siderust::coordinates::cartesian::Position;
use siderust::coordinates::centers::{Geocentric, Heliocentric};
use siderust::coordinates::frames::{EclipticMeanJ2000, ICRS};
use siderust::coordinates::transform::PositionAstroExt;
use siderust::qtty::AstronomicalUnit;
use siderust::time::JulianDate;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EphemerisError {
    #[error("Unknown solar-system body '{0}'")]
    UnknownBody(String),

    #[error("{0} cannot be observed from the observatory")]
    Unobservable(String),

    #[error("Cannot place {time} on the astronomical time scale: {reason}")]
    Epoch { time: String, reason: String },
}

/// TT Julian date of a UTC instant.
pub fn julian_date(time: DateTime<Utc>) -> Result<JulianDate, EphemerisError> {
    JulianDate::try_from_chrono(time).map_err(|e| EphemerisError::Epoch {
        time: time.to_rfc3339(),
        reason: e.to_string(),
    })
}

/// Named targets resolvable without a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

impl Body {
    pub const ALL: [Body; 9] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
            Body::Mercury => "Mercury",
            Body::Venus => "Venus",
            Body::Mars => "Mars",
            Body::Jupiter => "Jupiter",
            Body::Saturn => "Saturn",
            Body::Uranus => "Uranus",
            Body::Neptune => "Neptune",
        }
    }

    /// Resolve a user supplied name. Case-insensitive; `Earth's Moon` is
    /// accepted for the Moon and `Earth` is rejected as unobservable.
    pub fn from_name(name: &str) -> Result<Body, EphemerisError> {
        let key = name.trim().to_ascii_lowercase();
        let key = key.strip_suffix(" barycenter").unwrap_or(&key);
        match key {
            "earth" => Err(EphemerisError::Unobservable("Earth".to_string())),
            "earth's moon" | "luna" => Ok(Body::Moon),
            _ => Body::ALL
                .iter()
                .copied()
                .find(|b| b.name().eq_ignore_ascii_case(key))
                .ok_or_else(|| EphemerisError::UnknownBody(name.trim().to_string())),
        }
    }

    /// Geocentric ICRS right ascension and declination at `jd`.
    pub fn radec(&self, jd: JulianDate) -> (Degrees, Degrees) {
        let geocentric = self.geocentric_ecliptic(jd).to_frame::<ICRS>(&jd);
        let direction = geocentric.direction_unchecked().to_spherical();
        (
            Degrees::new(direction.azimuth.value()).wrap_pos(),
            Degrees::new(direction.polar.value()),
        )
    }

    fn geocentric_ecliptic(
        &self,
        jd: JulianDate,
    ) -> Position<Geocentric, EclipticMeanJ2000, AstronomicalUnit> {
        let heliocentric = match self {
            Body::Moon => return Moon::get_geo_position::<AstronomicalUnit>(jd),
            Body::Sun => Position::<Heliocentric, EclipticMeanJ2000, AstronomicalUnit>::new(
                0.0, 0.0, 0.0,
            ),
            Body::Mercury => Mercury::vsop87a(jd),
            Body::Venus => Venus::vsop87a(jd),
            Body::Mars => Mars::vsop87a(jd),
            Body::Jupiter => Jupiter::vsop87a(jd),
            Body::Saturn => Saturn::vsop87a(jd),
            Body::Uranus => Uranus::vsop87a(jd),
            Body::Neptune => Neptune::vsop87a(jd),
        };
        heliocentric.to::<Geocentric, EclipticMeanJ2000>(&jd)
    }
}

impl std::fmt::Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a body name and compute its position at `time`.
pub fn body_radec(
    name: &str,
    time: DateTime<Utc>,
) -> Result<(Degrees, Degrees), EphemerisError> {
    let body = Body::from_name(name)?;
    Ok(body.radec(julian_date(time)?))
}
