//! Zenith observability check.
//!
//! Decides whether a target can be observed from the configured site at a
//! given instant. The decision considers the altitude band, the azimuth band
//! and the angular distance from the zenith coordinate (the equatorial
//! point straight overhead). All four numbers are returned regardless of the
//! outcome so callers can explain a refusal.

use chrono::{DateTime, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};
use siderust::coordinates::centers::Geodetic;
use siderust::coordinates::frames::{EquatorialTrueOfDate, Horizontal, ECEF, ICRS};
use siderust::coordinates::spherical::{direction, Direction};
use siderust::coordinates::transform::SphericalDirectionAstroExt;
use siderust::qtty::Meters;

use crate::api::Target;
use crate::config::TelescopeSettings;
use crate::services::ephemeris::{self, julian_date, EphemerisError};

/// Equatorial coordinate of the point overhead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZenithCoordinate {
    pub ra: Degrees,
    pub dec: Degrees,
}

/// Outcome of [`check_observable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observability {
    pub allowed: bool,
    /// Angular distance from the zenith coordinate.
    pub distance: Degrees,
    pub altitude: Degrees,
    pub azimuth: Degrees,
}

fn angle(value: Degrees) -> siderust::qtty::Degrees {
    siderust::qtty::Degrees::new(value.value())
}

fn icrs(ra: Degrees, dec: Degrees) -> direction::ICRS {
    direction::ICRS::new(angle(ra), angle(dec))
}

/// Geodetic position of the telescope at sea level.
fn observer(site: &TelescopeSettings) -> Geodetic<ECEF> {
    Geodetic::<ECEF>::new(
        angle(Degrees::new(site.longitude)),
        angle(Degrees::new(site.latitude)),
        Meters::new(0.0),
    )
}

/// The ICRS point overhead at `time`.
pub fn zenith_coordinate(
    time: DateTime<Utc>,
    site: &TelescopeSettings,
) -> Result<ZenithCoordinate, EphemerisError> {
    let jd = julian_date(time)?;
    let straight_up = Direction::<Horizontal>::new_unchecked(
        angle(Degrees::new(90.0)),
        angle(Degrees::new(0.0)),
    );
    let overhead = straight_up
        .to_equatorial(&jd, &observer(site))
        .to_frame::<ICRS>(&jd);
    Ok(ZenithCoordinate {
        ra: Degrees::new(overhead.azimuth.value()).wrap_pos(),
        dec: Degrees::new(overhead.polar.value()),
    })
}

/// Great-circle distance between two equatorial positions.
pub fn angular_separation(ra1: Degrees, dec1: Degrees, ra2: Degrees, dec2: Degrees) -> Degrees {
    let separation = icrs(ra1, dec1).angular_separation(&icrs(ra2, dec2));
    Degrees::new(separation.value())
}

/// Altitude and azimuth (north = 0, east = 90) of an ICRS position seen
/// from the site.
pub fn horizontal(
    ra: Degrees,
    dec: Degrees,
    time: DateTime<Utc>,
    site: &TelescopeSettings,
) -> Result<(Degrees, Degrees), EphemerisError> {
    let jd = julian_date(time)?;
    let local = icrs(ra, dec)
        .to_frame::<EquatorialTrueOfDate>(&jd)
        .to_horizontal(&jd, &observer(site));
    Ok((
        Degrees::new(local.polar.value()),
        Degrees::new(local.azimuth.value()).wrap_pos(),
    ))
}

/// Decide whether `(ra, dec)` is observable from the site at `time`.
///
/// Refuses when the altitude is outside `[min_altitude, max_altitude]`, when
/// the azimuth is outside `[min_azimuth, max_azimuth]`, or when the distance
/// to the zenith coordinate is at least `max_distance_from_zenith`.
pub fn check_observable(
    ra: Degrees,
    dec: Degrees,
    time: DateTime<Utc>,
    site: &TelescopeSettings,
) -> Result<Observability, EphemerisError> {
    let zenith = zenith_coordinate(time, site)?;
    let distance = angular_separation(ra, dec, zenith.ra, zenith.dec);
    let (altitude, azimuth) = horizontal(ra, dec, time, site)?;

    let alt = altitude.value();
    let az = azimuth.value();
    let allowed = !(alt < site.min_altitude
        || alt > site.max_altitude
        || az > site.max_azimuth
        || az < site.min_azimuth
        || distance.value() >= site.max_distance_from_zenith);

    Ok(Observability {
        allowed,
        distance,
        altitude,
        azimuth,
    })
}

/// Resolve a plan target to equatorial degrees at `time`.
pub fn resolve_target(
    target: &Target,
    time: DateTime<Utc>,
) -> Result<(Degrees, Degrees), EphemerisError> {
    match target {
        Target::Equatorial { ra, dec } => Ok((*ra, *dec)),
        Target::Body { name } => ephemeris::body_radec(name, time),
    }
}

/// Resolve `target` and run [`check_observable`] on it.
pub fn check_target(
    target: &Target,
    time: DateTime<Utc>,
    site: &TelescopeSettings,
) -> Result<Observability, EphemerisError> {
    let (ra, dec) = resolve_target(target, time)?;
    check_observable(ra, dec, time, site)
}
