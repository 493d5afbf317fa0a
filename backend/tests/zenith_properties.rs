//! Property tests for the zenith validator geometry.

mod support;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use qtty::Degrees;

use argus_backend::config::TelescopeSettings;
use argus_backend::services::zenith::{
    angular_separation, check_observable, horizontal, zenith_coordinate,
};

fn site() -> TelescopeSettings {
    support::test_config(std::path::Path::new("/tmp/argus")).telescope
}

fn instant(offset_s: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(offset_s)
}

proptest! {
    #[test]
    fn prop_zenith_is_always_allowed(offset_s in 0i64..(10 * 365 * 86_400)) {
        let site = site();
        let t = instant(offset_s);
        let zenith = zenith_coordinate(t, &site).unwrap();
        let result = check_observable(zenith.ra, zenith.dec, t, &site).unwrap();
        prop_assert!(result.allowed);
        prop_assert!(result.distance.value() < 1e-6);
        prop_assert!((result.altitude.value() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn prop_separation_is_symmetric_and_bounded(
        ra1 in 0.0..360.0f64,
        dec1 in -90.0..90.0f64,
        ra2 in 0.0..360.0f64,
        dec2 in -90.0..90.0f64,
    ) {
        let a = angular_separation(Degrees::new(ra1), Degrees::new(dec1), Degrees::new(ra2), Degrees::new(dec2));
        let b = angular_separation(Degrees::new(ra2), Degrees::new(dec2), Degrees::new(ra1), Degrees::new(dec1));
        prop_assert!((a.value() - b.value()).abs() < 1e-9);
        prop_assert!(a.value() >= 0.0 && a.value() <= 180.0 + 1e-9);
    }

    #[test]
    fn prop_zenith_distance_matches_altitude(
        offset_s in 0i64..(365 * 86_400),
        ra in 0.0..360.0f64,
        dec in -89.0..89.0f64,
    ) {
        // Distance from the zenith point is the zenith angle, 90 - altitude.
        let site = site();
        let t = instant(offset_s);
        let result = check_observable(Degrees::new(ra), Degrees::new(dec), t, &site).unwrap();
        prop_assert!((result.distance.value() - (90.0 - result.altitude.value())).abs() < 1e-5);
    }

    #[test]
    fn prop_below_min_altitude_is_refused(
        offset_s in 0i64..(365 * 86_400),
        ra in 0.0..360.0f64,
        dec in -90.0..90.0f64,
    ) {
        let site = site();
        let t = instant(offset_s);
        let result = check_observable(Degrees::new(ra), Degrees::new(dec), t, &site).unwrap();
        let (alt, az) = horizontal(Degrees::new(ra), Degrees::new(dec), t, &site).unwrap();
        prop_assert_eq!(result.altitude, alt);
        prop_assert_eq!(result.azimuth, az);
        if alt.value() < site.min_altitude || alt.value() > site.max_altitude {
            prop_assert!(!result.allowed);
        }
    }
}
