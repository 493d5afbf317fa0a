//! Telescope time reservations.
//!
//! Staff hand out exclusive windows to users. A window is half open, no longer
//! than `max_reservation_minutes` and never overlaps another one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ObservationError, ObservationResult};
use super::planning::parse_time;
use super::{require_staff, Observatory};
use crate::api::{NewReservation, Reservation, ReservationId, User, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub user_email: String,
    pub start_time: String,
    pub end_time: String,
}

/// The reservation of `user` covering `at`, if any.
pub fn active_reservation(
    reservations: &[Reservation],
    user: UserId,
    at: DateTime<Utc>,
) -> Option<&Reservation> {
    reservations
        .iter()
        .find(|r| r.owner == user && r.covers(at))
}

pub async fn list_reservations(obs: &Observatory) -> ObservationResult<Vec<Reservation>> {
    Ok(obs.repository.list_reservations().await?)
}

pub async fn create_reservation(
    obs: &Observatory,
    requester: &User,
    req: ReservationRequest,
) -> ObservationResult<Reservation> {
    require_staff(requester, "Creating reservations")?;

    let site = &obs.config.telescope;
    let start_time = parse_time(&req.start_time, site)?;
    let end_time = parse_time(&req.end_time, site)?;
    if end_time <= start_time {
        return Err(ObservationError::InvalidReservationWindow(
            "end_time must be after start_time".to_string(),
        ));
    }
    if end_time - start_time > Duration::minutes(site.max_reservation_minutes) {
        return Err(ObservationError::InvalidReservationWindow(format!(
            "reservations are limited to {} minutes",
            site.max_reservation_minutes
        )));
    }

    let owner = obs
        .repository
        .find_user_by_email(req.user_email.trim())
        .await?
        .ok_or_else(|| ObservationError::UnknownUser(req.user_email.clone()))?;

    let existing = obs.repository.list_reservations().await?;
    if let Some(conflict) = existing.iter().find(|r| r.overlaps(start_time, end_time)) {
        return Err(ObservationError::ReservationConflict(conflict.id));
    }

    let reservation = obs
        .repository
        .store_reservation(NewReservation {
            owner: owner.id,
            start_time,
            end_time,
        })
        .await?;
    info!(
        reservation_id = %reservation.id,
        owner = %owner.id,
        "Reservation {} - {} created",
        start_time.to_rfc3339(),
        end_time.to_rfc3339()
    );
    Ok(reservation)
}

pub async fn delete_reservation(
    obs: &Observatory,
    requester: &User,
    id: ReservationId,
) -> ObservationResult<()> {
    require_staff(requester, "Deleting reservations")?;
    obs.repository.delete_reservation(id).await?;
    info!(reservation_id = %id, "Reservation deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::fixture;
    use chrono::TimeZone;

    fn request(email: &str, start: &str, end: &str) -> ReservationRequest {
        ReservationRequest {
            user_email: email.into(),
            start_time: start.into(),
            end_time: end.into(),
        }
    }

    #[tokio::test]
    async fn test_staff_creates_reservation_in_local_time() {
        let fx = fixture();
        let staff = fx.user("staff@example.org", true).await;
        let user = fx.user("obs@example.org", false).await;

        let r = create_reservation(
            &fx.obs,
            &staff,
            request("OBS@example.org", "2024-06-01T21:00:00", "2024-06-01T22:00:00"),
        )
        .await
        .unwrap();
        assert_eq!(r.owner, user.id);
        // Site clock is UTC-3.
        assert_eq!(r.start_time, Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
        assert_eq!(list_reservations(&fx.obs).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_staff_is_forbidden() {
        let fx = fixture();
        let user = fx.user("obs@example.org", false).await;
        let err = create_reservation(
            &fx.obs,
            &user,
            request("obs@example.org", "2024-06-01T21:00:00", "2024-06-01T22:00:00"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ObservationError::Forbidden(_)));
        assert!(matches!(
            delete_reservation(&fx.obs, &user, ReservationId::new(1)).await,
            Err(ObservationError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_window_rules() {
        let fx = fixture();
        let staff = fx.user("staff@example.org", true).await;
        fx.user("obs@example.org", false).await;

        let inverted = request("obs@example.org", "2024-06-01T22:00:00", "2024-06-01T21:00:00");
        assert!(matches!(
            create_reservation(&fx.obs, &staff, inverted).await,
            Err(ObservationError::InvalidReservationWindow(_))
        ));

        // The test site allows 120 minutes.
        let too_long = request("obs@example.org", "2024-06-01T20:00:00", "2024-06-01T22:01:00");
        assert!(matches!(
            create_reservation(&fx.obs, &staff, too_long).await,
            Err(ObservationError::InvalidReservationWindow(_))
        ));

        let unknown = request("nobody@example.org", "2024-06-01T20:00:00", "2024-06-01T21:00:00");
        assert!(matches!(
            create_reservation(&fx.obs, &staff, unknown).await,
            Err(ObservationError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn test_overlap_is_a_conflict_but_adjacent_is_fine() {
        let fx = fixture();
        let staff = fx.user("staff@example.org", true).await;
        fx.user("obs@example.org", false).await;

        let first = create_reservation(
            &fx.obs,
            &staff,
            request("obs@example.org", "2024-06-01T20:00:00", "2024-06-01T21:00:00"),
        )
        .await
        .unwrap();

        let overlapping = request("staff@example.org", "2024-06-01T20:30:00", "2024-06-01T21:30:00");
        match create_reservation(&fx.obs, &staff, overlapping).await {
            Err(ObservationError::ReservationConflict(id)) => assert_eq!(id, first.id),
            other => panic!("expected conflict, got {other:?}"),
        }

        let adjacent = request("staff@example.org", "2024-06-01T21:00:00", "2024-06-01T22:00:00");
        create_reservation(&fx.obs, &staff, adjacent).await.unwrap();

        delete_reservation(&fx.obs, &staff, first.id).await.unwrap();
        assert_eq!(list_reservations(&fx.obs).await.unwrap().len(), 1);
    }

    #[test]
    fn test_active_reservation_matches_owner_and_time() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        let reservations = vec![Reservation {
            id: ReservationId::new(1),
            owner: UserId::new(2),
            start_time: start,
            end_time: start + Duration::hours(1),
        }];
        let inside = start + Duration::minutes(10);
        assert!(active_reservation(&reservations, UserId::new(2), inside).is_some());
        assert!(active_reservation(&reservations, UserId::new(3), inside).is_none());
        assert!(active_reservation(&reservations, UserId::new(2), start + Duration::hours(2)).is_none());
    }
}
