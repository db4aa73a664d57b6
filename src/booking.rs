use crate::availability::resolve_date;
use crate::backend::BookingBackend;
use crate::error::{BookingError, Result};
use crate::types::{
    Barber, BarberId, ClientId, NewReservation, Reservation, ReservationDetails, ReservationId,
    ReservationStatus, Service, ServiceId, TimeOfDay,
};
use crate::wizard::BookingDraft;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

/// What the client sees before and after committing a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub service: String,
    pub price_cents: i32,
    pub barber: String,
    /// `dd/mm/yyyy`
    pub date: String,
    pub time: TimeOfDay,
}

pub fn active_service<T: BookingBackend>(backend: &T, id: ServiceId) -> Result<Service> {
    backend
        .service(id)?
        .filter(|service| service.active)
        .ok_or(BookingError::NotFound("service"))
}

pub fn active_barber<T: BookingBackend>(backend: &T, id: BarberId) -> Result<Barber> {
    backend
        .barber(id)?
        .filter(|barber| barber.active)
        .ok_or(BookingError::NotFound("barber"))
}

/// Checks that `time` on `date` is a free slot of the barber.
pub fn ensure_bookable<T: BookingBackend>(
    backend: &T,
    barber_id: BarberId,
    date: NaiveDate,
    time: TimeOfDay,
    today: NaiveDate,
) -> Result<()> {
    if date < today {
        return Err(BookingError::InvalidInput("date is in the past".into()));
    }
    let slot = resolve_date(backend, barber_id, date)?
        .into_iter()
        .find(|slot| slot.time == time)
        .ok_or_else(|| BookingError::InvalidInput(format!("{time} is not offered on {date}")))?;
    if !slot.available {
        return Err(BookingError::SlotTaken);
    }
    Ok(())
}

pub fn summarize<T: BookingBackend>(backend: &T, draft: &BookingDraft) -> Result<BookingSummary> {
    let service = backend
        .service(draft.service_id)?
        .ok_or(BookingError::NotFound("service"))?;
    let barber = backend
        .barber(draft.barber_id)?
        .ok_or(BookingError::NotFound("barber"))?;
    Ok(BookingSummary {
        service: service.name,
        price_cents: service.price_cents,
        barber: barber.name,
        date: draft.date.format("%d/%m/%Y").to_string(),
        time: draft.time,
    })
}

/// Re-validates the draft and stores it as a pending reservation.
pub fn book<T: BookingBackend>(
    backend: &T,
    client_id: ClientId,
    draft: &BookingDraft,
    today: NaiveDate,
) -> Result<Reservation> {
    active_service(backend, draft.service_id)?;
    active_barber(backend, draft.barber_id)?;
    ensure_bookable(backend, draft.barber_id, draft.date, draft.time, today)?;

    let reservation = backend.create_reservation(NewReservation {
        client_id,
        barber_id: draft.barber_id,
        service_id: draft.service_id,
        date: draft.date,
        time: draft.time,
        notes: None,
    })?;
    info!(
        reservation_id = reservation.id,
        client_id,
        barber_id = draft.barber_id,
        date = %draft.date,
        time = %draft.time,
        "Reservation created"
    );
    Ok(reservation)
}

pub fn cancel_by_client<T: BookingBackend>(
    backend: &T,
    client_id: ClientId,
    reservation_id: ReservationId,
) -> Result<()> {
    let reservation = backend
        .reservation(reservation_id)?
        .filter(|reservation| reservation.client_id == client_id)
        .ok_or(BookingError::NotFound("reservation"))?;
    if !reservation.status.occupies_slot() {
        return Err(BookingError::NotCancellable);
    }
    backend.set_reservation_status(reservation_id, ReservationStatus::Cancelled)?;
    info!(reservation_id, client_id, "Reservation cancelled by client");
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReservationOverview {
    pub today: Vec<ReservationDetails>,
    pub pending: Vec<ReservationDetails>,
    pub history: Vec<ReservationDetails>,
}

impl ReservationOverview {
    pub fn partition(reservations: Vec<ReservationDetails>, today: NaiveDate) -> Self {
        let mut overview = Self::default();
        for details in reservations {
            let reservation = &details.reservation;
            let released = !reservation.status.occupies_slot();
            if reservation.date == today && !released {
                overview.today.push(details.clone());
            }
            if reservation.status == ReservationStatus::Pending && reservation.date >= today {
                overview.pending.push(details.clone());
            }
            if released || reservation.date < today {
                overview.history.push(details);
            }
        }

        let key = |details: &ReservationDetails| {
            (details.reservation.date, details.reservation.time)
        };
        overview.today.sort_by_key(key);
        overview.pending.sort_by_key(key);
        overview.history.sort_by_key(|details| std::cmp::Reverse(key(details)));
        overview
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub clients: usize,
    pub reservations: usize,
    pub pending_reservations: usize,
    pub active_services: usize,
}

pub fn dashboard<T: BookingBackend>(backend: &T) -> Result<DashboardStats> {
    let reservations = backend.reservations()?;
    Ok(DashboardStats {
        clients: backend.client_count()?,
        pending_reservations: reservations
            .iter()
            .filter(|details| details.reservation.status == ReservationStatus::Pending)
            .count(),
        reservations: reservations.len(),
        active_services: backend.services(true)?.len(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::local_storage::LocalStorage;
    use crate::testutils::{date, reserve, seed_barber, seed_client, seed_service, time};
    use crate::types::WeekdayIndex;

    struct Fixture {
        storage: LocalStorage,
        client_id: ClientId,
        draft: BookingDraft,
    }

    // 2026-10-20 is a Tuesday, template weekday 2
    fn fixture() -> Fixture {
        let storage = LocalStorage::default();
        let client = seed_client(&storage, "ana@example.com");
        let barber = seed_barber(&storage, "Carlos");
        let service = seed_service(&storage, "Corte");
        for value in ["09:00", "10:00"] {
            storage
                .insert_schedule_slot(barber.id, WeekdayIndex::new(2).unwrap(), time(value))
                .unwrap();
        }
        Fixture {
            storage,
            client_id: client.id,
            draft: BookingDraft {
                service_id: service.id,
                barber_id: barber.id,
                date: date("2026-10-20"),
                time: time("10:00"),
            },
        }
    }

    #[test]
    fn test_book_creates_pending_reservation() {
        let fixture = fixture();
        let reservation = book(
            &fixture.storage,
            fixture.client_id,
            &fixture.draft,
            date("2026-10-19"),
        )
        .unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert_eq!(reservation.time, time("10:00"));

        let again = book(
            &fixture.storage,
            fixture.client_id,
            &fixture.draft,
            date("2026-10-19"),
        );
        assert!(matches!(again, Err(BookingError::SlotTaken)));
    }

    #[test]
    fn test_book_rejects_past_date() {
        let fixture = fixture();
        let result = book(
            &fixture.storage,
            fixture.client_id,
            &fixture.draft,
            date("2026-10-21"),
        );
        assert!(matches!(result, Err(BookingError::InvalidInput(_))));
    }

    #[test]
    fn test_book_rejects_time_outside_schedule() {
        let fixture = fixture();
        let draft = BookingDraft {
            time: time("09:30"),
            ..fixture.draft
        };
        let result = book(&fixture.storage, fixture.client_id, &draft, date("2026-10-19"));
        assert!(matches!(result, Err(BookingError::InvalidInput(_))));
    }

    #[test]
    fn test_book_rejects_inactive_service() {
        let fixture = fixture();
        fixture
            .storage
            .set_service_active(fixture.draft.service_id, false)
            .unwrap();
        let result = book(
            &fixture.storage,
            fixture.client_id,
            &fixture.draft,
            date("2026-10-19"),
        );
        assert!(matches!(result, Err(BookingError::NotFound("service"))));
    }

    #[test]
    fn test_summary_formats_date() {
        let fixture = fixture();
        let summary = summarize(&fixture.storage, &fixture.draft).unwrap();
        assert_eq!(
            summary,
            BookingSummary {
                service: "Corte".into(),
                price_cents: 4500,
                barber: "Carlos".into(),
                date: "20/10/2026".into(),
                time: time("10:00"),
            }
        );
    }

    #[test_case::test_case(ReservationStatus::Pending, true)]
    #[test_case::test_case(ReservationStatus::Confirmed, true)]
    #[test_case::test_case(ReservationStatus::Cancelled, false)]
    #[test_case::test_case(ReservationStatus::Completed, false)]
    fn test_cancel_by_client(status: ReservationStatus, cancellable: bool) {
        let fixture = fixture();
        let id = reserve(
            &fixture.storage,
            fixture.client_id,
            fixture.draft.barber_id,
            fixture.draft.service_id,
            "2026-10-20",
            "09:00",
        );
        fixture.storage.set_reservation_status(id, status).unwrap();

        let result = cancel_by_client(&fixture.storage, fixture.client_id, id);
        if cancellable {
            result.unwrap();
            assert_eq!(
                fixture.storage.reservation(id).unwrap().unwrap().status,
                ReservationStatus::Cancelled
            );
        } else {
            assert!(matches!(result, Err(BookingError::NotCancellable)));
            assert_eq!(
                fixture.storage.reservation(id).unwrap().unwrap().status,
                status
            );
        }
    }

    #[test]
    fn test_cancel_foreign_reservation() {
        let fixture = fixture();
        let other = seed_client(&fixture.storage, "bia@example.com");
        let id = reserve(
            &fixture.storage,
            other.id,
            fixture.draft.barber_id,
            fixture.draft.service_id,
            "2026-10-20",
            "09:00",
        );
        assert!(matches!(
            cancel_by_client(&fixture.storage, fixture.client_id, id),
            Err(BookingError::NotFound("reservation"))
        ));
    }

    #[test]
    fn test_overview_partition() {
        let fixture = fixture();
        let storage = &fixture.storage;
        let (client, barber, service) = (
            fixture.client_id,
            fixture.draft.barber_id,
            fixture.draft.service_id,
        );
        let today_confirmed = reserve(storage, client, barber, service, "2026-10-19", "10:00");
        storage
            .set_reservation_status(today_confirmed, ReservationStatus::Confirmed)
            .unwrap();
        let today_pending = reserve(storage, client, barber, service, "2026-10-19", "09:00");
        let future_pending = reserve(storage, client, barber, service, "2026-10-22", "09:00");
        let past_pending = reserve(storage, client, barber, service, "2026-10-12", "09:00");
        let cancelled = reserve(storage, client, barber, service, "2026-10-23", "09:00");
        storage
            .set_reservation_status(cancelled, ReservationStatus::Cancelled)
            .unwrap();

        let overview =
            ReservationOverview::partition(storage.reservations().unwrap(), date("2026-10-19"));
        let ids = |list: &[ReservationDetails]| -> Vec<ReservationId> {
            list.iter().map(|details| details.reservation.id).collect()
        };
        assert_eq!(ids(&overview.today), vec![today_pending, today_confirmed]);
        assert_eq!(ids(&overview.pending), vec![today_pending, future_pending]);
        assert_eq!(ids(&overview.history), vec![cancelled, past_pending]);
    }

    #[test]
    fn test_dashboard_counts() {
        let fixture = fixture();
        let storage = &fixture.storage;
        seed_service(storage, "Barba");
        storage
            .set_service_active(fixture.draft.service_id, false)
            .unwrap();
        let first = reserve(
            storage,
            fixture.client_id,
            fixture.draft.barber_id,
            fixture.draft.service_id,
            "2026-10-20",
            "09:00",
        );
        reserve(
            storage,
            fixture.client_id,
            fixture.draft.barber_id,
            fixture.draft.service_id,
            "2026-10-20",
            "10:00",
        );
        storage
            .set_reservation_status(first, ReservationStatus::Confirmed)
            .unwrap();

        assert_eq!(
            dashboard(storage).unwrap(),
            DashboardStats {
                clients: 1,
                reservations: 2,
                pending_reservations: 1,
                active_services: 1,
            }
        );
    }
}
