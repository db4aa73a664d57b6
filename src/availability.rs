//! Merges the weekly schedule of a barber with the reservations of concrete dates.

use crate::backend::BookingBackend;
use crate::error::Result;
use crate::types::{
    weekday_label, AvailabilitySlot, BarberId, DayAgenda, ScheduleFilter, TimeOfDay, WeekdayIndex,
};
use chrono::{Days, NaiveDate};
use std::collections::BTreeSet;

/// Marks every configured slot as available unless its time is occupied.
/// Output is ordered by time of day.
pub fn resolve(
    barber_slots: &BTreeSet<TimeOfDay>,
    occupied: &BTreeSet<TimeOfDay>,
) -> Vec<AvailabilitySlot> {
    barber_slots
        .iter()
        .map(|&time| AvailabilitySlot {
            time,
            available: !occupied.contains(&time),
        })
        .collect()
}

fn active_slots<T: BookingBackend>(
    backend: &T,
    barber_id: BarberId,
    weekday: Option<WeekdayIndex>,
) -> Result<Vec<(WeekdayIndex, TimeOfDay)>> {
    let filter = ScheduleFilter {
        barber_id: Some(barber_id),
        weekday,
        only_active: true,
    };
    Ok(backend
        .schedule_slots(filter)?
        .into_iter()
        .map(|slot| (slot.weekday, slot.time))
        .collect())
}

/// Availability of a barber on the date given as `YYYY-MM-DD`.
/// A missing or malformed date yields an empty list.
pub fn resolve_day<T: BookingBackend>(
    backend: &T,
    barber_id: BarberId,
    date: &str,
) -> Result<Vec<AvailabilitySlot>> {
    let Ok(date) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") else {
        return Ok(vec![]);
    };
    resolve_date(backend, barber_id, date)
}

pub fn resolve_date<T: BookingBackend>(
    backend: &T,
    barber_id: BarberId,
    date: NaiveDate,
) -> Result<Vec<AvailabilitySlot>> {
    let barber_slots: BTreeSet<TimeOfDay> =
        active_slots(backend, barber_id, Some(WeekdayIndex::from_date(date)))?
            .into_iter()
            .map(|(_, time)| time)
            .collect();
    if barber_slots.is_empty() {
        return Ok(vec![]);
    }
    let occupied = backend.occupied_times(barber_id, date)?;
    Ok(resolve(&barber_slots, &occupied))
}

/// Agenda of the `days` dates starting at `from`. Dates whose weekday has no
/// configured slot are left out.
pub fn resolve_range<T: BookingBackend>(
    backend: &T,
    barber_id: BarberId,
    from: NaiveDate,
    days: u32,
) -> Result<Vec<DayAgenda>> {
    let template = active_slots(backend, barber_id, None)?;
    if template.is_empty() {
        return Ok(vec![]);
    }

    let mut agenda = Vec::new();
    for offset in 0..days {
        let Some(date) = from.checked_add_days(Days::new(u64::from(offset))) else {
            break;
        };
        let weekday = WeekdayIndex::from_date(date);
        let barber_slots: BTreeSet<TimeOfDay> = template
            .iter()
            .filter(|(slot_weekday, _)| *slot_weekday == weekday)
            .map(|(_, time)| *time)
            .collect();
        if barber_slots.is_empty() {
            continue;
        }

        let occupied = backend.occupied_times(barber_id, date)?;
        agenda.push(DayAgenda {
            date,
            weekday_label: weekday_label(date).to_string(),
            slots: resolve(&barber_slots, &occupied),
        });
    }
    Ok(agenda)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::local_storage::LocalStorage;
    use crate::testutils::{date, reserve, seed_barber, seed_client, seed_service, time};
    use crate::types::ReservationStatus;

    fn set(values: &[&str]) -> BTreeSet<TimeOfDay> {
        values.iter().map(|value| time(value)).collect()
    }

    #[test]
    fn test_resolve_marks_occupied_slots() {
        let slots = resolve(&set(&["10:00", "09:00"]), &set(&["09:00"]));
        assert_eq!(
            slots,
            vec![
                AvailabilitySlot {
                    time: time("09:00"),
                    available: false
                },
                AvailabilitySlot {
                    time: time("10:00"),
                    available: true
                },
            ]
        );
    }

    #[test]
    fn test_resolve_ignores_occupied_times_outside_template() {
        let slots = resolve(&set(&["09:00", "10:00"]), &set(&["11:00"]));
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|slot| slot.available));
    }

    #[test]
    fn test_resolve_empty_template() {
        assert!(resolve(&BTreeSet::new(), &set(&["09:00"])).is_empty());
    }

    struct Fixture {
        storage: LocalStorage,
        barber_id: BarberId,
        client_id: i32,
        service_id: i32,
    }

    fn fixture() -> Fixture {
        let storage = LocalStorage::default();
        let barber = seed_barber(&storage, "Carlos");
        let client = seed_client(&storage, "ana@example.com");
        let service = seed_service(&storage, "Corte");
        Fixture {
            storage,
            barber_id: barber.id,
            client_id: client.id,
            service_id: service.id,
        }
    }

    fn add_slots(fixture: &Fixture, weekday: u8, times: &[&str]) {
        for value in times {
            let weekday = WeekdayIndex::new(weekday).unwrap();
            fixture
                .storage
                .insert_schedule_slot(fixture.barber_id, weekday, time(value))
                .unwrap();
        }
    }

    #[test]
    fn test_resolve_day_with_confirmed_reservation() {
        let fixture = fixture();
        // template index 1 is the calendar Monday
        add_slots(&fixture, 1, &["09:00", "10:00"]);
        let id = reserve(
            &fixture.storage,
            fixture.client_id,
            fixture.barber_id,
            fixture.service_id,
            "2026-10-19",
            "09:00",
        );
        fixture
            .storage
            .set_reservation_status(id, ReservationStatus::Confirmed)
            .unwrap();

        let slots = resolve_day(&fixture.storage, fixture.barber_id, "2026-10-19").unwrap();
        assert_eq!(
            serde_json::to_value(&slots).unwrap(),
            serde_json::json!([
                {"hora": "09:00", "disponivel": false},
                {"hora": "10:00", "disponivel": true}
            ])
        );
    }

    #[test_case::test_case(ReservationStatus::Cancelled)]
    #[test_case::test_case(ReservationStatus::Completed)]
    fn test_released_reservations_do_not_occupy(status: ReservationStatus) {
        let fixture = fixture();
        add_slots(&fixture, 1, &["09:00"]);
        let id = reserve(
            &fixture.storage,
            fixture.client_id,
            fixture.barber_id,
            fixture.service_id,
            "2026-10-19",
            "09:00",
        );
        fixture.storage.set_reservation_status(id, status).unwrap();

        let slots = resolve_day(&fixture.storage, fixture.barber_id, "2026-10-19").unwrap();
        assert!(slots[0].available);
    }

    #[test]
    fn test_resolve_day_skips_inactive_slots() {
        let fixture = fixture();
        add_slots(&fixture, 1, &["09:00", "10:00"]);
        let slots = fixture.storage.schedule_slots(ScheduleFilter::default()).unwrap();
        fixture
            .storage
            .set_schedule_slot_active(slots[0].id, false)
            .unwrap();

        let resolved = resolve_day(&fixture.storage, fixture.barber_id, "2026-10-19").unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].time, time("10:00"));
    }

    #[test_case::test_case("" ; "missing")]
    #[test_case::test_case("19/10/2026" ; "wrong format")]
    #[test_case::test_case("2026-02-30" ; "impossible date")]
    fn test_resolve_day_fails_soft_on_bad_date(input: &str) {
        let fixture = fixture();
        add_slots(&fixture, 1, &["09:00"]);
        assert!(resolve_day(&fixture.storage, fixture.barber_id, input)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_resolve_day_other_weekday_is_empty() {
        let fixture = fixture();
        add_slots(&fixture, 1, &["09:00"]);
        // 2026-10-20 is a Tuesday
        assert!(resolve_day(&fixture.storage, fixture.barber_id, "2026-10-20")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_resolve_range_without_template_is_empty() {
        let fixture = fixture();
        let agenda =
            resolve_range(&fixture.storage, fixture.barber_id, date("2026-10-19"), 7).unwrap();
        assert!(agenda.is_empty());
    }

    #[test]
    fn test_resolve_range_omits_days_without_slots() {
        let fixture = fixture();
        // Monday and Sunday
        add_slots(&fixture, 1, &["09:00", "10:00"]);
        add_slots(&fixture, 0, &["11:00"]);
        reserve(
            &fixture.storage,
            fixture.client_id,
            fixture.barber_id,
            fixture.service_id,
            "2026-10-26",
            "10:00",
        );

        let agenda =
            resolve_range(&fixture.storage, fixture.barber_id, date("2026-10-19"), 14).unwrap();
        let dates: Vec<String> = agenda.iter().map(|day| day.date.to_string()).collect();
        assert_eq!(dates, ["2026-10-19", "2026-10-25", "2026-10-26", "2026-11-01"]);

        assert_eq!(agenda[0].weekday_label, "Segunda");
        assert_eq!(agenda[1].weekday_label, "Domingo");
        assert_eq!(agenda[1].slots.len(), 1);
        assert!(agenda[0].slots.iter().all(|slot| slot.available));
        assert_eq!(
            agenda[2].slots,
            vec![
                AvailabilitySlot {
                    time: time("09:00"),
                    available: true
                },
                AvailabilitySlot {
                    time: time("10:00"),
                    available: false
                },
            ]
        );
    }

    #[test]
    fn test_resolve_range_never_includes_unconfigured_weekdays() {
        let fixture = fixture();
        add_slots(&fixture, 3, &["15:00"]);
        let agenda =
            resolve_range(&fixture.storage, fixture.barber_id, date("2026-10-01"), 60).unwrap();
        assert!(!agenda.is_empty());
        assert!(agenda
            .iter()
            .all(|day| WeekdayIndex::from_date(day.date).value() == 3));
    }

    #[test]
    fn test_resolve_range_zero_days() {
        let fixture = fixture();
        add_slots(&fixture, 1, &["09:00"]);
        assert!(resolve_range(&fixture.storage, fixture.barber_id, date("2026-10-19"), 0)
            .unwrap()
            .is_empty());
    }
}
