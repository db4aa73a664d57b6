//! Weekly schedule templates: slot generation and single slot management.

use crate::backend::BookingBackend;
use crate::error::{BookingError, Result};
use crate::types::{BarberId, ScheduleSlotId, TimeOfDay, WeekdayIndex};
use tracing::info;

/// Times from `start` to `end` (inclusive) spaced `step_minutes` apart.
pub fn generate(start: TimeOfDay, end: TimeOfDay, step_minutes: i64) -> Result<Vec<TimeOfDay>> {
    if start > end || step_minutes <= 0 {
        return Err(BookingError::InvalidRange);
    }

    let end = i64::from(end.minutes());
    let mut current = i64::from(start.minutes());
    let mut times = Vec::new();
    while current <= end {
        // current never exceeds `end`, so it always is a valid time of day
        if let Some(time) = TimeOfDay::from_minutes(current as u32) {
            times.push(time);
        }
        current += step_minutes;
    }
    Ok(times)
}

/// Generates the slots of one weekday for a barber, leaving existing slots untouched.
/// Returns how many slots were newly created.
pub fn generate_for_barber<T: BookingBackend>(
    backend: &T,
    barber_id: BarberId,
    weekday: WeekdayIndex,
    start: TimeOfDay,
    end: TimeOfDay,
    step_minutes: i64,
) -> Result<usize> {
    let times = generate(start, end, step_minutes)?;
    if backend.barber(barber_id)?.is_none() {
        return Err(BookingError::NotFound("barber"));
    }

    let mut created = 0;
    for time in times {
        if backend.insert_schedule_slot(barber_id, weekday, time)? {
            created += 1;
        }
    }
    info!(
        barber_id,
        weekday = weekday.value(),
        created,
        "Generated schedule slots"
    );
    Ok(created)
}

pub fn add_slot<T: BookingBackend>(
    backend: &T,
    barber_id: BarberId,
    weekday: WeekdayIndex,
    time: TimeOfDay,
) -> Result<bool> {
    if backend.barber(barber_id)?.is_none() {
        return Err(BookingError::NotFound("barber"));
    }
    backend.insert_schedule_slot(barber_id, weekday, time)
}

pub fn set_slot_active<T: BookingBackend>(
    backend: &T,
    id: ScheduleSlotId,
    active: bool,
) -> Result<()> {
    backend.set_schedule_slot_active(id, active)?;
    info!(slot_id = id, active, "Schedule slot status changed");
    Ok(())
}

pub fn remove_slot<T: BookingBackend>(backend: &T, id: ScheduleSlotId) -> Result<()> {
    backend.remove_schedule_slot(id)?;
    info!(slot_id = id, "Schedule slot removed");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::local_storage::LocalStorage;
    use crate::testutils::{seed_barber, time};
    use crate::types::ScheduleFilter;

    fn times(values: &[&str]) -> Vec<TimeOfDay> {
        values.iter().map(|value| time(value)).collect()
    }

    #[test]
    fn test_generate_includes_end_on_step_boundary() {
        let generated = generate(time("09:00"), time("11:00"), 60).unwrap();
        assert_eq!(generated, times(&["09:00", "10:00", "11:00"]));
    }

    #[test]
    fn test_generate_stops_before_end_off_boundary() {
        let generated = generate(time("09:00"), time("10:40"), 30).unwrap();
        assert_eq!(generated, times(&["09:00", "09:30", "10:00", "10:30"]));
    }

    #[test]
    fn test_generate_single_slot_when_start_equals_end() {
        let generated = generate(time("14:00"), time("14:00"), 45).unwrap();
        assert_eq!(generated, times(&["14:00"]));
    }

    #[test]
    fn test_generate_does_not_wrap_past_midnight() {
        let generated = generate(time("23:00"), time("23:50"), 30).unwrap();
        assert_eq!(generated, times(&["23:00", "23:30"]));
    }

    #[test_case::test_case("11:00", "09:00", 30 ; "start after end")]
    #[test_case::test_case("09:00", "11:00", 0 ; "zero step")]
    #[test_case::test_case("09:00", "11:00", -15 ; "negative step")]
    fn test_generate_rejects_invalid_range(start: &str, end: &str, step: i64) {
        assert!(matches!(
            generate(time(start), time(end), step),
            Err(BookingError::InvalidRange)
        ));
    }

    #[test]
    fn test_generate_is_strictly_increasing() {
        for step in [1, 7, 15, 25, 60, 90] {
            let generated = generate(time("08:00"), time("18:00"), step).unwrap();
            assert!(generated.windows(2).all(|pair| pair[0] < pair[1]));
            let includes_end = generated.last() == Some(&time("18:00"));
            assert_eq!(includes_end, (600 % step) == 0, "step {step}");
        }
    }

    #[test]
    fn test_generate_for_barber_is_idempotent() {
        let storage = LocalStorage::default();
        let barber = seed_barber(&storage, "Carlos");
        let monday = WeekdayIndex::new(1).unwrap();

        let created =
            generate_for_barber(&storage, barber.id, monday, time("09:00"), time("11:00"), 30)
                .unwrap();
        assert_eq!(created, 5);

        let first = storage.schedule_slots(ScheduleFilter::default()).unwrap();
        let created =
            generate_for_barber(&storage, barber.id, monday, time("09:00"), time("11:00"), 30)
                .unwrap();
        assert_eq!(created, 0);
        assert_eq!(storage.schedule_slots(ScheduleFilter::default()).unwrap(), first);
    }

    #[test]
    fn test_generate_for_barber_keeps_deactivated_slots() {
        let storage = LocalStorage::default();
        let barber = seed_barber(&storage, "Carlos");
        let friday = WeekdayIndex::new(5).unwrap();
        generate_for_barber(&storage, barber.id, friday, time("09:00"), time("10:00"), 60)
            .unwrap();

        let slots = storage.schedule_slots(ScheduleFilter::default()).unwrap();
        set_slot_active(&storage, slots[0].id, false).unwrap();

        let created =
            generate_for_barber(&storage, barber.id, friday, time("09:00"), time("10:00"), 60)
                .unwrap();
        assert_eq!(created, 0);
        let slots = storage.schedule_slots(ScheduleFilter::default()).unwrap();
        assert!(!slots[0].active);
        assert!(slots[1].active);
    }

    #[test]
    fn test_generate_for_unknown_barber() {
        let storage = LocalStorage::default();
        let result = generate_for_barber(
            &storage,
            42,
            WeekdayIndex::new(1).unwrap(),
            time("09:00"),
            time("10:00"),
            30,
        );
        assert!(matches!(result, Err(BookingError::NotFound("barber"))));
    }

    #[test]
    fn test_invalid_range_writes_nothing() {
        let storage = LocalStorage::default();
        let barber = seed_barber(&storage, "Carlos");
        generate_for_barber(
            &storage,
            barber.id,
            WeekdayIndex::new(2).unwrap(),
            time("12:00"),
            time("09:00"),
            30,
        )
        .unwrap_err();
        assert!(storage
            .schedule_slots(ScheduleFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_add_slot_duplicate_is_noop() {
        let storage = LocalStorage::default();
        let barber = seed_barber(&storage, "Carlos");
        let saturday = WeekdayIndex::new(6).unwrap();

        assert!(add_slot(&storage, barber.id, saturday, time("10:00")).unwrap());
        assert!(!add_slot(&storage, barber.id, saturday, time("10:00")).unwrap());
        assert_eq!(
            storage.schedule_slots(ScheduleFilter::default()).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_deactivate_and_remove_slot() {
        let storage = LocalStorage::default();
        let barber = seed_barber(&storage, "Carlos");
        let saturday = WeekdayIndex::new(6).unwrap();
        add_slot(&storage, barber.id, saturday, time("10:00")).unwrap();
        let id = storage.schedule_slots(ScheduleFilter::default()).unwrap()[0].id;

        set_slot_active(&storage, id, false).unwrap();
        let active_only = ScheduleFilter {
            only_active: true,
            ..ScheduleFilter::default()
        };
        assert!(storage.schedule_slots(active_only).unwrap().is_empty());

        remove_slot(&storage, id).unwrap();
        assert!(matches!(
            remove_slot(&storage, id),
            Err(BookingError::NotFound("schedule slot"))
        ));
        assert!(matches!(
            set_slot_active(&storage, id, true),
            Err(BookingError::NotFound("schedule slot"))
        ));
    }
}
