//! Availability endpoints polled by the date picker.

use super::{current_session, PathParam, QueryParams};
use crate::availability::{resolve_day, resolve_range};
use crate::backend::BookingBackend;
use crate::error::{BookingError, Result};
use crate::sessions::session_id;
use crate::types::{AvailabilitySlot, BarberId, DayAgenda};
use crate::AppState;
use axum::extract::State;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

pub(super) const DEFAULT_AGENDA_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub(super) struct SlotsQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DaysQuery {
    pub(super) days: Option<String>,
}

/// Number of agenda days for the raw `days` parameter. Malformed, zero or negative
/// values give 0, values above `max` are clamped.
pub(super) fn agenda_days(raw: Option<&str>, max: u32) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_AGENDA_DAYS.min(max);
    };
    match raw.trim().parse::<i64>() {
        Ok(days) if days > 0 => u32::try_from(days).unwrap_or(u32::MAX).min(max),
        _ => 0,
    }
}

/// Slots of the barber chosen in the booking wizard. Without a session, a chosen barber
/// or a date the answer is an empty list.
pub(super) async fn slots<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    QueryParams(query): QueryParams<SlotsQuery>,
) -> Result<Json<Vec<AvailabilitySlot>>> {
    let barber_id = session_id(&jar)
        .and_then(|id| state.sessions.get(id))
        .and_then(|session| session.wizard.barber());
    let (Some(barber_id), Some(date)) = (barber_id, query.date) else {
        return Ok(Json(vec![]));
    };
    Ok(Json(resolve_day(&state.backend, barber_id, &date)?))
}

pub(super) async fn agenda<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    barber_id: std::result::Result<PathParam<BarberId>, BookingError>,
    QueryParams(query): QueryParams<DaysQuery>,
) -> Result<Json<Vec<DayAgenda>>> {
    current_session(&state, &jar)?;
    let PathParam(barber_id) = barber_id?;
    let days = agenda_days(query.days.as_deref(), state.max_agenda_days);
    Ok(Json(resolve_range(
        &state.backend,
        barber_id,
        state.clock.today(),
        days,
    )?))
}
