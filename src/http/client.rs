use super::api::{agenda_days, DaysQuery};
use super::{current_session, parse_date, JsonBody, PathParam, QueryParams};
use crate::accounts::{self, ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::availability::resolve_range;
use crate::backend::BookingBackend;
use crate::booking::{
    active_barber, active_service, book, cancel_by_client, ensure_bookable, summarize,
    BookingSummary,
};
use crate::error::{BookingError, Result};
use crate::sessions::{removal_cookie, session_cookie, session_id};
use crate::types::{
    Barber, BarberId, Client, DayAgenda, ReservationDetails, ReservationId, Service, ServiceId,
    TimeOfDay,
};
use crate::wizard::BookingWizard;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub(super) struct Home {
    title: String,
    services: Vec<Service>,
    barbers: Vec<Barber>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServiceSelection {
    service_id: ServiceId,
}

#[derive(Debug, Deserialize)]
pub(super) struct BarberSelection {
    barber_id: BarberId,
}

#[derive(Debug, Deserialize)]
pub(super) struct SlotSelection {
    date: String,
    time: TimeOfDay,
}

pub(super) async fn home<T: BookingBackend>(
    State(state): State<AppState<T>>,
) -> Result<Json<Home>> {
    Ok(Json(Home {
        title: state.website_title.clone(),
        services: state.backend.services(true)?,
        barbers: state.backend.barbers(true)?,
    }))
}

pub(super) async fn register_client<T: BookingBackend>(
    State(state): State<AppState<T>>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Client>)> {
    let client = accounts::register(&state.backend, request)?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub(super) async fn login<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<Client>)> {
    let client = accounts::authenticate(&state.backend, &request)?;
    if let Some(previous) = session_id(&jar) {
        state.sessions.remove(previous);
    }
    let id = state.sessions.create(&client);
    info!(client_id = client.id, role = client.role.as_str(), "Client logged in");
    Ok((jar.add(session_cookie(id)), Json(client)))
}

pub(super) async fn logout<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    if let Some(id) = session_id(&jar) {
        state.sessions.remove(id);
    }
    (jar.remove(removal_cookie()), StatusCode::NO_CONTENT)
}

pub(super) async fn profile<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
) -> Result<Json<Client>> {
    let (_, session) = current_session(&state, &jar)?;
    let client = state
        .backend
        .client(session.client_id)?
        .ok_or(BookingError::Unauthorized)?;
    Ok(Json(client))
}

pub(super) async fn change_password<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> Result<StatusCode> {
    let (_, session) = current_session(&state, &jar)?;
    accounts::change_password(&state.backend, session.client_id, request)?;
    info!(client_id = session.client_id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn services<T: BookingBackend>(
    State(state): State<AppState<T>>,
) -> Result<Json<Vec<Service>>> {
    Ok(Json(state.backend.services(true)?))
}

pub(super) async fn barbers<T: BookingBackend>(
    State(state): State<AppState<T>>,
) -> Result<Json<Vec<Barber>>> {
    Ok(Json(state.backend.barbers(true)?))
}

fn update_wizard<T: BookingBackend>(
    state: &AppState<T>,
    id: Uuid,
    step: impl FnOnce(&mut BookingWizard) -> Result<()>,
) -> Result<Json<BookingWizard>> {
    let wizard = state
        .sessions
        .update(id, |session| -> Result<BookingWizard> {
            step(&mut session.wizard)?;
            Ok(session.wizard)
        })
        .ok_or(BookingError::Unauthorized)??;
    Ok(Json(wizard))
}

pub(super) async fn booking_state<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
) -> Result<Json<BookingWizard>> {
    let (_, session) = current_session(&state, &jar)?;
    Ok(Json(session.wizard))
}

pub(super) async fn select_service<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    JsonBody(selection): JsonBody<ServiceSelection>,
) -> Result<Json<BookingWizard>> {
    let (id, _) = current_session(&state, &jar)?;
    active_service(&state.backend, selection.service_id)?;
    update_wizard(&state, id, |wizard| wizard.select_service(selection.service_id))
}

pub(super) async fn select_barber<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    JsonBody(selection): JsonBody<BarberSelection>,
) -> Result<Json<BookingWizard>> {
    let (id, _) = current_session(&state, &jar)?;
    active_barber(&state.backend, selection.barber_id)?;
    update_wizard(&state, id, |wizard| wizard.select_barber(selection.barber_id))
}

pub(super) async fn booking_days<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    QueryParams(query): QueryParams<DaysQuery>,
) -> Result<Json<Vec<DayAgenda>>> {
    let (_, session) = current_session(&state, &jar)?;
    let barber_id = session
        .wizard
        .barber()
        .ok_or(BookingError::InvalidTransition("select a barber first"))?;
    let days = agenda_days(query.days.as_deref(), state.max_agenda_days);
    Ok(Json(resolve_range(
        &state.backend,
        barber_id,
        state.clock.today(),
        days,
    )?))
}

pub(super) async fn select_slot<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    JsonBody(selection): JsonBody<SlotSelection>,
) -> Result<Json<BookingWizard>> {
    let (id, session) = current_session(&state, &jar)?;
    let barber_id = session
        .wizard
        .barber()
        .ok_or(BookingError::InvalidTransition("select a barber first"))?;
    let date = parse_date(&selection.date)?;
    ensure_bookable(
        &state.backend,
        barber_id,
        date,
        selection.time,
        state.clock.today(),
    )?;
    update_wizard(&state, id, |wizard| wizard.select_slot(date, selection.time))
}

pub(super) async fn review<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
) -> Result<Json<BookingSummary>> {
    let (_, session) = current_session(&state, &jar)?;
    let draft = session.wizard.draft()?;
    Ok(Json(summarize(&state.backend, &draft)?))
}

pub(super) async fn confirm<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
) -> Result<(StatusCode, Json<BookingSummary>)> {
    let (id, session) = current_session(&state, &jar)?;
    let draft = session.wizard.draft()?;
    let summary = summarize(&state.backend, &draft)?;

    match book(
        &state.backend,
        session.client_id,
        &draft,
        state.clock.today(),
    ) {
        Ok(reservation) => {
            state
                .sessions
                .update(id, |session| -> Result<()> {
                    session.wizard.commit(reservation.id)?;
                    session.last_booking = Some(summary.clone());
                    Ok(())
                })
                .ok_or(BookingError::Unauthorized)??;
            Ok((StatusCode::CREATED, Json(summary)))
        }
        Err(BookingError::SlotTaken) => {
            warn!(
                client_id = session.client_id,
                barber_id = draft.barber_id,
                date = %draft.date,
                time = %draft.time,
                "Slot taken before confirmation"
            );
            // pick another slot
            match state.sessions.update(id, |session| session.wizard.back()) {
                Some(Ok(())) => {}
                Some(Err(err)) => warn!(%err, "Failed to step back after lost slot"),
                None => warn!(session = %id, "Session ended before stepping back"),
            }
            Err(BookingError::SlotTaken)
        }
        Err(err) => Err(err),
    }
}

pub(super) async fn back<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
) -> Result<Json<BookingWizard>> {
    let (id, _) = current_session(&state, &jar)?;
    update_wizard(&state, id, BookingWizard::back)
}

pub(super) async fn success<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
) -> Result<Json<BookingSummary>> {
    let (_, session) = current_session(&state, &jar)?;
    session
        .last_booking
        .map(Json)
        .ok_or(BookingError::NotFound("booking"))
}

pub(super) async fn my_bookings<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
) -> Result<Json<Vec<ReservationDetails>>> {
    let (_, session) = current_session(&state, &jar)?;
    Ok(Json(state.backend.client_reservations(session.client_id)?))
}

pub(super) async fn cancel<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    PathParam(reservation_id): PathParam<ReservationId>,
) -> Result<StatusCode> {
    let (_, session) = current_session(&state, &jar)?;
    cancel_by_client(&state.backend, session.client_id, reservation_id)?;
    Ok(StatusCode::NO_CONTENT)
}
