use super::{JsonBody, PathParam, QueryParams};
use crate::backend::BookingBackend;
use crate::booking::{self, DashboardStats, ReservationOverview};
use crate::error::{BookingError, Result};
use crate::schedule;
use crate::types::{
    Barber, BarberId, NewBarber, NewService, ReservationId, ReservationStatus, ScheduleFilter,
    ScheduleSlot, ScheduleSlotId, Service, ServiceId, TimeOfDay, WeekdayIndex,
};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(super) struct ServiceRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    description: Option<String>,
    #[validate(range(min = 0))]
    price_cents: i32,
    #[validate(range(min = 1, max = 480))]
    duration_minutes: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct BarberRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusUpdate {
    status: ReservationStatus,
}

#[derive(Debug, Deserialize)]
pub(super) struct ScheduleQuery {
    weekday: Option<WeekdayIndex>,
    barber_id: Option<BarberId>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SlotRequest {
    barber_id: BarberId,
    weekday: WeekdayIndex,
    time: TimeOfDay,
}

#[derive(Debug, Deserialize)]
pub(super) struct GenerateRequest {
    barber_id: BarberId,
    weekday: WeekdayIndex,
    start: TimeOfDay,
    end: TimeOfDay,
    step_minutes: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ActiveUpdate {
    active: bool,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(super) async fn dashboard<T: BookingBackend>(
    State(state): State<AppState<T>>,
) -> Result<Json<DashboardStats>> {
    Ok(Json(booking::dashboard(&state.backend)?))
}

pub(super) async fn services<T: BookingBackend>(
    State(state): State<AppState<T>>,
) -> Result<Json<Vec<Service>>> {
    Ok(Json(state.backend.services(false)?))
}

pub(super) async fn add_service<T: BookingBackend>(
    State(state): State<AppState<T>>,
    JsonBody(request): JsonBody<ServiceRequest>,
) -> Result<(StatusCode, Json<Service>)> {
    request.validate()?;
    let service = state.backend.add_service(NewService {
        name: request.name.trim().to_string(),
        description: blank_to_none(request.description),
        price_cents: request.price_cents,
        duration_minutes: request.duration_minutes,
    })?;
    info!(service_id = service.id, name = %service.name, "Service added");
    Ok((StatusCode::CREATED, Json(service)))
}

pub(super) async fn toggle_service<T: BookingBackend>(
    State(state): State<AppState<T>>,
    PathParam(id): PathParam<ServiceId>,
) -> Result<Json<Service>> {
    let service = state
        .backend
        .service(id)?
        .ok_or(BookingError::NotFound("service"))?;
    let active = !service.active;
    state.backend.set_service_active(id, active)?;
    info!(service_id = id, active, "Service toggled");
    Ok(Json(Service { active, ..service }))
}

pub(super) async fn remove_service<T: BookingBackend>(
    State(state): State<AppState<T>>,
    PathParam(id): PathParam<ServiceId>,
) -> Result<StatusCode> {
    state.backend.remove_service(id)?;
    info!(service_id = id, "Service removed");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn barbers<T: BookingBackend>(
    State(state): State<AppState<T>>,
) -> Result<Json<Vec<Barber>>> {
    Ok(Json(state.backend.barbers(false)?))
}

pub(super) async fn add_barber<T: BookingBackend>(
    State(state): State<AppState<T>>,
    JsonBody(request): JsonBody<BarberRequest>,
) -> Result<(StatusCode, Json<Barber>)> {
    request.validate()?;
    let barber = state.backend.add_barber(NewBarber {
        name: request.name.trim().to_string(),
        bio: blank_to_none(request.bio),
    })?;
    info!(barber_id = barber.id, name = %barber.name, "Barber added");
    Ok((StatusCode::CREATED, Json(barber)))
}

pub(super) async fn toggle_barber<T: BookingBackend>(
    State(state): State<AppState<T>>,
    PathParam(id): PathParam<BarberId>,
) -> Result<Json<Barber>> {
    let barber = state
        .backend
        .barber(id)?
        .ok_or(BookingError::NotFound("barber"))?;
    let active = !barber.active;
    state.backend.set_barber_active(id, active)?;
    info!(barber_id = id, active, "Barber toggled");
    Ok(Json(Barber { active, ..barber }))
}

pub(super) async fn reservations<T: BookingBackend>(
    State(state): State<AppState<T>>,
) -> Result<Json<ReservationOverview>> {
    Ok(Json(ReservationOverview::partition(
        state.backend.reservations()?,
        state.clock.today(),
    )))
}

pub(super) async fn set_reservation_status<T: BookingBackend>(
    State(state): State<AppState<T>>,
    PathParam(id): PathParam<ReservationId>,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<StatusCode> {
    state.backend.set_reservation_status(id, update.status)?;
    info!(
        reservation_id = id,
        status = update.status.as_str(),
        "Reservation status changed"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn schedule<T: BookingBackend>(
    State(state): State<AppState<T>>,
    QueryParams(query): QueryParams<ScheduleQuery>,
) -> Result<Json<Vec<ScheduleSlot>>> {
    Ok(Json(state.backend.schedule_slots(ScheduleFilter {
        barber_id: query.barber_id,
        weekday: query.weekday,
        only_active: false,
    })?))
}

pub(super) async fn add_schedule_slot<T: BookingBackend>(
    State(state): State<AppState<T>>,
    JsonBody(request): JsonBody<SlotRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let created = schedule::add_slot(
        &state.backend,
        request.barber_id,
        request.weekday,
        request.time,
    )?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "created": created }))))
}

pub(super) async fn generate_schedule<T: BookingBackend>(
    State(state): State<AppState<T>>,
    JsonBody(request): JsonBody<GenerateRequest>,
) -> Result<Json<Value>> {
    let created = schedule::generate_for_barber(
        &state.backend,
        request.barber_id,
        request.weekday,
        request.start,
        request.end,
        request.step_minutes,
    )?;
    Ok(Json(json!({ "created": created })))
}

pub(super) async fn set_schedule_slot_status<T: BookingBackend>(
    State(state): State<AppState<T>>,
    PathParam(id): PathParam<ScheduleSlotId>,
    JsonBody(update): JsonBody<ActiveUpdate>,
) -> Result<StatusCode> {
    schedule::set_slot_active(&state.backend, id, update.active)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn remove_schedule_slot<T: BookingBackend>(
    State(state): State<AppState<T>>,
    PathParam(id): PathParam<ScheduleSlotId>,
) -> Result<StatusCode> {
    schedule::remove_slot(&state.backend, id)?;
    Ok(StatusCode::NO_CONTENT)
}
