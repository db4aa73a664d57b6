use crate::backend::BookingBackend;
use crate::clock::SystemClock;
use crate::configuration::Configuration;
use crate::error::{BookingError, Result};
use crate::sessions::{session_id, Session, SessionStore};
use crate::types::Role;
use crate::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

mod admin;
mod api;
mod client;

/// JSON request body whose rejections answer like every other error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(BookingError))]
pub(super) struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(BookingError))]
pub(super) struct PathParam<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(BookingError))]
pub(super) struct QueryParams<T>(pub T);

impl From<JsonRejection> for BookingError {
    fn from(rejection: JsonRejection) -> Self {
        BookingError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for BookingError {
    fn from(rejection: PathRejection) -> Self {
        BookingError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for BookingError {
    fn from(rejection: QueryRejection) -> Self {
        BookingError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::InvalidRange
            | BookingError::InvalidTime(_)
            | BookingError::InvalidWeekday(_)
            | BookingError::InvalidInput(_)
            | BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Unauthorized | BookingError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            BookingError::Forbidden => StatusCode::FORBIDDEN,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::EmailTaken
            | BookingError::SlotTaken
            | BookingError::NotCancellable
            | BookingError::InvalidTransition(_) => StatusCode::CONFLICT,
            BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(err = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn create_app<T: BookingBackend, C: Configuration>(backend: T, configuration: C) -> Router {
    router(AppState {
        backend,
        sessions: SessionStore::new(chrono::Duration::minutes(i64::from(
            configuration.session_idle_minutes(),
        ))),
        clock: Arc::new(SystemClock),
        website_title: configuration.website_title(),
        max_agenda_days: configuration.max_agenda_days(),
    })
}

pub fn router<T: BookingBackend>(state: AppState<T>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/", get(client::home::<T>))
        .route("/register", post(client::register_client::<T>))
        .route("/login", post(client::login::<T>))
        .route("/logout", post(client::logout::<T>))
        .route("/profile", get(client::profile::<T>))
        .route("/change_password", post(client::change_password::<T>))
        .route("/services", get(client::services::<T>))
        .route("/barbers", get(client::barbers::<T>))
        .route("/booking", get(client::booking_state::<T>))
        .route("/booking/service", post(client::select_service::<T>))
        .route("/booking/barber", post(client::select_barber::<T>))
        .route("/booking/days", get(client::booking_days::<T>))
        .route("/booking/slot", post(client::select_slot::<T>))
        .route("/booking/review", get(client::review::<T>))
        .route("/booking/confirm", post(client::confirm::<T>))
        .route("/booking/back", post(client::back::<T>))
        .route("/booking/success", get(client::success::<T>))
        .route("/my_bookings", get(client::my_bookings::<T>))
        .route("/my_bookings/:id/cancel", post(client::cancel::<T>))
        .route("/api/slots", get(api::slots::<T>))
        .route("/api/agenda/:barber_id", get(api::agenda::<T>));

    let admin = Router::new()
        .route("/admin/dashboard", get(admin::dashboard::<T>))
        .route(
            "/admin/services",
            get(admin::services::<T>).post(admin::add_service::<T>),
        )
        .route("/admin/services/:id/toggle", post(admin::toggle_service::<T>))
        .route("/admin/services/:id", delete(admin::remove_service::<T>))
        .route(
            "/admin/barbers",
            get(admin::barbers::<T>).post(admin::add_barber::<T>),
        )
        .route("/admin/barbers/:id/toggle", post(admin::toggle_barber::<T>))
        .route("/admin/reservations", get(admin::reservations::<T>))
        .route(
            "/admin/reservations/:id/status",
            post(admin::set_reservation_status::<T>),
        )
        .route(
            "/admin/schedule",
            get(admin::schedule::<T>).post(admin::add_schedule_slot::<T>),
        )
        .route("/admin/schedule/generate", post(admin::generate_schedule::<T>))
        .route(
            "/admin/schedule/:id/status",
            post(admin::set_schedule_slot_status::<T>),
        )
        .route("/admin/schedule/:id", delete(admin::remove_schedule_slot::<T>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<T>,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn admin_auth<T: BookingBackend>(
    State(state): State<AppState<T>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response> {
    let (_, session) = current_session(&state, &jar)?;
    if session.role != Role::Admin {
        return Err(BookingError::Forbidden);
    }
    Ok(next.run(request).await)
}

fn current_session<T: BookingBackend>(
    state: &AppState<T>,
    jar: &CookieJar,
) -> Result<(Uuid, Session)> {
    let id = session_id(jar).ok_or(BookingError::Unauthorized)?;
    let session = state.sessions.get(id).ok_or(BookingError::Unauthorized)?;
    Ok((id, session))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidInput(format!("invalid date {value}")))
}
