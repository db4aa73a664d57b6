//! Error type shared by the booking domain and the storage backends.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("invalid range: start must not be after end and the step must be positive")]
    InvalidRange,

    #[error("invalid time of day: {0}")]
    InvalidTime(String),

    #[error("invalid weekday index: {0}")]
    InvalidWeekday(i64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid e-mail or password")]
    InvalidCredentials,

    #[error("admin access required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("e-mail already registered")]
    EmailTaken,

    #[error("time slot is no longer available")]
    SlotTaken,

    #[error("reservation can't be cancelled")]
    NotCancellable,

    #[error("booking step not allowed: {0}")]
    InvalidTransition(&'static str),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, BookingError>;
