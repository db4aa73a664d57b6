//! Booking in progress, one per session.
//!
//! The wizard walks `SelectingService -> SelectingBarber -> SelectingDate -> Reviewing ->
//! Committed`. Every step only accepts the input of its own state; `back` moves one step
//! back and keeps the selections made before that step.

use crate::error::{BookingError, Result};
use crate::types::{BarberId, ReservationId, ServiceId, TimeOfDay};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingDraft {
    pub service_id: ServiceId,
    pub barber_id: BarberId,
    pub date: NaiveDate,
    pub time: TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum BookingWizard {
    #[default]
    SelectingService,
    SelectingBarber {
        service_id: ServiceId,
    },
    SelectingDate {
        service_id: ServiceId,
        barber_id: BarberId,
    },
    Reviewing(BookingDraft),
    Committed {
        reservation_id: ReservationId,
    },
}

impl BookingWizard {
    /// Picking a service after a committed booking starts the next one.
    pub fn select_service(&mut self, service_id: ServiceId) -> Result<()> {
        match self {
            BookingWizard::SelectingService | BookingWizard::Committed { .. } => {
                *self = BookingWizard::SelectingBarber { service_id };
                Ok(())
            }
            _ => Err(BookingError::InvalidTransition("a service was already selected")),
        }
    }

    pub fn select_barber(&mut self, barber_id: BarberId) -> Result<()> {
        match *self {
            BookingWizard::SelectingBarber { service_id } => {
                *self = BookingWizard::SelectingDate {
                    service_id,
                    barber_id,
                };
                Ok(())
            }
            _ => Err(BookingError::InvalidTransition("select a service first")),
        }
    }

    pub fn select_slot(&mut self, date: NaiveDate, time: TimeOfDay) -> Result<()> {
        match *self {
            BookingWizard::SelectingDate {
                service_id,
                barber_id,
            } => {
                *self = BookingWizard::Reviewing(BookingDraft {
                    service_id,
                    barber_id,
                    date,
                    time,
                });
                Ok(())
            }
            _ => Err(BookingError::InvalidTransition("select a barber first")),
        }
    }

    pub fn draft(&self) -> Result<BookingDraft> {
        match self {
            BookingWizard::Reviewing(draft) => Ok(*draft),
            _ => Err(BookingError::InvalidTransition("booking is not ready for review")),
        }
    }

    pub fn commit(&mut self, reservation_id: ReservationId) -> Result<()> {
        self.draft()?;
        *self = BookingWizard::Committed { reservation_id };
        Ok(())
    }

    pub fn back(&mut self) -> Result<()> {
        *self = match *self {
            BookingWizard::SelectingBarber { .. } => BookingWizard::SelectingService,
            BookingWizard::SelectingDate { service_id, .. } => {
                BookingWizard::SelectingBarber { service_id }
            }
            BookingWizard::Reviewing(draft) => BookingWizard::SelectingDate {
                service_id: draft.service_id,
                barber_id: draft.barber_id,
            },
            BookingWizard::SelectingService => {
                return Err(BookingError::InvalidTransition("nothing to go back to"))
            }
            BookingWizard::Committed { .. } => {
                return Err(BookingError::InvalidTransition("booking already committed"))
            }
        };
        Ok(())
    }

    /// Barber chosen so far, if any.
    pub fn barber(&self) -> Option<BarberId> {
        match self {
            BookingWizard::SelectingDate { barber_id, .. } => Some(*barber_id),
            BookingWizard::Reviewing(draft) => Some(draft.barber_id),
            _ => None,
        }
    }
}
