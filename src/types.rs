use crate::error::BookingError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

pub type ClientId = i32;
pub type BarberId = i32;
pub type ServiceId = i32;
pub type ScheduleSlotId = i32;
pub type ReservationId = i32;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Minute precision time of day, written as `HH:MM` on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then(|| Self(minutes as u16))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }
}

impl FromStr for TimeOfDay {
    type Err = BookingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map_err(|_| BookingError::InvalidTime(value.to_string()))?;
        Self::from_hm(time.hour(), time.minute())
            .ok_or_else(|| BookingError::InvalidTime(value.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Weekday index used by the weekly schedule templates.
///
/// Calendar dates are converted with [`WeekdayIndex::from_date`], which shifts the
/// Monday based calendar numbering by one (Monday becomes 1, Sunday becomes 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct WeekdayIndex(u8);

impl WeekdayIndex {
    pub fn new(index: u8) -> Option<Self> {
        (index < 7).then_some(Self(index))
    }

    /// Converts a Monday based calendar weekday (Monday = 0 .. Sunday = 6).
    pub fn from_native(native_weekday: u32) -> Self {
        Self(((native_weekday + 1) % 7) as u8)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_native(date.weekday().num_days_from_monday())
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for WeekdayIndex {
    type Error = BookingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(BookingError::InvalidWeekday(value))
    }
}

impl From<WeekdayIndex> for u8 {
    fn from(weekday: WeekdayIndex) -> Self {
        weekday.0
    }
}

const WEEKDAY_LABELS: [&str; 7] = [
    "Segunda", "Terça", "Quarta", "Quinta", "Sexta", "Sábado", "Domingo",
];

/// Display name of the calendar weekday of `date`.
pub fn weekday_label(date: NaiveDate) -> &'static str {
    WEEKDAY_LABELS[date.weekday().num_days_from_monday() as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub const OCCUPYING: [ReservationStatus; 2] =
        [ReservationStatus::Pending, ReservationStatus::Confirmed];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }

    /// Whether a reservation in this status blocks its time slot.
    pub fn occupies_slot(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

impl FromStr for ReservationStatus {
    type Err = BookingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "completed" => Ok(ReservationStatus::Completed),
            other => Err(BookingError::InvalidInput(format!(
                "unknown reservation status {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = BookingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "client" => Ok(Role::Client),
            "admin" => Ok(Role::Admin),
            other => Err(BookingError::InvalidInput(format!("unknown role {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barber {
    pub id: BarberId,
    pub name: String,
    pub bio: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewBarber {
    pub name: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub duration_minutes: i32,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub duration_minutes: i32,
}

/// Recurring weekly time at which a barber can be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: ScheduleSlotId,
    pub barber_id: BarberId,
    pub weekday: WeekdayIndex,
    pub time: TimeOfDay,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleFilter {
    pub barber_id: Option<BarberId>,
    pub weekday: Option<WeekdayIndex>,
    pub only_active: bool,
}

impl ScheduleFilter {
    pub fn matches(&self, slot: &ScheduleSlot) -> bool {
        self.barber_id.map_or(true, |barber_id| slot.barber_id == barber_id)
            && self.weekday.map_or(true, |weekday| slot.weekday == weekday)
            && (!self.only_active || slot.active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub client_id: ClientId,
    pub barber_id: BarberId,
    pub service_id: ServiceId,
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub client_id: ClientId,
    pub barber_id: BarberId,
    pub service_id: ServiceId,
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub notes: Option<String>,
}

/// Reservation joined with the names shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub client_name: String,
    pub service_name: String,
    pub barber_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    #[serde(rename = "hora")]
    pub time: TimeOfDay,
    #[serde(rename = "disponivel")]
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAgenda {
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "dia")]
    pub weekday_label: String,
    pub slots: Vec<AvailabilitySlot>,
}
