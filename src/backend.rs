use crate::error::Result;
use crate::types::{
    Barber, BarberId, Client, ClientId, NewBarber, NewClient, NewReservation, NewService,
    Reservation, ReservationDetails, ReservationId, ReservationStatus, ScheduleFilter,
    ScheduleSlot, ScheduleSlotId, Service, ServiceId, TimeOfDay, WeekdayIndex,
};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

pub trait BookingBackend: Clone + Send + Sync + 'static {
    fn register_client(&self, client: NewClient) -> Result<Client>;
    fn client(&self, id: ClientId) -> Result<Option<Client>>;
    fn client_by_email(&self, email: &str) -> Result<Option<Client>>;
    fn update_password(&self, id: ClientId, password_hash: String) -> Result<()>;
    fn client_count(&self) -> Result<usize>;

    fn services(&self, only_active: bool) -> Result<Vec<Service>>;
    fn service(&self, id: ServiceId) -> Result<Option<Service>>;
    fn add_service(&self, service: NewService) -> Result<Service>;
    fn set_service_active(&self, id: ServiceId, active: bool) -> Result<()>;
    fn remove_service(&self, id: ServiceId) -> Result<()>;

    fn barbers(&self, only_active: bool) -> Result<Vec<Barber>>;
    fn barber(&self, id: BarberId) -> Result<Option<Barber>>;
    fn add_barber(&self, barber: NewBarber) -> Result<Barber>;
    fn set_barber_active(&self, id: BarberId, active: bool) -> Result<()>;

    /// Slots ordered by weekday, then time.
    fn schedule_slots(&self, filter: ScheduleFilter) -> Result<Vec<ScheduleSlot>>;
    /// Inserts an active slot unless one already exists for (barber, weekday, time).
    /// Returns whether a new slot was created.
    fn insert_schedule_slot(
        &self,
        barber_id: BarberId,
        weekday: WeekdayIndex,
        time: TimeOfDay,
    ) -> Result<bool>;
    fn set_schedule_slot_active(&self, id: ScheduleSlotId, active: bool) -> Result<()>;
    fn remove_schedule_slot(&self, id: ScheduleSlotId) -> Result<()>;

    /// Times on `date` held by a pending or confirmed reservation of the barber.
    fn occupied_times(&self, barber_id: BarberId, date: NaiveDate) -> Result<BTreeSet<TimeOfDay>>;
    /// Inserts a pending reservation, failing with `SlotTaken` if the slot is occupied.
    fn create_reservation(&self, reservation: NewReservation) -> Result<Reservation>;
    fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>>;
    fn reservations(&self) -> Result<Vec<ReservationDetails>>;
    fn client_reservations(&self, client_id: ClientId) -> Result<Vec<ReservationDetails>>;
    fn set_reservation_status(&self, id: ReservationId, status: ReservationStatus) -> Result<()>;
}

/// Attaches client, service and barber names to reservations. Unknown references
/// (deleted services for example) show up with an empty name.
pub fn join_details(
    reservations: Vec<Reservation>,
    client_names: &HashMap<ClientId, String>,
    service_names: &HashMap<ServiceId, String>,
    barber_names: &HashMap<BarberId, String>,
) -> Vec<ReservationDetails> {
    reservations
        .into_iter()
        .map(|reservation| ReservationDetails {
            client_name: client_names
                .get(&reservation.client_id)
                .cloned()
                .unwrap_or_default(),
            service_name: service_names
                .get(&reservation.service_id)
                .cloned()
                .unwrap_or_default(),
            barber_name: barber_names
                .get(&reservation.barber_id)
                .cloned()
                .unwrap_or_default(),
            reservation,
        })
        .collect()
}

/// Newest first, the order used by client history.
pub fn sort_newest_first(reservations: &mut [ReservationDetails]) {
    reservations.sort_by(|a, b| {
        (b.reservation.date, b.reservation.time).cmp(&(a.reservation.date, a.reservation.time))
    });
}
