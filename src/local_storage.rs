use crate::backend::{join_details, sort_newest_first, BookingBackend};
use crate::error::{BookingError, Result};
use crate::types::{
    Barber, BarberId, Client, ClientId, NewBarber, NewClient, NewReservation, NewService,
    Reservation, ReservationDetails, ReservationId, ReservationStatus, ScheduleFilter,
    ScheduleSlot, ScheduleSlotId, Service, ServiceId, TimeOfDay, WeekdayIndex,
};
use chrono::{NaiveDate, Utc};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex},
};
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    last_id: i32,
    clients: BTreeMap<ClientId, Client>,
    services: BTreeMap<ServiceId, Service>,
    barbers: BTreeMap<BarberId, Barber>,
    schedule: BTreeMap<ScheduleSlotId, ScheduleSlot>,
    reservations: BTreeMap<ReservationId, Reservation>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn details(&self, reservations: Vec<Reservation>) -> Vec<ReservationDetails> {
        let client_names: HashMap<_, _> = self
            .clients
            .values()
            .map(|client| (client.id, client.name.clone()))
            .collect();
        let service_names: HashMap<_, _> = self
            .services
            .values()
            .map(|service| (service.id, service.name.clone()))
            .collect();
        let barber_names: HashMap<_, _> = self
            .barbers
            .values()
            .map(|barber| (barber.id, barber.name.clone()))
            .collect();
        join_details(reservations, &client_names, &service_names, &barber_names)
    }
}

/// Non persistent backend, used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    tables: Arc<Mutex<Tables>>,
}

fn sorted_by_name<T>(items: impl Iterator<Item = T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

impl BookingBackend for LocalStorage {
    fn register_client(&self, client: NewClient) -> Result<Client> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .clients
            .values()
            .any(|existing| existing.email == client.email)
        {
            return Err(BookingError::EmailTaken);
        }
        let id = tables.next_id();
        let client = Client {
            id,
            name: client.name,
            email: client.email,
            phone: client.phone,
            password_hash: client.password_hash,
            role: client.role,
            created_at: Utc::now(),
        };
        tables.clients.insert(id, client.clone());
        Ok(client)
    }

    fn client(&self, id: ClientId) -> Result<Option<Client>> {
        Ok(self.tables.lock().unwrap().clients.get(&id).cloned())
    }

    fn client_by_email(&self, email: &str) -> Result<Option<Client>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .clients
            .values()
            .find(|client| client.email == email)
            .cloned())
    }

    fn update_password(&self, id: ClientId, password_hash: String) -> Result<()> {
        match self.tables.lock().unwrap().clients.get_mut(&id) {
            Some(client) => {
                client.password_hash = password_hash;
                Ok(())
            }
            None => Err(BookingError::NotFound("client")),
        }
    }

    fn client_count(&self) -> Result<usize> {
        Ok(self.tables.lock().unwrap().clients.len())
    }

    fn services(&self, only_active: bool) -> Result<Vec<Service>> {
        let tables = self.tables.lock().unwrap();
        Ok(sorted_by_name(
            tables
                .services
                .values()
                .filter(|service| !only_active || service.active)
                .cloned(),
            |service| service.name.as_str(),
        ))
    }

    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        Ok(self.tables.lock().unwrap().services.get(&id).cloned())
    }

    fn add_service(&self, service: NewService) -> Result<Service> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let service = Service {
            id,
            name: service.name,
            description: service.description,
            price_cents: service.price_cents,
            duration_minutes: service.duration_minutes,
            active: true,
        };
        tables.services.insert(id, service.clone());
        Ok(service)
    }

    fn set_service_active(&self, id: ServiceId, active: bool) -> Result<()> {
        match self.tables.lock().unwrap().services.get_mut(&id) {
            Some(service) => {
                service.active = active;
                Ok(())
            }
            None => Err(BookingError::NotFound("service")),
        }
    }

    fn remove_service(&self, id: ServiceId) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .reservations
            .values()
            .any(|reservation| reservation.service_id == id)
        {
            return Err(BookingError::InvalidInput(
                "service has reservations, deactivate it instead".into(),
            ));
        }
        if tables.services.remove(&id).is_none() {
            return Err(BookingError::NotFound("service"));
        }
        Ok(())
    }

    fn barbers(&self, only_active: bool) -> Result<Vec<Barber>> {
        let tables = self.tables.lock().unwrap();
        Ok(sorted_by_name(
            tables
                .barbers
                .values()
                .filter(|barber| !only_active || barber.active)
                .cloned(),
            |barber| barber.name.as_str(),
        ))
    }

    fn barber(&self, id: BarberId) -> Result<Option<Barber>> {
        Ok(self.tables.lock().unwrap().barbers.get(&id).cloned())
    }

    fn add_barber(&self, barber: NewBarber) -> Result<Barber> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let barber = Barber {
            id,
            name: barber.name,
            bio: barber.bio,
            active: true,
        };
        tables.barbers.insert(id, barber.clone());
        Ok(barber)
    }

    fn set_barber_active(&self, id: BarberId, active: bool) -> Result<()> {
        match self.tables.lock().unwrap().barbers.get_mut(&id) {
            Some(barber) => {
                barber.active = active;
                Ok(())
            }
            None => Err(BookingError::NotFound("barber")),
        }
    }

    fn schedule_slots(&self, filter: ScheduleFilter) -> Result<Vec<ScheduleSlot>> {
        let tables = self.tables.lock().unwrap();
        let mut slots: Vec<ScheduleSlot> = tables
            .schedule
            .values()
            .filter(|slot| filter.matches(slot))
            .cloned()
            .collect();
        slots.sort_by_key(|slot| (slot.weekday, slot.time, slot.barber_id));
        Ok(slots)
    }

    fn insert_schedule_slot(
        &self,
        barber_id: BarberId,
        weekday: WeekdayIndex,
        time: TimeOfDay,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let exists = tables.schedule.values().any(|slot| {
            slot.barber_id == barber_id && slot.weekday == weekday && slot.time == time
        });
        if exists {
            debug!(barber_id, %time, "Schedule slot already exists");
            return Ok(false);
        }
        let id = tables.next_id();
        tables.schedule.insert(
            id,
            ScheduleSlot {
                id,
                barber_id,
                weekday,
                time,
                active: true,
            },
        );
        Ok(true)
    }

    fn set_schedule_slot_active(&self, id: ScheduleSlotId, active: bool) -> Result<()> {
        match self.tables.lock().unwrap().schedule.get_mut(&id) {
            Some(slot) => {
                slot.active = active;
                Ok(())
            }
            None => Err(BookingError::NotFound("schedule slot")),
        }
    }

    fn remove_schedule_slot(&self, id: ScheduleSlotId) -> Result<()> {
        if self.tables.lock().unwrap().schedule.remove(&id).is_none() {
            return Err(BookingError::NotFound("schedule slot"));
        }
        Ok(())
    }

    fn occupied_times(&self, barber_id: BarberId, date: NaiveDate) -> Result<BTreeSet<TimeOfDay>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reservations
            .values()
            .filter(|reservation| {
                reservation.barber_id == barber_id
                    && reservation.date == date
                    && reservation.status.occupies_slot()
            })
            .map(|reservation| reservation.time)
            .collect())
    }

    fn create_reservation(&self, reservation: NewReservation) -> Result<Reservation> {
        // check and insert under the same lock
        let mut tables = self.tables.lock().unwrap();
        let taken = tables.reservations.values().any(|existing| {
            existing.barber_id == reservation.barber_id
                && existing.date == reservation.date
                && existing.time == reservation.time
                && existing.status.occupies_slot()
        });
        if taken {
            return Err(BookingError::SlotTaken);
        }

        let id = tables.next_id();
        let reservation = Reservation {
            id,
            client_id: reservation.client_id,
            barber_id: reservation.barber_id,
            service_id: reservation.service_id,
            date: reservation.date,
            time: reservation.time,
            status: ReservationStatus::Pending,
            notes: reservation.notes,
            created_at: Utc::now(),
        };
        tables.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.tables.lock().unwrap().reservations.get(&id).cloned())
    }

    fn reservations(&self) -> Result<Vec<ReservationDetails>> {
        let tables = self.tables.lock().unwrap();
        let reservations = tables.reservations.values().cloned().collect();
        Ok(tables.details(reservations))
    }

    fn client_reservations(&self, client_id: ClientId) -> Result<Vec<ReservationDetails>> {
        let tables = self.tables.lock().unwrap();
        let reservations = tables
            .reservations
            .values()
            .filter(|reservation| reservation.client_id == client_id)
            .cloned()
            .collect();
        let mut details = tables.details(reservations);
        sort_newest_first(&mut details);
        Ok(details)
    }

    fn set_reservation_status(&self, id: ReservationId, status: ReservationStatus) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let Some(reservation) = tables.reservations.get(&id) else {
            return Err(BookingError::NotFound("reservation"));
        };
        if status.occupies_slot() && !reservation.status.occupies_slot() {
            let (barber_id, date, time) =
                (reservation.barber_id, reservation.date, reservation.time);
            let taken = tables.reservations.values().any(|other| {
                other.id != id
                    && other.barber_id == barber_id
                    && other.date == date
                    && other.time == time
                    && other.status.occupies_slot()
            });
            if taken {
                return Err(BookingError::SlotTaken);
            }
        }
        if let Some(reservation) = tables.reservations.get_mut(&id) {
            reservation.status = status;
        }
        Ok(())
    }
}
