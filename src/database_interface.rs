use crate::backend::{join_details, sort_newest_first, BookingBackend};
use crate::error::{BookingError, Result};
use crate::schema::{barbers, clients, reservations, schedule_slots, services};
use crate::types::{
    Barber, BarberId, Client, ClientId, NewBarber, NewClient, NewReservation, NewService,
    Reservation, ReservationDetails, ReservationId, ReservationStatus, ScheduleFilter,
    ScheduleSlot, ScheduleSlotId, Service, ServiceId, TimeOfDay, WeekdayIndex,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ConnectionError, PgConnection};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::error;

impl From<DieselError> for BookingError {
    fn from(err: DieselError) -> Self {
        error!(?err, "Database operation failed");
        BookingError::Storage(err.to_string())
    }
}

fn unique_violation_as(err: DieselError, conflict: BookingError) -> BookingError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => conflict,
        err => err.into(),
    }
}

fn occupying_statuses() -> Vec<&'static str> {
    ReservationStatus::OCCUPYING
        .iter()
        .map(|status| status.as_str())
        .collect()
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = clients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ClientRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ClientRow> for Client {
    type Error = BookingError;

    fn try_from(row: ClientRow) -> Result<Self> {
        Ok(Client {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = clients)]
struct NewClientRow<'a> {
    name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    password_hash: &'a str,
    role: &'a str,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = barbers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct BarberRow {
    id: i32,
    name: String,
    bio: Option<String>,
    active: bool,
}

impl From<BarberRow> for Barber {
    fn from(row: BarberRow) -> Self {
        Barber {
            id: row.id,
            name: row.name,
            bio: row.bio,
            active: row.active,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = barbers)]
struct NewBarberRow<'a> {
    name: &'a str,
    bio: Option<&'a str>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = services)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ServiceRow {
    id: i32,
    name: String,
    description: Option<String>,
    price_cents: i32,
    duration_minutes: i32,
    active: bool,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            duration_minutes: row.duration_minutes,
            active: row.active,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = services)]
struct NewServiceRow<'a> {
    name: &'a str,
    description: Option<&'a str>,
    price_cents: i32,
    duration_minutes: i32,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = schedule_slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ScheduleSlotRow {
    id: i32,
    barber_id: i32,
    weekday: i16,
    time_of_day: String,
    active: bool,
}

impl TryFrom<ScheduleSlotRow> for ScheduleSlot {
    type Error = BookingError;

    fn try_from(row: ScheduleSlotRow) -> Result<Self> {
        Ok(ScheduleSlot {
            id: row.id,
            barber_id: row.barber_id,
            weekday: WeekdayIndex::try_from(i64::from(row.weekday))?,
            time: row.time_of_day.parse()?,
            active: row.active,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = schedule_slots)]
struct NewScheduleSlotRow {
    barber_id: i32,
    weekday: i16,
    time_of_day: String,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = reservations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ReservationRow {
    id: i32,
    client_id: i32,
    barber_id: i32,
    service_id: i32,
    date: NaiveDate,
    time_of_day: String,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = BookingError;

    fn try_from(row: ReservationRow) -> Result<Self> {
        Ok(Reservation {
            id: row.id,
            client_id: row.client_id,
            barber_id: row.barber_id,
            service_id: row.service_id,
            date: row.date,
            time: row.time_of_day.parse()?,
            status: row.status.parse()?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = reservations)]
struct NewReservationRow<'a> {
    client_id: i32,
    barber_id: i32,
    service_id: i32,
    date: NaiveDate,
    time_of_day: String,
    status: &'a str,
    notes: Option<&'a str>,
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = BookingError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn slot_taken(
    connection: &mut PgConnection,
    barber_id: BarberId,
    date: NaiveDate,
    time: TimeOfDay,
    except: Option<ReservationId>,
) -> QueryResult<bool> {
    let count: i64 = reservations::table
        .filter(reservations::barber_id.eq(barber_id))
        .filter(reservations::date.eq(date))
        .filter(reservations::time_of_day.eq(time.to_string()))
        .filter(reservations::status.eq_any(occupying_statuses()))
        .filter(reservations::id.ne(except.unwrap_or(0)))
        .count()
        .get_result(connection)?;
    Ok(count > 0)
}

/// PostgreSQL backend. Run the migrations in `migrations/` before connecting.
#[derive(Clone)]
pub struct DatabaseInterface {
    connection: Arc<Mutex<PgConnection>>,
}

impl DatabaseInterface {
    pub fn new(database_url: &str) -> std::result::Result<Self, ConnectionError> {
        let connection = Self::establish_connection(database_url)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn establish_connection(
        database_url: &str,
    ) -> std::result::Result<PgConnection, ConnectionError> {
        PgConnection::establish(database_url)
    }

    fn details(
        connection: &mut PgConnection,
        rows: Vec<ReservationRow>,
    ) -> Result<Vec<ReservationDetails>> {
        let client_names: HashMap<ClientId, String> = clients::table
            .select((clients::id, clients::name))
            .load::<(i32, String)>(connection)?
            .into_iter()
            .collect();
        let service_names: HashMap<ServiceId, String> = services::table
            .select((services::id, services::name))
            .load::<(i32, String)>(connection)?
            .into_iter()
            .collect();
        let barber_names: HashMap<BarberId, String> = barbers::table
            .select((barbers::id, barbers::name))
            .load::<(i32, String)>(connection)?
            .into_iter()
            .collect();
        Ok(join_details(
            convert_all(rows)?,
            &client_names,
            &service_names,
            &barber_names,
        ))
    }
}

impl BookingBackend for DatabaseInterface {
    fn register_client(&self, client: NewClient) -> Result<Client> {
        let mut connection = self.connection.lock().unwrap();
        let row = diesel::insert_into(clients::table)
            .values(&NewClientRow {
                name: &client.name,
                email: &client.email,
                phone: client.phone.as_deref(),
                password_hash: &client.password_hash,
                role: client.role.as_str(),
            })
            .returning(ClientRow::as_returning())
            .get_result(&mut *connection)
            .map_err(|err| unique_violation_as(err, BookingError::EmailTaken))?;
        row.try_into()
    }

    fn client(&self, id: ClientId) -> Result<Option<Client>> {
        let mut connection = self.connection.lock().unwrap();
        clients::table
            .find(id)
            .select(ClientRow::as_select())
            .first(&mut *connection)
            .optional()?
            .map(Client::try_from)
            .transpose()
    }

    fn client_by_email(&self, email: &str) -> Result<Option<Client>> {
        let mut connection = self.connection.lock().unwrap();
        clients::table
            .filter(clients::email.eq(email))
            .select(ClientRow::as_select())
            .first(&mut *connection)
            .optional()?
            .map(Client::try_from)
            .transpose()
    }

    fn update_password(&self, id: ClientId, password_hash: String) -> Result<()> {
        let mut connection = self.connection.lock().unwrap();
        let updated = diesel::update(clients::table.find(id))
            .set(clients::password_hash.eq(password_hash))
            .execute(&mut *connection)?;
        if updated == 0 {
            return Err(BookingError::NotFound("client"));
        }
        Ok(())
    }

    fn client_count(&self) -> Result<usize> {
        let mut connection = self.connection.lock().unwrap();
        let count: i64 = clients::table.count().get_result(&mut *connection)?;
        Ok(count as usize)
    }

    fn services(&self, only_active: bool) -> Result<Vec<Service>> {
        let mut connection = self.connection.lock().unwrap();
        let mut query = services::table
            .select(ServiceRow::as_select())
            .order(services::name)
            .into_boxed();
        if only_active {
            query = query.filter(services::active.eq(true));
        }
        let rows = query.load(&mut *connection)?;
        Ok(rows.into_iter().map(Service::from).collect())
    }

    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        let mut connection = self.connection.lock().unwrap();
        let row = services::table
            .find(id)
            .select(ServiceRow::as_select())
            .first(&mut *connection)
            .optional()?;
        Ok(row.map(Service::from))
    }

    fn add_service(&self, service: NewService) -> Result<Service> {
        let mut connection = self.connection.lock().unwrap();
        let row = diesel::insert_into(services::table)
            .values(&NewServiceRow {
                name: &service.name,
                description: service.description.as_deref(),
                price_cents: service.price_cents,
                duration_minutes: service.duration_minutes,
            })
            .returning(ServiceRow::as_returning())
            .get_result(&mut *connection)?;
        Ok(row.into())
    }

    fn set_service_active(&self, id: ServiceId, active: bool) -> Result<()> {
        let mut connection = self.connection.lock().unwrap();
        let updated = diesel::update(services::table.find(id))
            .set(services::active.eq(active))
            .execute(&mut *connection)?;
        if updated == 0 {
            return Err(BookingError::NotFound("service"));
        }
        Ok(())
    }

    fn remove_service(&self, id: ServiceId) -> Result<()> {
        let mut connection = self.connection.lock().unwrap();
        let result = diesel::delete(services::table.find(id)).execute(&mut *connection);
        match result {
            Ok(0) => Err(BookingError::NotFound("service")),
            Ok(_) => Ok(()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => {
                Err(BookingError::InvalidInput(
                    "service has reservations, deactivate it instead".into(),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn barbers(&self, only_active: bool) -> Result<Vec<Barber>> {
        let mut connection = self.connection.lock().unwrap();
        let mut query = barbers::table
            .select(BarberRow::as_select())
            .order(barbers::name)
            .into_boxed();
        if only_active {
            query = query.filter(barbers::active.eq(true));
        }
        let rows = query.load(&mut *connection)?;
        Ok(rows.into_iter().map(Barber::from).collect())
    }

    fn barber(&self, id: BarberId) -> Result<Option<Barber>> {
        let mut connection = self.connection.lock().unwrap();
        let row = barbers::table
            .find(id)
            .select(BarberRow::as_select())
            .first(&mut *connection)
            .optional()?;
        Ok(row.map(Barber::from))
    }

    fn add_barber(&self, barber: NewBarber) -> Result<Barber> {
        let mut connection = self.connection.lock().unwrap();
        let row = diesel::insert_into(barbers::table)
            .values(&NewBarberRow {
                name: &barber.name,
                bio: barber.bio.as_deref(),
            })
            .returning(BarberRow::as_returning())
            .get_result(&mut *connection)?;
        Ok(row.into())
    }

    fn set_barber_active(&self, id: BarberId, active: bool) -> Result<()> {
        let mut connection = self.connection.lock().unwrap();
        let updated = diesel::update(barbers::table.find(id))
            .set(barbers::active.eq(active))
            .execute(&mut *connection)?;
        if updated == 0 {
            return Err(BookingError::NotFound("barber"));
        }
        Ok(())
    }

    fn schedule_slots(&self, filter: ScheduleFilter) -> Result<Vec<ScheduleSlot>> {
        let mut connection = self.connection.lock().unwrap();
        let mut query = schedule_slots::table
            .select(ScheduleSlotRow::as_select())
            .order((
                schedule_slots::weekday,
                schedule_slots::time_of_day,
                schedule_slots::barber_id,
            ))
            .into_boxed();
        if let Some(barber_id) = filter.barber_id {
            query = query.filter(schedule_slots::barber_id.eq(barber_id));
        }
        if let Some(weekday) = filter.weekday {
            query = query.filter(schedule_slots::weekday.eq(i16::from(weekday.value())));
        }
        if filter.only_active {
            query = query.filter(schedule_slots::active.eq(true));
        }
        convert_all(query.load(&mut *connection)?)
    }

    fn insert_schedule_slot(
        &self,
        barber_id: BarberId,
        weekday: WeekdayIndex,
        time: TimeOfDay,
    ) -> Result<bool> {
        let mut connection = self.connection.lock().unwrap();
        let inserted = diesel::insert_into(schedule_slots::table)
            .values(&NewScheduleSlotRow {
                barber_id,
                weekday: i16::from(weekday.value()),
                time_of_day: time.to_string(),
            })
            .on_conflict((
                schedule_slots::barber_id,
                schedule_slots::weekday,
                schedule_slots::time_of_day,
            ))
            .do_nothing()
            .execute(&mut *connection)?;
        Ok(inserted == 1)
    }

    fn set_schedule_slot_active(&self, id: ScheduleSlotId, active: bool) -> Result<()> {
        let mut connection = self.connection.lock().unwrap();
        let updated = diesel::update(schedule_slots::table.find(id))
            .set(schedule_slots::active.eq(active))
            .execute(&mut *connection)?;
        if updated == 0 {
            return Err(BookingError::NotFound("schedule slot"));
        }
        Ok(())
    }

    fn remove_schedule_slot(&self, id: ScheduleSlotId) -> Result<()> {
        let mut connection = self.connection.lock().unwrap();
        let deleted = diesel::delete(schedule_slots::table.find(id)).execute(&mut *connection)?;
        if deleted == 0 {
            return Err(BookingError::NotFound("schedule slot"));
        }
        Ok(())
    }

    fn occupied_times(&self, barber_id: BarberId, date: NaiveDate) -> Result<BTreeSet<TimeOfDay>> {
        let mut connection = self.connection.lock().unwrap();
        let times: Vec<String> = reservations::table
            .filter(reservations::barber_id.eq(barber_id))
            .filter(reservations::date.eq(date))
            .filter(reservations::status.eq_any(occupying_statuses()))
            .select(reservations::time_of_day)
            .load(&mut *connection)?;
        times.iter().map(|time| time.parse()).collect()
    }

    fn create_reservation(&self, reservation: NewReservation) -> Result<Reservation> {
        let mut connection = self.connection.lock().unwrap();
        let result = connection
            .build_transaction()
            .serializable()
            .run(|connection| {
                if slot_taken(
                    connection,
                    reservation.barber_id,
                    reservation.date,
                    reservation.time,
                    None,
                )? {
                    return Ok(None);
                }
                diesel::insert_into(reservations::table)
                    .values(&NewReservationRow {
                        client_id: reservation.client_id,
                        barber_id: reservation.barber_id,
                        service_id: reservation.service_id,
                        date: reservation.date,
                        time_of_day: reservation.time.to_string(),
                        status: ReservationStatus::Pending.as_str(),
                        notes: reservation.notes.as_deref(),
                    })
                    .returning(ReservationRow::as_returning())
                    .get_result(connection)
                    .map(Some)
            });
        match result {
            Ok(Some(row)) => row.try_into(),
            Ok(None)
            | Err(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::SerializationFailure,
                _,
            )) => Err(BookingError::SlotTaken),
            Err(err) => Err(err.into()),
        }
    }

    fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let mut connection = self.connection.lock().unwrap();
        reservations::table
            .find(id)
            .select(ReservationRow::as_select())
            .first(&mut *connection)
            .optional()?
            .map(Reservation::try_from)
            .transpose()
    }

    fn reservations(&self) -> Result<Vec<ReservationDetails>> {
        let mut connection = self.connection.lock().unwrap();
        let rows = reservations::table
            .select(ReservationRow::as_select())
            .order((reservations::date, reservations::time_of_day))
            .load(&mut *connection)?;
        Self::details(&mut *connection, rows)
    }

    fn client_reservations(&self, client_id: ClientId) -> Result<Vec<ReservationDetails>> {
        let mut connection = self.connection.lock().unwrap();
        let rows = reservations::table
            .filter(reservations::client_id.eq(client_id))
            .select(ReservationRow::as_select())
            .load(&mut *connection)?;
        let mut details = Self::details(&mut *connection, rows)?;
        sort_newest_first(&mut details);
        Ok(details)
    }

    fn set_reservation_status(&self, id: ReservationId, status: ReservationStatus) -> Result<()> {
        let mut connection = self.connection.lock().unwrap();
        let current = reservations::table
            .find(id)
            .select(ReservationRow::as_select())
            .first(&mut *connection)
            .optional()?
            .ok_or(BookingError::NotFound("reservation"))
            .and_then(Reservation::try_from)?;
        if status.occupies_slot()
            && !current.status.occupies_slot()
            && slot_taken(
                &mut *connection,
                current.barber_id,
                current.date,
                current.time,
                Some(id),
            )?
        {
            return Err(BookingError::SlotTaken);
        }
        diesel::update(reservations::table.find(id))
            .set(reservations::status.eq(status.as_str()))
            .execute(&mut *connection)
            .map_err(|err| unique_violation_as(err, BookingError::SlotTaken))?;
        Ok(())
    }
}
