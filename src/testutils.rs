use crate::{
    accounts::hash_password,
    backend::BookingBackend,
    clock::MockClock,
    http::router,
    local_storage::LocalStorage,
    sessions::SessionStore,
    types::{
        Barber, BarberId, Client, ClientId, NewBarber, NewClient, NewReservation, NewService,
        ReservationId, Role, Service, ServiceId, TimeOfDay,
    },
    AppState,
};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tokio::{net::TcpListener, task::JoinHandle};

pub const TEST_PASSWORD: &str = "secret123";

pub fn time(value: &str) -> TimeOfDay {
    value.parse().unwrap()
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn seed_client_with_role(storage: &LocalStorage, email: &str, role: Role) -> Client {
    storage
        .register_client(NewClient {
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role,
        })
        .unwrap()
}

pub fn seed_client(storage: &LocalStorage, email: &str) -> Client {
    seed_client_with_role(storage, email, Role::Client)
}

pub fn seed_barber(storage: &LocalStorage, name: &str) -> Barber {
    storage
        .add_barber(NewBarber {
            name: name.to_string(),
            bio: None,
        })
        .unwrap()
}

pub fn seed_service(storage: &LocalStorage, name: &str) -> Service {
    storage
        .add_service(NewService {
            name: name.to_string(),
            description: None,
            price_cents: 4500,
            duration_minutes: 30,
        })
        .unwrap()
}

pub fn reserve(
    storage: &LocalStorage,
    client_id: ClientId,
    barber_id: BarberId,
    service_id: ServiceId,
    on: &str,
    at: &str,
) -> ReservationId {
    storage
        .create_reservation(NewReservation {
            client_id,
            barber_id,
            service_id,
            date: date(on),
            time: time(at),
            notes: None,
        })
        .unwrap()
        .id
}

/// Server on an ephemeral port, stopped when dropped.
pub struct TestApp {
    pub storage: LocalStorage,
    address: String,
    server: JoinHandle<()>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Starts the router on in-memory storage with the clock fixed at `today`.
pub async fn spawn_app(today: &str) -> TestApp {
    let mut clock = MockClock::new();
    clock.expect_today().return_const(date(today));

    let storage = LocalStorage::default();
    let state = AppState {
        backend: storage.clone(),
        sessions: SessionStore::new(chrono::Duration::hours(1)),
        clock: Arc::new(clock),
        website_title: "Barbearia".into(),
        max_agenda_days: 31,
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    TestApp {
        storage,
        address,
        server,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().cookie_store(true).build().unwrap()
}

pub async fn login(client: &reqwest::Client, app: &TestApp, email: &str) {
    let response = client
        .post(app.url("/login"))
        .json(&json!({"email": email, "password": TEST_PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}
