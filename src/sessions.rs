use crate::booking::BookingSummary;
use crate::types::{Client, ClientId, Role};
use crate::wizard::BookingWizard;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "barber_session";

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub client_id: ClientId,
    pub role: Role,
    pub wizard: BookingWizard,
    pub last_booking: Option<BookingSummary>,
    pub last_seen: DateTime<Utc>,
}

/// Logged in clients, keyed by the id stored in the session cookie. A session that
/// was not used for `idle_timeout` is gone.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
        }
    }

    pub fn create(&self, client: &Client) -> Uuid {
        self.create_at(client, Utc::now())
    }

    pub fn get(&self, id: Uuid) -> Option<Session> {
        self.get_at(id, Utc::now())
    }

    /// Runs `update` on a live session and marks it as used.
    pub fn update<R>(&self, id: Uuid, update: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.update_at(id, Utc::now(), update)
    }

    pub fn remove(&self, id: Uuid) -> Option<Session> {
        self.sessions.lock().unwrap().remove(&id)
    }

    fn create_at(&self, client: &Client, now: DateTime<Utc>) -> Uuid {
        self.cleanup_expired(now);
        let id = Uuid::new_v4();
        self.sessions.lock().unwrap().insert(
            id,
            Session {
                client_id: client.id,
                role: client.role,
                wizard: BookingWizard::default(),
                last_booking: None,
                last_seen: now,
            },
        );
        id
    }

    fn get_at(&self, id: Uuid, now: DateTime<Utc>) -> Option<Session> {
        self.update_at(id, now, |session| session.clone())
    }

    fn update_at<R>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        update: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(&id)?;
        if session.last_seen < now - self.idle_timeout {
            sessions.remove(&id);
            debug!(session = %id, "Session expired");
            return None;
        }
        session.last_seen = now;
        Some(update(session))
    }

    /// Drops every session idle for longer than the timeout.
    fn cleanup_expired(&self, now: DateTime<Utc>) {
        let cutoff_time = now - self.idle_timeout;
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen >= cutoff_time);
        if sessions.len() < before {
            debug!(removed = before - sessions.len(), "Removed expired sessions");
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

pub fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

pub fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

#[cfg(test)]
mod test {
    use super::*;

    fn client() -> Client {
        Client {
            id: 7,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: None,
            password_hash: String::new(),
            role: Role::Client,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_update_remove() {
        let store = SessionStore::new(Duration::minutes(30));
        let id = store.create(&client());
        assert_eq!(store.get(id).unwrap().client_id, 7);

        store
            .update(id, |session| session.wizard.select_service(3))
            .unwrap()
            .unwrap();
        assert_eq!(
            store.get(id).unwrap().wizard,
            BookingWizard::SelectingBarber { service_id: 3 }
        );

        assert!(store.remove(id).is_some());
        assert!(store.get(id).is_none());
        assert!(store.update(id, |_| ()).is_none());
    }

    #[test]
    fn test_idle_session_expires() {
        let store = SessionStore::new(Duration::minutes(30));
        let start = Utc::now();
        let id = store.create_at(&client(), start);

        let active = start + Duration::minutes(20);
        assert!(store.get_at(id, active).is_some());
        // the read above refreshed the session
        assert!(store.get_at(id, active + Duration::minutes(25)).is_some());

        let idle = active + Duration::minutes(25) + Duration::minutes(31);
        assert!(store.update_at(id, idle, |_| ()).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_create_prunes_expired_sessions() {
        let store = SessionStore::new(Duration::minutes(30));
        let start = Utc::now();
        let stale = store.create_at(&client(), start);
        let fresh = store.create_at(&client(), start + Duration::minutes(20));

        let later = store.create_at(&client(), start + Duration::minutes(45));
        assert_eq!(store.len(), 2);
        let now = start + Duration::minutes(45);
        assert!(store.get_at(stale, now).is_none());
        assert!(store.get_at(fresh, now).is_some());
        assert!(store.get_at(later, now).is_some());
    }

    #[test]
    fn test_session_cookie_roundtrip() {
        let id = Uuid::new_v4();
        let jar = CookieJar::new().add(session_cookie(id));
        assert_eq!(session_id(&jar), Some(id));

        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "garbage"));
        assert_eq!(session_id(&jar), None);
    }
}
