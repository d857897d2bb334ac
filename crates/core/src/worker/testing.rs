//! In-crate doubles for the controller's collaborators.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use super::namespace::Clock;
use super::network::Network;
use super::platform::{Notification, Platform};
use super::request::{Request, Response};
use crate::Error;

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0).unwrap()
    }
}

/// Answers by URL path. Unscripted paths are network failures.
#[derive(Default)]
pub struct ScriptedNetwork {
    script: Mutex<HashMap<String, Option<(u16, String)>>>,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.script.lock().unwrap().insert(path.to_string(), Some((status, body.to_string())));
    }

    pub fn fail(&self, path: &str) {
        self.script.lock().unwrap().insert(path.to_string(), None);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().get(request.url.path()).cloned().flatten();
        match scripted {
            Some((status, body)) => Ok(Response::new(request.url.clone(), status).with_body(body)),
            None => Err(Error::Network(format!("offline: {}", request.url))),
        }
    }
}

#[derive(Default)]
pub struct RecordingPlatform {
    skip_waiting: AtomicUsize,
    claims: AtomicUsize,
    pub notifications: Mutex<Vec<Notification>>,
    pub closed: Mutex<Vec<String>>,
    pub windows: Mutex<Vec<Url>>,
}

impl RecordingPlatform {
    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn show_notification(&self, notification: Notification) -> Result<String, Error> {
        let mut shown = self.notifications.lock().unwrap();
        shown.push(notification);
        Ok(format!("n{}", shown.len()))
    }

    async fn close_notification(&self, id: &str) -> Result<(), Error> {
        self.closed.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.windows.lock().unwrap().push(url.clone());
        Ok(())
    }
}
