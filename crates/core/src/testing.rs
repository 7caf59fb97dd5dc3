//! Test doubles for the network and the hosting platform.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use url::Url;

use crate::{CacheDb, Error};
use crate::config::WorkerConfig;
use crate::http::{Fetcher, Request, Response};
use crate::worker::CacheRouter;
use crate::worker::platform::{Platform, WindowClient};
use crate::worker::push::Notification;

enum Reply {
    Respond(Response),
    Fail,
}

/// Scripted network keyed by absolute URL. Unscripted URLs fail.
#[derive(Default)]
pub(crate) struct StubFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<Request>>,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &str, response: Response) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Respond(response));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Fail);
    }

    pub(crate) fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.url.as_str() == url).count()
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().get(request.url.as_str()) {
            Some(Reply::Respond(response)) => Ok(response.clone()),
            Some(Reply::Fail) => Err(Error::Network(format!("connection refused: {}", request.url))),
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

/// Platform that records every call.
#[derive(Default)]
pub(crate) struct RecordingPlatform {
    pub(crate) skip_waiting_calls: AtomicUsize,
    pub(crate) claimed: AtomicBool,
    pub(crate) notifications: Mutex<Vec<Notification>>,
    pub(crate) open_clients: Mutex<Vec<WindowClient>>,
    pub(crate) opened: Mutex<Vec<String>>,
    pub(crate) focused: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Platform for RecordingPlatform {
    async fn skip_waiting(&self) {
        self.skip_waiting_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.claimed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn clients(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(self.open_clients.lock().unwrap().clone())
    }

    async fn focus(&self, client: &WindowClient) -> Result<(), Error> {
        self.focused.lock().unwrap().push(client.id.clone());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub(crate) const ORIGIN: &str = "https://example.com";

/// A router over an in-memory database and a scripted network.
pub(crate) async fn router_with(config: WorkerConfig) -> (CacheRouter, CacheDb, Arc<StubFetcher>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let network = Arc::new(StubFetcher::new());
    let router = CacheRouter::new(config, Url::parse(ORIGIN).unwrap(), Arc::new(db.clone()), network.clone()).unwrap();
    (router, db, network)
}
