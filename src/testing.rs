//! Test doubles shared by unit tests across modules.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};

use crate::api::ApiClient;
use crate::app::Result;
use crate::connectivity::Connectivity;
use crate::domain::{Feed, Item, ResultSet};
use crate::refresh::{CompletionSender, FetchMode, RefreshSource, SurfaceView};
use crate::scheduler::{next_wake, Clock, WakeTimer};

pub fn items(feed: Feed, ids: &[&str]) -> Vec<Item> {
    ids.iter()
        .map(|id| {
            let mut item = Item::new(feed, *id);
            item.text = format!("item {}", id);
            item
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Newer,
    Older,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub feed: Feed,
    pub direction: Direction,
    pub cursor: Option<String>,
    pub page_size: usize,
}

/// API client that replays scripted responses; unscripted calls return no items.
#[derive(Default)]
pub struct FakeApi {
    responses: Mutex<HashMap<(Feed, Direction), VecDeque<Result<Vec<Item>>>>>,
    calls: Mutex<Vec<ApiCall>>,
    panic_next: AtomicBool,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_newer(&self, feed: Feed, response: Result<Vec<Item>>) {
        self.push(feed, Direction::Newer, response);
    }

    pub fn push_older(&self, feed: Feed, response: Result<Vec<Item>>) {
        self.push(feed, Direction::Older, response);
    }

    pub fn panic_next_fetch(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, feed: Feed, direction: Direction, response: Result<Vec<Item>>) {
        self.responses
            .lock()
            .unwrap()
            .entry((feed, direction))
            .or_default()
            .push_back(response);
    }

    fn respond(
        &self,
        feed: Feed,
        direction: Direction,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<Item>> {
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("scripted fetch panic");
        }
        self.calls.lock().unwrap().push(ApiCall {
            feed,
            direction,
            cursor: cursor.map(String::from),
            page_size,
        });
        self.responses
            .lock()
            .unwrap()
            .get_mut(&(feed, direction))
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn fetch_newer(
        &self,
        feed: Feed,
        since_id: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<Item>> {
        self.respond(feed, Direction::Newer, since_id, page_size)
    }

    async fn fetch_older(
        &self,
        feed: Feed,
        max_id: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<Item>> {
        self.respond(feed, Direction::Older, max_id, page_size)
    }
}

pub struct FakeConnectivity {
    connected: AtomicBool,
}

impl FakeConnectivity {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn set(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for FakeConnectivity {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

pub struct FixedClock(DateTime<FixedOffset>);

impl FixedClock {
    pub fn at(rfc3339: &str) -> Self {
        Self(DateTime::parse_from_rfc3339(rfc3339).unwrap())
    }
}

impl Clock for FixedClock {
    fn next_wake(&self) -> DateTime<Utc> {
        next_wake(&self.0).with_timezone(&Utc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOp {
    Arm(DateTime<Utc>),
    Disarm,
}

#[derive(Default)]
pub struct RecordingTimer {
    ops: Mutex<Vec<TimerOp>>,
    armed: Mutex<Option<DateTime<Utc>>>,
}

impl RecordingTimer {
    pub fn ops(&self) -> Vec<TimerOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn armed(&self) -> Option<DateTime<Utc>> {
        *self.armed.lock().unwrap()
    }
}

impl WakeTimer for RecordingTimer {
    fn arm(&self, at: DateTime<Utc>) {
        self.ops.lock().unwrap().push(TimerOp::Arm(at));
        *self.armed.lock().unwrap() = Some(at);
    }

    fn disarm(&self) {
        self.ops.lock().unwrap().push(TimerOp::Disarm);
        *self.armed.lock().unwrap() = None;
    }
}

/// Refresh source that records requests and keeps the last completion sender.
#[derive(Default)]
pub struct RecordingSource {
    requests: Mutex<Vec<(Feed, FetchMode)>>,
    sender: Mutex<Option<CompletionSender>>,
}

impl RecordingSource {
    pub fn requests(&self) -> Vec<(Feed, FetchMode)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn take_sender(&self) -> Option<CompletionSender> {
        self.sender.lock().unwrap().take()
    }
}

impl RefreshSource for RecordingSource {
    fn start_fetch(&self, feed: Feed, mode: FetchMode, done: CompletionSender) {
        self.requests.lock().unwrap().push((feed, mode));
        *self.sender.lock().unwrap() = Some(done);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    ShowProgress,
    HideProgress,
    RefreshComplete,
    ShowItems(Vec<String>),
    ShowError(String),
    Reauthenticate,
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl SurfaceView for RecordingView {
    fn show_progress(&self) {
        self.record(ViewEvent::ShowProgress);
    }

    fn hide_progress(&self) {
        self.record(ViewEvent::HideProgress);
    }

    fn refresh_complete(&self) {
        self.record(ViewEvent::RefreshComplete);
    }

    fn show_items(&self, items: &ResultSet) {
        self.record(ViewEvent::ShowItems(
            items.iter().map(|i| i.id.clone()).collect(),
        ));
    }

    fn show_error(&self, message: &str) {
        self.record(ViewEvent::ShowError(message.to_string()));
    }

    fn reauthenticate(&self) {
        self.record(ViewEvent::Reauthenticate);
    }
}
