//! Shared harness for engine behaviour tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tether_core::impls::{InMemoryPersistence, WatchConnectivity};
use tether_core::ports::{EventSink, FixedClock};
use tether_core::typed::Hook;
use tether_core::{EngineBuilder, HookError, QueueEvent};
use tokio::sync::Semaphore;

pub const TODO_CREATE: &str = "todo.create";

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// Hook that records calls and can fail, stall, or measure overlap.
#[derive(Clone, Default)]
pub struct RecordingHook {
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
    pub fail_with: Option<&'static str>,
    pub delay: Option<Duration>,
    /// When set, each call waits for one permit before returning.
    pub gate: Option<Arc<Semaphore>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RecordingHook {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            fail_with: Some(message),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Hook for RecordingHook {
    async fn execute(&self, id: &str, payload: Value) -> Result<(), HookError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push((id.to_string(), payload));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.fail_with {
            Some(message) => Err(HookError::new(message)),
            None => Ok(()),
        }
    }
}

/// Collects every emitted event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &QueueEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct Harness {
    pub persistence: Arc<InMemoryPersistence>,
    pub connectivity: Arc<WatchConnectivity>,
    pub events: Arc<RecordingSink>,
}

impl Harness {
    pub fn online() -> Self {
        Self::with(Arc::new(InMemoryPersistence::new()), true)
    }

    pub fn offline() -> Self {
        Self::with(Arc::new(InMemoryPersistence::new()), false)
    }

    pub fn with(persistence: Arc<InMemoryPersistence>, online: bool) -> Self {
        Self {
            persistence,
            connectivity: Arc::new(WatchConnectivity::new(online)),
            events: Arc::new(RecordingSink::default()),
        }
    }

    /// Builder with the harness clock and event sink, and `hook` for TODO_CREATE.
    pub fn builder(&self, hook: RecordingHook) -> EngineBuilder {
        EngineBuilder::new()
            .clock(FixedClock::new(fixed_time()))
            .event_sink(self.events.clone())
            .register_hook(TODO_CREATE, hook)
            .unwrap()
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
