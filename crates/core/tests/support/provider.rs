//! Scriptable provider SDK fake.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use roomlink_core::{ProviderClient, ProviderSdk};
use roomlink_domain::{ContainerId, JoinConfig, ProviderError};
use tokio::time::Instant;

/// Counts of every provider call, shared by all clients of one fake.
#[derive(Default)]
pub struct ProviderCalls {
    pub create: AtomicU32,
    pub init: AtomicU32,
    pub join: AtomicU32,
    pub leave: AtomicU32,
    pub destroy: AtomicU32,
    /// Signature used by each join, in order
    pub join_signatures: Mutex<Vec<String>>,
    /// Meeting number forwarded by each join
    pub join_meetings: Mutex<Vec<String>>,
    pub join_times: Mutex<Vec<Instant>>,
}

impl ProviderCalls {
    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> u32 {
        Self::count(&self.init)
    }

    pub fn joins(&self) -> u32 {
        Self::count(&self.join)
    }

    pub fn leaves(&self) -> u32 {
        Self::count(&self.leave)
    }

    pub fn destroys(&self) -> u32 {
        Self::count(&self.destroy)
    }
}

type JoinScript = Arc<Mutex<VecDeque<Result<(), ProviderError>>>>;

/// Provider whose join results are queued up front; an empty queue joins.
pub struct FakeProvider {
    calls: Arc<ProviderCalls>,
    join_script: JoinScript,
    init_delay: Duration,
    init_error: Option<ProviderError>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(ProviderCalls::default()),
            join_script: Arc::new(Mutex::new(VecDeque::new())),
            init_delay: Duration::ZERO,
            init_error: None,
        }
    }

    pub fn calls(&self) -> Arc<ProviderCalls> {
        Arc::clone(&self.calls)
    }

    pub fn with_join_results(self, results: Vec<Result<(), ProviderError>>) -> Self {
        self.join_script.lock().extend(results);
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn with_init_error(mut self, error: ProviderError) -> Self {
        self.init_error = Some(error);
        self
    }
}

#[async_trait]
impl ProviderSdk for FakeProvider {
    async fn create_client(&self) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeClient {
            calls: Arc::clone(&self.calls),
            join_script: Arc::clone(&self.join_script),
            init_delay: self.init_delay,
            init_error: self.init_error.clone(),
        }))
    }
}

struct FakeClient {
    calls: Arc<ProviderCalls>,
    join_script: JoinScript,
    init_delay: Duration,
    init_error: Option<ProviderError>,
}

#[async_trait]
impl ProviderClient for FakeClient {
    async fn init(&self, _container: &ContainerId) -> Result<(), ProviderError> {
        self.calls.init.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.init_delay).await;
        self.init_error.clone().map_or(Ok(()), Err)
    }

    async fn join(&self, config: &JoinConfig) -> Result<(), ProviderError> {
        self.calls.join.fetch_add(1, Ordering::SeqCst);
        self.calls.join_signatures.lock().push(config.credentials.signature.clone());
        self.calls.join_meetings.lock().push(config.meeting_number.to_string());
        self.calls.join_times.lock().push(Instant::now());
        self.join_script.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn leave(&self) -> Result<(), ProviderError> {
        self.calls.leave.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        self.calls.destroy.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
