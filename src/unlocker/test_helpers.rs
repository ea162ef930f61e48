//! Shared test fixtures: mock engine backend, in-memory sink, recording observer

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Config, EngineConfig};
use crate::delivery::{Artifact, ArtifactSink};
use crate::engine::DecryptBackend;
use crate::error::{Error, Result};
use crate::types::{Event, FileSource, InputFile, Status, StatusObserver};
use crate::unlocker::BatchUnlocker;

/// Marker in staged content that makes the mock decrypt call fail
pub(crate) const BROKEN_MARKER: &[u8] = b"BROKEN";

/// How the mock backend's initialize behaves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InitBehavior {
    Succeed,
    Unavailable,
    PolicyBlocked,
}

/// Observable call history of the mock backend
#[derive(Default)]
pub(crate) struct BackendState {
    pub(crate) staging: HashMap<String, Vec<u8>>,
    pub(crate) staged_writes: Vec<String>,
    pub(crate) decrypt_calls: Vec<(String, String)>,
    pub(crate) removed: Vec<String>,
    pub(crate) init_calls: usize,
}

/// Scriptable in-memory engine backend
///
/// Decrypt output is the staged input with " UNLOCKED" appended; staging an
/// input containing [`BROKEN_MARKER`] makes the decrypt call fail instead.
pub(crate) struct MockBackend {
    pub(crate) state: Mutex<BackendState>,
    init_behavior: Mutex<InitBehavior>,
    fail_remove: AtomicBool,
    /// When set, each decrypt call consumes one permit (test-controlled pacing)
    decrypt_release: Mutex<Option<Arc<tokio::sync::Semaphore>>>,
    decrypt_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BackendState::default()),
            init_behavior: Mutex::new(InitBehavior::Succeed),
            fail_remove: AtomicBool::new(false),
            decrypt_release: Mutex::new(None),
            decrypt_delay: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_init_behavior(&self, behavior: InitBehavior) {
        *self.init_behavior.lock().unwrap() = behavior;
    }

    pub(crate) fn set_fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_decrypt_release(&self, gate: Arc<tokio::sync::Semaphore>) {
        *self.decrypt_release.lock().unwrap() = Some(gate);
    }

    pub(crate) fn set_decrypt_delay(&self, delay: Duration) {
        *self.decrypt_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.state.lock().unwrap().init_calls
    }

    pub(crate) fn decrypt_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().decrypt_calls.clone()
    }

    pub(crate) fn removed(&self) -> Vec<String> {
        self.state.lock().unwrap().removed.clone()
    }
}

#[async_trait]
impl DecryptBackend for MockBackend {
    async fn initialize(&self, _config: &EngineConfig) -> Result<()> {
        self.state.lock().unwrap().init_calls += 1;
        match *self.init_behavior.lock().unwrap() {
            InitBehavior::Succeed => Ok(()),
            InitBehavior::Unavailable => {
                Err(Error::EngineUnavailable("mock asset fetch failed".into()))
            }
            InitBehavior::PolicyBlocked => {
                Err(Error::EnginePolicyBlocked("mock policy".into()))
            }
        }
    }

    async fn stage_write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.staged_writes.push(name.to_string());
        state.staging.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn decrypt(&self, input_name: &str, output_name: &str) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let gate = self.decrypt_release.lock().unwrap().clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| Error::Staging("pacing gate closed".into()))?;
            permit.forget();
        }
        let delay = *self.decrypt_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut state = self.state.lock().unwrap();
            state
                .decrypt_calls
                .push((input_name.to_string(), output_name.to_string()));
            match state.staging.get(input_name).cloned() {
                Some(bytes)
                    if bytes
                        .windows(BROKEN_MARKER.len())
                        .any(|w| w == BROKEN_MARKER) =>
                {
                    Err(Error::Staging("mock decrypt failure".into()))
                }
                Some(mut bytes) => {
                    bytes.extend_from_slice(b" UNLOCKED");
                    state.staging.insert(output_name.to_string(), bytes);
                    Ok(())
                }
                None => Err(Error::Staging("input not staged".into())),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn stage_read(&self, name: &str) -> Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .staging
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Staging(format!("no staged entry {name}")))
    }

    async fn stage_remove(&self, name: &str) -> Result<()> {
        self.state.lock().unwrap().removed.push(name.to_string());
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(Error::Staging("mock unlink failure".into()));
        }
        self.state.lock().unwrap().staging.remove(name);
        Ok(())
    }
}

/// Sink that collects delivered artifacts in memory
#[derive(Default)]
pub(crate) struct MemorySink {
    pub(crate) delivered: Mutex<Vec<Artifact>>,
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn deliver(&self, artifact: Artifact) -> Result<()> {
        self.delivered.lock().unwrap().push(artifact);
        Ok(())
    }
}

/// Observer recording every status triple
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub(crate) updates: Mutex<Vec<(Status, String, String)>>,
}

impl StatusObserver for RecordingObserver {
    fn on_status(&self, state: Status, main_text: &str, sub_text: &str) {
        self.updates
            .lock()
            .unwrap()
            .push((state, main_text.to_string(), sub_text.to_string()));
    }
}

/// Source with a declared length independent of its actual content
///
/// Lets tests exercise the declared-size limit without allocating the bytes.
pub(crate) struct DeclaredLenSource(pub(crate) Vec<u8>);

#[async_trait]
impl FileSource for DeclaredLenSource {
    async fn read(&self) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

pub(crate) fn pdf_bytes(tag: &str) -> Vec<u8> {
    format!("%PDF-1.7 {tag}").into_bytes()
}

pub(crate) fn pdf_file(name: &str) -> InputFile {
    InputFile::from_bytes(name, "application/pdf", pdf_bytes(name))
}

/// A PDF-typed file whose declared length differs from its readable content
pub(crate) fn pdf_file_with_len(name: &str, declared_len: u64) -> InputFile {
    InputFile::new(
        name,
        "application/pdf",
        declared_len,
        Arc::new(DeclaredLenSource(pdf_bytes(name))),
    )
}

/// Everything a test needs to drive and observe one orchestrator
pub(crate) struct TestHarness {
    pub(crate) unlocker: BatchUnlocker,
    pub(crate) backend: Arc<MockBackend>,
    pub(crate) sink: Arc<MemorySink>,
    pub(crate) observer: Arc<RecordingObserver>,
}

pub(crate) fn create_test_unlocker() -> TestHarness {
    create_test_unlocker_with(Config::default())
}

pub(crate) fn create_test_unlocker_with(config: Config) -> TestHarness {
    let backend = MockBackend::new();
    let sink = Arc::new(MemorySink::default());
    let observer = Arc::new(RecordingObserver::default());
    let unlocker = BatchUnlocker::new(config, backend.clone())
        .with_sink(sink.clone())
        .with_observer(observer.clone());
    TestHarness {
        unlocker,
        backend,
        sink,
        observer,
    }
}

/// Await the next `BatchComplete` on an event stream, with a timeout
pub(crate) async fn wait_for_batch_complete(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
) -> (usize, usize) {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for BatchComplete")
            .expect("event channel closed");
        if let Event::BatchComplete { succeeded, failed } = event {
            return (succeeded, failed);
        }
    }
}

/// Await a specific event matching the predicate, with a timeout
pub(crate) async fn wait_for_event(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    mut predicate: impl FnMut(&Event) -> bool,
) -> Event {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if predicate(&event) {
            return event;
        }
    }
}
