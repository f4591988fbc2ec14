//! Instrumented in-memory container engine for orchestration tests.
//!
//! Records every call, serves canned log/exec streams derived from the
//! commands it was given, and flags any exec session opened before the prior
//! session's stream reached end-of-stream.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    task::Poll,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use soliscan::{
    errors::ScanError,
    runtime::{ContainerConfig, ContainerId, ContainerRuntime, LogStream},
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Create { image: String, command: Vec<String> },
    Start(String),
    AttachLogs(String),
    Exec { container: String, command: Vec<String> },
    Remove(String),
}

#[derive(Default)]
pub struct FakeRuntime {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicUsize,
    create_commands: Mutex<HashMap<String, Vec<String>>>,
    created: Mutex<Vec<String>>,
    /// 1-based create index that fails with `RuntimeUnavailable`.
    pub fail_create_on: Mutex<Option<usize>>,
    /// Image reference that fails creation with `ImageNotFound`.
    pub missing_image: Mutex<Option<String>>,
    /// Container id whose log attachment yields a mid-stream error.
    pub fail_logs_for: Mutex<Option<String>>,
    /// Serve non-JSON bytes from the artifact read step.
    pub garbage_artifact: AtomicBool,
    active_streams: Arc<AtomicUsize>,
    violations: Arc<Mutex<Vec<String>>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created_ids(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Create { .. })).count()
    }

    pub fn removed_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Remove(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn exec_commands(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Exec { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Panics if any exec session was opened while another stream was live.
    pub fn assert_session_exclusivity(&self) {
        let violations = self.violations.lock().unwrap();
        assert!(violations.is_empty(), "session exclusivity violated: {violations:?}");
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Stream that decrements the live-stream count exactly once, when the
    /// consumer polls past the final chunk.
    fn tracked_stream(&self, chunks: Vec<Result<Bytes, ScanError>>) -> LogStream {
        self.active_streams.fetch_add(1, Ordering::SeqCst);
        let active = Arc::clone(&self.active_streams);
        let mut finished = false;
        let tail = stream::poll_fn(move |_| {
            if !finished {
                finished = true;
                active.fetch_sub(1, Ordering::SeqCst);
            }
            Poll::Ready(None)
        });
        stream::iter(chunks).chain(tail).boxed()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create(&self, config: &ContainerConfig) -> Result<ContainerId, ScanError> {
        self.record(Call::Create { image: config.image.clone(), command: config.command.clone() });

        if let Some(missing) = self.missing_image.lock().unwrap().as_deref() {
            if config.image == missing {
                return Err(ScanError::ImageNotFound { image: config.image.clone() });
            }
        }
        let index = self.create_count();
        if *self.fail_create_on.lock().unwrap() == Some(index) {
            return Err(ScanError::RuntimeUnavailable("connection refused".into()));
        }

        let id = format!("ctr-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.create_commands.lock().unwrap().insert(id.clone(), config.command.clone());
        self.created.lock().unwrap().push(id.clone());
        Ok(ContainerId(id))
    }

    async fn start(&self, id: &ContainerId) -> Result<(), ScanError> {
        self.record(Call::Start(id.0.clone()));
        Ok(())
    }

    async fn is_running(&self, _id: &ContainerId) -> Result<bool, ScanError> {
        Ok(true)
    }

    async fn attach_logs(&self, id: &ContainerId) -> Result<LogStream, ScanError> {
        self.record(Call::AttachLogs(id.0.clone()));

        if self.fail_logs_for.lock().unwrap().as_deref() == Some(id.0.as_str()) {
            let chunks = vec![
                Ok(Bytes::from_static(b"partial output ")),
                Err(ScanError::StreamError("connection reset by peer".into())),
            ];
            return Ok(self.tracked_stream(chunks));
        }

        let command =
            self.create_commands.lock().unwrap().get(&id.0).cloned().unwrap_or_default();
        // Non-printable noise mixed in so the sanitizer has work to do.
        let text = format!("\x1b[32mAnalyzing\x1b[0m {}\nINFO:Detectors: ok\x00", command.join(" "));
        Ok(self.tracked_stream(vec![Ok(Bytes::from(text))]))
    }

    async fn exec(&self, id: &ContainerId, command: &[String]) -> Result<LogStream, ScanError> {
        if self.active_streams.load(Ordering::SeqCst) != 0 {
            self.violations
                .lock()
                .unwrap()
                .push(format!("exec {command:?} opened before the prior stream ended"));
        }
        self.record(Call::Exec { container: id.0.clone(), command: command.to_vec() });

        let chunks: Vec<Result<Bytes, ScanError>> = match command.first().map(String::as_str) {
            Some("rm") => Vec::new(),
            Some("cat") => {
                if self.garbage_artifact.load(Ordering::SeqCst) {
                    vec![Ok(Bytes::from_static(b"cat: /mnt/out.json: No such file"))]
                } else {
                    vec![Ok(Bytes::from_static(
                        br#"{"success": true, "results": {"detectors": []}}"#,
                    ))]
                }
            }
            _ => vec![
                Ok(Bytes::from_static(b"INFO:Slither: analyzed contract\n")),
                Ok(Bytes::from_static(b"2 result(s) found\x07")),
            ],
        };
        Ok(self.tracked_stream(chunks))
    }

    async fn remove(&self, id: &ContainerId) -> Result<(), ScanError> {
        self.record(Call::Remove(id.0.clone()));
        Ok(())
    }
}
