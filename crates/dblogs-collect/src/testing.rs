//! In-memory control plane for tests

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio::sync::Barrier;

use dblogs_k8s::{LogReader, LogSource, PodSource};
use dblogs_types::{ContainerRef, PodDescriptor};

/// Scripted behaviour for one container log
#[derive(Clone)]
pub enum FakeLog {
    Bytes(Vec<u8>),
    OpenFails(String),

    /// Yields the bytes, then a connection reset
    BreaksAfter(Vec<u8>),

    /// Yields the bytes, then never makes progress again
    StallsAfter(Vec<u8>),

    /// Yields the chunk `count` times, pausing before each one
    Trickle(Vec<u8>, usize, Duration),

    /// Opening waits until every holder of the barrier has arrived
    Gate(Arc<Barrier>, Vec<u8>),

    Panics,
}

impl FakeLog {
    pub fn text(s: &str) -> Self {
        Self::Bytes(s.as_bytes().to_vec())
    }
}

#[derive(Default)]
pub struct FakeCluster {
    pods: Vec<PodDescriptor>,
    logs: HashMap<(String, String), FakeLog>,
    list_error: Option<String>,
    opened: Mutex<Vec<(String, String)>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pod(mut self, pod: PodDescriptor) -> Self {
        self.pods.push(pod);
        self
    }

    /// Script the log of `container` in `pod`; `""` is the default container
    pub fn with_log(mut self, pod: &str, container: &str, log: FakeLog) -> Self {
        self.logs
            .insert((pod.to_string(), container.to_string()), log);
        self
    }

    pub fn failing_list(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    /// (pod, container) pairs in the order they were opened
    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl PodSource for FakeCluster {
    async fn list_pods(
        &self,
        _namespace: &str,
        _selector: &str,
    ) -> anyhow::Result<Vec<PodDescriptor>> {
        if let Some(message) = &self.list_error {
            anyhow::bail!("{}", message);
        }
        Ok(self.pods.clone())
    }
}

#[async_trait]
impl LogSource for FakeCluster {
    async fn open_log(&self, pod: &str, container: &ContainerRef) -> anyhow::Result<LogReader> {
        self.opened
            .lock()
            .unwrap()
            .push((pod.to_string(), container.name.clone()));

        let log = self
            .logs
            .get(&(pod.to_string(), container.name.clone()))
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!("container {} not found in pod {}", container.name, pod)
            })?;

        match log {
            FakeLog::Bytes(data) => Ok(Box::pin(io::Cursor::new(data))),
            FakeLog::OpenFails(message) => anyhow::bail!("{}", message),
            FakeLog::BreaksAfter(data) => Ok(Box::pin(ScriptedReader::new(data, Tail::Reset))),
            FakeLog::StallsAfter(data) => Ok(Box::pin(ScriptedReader::new(data, Tail::Stall))),
            FakeLog::Trickle(chunk, count, pause) => {
                let (mut tx, rx) = tokio::io::duplex(chunk.len().max(1));
                tokio::spawn(async move {
                    for _ in 0..count {
                        tokio::time::sleep(pause).await;
                        if tx.write_all(&chunk).await.is_err() {
                            return;
                        }
                    }
                });
                Ok(Box::pin(rx))
            }
            FakeLog::Gate(barrier, data) => {
                barrier.wait().await;
                Ok(Box::pin(io::Cursor::new(data)))
            }
            FakeLog::Panics => panic!("log stream exploded for {}", pod),
        }
    }
}

enum Tail {
    Reset,
    Stall,
}

/// Serves a fixed prefix, then fails or stalls
struct ScriptedReader {
    data: Vec<u8>,
    pos: usize,
    tail: Tail,
}

impl ScriptedReader {
    fn new(data: Vec<u8>, tail: Tail) -> Self {
        Self { data, pos: 0, tail }
    }
}

impl AsyncRead for ScriptedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.pos < self.data.len() {
            let n = buf.remaining().min(self.data.len() - self.pos);
            let start = self.pos;
            buf.put_slice(&self.data[start..start + n]);
            self.pos += n;
            return Poll::Ready(Ok(()));
        }

        match self.tail {
            Tail::Reset => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
            Tail::Stall => Poll::Pending,
        }
    }
}
