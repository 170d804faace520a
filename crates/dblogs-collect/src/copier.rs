//! Single container log to file copy

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use dblogs_k8s::{LogReader, LogSource};
use dblogs_types::{StreamError, StreamResult, StreamTarget};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Streams single container logs into files
pub struct StreamCopier {
    source: Arc<dyn LogSource>,

    /// Longest wait for the stream to open or for the next chunk; `None` waits forever
    idle_timeout: Option<Duration>,
}

impl StreamCopier {
    pub fn new(source: Arc<dyn LogSource>, idle_timeout: Option<Duration>) -> Self {
        Self {
            source,
            idle_timeout,
        }
    }

    /// Copy the log of `target` in `pod` to `target.path`.
    ///
    /// Never fails: every outcome, including a partial copy, ends up in the
    /// returned result. Partial files are left on disk. A stream that keeps
    /// delivering bytes is never cut short, however long it takes.
    pub async fn copy(&self, pod: &str, target: &StreamTarget) -> StreamResult {
        let mut written = 0u64;

        match self.transfer(pod, target, &mut written).await {
            Ok(()) => {
                debug!(
                    pod,
                    container = %target.label,
                    path = %target.path.display(),
                    bytes = written,
                    "log copied"
                );
                StreamResult::success(target, pod, written)
            }
            Err(e) => StreamResult::failure(target, pod, written, e),
        }
    }

    async fn transfer(
        &self,
        pod: &str,
        target: &StreamTarget,
        written: &mut u64,
    ) -> Result<(), StreamError> {
        let mut stream = within(self.idle_timeout, self.source.open_log(pod, &target.container))
            .await?
            .map_err(StreamError::Open)?;

        let mut file = File::create(&target.path)
            .await
            .map_err(StreamError::FileCreate)?;

        // Flush even after a failed copy so the partial file is complete on disk
        let copied = copy_body(&mut stream, &mut file, self.idle_timeout, written).await;
        let flushed = file.flush().await.map_err(StreamError::Copy);
        copied.and(flushed)
    }
}

/// Await `fut`, giving up after `limit` of silence
async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output, StreamError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StreamError::Timeout(limit)),
        None => Ok(fut.await),
    }
}

async fn copy_body(
    stream: &mut LogReader,
    file: &mut File,
    idle_timeout: Option<Duration>,
    written: &mut u64,
) -> Result<(), StreamError> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let n = within(idle_timeout, stream.read(&mut buf))
            .await?
            .map_err(StreamError::Copy)?;
        if n == 0 {
            return Ok(());
        }
        file.write_all(&buf[..n]).await.map_err(StreamError::Copy)?;
        *written += n as u64;
    }
}
