//! Result aggregation

use std::fmt::Write;

use tracing::{info, warn};

use dblogs_types::{CollectionReport, CollectionSummary};

/// Every stream succeeded
pub const EXIT_SUCCESS: u8 = 0;

/// The run finished but at least one container or pod failed
pub const EXIT_PARTIAL: u8 = 2;

/// Log one line per pod and one warning per failed container
pub fn log_report(report: &CollectionReport) {
    for pod in &report.pods {
        info!(
            pod = %pod.pod,
            streams = pod.results.len(),
            bytes = pod.bytes_written(),
            "wrote {:>10} bytes for {}",
            pod.bytes_written(),
            pod.pod
        );

        for failed in pod.failures() {
            if let Some(error) = &failed.error {
                warn!(
                    pod = %failed.pod,
                    container = %failed.container,
                    path = %failed.path.display(),
                    bytes = failed.bytes_written,
                    "could not collect log: {}",
                    error
                );
            }
        }

        if let Some(panic) = &pod.panic {
            warn!(pod = %pod.pod, "log worker did not finish: {}", panic);
        }
    }

    info!(
        namespace = %report.namespace,
        pods = report.pods.len(),
        streams = report.stream_count(),
        failed = report.failed_streams(),
        bytes = report.total_bytes(),
        "log collection finished"
    );
}

pub fn exit_code(report: &CollectionReport) -> u8 {
    if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_PARTIAL
    }
}

/// Human readable summary, one line per pod plus totals
pub fn render_text(summary: &CollectionSummary) -> String {
    let mut out = String::new();

    for pod in &summary.pods {
        let status = if pod.panic.is_some() || pod.streams.iter().any(|s| s.error.is_some()) {
            "FAILED"
        } else {
            "ok"
        };
        let _ = writeln!(out, "{:<40} {:>12} bytes  {}", pod.pod, pod.bytes_written, status);

        for stream in pod.streams.iter().filter(|s| s.error.is_some()) {
            let _ = writeln!(
                out,
                "  {:<38} {}",
                stream.container,
                stream.error.as_deref().unwrap_or_default()
            );
        }
        if let Some(panic) = &pod.panic {
            let _ = writeln!(out, "  {:<38} {}", "<worker>", panic);
        }
    }

    let _ = writeln!(
        out,
        "{} pods, {} bytes written to {} ({} failed streams) in {}ms",
        summary.pods.len(),
        summary.total_bytes,
        summary.root.display(),
        summary.failed_streams,
        summary.elapsed_ms
    );

    out
}
