//! Console lines for batch events.

use fetchpack_core::batch::BatchEvent;
use std::sync::mpsc::Receiver;

/// A line for stdout or stderr.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Line {
    Out(String),
    Err(String),
}

pub(super) fn render(event: &BatchEvent) -> Option<Line> {
    match event {
        BatchEvent::ListRequested { source } => {
            Some(Line::Out(format!("Getting list from: {}", source)))
        }
        BatchEvent::Prepared { pending, .. } => Some(Line::Out(format!(
            "Preparing {} files to download...",
            pending
        ))),
        BatchEvent::ItemStarted {
            position,
            total,
            filename,
        } => Some(Line::Out(format!(
            "[{}/{}] Processing file: {}",
            position, total, filename
        ))),
        BatchEvent::AlreadyPresent { filename, .. } => Some(Line::Out(format!(
            "File {} already exists. Skipping download.",
            filename
        ))),
        BatchEvent::ItemFailed {
            position,
            total,
            url,
            reason,
        } => Some(Line::Err(format!(
            "[{}/{}] Error processing {}: {}",
            position, total, url, reason
        ))),
        BatchEvent::ItemCompleted { .. } | BatchEvent::ItemCancelled { .. } => None,
    }
}

/// Prints events until the batch drops its sender.
pub(super) fn print_events(rx: Receiver<BatchEvent>) {
    for event in rx {
        match render(&event) {
            Some(Line::Out(line)) => println!("{}", line),
            Some(Line::Err(line)) => eprintln!("{}", line),
            None => {}
        }
    }
}
