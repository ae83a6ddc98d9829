//! Bounded worker pool for `jobs > 1`.
//!
//! Workers pull item indices from a shared queue in list order and send their
//! reports back over a channel; the reports are sorted by index after the join.
//! Items write disjoint paths, so the queue and channel are the only shared state.

use std::collections::VecDeque;
use std::sync::{mpsc, Mutex, PoisonError};

use super::outcome::ItemReport;
use super::{process_item, ItemContext};

pub(super) fn run_pool(
    ctx: &ItemContext<'_>,
    items: &[String],
    start: usize,
    jobs: usize,
) -> Vec<ItemReport> {
    let count = items.len().saturating_sub(start);
    if count == 0 {
        return Vec::new();
    }
    let work: Mutex<VecDeque<usize>> = Mutex::new((start..items.len()).collect());
    let (tx, rx) = mpsc::channel();
    let num_workers = jobs.max(1).min(count);
    tracing::debug!(workers = num_workers, items = count, "starting worker pool");

    std::thread::scope(|s| {
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            s.spawn(move || loop {
                let next = work
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some(index) = next else {
                    break;
                };
                if tx.send(process_item(ctx, index, &items[index])).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut reports: Vec<ItemReport> = rx.into_iter().collect();
    reports.sort_by_key(|r| r.index);
    reports
}
