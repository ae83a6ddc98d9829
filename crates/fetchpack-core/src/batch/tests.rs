//! Batch driver tests against an in-memory fetcher.

use super::*;
use crate::fetch::FetchError;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};

/// Serves fixed bodies by URL; anything else is a 404. Counts requests per URL.
#[derive(Default)]
struct MapFetcher {
    bodies: HashMap<String, Vec<u8>>,
    hits: Mutex<HashMap<String, usize>>,
    total_hits: AtomicUsize,
}

impl MapFetcher {
    fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

impl Fetcher for MapFetcher {
    fn fetch_to_writer(
        &self,
        url: &str,
        sink: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<u64, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Aborted {
                url: url.to_string(),
            });
        }
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.total_hits.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies.get(url).ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        sink.write_all(body).map_err(|source| FetchError::Write {
            url: url.to_string(),
            source,
        })?;
        Ok(body.len() as u64)
    }
}

fn zip_with(name: &str, data: &[u8]) -> Vec<u8> {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    w.start_file(name, zip::write::SimpleFileOptions::default())
        .unwrap();
    w.write_all(data).unwrap();
    w.finish().unwrap().into_inner()
}

fn write_list(dir: &Path, urls: &[&str]) -> ListSource {
    let path = dir.join("list.txt");
    std::fs::write(&path, urls.join("\n")).unwrap();
    ListSource::Local(path)
}

const A: &str = "http://x.test/files/a.zip";
const B: &str = "http://x.test/files/b.zip";
const C: &str = "http://x.test/files/c.zip";

fn three_item_fetcher() -> MapFetcher {
    MapFetcher::default()
        .with(A, zip_with("a.txt", b"alpha"))
        .with(B, zip_with("b.txt", b"beta"))
        .with(C, zip_with("c.txt", b"gamma"))
}

#[test]
fn processes_every_item_and_lays_out_files() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let plan = BatchPlan::new(write_list(dir.path(), &[A, B, C]), &dest);
    let fetcher = three_item_fetcher();

    let summary = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.candidates(), 3);
    assert_eq!(summary.processed(), 3);
    assert_eq!(summary.failed(), 0);

    assert!(dest.join("savedFiles/0001__a.zip").is_file());
    assert!(dest.join("savedFiles/0003__c.zip").is_file());
    assert_eq!(
        std::fs::read(dest.join("extractedFiles/0002__b_zip/b.txt")).unwrap(),
        b"beta"
    );
}

#[test]
fn one_failing_download_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let missing = "http://x.test/files/missing.zip";
    let plan = BatchPlan::new(write_list(dir.path(), &[A, missing, C]), &dest);
    let fetcher = three_item_fetcher();

    let summary = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(summary.processed(), 2);
    assert_eq!(summary.failed(), 1);
    assert!(matches!(
        summary.reports[1].outcome,
        ItemOutcome::Failed(ItemError::Download(_))
    ));
    assert!(dest.join("extractedFiles/0001__a_zip/a.txt").is_file());
    assert!(dest.join("extractedFiles/0003__c_zip/c.txt").is_file());
    assert!(!dest.join("savedFiles/0002__missing.zip").exists());
    assert!(!dest.join("extractedFiles/0002__missing_zip").exists());
}

#[test]
fn extraction_failure_is_isolated_and_keeps_archive() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let bogus = "http://x.test/files/bogus.zip";
    let plan = BatchPlan::new(write_list(dir.path(), &[bogus, A]), &dest);
    let fetcher = three_item_fetcher().with(bogus, b"definitely not an archive".to_vec());

    let summary = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(summary.processed(), 1);
    assert!(matches!(
        summary.reports[0].outcome,
        ItemOutcome::Failed(ItemError::Extract(_))
    ));
    assert!(dest.join("savedFiles/0001__bogus.zip").is_file());
}

#[test]
fn rerun_reuses_staged_files_but_extracts_again() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let plan = BatchPlan::new(write_list(dir.path(), &[A, B]), &dest);
    let fetcher = three_item_fetcher();

    let first = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(first.processed(), 2);
    std::fs::remove_file(dest.join("extractedFiles/0001__a_zip/a.txt")).unwrap();

    let second = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(second.processed(), 2);
    assert_eq!(fetcher.hits(A), 1);
    assert_eq!(fetcher.hits(B), 1);
    assert!(second
        .reports
        .iter()
        .all(|r| matches!(r.outcome, ItemOutcome::Completed { reused: true })));
    assert!(dest.join("extractedFiles/0001__a_zip/a.txt").is_file());
}

#[test]
fn start_pointer_skips_leading_items() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let plan = BatchPlan::new(write_list(dir.path(), &[A, B, C]), &dest).with_start_pointer(2);
    let fetcher = three_item_fetcher();

    let summary = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(summary.candidates(), 1);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].filename, "0003__c.zip");
    assert_eq!(summary.processed(), 1);
    assert_eq!(fetcher.hits(A), 0);
}

#[test]
fn pointer_equal_to_len_processes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let plan = BatchPlan::new(write_list(dir.path(), &[A, B]), &dest).with_start_pointer(2);
    let fetcher = three_item_fetcher();

    let summary = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(summary.processed(), 0);
    assert!(summary.reports.is_empty());
    assert_eq!(fetcher.total_hits.load(Ordering::SeqCst), 0);
}

#[test]
fn pointer_beyond_len_fails_before_creating_directories() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let plan = BatchPlan::new(write_list(dir.path(), &[A, B]), &dest).with_start_pointer(3);
    let fetcher = three_item_fetcher();

    let err = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap_err();
    assert!(matches!(
        err,
        BatchError::PointerOutOfRange { pointer: 3, len: 2 }
    ));
    assert!(!dest.exists());
}

#[test]
fn unreadable_list_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let plan = BatchPlan::new(ListSource::Local(dir.path().join("absent.txt")), &dest);
    let err = run_batch(&MapFetcher::default(), &plan, &CancelToken::new(), None).unwrap_err();
    assert!(matches!(err, BatchError::List { .. }));
    assert!(!dest.exists());
}

#[test]
fn remote_list_goes_through_fetcher() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let list_url = "http://x.test/list.txt";
    let fetcher = three_item_fetcher().with(list_url, format!("{}\n\n{}\n", A, B).into_bytes());
    let plan = BatchPlan::new(ListSource::parse(list_url), &dest);

    let summary = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.processed(), 2);
    assert_eq!(fetcher.hits(list_url), 1);
}

#[test]
fn cancelled_batch_starts_no_items() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let plan = BatchPlan::new(write_list(dir.path(), &[A, B, C]), &dest);
    let fetcher = three_item_fetcher();
    let cancel = CancelToken::new();
    cancel.cancel();

    let summary = run_batch(&fetcher, &plan, &cancel, None).unwrap();
    assert_eq!(summary.processed(), 0);
    assert_eq!(summary.cancelled(), 3);
    assert!(summary.was_cancelled());
    assert_eq!(fetcher.total_hits.load(Ordering::SeqCst), 0);
}

/// Aborts the transfer of `url` mid-body and cancels the batch, as the Ctrl-C
/// handler plus curl's progress callback would.
struct CancelDuring {
    inner: MapFetcher,
    url: &'static str,
    cancel: CancelToken,
}

impl Fetcher for CancelDuring {
    fn fetch_to_writer(
        &self,
        url: &str,
        sink: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<u64, FetchError> {
        if url != self.url {
            return self.inner.fetch_to_writer(url, sink, cancel);
        }
        sink.write_all(b"PK\x03\x04 partial").unwrap();
        self.cancel.cancel();
        Err(FetchError::Aborted {
            url: url.to_string(),
        })
    }
}

#[test]
fn cancelling_mid_run_aborts_current_and_later_items() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let plan = BatchPlan::new(write_list(dir.path(), &[A, B, C]), &dest);
    let cancel = CancelToken::new();
    let fetcher = CancelDuring {
        inner: three_item_fetcher(),
        url: B,
        cancel: cancel.clone(),
    };
    let (tx, rx) = mpsc::channel();

    let summary = run_batch(&fetcher, &plan, &cancel, Some(&tx)).unwrap();
    drop(tx);

    let outcomes: Vec<_> = summary
        .reports
        .iter()
        .map(|r| match r.outcome {
            ItemOutcome::Completed { .. } => "completed",
            ItemOutcome::Failed(_) => "failed",
            ItemOutcome::Cancelled => "cancelled",
        })
        .collect();
    assert_eq!(outcomes, ["completed", "cancelled", "cancelled"]);
    assert_eq!(summary.processed(), 1);
    assert!(summary.was_cancelled());

    let staged = dest.join("savedFiles/0002__b.zip");
    assert!(!staged.exists());
    assert!(!crate::storage::temp_path(&staged).exists());
    assert!(!dest.join("extractedFiles/0002__b_zip").exists());
    assert_eq!(fetcher.inner.hits(C), 0);

    let cancelled: Vec<usize> = rx
        .iter()
        .filter_map(|e| match e {
            BatchEvent::ItemCancelled { position, .. } => Some(position),
            _ => None,
        })
        .collect();
    assert_eq!(cancelled, [2, 3]);
}

#[test]
fn parallel_run_matches_sequential_run() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let missing = "http://x.test/files/missing.zip";
    let urls = [A, missing, B, C];
    let plan = BatchPlan::new(write_list(dir.path(), &urls), &dest).with_jobs(3);
    let fetcher = three_item_fetcher();

    let summary = run_batch(&fetcher, &plan, &CancelToken::new(), None).unwrap();
    assert_eq!(summary.processed(), 3);
    assert_eq!(summary.failed(), 1);
    let indices: Vec<usize> = summary.reports.iter().map(|r| r.index).collect();
    assert_eq!(indices, [0, 1, 2, 3]);
    assert!(dest.join("extractedFiles/0004__c_zip/c.txt").is_file());
}

#[test]
fn events_follow_item_order() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let missing = "http://x.test/files/missing.zip";
    let plan = BatchPlan::new(write_list(dir.path(), &[A, missing]), &dest);
    let fetcher = three_item_fetcher();
    let (tx, rx) = mpsc::channel();

    run_batch(&fetcher, &plan, &CancelToken::new(), Some(&tx)).unwrap();
    drop(tx);
    let events: Vec<BatchEvent> = rx.into_iter().collect();

    assert!(matches!(events[0], BatchEvent::ListRequested { .. }));
    assert_eq!(
        events[1],
        BatchEvent::Prepared {
            total: 2,
            pending: 2
        }
    );
    assert_eq!(
        events[2],
        BatchEvent::ItemStarted {
            position: 1,
            total: 2,
            filename: "0001__a.zip".into()
        }
    );
    assert!(matches!(
        events[3],
        BatchEvent::ItemCompleted { position: 1, .. }
    ));
    assert!(matches!(events[4], BatchEvent::ItemStarted { position: 2, .. }));
    match &events[5] {
        BatchEvent::ItemFailed { position, url, .. } => {
            assert_eq!(*position, 2);
            assert_eq!(url, missing);
        }
        other => panic!("expected ItemFailed, got {:?}", other),
    }
    assert_eq!(events.len(), 6);
}

#[test]
fn layout_paths() {
    let layout = BatchLayout::under(Path::new("/data/run"));
    assert_eq!(layout.staging_dir, Path::new("/data/run/savedFiles"));
    assert_eq!(
        layout.staged_path("0001__report.tar.gz"),
        Path::new("/data/run/savedFiles/0001__report.tar.gz")
    );
    assert_eq!(
        layout.extraction_path("0001__report.tar.gz"),
        Path::new("/data/run/extractedFiles/0001__report_tar_gz")
    );
}
