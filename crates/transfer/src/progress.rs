use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use fusion_protocol::types::UploadProgress;

/// Progress value handed to an upload callback.
///
/// Single-file uploads report [`Percent`](Self::Percent); multipart uploads
/// report [`Detailed`](Self::Detailed) snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    Percent(f64),
    Detailed(UploadProgress),
}

impl ProgressUpdate {
    /// Percentage (0-100) regardless of variant.
    pub fn percentage(&self) -> f64 {
        match self {
            Self::Percent(p) => *p,
            Self::Detailed(d) => d.percentage,
        }
    }
}

/// Callback invoked with upload progress.
pub type UploadProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Folds per-part completions into one monotonic progress signal.
///
/// Shared by all part workers of one upload. Counter updates and the
/// callback run under the same lock, so callbacks never interleave and
/// each one sees counters consistent with its own update.
pub struct ProgressAggregator {
    total_bytes: u64,
    total_chunks: u32,
    callback: Option<UploadProgressCallback>,
    inner: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    uploaded_bytes: u64,
    uploaded_chunks: u32,
    done: HashSet<u32>,
}

impl ProgressAggregator {
    pub fn new(total_bytes: u64, total_chunks: u32, callback: Option<UploadProgressCallback>) -> Self {
        Self {
            total_bytes,
            total_chunks,
            callback,
            inner: Mutex::new(Counters::default()),
        }
    }

    /// Counts part `part_number` (of `bytes` bytes) as done and notifies the
    /// callback.
    ///
    /// A part is counted at most once; repeats return `None` and do not
    /// notify.
    pub fn record_part_done(&self, part_number: u32, bytes: u64) -> Option<UploadProgress> {
        let mut counters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !counters.done.insert(part_number) {
            return None;
        }
        counters.uploaded_bytes = counters
            .uploaded_bytes
            .saturating_add(bytes)
            .min(self.total_bytes);
        counters.uploaded_chunks = (counters.uploaded_chunks + 1).min(self.total_chunks);

        let snapshot = UploadProgress::new(
            counters.uploaded_bytes,
            self.total_bytes,
            counters.uploaded_chunks,
            self.total_chunks,
        );
        if let Some(cb) = &self.callback {
            cb(ProgressUpdate::Detailed(snapshot.clone()));
        }
        Some(snapshot)
    }

    /// Current progress without notifying.
    pub fn snapshot(&self) -> UploadProgress {
        let counters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        UploadProgress::new(
            counters.uploaded_bytes,
            self.total_bytes,
            counters.uploaded_chunks,
            self.total_chunks,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collecting() -> (UploadProgressCallback, Arc<Mutex<Vec<ProgressUpdate>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: UploadProgressCallback = Arc::new(move |u| sink.lock().unwrap().push(u));
        (cb, seen)
    }

    #[test]
    fn counts_each_part_once() {
        let (cb, seen) = collecting();
        let agg = ProgressAggregator::new(12, 3, Some(cb));

        let first = agg.record_part_done(2, 5).unwrap();
        assert_eq!(first.uploaded_bytes, 5);
        assert_eq!(first.uploaded_chunks, 1);

        // Duplicate completion is ignored.
        assert!(agg.record_part_done(2, 5).is_none());

        agg.record_part_done(3, 2).unwrap();
        let last = agg.record_part_done(1, 5).unwrap();
        assert_eq!(last.uploaded_bytes, 12);
        assert_eq!(last.percentage, 100.0);
        assert!(last.is_complete());

        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn never_exceeds_total() {
        let agg = ProgressAggregator::new(10, 2, None);
        agg.record_part_done(1, 8);
        let p = agg.record_part_done(2, 8).unwrap();
        assert_eq!(p.uploaded_bytes, 10);
        assert_eq!(p.percentage, 100.0);
    }

    #[test]
    fn snapshot_does_not_notify() {
        let (cb, seen) = collecting();
        let agg = ProgressAggregator::new(10, 2, Some(cb));
        assert_eq!(agg.snapshot().uploaded_bytes, 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn concurrent_updates_are_monotonic() {
        use std::thread;

        let (cb, seen) = collecting();
        let parts = 64u32;
        let agg = Arc::new(ProgressAggregator::new(parts as u64 * 10, parts, Some(cb)));

        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    for n in (t * 8 + 1)..=(t * 8 + 8) {
                        agg.record_part_done(n, 10);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), parts as usize);
        let mut last_bytes = 0;
        let mut last_pct = 0.0;
        for update in seen.iter() {
            let ProgressUpdate::Detailed(p) = update else {
                panic!("multipart progress must be detailed");
            };
            assert!(p.uploaded_bytes >= last_bytes);
            assert!(p.percentage >= last_pct);
            assert!(p.uploaded_bytes <= p.total_bytes);
            last_bytes = p.uploaded_bytes;
            last_pct = p.percentage;
        }
        assert_eq!(last_bytes, parts as u64 * 10);
    }

    #[test]
    fn percent_variant_percentage() {
        assert_eq!(ProgressUpdate::Percent(50.0).percentage(), 50.0);
        let detailed = ProgressUpdate::Detailed(UploadProgress::new(1, 4, 1, 4));
        assert_eq!(detailed.percentage(), 25.0);
    }
}
