use crate::TransferError;
use crate::chunked::{PartRange, plan_parts, total_parts};

/// Upload state of a single part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartStatus {
    Pending,
    Uploading,
    Done,
    Failed,
}

/// One part of a multipart upload and its attempt history.
///
/// `Pending -> Uploading -> {Done | Failed}`; a failed part may go back
/// to `Uploading` for another attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPart {
    range: PartRange,
    status: PartStatus,
    etag: Option<String>,
    attempts: u32,
}

impl UploadPart {
    pub fn new(range: PartRange) -> Self {
        Self {
            range,
            status: PartStatus::Pending,
            etag: None,
            attempts: 0,
        }
    }

    pub fn part_number(&self) -> u32 {
        self.range.part_number
    }

    pub fn range(&self) -> PartRange {
        self.range
    }

    /// Size of the part in bytes.
    pub fn len(&self) -> u64 {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn status(&self) -> PartStatus {
        self.status
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Number of upload attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Starts an attempt: `Pending | Failed -> Uploading`.
    pub fn begin_attempt(&mut self) -> Result<(), TransferError> {
        match self.status {
            PartStatus::Pending | PartStatus::Failed => {
                self.status = PartStatus::Uploading;
                self.attempts += 1;
                Ok(())
            }
            from => Err(self.invalid(from, PartStatus::Uploading)),
        }
    }

    /// Records a successful attempt: `Uploading -> Done`.
    pub fn mark_done(&mut self, etag: String) -> Result<CompletedPart, TransferError> {
        if self.status != PartStatus::Uploading {
            return Err(self.invalid(self.status, PartStatus::Done));
        }
        self.status = PartStatus::Done;
        self.etag = Some(etag.clone());
        Ok(CompletedPart {
            part_number: self.range.part_number,
            etag,
        })
    }

    /// Records a failed attempt: `Uploading -> Failed`.
    pub fn mark_failed(&mut self) -> Result<(), TransferError> {
        if self.status != PartStatus::Uploading {
            return Err(self.invalid(self.status, PartStatus::Failed));
        }
        self.status = PartStatus::Failed;
        Ok(())
    }

    fn invalid(&self, from: PartStatus, to: PartStatus) -> TransferError {
        TransferError::InvalidTransition {
            part_number: self.range.part_number,
            from,
            to,
        }
    }
}

/// A finished part, ready for the complete call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// Server-side multipart session.
///
/// `part_size` comes from the server; `total_parts` is always
/// `ceil(total_size / part_size)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    upload_id: String,
    storage_key: String,
    part_size: u64,
    total_size: u64,
    total_parts: u32,
}

impl UploadSession {
    pub fn new(
        upload_id: String,
        storage_key: String,
        part_size: u64,
        total_size: u64,
    ) -> Result<Self, TransferError> {
        let total_parts = total_parts(total_size, part_size)?;
        Ok(Self {
            upload_id,
            storage_key,
            part_size,
            total_size,
            total_parts,
        })
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn total_parts(&self) -> u32 {
        self.total_parts
    }

    /// Part numbers `1..=total_parts`.
    pub fn part_numbers(&self) -> Vec<u32> {
        (1..=self.total_parts).collect()
    }

    /// All parts in `Pending` state, ordered by part number.
    pub fn plan(&self) -> Result<Vec<UploadPart>, TransferError> {
        Ok(plan_parts(self.total_size, self.part_size)?
            .into_iter()
            .map(UploadPart::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part() -> UploadPart {
        UploadPart::new(PartRange {
            part_number: 2,
            start: 5,
            end: 10,
        })
    }

    #[test]
    fn happy_path_transitions() {
        let mut p = part();
        assert_eq!(p.status(), PartStatus::Pending);
        p.begin_attempt().unwrap();
        assert_eq!(p.status(), PartStatus::Uploading);
        let done = p.mark_done("etag-2".into()).unwrap();
        assert_eq!(done, CompletedPart { part_number: 2, etag: "etag-2".into() });
        assert_eq!(p.status(), PartStatus::Done);
        assert_eq!(p.etag(), Some("etag-2"));
        assert_eq!(p.attempts(), 1);
    }

    #[test]
    fn failed_part_can_retry() {
        let mut p = part();
        p.begin_attempt().unwrap();
        p.mark_failed().unwrap();
        assert_eq!(p.status(), PartStatus::Failed);
        p.begin_attempt().unwrap();
        p.mark_done("e".into()).unwrap();
        assert_eq!(p.attempts(), 2);
    }

    #[test]
    fn rejects_invalid_transitions() {
        let mut p = part();
        assert!(matches!(
            p.mark_done("e".into()),
            Err(TransferError::InvalidTransition { from: PartStatus::Pending, .. })
        ));
        assert!(p.mark_failed().is_err());

        p.begin_attempt().unwrap();
        assert!(p.begin_attempt().is_err());
        p.mark_done("e".into()).unwrap();
        assert!(p.begin_attempt().is_err());
        assert!(p.mark_failed().is_err());
    }

    #[test]
    fn session_plans_all_parts() {
        let mib = 1024 * 1024;
        let session = UploadSession::new("u1".into(), "k".into(), 5 * mib, 12 * mib).unwrap();
        assert_eq!(session.total_parts(), 3);
        assert_eq!(session.part_numbers(), vec![1, 2, 3]);
        let parts = session.plan().unwrap();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.status() == PartStatus::Pending));
        assert_eq!(parts[2].len(), 2 * mib);
    }

    #[test]
    fn session_rejects_zero_part_size() {
        assert!(UploadSession::new("u".into(), "k".into(), 0, 10).is_err());
    }

    #[test]
    fn completed_parts_sort_by_number() {
        let mut parts = vec![
            CompletedPart { part_number: 3, etag: "c".into() },
            CompletedPart { part_number: 1, etag: "a".into() },
            CompletedPart { part_number: 2, etag: "b".into() },
        ];
        parts.sort();
        let numbers: Vec<_> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
