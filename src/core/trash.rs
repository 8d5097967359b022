use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

use crate::core::error::{DeleteError, PurgeError};

/// A single entry of the trash bin listing.
///
/// Items are built fresh from every listing and never mutated afterwards. The
/// age is fixed at construction time against the evaluation time handed in by
/// the repository, so selection stays deterministic for a given snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashItem {
    /// Location of the item as reported by the server, still percent-encoded.
    pub href: String,
    /// Display name: the decoded last path segment of `href`.
    pub filename: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// Whole days between `last_modified` and the evaluation time.
    /// `None` when the timestamp was missing or could not be parsed.
    pub age_in_days: Option<u64>,
}

impl TrashItem {
    /// Builds an item from its href, deriving the filename and the age.
    ///
    /// Timestamps in the future yield an age of zero rather than a negative one.
    pub fn new(
        href: impl Into<String>,
        last_modified: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let href = href.into();
        let filename = filename_from_href(&href);
        let age_in_days =
            last_modified.map(|modified| (now - modified).num_days().max(0).unsigned_abs());

        Self {
            href,
            filename,
            last_modified,
            age_in_days,
        }
    }

    /// Returns `true` when the item's age is known and at least `minimum_age` days.
    pub fn is_older_than(&self, minimum_age: u32) -> bool {
        self.age_in_days
            .is_some_and(|age| age >= u64::from(minimum_age))
    }
}

/// Derives the display filename from an href: trailing slashes (folders) are
/// dropped and the last segment is percent-decoded.
pub fn filename_from_href(href: &str) -> String {
    let segment = href
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// What the server answered to a deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResponse {
    pub status_code: u16,
    pub message: String,
}

/// How a [`DeleteResponse`] should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDisposition {
    Removed,
    /// The server no longer knows the item; the end state (absent) is reached anyway.
    AlreadyAbsent,
    Rejected,
}

impl DeleteResponse {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn disposition(&self) -> DeleteDisposition {
        match self.status_code {
            200 | 204 => DeleteDisposition::Removed,
            404 => DeleteDisposition::AlreadyAbsent,
            _ => DeleteDisposition::Rejected,
        }
    }
}

/// The remote store of soft-deleted items.
///
/// This abstraction keeps the selection and purge logic independent of the
/// transport: the WebDAV client talks to a real server, while
/// [`MemoryTrashRepository`] backs the tests and headless dry runs.
pub trait TrashRepository {
    /// Where the trash bin lives, for status output.
    fn location(&self) -> String;

    /// Lists the trash bin down to `depth` levels of subdirectories.
    fn list(&self, depth: u32) -> Result<Vec<TrashItem>, PurgeError>;

    /// Permanently removes the item at `href`.
    ///
    /// An `Ok` carries whatever status the server answered, including
    /// rejections; `Err` means no answer was obtained at all.
    fn delete(&mut self, href: &str) -> Result<DeleteResponse, DeleteError>;
}

/// In-memory trash bin.
///
/// Deleting an item removes it from the listing, so a second deletion of the
/// same href answers 404 like a real server would.
#[derive(Debug, Default)]
pub struct MemoryTrashRepository {
    items: Vec<TrashItem>,
    failures: HashMap<String, DeleteResponse>,
    unreachable: HashMap<String, String>,
    delete_calls: Vec<String>,
}

impl MemoryTrashRepository {
    pub fn new(items: Vec<TrashItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Makes deleting `href` answer with the given status instead of succeeding.
    pub fn fail_with(mut self, href: &str, status_code: u16, message: &str) -> Self {
        self.failures
            .insert(href.to_string(), DeleteResponse::new(status_code, message));
        self
    }

    /// Makes deleting `href` fail without any server answer.
    pub fn unreachable_for(mut self, href: &str, message: &str) -> Self {
        self.unreachable
            .insert(href.to_string(), message.to_string());
        self
    }

    /// Every href passed to `delete`, in call order.
    pub fn delete_calls(&self) -> &[String] {
        &self.delete_calls
    }

    /// Items still present in the trash bin.
    pub fn items(&self) -> &[TrashItem] {
        &self.items
    }
}

impl TrashRepository for MemoryTrashRepository {
    fn location(&self) -> String {
        "memory:trash".to_string()
    }

    fn list(&self, _depth: u32) -> Result<Vec<TrashItem>, PurgeError> {
        Ok(self.items.clone())
    }

    fn delete(&mut self, href: &str) -> Result<DeleteResponse, DeleteError> {
        self.delete_calls.push(href.to_string());

        if let Some(message) = self.unreachable.get(href) {
            return Err(DeleteError::transport(message.clone()));
        }
        if let Some(response) = self.failures.get(href) {
            return Ok(response.clone());
        }

        match self.items.iter().position(|item| item.href == href) {
            Some(index) => {
                self.items.remove(index);
                Ok(DeleteResponse::new(204, ""))
            }
            None => Ok(DeleteResponse::new(404, "Not Found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_filename_is_decoded_last_segment() {
        assert_eq!(
            filename_from_href("/remote.php/dav/trashbin/alice/trash/my%20notes.txt.d1700000000"),
            "my notes.txt.d1700000000"
        );
    }

    #[test]
    fn test_folder_filename_drops_trailing_slash() {
        assert_eq!(
            filename_from_href("/remote.php/dav/trashbin/alice/trash/Photos.d1700000000/"),
            "Photos.d1700000000"
        );
    }

    #[test]
    fn test_age_is_whole_days() {
        let item = TrashItem::new(
            "/trash/a",
            Some(now() - Duration::days(3) - Duration::hours(23)),
            now(),
        );
        assert_eq!(item.age_in_days, Some(3));
        assert!(item.is_older_than(3));
        assert!(!item.is_older_than(4));
    }

    #[test]
    fn test_future_timestamp_clamps_to_zero() {
        let item = TrashItem::new("/trash/a", Some(now() + Duration::days(2)), now());
        assert_eq!(item.age_in_days, Some(0));
    }

    #[test]
    fn test_missing_timestamp_has_unknown_age() {
        let item = TrashItem::new("/trash/a", None, now());
        assert_eq!(item.age_in_days, None);
        assert!(!item.is_older_than(0));
    }

    #[test]
    fn test_delete_disposition() {
        assert_eq!(
            DeleteResponse::new(204, "").disposition(),
            DeleteDisposition::Removed
        );
        assert_eq!(
            DeleteResponse::new(404, "").disposition(),
            DeleteDisposition::AlreadyAbsent
        );
        assert_eq!(
            DeleteResponse::new(423, "Locked").disposition(),
            DeleteDisposition::Rejected
        );
    }

    #[test]
    fn test_memory_repository_removes_and_then_reports_missing() {
        let item = TrashItem::new("/trash/a", None, now());
        let mut repo = MemoryTrashRepository::new(vec![item]);

        assert_eq!(repo.delete("/trash/a").unwrap().status_code, 204);
        assert!(repo.items().is_empty());
        assert_eq!(repo.delete("/trash/a").unwrap().status_code, 404);
        assert_eq!(repo.delete_calls(), ["/trash/a", "/trash/a"]);
    }
}
