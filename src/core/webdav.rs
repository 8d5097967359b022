use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use reqwest::blocking::Client;
use reqwest::{Method, StatusCode, Url};
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, warn};

use crate::core::config::ConnectionSettings;
use crate::core::error::{DeleteError, PurgeError};
use crate::core::trash::{DeleteResponse, TrashItem, TrashRepository};

const DAV_NAMESPACE: &[u8] = b"DAV:";

/// Nextcloud trash bin reached over WebDAV.
///
/// Every request is blocking and carries HTTP basic credentials. Ages are
/// computed against the evaluation time captured when the repository is
/// created, so one listing yields one consistent snapshot.
pub struct WebDavTrashRepository {
    client: Client,
    base_url: Url,
    trash_url: Url,
    username: String,
    password: String,
    evaluation_time: DateTime<Utc>,
}

impl WebDavTrashRepository {
    pub fn new(connection: &ConnectionSettings) -> Result<Self, PurgeError> {
        let base_url = Url::parse(connection.base_url.trim()).map_err(|e| PurgeError::Transport {
            status: None,
            message: format!("invalid base url `{}`: {e}", connection.base_url),
        })?;
        let trash_url = trashbin_url(&base_url, &connection.username)?;
        let client = Client::builder()
            .timeout(connection.timeout)
            .build()
            .map_err(|e| PurgeError::Transport {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            trash_url,
            username: connection.username.clone(),
            password: connection.password.clone(),
            evaluation_time: Utc::now(),
        })
    }

    /// Pins the time item ages are measured against.
    pub fn with_evaluation_time(mut self, now: DateTime<Utc>) -> Self {
        self.evaluation_time = now;
        self
    }
}

/// Builds `<base>/remote.php/dav/trashbin/<username>/trash`.
///
/// The username is pushed as a path segment, so characters such as spaces
/// are percent-encoded.
pub fn trashbin_url(base_url: &Url, username: &str) -> Result<Url, PurgeError> {
    let mut url = base_url.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| PurgeError::Transport {
            status: None,
            message: format!("`{base_url}` cannot be used as a base url"),
        })?;
        segments
            .pop_if_empty()
            .extend(["remote.php", "dav", "trashbin", username, "trash"]);
    }
    Ok(url)
}

impl TrashRepository for WebDavTrashRepository {
    fn location(&self) -> String {
        self.trash_url.to_string()
    }

    fn list(&self, depth: u32) -> Result<Vec<TrashItem>, PurgeError> {
        let propfind = Method::from_bytes(b"PROPFIND").map_err(|e| PurgeError::Transport {
            status: None,
            message: e.to_string(),
        })?;

        debug!(url = %self.trash_url, depth, "PROPFIND");
        let response = self
            .client
            .request(propfind, self.trash_url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header("Depth", depth.to_string())
            .send()
            .map_err(|e| PurgeError::Transport {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| PurgeError::Transport {
            status: Some(status.as_u16()),
            message: format!("failed to read listing body: {e}"),
        })?;

        if status != StatusCode::MULTI_STATUS {
            return Err(PurgeError::Transport {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        parse_multistatus(&body, self.trash_url.path(), self.evaluation_time)
    }

    fn delete(&mut self, href: &str) -> Result<DeleteResponse, DeleteError> {
        let url = self
            .base_url
            .join(href)
            .map_err(|e| DeleteError::transport(format!("invalid href `{href}`: {e}")))?;

        debug!(%url, "DELETE");
        let response = self
            .client
            .delete(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .map_err(|e| DeleteError::transport(e.to_string()))?;

        let status_code = response.status().as_u16();
        Ok(DeleteResponse::new(status_code, body_or_reason(response.text())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Href,
    LastModified,
}

#[derive(Debug, Default)]
struct PendingResponse {
    href: String,
    last_modified: String,
}

impl PendingResponse {
    fn into_item(self, collection_path: &str, now: DateTime<Utc>) -> Option<TrashItem> {
        let href = href_path(self.href.trim());
        if href.is_empty() || same_path(&href, collection_path) {
            return None;
        }
        let last_modified = parse_http_date(self.last_modified.trim());
        Some(TrashItem::new(href.into_owned(), last_modified, now))
    }
}

/// Parses a WebDAV multistatus document into trash items.
///
/// Only `href` and `getlastmodified` in the `DAV:` namespace are read,
/// whatever prefix the server picked for it. The response describing the
/// listed collection itself is skipped, as are responses without an href.
///
/// # Arguments
/// * `body`: The PROPFIND response body.
/// * `collection_path`: Path of the listed collection (the trash bin root).
/// * `now`: Evaluation time the item ages are measured against.
pub fn parse_multistatus(
    body: &str,
    collection_path: &str,
    now: DateTime<Utc>,
) -> Result<Vec<TrashItem>, PurgeError> {
    let mut reader = NsReader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<PendingResponse> = None;
    let mut field = Field::None;

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) if is_dav(&ns) => match e.local_name().as_ref() {
                b"response" => current = Some(PendingResponse::default()),
                b"href" => field = Field::Href,
                b"getlastmodified" => field = Field::LastModified,
                _ => {}
            },
            Ok((_, Event::Text(text))) => {
                let Some(pending) = current.as_mut() else {
                    continue;
                };
                let value = text
                    .unescape()
                    .map_err(|e| PurgeError::Parse(e.to_string()))?;
                match field {
                    Field::Href => pending.href.push_str(&value),
                    Field::LastModified => pending.last_modified.push_str(&value),
                    Field::None => {}
                }
            }
            Ok((ns, Event::End(e))) if is_dav(&ns) => match e.local_name().as_ref() {
                b"response" => {
                    if let Some(item) = current
                        .take()
                        .and_then(|pending| pending.into_item(collection_path, now))
                    {
                        items.push(item);
                    }
                }
                b"href" | b"getlastmodified" => field = Field::None,
                _ => {}
            },
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                return Err(PurgeError::Parse(format!(
                    "at position {}: {e}",
                    reader.error_position()
                )));
            }
            Ok(_) => {}
        }
    }

    debug!(count = items.len(), "parsed trashbin listing");
    Ok(items)
}

/// Parses an HTTP-date such as `Mon, 15 Jan 2024 10:00:00 GMT`.
///
/// An unparsable value is logged and yields `None`, which leaves the item's
/// age unknown and keeps it out of every selection.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc2822(value) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            warn!(value, error = %e, "could not parse getlastmodified");
            None
        }
    }
}

/// The response body, or why it could not be read, so a rejected deletion
/// never reports an empty reason.
fn body_or_reason<E: fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}

fn is_dav(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == DAV_NAMESPACE)
}

/// Some servers answer with absolute URLs instead of absolute paths.
fn href_path(href: &str) -> Cow<'_, str> {
    if (href.starts_with("http://") || href.starts_with("https://"))
        && let Ok(url) = Url::parse(href)
    {
        return Cow::Owned(url.path().to_string());
    }
    Cow::Borrowed(href)
}

fn same_path(a: &str, b: &str) -> bool {
    let decode = |p: &str| {
        percent_decode_str(p.trim_end_matches('/'))
            .decode_utf8_lossy()
            .into_owned()
    };
    decode(a) == decode(b)
}
