//! Blocking Notion REST client implementing [`RemoteStore`].

use std::thread::sleep;
use std::time::Duration;

use serde_json::{json, Value};

use docsync_core::{ApiToken, PageId};
use docsync_render::{Block, MAX_BLOCKS_PER_REQUEST};

use crate::remote::{ChildKind, ChildRef, RemoteError, RemotePage, RemoteStore};

pub const DEFAULT_BASE: &str = "https://api.notion.com/v1";
pub const API_VERSION: &str = "2022-06-28";

/// Maximum children per list page.
const PAGE_SIZE: usize = 100;
const MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

pub struct NotionClient {
    agent: ureq::Agent,
    base: String,
    token: ApiToken,
    backoff: Duration,
}

impl NotionClient {
    pub fn new(token: ApiToken) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            base: DEFAULT_BASE.to_string(),
            token,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Point the client at another API root (for proxies and test servers).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Fallback wait before retrying a throttled or failed request when the
    /// server sends no `Retry-After`.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn send(&self, method: &str, path: &str, body: Option<&Value>) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.base, path);
        let mut attempt = 0;
        loop {
            let request = self
                .agent
                .request(method, &url)
                .set("Authorization", &format!("Bearer {}", self.token.expose()))
                .set("Notion-Version", API_VERSION);
            let result = match body {
                Some(body) => request.send_json(body.clone()),
                None => request.call(),
            };

            match result {
                Ok(response) => {
                    return response
                        .into_json::<Value>()
                        .map_err(|e| RemoteError::Decode(e.to_string()));
                }
                Err(ureq::Error::Status(status, response)) => {
                    if is_retryable(status) && attempt < MAX_RETRIES {
                        let wait = response
                            .header("Retry-After")
                            .and_then(|v| v.trim().parse::<u64>().ok())
                            .map(Duration::from_secs)
                            .unwrap_or(self.backoff);
                        attempt += 1;
                        tracing::warn!(status, attempt, wait_ms = wait.as_millis() as u64, path, "retrying request");
                        sleep(wait);
                        continue;
                    }
                    let body = response.into_string().unwrap_or_default();
                    return Err(classify_status(status, path, &body));
                }
                Err(ureq::Error::Transport(transport)) => {
                    if attempt < MAX_RETRIES {
                        attempt += 1;
                        tracing::warn!(attempt, error = %transport, path, "transport error; retrying");
                        sleep(self.backoff);
                        continue;
                    }
                    return Err(RemoteError::Transport(transport.to_string()));
                }
            }
        }
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Map a non-success status to a [`RemoteError`].
pub fn classify_status(status: u16, path: &str, body: &str) -> RemoteError {
    let message = error_message(body);
    match status {
        404 => RemoteError::NotFound {
            resource: path.to_string(),
        },
        401 | 403 => RemoteError::Unauthorized { message },
        _ => RemoteError::Api { status, message },
    }
}

/// The `message` field of an API error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn id_of(value: &Value) -> Result<PageId, RemoteError> {
    value
        .get("id")
        .and_then(Value::as_str)
        .map(|id| PageId::from(id.replace('-', "")))
        .ok_or_else(|| RemoteError::Decode("object without id".into()))
}

fn plain_text(rich_text: &Value) -> Option<String> {
    let parts = rich_text.as_array()?;
    Some(
        parts
            .iter()
            .filter_map(|part| part.get("plain_text").and_then(Value::as_str))
            .collect(),
    )
}

/// Parse one raw block object from a children listing.
pub fn parse_child(raw: &Value) -> Result<ChildRef, RemoteError> {
    let id = id_of(raw)?;
    let kind_name = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::Decode(format!("block {id} without type")))?;
    let body = &raw[kind_name];
    let kind = ChildKind::from_remote(kind_name);
    let (title, plain_text) = match kind {
        ChildKind::Page | ChildKind::Database => {
            (body.get("title").and_then(Value::as_str).map(str::to_string), None)
        }
        ChildKind::Content(_) => (None, body.get("rich_text").and_then(plain_text)),
    };
    Ok(ChildRef {
        id,
        kind,
        title,
        plain_text,
    })
}

/// Ids of the `count` blocks an append request created: the tail of its
/// `results`.
pub fn appended_ids(raw: &Value, count: usize) -> Result<Vec<PageId>, RemoteError> {
    let results = raw
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| RemoteError::Decode("append response without results".into()))?;
    if results.len() < count {
        return Err(RemoteError::Decode(format!(
            "append response lists {} blocks, expected {count}",
            results.len()
        )));
    }
    results[results.len() - count..].iter().map(id_of).collect()
}

/// Parse a page object; the title is the property of type `title`.
pub fn parse_page(raw: &Value) -> Result<RemotePage, RemoteError> {
    let id = id_of(raw)?;
    let title = raw
        .get("properties")
        .and_then(Value::as_object)
        .and_then(|props| {
            props
                .values()
                .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
        })
        .and_then(|p| plain_text(&p["title"]));
    Ok(RemotePage { id, title })
}

impl RemoteStore for NotionClient {
    fn retrieve_page(&self, id: &PageId) -> Result<RemotePage, RemoteError> {
        let raw = self.send("GET", &format!("/pages/{id}"), None)?;
        parse_page(&raw)
    }

    fn list_children(&self, id: &PageId) -> Result<Vec<ChildRef>, RemoteError> {
        let mut children = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut path = format!("/blocks/{id}/children?page_size={PAGE_SIZE}");
            if let Some(cursor) = &cursor {
                path.push_str(&format!("&start_cursor={cursor}"));
            }
            let raw = self.send("GET", &path, None)?;
            let results = raw
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| RemoteError::Decode("children listing without results".into()))?;
            for child in results {
                children.push(parse_child(child)?);
            }

            let more = raw.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = raw
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !more || cursor.is_none() {
                break;
            }
        }
        Ok(children)
    }

    fn create_page(&self, parent: &PageId, title: &str) -> Result<RemotePage, RemoteError> {
        let body = json!({
            "parent": { "page_id": parent.as_str() },
            "properties": {
                "title": { "title": [{ "type": "text", "text": { "content": title } }] }
            }
        });
        let raw = self.send("POST", "/pages", Some(&body))?;
        parse_page(&raw)
    }

    fn append_children(&self, id: &PageId, blocks: &[Block]) -> Result<Vec<PageId>, RemoteError> {
        let mut ids = Vec::with_capacity(blocks.len());
        for chunk in blocks.chunks(MAX_BLOCKS_PER_REQUEST) {
            let children: Vec<Value> = chunk.iter().map(Block::to_notion).collect();
            let body = json!({ "children": children });
            let raw = self.send("PATCH", &format!("/blocks/{id}/children"), Some(&body))?;
            ids.extend(appended_ids(&raw, chunk.len())?);
        }
        Ok(ids)
    }

    fn delete_block(&self, id: &PageId) -> Result<(), RemoteError> {
        self.send("DELETE", &format!("/blocks/{id}"), None)
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(404, "not_found")]
    #[case(401, "unauthorized")]
    #[case(403, "unauthorized")]
    #[case(400, "api")]
    #[case(409, "api")]
    fn status_classification(#[case] status: u16, #[case] expected: &str) {
        let err = classify_status(status, "/pages/x", r#"{"message":"nope"}"#);
        let got = match err {
            RemoteError::NotFound { .. } => "not_found",
            RemoteError::Unauthorized { .. } => "unauthorized",
            RemoteError::Api { .. } => "api",
            _ => "other",
        };
        assert_eq!(got, expected);
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message(r#"{"message":"bad"}"#), "bad");
        assert_eq!(error_message("gateway timeout\n"), "gateway timeout");
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(429));
        assert!(is_retryable(502));
        assert!(!is_retryable(400));
        assert!(!is_retryable(404));
    }

    #[test]
    fn parses_child_page_and_paragraph() {
        let page = json!({
            "id": "0123abcd-0000-0000-0000-000000000000",
            "type": "child_page",
            "child_page": { "title": "guide/setup" }
        });
        let child = parse_child(&page).unwrap();
        assert_eq!(child.kind, ChildKind::Page);
        assert_eq!(child.title.as_deref(), Some("guide/setup"));
        assert_eq!(child.id.as_str(), "0123abcd000000000000000000000000");

        let para = json!({
            "id": "b1",
            "type": "paragraph",
            "paragraph": { "rich_text": [
                { "plain_text": "md5:" },
                { "plain_text": "abc" }
            ] }
        });
        let child = parse_child(&para).unwrap();
        assert_eq!(child.kind, ChildKind::Content("paragraph".into()));
        assert_eq!(child.plain_text.as_deref(), Some("md5:abc"));
    }

    #[test]
    fn page_title_from_title_property() {
        let raw = json!({
            "id": "p1",
            "properties": {
                "Name": { "type": "title", "title": [{ "plain_text": "Docs" }] },
                "Tags": { "type": "multi_select", "multi_select": [] }
            }
        });
        let page = parse_page(&raw).unwrap();
        assert_eq!(page.title.as_deref(), Some("Docs"));
    }

    #[test]
    fn appended_ids_take_the_tail_of_results() {
        let raw = json!({ "results": [{ "id": "old" }, { "id": "n1" }, { "id": "n2" }] });
        let ids = appended_ids(&raw, 2).unwrap();
        assert_eq!(ids, vec![PageId::from("n1"), PageId::from("n2")]);
        assert!(matches!(appended_ids(&raw, 4), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn missing_id_is_decode_error() {
        assert!(matches!(
            parse_child(&json!({ "type": "paragraph" })),
            Err(RemoteError::Decode(_))
        ));
    }
}
