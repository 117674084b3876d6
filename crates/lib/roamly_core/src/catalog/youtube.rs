//! YouTube Data API v3 implementation of [`VideoPlatform`].
//!
//! Collections are playlists and items are videos. Only `playlists` and
//! `playlistItems` are touched.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::PlatformError;
use super::platform::VideoPlatform;
use crate::models::{AccessCredential, NewCollection, Page, RemoteCollection};

/// Default API root.
pub const YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Largest page size the API accepts.
const MAX_RESULTS: &str = "50";

/// Error reasons that mean the daily budget (or the creation cap) is spent.
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "dailyLimitExceeded",
    "maxPlaylistExceeded",
    "playlistCreationLimitExceeded",
];

const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

pub struct YouTubeClient {
    client: Client,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PlatformError> {
        let resp = request
            .send()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "platform call failed");
        Err(classify(status, &body))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    id: String,
    snippet: Option<PlaylistSnippet>,
    content_details: Option<PlaylistContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaylistSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    item_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

impl From<PlaylistResource> for RemoteCollection {
    fn from(p: PlaylistResource) -> Self {
        let snippet = p.snippet.unwrap_or_default();
        RemoteCollection {
            id: p.id,
            title: snippet.title,
            description: snippet.description,
            item_count: p.content_details.and_then(|d| d.item_count),
        }
    }
}

async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, PlatformError> {
    let status = resp.status();
    resp.json::<T>().await.map_err(|e| PlatformError::Http {
        status: status.as_u16(),
        message: format!("response parse error: {e}"),
    })
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    async fn list_collections(
        &self,
        cred: &AccessCredential,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteCollection>, PlatformError> {
        let mut request = self
            .client
            .get(self.url("playlists"))
            .bearer_auth(&cred.access_token)
            .query(&[
                ("part", "snippet,contentDetails"),
                ("mine", "true"),
                ("maxResults", MAX_RESULTS),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let list: ListResponse<PlaylistResource> = decode(self.send(request).await?).await?;
        Ok(Page {
            items: list.items.into_iter().map(RemoteCollection::from).collect(),
            next_page_token: list.next_page_token,
        })
    }

    async fn list_items(
        &self,
        cred: &AccessCredential,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<String>, PlatformError> {
        let mut request = self
            .client
            .get(self.url("playlistItems"))
            .bearer_auth(&cred.access_token)
            .query(&[
                ("part", "contentDetails"),
                ("playlistId", collection_id),
                ("maxResults", MAX_RESULTS),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let list: ListResponse<PlaylistItemResource> = decode(self.send(request).await?).await?;
        Ok(Page {
            items: list
                .items
                .into_iter()
                .filter_map(|i| i.content_details.map(|d| d.video_id))
                .collect(),
            next_page_token: list.next_page_token,
        })
    }

    async fn create_collection(
        &self,
        cred: &AccessCredential,
        new: &NewCollection,
    ) -> Result<RemoteCollection, PlatformError> {
        let body = json!({
            "snippet": {
                "title": new.title,
                "description": new.description,
            },
            "status": {
                "privacyStatus": new.privacy.as_str(),
            },
        });
        let request = self
            .client
            .post(self.url("playlists"))
            .bearer_auth(&cred.access_token)
            .query(&[("part", "snippet,status")])
            .json(&body);

        let created: PlaylistResource = decode(self.send(request).await?).await?;
        Ok(created.into())
    }

    async fn add_item(
        &self,
        cred: &AccessCredential,
        collection_id: &str,
        item_id: &str,
    ) -> Result<(), PlatformError> {
        let body = json!({
            "snippet": {
                "playlistId": collection_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": item_id,
                },
            },
        });
        let request = self
            .client
            .post(self.url("playlistItems"))
            .bearer_auth(&cred.access_token)
            .query(&[("part", "snippet")])
            .json(&body);

        self.send(request).await?;
        Ok(())
    }

    fn collection_url(&self, collection_id: &str) -> String {
        format!("https://www.youtube.com/playlist?list={collection_id}")
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Map an error response onto the [`PlatformError`] taxonomy.
pub fn classify(status: StatusCode, body: &str) -> PlatformError {
    let (reason, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (
            env.error
                .errors
                .into_iter()
                .map(|d| d.reason)
                .find(|r| !r.is_empty())
                .unwrap_or_default(),
            env.error.message,
        ),
        Err(_) => (String::new(), body.to_string()),
    };

    if QUOTA_REASONS.contains(&reason.as_str()) {
        return PlatformError::QuotaExceeded { reason };
    }
    if RATE_LIMIT_REASONS.contains(&reason.as_str()) || status == StatusCode::TOO_MANY_REQUESTS {
        let reason = if reason.is_empty() {
            "tooManyRequests".to_string()
        } else {
            reason
        };
        return PlatformError::RateLimited { reason };
    }

    match status {
        StatusCode::UNAUTHORIZED => PlatformError::Unauthorized(message),
        StatusCode::NOT_FOUND => PlatformError::NotFound(if reason.is_empty() {
            message
        } else {
            format!("{reason}: {message}")
        }),
        s if s.is_client_error() => PlatformError::Rejected {
            status: s.as_u16(),
            reason,
            message,
        },
        s => PlatformError::Http {
            status: s.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: u16, reason: &str, message: &str) -> String {
        json!({
            "error": {
                "code": code,
                "message": message,
                "errors": [{ "domain": "youtube", "reason": reason, "message": message }],
            }
        })
        .to_string()
    }

    #[test]
    fn quota_exceeded_is_classified() {
        let err = classify(
            StatusCode::FORBIDDEN,
            &body(403, "quotaExceeded", "The request cannot be completed because you have exceeded your quota."),
        );
        assert_eq!(
            err,
            PlatformError::QuotaExceeded {
                reason: "quotaExceeded".into()
            }
        );
    }

    #[test]
    fn creation_cap_counts_as_quota() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            &body(400, "maxPlaylistExceeded", "Too many playlists."),
        );
        assert!(matches!(err, PlatformError::QuotaExceeded { .. }));
    }

    #[test]
    fn rate_limits_are_classified() {
        let err = classify(
            StatusCode::FORBIDDEN,
            &body(403, "userRateLimitExceeded", "slow down"),
        );
        assert!(matches!(err, PlatformError::RateLimited { .. }));

        let err = classify(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(
            err,
            PlatformError::RateLimited {
                reason: "tooManyRequests".into()
            }
        );
    }

    #[test]
    fn missing_playlist_is_not_found() {
        let err = classify(
            StatusCode::NOT_FOUND,
            &body(404, "playlistNotFound", "The playlist could not be found."),
        );
        assert!(matches!(err, PlatformError::NotFound(m) if m.starts_with("playlistNotFound")));
    }

    #[test]
    fn rejected_video_keeps_reason() {
        let err = classify(
            StatusCode::FORBIDDEN,
            &body(403, "forbidden", "The video is private."),
        );
        assert_eq!(
            err,
            PlatformError::Rejected {
                status: 403,
                reason: "forbidden".into(),
                message: "The video is private.".into(),
            }
        );
    }

    #[test]
    fn unauthorized_and_server_errors() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, &body(401, "authError", "Invalid Credentials")),
            PlatformError::Unauthorized(_)
        ));
        assert!(matches!(
            classify(StatusCode::SERVICE_UNAVAILABLE, "<html>oops</html>"),
            PlatformError::Http { status: 503, .. }
        ));
    }

    #[test]
    fn playlist_resource_maps_to_remote_collection() {
        let raw = r#"{
            "items": [{
                "id": "PL123",
                "snippet": { "title": "France Music 🇫🇷 | Roamly", "description": "d" },
                "contentDetails": { "itemCount": 7 }
            }],
            "nextPageToken": "CAUQAA"
        }"#;
        let list: ListResponse<PlaylistResource> = serde_json::from_str(raw).unwrap();
        assert_eq!(list.next_page_token.as_deref(), Some("CAUQAA"));
        let collection: RemoteCollection = list.items.into_iter().next().unwrap().into();
        assert_eq!(collection.id, "PL123");
        assert_eq!(collection.item_count, Some(7));
    }

    #[test]
    fn playlist_items_without_content_details_are_skipped() {
        let raw = r#"{ "items": [
            { "contentDetails": { "videoId": "v1" } },
            { }
        ] }"#;
        let list: ListResponse<PlaylistItemResource> = serde_json::from_str(raw).unwrap();
        let ids: Vec<String> = list
            .items
            .into_iter()
            .filter_map(|i| i.content_details.map(|d| d.video_id))
            .collect();
        assert_eq!(ids, vec!["v1".to_string()]);
    }
}
