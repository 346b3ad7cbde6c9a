//! Reddit implementation of [`SocialClient`].
//!
//! OAuth2 password-grant script app over `reqwest`. Token fetching is lazy
//! and cached; every API call classifies its failure so the retry layer can
//! tell a rate limit from a revoked credential.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Comment, InboxItem, InboxKind, PlatformError, Post, SocialClient};
use crate::models::AccountMetrics;

const AUTH_BASE: &str = "https://www.reddit.com";
const API_BASE: &str = "https://oauth.reddit.com";

/// Script-app credentials.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Reddit API client.
pub struct RedditClient {
    http: reqwest::Client,
    credentials: RedditCredentials,
    auth_base: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .gzip(true)
            .build()
            .map_err(|e| PlatformError::Protocol(e.to_string()))?;
        Ok(Self {
            http,
            credentials,
            auth_base: AUTH_BASE.to_string(),
            api_base: API_BASE.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Point both the auth and API endpoints at `base_url` (mock servers).
    pub fn with_base_url(
        credentials: RedditCredentials,
        base_url: &str,
    ) -> Result<Self, PlatformError> {
        let mut client = Self::new(credentials)?;
        client.auth_base = base_url.to_string();
        client.api_base = base_url.to_string();
        Ok(client)
    }

    fn classify_status(status: StatusCode) -> PlatformError {
        match status.as_u16() {
            429 | 500..=599 => PlatformError::Transient(format!("status {status}")),
            401 | 403 => PlatformError::Auth(format!("status {status}")),
            404 => PlatformError::NotFound(format!("status {status}")),
            _ => PlatformError::Protocol(format!("status {status}")),
        }
    }

    fn classify_request_error(e: reqwest::Error) -> PlatformError {
        if e.is_timeout() || e.is_connect() {
            PlatformError::Transient(e.to_string())
        } else {
            PlatformError::Protocol(e.to_string())
        }
    }

    async fn access_token(&self) -> Result<String, PlatformError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(token.access_token.clone());
            }
        }

        debug!("requesting new access token");
        let response = self
            .http
            .post(format!("{}/api/v1/access_token", self.auth_base))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", &self.credentials.username),
                ("password", &self.credentials.password),
            ])
            .send()
            .await
            .map_err(Self::classify_request_error)?;

        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Protocol(e.to_string()))?;
        let access_token = json["access_token"]
            .as_str()
            .ok_or_else(|| PlatformError::Auth("no access_token in response".to_string()))?
            .to_string();
        let expires_in = json["expires_in"].as_i64().unwrap_or(3600);

        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        });
        Ok(access_token)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, PlatformError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(Self::classify_request_error)?;
        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| PlatformError::Protocol(e.to_string()))
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Value, PlatformError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .form(form)
            .send()
            .await
            .map_err(Self::classify_request_error)?;
        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| PlatformError::Protocol(e.to_string()))
    }

    fn timestamp(value: &Value) -> DateTime<Utc> {
        let secs = value.as_f64().unwrap_or(0.0) as i64;
        Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
    }

    fn parse_post(data: &Value) -> Result<Post, PlatformError> {
        Ok(Post {
            id: json_str(data, "id")?,
            title: data["title"].as_str().unwrap_or_default().to_string(),
            body: data["selftext"].as_str().unwrap_or_default().to_string(),
            author: data["author"].as_str().unwrap_or_default().to_string(),
            url: data["permalink"].as_str().unwrap_or_default().to_string(),
        })
    }

    fn parse_comment(data: &Value) -> Result<Comment, PlatformError> {
        // A deleted author serializes as the literal "[deleted]".
        let author = data["author"]
            .as_str()
            .filter(|a| !a.is_empty() && *a != "[deleted]")
            .map(str::to_string);
        Ok(Comment {
            id: json_str(data, "id")?,
            author,
            body: data["body"].as_str().unwrap_or_default().to_string(),
            created_at: Self::timestamp(&data["created_utc"]),
            parent_id: data["parent_id"].as_str().unwrap_or_default().to_string(),
            post_id: data["link_id"]
                .as_str()
                .unwrap_or_default()
                .trim_start_matches("t3_")
                .to_string(),
        })
    }
}

fn json_str(data: &Value, field: &str) -> Result<String, PlatformError> {
    data[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PlatformError::Protocol(format!("missing field {field}")))
}

#[async_trait]
impl SocialClient for RedditClient {
    async fn get_post(&self, post_id: &str) -> Result<Post, PlatformError> {
        let json = self
            .get_json("/api/info", &[("id", format!("t3_{post_id}"))])
            .await?;
        let child = json["data"]["children"]
            .get(0)
            .ok_or_else(|| PlatformError::NotFound(format!("post {post_id}")))?;
        Self::parse_post(&child["data"])
    }

    async fn get_comment(&self, comment_id: &str) -> Result<Comment, PlatformError> {
        let json = self
            .get_json("/api/info", &[("id", format!("t1_{comment_id}"))])
            .await?;
        let child = json["data"]["children"]
            .get(0)
            .ok_or_else(|| PlatformError::NotFound(format!("comment {comment_id}")))?;
        Self::parse_comment(&child["data"])
    }

    async fn post_comment(
        &self,
        parent_fullname: &str,
        body: &str,
    ) -> Result<Comment, PlatformError> {
        let json = self
            .post_form(
                "/api/comment",
                &[
                    ("api_type", "json"),
                    ("thing_id", parent_fullname),
                    ("text", body),
                ],
            )
            .await?;
        let thing = json["json"]["data"]["things"]
            .get(0)
            .ok_or_else(|| PlatformError::Protocol("no comment in response".to_string()))?;
        Self::parse_comment(&thing["data"])
    }

    async fn edit_comment(&self, comment_id: &str, body: &str) -> Result<(), PlatformError> {
        let fullname = format!("t1_{comment_id}");
        self.post_form(
            "/api/editusertext",
            &[("api_type", "json"), ("thing_id", &fullname), ("text", body)],
        )
        .await?;
        Ok(())
    }

    async fn send_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), PlatformError> {
        self.post_form(
            "/api/compose",
            &[
                ("api_type", "json"),
                ("to", recipient),
                ("subject", subject),
                ("text", body),
            ],
        )
        .await?;
        Ok(())
    }

    async fn recent_submissions(
        &self,
        user: &str,
        limit: usize,
    ) -> Result<Vec<Post>, PlatformError> {
        let json = self
            .get_json(
                &format!("/user/{user}/submitted"),
                &[("sort", "new".to_string()), ("limit", limit.to_string())],
            )
            .await?;
        let children = json["data"]["children"].as_array().cloned().unwrap_or_default();
        children
            .iter()
            .map(|c| Self::parse_post(&c["data"]))
            .collect()
    }

    async fn account_metrics(&self, user: &str) -> Result<AccountMetrics, PlatformError> {
        let json = self.get_json(&format!("/user/{user}/about"), &[]).await?;
        let data = &json["data"];
        Ok(AccountMetrics {
            post_karma: data["link_karma"].as_i64().unwrap_or(0),
            comment_karma: data["comment_karma"].as_i64().unwrap_or(0),
            created_at: Self::timestamp(&data["created_utc"]),
        })
    }

    async fn top_level_comments(&self, post_id: &str) -> Result<Vec<Comment>, PlatformError> {
        let json = self
            .get_json(
                &format!("/comments/{post_id}"),
                &[
                    ("depth", "1".to_string()),
                    ("limit", "500".to_string()),
                    ("sort", "old".to_string()),
                ],
            )
            .await?;
        // Response is [post listing, comment listing].
        let listing = json
            .get(1)
            .ok_or_else(|| PlatformError::Protocol("missing comment listing".to_string()))?;
        let children = listing["data"]["children"].as_array().cloned().unwrap_or_default();
        children
            .iter()
            .filter(|c| c["kind"].as_str() == Some("t1"))
            .map(|c| Self::parse_comment(&c["data"]))
            .collect()
    }

    async fn fetch_unread(&self, limit: usize) -> Result<Vec<InboxItem>, PlatformError> {
        let json = self
            .get_json("/message/unread", &[("limit", limit.to_string())])
            .await?;
        let children = json["data"]["children"].as_array().cloned().unwrap_or_default();
        let mut items = Vec::new();
        for child in &children {
            let data = &child["data"];
            let fullname = json_str(data, "name")?;
            let author = data["author"]
                .as_str()
                .filter(|a| !a.is_empty() && *a != "[deleted]")
                .map(str::to_string);
            match child["kind"].as_str() {
                Some("t4") => items.push(InboxItem {
                    id: fullname,
                    kind: InboxKind::Message,
                    author,
                    subject: data["subject"].as_str().unwrap_or_default().to_string(),
                    body: data["body"].as_str().unwrap_or_default().to_string(),
                    parent_id: None,
                    comment_id: None,
                }),
                Some("t1") if data["type"].as_str() == Some("username_mention") => {
                    items.push(InboxItem {
                        id: fullname,
                        kind: InboxKind::Mention,
                        author,
                        subject: data["subject"].as_str().unwrap_or_default().to_string(),
                        body: data["body"].as_str().unwrap_or_default().to_string(),
                        parent_id: data["parent_id"].as_str().map(str::to_string),
                        comment_id: data["id"].as_str().map(str::to_string),
                    })
                }
                _ => {}
            }
        }
        Ok(items)
    }

    async fn mark_read(&self, item_ids: &[String]) -> Result<(), PlatformError> {
        if item_ids.is_empty() {
            return Ok(());
        }
        let joined = item_ids.join(",");
        self.post_form("/api/read_message", &[("id", joined.as_str())])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> RedditCredentials {
        RedditCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            username: "giveawaybot".to_string(),
            password: "hunter2".to_string(),
            user_agent: "windfall/0.1 test".to_string(),
        }
    }

    fn token_mock(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/api/v1/access_token")
            .with_status(200)
            .with_body(r#"{"access_token": "tok", "expires_in": 3600}"#)
            .create()
    }

    #[tokio::test]
    async fn test_recent_submissions_parses_listing() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server);
        let _submitted = server
            .mock("GET", "/user/alice/submitted")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data": {"children": [
                    {"kind": "t3", "data": {"id": "p1", "title": "Giveaway 123456",
                     "selftext": "body", "author": "alice", "permalink": "/r/x/p1"}}
                ]}}"#,
            )
            .create();

        let client = RedditClient::with_base_url(credentials(), &server.url()).unwrap();
        let posts = client.recent_submissions("alice", 5).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "p1");
        assert_eq!(posts[0].title, "Giveaway 123456");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server);
        let _about = server
            .mock("GET", "/user/bob/about")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create();

        let client = RedditClient::with_base_url(credentials(), &server.url()).unwrap();
        let err = client.account_metrics("bob").await.unwrap_err();
        assert!(matches!(err, PlatformError::Transient(_)));
    }

    #[tokio::test]
    async fn test_bad_credentials_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/api/v1/access_token")
            .with_status(401)
            .create();

        let client = RedditClient::with_base_url(credentials(), &server.url()).unwrap();
        let err = client.account_metrics("bob").await.unwrap_err();
        assert!(matches!(err, PlatformError::Auth(_)));
    }

    #[tokio::test]
    async fn test_deleted_author_maps_to_none() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server);
        let _comments = server
            .mock("GET", "/comments/p1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"data": {"children": []}},
                    {"data": {"children": [
                      {"kind": "t1", "data": {"id": "c1", "author": "[deleted]",
                       "body": "42", "created_utc": 1700000000,
                       "parent_id": "t3_p1", "link_id": "t3_p1"}}
                ]}}]"#,
            )
            .create();

        let client = RedditClient::with_base_url(credentials(), &server.url()).unwrap();
        let comments = client.top_level_comments("p1").await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, None);
    }
}
