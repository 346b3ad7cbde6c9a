//! Pastebin implementation of [`PasteClient`].
//!
//! The used-numbers tracker lives as an unlisted paste so entrants can audit
//! which guesses are already taken. Pastebin's legacy form API answers with a
//! bare URL (or a `Bad API request` string) rather than JSON.

use async_trait::async_trait;

use super::{PasteClient, PlatformError};

const API_BASE: &str = "https://pastebin.com";

/// Pastebin legacy-API client.
pub struct PastebinClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PastebinClient {
    pub fn new(api_key: String) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| PlatformError::Protocol(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the API endpoint at `base_url` (mock servers).
    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, PlatformError> {
        let mut client = Self::new(api_key)?;
        client.base_url = base_url.to_string();
        Ok(client)
    }

    async fn api_post(&self, form: &[(&str, &str)]) -> Result<String, PlatformError> {
        let response = self
            .http
            .post(format!("{}/api/api_post.php", self.base_url))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    PlatformError::Transient(e.to_string())
                } else {
                    PlatformError::Protocol(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(PlatformError::Transient(format!("status {status}")));
        }
        if !status.is_success() {
            return Err(PlatformError::Protocol(format!("status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PlatformError::Protocol(e.to_string()))?;
        // Errors come back as 200 with a text sentinel.
        if body.starts_with("Bad API request") {
            if body.contains("invalid api_dev_key") {
                return Err(PlatformError::Auth(body));
            }
            return Err(PlatformError::Protocol(body));
        }
        Ok(body)
    }
}

#[async_trait]
impl PasteClient for PastebinClient {
    async fn create_paste(
        &self,
        text: &str,
        title: &str,
        format: Option<&str>,
        expiry: &str,
    ) -> Result<String, PlatformError> {
        let mut form = vec![
            ("api_dev_key", self.api_key.as_str()),
            ("api_option", "paste"),
            ("api_paste_code", text),
            ("api_paste_name", title),
            ("api_paste_private", "1"),
            ("api_paste_expire_date", expiry),
        ];
        if let Some(format) = format {
            form.push(("api_paste_format", format));
        }
        let url = self.api_post(&form).await?;
        Ok(url.trim().to_string())
    }

    async fn delete_paste(&self, paste_key: &str) -> Result<(), PlatformError> {
        self.api_post(&[
            ("api_dev_key", self.api_key.as_str()),
            ("api_option", "delete"),
            ("api_paste_key", paste_key),
        ])
        .await?;
        Ok(())
    }
}
