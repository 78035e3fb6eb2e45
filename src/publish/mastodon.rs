// src/publish/mastodon.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::{PostId, Publisher};
use crate::config::PublisherSettings;
use crate::error::{ConfigError, PublishError};
use crate::format::PostPayload;

const STATUSES_PATH: &str = "api/v1/statuses";

/// Mastodon statuses API client. Cheap to share: `reqwest::Client` is reference-counted.
#[derive(Clone)]
pub struct MastodonClient {
    endpoint: Url,
    client_id: String,
    access_token: String,
    visibility: Option<String>,
    client: Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct StatusRequest<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<&'a str>,
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
}

impl MastodonClient {
    /// All four credentials must be present; the first missing one is reported.
    pub fn new(settings: &PublisherSettings, client: Client) -> Result<Self, ConfigError> {
        let feed = || settings.feed.clone();
        if settings.instance.host_str().is_none() {
            return Err(ConfigError::MissingInstance { feed: feed() });
        }
        if settings.client_id.trim().is_empty() {
            return Err(ConfigError::MissingClientId { feed: feed() });
        }
        if settings.client_secret.trim().is_empty() {
            return Err(ConfigError::MissingClientSecret { feed: feed() });
        }
        if settings.access_token.trim().is_empty() {
            return Err(ConfigError::MissingAccessToken { feed: feed() });
        }

        let endpoint = base_url(&settings.instance)
            .join(STATUSES_PATH)
            .map_err(|e| ConfigError::InvalidUrl {
                feed: feed(),
                field: "instance",
                reason: e.to_string(),
            })?;

        Ok(Self {
            endpoint,
            client_id: settings.client_id.clone(),
            access_token: settings.access_token.clone(),
            visibility: settings.visibility.clone(),
            client,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }
}

// `join` replaces the last path segment unless the base ends with '/'.
fn base_url(instance: &Url) -> Url {
    let mut base = instance.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl Publisher for MastodonClient {
    async fn post(&self, payload: &PostPayload) -> Result<PostId, PublishError> {
        let body = StatusRequest {
            status: &payload.status,
            visibility: self.visibility.as_deref(),
        };

        let rsp = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .bearer_auth(&self.access_token)
            .header("Idempotency-Key", &payload.idempotency_key)
            .json(&body)
            .send()
            .await?;

        let status = rsp.status();
        match status {
            s if s.is_success() => {
                let text = rsp.text().await?;
                let parsed: StatusResponse = serde_json::from_str(&text)
                    .map_err(|e| PublishError::InvalidResponse(format!("{e}: {text}")))?;
                tracing::debug!(
                    client_id = %self.client_id,
                    status_id = %parsed.id,
                    "status accepted"
                );
                Ok(PostId(parsed.id))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PublishError::Auth {
                status: status.as_u16(),
            }),
            StatusCode::TOO_MANY_REQUESTS => {
                let reset = rsp
                    .headers()
                    .get("x-ratelimit-reset")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Err(PublishError::RateLimited { reset })
            }
            _ => {
                let body = rsp.text().await.unwrap_or_default();
                Err(PublishError::Rejected {
                    status: status.as_u16(),
                    body: body.chars().take(300).collect(),
                })
            }
        }
    }

    fn destination(&self) -> String {
        self.endpoint.origin().ascii_serialization()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(instance: &str) -> PublisherSettings {
        PublisherSettings {
            feed: "blog".into(),
            instance: Url::parse(instance).unwrap(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            access_token: "token".into(),
            visibility: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn endpoint_keeps_instance_path() {
        let c = MastodonClient::new(&settings("https://social.example"), Client::new()).unwrap();
        assert_eq!(c.endpoint.as_str(), "https://social.example/api/v1/statuses");

        let c = MastodonClient::new(&settings("https://example.org/masto"), Client::new()).unwrap();
        assert_eq!(c.endpoint.as_str(), "https://example.org/masto/api/v1/statuses");
    }

    #[test]
    fn each_missing_credential_has_its_own_error() {
        let mut s = settings("https://social.example");
        s.client_id = String::new();
        assert!(matches!(
            MastodonClient::new(&s, Client::new()),
            Err(ConfigError::MissingClientId { .. })
        ));

        let mut s = settings("https://social.example");
        s.client_secret = " ".into();
        assert!(matches!(
            MastodonClient::new(&s, Client::new()),
            Err(ConfigError::MissingClientSecret { .. })
        ));

        let mut s = settings("https://social.example");
        s.access_token = String::new();
        assert!(matches!(
            MastodonClient::new(&s, Client::new()),
            Err(ConfigError::MissingAccessToken { .. })
        ));
    }

    #[test]
    fn credential_errors_name_the_feed() {
        let mut s = settings("https://social.example");
        s.client_id = String::new();
        let err = MastodonClient::new(&s, Client::new()).err().unwrap();
        assert!(matches!(&err, ConfigError::MissingClientId { feed } if feed == "blog"));
        assert_eq!(err.to_string(), "feed `blog`: client_id is required");
    }
}
