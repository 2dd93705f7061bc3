/// Rating platform HTTP provider
///
/// Talks to the platform's JSON API with a bearer API key.
///
/// API Flow:
/// 1. Connections: /users/{user}/friends → friend ids and display names
/// 2. Comparison: /users/{user}/compare/{friend} → books both have rated, with both ratings
use crate::{
    error::{AppError, AppResult},
    models::{ApiCompareResponse, ApiFriend, ApiFriendsResponse, Connection, RawRatingPair, UserId},
    services::providers::RatingProvider,
};
use reqwest::{Client as HttpClient, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct PlatformProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: Url,
}

impl PlatformProvider {
    pub fn new(api_key: String, api_url: String) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            AppError::InvalidInput(format!("Invalid platform API url '{}': {}", api_url, e))
        })?;
        if api_url.cannot_be_a_base() {
            return Err(AppError::InvalidInput(format!(
                "Platform API url '{}' cannot carry a path",
                api_url
            )));
        }

        Ok(Self {
            http_client,
            api_key,
            api_url,
        })
    }

    /// Appends path segments to the API base url
    ///
    /// Each segment is percent-encoded, so ids containing `/`, `?` or `#`
    /// stay inside their own segment.
    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Platform API url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a GET and decodes the JSON body, mapping non-2xx to `UpstreamStatus`
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %body,
                "Failed to deserialize platform response"
            );
            AppError::ExternalApi(format!("Failed to parse platform response: {}", e))
        })
    }

    async fn ensure_success(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::UpstreamStatus { status, body })
    }

    /// Convert a platform friend entry into a connection
    ///
    /// Friend ids arrive as either JSON strings or numbers. A friend with
    /// no usable name is shown under its id.
    fn parse_friend(friend: ApiFriend) -> Option<Connection> {
        let raw_id = match &friend.id {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let id = UserId::parse(raw_id).ok()?;
        let name = friend
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.to_string());
        Some(Connection::new(id, name))
    }
}

#[async_trait::async_trait]
impl RatingProvider for PlatformProvider {
    async fn list_connections(&self, user: &UserId) -> AppResult<Vec<Connection>> {
        let url = self.endpoint(&["users", user.as_str(), "friends"])?;
        let response: ApiFriendsResponse = self.get_json(url).await?;
        let listed = response.friends.len();

        let connections: Vec<Connection> = response
            .friends
            .into_iter()
            .filter_map(|friend| {
                let parsed = Self::parse_friend(friend.clone());
                if parsed.is_none() {
                    tracing::debug!(friend = ?friend.id, "Skipping friend without usable id");
                }
                parsed
            })
            .collect();

        tracing::info!(
            user = %user,
            listed,
            connections = connections.len(),
            provider = self.name(),
            "Connections fetched"
        );

        Ok(connections)
    }

    async fn rating_comparison(
        &self,
        user: &UserId,
        connection: &UserId,
    ) -> AppResult<Vec<RawRatingPair>> {
        let url = self.endpoint(&["users", user.as_str(), "compare", connection.as_str()])?;
        let response: ApiCompareResponse = self.get_json(url).await?;

        tracing::debug!(
            user = %user,
            connection = %connection,
            books = response.reviews.len(),
            provider = self.name(),
            "Rating comparison fetched"
        );

        Ok(response.reviews)
    }

    fn name(&self) -> &'static str {
        "platform"
    }
}
