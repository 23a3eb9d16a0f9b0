//! Real-Debrid REST client.

use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::availability::parse_availability;
use super::{
    AddMagnetResult, Availability, DebridClient, DebridConfig, DebridError, RequestPacer,
    TorrentDetails, TorrentSummary, UserInfo,
};

/// Page size when listing account torrents for the active count.
const LIST_LIMIT: u32 = 100;

/// Real-Debrid client. Every request goes through the pacer.
pub struct RealDebridClient {
    client: Client,
    config: DebridConfig,
    pacer: Mutex<RequestPacer>,
}

impl RealDebridClient {
    pub fn new(config: DebridConfig) -> Result<Self, DebridError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DebridError::Client(e.to_string()))?;
        let pacer = Mutex::new(RequestPacer::new(config.request_interval));

        Ok(Self {
            client,
            config,
            pacer,
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    /// Pace, authenticate and send a request; non-2xx becomes an error.
    async fn send(&self, request: RequestBuilder) -> Result<Response, DebridError> {
        self.pacer.lock().await.wait().await;

        let response = request
            .bearer_auth(&self.config.api_key)
            .header(USER_AGENT, concat!("harvester/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(DebridError::from_reqwest)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, DebridError> {
        let response = self.send(self.client.get(self.url(endpoint))).await?;
        response.json().await.map_err(DebridError::from_reqwest)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_code: Option<i64>,
}

/// Build an error from a failed response, keeping the service error code.
async fn error_from_response(response: Response) -> DebridError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();

    let message = parsed
        .as_ref()
        .and_then(|b| b.error.clone())
        .unwrap_or_else(|| body.chars().take(200).collect());
    let code = parsed.and_then(|b| b.error_code);

    if status == StatusCode::UNAUTHORIZED {
        return DebridError::AuthenticationFailed(message);
    }
    DebridError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

#[async_trait]
impl DebridClient for RealDebridClient {
    fn name(&self) -> &str {
        "real-debrid"
    }

    async fn user(&self) -> Result<UserInfo, DebridError> {
        match self.get_json("/user").await {
            Err(DebridError::Api {
                status: 403,
                message,
                ..
            }) => Err(DebridError::AuthenticationFailed(message)),
            other => other,
        }
    }

    async fn add_magnet(&self, magnet: &str) -> Result<AddMagnetResult, DebridError> {
        let request = self
            .client
            .post(self.url("/torrents/addMagnet"))
            .form(&[("magnet", magnet)]);
        let response = self.send(request).await?;
        let result: AddMagnetResult = response.json().await.map_err(DebridError::from_reqwest)?;
        debug!(id = %result.id, "Magnet added");
        Ok(result)
    }

    async fn torrent_info(&self, id: &str) -> Result<TorrentDetails, DebridError> {
        self.get_json(&format!("/torrents/info/{}", urlencoding::encode(id)))
            .await
    }

    async fn select_files(&self, id: &str, file_ids: &[u64]) -> Result<(), DebridError> {
        let files = file_ids
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let request = self
            .client
            .post(self.url(&format!(
                "/torrents/selectFiles/{}",
                urlencoding::encode(id)
            )))
            .form(&[("files", files.as_str())]);
        self.send(request).await?;
        Ok(())
    }

    async fn instant_availability(&self, hashes: &[String]) -> Result<Availability, DebridError> {
        if hashes.is_empty() {
            return Ok(Availability::new());
        }
        let endpoint = format!("/torrents/instantAvailability/{}", hashes.join("/"));
        let body: serde_json::Value = self.get_json(&endpoint).await?;
        Ok(parse_availability(&body))
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, DebridError> {
        let endpoint = format!("/torrents?limit={}", LIST_LIMIT);
        let response = self.send(self.client.get(self.url(&endpoint))).await?;
        // An account without torrents answers 204 with no body.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        response.json().await.map_err(DebridError::from_reqwest)
    }
}
