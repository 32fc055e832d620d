use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::models::SelectionCandidate;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("geocoder returned {status}")]
    Status { status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 地点搜索结果，几何信息可能缺失
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub formatted_address: String,
    pub location: Option<(f64, f64)>,
}

/// 外部地点搜索能力：自由文本 -> 零个或多个候选
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError>;
}

/// 把地点搜索结果规范化为 `SelectionCandidate`，只取第一个带坐标的结果
pub struct GeocodeAdapter<S> {
    search: S,
}

impl<S: PlaceSearch> GeocodeAdapter<S> {
    pub fn new(search: S) -> Self {
        Self { search }
    }

    pub async fn resolve(&self, query: &str) -> Result<Option<SelectionCandidate>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let candidates = self.search.search(query).await?;
        debug!(count = candidates.len(), %query, "resolve: got candidates");

        Ok(candidates.into_iter().find_map(|place| {
            let (lat, lng) = place.location?;
            (lat.is_finite() && lng.is_finite()).then(|| SelectionCandidate {
                address: place.formatted_address,
                lat,
                lng,
            })
        }))
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: Option<String>,
    lon: Option<String>,
}

/// Nominatim (OpenStreetMap) 搜索客户端
pub struct NominatimSearch {
    base_url: String,
    user_agent: String,
    http: Client,
}

impl NominatimSearch {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            http,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, GeocodeError> {
        Self::new(
            config.geocoder_url.clone(),
            config.geocoder_user_agent.clone(),
            config.request_timeout(),
        )
    }
}

#[async_trait]
impl PlaceSearch for NominatimSearch {
    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[("q", query), ("format", "json"), ("limit", "5")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        Ok(places
            .into_iter()
            .map(|place| {
                let location = match (place.lat, place.lon) {
                    (Some(lat), Some(lon)) => lat.parse().ok().zip(lon.parse().ok()),
                    _ => None,
                };
                PlaceCandidate {
                    formatted_address: place.display_name,
                    location,
                }
            })
            .collect())
    }
}
