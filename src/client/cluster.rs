//! 外部聚类服务的客户端。
//!
//! 以 JSON 数组提交收集到的点，服务返回分组结果。响应可以是裸的 `[[Point]]`，
//! 也可以是 `{"groups": ...}` 包装，包装里的成员既可以是完整的点，也可以只是名字。

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::models::{Partition, Point};

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("clustering service error {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("clustering request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed partition: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Member {
    Point(Point),
    Name(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClusterResponse {
    Bare(Vec<Vec<Member>>),
    Envelope { groups: Vec<Vec<Member>> },
}

impl ClusterResponse {
    fn into_groups(self) -> Vec<Vec<Member>> {
        match self {
            ClusterResponse::Bare(groups) => groups,
            ClusterResponse::Envelope { groups } => groups,
        }
    }
}

/// 把服务返回的成员映射回提交的点，每个输入点只能被使用一次，
/// 且所有输入点都必须出现
fn resolve_partition(input: &[Point], groups: Vec<Vec<Member>>) -> Result<Partition, ClusterError> {
    let mut used = vec![false; input.len()];
    let mut resolved = Vec::with_capacity(groups.len());

    for group in groups {
        let mut points = Vec::with_capacity(group.len());
        for member in group {
            let index = (0..input.len()).find(|&i| {
                !used[i]
                    && match &member {
                        Member::Point(p) => input[i] == *p,
                        Member::Name(name) => input[i].name == *name,
                    }
            });
            let Some(index) = index else {
                return Err(ClusterError::MalformedResponse(format!(
                    "unexpected or repeated member {:?}",
                    member
                )));
            };
            used[index] = true;
            points.push(input[index].clone());
        }
        resolved.push(points);
    }

    let missing = used.iter().filter(|u| !**u).count();
    if missing > 0 {
        return Err(ClusterError::MalformedResponse(format!(
            "{} submitted points missing from partition",
            missing
        )));
    }

    Ok(Partition::new(resolved))
}

pub struct ClusterRequestClient {
    endpoint: String,
    http: Client,
    timeout: Duration,
}

impl ClusterRequestClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClusterError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClusterError::Network)?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClusterError> {
        Self::new(config.cluster_url.clone(), config.cluster_timeout())
    }

    /// 请求分组。对本地状态只读；失败不重试，直接返回给调用方
    pub async fn request_partition(&self, points: &[Point]) -> Result<Partition, ClusterError> {
        if points.is_empty() {
            return Err(ClusterError::InvalidInput(
                "cannot partition an empty collection".to_string(),
            ));
        }
        debug!(count = points.len(), endpoint = %self.endpoint, "request_partition: sending");

        let response = self
            .http
            .post(&self.endpoint)
            .json(points)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            warn!(%status, "request_partition: service rejected request");
            return Err(ClusterError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ClusterResponse = serde_json::from_str(&body)
            .map_err(|e| ClusterError::MalformedResponse(e.to_string()))?;
        let partition = resolve_partition(points, parsed.into_groups())?;
        debug!(groups = partition.len(), "request_partition: done");
        Ok(partition)
    }

    fn transport_error(&self, e: reqwest::Error) -> ClusterError {
        if e.is_timeout() {
            ClusterError::Timeout(self.timeout)
        } else {
            ClusterError::Network(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(name: &str, lat: f64, lng: f64) -> Point {
        Point {
            name: name.to_string(),
            address: String::new(),
            lat,
            lng,
        }
    }

    #[test]
    fn resolves_names_in_order() {
        let input = vec![point("chow", 1.0, 1.0), point("low", 2.0, 2.0), point("mow", 3.0, 3.0)];
        let response: ClusterResponse =
            serde_json::from_str(r#"{"groups": [["mow", "chow"], ["low"]]}"#).unwrap();

        let partition = resolve_partition(&input, response.into_groups()).unwrap();
        assert_eq!(partition.groups[0], vec![input[2].clone(), input[0].clone()]);
        assert_eq!(partition.groups[1], vec![input[1].clone()]);
        assert!(partition.covers_exactly(&input));
    }

    #[test]
    fn same_name_points_are_each_used_once() {
        let input = vec![point("sam", 1.0, 1.0), point("sam", 2.0, 2.0)];
        let response: ClusterResponse = serde_json::from_str(r#"[["sam"], ["sam"]]"#).unwrap();
        let partition = resolve_partition(&input, response.into_groups()).unwrap();
        assert!(partition.covers_exactly(&input));
    }

    #[test]
    fn rejects_missing_unknown_and_repeated_members() {
        let input = vec![point("a", 1.0, 1.0), point("b", 2.0, 2.0)];

        let missing: ClusterResponse = serde_json::from_str(r#"[["a"]]"#).unwrap();
        assert!(matches!(
            resolve_partition(&input, missing.into_groups()),
            Err(ClusterError::MalformedResponse(_))
        ));

        let unknown: ClusterResponse = serde_json::from_str(r#"[["a", "b", "zed"]]"#).unwrap();
        assert!(matches!(
            resolve_partition(&input, unknown.into_groups()),
            Err(ClusterError::MalformedResponse(_))
        ));

        let repeated: ClusterResponse = serde_json::from_str(r#"[["a", "b"], ["a"]]"#).unwrap();
        assert!(matches!(
            resolve_partition(&input, repeated.into_groups()),
            Err(ClusterError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_request() {
        // 端口 9 上没有服务；若真的发出请求会得到网络错误而不是 InvalidInput
        let client =
            ClusterRequestClient::new("http://127.0.0.1:9/cluster-group", Duration::from_secs(1))
                .unwrap();
        assert!(matches!(
            client.request_partition(&[]).await,
            Err(ClusterError::InvalidInput(_))
        ));
    }
}
