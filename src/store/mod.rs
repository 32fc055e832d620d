use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Group, Point, contains_location};
use crate::utils::{generate_join_code, normalize_join_code};

mod memory;
mod postgres;

pub use memory::MemoryGroupRepository;
pub use postgres::PgGroupRepository;

// 加入码冲突时最多重新生成的次数
const MAX_JOIN_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no group with join code {0}")]
    NotFound(String),

    #[error("a point at ({lat}, {lng}) already exists in the group")]
    DuplicatePoint { lat: f64, lng: f64 },

    #[error("persistence call timed out after {0:?}")]
    Timeout(Duration),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}

/// 群组持久化接口。每个实现都必须按群组串行化追加操作，
/// 不同群组之间不得共享锁。
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// 插入新群组；加入码已被占用时返回 `Ok(false)` 且不产生任何写入
    async fn insert(&self, group: &Group) -> Result<bool, StoreError>;

    async fn find_by_join_code(&self, join_code: &str) -> Result<Option<Group>, StoreError>;

    /// 原子地向群组追加一个点，坐标重复时返回 `DuplicatePoint`
    async fn append_point(&self, join_code: &str, point: &Point) -> Result<Group, StoreError>;
}

#[derive(Clone)]
pub struct GroupStore {
    repo: Arc<dyn GroupRepository>,
    timeout: Duration,
}

impl GroupStore {
    pub fn new(repo: Arc<dyn GroupRepository>, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    pub fn in_memory(timeout: Duration) -> Self {
        Self::new(Arc::new(MemoryGroupRepository::new()), timeout)
    }

    pub async fn create_group(&self, points: Vec<Point>) -> Result<Group, StoreError> {
        if points.is_empty() {
            return Err(StoreError::InvalidInput(
                "a group needs at least one point".to_string(),
            ));
        }
        for (i, point) in points.iter().enumerate() {
            point.validate().map_err(StoreError::InvalidInput)?;
            if contains_location(&points[..i], point.lat, point.lng) {
                return Err(StoreError::InvalidInput(format!(
                    "duplicate coordinates ({}, {}) in submitted points",
                    point.lat, point.lng
                )));
            }
        }

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let mut group = Group {
            id,
            join_code: String::new(),
            points,
            created_at,
        };

        for attempt in 1..=MAX_JOIN_CODE_ATTEMPTS {
            group.join_code = generate_join_code();
            if self.bounded(self.repo.insert(&group)).await? {
                tracing::info!(
                    "Created group {} with join code {} ({} points)",
                    group.id,
                    group.join_code,
                    group.points.len()
                );
                return Ok(group);
            }
            tracing::warn!(
                "Join code {} already taken, regenerating (attempt {})",
                group.join_code,
                attempt
            );
        }

        Err(StoreError::Persistence(
            "could not allocate a unique join code".to_string(),
        ))
    }

    pub async fn join_group(&self, join_code: &str, point: Point) -> Result<Group, StoreError> {
        point.validate().map_err(StoreError::InvalidInput)?;
        let join_code = normalize_join_code(join_code);
        if join_code.is_empty() {
            return Err(StoreError::InvalidInput("join code must not be empty".to_string()));
        }

        let group = self
            .bounded(self.repo.append_point(&join_code, &point))
            .await?;
        tracing::info!(
            "Point {:?} joined group {} (now {} points)",
            point.name,
            group.id,
            group.points.len()
        );
        Ok(group)
    }

    pub async fn find_group(&self, join_code: &str) -> Result<Group, StoreError> {
        let join_code = normalize_join_code(join_code);
        self.bounded(self.repo.find_by_join_code(&join_code))
            .await?
            .ok_or(StoreError::NotFound(join_code))
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Persistence call exceeded {:?}", self.timeout);
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}
