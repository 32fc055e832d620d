use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{GroupRepository, StoreError};
use crate::models::{Group, Point, contains_location};

/// 内存实现，用于本地开发和测试。
///
/// 外层 `RwLock` 只在查找和插入群组时持有；追加点时只锁住目标群组自己的 `Mutex`，
/// 因此不同群组的加入互不阻塞。
#[derive(Default)]
pub struct MemoryGroupRepository {
    groups: RwLock<HashMap<String, Arc<Mutex<Group>>>>,
}

impl MemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, join_code: &str) -> Option<Arc<Mutex<Group>>> {
        self.groups.read().await.get(join_code).cloned()
    }
}

#[async_trait]
impl GroupRepository for MemoryGroupRepository {
    async fn insert(&self, group: &Group) -> Result<bool, StoreError> {
        let mut groups = self.groups.write().await;
        if groups.contains_key(&group.join_code) {
            return Ok(false);
        }
        groups.insert(group.join_code.clone(), Arc::new(Mutex::new(group.clone())));
        Ok(true)
    }

    async fn find_by_join_code(&self, join_code: &str) -> Result<Option<Group>, StoreError> {
        match self.slot(join_code).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn append_point(&self, join_code: &str, point: &Point) -> Result<Group, StoreError> {
        let slot = self
            .slot(join_code)
            .await
            .ok_or_else(|| StoreError::NotFound(join_code.to_string()))?;

        let mut group = slot.lock().await;
        if contains_location(&group.points, point.lat, point.lng) {
            return Err(StoreError::DuplicatePoint {
                lat: point.lat,
                lng: point.lng,
            });
        }
        group.points.push(point.clone());
        Ok(group.clone())
    }
}
