use thiserror::Error;

use super::api::{GroupApiClient, GroupApiError};
use super::cluster::{ClusterError, ClusterRequestClient};
use super::collection::AddressCollection;
use super::geocode::{GeocodeAdapter, GeocodeError, PlaceSearch};
use crate::models::{Group, Partition, Point, SelectionCandidate};

// 初始视野与选中地点后的缩放级别
const DEFAULT_CENTER: (f64, f64) = (-3.745, -38.523);
const DEFAULT_ZOOM: u8 = 12;
const SELECTION_ZOOM: u8 = 16;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a clustering request is already in flight")]
    Busy,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Api(#[from] GroupApiError),
}

/// 请求期间持有进行中标志，任何退出路径（包括 future 被丢弃）都会复位
struct InFlightGuard<'a>(&'a mut bool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// 地图上要画的标记
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Collected(Point),
    Pending(SelectionCandidate),
}

/// 一个客户端会话的全部状态：地图视野、地址集合、聚类请求是否进行中
#[derive(Debug, Default)]
pub struct Session {
    map: MapView,
    collection: AddressCollection,
    partition_in_flight: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&self) -> MapView {
        self.map
    }

    pub fn collection(&self) -> &AddressCollection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut AddressCollection {
        &mut self.collection
    }

    pub fn is_partition_in_flight(&self) -> bool {
        self.partition_in_flight
    }

    /// 搜索地点；命中时设为待确认候选并把地图移到该处，未命中时状态不变
    pub async fn search<S: PlaceSearch>(
        &mut self,
        adapter: &GeocodeAdapter<S>,
        query: &str,
    ) -> Result<Option<SelectionCandidate>, SessionError> {
        let Some(candidate) = adapter.resolve(query).await? else {
            tracing::debug!("search {:?}: no place with geometry", query);
            return Ok(None);
        };

        self.map = MapView {
            center: (candidate.lat, candidate.lng),
            zoom: SELECTION_ZOOM,
        };
        self.collection.set_selection(candidate.clone());
        Ok(Some(candidate))
    }

    pub fn add(&mut self, name: &str) -> bool {
        self.collection.add(name)
    }

    pub fn markers(&self) -> Vec<Marker> {
        let mut markers: Vec<Marker> = self
            .collection
            .points()
            .iter()
            .cloned()
            .map(Marker::Collected)
            .collect();
        if let Some(candidate) = self.collection.selection() {
            markers.push(Marker::Pending(candidate.clone()));
        }
        markers
    }

    /// 开始一次聚类请求：检查空集合和重复提交，置位进行中标志并返回点的快照
    pub fn begin_partition(&mut self) -> Result<Vec<Point>, SessionError> {
        if self.partition_in_flight {
            return Err(SessionError::Busy);
        }
        if self.collection.is_empty() {
            return Err(ClusterError::InvalidInput(
                "cannot partition an empty collection".to_string(),
            )
            .into());
        }
        self.partition_in_flight = true;
        Ok(self.collection.points().to_vec())
    }

    pub fn finish_partition(&mut self) {
        self.partition_in_flight = false;
    }

    /// 请求分组；无论成功与否集合都保持不变，便于用户手动重试
    pub async fn request_partition(
        &mut self,
        client: &ClusterRequestClient,
    ) -> Result<Partition, SessionError> {
        let points = self.begin_partition()?;
        let guard = InFlightGuard(&mut self.partition_in_flight);
        let result = client.request_partition(&points).await;
        drop(guard);

        match &result {
            Ok(partition) => tracing::info!(
                "Partitioned {} points into {} groups",
                points.len(),
                partition.len()
            ),
            Err(e) => tracing::warn!("Partition request failed: {}", e),
        }
        Ok(result?)
    }

    /// 把当前集合提交为群组，集合保留
    pub async fn submit_group(&self, api: &GroupApiClient) -> Result<Group, SessionError> {
        if self.collection.is_empty() {
            return Err(SessionError::InvalidInput(
                "cannot create a group from an empty collection".to_string(),
            ));
        }
        let group = api.create_group(self.collection.points()).await?;
        tracing::info!("Submitted group {} with join code {}", group.id, group.join_code);
        Ok(group)
    }

    /// 用待确认候选和名字加入已有群组，成功后清掉候选和输入框文本
    pub async fn join_group(
        &mut self,
        api: &GroupApiClient,
        join_code: &str,
        name: &str,
    ) -> Result<Group, SessionError> {
        let Some(candidate) = self.collection.selection().cloned() else {
            return Err(SessionError::InvalidInput("no place selected".to_string()));
        };
        if name.trim().is_empty() {
            return Err(SessionError::InvalidInput("name must not be empty".to_string()));
        }

        let point = Point::from_candidate(candidate, name);
        let group = api.join_group(join_code, &point).await?;
        self.collection.consume_selection();
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(points: &[(f64, f64)]) -> Session {
        let mut session = Session::new();
        for (i, (lat, lng)) in points.iter().enumerate() {
            session.collection_mut().set_selection(SelectionCandidate {
                address: format!("{} main st", i),
                lat: *lat,
                lng: *lng,
            });
            assert!(session.add(&format!("p{}", i)));
        }
        session
    }

    #[test]
    fn begin_partition_guards_against_double_submit() {
        let mut session = session_with(&[(1.0, 1.0)]);
        let snapshot = session.begin_partition().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(session.is_partition_in_flight());
        assert!(matches!(session.begin_partition(), Err(SessionError::Busy)));

        session.finish_partition();
        assert!(session.begin_partition().is_ok());
    }

    #[test]
    fn begin_partition_rejects_empty_collection() {
        let mut session = Session::new();
        assert!(matches!(
            session.begin_partition(),
            Err(SessionError::Cluster(ClusterError::InvalidInput(_)))
        ));
        assert!(!session.is_partition_in_flight());
    }

    #[test]
    fn markers_include_pending_selection() {
        let mut session = session_with(&[(1.0, 1.0), (2.0, 2.0)]);
        assert_eq!(session.markers().len(), 2);

        let pending = SelectionCandidate {
            address: "pending".to_string(),
            lat: 3.0,
            lng: 3.0,
        };
        session.collection_mut().set_selection(pending.clone());
        let markers = session.markers();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[2], Marker::Pending(pending));
    }

    #[test]
    fn default_map_view() {
        let session = Session::new();
        assert_eq!(session.map().center, (-3.745, -38.523));
        assert_eq!(session.map().zoom, 12);
    }
}
