//! 客户端会话流程：地点搜索、地址收集，以及对聚类服务和群组后端的调用。

pub mod api;
pub mod cluster;
pub mod collection;
pub mod geocode;
pub mod session;

pub use api::{GroupApiClient, GroupApiError};
pub use cluster::{ClusterError, ClusterRequestClient};
pub use collection::{AddressCollection, CollectionError};
pub use geocode::{GeocodeAdapter, GeocodeError, NominatimSearch, PlaceCandidate, PlaceSearch};
pub use session::{MapView, Marker, Session, SessionError};
