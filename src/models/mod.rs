mod group;
mod partition;
mod point;

pub use group::{CreateGroupRequest, Group, JoinRequest};
pub use partition::Partition;
pub use point::{Point, SelectionCandidate, contains_location};
