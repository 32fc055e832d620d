mod handler;

pub use handler::{create_group, find_group, join_group};
