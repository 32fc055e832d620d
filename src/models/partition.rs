use serde::{Deserialize, Serialize};

use super::Point;

/// 聚类服务返回的分组结果，只用于响应，不持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partition {
    pub groups: Vec<Vec<Point>>,
}

impl Partition {
    pub fn new(groups: Vec<Vec<Point>>) -> Self {
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn flatten(&self) -> impl Iterator<Item = &Point> {
        self.groups.iter().flatten()
    }

    /// 展开后的点是否恰好是输入的每个点各一次
    pub fn covers_exactly(&self, input: &[Point]) -> bool {
        let mut used = vec![false; input.len()];
        for member in self.flatten() {
            match (0..input.len()).find(|&i| !used[i] && input[i] == *member) {
                Some(i) => used[i] = true,
                None => return false,
            }
        }
        used.into_iter().all(|u| u)
    }
}
