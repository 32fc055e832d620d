use serde::{Deserialize, Serialize};

/// 一个带名字的地理编码位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

/// 搜索产生的临时候选位置，尚未命名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionCandidate {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn from_candidate(candidate: SelectionCandidate, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: candidate.address,
            lat: candidate.lat,
            lng: candidate.lng,
        }
    }

    /// 去重键：经纬度逐位相等，不做距离阈值
    pub fn same_location(&self, lat: f64, lng: f64) -> bool {
        self.lat == lat && self.lng == lng
    }

    /// 服务端校验：名字非空、坐标有限且在合法范围内
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("point name must not be empty".to_string());
        }
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude out of range: {}", self.lat));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(format!("longitude out of range: {}", self.lng));
        }
        Ok(())
    }
}

/// 序列中是否已有相同坐标的点
pub fn contains_location(points: &[Point], lat: f64, lng: f64) -> bool {
    points.iter().any(|p| p.same_location(lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(name: &str, lat: f64, lng: f64) -> Point {
        Point {
            name: name.to_string(),
            address: format!("{} street", name),
            lat,
            lng,
        }
    }

    #[test]
    fn same_location_is_exact() {
        let p = point("chow", 34.0644661, -118.2975625);
        assert!(p.same_location(34.0644661, -118.2975625));
        assert!(!p.same_location(34.06446610001, -118.2975625));
    }

    #[test]
    fn validate_rejects_blank_name_and_bad_coordinates() {
        assert!(point("a", 1.0, 1.0).validate().is_ok());
        assert!(point("   ", 1.0, 1.0).validate().is_err());
        assert!(point("a", 91.0, 1.0).validate().is_err());
        assert!(point("a", 1.0, -180.5).validate().is_err());
        assert!(point("a", f64::NAN, 1.0).validate().is_err());
    }

    #[test]
    fn from_candidate_keeps_coordinates() {
        let candidate = SelectionCandidate {
            address: "333 S Catalina St".to_string(),
            lat: 34.0679067,
            lng: -118.2956938,
        };
        let p = Point::from_candidate(candidate, "mow");
        assert_eq!(p.name, "mow");
        assert_eq!(p.address, "333 S Catalina St");
        assert!(p.same_location(34.0679067, -118.2956938));
    }
}
