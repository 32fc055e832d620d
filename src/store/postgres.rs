use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, PgExecutor, PgPool};

use super::{GroupRepository, StoreError};
use crate::models::{Group, Point};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS groups (
    id TEXT PRIMARY KEY,
    join_code TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS group_points (
    seq BIGSERIAL PRIMARY KEY,
    group_id TEXT NOT NULL REFERENCES groups (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    lat DOUBLE PRECISION NOT NULL,
    lng DOUBLE PRECISION NOT NULL,
    UNIQUE (group_id, lat, lng)
);
"#;

#[derive(Debug, FromRow)]
struct GroupRow {
    id: String,
    join_code: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PointRow {
    name: String,
    address: String,
    lat: f64,
    lng: f64,
}

impl From<PointRow> for Point {
    fn from(row: PointRow) -> Self {
        Self {
            name: row.name,
            address: row.address,
            lat: row.lat,
            lng: row.lng,
        }
    }
}

impl GroupRow {
    fn into_group(self, points: Vec<Point>) -> Group {
        Group {
            id: self.id,
            join_code: self.join_code,
            points,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL 实现。
///
/// 点存放在 `group_points` 表中，`(group_id, lat, lng)` 唯一约束负责去重；
/// 追加时对群组行加 `FOR UPDATE` 锁，同一群组的并发加入因此串行执行。
#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 建表（幂等）
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        self.pool.execute(SCHEMA).await?;
        Ok(())
    }
}

async fn insert_point<'e, E: PgExecutor<'e>>(
    executor: E,
    group_id: &str,
    point: &Point,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO group_points (group_id, name, address, lat, lng)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (group_id, lat, lng) DO NOTHING
        "#,
    )
    .bind(group_id)
    .bind(&point.name)
    .bind(&point.address)
    .bind(point.lat)
    .bind(point.lng)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn load_points<'e, E: PgExecutor<'e>>(
    executor: E,
    group_id: &str,
) -> Result<Vec<Point>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PointRow>(
        r#"
        SELECT name, address, lat, lng
        FROM group_points
        WHERE group_id = $1
        ORDER BY seq
        "#,
    )
    .bind(group_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Point::from).collect())
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn insert(&self, group: &Group) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO groups (id, join_code, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (join_code) DO NOTHING
            "#,
        )
        .bind(&group.id)
        .bind(&group.join_code)
        .bind(group.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for point in &group.points {
            if !insert_point(&mut *tx, &group.id, point).await? {
                tx.rollback().await?;
                return Err(StoreError::DuplicatePoint {
                    lat: point.lat,
                    lng: point.lng,
                });
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn find_by_join_code(&self, join_code: &str) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, join_code, created_at
            FROM groups
            WHERE join_code = $1
            "#,
        )
        .bind(join_code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let points = load_points(&self.pool, &row.id).await?;
                Ok(Some(row.into_group(points)))
            }
            None => Ok(None),
        }
    }

    async fn append_point(&self, join_code: &str, point: &Point) -> Result<Group, StoreError> {
        let mut tx = self.pool.begin().await?;

        // 锁住群组行，同一群组的追加在此排队
        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, join_code, created_at
            FROM groups
            WHERE join_code = $1
            FOR UPDATE
            "#,
        )
        .bind(join_code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(join_code.to_string()))?;

        if !insert_point(&mut *tx, &row.id, point).await? {
            tx.rollback().await?;
            return Err(StoreError::DuplicatePoint {
                lat: point.lat,
                lng: point.lng,
            });
        }

        let points = load_points(&mut *tx, &row.id).await?;
        tx.commit().await?;

        Ok(row.into_group(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GroupStore;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;

    fn point(name: &str, lat: f64, lng: f64) -> Point {
        Point {
            name: name.to_string(),
            address: format!("{} avenue", name),
            lat,
            lng,
        }
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL instance in DATABASE_URL"]
    async fn postgres_create_join_roundtrip() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPoolOptions::new().max_connections(4).connect(&url).await.unwrap();
        let repo = PgGroupRepository::new(pool);
        repo.ensure_schema().await.unwrap();
        let store = GroupStore::new(Arc::new(repo), Duration::from_secs(5));

        let group = store
            .create_group(vec![point("a", 10.5, 20.25)])
            .await
            .unwrap();

        let (left, right) = tokio::join!(
            store.join_group(&group.join_code, point("b", 11.0, 21.0)),
            store.join_group(&group.join_code, point("c", 12.0, 22.0)),
        );
        left.unwrap();
        right.unwrap();

        let err = store
            .join_group(&group.join_code, point("dup", 10.5, 20.25))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePoint { .. }));

        let found = store.find_group(&group.join_code).await.unwrap();
        assert_eq!(found.points.len(), 3);
        assert_eq!(found.points[0], point("a", 10.5, 20.25));
    }
}
