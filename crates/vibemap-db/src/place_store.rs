//! Place document persistence.
//!
//! Documents are stored verbatim in `places.document`; the `city` column
//! mirrors the document's `city` field and is what location queries
//! match on, exactly and case-sensitively.

use serde_json::Value;
use sqlx::PgPool;
use vibemap_core::error::StoreError;
use vibemap_core::store::{PlaceStore, RawPlace};
use vibemap_types::PlaceId;

use crate::error::DbError;
use crate::postgres::PostgresPool;

const UPSERT_PLACE: &str = r"INSERT INTO places (id, city, document)
    VALUES ($1, $2, $3)
    ON CONFLICT (id) DO UPDATE
    SET city = EXCLUDED.city, document = EXCLUDED.document, updated_at = now()";

/// A row from the `places` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlaceRow {
    /// Place identifier.
    pub id: String,
    /// Location key the place belongs to.
    pub city: String,
    /// Raw place document.
    pub document: Value,
}

impl From<PlaceRow> for RawPlace {
    fn from(row: PlaceRow) -> Self {
        Self::new(row.id, row.document)
    }
}

/// Operations on the `places` table.
#[derive(Debug, Clone)]
pub struct PgPlaceStore {
    pool: PostgresPool,
}

impl PgPlaceStore {
    /// Create a place store over a connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    fn pg(&self) -> &PgPool {
        self.pool.pool()
    }

    /// All places whose `city` equals `location_key`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn rows_in(&self, location_key: &str) -> Result<Vec<PlaceRow>, DbError> {
        let rows = sqlx::query_as::<_, PlaceRow>(
            r"SELECT id, city, document
              FROM places
              WHERE city = $1
              ORDER BY id",
        )
        .bind(location_key)
        .fetch_all(self.pg())
        .await?;

        tracing::debug!(location_key, count = rows.len(), "Queried places");
        Ok(rows)
    }

    /// A single place by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn row_by_id(&self, id: &PlaceId) -> Result<Option<PlaceRow>, DbError> {
        let row = sqlx::query_as::<_, PlaceRow>(
            r"SELECT id, city, document
              FROM places
              WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.pg())
        .await?;

        Ok(row)
    }

    /// Insert a place, replacing the document if the id already exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidDocument`] if the document has no
    /// string `city`, or [`DbError::Postgres`] if the write fails.
    pub async fn upsert(&self, place: &RawPlace) -> Result<(), DbError> {
        let city = city_of(place)?;

        sqlx::query(UPSERT_PLACE)
            .bind(&place.id)
            .bind(city)
            .bind(&place.document)
            .execute(self.pg())
            .await?;

        Ok(())
    }

    /// Upsert many places in one transaction. Returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on the first failing document; nothing is
    /// committed in that case.
    pub async fn upsert_all(&self, places: &[RawPlace]) -> Result<usize, DbError> {
        let mut tx = self.pg().begin().await?;
        for place in places {
            let city = city_of(place)?;
            sqlx::query(UPSERT_PLACE)
                .bind(&place.id)
                .bind(city)
                .bind(&place.document)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(count = places.len(), "Seeded places");
        Ok(places.len())
    }
}

fn city_of(place: &RawPlace) -> Result<&str, DbError> {
    place
        .city()
        .ok_or_else(|| DbError::InvalidDocument(format!("place {} has no city", place.id)))
}

impl PlaceStore for PgPlaceStore {
    async fn places_in(&self, location_key: &str) -> Result<Vec<RawPlace>, StoreError> {
        let rows = self.rows_in(location_key).await?;
        Ok(rows.into_iter().map(RawPlace::from).collect())
    }

    async fn place_by_id(&self, id: &PlaceId) -> Result<Option<RawPlace>, StoreError> {
        let row = self.row_by_id(id).await?;
        Ok(row.map(RawPlace::from))
    }
}
