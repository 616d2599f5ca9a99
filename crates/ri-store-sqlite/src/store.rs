//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use ri_core::{
  inspection::{IngestOutcome, Inspection, NewInspection},
  linkage::{ClusterCommit, LinkageEdge, MentionMatch, MergeOutcome},
  restaurant::{NewRestaurant, RestaurantId, RestaurantRecord},
  store::{BoundingBox, RecordStore},
};

use crate::{
  encode::{
    encode_date, kind_from_column, mention_match_from_row, restaurant_from_row, RawInspection,
    NOT_ABSORBED, RESTAURANT_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

const INSERT_RESTAURANT: &str = "INSERT INTO restaurants (
    name, facility_type, address, city, state, zip, latitude, longitude, clean
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A restaurant catalog backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a restaurant query with the given trailing SQL and parameters.
  async fn query_restaurants(
    &self,
    tail: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<RestaurantRecord>> {
    let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants {tail}");
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), restaurant_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Run a query returning a single column of restaurant ids.
  async fn query_ids(
    &self,
    sql: &'static str,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<RestaurantId>> {
    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
          .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids.into_iter().map(RestaurantId).collect())
  }
}

fn zip_value(zip: Option<String>) -> rusqlite::types::Value {
  zip.map_or(rusqlite::types::Value::Null, rusqlite::types::Value::Text)
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Restaurants ───────────────────────────────────────────────────────────

  async fn insert_restaurant(&self, input: NewRestaurant) -> Result<RestaurantRecord> {
    let row = input.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          INSERT_RESTAURANT,
          rusqlite::params![
            row.name,
            row.facility_type,
            row.address,
            row.city,
            row.state,
            row.zip,
            row.latitude,
            row.longitude,
            row.clean,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(RestaurantRecord {
      id:            RestaurantId(id),
      name:          input.name,
      facility_type: input.facility_type,
      address:       input.address,
      city:          input.city,
      state:         input.state,
      zip:           input.zip,
      latitude:      input.latitude,
      longitude:     input.longitude,
      clean:         input.clean,
    })
  }

  async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<RestaurantRecord>> {
    let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = ?1");
    let record = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id.0], restaurant_from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(record)
  }

  async fn list_restaurants(&self) -> Result<Vec<RestaurantRecord>> {
    self
      .query_restaurants(format!("WHERE {NOT_ABSORBED} ORDER BY id"), vec![])
      .await
  }

  async fn list_unresolved(
    &self,
    zip: Option<Option<String>>,
  ) -> Result<Vec<RestaurantRecord>> {
    match zip {
      Some(zip) => {
        self
          .query_restaurants(
            format!("WHERE clean = 0 AND zip IS ?1 AND {NOT_ABSORBED} ORDER BY id"),
            vec![zip_value(zip)],
          )
          .await
      }
      None => {
        self
          .query_restaurants(format!("WHERE clean = 0 AND {NOT_ABSORBED} ORDER BY id"), vec![])
          .await
      }
    }
  }

  async fn list_restaurants_by_zip(
    &self,
    zip: Option<String>,
  ) -> Result<Vec<RestaurantRecord>> {
    self
      .query_restaurants(
        format!("WHERE zip IS ?1 AND {NOT_ABSORBED} ORDER BY id"),
        vec![zip_value(zip)],
      )
      .await
  }

  async fn mark_resolved(&self, ids: Vec<RestaurantId>) -> Result<()> {
    if ids.is_empty() {
      return Ok(());
    }
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare("UPDATE restaurants SET clean = 1 WHERE id = ?1")?;
          for id in &ids {
            stmt.execute(rusqlite::params![id.0])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Inspections ───────────────────────────────────────────────────────────

  async fn record_inspection(
    &self,
    restaurant: NewRestaurant,
    inspection: NewInspection,
  ) -> Result<IngestOutcome> {
    let date_str = inspection.date.map(encode_date);

    let (restaurant_id, restaurant_created, inspection_created) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // A known inspection id keeps its owner; the row writes nothing.
        let owner: Option<i64> = tx
          .query_row(
            "SELECT restaurant_id FROM inspections WHERE id = ?1",
            rusqlite::params![inspection.id],
            |row| row.get(0),
          )
          .optional()?;
        if let Some(owner) = owner {
          return Ok((owner, false, false));
        }

        // Follow linkage edges so feed rows for an absorbed record land on
        // the live canonical record instead.
        let existing: Option<i64> = tx
          .query_row(
            "WITH RECURSIVE chain(id) AS (
               SELECT id FROM restaurants WHERE name = ?1 AND address = ?2
               UNION
               SELECT l.primary_rest_id FROM linked l
               JOIN chain c ON l.original_rest_id = c.id
             )
             SELECT id FROM chain
             WHERE id NOT IN (SELECT original_rest_id FROM linked)
             ORDER BY id LIMIT 1",
            rusqlite::params![restaurant.name, restaurant.address],
            |row| row.get(0),
          )
          .optional()?;

        let (restaurant_id, restaurant_created) = match existing {
          Some(id) => (id, false),
          None => {
            tx.execute(
              INSERT_RESTAURANT,
              rusqlite::params![
                restaurant.name,
                restaurant.facility_type,
                restaurant.address,
                restaurant.city,
                restaurant.state,
                restaurant.zip,
                restaurant.latitude,
                restaurant.longitude,
                false,
              ],
            )?;
            (tx.last_insert_rowid(), true)
          }
        };

        tx.execute(
          "INSERT INTO inspections (
             id, risk, inspection_date, inspection_type, results, violations,
             restaurant_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            inspection.id,
            inspection.risk,
            date_str,
            inspection.inspection_type,
            inspection.results,
            inspection.violations,
            restaurant_id,
          ],
        )?;

        tx.commit()?;
        Ok((restaurant_id, restaurant_created, true))
      })
      .await?;

    Ok(IngestOutcome {
      restaurant_id: RestaurantId(restaurant_id),
      restaurant_created,
      inspection_created,
    })
  }

  async fn get_inspection(&self, id: String) -> Result<Option<Inspection>> {
    let sql = format!("SELECT {} FROM inspections WHERE id = ?1", RawInspection::COLUMNS);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawInspection::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawInspection::into_inspection).transpose()
  }

  async fn inspections_for(&self, restaurant_id: RestaurantId) -> Result<Vec<Inspection>> {
    let sql = format!(
      "SELECT {} FROM inspections WHERE restaurant_id = ?1 ORDER BY id",
      RawInspection::COLUMNS
    );
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![restaurant_id.0], RawInspection::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawInspection::into_inspection).collect()
  }

  async fn count_inspections(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM inspections", [], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }

  // ── Linkage ───────────────────────────────────────────────────────────────

  async fn commit_cluster(&self, commit: ClusterCommit) -> Result<MergeOutcome> {
    if commit.originals.is_empty() {
      return Err(Error::EmptyCluster);
    }
    let ClusterCommit { canonical, originals } = commit;
    let original_ids: Vec<i64> = originals.iter().map(|id| id.0).collect();

    let (primary, relinked) = self
      .conn
      .call(move |conn| {
        // Dropping `tx` on any early return rolls the whole cluster back.
        let tx = conn.transaction()?;
        tx.execute(
          INSERT_RESTAURANT,
          rusqlite::params![
            canonical.name,
            canonical.facility_type,
            canonical.address,
            canonical.city,
            canonical.state,
            canonical.zip,
            canonical.latitude,
            canonical.longitude,
            true,
          ],
        )?;
        let primary = tx.last_insert_rowid();

        let mut relinked = 0usize;
        for original in &original_ids {
          tx.execute(
            "INSERT INTO linked (primary_rest_id, original_rest_id) VALUES (?1, ?2)",
            rusqlite::params![primary, original],
          )?;
          relinked += tx.execute(
            "UPDATE inspections SET restaurant_id = ?1 WHERE restaurant_id = ?2",
            rusqlite::params![primary, original],
          )?;
          tx.execute(
            "UPDATE restaurants SET clean = 1 WHERE id = ?1",
            rusqlite::params![original],
          )?;
        }

        tx.commit()?;
        Ok((primary, relinked))
      })
      .await?;

    let primary = RestaurantId(primary);
    Ok(MergeOutcome {
      primary,
      edges: originals
        .into_iter()
        .map(|original| LinkageEdge { primary, original })
        .collect(),
      relinked_inspections: relinked,
    })
  }

  async fn linkage_for(&self, primary: RestaurantId) -> Result<Vec<LinkageEdge>> {
    let pairs: Vec<(i64, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT primary_rest_id, original_rest_id FROM linked
           WHERE primary_rest_id = ?1 ORDER BY original_rest_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![primary.0], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      pairs
        .into_iter()
        .map(|(p, o)| LinkageEdge { primary: RestaurantId(p), original: RestaurantId(o) })
        .collect(),
    )
  }

  // ── Mentions ──────────────────────────────────────────────────────────────

  async fn restaurants_named(&self, candidates: Vec<String>) -> Result<Vec<RestaurantId>> {
    if candidates.is_empty() {
      return Ok(Vec::new());
    }
    let candidates_json = serde_json::to_string(&candidates)?;
    self
      .query_ids(
        "SELECT id FROM restaurants
         WHERE LOWER(name) IN (SELECT LOWER(value) FROM json_each(?1))
           AND id NOT IN (SELECT original_rest_id FROM linked)
         ORDER BY id",
        vec![rusqlite::types::Value::Text(candidates_json)],
      )
      .await
  }

  async fn restaurants_within(&self, bounds: BoundingBox) -> Result<Vec<RestaurantId>> {
    self
      .query_ids(
        "SELECT id FROM restaurants
         WHERE latitude  BETWEEN ?1 AND ?2
           AND longitude BETWEEN ?3 AND ?4
           AND id NOT IN (SELECT original_rest_id FROM linked)
         ORDER BY id",
        vec![
          bounds.min_latitude.into(),
          bounds.max_latitude.into(),
          bounds.min_longitude.into(),
          bounds.max_longitude.into(),
        ],
      )
      .await
  }

  async fn record_mention_matches(
    &self,
    matches: Vec<MentionMatch>,
  ) -> Result<Vec<MentionMatch>> {
    if matches.is_empty() {
      return Ok(Vec::new());
    }

    let stored = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut stored = Vec::with_capacity(matches.len());
        {
          let mut existing = tx.prepare(
            "SELECT kind FROM mention_matches WHERE restaurant_id = ?1 AND mention_key = ?2",
          )?;
          let mut upsert = tx.prepare(
            "INSERT INTO mention_matches (restaurant_id, mention_key, kind)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (restaurant_id, mention_key) DO UPDATE SET kind = excluded.kind",
          )?;
          for m in matches {
            let previous = existing
              .query_row(rusqlite::params![m.restaurant_id.0, m.mention_key], |row| {
                kind_from_column(row, 0)
              })
              .optional()?;
            let kind = previous.map_or(m.kind, |p| p.merge(m.kind));
            upsert.execute(rusqlite::params![m.restaurant_id.0, m.mention_key, kind.as_str()])?;
            stored.push(MentionMatch { kind, ..m });
          }
        }
        tx.commit()?;
        Ok(stored)
      })
      .await?;
    Ok(stored)
  }

  async fn mention_matches_for(&self, restaurant_id: RestaurantId) -> Result<Vec<MentionMatch>> {
    let matches = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT restaurant_id, mention_key, kind FROM mention_matches
           WHERE restaurant_id = ?1 ORDER BY mention_key",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![restaurant_id.0], mention_match_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(matches)
  }
}
