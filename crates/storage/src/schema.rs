use crate::error::StorageError;
use crate::traits::MasterStore;

/// Create the minimal tables the read layer expects, with zero rows.
///
/// Used only when both bootstrap and network sync have failed and no
/// queryable database exists: downstream queries then return empty results
/// instead of failing on a missing table.
pub fn init_fallback_schema(store: &mut dyn MasterStore) -> Result<(), StorageError> {
    store.execute_batch(FALLBACK_SCHEMA_SQL)
}

const FALLBACK_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS master_points (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_kana TEXT,
    region_name TEXT,
    zone_name TEXT,
    area_name TEXT,
    latitude REAL,
    longitude REAL,
    level TEXT,
    max_depth REAL,
    entry_type TEXT,
    current_condition TEXT,
    description TEXT,
    features_json TEXT,
    images_json TEXT,
    image_url TEXT,
    rating REAL,
    bookmark_count INTEGER,
    search_text TEXT
);
CREATE INDEX IF NOT EXISTS idx_points_search ON master_points (search_text);

CREATE TABLE IF NOT EXISTS master_creatures (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_kana TEXT,
    scientific_name TEXT,
    english_name TEXT,
    category TEXT,
    family TEXT,
    rarity TEXT,
    size TEXT,
    description TEXT,
    tags_json TEXT,
    season_json TEXT,
    depth_range_json TEXT,
    image_url TEXT,
    search_text TEXT
);
CREATE INDEX IF NOT EXISTS idx_creatures_search ON master_creatures (search_text);

CREATE TABLE IF NOT EXISTS master_geography (
    id TEXT PRIMARY KEY,
    region_name TEXT,
    zone_name TEXT,
    area_name TEXT,
    country TEXT
);

CREATE TABLE IF NOT EXISTS master_point_creatures (
    point_id TEXT NOT NULL,
    creature_id TEXT NOT NULL,
    frequency TEXT,
    season_json TEXT,
    PRIMARY KEY (point_id, creature_id)
);

CREATE TABLE IF NOT EXISTS master_point_reviews (
    id TEXT PRIMARY KEY,
    point_id TEXT NOT NULL,
    user_id TEXT,
    rating REAL,
    comment TEXT,
    tags TEXT,
    images TEXT,
    metrics TEXT,
    condition TEXT,
    radar TEXT,
    helpful_count INTEGER,
    status TEXT,
    created_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_reviews_point ON master_point_reviews (point_id);

CREATE TABLE IF NOT EXISTS master_recent_logs (
    id TEXT PRIMARY KEY,
    point_id TEXT,
    user_id TEXT,
    dive_date TEXT,
    depth_m REAL,
    duration_min INTEGER,
    visibility_m REAL,
    water_temp_c REAL,
    comment TEXT,
    created_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_recent_logs_point ON master_recent_logs (point_id);
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteStore;

    #[test]
    fn fallback_schema_makes_core_tables_queryable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("master.db")).unwrap();
        init_fallback_schema(&mut store).unwrap();

        for table in [
            "master_points",
            "master_creatures",
            "master_geography",
            "master_point_creatures",
            "master_point_reviews",
            "master_recent_logs",
        ] {
            let rows = store
                .query_all(&format!("SELECT * FROM {table}"), &[])
                .unwrap();
            assert!(rows.is_empty(), "{table} should exist and be empty");
        }
    }

    #[test]
    fn fallback_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("master.db")).unwrap();
        init_fallback_schema(&mut store).unwrap();
        init_fallback_schema(&mut store).unwrap();
    }
}
