//! Durable per-owner state.
//!
//! The session treats storage as write-behind: in-memory state is
//! authoritative, saves that fail surface as warnings and are retried
//! on the next opportunity, and a missing record just means a first
//! run.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::error::{GameError, Result};
use crate::ids::OwnerKey;
use crate::inventory::Inventory;
use crate::progress::PlayerProgress;

/// Device-level toggles the core stores but never interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub inventory: Inventory,
    pub progress: PlayerProgress,
    pub settings: Settings,
}

/// Storage boundary. Implementations must tolerate unknown owners
/// (load returns `None`) and concurrent sessions are out of scope.
pub trait StateStore: Send + Sync {
    fn load<'a>(
        &'a self,
        owner: &'a OwnerKey,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PersistedState>>> + Send + 'a>>;

    fn save<'a>(
        &'a self,
        owner: &'a OwnerKey,
        state: &'a PersistedState,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn clear<'a>(
        &'a self,
        owner: &'a OwnerKey,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// HashMap-backed store for tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<OwnerKey, PersistedState>>,
}

impl MemoryStore {
    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<OwnerKey, PersistedState>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryStore {
    fn load<'a>(
        &'a self,
        owner: &'a OwnerKey,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PersistedState>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.records().get(owner).cloned()) })
    }

    fn save<'a>(
        &'a self,
        owner: &'a OwnerKey,
        state: &'a PersistedState,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.records().insert(owner.clone(), state.clone());
            Ok(())
        })
    }

    fn clear<'a>(
        &'a self,
        owner: &'a OwnerKey,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.records().remove(owner);
            Ok(())
        })
    }
}

// ============================================================================
// SQLite store
// ============================================================================

const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS hunt_state (
    owner      TEXT PRIMARY KEY,
    payload    TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS inventory (
    owner       TEXT NOT NULL,
    ghost_id    TEXT NOT NULL,
    kind        TEXT NOT NULL,
    points      INTEGER NOT NULL,
    captured_at TEXT NOT NULL,
    PRIMARY KEY (owner, ghost_id)
);
";

/// One JSON payload row per owner, with inventory items additionally
/// materialized into their own table for per-kind queries.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Deposited-inventory breakdown per kind, straight off the
    /// materialized table.
    pub async fn kind_counts(&self, owner: &OwnerKey) -> Result<Vec<(String, u32)>> {
        let conn = Arc::clone(&self.conn);
        let owner = owner.clone();
        run_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            let mut stmt = conn.prepare(
                "SELECT kind, COUNT(*) FROM inventory WHERE owner = ?1 GROUP BY kind ORDER BY kind",
            )?;
            let rows = stmt.query_map([owner.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Into::into)
        })
        .await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|e| GameError::Persistence(format!("storage task failed: {e}")))?
}

fn load_blocking(conn: &Mutex<Connection>, owner: &OwnerKey) -> Result<Option<PersistedState>> {
    let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM hunt_state WHERE owner = ?1",
            [owner.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match payload {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn save_blocking(conn: &Mutex<Connection>, owner: &OwnerKey, state: &PersistedState) -> Result<()> {
    let json = serde_json::to_string(state)?;
    let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO hunt_state (owner, payload, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(owner) DO UPDATE SET payload = excluded.payload,
                                          updated_at = excluded.updated_at",
        rusqlite::params![owner.as_str(), json, chrono::Utc::now().to_rfc3339()],
    )?;

    tx.execute("DELETE FROM inventory WHERE owner = ?1", [owner.as_str()])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO inventory (owner, ghost_id, kind, points, captured_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for item in state.inventory.items() {
            stmt.execute(rusqlite::params![
                owner.as_str(),
                item.ghost_id.as_str(),
                item.kind.as_ref(),
                item.points,
                item.captured_at.to_rfc3339(),
            ])?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn clear_blocking(conn: &Mutex<Connection>, owner: &OwnerKey) -> Result<()> {
    let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM hunt_state WHERE owner = ?1", [owner.as_str()])?;
    tx.execute("DELETE FROM inventory WHERE owner = ?1", [owner.as_str()])?;
    tx.commit()?;
    Ok(())
}

impl StateStore for SqliteStore {
    fn load<'a>(
        &'a self,
        owner: &'a OwnerKey,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PersistedState>>> + Send + 'a>> {
        let conn = Arc::clone(&self.conn);
        let owner = owner.clone();
        Box::pin(run_blocking(move || load_blocking(&conn, &owner)))
    }

    fn save<'a>(
        &'a self,
        owner: &'a OwnerKey,
        state: &'a PersistedState,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let conn = Arc::clone(&self.conn);
        let owner = owner.clone();
        let state = state.clone();
        Box::pin(run_blocking(move || save_blocking(&conn, &owner, &state)))
    }

    fn clear<'a>(
        &'a self,
        owner: &'a OwnerKey,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let conn = Arc::clone(&self.conn);
        let owner = owner.clone();
        Box::pin(run_blocking(move || clear_blocking(&conn, &owner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::ghost::GhostKind;
    use crate::ids::GhostId;
    use crate::inventory::InventoryItem;
    use chrono::{TimeZone, Utc};

    fn sample_state() -> PersistedState {
        let cfg = GameConfig::default();
        let mut state = PersistedState::default();
        state.progress.points = 120;
        state.progress.level = 2;
        state.progress.ghosts_deposited = 7;
        state
            .inventory
            .add(
                InventoryItem {
                    ghost_id: GhostId::new("ghost-s1"),
                    kind: GhostKind::Strong,
                    captured_at: Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap(),
                    points: 27,
                    owner: OwnerKey::new("tester"),
                },
                &state.progress,
                &cfg.inventory,
            )
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::default();
        let owner = OwnerKey::new("tester");
        let state = sample_state();

        assert!(store.load(&owner).await.unwrap().is_none());

        store.save(&owner, &state).await.unwrap();
        let loaded = store.load(&owner).await.unwrap().unwrap();
        assert_eq!(loaded, state);

        store.clear(&owner).await.unwrap();
        assert!(store.load(&owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_isolates_owners() {
        let store = MemoryStore::default();
        store
            .save(&OwnerKey::new("a"), &sample_state())
            .await
            .unwrap();

        assert!(store.load(&OwnerKey::new("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = OwnerKey::new("tester");
        let state = sample_state();

        assert!(store.load(&owner).await.unwrap().is_none());

        store.save(&owner, &state).await.unwrap();
        let loaded = store.load(&owner).await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_sqlite_save_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = OwnerKey::new("tester");

        store.save(&owner, &sample_state()).await.unwrap();

        let mut newer = sample_state();
        newer.progress.points = 500;
        newer.inventory.clear();
        store.save(&owner, &newer).await.unwrap();

        let loaded = store.load(&owner).await.unwrap().unwrap();
        assert_eq!(loaded.progress.points, 500);
        assert!(loaded.inventory.is_empty());
        assert!(store.kind_counts(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_kind_counts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = OwnerKey::new("tester");
        store.save(&owner, &sample_state()).await.unwrap();

        let counts = store.kind_counts(&owner).await.unwrap();
        assert_eq!(counts, vec![("strong".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_sqlite_clear_removes_owner_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = OwnerKey::new("tester");
        store.save(&owner, &sample_state()).await.unwrap();

        store.clear(&owner).await.unwrap();
        assert!(store.load(&owner).await.unwrap().is_none());
        assert!(store.kind_counts(&owner).await.unwrap().is_empty());
    }
}
