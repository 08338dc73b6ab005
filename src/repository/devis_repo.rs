// ==========================================
// Moteur de chiffrage devis - Entrepôt d'instantanés
// ==========================================
// Responsabilité: persister/relire les instantanés de devis,
// aucune règle métier. Requêtes paramétrées uniquement.
// Stockage: une ligne par capture, charge utile JSON.
// ==========================================

use crate::domain::snapshot::DevisSnapshot;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// SnapshotMeta - Métadonnées d'une capture
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub snapshot_id: String,
    pub devis_id: String,
    pub saved_at: DateTime<Utc>,
}

// ==========================================
// DevisSnapshotRepository - Entrepôt d'instantanés
// ==========================================
pub struct DevisSnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DevisSnapshotRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS devis_snapshot (
              snapshot_id TEXT PRIMARY KEY,
              devis_id TEXT NOT NULL,
              payload_json TEXT NOT NULL,
              saved_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_devis_snapshot_devis
              ON devis_snapshot(devis_id, saved_at);
            "#,
        )?;
        Ok(())
    }

    /// Persiste une capture et retourne son identifiant
    pub fn save(&self, snapshot: &DevisSnapshot) -> RepositoryResult<String> {
        let snapshot_id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(snapshot)?;
        let saved_at = Utc::now();
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO devis_snapshot (snapshot_id, devis_id, payload_json, saved_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![snapshot_id, snapshot.devis_id, payload, saved_at.to_rfc3339()],
        )?;
        Ok(snapshot_id)
    }

    /// Relit une capture par identifiant
    pub fn load(&self, snapshot_id: &str) -> RepositoryResult<DevisSnapshot> {
        let conn = self.get_conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload_json FROM devis_snapshot WHERE snapshot_id = ?1",
                params![snapshot_id],
                |row| row.get(0),
            )
            .optional()?;
        let payload = payload.ok_or_else(|| RepositoryError::NotFound {
            entity: "instantané".to_string(),
            id: snapshot_id.to_string(),
        })?;
        Ok(serde_json::from_str(&payload)?)
    }

    /// Relit la dernière capture d'un devis, s'il y en a une
    pub fn load_latest(&self, devis_id: &str) -> RepositoryResult<Option<DevisSnapshot>> {
        let conn = self.get_conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload_json FROM devis_snapshot
                 WHERE devis_id = ?1 ORDER BY saved_at DESC LIMIT 1",
                params![devis_id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Liste les captures d'un devis, de la plus récente à la plus ancienne
    pub fn list(&self, devis_id: &str) -> RepositoryResult<Vec<SnapshotMeta>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT snapshot_id, devis_id, saved_at FROM devis_snapshot
             WHERE devis_id = ?1 ORDER BY saved_at DESC",
        )?;
        let rows = stmt.query_map(params![devis_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut metas = Vec::new();
        for row in rows {
            let (snapshot_id, devis_id, saved_at) = row?;
            let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc);
            metas.push(SnapshotMeta {
                snapshot_id,
                devis_id,
                saved_at,
            });
        }
        Ok(metas)
    }
}
