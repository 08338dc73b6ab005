// ==========================================
// Moteur de chiffrage devis - Connexion SQLite
// ==========================================
// Objectif:
// - PRAGMA unifiés pour toutes les ouvertures de connexion
// - busy_timeout unique pour limiter les erreurs busy ponctuelles
// ==========================================

use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

/// busy_timeout par défaut (millisecondes)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// PRAGMA unifiés d'une connexion SQLite
///
/// foreign_keys et busy_timeout se configurent par connexion.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Ouvre une connexion SQLite avec la configuration unifiée
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Ouvre une connexion en mémoire (tests)
pub fn open_in_memory_connection() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Chemin par défaut de la base des instantanés
///
/// Répertoire de données utilisateur, repli sur le répertoire courant.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devis-engine")
        .join("devis.db")
}
