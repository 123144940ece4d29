//! SQLite settings-table activation store.

use super::{ActivationState, ActivationStore, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

const KEY_ACTIVE_PLUGINS: &str = "active_plugins";
const KEY_ACTIVE_THEME: &str = "active_theme";

/// Stores activation state as rows of the `settings` table.
///
/// `active_plugins` holds a JSON array; `active_theme` holds the theme id and
/// is absent when no theme is selected.
pub struct SqliteActivationStore {
    conn: Mutex<Connection>,
}

impl SqliteActivationStore {
    /// Opens the database at `path`, applying migrations first.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection that already has migrations applied.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

fn read_setting(conn: &Connection, key: &str) -> StorageResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1;",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()?)
}

impl ActivationStore for SqliteActivationStore {
    fn load(&self) -> StorageResult<ActivationState> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let active_plugins = match read_setting(&conn, KEY_ACTIVE_PLUGINS)? {
            Some(raw) => serde_json::from_str::<BTreeSet<String>>(&raw).map_err(|err| {
                StorageError::Corrupt(format!("setting `{KEY_ACTIVE_PLUGINS}`: {err}"))
            })?,
            None => BTreeSet::new(),
        };
        let active_theme =
            read_setting(&conn, KEY_ACTIVE_THEME)?.filter(|value| !value.trim().is_empty());

        Ok(ActivationState {
            active_plugins,
            active_theme,
        })
    }

    fn save(&self, state: &ActivationState) -> StorageResult<()> {
        let plugins = serde_json::to_string(&state.active_plugins)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;

        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO settings (key, value, value_type, group_name)
             VALUES (?1, ?2, 'json', 'plugins')
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CAST(strftime('%s', 'now') AS INTEGER);",
            params![KEY_ACTIVE_PLUGINS, plugins],
        )?;
        match state.active_theme.as_deref() {
            Some(theme) => {
                tx.execute(
                    "INSERT INTO settings (key, value, value_type, group_name)
                     VALUES (?1, ?2, 'string', 'themes')
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = CAST(strftime('%s', 'now') AS INTEGER);",
                    params![KEY_ACTIVE_THEME, theme],
                )?;
            }
            None => {
                tx.execute(
                    "DELETE FROM settings WHERE key = ?1;",
                    [KEY_ACTIVE_THEME],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteActivationStore;
    use crate::activation::{ActivationState, ActivationStore, StorageError};
    use rusqlite::params;

    #[test]
    fn empty_database_loads_default_state() {
        let store = SqliteActivationStore::open_in_memory().unwrap();
        assert_eq!(store.load().unwrap(), ActivationState::default());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buni.sqlite3");

        let mut state = ActivationState::default();
        state.activate_plugin("seo");
        state.activate_plugin("social-share");
        state.active_theme = Some("dsccore".to_string());
        SqliteActivationStore::open(&path)
            .unwrap()
            .save(&state)
            .unwrap();

        let reopened = SqliteActivationStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), state);
    }

    #[test]
    fn clearing_theme_removes_the_row() {
        let store = SqliteActivationStore::open_in_memory().unwrap();
        let mut state = ActivationState {
            active_theme: Some("dsccore".to_string()),
            ..ActivationState::default()
        };
        store.save(&state).unwrap();

        state.active_theme = None;
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap().active_theme, None);
    }

    #[test]
    fn corrupt_plugin_list_is_reported() {
        let conn = crate::db::open_db_in_memory().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2);",
            params!["active_plugins", "not json"],
        )
        .unwrap();

        let store = SqliteActivationStore::from_connection(conn);
        assert!(matches!(store.load(), Err(StorageError::Corrupt(_))));
    }
}
