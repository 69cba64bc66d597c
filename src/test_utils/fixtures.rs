use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::remote::InMemoryStore;
use crate::storage::Database;
use crate::sync::{DEFAULT_COOLDOWN, DEFAULT_PACING, RecordingSleeper, SyncEngine, TableTarget, TransportGuard};
use crate::table::{Cell, Header, Row};

/// Raw text grid from string literals.
#[must_use]
pub fn grid(values: &[&[&str]]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|row| row.iter().map(|c| (*c).to_string()).collect())
        .collect()
}

/// Normalized rows from string literals.
#[must_use]
pub fn rows(values: &[&[&str]]) -> Vec<Row> {
    values
        .iter()
        .map(|row| row.iter().map(|c| Cell::from_raw(c)).collect())
        .collect()
}

#[must_use]
pub fn header(names: &[&str]) -> Header {
    Header::new(names.iter().map(|n| (*n).to_string()).collect())
}

/// An in-memory remote, a SQLite file in a temp directory and a guard that
/// records pauses instead of sleeping.
pub struct SyncFixture {
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
    pub store: InMemoryStore,
    pub sleeper: Arc<RecordingSleeper>,
    targets: Vec<(String, TableTarget)>,
}

impl SyncFixture {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("tabsync.db");
        println!("[FIXTURE] Database at {}", db_path.display());
        Ok(Self {
            temp_dir,
            db_path,
            store: InMemoryStore::new(),
            sleeper: Arc::new(RecordingSleeper::new()),
            targets: Vec::new(),
        })
    }

    /// Register `table` and back it with a one-tab document holding `values`.
    pub fn remote_table(&mut self, table: &str, values: Vec<Vec<String>>) -> &mut Self {
        self.remote_table_with(table, values, |target| target)
    }

    /// Like [`Self::remote_table`], with a hook to adjust the target.
    pub fn remote_table_with<F>(&mut self, table: &str, values: Vec<Vec<String>>, adjust: F) -> &mut Self
    where
        F: FnOnce(TableTarget) -> TableTarget,
    {
        let locator = Self::locator(table);
        self.store.insert_document(&locator, "Sheet1", values);
        self.targets.push((table.to_string(), adjust(TableTarget::new(locator))));
        self
    }

    /// Locator used for `table`'s document.
    #[must_use]
    pub fn locator(table: &str) -> String {
        format!("doc-{table}")
    }

    /// Current cells of `table`'s remote tab.
    #[must_use]
    pub fn remote_values(&self, table: &str) -> Vec<Vec<String>> {
        self.store
            .last_tab_values(&Self::locator(table))
            .unwrap_or_default()
    }

    pub fn set_remote_values(&self, table: &str, values: Vec<Vec<String>>) {
        self.store.set_last_tab_values(&Self::locator(table), values);
    }

    #[must_use]
    pub fn guard(&self) -> TransportGuard {
        TransportGuard::new(DEFAULT_COOLDOWN, DEFAULT_PACING).with_sleeper(self.sleeper.clone())
    }

    /// Engine over the fixture's store and database file.
    pub fn engine(&self) -> crate::Result<SyncEngine<InMemoryStore>> {
        let mut engine = SyncEngine::new(self.store.clone(), Database::open(&self.db_path)?, self.guard());
        for (table, target) in &self.targets {
            engine.add_target(table.clone(), target.clone());
        }
        Ok(engine)
    }

    /// Number of cooldown pauses taken so far.
    #[must_use]
    pub fn cooldowns(&self) -> usize {
        self.sleeper.count(DEFAULT_COOLDOWN)
    }

    #[must_use]
    pub fn pacing_pauses(&self) -> usize {
        self.sleeper.count(DEFAULT_PACING)
    }
}
