//! Shared state for CLI commands.

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::remote::SheetsClient;
use crate::storage::Database;
use crate::sync::{SyncEngine, TransportGuard};

pub struct AppContext {
    pub config: Config,
    pub robot: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;
        Ok(Self {
            config,
            robot: cli.robot,
        })
    }

    pub fn open_database(&self) -> Result<Database> {
        Database::open(self.config.database_path()?)
    }

    #[must_use]
    pub fn guard(&self) -> TransportGuard {
        TransportGuard::new(self.config.transport.cooldown, self.config.transport.pacing)
    }

    pub fn sheets_client(&self) -> Result<SheetsClient> {
        let remote = &self.config.remote;
        let token = remote.credentials.resolve()?;
        SheetsClient::new(Some(remote.base_url.as_str()), &token, remote.timeout)
    }

    /// Engine over the Sheets API with every configured table as a target.
    pub fn engine(&self) -> Result<SyncEngine<SheetsClient>> {
        let mut engine = SyncEngine::new(self.sheets_client()?, self.open_database()?, self.guard());
        for (table, target) in self.config.targets() {
            engine.add_target(table, target);
        }
        Ok(engine)
    }
}
