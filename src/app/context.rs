use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ApiClient, HttpApiClient};
use crate::app::error::{MurmurError, Result};
use crate::config::Config;
use crate::connectivity::{Connectivity, TcpProbe};
use crate::notify::{AlertSink, Notifier};
use crate::poller::FeedPoller;
use crate::push::PushCycle;
use crate::refresh::ApiRefreshSource;
use crate::store::{SqliteStore, Store};

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub api: Arc<dyn ApiClient + Send + Sync>,
    pub connectivity: Arc<dyn Connectivity + Send + Sync>,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let api: Arc<dyn ApiClient + Send + Sync> = Arc::new(HttpApiClient::new(&config.api)?);
        let connectivity: Arc<dyn Connectivity + Send + Sync> =
            Arc::new(TcpProbe::from_config(&config)?);

        Ok(Self {
            config,
            store,
            api,
            connectivity,
        })
    }

    pub fn store(&self) -> Arc<dyn Store + Send + Sync> {
        self.store.clone()
    }

    pub fn page_size(&self) -> usize {
        self.config.api.page_size
    }

    pub fn poller(&self) -> FeedPoller {
        FeedPoller::new(self.api.clone(), self.store(), self.page_size())
    }

    pub fn push_cycle(&self, sink: Arc<dyn AlertSink + Send + Sync>) -> PushCycle {
        PushCycle::new(
            self.connectivity.clone(),
            self.poller(),
            Notifier::new(self.store(), sink),
        )
    }

    pub fn refresh_source(&self) -> ApiRefreshSource {
        ApiRefreshSource::new(self.api.clone(), self.store(), self.page_size())
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| MurmurError::Config("Could not find data directory".into()))?;
        let murmur_dir = data_dir.join("murmur");
        std::fs::create_dir_all(&murmur_dir)?;
        Ok(murmur_dir.join("murmur.db"))
    }
}
