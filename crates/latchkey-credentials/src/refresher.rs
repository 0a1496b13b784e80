//! Periodic cache refresh from the directory.

use std::sync::Arc;
use std::time::Duration;

use latchkey_directory::{Directory, DirectoryResult};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::CredentialCache;

/// Shortest accepted refresh period.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Timer-driven task that wholesale-replaces the cache with the directory's
/// list of authorized users.
///
/// The first refresh runs immediately so the cache is warm before the first
/// keypress. A failed refresh leaves the cache untouched.
#[derive(Debug)]
pub struct CacheRefresher<D> {
    directory: Arc<D>,
    cache: Arc<CredentialCache>,
    interval: Duration,
}

impl<D> CacheRefresher<D>
where
    D: Directory + 'static,
{
    /// Create a refresher. Intervals below [`MIN_REFRESH_INTERVAL`] are raised
    /// to it.
    pub fn new(directory: Arc<D>, cache: Arc<CredentialCache>, interval: Duration) -> Self {
        Self {
            directory,
            cache,
            interval: interval.max(MIN_REFRESH_INTERVAL),
        }
    }

    /// Refresh period in effect.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one bulk refresh and return the new cache size.
    ///
    /// # Errors
    ///
    /// Returns the directory error; the cache is not modified in that case.
    pub async fn refresh_once(&self) -> DirectoryResult<usize> {
        let since = self.cache.revision();
        let records = self.directory.lookup_authorized().await?;
        Ok(self.cache.replace_all(since, records))
    }

    /// Refresh forever on the configured interval.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            debug!("Refreshing credential cache");

            match self.refresh_once().await {
                Ok(users) => info!(users, "Credential cache refreshed"),
                Err(e) => warn!(
                    error = %e,
                    cached = self.cache.len(),
                    "Cache refresh failed, keeping existing entries"
                ),
            }
        }
    }

    /// Start [`run`](Self::run) on the runtime. The task lives until aborted
    /// or the runtime shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
