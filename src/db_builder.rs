use crate::Database;
use fjall::{BlockCache, TxKeyspace};
use std::{path::Path, sync::Arc};

/// Default number of readings returned by [`Database::recent_readings`].
pub const DEFAULT_RECENT_LIMIT: usize = 100;

/// Upper bound of readings returned by [`Database::recent_readings`].
pub const MAX_RECENT_LIMIT: usize = 500;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Limits {
    pub default_recent: usize,
    pub max_recent: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default_recent: DEFAULT_RECENT_LIMIT,
            max_recent: MAX_RECENT_LIMIT,
        }
    }
}

/// Settings of a [`Database`], see [`Database::builder`].
///
/// ```
/// # let dir = tempfile::tempdir()?;
/// use streetpulse::Database;
///
/// let db = Database::builder()
///     .cache_size_mib(16)
///     .default_recent_limit(20)
///     .max_recent_limit(50)
///     .open(&dir)?;
///
/// assert!(db.recent_readings(&[], None)?.is_empty());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Builder {
    cache_size_mib: u64,
    limits: Limits,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self {
            cache_size_mib: 64,
            limits: Limits::default(),
        }
    }

    /// Sets the cache size in MiB.
    ///
    /// Default = 64 MiB
    #[must_use]
    pub fn cache_size_mib(mut self, mib: u64) -> Self {
        self.cache_size_mib = mib;
        self
    }

    /// Sets how many readings [`Database::recent_readings`] returns
    /// when no limit is given.
    ///
    /// Default = 100
    #[must_use]
    pub fn default_recent_limit(mut self, n: usize) -> Self {
        self.limits.default_recent = n;
        self
    }

    /// Sets the most readings [`Database::recent_readings`] ever returns.
    ///
    /// Default = 500
    #[must_use]
    pub fn max_recent_limit(mut self, n: usize) -> Self {
        self.limits.max_recent = n;
        self
    }

    /// Opens the reading store in the directory at `path`,
    /// creating it on first use.
    ///
    /// The store gets its own keyspace with a block cache of
    /// [`Builder::cache_size_mib`].
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn open<P: AsRef<Path>>(self, path: P) -> crate::Result<Database> {
        let cache_bytes = self.cache_size_mib * 1_024 * 1_024;

        log::debug!("opening reading store with {} MiB block cache", self.cache_size_mib);

        let keyspace = fjall::Config::new(path)
            .block_cache(Arc::new(BlockCache::with_capacity_bytes(cache_bytes)))
            .open_transactional()?;

        self.open_in_keyspace(keyspace)
    }

    /// Opens the reading store inside a keyspace the application already owns.
    ///
    /// Sensors, readings and the newest-reading index live in three
    /// partitions named `_streetpulse#v1#...`, other partitions are left alone.
    /// The cache size setting is ignored, the keyspace keeps its own.
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn open_in_keyspace(self, keyspace: TxKeyspace) -> crate::Result<Database> {
        Database::from_keyspace(keyspace, self.limits)
    }
}
