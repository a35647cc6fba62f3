// 🗄️ Dataset Cache - lazily loaded, periodically refreshed snapshots
//
// Every cached resource is in one of three states:
//
//   Empty  - never loaded successfully
//   Fresh  - loaded less than `max_age` ago
//   Stale  - loaded, but `max_age` or more ago
//
// Access in Empty or Stale triggers a reload. A successful reload publishes
// a new snapshot by swapping the Arc; readers holding the old one keep it.
// A failed reload is logged and the previous snapshot stays current (an
// Empty resource keeps serving its default value). At most one reload runs
// at a time. Callers arriving meanwhile on a Stale resource get the current
// snapshot; on an Empty one they wait for the reload to finish.

use crate::config::DataConfig;
use crate::error::{CoinsError, Result};
use crate::ingest::{self, RecordSet};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use tracing::{error, info};

// ============================================================================
// CACHE STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

impl CacheState {
    pub fn at(refreshed_at: Option<DateTime<Utc>>, now: DateTime<Utc>, max_age: Duration) -> Self {
        match refreshed_at {
            None => CacheState::Empty,
            Some(at) if now - at >= max_age => CacheState::Stale,
            Some(_) => CacheState::Fresh,
        }
    }

    pub fn needs_refresh(self) -> bool {
        self != CacheState::Fresh
    }
}

// ============================================================================
// CACHED RESOURCE
// ============================================================================

struct Snapshot<T> {
    value: Arc<T>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// CachedResource - one value, reloaded through a caller-supplied loader
pub struct CachedResource<T> {
    name: &'static str,
    max_age: Duration,
    current: RwLock<Snapshot<T>>,
    refreshing: Mutex<()>,
}

impl<T: Default> CachedResource<T> {
    pub fn new(name: &'static str, max_age: Duration) -> Self {
        CachedResource {
            name,
            max_age,
            current: RwLock::new(Snapshot {
                value: Arc::new(T::default()),
                refreshed_at: None,
            }),
            refreshing: Mutex::new(()),
        }
    }
}

impl<T> CachedResource<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.read().refreshed_at
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> CacheState {
        CacheState::at(self.refreshed_at(), now, self.max_age)
    }

    /// Current snapshot, without refreshing
    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.read().value)
    }

    /// Snapshot as of now, reloading first when Empty or Stale
    pub fn get<F>(&self, load: F) -> Arc<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.get_at(Utc::now(), load)
    }

    /// Snapshot as of `now`, reloading first when Empty or Stale
    pub fn get_at<F>(&self, now: DateTime<Utc>, load: F) -> Arc<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let state = self.state_at(now);
        if !state.needs_refresh() {
            return self.current();
        }

        // Nothing to serve yet: wait for a running reload
        let _guard = if state == CacheState::Empty {
            self.refreshing.lock().unwrap_or_else(PoisonError::into_inner)
        } else {
            match self.refreshing.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return self.current(),
            }
        };

        // Reloaded while we waited for the lock
        if !self.state_at(now).needs_refresh() {
            return self.current();
        }

        match load() {
            Ok(value) => {
                let value = Arc::new(value);
                let mut snapshot = self.current.write().unwrap_or_else(PoisonError::into_inner);
                snapshot.value = Arc::clone(&value);
                snapshot.refreshed_at = Some(now);
                info!(resource = self.name, "Refreshed cached dataset");
                value
            }
            Err(err) => {
                error!(resource = self.name, error = %err, "Failed to refresh cached dataset");
                self.current()
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot<T>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for CachedResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedResource")
            .field("name", &self.name)
            .field("max_age", &self.max_age)
            .field("refreshed_at", &self.refreshed_at())
            .finish()
    }
}

// ============================================================================
// DATASET SOURCES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Coins,
    Wages,
    GeoMints,
    GeoAuthorities,
}

impl Dataset {
    pub fn name(self) -> &'static str {
        match self {
            Dataset::Coins => "coins",
            Dataset::Wages => "wages",
            Dataset::GeoMints => "geo_mints",
            Dataset::GeoAuthorities => "geo_authorities",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where dataset bytes come from
pub trait DatasetSource: Send + Sync {
    /// Whether the dataset is available at all
    fn is_configured(&self, dataset: Dataset) -> bool;

    /// Open a fresh stream over the dataset
    fn open(&self, dataset: Dataset) -> Result<Box<dyn Read + Send>>;
}

/// FileSource - datasets read from local files
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    data: DataConfig,
}

impl FileSource {
    pub fn new(data: DataConfig) -> Self {
        FileSource { data }
    }

    fn path(&self, dataset: Dataset) -> Option<&PathBuf> {
        match dataset {
            Dataset::Coins => self.data.coins.as_ref(),
            Dataset::Wages => self.data.wages.as_ref(),
            Dataset::GeoMints => self.data.geo_mints.as_ref(),
            Dataset::GeoAuthorities => self.data.geo_authorities.as_ref(),
        }
    }
}

impl DatasetSource for FileSource {
    fn is_configured(&self, dataset: Dataset) -> bool {
        self.path(dataset).is_some()
    }

    fn open(&self, dataset: Dataset) -> Result<Box<dyn Read + Send>> {
        let path = self
            .path(dataset)
            .ok_or_else(|| CoinsError::dataset(format!("{} is not configured", dataset)))?;
        let file = File::open(path)
            .map_err(|e| CoinsError::dataset(format!("cannot open {} ({}): {}", dataset, path.display(), e)))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

// ============================================================================
// DATASETS
// ============================================================================

/// Datasets - cached access to the record set and the geo files
pub struct Datasets {
    source: Box<dyn DatasetSource>,
    records: CachedResource<RecordSet>,
    geo_mints: CachedResource<Vec<u8>>,
    geo_authorities: CachedResource<Vec<u8>>,
}

impl Datasets {
    pub fn new(source: Box<dyn DatasetSource>, max_age: Duration) -> Self {
        Datasets {
            source,
            records: CachedResource::new("records", max_age),
            geo_mints: CachedResource::new("geo_mints", max_age),
            geo_authorities: CachedResource::new("geo_authorities", max_age),
        }
    }

    pub fn is_configured(&self, dataset: Dataset) -> bool {
        self.source.is_configured(dataset)
    }

    pub fn records(&self) -> Arc<RecordSet> {
        self.records_at(Utc::now())
    }

    pub fn records_at(&self, now: DateTime<Utc>) -> Arc<RecordSet> {
        self.records.get_at(now, || {
            let coins = self.source.open(Dataset::Coins)?;
            let wages = self.source.open(Dataset::Wages)?;
            ingest::ingest(coins, wages)
        })
    }

    /// Raw mint GeoJSON; error when not configured
    pub fn geo_mints(&self) -> Result<Arc<Vec<u8>>> {
        self.geo_at(Dataset::GeoMints, Utc::now())
    }

    /// Raw authority GeoJSON; error when not configured
    pub fn geo_authorities(&self) -> Result<Arc<Vec<u8>>> {
        self.geo_at(Dataset::GeoAuthorities, Utc::now())
    }

    pub fn geo_at(&self, dataset: Dataset, now: DateTime<Utc>) -> Result<Arc<Vec<u8>>> {
        let cache = match dataset {
            Dataset::GeoMints => &self.geo_mints,
            Dataset::GeoAuthorities => &self.geo_authorities,
            other => return Err(CoinsError::dataset(format!("{} is not a geo dataset", other))),
        };
        if !self.source.is_configured(dataset) {
            return Err(CoinsError::dataset(format!("{} is not configured", dataset)));
        }

        Ok(cache.get_at(now, || {
            let mut bytes = Vec::new();
            self.source.open(dataset)?.read_to_end(&mut bytes)?;
            Ok(bytes)
        }))
    }
}

impl fmt::Debug for Datasets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datasets")
            .field("records", &self.records)
            .field("geo_mints", &self.geo_mints)
            .field("geo_authorities", &self.geo_authorities)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    fn at(hours: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::hours(hours)
    }

    /// In-memory source whose contents can be swapped between loads
    #[derive(Default)]
    struct MemorySource {
        files: Mutex<HashMap<&'static str, Vec<u8>>>,
        opens: AtomicUsize,
    }

    impl MemorySource {
        fn put(&self, dataset: Dataset, content: &str) {
            self.files.lock().unwrap().insert(dataset.name(), content.as_bytes().to_vec());
        }

        fn remove(&self, dataset: Dataset) {
            self.files.lock().unwrap().remove(dataset.name());
        }
    }

    impl DatasetSource for Arc<MemorySource> {
        fn is_configured(&self, dataset: Dataset) -> bool {
            dataset != Dataset::GeoAuthorities
        }

        fn open(&self, dataset: Dataset) -> Result<Box<dyn Read + Send>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let files = self.files.lock().unwrap();
            let bytes = files
                .get(dataset.name())
                .cloned()
                .ok_or_else(|| CoinsError::dataset(format!("{} unavailable", dataset)))?;
            Ok(Box::new(Cursor::new(bytes)))
        }
    }

    const WAGES: &str = "Year;Hourly wage (VALUEd)\n1700;1.00\n";

    #[test]
    fn test_state_transitions() {
        let max_age = Duration::hours(24);
        assert_eq!(CacheState::at(None, at(0), max_age), CacheState::Empty);
        assert_eq!(CacheState::at(Some(at(0)), at(23), max_age), CacheState::Fresh);
        assert_eq!(CacheState::at(Some(at(0)), at(24), max_age), CacheState::Stale);
    }

    #[test]
    fn test_loads_when_empty_then_serves_fresh() {
        let cache: CachedResource<u32> = CachedResource::new("n", Duration::hours(24));
        assert_eq!(cache.state_at(at(0)), CacheState::Empty);

        assert_eq!(*cache.get_at(at(0), || Ok(1)), 1);
        assert_eq!(cache.state_at(at(1)), CacheState::Fresh);

        // Fresh: loader not called
        assert_eq!(*cache.get_at(at(1), || panic!("should not reload")), 1);
    }

    #[test]
    fn test_reloads_when_stale() {
        let cache: CachedResource<u32> = CachedResource::new("n", Duration::hours(24));
        cache.get_at(at(0), || Ok(1));

        assert_eq!(cache.state_at(at(25)), CacheState::Stale);
        assert_eq!(*cache.get_at(at(25), || Ok(2)), 2);
        assert_eq!(cache.refreshed_at(), Some(at(25)));
    }

    #[test]
    fn test_failed_reload_keeps_previous() {
        let cache: CachedResource<u32> = CachedResource::new("n", Duration::hours(24));
        cache.get_at(at(0), || Ok(7));

        let value = cache.get_at(at(30), || Err(CoinsError::dataset("down")));
        assert_eq!(*value, 7);
        assert_eq!(cache.state_at(at(30)), CacheState::Stale);
    }

    #[test]
    fn test_failed_first_load_stays_empty() {
        let cache: CachedResource<Vec<u8>> = CachedResource::new("n", Duration::hours(24));

        let value = cache.get_at(at(0), || Err(CoinsError::dataset("down")));
        assert!(value.is_empty());
        assert_eq!(cache.state_at(at(0)), CacheState::Empty);
    }

    #[test]
    fn test_empty_waits_for_running_load() {
        let cache: CachedResource<u32> = CachedResource::new("n", Duration::hours(24));
        let cache = &cache;
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        thread::scope(|scope| {
            let first = scope.spawn(move || {
                cache.get_at(at(0), || {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(1)
                })
            });
            started_rx.recv().unwrap();

            let second = scope.spawn(move || cache.get_at(at(0), || Ok(2)));
            thread::sleep(std::time::Duration::from_millis(20));
            release_tx.send(()).unwrap();

            assert_eq!(*first.join().unwrap(), 1);
            assert_eq!(*second.join().unwrap(), 1);
        });
    }

    #[test]
    fn test_stale_serves_previous_during_load() {
        let cache: CachedResource<u32> = CachedResource::new("n", Duration::hours(1));
        cache.get_at(at(0), || Ok(1));
        let cache = &cache;
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        thread::scope(|scope| {
            let reload = scope.spawn(move || {
                cache.get_at(at(2), || {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(2)
                })
            });
            started_rx.recv().unwrap();

            assert_eq!(*cache.get_at(at(2), || Ok(3)), 1);
            release_tx.send(()).unwrap();
            assert_eq!(*reload.join().unwrap(), 2);
        });
    }

    #[test]
    fn test_old_snapshot_survives_swap() {
        let cache: CachedResource<u32> = CachedResource::new("n", Duration::hours(1));
        let old = cache.get_at(at(0), || Ok(1));
        let new = cache.get_at(at(2), || Ok(2));

        assert_eq!(*old, 1);
        assert_eq!(*new, 2);
    }

    #[test]
    fn test_datasets_records_cached() {
        let source = Arc::new(MemorySource::default());
        source.put(Dataset::Coins, "UID;MINT\nC1;Utrecht\n");
        source.put(Dataset::Wages, WAGES);
        let datasets = Datasets::new(Box::new(Arc::clone(&source)), Duration::hours(24));

        assert_eq!(datasets.records_at(at(0)).len(), 1);
        source.put(Dataset::Coins, "UID;MINT\nC1;Utrecht\nC2;Dordrecht\n");
        assert_eq!(datasets.records_at(at(1)).len(), 1);
        assert_eq!(datasets.records_at(at(25)).len(), 2);
        assert_eq!(source.opens.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_datasets_records_failure_keeps_previous() {
        let source = Arc::new(MemorySource::default());
        source.put(Dataset::Coins, "UID\nC1\n");
        source.put(Dataset::Wages, WAGES);
        let datasets = Datasets::new(Box::new(Arc::clone(&source)), Duration::hours(24));
        datasets.records_at(at(0));

        source.remove(Dataset::Wages);
        let records = datasets.records_at(at(48));
        assert_eq!(records.get("C1").map(|r| r.id.as_str()), Some("C1"));
    }

    #[test]
    fn test_datasets_geo() {
        let source = Arc::new(MemorySource::default());
        source.put(Dataset::GeoMints, "{\"type\":\"FeatureCollection\"}");
        let datasets = Datasets::new(Box::new(Arc::clone(&source)), Duration::hours(24));

        let mints = datasets.geo_at(Dataset::GeoMints, at(0)).unwrap();
        assert_eq!(mints.as_slice(), b"{\"type\":\"FeatureCollection\"}");

        assert!(datasets.geo_at(Dataset::GeoAuthorities, at(0)).is_err());
        assert!(datasets.geo_at(Dataset::Coins, at(0)).is_err());
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let coins = dir.path().join("coins.csv");
        File::create(&coins).unwrap().write_all(b"UID\nC1\n").unwrap();

        let source = FileSource::new(DataConfig {
            coins: Some(coins),
            ..Default::default()
        });

        let mut content = String::new();
        source.open(Dataset::Coins).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "UID\nC1\n");

        assert!(source.is_configured(Dataset::Coins));
        assert!(!source.is_configured(Dataset::Wages));
        assert!(matches!(source.open(Dataset::Wages), Err(CoinsError::Dataset(_))));
    }
}
