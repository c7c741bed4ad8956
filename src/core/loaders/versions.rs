use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::kind::LoaderKind;
use super::source::VersionSource;
use crate::core::error::{LauncherError, LauncherResult};

struct InFlight {
    id: u64,
    token: CancellationToken,
}

struct CachedVersions {
    game_version: String,
    versions: Vec<String>,
}

/// Lazily enumerates loader versions.
///
/// One fetch per loader kind may be in flight at a time. A newer request
/// for the same kind cancels the older one instead of queuing behind it,
/// so a fast-clicking UI only ever keeps the result of the latest request.
pub struct VersionLoaderCache<S> {
    source: S,
    next_id: AtomicU64,
    in_flight: Mutex<HashMap<LoaderKind, InFlight>>,
    cache: Mutex<HashMap<LoaderKind, CachedVersions>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: VersionSource> VersionLoaderCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            next_id: AtomicU64::new(1),
            in_flight: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Versions of `kind` for `game_version`.
    ///
    /// `NotFound` from the upstream yields an empty list. Other failures
    /// propagate and leave the cache untouched. Returns
    /// [`LauncherError::Cancelled`] when `token` fires or a newer request
    /// for the same kind supersedes this one.
    pub async fn load_versions(
        &self,
        kind: LoaderKind,
        game_version: &str,
        token: &CancellationToken,
    ) -> LauncherResult<Vec<String>> {
        if let Some(hit) = self.cached(kind, game_version) {
            return Ok(hit);
        }

        let (id, request_token) = self.register(kind, token);

        let result = tokio::select! {
            biased;
            _ = request_token.cancelled() => Err(LauncherError::Cancelled),
            r = self.source.list_versions(kind, game_version) => r,
        };

        if !self.deregister(kind, id) {
            debug!("{} version request for {} superseded", kind, game_version);
            return Err(LauncherError::Cancelled);
        }

        let versions = match result {
            Ok(versions) => versions,
            Err(LauncherError::NotFound(what)) => {
                debug!("No {} versions for {} ({})", kind, game_version, what);
                Vec::new()
            }
            Err(e) => {
                if !e.is_cancelled() {
                    warn!("Failed to load {} versions for {}: {}", kind, game_version, e);
                }
                return Err(e);
            }
        };

        lock(&self.cache).insert(
            kind,
            CachedVersions {
                game_version: game_version.to_string(),
                versions: versions.clone(),
            },
        );
        Ok(versions)
    }

    /// Drop the retained versions of `kind`, forcing the next load to refetch.
    pub fn invalidate(&self, kind: LoaderKind) {
        lock(&self.cache).remove(&kind);
    }

    fn cached(&self, kind: LoaderKind, game_version: &str) -> Option<Vec<String>> {
        lock(&self.cache)
            .get(&kind)
            .filter(|c| c.game_version == game_version)
            .map(|c| c.versions.clone())
    }

    fn register(&self, kind: LoaderKind, parent: &CancellationToken) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = parent.child_token();
        let previous = lock(&self.in_flight).insert(
            kind,
            InFlight {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        (id, token)
    }

    /// Returns `false` if a newer request took over the slot.
    fn deregister(&self, kind: LoaderKind, id: u64) -> bool {
        let mut in_flight = lock(&self.in_flight);
        match in_flight.get(&kind) {
            Some(current) if current.id == id => {
                in_flight.remove(&kind);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    /// First call hangs forever; later calls answer immediately.
    #[derive(Default)]
    struct SlowFirstSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VersionSource for SlowFirstSource {
        async fn list_versions(&self, _kind: LoaderKind, game_version: &str) -> LauncherResult<Vec<String>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok(vec![game_version.to_string()])
        }
    }

    /// Replays a fixed list of responses.
    struct ScriptedSource {
        calls: AtomicUsize,
        responses: Mutex<Vec<LauncherResult<Vec<String>>>>,
    }

    impl ScriptedSource {
        fn new(mut responses: Vec<LauncherResult<Vec<String>>>) -> Self {
            responses.reverse();
            Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl VersionSource for ScriptedSource {
        async fn list_versions(&self, _kind: LoaderKind, _game_version: &str) -> LauncherResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            lock(&self.responses)
                .pop()
                .unwrap_or_else(|| Err(LauncherError::Other("no more responses".into())))
        }
    }

    #[tokio::test]
    async fn concurrent_loads_keep_only_the_latest() {
        let cache = Arc::new(VersionLoaderCache::new(SlowFirstSource::default()));
        let token = CancellationToken::new();

        let first = {
            let cache = Arc::clone(&cache);
            let token = token.clone();
            tokio::spawn(async move {
                cache
                    .load_versions(LoaderKind::LiteLoader, "1.8.9", &token)
                    .await
            })
        };

        while cache.source.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let second = cache
            .load_versions(LoaderKind::LiteLoader, "1.8.9", &token)
            .await
            .unwrap();
        assert_eq!(second, vec!["1.8.9"]);

        let first = first.await.unwrap();
        assert!(first.unwrap_err().is_cancelled());

        assert_eq!(cache.cached(LoaderKind::LiteLoader, "1.8.9"), Some(vec!["1.8.9".to_string()]));
        assert!(lock(&cache.in_flight).is_empty());
    }

    #[tokio::test]
    async fn not_found_is_an_empty_list() {
        let cache = VersionLoaderCache::new(ScriptedSource::new(vec![Err(LauncherError::NotFound(
            "optifine/1.99".into(),
        ))]));

        let versions = cache
            .load_versions(LoaderKind::OptiFine, "1.99", &CancellationToken::new())
            .await
            .unwrap();
        assert!(versions.is_empty());
    }

    #[tokio::test]
    async fn transport_errors_are_not_cached() {
        let cache = VersionLoaderCache::new(ScriptedSource::new(vec![
            Err(LauncherError::LoaderApi("502".into())),
            Ok(vec!["0.16.10".into()]),
        ]));
        let token = CancellationToken::new();

        let err = cache
            .load_versions(LoaderKind::Fabric, "1.21.1", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::LoaderApi(_)));
        assert_eq!(cache.cached(LoaderKind::Fabric, "1.21.1"), None);

        let versions = cache
            .load_versions(LoaderKind::Fabric, "1.21.1", &token)
            .await
            .unwrap();
        assert_eq!(versions, vec!["0.16.10"]);

        // Served from the cache this time.
        cache
            .load_versions(LoaderKind::Fabric, "1.21.1", &token)
            .await
            .unwrap();
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_the_load() {
        let cache = VersionLoaderCache::new(SlowFirstSource::default());
        let token = CancellationToken::new();
        token.cancel();

        let err = cache
            .load_versions(LoaderKind::Forge, "1.20.1", &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
