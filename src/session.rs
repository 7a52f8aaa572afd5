//! One user session: a resolver plus a camera registry built at most once.
//!
//! Lifecycle: `Empty -> Building -> Built`. The registry is built the first
//! time a caller asks for it and then served read-only for the rest of the
//! session; concurrent callers wait on the same build. A failed build leaves
//! the session `Empty` (nothing partial is kept), so the next trigger starts
//! over. Only [`Session::reset`] drops a built registry.

use crate::error::{CrawlError, LookupError};
use crate::lookup;
use crate::models::{LookupOutcome, RawLocation};
use crate::registry::{BuildReport, CameraRegistry};
use crate::resolver::PlaceResolver;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Building,
    Built,
}

#[derive(Debug)]
struct Built {
    registry: CameraRegistry,
    report: BuildReport,
}

#[derive(Debug)]
pub struct Session {
    resolver: PlaceResolver,
    built: OnceCell<Built>,
    building: AtomicBool,
}

impl Session {
    pub fn new(resolver: PlaceResolver) -> Self {
        Self {
            resolver,
            built: OnceCell::new(),
            building: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.built.initialized() {
            SessionState::Built
        } else if self.building.load(Ordering::Acquire) {
            SessionState::Building
        } else {
            SessionState::Empty
        }
    }

    /// The registry, building it from `collect` if this is the first call.
    ///
    /// `collect` runs at most once per session; later calls return the
    /// cached registry without invoking it.
    #[instrument(level = "info", skip_all)]
    pub async fn ensure_built<C, Fut>(&self, collect: C) -> Result<&CameraRegistry, CrawlError>
    where
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RawLocation>, CrawlError>>,
    {
        let built = self
            .built
            .get_or_try_init(|| async {
                self.building.store(true, Ordering::Release);
                info!("Finding available camera locations");
                let collected = collect().await;
                self.building.store(false, Ordering::Release);

                let raw = collected.inspect_err(|e| {
                    warn!(error = %e, "Registry build failed; session stays empty");
                })?;
                let (registry, report) = CameraRegistry::build(&self.resolver, &raw);
                Ok::<_, CrawlError>(Built { registry, report })
            })
            .await?;
        Ok(&built.registry)
    }

    /// The built registry, or [`LookupError::NotBuilt`].
    pub fn registry(&self) -> Result<&CameraRegistry, LookupError> {
        self.built
            .get()
            .map(|built| &built.registry)
            .ok_or(LookupError::NotBuilt)
    }

    pub fn report(&self) -> Option<BuildReport> {
        self.built.get().map(|built| built.report)
    }

    /// Drop the registry so the next lookup triggers a fresh build.
    pub fn reset(&mut self) {
        if self.built.take().is_some() {
            info!("Session reset; registry discarded");
        }
    }

    pub fn load_sunrise(&self, now: DateTime<Utc>) -> Result<LookupOutcome, LookupError> {
        lookup::load_sunrise(self.registry()?, now)
    }

    pub fn load_sunset(&self, now: DateTime<Utc>) -> Result<LookupOutcome, LookupError> {
        lookup::load_sunset(self.registry()?, now)
    }

    pub fn load_best(&self, now: DateTime<Utc>) -> Result<LookupOutcome, LookupError> {
        lookup::load_best(self.registry()?, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::gazetteer::Gazetteer;
    use crate::gazetteer::tests::SAMPLE_TSV;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;

    fn session() -> Session {
        Session::new(PlaceResolver::new(Gazetteer::from_tsv(SAMPLE_TSV)))
    }

    fn locations() -> Vec<RawLocation> {
        vec![
            RawLocation::new("London, England", "https://cams.example/london"),
            RawLocation::new("Atlantis, Atlantis", "https://cams.example/atlantis"),
            RawLocation::new("Tokyo, Japan", "https://cams.example/tokyo"),
        ]
    }

    fn crawl_timeout() -> CrawlError {
        CrawlError::Timeout(FetchError::Timeout {
            url: "https://cams.example".to_string(),
            marker: "#featuredCamText".to_string(),
            secs: 30,
        })
    }

    #[tokio::test]
    async fn test_builds_once_and_caches() {
        let session = session();
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        assert_eq!(session.state(), SessionState::Empty);
        let registry = session
            .ensure_built(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(locations())
            })
            .await
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(session.state(), SessionState::Built);
        assert_eq!(session.report(), Some(BuildReport { resolved: 2, dropped: 1 }));

        let again = session
            .ensure_built(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            })
            .await
            .unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_share_one_build() {
        let session = session();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let collect = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(locations())
        };

        let (a, b) = tokio::join!(session.ensure_built(collect), session.ensure_built(collect));
        assert_eq!(a.unwrap().len(), 2);
        assert_eq!(b.unwrap().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_build_keeps_nothing() {
        let session = session();
        let err = session
            .ensure_built(|| async { Err(crawl_timeout()) })
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Timeout(_)));
        assert_eq!(session.state(), SessionState::Empty);
        assert_eq!(session.registry().unwrap_err(), LookupError::NotBuilt);

        // A later trigger may try again.
        session
            .ensure_built(|| async { Ok(locations()) })
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Built);
    }

    #[tokio::test]
    async fn test_reset_allows_rebuild() {
        let mut session = session();
        session
            .ensure_built(|| async { Ok(locations()) })
            .await
            .unwrap();
        session.reset();
        assert_eq!(session.state(), SessionState::Empty);

        let registry = session
            .ensure_built(|| async { Ok(locations()[..1].to_vec()) })
            .await
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_lookups_go_through_the_session() {
        let session = session();
        let now = Utc.with_ymd_and_hms(2025, 4, 12, 5, 30, 0).unwrap();
        assert_eq!(session.load_sunrise(now).unwrap_err(), LookupError::NotBuilt);

        session
            .ensure_built(|| async { Ok(locations()) })
            .await
            .unwrap();
        // Sunrise is on Greenwich at 05:30 UTC in April; London is 0.13° away.
        let outcome = session.load_sunrise(now).unwrap();
        assert!(outcome.found);
        assert_eq!(outcome.feed_url.as_deref(), Some("https://cams.example/london"));
        assert!(session.load_sunset(now).is_ok());
        assert!(session.load_best(now).is_ok());
    }

    #[tokio::test]
    async fn test_empty_build_reports_empty_registry() {
        let session = session();
        session
            .ensure_built(|| async { Ok(Vec::new()) })
            .await
            .unwrap();
        let now = Utc.with_ymd_and_hms(2025, 4, 12, 5, 30, 0).unwrap();
        assert_eq!(session.load_best(now).unwrap_err(), LookupError::EmptyRegistry);
    }
}
