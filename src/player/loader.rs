//! Tiered caption loading: the durable local store and the remote URL are
//! tried one after the other, never in parallel, in the configured order.

use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

use crate::{
    config::LoadOrder,
    formats::words::WordGrouping,
    model::Cue,
    normalize::{PayloadShape, normalize_detailed},
    player::{
        fetch::CaptionFetcher,
        store::{CaptionStore, StoredMeta},
    },
};

/// Where caption content may come from. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionSource {
    pub store_key: Option<String>,
    pub remote_url: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Empty,
    LoadingPrimary,
    LoadingFallback,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CueOrigin {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub cues: Vec<Cue>,
    pub origin: Option<CueOrigin>,
}

impl LoadOutcome {
    fn failed() -> Self {
        Self {
            cues: Vec::new(),
            origin: None,
        }
    }

    pub fn state(&self) -> LoadState {
        if self.cues.is_empty() {
            LoadState::Error
        } else {
            LoadState::Ready
        }
    }
}

#[derive(Clone)]
pub struct CaptionLoader {
    store: Arc<dyn CaptionStore>,
    fetcher: Arc<dyn CaptionFetcher>,
    grouping: WordGrouping,
    order: LoadOrder,
    default_language: String,
}

impl CaptionLoader {
    pub fn new(store: Arc<dyn CaptionStore>, fetcher: Arc<dyn CaptionFetcher>) -> Self {
        Self {
            store,
            fetcher,
            grouping: WordGrouping::default(),
            order: LoadOrder::default(),
            default_language: "en".to_string(),
        }
    }

    pub fn with_grouping(mut self, grouping: WordGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_order(mut self, order: LoadOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Runs the load protocol for `source`.
    ///
    /// `on_phase` hears `LoadingPrimary` before the first tier and
    /// `LoadingFallback` before the second. Failures never escape: when no
    /// tier yields cues the outcome is empty and its state is `Error`.
    pub async fn load(
        &self,
        source: &CaptionSource,
        on_phase: impl FnMut(LoadState) + Send,
    ) -> LoadOutcome {
        let span = tracing::info_span!(
            "load_captions",
            key = source.store_key.as_deref(),
            url = source.remote_url.as_deref(),
            order = ?self.order
        );
        self.run_tiers(source, on_phase).instrument(span).await
    }

    async fn run_tiers(
        &self,
        source: &CaptionSource,
        mut on_phase: impl FnMut(LoadState) + Send,
    ) -> LoadOutcome {
        let key = source.store_key.as_deref();
        let url = source.remote_url.as_deref();

        if key.is_none() && url.is_none() {
            tracing::info!("no caption source given");
            return LoadOutcome::failed();
        }

        on_phase(LoadState::LoadingPrimary);
        let mut local_tried = false;

        if self.order == LoadOrder::LocalFirst
            && let Some(key) = key
        {
            local_tried = true;
            if let Some(cues) = self.try_local(key).await {
                return local_outcome(cues);
            }
            if url.is_some() {
                on_phase(LoadState::LoadingFallback);
            }
        }

        if let Some(url) = url
            && let Some(cues) = self.try_remote(url, source).await
        {
            return LoadOutcome {
                cues,
                origin: Some(CueOrigin::Remote),
            };
        }

        if !local_tried && let Some(key) = key {
            if url.is_some() {
                on_phase(LoadState::LoadingFallback);
            }
            if let Some(cues) = self.try_local(key).await {
                return local_outcome(cues);
            }
        }

        tracing::warn!("no captions available from any source");
        LoadOutcome::failed()
    }

    async fn try_local(&self, key: &str) -> Option<Vec<Cue>> {
        match self.store.get(key).await {
            Ok(Some(content)) => {
                let (shape, cues) = normalize_detailed(&content, &self.grouping);
                if cues.is_empty() {
                    tracing::info!(key, "stored captions contain no cues");
                    return None;
                }
                tracing::info!(key, ?shape, cues = cues.len(), "using stored captions");
                Some(cues)
            }
            Ok(None) => {
                tracing::info!(key, "no stored captions");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "reading stored captions failed");
                None
            }
        }
    }

    async fn try_remote(&self, url: &str, source: &CaptionSource) -> Option<Vec<Cue>> {
        let body = match self.fetcher.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url, error = %e, "fetching remote captions failed");
                return None;
            }
        };

        let (shape, cues) = normalize_detailed(&body, &self.grouping);
        if cues.is_empty() {
            tracing::warn!(url, bytes = body.len(), "remote captions contain no cues");
            return None;
        }
        tracing::info!(url, ?shape, cues = cues.len(), "using remote captions");

        if let Some(key) = source.store_key.as_deref() {
            let meta = StoredMeta {
                format: format_tag(shape).to_string(),
                language: source
                    .language
                    .clone()
                    .unwrap_or_else(|| self.default_language.clone()),
            };
            self.persist(key.to_string(), body, meta);
        }
        Some(cues)
    }

    /// Writes fetched content back to the store without waiting on it.
    fn persist(&self, key: String, content: String, meta: StoredMeta) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.put(&key, &content, &meta).await {
                tracing::warn!(
                    key = key.as_str(),
                    error = %e,
                    "storing fetched captions failed"
                );
            }
        });
    }
}

fn local_outcome(cues: Vec<Cue>) -> LoadOutcome {
    LoadOutcome {
        cues,
        origin: Some(CueOrigin::Local),
    }
}

fn format_tag(shape: PayloadShape) -> &'static str {
    match shape {
        PayloadShape::Srt => "srt",
        _ => "json",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{FetchError, FetchResult, StoreError, StoreResult},
        player::store::MemoryStore,
    };
    use async_trait::async_trait;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    const SRT: &str = "1\n00:00:00,000 --> 00:00:02,000\nfrom remote\n";
    const STORED: &str = r#"[{"start":0,"end":2,"text":"from store"}]"#;

    struct CountingFetcher {
        body: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn ok(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CaptionFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> FetchResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(b) => Ok(b.to_string()),
                None => Err(FetchError::Status {
                    status: 503,
                    url: url.to_string(),
                }),
            }
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CaptionStore for BrokenStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }

        async fn put(&self, _key: &str, _content: &str, _meta: &StoredMeta) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
    }

    fn stored(store: &MemoryStore, key: &str, content: &str) {
        store.insert(
            key,
            content,
            StoredMeta {
                format: "json".to_string(),
                language: "en".to_string(),
            },
        );
    }

    fn source(key: Option<&str>, url: Option<&str>) -> CaptionSource {
        CaptionSource {
            store_key: key.map(str::to_string),
            remote_url: url.map(str::to_string),
            language: None,
        }
    }

    async fn load_recording(
        loader: &CaptionLoader,
        src: &CaptionSource,
    ) -> (LoadOutcome, Vec<LoadState>) {
        let phases = Mutex::new(Vec::new());
        let outcome = loader
            .load(src, |s| phases.lock().unwrap().push(s))
            .await;
        (outcome, phases.into_inner().unwrap())
    }

    #[tokio::test]
    async fn usable_local_entry_skips_remote_fetch() {
        let store = Arc::new(MemoryStore::new());
        stored(&store, "vid", STORED);
        let fetcher = CountingFetcher::ok(SRT);
        let loader = CaptionLoader::new(store, fetcher.clone());

        let (outcome, phases) =
            load_recording(&loader, &source(Some("vid"), Some("http://x/c.srt"))).await;

        assert_eq!(outcome.state(), LoadState::Ready);
        assert_eq!(outcome.origin, Some(CueOrigin::Local));
        assert_eq!(outcome.cues[0].text, "from store");
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(phases, vec![LoadState::LoadingPrimary]);
    }

    #[tokio::test]
    async fn cache_miss_fetches_remote_and_writes_back() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = CountingFetcher::ok(SRT);
        let loader = CaptionLoader::new(store.clone(), fetcher.clone());
        let mut src = source(Some("vid"), Some("http://x/c.srt"));
        src.language = Some("fr".to_string());

        let (outcome, phases) = load_recording(&loader, &src).await;

        assert_eq!(outcome.origin, Some(CueOrigin::Remote));
        assert_eq!(outcome.cues[0].text, "from remote");
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(
            phases,
            vec![LoadState::LoadingPrimary, LoadState::LoadingFallback]
        );

        for _ in 0..10 {
            if store.entry("vid").is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let (content, meta) = store.entry("vid").expect("write-back happened");
        assert_eq!(content, SRT);
        assert_eq!(meta.format, "srt");
        assert_eq!(meta.language, "fr");
    }

    #[tokio::test]
    async fn unusable_local_entry_falls_through_to_remote() {
        let store = Arc::new(MemoryStore::new());
        stored(&store, "vid", "garbage");
        let fetcher = CountingFetcher::ok(SRT);
        let loader = CaptionLoader::new(store, fetcher.clone());

        let (outcome, _) = load_recording(&loader, &source(Some("vid"), Some("http://x"))).await;

        assert_eq!(outcome.origin, Some(CueOrigin::Remote));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn remote_failure_without_local_entry_ends_in_error() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = CountingFetcher::failing();
        let loader = CaptionLoader::new(store, fetcher.clone());

        let (outcome, _) = load_recording(&loader, &source(Some("vid"), Some("http://x"))).await;

        assert_eq!(outcome.state(), LoadState::Error);
        assert!(outcome.cues.is_empty());
        assert_eq!(outcome.origin, None);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn remote_first_falls_back_to_store_on_failure() {
        let store = Arc::new(MemoryStore::new());
        stored(&store, "vid", STORED);
        let fetcher = CountingFetcher::failing();
        let loader =
            CaptionLoader::new(store, fetcher.clone()).with_order(LoadOrder::RemoteFirst);

        let (outcome, phases) =
            load_recording(&loader, &source(Some("vid"), Some("http://x"))).await;

        assert_eq!(outcome.origin, Some(CueOrigin::Local));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(
            phases,
            vec![LoadState::LoadingPrimary, LoadState::LoadingFallback]
        );
    }

    #[tokio::test]
    async fn store_errors_are_not_fatal() {
        let fetcher = CountingFetcher::ok(SRT);
        let loader = CaptionLoader::new(Arc::new(BrokenStore), fetcher.clone());

        let (outcome, _) = load_recording(&loader, &source(Some("vid"), Some("http://x"))).await;

        assert_eq!(outcome.state(), LoadState::Ready);
        assert_eq!(outcome.origin, Some(CueOrigin::Remote));
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn remote_only_source_does_not_touch_store() {
        let store = Arc::new(MemoryStore::new());
        let loader = CaptionLoader::new(store.clone(), CountingFetcher::ok(SRT));

        let (outcome, phases) = load_recording(&loader, &source(None, Some("http://x"))).await;

        assert_eq!(outcome.state(), LoadState::Ready);
        assert_eq!(phases, vec![LoadState::LoadingPrimary]);
        tokio::task::yield_now().await;
        assert!(store.entry("vid").is_none());
    }

    #[tokio::test]
    async fn empty_source_fails_without_phases() {
        let loader =
            CaptionLoader::new(Arc::new(MemoryStore::new()), CountingFetcher::ok(SRT));
        let (outcome, phases) = load_recording(&loader, &CaptionSource::default()).await;
        assert_eq!(outcome.state(), LoadState::Error);
        assert!(phases.is_empty());
    }
}
