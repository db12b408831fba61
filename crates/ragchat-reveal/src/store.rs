use crate::rate::RevealRate;
use crate::timeline::{RevealTimeline, SourceSync, TimelineSnapshot};
use parking_lot::Mutex;
use ragchat_core::PersistKey;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::time::Instant;
use tracing::debug;

/// Arena of reveal timelines keyed by [`PersistKey`].
///
/// Timelines are created lazily on first use and never evicted; a session has
/// a small, finite set of keys. Each key is expected to have a single active
/// reader/writer at a time.
#[derive(Default)]
pub struct RevealStore {
    timelines: Mutex<HashMap<PersistKey, RevealTimeline>>,
}

impl RevealStore {
    /// An empty, private store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process-wide store.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<RevealStore>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(RevealStore::new))
    }

    /// Given the latest full source text and whether it is still being
    /// produced, return the text that should be displayed right now.
    pub fn reveal(
        &self,
        key: &PersistKey,
        source: &str,
        is_live: bool,
        rate: &RevealRate,
    ) -> String {
        self.reveal_at(key, source, is_live, rate, Instant::now())
    }

    /// [`reveal`](Self::reveal) at an explicit instant.
    pub fn reveal_at(
        &self,
        key: &PersistKey,
        source: &str,
        is_live: bool,
        rate: &RevealRate,
        now: Instant,
    ) -> String {
        let mut timelines = self.timelines.lock();
        let timeline = Self::sync_entry(&mut timelines, key, source, is_live, now);
        timeline.tick(now, rate);
        timeline.displayed().to_string()
    }

    /// Feed the latest source text without ticking.
    pub fn update_source(&self, key: &PersistKey, source: &str, is_live: bool) {
        self.update_source_at(key, source, is_live, Instant::now());
    }

    /// [`update_source`](Self::update_source) at an explicit instant; the
    /// instant only matters when this call creates the timeline.
    pub fn update_source_at(&self, key: &PersistKey, source: &str, is_live: bool, now: Instant) {
        let mut timelines = self.timelines.lock();
        Self::sync_entry(&mut timelines, key, source, is_live, now);
    }

    /// Swap in an authoritative rewrite of the source, such as a final
    /// answer. See [`RevealTimeline::replace_source`].
    pub fn replace_source(&self, key: &PersistKey, text: &str, is_live: bool) {
        self.replace_source_at(key, text, is_live, Instant::now());
    }

    /// [`replace_source`](Self::replace_source) at an explicit instant.
    pub fn replace_source_at(&self, key: &PersistKey, text: &str, is_live: bool, now: Instant) {
        let mut timelines = self.timelines.lock();
        match timelines.get_mut(key) {
            Some(timeline) => {
                let sync = timeline.replace_source(text, now);
                debug!(key = %key, ?sync, source_len = text.len(), "Source replaced");
            }
            None => {
                timelines.insert(key.clone(), RevealTimeline::new(text, is_live, now));
            }
        }
    }

    /// Advance the timeline for `key`; returns characters revealed, or `None`
    /// if the key has no timeline yet.
    pub fn tick(&self, key: &PersistKey, rate: &RevealRate) -> Option<usize> {
        self.tick_at(key, rate, Instant::now())
    }

    /// [`tick`](Self::tick) at an explicit instant.
    pub fn tick_at(&self, key: &PersistKey, rate: &RevealRate, now: Instant) -> Option<usize> {
        self.timelines
            .lock()
            .get_mut(key)
            .map(|timeline| timeline.tick(now, rate))
    }

    /// Text currently shown for `key`.
    pub fn displayed(&self, key: &PersistKey) -> Option<String> {
        self.timelines
            .lock()
            .get(key)
            .map(|t| t.displayed().to_string())
    }

    /// Full state of the timeline for `key`.
    pub fn snapshot(&self, key: &PersistKey) -> Option<TimelineSnapshot> {
        self.timelines.lock().get(key).map(RevealTimeline::snapshot)
    }

    /// Whether `key` has a timeline.
    pub fn contains(&self, key: &PersistKey) -> bool {
        self.timelines.lock().contains_key(key)
    }

    /// Number of timelines ever created.
    pub fn len(&self) -> usize {
        self.timelines.lock().len()
    }

    /// Whether no timeline exists yet.
    pub fn is_empty(&self) -> bool {
        self.timelines.lock().is_empty()
    }

    fn sync_entry<'a>(
        timelines: &'a mut HashMap<PersistKey, RevealTimeline>,
        key: &PersistKey,
        source: &str,
        is_live: bool,
        now: Instant,
    ) -> &'a mut RevealTimeline {
        let timeline = timelines.entry(key.clone()).or_insert_with(|| {
            debug!(key = %key, is_live, "Creating reveal timeline");
            RevealTimeline::new(source, is_live, now)
        });
        if timeline.sync_source(source, now) == SourceSync::Reset {
            debug!(key = %key, source_len = source.len(), "Source shrank, timeline reset");
        }
        timeline
    }
}
