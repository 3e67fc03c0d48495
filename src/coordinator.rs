use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::data::{FeedProvider, PageRequest};
use crate::debounce::{self, DebounceScheduler};
use crate::feed::{FeedLane, LaneKind, LaneState, Page};
use crate::generation::{GenerationGuard, Token};
use crate::giphy::{GiphyError, Rating};
use crate::media::{MediaItem, MediaVariant};
use crate::select::VariantSelector;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs blocking fetch jobs away from the coordinator's thread.
pub trait TaskRunner: Send + Sync {
    fn spawn(&self, job: Job);
}

/// Spawns one OS thread per job.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRunner;

impl TaskRunner for ThreadRunner {
    fn spawn(&self, job: Job) {
        thread::spawn(job);
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub page_limit: u32,
    pub rating: Rating,
    pub max_bytes: u64,
    pub target_width: u32,
    pub search_debounce: Duration,
    pub allow_paging: bool,
    pub animated: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            page_limit: 100,
            rating: Rating::default(),
            max_bytes: 2_048_000,
            target_width: 200,
            search_debounce: debounce::DEFAULT_INTERVAL,
            allow_paging: true,
            animated: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadingState {
    Idle,
    Loading,
    Error(String),
    NoMatches,
}

struct Completion {
    lane: LaneKind,
    token: Token,
    width: u32,
    result: Result<Page>,
}

/// Owns the trending and search lanes and decides when each one fetches.
///
/// All state lives on the caller's thread. Fetches run through the
/// [`TaskRunner`] and report back over a channel drained by
/// [`FeedCoordinator::poll`]; a completion whose generation token is no
/// longer current is dropped without touching any lane.
pub struct FeedCoordinator {
    provider: Arc<dyn FeedProvider>,
    runner: Arc<dyn TaskRunner>,
    options: CoordinatorOptions,
    lanes: [FeedLane; 2],
    guard: GenerationGuard,
    debounce: DebounceScheduler<String>,
    search_active: bool,
    query: String,
    response_tx: Sender<Completion>,
    response_rx: Receiver<Completion>,
    shut_down: bool,
}

impl FeedCoordinator {
    pub fn new(
        provider: Arc<dyn FeedProvider>,
        runner: Arc<dyn TaskRunner>,
        options: CoordinatorOptions,
    ) -> Self {
        let (response_tx, response_rx) = unbounded();
        let debounce = DebounceScheduler::new(options.search_debounce);
        Self {
            provider,
            runner,
            options,
            lanes: [
                FeedLane::new(LaneKind::Trending),
                FeedLane::new(LaneKind::Search),
            ],
            guard: GenerationGuard::new(),
            debounce,
            search_active: false,
            query: String::new(),
            response_tx,
            response_rx,
            shut_down: false,
        }
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub fn lane(&self, kind: LaneKind) -> &FeedLane {
        &self.lanes[kind.index()]
    }

    fn lane_mut(&mut self, kind: LaneKind) -> &mut FeedLane {
        &mut self.lanes[kind.index()]
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn visible_lane(&self) -> LaneKind {
        if self.search_active && !self.query.trim().is_empty() {
            LaneKind::Search
        } else {
            LaneKind::Trending
        }
    }

    pub fn visible_items(&self) -> &[MediaItem] {
        self.lane(self.visible_lane()).items()
    }

    pub fn loading_state(&self) -> LoadingState {
        let visible = self.visible_lane();
        let lane = self.lane(visible);
        match lane.state() {
            LaneState::FetchInFlight => LoadingState::Loading,
            LaneState::Error(message) if lane.items().is_empty() => {
                LoadingState::Error(message.clone())
            }
            LaneState::Error(_) => LoadingState::Idle,
            LaneState::Idle => {
                if visible == LaneKind::Search && self.debounce.is_pending() {
                    LoadingState::Loading
                } else if visible == LaneKind::Search
                    && lane.has_completed_page()
                    && lane.items().is_empty()
                {
                    LoadingState::NoMatches
                } else {
                    LoadingState::Idle
                }
            }
        }
    }

    /// Best rendition of `item` for `width` under the configured ceiling.
    pub fn select<'a>(&self, item: &'a MediaItem, width: u32) -> Option<&'a MediaVariant> {
        VariantSelector::select(item, width, self.options.max_bytes, self.options.animated)
    }

    pub fn set_target_width(&mut self, width: u32) {
        self.options.target_width = width;
    }

    /// Issues the first trending fetch.
    pub fn start(&mut self) -> bool {
        let trending = self.lane(LaneKind::Trending);
        if trending.has_completed_page() || trending.is_fetching() {
            return false;
        }
        self.dispatch(LaneKind::Trending)
    }

    pub fn on_scrolled_near_end(&mut self) -> bool {
        if !self.options.allow_paging {
            return false;
        }
        // An open search bar with no query pages nothing, even though
        // trending stays on screen.
        if self.search_active && self.query.trim().is_empty() {
            return false;
        }
        let kind = self.visible_lane();
        let lane = self.lane(kind);
        if lane.is_fetching() || !lane.has_completed_page() || lane.is_exhausted() {
            return false;
        }
        self.dispatch(kind)
    }

    pub fn on_search_text_changed(&mut self, text: &str) {
        self.query = text.to_string();
        if !self.search_active {
            return;
        }

        self.reset_search("search text changed");
        let query = self.query.trim();
        if query.is_empty() {
            self.debounce.cancel_pending();
        } else {
            let query = query.to_string();
            self.debounce.schedule(query);
        }
    }

    pub fn on_search_activated(&mut self) {
        self.search_active = true;
        self.query.clear();
        self.debounce.cancel_pending();
        self.reset_search("search activated");
    }

    pub fn on_search_deactivated(&mut self) {
        self.search_active = false;
        self.query.clear();
        self.debounce.cancel_pending();
        self.reset_search("search deactivated");
    }

    /// Re-issues the first page of the visible lane after it failed empty.
    pub fn retry(&mut self) -> bool {
        let kind = self.visible_lane();
        let lane = self.lane(kind);
        if lane.is_fetching() || !lane.items().is_empty() {
            return false;
        }
        if self.debounce.is_pending() && kind == LaneKind::Search {
            return false;
        }
        self.dispatch(kind)
    }

    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Fires the debounced search once its quiet period has elapsed.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        let Some(query) = self.debounce.take_due(now) else {
            return false;
        };
        if !self.search_active || query != self.query.trim() {
            debug!(query = %query, "dropping debounced search for outdated text");
            return false;
        }
        self.dispatch(LaneKind::Search)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Applies every completion that has arrived. Returns whether any lane
    /// state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.response_rx.try_recv() {
            changed |= self.apply(completion);
        }
        changed
    }

    /// Waits up to `timeout` for one completion, then drains the rest.
    pub fn poll_timeout(&mut self, timeout: Duration) -> bool {
        match self.response_rx.recv_timeout(timeout) {
            Ok(completion) => {
                let changed = self.apply(completion);
                self.poll() || changed
            }
            Err(_) => false,
        }
    }

    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.guard.invalidate_all();
        self.debounce.cancel_pending();
        for lane in &mut self.lanes {
            if lane.is_fetching() {
                lane.set_state(LaneState::Idle);
            }
        }
        debug!("feed coordinator shut down");
    }

    fn reset_search(&mut self, reason: &str) {
        let generation = self.guard.invalidate(LaneKind::Search);
        self.lane_mut(LaneKind::Search).reset();
        debug!(reason, generation = generation.value(), "search lane reset");
    }

    fn dispatch(&mut self, kind: LaneKind) -> bool {
        if self.shut_down {
            return false;
        }
        if self.lane(kind).is_fetching() {
            debug!(lane = kind.as_str(), "fetch already in flight");
            return false;
        }
        let query = match kind {
            LaneKind::Trending => None,
            LaneKind::Search => {
                let query = self.query.trim();
                if query.is_empty() {
                    return false;
                }
                Some(query.to_string())
            }
        };

        let token = self.guard.begin_request(kind);
        let request = PageRequest {
            lane: kind,
            query,
            offset: self.lane(kind).next_offset(),
            limit: self.options.page_limit,
            rating: self.options.rating,
        };
        debug!(
            lane = kind.as_str(),
            offset = request.offset,
            generation = token.value(),
            "dispatching page fetch"
        );
        self.lane_mut(kind).set_state(LaneState::FetchInFlight);

        let width = self.options.target_width;
        let provider = self.provider.clone();
        let tx = self.response_tx.clone();
        self.runner.spawn(Box::new(move || {
            let result = provider.fetch_page(&request);
            let _ = tx.send(Completion {
                lane: kind,
                token,
                width,
                result,
            });
        }));
        true
    }

    fn apply(&mut self, completion: Completion) -> bool {
        let Completion {
            lane: kind,
            token,
            width,
            result,
        } = completion;

        if !self.guard.is_current(kind, token) {
            debug!(
                lane = kind.as_str(),
                generation = token.value(),
                "discarding stale response"
            );
            return false;
        }

        let max_bytes = self.options.max_bytes;
        let lane = self.lane_mut(kind);
        match result {
            Ok(page) => {
                let received = page.items.len();
                let before = lane.items().len();
                lane.merge_page(page.items, page.pagination, |item| {
                    VariantSelector::is_feasible(item, width, max_bytes)
                });
                lane.set_state(LaneState::Idle);
                info!(
                    lane = kind.as_str(),
                    received,
                    kept = lane.items().len() - before,
                    next_offset = lane.next_offset(),
                    "merged page"
                );
            }
            Err(err) => {
                let message = describe(&err);
                if lane.items().is_empty() {
                    warn!(lane = kind.as_str(), error = %format!("{err:#}"), "first page failed");
                } else {
                    warn!(
                        lane = kind.as_str(),
                        error = %format!("{err:#}"),
                        "page fetch failed; keeping loaded items"
                    );
                }
                lane.set_state(LaneState::Error(message));
            }
        }
        true
    }
}

/// User-facing text for a failed fetch: the API error when there is one,
/// otherwise the innermost cause.
fn describe(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<GiphyError>())
        .map(ToString::to_string)
        .unwrap_or_else(|| err.root_cause().to_string())
}

impl Drop for FeedCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;
    use crate::data::MockFeedProvider;

    #[derive(Default)]
    struct ManualRunner {
        jobs: Mutex<VecDeque<Job>>,
    }

    impl TaskRunner for ManualRunner {
        fn spawn(&self, job: Job) {
            self.jobs.lock().push_back(job);
        }
    }

    impl ManualRunner {
        fn pending(&self) -> usize {
            self.jobs.lock().len()
        }

        fn run_next(&self) -> bool {
            let job = self.jobs.lock().pop_front();
            match job {
                Some(job) => {
                    job();
                    true
                }
                None => false,
            }
        }

        fn run_last(&self) -> bool {
            let job = self.jobs.lock().pop_back();
            match job {
                Some(job) => {
                    job();
                    true
                }
                None => false,
            }
        }
    }

    struct Harness {
        provider: Arc<MockFeedProvider>,
        runner: Arc<ManualRunner>,
        feed: FeedCoordinator,
    }

    fn harness_with(options: CoordinatorOptions) -> Harness {
        let provider = Arc::new(MockFeedProvider::new(250));
        let runner = Arc::new(ManualRunner::default());
        let feed = FeedCoordinator::new(provider.clone(), runner.clone(), options);
        Harness {
            provider,
            runner,
            feed,
        }
    }

    fn harness() -> Harness {
        harness_with(CoordinatorOptions {
            page_limit: 25,
            ..CoordinatorOptions::default()
        })
    }

    fn complete_all(h: &mut Harness) {
        while h.runner.run_next() {}
        h.feed.poll();
    }

    fn search_for(h: &mut Harness, text: &str) {
        h.feed.on_search_text_changed(text);
        assert!(h.feed.tick_at(Instant::now() + Duration::from_secs(1)));
    }

    #[test]
    fn start_loads_trending_into_visible_list() {
        let mut h = harness();
        assert!(h.feed.start());
        assert_eq!(h.feed.loading_state(), LoadingState::Loading);
        complete_all(&mut h);

        assert_eq!(h.feed.visible_lane(), LaneKind::Trending);
        assert_eq!(h.feed.visible_items().len(), 25);
        assert_eq!(h.feed.visible_items()[0].id(), "trending-0");
        assert_eq!(h.feed.lane(LaneKind::Trending).next_offset(), 25);
        assert_eq!(h.feed.loading_state(), LoadingState::Idle);
    }

    #[test]
    fn scrolling_pages_with_current_offset() {
        let mut h = harness();
        h.feed.start();
        complete_all(&mut h);
        assert!(h.feed.on_scrolled_near_end());
        complete_all(&mut h);

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].offset, 25);
        assert_eq!(requests[1].limit, 25);
        assert_eq!(h.feed.visible_items().len(), 50);
        assert_eq!(h.feed.visible_items()[25].id(), "trending-25");
    }

    #[test]
    fn scrolling_twice_while_in_flight_fetches_once() {
        let mut h = harness();
        h.feed.start();
        complete_all(&mut h);

        assert!(h.feed.on_scrolled_near_end());
        assert!(!h.feed.on_scrolled_near_end());
        assert_eq!(h.runner.pending(), 1);
        complete_all(&mut h);
        assert_eq!(h.provider.request_count(), 2);
    }

    #[test]
    fn scrolling_before_first_page_does_nothing() {
        let mut h = harness();
        assert!(!h.feed.on_scrolled_near_end());
        h.feed.start();
        assert!(!h.feed.on_scrolled_near_end());
        assert_eq!(h.runner.pending(), 1);
    }

    #[test]
    fn paging_can_be_disabled() {
        let mut h = harness_with(CoordinatorOptions {
            allow_paging: false,
            ..CoordinatorOptions::default()
        });
        h.feed.start();
        complete_all(&mut h);
        assert!(!h.feed.on_scrolled_near_end());
    }

    #[test]
    fn exhausted_lane_stops_paging() {
        let provider = Arc::new(MockFeedProvider::new(30));
        let runner = Arc::new(ManualRunner::default());
        let mut feed = FeedCoordinator::new(
            provider.clone(),
            runner.clone(),
            CoordinatorOptions {
                page_limit: 25,
                ..CoordinatorOptions::default()
            },
        );
        feed.start();
        runner.run_next();
        feed.poll();
        assert!(feed.on_scrolled_near_end());
        runner.run_next();
        feed.poll();
        assert_eq!(feed.visible_items().len(), 30);
        assert!(!feed.on_scrolled_near_end());
        assert_eq!(provider.request_count(), 2);
    }

    #[test]
    fn debounced_typing_issues_one_fetch_for_final_text() {
        let mut h = harness();
        h.feed.on_search_activated();
        h.feed.on_search_text_changed("c");
        h.feed.on_search_text_changed("ca");
        h.feed.on_search_text_changed("cat");

        assert!(!h.feed.tick_at(Instant::now() + Duration::from_millis(100)));
        assert_eq!(h.runner.pending(), 0);
        assert_eq!(h.feed.visible_lane(), LaneKind::Search);
        assert_eq!(h.feed.loading_state(), LoadingState::Loading);

        assert!(h.feed.tick_at(Instant::now() + Duration::from_millis(600)));
        complete_all(&mut h);

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].lane, LaneKind::Search);
        assert_eq!(requests[0].query.as_deref(), Some("cat"));
        assert_eq!(requests[0].offset, 0);
        assert_eq!(h.feed.visible_items()[0].id(), "cat-0");
    }

    #[test]
    fn response_after_reset_is_discarded() {
        let mut h = harness();
        h.feed.on_search_activated();
        search_for(&mut h, "dogs");
        complete_all(&mut h);
        assert!(h.feed.on_scrolled_near_end());

        // The user edits the query while page two is in flight.
        h.feed.on_search_text_changed("dogs!");
        h.runner.run_next();
        assert!(!h.feed.poll());

        let search = h.feed.lane(LaneKind::Search);
        assert!(search.items().is_empty());
        assert_eq!(search.next_offset(), 0);
        assert_eq!(search.state(), &LaneState::Idle);
    }

    #[test]
    fn stale_response_leaves_populated_lane_untouched() {
        let mut h = harness();
        h.feed.start();
        complete_all(&mut h);
        h.feed.on_search_activated();
        search_for(&mut h, "owls");
        complete_all(&mut h);
        let before: Vec<MediaItem> = h.feed.lane(LaneKind::Search).items().to_vec();
        let offset = h.feed.lane(LaneKind::Search).next_offset();

        // Dispatch page two, then invalidate it without touching the items.
        assert!(h.feed.on_scrolled_near_end());
        h.feed.guard.invalidate(LaneKind::Search);
        h.runner.run_next();
        assert!(!h.feed.poll());

        assert_eq!(h.feed.lane(LaneKind::Search).items(), before.as_slice());
        assert_eq!(h.feed.lane(LaneKind::Search).next_offset(), offset);
    }

    #[test]
    fn out_of_order_search_completions_keep_latest_intent() {
        let mut h = harness();
        h.feed.on_search_activated();
        search_for(&mut h, "first");
        search_for(&mut h, "second");
        assert_eq!(h.runner.pending(), 2);

        // The newer request lands first, then the superseded one.
        h.runner.run_last();
        h.runner.run_next();
        h.feed.poll();

        let ids: Vec<&str> = h.feed.visible_items().iter().map(MediaItem::id).collect();
        assert_eq!(ids.len(), 25);
        assert!(ids.iter().all(|id| id.starts_with("second-")));
    }

    #[test]
    fn clearing_text_shows_trending_and_resets_search() {
        let mut h = harness();
        h.feed.start();
        complete_all(&mut h);
        h.feed.on_search_activated();
        search_for(&mut h, "frogs");
        complete_all(&mut h);
        assert_eq!(h.feed.visible_lane(), LaneKind::Search);

        h.feed.on_search_text_changed("");
        let search = h.feed.lane(LaneKind::Search);
        assert!(search.items().is_empty());
        assert_eq!(search.next_offset(), 0);
        assert_eq!(h.feed.visible_lane(), LaneKind::Trending);
        assert_eq!(h.feed.visible_items()[0].id(), "trending-0");
        assert!(h.feed.next_deadline().is_none());
    }

    #[test]
    fn deactivating_search_returns_to_trending() {
        let mut h = harness();
        h.feed.start();
        complete_all(&mut h);
        h.feed.on_search_activated();
        search_for(&mut h, "bees");
        h.feed.on_search_deactivated();
        complete_all(&mut h);

        assert!(!h.feed.is_search_active());
        assert_eq!(h.feed.query(), "");
        assert_eq!(h.feed.visible_lane(), LaneKind::Trending);
        assert!(h.feed.lane(LaneKind::Search).items().is_empty());
        assert_eq!(h.feed.visible_items().len(), 25);
    }

    #[test]
    fn blank_search_does_not_page_trending() {
        let mut h = harness();
        h.feed.start();
        complete_all(&mut h);
        h.feed.on_search_activated();
        assert_eq!(h.feed.visible_lane(), LaneKind::Trending);
        assert!(!h.feed.on_scrolled_near_end());

        h.feed.on_search_text_changed("   ");
        assert!(!h.feed.on_scrolled_near_end());
        assert_eq!(h.runner.pending(), 0);

        h.feed.on_search_deactivated();
        assert!(h.feed.on_scrolled_near_end());
    }

    #[test]
    fn typing_while_inactive_does_not_fetch() {
        let mut h = harness();
        h.feed.on_search_text_changed("cats");
        assert!(!h.feed.tick_at(Instant::now() + Duration::from_secs(1)));
        assert_eq!(h.runner.pending(), 0);
    }

    #[test]
    fn first_page_failure_is_surfaced() {
        let mut h = harness();
        h.provider.fail_with(Some("network down"));
        h.feed.start();
        complete_all(&mut h);
        assert_eq!(
            h.feed.loading_state(),
            LoadingState::Error("network down".into())
        );

        h.provider.fail_with(None);
        assert!(h.feed.retry());
        complete_all(&mut h);
        assert_eq!(h.feed.loading_state(), LoadingState::Idle);
        assert_eq!(h.feed.visible_items().len(), 25);
    }

    #[test]
    fn deep_scroll_failure_is_absorbed() {
        let mut h = harness();
        h.feed.start();
        complete_all(&mut h);

        h.provider.fail_with(Some("timeout"));
        assert!(h.feed.on_scrolled_near_end());
        complete_all(&mut h);

        let trending = h.feed.lane(LaneKind::Trending);
        assert_eq!(trending.items().len(), 25);
        assert_eq!(trending.next_offset(), 25);
        assert_eq!(trending.state(), &LaneState::Error("timeout".into()));
        assert_eq!(h.feed.loading_state(), LoadingState::Idle);

        // The next scroll tries again from the same offset.
        h.provider.fail_with(None);
        assert!(h.feed.on_scrolled_near_end());
        complete_all(&mut h);
        assert_eq!(h.provider.requests()[2].offset, 25);
        assert_eq!(h.feed.visible_items().len(), 50);
    }

    #[test]
    fn stale_failure_is_silent() {
        let mut h = harness();
        h.feed.on_search_activated();
        h.provider.fail_with(Some("boom"));
        search_for(&mut h, "cats");
        h.feed.on_search_text_changed("cats and dogs");
        complete_all(&mut h);

        assert_eq!(h.feed.lane(LaneKind::Search).state(), &LaneState::Idle);
        assert_eq!(h.feed.loading_state(), LoadingState::Loading);
    }

    #[test]
    fn empty_search_reports_no_matches() {
        let provider = Arc::new(MockFeedProvider::new(0));
        let runner = Arc::new(ManualRunner::default());
        let mut feed =
            FeedCoordinator::new(provider, runner.clone(), CoordinatorOptions::default());
        feed.on_search_activated();
        feed.on_search_text_changed("zzz");
        feed.tick_at(Instant::now() + Duration::from_secs(1));
        runner.run_next();
        feed.poll();
        assert_eq!(feed.loading_state(), LoadingState::NoMatches);
    }

    #[test]
    fn oversized_items_are_filtered_at_merge() {
        let mut h = harness_with(CoordinatorOptions {
            page_limit: 10,
            max_bytes: 1_000,
            ..CoordinatorOptions::default()
        });
        h.feed.start();
        complete_all(&mut h);
        assert!(h.feed.visible_items().is_empty());
        assert!(h.feed.lane(LaneKind::Trending).has_completed_page());
        assert_eq!(h.feed.lane(LaneKind::Trending).next_offset(), 10);
    }

    #[test]
    fn selection_uses_configured_ceiling() {
        let mut h = harness_with(CoordinatorOptions {
            animated: false,
            max_bytes: 1_000_000,
            ..CoordinatorOptions::default()
        });
        h.feed.start();
        complete_all(&mut h);
        let item = &h.feed.visible_items()[0];
        // The 480px still is over the ceiling, so the 200px one wins.
        let chosen = h.feed.select(item, 480).unwrap();
        assert_eq!(chosen.width, 200);
        assert_eq!(chosen.kind, crate::media::VariantKind::Still);
    }

    #[test]
    fn trending_and_search_fetch_concurrently() {
        let mut h = harness();
        h.feed.start();
        h.feed.on_search_activated();
        search_for(&mut h, "cats");
        assert_eq!(h.runner.pending(), 2);
        complete_all(&mut h);
        assert_eq!(h.feed.lane(LaneKind::Trending).items().len(), 25);
        assert_eq!(h.feed.lane(LaneKind::Search).items().len(), 25);
    }

    #[test]
    fn api_errors_are_described_without_context() {
        let err = anyhow::Error::from(GiphyError::MissingApiKey).context("fetch trending");
        assert_eq!(describe(&err), GiphyError::MissingApiKey.to_string());

        let err = anyhow::anyhow!("connection refused").context("fetch trending");
        assert_eq!(describe(&err), "connection refused");

        let err = anyhow::Error::from(GiphyError::Status {
            status: 503,
            body: "<html><body>Service Unavailable</body></html>".into(),
        })
        .context("fetch trending");
        assert_eq!(describe(&err), "giphy: api error 503");
    }

    #[test]
    fn shutdown_discards_in_flight_and_blocks_new_fetches() {
        let mut h = harness();
        h.feed.start();
        h.feed.on_search_activated();
        h.feed.on_search_text_changed("cats");
        h.feed.shutdown();

        complete_all(&mut h);
        assert!(h.feed.visible_items().is_empty());
        assert!(!h.feed.tick_at(Instant::now() + Duration::from_secs(1)));
        assert!(!h.feed.start());
        assert_eq!(h.runner.pending(), 0);
    }

    #[test]
    fn thread_runner_delivers_completions() {
        let provider = Arc::new(MockFeedProvider::new(10));
        let mut feed = FeedCoordinator::new(
            provider,
            Arc::new(ThreadRunner),
            CoordinatorOptions::default(),
        );
        feed.start();
        assert!(feed.poll_timeout(Duration::from_secs(5)));
        assert_eq!(feed.visible_items().len(), 10);
    }
}
