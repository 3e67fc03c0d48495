use crate::media::MediaItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    Trending,
    Search,
}

impl LaneKind {
    pub const ALL: [LaneKind; 2] = [LaneKind::Trending, LaneKind::Search];

    pub fn as_str(self) -> &'static str {
        match self {
            LaneKind::Trending => "trending",
            LaneKind::Search => "search",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            LaneKind::Trending => 0,
            LaneKind::Search => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LaneState {
    #[default]
    Idle,
    FetchInFlight,
    Error(String),
}

/// Pagination block reported by the provider alongside a page.
///
/// Any field may be missing; nothing here is trusted to be consistent with
/// earlier pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageMetadata {
    pub offset: Option<u32>,
    pub count: Option<u32>,
    pub total: Option<u32>,
}

impl PageMetadata {
    pub fn new(offset: u32, count: u32, total: u32) -> Self {
        Self {
            offset: Some(offset),
            count: Some(count),
            total: Some(total),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<MediaItem>,
    pub pagination: PageMetadata,
}

/// One independently paginated stream of results.
#[derive(Debug, Clone)]
pub struct FeedLane {
    kind: LaneKind,
    items: Vec<MediaItem>,
    next_offset: u32,
    state: LaneState,
    last_page: Option<PageMetadata>,
}

impl FeedLane {
    pub fn new(kind: LaneKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            next_offset: 0,
            state: LaneState::Idle,
            last_page: None,
        }
    }

    pub fn kind(&self) -> LaneKind {
        self.kind
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    pub fn state(&self) -> &LaneState {
        &self.state
    }

    pub fn last_page(&self) -> Option<&PageMetadata> {
        self.last_page.as_ref()
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.state, LaneState::FetchInFlight)
    }

    pub fn has_completed_page(&self) -> bool {
        self.last_page.is_some()
    }

    /// True once the provider has signalled there is nothing past the
    /// current offset.
    pub fn is_exhausted(&self) -> bool {
        let Some(page) = &self.last_page else {
            return false;
        };
        if page.count == Some(0) {
            return true;
        }
        matches!(page.total, Some(total) if total > 0 && self.next_offset >= total)
    }

    pub(crate) fn set_state(&mut self, state: LaneState) {
        self.state = state;
    }

    /// Appends the feasible items of a page and advances the offset.
    ///
    /// Duplicates are kept: the provider owns ordering and uniqueness.
    pub fn merge_page<F>(&mut self, items: Vec<MediaItem>, metadata: PageMetadata, filter: F)
    where
        F: Fn(&MediaItem) -> bool,
    {
        self.items.extend(items.into_iter().filter(|item| filter(item)));

        let base = metadata.offset.unwrap_or(self.next_offset);
        if let Some(next) = metadata.count.and_then(|count| base.checked_add(count)) {
            self.next_offset = self.next_offset.max(next);
        }
        self.last_page = Some(metadata);
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.next_offset = 0;
        self.state = LaneState::Idle;
        self.last_page = None;
    }
}
