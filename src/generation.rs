use crate::feed::LaneKind;

/// Generation stamp carried by an outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Per-lane generation counters.
///
/// Counters only move on reset events. A request is stamped with the
/// counter at dispatch and its response is applied only if the counter has
/// not moved since.
#[derive(Debug, Clone, Default)]
pub struct GenerationGuard {
    generations: [u64; 2],
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_request(&self, lane: LaneKind) -> Token {
        Token(self.generations[lane.index()])
    }

    pub fn is_current(&self, lane: LaneKind, token: Token) -> bool {
        self.generations[lane.index()] == token.0
    }

    pub fn current(&self, lane: LaneKind) -> Token {
        self.begin_request(lane)
    }

    pub fn invalidate(&mut self, lane: LaneKind) -> Token {
        let slot = &mut self.generations[lane.index()];
        *slot = slot.wrapping_add(1);
        Token(*slot)
    }

    pub fn invalidate_all(&mut self) {
        for lane in LaneKind::ALL {
            self.invalidate(lane);
        }
    }
}
