/// Coalescing refetch gate for one subscription scope.
///
/// Invariants: at most one refetch in flight, at most one queued follow-up
/// regardless of how many notifications arrive in the meantime, and nothing
/// schedules after release. Completions carry the epoch they were issued
/// under; `accepts` rejects results from a released or retargeted scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefetchGate {
    epoch: u64,
    in_flight: bool,
    queued: bool,
    released: bool,
}

impl Default for RefetchGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RefetchGate {
    pub fn new() -> Self {
        Self {
            epoch: 1,
            in_flight: false,
            queued: false,
            released: false,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// A change notification (or a mount-time/manual refresh) asks for an
    /// authoritative fetch. Returns true when the caller should start one
    /// now; while one is in flight the request coalesces into a single
    /// queued follow-up instead.
    pub fn request(&mut self) -> bool {
        if self.released {
            return false;
        }
        if self.in_flight {
            self.queued = true;
            return false;
        }
        self.in_flight = true;
        true
    }

    /// The in-flight refetch settled, successfully or not. Returns true
    /// when a queued follow-up should start immediately.
    pub fn settle(&mut self) -> bool {
        self.in_flight = false;
        if self.released {
            self.queued = false;
            return false;
        }
        if self.queued {
            self.queued = false;
            self.in_flight = true;
            return true;
        }
        false
    }

    /// True when a completion carrying `epoch` may still be applied.
    pub fn accepts(&self, epoch: u64) -> bool {
        !self.released && epoch == self.epoch
    }

    /// Releases the scope on view teardown: no further refetch schedules,
    /// the queued follow-up is dropped, and in-flight results fail the
    /// epoch check when they land.
    pub fn release(&mut self) {
        self.released = true;
        self.queued = false;
        self.epoch += 1;
    }

    /// Re-arms the gate for a new scope (channel switch). The epoch bump
    /// invalidates every completion issued for the previous scope.
    pub fn rearm(&mut self) {
        self.released = false;
        self.in_flight = false;
        self.queued = false;
        self.epoch += 1;
    }
}
