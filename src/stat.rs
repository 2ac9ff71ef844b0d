use tracing::info;

/// Counters for one `search()` call.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// Wavefront states popped from the heap.
    pub pops: usize,
    /// Popped states discarded because their cell was already committed.
    pub stale_skips: usize,
    /// Wavefront states pushed onto the heap.
    pub pushes: usize,
    /// Predecessor directions committed to the grid.
    pub commits: usize,
}

impl SearchStats {
    pub fn reset(&mut self) {
        *self = SearchStats::default();
    }

    pub fn print(&self) {
        info!(
            "Popped {:?} (stale {:?}) Pushed {:?} Committed {:?}",
            self.pops, self.stale_skips, self.pushes, self.commits
        );
    }
}
