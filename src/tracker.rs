/// Counters describing how a translator has served its requests so far. They start at zero and
/// only ever grow. The owning `Translator` is the only writer; everyone else gets `&Tracker`.
///
/// `correct_memory_accesses` is left at zero by the translator and filled in by the replay
/// harness, which is the only party that knows the expected results.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Tracker {
    pub attempted_memory_accesses: usize,
    pub page_faults: usize,
    pub page_hits: usize,
    pub tlb_hits: usize,
    pub tlb_flushes: usize,
    pub correct_memory_accesses: usize,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tlb_hit_rate(&self) -> f64 {
        ratio(self.tlb_hits, self.attempted_memory_accesses)
    }

    pub fn page_fault_rate(&self) -> f64 {
        ratio(self.page_faults, self.attempted_memory_accesses)
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    match total {
        0 => 0.0,
        _ => count as f64 / total as f64,
    }
}

impl std::fmt::Display for Tracker {
    /// Renders the counters followed by the hit and fault rates as percentages of all requests.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "
Stats Tracked
---------------------------------
attempted_memory_accesses: {:08}
correct_memory_accesses:   {:08}
page_faults:               {:08}
page_hits:                 {:08}
tlb_hits:                  {:08}
tlb_flushes:               {:08}


tlb hit rate:              {:>7.2}%
page fault rate:           {:>7.2}%
",
            self.attempted_memory_accesses,
            self.correct_memory_accesses,
            self.page_faults,
            self.page_hits,
            self.tlb_hits,
            self.tlb_flushes,
            self.tlb_hit_rate() * 100.0,
            self.page_fault_rate() * 100.0,
        )
    }
}
