//! Post-drill statistics.
//!
//! Counts what the driller produced and how many iterations the shortcut
//! checks saved, and reports the totals through the log.

use super::{DrillMap, DrillResult};
use tracing::info;

#[derive(Clone, Copy, Debug, Default)]
pub struct SpotCounts {
    pub total: u64,
    pub unprocessed: u64,
    pub interior: u64,
    pub exterior: u64,
    pub glitches: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ShortcutCounts {
    pub bulb: u64,
    pub cardioid: u64,
    pub periodic: u64,
    pub attracted: u64,
    pub approximations: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IterationCounts {
    pub total: u64,
    pub interior: u64,
    pub exterior: u64,
    /// Iterations not executed thanks to shortcuts and series skipping.
    pub saved: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MapAnalyzer {
    pub spots: SpotCounts,
    pub shortcuts: ShortcutCounts,
    pub iterations: IterationCounts,
}

impl MapAnalyzer {
    pub fn analyze(map: &DrillMap, depth: i64) -> Self {
        let mut stats = Self::default();
        let depth = depth.max(0) as u64;

        for y in 0..map.height {
            for x in 0..map.width {
                let entry = map.get(x, y);
                stats.spots.total += 1;

                let executed = (entry.last - entry.first).max(0) as u64;
                stats.shortcuts.approximations += entry.first.max(0) as u64;
                stats.iterations.saved += entry.first.max(0) as u64;

                match entry.result {
                    DrillResult::Unprocessed => stats.spots.unprocessed += 1,
                    DrillResult::Escaped => {
                        stats.spots.exterior += 1;
                        stats.iterations.total += executed;
                        stats.iterations.exterior += executed;
                    }
                    DrillResult::MaxDepthReached => {
                        stats.spots.interior += 1;
                        stats.iterations.total += executed;
                        stats.iterations.interior += executed;
                    }
                    DrillResult::InBulb => {
                        stats.spots.interior += 1;
                        stats.shortcuts.bulb += 1;
                        stats.iterations.saved += depth;
                    }
                    DrillResult::InCardioid => {
                        stats.spots.interior += 1;
                        stats.shortcuts.cardioid += 1;
                        stats.iterations.saved += depth;
                    }
                    DrillResult::Periodic => {
                        stats.spots.interior += 1;
                        stats.shortcuts.periodic += 1;
                        stats.iterations.total += executed;
                        stats.iterations.saved += depth.saturating_sub(entry.last.max(0) as u64);
                    }
                    DrillResult::Attracted => {
                        stats.spots.interior += 1;
                        stats.shortcuts.attracted += 1;
                        stats.iterations.total += executed;
                        stats.iterations.saved += depth.saturating_sub(entry.last.max(0) as u64);
                    }
                    DrillResult::Glitch => stats.spots.glitches += 1,
                }
            }
        }

        stats
    }

    /// Write the summary to the log.
    pub fn report(&self) {
        info!(
            total = self.spots.total,
            interior = self.spots.interior,
            exterior = self.spots.exterior,
            glitches = self.spots.glitches,
            unprocessed = self.spots.unprocessed,
            "spot counts"
        );
        info!(
            bulb = self.shortcuts.bulb,
            cardioid = self.shortcuts.cardioid,
            periodic = self.shortcuts.periodic,
            attracted = self.shortcuts.attracted,
            skipped = self.shortcuts.approximations,
            "shortcut counts"
        );
        info!(
            executed = self.iterations.total,
            interior = self.iterations.interior,
            exterior = self.iterations.exterior,
            saved = self.iterations.saved,
            "iteration counts"
        );
    }
}
