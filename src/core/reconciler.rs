use crate::core::model::{EntityStatus, Slot, TargetKind};
use crate::core::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryPatch {
    /// No summary target on the page for this entity.
    Missing,
    /// Target already recorded as done; nothing written.
    Protected,
    /// Switched to the terminal rendering.
    MarkedDone,
    /// Dynamic sub-elements updated in place.
    Progress,
    /// Target present but it has none of the slots this strategy writes.
    SlotAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPatch {
    pub summary: SummaryPatch,
    pub detail_refreshed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub records: usize,
    pub marked_done: usize,
    pub progressed: usize,
    pub protected: usize,
    pub missing: usize,
    pub details: usize,
    pub failed: usize,
}

impl CycleReport {
    fn record(&mut self, patch: RecordPatch) {
        match patch.summary {
            SummaryPatch::Missing => self.missing += 1,
            SummaryPatch::Protected => self.protected += 1,
            SummaryPatch::MarkedDone => self.marked_done += 1,
            SummaryPatch::Progress => self.progressed += 1,
            SummaryPatch::SlotAbsent => {}
        }
        if patch.detail_refreshed {
            self.details += 1;
        }
    }
}

/// A page-specific way of applying a status batch to rendered targets.
///
/// Implementations only provide [`Reconcile::apply`]; the batch loop isolates
/// per-record failures so one bad target cannot stop the rest.
pub trait Reconcile: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, record: &EntityStatus, page: &mut dyn Page) -> anyhow::Result<RecordPatch>;

    fn reconcile(&self, records: &[EntityStatus], page: &mut dyn Page) -> CycleReport {
        let mut report = CycleReport { records: records.len(), ..CycleReport::default() };
        for record in records {
            match self.apply(record, page) {
                Ok(patch) => {
                    tracing::trace!(id = %record.id, ?patch, "record applied");
                    report.record(patch);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(strategy = self.name(), id = %record.id, "failed to patch record: {:#}", e);
                }
            }
        }
        report
    }
}

/// Refresh the expanded view if it is open. No terminal protection: the view
/// is recreated on every open, so stale values cannot accumulate.
pub fn refresh_detail(record: &EntityStatus, page: &mut dyn Page) -> anyhow::Result<bool> {
    let Some(detail) = page.target(TargetKind::Detail, &record.id) else {
        return Ok(false);
    };
    detail.write(Slot::Stats, &record.stats)?;
    detail.write(Slot::Progress, &record.progress.to_string())?;
    Ok(true)
}

/// Run the summary patch and the detail refresh independently, then surface
/// the first failure.
pub fn combine(
    summary: anyhow::Result<SummaryPatch>,
    detail: anyhow::Result<bool>,
) -> anyhow::Result<RecordPatch> {
    Ok(RecordPatch { summary: summary?, detail_refreshed: detail? })
}
