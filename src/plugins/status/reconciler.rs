use crate::core::model::{EntityState, EntityStatus, Slot, TargetKind};
use crate::core::page::Page;
use crate::core::reconciler::{combine, refresh_detail, Reconcile, RecordPatch, SummaryPatch};

/// Downloads table of the status page: every row carries the full stats line
/// and progress widget. Rows are marked done by the server-side render, never
/// here.
#[derive(Debug, Default)]
pub struct StatusReconciler;

impl StatusReconciler {
    pub fn new() -> Self {
        Self
    }

    fn patch_summary(&self, record: &EntityStatus, page: &mut dyn Page) -> anyhow::Result<SummaryPatch> {
        let Some(row) = page.target(TargetKind::Summary, &record.id) else {
            return Ok(SummaryPatch::Missing);
        };
        if row.recorded_status().is_some_and(EntityState::is_terminal) {
            return Ok(SummaryPatch::Protected);
        }

        let stats = row.write(Slot::Stats, &record.stats)?;
        let progress = row.write(Slot::Progress, &record.progress.to_string())?;
        Ok(if stats || progress { SummaryPatch::Progress } else { SummaryPatch::SlotAbsent })
    }
}

impl Reconcile for StatusReconciler {
    fn name(&self) -> &'static str {
        "status"
    }

    fn apply(&self, record: &EntityStatus, page: &mut dyn Page) -> anyhow::Result<RecordPatch> {
        let summary = self.patch_summary(record, page);
        let detail = refresh_detail(record, page);
        combine(summary, detail)
    }
}
