use crate::core::model::{EntityState, EntityStatus, Slot, TargetKind};
use crate::core::page::Page;
use crate::core::reconciler::{combine, refresh_detail, Reconcile, RecordPatch, SummaryPatch};

/// Release table of a series page: rows show a compact percentage while the
/// download runs and switch to the "downloaded" rendering once done.
#[derive(Debug, Default)]
pub struct SeriesReconciler;

impl SeriesReconciler {
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

        match record.state {
            EntityState::Done => {
                row.render_done()?;
                row.set_recorded_status(EntityState::Done);
                Ok(SummaryPatch::MarkedDone)
            }
            // Only touch the percentage text so the running CSS animation on
            // the cell keeps going.
            EntityState::InProgress => {
                if row.write(Slot::Percent, &record.percent_label())? {
                    Ok(SummaryPatch::Progress)
                } else {
                    Ok(SummaryPatch::SlotAbsent)
                }
            }
        }
    }
}

impl Reconcile for SeriesReconciler {
    fn name(&self) -> &'static str {
        "series"
    }

    fn apply(&self, record: &EntityStatus, page: &mut dyn Page) -> anyhow::Result<RecordPatch> {
        let summary = self.patch_summary(record, page);
        let detail = refresh_detail(record, page);
        combine(summary, detail)
    }
}
