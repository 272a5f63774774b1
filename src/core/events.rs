use crate::core::reconciler::CycleReport;

#[derive(Debug, Clone)]
pub enum SyncEvent {
    SchedulerStarted { strategy: &'static str },
    SchedulerStopped,
    CycleApplied { strategy: &'static str, report: CycleReport },
    CycleFailed { message: String },
}
