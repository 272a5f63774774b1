//! Keeps a rendered downloads view in step with the server's batch progress
//! endpoint: a visibility-gated poll timer, a status fetcher and per-page
//! reconcile strategies that never regress a finished row.

pub mod core;
pub mod i18n;
pub mod plugins;
