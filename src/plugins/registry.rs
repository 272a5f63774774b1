use async_trait::async_trait;
use crate::core::error::FetchError;
use crate::core::model::EntityStatus;
use crate::core::reconciler::Reconcile;
use clap::{ArgMatches, Command};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FetcherContext {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for FetcherContext {
    fn default() -> Self {
        Self { user_agent: "progress-sync/0.1".to_string(), timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncCliConfig {
    pub headers: HashMap<String, String>,
    pub fetcher: FetcherContext,
}

pub trait CliPlugin: Send + Sync {
    fn name(&self) -> &'static str;
    fn augment_watch_command(&self, cmd: Command) -> Command;
    fn apply_watch_matches(&self, matches: &ArgMatches, cfg: &mut SyncCliConfig) -> anyhow::Result<()>;
}

/// Source of batch status snapshots. One call per poll cycle, no retries:
/// a failure just drops that cycle.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_batch_status(&self) -> Result<Vec<EntityStatus>, FetchError>;
}

pub struct PluginRegistry {
    strategies: Vec<Arc<dyn Reconcile>>,
    cli_plugins: Vec<Box<dyn CliPlugin>>,
}

impl PluginRegistry {
    pub fn with_defaults() -> Self {
        let mut reg = Self { strategies: vec![], cli_plugins: vec![] };

        reg.strategies.push(Arc::new(crate::plugins::series::reconciler::SeriesReconciler::new()));
        reg.strategies.push(Arc::new(crate::plugins::status::reconciler::StatusReconciler::new()));

        reg.cli_plugins.push(Box::new(crate::plugins::http::cli::HttpCliPlugin::new()));
        reg
    }

    pub fn augment_watch_command(&self, cmd: Command) -> Command {
        self.cli_plugins
            .iter()
            .fold(cmd, |c, p| p.augment_watch_command(c))
    }

    pub fn apply_watch_matches(&self, matches: &ArgMatches, cfg: &mut SyncCliConfig) -> anyhow::Result<()> {
        for p in &self.cli_plugins {
            p.apply_watch_matches(matches, cfg)?;
        }
        Ok(())
    }

    pub fn strategy(&self, page: &str) -> Option<Arc<dyn Reconcile>> {
        self.strategies.iter().find(|s| s.name() == page).cloned()
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_strategies_by_page_kind() {
        let reg = PluginRegistry::with_defaults();
        assert_eq!(reg.strategy_names(), vec!["series", "status"]);
        assert_eq!(reg.strategy("status").map(|s| s.name()), Some("status"));
        assert!(reg.strategy("gallery").is_none());
    }
}
