use crate::core::model::{target_id, EntityState, Slot, TargetKind};
use crate::core::page::{Page, Region};
use crate::i18n::Messages;
use anyhow::Context;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use scraper::Html;
use std::collections::HashMap;

pub const SERIES_ROW_SLOTS: &[Slot] = &[Slot::Percent];
pub const STATUS_ROW_SLOTS: &[Slot] = &[Slot::Stats, Slot::Progress];
const DETAIL_SLOTS: &[Slot] = &[Slot::Stats, Slot::Progress];

/// One progress bar standing in for a rendered region.
pub struct BarRegion {
    bar: ProgressBar,
    status: Option<EntityState>,
    slots: &'static [Slot],
    done_label: &'static str,
}

impl BarRegion {
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Region for BarRegion {
    fn recorded_status(&self) -> Option<EntityState> {
        self.status
    }

    fn set_recorded_status(&mut self, state: EntityState) {
        self.status = Some(state);
    }

    fn render_done(&mut self) -> anyhow::Result<()> {
        self.slots = &[];
        self.bar.finish_with_message(self.done_label);
        Ok(())
    }

    fn write(&mut self, slot: Slot, value: &str) -> anyhow::Result<bool> {
        if !self.slots.contains(&slot) {
            return Ok(false);
        }
        match slot {
            Slot::Percent | Slot::Progress => {
                let pos: u64 = value
                    .trim()
                    .trim_end_matches('%')
                    .parse()
                    .with_context(|| format!("progress value {:?}", value))?;
                self.bar.set_position(pos.min(100));
            }
            Slot::Stats => self.bar.set_message(fragment_text(value)),
        }
        Ok(true)
    }
}

/// A terminal rendering of a downloads list: one bar per tracked row and one
/// per opened detail view.
pub struct TerminalPage {
    mp: MultiProgress,
    row_style: ProgressStyle,
    detail_style: ProgressStyle,
    messages: &'static Messages,
    regions: HashMap<String, BarRegion>,
}

impl TerminalPage {
    pub fn new(messages: &'static Messages) -> anyhow::Result<Self> {
        Self::with_draw_target(ProgressDrawTarget::stderr(), messages)
    }

    pub fn with_draw_target(target: ProgressDrawTarget, messages: &'static Messages) -> anyhow::Result<Self> {
        let row_style = ProgressStyle::with_template("{prefix:.bold} {bar:40.cyan/blue} {pos:>3}% {wide_msg}")?;
        let detail_style = ProgressStyle::with_template("  {prefix:.dim} {bar:40.green/white} {pos:>3}% {wide_msg}")?;
        Ok(Self {
            mp: MultiProgress::with_draw_target(target),
            row_style,
            detail_style,
            messages,
            regions: HashMap::new(),
        })
    }

    pub fn add_summary(&mut self, entity_id: &str, slots: &'static [Slot]) {
        let bar = self.mp.add(ProgressBar::new(100));
        bar.set_style(self.row_style.clone());
        bar.set_prefix(format!("[{}]", short_id(entity_id)));
        bar.set_message(self.messages.waiting);
        self.insert(TargetKind::Summary, entity_id, bar, slots);
    }

    pub fn add_detail(&mut self, entity_id: &str) {
        let bar = self.mp.add(ProgressBar::new(100));
        bar.set_style(self.detail_style.clone());
        bar.set_prefix(format!("{} {}", self.messages.details_prefix, short_id(entity_id)));
        bar.set_message(self.messages.waiting);
        self.insert(TargetKind::Detail, entity_id, bar, DETAIL_SLOTS);
    }

    /// Close a view; the engine simply stops finding it.
    pub fn remove(&mut self, kind: TargetKind, entity_id: &str) -> bool {
        match self.regions.remove(&target_id(kind, entity_id)) {
            Some(region) => {
                region.bar.finish_and_clear();
                self.mp.remove(&region.bar);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, kind: TargetKind, entity_id: &str) -> Option<&BarRegion> {
        self.regions.get(&target_id(kind, entity_id))
    }

    pub fn println(&self, line: impl AsRef<str>) {
        let _ = self.mp.println(line);
    }

    fn insert(&mut self, kind: TargetKind, entity_id: &str, bar: ProgressBar, slots: &'static [Slot]) {
        let region = BarRegion { bar, status: None, slots, done_label: self.messages.status_done };
        self.regions.insert(target_id(kind, entity_id), region);
    }
}

impl Page for TerminalPage {
    fn region(&mut self, id: &str) -> Option<&mut dyn Region> {
        self.regions.get_mut(id).map(|r| r as &mut dyn Region)
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Plain text of a server-rendered fragment: tags dropped, entities decoded,
/// whitespace collapsed.
pub fn fragment_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
