use crate::core::model::{target_id, EntityState, Slot, TargetKind};
use std::collections::{BTreeMap, HashMap};

/// A rendered region bound to one entity. Owned by the host; the reconciler
/// only reads the recorded status and writes patches.
pub trait Region {
    fn recorded_status(&self) -> Option<EntityState>;

    fn set_recorded_status(&mut self, state: EntityState);

    /// Replace the whole content with the terminal rendering.
    fn render_done(&mut self) -> anyhow::Result<()>;

    /// Patch one sub-element. Returns `false` when the slot is not present.
    fn write(&mut self, slot: Slot, value: &str) -> anyhow::Result<bool>;
}

pub trait Page: Send {
    /// Lookup by target id; `None` is the normal case for closed views.
    fn region(&mut self, id: &str) -> Option<&mut dyn Region>;

    fn target(&mut self, kind: TargetKind, entity_id: &str) -> Option<&mut dyn Region> {
        self.region(&target_id(kind, entity_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRegion {
    pub status: Option<String>,
    pub content: String,
    pub slots: BTreeMap<Slot, String>,
    done_template: String,
}

impl MemoryRegion {
    pub fn with_slots(slots: &[Slot]) -> Self {
        Self {
            slots: slots.iter().map(|s| (*s, String::new())).collect(),
            ..Self::default()
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }
}

impl Region for MemoryRegion {
    fn recorded_status(&self) -> Option<EntityState> {
        self.status.as_deref().map(EntityState::from_code)
    }

    fn set_recorded_status(&mut self, state: EntityState) {
        self.status = Some(state.code().to_string());
    }

    fn render_done(&mut self) -> anyhow::Result<()> {
        self.slots.clear();
        self.content = self.done_template.clone();
        Ok(())
    }

    fn write(&mut self, slot: Slot, value: &str) -> anyhow::Result<bool> {
        match self.slots.get_mut(&slot) {
            Some(v) => {
                value.clone_into(v);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory mirror of a rendered page: regions keyed by target id.
#[derive(Debug, Default)]
pub struct MemoryPage {
    done_template: String,
    regions: HashMap<String, MemoryRegion>,
}

impl MemoryPage {
    pub fn with_done_template(template: impl Into<String>) -> Self {
        Self { done_template: template.into(), regions: HashMap::new() }
    }

    /// Summary row; the percentage span is optional in real markup.
    pub fn add_summary(&mut self, entity_id: &str, slots: &[Slot], status: Option<EntityState>) {
        let mut region = MemoryRegion::with_slots(slots);
        region.status = status.map(|s| s.code().to_string());
        self.insert(target_id(TargetKind::Summary, entity_id), region);
    }

    pub fn add_detail(&mut self, entity_id: &str) {
        let region = MemoryRegion::with_slots(&[Slot::Stats, Slot::Progress]);
        self.insert(target_id(TargetKind::Detail, entity_id), region);
    }

    pub fn insert(&mut self, id: String, mut region: MemoryRegion) {
        region.done_template = self.done_template.clone();
        self.regions.insert(id, region);
    }

    pub fn remove(&mut self, id: &str) -> Option<MemoryRegion> {
        self.regions.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&MemoryRegion> {
        self.regions.get(id)
    }

    pub fn summary(&self, entity_id: &str) -> Option<&MemoryRegion> {
        self.get(&target_id(TargetKind::Summary, entity_id))
    }

    pub fn detail(&self, entity_id: &str) -> Option<&MemoryRegion> {
        self.get(&target_id(TargetKind::Detail, entity_id))
    }
}

impl Page for MemoryPage {
    fn region(&mut self, id: &str) -> Option<&mut dyn Region> {
        self.regions.get_mut(id).map(|r| r as &mut dyn Region)
    }
}
