//! Registry of the items, factory groups, factories and processes that make
//! up one game's production rules.
//!
//! [`DatasetBuilder`] validates each definition as it is registered, so a
//! built [`Dataset`] always satisfies: ids are unique within each kind,
//! every stack names a registered item, every process and factory names
//! registered groups, and every process runs for a positive duration.

use crate::chain::ProcessChain;
use crate::factory::{Factory, FactoryGroup};
use crate::item::Item;
use crate::process::Process;
use crate::stack::{Stack, merge_stacks};
use std::collections::HashMap;

/// Errors registering dataset definitions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("duplicate item: {0}")]
    DuplicateItem(String),
    #[error("duplicate factory group: {0}")]
    DuplicateGroup(String),
    #[error("duplicate factory: {0}")]
    DuplicateFactory(String),
    #[error("duplicate process: {0}")]
    DuplicateProcess(String),
    #[error("{owner} references unknown item '{item}'")]
    UnknownItem { owner: String, item: String },
    #[error("{owner} references unknown factory group '{group}'")]
    UnknownGroup { owner: String, group: String },
    #[error("process '{process}' has non-positive duration {duration}")]
    InvalidDuration { process: String, duration: f64 },
    #[error("factory '{factory}' has non-positive {multiplier} multiplier")]
    InvalidMultiplier {
        factory: String,
        multiplier: &'static str,
    },
}

/// Builder for an immutable [`Dataset`].
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    items: Vec<Item>,
    item_index: HashMap<String, usize>,
    groups: Vec<FactoryGroup>,
    factories: Vec<Factory>,
    factory_index: HashMap<String, usize>,
    processes: Vec<Process>,
    process_index: HashMap<String, usize>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item and return its handle.
    pub fn register_item(
        &mut self,
        id: &str,
        name: &str,
        group: Option<&str>,
    ) -> Result<Item, DatasetError> {
        if self.item_index.contains_key(id) {
            return Err(DatasetError::DuplicateItem(id.to_string()));
        }
        let item = Item::new(id, name, group);
        self.item_index.insert(id.to_string(), self.items.len());
        self.items.push(item.clone());
        Ok(item)
    }

    pub fn register_group(&mut self, id: &str) -> Result<FactoryGroup, DatasetError> {
        if self.groups.iter().any(|g| g.id() == id) {
            return Err(DatasetError::DuplicateGroup(id.to_string()));
        }
        let group = FactoryGroup::new(id);
        self.groups.push(group.clone());
        Ok(group)
    }

    pub fn register_factory(
        &mut self,
        id: &str,
        name: &str,
        groups: &[&str],
        duration_multiplier: f64,
        output_multiplier: f64,
    ) -> Result<(), DatasetError> {
        if self.factory_index.contains_key(id) {
            return Err(DatasetError::DuplicateFactory(id.to_string()));
        }
        for (multiplier, value) in [("duration", duration_multiplier), ("output", output_multiplier)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(DatasetError::InvalidMultiplier {
                    factory: id.to_string(),
                    multiplier,
                });
            }
        }
        let owner = format!("factory '{id}'");
        let groups = groups
            .iter()
            .map(|g| self.resolve_group(&owner, g))
            .collect::<Result<Vec<_>, _>>()?;

        self.factory_index.insert(id.to_string(), self.factories.len());
        self.factories.push(
            Factory::new(id, name, groups).with_multipliers(duration_multiplier, output_multiplier),
        );
        Ok(())
    }

    /// Register a process from `(item id, quantity)` pairs. Repeated items
    /// on one side are merged.
    pub fn register_process(
        &mut self,
        id: &str,
        inputs: &[(&str, f64)],
        outputs: &[(&str, f64)],
        duration: f64,
        group: &str,
    ) -> Result<(), DatasetError> {
        if self.process_index.contains_key(id) {
            return Err(DatasetError::DuplicateProcess(id.to_string()));
        }
        if duration <= 0.0 {
            return Err(DatasetError::InvalidDuration {
                process: id.to_string(),
                duration,
            });
        }
        let owner = format!("process '{id}'");
        let group = self.resolve_group(&owner, group)?;
        let inputs = self.resolve_stacks(&owner, inputs)?;
        let outputs = self.resolve_stacks(&owner, outputs)?;

        self.process_index.insert(id.to_string(), self.processes.len());
        self.processes
            .push(Process::new(id, inputs, outputs, duration, group));
        Ok(())
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.item_index.get(id).map(|&idx| &self.items[idx])
    }

    fn resolve_group(&self, owner: &str, id: &str) -> Result<FactoryGroup, DatasetError> {
        self.groups
            .iter()
            .find(|g| g.id() == id)
            .cloned()
            .ok_or_else(|| DatasetError::UnknownGroup {
                owner: owner.to_string(),
                group: id.to_string(),
            })
    }

    fn resolve_stacks(&self, owner: &str, pairs: &[(&str, f64)]) -> Result<Vec<Stack>, DatasetError> {
        let stacks = pairs
            .iter()
            .map(|(item, quantity)| {
                self.item(item)
                    .map(|i| Stack::new(i.clone(), *quantity))
                    .ok_or_else(|| DatasetError::UnknownItem {
                        owner: owner.to_string(),
                        item: item.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(merge_stacks(stacks))
    }

    /// Freeze the registered definitions.
    pub fn build(self) -> Dataset {
        Dataset {
            items: self.items,
            item_index: self.item_index,
            groups: self.groups,
            factories: self.factories,
            factory_index: self.factory_index,
            processes: self.processes,
            process_index: self.process_index,
        }
    }
}

/// Immutable dataset. Frozen after [`DatasetBuilder::build`].
#[derive(Debug, Clone)]
pub struct Dataset {
    items: Vec<Item>,
    item_index: HashMap<String, usize>,
    groups: Vec<FactoryGroup>,
    factories: Vec<Factory>,
    factory_index: HashMap<String, usize>,
    processes: Vec<Process>,
    process_index: HashMap<String, usize>,
}

impl Dataset {
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.item_index.get(id).map(|&idx| &self.items[idx])
    }

    pub fn factory(&self, id: &str) -> Option<&Factory> {
        self.factory_index.get(id).map(|&idx| &self.factories[idx])
    }

    pub fn process(&self, id: &str) -> Option<&Process> {
        self.process_index.get(id).map(|&idx| &self.processes[idx])
    }

    pub fn group(&self, id: &str) -> Option<&FactoryGroup> {
        self.groups.iter().find(|g| g.id() == id)
    }

    /// Items in registration order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn groups(&self) -> &[FactoryGroup] {
        &self.groups
    }

    /// Factories in registration order.
    pub fn factories(&self) -> &[Factory] {
        &self.factories
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Factories able to run `group`, in registration order.
    pub fn factories_for(&self, group: &FactoryGroup) -> Vec<&Factory> {
        self.factories.iter().filter(|f| f.supports(group)).collect()
    }

    /// A chain of every registered process.
    pub fn chain(&self) -> ProcessChain {
        ProcessChain::new(self.processes.clone())
    }
}
