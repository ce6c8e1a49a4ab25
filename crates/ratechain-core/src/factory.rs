use crate::process::Process;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A category tag matching processes to the machines that can run them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactoryGroup(String);

impl FactoryGroup {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactoryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A machine archetype.
///
/// `duration_multiplier` scales how long a recipe takes in this machine and
/// `output_multiplier` scales how much it yields. A machine twice as fast as
/// the baseline has a duration multiplier of `0.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub id: String,
    pub name: String,
    pub groups: Vec<FactoryGroup>,
    pub duration_multiplier: f64,
    pub output_multiplier: f64,
}

impl Factory {
    /// A baseline factory with both multipliers at `1.0`.
    pub fn new(id: &str, name: &str, groups: Vec<FactoryGroup>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            groups,
            duration_multiplier: 1.0,
            output_multiplier: 1.0,
        }
    }

    pub fn with_multipliers(mut self, duration: f64, output: f64) -> Self {
        self.duration_multiplier = duration;
        self.output_multiplier = output;
        self
    }

    /// Compose additional multipliers on top of this factory's own (modules,
    /// beacons, upgrades).
    pub fn modify(&self, duration: f64, output: f64) -> Factory {
        Factory {
            duration_multiplier: self.duration_multiplier * duration,
            output_multiplier: self.output_multiplier * output,
            ..self.clone()
        }
    }

    /// Whether this factory belongs to `group`.
    pub fn supports(&self, group: &FactoryGroup) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// The process as run by this factory: duration scaled by the duration
    /// multiplier, outputs scaled by the output multiplier. Inputs and the
    /// process kind are unchanged.
    pub fn update_process(&self, process: &Process) -> Process {
        Process {
            duration: process.duration * self.duration_multiplier,
            outputs: process
                .outputs
                .iter()
                .map(|s| s.mul(self.output_multiplier))
                .collect(),
            ..process.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;

    fn assembler() -> Factory {
        Factory::new(
            "assembler",
            "Assembling Machine",
            vec![FactoryGroup::new("crafting")],
        )
    }

    #[test]
    fn modify_composes_multipliers() {
        let base = assembler().with_multipliers(0.5, 1.0);
        let moduled = base.modify(0.8, 1.1).modify(0.5, 2.0);
        assert!((moduled.duration_multiplier - 0.2).abs() < 1e-12);
        assert!((moduled.output_multiplier - 2.2).abs() < 1e-12);
        assert_eq!(moduled.id, "assembler");
        // The original is untouched.
        assert_eq!(base.duration_multiplier, 0.5);
    }

    #[test]
    fn supports_checks_groups() {
        let f = assembler();
        assert!(f.supports(&FactoryGroup::new("crafting")));
        assert!(!f.supports(&FactoryGroup::new("smelting")));
    }

    #[test]
    fn update_process_scales_duration_and_outputs() {
        let mut fx = Fixture::new();
        let gear = fx.process_with_duration("gear", &[("iron", 2.0)], &[("gear", 1.0)], 0.5);
        let fast = assembler().with_multipliers(0.5, 1.5);

        let updated = fast.update_process(&gear);
        assert_eq!(updated.duration, 0.25);
        assert_eq!(updated.outputs[0].quantity, 1.5);
        assert_eq!(updated.inputs[0].quantity, 2.0);
        assert_eq!(updated.id, "gear");
        // Source process untouched.
        assert_eq!(gear.duration, 0.5);
    }

    #[test]
    fn group_serializes_as_plain_string() {
        let json = serde_json::to_string(&FactoryGroup::new("smelting")).unwrap();
        assert_eq!(json, "\"smelting\"");
    }
}
