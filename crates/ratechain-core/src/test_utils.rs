//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::chain::ProcessChain;
use crate::factory::FactoryGroup;
use crate::item::Item;
use crate::process::Process;
use crate::stack::Stack;
use std::collections::HashMap;

// ===========================================================================
// Float comparison
// ===========================================================================

/// Assert two floats agree to within `1e-9`, relative for large values.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= 1e-9 * scale,
        "expected {expected}, got {actual}"
    );
}

// ===========================================================================
// Fixture
// ===========================================================================

/// Name of the factory group every fixture process belongs to.
pub const FIXTURE_GROUP: &str = "assembler";

/// Interns items by id so processes built from the same fixture share item
/// identity, the way a dataset does.
#[derive(Debug, Default)]
pub struct Fixture {
    items: HashMap<String, Item>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(&mut self, id: &str) -> Item {
        self.items
            .entry(id.to_string())
            .or_insert_with(|| Item::named(id))
            .clone()
    }

    pub fn stack(&mut self, id: &str, quantity: f64) -> Stack {
        Stack::new(self.item(id), quantity)
    }

    pub fn group(&self) -> FactoryGroup {
        FactoryGroup::new(FIXTURE_GROUP)
    }

    fn stacks(&mut self, pairs: &[(&str, f64)]) -> Vec<Stack> {
        pairs.iter().map(|(id, q)| self.stack(id, *q)).collect()
    }

    /// A process with unit duration.
    pub fn process(&mut self, id: &str, inputs: &[(&str, f64)], outputs: &[(&str, f64)]) -> Process {
        self.process_with_duration(id, inputs, outputs, 1.0)
    }

    pub fn process_with_duration(
        &mut self,
        id: &str,
        inputs: &[(&str, f64)],
        outputs: &[(&str, f64)],
        duration: f64,
    ) -> Process {
        let inputs = self.stacks(inputs);
        let outputs = self.stacks(outputs);
        Process::new(id, inputs, outputs, duration, self.group())
    }
}

// ===========================================================================
// Scenario builders
// ===========================================================================

/// A straight line of `length` processes: `p0: raw -> i0`, `p1: i0 -> i1`, ...
/// Each step needs `ratio` of the previous item. The last item is
/// `i{length-1}`.
pub fn linear_chain(fx: &mut Fixture, length: usize, ratio: f64) -> ProcessChain {
    let mut processes = Vec::with_capacity(length);
    for i in 0..length {
        let input = if i == 0 {
            "raw".to_string()
        } else {
            format!("i{}", i - 1)
        };
        let output = format!("i{i}");
        processes.push(fx.process(
            &format!("p{i}"),
            &[(input.as_str(), ratio)],
            &[(output.as_str(), 1.0)],
        ));
    }
    ProcessChain::new(processes)
}

/// A full binary assembly tree of the given depth. The root process is
/// `n0` producing `t0`; node `k` consumes the products of `2k+1` and `2k+2`.
/// Leaves consume `raw`.
pub fn assembly_tree(fx: &mut Fixture, depth: u32) -> ProcessChain {
    let nodes = (1usize << depth) - 1;
    let mut processes = Vec::with_capacity(nodes);
    for k in 0..nodes {
        let left = 2 * k + 1;
        let right = 2 * k + 2;
        let output = format!("t{k}");
        let process = if right < nodes {
            let l = format!("t{left}");
            let r = format!("t{right}");
            fx.process(
                &format!("n{k}"),
                &[(l.as_str(), 1.0), (r.as_str(), 2.0)],
                &[(output.as_str(), 1.0)],
            )
        } else {
            fx.process(&format!("n{k}"), &[("raw", 1.0)], &[(output.as_str(), 1.0)])
        };
        processes.push(process);
    }
    ProcessChain::new(processes)
}

/// `count` independent two-process loops (`a{k}: x{k} -> y{k} + out{k}`,
/// `b{k}: y{k} -> x{k}`) plus a collector consuming every `out{k}`.
pub fn looped_chain(fx: &mut Fixture, count: usize) -> ProcessChain {
    let mut processes = Vec::with_capacity(2 * count + 1);
    let mut collected = Vec::with_capacity(count);
    for k in 0..count {
        let x = format!("x{k}");
        let y = format!("y{k}");
        let out = format!("out{k}");
        processes.push(fx.process(
            &format!("a{k}"),
            &[(x.as_str(), 1.0)],
            &[(y.as_str(), 1.0), (out.as_str(), 1.0)],
        ));
        processes.push(fx.process(&format!("b{k}"), &[(y.as_str(), 1.0)], &[(x.as_str(), 1.0)]));
        collected.push(out);
    }
    let inputs: Vec<(&str, f64)> = collected.iter().map(|s| (s.as_str(), 1.0)).collect();
    processes.push(fx.process("collect", &inputs, &[("product", 1.0)]));
    ProcessChain::new(processes)
}
