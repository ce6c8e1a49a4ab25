//! Rendering passes. Both produce lines of text; the exact layout is for
//! people and tooling to read, not a stable format.

use crate::chain::ProcessChain;
use crate::error::ChainError;
use crate::item::Item;
use crate::process::{Process, ProcessKind};
use crate::solution::Solution;
use crate::stack::Stack;
use crate::visitor::{ChainVisitor, VisitorCaps};

fn item_node(item: &Item) -> String {
    format!("\"item:{}\"", escape(item.id()))
}

fn process_node(process: &Process) -> String {
    format!("\"process:{}\"", escape(&process.id))
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Graphviz
// ---------------------------------------------------------------------------

/// Renders a chain as a Graphviz `digraph`: one ellipse per item, one box per
/// process, and one edge per input and output. With a solution attached,
/// process labels carry their counts.
#[derive(Debug, Default)]
pub struct GraphvizRenderer<'a> {
    solution: Option<&'a Solution>,
    lines: Vec<String>,
}

impl<'a> GraphvizRenderer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solution(mut self, solution: &'a Solution) -> Self {
        self.solution = Some(solution);
        self
    }
}

impl ChainVisitor for GraphvizRenderer<'_> {
    type Output = Vec<String>;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps::all()
    }

    fn initialize(&mut self, _chain: &ProcessChain) -> Result<(), ChainError> {
        self.lines.push("digraph chain {".to_string());
        self.lines.push("  rankdir=LR;".to_string());
        Ok(())
    }

    fn visit_item(&mut self, item: &Item) -> Result<(), ChainError> {
        self.lines.push(format!(
            "  {} [label=\"{}\", shape=ellipse];",
            item_node(item),
            escape(item.name())
        ));
        Ok(())
    }

    fn visit_process(&mut self, process: &Process) -> Result<(), ChainError> {
        let mut label = escape(&process.id);
        if let Some(solution) = self.solution {
            label.push_str(&format!("\\n{:.3}", solution.count(&process.id)));
        }
        let shape = if process.is_proxy() { "box3d" } else { "box" };
        self.lines.push(format!(
            "  {} [label=\"{label}\", shape={shape}];",
            process_node(process)
        ));
        Ok(())
    }

    fn visit_input(&mut self, input: &Stack, process: &Process) -> Result<(), ChainError> {
        self.lines.push(format!(
            "  {} -> {} [label=\"{}\"];",
            item_node(&input.item),
            process_node(process),
            input.quantity
        ));
        Ok(())
    }

    fn visit_output(&mut self, process: &Process, output: &Stack) -> Result<(), ChainError> {
        self.lines.push(format!(
            "  {} -> {} [label=\"{}\"];",
            process_node(process),
            item_node(&output.item),
            output.quantity
        ));
        Ok(())
    }

    fn finish(mut self, _chain: &ProcessChain) -> Result<Vec<String>, ChainError> {
        self.lines.push("}".to_string());
        Ok(self.lines)
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// One line per process with its count and machine, then one line per item
/// with its net rate. Requires a solution for the chain being rendered.
#[derive(Debug, Default)]
pub struct SummaryRenderer<'a> {
    solution: Option<&'a Solution>,
    processes: Vec<String>,
    items: Vec<String>,
}

impl<'a> SummaryRenderer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solution(mut self, solution: &'a Solution) -> Self {
        self.solution = Some(solution);
        self
    }
}

impl ChainVisitor for SummaryRenderer<'_> {
    type Output = Vec<String>;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps {
            initialize: true,
            items: true,
            processes: true,
            ..VisitorCaps::default()
        }
    }

    fn initialize(&mut self, _chain: &ProcessChain) -> Result<(), ChainError> {
        if self.solution.is_none() {
            return Err(ChainError::MissingPrecondition {
                pass: "summary renderer",
                requirement: "process counts from a solver pass".to_string(),
            });
        }
        Ok(())
    }

    fn visit_item(&mut self, item: &Item) -> Result<(), ChainError> {
        if let Some(solution) = self.solution {
            let net = solution.materials.total(item.id());
            self.items.push(format!("{:<24} {net:>+12.3}/s", item.name()));
        }
        Ok(())
    }

    fn visit_process(&mut self, process: &Process) -> Result<(), ChainError> {
        let Some(solution) = self.solution else {
            return Ok(());
        };
        let runner = match &process.kind {
            ProcessKind::Rate { factory } => factory.name.clone(),
            ProcessKind::Proxy(proxy) => format!("{} member loop", proxy.members.len()),
            ProcessKind::Standard => process.group.to_string(),
        };
        self.processes.push(format!(
            "{:<24} {:>12.3} x {runner}",
            process.id,
            solution.count(&process.id)
        ));
        Ok(())
    }

    fn finish(self, _chain: &ProcessChain) -> Result<Vec<String>, ChainError> {
        let mut lines = Vec::with_capacity(self.processes.len() + self.items.len() + 2);
        lines.push("processes:".to_string());
        lines.extend(self.processes);
        lines.push("items:".to_string());
        lines.extend(self.items);
        Ok(lines)
    }
}

impl Solution {
    /// Graphviz lines for the solved chain, annotated with counts.
    pub fn to_dot(&self) -> Result<Vec<String>, ChainError> {
        self.chain.accept(GraphvizRenderer::new().with_solution(self))
    }

    pub fn summary(&self) -> Result<Vec<String>, ChainError> {
        self.chain.accept(SummaryRenderer::new().with_solution(self))
    }
}
