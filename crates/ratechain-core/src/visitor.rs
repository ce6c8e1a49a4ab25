//! Capability-negotiated traversal of a [`ProcessChain`].
//!
//! A pass implements [`ChainVisitor`]. Before dispatch the chain asks the
//! pass which callbacks it wants via [`VisitorCaps`]; only those are invoked,
//! in a fixed order:
//!
//! 1. `initialize`, once, before anything else.
//! 2. `visit_item` for every distinct item in [`ProcessChain::all_items`].
//! 3. For each process in chain order: `visit_process`, then `visit_input`
//!    for each input in order, then `visit_output` for each output in order.
//!
//! Finally `finish` consumes the pass and produces its result, which may be
//! a new chain, a solution, rendered lines, or anything else.

use crate::chain::ProcessChain;
use crate::error::ChainError;
use crate::item::Item;
use crate::process::Process;
use crate::stack::Stack;

/// Which callbacks a pass wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitorCaps {
    pub initialize: bool,
    pub items: bool,
    pub processes: bool,
    pub inputs: bool,
    pub outputs: bool,
}

impl VisitorCaps {
    /// Only the one-shot initialization hook.
    pub fn initialize_only() -> Self {
        Self {
            initialize: true,
            ..Self::default()
        }
    }

    /// Every callback.
    pub fn all() -> Self {
        Self {
            initialize: true,
            items: true,
            processes: true,
            inputs: true,
            outputs: true,
        }
    }
}

/// A pass over a process chain. See the module docs for dispatch order.
///
/// Callbacks that a pass does not request in [`capabilities`](Self::capabilities)
/// are never called, so their default bodies are only placeholders.
pub trait ChainVisitor {
    type Output;

    fn capabilities(&self, chain: &ProcessChain) -> VisitorCaps;

    /// Validate preconditions and set up state. Runs before any other callback.
    fn initialize(&mut self, _chain: &ProcessChain) -> Result<(), ChainError> {
        Ok(())
    }

    fn visit_item(&mut self, _item: &Item) -> Result<(), ChainError> {
        Ok(())
    }

    fn visit_process(&mut self, _process: &Process) -> Result<(), ChainError> {
        Ok(())
    }

    /// An item -> process edge.
    fn visit_input(&mut self, _input: &Stack, _process: &Process) -> Result<(), ChainError> {
        Ok(())
    }

    /// A process -> item edge.
    fn visit_output(&mut self, _process: &Process, _output: &Stack) -> Result<(), ChainError> {
        Ok(())
    }

    fn finish(self, chain: &ProcessChain) -> Result<Self::Output, ChainError>;
}

impl ProcessChain {
    /// Run `visitor` over this chain and return what it produces.
    pub fn accept<V: ChainVisitor>(&self, mut visitor: V) -> Result<V::Output, ChainError> {
        let caps = visitor.capabilities(self);

        if caps.initialize {
            visitor.initialize(self)?;
        }

        if caps.items {
            for item in self.all_items() {
                visitor.visit_item(&item)?;
            }
        }

        if caps.processes || caps.inputs || caps.outputs {
            for process in self.processes() {
                if caps.processes {
                    visitor.visit_process(process)?;
                }
                if caps.inputs {
                    for input in &process.inputs {
                        visitor.visit_input(input, process)?;
                    }
                }
                if caps.outputs {
                    for output in &process.outputs {
                        visitor.visit_output(process, output)?;
                    }
                }
            }
        }

        visitor.finish(self)
    }
}

// ---------------------------------------------------------------------------
// Closure-based visitor
// ---------------------------------------------------------------------------

type ItemFn<'a> = Box<dyn FnMut(&Item) + 'a>;
type ProcessFn<'a> = Box<dyn FnMut(&Process) + 'a>;
type EdgeFn<'a> = Box<dyn FnMut(&Process, &Stack) + 'a>;

/// An ad-hoc pass assembled from closures. Capabilities follow from which
/// closures were supplied.
#[derive(Default)]
pub struct Inspector<'a> {
    on_item: Option<ItemFn<'a>>,
    on_process: Option<ProcessFn<'a>>,
    on_input: Option<EdgeFn<'a>>,
    on_output: Option<EdgeFn<'a>>,
}

impl<'a> Inspector<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_item(mut self, f: impl FnMut(&Item) + 'a) -> Self {
        self.on_item = Some(Box::new(f));
        self
    }

    pub fn on_process(mut self, f: impl FnMut(&Process) + 'a) -> Self {
        self.on_process = Some(Box::new(f));
        self
    }

    /// Called with the consuming process and the input stack.
    pub fn on_input(mut self, f: impl FnMut(&Process, &Stack) + 'a) -> Self {
        self.on_input = Some(Box::new(f));
        self
    }

    pub fn on_output(mut self, f: impl FnMut(&Process, &Stack) + 'a) -> Self {
        self.on_output = Some(Box::new(f));
        self
    }
}

impl ChainVisitor for Inspector<'_> {
    type Output = ();

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps {
            initialize: false,
            items: self.on_item.is_some(),
            processes: self.on_process.is_some(),
            inputs: self.on_input.is_some(),
            outputs: self.on_output.is_some(),
        }
    }

    fn visit_item(&mut self, item: &Item) -> Result<(), ChainError> {
        if let Some(f) = self.on_item.as_mut() {
            f(item);
        }
        Ok(())
    }

    fn visit_process(&mut self, process: &Process) -> Result<(), ChainError> {
        if let Some(f) = self.on_process.as_mut() {
            f(process);
        }
        Ok(())
    }

    fn visit_input(&mut self, input: &Stack, process: &Process) -> Result<(), ChainError> {
        if let Some(f) = self.on_input.as_mut() {
            f(process, input);
        }
        Ok(())
    }

    fn visit_output(&mut self, process: &Process, output: &Stack) -> Result<(), ChainError> {
        if let Some(f) = self.on_output.as_mut() {
            f(process, output);
        }
        Ok(())
    }

    fn finish(self, _chain: &ProcessChain) -> Result<(), ChainError> {
        Ok(())
    }
}
