//! One-shot expression evaluation without a namespace.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use crate::block::{Block, Ledger};
use crate::engine::{Engine, EvaluatorHandle, TypeInfo};
use crate::errors::Error;
use crate::value::{self, HostValue};

/// A standalone single-expression evaluator.
///
/// Lighter than a [`Namespace`]: no function registration and no compiled
/// scripts, just evaluate-this-string with optional inputs and a small
/// variable store. Every operation on a destroyed evaluator fails with
/// [`Error::UseAfterDestroy`].
///
/// [`Namespace`]: crate::Namespace
pub struct Evaluator {
    engine: Rc<dyn Engine>,
    handle: EvaluatorHandle,
    alive: Cell<bool>,
    blocks: Ledger,
}

impl Evaluator {
    /// Allocate a fresh engine-side evaluator.
    pub fn new(engine: Rc<dyn Engine>) -> Result<Self, Error> {
        let handle = engine.alloc_evaluator().map_err(Error::Engine)?;
        debug!(?handle, "allocated evaluator");
        Ok(Evaluator {
            engine,
            handle,
            alive: Cell::new(true),
            blocks: Ledger::default(),
        })
    }

    fn check_alive(&self) -> Result<(), Error> {
        if self.alive.get() {
            Ok(())
        } else {
            Err(Error::UseAfterDestroy("evaluator"))
        }
    }

    /// Evaluate an expression with the given inputs.
    pub fn eval(&self, source: &str, inputs: &[(&str, HostValue)]) -> Result<HostValue, Error> {
        self.check_alive()?;
        let mut encoded = Vec::with_capacity(inputs.len());
        for (name, input) in inputs {
            encoded.push(((*name).to_owned(), value::encode(input)?));
        }
        let evaluated = self
            .engine
            .eval_expression(self.handle, source, &encoded)
            .map_err(Error::Engine)?;
        match evaluated.block {
            Some(handle) => Ok(HostValue::Block(Block::track(
                self.engine.clone(),
                handle,
                &self.blocks,
            ))),
            None => value::decode(evaluated.value),
        }
    }

    /// Inferred input types and diagnostics for an expression, without
    /// evaluating it.
    pub fn type_of(&self, source: &str) -> Result<TypeInfo, Error> {
        self.check_alive()?;
        self.engine
            .type_of(self.handle, source)
            .map_err(Error::Engine)
    }

    /// Bind a variable for later expressions.
    pub fn set(&self, name: &str, val: &HostValue) -> Result<(), Error> {
        self.check_alive()?;
        self.engine
            .set_var(self.handle, name, value::encode(val)?)
            .map_err(Error::Engine)
    }

    /// All currently bound variables, decoded.
    pub fn vars(&self) -> Result<BTreeMap<String, HostValue>, Error> {
        self.check_alive()?;
        let raw = self.engine.vars(self.handle).map_err(Error::Engine)?;
        let mut decoded = BTreeMap::new();
        for (name, val) in raw {
            decoded.insert(name, value::decode(val)?);
        }
        Ok(decoded)
    }

    /// Release the engine-side evaluator. Terminal.
    pub fn destroy(&self) -> Result<(), Error> {
        self.check_alive()?;
        self.release();
        Ok(())
    }

    fn release(&self) {
        if self.alive.replace(false) {
            for block in self.blocks.borrow_mut().drain(..) {
                block.release();
            }
            debug!(handle = ?self.handle, "destroying evaluator");
            self.engine.drop_evaluator(self.handle);
        }
    }
}

impl Drop for Evaluator {
    fn drop(&mut self) {
        self.release();
    }
}
