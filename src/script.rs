//! Compiled scripts and their lifecycle.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::block::{Block, Ledger};
use crate::engine::{Engine, ScriptHandle, TypeInfo};
use crate::errors::Error;
use crate::value::{self, HostValue};

/// One compiled unit of embedded-language source, bound to the namespace
/// that compiled it.
///
/// Clones share the underlying compiled unit, so a clone taken before
/// [`recompile`](Script::recompile) observes the new behavior too — identity
/// survives recompilation. Destruction is terminal: every operation on a
/// destroyed script fails with [`Error::UseAfterDestroy`]. The owning
/// namespace destroys its scripts when it is destroyed.
#[derive(Clone)]
pub struct Script {
    inner: Rc<ScriptInner>,
}

struct ScriptInner {
    engine: Rc<dyn Engine>,
    handle: ScriptHandle,
    alive: Cell<bool>,
    /// Blocks produced by evaluations of this script. Released children-first
    /// when the script is destroyed.
    blocks: Ledger,
}

impl Script {
    pub(crate) fn new(engine: Rc<dyn Engine>, handle: ScriptHandle) -> Self {
        Script {
            inner: Rc::new(ScriptInner {
                engine,
                handle,
                alive: Cell::new(true),
                blocks: Ledger::default(),
            }),
        }
    }

    fn check_alive(&self) -> Result<(), Error> {
        if self.inner.alive.get() {
            Ok(())
        } else {
            Err(Error::UseAfterDestroy("script"))
        }
    }

    /// The script's inferred input-variable types and compile-time
    /// diagnostics.
    ///
    /// Callable in any compiled state, including one holding errors.
    pub fn type_info(&self) -> Result<TypeInfo, Error> {
        self.check_alive()?;
        self.inner
            .engine
            .type_info(self.inner.handle)
            .map_err(Error::Engine)
    }

    /// Evaluate the script with the given inputs.
    ///
    /// Inputs are encoded, the engine evaluates, and the result is decoded.
    /// A result carrying a callback handle decodes to [`HostValue::Block`];
    /// that block is owned by this script and released when the script is
    /// destroyed.
    ///
    /// When the script currently holds compile errors the engine may return
    /// a best-effort result; check [`type_info`](Script::type_info) first if
    /// that matters.
    pub fn eval(&self, inputs: &[(&str, HostValue)]) -> Result<HostValue, Error> {
        self.check_alive()?;
        let mut encoded = Vec::with_capacity(inputs.len());
        for (name, input) in inputs {
            encoded.push(((*name).to_owned(), value::encode(input)?));
        }
        let evaluated = self
            .inner
            .engine
            .evaluate(self.inner.handle, &encoded)
            .map_err(Error::Engine)?;
        match evaluated.block {
            Some(handle) => Ok(HostValue::Block(Block::track(
                self.inner.engine.clone(),
                handle,
                &self.inner.blocks,
            ))),
            None => value::decode(evaluated.value),
        }
    }

    /// Replace the script's behavior in place. Identity and existing clones
    /// remain valid.
    pub fn recompile(&self, source: &str) -> Result<(), Error> {
        self.check_alive()?;
        self.inner
            .engine
            .recompile(self.inner.handle, source)
            .map_err(Error::Engine)?;
        debug!(handle = ?self.inner.handle, "recompiled script");
        Ok(())
    }

    /// Destroy the compiled unit. Terminal; fails if already destroyed.
    pub fn destroy(&self) -> Result<(), Error> {
        self.check_alive()?;
        self.release();
        Ok(())
    }

    /// Idempotent teardown: blocks first, then the script resource.
    pub(crate) fn release(&self) {
        if self.inner.alive.replace(false) {
            for block in self.inner.blocks.borrow_mut().drain(..) {
                block.release();
            }
            debug!(handle = ?self.inner.handle, "destroying script");
            self.inner.engine.drop_script(self.inner.handle);
        }
    }
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("handle", &self.inner.handle)
            .field("alive", &self.inner.alive.get())
            .finish()
    }
}

impl Drop for ScriptInner {
    fn drop(&mut self) {
        if self.alive.replace(false) {
            for block in self.blocks.borrow_mut().drain(..) {
                block.release();
            }
            self.engine.drop_script(self.handle);
        }
    }
}
