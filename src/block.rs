//! Host-callable wrappers around engine-side closures.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::engine::{BlockHandle, Engine};
use crate::errors::Error;
use crate::value::{self, HostValue};

/// The set of live blocks owned by one call context (an args accessor or a
/// script). The owner drains it on teardown, releasing each block exactly
/// once.
pub(crate) type Ledger = Rc<RefCell<Vec<Block>>>;

/// A callback value: a host-callable wrapper around an opaque engine-side
/// closure.
///
/// A block's lifetime is scoped to whatever produced it — the host-function
/// call that received it as an argument, or the script evaluation that
/// returned it — not to however long the host retains the wrapper. Release
/// is always driven by that owner; once it has happened, [`Block::call`]
/// fails with [`Error::UseAfterDestroy`]. Clones share the underlying
/// handle.
#[derive(Clone)]
pub struct Block {
    inner: Rc<BlockInner>,
}

struct BlockInner {
    engine: Rc<dyn Engine>,
    handle: BlockHandle,
    alive: Cell<bool>,
    /// Owner scope for blocks produced by calling this block. A nested
    /// result joins the same ledger, so the owner releases it too.
    ledger: Weak<RefCell<Vec<Block>>>,
}

impl Block {
    /// Wrap `handle` and record it in `ledger` as owned by that scope.
    pub(crate) fn track(engine: Rc<dyn Engine>, handle: BlockHandle, ledger: &Ledger) -> Self {
        let block = Block {
            inner: Rc::new(BlockInner {
                engine,
                handle,
                alive: Cell::new(true),
                ledger: Rc::downgrade(ledger),
            }),
        };
        ledger.borrow_mut().push(block.clone());
        block
    }

    /// Invoke the engine-side closure with native arguments.
    ///
    /// Arguments are encoded, the closure runs inside the engine, and the
    /// result is decoded; an engine-reported failure surfaces as
    /// [`Error::Engine`] with the engine's message verbatim.
    pub fn call(&self, args: &[HostValue]) -> Result<HostValue, Error> {
        if !self.inner.alive.get() {
            return Err(Error::UseAfterDestroy("block"));
        }
        let mut encoded = Vec::with_capacity(args.len());
        for arg in args {
            encoded.push(value::encode(arg)?);
        }
        let evaluated = self
            .inner
            .engine
            .call_block(self.inner.handle, encoded)
            .map_err(Error::Engine)?;
        match evaluated.block {
            Some(handle) => {
                // The ledger outlives every live block it owns, so a live
                // block can always re-attach its results to it.
                let ledger = self
                    .inner
                    .ledger
                    .upgrade()
                    .ok_or_else(|| Error::UseAfterDestroy("block"))?;
                Ok(HostValue::Block(Block::track(
                    self.inner.engine.clone(),
                    handle,
                    &ledger,
                )))
            }
            None => value::decode(evaluated.value),
        }
    }

    /// Release the engine-side closure. Owner-driven; the alive flag keeps a
    /// second release from ever reaching the engine.
    pub(crate) fn release(&self) {
        if self.inner.alive.replace(false) {
            trace!(handle = ?self.inner.handle, "releasing block");
            self.inner.engine.drop_block(self.inner.handle);
        }
    }

    pub(crate) fn handle(&self) -> BlockHandle {
        self.inner.handle
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle == other.inner.handle
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("handle", &self.inner.handle)
            .field("alive", &self.inner.alive.get())
            .finish()
    }
}
