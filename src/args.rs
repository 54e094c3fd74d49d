//! Per-call access to the raw arguments of a host function invocation.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::block::{Block, Ledger};
use crate::engine::{BlockHandle, Datum, Engine};
use crate::errors::Error;
use crate::value::{self, HostValue};

/// Named access to the arguments actually supplied at one call site.
///
/// Every argument is located by name, never by position. An accessor lives
/// for exactly one invocation of a host function; the blocks it decodes are
/// owned by it and released when the call ends, whether or not the
/// implementation used them.
pub struct Args {
    engine: Rc<dyn Engine>,
    /// `(name, datum)` pairs supplied at this call site, already translated
    /// from interned symbols. Variadic arguments repeat their name.
    supplied: Vec<(String, Datum)>,
    /// Names declared in the function's signature, supplied or not.
    declared: HashSet<String>,
    blocks: Ledger,
    /// One wrapper per underlying handle per call, so an argument decoded
    /// through several accessor paths never gains two owners.
    wrappers: RefCell<HashMap<BlockHandle, Block>>,
}

impl Args {
    pub(crate) fn new(
        engine: Rc<dyn Engine>,
        supplied: Vec<(String, Datum)>,
        declared: HashSet<String>,
    ) -> Self {
        Args {
            engine,
            supplied,
            declared,
            blocks: Ledger::default(),
            wrappers: RefCell::new(HashMap::new()),
        }
    }

    /// The decoded value of a required argument.
    ///
    /// Fails with [`Error::MissingArgument`] if the call site did not supply
    /// it.
    pub fn demand(&self, name: &str) -> Result<HostValue, Error> {
        let (_, datum) = self
            .supplied
            .iter()
            .find(|(supplied_name, _)| supplied_name == name)
            .ok_or_else(|| Error::MissingArgument(name.to_owned()))?;
        self.decode(datum)
    }

    /// The decoded value of an optional argument, or `fallback` if absent.
    ///
    /// Fails with [`Error::UnknownArgumentName`] when `name` is not among
    /// the function's declared arguments, even though a fallback was given:
    /// asking for an undeclared argument is a programming error, not an
    /// absence.
    pub fn maybe(&self, name: &str, fallback: HostValue) -> Result<HostValue, Error> {
        if !self.declared.contains(name) {
            return Err(Error::UnknownArgumentName(name.to_owned()));
        }
        match self
            .supplied
            .iter()
            .find(|(supplied_name, _)| supplied_name == name)
        {
            Some((_, datum)) => self.decode(datum),
            None => Ok(fallback),
        }
    }

    /// Every supplied occurrence of `name`, in call-site order. Variadic
    /// arguments repeat their declared name once per value.
    pub fn all(&self, name: &str) -> Result<Vec<HostValue>, Error> {
        if !self.declared.contains(name) {
            return Err(Error::UnknownArgumentName(name.to_owned()));
        }
        self.supplied
            .iter()
            .filter(|(supplied_name, _)| supplied_name == name)
            .map(|(_, datum)| self.decode(datum))
            .collect()
    }

    /// Iterate over the `(name, value)` pairs actually supplied at this call
    /// site — only those present, not everything declared.
    ///
    /// The sequence is lazy and restartable; callback tracking happens as
    /// values decode and is identical however much of the sequence is
    /// consumed.
    pub fn iter(&self) -> impl Iterator<Item = Result<(&str, HostValue), Error>> + '_ {
        self.supplied
            .iter()
            .map(|(name, datum)| Ok((name.as_str(), self.decode(datum)?)))
    }

    /// Number of arguments supplied at this call site.
    pub fn len(&self) -> usize {
        self.supplied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supplied.is_empty()
    }

    fn decode(&self, datum: &Datum) -> Result<HostValue, Error> {
        match datum {
            Datum::Value(v) => value::decode(v.clone()),
            Datum::Block(handle) => Ok(HostValue::Block(self.block_for(*handle))),
        }
    }

    fn block_for(&self, handle: BlockHandle) -> Block {
        if let Some(existing) = self.wrappers.borrow().get(&handle) {
            return existing.clone();
        }
        let block = Block::track(self.engine.clone(), handle, &self.blocks);
        self.wrappers.borrow_mut().insert(handle, block.clone());
        block
    }

    /// Release every block this accessor produced. Runs exactly once per
    /// call, on success and failure alike, driven by the registration
    /// wrapper.
    pub(crate) fn release_blocks(&self) {
        for block in self.blocks.borrow_mut().drain(..) {
            block.release();
        }
    }
}
