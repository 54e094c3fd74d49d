//! Engine-side registration scopes.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::args::Args;
use crate::builder::{ArgSpec, FunctionBuilder, FunctionSignature};
use crate::engine::{Engine, HostFn, NamespaceHandle, SymbolId, WireArg, WireSignature};
use crate::errors::Error;
use crate::script::Script;
use crate::types::TypeExpr;
use crate::types::registry::TypeRegistry;
use crate::value;

/// A registration scope: owns a type-alias table, a symbol-interning table,
/// the host functions registered through it, and the scripts compiled within
/// it.
///
/// Each namespace is independent state — nothing here is process-global, so
/// any number of namespaces coexist without interference. Clones are handles
/// to the same scope. [`destroy`](Namespace::destroy) tears down
/// children-first: scripts (and the blocks they produced), then the
/// namespace's own engine resource; afterwards every operation fails with
/// [`Error::UseAfterDestroy`].
#[derive(Clone)]
pub struct Namespace {
    inner: Rc<NamespaceInner>,
}

struct NamespaceInner {
    engine: Rc<dyn Engine>,
    handle: NamespaceHandle,
    alive: Cell<bool>,
    registry: RefCell<TypeRegistry>,
    symbols: RefCell<SymbolTable>,
    scripts: RefCell<Vec<Script>>,
}

/// Bidirectional name/id table backed by the engine's interner. One id per
/// distinct name; ids never escape to host code.
#[derive(Default)]
struct SymbolTable {
    by_name: HashMap<String, SymbolId>,
    by_id: HashMap<SymbolId, String>,
}

impl Namespace {
    /// Allocate a fresh engine-side namespace.
    pub fn new(engine: Rc<dyn Engine>) -> Result<Self, Error> {
        let handle = engine.alloc_namespace().map_err(Error::Engine)?;
        debug!(?handle, "allocated namespace");
        Ok(Namespace {
            inner: Rc::new(NamespaceInner {
                engine,
                handle,
                alive: Cell::new(true),
                registry: RefCell::new(TypeRegistry::new()),
                symbols: RefCell::new(SymbolTable::default()),
                scripts: RefCell::new(Vec::new()),
            }),
        })
    }

    fn check_alive(&self) -> Result<(), Error> {
        if self.inner.alive.get() {
            Ok(())
        } else {
            Err(Error::UseAfterDestroy("namespace"))
        }
    }

    /// Define a type alias scoped to this namespace.
    pub fn define_type(&self, name: &str, expr: impl Into<TypeExpr>) -> Result<(), Error> {
        self.check_alive()?;
        self.inner.registry.borrow_mut().define(name, expr)
    }

    fn intern(&self, name: &str) -> SymbolId {
        let mut symbols = self.inner.symbols.borrow_mut();
        if let Some(&id) = symbols.by_name.get(name) {
            return id;
        }
        let id = self.inner.engine.intern_symbol(self.inner.handle, name);
        symbols.by_name.insert(name.to_owned(), id);
        symbols.by_id.insert(id, name.to_owned());
        id
    }

    /// Register a host function.
    ///
    /// `build` receives a fresh [`FunctionBuilder`]; the finished declaration
    /// is validated, its argument names are interned, and the resulting wire
    /// signature is registered with the engine together with a wrapped
    /// implementation. On each engine-driven invocation the wrapper builds an
    /// [`Args`] accessor, runs the host implementation, reports the encoded
    /// result (or the stringified error) in the engine's envelope, and
    /// releases every callback the accessor produced — exactly once per
    /// call, on success and failure alike.
    pub fn define(&self, build: impl FnOnce(&mut FunctionBuilder)) -> Result<(), Error> {
        self.check_alive()?;
        let (signature, implementation) = {
            let registry = self.inner.registry.borrow();
            let mut builder = FunctionBuilder::new(&registry);
            build(&mut builder);
            builder.validate()?
        };

        let mut wire_args = Vec::with_capacity(signature.args.len());
        let mut names_by_id = HashMap::new();
        let mut declared = HashSet::new();
        for arg in &signature.args {
            let id = self.intern(&arg.name);
            names_by_id.insert(id, arg.name.clone());
            declared.insert(arg.name.clone());
            wire_args.push(WireArg {
                id,
                ty: arg.ty.clone(),
                required: arg.required,
                variadic: arg.variadic,
            });
        }
        let wire = WireSignature {
            total: signature.total,
            args: wire_args,
            ret: signature.ret.clone(),
        };

        let engine = self.inner.engine.clone();
        let wrapped: HostFn = Box::new(move |raw| {
            let mut supplied = Vec::with_capacity(raw.len());
            for (id, datum) in raw {
                let name = names_by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| format!("unknown argument symbol {}", id.0))?;
                supplied.push((name, datum.clone()));
            }
            let args = Args::new(engine.clone(), supplied, declared.clone());
            let outcome = match implementation(&args) {
                Ok(result) => value::encode(&result).map_err(|err| err.to_string()),
                Err(err) => Err(err.to_string()),
            };
            args.release_blocks();
            outcome
        });

        let function = &signature.args[0].name;
        self.inner
            .engine
            .define(self.inner.handle, wire, wrapped)
            .map_err(Error::Engine)?;
        debug!(%function, total = signature.total, "registered host function");
        Ok(())
    }

    /// Look up a registered function's signature, with interned argument
    /// ids translated back to names.
    ///
    /// Returns `Ok(None)` when no such function exists — absence is an
    /// expected, checked condition.
    pub fn get_signature(&self, name: &str) -> Result<Option<FunctionSignature>, Error> {
        self.check_alive()?;
        let Some(wire) = self.inner.engine.get_signature(self.inner.handle, name) else {
            return Ok(None);
        };
        let mut args = Vec::with_capacity(wire.args.len());
        for arg in wire.args {
            args.push(ArgSpec {
                name: self.symbol_name(arg.id)?,
                ty: arg.ty,
                required: arg.required,
                variadic: arg.variadic,
            });
        }
        Ok(Some(FunctionSignature {
            total: wire.total,
            args,
            ret: wire.ret,
        }))
    }

    fn symbol_name(&self, id: SymbolId) -> Result<String, Error> {
        if let Some(name) = self.inner.symbols.borrow().by_id.get(&id) {
            return Ok(name.clone());
        }
        // Interned by someone else (another handle to this namespace, or the
        // engine itself); ask the engine and cache the answer.
        let name = self
            .inner
            .engine
            .lookup_symbol(self.inner.handle, id)
            .ok_or_else(|| Error::Engine(format!("unknown symbol id {}", id.0)))?;
        let mut symbols = self.inner.symbols.borrow_mut();
        symbols.by_name.insert(name.clone(), id);
        symbols.by_id.insert(id, name.clone());
        Ok(name)
    }

    /// Compile source against this namespace. The script is owned by the
    /// namespace and destroyed with it.
    pub fn compile(&self, source: &str) -> Result<Script, Error> {
        self.check_alive()?;
        let handle = self
            .inner
            .engine
            .compile(self.inner.handle, source)
            .map_err(Error::Engine)?;
        debug!(?handle, "compiled script");
        let script = Script::new(self.inner.engine.clone(), handle);
        self.inner.scripts.borrow_mut().push(script.clone());
        Ok(script)
    }

    /// Destroy this namespace and everything it owns, children first.
    pub fn destroy(&self) -> Result<(), Error> {
        self.check_alive()?;
        self.inner.teardown();
        Ok(())
    }
}

impl NamespaceInner {
    fn teardown(&self) {
        if self.alive.replace(false) {
            for script in self.scripts.borrow_mut().drain(..) {
                script.release();
            }
            debug!(handle = ?self.handle, "destroying namespace");
            self.engine.drop_namespace(self.handle);
        }
    }
}

impl Drop for NamespaceInner {
    fn drop(&mut self) {
        self.teardown();
    }
}
