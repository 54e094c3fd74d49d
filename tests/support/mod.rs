//! A scripted stand-in for the Corvus engine module.
//!
//! Implements just enough of the call surface to drive the binding layer
//! end to end: literal and input atoms, calls into registered host
//! functions, and two canned callback behaviors (`#double`, `#fail`).
//! Resource tables assert on double release, so lifecycle bugs in the
//! binding layer fail loudly here.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use corvus_host::{
    BlockHandle, Datum, Engine, EngineResult, Evaluated, EvaluatorHandle, HostFn, NamespaceHandle,
    Prim, ScriptHandle, Span, SymbolId, Type, TypeInfo, TypeIssue, Value, WireSignature,
};

#[derive(Default)]
pub struct StubEngine {
    next_id: Cell<u64>,
    namespaces: RefCell<HashMap<u64, NamespaceState>>,
    scripts: RefCell<HashMap<u64, ScriptState>>,
    blocks: RefCell<HashMap<u64, BlockState>>,
    evaluators: RefCell<HashMap<u64, EvaluatorState>>,
}

#[derive(Default)]
struct NamespaceState {
    /// Interned symbols; the id is the index.
    symbols: Vec<String>,
    /// Registered host functions, keyed by their first argument's name.
    functions: HashMap<String, Registered>,
}

struct Registered {
    signature: WireSignature,
    imp: HostFn,
}

struct ScriptState {
    ns: u64,
    source: String,
}

struct BlockState {
    behavior: BlockBehavior,
    alive: bool,
}

#[derive(Clone, Copy)]
enum BlockBehavior {
    /// Doubles its single numeric argument.
    Double,
    /// Always reports failure.
    Fail,
}

#[derive(Default)]
struct EvaluatorState {
    vars: BTreeMap<String, Value>,
}

impl StubEngine {
    pub fn new() -> Rc<Self> {
        Rc::new(StubEngine::default())
    }

    /// Number of block handles currently alive inside the engine. Lets
    /// tests verify that the binding layer released what it owned.
    pub fn live_blocks(&self) -> usize {
        self.blocks.borrow().values().filter(|b| b.alive).count()
    }

    fn fresh(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn make_block(&self, behavior: BlockBehavior) -> BlockHandle {
        let id = self.fresh();
        self.blocks.borrow_mut().insert(
            id,
            BlockState {
                behavior,
                alive: true,
            },
        );
        BlockHandle(id)
    }

    fn parse_atom(&self, token: &str, inputs: &[(String, Value)]) -> Result<Datum, String> {
        let token = token.trim();
        match token {
            "#double" => return Ok(Datum::Block(self.make_block(BlockBehavior::Double))),
            "#fail" => return Ok(Datum::Block(self.make_block(BlockBehavior::Fail))),
            "true" => return Ok(Datum::Value(Value::Prim(Prim::Boolean(true)))),
            "false" => return Ok(Datum::Value(Value::Prim(Prim::Boolean(false)))),
            _ => {}
        }
        if let Some(stripped) = token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return Ok(Datum::Value(Value::Prim(Prim::String(stripped.to_owned()))));
        }
        if let Ok(n) = token.parse::<f64>() {
            return Ok(Datum::Value(Value::Prim(Prim::Number(n))));
        }
        inputs
            .iter()
            .find(|(name, _)| name == token)
            .map(|(_, v)| Datum::Value(v.clone()))
            .ok_or_else(|| format!("unknown input: {token}"))
    }

    fn run_source(
        &self,
        ns: u64,
        source: &str,
        inputs: &[(String, Value)],
    ) -> EngineResult<Evaluated> {
        let source = source.trim();
        if let Some(rest) = source.strip_prefix("block:") {
            let behavior = match rest {
                "double" => BlockBehavior::Double,
                "fail" => BlockBehavior::Fail,
                other => return Err(format!("unknown block source: {other}")),
            };
            return Ok(Evaluated {
                value: Value::Prim(Prim::Number(0.0)),
                block: Some(self.make_block(behavior)),
            });
        }
        if let Some(open) = source.find('(') {
            let name = source[..open].trim();
            let body = source[open + 1..]
                .strip_suffix(')')
                .ok_or("unbalanced parentheses")?;
            let actuals: Vec<&str> = if body.trim().is_empty() {
                Vec::new()
            } else {
                body.split(',').collect()
            };
            let namespaces = self.namespaces.borrow();
            let state = namespaces.get(&ns).ok_or("no such namespace")?;
            let registered = state
                .functions
                .get(name)
                .ok_or_else(|| format!("unknown function: {name}"))?;
            let sig = &registered.signature;
            let mut raw = Vec::new();
            for (i, actual) in actuals.iter().enumerate() {
                // positional mapping; extras pile onto a trailing variadic slot
                let slot = if i < sig.args.len() {
                    &sig.args[i]
                } else {
                    let last = sig.args.last().ok_or("no argument slots")?;
                    if !last.variadic {
                        return Err(format!("too many arguments for {name}"));
                    }
                    last
                };
                raw.push((slot.id, self.parse_atom(actual, inputs)?));
            }
            let value = (registered.imp)(&raw)?;
            return Ok(Evaluated { value, block: None });
        }
        match self.parse_atom(source, inputs)? {
            Datum::Value(value) => Ok(Evaluated { value, block: None }),
            Datum::Block(handle) => Ok(Evaluated {
                value: Value::Prim(Prim::Number(0.0)),
                block: Some(handle),
            }),
        }
    }
}

/// Fabricated type information: `bad!` sources carry one diagnostic; free
/// identifiers in the argument positions become number-typed inputs.
fn stub_type_info(source: &str) -> TypeInfo {
    let source = source.trim();
    let mut info = TypeInfo::default();
    if source.starts_with("bad!") {
        info.errors.push(TypeIssue {
            kind: "TypeMismatch".to_owned(),
            message: "cannot unify number with string".to_owned(),
            span: Span { start: 0, end: 4 },
        });
        return info;
    }
    let body = match source.find('(') {
        Some(open) => source[open + 1..].trim_end_matches(')'),
        None => source,
    };
    for token in body.split(',') {
        let token = token.trim();
        if token.is_empty() || token == "true" || token == "false" {
            continue;
        }
        let mut chars = token.chars();
        let identifier = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if identifier {
            info.inputs.insert(token.to_owned(), Type::Num);
        }
    }
    info
}

impl Engine for StubEngine {
    fn alloc_namespace(&self) -> EngineResult<NamespaceHandle> {
        let id = self.fresh();
        self.namespaces
            .borrow_mut()
            .insert(id, NamespaceState::default());
        Ok(NamespaceHandle(id))
    }

    fn drop_namespace(&self, ns: NamespaceHandle) {
        let removed = self.namespaces.borrow_mut().remove(&ns.0);
        assert!(removed.is_some(), "double drop of namespace {}", ns.0);
    }

    fn intern_symbol(&self, ns: NamespaceHandle, name: &str) -> SymbolId {
        let mut namespaces = self.namespaces.borrow_mut();
        let state = namespaces.get_mut(&ns.0).expect("no such namespace");
        if let Some(pos) = state.symbols.iter().position(|s| s == name) {
            return SymbolId(pos as u32);
        }
        state.symbols.push(name.to_owned());
        SymbolId((state.symbols.len() - 1) as u32)
    }

    fn lookup_symbol(&self, ns: NamespaceHandle, id: SymbolId) -> Option<String> {
        self.namespaces
            .borrow()
            .get(&ns.0)?
            .symbols
            .get(id.0 as usize)
            .cloned()
    }

    fn define(
        &self,
        ns: NamespaceHandle,
        signature: WireSignature,
        imp: HostFn,
    ) -> EngineResult<()> {
        let first = signature.args.first().ok_or("signature has no arguments")?;
        let name = self
            .lookup_symbol(ns, first.id)
            .ok_or("first argument symbol is not interned")?;
        self.namespaces
            .borrow_mut()
            .get_mut(&ns.0)
            .ok_or("no such namespace")?
            .functions
            .insert(name, Registered { signature, imp });
        Ok(())
    }

    fn get_signature(&self, ns: NamespaceHandle, name: &str) -> Option<WireSignature> {
        self.namespaces
            .borrow()
            .get(&ns.0)?
            .functions
            .get(name)
            .map(|r| r.signature.clone())
    }

    fn compile(&self, ns: NamespaceHandle, source: &str) -> EngineResult<ScriptHandle> {
        if !self.namespaces.borrow().contains_key(&ns.0) {
            return Err("no such namespace".into());
        }
        if source.trim().is_empty() {
            return Err("empty source".into());
        }
        let id = self.fresh();
        self.scripts.borrow_mut().insert(
            id,
            ScriptState {
                ns: ns.0,
                source: source.to_owned(),
            },
        );
        Ok(ScriptHandle(id))
    }

    fn recompile(&self, script: ScriptHandle, source: &str) -> EngineResult<()> {
        let mut scripts = self.scripts.borrow_mut();
        let state = scripts.get_mut(&script.0).ok_or("no such script")?;
        state.source = source.to_owned();
        Ok(())
    }

    fn drop_script(&self, script: ScriptHandle) {
        let removed = self.scripts.borrow_mut().remove(&script.0);
        assert!(removed.is_some(), "double drop of script {}", script.0);
    }

    fn type_info(&self, script: ScriptHandle) -> EngineResult<TypeInfo> {
        let scripts = self.scripts.borrow();
        let state = scripts.get(&script.0).ok_or("no such script")?;
        Ok(stub_type_info(&state.source))
    }

    fn evaluate(&self, script: ScriptHandle, inputs: &[(String, Value)]) -> EngineResult<Evaluated> {
        let (ns, source) = {
            let scripts = self.scripts.borrow();
            let state = scripts.get(&script.0).ok_or("no such script")?;
            (state.ns, state.source.clone())
        };
        self.run_source(ns, &source, inputs)
    }

    fn call_block(&self, block: BlockHandle, args: Vec<Value>) -> EngineResult<Evaluated> {
        let behavior = {
            let blocks = self.blocks.borrow();
            let state = blocks.get(&block.0).ok_or("no such block")?;
            if !state.alive {
                return Err("block used after drop".into());
            }
            state.behavior
        };
        match behavior {
            BlockBehavior::Double => {
                let [Value::Prim(Prim::Number(n))] = args.as_slice() else {
                    return Err("double expects one number".into());
                };
                Ok(Evaluated {
                    value: Value::Prim(Prim::Number(n * 2.0)),
                    block: None,
                })
            }
            BlockBehavior::Fail => Err("this block always fails".into()),
        }
    }

    fn drop_block(&self, block: BlockHandle) {
        let mut blocks = self.blocks.borrow_mut();
        let state = blocks.get_mut(&block.0).expect("no such block");
        assert!(state.alive, "double release of block {}", block.0);
        state.alive = false;
    }

    fn alloc_evaluator(&self) -> EngineResult<EvaluatorHandle> {
        let id = self.fresh();
        self.evaluators
            .borrow_mut()
            .insert(id, EvaluatorState::default());
        Ok(EvaluatorHandle(id))
    }

    fn drop_evaluator(&self, evaluator: EvaluatorHandle) {
        let removed = self.evaluators.borrow_mut().remove(&evaluator.0);
        assert!(removed.is_some(), "double drop of evaluator {}", evaluator.0);
    }

    fn eval_expression(
        &self,
        evaluator: EvaluatorHandle,
        source: &str,
        inputs: &[(String, Value)],
    ) -> EngineResult<Evaluated> {
        let token = source.trim();
        match self.parse_atom(token, inputs) {
            Ok(Datum::Value(value)) => Ok(Evaluated { value, block: None }),
            Ok(Datum::Block(handle)) => Ok(Evaluated {
                value: Value::Prim(Prim::Number(0.0)),
                block: Some(handle),
            }),
            Err(_) => {
                let evaluators = self.evaluators.borrow();
                let state = evaluators.get(&evaluator.0).ok_or("no such evaluator")?;
                state
                    .vars
                    .get(token)
                    .map(|value| Evaluated {
                        value: value.clone(),
                        block: None,
                    })
                    .ok_or_else(|| format!("unknown variable: {token}"))
            }
        }
    }

    fn type_of(&self, evaluator: EvaluatorHandle, source: &str) -> EngineResult<TypeInfo> {
        let evaluators = self.evaluators.borrow();
        let state = evaluators.get(&evaluator.0).ok_or("no such evaluator")?;
        let mut info = stub_type_info(source);
        info.inputs.retain(|name, _| !state.vars.contains_key(name));
        Ok(info)
    }

    fn set_var(&self, evaluator: EvaluatorHandle, name: &str, value: Value) -> EngineResult<()> {
        let mut evaluators = self.evaluators.borrow_mut();
        let state = evaluators.get_mut(&evaluator.0).ok_or("no such evaluator")?;
        state.vars.insert(name.to_owned(), value);
        Ok(())
    }

    fn vars(&self, evaluator: EvaluatorHandle) -> EngineResult<Vec<(String, Value)>> {
        let evaluators = self.evaluators.borrow();
        let state = evaluators.get(&evaluator.0).ok_or("no such evaluator")?;
        Ok(state
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
