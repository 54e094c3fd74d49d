//! The fixed low-level call surface of the Corvus engine.
//!
//! The engine itself (parsing, type inference, evaluation) lives outside this
//! crate; everything it exposes is collected in the [`Engine`] trait. The
//! rest of the crate only ever talks to the engine through this trait, so a
//! test double can stand in for the real module.
//!
//! All fallible entry points return the engine's `{Ok: T} | {Err: String}`
//! envelope, modeled as [`EngineResult`]. Converting an `Err` into a host
//! error is always `Error::Engine(msg)` with the message untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Type;
use crate::value::Value;

/// The `{Ok: T} | {Err: String}` envelope every fallible engine call returns.
pub type EngineResult<T> = Result<T, String>;

/// Opaque handle to an engine-side namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceHandle(pub u64);

/// Opaque handle to a compiled script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptHandle(pub u64);

/// Opaque handle to an engine-side closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHandle(pub u64);

/// Opaque handle to a standalone single-expression evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluatorHandle(pub u64);

/// Interned argument-name identifier, scoped to one namespace.
///
/// Symbol ids are an engine-side optimization and never escape to host code;
/// the binding layer always translates them back to names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// One raw host-function argument as delivered by the engine.
///
/// Callback-typed arguments arrive as opaque closure handles; everything
/// else arrives as a wire value.
#[derive(Debug, Clone)]
pub enum Datum {
    Value(Value),
    Block(BlockHandle),
}

/// The result of evaluating a script, calling a block, or evaluating a
/// standalone expression: a wire value, possibly accompanied by a callback
/// handle. When the handle is present the value decodes to a block wrapper
/// rather than plain data.
#[derive(Debug, Clone)]
pub struct Evaluated {
    pub value: Value,
    pub block: Option<BlockHandle>,
}

/// A function signature as registered with the engine: argument names have
/// been rewritten to interned symbol ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSignature {
    /// `true` asserts the implementation never signals failure.
    pub total: bool,
    pub args: Vec<WireArg>,
    pub ret: Type,
}

/// One argument slot of a [`WireSignature`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireArg {
    pub id: SymbolId,
    pub ty: Type,
    pub required: bool,
    pub variadic: bool,
}

/// Inferred input-variable types and compile-time diagnostics for a script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub inputs: BTreeMap<String, Type>,
    pub errors: Vec<TypeIssue>,
}

/// One compile-time diagnostic reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeIssue {
    pub kind: String,
    pub message: String,
    pub span: Span,
}

/// A half-open byte range in the script source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// The wrapped host-function implementation handed to the engine at
/// registration time. The engine invokes it with raw `(symbol, datum)`
/// argument pairs and receives the result already inside its own envelope,
/// so a failing host function never unwinds across the boundary.
pub type HostFn = Box<dyn Fn(&[(SymbolId, Datum)]) -> EngineResult<Value>>;

/// The engine's entry points, exactly as the embedded module exposes them.
///
/// All calls are synchronous and single-threaded from the host's point of
/// view. Resource handles returned here are exclusively host-owned: each has
/// one owner responsible for the matching `drop_*` call.
pub trait Engine {
    fn alloc_namespace(&self) -> EngineResult<NamespaceHandle>;
    fn drop_namespace(&self, ns: NamespaceHandle);

    fn intern_symbol(&self, ns: NamespaceHandle, name: &str) -> SymbolId;
    fn lookup_symbol(&self, ns: NamespaceHandle, id: SymbolId) -> Option<String>;

    /// Register a host function under this namespace.
    fn define(&self, ns: NamespaceHandle, signature: WireSignature, imp: HostFn)
    -> EngineResult<()>;

    /// Look up a previously registered function's signature; absence is an
    /// expected condition, not a failure.
    fn get_signature(&self, ns: NamespaceHandle, name: &str) -> Option<WireSignature>;

    fn compile(&self, ns: NamespaceHandle, source: &str) -> EngineResult<ScriptHandle>;
    fn recompile(&self, script: ScriptHandle, source: &str) -> EngineResult<()>;
    fn drop_script(&self, script: ScriptHandle);
    fn type_info(&self, script: ScriptHandle) -> EngineResult<TypeInfo>;
    fn evaluate(&self, script: ScriptHandle, inputs: &[(String, Value)]) -> EngineResult<Evaluated>;

    fn call_block(&self, block: BlockHandle, args: Vec<Value>) -> EngineResult<Evaluated>;
    fn drop_block(&self, block: BlockHandle);

    fn alloc_evaluator(&self) -> EngineResult<EvaluatorHandle>;
    fn drop_evaluator(&self, evaluator: EvaluatorHandle);
    fn eval_expression(
        &self,
        evaluator: EvaluatorHandle,
        source: &str,
        inputs: &[(String, Value)],
    ) -> EngineResult<Evaluated>;
    fn type_of(&self, evaluator: EvaluatorHandle, source: &str) -> EngineResult<TypeInfo>;
    fn set_var(&self, evaluator: EvaluatorHandle, name: &str, value: Value) -> EngineResult<()>;
    fn vars(&self, evaluator: EvaluatorHandle) -> EngineResult<Vec<(String, Value)>>;
}
