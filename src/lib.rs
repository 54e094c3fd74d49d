//! Host-side bindings for the Corvus expression engine.
//!
//! The engine itself is an embedded module with a fixed low-level call
//! surface (the [`Engine`] trait); this crate is the boundary layer a host
//! application talks to instead. It converts native values to and from the
//! engine's tagged representation, lets the host register strongly typed
//! functions the embedded language can call, and manages the lifecycle of
//! engine-side resources — namespaces, compiled scripts, and callback
//! values — so that nothing is double-released or used after release.
//!
//! # Quick start
//!
//! ```ignore
//! use std::rc::Rc;
//! use corvus_host::{HostValue, Namespace};
//!
//! let engine: Rc<dyn corvus_host::Engine> = load_engine_module();
//! let ns = Namespace::new(engine)?;
//!
//! ns.define(|f| {
//!     f.require_arg("add", "number")
//!         .require_arg("to", "number")
//!         .returns("number")
//!         .never_fails()
//!         .implement(|args| {
//!             let a = args.demand("add")?.as_num()?;
//!             let b = args.demand("to")?.as_num()?;
//!             Ok(HostValue::Num(a + b))
//!         });
//! })?;
//!
//! let script = ns.compile("add(2, 3)")?;
//! let result = script.eval(&[])?;
//! ns.destroy()?;
//! ```

pub mod args;
pub mod block;
pub mod builder;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod namespace;
pub mod script;
pub mod types;
pub mod value;


pub use args::Args;
pub use block::Block;
pub use builder::{ArgSpec, FunctionBuilder, FunctionSignature, Implementation};
pub use engine::{
    BlockHandle, Datum, Engine, EngineResult, Evaluated, EvaluatorHandle, HostFn, NamespaceHandle,
    ScriptHandle, Span, SymbolId, TypeInfo, TypeIssue, WireArg, WireSignature,
};
pub use errors::Error;
pub use evaluator::Evaluator;
pub use namespace::Namespace;
pub use script::Script;
pub use types::{
    Field, FieldExpr, Type, TypeExpr, TypeRegistry, block as block_type, list_of, open_record,
    optional, record, required, variable,
};
pub use value::{HostValue, Prim, Value, decode, encode};
