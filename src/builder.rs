//! Declarative builder for host functions registered with a namespace.

use crate::args::Args;
use crate::errors::Error;
use crate::types::{Type, TypeExpr, TypeRegistry};
use crate::value::HostValue;

/// A host function implementation. Invoked by the engine with a per-call
/// [`Args`] accessor; an `Err` becomes the engine's error envelope rather
/// than a panic across the boundary.
pub trait Implement: Fn(&Args) -> Result<HostValue, Error> {}

impl<F: Fn(&Args) -> Result<HostValue, Error>> Implement for F {}

impl std::fmt::Debug for dyn Implement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Implementation")
    }
}

/// Boxed form of [`Implement`], as stored by the builder.
pub type Implementation = Box<dyn Implement>;

/// One declared argument of a registered host function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub name: String,
    pub ty: Type,
    pub required: bool,
    pub variadic: bool,
}

/// An immutable, validated host function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    /// `true` asserts the implementation never signals failure. The engine
    /// may optimize on that promise; an implementation that breaks it is in
    /// contract violation, not ordinary failure.
    pub total: bool,
    pub args: Vec<ArgSpec>,
    pub ret: Type,
}

struct DeclaredArg {
    name: String,
    expr: TypeExpr,
    required: bool,
    variadic: bool,
}

/// Accumulates one host function's declaration: arguments in call order, a
/// totality flag, a return type, and the implementation.
///
/// Nothing is checked until [`Namespace::define`] validates the finished
/// declaration, so calls chain freely. By convention the first argument's
/// name identifies the function, both for lookup and in error messages.
///
/// [`Namespace::define`]: crate::Namespace::define
pub struct FunctionBuilder<'reg> {
    registry: &'reg TypeRegistry,
    total: bool,
    args: Vec<DeclaredArg>,
    ret: Option<TypeExpr>,
    implementation: Option<Implementation>,
}

impl<'reg> FunctionBuilder<'reg> {
    pub(crate) fn new(registry: &'reg TypeRegistry) -> Self {
        FunctionBuilder {
            registry,
            total: false,
            args: Vec::new(),
            ret: None,
            implementation: None,
        }
    }

    fn push_arg(&mut self, name: &str, ty: impl Into<TypeExpr>, required: bool, variadic: bool) {
        self.args.push(DeclaredArg {
            name: name.to_owned(),
            expr: ty.into(),
            required,
            variadic,
        });
    }

    /// Declare a required argument.
    pub fn require_arg(&mut self, name: &str, ty: impl Into<TypeExpr>) -> &mut Self {
        self.push_arg(name, ty, true, false);
        self
    }

    /// Declare an optional argument.
    pub fn allow_arg(&mut self, name: &str, ty: impl Into<TypeExpr>) -> &mut Self {
        self.push_arg(name, ty, false, false);
        self
    }

    /// Declare a required variadic argument.
    pub fn require_arg_repeated(&mut self, name: &str, ty: impl Into<TypeExpr>) -> &mut Self {
        self.push_arg(name, ty, true, true);
        self
    }

    /// Declare an optional variadic argument.
    pub fn allow_arg_repeated(&mut self, name: &str, ty: impl Into<TypeExpr>) -> &mut Self {
        self.push_arg(name, ty, false, true);
        self
    }

    /// Declare that the implementation may signal failure. This is the
    /// default.
    pub fn can_fail(&mut self) -> &mut Self {
        self.total = false;
        self
    }

    /// Promise that the implementation never signals failure.
    pub fn never_fails(&mut self) -> &mut Self {
        self.total = true;
        self
    }

    /// Set the return type.
    pub fn returns(&mut self, ty: impl Into<TypeExpr>) -> &mut Self {
        self.ret = Some(ty.into());
        self
    }

    /// Set the implementation.
    pub fn implement(
        &mut self,
        f: impl Fn(&Args) -> Result<HostValue, Error> + 'static,
    ) -> &mut Self {
        self.implementation = Some(Box::new(f));
        self
    }

    /// Check the accumulated declaration and freeze it into a signature.
    ///
    /// Called at registration time, not eagerly. Violations fail with
    /// [`Error::Builder`] naming the function by its first argument.
    pub(crate) fn validate(self) -> Result<(FunctionSignature, Implementation), Error> {
        let function = self
            .args
            .first()
            .map(|arg| arg.name.clone())
            .unwrap_or_else(|| "<unnamed>".to_owned());
        let builder_error = |message: &str| Error::Builder {
            function: function.clone(),
            message: message.to_owned(),
        };

        if self.args.is_empty() {
            return Err(builder_error("at least one argument is required"));
        }
        let ret_expr = self
            .ret
            .ok_or_else(|| builder_error("no return type declared"))?;
        let implementation = self
            .implementation
            .ok_or_else(|| builder_error("no implementation provided"))?;

        let mut args = Vec::with_capacity(self.args.len());
        for declared in &self.args {
            args.push(ArgSpec {
                name: declared.name.clone(),
                ty: self.registry.resolve(&declared.expr)?,
                required: declared.required,
                variadic: declared.variadic,
            });
        }
        let ret = self.registry.resolve(&ret_expr)?;

        Ok((
            FunctionSignature {
                total: self.total,
                args,
                ret,
            },
            implementation,
        ))
    }
}
