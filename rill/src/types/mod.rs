//! The Rill type model
//!
//! Every type shape in the language is one case of the closed [`TypeKind`]
//! sum: an unresolved placeholder, a primitive, a generic parameter, a
//! struct, a reference or a function. Array-ness (`dims`) and constness are
//! orthogonal modifiers carried on [`Type`] itself. The `kind` field is
//! private: construction goes through validating constructors and builders,
//! so an ill-formed type (reference-to-reference, array-of-void) never
//! exists, not even transiently.
//!
//! Equality is a nominal/structural hybrid: structs compare by declared
//! name only, functions by parameter and return types (parameter names do
//! not count), and `is_const` never participates. It is not unification —
//! it never binds free generic parameters. Binding is the job of
//! [`Type::match_generics`] / [`Type::specialize`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{Decl, Primitive};
use crate::error::{CompileError, Result};
use crate::symtab::{ScopeArena, ScopeId, ScopeOwner, Symbol};

/// Substitution produced by generic matching: parameter name to concrete type
pub type Subst = HashMap<String, Type>;

/// A lazily elaborated declaration body.
///
/// Generic bodies cannot be checked until a use site supplies argument
/// types, so the syntax is carried by shared handle until then. The
/// two-state shape forces callers to handle the unresolved case.
#[derive(Debug, Clone)]
pub enum Body {
    /// Syntax not yet elaborated; the handle is shared, never copied
    Unelaborated(Rc<Decl>),
    /// Elaboration finished; holds the resulting type
    Elaborated(Box<Type>),
}

/// The closed set of type shapes
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Placeholder for a type not yet inferred
    Auto,
    Basic(Primitive),
    /// Named or positional generic parameter, optionally bounded
    Generic {
        name: String,
        range: Option<Box<Type>>,
    },
    Struct {
        name: String,
        /// Base types for future inheritance; currently never populated
        bases: Vec<Type>,
        members: Vec<Symbol>,
        constructor: Option<Box<Symbol>>,
    },
    Reference(Box<Type>),
    Function {
        params: Vec<Symbol>,
        /// `None` only while the signature is still being resolved
        ret: Option<Box<Type>>,
    },
}

/// A Rill type
#[derive(Debug, Clone)]
pub struct Type {
    kind: TypeKind,
    /// Immutability marker; not part of equality
    pub is_const: bool,
    /// Array dimensions wrapping the kind, outermost last; 0 means
    /// "unspecified length"
    dims: Vec<u64>,
    /// Generic parameter list of a template, or the concrete argument list
    /// of an instantiation (empty means non-generic)
    generics: Vec<Type>,
    /// Owned scope, present exactly when this type introduces its own
    /// naming context (struct body, function signature, template params)
    pub scope: Option<ScopeId>,
    /// Deferred body for lazily elaborated declarations
    pub body: Option<Body>,
}

impl Type {
    fn with_kind(kind: TypeKind) -> Self {
        Self {
            kind,
            is_const: false,
            dims: Vec::new(),
            generics: Vec::new(),
            scope: None,
            body: None,
        }
    }

    /// Placeholder for a type to be inferred later
    pub fn auto() -> Self {
        Self::with_kind(TypeKind::Auto)
    }

    pub fn basic(primitive: Primitive) -> Self {
        Self::with_kind(TypeKind::Basic(primitive))
    }

    /// A generic parameter; an empty name marks a positional parameter that
    /// will be assigned a synthesized name on registration.
    pub fn generic(name: impl Into<String>) -> Self {
        Self::with_kind(TypeKind::Generic {
            name: name.into(),
            range: None,
        })
    }

    pub fn generic_with_range(name: impl Into<String>, range: Type) -> Self {
        Self::with_kind(TypeKind::Generic {
            name: name.into(),
            range: Some(Box::new(range)),
        })
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::with_kind(TypeKind::Struct {
            name: name.into(),
            bases: Vec::new(),
            members: Vec::new(),
            constructor: None,
        })
    }

    /// A function type; the return type is filled by [`Type::with_return_type`]
    pub fn function() -> Self {
        Self::with_kind(TypeKind::Function {
            params: Vec::new(),
            ret: None,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Reference(_)) && self.dims.is_empty()
    }

    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    pub fn dim_count(&self) -> usize {
        self.dims.len()
    }

    pub fn dim_size(&self, index: usize) -> u64 {
        self.dims[index]
    }

    /// Declared name of a struct or generic parameter
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Struct { name, .. } | TypeKind::Generic { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Parameter symbols of a function type; empty for other kinds
    pub fn params(&self) -> &[Symbol] {
        match &self.kind {
            TypeKind::Function { params, .. } => params,
            _ => &[],
        }
    }

    pub fn return_type(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Function { ret, .. } => ret.as_deref(),
            _ => None,
        }
    }

    /// Member symbols of a struct type; empty for other kinds
    pub fn members(&self) -> &[Symbol] {
        match &self.kind {
            TypeKind::Struct { members, .. } => members,
            _ => &[],
        }
    }

    pub fn generic_args(&self) -> &[Type] {
        &self.generics
    }

    /// True iff this type carries a non-empty generics list. Distinct from
    /// [`Type::contains_generics`]: a fully concrete instantiation still
    /// has generic args, but no longer contains generic parameters.
    pub fn has_generic_args(&self) -> bool {
        !self.generics.is_empty()
    }

    /// Does this type still contain an unresolved generic parameter
    /// anywhere in its shape? Decides whether it is instantiable.
    pub fn contains_generics(&self) -> bool {
        match &self.kind {
            TypeKind::Auto | TypeKind::Basic(_) => false,
            TypeKind::Generic { .. } => true,
            TypeKind::Struct { .. } => self.generics.iter().any(Type::contains_generics),
            TypeKind::Reference(inner) => inner.contains_generics(),
            TypeKind::Function { params, ret } => {
                params.iter().any(|p| p.ty.contains_generics())
                    || ret.as_ref().is_some_and(|r| r.contains_generics())
            }
        }
    }

    // ------------------------------------------------------------------
    // Fluent builders
    // ------------------------------------------------------------------

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Wrap this type in a reference. There is no reference-to-reference.
    pub fn with_reference(self) -> Result<Self> {
        if self.is_reference() {
            return Err(CompileError::semantic(
                "cannot create a reference to a reference type",
            ));
        }
        Ok(Self::with_kind(TypeKind::Reference(Box::new(self))))
    }

    /// Unwrap one level of reference
    pub fn strip_reference(self) -> Result<Self> {
        if !self.is_reference() {
            return Err(CompileError::semantic(
                "cannot remove a reference from a non-reference type",
            ));
        }
        let TypeKind::Reference(inner) = self.kind else {
            unreachable!("is_reference guarantees a reference kind");
        };
        Ok(*inner)
    }

    /// Insert an array dimension at `index` (0 = innermost). Size 0 means
    /// "unspecified length". Arrays of void and arrays of references are
    /// ill-formed.
    pub fn with_array_dim(mut self, index: usize, size: u64) -> Result<Self> {
        if matches!(self.kind, TypeKind::Basic(Primitive::Void)) {
            return Err(CompileError::semantic("cannot create an array of void"));
        }
        if self.is_reference() {
            return Err(CompileError::semantic(
                "array element type cannot be a reference",
            ));
        }
        assert!(
            index <= self.dims.len(),
            "array dimension index out of range"
        );
        self.dims.insert(index, size);
        Ok(self)
    }

    /// Drop the outermost array dimension, yielding the element type
    pub fn array_element(mut self) -> Self {
        let popped = self.dims.pop();
        assert!(popped.is_some(), "array_element called on a non-array type");
        self
    }

    /// Append a function parameter. Parameter names must be unique.
    pub fn add_func_param(mut self, param: Symbol) -> Result<Self> {
        let TypeKind::Function { params, .. } = &mut self.kind else {
            panic!("add_func_param called on a non-function type");
        };
        if params.iter().any(|p| p.name == param.name) {
            return Err(CompileError::semantic(format!(
                "duplicate parameter name `{}`",
                param.name
            )));
        }
        params.push(param);
        Ok(self)
    }

    /// Set the return type; setting it twice is a programming error
    pub fn with_return_type(mut self, ret: Type) -> Self {
        let TypeKind::Function { ret: slot, .. } = &mut self.kind else {
            panic!("with_return_type called on a non-function type");
        };
        assert!(slot.is_none(), "return type already set");
        *slot = Some(Box::new(ret));
        self
    }

    pub fn add_struct_member(mut self, member: Symbol) -> Self {
        let TypeKind::Struct { members, .. } = &mut self.kind else {
            panic!("add_struct_member called on a non-struct type");
        };
        members.push(member);
        self
    }

    pub fn with_constructor(mut self, ctor: Symbol) -> Self {
        let TypeKind::Struct { constructor, .. } = &mut self.kind else {
            panic!("with_constructor called on a non-struct type");
        };
        *constructor = Some(Box::new(ctor));
        self
    }

    /// Allocate and own a child scope for this type's naming context
    pub fn attach_scope(&mut self, scopes: &mut ScopeArena, parent: ScopeId) -> ScopeId {
        let owner = match &self.kind {
            TypeKind::Struct { name, .. } => Some(ScopeOwner::Struct(name.clone())),
            TypeKind::Function { .. } => Some(ScopeOwner::Function),
            _ => None,
        };
        let id = scopes.push_scope(parent, owner);
        self.scope = Some(id);
        id
    }

    /// Append a generic parameter and register it in the owned scope. An
    /// unnamed (positional) parameter is assigned a synthesized name first,
    /// so named and positional parameters share one addressing scheme.
    pub fn add_generic_param(mut self, mut generic: Type, scopes: &mut ScopeArena) -> Self {
        let scope = match self.scope {
            Some(scope) => scope,
            None => panic!("add_generic_param requires an attached scope"),
        };
        let name = {
            let TypeKind::Generic { name, .. } = &mut generic.kind else {
                panic!("add_generic_param expects a generic-kind type");
            };
            if name.is_empty() {
                *name = scopes.fresh_anonymous_name(scope);
            }
            name.clone()
        };
        scopes.add_type(scope, name, generic.clone());
        self.generics.push(generic);
        self
    }

    /// Record the result of elaborating a deferred body. Elaborating a body
    /// twice, or a type without one, is a programming error.
    pub fn elaborate_body(&mut self, resolved: Type) {
        match &self.body {
            Some(Body::Unelaborated(_)) => {
                self.body = Some(Body::Elaborated(Box::new(resolved)));
            }
            Some(Body::Elaborated(_)) => panic!("body already elaborated"),
            None => panic!("type has no deferred body"),
        }
    }

    // ------------------------------------------------------------------
    // Cloning
    // ------------------------------------------------------------------

    /// Clone this type and deep-copy its owned scope into a fresh arena
    /// slot. Required before specializing a generic type, so mutation of
    /// the clone never perturbs the template's definition. The plain
    /// `Clone` impl is the cheap variant: it aliases the same scope.
    pub fn deep_clone(&self, scopes: &mut ScopeArena) -> Self {
        let mut out = self.clone();
        if let Some(scope) = self.scope {
            out.scope = Some(scopes.clone_scope(scope));
        }
        out
    }

    // ------------------------------------------------------------------
    // Generic matching and specialization
    // ------------------------------------------------------------------

    /// Unify this (template-shaped) type against a concrete type, deriving
    /// bindings for its generic parameters. First match wins; there is no
    /// occurs-check; conflicting bindings fail the whole match. A template
    /// array dimension of 0 matches any concrete size.
    pub fn match_generics(&self, concrete: &Type) -> Option<Subst> {
        if self.is_array() || concrete.is_array() {
            if self.dim_count() != concrete.dim_count() {
                return None;
            }
            for (tdim, cdim) in self.dims.iter().zip(&concrete.dims) {
                if *tdim != 0 && tdim != cdim {
                    return None;
                }
            }
            let mut template = self.clone();
            template.dims.clear();
            let mut element = concrete.clone();
            element.dims.clear();
            return template.match_generics(&element);
        }

        match (&self.kind, &concrete.kind) {
            (TypeKind::Generic { name, .. }, TypeKind::Generic { name: other, .. }) => {
                if name == other {
                    Some(Subst::new())
                } else {
                    Some(Subst::from([(name.clone(), concrete.clone())]))
                }
            }
            (TypeKind::Generic { name, .. }, _) => {
                Some(Subst::from([(name.clone(), concrete.clone())]))
            }
            (TypeKind::Auto, TypeKind::Auto) => Some(Subst::new()),
            (TypeKind::Basic(a), TypeKind::Basic(b)) => (a == b).then(Subst::new),
            (TypeKind::Struct { name: a, .. }, TypeKind::Struct { name: b, .. }) => {
                (a == b).then(Subst::new)
            }
            (TypeKind::Reference(a), TypeKind::Reference(b)) => a.match_generics(b),
            (
                TypeKind::Function {
                    params: p1,
                    ret: r1,
                },
                TypeKind::Function {
                    params: p2,
                    ret: r2,
                },
            ) => {
                if p1.len() != p2.len() {
                    return None;
                }
                let mut subst = match (r1, r2) {
                    (Some(a), Some(b)) => a.match_generics(b)?,
                    (None, None) => Subst::new(),
                    _ => return None,
                };
                for (a, b) in p1.iter().zip(p2) {
                    let matched = a.ty.match_generics(&b.ty)?;
                    subst = merge_subst(subst, matched)?;
                }
                Some(subst)
            }
            _ => None,
        }
    }

    /// Substitute bound generic parameters throughout this type's shape.
    /// Unbound parameters are left in place. Function types get an
    /// independently deep-cloned scope whose local entries are rewritten,
    /// so repeated specializations never observe each other.
    pub fn specialize(&self, subst: &Subst, scopes: &mut ScopeArena) -> Self {
        if self.is_array() {
            let mut element = self.clone();
            let dims = std::mem::take(&mut element.dims);
            let mut out = element.specialize(subst, scopes);
            out.dims.extend(dims);
            return out;
        }

        match &self.kind {
            TypeKind::Auto | TypeKind::Basic(_) => self.clone(),
            TypeKind::Generic { name, .. } => subst
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeKind::Struct { .. } => {
                let mut out = self.clone();
                out.generics = self
                    .generics
                    .iter()
                    .map(|arg| arg.specialize(subst, scopes))
                    .collect();
                out
            }
            TypeKind::Reference(inner) => {
                let target = inner.specialize(subst, scopes);
                let mut out = self.clone();
                out.kind = TypeKind::Reference(Box::new(target));
                out
            }
            TypeKind::Function { params, ret } => {
                let mut out = self.deep_clone(scopes);
                let scope = out.scope;
                let new_ret = ret.as_ref().map(|r| Box::new(r.specialize(subst, scopes)));
                let mut new_params = Vec::with_capacity(params.len());
                for param in params {
                    let ty = param.ty.specialize(subst, scopes);
                    if let Some(scope) = scope {
                        scopes.modify_symbol_type_local(scope, &param.name, ty.clone());
                    }
                    new_params.push(Symbol::new(&*param.name, ty, param.value));
                }
                if let Some(scope) = scope {
                    for (name, concrete) in subst {
                        scopes.modify_type_local(scope, name, concrete.clone());
                    }
                }
                let TypeKind::Function {
                    params: out_params,
                    ret: out_ret,
                } = &mut out.kind
                else {
                    unreachable!("deep_clone preserves the kind");
                };
                *out_params = new_params;
                *out_ret = new_ret;
                out
            }
        }
    }

    /// Fill unspecified (0) array dimensions from a concrete counterpart,
    /// e.g. when a `[0]T` parameter meets a `[5]int` argument.
    pub fn with_dims_filled(mut self, concrete: &Type) -> Self {
        for (dim, filled) in self.dims.iter_mut().zip(&concrete.dims) {
            if *dim == 0 {
                *dim = *filled;
            }
        }
        self
    }

    /// Build a concrete instantiation of a generic struct or function
    /// template. The argument list must match the template's parameter
    /// list in arity; the result carries the supplied arguments as its
    /// generics list and an independent scope, leaving the template
    /// untouched. The deferred body handle stays shared.
    pub fn instantiate(&self, args: &[Type], scopes: &mut ScopeArena) -> Result<Self> {
        if self.generics.is_empty() {
            return Err(CompileError::semantic(format!(
                "type `{self}` takes no generic arguments"
            )));
        }
        if args.len() != self.generics.len() {
            return Err(CompileError::semantic(format!(
                "wrong number of generic arguments for `{}`: expected {}, found {}",
                self,
                self.generics.len(),
                args.len()
            )));
        }

        let mut subst = Subst::new();
        for (param, arg) in self.generics.iter().zip(args) {
            let TypeKind::Generic { name, .. } = &param.kind else {
                return Err(CompileError::semantic(format!(
                    "type `{self}` is already instantiated"
                )));
            };
            subst.insert(name.clone(), arg.clone());
        }

        let mut out = match &self.kind {
            TypeKind::Struct { .. } => {
                let mut out = self.deep_clone(scopes);
                let scope = out.scope;
                if let TypeKind::Struct {
                    members,
                    constructor,
                    ..
                } = &mut out.kind
                {
                    for member in members.iter_mut() {
                        let refined = member.ty.specialize(&subst, scopes);
                        if let Some(scope) = scope {
                            scopes.modify_symbol_type_local(scope, &member.name, refined.clone());
                        }
                        member.ty = refined;
                    }
                    if let Some(ctor) = constructor {
                        ctor.ty = ctor.ty.specialize(&subst, scopes);
                    }
                }
                if let Some(scope) = scope {
                    for (name, concrete) in &subst {
                        scopes.modify_type_local(scope, name, concrete.clone());
                    }
                }
                out
            }
            TypeKind::Function { .. } => self.specialize(&subst, scopes),
            _ => {
                return Err(CompileError::semantic(format!(
                    "type `{self}` cannot be instantiated"
                )));
            }
        };
        out.generics = args.to_vec();
        Ok(out)
    }

    fn fmt_generics(&self) -> String {
        if self.generics.is_empty() {
            return String::new();
        }
        let mut out = String::from("<");
        for (i, arg) in self.generics.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match &arg.kind {
                TypeKind::Generic { name, .. } if name.is_empty() => out.push_str("\"\""),
                _ => out.push_str(&arg.to_string()),
            }
        }
        out.push('>');
        out
    }
}

/// Merge two substitution maps; a name bound to two unequal types is a
/// conflict and fails the merge.
fn merge_subst(mut into: Subst, from: Subst) -> Option<Subst> {
    for (name, ty) in from {
        match into.get(&name) {
            Some(existing) if *existing != ty => return None,
            _ => {
                into.insert(name, ty);
            }
        }
    }
    Some(into)
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if self.dims != other.dims {
            return false;
        }
        match (&self.kind, &other.kind) {
            (TypeKind::Auto, TypeKind::Auto) => true,
            (TypeKind::Basic(a), TypeKind::Basic(b)) => a == b,
            (TypeKind::Generic { name: a, .. }, TypeKind::Generic { name: b, .. }) => a == b,
            // Nominal equality: generic argument lists are intentionally
            // not compared
            (TypeKind::Struct { name: a, .. }, TypeKind::Struct { name: b, .. }) => a == b,
            (TypeKind::Reference(a), TypeKind::Reference(b)) => a == b,
            (
                TypeKind::Function {
                    params: p1,
                    ret: r1,
                },
                TypeKind::Function {
                    params: p2,
                    ret: r2,
                },
            ) => {
                p1.len() == p2.len()
                    && r1 == r2
                    && p1.iter().zip(p2).all(|(a, b)| a.ty == b.ty)
            }
            _ => false,
        }
    }
}

impl Eq for Type {}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dim) = self.dims.last() {
            let element = self.clone().array_element();
            return write!(f, "[{dim}]{element}");
        }

        match &self.kind {
            TypeKind::Auto => write!(f, "auto"),
            TypeKind::Basic(primitive) => write!(f, "{primitive}"),
            TypeKind::Generic { name, .. } => write!(f, "{name}"),
            TypeKind::Struct { name, .. } => {
                write!(f, "struct {name}{}", self.fmt_generics())
            }
            TypeKind::Reference(inner) => write!(f, "{inner} ref"),
            TypeKind::Function { params, ret } => {
                write!(f, "{}(", self.fmt_generics())?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param.ty)?;
                }
                match ret {
                    Some(ret) => write!(f, ") -> {ret}"),
                    None => write!(f, ") -> auto"),
                }
            }
        }
    }
}
