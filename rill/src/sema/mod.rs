//! Declaration elaboration
//!
//! [`Sema`] walks top-level declarations, lowers written type specifiers
//! into [`Type`] values and populates the scope tree. Function and
//! template bodies are not checked here: their syntax is attached to the
//! resulting type as a deferred [`Body`] and elaborated on first use.

use std::rc::Rc;

use crate::ast::{
    Decl, Expr, FuncDecl, FuncDef, FuncSig, Primitive, Program, Span, StructDecl, StructMember,
    TemplateDecl, TypeSpec, TypedefDecl, VarDecl,
};
use crate::error::{CompileError, Result};
use crate::symtab::{ScopeArena, ScopeId, Symbol};
use crate::types::{Body, Type};

/// The declaration pass: owns the scope arena and tracks the scope the
/// walk is currently inside.
pub struct Sema {
    pub scopes: ScopeArena,
    current: ScopeId,
}

impl Sema {
    pub fn new() -> Self {
        let scopes = ScopeArena::new();
        let current = scopes.root();
        Self { scopes, current }
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    /// Open a plain block scope and make it current
    pub fn enter_scope(&mut self) -> ScopeId {
        self.current = self.scopes.push_scope(self.current, None);
        self.current
    }

    /// Close the current scope. Leaving the global scope is a programming
    /// error.
    pub fn exit_scope(&mut self) {
        let Some(parent) = self.scopes.parent(self.current) else {
            panic!("cannot exit the global scope");
        };
        self.current = parent;
    }

    pub fn declare_program(&mut self, program: &Program) -> Result<()> {
        for decl in &program.decls {
            self.declare(decl)?;
        }
        Ok(())
    }

    pub fn declare(&mut self, decl: &Decl) -> Result<()> {
        match decl {
            Decl::Typedef(d) => self.declare_typedef(d),
            Decl::Var(d) => self.declare_var(d),
            Decl::Func(d) => self.declare_func(d).map(|_| ()),
            Decl::FuncDef(d) => self.declare_func_def(d).map(|_| ()),
            Decl::Struct(d) => self.declare_struct(d).map(|_| ()),
            Decl::Template(d) => self.declare_template(d),
        }
    }

    /// Register a type alias in the current scope
    pub fn declare_typedef(&mut self, d: &TypedefDecl) -> Result<()> {
        let ty = self.lower_in(self.current, &d.spec, d.span)?;
        self.scopes.add_type(self.current, &d.name, ty);
        Ok(())
    }

    /// Bind every name in a var/const declaration. An omitted annotation
    /// leaves the type as a placeholder for later inference; an integer
    /// initializer is kept as the symbol's constant value.
    pub fn declare_var(&mut self, d: &VarDecl) -> Result<()> {
        for def in &d.defs {
            let mut ty = match &def.spec {
                Some(spec) => self.lower_in(self.current, spec, def.span)?,
                None => Type::auto(),
            };
            if d.is_const {
                ty = ty.with_const();
            }
            let value = match &def.init {
                Some(Expr::Int(n)) => Some(*n),
                _ => None,
            };
            self.scopes.add_symbol(self.current, &def.name, ty, value);
        }
        Ok(())
    }

    /// Register a function prototype in the current scope
    pub fn declare_func(&mut self, d: &FuncDecl) -> Result<Symbol> {
        let ty = self.lower_func_sig_in(self.current, &d.sig, &[], d.span)?;
        Ok(self.scopes.add_symbol(self.current, &d.name, ty, None))
    }

    /// Register a function definition; the body is deferred
    pub fn declare_func_def(&mut self, d: &FuncDef) -> Result<Symbol> {
        let mut ty = self.lower_func_sig_in(self.current, &d.decl.sig, &[], d.span)?;
        ty.body = Some(Body::Unelaborated(Rc::new(Decl::FuncDef(d.clone()))));
        Ok(self.scopes.add_symbol(self.current, &d.decl.name, ty, None))
    }

    /// Register a struct declaration: the struct type owns a child scope
    /// holding its fields, methods and constructor.
    pub fn declare_struct(&mut self, d: &StructDecl) -> Result<Type> {
        let mut ty = Type::structure(&d.name);
        let scope = ty.attach_scope(&mut self.scopes, self.current);
        let ty = self.elaborate_struct_members(ty, scope, d)?;
        self.scopes.add_type(self.current, &d.name, ty.clone());
        Ok(ty)
    }

    fn elaborate_struct_members(
        &mut self,
        mut ty: Type,
        scope: ScopeId,
        d: &StructDecl,
    ) -> Result<Type> {
        for member in &d.members {
            match member {
                StructMember::Field { name, spec, span } => {
                    let field_ty = self.lower_in(scope, spec, *span)?;
                    let symbol = self.scopes.add_symbol(scope, name, field_ty, None);
                    ty = ty.add_struct_member(symbol);
                }
                StructMember::Method(def) => {
                    let mut method_ty =
                        self.lower_func_sig_in(scope, &def.decl.sig, &[], def.span)?;
                    method_ty.body = Some(Body::Unelaborated(Rc::new(Decl::FuncDef(def.clone()))));
                    let symbol = self.scopes.add_symbol(scope, &def.decl.name, method_ty, None);
                    ty = ty.add_struct_member(symbol);
                }
                StructMember::Constructor { sig, body, span } => {
                    // The constructor is a function named after the struct,
                    // living in the struct's own scope
                    let def = FuncDef {
                        decl: FuncDecl {
                            name: d.name.clone(),
                            sig: sig.clone(),
                            span: *span,
                        },
                        body: body.clone(),
                        span: *span,
                    };
                    let mut ctor_ty = self.lower_func_sig_in(scope, sig, &[], *span)?;
                    ctor_ty.body = Some(Body::Unelaborated(Rc::new(Decl::FuncDef(def))));
                    let symbol = self.scopes.add_symbol(scope, &d.name, ctor_ty, None);
                    ty = ty.with_constructor(symbol);
                }
            }
        }
        Ok(ty)
    }

    /// Register a template declaration. A struct template becomes a generic
    /// struct type; a function template becomes a generic function symbol.
    /// The parameter name `"_"` introduces a positional parameter that gets
    /// a synthesized name.
    pub fn declare_template(&mut self, d: &TemplateDecl) -> Result<()> {
        match d.decl.as_ref() {
            Decl::Struct(sd) => {
                let mut ty = Type::structure(&sd.name);
                let scope = ty.attach_scope(&mut self.scopes, self.current);
                for param in &d.params {
                    ty = ty.add_generic_param(template_param(param), &mut self.scopes);
                }
                let mut ty = self.elaborate_struct_members(ty, scope, sd)?;
                ty.body = Some(Body::Unelaborated(Rc::new((*d.decl).clone())));
                self.scopes.add_type(self.current, &sd.name, ty);
                Ok(())
            }
            Decl::FuncDef(def) => {
                let mut ty =
                    self.lower_func_sig_in(self.current, &def.decl.sig, &d.params, def.span)?;
                ty.body = Some(Body::Unelaborated(Rc::new(Decl::FuncDef(def.clone()))));
                self.scopes.add_symbol(self.current, &def.decl.name, ty, None);
                Ok(())
            }
            Decl::Func(decl) => {
                let ty = self.lower_func_sig_in(self.current, &decl.sig, &d.params, decl.span)?;
                self.scopes.add_symbol(self.current, &decl.name, ty, None);
                Ok(())
            }
            _ => Err(
                CompileError::semantic("template must declare a struct or a function")
                    .with_span(d.span),
            ),
        }
    }

    /// Lower a written type specifier in the current scope
    pub fn lower_type_spec(&mut self, spec: &TypeSpec, span: Span) -> Result<Type> {
        self.lower_in(self.current, spec, span)
    }

    fn lower_in(&mut self, scope: ScopeId, spec: &TypeSpec, span: Span) -> Result<Type> {
        match spec {
            TypeSpec::Basic(primitive) => Ok(Type::basic(*primitive)),
            TypeSpec::Named(name) => match self.scopes.get_type(scope, name) {
                Some(ty) => Ok(ty.clone()),
                None => {
                    Err(CompileError::semantic(format!("unknown type `{name}`")).with_span(span))
                }
            },
            TypeSpec::Generic(name) => match self.scopes.get_type(scope, name) {
                Some(ty) => Ok(ty.clone()),
                None => Err(
                    CompileError::semantic(format!("unknown generic parameter `{name}`"))
                        .with_span(span),
                ),
            },
            TypeSpec::Array { elem, size } => {
                let elem_ty = self.lower_in(scope, elem, span)?;
                let index = elem_ty.dim_count();
                elem_ty
                    .with_array_dim(index, size.unwrap_or(0))
                    .map_err(|e| e.with_span(span))
            }
            TypeSpec::Reference(inner) => {
                let inner_ty = self.lower_in(scope, inner, span)?;
                inner_ty.with_reference().map_err(|e| e.with_span(span))
            }
            TypeSpec::Struct { name, generic_args } => {
                let base = match self.scopes.get_type(scope, name) {
                    Some(ty) => ty.clone(),
                    None => {
                        return Err(CompileError::semantic(format!("unknown type `{name}`"))
                            .with_span(span));
                    }
                };
                if generic_args.is_empty() {
                    return Ok(base);
                }
                let mut args = Vec::with_capacity(generic_args.len());
                for arg in generic_args {
                    args.push(self.lower_in(scope, arg, span)?);
                }
                base.instantiate(&args, &mut self.scopes)
                    .map_err(|e| e.with_span(span))
            }
            TypeSpec::Func(sig) => self.lower_func_sig_in(scope, sig, &[], span),
        }
    }

    /// Lower a function signature into a function type owning a fresh
    /// scope under `parent`. Generic parameter names are registered first
    /// so parameter and return specifiers can refer to them; an
    /// unannotated parameter stays a placeholder until specialization.
    pub fn lower_func_sig_in(
        &mut self,
        parent: ScopeId,
        sig: &FuncSig,
        generics: &[String],
        span: Span,
    ) -> Result<Type> {
        let mut ty = Type::function();
        let scope = ty.attach_scope(&mut self.scopes, parent);
        for name in generics {
            ty = ty.add_generic_param(template_param(name), &mut self.scopes);
        }
        for param in &sig.params {
            let param_ty = match &param.spec {
                Some(spec) => self.lower_in(scope, spec, param.span)?,
                None => Type::auto(),
            };
            let symbol = self.scopes.add_symbol(scope, &param.name, param_ty, None);
            ty = ty.add_func_param(symbol).map_err(|e| e.with_span(param.span))?;
        }
        let ret = match &sig.ret {
            Some(spec) => self.lower_in(scope, spec, span)?,
            None => Type::basic(Primitive::Void),
        };
        Ok(ty.with_return_type(ret))
    }
}

impl Default for Sema {
    fn default() -> Self {
        Self::new()
    }
}

/// `"_"` declares a positional template parameter
fn template_param(name: &str) -> Type {
    if name == "_" {
        Type::generic("")
    } else {
        Type::generic(name)
    }
}
