//! PLC Analyzer: walks a syntax tree and produces the typed IR.
//!
//! Entry point: [`Analyzer::analyze_source`].
//!
//! Analysis is fail-fast. The first violation aborts the unit and is
//! returned; no partial IR is produced.
//!
//! Error codes emitted:
//! - E200: undefined type name
//! - E201: subtype violation or invalid operator operands
//! - E202: wrong argument count
//! - E203: call target is not a function
//! - E204: receiver is not an object
//! - E205: object named after a predefined type
//! - E500: name already defined in the current frame
//! - E501: undefined name
//! - E502: undefined object member
//! - E503: duplicate parameter name
//! - E504: `RETURN` outside of a function
//! - E600: assignment to something other than a variable or property

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use plc_types::ast::{self, BinaryOp, Literal};
use plc_types::Scope;

use crate::error::{AnalysisError, AnalysisResult};
use crate::ir;
use crate::stdlib::TypeTable;
use crate::ty::{require_subtype, Type};

/// Binding that holds the enclosing function's return type.
///
/// `$` cannot start an identifier, so user code can never shadow it.
pub const RETURNS: &str = "$RETURNS";

/// The receiver binding inside method bodies.
pub const THIS: &str = "this";

// ══════════════════════════════════════════════════════════════════════════════
// Analyzer
// ══════════════════════════════════════════════════════════════════════════════

/// Walks a [`ast::Source`] and resolves the type of every node.
pub struct Analyzer<'a> {
    types: &'a TypeTable,
    /// The frame new names are defined in.
    scope: Scope<Type>,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer rooted at `scope`.
    pub fn new(types: &'a TypeTable, scope: Scope<Type>) -> Self {
        Self { types, scope }
    }

    /// The current frame.
    pub fn scope(&self) -> &Scope<Type> {
        &self.scope
    }

    /// Analyze a complete unit in the current frame.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn analyze_source(&mut self, source: &ast::Source) -> AnalysisResult<ir::Source> {
        let statements = self.analyze_stmts(&source.statements)?;
        tracing::debug!(statements = statements.len(), "analysis complete");
        Ok(ir::Source { statements })
    }

    /// Enter `frame` until the returned guard is dropped.
    fn scoped(&mut self, frame: Scope<Type>) -> ScopedAnalyzer<'_, 'a> {
        let previous = std::mem::replace(&mut self.scope, frame);
        ScopedAnalyzer {
            analyzer: self,
            previous: Some(previous),
        }
    }

    /// Resolve an optional declared type name; absence means `Any`.
    fn resolve_type(&self, name: Option<&str>) -> AnalysisResult<Type> {
        match name {
            None => Ok(Type::Any),
            Some(name) => self
                .types
                .lookup(name)
                .ok_or_else(|| AnalysisError::UndefinedType(name.to_string())),
        }
    }

    fn ensure_undefined(&self, name: &str) -> AnalysisResult<()> {
        if self.scope.get(name, true).is_some() {
            return Err(AnalysisError::AlreadyDefined(name.to_string()));
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn analyze_stmts(&mut self, stmts: &[ast::Stmt]) -> AnalysisResult<Vec<ir::Stmt>> {
        stmts.iter().map(|stmt| self.analyze_stmt(stmt)).collect()
    }

    /// Analyze a single statement in the current frame.
    pub fn analyze_stmt(&mut self, stmt: &ast::Stmt) -> AnalysisResult<ir::Stmt> {
        match stmt {
            ast::Stmt::Let(stmt) => self.analyze_let(stmt).map(ir::Stmt::Let),
            ast::Stmt::Def(stmt) => self.analyze_def(stmt).map(ir::Stmt::Def),
            ast::Stmt::If(stmt) => self.analyze_if(stmt).map(ir::Stmt::If),
            ast::Stmt::For(stmt) => self.analyze_for(stmt).map(ir::Stmt::For),
            ast::Stmt::Return(stmt) => self.analyze_return(stmt).map(ir::Stmt::Return),
            ast::Stmt::Expression(expr) => self.analyze_expr(expr).map(ir::Stmt::Expression),
            ast::Stmt::Assignment(stmt) => {
                self.analyze_assignment(stmt).map(ir::Stmt::Assignment)
            }
        }
    }

    fn analyze_let(&mut self, stmt: &ast::Let) -> AnalysisResult<ir::Let> {
        self.ensure_undefined(&stmt.name)?;
        let declaration = self.analyze_declaration(stmt)?;
        self.scope
            .define(declaration.name.clone(), declaration.ty.clone())?;
        Ok(declaration)
    }

    /// Type a `LET` or object field without binding it.
    ///
    /// The bound type is the declared type, else the initializer's type,
    /// else `Any`.
    fn analyze_declaration(&mut self, stmt: &ast::Let) -> AnalysisResult<ir::Let> {
        let declared = match &stmt.type_name {
            Some(name) => Some(self.resolve_type(Some(name))?),
            None => None,
        };
        let value = match &stmt.value {
            Some(expr) => Some(self.analyze_expr(expr)?),
            None => None,
        };
        let ty = match (declared, &value) {
            (Some(declared), Some(value)) => {
                require_subtype(value.ty(), &declared)?;
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(value)) => value.ty().clone(),
            (None, None) => Type::Any,
        };
        Ok(ir::Let {
            name: stmt.name.clone(),
            ty,
            value,
        })
    }

    /// Resolve a definition's parameters and return type.
    fn resolve_signature(&self, def: &ast::Def) -> AnalysisResult<(Vec<ir::Parameter>, Type)> {
        let mut seen = HashSet::new();
        let mut parameters = Vec::with_capacity(def.parameters.len());
        for param in &def.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(AnalysisError::DuplicateParameter(param.name.clone()));
            }
            parameters.push(ir::Parameter {
                name: param.name.clone(),
                ty: self.resolve_type(param.type_name.as_deref())?,
            });
        }
        let returns = self.resolve_type(def.return_type.as_deref())?;
        Ok((parameters, returns))
    }

    fn analyze_def(&mut self, def: &ast::Def) -> AnalysisResult<ir::Def> {
        self.ensure_undefined(&def.name)?;
        let (parameters, returns) = self.resolve_signature(def)?;
        let function = Type::function(
            parameters.iter().map(|p| p.ty.clone()).collect(),
            returns.clone(),
        );
        // Defined before the body so the function may call itself.
        self.scope.define(def.name.clone(), function)?;
        tracing::debug!(name = %def.name, "defined function");
        self.analyze_function_body(def, None, parameters, returns)
    }

    /// Analyze a function or method body in a fresh child frame binding
    /// the receiver (methods only), the parameters and `$RETURNS`.
    fn analyze_function_body(
        &mut self,
        def: &ast::Def,
        this: Option<Type>,
        parameters: Vec<ir::Parameter>,
        returns: Type,
    ) -> AnalysisResult<ir::Def> {
        let frame = self.scope.child();
        if let Some(this) = this {
            frame.define(THIS, this)?;
        }
        for param in &parameters {
            frame.define(param.name.clone(), param.ty.clone())?;
        }
        frame.define(RETURNS, returns.clone())?;

        let body = self.scoped(frame).analyze_stmts(&def.body)?;
        Ok(ir::Def {
            name: def.name.clone(),
            parameters,
            returns,
            body,
        })
    }

    fn analyze_if(&mut self, stmt: &ast::If) -> AnalysisResult<ir::If> {
        let condition = self.analyze_expr(&stmt.condition)?;
        require_subtype(condition.ty(), &Type::Boolean)?;
        // Both branches are checked, reachable or not.
        let then_frame = self.scope.child();
        let then_body = self.scoped(then_frame).analyze_stmts(&stmt.then_body)?;
        let else_frame = self.scope.child();
        let else_body = self.scoped(else_frame).analyze_stmts(&stmt.else_body)?;
        Ok(ir::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn analyze_for(&mut self, stmt: &ast::For) -> AnalysisResult<ir::For> {
        let expression = self.analyze_expr(&stmt.expression)?;
        require_subtype(expression.ty(), &Type::Iterable)?;
        let frame = self.scope.child();
        frame.define(stmt.name.clone(), Type::Integer)?;
        let body = self.scoped(frame).analyze_stmts(&stmt.body)?;
        Ok(ir::For {
            name: stmt.name.clone(),
            ty: Type::Integer,
            expression,
            body,
        })
    }

    fn analyze_return(&mut self, stmt: &ast::Return) -> AnalysisResult<ir::Return> {
        let returns = self
            .scope
            .get(RETURNS, false)
            .ok_or(AnalysisError::ReturnOutsideFunction)?;
        let value = match &stmt.value {
            Some(expr) => Some(self.analyze_expr(expr)?),
            None => None,
        };
        let found = value.as_ref().map_or(Type::Nil, |value| value.ty().clone());
        require_subtype(&found, &returns)?;
        Ok(ir::Return { value })
    }

    fn analyze_assignment(&mut self, stmt: &ast::Assignment) -> AnalysisResult<ir::Assignment> {
        match &stmt.target {
            ast::Expr::Variable { name } => {
                let target = self.analyze_variable(name)?;
                let value = self.analyze_expr(&stmt.value)?;
                require_subtype(value.ty(), &target.ty)?;
                Ok(ir::Assignment::Variable { target, value })
            }
            ast::Expr::Property { receiver, name } => {
                let target = self.analyze_property(receiver, name)?;
                let value = self.analyze_expr(&stmt.value)?;
                require_subtype(value.ty(), &target.ty)?;
                Ok(ir::Assignment::Property { target, value })
            }
            _ => Err(AnalysisError::InvalidAssignmentTarget),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    /// Analyze an expression in the current frame.
    pub fn analyze_expr(&mut self, expr: &ast::Expr) -> AnalysisResult<ir::Expr> {
        match expr {
            ast::Expr::Literal(value) => Ok(ir::Expr::Literal {
                ty: literal_type(value),
                value: value.clone(),
            }),
            ast::Expr::Group(inner) => Ok(ir::Expr::Group(Box::new(self.analyze_expr(inner)?))),
            ast::Expr::Binary { op, left, right } => self.analyze_binary(*op, left, right),
            ast::Expr::Variable { name } => self.analyze_variable(name).map(ir::Expr::Variable),
            ast::Expr::Property { receiver, name } => {
                self.analyze_property(receiver, name).map(ir::Expr::Property)
            }
            ast::Expr::Function { name, arguments } => self.analyze_call(name, arguments),
            ast::Expr::Method {
                receiver,
                name,
                arguments,
            } => self.analyze_method(receiver, name, arguments),
            ast::Expr::Object(object) => self.analyze_object(object).map(ir::Expr::Object),
        }
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn analyze_binary(
        &mut self,
        op: BinaryOp,
        left: &ast::Expr,
        right: &ast::Expr,
    ) -> AnalysisResult<ir::Expr> {
        let left = self.analyze_expr(left)?;
        let right = self.analyze_expr(right)?;
        let ty = binary_type(op, left.ty(), right.ty())?;
        Ok(ir::Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    // ── Names & Calls ────────────────────────────────────────────────────

    fn analyze_variable(&mut self, name: &str) -> AnalysisResult<ir::Variable> {
        let ty = self
            .scope
            .get(name, false)
            .ok_or_else(|| AnalysisError::UndefinedName(name.to_string()))?;
        Ok(ir::Variable {
            name: name.to_string(),
            ty,
        })
    }

    /// Resolve `receiver` to an object's member scope.
    fn analyze_receiver(&mut self, receiver: &ast::Expr) -> AnalysisResult<(ir::Expr, Scope<Type>)> {
        let receiver = self.analyze_expr(receiver)?;
        let members = match receiver.ty() {
            Type::Object(members) => members.clone(),
            other => return Err(AnalysisError::NotAnObject(other.clone())),
        };
        Ok((receiver, members))
    }

    fn analyze_property(&mut self, receiver: &ast::Expr, name: &str) -> AnalysisResult<ir::Property> {
        let (receiver, members) = self.analyze_receiver(receiver)?;
        let ty = members
            .get(name, true)
            .ok_or_else(|| AnalysisError::UndefinedMember(name.to_string()))?;
        Ok(ir::Property {
            receiver: Box::new(receiver),
            name: name.to_string(),
            ty,
        })
    }

    fn analyze_call(&mut self, name: &str, arguments: &[ast::Expr]) -> AnalysisResult<ir::Expr> {
        let target = self
            .scope
            .get(name, false)
            .ok_or_else(|| AnalysisError::UndefinedName(name.to_string()))?;
        let (arguments, ty) = self.analyze_arguments(name, &target, arguments)?;
        Ok(ir::Expr::Function {
            name: name.to_string(),
            arguments,
            ty,
        })
    }

    fn analyze_method(
        &mut self,
        receiver: &ast::Expr,
        name: &str,
        arguments: &[ast::Expr],
    ) -> AnalysisResult<ir::Expr> {
        let (receiver, members) = self.analyze_receiver(receiver)?;
        let target = members
            .get(name, true)
            .ok_or_else(|| AnalysisError::UndefinedMember(name.to_string()))?;
        // The receiver is not part of a method's `Function` type.
        let (arguments, ty) = self.analyze_arguments(name, &target, arguments)?;
        Ok(ir::Expr::Method {
            receiver: Box::new(receiver),
            name: name.to_string(),
            arguments,
            ty,
        })
    }

    /// Check arity, then analyze each argument against its parameter type
    /// left to right. Returns the typed arguments and the call's type.
    fn analyze_arguments(
        &mut self,
        name: &str,
        target: &Type,
        arguments: &[ast::Expr],
    ) -> AnalysisResult<(Vec<ir::Expr>, Type)> {
        let Type::Function(params, returns) = target else {
            return Err(AnalysisError::NotCallable {
                name: name.to_string(),
                found: target.clone(),
            });
        };
        if params.len() != arguments.len() {
            return Err(AnalysisError::WrongArgCount {
                name: name.to_string(),
                expected: params.len(),
                found: arguments.len(),
            });
        }
        let mut typed = Vec::with_capacity(arguments.len());
        for (argument, param) in arguments.iter().zip(params) {
            let argument = self.analyze_expr(argument)?;
            require_subtype(argument.ty(), param)?;
            typed.push(argument);
        }
        Ok((typed, returns.as_ref().clone()))
    }

    // ── Objects ──────────────────────────────────────────────────────────

    fn analyze_object(&mut self, object: &ast::ObjectExpr) -> AnalysisResult<ir::ObjectExpr> {
        if let Some(name) = &object.name {
            if self.types.contains(name) {
                return Err(AnalysisError::ReservedTypeName(name.clone()));
            }
        }
        // Members never fall back to outer frames.
        let members = Scope::root();
        let ty = Type::Object(members.clone());

        let mut fields = Vec::with_capacity(object.fields.len());
        for field in &object.fields {
            if members.get(&field.name, true).is_some() {
                return Err(AnalysisError::AlreadyDefined(field.name.clone()));
            }
            let field = self.analyze_declaration(field)?;
            members.define(field.name.clone(), field.ty.clone())?;
            fields.push(field);
        }

        // Every signature is registered before any body is checked, so
        // sibling methods may reference each other in any order.
        let mut signatures = Vec::with_capacity(object.methods.len());
        for method in &object.methods {
            if members.get(&method.name, true).is_some() {
                return Err(AnalysisError::AlreadyDefined(method.name.clone()));
            }
            let (parameters, returns) = self.resolve_signature(method)?;
            let function = Type::function(
                parameters.iter().map(|p| p.ty.clone()).collect(),
                returns.clone(),
            );
            members.define(method.name.clone(), function)?;
            signatures.push((parameters, returns));
        }
        tracing::debug!(
            name = object.name.as_deref().unwrap_or("<anonymous>"),
            methods = signatures.len(),
            "registered object members"
        );

        let mut methods = Vec::with_capacity(object.methods.len());
        for (method, (parameters, returns)) in object.methods.iter().zip(signatures) {
            methods.push(self.analyze_function_body(
                method,
                Some(ty.clone()),
                parameters,
                returns,
            )?);
        }

        Ok(ir::ObjectExpr {
            name: object.name.clone(),
            fields,
            methods,
            ty,
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Typing rules
// ══════════════════════════════════════════════════════════════════════════════

fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Nil => Type::Nil,
        Literal::Boolean(_) => Type::Boolean,
        Literal::Integer(_) => Type::Integer,
        Literal::Decimal(_) => Type::Decimal,
        Literal::String(_) => Type::String,
    }
}

/// The result type of `left op right`, given already-analyzed operands.
pub fn binary_type(op: BinaryOp, left: &Type, right: &Type) -> AnalysisResult<Type> {
    let invalid = || AnalysisError::InvalidOperands {
        op,
        left: left.clone(),
        right: right.clone(),
    };
    let same_as_left = || -> AnalysisResult<()> {
        if right == left {
            Ok(())
        } else {
            Err(AnalysisError::TypeMismatch {
                expected: left.clone(),
                found: right.clone(),
            })
        }
    };
    match op {
        BinaryOp::Add => {
            if *left == Type::String || *right == Type::String {
                return Ok(Type::String);
            }
            if !left.is_numeric() {
                return Err(invalid());
            }
            same_as_left()?;
            Ok(left.clone())
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            if !left.is_numeric() {
                return Err(invalid());
            }
            same_as_left()?;
            Ok(left.clone())
        }
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            require_subtype(left, &Type::Comparable)?;
            same_as_left()?;
            Ok(Type::Boolean)
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            require_subtype(left, &Type::Equatable)?;
            require_subtype(right, &Type::Equatable)?;
            Ok(Type::Boolean)
        }
        BinaryOp::And | BinaryOp::Or => {
            require_subtype(left, &Type::Boolean)?;
            require_subtype(right, &Type::Boolean)?;
            Ok(Type::Boolean)
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Scope guard
// ══════════════════════════════════════════════════════════════════════════════

/// Restores the analyzer's previous frame on drop, including when a
/// nested analysis returns early with an error.
struct ScopedAnalyzer<'guard, 'a> {
    analyzer: &'guard mut Analyzer<'a>,
    previous: Option<Scope<Type>>,
}

impl Drop for ScopedAnalyzer<'_, '_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.analyzer.scope = previous;
        }
    }
}

impl<'a> Deref for ScopedAnalyzer<'_, 'a> {
    type Target = Analyzer<'a>;

    fn deref(&self) -> &Self::Target {
        self.analyzer
    }
}

impl DerefMut for ScopedAnalyzer<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.analyzer
    }
}
