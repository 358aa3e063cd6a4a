//! Semantic analysis: resolves identifiers and type names over the
//! parser's AST, assigns fresh variable ids, and groups globals into
//! descriptor sets (spec §4.3).

use crate::ast::*;
use crate::error::AnalyzeError;
use crate::functions::{Function, FunctionParam, FunctionRegistry};
use crate::globals::{DescriptorSetId, Global, GlobalRegistry, DEFAULT_SET_NAME, ROOT_CONSTANTS_SET_NAME};
use crate::names::{NameId, NamePool};
use crate::span::SourceSpan;
use crate::types::{builtin, ConstValue, TypeId, TypeRef, TypeRegistry};
use crate::variable::{VariableId, VariableIdGen};

type AResult<T> = Result<T, (AnalyzeError, SourceSpan)>;

/// Built-in callables that are not simply a type constructor. `float`,
/// `float2`, `float3`, and `float4` named in spec §4.3's intrinsic
/// list resolve through the ordinary constructor path instead (they
/// are already type names in the registry) — see [`CalleeKind`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Intrinsic {
    Sample,
    SampleLod,
    GroupId,
    GroupThreadId,
    DispatchThreadId,
    GroupIndex,
}

impl Intrinsic {
    pub fn lookup(name: &str) -> Option<Intrinsic> {
        Some(match name {
            "sample" => Intrinsic::Sample,
            "sample_lod" => Intrinsic::SampleLod,
            "group_id" => Intrinsic::GroupId,
            "group_thread_id" => Intrinsic::GroupThreadId,
            "dispatch_thread_id" => Intrinsic::DispatchThreadId,
            "group_index" => Intrinsic::GroupIndex,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::Sample => "sample",
            Intrinsic::SampleLod => "sample_lod",
            Intrinsic::GroupId => "group_id",
            Intrinsic::GroupThreadId => "group_thread_id",
            Intrinsic::DispatchThreadId => "dispatch_thread_id",
            Intrinsic::GroupIndex => "group_index",
        }
    }

    /// Exact argument count expected; `sample`/`sample_lod` take a
    /// texture, a sampler, and a coordinate (plus an explicit LOD).
    /// The thread/group intrinsics are nullary system values.
    pub fn arity(self) -> usize {
        match self {
            Intrinsic::Sample => 3,
            Intrinsic::SampleLod => 4,
            Intrinsic::GroupId | Intrinsic::GroupThreadId | Intrinsic::DispatchThreadId => 0,
            Intrinsic::GroupIndex => 0,
        }
    }

    pub fn return_type(self) -> TypeId {
        match self {
            Intrinsic::Sample | Intrinsic::SampleLod => builtin::float4,
            Intrinsic::GroupId | Intrinsic::GroupThreadId | Intrinsic::DispatchThreadId => builtin::uint3,
            Intrinsic::GroupIndex => builtin::uint,
        }
    }
}

struct LocalBinding {
    name: NameId,
    var: VariableId,
    ty: TypeRef,
}

struct FunctionContext {
    return_ty: Option<TypeRef>,
    descriptor_sets: Vec<DescriptorSetId>,
}

pub struct Analyzer<'a> {
    pool: &'a mut NamePool,
    types: &'a mut TypeRegistry,
    functions: &'a mut FunctionRegistry,
    globals: &'a mut GlobalRegistry,
    vargen: &'a mut VariableIdGen,
    scopes: Vec<Vec<LocalBinding>>,
    function_ctx: Option<FunctionContext>,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        pool: &'a mut NamePool,
        types: &'a mut TypeRegistry,
        functions: &'a mut FunctionRegistry,
        globals: &'a mut GlobalRegistry,
        vargen: &'a mut VariableIdGen,
    ) -> Self {
        Analyzer {
            pool,
            types,
            functions,
            globals,
            vargen,
            scopes: Vec::new(),
            function_ctx: None,
        }
    }

    pub fn analyze_program(&mut self, defs: &[Definition]) -> AResult<()> {
        for def in defs {
            if let Definition::Struct(s) = def {
                self.types.insert_struct(s.name, s.attributes.clone());
            }
        }
        for def in defs {
            if let Definition::Struct(s) = def {
                self.fill_struct_members(s)?;
            }
        }
        for def in defs {
            if let Definition::ConstGlobal(g) = def {
                self.register_global(g)?;
            }
        }
        let mut function_ids = Vec::new();
        for def in defs {
            if let Definition::Function(f) = def {
                function_ids.push(self.register_function_signature(f)?);
            }
        }
        for id in function_ids {
            self.analyze_function_body(id)?;
        }
        Ok(())
    }

    fn resolve_type_ref(&mut self, type_name: NameId, array_size: u32, span: SourceSpan) -> AResult<TypeRef> {
        match self.types.lookup(type_name) {
            Some(id) => Ok(if array_size == crate::types::SCALAR {
                TypeRef::scalar(id)
            } else {
                TypeRef::array(id, array_size)
            }),
            None => Err((AnalyzeError::UnknownType(self.pool.get(type_name).to_string()), span)),
        }
    }

    fn fill_struct_members(&mut self, s: &StructDef) -> AResult<()> {
        let type_id = self.types.lookup(s.name).expect("struct registered in first pass");
        let mut members = Vec::new();
        let mut seen: Vec<NameId> = Vec::new();
        for m in &s.members {
            if seen.contains(&m.name) {
                return Err((AnalyzeError::DuplicateMember(self.pool.get(m.name).to_string()), m.span));
            }
            seen.push(m.name);
            let ty = self.resolve_type_ref(m.type_name, m.array_size, m.span)?;
            let default = match &m.default {
                Some(expr) => Some(self.const_eval(expr, ty.ty)?),
                None => None,
            };
            members.push(crate::types::Member {
                name: m.name,
                ty,
                default,
            });
        }
        self.types.get_mut(type_id).members = members;
        Ok(())
    }

    /// Folds a constant-expression subset: literals, grouping, and
    /// unary negate/not over them. Anything else is rejected — the
    /// source grammar does not define a general compile-time
    /// evaluator (spec §4.3 scopes the analyzer to name/type
    /// resolution, not constant folding of arbitrary expressions).
    ///
    /// `target` is the type the caller already resolved for this
    /// constant (a struct member's or const-global's declared type);
    /// a bare numeric literal folds to `Int`/`UInt`/`Float` by `target`
    /// rather than always `Float`, matching what `coerce_literal_to`
    /// does for ordinary (non-const) initializers.
    fn const_eval(&self, expr: &Expr, target: TypeId) -> AResult<ConstValue> {
        match &expr.kind {
            ExprKind::Number(n) => {
                if target == builtin::int {
                    Ok(ConstValue::Int(*n as i64))
                } else if target == builtin::uint {
                    Ok(ConstValue::UInt(*n as u64))
                } else {
                    Ok(ConstValue::Float(*n))
                }
            }
            ExprKind::Boolean(b) => Ok(ConstValue::Bool(*b)),
            ExprKind::Grouping(inner) => self.const_eval(inner, target),
            ExprKind::Unary(UnOp::Negate, inner) => match self.const_eval(inner, target)? {
                ConstValue::Float(n) => Ok(ConstValue::Float(-n)),
                ConstValue::Int(n) => Ok(ConstValue::Int(-n)),
                ConstValue::UInt(n) => Ok(ConstValue::Int(-(n as i64))),
                other => Ok(other),
            },
            ExprKind::Unary(UnOp::Not, inner) => match self.const_eval(inner, target)? {
                ConstValue::Bool(b) => Ok(ConstValue::Bool(!b)),
                other => Ok(other),
            },
            _ => Err((
                AnalyzeError::TypeMismatch {
                    expected: "constant expression".to_string(),
                    found: "non-constant expression".to_string(),
                },
                expr.span,
            )),
        }
    }

    /// Retypes a bare numeric literal (or a grouping/negation wrapping
    /// one) to `target` in place, instead of the `float` default
    /// `analyze_expr` always gives `ExprKind::Number`. Called once the
    /// declared type of the slot the literal initializes is known, so
    /// e.g. `let x: int = 0;` lowers a genuinely int-typed constant
    /// rather than a float one stored into an int variable.
    fn coerce_literal_to(&self, expr: &mut Expr, target: TypeId) {
        match &mut expr.kind {
            ExprKind::Number(_) => expr.ty = TypeRef::scalar(target),
            ExprKind::Grouping(inner) => {
                self.coerce_literal_to(inner, target);
                expr.ty = inner.ty;
            }
            ExprKind::Unary(UnOp::Negate, inner) => {
                self.coerce_literal_to(inner, target);
                expr.ty = inner.ty;
            }
            _ => {}
        }
    }

    fn register_global(&mut self, g: &ConstGlobalDef) -> AResult<()> {
        let ty = self.resolve_type_ref(g.type_name, g.array_size, g.span)?;
        let const_value = match &g.init {
            Some(expr) => Some(self.const_eval(expr, ty.ty)?),
            None => None,
        };
        let writable = self.pool.lookup("write").map(|n| g.attributes.has(n)).unwrap_or(false);
        let set_attr_name = self.pool.intern("set");
        let set_name = match g.attributes.find(set_attr_name) {
            Some(attr) => match attr.args.first() {
                Some(crate::attribute::AttributeArg::Name(n)) => *n,
                _ => self.pool.intern(DEFAULT_SET_NAME),
            },
            None => self.pool.intern(DEFAULT_SET_NAME),
        };
        if set_name == self.pool.intern(ROOT_CONSTANTS_SET_NAME)
            && self
                .globals
                .sets()
                .any(|(_, s)| s.name == set_name && !s.members.is_empty())
        {
            return Err((
                AnalyzeError::TypeMismatch {
                    expected: "at most one member in the root_constants set".to_string(),
                    found: format!("a second member {:?}", self.pool.get(g.name)),
                },
                g.span,
            ));
        }
        let var = self.vargen.fresh();
        let global_id = self.globals.insert(Global {
            name: g.name,
            ty,
            attributes: g.attributes.clone(),
            const_value,
            var,
            set: None,
        });
        self.globals.assign_to_set(global_id, set_name, writable);
        Ok(())
    }

    fn register_function_signature(&mut self, f: &FunctionDef) -> AResult<crate::functions::FunctionId> {
        let mut params = Vec::new();
        let mut seen: Vec<NameId> = Vec::new();
        for p in &f.params {
            if seen.contains(&p.name) {
                return Err((AnalyzeError::DuplicateParameter(self.pool.get(p.name).to_string()), p.span));
            }
            seen.push(p.name);
            let ty = self.resolve_type_ref(p.type_name, crate::types::SCALAR, p.span)?;
            params.push(FunctionParam {
                name: p.name,
                ty,
                var: self.vargen.fresh(),
            });
        }
        let return_ty = match f.return_type_name {
            Some(name) => Some(self.resolve_type_ref(name, crate::types::SCALAR, f.span)?),
            None => None,
        };
        let id = self.functions.insert(Function {
            name: f.name,
            params,
            return_ty,
            attributes: f.attributes.clone(),
            body: Some(f.body.clone()),
            opcodes: Vec::new(),
            descriptor_set_group: Vec::new(),
        });
        Ok(id)
    }

    fn analyze_function_body(&mut self, id: crate::functions::FunctionId) -> AResult<()> {
        let mut body = self.functions.get_mut(id).body.take().expect("body present before analysis");
        let return_ty = self.functions.get(id).return_ty;
        self.function_ctx = Some(FunctionContext {
            return_ty,
            descriptor_sets: Vec::new(),
        });
        let param_frame: Vec<LocalBinding> = self
            .functions
            .get(id)
            .params
            .iter()
            .map(|p| LocalBinding {
                name: p.name,
                var: p.var,
                ty: p.ty,
            })
            .collect();
        self.scopes.push(param_frame);
        let result = self.analyze_block(&mut body);
        self.scopes.pop();
        let ctx = self.function_ctx.take().unwrap();
        result?;
        let f = self.functions.get_mut(id);
        f.body = Some(body);
        f.descriptor_set_group = ctx.descriptor_sets;
        Ok(())
    }

    fn analyze_block(&mut self, block: &mut Block) -> AResult<()> {
        self.scopes.push(Vec::new());
        for stmt in &mut block.statements {
            self.analyze_stmt(stmt, &mut block.variables)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn analyze_stmt(&mut self, stmt: &mut Stmt, locals: &mut [LocalVariable]) -> AResult<()> {
        match &mut stmt.kind {
            StmtKind::Expression(expr) => {
                self.analyze_expr(expr)?;
            }
            StmtKind::Return(value) => {
                let return_ty = self.function_ctx.as_ref().and_then(|c| c.return_ty);
                match (value.as_mut(), return_ty) {
                    (Some(expr), Some(ty)) => {
                        self.analyze_expr(expr)?;
                        self.coerce_literal_to(expr, ty.ty);
                    }
                    (Some(_), None) => {
                        return Err((AnalyzeError::UnexpectedReturnValue("<function>".to_string()), stmt.span));
                    }
                    (None, Some(_)) => {
                        return Err((AnalyzeError::MissingReturnValue("<function>".to_string()), stmt.span));
                    }
                    (None, None) => {}
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.analyze_expr(cond)?;
                self.analyze_stmt(then_branch, locals)?;
                if let Some(else_branch) = else_branch {
                    self.analyze_stmt(else_branch, locals)?;
                }
            }
            StmtKind::While { cond, body } => {
                self.analyze_expr(cond)?;
                self.analyze_stmt(body, locals)?;
            }
            StmtKind::Block(block) => {
                self.analyze_block(block)?;
            }
            StmtKind::LocalVariable { local, init } => {
                if let Some(expr) = init.as_mut() {
                    self.analyze_expr(expr)?;
                }
                let declared = locals[*local].declared_type_name;
                let ty = match declared {
                    Some(name) => self.resolve_type_ref(name, locals[*local].declared_array_size, stmt.span)?,
                    None => match init.as_ref() {
                        Some(expr) => expr.ty,
                        None => {
                            return Err((
                                AnalyzeError::TypeMismatch {
                                    expected: "a type annotation or initializer".to_string(),
                                    found: "neither".to_string(),
                                },
                                stmt.span,
                            ))
                        }
                    },
                };
                if declared.is_some() {
                    if let Some(expr) = init.as_mut() {
                        self.coerce_literal_to(expr, ty.ty);
                    }
                }
                let var = self.vargen.fresh();
                locals[*local].ty = ty;
                locals[*local].var = var;
                self.scopes.last_mut().unwrap().push(LocalBinding {
                    name: locals[*local].name,
                    var,
                    ty,
                });
            }
        }
        Ok(())
    }

    fn lookup_local(&self, name: NameId) -> Option<&LocalBinding> {
        for frame in self.scopes.iter().rev() {
            if let Some(b) = frame.iter().rev().find(|b| b.name == name) {
                return Some(b);
            }
        }
        None
    }

    fn analyze_expr(&mut self, expr: &mut Expr) -> AResult<()> {
        match &mut expr.kind {
            ExprKind::Boolean(_) => expr.ty = TypeRef::scalar(builtin::bool_),
            ExprKind::Number(_) => expr.ty = TypeRef::scalar(builtin::float),
            ExprKind::String(_) => expr.ty = TypeRef::scalar(builtin::void),
            ExprKind::Identifier(name) => self.analyze_identifier(*name, expr)?,
            ExprKind::Grouping(inner) => {
                self.analyze_expr(inner)?;
                expr.ty = inner.ty;
                expr.variable = inner.variable;
            }
            ExprKind::Unary(op, inner) => {
                self.analyze_expr(inner)?;
                expr.ty = match op {
                    UnOp::Not => TypeRef::scalar(builtin::bool_),
                    UnOp::Negate => inner.ty,
                };
            }
            ExprKind::Binary(op, left, right) => {
                self.analyze_expr(left)?;
                self.analyze_expr(right)?;
                expr.ty = if op.is_compound_assign() || *op == BinOp::Assign {
                    left.ty
                } else {
                    match op {
                        BinOp::Equals
                        | BinOp::NotEquals
                        | BinOp::Less
                        | BinOp::LessEqual
                        | BinOp::Greater
                        | BinOp::GreaterEqual
                        | BinOp::And
                        | BinOp::Or => TypeRef::scalar(builtin::bool_),
                        _ => left.ty,
                    }
                };
            }
            ExprKind::Member { target, name } => {
                self.analyze_expr(target)?;
                let target_ty = target.ty.ty;
                let target_span = target.span;
                let member_name = *name;
                let (member_path, ty) = self.resolve_member(target_ty, member_name, target_span)?;
                expr.member_path = member_path;
                expr.ty = ty;
            }
            ExprKind::Index { target, index } => {
                self.analyze_expr(target)?;
                self.analyze_expr(index)?;
                let target_ty = target.ty;
                expr.ty = TypeRef::scalar(self.types.get(target_ty.ty).base_type);
            }
            ExprKind::Call { callee, args } => {
                for a in args.iter_mut() {
                    self.analyze_expr(a)?;
                }
                let args_len = args.len();
                let span = expr.span;
                let (ty, callee_kind) = self.analyze_call(callee.as_ref(), args_len, span)?;
                expr.ty = ty;
                expr.callee_kind = Some(callee_kind);
            }
        }
        Ok(())
    }

    fn analyze_identifier(&mut self, name: NameId, expr: &mut Expr) -> AResult<()> {
        if let Some(local) = self.lookup_local(name) {
            expr.ty = local.ty;
            expr.variable = Some(local.var);
            return Ok(());
        }
        if let Some(global_id) = self.globals.lookup(name) {
            let global = self.globals.get(global_id);
            expr.ty = global.ty;
            expr.variable = Some(global.var);
            if let Some(set_id) = global.set {
                if let Some(ctx) = self.function_ctx.as_mut() {
                    if !ctx.descriptor_sets.contains(&set_id) {
                        ctx.descriptor_sets.push(set_id);
                    }
                }
            }
            return Ok(());
        }
        Err((AnalyzeError::UnknownIdentifier(self.pool.get(name).to_string()), expr.span))
    }

    fn resolve_member(&mut self, target_ty: TypeId, name: NameId, span: SourceSpan) -> AResult<(Vec<MemberStep>, TypeRef)> {
        let member_str = self.pool.get(name).to_string();

        if self.types.is_vector(target_ty) {
            if let Some(steps) = swizzle_steps(&member_str) {
                let base = self.types.get(target_ty).base_type;
                let ty = if steps.len() == 1 {
                    TypeRef::scalar(base)
                } else {
                    TypeRef::scalar(vector_type_for(base, steps.len() as u32))
                };
                return Ok((steps, ty));
            }
            return Err((
                AnalyzeError::UnsupportedMember {
                    ty: self.type_display(target_ty),
                    member: member_str,
                },
                span,
            ));
        }

        let ty_record = self.types.get(target_ty);
        match ty_record.members.iter().position(|m| m.name == name) {
            Some(ordinal) => {
                let member_ty = ty_record.members[ordinal].ty;
                let steps = vec![MemberStep {
                    index: ordinal as u32,
                    is_array_index: false,
                }];
                Ok((steps, member_ty))
            }
            None => Err((
                AnalyzeError::UnsupportedMember {
                    ty: self.type_display(target_ty),
                    member: member_str,
                },
                span,
            )),
        }
    }

    fn type_display(&self, id: TypeId) -> String {
        match self.types.get(id).name {
            Some(n) => self.pool.get(n).to_string(),
            None => format!("<anonymous type {}>", id.0),
        }
    }

    fn analyze_call(&mut self, callee: &Expr, args_len: usize, span: SourceSpan) -> AResult<(TypeRef, CalleeKind)> {
        let name = match &callee.kind {
            ExprKind::Identifier(n) => *n,
            _ => {
                return Err((
                    AnalyzeError::TypeMismatch {
                        expected: "a function, intrinsic, or type name".to_string(),
                        found: "a non-identifier expression".to_string(),
                    },
                    callee.span,
                ))
            }
        };
        let name_str = self.pool.get(name).to_string();

        if let Some(fn_id) = self.functions.lookup(name) {
            let f = self.functions.get(fn_id);
            if f.params.len() != args_len {
                return Err((
                    AnalyzeError::ArityMismatch {
                        callee: name_str,
                        expected: f.params.len(),
                        found: args_len,
                    },
                    span,
                ));
            }
            let ty = f.return_ty.unwrap_or_else(|| TypeRef::scalar(builtin::void));
            return Ok((ty, CalleeKind::Function(fn_id)));
        }

        if let Some(intrinsic) = Intrinsic::lookup(&name_str) {
            if intrinsic.arity() != args_len {
                return Err((
                    AnalyzeError::ArityMismatch {
                        callee: name_str,
                        expected: intrinsic.arity(),
                        found: args_len,
                    },
                    span,
                ));
            }
            return Ok((TypeRef::scalar(intrinsic.return_type()), CalleeKind::Intrinsic(intrinsic)));
        }

        if let Some(type_id) = self.types.lookup(name) {
            return Ok((TypeRef::scalar(type_id), CalleeKind::Constructor(type_id)));
        }

        Err((AnalyzeError::UnknownIdentifier(name_str), callee.span))
    }
}

fn swizzle_steps(member: &str) -> Option<Vec<MemberStep>> {
    if member.is_empty() || member.len() > 4 {
        return None;
    }
    let xyzw = member.chars().all(|c| matches!(c, 'x' | 'y' | 'z' | 'w'));
    let rgba = member.chars().all(|c| matches!(c, 'r' | 'g' | 'b' | 'a'));
    if !xyzw && !rgba {
        return None;
    }
    member
        .chars()
        .map(|c| {
            let index = match c {
                'x' | 'r' => 0,
                'y' | 'g' => 1,
                'z' | 'b' => 2,
                'w' | 'a' => 3,
                _ => unreachable!(),
            };
            Some(MemberStep {
                index,
                is_array_index: false,
            })
        })
        .collect()
}

fn vector_type_for(base: TypeId, count: usize) -> TypeId {
    match (base, count) {
        (b, 2) if b == builtin::float => builtin::float2,
        (b, 3) if b == builtin::float => builtin::float3,
        (b, 4) if b == builtin::float => builtin::float4,
        (b, 2) if b == builtin::int => builtin::int2,
        (b, 3) if b == builtin::int => builtin::int3,
        (b, 4) if b == builtin::int => builtin::int4,
        (b, 2) if b == builtin::uint => builtin::uint2,
        (b, 3) if b == builtin::uint => builtin::uint3,
        (b, 4) if b == builtin::uint => builtin::uint4,
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::token::tokenize;

    fn analyze_src(src: &str) -> (NamePool, TypeRegistry, FunctionRegistry, GlobalRegistry, VariableIdGen) {
        let mut pool = NamePool::new();
        let mut types = TypeRegistry::new(&mut pool);
        let mut functions = FunctionRegistry::new();
        let mut globals = GlobalRegistry::new();
        let mut vargen = VariableIdGen::new();
        let tokens = tokenize(src, &mut pool).unwrap();
        let defs = parse(&tokens, &mut pool).unwrap();
        {
            let mut analyzer = Analyzer::new(&mut pool, &mut types, &mut functions, &mut globals, &mut vargen);
            analyzer.analyze_program(&defs).unwrap();
        }
        (pool, types, functions, globals, vargen)
    }

    #[test]
    fn resolves_struct_member_load() {
        let (pool, _types, functions, _globals, _vargen) =
            analyze_src("struct S { x: float; } fn id(s: S) -> float { return s.x; }");
        let fn_id = functions.lookup(pool.lookup("id").unwrap()).unwrap();
        let f = functions.get(fn_id);
        match &f.body.as_ref().unwrap().statements[0].kind {
            StmtKind::Return(Some(expr)) => match &expr.kind {
                ExprKind::Member { name, .. } => assert_eq!(pool.get(*name), "x"),
                _ => panic!(),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn swizzle_xyz_produces_three_indices() {
        let (_pool, _types, functions, _globals, _vargen) = analyze_src(
            "fn f(v: float4) -> float3 { return v.xyz; }",
        );
        let f = functions.iter().next().unwrap().1;
        match &f.body.as_ref().unwrap().statements[0].kind {
            StmtKind::Return(Some(expr)) => {
                assert_eq!(expr.member_path.len(), 3);
                assert_eq!(expr.member_path[0].index, 0);
                assert_eq!(expr.member_path[2].index, 2);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn missing_return_type_with_return_value_is_an_error() {
        let mut pool = NamePool::new();
        let mut types = TypeRegistry::new(&mut pool);
        let mut functions = FunctionRegistry::new();
        let mut globals = GlobalRegistry::new();
        let mut vargen = VariableIdGen::new();
        let tokens = tokenize("fn f(x: int) { return x; }", &mut pool).unwrap();
        let defs = parse(&tokens, &mut pool).unwrap();
        let mut analyzer = Analyzer::new(&mut pool, &mut types, &mut functions, &mut globals, &mut vargen);
        let err = analyzer.analyze_program(&defs).unwrap_err();
        assert_eq!(err.0, AnalyzeError::UnexpectedReturnValue("<function>".to_string()));
    }

    #[test]
    fn descriptor_set_default_and_named() {
        let (pool, _types, _functions, globals, _vargen) = analyze_src(
            "#[set(material)] const albedo: tex2d;\nconst factor: float = 1.0;",
        );
        let default_set = pool.lookup(DEFAULT_SET_NAME).unwrap();
        let material_set = pool.lookup("material").unwrap();
        assert!(globals.sets().any(|(_, s)| s.name == default_set));
        assert!(globals.sets().any(|(_, s)| s.name == material_set));
    }

    #[test]
    fn unknown_type_is_reported() {
        let mut pool = NamePool::new();
        let mut types = TypeRegistry::new(&mut pool);
        let mut functions = FunctionRegistry::new();
        let mut globals = GlobalRegistry::new();
        let mut vargen = VariableIdGen::new();
        let tokens = tokenize("struct S { x: Bogus; }", &mut pool).unwrap();
        let defs = parse(&tokens, &mut pool).unwrap();
        let mut analyzer = Analyzer::new(&mut pool, &mut types, &mut functions, &mut globals, &mut vargen);
        let err = analyzer.analyze_program(&defs).unwrap_err();
        matches!(err.0, AnalyzeError::UnknownType(_));
    }
}
