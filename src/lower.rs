//! IR emitter (spec §4.4): walks one function's analyzed body and
//! appends opcodes to its buffer, binding each expression's result to
//! a fresh variable id.

use crate::ast::*;
use crate::functions::FunctionRegistry;
use crate::ir::{BinaryOp, ConstantLoad, LabelId, MemberAccess, Opcode, OpcodeBuffer};
use crate::names::{NameId, NamePool, NO_NAME};
use crate::types::{TypeId, TypeRegistry};
use crate::variable::{VariableId, VariableIdGen};
use fxhash::FxHashMap;

/// The result of lowering one function: its opcode buffer plus the
/// type every variable id it mentions was declared or produced with.
/// The opcode stream itself carries no type information (spec §9
/// keeps `Opcode` a plain enum over ids), so backends that need to
/// declare a variable's storage type consult this map instead.
pub struct LoweredFunction {
    pub opcodes: OpcodeBuffer,
    pub variable_types: FxHashMap<VariableId, TypeId>,
}

struct Lowerer<'a> {
    pool: &'a mut NamePool,
    types: &'a TypeRegistry,
    functions: &'a FunctionRegistry,
    vargen: &'a mut VariableIdGen,
    next_label: u32,
    out: OpcodeBuffer,
    var_types: FxHashMap<VariableId, TypeId>,
}

/// Lowers an already-analyzed function body to its opcode buffer.
/// `params` supplies the signature's formal parameter ids and types;
/// each gets a defining `VAR` opcode before the body so every later
/// read of a parameter satisfies "every use has a prior defining
/// opcode".
pub fn lower_function(
    body: &Block,
    params: &[(VariableId, TypeId)],
    pool: &mut NamePool,
    types: &TypeRegistry,
    functions: &FunctionRegistry,
    vargen: &mut VariableIdGen,
) -> LoweredFunction {
    let mut lowerer = Lowerer {
        pool,
        types,
        functions,
        vargen,
        next_label: 1,
        out: Vec::new(),
        var_types: FxHashMap::default(),
    };
    for &(var, ty) in params {
        lowerer.out.push(Opcode::Var { var });
        lowerer.var_types.insert(var, ty);
    }
    for stmt in &body.statements {
        lowerer.lower_stmt(stmt, &body.variables);
    }
    LoweredFunction {
        opcodes: lowerer.out,
        variable_types: lowerer.var_types,
    }
}

fn map_binop(op: BinOp) -> BinaryOp {
    match op {
        BinOp::Add | BinOp::AddAssign => BinaryOp::Add,
        BinOp::Sub | BinOp::SubAssign => BinaryOp::Sub,
        BinOp::Mul | BinOp::MulAssign => BinaryOp::Mul,
        BinOp::Div | BinOp::DivAssign => BinaryOp::Div,
        BinOp::Mod => BinaryOp::Mod,
        BinOp::Equals => BinaryOp::Equals,
        BinOp::NotEquals => BinaryOp::NotEquals,
        BinOp::Less => BinaryOp::Less,
        BinOp::LessEqual => BinaryOp::LessEqual,
        BinOp::Greater => BinaryOp::Greater,
        BinOp::GreaterEqual => BinaryOp::GreaterEqual,
        BinOp::And => BinaryOp::And,
        BinOp::Or => BinaryOp::Or,
        BinOp::Assign => unreachable!("plain assignment has no arithmetic opcode"),
    }
}

impl<'a> Lowerer<'a> {
    fn fresh_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    fn fresh_var(&mut self, ty: TypeId) -> VariableId {
        let id = self.vargen.fresh();
        self.var_types.insert(id, ty);
        id
    }

    fn lower_stmt(&mut self, stmt: &Stmt, block_vars: &[LocalVariable]) {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.lower_expr(expr);
            }
            StmtKind::Return(value) => {
                let value = value.as_ref().map(|e| self.lower_expr(e));
                self.out.push(Opcode::Return { value });
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let condition = self.lower_expr(cond);
                let start = self.fresh_label();
                let else_label = self.fresh_label();
                let end = self.fresh_label();
                self.out.push(Opcode::If {
                    condition,
                    start,
                    else_label,
                    end,
                });
                self.out.push(Opcode::BlockStart);
                self.lower_body(then_branch, block_vars);
                self.out.push(Opcode::BlockEnd);
                if let Some(else_branch) = else_branch {
                    self.out.push(Opcode::BlockStart);
                    self.lower_body(else_branch, block_vars);
                    self.out.push(Opcode::BlockEnd);
                }
            }
            StmtKind::While { cond, body } => {
                let start = self.fresh_label();
                let continue_label = self.fresh_label();
                let end = self.fresh_label();
                self.out.push(Opcode::WhileStart {
                    start,
                    continue_label,
                    end,
                });
                let condition = self.lower_expr(cond);
                self.out.push(Opcode::WhileCondition { condition });
                self.out.push(Opcode::BlockStart);
                self.lower_body(body, block_vars);
                self.out.push(Opcode::BlockEnd);
                self.out.push(Opcode::WhileEnd);
            }
            StmtKind::Block(block) => {
                self.out.push(Opcode::BlockStart);
                for s in &block.statements {
                    self.lower_stmt(s, &block.variables);
                }
                self.out.push(Opcode::BlockEnd);
            }
            StmtKind::LocalVariable { init, local } => {
                let decl = &block_vars[*local];
                let var = decl.var;
                self.out.push(Opcode::Var { var });
                self.var_types.insert(var, decl.ty.ty);
                if let Some(init) = init {
                    let from = self.lower_expr(init);
                    self.out.push(Opcode::StoreVariable { to: var, from });
                }
            }
        }
    }

    /// Lowers the body of an `if`/`while` construct without the extra
    /// `BlockStart`/`BlockEnd` pair a bare `StmtKind::Block` would add
    /// on its own — the construct's own pair already supplies that
    /// scope (spec §4.4/§4.5).
    fn lower_body(&mut self, stmt: &Stmt, outer_vars: &[LocalVariable]) {
        match &stmt.kind {
            StmtKind::Block(block) => {
                for s in &block.statements {
                    self.lower_stmt(s, &block.variables);
                }
            }
            _ => self.lower_stmt(stmt, outer_vars),
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> VariableId {
        match &expr.kind {
            ExprKind::Boolean(b) => self.emit_constant(ConstantLoad::Bool(*b), expr.ty.ty),
            ExprKind::Number(n) => {
                if expr.ty.ty == crate::types::builtin::int || expr.ty.ty == crate::types::builtin::uint {
                    self.emit_constant(ConstantLoad::Int(*n as i64), expr.ty.ty)
                } else {
                    self.emit_constant(ConstantLoad::Float(*n), expr.ty.ty)
                }
            }
            ExprKind::String(_) => {
                log::warn!("string literal has no IR representation; emitting an empty slot");
                let to = self.fresh_var(expr.ty.ty);
                self.out.push(Opcode::Var { var: to });
                to
            }
            ExprKind::Identifier(_) => expr.variable.expect("analyzer resolves every identifier to a variable"),
            ExprKind::Grouping(inner) => self.lower_expr(inner),
            ExprKind::Unary(UnOp::Not, inner) => {
                let from = self.lower_expr(inner);
                let to = self.fresh_var(expr.ty.ty);
                self.out.push(Opcode::Not { to, from });
                to
            }
            ExprKind::Unary(UnOp::Negate, inner) => {
                let from = self.lower_expr(inner);
                let zero = self.emit_constant(ConstantLoad::Float(0.0), expr.ty.ty);
                let to = self.fresh_var(expr.ty.ty);
                self.out.push(Opcode::Binary {
                    op: BinaryOp::Sub,
                    result: to,
                    left: zero,
                    right: from,
                });
                to
            }
            ExprKind::Binary(op, left, right) if *op == BinOp::Assign => self.lower_assign(left, right),
            ExprKind::Binary(op, left, right) if op.is_compound_assign() => self.lower_compound_assign(*op, left, right),
            ExprKind::Binary(op, left, right) => {
                let l = self.lower_expr(left);
                let r = self.lower_expr(right);
                let result = self.fresh_var(expr.ty.ty);
                self.out.push(Opcode::Binary {
                    op: map_binop(*op),
                    result,
                    left: l,
                    right: r,
                });
                result
            }
            ExprKind::Member { .. } | ExprKind::Index { .. } => {
                let (base, access) = self.build_member_access(expr);
                let to = self.fresh_var(expr.ty.ty);
                self.out.push(Opcode::LoadMember { to, from: base, access });
                to
            }
            ExprKind::Call { args, .. } => {
                let lowered_args: Vec<VariableId> = args.iter().map(|a| self.lower_expr(a)).collect();
                let to = self.fresh_var(expr.ty.ty);
                let func = self.callee_name(expr);
                self.out.push(Opcode::Call {
                    to,
                    func,
                    args: lowered_args,
                });
                to
            }
        }
    }

    fn emit_constant(&mut self, value: ConstantLoad, ty: TypeId) -> VariableId {
        let to = self.fresh_var(ty);
        self.out.push(Opcode::LoadConstant { to, value });
        to
    }

    fn callee_name(&mut self, call_expr: &Expr) -> NameId {
        match call_expr.callee_kind {
            Some(CalleeKind::Function(id)) => self.functions.get(id).name,
            Some(CalleeKind::Intrinsic(intrinsic)) => self.pool.intern(intrinsic.name()),
            Some(CalleeKind::Constructor(type_id)) => self.types.get(type_id).name.unwrap_or(NO_NAME),
            None => unreachable!("analyzer resolves every call's callee"),
        }
    }

    fn lower_assign(&mut self, left: &Expr, right: &Expr) -> VariableId {
        let rv = self.lower_expr(right);
        match &left.kind {
            ExprKind::Identifier(_) | ExprKind::Grouping(_) => {
                let to = left.variable.expect("lvalue identifier resolves to a variable");
                self.out.push(Opcode::StoreVariable { to, from: rv });
            }
            ExprKind::Member { .. } | ExprKind::Index { .. } => {
                let (base, access) = self.build_member_access(left);
                self.out.push(Opcode::StoreMember { to: base, access, from: rv });
            }
            _ => unreachable!("parser only produces identifier/member/index lvalues"),
        }
        rv
    }

    fn lower_compound_assign(&mut self, op: BinOp, left: &Expr, right: &Expr) -> VariableId {
        let rv = self.lower_expr(right);
        let ir_op = map_binop(op);
        match &left.kind {
            ExprKind::Identifier(_) | ExprKind::Grouping(_) => {
                let to = left.variable.expect("lvalue identifier resolves to a variable");
                self.out.push(Opcode::CompoundStoreVariable { op: ir_op, to, from: rv });
                to
            }
            ExprKind::Member { .. } | ExprKind::Index { .. } => {
                let (base, access) = self.build_member_access(left);
                self.out.push(Opcode::CompoundStoreMember {
                    op: ir_op,
                    to: base,
                    access,
                    from: rv,
                });
                base
            }
            _ => unreachable!("parser only produces identifier/member/index lvalues"),
        }
    }

    /// Walks a possibly-nested `member`/`index` chain down to its root
    /// variable, combining every link's indices into one access chain
    /// (spec §4.6 "vector member lowering", applied uniformly to
    /// struct members too).
    fn build_member_access(&mut self, expr: &Expr) -> (VariableId, MemberAccess) {
        match &expr.kind {
            ExprKind::Member { target, .. } => {
                let (base, mut access) = self.build_member_access(target);
                for step in &expr.member_path {
                    access.indices.push(step.index);
                    access.is_array_index.push(step.is_array_index);
                }
                (base, access)
            }
            ExprKind::Index { target, index } => {
                let (base, mut access) = self.build_member_access(target);
                let literal = match &index.kind {
                    ExprKind::Number(n) => *n as u32,
                    _ => {
                        log::warn!("non-constant array index lowered as 0 (only literal indices are modeled)");
                        0
                    }
                };
                access.indices.push(literal);
                access.is_array_index.push(true);
                (base, access)
            }
            _ => {
                let base = self.lower_expr(expr);
                (
                    base,
                    MemberAccess {
                        parent_type: expr.ty.ty,
                        indices: Vec::new(),
                        is_array_index: Vec::new(),
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::functions::FunctionRegistry;
    use crate::globals::GlobalRegistry;
    use crate::ir::all_uses_defined;
    use crate::parser::parse;
    use crate::token::tokenize;

    fn lower_src(src: &str) -> (LoweredFunction, NamePool) {
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
        let (id, _) = functions.iter().next().unwrap();
        let f = functions.get(id);
        let params: Vec<(VariableId, TypeId)> = f.params.iter().map(|p| (p.var, p.ty.ty)).collect();
        let body = f.body.clone().unwrap();
        let lowered = lower_function(&body, &params, &mut pool, &types, &functions, &mut vargen);
        (lowered, pool)
    }

    #[test]
    fn member_load_produces_one_load_member_opcode() {
        let (lowered, _pool) = lower_src("struct S { x: float; } fn id(s: S) -> float { return s.x; }");
        let buffer = &lowered.opcodes;
        let load_members: Vec<&Opcode> = buffer.iter().filter(|o| matches!(o, Opcode::LoadMember { .. })).collect();
        assert_eq!(load_members.len(), 1);
        if let Opcode::LoadMember { access, .. } = load_members[0] {
            assert_eq!(access.indices, vec![0]);
            assert_eq!(access.is_array_index, vec![false]);
        }
        assert!(all_uses_defined(buffer));
    }

    #[test]
    fn swizzle_xyz_carries_three_indices() {
        let (lowered, _pool) = lower_src("fn f(v: float4) -> float3 { return v.xyz; }");
        let load = lowered
            .opcodes
            .iter()
            .find_map(|o| match o {
                Opcode::LoadMember { access, .. } => Some(access),
                _ => None,
            })
            .unwrap();
        assert_eq!(load.indices, vec![0, 1, 2]);
        assert!(all_uses_defined(&lowered.opcodes));
    }

    #[test]
    fn while_loop_has_single_block_wrap() {
        let (lowered, _pool) = lower_src("fn f() { mut i: int = 0; while (i < 10) { i = i + 1; } }");
        let kinds: Vec<&str> = lowered
            .opcodes
            .iter()
            .map(|o| match o {
                Opcode::WhileStart { .. } => "while_start",
                Opcode::WhileCondition { .. } => "while_condition",
                Opcode::BlockStart => "block_start",
                Opcode::BlockEnd => "block_end",
                Opcode::WhileEnd => "while_end",
                _ => "_",
            })
            .filter(|k| *k != "_")
            .collect();
        assert_eq!(
            kinds,
            vec!["while_start", "while_condition", "block_start", "block_end", "while_end"]
        );
        assert!(all_uses_defined(&lowered.opcodes));
    }

    #[test]
    fn parameter_gets_a_defining_var_opcode_and_recorded_type() {
        let (lowered, _pool) = lower_src("fn f(x: float) -> float { return x; }");
        assert!(matches!(lowered.opcodes[0], Opcode::Var { .. }));
        assert_eq!(lowered.variable_types.len() >= 1, true);
        assert!(all_uses_defined(&lowered.opcodes));
    }

    #[test]
    fn assignment_expression_yields_the_stored_value() {
        let (lowered, _pool) = lower_src("fn f() { mut i: int = 0; i = i; }");
        assert!(lowered.opcodes.iter().any(|o| matches!(o, Opcode::StoreVariable { .. })));
        assert!(all_uses_defined(&lowered.opcodes));
    }
}
