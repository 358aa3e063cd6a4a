//! The shared C-style opcode writer (spec §4.5): turns one opcode at
//! a time into an indented line of target-source text. HLSL, MSL,
//! GLSL, WGSL, and the portable-C backend each call this with their
//! own type-name mapping and wrap the result in a stage prologue.
//!
//! The spec frames this as a pure function of (opcode, type-name
//! callback, output buffer, indent counter); reconstructing `if`'s
//! optional `else` from a flat opcode stream needs one bit of lookback
//! state, so this is a small struct rather than a free function — the
//! output shape and line-per-opcode contract are unchanged.

use crate::ir::{BinaryOp, ConstantLoad, MemberAccess, Opcode};
use crate::names::NamePool;
use crate::types::{TypeId, TypeRegistry};
use crate::variable::VariableId;
use fxhash::FxHashMap;
use std::fmt::Write as _;

#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    IfThen,
    IfElse,
    While,
    Plain,
}

pub struct CstyleWriter<'a> {
    pool: &'a NamePool,
    types: &'a TypeRegistry,
    variable_types: &'a FxHashMap<VariableId, TypeId>,
    type_name: &'a dyn Fn(TypeId) -> String,
    indent: usize,
    block_stack: Vec<BlockKind>,
    next_block_kind: Option<BlockKind>,
    awaiting_else: bool,
}

fn var_name(v: VariableId) -> String {
    format!("_{}", v.0)
}

fn component_letter(index: u32) -> char {
    match index {
        0 => 'x',
        1 => 'y',
        2 => 'z',
        3 => 'w',
        _ => unreachable!("vector components are 0..=3"),
    }
}

/// Formats an f64 as a C-style float literal, keeping a decimal point
/// even for integral values (`0` -> `0.0`) so every backend's float
/// literals read unambiguously as floating point.
pub fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Equals => "==",
        BinaryOp::NotEquals => "!=",
        BinaryOp::Less => "<",
        BinaryOp::LessEqual => "<=",
        BinaryOp::Greater => ">",
        BinaryOp::GreaterEqual => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

impl<'a> CstyleWriter<'a> {
    pub fn new(
        pool: &'a NamePool,
        types: &'a TypeRegistry,
        variable_types: &'a FxHashMap<VariableId, TypeId>,
        type_name: &'a dyn Fn(TypeId) -> String,
        starting_indent: usize,
    ) -> Self {
        CstyleWriter {
            pool,
            types,
            variable_types,
            type_name,
            indent: starting_indent,
            block_stack: Vec::new(),
            next_block_kind: None,
            awaiting_else: false,
        }
    }

    fn var_ty(&self, v: VariableId) -> TypeId {
        self.variable_types
            .get(&v)
            .copied()
            .unwrap_or(crate::types::builtin::void)
    }

    fn pad(&self, out: &mut String) {
        for _ in 0..self.indent {
            out.push_str("    ");
        }
    }

    /// Resolves one access chain to `.member`/`[index]` text. A vector
    /// parent type with only non-array indices is a single swizzle
    /// (spec §4.6); anything else is walked step by step as ordinary
    /// struct-member/array-index links. Chains that swizzle and then
    /// continue into a further struct member are not produced by the
    /// current emitter and are not modeled here.
    fn format_access(&self, access: &MemberAccess) -> String {
        if self.types.is_vector(access.parent_type) && access.is_array_index.iter().all(|b| !b) {
            let letters: String = access.indices.iter().map(|&i| component_letter(i)).collect();
            return format!(".{}", letters);
        }
        let mut out = String::new();
        let mut current = access.parent_type;
        for (&index, &is_array) in access.indices.iter().zip(access.is_array_index.iter()) {
            if is_array {
                write!(out, "[{}]", index).unwrap();
            } else {
                let member = &self.types.get(current).members[index as usize];
                write!(out, ".{}", self.pool.get(member.name)).unwrap();
                current = member.ty.ty;
            }
        }
        out
    }

    fn format_args(&self, args: &[VariableId]) -> String {
        args.iter().map(|&a| var_name(a)).collect::<Vec<_>>().join(", ")
    }

    pub fn write(&mut self, op: &Opcode, out: &mut String) {
        if self.awaiting_else {
            self.awaiting_else = false;
            if matches!(op, Opcode::BlockStart) {
                self.pad(out);
                out.push_str("else\n");
                self.next_block_kind = Some(BlockKind::IfElse);
            }
        }

        match op {
            Opcode::Var { var } => {
                self.pad(out);
                writeln!(out, "{} {};", (self.type_name)(self.var_ty(*var)), var_name(*var)).unwrap();
            }
            Opcode::LoadConstant { to, value } => {
                self.pad(out);
                let literal = match value {
                    ConstantLoad::Float(v) => format_float(*v),
                    ConstantLoad::Int(v) => v.to_string(),
                    ConstantLoad::Bool(b) => b.to_string(),
                };
                writeln!(out, "{} {} = {};", (self.type_name)(self.var_ty(*to)), var_name(*to), literal).unwrap();
            }
            Opcode::LoadMember { to, from, access } => {
                self.pad(out);
                writeln!(
                    out,
                    "{} {} = {}{};",
                    (self.type_name)(self.var_ty(*to)),
                    var_name(*to),
                    var_name(*from),
                    self.format_access(access)
                )
                .unwrap();
            }
            Opcode::StoreVariable { to, from } => {
                self.pad(out);
                writeln!(out, "{} = {};", var_name(*to), var_name(*from)).unwrap();
            }
            Opcode::StoreMember { to, access, from } => {
                self.pad(out);
                writeln!(out, "{}{} = {};", var_name(*to), self.format_access(access), var_name(*from)).unwrap();
            }
            Opcode::CompoundStoreVariable { op, to, from } => {
                self.pad(out);
                writeln!(out, "{} {}= {};", var_name(*to), binary_op_text(*op), var_name(*from)).unwrap();
            }
            Opcode::CompoundStoreMember { op, to, access, from } => {
                self.pad(out);
                writeln!(
                    out,
                    "{}{} {}= {};",
                    var_name(*to),
                    self.format_access(access),
                    binary_op_text(*op),
                    var_name(*from)
                )
                .unwrap();
            }
            Opcode::Not { to, from } => {
                self.pad(out);
                writeln!(out, "{} {} = !{};", (self.type_name)(self.var_ty(*to)), var_name(*to), var_name(*from)).unwrap();
            }
            Opcode::Binary { op, result, left, right } => {
                self.pad(out);
                writeln!(
                    out,
                    "{} {} = {} {} {};",
                    (self.type_name)(self.var_ty(*result)),
                    var_name(*result),
                    var_name(*left),
                    binary_op_text(*op),
                    var_name(*right)
                )
                .unwrap();
            }
            Opcode::Call { to, func, args } => {
                self.pad(out);
                writeln!(
                    out,
                    "{} {} = {}({});",
                    (self.type_name)(self.var_ty(*to)),
                    var_name(*to),
                    self.pool.get(*func),
                    self.format_args(args)
                )
                .unwrap();
            }
            Opcode::Return { value } => {
                self.pad(out);
                match value {
                    Some(v) => writeln!(out, "return {};", var_name(*v)).unwrap(),
                    None => writeln!(out, "return;").unwrap(),
                }
            }
            Opcode::If { condition, .. } => {
                self.pad(out);
                writeln!(out, "if ({})", var_name(*condition)).unwrap();
                self.next_block_kind = Some(BlockKind::IfThen);
            }
            Opcode::WhileStart { .. } => {
                self.pad(out);
                writeln!(out, "while (true)").unwrap();
                self.next_block_kind = Some(BlockKind::While);
            }
            Opcode::WhileCondition { condition } => {
                self.pad(out);
                writeln!(out, "if (!{}) break;", var_name(*condition)).unwrap();
            }
            Opcode::WhileEnd => {}
            Opcode::BlockStart => {
                self.pad(out);
                out.push_str("{\n");
                self.indent += 1;
                let kind = self.next_block_kind.take().unwrap_or(BlockKind::Plain);
                self.block_stack.push(kind);
            }
            Opcode::BlockEnd => {
                self.indent = self.indent.saturating_sub(1);
                self.pad(out);
                out.push_str("}\n");
                let kind = self.block_stack.pop().unwrap_or(BlockKind::Plain);
                self.awaiting_else = kind == BlockKind::IfThen;
            }
        }
    }

    pub fn write_all(&mut self, ops: &[Opcode], out: &mut String) {
        for op in ops {
            self.write(op, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::LabelId;
    use crate::types::builtin;
    use crate::variable::VariableIdGen;

    #[test]
    fn if_with_else_prints_else_keyword_between_blocks() {
        let mut pool = NamePool::new();
        let types = TypeRegistry::new(&mut pool);
        let mut vargen = VariableIdGen::new();
        let cond = vargen.fresh();
        let mut variable_types = FxHashMap::default();
        variable_types.insert(cond, builtin::bool_);
        let ops = vec![
            Opcode::If {
                condition: cond,
                start: LabelId(1),
                else_label: LabelId(2),
                end: LabelId(3),
            },
            Opcode::BlockStart,
            Opcode::BlockEnd,
            Opcode::BlockStart,
            Opcode::BlockEnd,
        ];
        let type_name = |_: TypeId| "float".to_string();
        let mut writer = CstyleWriter::new(&pool, &types, &variable_types, &type_name, 0);
        let mut out = String::new();
        writer.write_all(&ops, &mut out);
        assert!(out.contains("if ("));
        assert!(out.contains("else\n"));
    }

    #[test]
    fn while_loop_prints_break_on_false_condition() {
        let mut pool = NamePool::new();
        let types = TypeRegistry::new(&mut pool);
        let mut vargen = VariableIdGen::new();
        let cond = vargen.fresh();
        let mut variable_types = FxHashMap::default();
        variable_types.insert(cond, builtin::bool_);
        let ops = vec![
            Opcode::WhileStart {
                start: LabelId(1),
                continue_label: LabelId(2),
                end: LabelId(3),
            },
            Opcode::WhileCondition { condition: cond },
            Opcode::BlockStart,
            Opcode::BlockEnd,
            Opcode::WhileEnd,
        ];
        let type_name = |_: TypeId| "float".to_string();
        let mut writer = CstyleWriter::new(&pool, &types, &variable_types, &type_name, 0);
        let mut out = String::new();
        writer.write_all(&ops, &mut out);
        assert!(out.contains("while (true)"));
        assert!(out.contains("if (!"));
        assert!(out.contains("break;"));
    }

    #[test]
    fn swizzle_access_prints_one_dotted_group() {
        let mut pool = NamePool::new();
        let types = TypeRegistry::new(&mut pool);
        let mut vargen = VariableIdGen::new();
        let from = vargen.fresh();
        let to = vargen.fresh();
        let mut variable_types = FxHashMap::default();
        variable_types.insert(from, builtin::float4);
        variable_types.insert(to, builtin::float3);
        let access = MemberAccess {
            parent_type: builtin::float4,
            indices: vec![0, 1, 2],
            is_array_index: vec![false, false, false],
        };
        let ops = vec![Opcode::LoadMember { to, from, access }];
        let type_name = |t: TypeId| if t == builtin::float3 { "float3".to_string() } else { "float4".to_string() };
        let mut writer = CstyleWriter::new(&pool, &types, &variable_types, &type_name, 0);
        let mut out = String::new();
        writer.write_all(&ops, &mut out);
        assert!(out.contains(".xyz"));
        assert!(!out.contains(".x.y.z"));
    }
}
