//! The linear, variable-SSA-style opcode stream lowered from one
//! function body. Spec §9 recommends modeling this as a plain enum
//! stored in an indexed `Vec` rather than reproducing the distilled
//! source's length-prefixed byte buffer — the byte-buffer trick is
//! reserved for the SPIR-V binary encoder itself (`backend::spirv`),
//! which has an external bit-exact format to match.

use crate::names::NameId;
use crate::types::TypeId;
use crate::variable::VariableId;

/// A label id pre-allocated for a structured control-flow construct's
/// `start`/`else`/`continue`/`end` targets (spec §4.4, §4.6).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LabelId(pub u32);

#[derive(Clone, Copy, Debug)]
pub enum ConstantLoad {
    Float(f64),
    Int(i64),
    Bool(bool),
}

/// An access chain: struct-member ordinals and array-index literals,
/// with a parallel flag telling which is which (spec §3).
#[derive(Clone, Debug, Default)]
pub struct MemberAccess {
    pub parent_type: TypeId,
    pub indices: Vec<u32>,
    pub is_array_index: Vec<bool>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Not part of the distilled opcode list (spec §3 calls it
    /// "exhaustive" without a modulo opcode) but required because the
    /// grammar accepts `%` (spec §4.2); added as the same superset
    /// resolution spec §9 Open Question (a) calls for elsewhere, and
    /// noted in DESIGN.md.
    Mod,
    Equals,
    NotEquals,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

#[derive(Clone, Debug)]
pub enum Opcode {
    /// Declares a fresh variable slot of a given type.
    Var { var: VariableId },
    LoadConstant { to: VariableId, value: ConstantLoad },
    LoadMember { to: VariableId, from: VariableId, access: MemberAccess },
    StoreVariable { to: VariableId, from: VariableId },
    StoreMember { to: VariableId, access: MemberAccess, from: VariableId },
    /// `ADD/SUB/MUL/DIV/MOD _AND_STORE_VARIABLE`.
    CompoundStoreVariable { op: BinaryOp, to: VariableId, from: VariableId },
    /// `ADD/SUB/MUL/DIV/MOD _AND_STORE_MEMBER`.
    CompoundStoreMember { op: BinaryOp, to: VariableId, access: MemberAccess, from: VariableId },
    Not { to: VariableId, from: VariableId },
    Binary { op: BinaryOp, result: VariableId, left: VariableId, right: VariableId },
    Call { to: VariableId, func: NameId, args: Vec<VariableId> },
    Return { value: Option<VariableId> },
    If { condition: VariableId, start: LabelId, else_label: LabelId, end: LabelId },
    WhileStart { start: LabelId, continue_label: LabelId, end: LabelId },
    WhileCondition { condition: VariableId },
    WhileEnd,
    BlockStart,
    BlockEnd,
}

/// A function's lowered body: a flat sequence of opcodes.
pub type OpcodeBuffer = Vec<Opcode>;

/// Checks the spec §8 quantified invariant "every `variable` index
/// appearing on the RHS of an opcode has a prior defining opcode in
/// the same buffer". Used by tests, not by the compiler itself (the
/// emitter is constructed so this always holds).
pub fn all_uses_defined(buffer: &OpcodeBuffer) -> bool {
    use std::collections::HashSet;
    let mut defined: HashSet<VariableId> = HashSet::new();
    let mut uses_ok = true;

    let mut check_use = |v: VariableId, defined: &HashSet<VariableId>| {
        if !defined.contains(&v) {
            uses_ok = false;
        }
    };

    for op in buffer {
        match op {
            Opcode::Var { var } => {
                defined.insert(*var);
            }
            Opcode::LoadConstant { to, .. } => {
                defined.insert(*to);
            }
            Opcode::LoadMember { to, from, .. } => {
                check_use(*from, &defined);
                defined.insert(*to);
            }
            Opcode::StoreVariable { to, from } => {
                check_use(*from, &defined);
                check_use(*to, &defined);
            }
            Opcode::StoreMember { to, from, .. } => {
                check_use(*from, &defined);
                check_use(*to, &defined);
            }
            Opcode::CompoundStoreVariable { to, from, .. } => {
                check_use(*from, &defined);
                check_use(*to, &defined);
            }
            Opcode::CompoundStoreMember { to, from, .. } => {
                check_use(*from, &defined);
                check_use(*to, &defined);
            }
            Opcode::Not { to, from } => {
                check_use(*from, &defined);
                defined.insert(*to);
            }
            Opcode::Binary { result, left, right, .. } => {
                check_use(*left, &defined);
                check_use(*right, &defined);
                defined.insert(*result);
            }
            Opcode::Call { to, args, .. } => {
                for a in args {
                    check_use(*a, &defined);
                }
                defined.insert(*to);
            }
            Opcode::Return { value } => {
                if let Some(v) = value {
                    check_use(*v, &defined);
                }
            }
            Opcode::If { condition, .. } => {
                check_use(*condition, &defined);
            }
            Opcode::WhileCondition { condition } => {
                check_use(*condition, &defined);
            }
            Opcode::WhileStart { .. }
            | Opcode::WhileEnd
            | Opcode::BlockStart
            | Opcode::BlockEnd => {}
        }
    }
    uses_ok
}
