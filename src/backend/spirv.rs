//! SPIR-V backend (spec §4.6): assembles one entry point into a
//! well-formed binary module. Word values and the instruction-encoding
//! scheme (`(word_count << 16) | opcode`, little-endian string packing
//! NUL-padded to a 4-byte boundary) match the distilled original's
//! `backends/spirv.c`; opcodes it doesn't name are taken from the
//! public SPIR-V specification.

use crate::backend::{entry_point_resources, RegisterAssignment, Stage, Target};
use crate::compiler::Module;
use crate::error::{CompileError, CompileResult, LowerError};
use crate::functions::FunctionId;
use crate::ir::{BinaryOp, ConstantLoad, MemberAccess, Opcode};
use crate::span::SourceSpan;
use crate::types::{builtin, TypeId};
use crate::variable::VariableId;
use fxhash::FxHashMap;

pub const MAGIC: u32 = 0x0723_0203;
pub const VERSION: u32 = 0x0001_0000;
pub const GENERATOR_MAGIC: u32 = 44;

#[allow(non_upper_case_globals, dead_code)]
pub mod op {
    pub const OpExtInstImport: u32 = 11;
    pub const OpMemoryModel: u32 = 14;
    pub const OpEntryPoint: u32 = 15;
    pub const OpExecutionMode: u32 = 16;
    pub const OpCapability: u32 = 17;
    pub const OpTypeVoid: u32 = 19;
    pub const OpTypeBool: u32 = 20;
    pub const OpTypeInt: u32 = 21;
    pub const OpTypeFloat: u32 = 22;
    pub const OpTypeVector: u32 = 23;
    pub const OpTypeMatrix: u32 = 24;
    pub const OpTypeStruct: u32 = 30;
    pub const OpTypePointer: u32 = 32;
    pub const OpTypeFunction: u32 = 33;
    pub const OpConstantTrue: u32 = 41;
    pub const OpConstantFalse: u32 = 42;
    pub const OpConstant: u32 = 43;
    pub const OpFunction: u32 = 54;
    pub const OpFunctionCall: u32 = 57;
    pub const OpFunctionEnd: u32 = 56;
    pub const OpVariable: u32 = 59;
    pub const OpLoad: u32 = 61;
    pub const OpStore: u32 = 62;
    pub const OpAccessChain: u32 = 65;
    pub const OpDecorate: u32 = 71;
    pub const OpMemberDecorate: u32 = 72;
    pub const OpVectorShuffle: u32 = 79;
    pub const OpCompositeConstruct: u32 = 80;
    pub const OpCompositeExtract: u32 = 81;
    pub const OpIAdd: u32 = 128;
    pub const OpFAdd: u32 = 129;
    pub const OpISub: u32 = 130;
    pub const OpFSub: u32 = 131;
    pub const OpIMul: u32 = 132;
    pub const OpFMul: u32 = 133;
    pub const OpUDiv: u32 = 134;
    pub const OpSDiv: u32 = 135;
    pub const OpFDiv: u32 = 136;
    pub const OpUMod: u32 = 137;
    pub const OpSMod: u32 = 139;
    pub const OpFMod: u32 = 141;
    pub const OpLogicalEqual: u32 = 164;
    pub const OpLogicalNotEqual: u32 = 165;
    pub const OpLogicalOr: u32 = 166;
    pub const OpLogicalAnd: u32 = 167;
    pub const OpLogicalNot: u32 = 168;
    pub const OpIEqual: u32 = 170;
    pub const OpINotEqual: u32 = 171;
    pub const OpSGreaterThan: u32 = 173;
    pub const OpSGreaterThanEqual: u32 = 175;
    pub const OpSLessThan: u32 = 177;
    pub const OpSLessThanEqual: u32 = 179;
    pub const OpFOrdEqual: u32 = 180;
    pub const OpFOrdNotEqual: u32 = 182;
    pub const OpFOrdLessThan: u32 = 184;
    pub const OpFOrdGreaterThan: u32 = 186;
    pub const OpFOrdLessThanEqual: u32 = 188;
    pub const OpFOrdGreaterThanEqual: u32 = 190;
    pub const OpLoopMerge: u32 = 246;
    pub const OpSelectionMerge: u32 = 247;
    pub const OpLabel: u32 = 248;
    pub const OpBranch: u32 = 249;
    pub const OpBranchConditional: u32 = 250;
    pub const OpReturn: u32 = 253;
    pub const OpReturnValue: u32 = 254;
}

const CAPABILITY_SHADER: u32 = 1;
const ADDRESSING_MODEL_LOGICAL: u32 = 0;
const MEMORY_MODEL_GLSL450: u32 = 1;
const EXECUTION_MODEL_VERTEX: u32 = 0;
const EXECUTION_MODEL_FRAGMENT: u32 = 4;
const EXECUTION_MODE_ORIGIN_UPPER_LEFT: u32 = 7;
const STORAGE_CLASS_UNIFORM_CONSTANT: u32 = 0;
const STORAGE_CLASS_INPUT: u32 = 1;
const STORAGE_CLASS_UNIFORM: u32 = 2;
const STORAGE_CLASS_OUTPUT: u32 = 3;
const STORAGE_CLASS_FUNCTION: u32 = 7;
const DECORATION_BINDING: u32 = 33;
const DECORATION_DESCRIPTOR_SET: u32 = 34;
const DECORATION_LOCATION: u32 = 30;
/// The fixed entry-point name every SPIR-V module emitted by this
/// backend uses; the kong function's own name only appears as a
/// debug/organizational detail in the text backends.
const ENTRY_POINT_NAME: &str = "main";

fn encode_instruction(opcode: u32, operands: &[u32]) -> Vec<u32> {
    let word_count = (operands.len() + 1) as u32;
    let mut words = Vec::with_capacity(operands.len() + 1);
    words.push((word_count << 16) | opcode);
    words.extend_from_slice(operands);
    words
}

/// Packs a UTF-8 string into little-endian words, NUL-terminated and
/// padded to a 4-byte boundary (spec §4.6).
fn encode_string(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn unimplemented(opcode: &str) -> CompileError {
    CompileError::Lower {
        span: SourceSpan::default(),
        source: LowerError::UnimplementedOpcode {
            opcode: opcode.to_string(),
            backend: "spirv".to_string(),
        },
    }
}

/// Finds the `BlockEnd` matching the `BlockStart` at `ops[start]`,
/// depth-counting through any nested blocks in between.
fn matching_block_end(ops: &[Opcode], start: usize) -> usize {
    let mut depth = 0i32;
    let mut i = start;
    loop {
        match &ops[i] {
            Opcode::BlockStart => depth += 1,
            Opcode::BlockEnd => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
        i += 1;
    }
}

struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    fn new() -> Self {
        IdAllocator { next: 1 }
    }
    fn fresh(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Assembles a module's four logical streams and deduplicates
/// type/constant/pointer declarations as they're requested (spec
/// §4.6 "id allocation").
struct Builder<'m> {
    module: &'m Module,
    ids: IdAllocator,
    decorations: Vec<u32>,
    types_constants: Vec<u32>,
    instructions: Vec<u32>,
    type_ids: FxHashMap<TypeId, u32>,
    pointer_ids: FxHashMap<(TypeId, u32), u32>,
    float_consts: FxHashMap<u64, u32>,
    int_consts: FxHashMap<i64, u32>,
    bool_consts: FxHashMap<bool, u32>,
    var_ids: FxHashMap<VariableId, u32>,
    glsl_ext_import: u32,
    /// Set when the current basic block has already emitted a
    /// terminator (`OpReturn`/`OpBranch`/...), so the structured
    /// control-flow emitter knows not to fall through into another
    /// terminator for the same block.
    block_terminated: bool,
    /// The `Output`-storage-class variable a `Return` with a value
    /// stores into, if this function has a return type.
    output_var: Option<u32>,
    /// `(param variable, type, matching Input-storage-class variable)`,
    /// copied into the function's local parameter variables at entry.
    input_vars: Vec<(VariableId, TypeId, u32)>,
}

impl<'m> Builder<'m> {
    fn new(module: &'m Module) -> Self {
        let mut ids = IdAllocator::new();
        let glsl_ext_import = ids.fresh();
        Builder {
            module,
            ids,
            decorations: Vec::new(),
            types_constants: Vec::new(),
            instructions: Vec::new(),
            type_ids: FxHashMap::default(),
            pointer_ids: FxHashMap::default(),
            float_consts: FxHashMap::default(),
            int_consts: FxHashMap::default(),
            bool_consts: FxHashMap::default(),
            var_ids: FxHashMap::default(),
            glsl_ext_import,
            block_terminated: false,
            output_var: None,
            input_vars: Vec::new(),
        }
    }

    fn type_id(&mut self, ty: TypeId) -> u32 {
        if let Some(&id) = self.type_ids.get(&ty) {
            return id;
        }
        let id = self.ids.fresh();
        self.type_ids.insert(ty, id);
        let ty_rec = self.module.types.get(ty);
        let instr = match ty {
            builtin::void => encode_instruction(op::OpTypeVoid, &[id]),
            builtin::bool_ => encode_instruction(op::OpTypeBool, &[id]),
            builtin::float => encode_instruction(op::OpTypeFloat, &[id, 32]),
            builtin::int => encode_instruction(op::OpTypeInt, &[id, 32, 1]),
            builtin::uint => encode_instruction(op::OpTypeInt, &[id, 32, 0]),
            builtin::float2 | builtin::float3 | builtin::float4 => {
                let comp = self.type_id(builtin::float);
                let count = self.module.types.vector_component_count(ty).unwrap();
                encode_instruction(op::OpTypeVector, &[id, comp, count])
            }
            builtin::int2 | builtin::int3 | builtin::int4 => {
                let comp = self.type_id(builtin::int);
                let count = self.module.types.vector_component_count(ty).unwrap();
                encode_instruction(op::OpTypeVector, &[id, comp, count])
            }
            builtin::uint2 | builtin::uint3 | builtin::uint4 => {
                let comp = self.type_id(builtin::uint);
                let count = self.module.types.vector_component_count(ty).unwrap();
                encode_instruction(op::OpTypeVector, &[id, comp, count])
            }
            builtin::float3x3 => {
                let col = self.type_id(builtin::float3);
                encode_instruction(op::OpTypeMatrix, &[id, col, 3])
            }
            builtin::float4x4 => {
                let col = self.type_id(builtin::float4);
                encode_instruction(op::OpTypeMatrix, &[id, col, 4])
            }
            _ => {
                let member_ids: Vec<u32> = ty_rec.members.iter().map(|m| m.ty.ty).collect::<Vec<_>>().iter().map(|&t| self.type_id(t)).collect();
                let mut operands = vec![id];
                operands.extend(member_ids);
                encode_instruction(op::OpTypeStruct, &operands)
            }
        };
        self.types_constants.extend(instr);
        id
    }

    fn pointer_type_id(&mut self, pointee: TypeId, storage_class: u32) -> u32 {
        if let Some(&id) = self.pointer_ids.get(&(pointee, storage_class)) {
            return id;
        }
        let pointee_id = self.type_id(pointee);
        let id = self.ids.fresh();
        self.pointer_ids.insert((pointee, storage_class), id);
        let instr = encode_instruction(op::OpTypePointer, &[id, storage_class, pointee_id]);
        self.types_constants.extend(instr);
        id
    }

    fn float_const(&mut self, v: f64) -> u32 {
        let bits = (v as f32).to_bits() as u64;
        if let Some(&id) = self.float_consts.get(&bits) {
            return id;
        }
        let ty = self.type_id(builtin::float);
        let id = self.ids.fresh();
        self.float_consts.insert(bits, id);
        self.types_constants.extend(encode_instruction(op::OpConstant, &[ty, id, bits as u32]));
        id
    }

    fn int_const(&mut self, v: i64) -> u32 {
        if let Some(&id) = self.int_consts.get(&v) {
            return id;
        }
        let ty = self.type_id(builtin::int);
        let id = self.ids.fresh();
        self.int_consts.insert(v, id);
        self.types_constants.extend(encode_instruction(op::OpConstant, &[ty, id, v as i32 as u32]));
        id
    }

    fn bool_const(&mut self, v: bool) -> u32 {
        if let Some(&id) = self.bool_consts.get(&v) {
            return id;
        }
        let ty = self.type_id(builtin::bool_);
        let id = self.ids.fresh();
        self.bool_consts.insert(v, id);
        let opcode = if v { op::OpConstantTrue } else { op::OpConstantFalse };
        self.types_constants.extend(encode_instruction(opcode, &[ty, id]));
        id
    }

    fn var_id(&mut self, v: VariableId) -> u32 {
        if let Some(&id) = self.var_ids.get(&v) {
            return id;
        }
        let id = self.ids.fresh();
        self.var_ids.insert(v, id);
        id
    }

    fn var_ty(&self, v: VariableId) -> TypeId {
        self.module.variable_types.get(&v).copied().unwrap_or(builtin::void)
    }

    /// Declares a module-scope (non-`Function`-storage) `OpVariable`,
    /// used for entry-point interface and resource-binding globals.
    fn declare_global_variable(&mut self, pointee: TypeId, storage_class: u32) -> u32 {
        let ptr_ty = self.pointer_type_id(pointee, storage_class);
        let id = self.ids.fresh();
        self.types_constants.extend(encode_instruction(op::OpVariable, &[ptr_ty, id, storage_class]));
        id
    }

    fn decorate(&mut self, id: u32, decoration: u32, extra: &[u32]) {
        let mut operands = vec![id, decoration];
        operands.extend_from_slice(extra);
        self.decorations.extend(encode_instruction(op::OpDecorate, &operands));
    }

    fn binary_opcode(&self, op: BinaryOp, ty: TypeId) -> u32 {
        let is_float = matches!(ty, builtin::float | builtin::float2 | builtin::float3 | builtin::float4);
        match (op, is_float) {
            (BinaryOp::Add, true) => op::OpFAdd,
            (BinaryOp::Add, false) => op::OpIAdd,
            (BinaryOp::Sub, true) => op::OpFSub,
            (BinaryOp::Sub, false) => op::OpISub,
            (BinaryOp::Mul, true) => op::OpFMul,
            (BinaryOp::Mul, false) => op::OpIMul,
            (BinaryOp::Div, true) => op::OpFDiv,
            (BinaryOp::Div, false) => op::OpSDiv,
            (BinaryOp::Mod, true) => op::OpFMod,
            (BinaryOp::Mod, false) => op::OpSMod,
            (BinaryOp::Equals, true) => op::OpFOrdEqual,
            (BinaryOp::Equals, false) => op::OpIEqual,
            (BinaryOp::NotEquals, true) => op::OpFOrdNotEqual,
            (BinaryOp::NotEquals, false) => op::OpINotEqual,
            (BinaryOp::Less, true) => op::OpFOrdLessThan,
            (BinaryOp::Less, false) => op::OpSLessThan,
            (BinaryOp::LessEqual, true) => op::OpFOrdLessThanEqual,
            (BinaryOp::LessEqual, false) => op::OpSLessThanEqual,
            (BinaryOp::Greater, true) => op::OpFOrdGreaterThan,
            (BinaryOp::Greater, false) => op::OpSGreaterThan,
            (BinaryOp::GreaterEqual, true) => op::OpFOrdGreaterThanEqual,
            (BinaryOp::GreaterEqual, false) => op::OpSGreaterThanEqual,
            (BinaryOp::And, _) => op::OpLogicalAnd,
            (BinaryOp::Or, _) => op::OpLogicalOr,
        }
    }

    /// Lowers an access chain to either a single `OpAccessChain` +
    /// `OpLoad` (ordinary struct member) or an `OpCompositeExtract`
    /// / `OpVectorShuffle` (vector swizzle), matching spec §4.6
    /// "vector member lowering". `result_ty` is the already-recorded
    /// type of the value produced (the lowering pass's variable-type
    /// side table is authoritative, same as the C-style writer uses).
    fn load_access(&mut self, to: u32, result_ty: TypeId, from: VariableId, access: &MemberAccess) {
        let from_id = *self.var_ids.get(&from).expect("base variable already emitted");
        let result_ty_id = self.type_id(result_ty);
        if self.module.types.is_vector(access.parent_type) && access.is_array_index.iter().all(|b| !b) {
            let base_val_id = self.ids.fresh();
            self.instructions.extend(encode_instruction(op::OpLoad, &[self.type_id(access.parent_type), base_val_id, from_id]));
            if access.indices.len() == 1 {
                self.instructions
                    .extend(encode_instruction(op::OpCompositeExtract, &[result_ty_id, to, base_val_id, access.indices[0]]));
            } else {
                let mut operands = vec![result_ty_id, to, base_val_id, base_val_id];
                operands.extend(access.indices.iter().copied());
                self.instructions.extend(encode_instruction(op::OpVectorShuffle, &operands));
            }
            return;
        }
        let ptr_ty_id = self.pointer_type_id(result_ty, STORAGE_CLASS_FUNCTION);
        let index_ids: Vec<u32> = access.indices.iter().map(|&i| self.int_const(i as i64)).collect();
        let chain_id = self.ids.fresh();
        let mut operands = vec![ptr_ty_id, chain_id, from_id];
        operands.extend(index_ids);
        self.instructions.extend(encode_instruction(op::OpAccessChain, &operands));
        self.instructions.extend(encode_instruction(op::OpLoad, &[result_ty_id, to, chain_id]));
    }

    fn emit_function_body(&mut self, id: FunctionId) -> CompileResult<u32> {
        let f = self.module.functions.get(id);
        let void_ty = self.type_id(builtin::void);
        let fn_ty_id = self.ids.fresh();
        self.types_constants.extend(encode_instruction(op::OpTypeFunction, &[fn_ty_id, void_ty]));
        let fn_id = self.ids.fresh();
        self.instructions.extend(encode_instruction(op::OpFunction, &[void_ty, fn_id, 0, fn_ty_id]));
        let entry_label = self.ids.fresh();
        self.instructions.extend(encode_instruction(op::OpLabel, &[entry_label]));

        for &p in f.params.iter().map(|p| &p.var) {
            let id = self.var_id(p);
            let ty = self.var_ty(p);
            let ptr_ty = self.pointer_type_id(ty, STORAGE_CLASS_FUNCTION);
            self.instructions.extend(encode_instruction(op::OpVariable, &[ptr_ty, id, STORAGE_CLASS_FUNCTION]));
        }
        for (var, ty, input_id) in self.input_vars.clone() {
            let func_var_id = *self.var_ids.get(&var).expect("parameter variable already declared");
            let ty_id = self.type_id(ty);
            let loaded = self.ids.fresh();
            self.instructions.extend(encode_instruction(op::OpLoad, &[ty_id, loaded, input_id]));
            self.instructions.extend(encode_instruction(op::OpStore, &[func_var_id, loaded]));
        }

        self.emit_ops(&f.opcodes)?;
        self.instructions.extend(encode_instruction(op::OpFunctionEnd, &[]));
        Ok(fn_id)
    }

    /// Walks a flat opcode slice, recursing into `If`/`WhileStart`
    /// bodies to backpatch their merge/else/continue `OpLabel`s at
    /// the point their matching `BlockEnd` falls (spec §4.6
    /// structured control flow).
    fn emit_ops(&mut self, ops: &[Opcode]) -> CompileResult<()> {
        let mut i = 0;
        while i < ops.len() {
            match &ops[i] {
                Opcode::If { condition, .. } => {
                    let cond_id = *self.var_ids.get(condition).expect("condition already produced");
                    let merge = self.ids.fresh();
                    let then_label = self.ids.fresh();

                    let then_end = matching_block_end(ops, i + 1);
                    let has_else = then_end + 1 < ops.len() && matches!(ops[then_end + 1], Opcode::BlockStart);
                    let else_label = if has_else { self.ids.fresh() } else { merge };

                    self.instructions.extend(encode_instruction(op::OpSelectionMerge, &[merge, 0]));
                    self.instructions
                        .extend(encode_instruction(op::OpBranchConditional, &[cond_id, then_label, else_label]));
                    self.instructions.extend(encode_instruction(op::OpLabel, &[then_label]));
                    self.block_terminated = false;
                    self.emit_ops(&ops[i + 2..then_end])?;
                    if !self.block_terminated {
                        self.instructions.extend(encode_instruction(op::OpBranch, &[merge]));
                    }

                    i = if has_else {
                        let else_end = matching_block_end(ops, then_end + 1);
                        self.instructions.extend(encode_instruction(op::OpLabel, &[else_label]));
                        self.block_terminated = false;
                        self.emit_ops(&ops[then_end + 2..else_end])?;
                        if !self.block_terminated {
                            self.instructions.extend(encode_instruction(op::OpBranch, &[merge]));
                        }
                        else_end + 1
                    } else {
                        then_end + 1
                    };

                    self.instructions.extend(encode_instruction(op::OpLabel, &[merge]));
                    self.block_terminated = false;
                }
                Opcode::WhileStart { .. } => {
                    let header = self.ids.fresh();
                    let merge = self.ids.fresh();
                    let continue_target = self.ids.fresh();
                    let cond_check = self.ids.fresh();

                    self.instructions.extend(encode_instruction(op::OpBranch, &[header]));
                    self.instructions.extend(encode_instruction(op::OpLabel, &[header]));
                    self.instructions.extend(encode_instruction(op::OpLoopMerge, &[merge, continue_target, 0]));
                    self.instructions.extend(encode_instruction(op::OpBranch, &[cond_check]));
                    self.instructions.extend(encode_instruction(op::OpLabel, &[cond_check]));
                    self.block_terminated = false;

                    let cond_pos = ops[i + 1..]
                        .iter()
                        .position(|o| matches!(o, Opcode::WhileCondition { .. }))
                        .expect("while_start is always followed by a while_condition")
                        + i
                        + 1;
                    self.emit_ops(&ops[i + 1..cond_pos])?;

                    let condition = match &ops[cond_pos] {
                        Opcode::WhileCondition { condition } => *condition,
                        _ => unreachable!(),
                    };
                    let cond_id = *self.var_ids.get(&condition).expect("loop condition already produced");
                    let body_label = self.ids.fresh();
                    self.instructions
                        .extend(encode_instruction(op::OpBranchConditional, &[cond_id, body_label, merge]));
                    self.instructions.extend(encode_instruction(op::OpLabel, &[body_label]));
                    self.block_terminated = false;

                    let body_end = matching_block_end(ops, cond_pos + 1);
                    self.emit_ops(&ops[cond_pos + 2..body_end])?;
                    if !self.block_terminated {
                        self.instructions.extend(encode_instruction(op::OpBranch, &[continue_target]));
                    }
                    self.instructions.extend(encode_instruction(op::OpLabel, &[continue_target]));
                    self.instructions.extend(encode_instruction(op::OpBranch, &[header]));
                    self.instructions.extend(encode_instruction(op::OpLabel, &[merge]));
                    self.block_terminated = false;

                    // body_end is the loop body's BlockEnd; body_end+1 is its WhileEnd.
                    i = body_end + 2;
                    continue;
                }
                Opcode::BlockStart => {
                    let end = matching_block_end(ops, i);
                    self.emit_ops(&ops[i + 1..end])?;
                    i = end + 1;
                    continue;
                }
                other => {
                    self.emit_opcode(other)?;
                }
            }
            i += 1;
        }
        Ok(())
    }

    fn emit_opcode(&mut self, op_code: &Opcode) -> CompileResult<()> {
        match op_code {
            Opcode::Var { var } => {
                let id = self.var_id(*var);
                let ty = self.var_ty(*var);
                let ptr_ty = self.pointer_type_id(ty, STORAGE_CLASS_FUNCTION);
                self.instructions.extend(encode_instruction(op::OpVariable, &[ptr_ty, id, STORAGE_CLASS_FUNCTION]));
            }
            Opcode::LoadConstant { to, value } => {
                // SPIR-V ids are already SSA values, so `to` is bound
                // directly to the (deduplicated) constant id rather
                // than allocating a fresh id and copying into it.
                let const_id = match value {
                    ConstantLoad::Float(v) => self.float_const(*v),
                    ConstantLoad::Int(v) => self.int_const(*v),
                    ConstantLoad::Bool(v) => self.bool_const(*v),
                };
                self.var_ids.insert(*to, const_id);
            }
            Opcode::LoadMember { to, from, access } => {
                let to_id = self.var_id(*to);
                let result_ty = self.var_ty(*to);
                self.load_access(to_id, result_ty, *from, access);
            }
            Opcode::StoreVariable { to, from } => {
                let to_id = *self.var_ids.get(to).expect("store target already declared");
                let from_id = *self.var_ids.get(from).expect("store source already produced");
                self.instructions.extend(encode_instruction(op::OpStore, &[to_id, from_id]));
            }
            Opcode::StoreMember { to, access, from } => {
                let to_id = *self.var_ids.get(to).expect("store target already declared");
                let from_id = *self.var_ids.get(from).expect("store source already produced");
                let result_ty = self.var_ty(*from);
                let ptr_ty_id = self.pointer_type_id(result_ty, STORAGE_CLASS_FUNCTION);
                let index_ids: Vec<u32> = access.indices.iter().map(|&i| self.int_const(i as i64)).collect();
                let chain_id = self.ids.fresh();
                let mut operands = vec![ptr_ty_id, chain_id, to_id];
                operands.extend(index_ids);
                self.instructions.extend(encode_instruction(op::OpAccessChain, &operands));
                self.instructions.extend(encode_instruction(op::OpStore, &[chain_id, from_id]));
            }
            Opcode::CompoundStoreVariable { op: bin, to, from } => {
                let to_id = *self.var_ids.get(to).expect("compound target already declared");
                let from_id = *self.var_ids.get(from).expect("compound source already produced");
                let ty = self.var_ty(*to);
                let ty_id = self.type_id(ty);
                let loaded = self.ids.fresh();
                self.instructions.extend(encode_instruction(op::OpLoad, &[ty_id, loaded, to_id]));
                let opcode = self.binary_opcode(*bin, ty);
                let result = self.ids.fresh();
                self.instructions.extend(encode_instruction(opcode, &[ty_id, result, loaded, from_id]));
                self.instructions.extend(encode_instruction(op::OpStore, &[to_id, result]));
            }
            Opcode::CompoundStoreMember { .. } => {
                return Err(unimplemented("compound_store_member"));
            }
            Opcode::Not { to, from } => {
                let to_id = self.var_id(*to);
                let from_id = *self.var_ids.get(from).expect("operand already produced");
                let ty_id = self.type_id(self.var_ty(*to));
                self.instructions.extend(encode_instruction(op::OpLogicalNot, &[ty_id, to_id, from_id]));
            }
            Opcode::Binary { op: bin, result, left, right } => {
                let result_id = self.var_id(*result);
                let left_id = *self.var_ids.get(left).expect("left operand already produced");
                let right_id = *self.var_ids.get(right).expect("right operand already produced");
                let ty = self.var_ty(*result);
                let ty_id = self.type_id(ty);
                let opcode = self.binary_opcode(*bin, ty);
                self.instructions.extend(encode_instruction(opcode, &[ty_id, result_id, left_id, right_id]));
            }
            Opcode::Call { .. } => {
                return Err(unimplemented("call"));
            }
            Opcode::Return { value } => {
                if let Some(v) = value {
                    let id = *self.var_ids.get(v).expect("return value already produced");
                    if let Some(out_id) = self.output_var {
                        self.instructions.extend(encode_instruction(op::OpStore, &[out_id, id]));
                    }
                }
                self.instructions.extend(encode_instruction(op::OpReturn, &[]));
                self.block_terminated = true;
            }
            Opcode::If { .. } | Opcode::WhileStart { .. } => {
                unreachable!("structured control-flow opcodes are dispatched by emit_ops, not emit_opcode")
            }
            Opcode::WhileCondition { .. } | Opcode::WhileEnd | Opcode::BlockStart | Opcode::BlockEnd => {}
        }
        Ok(())
    }
}

/// Assembles one function's SPIR-V module (header, decorations,
/// constants-and-types, instructions, concatenated in that order) and
/// returns the little-endian byte encoding. Declares the entry
/// point's `Input`/`Output` interface variables (one per parameter,
/// one for the return value, `Location`-decorated by declaration
/// order) and the `UniformConstant`/`Uniform` variables for the
/// globals the function's descriptor-set group references,
/// `DescriptorSet`/`Binding`-decorated per [`assign_registers`]
/// (spec §4.6, §4 expansion).
///
/// [`assign_registers`]: crate::backend::assign_registers
pub fn emit_module(module: &Module, id: FunctionId, stage: Stage) -> CompileResult<Vec<u8>> {
    let mut builder = Builder::new(module);
    let glsl_import = builder.glsl_ext_import;

    builder.decorations.extend(encode_instruction(op::OpCapability, &[CAPABILITY_SHADER]));
    let mut ext_instr = vec![glsl_import];
    ext_instr.extend(encode_string("GLSL.std.450"));
    builder.decorations.extend(encode_instruction(op::OpExtInstImport, &ext_instr));
    builder
        .decorations
        .extend(encode_instruction(op::OpMemoryModel, &[ADDRESSING_MODEL_LOGICAL, MEMORY_MODEL_GLSL450]));

    let mut interface_ids = Vec::new();

    for (global, assignment) in entry_point_resources(module, id, Target::Spirv) {
        let storage_class = match global.ty.ty {
            builtin::sampler | builtin::tex2d | builtin::tex2darray | builtin::texcube | builtin::bvh => STORAGE_CLASS_UNIFORM_CONSTANT,
            _ => STORAGE_CLASS_UNIFORM,
        };
        let var_id = builder.declare_global_variable(global.ty.ty, storage_class);
        builder.var_ids.insert(global.var, var_id);
        let RegisterAssignment::GroupBinding { group, binding } = assignment else {
            unreachable!("the SPIR-V target always uses the single-counter-plus-group policy")
        };
        builder.decorate(var_id, DECORATION_DESCRIPTOR_SET, &[group]);
        builder.decorate(var_id, DECORATION_BINDING, &[binding]);
    }

    let f = module.functions.get(id);
    for (i, p) in f.params.iter().enumerate() {
        let var_id = builder.declare_global_variable(p.ty.ty, STORAGE_CLASS_INPUT);
        builder.decorate(var_id, DECORATION_LOCATION, &[i as u32]);
        interface_ids.push(var_id);
        builder.input_vars.push((p.var, p.ty.ty, var_id));
    }
    if let Some(ret) = f.return_ty {
        let var_id = builder.declare_global_variable(ret.ty, STORAGE_CLASS_OUTPUT);
        builder.decorate(var_id, DECORATION_LOCATION, &[0]);
        interface_ids.push(var_id);
        builder.output_var = Some(var_id);
    }

    let fn_id = builder.emit_function_body(id)?;

    let execution_model = match stage {
        Stage::Vertex => EXECUTION_MODEL_VERTEX,
        Stage::Fragment => EXECUTION_MODEL_FRAGMENT,
        Stage::Compute => {
            log::warn!("SPIR-V compute entry points are not emitted by this backend (spec §4.6)");
            EXECUTION_MODEL_VERTEX
        }
    };
    let mut entry_operands = vec![execution_model, fn_id];
    entry_operands.extend(encode_string(ENTRY_POINT_NAME));
    entry_operands.extend(interface_ids);
    builder.decorations.extend(encode_instruction(op::OpEntryPoint, &entry_operands));
    if stage == Stage::Fragment {
        builder
            .decorations
            .extend(encode_instruction(op::OpExecutionMode, &[fn_id, EXECUTION_MODE_ORIGIN_UPPER_LEFT]));
    }

    let bound = builder.ids.next;
    let header = vec![MAGIC, VERSION, GENERATOR_MAGIC, bound, 0];

    let mut words = Vec::new();
    words.extend(header);
    words.extend(builder.decorations);
    words.extend(builder.types_constants);
    words.extend(builder.instructions);

    let mut bytes = Vec::with_capacity(words.len() * 4);
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Stage;
    use crate::compiler::compile;

    #[test]
    fn module_starts_with_the_spirv_magic_number() {
        let module = compile("fn f() -> float { return 1.0; }").unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        let bytes = emit_module(&module, id, Stage::Fragment).unwrap();
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(magic, MAGIC);
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn word_encoding_packs_opcode_and_length_into_one_word() {
        let words = encode_instruction(op::OpReturn, &[]);
        assert_eq!(words, vec![(1u32 << 16) | op::OpReturn]);
    }

    #[test]
    fn string_encoding_pads_to_a_four_byte_boundary() {
        let words = encode_string("ab");
        assert_eq!(words.len(), 1);
        let bytes = words[0].to_le_bytes();
        assert_eq!(&bytes, b"ab\0\0");
    }

    #[test]
    fn if_else_backpatches_a_distinct_label_for_each_branch() {
        let module = compile(
            "fn f(c: bool) -> float { if (c) { return 1.0; } else { return 2.0; } return 0.0; }",
        )
        .unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        assert!(emit_module(&module, id, Stage::Fragment).is_ok());
    }

    #[test]
    fn while_loop_backpatches_header_continue_and_merge_labels() {
        let module = compile(
            "fn f() -> int { let mut i: int = 0; while (i < 4) { i += 1; } return i; }",
        )
        .unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        assert!(emit_module(&module, id, Stage::Fragment).is_ok());
    }

    #[test]
    fn a_call_opcode_reports_a_lower_error_instead_of_emitting_broken_spirv() {
        let module = compile("fn g() -> float { return 1.0; } fn f() -> float { return g(); }").unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        let err = emit_module(&module, id, Stage::Fragment).unwrap_err();
        assert!(matches!(err, CompileError::Lower { .. }));
    }
}
