//! The function registry: user-defined functions (with a lowered
//! [`Block`](crate::ast::Block) body) and built-in intrinsics (with
//! `body: None`).

use crate::ast::Block;
use crate::attribute::AttributeSet;
use crate::globals::DescriptorSetId;
use crate::ir::Opcode;
use crate::names::NameId;
use crate::types::TypeRef;
use crate::variable::VariableId;
use fxhash::FxHashMap;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FunctionId(pub u32);

#[derive(Clone, Debug)]
pub struct FunctionParam {
    pub name: NameId,
    pub ty: TypeRef,
    /// Assigned once at signature registration; this is the id the
    /// body's references to the parameter resolve to, and the id the
    /// emitter names the formal parameter with (`_<id>`).
    pub var: VariableId,
}

#[derive(Clone, Debug, Default)]
pub struct Function {
    pub name: NameId,
    pub params: Vec<FunctionParam>,
    pub return_ty: Option<TypeRef>,
    pub attributes: AttributeSet,
    /// `None` for built-in intrinsics.
    pub body: Option<Block>,
    pub opcodes: Vec<Opcode>,
    /// The ordered descriptor sets this entry point references,
    /// derived by the analyzer from the globals the body touches.
    pub descriptor_set_group: Vec<DescriptorSetId>,
}

#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: Vec<Function>,
    by_name: FxHashMap<NameId, FunctionId>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry::default()
    }

    pub fn insert(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.by_name.insert(function.name, id);
        self.functions.push(function);
        id
    }

    pub fn get(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    pub fn lookup(&self, name: NameId) -> Option<FunctionId> {
        self.by_name.get(&name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FunctionId(i as u32), f))
    }
}
