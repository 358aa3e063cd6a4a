//! Module-scope globals and the descriptor sets the analyzer groups
//! them into.

use crate::attribute::AttributeSet;
use crate::names::NameId;
use crate::types::{ConstValue, TypeRef};
use crate::variable::VariableId;
use fxhash::FxHashMap;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GlobalId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DescriptorSetId(pub u32);

/// The default set name every global lands in absent an explicit
/// `#[set(name)]`.
pub const DEFAULT_SET_NAME: &str = "set_0";
/// The reserved single-member set a `#[set(root_constants)]` global
/// belongs to.
pub const ROOT_CONSTANTS_SET_NAME: &str = "root_constants";

#[derive(Clone, Debug)]
pub struct Global {
    pub name: NameId,
    pub ty: TypeRef,
    pub attributes: AttributeSet,
    /// Present for `const` globals; `None` for mutable resource
    /// globals (textures, samplers, constant-buffer structs).
    pub const_value: Option<ConstValue>,
    pub var: VariableId,
    pub set: Option<DescriptorSetId>,
}

/// A named, ordered bundle of globals bound as a unit to a shader.
#[derive(Clone, Debug)]
pub struct DescriptorSet {
    pub name: NameId,
    /// `(global, writable)` in declaration order.
    pub members: Vec<(GlobalId, bool)>,
}

#[derive(Debug, Default)]
pub struct GlobalRegistry {
    globals: Vec<Global>,
    by_name: FxHashMap<NameId, GlobalId>,
    sets: Vec<DescriptorSet>,
    sets_by_name: FxHashMap<NameId, DescriptorSetId>,
}

impl GlobalRegistry {
    pub fn new() -> Self {
        GlobalRegistry::default()
    }

    pub fn insert(&mut self, global: Global) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.by_name.insert(global.name, id);
        self.globals.push(global);
        id
    }

    pub fn get(&self, id: GlobalId) -> &Global {
        &self.globals[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: GlobalId) -> &mut Global {
        &mut self.globals[id.0 as usize]
    }

    pub fn lookup(&self, name: NameId) -> Option<GlobalId> {
        self.by_name.get(&name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlobalId, &Global)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(i, g)| (GlobalId(i as u32), g))
    }

    /// Assign `global` to the descriptor set named `set_name`
    /// (interned already), creating the set on first use. `writable`
    /// comes from the global's `#[write]` attribute.
    pub fn assign_to_set(&mut self, global: GlobalId, set_name: NameId, writable: bool) -> DescriptorSetId {
        let set_id = *self.sets_by_name.entry(set_name).or_insert_with(|| {
            let id = DescriptorSetId(self.sets.len() as u32);
            self.sets.push(DescriptorSet {
                name: set_name,
                members: Vec::new(),
            });
            id
        });
        self.sets[set_id.0 as usize].members.push((global, writable));
        self.globals[global.0 as usize].set = Some(set_id);
        set_id
    }

    pub fn set(&self, id: DescriptorSetId) -> &DescriptorSet {
        &self.sets[id.0 as usize]
    }

    pub fn sets(&self) -> impl Iterator<Item = (DescriptorSetId, &DescriptorSet)> {
        self.sets
            .iter()
            .enumerate()
            .map(|(i, s)| (DescriptorSetId(i as u32), s))
    }
}
