//! Attributes: `#[name(args...)]` or `#[name]`, attached to types,
//! functions, and globals. Recognized names include `pipe`, `vertex`,
//! `fragment`, `mesh`, `compute`, `threads(x, y, z)`, `indexed`,
//! `write`, `set(name)`, and render-state members on pipe structs.

use crate::names::NameId;

/// A numeric parameter of an attribute. The source language only has
/// numbers, booleans, and identifiers in attribute position; a bare
/// identifier (e.g. `blend_source = BlendOne`) resolves to a global
/// at analysis time and is stored as `Name` until then.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AttributeArg {
    Number(f64),
    Name(NameId),
}

#[derive(Clone, Debug)]
pub struct Attribute {
    pub name: NameId,
    pub args: Vec<AttributeArg>,
}

/// The attribute set attached to one type, function, or global.
/// Order is preserved because `#[set(name)]` and stage attributes are
/// order-independent but render-state members are applied in
/// declaration order.
#[derive(Clone, Debug, Default)]
pub struct AttributeSet {
    attrs: Vec<Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        AttributeSet { attrs: Vec::new() }
    }

    pub fn push(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }

    pub fn find(&self, name: NameId) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn has(&self, name: NameId) -> bool {
        self.find(name).is_some()
    }
}

bitflags::bitflags! {
    /// Which shader stages a descriptor-set binding is visible to.
    /// Mirrors `gfx-hal`'s `pso::ShaderStageFlags` pattern of a
    /// bitflags set over the stage roles a resource can be bound in.
    #[derive(Default)]
    pub struct StageFlags: u8 {
        const VERTEX = 0x1;
        const FRAGMENT = 0x2;
        const COMPUTE = 0x4;
        const MESH = 0x8;
        const AMPLIFICATION = 0x10;
    }
}
