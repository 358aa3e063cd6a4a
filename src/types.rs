//! The type registry: a process-wide (per-[`Compiler`](crate::compiler::Compiler))
//! mapping from [`TypeId`] to a type record, seeded with the reserved
//! built-in types spec §2 enumerates.

use crate::attribute::AttributeSet;
use crate::names::{NameId, NamePool, NO_NAME};
use fxhash::FxHashMap;

/// A stable integer id for a type, either a reserved built-in or a
/// user-defined struct.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TypeId(pub u32);

/// Array-size sentinel meaning "not an array" (scalar or struct).
pub const SCALAR: u32 = 0;
/// Array-size sentinel meaning "unbounded runtime array".
pub const UNBOUNDED: u32 = u32::MAX;

/// A literal value attached to a member default or a const-global
/// initializer.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ConstValue {
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
}

/// A reference to a type, with its own array dimension (so a member
/// of array type `float[4]` refers to `float`'s `TypeId` here, not a
/// distinct array type). Unresolved references (`resolved == false`)
/// only exist between parsing and analysis.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TypeRef {
    pub ty: TypeId,
    pub array_size: u32,
    pub resolved: bool,
}

impl TypeRef {
    pub fn unresolved() -> Self {
        TypeRef {
            ty: TypeId(0),
            array_size: SCALAR,
            resolved: false,
        }
    }

    pub fn scalar(ty: TypeId) -> Self {
        TypeRef {
            ty,
            array_size: SCALAR,
            resolved: true,
        }
    }

    pub fn array(ty: TypeId, array_size: u32) -> Self {
        TypeRef {
            ty,
            array_size,
            resolved: true,
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_size != SCALAR
    }
}

/// One member of a struct type: a name, its type, and an optional
/// default value given as a constant expression.
#[derive(Clone, Debug)]
pub struct Member {
    pub name: NameId,
    pub ty: TypeRef,
    pub default: Option<ConstValue>,
}

/// A type record: built-in scalar/vector/matrix/resource type, or a
/// user-defined struct.
#[derive(Clone, Debug)]
pub struct Type {
    pub name: Option<NameId>,
    pub built_in: bool,
    pub attributes: AttributeSet,
    pub members: Vec<Member>,
    /// `SCALAR` for a non-array type; `UNBOUNDED` for `T[]`.
    pub array_size: u32,
    /// For array types, the element type; otherwise equal to this
    /// type's own id.
    pub base_type: TypeId,
}

impl Type {
    fn built_in(name: &'static str, pool: &mut NamePool) -> Self {
        Type {
            name: Some(pool.intern(name)),
            built_in: true,
            attributes: AttributeSet::new(),
            members: Vec::new(),
            array_size: SCALAR,
            base_type: TypeId(0),
        }
    }
}

/// Reserved built-in type ids, assigned in the fixed order the
/// registry seeds them at start-up (spec §2/§4.7).
#[allow(non_upper_case_globals)]
pub mod builtin {
    use super::TypeId;

    pub const void: TypeId = TypeId(0);
    pub const float: TypeId = TypeId(1);
    pub const float2: TypeId = TypeId(2);
    pub const float3: TypeId = TypeId(3);
    pub const float4: TypeId = TypeId(4);
    pub const float3x3: TypeId = TypeId(5);
    pub const float4x4: TypeId = TypeId(6);
    pub const int: TypeId = TypeId(7);
    pub const int2: TypeId = TypeId(8);
    pub const int3: TypeId = TypeId(9);
    pub const int4: TypeId = TypeId(10);
    pub const uint: TypeId = TypeId(11);
    pub const uint2: TypeId = TypeId(12);
    pub const uint3: TypeId = TypeId(13);
    pub const uint4: TypeId = TypeId(14);
    pub const bool_: TypeId = TypeId(15);
    pub const sampler: TypeId = TypeId(16);
    pub const tex2d: TypeId = TypeId(17);
    pub const tex2darray: TypeId = TypeId(18);
    pub const texcube: TypeId = TypeId(19);
    pub const bvh: TypeId = TypeId(20);
}

/// Process-wide type registry. Built-ins occupy the first N ids in
/// the fixed order `builtin_ids!` lists, so `builtin::float` etc. are
/// valid before any user type is registered.
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<Type>,
    by_name: FxHashMap<NameId, TypeId>,
}

impl TypeRegistry {
    pub fn new(pool: &mut NamePool) -> Self {
        let mut reg = TypeRegistry {
            types: Vec::new(),
            by_name: FxHashMap::default(),
        };
        for name in [
            "void", "float", "float2", "float3", "float4", "float3x3", "float4x4", "int", "int2",
            "int3", "int4", "uint", "uint2", "uint3", "uint4", "bool", "sampler", "tex2d",
            "tex2darray", "texcube", "bvh",
        ] {
            let id = TypeId(reg.types.len() as u32);
            let mut ty = Type::built_in(if name == "bool" { "bool" } else { name }, pool);
            ty.base_type = id;
            let interned = pool.intern(name);
            reg.types.push(ty);
            reg.by_name.insert(interned, id);
        }
        reg
    }

    pub fn insert_struct(&mut self, name: NameId, attributes: AttributeSet) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(Type {
            name: if name == NO_NAME { None } else { Some(name) },
            built_in: false,
            attributes,
            members: Vec::new(),
            array_size: SCALAR,
            base_type: id,
        });
        if name != NO_NAME {
            self.by_name.insert(name, id);
        }
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.0 as usize]
    }

    pub fn lookup(&self, name: NameId) -> Option<TypeId> {
        self.by_name.get(&name).copied()
    }

    pub fn is_vector(&self, id: TypeId) -> bool {
        matches!(
            id,
            builtin::float2 | builtin::float3 | builtin::float4 |
            builtin::int2 | builtin::int3 | builtin::int4 |
            builtin::uint2 | builtin::uint3 | builtin::uint4
        )
    }

    pub fn vector_component_count(&self, id: TypeId) -> Option<u32> {
        match id {
            builtin::float2 | builtin::int2 | builtin::uint2 => Some(2),
            builtin::float3 | builtin::int3 | builtin::uint3 => Some(3),
            builtin::float4 | builtin::int4 | builtin::uint4 => Some(4),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_have_fixed_ids() {
        assert_eq!(builtin::void, TypeId(0));
        assert_eq!(builtin::float, TypeId(1));
        assert_eq!(builtin::bvh, TypeId(20));
    }

    #[test]
    fn lookup_resolves_builtin_names() {
        let mut pool = NamePool::new();
        let reg = TypeRegistry::new(&mut pool);
        let n = pool.intern("float4");
        assert_eq!(reg.lookup(n), Some(builtin::float4));
    }

    #[test]
    fn user_struct_gets_fresh_id_and_name_lookup() {
        let mut pool = NamePool::new();
        let mut reg = TypeRegistry::new(&mut pool);
        let name = pool.intern("MyStruct");
        let id = reg.insert_struct(name, AttributeSet::new());
        assert!(id.0 as usize >= 21);
        assert_eq!(reg.lookup(name), Some(id));
    }
}
