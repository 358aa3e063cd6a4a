//! HLSL backend: D3D-style type names and register binding, the
//! `SeparateCounters` policy (`b`/`t`/`s` per resource class).

use crate::backend::cstyle::CstyleWriter;
use crate::backend::{entry_point_resources, RegisterAssignment, Target};
use crate::compiler::Module;
use crate::functions::FunctionId;
use crate::names::NamePool;
use crate::types::{builtin, TypeId, TypeRegistry};
use std::fmt::Write as _;

fn type_name(types: &TypeRegistry, pool: &NamePool, ty: TypeId) -> String {
    match ty {
        builtin::void => "void".to_string(),
        builtin::float => "float".to_string(),
        builtin::float2 => "float2".to_string(),
        builtin::float3 => "float3".to_string(),
        builtin::float4 => "float4".to_string(),
        builtin::float3x3 => "float3x3".to_string(),
        builtin::float4x4 => "float4x4".to_string(),
        builtin::int => "int".to_string(),
        builtin::int2 => "int2".to_string(),
        builtin::int3 => "int3".to_string(),
        builtin::int4 => "int4".to_string(),
        builtin::uint => "uint".to_string(),
        builtin::uint2 => "uint2".to_string(),
        builtin::uint3 => "uint3".to_string(),
        builtin::uint4 => "uint4".to_string(),
        builtin::bool_ => "bool".to_string(),
        builtin::sampler => "SamplerState".to_string(),
        builtin::tex2d => "Texture2D".to_string(),
        builtin::tex2darray => "Texture2DArray".to_string(),
        builtin::texcube => "TextureCube".to_string(),
        builtin::bvh => "RaytracingAccelerationStructure".to_string(),
        other => types
            .get(other)
            .name
            .map(|n| pool.get(n).to_string())
            .unwrap_or_else(|| format!("/* anonymous type {} */ void", other.0)),
    }
}

/// Emits one function's full HLSL text: signature plus a brace-body
/// written with the shared C-style opcode writer.
pub fn emit_function(module: &Module, id: FunctionId) -> String {
    let f = module.functions.get(id);
    let namer = |ty: TypeId| type_name(&module.types, &module.pool, ty);
    let ret = f.return_ty.map(|t| namer(t.ty)).unwrap_or_else(|| "void".to_string());
    let params: Vec<String> = f
        .params
        .iter()
        .map(|p| format!("{} _{}", namer(p.ty.ty), p.var.0))
        .collect();

    let mut out = String::new();
    for (global, assignment) in entry_point_resources(module, id, Target::Hlsl) {
        let class = match assignment {
            RegisterAssignment::Separate { class, index, space } => format!("register({}{}, space{})", class, index, space),
            RegisterAssignment::GroupBinding { group, binding } => format!("register(b{}, space{})", binding, group),
        };
        writeln!(out, "{} _{} : {};", namer(global.ty.ty), global.var.0, class).unwrap();
    }
    writeln!(out, "{} {}({})", ret, module.pool.get(f.name), params.join(", ")).unwrap();
    out.push_str("{\n");
    let mut writer = CstyleWriter::new(&module.pool, &module.types, &module.variable_types, &namer, 1);
    writer.write_all(&f.opcodes, &mut out);
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    #[test]
    fn emits_member_load_as_a_dotted_field_access() {
        let module = compile("struct S { x: float; } fn id(s: S) -> float { return s.x; }").unwrap();
        let id = module.functions.lookup(module.pool.lookup("id").unwrap()).unwrap();
        let text = emit_function(&module, id);
        assert!(text.contains("float id("));
        assert!(text.contains(".x"));
        assert!(text.contains("return"));
    }
}
