//! Metal Shading Language backend: MSL's own scalar/vector spelling
//! and texture/sampler object types.

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
        builtin::sampler => "sampler".to_string(),
        builtin::tex2d => "texture2d<float>".to_string(),
        builtin::tex2darray => "texture2d_array<float>".to_string(),
        builtin::texcube => "texturecube<float>".to_string(),
        builtin::bvh => "instance_acceleration_structure".to_string(),
        other => types
            .get(other)
            .name
            .map(|n| pool.get(n).to_string())
            .unwrap_or_else(|| format!("/* anonymous type {} */ void", other.0)),
    }
}

/// Emits one function's full MSL text. Entry-point attribute glue
/// (`[[stage_in]]`, `[[buffer(n)]]`) is the host-integration
/// collaborator's job (spec §6); this backend emits the ordinary
/// function body any stage shares.
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
    // MSL binds resources as parameter attributes ([[buffer(n)]],
    // [[texture(n)]], [[sampler(n)]]) rather than free-standing
    // declarations; the host-integration layer owns assembling the
    // real argument list (see the module doc comment), so the computed
    // index is surfaced here only as a comment for that layer to use.
    for (global, assignment) in entry_point_resources(module, id, Target::Msl) {
        let RegisterAssignment::GroupBinding { group, binding } = assignment else {
            unreachable!("MSL always uses the single-counter-plus-group policy")
        };
        writeln!(
            out,
            "// _{}: {} -> [[buffer({})]] (group {})",
            global.var.0, namer(global.ty.ty), binding, group
        )
        .unwrap();
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
    fn emits_swizzle_as_a_single_dotted_group() {
        let module = compile("fn f(v: float4) -> float3 { return v.xyz; }").unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        let text = emit_function(&module, id);
        assert!(text.contains(".xyz"));
    }
}
