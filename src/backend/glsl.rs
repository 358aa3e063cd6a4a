//! GLSL backend: `vec`/`mat`/sampler-combined type spellings.

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
        builtin::float2 => "vec2".to_string(),
        builtin::float3 => "vec3".to_string(),
        builtin::float4 => "vec4".to_string(),
        builtin::float3x3 => "mat3".to_string(),
        builtin::float4x4 => "mat4".to_string(),
        builtin::int => "int".to_string(),
        builtin::int2 => "ivec2".to_string(),
        builtin::int3 => "ivec3".to_string(),
        builtin::int4 => "ivec4".to_string(),
        builtin::uint => "uint".to_string(),
        builtin::uint2 => "uvec2".to_string(),
        builtin::uint3 => "uvec3".to_string(),
        builtin::uint4 => "uvec4".to_string(),
        builtin::bool_ => "bool".to_string(),
        // GLSL has no separate sampler-object type; a bare `sampler`
        // global has no meaningful standalone GLSL spelling outside a
        // combined sampler2D, so it maps to the combined type too.
        builtin::sampler | builtin::tex2d => "sampler2D".to_string(),
        builtin::tex2darray => "sampler2DArray".to_string(),
        builtin::texcube => "samplerCube".to_string(),
        builtin::bvh => "accelerationStructureEXT".to_string(),
        other => types
            .get(other)
            .name
            .map(|n| pool.get(n).to_string())
            .unwrap_or_else(|| format!("/* anonymous type {} */ void", other.0)),
    }
}

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
    for (global, assignment) in entry_point_resources(module, id, Target::Glsl) {
        let RegisterAssignment::GroupBinding { group, binding } = assignment else {
            unreachable!("GLSL always uses the single-counter-plus-group policy")
        };
        writeln!(
            out,
            "layout(set = {}, binding = {}) uniform {} _{};",
            group, binding, namer(global.ty.ty), global.var.0
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
    fn maps_vector_types_to_glsl_spelling() {
        let module = compile("fn f(v: float4) -> float4 { return v; }").unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        let text = emit_function(&module, id);
        assert!(text.starts_with("vec4 f(vec4 _"));
    }
}
