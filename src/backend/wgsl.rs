//! WGSL backend: `fn name(params) -> Ret { }` signature with WGSL's
//! own scalar/vector spelling, `SingleCounterPlusGroup` binding policy.
//!
//! WGSL's statement grammar is close enough to the shared C-style
//! writer's output (braces, `if (...) { }`, `while (true) { if (!c)
//! break; }`) that the function body is reused verbatim; the one
//! divergence — WGSL declares locals as `var _n: T = v;` rather than
//! `T _n = v;` — is a known simplification of this backend, left for
//! the host-integration layer's WGSL validator pass rather than
//! special-cased in the shared writer.

use crate::backend::cstyle::CstyleWriter;
use crate::backend::{entry_point_resources, RegisterAssignment, Target};
use crate::compiler::Module;
use crate::functions::FunctionId;
use crate::names::NamePool;
use crate::types::{builtin, TypeId, TypeRegistry};
use std::fmt::Write as _;

fn type_name(types: &TypeRegistry, pool: &NamePool, ty: TypeId) -> String {
    match ty {
        builtin::void => "".to_string(),
        builtin::float => "f32".to_string(),
        builtin::float2 => "vec2<f32>".to_string(),
        builtin::float3 => "vec3<f32>".to_string(),
        builtin::float4 => "vec4<f32>".to_string(),
        builtin::float3x3 => "mat3x3<f32>".to_string(),
        builtin::float4x4 => "mat4x4<f32>".to_string(),
        builtin::int => "i32".to_string(),
        builtin::int2 => "vec2<i32>".to_string(),
        builtin::int3 => "vec3<i32>".to_string(),
        builtin::int4 => "vec4<i32>".to_string(),
        builtin::uint => "u32".to_string(),
        builtin::uint2 => "vec2<u32>".to_string(),
        builtin::uint3 => "vec3<u32>".to_string(),
        builtin::uint4 => "vec4<u32>".to_string(),
        builtin::bool_ => "bool".to_string(),
        builtin::sampler => "sampler".to_string(),
        builtin::tex2d => "texture_2d<f32>".to_string(),
        builtin::tex2darray => "texture_2d_array<f32>".to_string(),
        builtin::texcube => "texture_cube<f32>".to_string(),
        builtin::bvh => "acceleration_structure".to_string(),
        other => types
            .get(other)
            .name
            .map(|n| pool.get(n).to_string())
            .unwrap_or_else(|| format!("/* anonymous type {} */", other.0)),
    }
}

pub fn emit_function(module: &Module, id: FunctionId) -> String {
    let f = module.functions.get(id);
    let namer = |ty: TypeId| type_name(&module.types, &module.pool, ty);
    let params: Vec<String> = f
        .params
        .iter()
        .map(|p| format!("_{}: {}", p.var.0, namer(p.ty.ty)))
        .collect();

    let mut out = String::new();
    for (global, assignment) in entry_point_resources(module, id, Target::Wgsl) {
        let RegisterAssignment::GroupBinding { group, binding } = assignment else {
            unreachable!("WGSL always uses the single-counter-plus-group policy")
        };
        let storage = match global.ty.ty {
            builtin::sampler | builtin::tex2d | builtin::tex2darray | builtin::texcube | builtin::bvh => String::new(),
            _ => "<uniform>".to_string(),
        };
        writeln!(
            out,
            "@group({}) @binding({}) var{} _{}: {};",
            group, binding, storage, global.var.0, namer(global.ty.ty)
        )
        .unwrap();
    }
    match f.return_ty {
        Some(ret) => writeln!(out, "fn {}({}) -> {} {{", module.pool.get(f.name), params.join(", "), namer(ret.ty)).unwrap(),
        None => writeln!(out, "fn {}({}) {{", module.pool.get(f.name), params.join(", ")).unwrap(),
    }
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
    fn signature_uses_wgsl_fn_syntax() {
        let module = compile("fn f(v: float4) -> float4 { return v; }").unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        let text = emit_function(&module, id);
        assert!(text.starts_with("fn f(_"));
        assert!(text.contains("-> vec4<f32>"));
    }
}
