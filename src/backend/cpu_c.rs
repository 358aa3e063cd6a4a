//! Portable-C backend: a software-fallback emission path with no GPU
//! resource types, used for CPU reference execution and for compute
//! entry points (SPIR-V compute is out of scope, spec §4.6). Vector
//! types compile against whatever `kong_runtime.h` typedefs the
//! embedding application provides (`kong_float2`, `kong_float3`, ...).

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
        builtin::float2 => "kong_float2".to_string(),
        builtin::float3 => "kong_float3".to_string(),
        builtin::float4 => "kong_float4".to_string(),
        builtin::float3x3 => "kong_float3x3".to_string(),
        builtin::float4x4 => "kong_float4x4".to_string(),
        builtin::int => "int32_t".to_string(),
        builtin::int2 => "kong_int2".to_string(),
        builtin::int3 => "kong_int3".to_string(),
        builtin::int4 => "kong_int4".to_string(),
        builtin::uint => "uint32_t".to_string(),
        builtin::uint2 => "kong_uint2".to_string(),
        builtin::uint3 => "kong_uint3".to_string(),
        builtin::uint4 => "kong_uint4".to_string(),
        builtin::bool_ => "bool".to_string(),
        builtin::sampler | builtin::tex2d | builtin::tex2darray | builtin::texcube | builtin::bvh => {
            "const void*".to_string()
        }
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
    for (global, assignment) in entry_point_resources(module, id, Target::CpuC) {
        let RegisterAssignment::GroupBinding { group, binding } = assignment else {
            unreachable!("CPU-C always uses the single-counter-plus-group policy")
        };
        writeln!(out, "static {} _{}; /* group {}, binding {} */", namer(global.ty.ty), global.var.0, group, binding).unwrap();
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
    fn vector_params_map_to_kong_runtime_typedefs() {
        let module = compile("fn f(v: float4) -> float4 { return v; }").unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        let text = emit_function(&module, id);
        assert!(text.starts_with("kong_float4 f(kong_float4 _"));
    }
}
