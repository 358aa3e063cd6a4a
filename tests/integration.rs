//! Whole-pipeline scenarios: source text in, backend output or a
//! `CompileError` out. Complements the per-module `#[cfg(test)]`
//! suites with end-to-end coverage of the pipeline's observable
//! behavior (spec §8).

use kong::backend::{self, Stage, Target};
use kong::CompileError;

fn compiled(src: &str) -> kong::Module {
    kong::compile(src).expect("source should compile")
}

fn entry(module: &kong::Module, name: &str) -> kong::backend::Emitted {
    let id = module.functions.lookup(module.pool.lookup(name).unwrap()).unwrap();
    backend::emit(module, id, Target::Hlsl).expect("HLSL emission never fails")
}

#[test]
fn struct_member_load_emits_a_dotted_field_access_in_hlsl() {
    let module = compiled("struct S { x: float; } fn id(s: S) -> float { return s.x; }");
    let emitted = entry(&module, "id");
    assert!(emitted.text.contains("= _") && emitted.text.contains(".x;"));
}

#[test]
fn vertex_and_fragment_entry_points_each_produce_a_well_formed_spirv_module() {
    let module = compiled(
        "#[vertex] fn vs(pos: float4) -> float4 { return pos; }\n\
         #[fragment] fn fs(color: float4) -> float4 { return color; }",
    );
    for (name, stage) in [("vs", Stage::Vertex), ("fs", Stage::Fragment)] {
        let id = module.functions.lookup(module.pool.lookup(name).unwrap()).unwrap();
        let emitted = backend::emit(&module, id, Target::Spirv).expect("both entry points lower cleanly to SPIR-V");
        let bytes = emitted.binary.expect("SPIR-V target always produces a binary blob");
        assert_eq!(bytes.len() % 4, 0, "a SPIR-V module is a whole number of 32-bit words");
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(magic, kong::backend::spirv::MAGIC);
        let _ = stage;
    }
}

#[test]
fn while_loop_renders_as_a_break_guarded_msl_loop() {
    let module = compiled("fn f(n: int) -> int { let mut i: int = 0; while (i < n) { i += 1; } return i; }");
    let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
    let emitted = backend::emit(&module, id, Target::Msl).unwrap();
    assert!(emitted.text.contains("while (true)"));
    assert!(emitted.text.contains("if (!"));
    assert!(emitted.text.contains("break;"));
}

#[test]
fn swizzle_access_lowers_to_one_vector_load_with_three_components() {
    let module = compiled("fn f(v: float4) -> float3 { return v.xyz; }");
    let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
    let emitted = backend::emit(&module, id, Target::Glsl).unwrap();
    assert!(emitted.text.contains(".xyz"));
    assert!(!emitted.text.contains(".x.y.z"));
}

#[test]
fn const_global_groups_into_its_named_descriptor_set() {
    let module = compiled("#[set(material)] const Tint: float4 = float4(1.0, 1.0, 1.0, 1.0);");
    let set_name = module.pool.lookup("material").unwrap();
    let found = module.globals.sets().any(|(_, s)| s.name == set_name && s.members.len() == 1);
    assert!(found, "expected exactly one member in the \"material\" set");
}

#[test]
fn calling_a_user_function_reports_a_lower_error_for_spirv() {
    let module = compiled("fn g() -> float { return 1.0; } fn f() -> float { return g(); }");
    let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
    let err = backend::emit(&module, id, Target::Spirv).unwrap_err();
    match err {
        CompileError::Lower { .. } => {}
        other => panic!("expected a Lower error, got {other:?}"),
    }
}

#[test]
fn hlsl_resource_globals_get_a_register_binding() {
    let module = compiled(
        "#[set(material)] const tint: float;\n\
         fn f() -> float { return tint; }",
    );
    let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
    let emitted = backend::emit(&module, id, Target::Hlsl).unwrap();
    assert!(emitted.text.contains(": register("));
}

#[test]
fn missing_return_type_with_a_returned_value_is_an_analyze_error() {
    let err = kong::compile("fn f(x: int) { return x; }").unwrap_err();
    match err {
        CompileError::Analyze { .. } => {}
        other => panic!("expected an Analyze error, got {other:?}"),
    }
}

#[test]
fn internal_errors_are_distinguishable_from_user_diagnostics() {
    let err = CompileError::internal("stand-in for an invariant violation");
    assert!(err.to_string().starts_with("internal error: "));
}
