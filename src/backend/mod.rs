//! Backends turn a lowered [`Module`](crate::compiler::Module) into
//! target source text (HLSL, MSL, GLSL, WGSL, portable C) or a binary
//! SPIR-V module. All five text backends share the C-style opcode
//! writer in [`cstyle`]; each supplies its own type-name mapping and a
//! thin stage wrapper (spec §4.5).

pub mod cpu_c;
pub mod cstyle;
pub mod glsl;
pub mod hlsl;
pub mod msl;
pub mod spirv;
pub mod wgsl;

use crate::compiler::Module;
use crate::error::CompileResult;
use crate::functions::FunctionId;
use crate::globals::{Global, GlobalId};
use crate::types::{builtin, TypeId};
use fxhash::FxHashMap;

/// Which backend to emit. `All` is a CLI convenience, not a backend
/// of its own.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Target {
    Hlsl,
    Msl,
    Glsl,
    Wgsl,
    Spirv,
    CpuC,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::Hlsl => "hlsl",
            Target::Msl => "msl",
            Target::Glsl => "glsl",
            Target::Wgsl => "wgsl",
            Target::Spirv => "spirv",
            Target::CpuC => "cpu",
        }
    }

    pub fn parse(s: &str) -> Option<Target> {
        Some(match s {
            "hlsl" => Target::Hlsl,
            "msl" => Target::Msl,
            "glsl" => Target::Glsl,
            "wgsl" => Target::Wgsl,
            "spirv" => Target::Spirv,
            "cpu" => Target::CpuC,
            _ => return None,
        })
    }
}

/// One compiled artifact: the emitted text (or, for SPIR-V, a
/// parallel binary blob) for one entry point.
pub struct Emitted {
    pub function: FunctionId,
    pub text: String,
    pub binary: Option<Vec<u8>>,
}

/// The shader stage an entry point was written for, taken from its
/// `#[stage(...)]` attribute (spec §3 pipeline attributes). Backends
/// that distinguish prologue/epilogue per stage (SPIR-V entry-point
/// glue, MSL's `[[stage_in]]`) switch on this.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
}

impl Stage {
    pub fn lookup(name: &str) -> Option<Stage> {
        Some(match name {
            "vertex" => Stage::Vertex,
            "fragment" => Stage::Fragment,
            "compute" => Stage::Compute,
            _ => return None,
        })
    }
}

/// Descriptor-set register-index policy (spec §4 expansion). Chosen
/// by target API family, grounded on `shade.rs`'s per-backend
/// `Backend` dispatch pattern.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegisterPolicy {
    /// D3D-like: separate monotonic counters per resource class
    /// (`b` cbuffers, `t` textures, `s` samplers).
    SeparateCounters,
    /// WebGPU-like: one monotonic `binding` counter per set, `group`
    /// equal to the set's ordinal in the function's descriptor group.
    SingleCounterPlusGroup,
}

impl Target {
    pub fn register_policy(self) -> RegisterPolicy {
        match self {
            Target::Hlsl => RegisterPolicy::SeparateCounters,
            Target::Wgsl | Target::Spirv => RegisterPolicy::SingleCounterPlusGroup,
            // MSL/GLSL/CPU-C don't expose this binding model; default
            // to the single-counter scheme, the least committal.
            Target::Msl | Target::Glsl | Target::CpuC => RegisterPolicy::SingleCounterPlusGroup,
        }
    }
}

/// One global's target-specific binding location, the output of
/// [`assign_registers`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegisterAssignment {
    /// D3D-like: a resource-class letter (`b`/`t`/`s`) plus its
    /// monotonic index within that class, and the descriptor set's
    /// ordinal as the HLSL `space`.
    Separate { class: char, index: u32, space: u32 },
    /// WebGPU/SPIR-V-like: a `(group, binding)` pair.
    GroupBinding { group: u32, binding: u32 },
}

enum ResourceClass {
    ConstantBuffer,
    Texture,
    Sampler,
}

fn resource_class(ty: TypeId) -> ResourceClass {
    match ty {
        builtin::sampler => ResourceClass::Sampler,
        builtin::tex2d | builtin::tex2darray | builtin::texcube | builtin::bvh => ResourceClass::Texture,
        _ => ResourceClass::ConstantBuffer,
    }
}

/// Computes every global's binding location for `target`, following
/// `target.register_policy()` (spec §4 expansion; this is the
/// `RegisterPolicy` consumer SPEC_FULL §4.7 requires). Sets are walked
/// in declaration order, members within a set in declaration order, so
/// the assignment is deterministic across calls for the same module.
pub fn assign_registers(module: &Module, target: Target) -> FxHashMap<GlobalId, RegisterAssignment> {
    let mut out = FxHashMap::default();
    match target.register_policy() {
        RegisterPolicy::SeparateCounters => {
            for (set_id, set) in module.globals.sets() {
                let (mut b, mut t, mut s) = (0u32, 0u32, 0u32);
                for &(gid, _writable) in &set.members {
                    let g = module.globals.get(gid);
                    let assignment = match resource_class(g.ty.ty) {
                        ResourceClass::Sampler => {
                            let index = s;
                            s += 1;
                            RegisterAssignment::Separate { class: 's', index, space: set_id.0 }
                        }
                        ResourceClass::Texture => {
                            let index = t;
                            t += 1;
                            RegisterAssignment::Separate { class: 't', index, space: set_id.0 }
                        }
                        ResourceClass::ConstantBuffer => {
                            let index = b;
                            b += 1;
                            RegisterAssignment::Separate { class: 'b', index, space: set_id.0 }
                        }
                    };
                    out.insert(gid, assignment);
                }
            }
        }
        RegisterPolicy::SingleCounterPlusGroup => {
            for (set_id, set) in module.globals.sets() {
                for (binding, &(gid, _writable)) in set.members.iter().enumerate() {
                    out.insert(
                        gid,
                        RegisterAssignment::GroupBinding { group: set_id.0, binding: binding as u32 },
                    );
                }
            }
        }
    }
    out
}

/// The globals one entry point actually touches (its
/// `descriptor_set_group`), each paired with its computed binding
/// location for `target`. Text backends use this to emit a resource
/// declaration before the function body; used by the SPIR-V backend to
/// declare and decorate the matching `UniformConstant`/`Uniform`
/// variables.
pub fn entry_point_resources(module: &Module, id: FunctionId, target: Target) -> Vec<(Global, RegisterAssignment)> {
    let assignments = assign_registers(module, target);
    let f = module.functions.get(id);
    let mut out = Vec::new();
    for &set_id in &f.descriptor_set_group {
        let set = module.globals.set(set_id);
        for &(gid, _writable) in &set.members {
            if let Some(&assignment) = assignments.get(&gid) {
                out.push((module.globals.get(gid).clone(), assignment));
            }
        }
    }
    out
}

/// Reads the entry point's pipeline stage off its attribute set
/// (`#[vertex]`, `#[fragment]`, `#[compute]`), if any.
pub fn stage_of(module: &Module, id: FunctionId) -> Option<Stage> {
    let f = module.functions.get(id);
    f.attributes.iter().find_map(|a| Stage::lookup(module.pool.get(a.name)))
}

/// Dispatches one function to the requested target, producing a
/// single emitted artifact (spec §4.5/§4.6). SPIR-V entry points
/// default to the fragment execution model when no stage attribute is
/// present. Only the SPIR-V target can fail: its encoder rejects
/// opcodes it cannot lower (`CompileError::Lower`) rather than
/// silently emitting a malformed module.
pub fn emit(module: &Module, id: FunctionId, target: Target) -> CompileResult<Emitted> {
    Ok(match target {
        Target::Hlsl => Emitted { function: id, text: hlsl::emit_function(module, id), binary: None },
        Target::Msl => Emitted { function: id, text: msl::emit_function(module, id), binary: None },
        Target::Glsl => Emitted { function: id, text: glsl::emit_function(module, id), binary: None },
        Target::Wgsl => Emitted { function: id, text: wgsl::emit_function(module, id), binary: None },
        Target::CpuC => Emitted { function: id, text: cpu_c::emit_function(module, id), binary: None },
        Target::Spirv => {
            let stage = stage_of(module, id).unwrap_or(Stage::Fragment);
            let binary = spirv::emit_module(module, id, stage)?;
            Emitted { function: id, text: String::new(), binary: Some(binary) }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    #[test]
    fn emit_dispatches_text_backends_by_target() {
        let module = compile("fn f() -> float { return 1.0; }").unwrap();
        let id = module.functions.lookup(module.pool.lookup("f").unwrap()).unwrap();
        let hlsl = emit(&module, id, Target::Hlsl).unwrap();
        assert!(hlsl.binary.is_none());
        assert!(hlsl.text.contains("float f("));
        let spirv = emit(&module, id, Target::Spirv).unwrap();
        assert!(spirv.binary.is_some());
    }
}
