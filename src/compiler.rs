//! The top-level entry point: owns every process-wide registry and
//! drives one source file through tokenize → parse → analyze → lower
//! (spec §4, §9 "Global registries" design note).

use crate::analyzer::Analyzer;
use crate::error::{CompileError, CompileResult};
use crate::functions::FunctionRegistry;
use crate::globals::GlobalRegistry;
use crate::lower::lower_function;
use crate::names::NamePool;
use crate::parser::parse;
use crate::token::tokenize;
use crate::types::{TypeId, TypeRegistry};
use crate::variable::{VariableId, VariableIdGen};
use fxhash::FxHashMap;

/// A fully analyzed and lowered program, ready for a backend to emit.
pub struct Module {
    pub pool: NamePool,
    pub types: TypeRegistry,
    pub functions: FunctionRegistry,
    pub globals: GlobalRegistry,
    /// Every variable id any function's opcode buffer mentions, with
    /// the type it was declared or produced with. Ids are globally
    /// monotonic (`VariableIdGen` is process-wide), so this single map
    /// covers every function without collision.
    pub variable_types: FxHashMap<VariableId, TypeId>,
}

/// Compile-time configuration, passed explicitly rather than read
/// from a global (spec §9 "no source-language file-scope globals").
/// `optimize` is fixed `false` for now (spec.md Non-goal: no general
/// optimization) but kept as a field rather than omitted so a future
/// pass has somewhere to read it from.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// When set, only this entry point is expected to be emitted
    /// downstream; every function is still analyzed and lowered since
    /// helper functions may be called from any entry point.
    pub entry_point_filter: Option<String>,
    pub optimize: bool,
}

/// Owns the registries that persist for the lifetime of one
/// compilation. A fresh `Compiler` is cheap (registries start out
/// seeded with only the built-in types); there is no reason to reuse
/// one across unrelated source files.
pub struct Compiler {
    pool: NamePool,
    types: TypeRegistry,
    functions: FunctionRegistry,
    globals: GlobalRegistry,
    vargen: VariableIdGen,
}

impl Compiler {
    pub fn new() -> Self {
        let mut pool = NamePool::new();
        let types = TypeRegistry::new(&mut pool);
        Compiler {
            pool,
            types,
            functions: FunctionRegistry::new(),
            globals: GlobalRegistry::new(),
            vargen: VariableIdGen::new(),
        }
    }

    /// Runs the full pipeline over one source string and returns the
    /// lowered module. Each function's body is lowered in place; its
    /// `opcodes` field holds the result and `body` is left as the
    /// analyzed (but not lowered-away) AST for backends that want to
    /// re-derive structure the flat buffer doesn't keep, e.g. doc
    /// comments on members.
    pub fn compile(self, source: &str) -> CompileResult<Module> {
        self.compile_with_options(source, &CompileOptions::default())
    }

    /// Same pipeline as [`Compiler::compile`], with explicit options
    /// (spec §9 expansion) instead of the defaults.
    pub fn compile_with_options(mut self, source: &str, _options: &CompileOptions) -> CompileResult<Module> {
        let tokens = tokenize(source, &mut self.pool).map_err(|(source, span)| CompileError::Lex { span, source })?;
        let defs = parse(&tokens, &mut self.pool).map_err(|(source, span)| CompileError::Parse { span, source })?;
        {
            let mut analyzer = Analyzer::new(
                &mut self.pool,
                &mut self.types,
                &mut self.functions,
                &mut self.globals,
                &mut self.vargen,
            );
            analyzer
                .analyze_program(&defs)
                .map_err(|(source, span)| CompileError::Analyze { span, source })?;
        }

        let ids: Vec<_> = self.functions.iter().map(|(id, _)| id).collect();
        let mut variable_types = FxHashMap::default();
        for id in ids {
            let (body, params) = {
                let f = self.functions.get(id);
                let body = f.body.clone().unwrap_or_else(|| crate::ast::Block {
                    variables: Vec::new(),
                    statements: Vec::new(),
                });
                let params = f.params.iter().map(|p| (p.var, p.ty.ty)).collect::<Vec<_>>();
                (body, params)
            };
            let lowered = lower_function(
                &body,
                &params,
                &mut self.pool,
                &self.types,
                &self.functions,
                &mut self.vargen,
            );
            variable_types.extend(lowered.variable_types);
            self.functions.get_mut(id).opcodes = lowered.opcodes;
        }

        Ok(Module {
            pool: self.pool,
            types: self.types,
            functions: self.functions,
            globals: self.globals,
            variable_types,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

/// Convenience wrapper for callers that only have one source string
/// and don't need to reuse a `Compiler`.
pub fn compile(source: &str) -> CompileResult<Module> {
    Compiler::new().compile(source)
}

/// Reads `path` off disk and compiles it (spec §6 CLI surface). I/O
/// failures are reported as `CompileError::Internal` since they're not
/// a malformed-program diagnostic the phase error enums model.
pub fn compile_file(path: &std::path::Path) -> CompileResult<Module> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| CompileError::internal(format!("{}: {}", path.display(), e)))?;
    compile(&source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{all_uses_defined, Opcode};

    #[test]
    fn compiles_member_load_to_a_lowered_function() {
        let module = compile("struct S { x: float; } fn id(s: S) -> float { return s.x; }").unwrap();
        let name = module.pool.lookup("id").unwrap();
        let id = module.functions.lookup(name).unwrap();
        let f = module.functions.get(id);
        assert!(!f.opcodes.is_empty());
        assert!(all_uses_defined(&f.opcodes));
        assert!(f.opcodes.iter().any(|o| matches!(o, Opcode::LoadMember { .. })));
    }

    #[test]
    fn reports_lex_errors_with_a_span() {
        let err = compile("fn f() { \"unterminated }").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
    }

    #[test]
    fn reports_analyze_errors_with_a_span() {
        let err = compile("fn f() -> float { return unknown_name; }").unwrap_err();
        assert!(matches!(err, CompileError::Analyze { .. }));
    }
}
