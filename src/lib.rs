// Copyright 2017 The Gfx-rs Developers.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `kong`: a small shader-language compiler. Source text goes in,
//! a lowered [`Module`](compiler::Module) comes out; backends turn
//! that module into HLSL, MSL, GLSL, WGSL, portable C, or a SPIR-V
//! binary.

mod analyzer;
mod ast;
mod attribute;
pub mod backend;
mod compiler;
mod error;
mod functions;
mod globals;
mod ir;
mod lower;
mod names;
mod parser;
mod span;
mod token;
mod types;
mod variable;

pub use compiler::{compile, compile_file, CompileOptions, Compiler, Module};
pub use error::{AnalyzeError, CompileError, CompileResult, LexError, LowerError, ParseError};
pub use span::SourceSpan;
