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

//! A thin driver: `kongc <input> <output-dir> <target>`. No argument
//! validation beyond arity, no glob expansion — the out-of-scope
//! host-integration collaborator the crate's spec names, kept only so
//! the compiler is runnable end-to-end.

use kong::backend::{self, Target};
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: kongc <input> <output-dir> <hlsl|msl|glsl|wgsl|spirv|cpu|all>");
        process::exit(2);
    }
    let input_path = Path::new(&args[1]);
    let output_dir = Path::new(&args[2]);
    let targets = match args[3].as_str() {
        "all" => vec![Target::Hlsl, Target::Msl, Target::Glsl, Target::Wgsl, Target::Spirv, Target::CpuC],
        other => match Target::parse(other) {
            Some(t) => vec![t],
            None => {
                eprintln!("unknown target {:?}", other);
                process::exit(2);
            }
        },
    };

    let module = match kong::compile_file(input_path) {
        Ok(module) => module,
        Err(err) => {
            eprintln!("{}: {}", input_path.display(), err);
            process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        eprintln!("{}: {}", output_dir.display(), e);
        process::exit(1);
    }

    let stem = input_path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    for (id, function) in module.functions.iter() {
        let name = module.pool.get(function.name);
        for &target in &targets {
            let emitted = match backend::emit(&module, id, target) {
                Ok(emitted) => emitted,
                Err(e) => {
                    eprintln!("{} ({}): {}", input_path.display(), name, e);
                    process::exit(1);
                }
            };
            let ext = match target {
                Target::Spirv => "spirv",
                _ => target.name(),
            };
            let out_path = output_dir.join(format!("{}.{}.{}", stem, name, ext));
            let result = match &emitted.binary {
                Some(bytes) => std::fs::write(&out_path, bytes),
                None => std::fs::write(&out_path, emitted.text.as_bytes()),
            };
            if let Err(e) = result {
                eprintln!("{}: {}", out_path.display(), e);
                process::exit(1);
            }
        }
    }
}
