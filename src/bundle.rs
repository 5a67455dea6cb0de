//! Public build entry.
//!
//! `build` links the graph; the returned `Bundle` can `generate` the
//! output in memory or `write` it to the file provider. Generation
//! concatenates module renders in topological order, appends an export
//! statement reconstructing the entry's surface, and assembles the
//! source map from the renderers' retained-chunk tables. Nothing touches
//! the output location until the whole pipeline has succeeded.

use crate::diagnostics::BuildError;
use crate::host::FileSystem;
use crate::module_graph::ModuleGraph;
use crate::source_map::{LineIndex, SourceMap, SourceMapBuilder};
use crate::text_edit::Chunk;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Entry module path.
    pub input: PathBuf,
    /// Bundle destination; the map lands next to it as `<name>.map`.
    pub output: PathBuf,
}

/// Generated bundle text plus its source map.
pub struct BundleOutput {
    pub code: String,
    pub map: SourceMap,
}

/// A fully linked build, ready to generate or write.
#[derive(Debug)]
pub struct Bundle {
    graph: ModuleGraph,
    options: BuildOptions,
}

/// Run the whole pipeline for one entry point.
pub fn build(options: BuildOptions, fs: &dyn FileSystem) -> Result<Bundle, BuildError> {
    let graph = ModuleGraph::build(&options.input, fs)?;
    Ok(Bundle { graph, options })
}

impl Bundle {
    fn output_file_name(&self) -> String {
        self.options
            .output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle.js".to_string())
    }

    pub fn generate(&self) -> BundleOutput {
        let mut builder = SourceMapBuilder::new(self.output_file_name());
        let mut code = String::new();
        // (output base, source index, chunks, module line table)
        let mut pieces: Vec<(u32, u32, Vec<Chunk>, LineIndex)> = Vec::new();

        for &id in &self.graph.ordered {
            let module = self.graph.module(id);
            let (text, chunks) = module.render(&self.graph.arena);
            if text.is_empty() {
                continue;
            }
            let source_index = builder.add_source(
                module.path.display().to_string(),
                module.source.clone(),
            );
            pieces.push((
                code.len() as u32,
                source_index,
                chunks,
                LineIndex::new(&module.source),
            ));
            code.push_str(&text);
        }

        let trailer = self.export_trailer();
        if !trailer.is_empty() {
            if !code.is_empty() && !code.ends_with('\n') {
                code.push('\n');
            }
            code.push_str(&trailer);
        }

        let generated = LineIndex::new(&code);
        for (base, source_index, chunks, lines) in &pieces {
            for chunk in chunks {
                let (gen_line, gen_col) = generated.position(base + chunk.out);
                let (src_line, src_col) = lines.position(chunk.src);
                builder.add_segment(gen_line, gen_col, *source_index, src_line, src_col);
            }
        }

        tracing::debug!(bytes = code.len(), modules = pieces.len(), "bundle generated");
        BundleOutput {
            code,
            map: builder.build(),
        }
    }

    /// The bundle stays a module: its exports are the entry's exports,
    /// under their final rendered names.
    fn export_trailer(&self) -> String {
        let mut named: Vec<String> = Vec::new();
        let mut default = None;
        for (exported, decl) in &self.graph.entry_exports {
            let rendered = self.graph.arena.rendered_name(*decl);
            if exported == "default" {
                default = Some(rendered.to_string());
            } else if rendered == exported {
                named.push(exported.clone());
            } else {
                named.push(format!("{rendered} as {exported}"));
            }
        }

        let mut trailer = String::new();
        if !named.is_empty() {
            trailer.push_str(&format!("export {{ {} }};\n", named.join(", ")));
        }
        if let Some(name) = default {
            trailer.push_str(&format!("export default {name};\n"));
        }
        trailer
    }

    /// Write the bundle and its `.map` companion, creating missing
    /// output directories first.
    pub fn write(&self, fs: &dyn FileSystem) -> Result<(), BuildError> {
        let output = self.generate();

        if let Some(dir) = self.options.output.parent() {
            if !dir.as_os_str().is_empty() {
                fs.create_dir_all(dir)
                    .map_err(|source| BuildError::io(dir, source))?;
            }
        }

        let map_name = format!("{}.map", self.output_file_name());
        let map_path = self.options.output.with_file_name(&map_name);

        let mut code = output.code;
        if !code.is_empty() && !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(&format!("//# sourceMappingURL={map_name}\n"));

        fs.write(&self.options.output, &code)
            .map_err(|source| BuildError::io(self.options.output.clone(), source))?;
        fs.write(&map_path, &output.map.to_json())
            .map_err(|source| BuildError::io(map_path.clone(), source))?;
        tracing::info!(output = %self.options.output.display(), "bundle written");
        Ok(())
    }
}
