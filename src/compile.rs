//! External interface (§6): the `compile`/`compile_file`/`compile_many`
//! entry points and the `FileOutput`/`CompileResult` shapes they return.

use crate::adapter::{reference::ReferenceAdapter, Adapter, ScopeIdMode};
use crate::analyzer::Analyzer;
use crate::client_codegen;
use crate::error::{CompileError, FatalError};
use crate::{adapter::gotpl::GoTemplateAdapter, transform};
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Reference,
    GoTemplate,
}

impl AdapterKind {
    fn build(self) -> Box<dyn Adapter> {
        match self {
            AdapterKind::Reference => Box::new(ReferenceAdapter::new()),
            AdapterKind::GoTemplate => Box::new(GoTemplateAdapter::new()),
        }
    }
}

impl Default for AdapterKind {
    fn default() -> Self {
        AdapterKind::Reference
    }
}

/// §6 `options`.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub adapter: AdapterKind,
    pub output_ir: bool,
    pub content_hash: bool,
    pub minify: bool,
    pub client_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    MarkedTemplate,
    ClientJs,
    Ir,
    Types,
}

#[derive(Debug, Clone)]
pub struct FileOutput {
    pub path: String,
    pub content: String,
    pub kind: FileKind,
}

#[derive(Debug, Clone, Default)]
pub struct CompileResult {
    pub files: Vec<FileOutput>,
    pub errors: Vec<CompileError>,
}

/// The synchronous compile entry point (§6 `compile(source, path, options)`).
/// Never suspends, always completes in bounded time over the parsed AST.
pub fn compile(source: &str, path: &str, options: &CompileOptions) -> CompileResult {
    let ctx = Analyzer::analyze(source, path);
    let mut errors = ctx.errors.clone();

    let Some(ir) = transform::build_ir(&ctx) else {
        return CompileResult { files: Vec::new(), errors };
    };
    errors.extend(ir.errors.clone());

    let stem = file_stem(path);
    let mut files = Vec::new();
    let adapter = options.adapter.build();

    if !options.client_only {
        let (generated, adapter_errors) = adapter.generate(&ir, &ScopeIdMode::Runtime);
        errors.extend(adapter_errors);

        let template_name = output_name(&stem, adapter.extension(), options.content_hash, &generated.template);
        files.push(FileOutput {
            path: template_name,
            content: generated.template,
            kind: FileKind::MarkedTemplate,
        });

        if let Some(types) = generated.types {
            files.push(FileOutput {
                path: format!("{}.types.{}", stem, types_extension(options.adapter)),
                content: types,
                kind: FileKind::Types,
            });
        }
    }

    let (mut client_js, client_errors) = client_codegen::generate_client_js(&ir);
    errors.extend(client_errors);
    if !client_js.is_empty() {
        if options.minify {
            client_js = minify_js(&client_js);
        }
        let client_name = output_name(&format!("{}.client", stem), "js", options.content_hash, &client_js);
        files.push(FileOutput {
            path: client_name,
            content: client_js,
            kind: FileKind::ClientJs,
        });
    }

    if options.output_ir {
        match serde_json::to_string_pretty(&ir) {
            Ok(json) => files.push(FileOutput {
                path: format!("{}.ir.json", stem),
                content: json,
                kind: FileKind::Ir,
            }),
            Err(e) => errors.push(CompileError::new(
                crate::error::codes::EXTRACTION_WARNING,
                crate::error::Severity::Warning,
                format!("failed to serialize IR: {}", e),
                path,
                crate::ir::SourceLocation::default(),
            )),
        }
    }

    CompileResult { files, errors }
}

/// §6 `compileFile(path, readText, options)`. Suspends exactly at the
/// `read` callback boundary (§5); everything after is synchronous. Modeled
/// as a plain `Fn` rather than an async fn since the only real suspension
/// point is one blocking read — see DESIGN.md's Open Question record.
pub fn compile_file(
    path: &Path,
    read: impl Fn(&Path) -> std::io::Result<String>,
    options: &CompileOptions,
) -> Result<CompileResult, FatalError> {
    let source = read(path).map_err(|source| FatalError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(compile(&source, &path.display().to_string(), options))
}

/// A batch build (§5): each unit is self-contained, so `rayon::par_iter`
/// parallelizes freely with no shared mutable state between units.
pub fn compile_many(units: &[(String, String)], options: &CompileOptions) -> Vec<CompileResult> {
    use rayon::prelude::*;
    units
        .par_iter()
        .map(|(path, source)| compile(source, path, options))
        .collect()
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

fn types_extension(kind: AdapterKind) -> &'static str {
    match kind {
        AdapterKind::Reference => "json",
        AdapterKind::GoTemplate => "go",
    }
}

fn output_name(stem: &str, extension: &str, content_hash: bool, content: &str) -> String {
    if !content_hash {
        return format!("{}.{}", stem, extension);
    }
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let short = hex_prefix(digest.as_slice(), 8);
    format!("{}.{}.{}", stem, short, extension)
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes.iter().take(n).map(|b| format!("{:02x}", b)).collect()
}

/// Whitespace-only minification: collapses run of blank lines and trims
/// trailing spaces. Not a general JS minifier — the spec only requires that
/// `minify` shrink output, not that it be semantically transformed.
fn minify_js(source: &str) -> String {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIC_SOURCE: &str = r#"
        export default function Hello() {
          return <div>Hello, world</div>;
        }
    "#;

    const REACTIVE_SOURCE: &str = r#"
        export default function Counter() {
          const [count, setCount] = createSignal(0);
          return <div>{count()}</div>;
        }
    "#;

    #[test]
    fn static_component_produces_only_a_marked_template() {
        let result = compile(STATIC_SOURCE, "hello.tsx", &CompileOptions::default());
        assert!(result.errors.is_empty());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].kind, FileKind::MarkedTemplate);
        assert_eq!(result.files[0].path, "hello.bf.html");
    }

    #[test]
    fn reactive_component_also_emits_a_client_script() {
        let result = compile(REACTIVE_SOURCE, "counter.tsx", &CompileOptions::default());
        assert!(result.files.iter().any(|f| f.kind == FileKind::ClientJs));
        let client = result.files.iter().find(|f| f.kind == FileKind::ClientJs).unwrap();
        assert_eq!(client.path, "counter.client.js");
        assert!(client.content.contains("initCounter"));
    }

    #[test]
    fn client_only_skips_the_marked_template() {
        let options = CompileOptions { client_only: true, ..CompileOptions::default() };
        let result = compile(REACTIVE_SOURCE, "counter.tsx", &options);
        assert!(!result.files.iter().any(|f| f.kind == FileKind::MarkedTemplate));
        assert!(result.files.iter().any(|f| f.kind == FileKind::ClientJs));
    }

    #[test]
    fn content_hash_embeds_a_stable_digest_prefix_in_the_filename() {
        let options = CompileOptions { content_hash: true, ..CompileOptions::default() };
        let result = compile(STATIC_SOURCE, "hello.tsx", &options);
        let name = &result.files[0].path;
        assert!(name.starts_with("hello."));
        assert!(name.ends_with(".bf.html"));
        assert_ne!(name, "hello.bf.html");

        let again = compile(STATIC_SOURCE, "hello.tsx", &options);
        assert_eq!(again.files[0].path, *name);
    }

    #[test]
    fn gotpl_adapter_also_emits_a_types_file() {
        let options = CompileOptions { adapter: AdapterKind::GoTemplate, ..CompileOptions::default() };
        let result = compile(STATIC_SOURCE, "hello.tsx", &options);
        assert!(result.files.iter().any(|f| f.kind == FileKind::Types && f.path == "hello.types.go"));
    }

    #[test]
    fn output_ir_serializes_the_component_ir_as_json() {
        let options = CompileOptions { output_ir: true, ..CompileOptions::default() };
        let result = compile(STATIC_SOURCE, "hello.tsx", &options);
        let ir_file = result.files.iter().find(|f| f.kind == FileKind::Ir).expect("ir file expected");
        assert!(serde_json::from_str::<serde_json::Value>(&ir_file.content).is_ok());
    }

    #[test]
    fn missing_markup_return_yields_no_files_but_an_error() {
        let result = compile("export const x = 1;", "nothing.tsx", &CompileOptions::default());
        assert!(result.files.is_empty());
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn compile_file_reads_through_the_provided_callback() {
        let result = compile_file(
            Path::new("hello.tsx"),
            |_| Ok(STATIC_SOURCE.to_string()),
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(result.files.len(), 1);
    }

    #[test]
    fn compile_file_surfaces_io_errors_as_fatal() {
        let result = compile_file(
            Path::new("missing.tsx"),
            |_| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "nope")),
            &CompileOptions::default(),
        );
        assert!(matches!(result, Err(FatalError::Io { .. })));
    }

    #[test]
    fn compile_many_compiles_every_unit_independently() {
        let units = vec![
            ("hello.tsx".to_string(), STATIC_SOURCE.to_string()),
            ("counter.tsx".to_string(), REACTIVE_SOURCE.to_string()),
        ];
        let results = compile_many(&units, &CompileOptions::default());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].files[0].path, "hello.bf.html");
        assert!(results[1].files.iter().any(|f| f.kind == FileKind::ClientJs));
    }
}
