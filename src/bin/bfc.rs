//! `bfc` — the compiler CLI (§6 "CLI surface"). Grounded in the pack's own
//! CLI shape (`pavexc_cli`/`ngc`): a `clap`-derive top-level command with
//! subcommands, `tracing-subscriber` wired to `-v`/`-vv`.

use barefoot_compiler::adapter::reference::ReferenceAdapter;
use barefoot_compiler::compile::{self, AdapterKind, CompileOptions};
use barefoot_compiler::conformance::{bless, fixture::Fixture, runner, RunOutcome};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bfc", about = "Compiles reactive component sources into marked templates and client scripts")]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a single component source file.
    Compile {
        path: PathBuf,
        #[arg(long, default_value = "reference")]
        adapter: String,
        #[arg(long)]
        output_ir: bool,
        #[arg(long)]
        content_hash: bool,
        #[arg(long)]
        minify: bool,
        #[arg(long)]
        client_only: bool,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Run (or bless) the fixture conformance suite.
    Conformance {
        #[arg(long, default_value = "fixtures")]
        dir: PathBuf,
        #[arg(long)]
        bless: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Compile {
            path,
            adapter,
            output_ir,
            content_hash,
            minify,
            client_only,
            out_dir,
        } => run_compile(&path, &adapter, output_ir, content_hash, minify, client_only, out_dir),
        Command::Conformance { dir, bless } => run_conformance(&dir, bless),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("bfc={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn parse_adapter(name: &str) -> Option<AdapterKind> {
    match name {
        "reference" => Some(AdapterKind::Reference),
        "gotpl" => Some(AdapterKind::GoTemplate),
        _ => None,
    }
}

fn run_compile(
    path: &Path,
    adapter_name: &str,
    output_ir: bool,
    content_hash: bool,
    minify: bool,
    client_only: bool,
    out_dir: Option<PathBuf>,
) -> ExitCode {
    let Some(adapter) = parse_adapter(adapter_name) else {
        eprintln!("unknown adapter '{}' (expected 'reference' or 'gotpl')", adapter_name);
        return ExitCode::FAILURE;
    };
    let options = CompileOptions {
        adapter,
        output_ir,
        content_hash,
        minify,
        client_only,
    };

    let result = compile::compile_file(path, |p| std::fs::read_to_string(p), &options);
    let result = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut had_errors = false;
    for error in &result.errors {
        had_errors |= error.is_fatal_for_codegen();
        eprintln!("{}", error);
    }

    let out_dir = out_dir.unwrap_or_else(|| path.parent().map(Path::to_path_buf).unwrap_or_default());
    for file in &result.files {
        let dest = out_dir.join(&file.path);
        if let Err(e) = std::fs::write(&dest, &file.content) {
            eprintln!("failed to write {}: {}", dest.display(), e);
            had_errors = true;
        } else {
            tracing::info!(path = %dest.display(), "wrote file");
        }
    }

    if had_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_conformance(dir: &Path, bless_mode: bool) -> ExitCode {
    let Ok(entries) = std::fs::read_dir(dir) else {
        eprintln!("cannot read fixture directory {}", dir.display());
        return ExitCode::FAILURE;
    };

    let reference = ReferenceAdapter::new();
    let mut failures = 0usize;
    let mut ran = 0usize;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(&path) else { continue };
        let Ok(fixture) = Fixture::from_json(&text) else {
            eprintln!("skipping malformed fixture {}", path.display());
            continue;
        };

        if bless_mode {
            if let Some(updated) = bless::bless_fixture(&fixture) {
                match updated.to_json_pretty() {
                    Ok(json) => {
                        let _ = std::fs::write(&path, json);
                        tracing::info!(fixture = %fixture.id, "blessed");
                    }
                    Err(e) => eprintln!("failed to serialize {}: {}", fixture.id, e),
                }
            }
            continue;
        }

        ran += 1;
        match runner::run_adapter_conformance(&fixture, &reference) {
            RunOutcome::Match => {}
            RunOutcome::Mismatch { expected, actual } => {
                failures += 1;
                eprintln!("FAIL {}\n  expected: {}\n  actual:   {}", fixture.id, expected, actual);
            }
            RunOutcome::Skipped { reason } => {
                tracing::warn!(fixture = %fixture.id, %reason, "skipped");
            }
            RunOutcome::NoExpectation { .. } => {
                tracing::warn!(fixture = %fixture.id, "no expectedHtml; run with --bless first");
            }
        }
    }

    if bless_mode {
        println!("blessed fixtures in {}", dir.display());
        return ExitCode::SUCCESS;
    }

    println!("{}/{} fixtures passed", ran - failures, ran);
    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
