use pcore_codegen::Constant;
use pcorec::{BackendKind, BuildPCoreCError, Emit, PCoreC, PCoreCError};
use test_log::test;
use tracing::info;

mod common;

const FACTORIAL: &str = r#"
program Factorial;
int n = 5;

(int k) -> int func fact {
    int acc = 1;
    while (k > 1) {
        acc = acc * k;
        k = k - 1;
    }
    return acc;
}

func main {
    return fact(n);
}
"#;

#[test]
fn compile_to_ssa_and_run() -> eyre::Result<()> {
    let workspace = common::Workspace::with_source(FACTORIAL);
    let output = workspace.path("fact.ir");
    info!("compiling to {output:?}");
    let pcorec = PCoreC::builder()
        .output_path(&output)
        .run(true)
        .build()?;

    let compiled = pcorec.compile_file(workspace.source())?;
    assert_eq!(compiled.result, Some(Constant::Int32(120)));

    let written = std::fs::read_to_string(&output)?;
    assert_eq!(written, compiled.output);
    assert!(written.starts_with("module Factorial\n"));
    assert!(written.contains("global gv0: i32 = 5 ; n"));
    assert!(written.contains("function @fact(i32) -> i32 {"));
    assert!(written.contains("call @fact("));
    Ok(())
}

#[test]
fn compile_to_stack() -> eyre::Result<()> {
    let workspace = common::Workspace::with_source(FACTORIAL);
    let output = workspace.path("fact.stack");
    let pcorec = PCoreC::builder()
        .backend(BackendKind::Stack)
        .output_path(&output)
        .build()?;

    let compiled = pcorec.compile_file(workspace.source())?;
    assert_eq!(compiled.result, None);
    let written = std::fs::read_to_string(&output)?;
    assert!(written.starts_with("; program Factorial\n.global n: i32 = 5\n"));
    assert!(written.contains("fact:\n"));
    assert!(written.contains("CALL fact, 1"));
    Ok(())
}

#[test]
fn emit_ast() -> eyre::Result<()> {
    let workspace = common::Workspace::with_source("program P; int x = 3;");
    let output = workspace.path("p.ast");
    let pcorec = PCoreC::builder()
        .emit(Emit::Ast)
        .output_path(&output)
        .build()?;

    pcorec.compile_file(workspace.source())?;
    let written = std::fs::read_to_string(&output)?;
    assert!(written.starts_with("Program P\n"));
    Ok(())
}

#[test]
fn lowering_errors_are_all_reported() -> eyre::Result<()> {
    let workspace = common::Workspace::with_source(
        r#"
program Broken;
func a { return y; }
func b { return z; }
func main { return 0; }
"#,
    );
    let output = workspace.path("broken.ir");
    let pcorec = PCoreC::builder().output_path(&output).build()?;

    let err = pcorec.compile_file(workspace.source()).unwrap_err();
    let PCoreCError::Lowering(errors) = &err else {
        panic!("expected lowering errors, got {err:?}");
    };
    assert_eq!(errors.errors().len(), 2);
    assert_eq!(
        err.to_string(),
        "unknown variable `y`\nunknown variable `z`"
    );
    assert_eq!(err.exit_code(), 3);
    assert!(!output.exists(), "nothing is written on failure");
    Ok(())
}

#[test]
fn missing_source_file() -> eyre::Result<()> {
    let workspace = common::Workspace::with_source("program P;");
    let pcorec = PCoreC::builder()
        .output_path(workspace.path("out.ir"))
        .build()?;

    let err = pcorec
        .compile_file(&workspace.path("missing.pc"))
        .unwrap_err();
    assert!(matches!(err, PCoreCError::Io { .. }));
    assert_eq!(err.exit_code(), 4);
    Ok(())
}

#[test]
fn output_directory_must_exist() {
    let workspace = common::Workspace::with_source("program P;");
    let err = PCoreC::builder()
        .output_path(workspace.path("nested/out.ir"))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildPCoreCError::OutputDirectoryDoesNotExist(..)));

    let err = PCoreC::builder()
        .output_path(workspace.source().join("out.ir"))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildPCoreCError::OutputDirectoryIsNotADirectory(..)));
}
