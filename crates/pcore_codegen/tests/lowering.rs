use pcore_ast::Program;
use pcore_codegen::ir::{IrModule, IrModuleBuilder, IrOp};
use pcore_codegen::stack::StackBackend;
use pcore_codegen::{lower, LoweringError, ValueType};
use test_log::test;

const SCENARIO: &str = "program P; int x = 1 + 2; func main { return x; }";

fn program(src: &str) -> Program {
    let tokens = pcore_parsing::tokenize(src).expect("could not lex");
    pcore_parsing::parse(tokens).expect("could not parse")
}

fn ir(src: &str) -> IrModule {
    lower(program(src), IrModuleBuilder::new()).unwrap_or_else(|e| panic!("{e}"))
}

fn errors(src: &str) -> Vec<LoweringError> {
    lower(program(src), IrModuleBuilder::new())
        .expect_err("lowering should fail")
        .0
}

fn labels(module: &IrModule, function: &str) -> Vec<String> {
    module
        .function(function)
        .expect("function should exist")
        .blocks()
        .values()
        .map(|block| block.label().to_string())
        .collect()
}

#[test]
fn scenario_lowers_to_ir() {
    let module = ir(SCENARIO);
    assert_eq!(module.name(), "P");
    let main = module.function("main").expect("main should exist");
    assert_eq!(main.signature().to_string(), "@main() -> i32");
    let text = module.to_string();
    assert!(text.contains("global gv0: i32 = 3 ; x"), "{text}");
    assert!(text.contains("v0: i32 = load gv0"), "{text}");
    assert!(text.contains("ret v0"), "{text}");
}

#[test]
fn scenario_lowers_to_stack_text() {
    let program = lower(program(SCENARIO), StackBackend::new()).expect("could not lower");
    let expected = "\
; program P
.global x: i32 = 3

; @main() -> i32
main:
    ENTER 0
ENTRY_0:
    LOAD %t0, [x]
    RET %t0
";
    assert_eq!(program.to_string(), expected);
}

#[test]
fn loops_lower_to_stack_jumps() {
    let program = lower(
        program(
            r#"
            program P;
            (int n) -> int sum {
                int total = 0;
                while n > 0 { total = total + n; n = n - 1; }
                return total;
            }
            "#,
        ),
        StackBackend::new(),
    )
    .expect("could not lower");
    let sum = program.function("sum").expect("sum should exist");
    assert_eq!(sum.frame_size(), 8);
    let expected = "\
; @sum(i32) -> i32
sum:
    ENTER 8
ENTRY_0:
    LOAD %t0, [AP + 0]
    STORE [FP + 0], %t0
    LOAD %t1, #0
    STORE [FP + 4], %t1
    JMP LOOP_1
LOOP_1:
    LOAD %t2, [FP + 0]
    LOAD %t3, #0
    GT %t4, %t2, %t3
    JZ %t4, LOOPEXIT_3
    JMP LOOPBODY_2
LOOPBODY_2:
    LOAD %t5, [FP + 4]
    LOAD %t6, [FP + 0]
    ADD %t7, %t5, %t6
    STORE [FP + 4], %t7
    LOAD %t8, [FP + 0]
    LOAD %t9, #1
    SUB %t10, %t8, %t9
    STORE [FP + 0], %t10
    JMP LOOP_1
LOOPEXIT_3:
    LOAD %t11, [FP + 4]
    RET %t11
";
    assert_eq!(sum.to_string(), expected);
}

#[test]
fn undeclared_identifier_is_named() {
    let errors = errors("program P; () -> int main { int a = 1; return a + y; }");
    assert_eq!(errors, vec![LoweringError::UnknownVariable("y".to_string())]);
    assert!(errors[0].to_string().contains("`y`"));
}

#[test]
fn if_and_while_blocks() {
    let module = ir(r#"
        program P;
        (int n) -> int f {
            int r = 0;
            if n > 0 { r = 1; } else { r = 2; }
            while r < 10 { r = r + 1; }
            return r;
        }
    "#);
    assert_eq!(
        labels(&module, "f"),
        ["entry", "then", "else", "ifcont", "loop", "loopbody", "loopexit"]
    );
    let f = module.function("f").unwrap();
    let successors = f
        .blocks()
        .values()
        .map(|block| block.followed_by().len())
        .collect::<Vec<_>>();
    assert_eq!(successors, [2, 1, 1, 1, 2, 1, 0]);
    // parameter and local slots
    assert_eq!(
        f.slots(),
        &[
            ("n".to_string(), ValueType::Int32),
            ("r".to_string(), ValueType::Int32)
        ]
    );
}

#[test]
fn missing_else_falls_through() {
    let module = ir("program P; (int n) -> int f { if n { n = 2; } return n; }");
    let f = module.function("f").unwrap();
    let else_block = f.blocks().values().find(|b| b.label() == "else").unwrap();
    assert!(matches!(
        else_block.ops().values().collect::<Vec<_>>()[..],
        [IrOp::Jump(_)]
    ));
}

#[test]
fn terminated_branches_do_not_jump() {
    let module = ir(r#"
        program P;
        (int n) -> int sign {
            if n < 0 { return 0 - 1; } else { return 1; }
        }
    "#);
    let sign = module.function("sign").unwrap();
    for block in sign.blocks().values() {
        let last = block.ops().values().last().unwrap();
        match block.label() {
            "then" | "else" => assert!(matches!(last, IrOp::Return(Some(_)))),
            "ifcont" => assert_eq!(last, &IrOp::Unreachable),
            _ => {}
        }
    }
}

#[test]
fn statements_after_return_are_unreachable() {
    let module = ir("program P; func main { return; main(); }");
    assert_eq!(labels(&module, "main"), ["entry", "unreachable"]);
}

#[test]
fn implicit_conversions() {
    let text = ir(r#"
        program P;
        () -> float f { int i = 2; return i; }
        () -> int g { float x = 2.5; return x * 2; }
    "#)
    .to_string();
    assert!(text.contains("fcvt_from_sint"), "{text}");
    assert!(text.contains("fcvt_to_sint_sat"), "{text}");

    assert_eq!(
        errors("program P; func main { char c = 'a'; int i = c; }"),
        vec![LoweringError::UnsupportedConversion {
            from: ValueType::Int8,
            to: ValueType::Int32
        }]
    );
}

#[test]
fn errors_are_collected_per_function() {
    let errors = errors(r#"
        program P;
        func first { return nope; }
        () -> int fine { return 1; }
        func second { string s; }
        int *global_pointer;
    "#);
    assert_eq!(
        errors,
        vec![
            LoweringError::UnknownVariable("nope".to_string()),
            LoweringError::UnknownType("string".to_string()),
            LoweringError::Unsupported("pointer declaration"),
        ]
    );
}

#[test]
fn calls() {
    let module = ir(r#"
        program P;
        (int n) -> int fact { if n <= 1 { return 1; } return n * fact(n - 1); }
        func main { printf("%d\n", fact(3)); putchar('a'); }
    "#);
    let externs = module
        .externs()
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(externs, ["printf", "putchar"]);

    assert_eq!(
        errors("program P; (int a) -> int id { return a; } func main { id(1, 2); }"),
        vec![LoweringError::ArgumentCount {
            name: "id".to_string(),
            expected: 1,
            found: 2
        }]
    );
    assert_eq!(
        errors("program P; func main { later(); } func later { }"),
        vec![LoweringError::UnknownFunction("later".to_string())]
    );
    assert_eq!(
        errors("program P; func f { } func f { }"),
        vec![LoweringError::DuplicateFunction("f".to_string())]
    );
}

#[test]
fn semantic_checks() {
    assert_eq!(
        errors("program P; func main { float f = 1.0; while f { } }"),
        vec![LoweringError::InvalidCondition(ValueType::Float32)]
    );
    assert_eq!(
        errors("program P; () -> int f { return; }"),
        vec![LoweringError::MissingReturnValue(ValueType::Int32)]
    );
    assert_eq!(
        errors("program P; () -> void f { return 1; }"),
        vec![LoweringError::UnexpectedReturnValue]
    );
    assert_eq!(
        errors("program P; func v { } func main { int x = v(); }"),
        vec![LoweringError::VoidValue]
    );
    assert_eq!(
        errors("program P; int g = 1; int h = g + 1;"),
        vec![LoweringError::NonConstantInitializer("h".to_string())]
    );
    assert_eq!(
        errors("program P; func main { int a = 1; a = &a; }"),
        vec![LoweringError::Unsupported("reference-taking")]
    );
}

#[test]
fn locals_shadow_globals() {
    let module = ir("program P; float g = 1; () -> int f { int g = 4; return g; }");
    assert_eq!(module.globals()["g"], pcore_codegen::Constant::Float32(1.0));
    let text = module.function("f").unwrap().to_string();
    assert!(!text.contains("gv0"), "{text}");
}

#[test]
fn string_literals_become_module_data() {
    let module = ir(r#"
        program P;
        func main { printf("%d\n", 4); printf("done\n"); printf("%d\n", 5); }
    "#);
    assert_eq!(
        module.strings().iter().collect::<Vec<_>>(),
        ["%d\n", "done\n"]
    );
    let text = module.to_string();
    assert!(text.contains("string str0 = \"%d\\n\""), "{text}");
    assert!(text.contains("addr str1"), "{text}");

    let program = lower(
        program(r#"program P; func main { printf("hi"); }"#),
        StackBackend::new(),
    )
    .expect("could not lower");
    let text = program.to_string();
    assert!(text.contains(".string str0 = \"hi\""), "{text}");
    assert!(text.contains("LEA %t0, str0"), "{text}");
}

#[test]
fn external_arguments_are_checked() {
    assert_eq!(
        errors("program P; func main { printf(65); }"),
        vec![LoweringError::ArgumentType {
            name: "printf".to_string(),
            index: 0,
            expected: ValueType::Ptr,
            found: ValueType::Int32
        }]
    );
    assert_eq!(
        errors(r#"program P; func main { printf("%f", 1.5); }"#),
        vec![LoweringError::VariadicArgument {
            name: "printf".to_string(),
            ty: ValueType::Float32
        }]
    );
    assert_eq!(
        errors(r#"program P; func main { putchar("a"); }"#),
        vec![LoweringError::ArgumentType {
            name: "putchar".to_string(),
            index: 0,
            expected: ValueType::Int32,
            found: ValueType::Ptr
        }]
    );
    assert_eq!(
        errors(r#"program P; func main { int i = "a"; }"#),
        vec![LoweringError::UnsupportedConversion {
            from: ValueType::Ptr,
            to: ValueType::Int32
        }]
    );
    assert_eq!(
        errors(r#"program P; int g = "a";"#),
        vec![LoweringError::Unsupported("string literal in a constant expression")]
    );
}

#[test]
fn globals_are_declared_once() {
    let errors = errors("program P; int g = 1; int h; float g = 2;");
    assert_eq!(errors, vec![LoweringError::DuplicateGlobal("g".to_string())]);
    assert_eq!(errors[0].to_string(), "global `g` is already defined");
}
