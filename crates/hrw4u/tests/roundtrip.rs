//! Compile to directives, read them back, and compare with the source.

use hrw4u::ir::{CompareOp, Expr, Stmt};
use hrw4u::{
    Context, Options, Program, StructureEq, Tables, compile_source, decompile, read_directives,
    read_hrw4u,
};

fn with_ctx<T>(f: impl FnOnce(&Context<'_>) -> T) -> T {
    let tables = Tables::new();
    let options = Options::default();
    let ctx = Context::new(&tables, &options, "roundtrip.hrw4u");
    f(&ctx)
}

/// Source program, and the program rebuilt from its directives.
fn roundtrip(source: &str) -> (Program, Program) {
    with_ctx(|ctx| {
        let compiled = compile_source(source, ctx);
        assert!(compiled.errors.is_empty(), "{:?}", compiled.errors);
        let rebuilt = read_directives(&compiled.output, ctx);
        assert!(rebuilt.errors.is_empty(), "{:?}", rebuilt.errors);
        (read_hrw4u(source).unwrap(), rebuilt.output)
    })
}

fn first_condition(program: &Program) -> &Expr {
    match &program.sections[0].body[0] {
        Stmt::If(cond) => &cond.branches[0].condition,
        other => panic!("expected a conditional, got {other:?}"),
    }
}

#[test]
fn test_and_chain_roundtrip() {
    let (source, rebuilt) = roundtrip(
        r#"REMAP {
    if inbound.method == "GET" && inbound.req.X-A == "1" && inbound.status > 199 {
        no-op;
    }
}"#,
    );
    assert!(source.structure_eq(&rebuilt));
    // Folded to the right
    assert!(matches!(first_condition(&rebuilt), Expr::And(_, rhs) if matches!(**rhs, Expr::And(..))));
}

#[test]
fn test_or_roundtrip() {
    let (source, rebuilt) = roundtrip(
        r#"REMAP {
    if inbound.method == "GET" || inbound.method == "HEAD" {
        no-op;
    }
}"#,
    );
    assert!(source.structure_eq(&rebuilt));
    assert!(matches!(first_condition(&rebuilt), Expr::Or(..)));
}

#[test]
fn test_grouped_or_roundtrip() {
    let (source, rebuilt) = roundtrip(
        r#"REMAP {
    if inbound.method == "GET" && inbound.url.path ~ /^\/api/ || inbound.req.X-Force {
        no-op;
    }
    if inbound.method == "GET" && (inbound.req.X-A || inbound.req.X-B) {
        no-op;
    }
}"#,
    );
    assert!(source.structure_eq(&rebuilt));
}

#[test]
fn test_negation_roundtrip() {
    let (source, rebuilt) = roundtrip(
        r#"READ_REQUEST {
    if !(inbound.method == "GET") {
        no-op;
    }
}"#,
    );
    assert!(source.structure_eq(&rebuilt));
    assert!(matches!(
        first_condition(&rebuilt),
        Expr::Compare(cmp) if cmp.op == CompareOp::Ne
    ));
    let text = with_ctx(|ctx| {
        let compiled = compile_source(r#"READ_REQUEST { if !(inbound.method == "GET") { no-op; } }"#, ctx);
        decompile(&compiled.output, ctx).output
    });
    assert!(text.contains(r#"if inbound.method != "GET" {"#), "{text}");
}

#[test]
fn test_statements_and_branches_roundtrip() {
    let (source, rebuilt) = roundtrip(
        r#"REMAP {
    inbound.req.X-Foo = "bar";
    inbound.req.X-Bar += "baz";
    inbound.url.path = "/new";
    if inbound.url.host == "a.example" with NOCASE {
        keep_query("id");
        if inbound.status >= 200 {
            inbound.req.X-Gone = "";
        }
    } elif inbound.url.host in ["b.example", "c.example"] {
        set-redirect(302, "https://{inbound.url.host}/");
    } else {
        break;
    }
    counter(hits);
}
SEND_RESPONSE {
    inbound.resp.X-Done = "{inbound.method}";
}"#,
    );
    assert!(source.structure_eq(&rebuilt));
}

#[test]
fn test_variable_slot_is_synthesized() {
    let text = with_ctx(|ctx| {
        let compiled = compile_source(
            "VARS { flagA: boolean; flagB: boolean; }\nREMAP { if flagB { no-op; } }",
            ctx,
        );
        assert!(compiled.output.contains(&"cond %{STATE-FLAG:1}".to_string()));
        decompile(&compiled.output, ctx).output
    });
    insta::assert_snapshot!(text, @r"
    VARS {
        bool_1: bool @1;
    }

    REMAP {
        if bool_1 {
            no-op;
        }
    }
    ");
}

#[test]
fn test_decompiled_text() {
    let text = with_ctx(|ctx| {
        let compiled = compile_source(
            r#"REMAP {
    inbound.req.X-Foo = "bar";
    if inbound.method == "GET" && inbound.url.path ~ /^\/api/ || inbound.req.X-Force {
        keep_query("id");
    } elif inbound.status >= 200 {
        inbound.req.X-Gone = "";
    } else {
        break;
    }
}
SEND_RESPONSE {
    inbound.resp.X-Done = "{inbound.method}";
}"#,
            ctx,
        );
        assert!(compiled.errors.is_empty(), "{:?}", compiled.errors);
        decompile(&compiled.output, ctx).output
    });
    insta::assert_snapshot!(text, @r#"
    REMAP {
        inbound.req.X-Foo = "bar";

        if inbound.method == "GET" && inbound.url.path ~ /^\/api/ || inbound.req.X-Force {
            keep_query("id");
        } elif inbound.status >= 200 {
            inbound.req.X-Gone = "";
        } else {
            break;
        }
    }

    SEND_RESPONSE {
        inbound.resp.X-Done = "{inbound.method}";
    }
    "#);
}
