//! End-to-end pipeline tests over the public facade.

use num_bigint::BigInt;
use vesper::ast::{
    AttributeNode, BlockNode, ExprNode, FieldDecl, FunctionDecl, FunctionKind, Item, ParamDecl,
    SourceUnit, StmtNode, StructDecl, TypeExpr,
};
use vesper::{CompileOptions, OpCode, compile, compile_units};
use vesper_core::Span;

fn unit(items: Vec<Item>) -> SourceUnit {
    let _ = env_logger::builder().is_test(true).try_init();
    SourceUnit::new("app", "app.vsp", items)
}

fn function(name: &str, params: Vec<(&str, &str)>, ret: Option<&str>, body: Vec<StmtNode>) -> Item {
    Item::Function(FunctionDecl {
        name: name.into(),
        kind: FunctionKind::Plain,
        params: params
            .into_iter()
            .map(|(n, t)| ParamDecl {
                name: n.into(),
                ty: TypeExpr::named(t),
                span: Span::default(),
            })
            .collect(),
        return_type: ret.map(TypeExpr::named),
        body: Some(BlockNode::new(body)),
        span: Span::default(),
    })
}

fn strukt(name: &str, extends: Option<&str>, items: Vec<Item>) -> Item {
    Item::Struct(StructDecl {
        name: name.into(),
        extends: extends.map(TypeExpr::named),
        items,
        span: Span::default(),
    })
}

fn field(name: &str, ty: &str, init: Option<ExprNode>) -> Item {
    Item::Field(FieldDecl {
        name: name.into(),
        ty: Some(TypeExpr::named(ty)),
        init,
        span: Span::default(),
    })
}

fn call(name: &str, args: Vec<ExprNode>) -> ExprNode {
    ExprNode::Invoke {
        callee: Box::new(ExprNode::ident(name)),
        args,
        span: Span::default(),
    }
}

fn pooled_names(image: &vesper::ModuleImage) -> Vec<String> {
    (0..image.constants.len() as u16)
        .filter_map(|i| image.constants.get(i))
        .filter_map(|c| match c {
            vesper_compiler::codegen::Constant::Name(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn empty_module_compiles_to_holder_only() {
    let image = compile(&[unit(vec![])]).unwrap();
    assert_eq!(image.types.len(), 1);
    assert!(image.types[0].holder);
    assert_eq!(image.types[0].name, "app");
}

#[test]
fn holder_houses_top_level_fields_and_functions() {
    let image = compile(&[unit(vec![
        field("counter", "i32", Some(ExprNode::int(7))),
        function("main", vec![], None, vec![]),
    ])])
    .unwrap();
    let holder = image.type_named("app").unwrap();
    assert!(holder.holder);
    assert_eq!(holder.fields.len(), 1);
    assert_eq!(holder.fields[0].name, "counter");
    assert!(holder.fields[0].is_static);
    assert!(holder.fields[0].initial.is_some());
    assert_eq!(holder.methods.len(), 1);
}

#[test]
fn structs_become_types_with_sequential_fields() {
    let image = compile(&[unit(vec![strukt(
        "Point",
        None,
        vec![field("x", "i32", None), field("y", "i32", None)],
    )])])
    .unwrap();
    let point = image.type_named("app.Point").unwrap();
    assert!(!point.holder);
    let names: Vec<_> = point.fields.iter().map(|f| f.name.clone()).collect();
    assert_eq!(names, vec!["x", "y"]);
}

#[test]
fn direct_inheritance_cycle_errors_without_hanging() {
    let err = compile(&[unit(vec![
        strukt("A", Some("B"), vec![]),
        strukt("B", Some("A"), vec![]),
    ])])
    .unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("cyclic dependency"), "{rendered}");
}

#[test]
fn comptime_literal_call_binds_the_first_declared_overload() {
    let image = compile(&[unit(vec![
        function("f", vec![("a", "i32")], None, vec![]),
        function("f", vec![("a", "i64")], None, vec![]),
        function(
            "main",
            vec![],
            None,
            vec![StmtNode::Expr(call("f", vec![ExprNode::int(5)]))],
        ),
    ])])
    .unwrap();
    let names = pooled_names(&image);
    assert!(names.contains(&"app.f(i32)".to_string()), "{names:?}");
    assert!(!names.contains(&"app.f(i64)".to_string()), "{names:?}");
}

#[test]
fn construction_invokes_the_constructor_in_place() {
    let point = strukt(
        "Point",
        None,
        vec![
            field("x", "i32", None),
            field("y", "i32", None),
            Item::Function(FunctionDecl {
                name: "init".into(),
                kind: FunctionKind::Constructor,
                params: vec![
                    ParamDecl {
                        name: "x".into(),
                        ty: TypeExpr::named("i32"),
                        span: Span::default(),
                    },
                    ParamDecl {
                        name: "y".into(),
                        ty: TypeExpr::named("i32"),
                        span: Span::default(),
                    },
                ],
                return_type: None,
                body: Some(BlockNode::default()),
                span: Span::default(),
            }),
        ],
    );
    let image = compile(&[unit(vec![
        point,
        function(
            "main",
            vec![],
            None,
            vec![
                StmtNode::Local {
                    name: "p".into(),
                    ty: None,
                    init: None,
                    span: Span::default(),
                },
                StmtNode::Assign {
                    target: ExprNode::ident("p"),
                    value: ExprNode::New {
                        ty: TypeExpr::named("Point"),
                        args: vec![ExprNode::int(1), ExprNode::int(2)],
                        span: Span::default(),
                    },
                    span: Span::default(),
                },
            ],
        ),
    ])])
    .unwrap();

    let names = pooled_names(&image);
    assert!(
        names.contains(&"app.Point.init(i32,i32)".to_string()),
        "{names:?}"
    );
    let main = image
        .type_named("app")
        .unwrap()
        .methods
        .iter()
        .find(|m| m.name.starts_with("app.main("))
        .unwrap();
    // The target's address is pushed for the implicit first argument.
    assert!(main.chunk.code().contains(&u8::from(OpCode::AddrLocal)));
    // The local is declared and typed; no separate allocate/assign pair
    // means no StoreLocal in the construction path.
    assert!(!main.chunk.code().contains(&u8::from(OpCode::StoreLocal)));
}

#[test]
fn virtual_dispatch_goes_through_the_table() {
    let image = compile(&[unit(vec![
        strukt(
            "Base",
            None,
            vec![
                Item::Attribute(AttributeNode::marker("virtual")),
                function("update", vec![], None, vec![]),
            ],
        ),
        function(
            "main",
            vec![("b", "Base")],
            None,
            vec![StmtNode::Expr(ExprNode::Invoke {
                callee: Box::new(ExprNode::Access {
                    base: Box::new(ExprNode::ident("b")),
                    member: "update".into(),
                    span: Span::default(),
                }),
                args: vec![],
                span: Span::default(),
            })],
        ),
    ])])
    .unwrap();
    let main = image
        .type_named("app")
        .unwrap()
        .methods
        .iter()
        .find(|m| m.name.starts_with("app.main("))
        .unwrap();
    assert!(main.chunk.code().contains(&u8::from(OpCode::CallVirtual)));
    // The method itself carries its dispatch slot.
    let update = image
        .type_named("app.Base")
        .unwrap()
        .methods
        .iter()
        .find(|m| m.name.starts_with("app.Base.update("))
        .unwrap();
    assert_eq!(update.vslot, Some(0));
}

#[test]
fn duplicate_declarations_are_reported_per_file() {
    let err = compile(&[unit(vec![
        field("x", "i32", None),
        field("x", "i64", None),
        strukt("A", Some("Ghost"), vec![]),
    ])])
    .unwrap_err();
    assert!(err.errors.len() >= 2);
    assert!(err.errors.iter().all(|(file, _)| file.as_deref() == Some("app.vsp")));
    let rendered = err.to_string();
    assert!(rendered.contains("duplicate declaration"));
    assert!(rendered.contains("cannot find reference 'Ghost'"));
}

#[test]
fn code_generation_is_gated_on_a_clean_sink() {
    // A semantic error in one function must abort the whole compile.
    let err = compile(&[unit(vec![
        function(
            "bad",
            vec![],
            None,
            vec![StmtNode::Expr(ExprNode::ident("nonesuch"))],
        ),
        function("good", vec![], None, vec![]),
    ])])
    .unwrap_err();
    assert!(err.to_string().contains("cannot find reference"));
}

#[test]
fn folding_crosses_call_argument_boundaries() {
    let image = compile(&[unit(vec![
        function("take", vec![("v", "u8")], None, vec![]),
        function(
            "main",
            vec![],
            None,
            vec![StmtNode::Expr(call(
                "take",
                vec![ExprNode::Binary {
                    op: vesper::ast::BinaryOp::Mul,
                    left: Box::new(ExprNode::int(6)),
                    right: Box::new(ExprNode::int(7)),
                    span: Span::default(),
                }],
            ))],
        ),
    ])])
    .unwrap();
    // 6 * 7 folds to 42 and lands in the pool as a plain constant.
    let has_42 = (0..image.constants.len() as u16)
        .filter_map(|i| image.constants.get(i))
        .any(|c| matches!(c, vesper_compiler::codegen::Constant::Uint(42)));
    assert!(has_42);
}

#[test]
fn dumps_are_written_only_when_enabled() {
    let dir = std::env::temp_dir().join(format!("vesper-dumps-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let symbols = dir.join("symbols.txt");
    let tree = dir.join("tree.txt");

    let options = CompileOptions {
        dump_symbols: Some(symbols.clone()),
        dump_tree: Some(tree.clone()),
        ..CompileOptions::default()
    };
    let units = [unit(vec![field("counter", "i32", None)])];
    compile_units(&units, &options).unwrap();

    let listing = std::fs::read_to_string(&symbols).unwrap();
    assert!(listing.contains("field\tapp.counter"));
    let rendered = std::fs::read_to_string(&tree).unwrap();
    assert!(rendered.contains("module app"));

    // Disabled by default: a fresh compile writes nothing new.
    std::fs::remove_file(&symbols).unwrap();
    compile_units(&units, &CompileOptions::default()).unwrap();
    assert!(!symbols.exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn typed_width_drives_instruction_selection() {
    let image = compile(&[unit(vec![function(
        "f",
        vec![("a", "u64"), ("b", "u64")],
        Some("u64"),
        vec![StmtNode::Return {
            value: Some(ExprNode::Binary {
                op: vesper::ast::BinaryOp::Add,
                left: Box::new(ExprNode::ident("a")),
                right: Box::new(ExprNode::ident("b")),
                span: Span::default(),
            }),
            span: Span::default(),
        }],
    )])])
    .unwrap();
    let f = image
        .type_named("app")
        .unwrap()
        .methods
        .iter()
        .find(|m| m.name.starts_with("app.f("))
        .unwrap();
    assert!(f.chunk.code().contains(&u8::from(OpCode::AddU64)));
    assert!(!f.chunk.code().contains(&u8::from(OpCode::AddI64)));
}

#[test]
fn comparison_of_literals_folds_to_a_boolean() {
    let image = compile(&[unit(vec![function(
        "f",
        vec![],
        None,
        vec![StmtNode::If {
            arms: vec![vesper::ast::IfArm {
                condition: ExprNode::Compare {
                    op: vesper::ast::CompareOp::Lt,
                    left: Box::new(ExprNode::int(2)),
                    right: Box::new(ExprNode::int(3)),
                    span: Span::default(),
                },
                body: BlockNode::default(),
            }],
            else_body: None,
            span: Span::default(),
        }],
    )])])
    .unwrap();
    let f = image
        .type_named("app")
        .unwrap()
        .methods
        .iter()
        .find(|m| m.name.starts_with("app.f("))
        .unwrap();
    // The folded condition loads a boolean directly; no compare survives.
    assert!(f.chunk.code().contains(&u8::from(OpCode::PushTrue)));
    assert!(!f.chunk.code().contains(&u8::from(OpCode::LtI32)));
}

#[test]
fn wide_literal_reaches_the_pool_as_sixteen_bytes() {
    let big = BigInt::parse_bytes(b"170141183460469231731687303715884105727", 10).unwrap();
    let image = compile(&[unit(vec![function(
        "f",
        vec![],
        Some("i128"),
        vec![StmtNode::Return {
            value: Some(ExprNode::Int {
                value: big,
                span: Span::default(),
            }),
            span: Span::default(),
        }],
    )])])
    .unwrap();
    let has_wide = (0..image.constants.len() as u16)
        .filter_map(|i| image.constants.get(i))
        .any(|c| matches!(c, vesper_compiler::codegen::Constant::Wide(_)));
    assert!(has_wide);
}
