//! End-to-end inference tests.
//!
//! Each test builds a small module with `AstBuilder`, runs the engine over
//! it and checks what the requestor was handed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gravy_ast::{
    AstBuilder, BinaryOp, Block, ClassNode, Expr, ExprId, ExprKind, ImportNode, MethodNode, ModuleNode, NumberKind,
    Parameter, Stmt, TypeRef,
};
use gravy_infer::diagnostics::{render_all, DiagnosticOptions};
use gravy_infer::{
    builtins, ClassInfo, Confidence, EnclosingElement, ExprQuery, InferenceEngine, InferenceOptions, InferenceOutcome,
    InferredNode, LookupContext, LookupError, LookupResult, TypeDescriptor, TypeLookup, TypeLookupResult, VisitStatus,
    VisitedNode,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn script(stmts: Vec<Stmt>) -> ModuleNode {
    ModuleNode::new("demo").with_class(ClassNode::script("demo.Script1", Block::new(stmts)))
}

fn run(module: &ModuleNode) -> (InferenceOutcome, Vec<InferredNode>) {
    init_tracing();
    InferenceEngine::new().collect(module).unwrap()
}

fn run_with(mut engine: InferenceEngine, module: &ModuleNode) -> (InferenceOutcome, Vec<InferredNode>) {
    init_tracing();
    engine.collect(module).unwrap()
}

fn node(nodes: &[InferredNode], id: ExprId) -> &InferredNode {
    nodes
        .iter()
        .find(|n| n.id == Some(id.0))
        .unwrap_or_else(|| panic!("no node delivered for {}", id))
}

fn ty_of(outcome: &InferenceOutcome, id: ExprId) -> String {
    outcome
        .type_of(id)
        .map(TypeDescriptor::to_string)
        .unwrap_or_else(|| panic!("no type recorded for {}", id))
}

fn string_type() -> TypeRef {
    TypeRef::named("java.lang.String")
}

fn list_of_strings() -> TypeRef {
    TypeRef::generic("java.util.List", vec![string_type()])
}

/// Ids of the variables a declaration introduces.
fn declared_ids(expr: &Expr) -> Vec<ExprId> {
    match &expr.kind {
        ExprKind::Declaration(decl) => decl.vars.iter().map(|v| v.var.id).collect(),
        other => panic!("expected a declaration, got {:?}", other),
    }
}

/// Labels of every delivered node, with a status chosen per label.
fn labels_with(module: &ModuleNode, status_for: impl Fn(&str) -> VisitStatus) -> (InferenceOutcome, Vec<String>) {
    init_tracing();
    let mut engine = InferenceEngine::new();
    let mut seen = Vec::new();
    let mut requestor = |node: VisitedNode<'_>, _: &TypeLookupResult, _: &EnclosingElement| {
        let label = node.describe();
        let status = status_for(&label);
        seen.push(label);
        status
    };
    let outcome = engine.infer(module, &mut requestor).unwrap();
    (outcome, seen)
}

// ── Basics ───────────────────────────────────────────────────────────

#[test]
fn delivery_order_for_a_declaration() {
    let b = AstBuilder::new();
    let module = script(vec![
        b.stmt(b.declare("x", None, Some(b.binary(b.int(1), BinaryOp::Plus, b.int(2))))),
        b.stmt(b.var("x")),
    ]);
    let (_, nodes) = run(&module);
    let trace: Vec<String> = nodes
        .iter()
        .map(|n| format!("{} {}: {} ({})", n.kind, n.label, n.ty, n.confidence))
        .collect();
    insta::assert_snapshot!(trace.join("\n"), @r"
    class demo.Script1: demo.Script1 (exact)
    method run: java.lang.Object (inferred)
    expr declare x: int (inferred)
    expr x: int (inferred)
    expr binary +: int (inferred)
    expr 1: int (exact)
    expr 2: int (exact)
    expr x: int (inferred)
    ");
}

#[test]
fn every_node_is_delivered_with_its_enclosing_member() {
    let b = AstBuilder::new();
    let module = script(vec![b.stmt(b.call_implicit("println", vec![b.string("hi")]))]);
    let (outcome, nodes) = run(&module);
    assert_eq!(outcome.status, VisitStatus::Continue);
    let exprs: Vec<&InferredNode> = nodes.iter().filter(|n| n.kind == "expr").collect();
    assert_eq!(exprs.len(), 3);
    assert!(exprs.iter().all(|n| n.enclosing == "demo.Script1.run"));
    let println = exprs.iter().find(|n| n.label == "println(..)").unwrap();
    assert_eq!(println.ty, "void");
    assert_eq!(println.declaring_type.as_deref(), Some("groovy.lang.Script"));
}

#[test]
fn unresolvable_reference_is_unknown_object() {
    let b = AstBuilder::new();
    let frob = b.call_implicit("frob", vec![]);
    let frob_id = frob.id;
    let module = ModuleNode::new("demo").with_class(
        ClassNode::new("demo.Worker").with_method(MethodNode::new("work", vec![], b.block(vec![b.stmt(frob)]))),
    );
    let (outcome, nodes) = run(&module);
    let frob = node(&nodes, frob_id);
    assert_eq!(frob.ty, "java.lang.Object");
    assert_eq!(frob.confidence, "unknown");
    assert_eq!(ty_of(&outcome, frob_id), "java.lang.Object");
}

#[test]
fn verified_stacks_are_balanced() {
    let b = AstBuilder::new();
    let module = script(vec![
        b.stmt(b.declare("names", Some(list_of_strings()), Some(b.list(vec![b.string("a")])))),
        b.stmt(b.call(
            b.var("names"),
            "each",
            vec![b.closure_it(vec![b.stmt(b.call(b.var("it"), "size", vec![]))])],
        )),
    ]);
    let options = InferenceOptions {
        verify_stacks: true,
        ..InferenceOptions::default()
    };
    let mut engine = InferenceEngine::new().with_options(options);
    assert!(engine.collect(&module).is_ok());
}

// ── Scopes and assignment ────────────────────────────────────────────

#[test]
fn nearest_binding_wins() {
    let b = AstBuilder::new();
    let inner = b.var("x");
    let outer = b.var("x");
    let (inner_id, outer_id) = (inner.id, outer.id);
    let body = b.block(vec![
        Stmt::Block(b.block(vec![b.stmt(b.declare("x", None, Some(b.int(1)))), b.stmt(inner)])),
        b.stmt(outer),
    ]);
    let method = MethodNode::new("greet", vec![Parameter::new("x", Some(string_type()))], body);
    let module = ModuleNode::new("demo").with_class(ClassNode::new("demo.Greeter").with_method(method));
    let (_, nodes) = run(&module);

    assert_eq!(node(&nodes, inner_id).ty, "int");
    let outer = node(&nodes, outer_id);
    assert_eq!(outer.ty, "java.lang.String");
    assert_eq!(outer.confidence, "exact");
    let param = nodes.iter().find(|n| n.kind == "parameter").unwrap();
    assert_eq!((param.label.as_str(), param.ty.as_str()), ("x", "java.lang.String"));
}

#[test]
fn assignment_narrows_untyped_but_keeps_declared() {
    let b = AstBuilder::new();
    let x_read = b.var("x");
    let s_read = b.var("s");
    let (x_id, s_id) = (x_read.id, s_read.id);
    let module = script(vec![
        b.stmt(b.declare("x", None, Some(b.int(1)))),
        b.stmt(b.assign(b.var("x"), b.string("a"))),
        b.stmt(x_read),
        b.stmt(b.declare("s", Some(string_type()), Some(b.string("a")))),
        b.stmt(b.assign(b.var("s"), b.int(1))),
        b.stmt(s_read),
    ]);
    let (_, nodes) = run(&module);

    let x = node(&nodes, x_id);
    assert_eq!(x.ty, "java.lang.String");
    assert_eq!(x.confidence, "inferred");
    let s = node(&nodes, s_id);
    assert_eq!(s.ty, "java.lang.String");
    assert_eq!(s.confidence, "exact");
}

#[test]
fn null_assignment_does_not_narrow() {
    let b = AstBuilder::new();
    let assign = b.assign(b.var("x"), b.null());
    let read = b.var("x");
    let (assign_id, read_id) = (assign.id, read.id);
    let module = script(vec![b.stmt(b.declare("x", None, Some(b.int(1)))), b.stmt(assign), b.stmt(read)]);
    let (outcome, _) = run(&module);
    assert_eq!(ty_of(&outcome, assign_id), "int");
    assert_eq!(ty_of(&outcome, read_id), "int");
}

#[test]
fn undeclared_script_variable_is_bound() {
    let b = AstBuilder::new();
    let read = b.var("count");
    let read_id = read.id;
    let module = script(vec![b.stmt(b.assign(b.var("count"), b.int(0))), b.stmt(read)]);
    let (_, nodes) = run(&module);
    let count = node(&nodes, read_id);
    assert_eq!(count.ty, "int");
    assert_eq!(count.confidence, "inferred");
}

#[test]
fn undeclared_method_variable_stays_unknown() {
    let b = AstBuilder::new();
    let read = b.var("stray");
    let read_id = read.id;
    let body = b.block(vec![b.stmt(b.assign(b.var("stray"), b.int(1))), b.stmt(read)]);
    let module = ModuleNode::new("demo")
        .with_class(ClassNode::new("demo.Worker").with_method(MethodNode::new("work", vec![], body)));
    let (_, nodes) = run(&module);
    assert_eq!(node(&nodes, read_id).confidence, "unknown");
}

#[test]
fn compound_assignment_rebinds() {
    let b = AstBuilder::new();
    let read = b.var("total");
    let read_id = read.id;
    let module = script(vec![
        b.stmt(b.declare("total", None, Some(b.int(0)))),
        b.stmt(b.binary(b.var("total"), BinaryOp::PlusAssign, b.number("1.5d", NumberKind::Double))),
        b.stmt(read),
    ]);
    let (outcome, _) = run(&module);
    assert_eq!(ty_of(&outcome, read_id), "double");
}

#[test]
fn tuple_declaration_takes_positions() {
    let b = AstBuilder::new();
    let decl = b.declare_tuple(&["a", "b"], b.list(vec![b.int(1), b.string("x")]));
    let ids = declared_ids(&decl);
    let read = b.var("b");
    let read_id = read.id;
    let module = script(vec![b.stmt(decl), b.stmt(read)]);
    let (outcome, _) = run(&module);
    assert_eq!(ty_of(&outcome, ids[0]), "int");
    assert_eq!(ty_of(&outcome, ids[1]), "java.lang.String");
    assert_eq!(ty_of(&outcome, read_id), "java.lang.String");
}

#[test]
fn for_in_variable_is_the_element_type() {
    let b = AstBuilder::new();
    let read = b.var("s");
    let read_id = read.id;
    let module = script(vec![
        b.stmt(b.declare("names", Some(list_of_strings()), None)),
        Stmt::ForIn {
            var: Parameter::untyped("s"),
            collection: b.var("names"),
            body: b.block(vec![b.stmt(read)]),
        },
    ]);
    let (_, nodes) = run(&module);
    assert_eq!(node(&nodes, read_id).ty, "java.lang.String");
    let param = nodes.iter().find(|n| n.kind == "parameter" && n.label == "s").unwrap();
    assert_eq!(param.ty, "java.lang.String");
}

#[test]
fn static_import_is_visible_unqualified() {
    let b = AstBuilder::new();
    let call = b.call_implicit("max", vec![b.int(1), b.int(2)]);
    let call_id = call.id;
    let module = script(vec![b.stmt(call)]).with_import(ImportNode::of_static("java.lang.Math", "max"));
    let (_, nodes) = run(&module);
    let max = node(&nodes, call_id);
    assert_eq!(max.ty, "int");
    assert_eq!(max.declaring_type.as_deref(), Some("java.lang.Math"));
}

#[test]
fn static_member_through_an_instance_is_unknown() {
    let b = AstBuilder::new();
    let on_class = b.call(b.class(string_type()), "valueOf", vec![b.int(1)]);
    let on_class_id = on_class.id;
    let on_instance = b.call(b.var("s"), "valueOf", vec![b.int(1)]);
    let on_instance_id = on_instance.id;
    let module = script(vec![
        b.stmt(b.declare("s", None, Some(b.string("x")))),
        b.stmt(on_class),
        b.stmt(on_instance),
    ]);
    let (_, nodes) = run(&module);
    assert_eq!(node(&nodes, on_class_id).ty, "java.lang.String");
    assert_ne!(node(&nodes, on_class_id).confidence, "unknown");
    assert_eq!(node(&nodes, on_instance_id).confidence, "unknown");
}

// ── Generics and closures ────────────────────────────────────────────

#[test]
fn field_type_follows_receiver_type_arguments() {
    let mut library = builtins::library();
    library.insert(ClassInfo::declare("demo.Box<T>").unwrap().field("List<T> items"));

    let b = AstBuilder::new();
    let items = b.prop(b.var("box"), "items");
    let first = b.call(b.prop(b.var("box"), "items"), "get", vec![b.int(0)]);
    let (items_id, first_id) = (items.id, first.id);
    let boxed = TypeRef::generic("demo.Box", vec![string_type()]);
    let module = script(vec![b.stmt(b.declare("box", Some(boxed), None)), b.stmt(items), b.stmt(first)]);

    let (outcome, _) = run_with(InferenceEngine::with_library(library), &module);
    assert_eq!(ty_of(&outcome, items_id), "java.util.List<java.lang.String>");
    assert_eq!(ty_of(&outcome, first_id), "java.lang.String");
}

#[test]
fn collect_sees_element_type_and_yields_a_typed_list() {
    let b = AstBuilder::new();
    let it = b.var("it");
    let it_id = it.id;
    let closure = b.closure_it(vec![b.stmt(b.call(it, "toUpperCase", vec![]))]);
    let closure_id = closure.id;
    let collect = b.call(b.var("names"), "collect", vec![closure]);
    let collect_id = collect.id;
    let module = script(vec![
        b.stmt(b.declare("names", Some(list_of_strings()), Some(b.list(vec![b.string("a")])))),
        b.stmt(collect),
    ]);
    let (outcome, nodes) = run(&module);

    assert_eq!(node(&nodes, it_id).ty, "java.lang.String");
    assert_eq!(ty_of(&outcome, closure_id), "groovy.lang.Closure<java.lang.String>");
    let collect = node(&nodes, collect_id);
    assert_eq!(collect.ty, "java.util.List<java.lang.String>");
    assert!(collect.extension);
    assert_eq!(collect.confidence, "inferred");
}

#[test]
fn map_each_seeds_key_and_value() {
    let b = AstBuilder::new();
    let value = b.var("v");
    let value_id = value.id;
    let ages = TypeRef::generic("java.util.Map", vec![string_type(), TypeRef::named("java.lang.Integer")]);
    let closure = b.closure(vec![Parameter::untyped("k"), Parameter::untyped("v")], vec![b.stmt(value)]);
    let module = script(vec![
        b.stmt(b.declare("ages", Some(ages), None)),
        b.stmt(b.call(b.var("ages"), "each", vec![closure])),
    ]);
    let (_, nodes) = run(&module);
    assert_eq!(node(&nodes, value_id).ty, "java.lang.Integer");
    let params: Vec<(&str, &str)> = nodes
        .iter()
        .filter(|n| n.kind == "parameter")
        .map(|n| (n.label.as_str(), n.ty.as_str()))
        .collect();
    assert_eq!(params, vec![("k", "java.lang.String"), ("v", "java.lang.Integer")]);
}

#[test]
fn with_block_resolves_against_the_delegate() {
    let b = AstBuilder::new();
    let upper = b.call_implicit("toUpperCase", vec![]);
    let upper_id = upper.id;
    let with = b.call(b.string("hi"), "with", vec![b.closure_it(vec![b.stmt(upper)])]);
    let with_id = with.id;
    let module = script(vec![b.stmt(with)]);
    let (_, nodes) = run(&module);
    let upper = node(&nodes, upper_id);
    assert_eq!(upper.ty, "java.lang.String");
    assert_eq!(upper.declaring_type.as_deref(), Some("java.lang.String"));
    assert_eq!(node(&nodes, with_id).ty, "java.lang.String");
}

#[test]
fn closure_return_type_and_call() {
    let b = AstBuilder::new();
    let closure = b.closure(vec![], vec![Stmt::Return(Some(b.int(1)))]);
    let closure_id = closure.id;
    let call = b.call_implicit("c", vec![]);
    let call_id = call.id;
    let module = script(vec![b.stmt(b.declare("c", None, Some(closure))), b.stmt(call)]);
    let (outcome, _) = run(&module);
    assert_eq!(ty_of(&outcome, closure_id), "groovy.lang.Closure<java.lang.Integer>");
    assert_eq!(ty_of(&outcome, call_id), "java.lang.Integer");
}

#[test]
fn use_block_brings_category_into_scope() {
    let mut library = builtins::library();
    library.insert(ClassInfo::new("demo.Shout").method("static String shout(String self)"));

    let b = AstBuilder::new();
    let inside = b.call(b.string("hi"), "shout", vec![]);
    let outside = b.call(b.string("hi"), "shout", vec![]);
    let (inside_id, outside_id) = (inside.id, outside.id);
    let module = script(vec![
        b.stmt(b.call_implicit(
            "use",
            vec![b.class(TypeRef::named("demo.Shout")), b.closure_it(vec![b.stmt(inside)])],
        )),
        b.stmt(outside),
    ]);
    let (_, nodes) = run_with(InferenceEngine::with_library(library), &module);

    let inside = node(&nodes, inside_id);
    assert_eq!(inside.ty, "java.lang.String");
    assert!(inside.extension);
    assert_eq!(inside.declaring_type.as_deref(), Some("demo.Shout"));
    assert_eq!(node(&nodes, outside_id).confidence, "unknown");
}

// ── Requestor control ────────────────────────────────────────────────

#[test]
fn cancel_branch_skips_only_the_subtree() {
    let b = AstBuilder::new();
    let size = b.call(b.var("names"), "size", vec![]);
    let size_id = size.id;
    let module = script(vec![
        b.stmt(b.declare("names", Some(list_of_strings()), Some(b.list(vec![b.string("a")])))),
        b.stmt(size),
        b.stmt(b.var("names")),
    ]);
    let (outcome, seen) = labels_with(&module, |label| {
        if label == "size(..)" {
            VisitStatus::CancelBranch
        } else {
            VisitStatus::Continue
        }
    });
    assert!(seen.iter().any(|l| l == "size(..)"));
    assert!(!seen.iter().any(|l| l == "'size'"));
    assert_eq!(seen.iter().filter(|l| *l == "names").count(), 2);
    assert_eq!(outcome.status, VisitStatus::CancelBranch);
    assert_eq!(ty_of(&outcome, size_id), "int");
}

#[test]
fn cancel_branch_on_a_class_skips_its_members() {
    let b = AstBuilder::new();
    let module = script(vec![b.stmt(b.int(1))]);
    let (_, seen) = labels_with(&module, |label| {
        if label == "demo.Script1" {
            VisitStatus::CancelBranch
        } else {
            VisitStatus::Continue
        }
    });
    assert_eq!(seen, vec!["demo.Script1"]);
}

#[test]
fn cancel_member_moves_on_to_the_next_member() {
    let b = AstBuilder::new();
    let worker = ClassNode::new("demo.Worker")
        .with_method(MethodNode::new("a", vec![], b.block(vec![b.stmt(b.int(1)), b.stmt(b.int(2))])))
        .with_method(MethodNode::new("b", vec![], b.block(vec![b.stmt(b.int(3))])));
    let module = ModuleNode::new("demo").with_class(worker);
    let (outcome, seen) = labels_with(&module, |label| {
        if label == "1" {
            VisitStatus::CancelMember
        } else {
            VisitStatus::Continue
        }
    });
    assert_eq!(seen, vec!["demo.Worker", "a", "1", "b", "3"]);
    assert_eq!(outcome.status, VisitStatus::CancelMember);
    assert!(!outcome.stopped());
}

#[test]
fn stop_visit_ends_the_run() {
    let b = AstBuilder::new();
    let module = ModuleNode::new("demo")
        .with_class(ClassNode::script("demo.First", b.block(vec![b.stmt(b.int(1))])))
        .with_class(ClassNode::script("demo.Second", b.block(vec![b.stmt(b.int(2))])));
    let (outcome, seen) = labels_with(&module, |label| {
        if label == "run" {
            VisitStatus::StopVisit
        } else {
            VisitStatus::Continue
        }
    });
    assert_eq!(seen, vec!["demo.First", "run"]);
    assert!(outcome.stopped());
}

/// `def count = 1; [1].each { count = 's' }; count`, returning the ids of
/// the `each` call, the assignment inside the closure and the final read.
fn narrowing_inside_each() -> (ModuleNode, ExprId, ExprId, ExprId) {
    let b = AstBuilder::new();
    let assign = b.assign(b.var("count"), b.string("s"));
    let assign_id = assign.id;
    let each = b.call(b.list(vec![b.int(1)]), "each", vec![b.closure_it(vec![b.stmt(assign)])]);
    let each_id = each.id;
    let read = b.var("count");
    let read_id = read.id;
    let module = script(vec![
        b.stmt(b.declare("count", None, Some(b.int(1)))),
        b.stmt(each),
        b.stmt(read),
    ]);
    (module, each_id, assign_id, read_id)
}

#[test]
fn skipped_subtree_does_not_narrow_outer_bindings() {
    let (module, _, _, read_id) = narrowing_inside_each();
    let (outcome, _) = labels_with(&module, |_| VisitStatus::Continue);
    assert_eq!(ty_of(&outcome, read_id), "java.lang.String");

    let (outcome, seen) = labels_with(&module, |label| {
        if label == "each(..)" {
            VisitStatus::CancelBranch
        } else {
            VisitStatus::Continue
        }
    });
    assert!(!seen.iter().any(|l| l == "binary ="));
    assert_eq!(seen.last().map(String::as_str), Some("count"));
    assert_eq!(ty_of(&outcome, read_id), "int");
}

#[test]
fn cancelled_node_keeps_its_own_binding() {
    let b = AstBuilder::new();
    let read = b.var("x");
    let read_id = read.id;
    let module = script(vec![b.stmt(b.declare("x", None, Some(b.string("a")))), b.stmt(read)]);
    let (outcome, seen) = labels_with(&module, |label| {
        if label == "declare x" {
            VisitStatus::CancelBranch
        } else {
            VisitStatus::Continue
        }
    });
    assert_eq!(seen, vec!["demo.Script1", "run", "declare x", "x"]);
    assert_eq!(ty_of(&outcome, read_id), "java.lang.String");
}

#[test]
fn stop_visit_discards_the_rest_of_the_statement() {
    let (module, each_id, assign_id, read_id) = narrowing_inside_each();
    let (outcome, seen) = labels_with(&module, |label| {
        if label == "each(..)" {
            VisitStatus::StopVisit
        } else {
            VisitStatus::Continue
        }
    });
    assert_eq!(seen.last().map(String::as_str), Some("each(..)"));
    assert!(outcome.stopped());
    assert!(outcome.type_of(each_id).is_some());
    assert!(outcome.type_of(assign_id).is_none());
    assert!(outcome.type_of(read_id).is_none());
}

#[test]
fn cancel_member_discards_the_rest_of_the_statement() {
    let b = AstBuilder::new();
    let assign = b.assign(b.var("x"), b.string("s"));
    let assign_id = assign.id;
    let each = b.call(b.list(vec![b.int(1)]), "each", vec![b.closure_it(vec![b.stmt(assign)])]);
    let each_id = each.id;
    let worker = ClassNode::new("demo.Worker")
        .with_method(MethodNode::new("a", vec![], b.block(vec![b.stmt(each), b.stmt(b.int(2))])))
        .with_method(MethodNode::new("b", vec![], b.block(vec![b.stmt(b.int(3))])));
    let module = ModuleNode::new("demo").with_class(worker);
    let (outcome, seen) = labels_with(&module, |label| {
        if label == "each(..)" {
            VisitStatus::CancelMember
        } else {
            VisitStatus::Continue
        }
    });
    assert_eq!(seen, vec!["demo.Worker", "a", "each(..)", "b", "3"]);
    assert!(outcome.type_of(each_id).is_some());
    assert!(outcome.type_of(assign_id).is_none());
}

// ── Custom resolvers ─────────────────────────────────────────────────

fn is_var(node: &Expr, name: &str) -> bool {
    matches!(&node.kind, ExprKind::Variable(n) if n == name)
}

/// Answers `magic` exactly.
struct Pinned;

impl TypeLookup for Pinned {
    fn name(&self) -> &str {
        "pinned"
    }

    fn lookup_expr(&self, node: &Expr, _: &ExprQuery, ctx: &LookupContext<'_>) -> LookupResult {
        Ok(is_var(node, "magic")
            .then(|| TypeLookupResult::new(TypeDescriptor::class("demo.Magic"), Confidence::Exact, ctx.scope)))
    }
}

/// Counts how often it is asked about `magic`; never answers.
struct Counting(Arc<AtomicUsize>);

impl TypeLookup for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn lookup_expr(&self, node: &Expr, _: &ExprQuery, _: &LookupContext<'_>) -> LookupResult {
        if is_var(node, "magic") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        Ok(None)
    }
}

/// Guesses every variable loosely.
struct Guessing;

impl TypeLookup for Guessing {
    fn name(&self) -> &str {
        "guessing"
    }

    fn lookup_expr(&self, node: &Expr, _: &ExprQuery, ctx: &LookupContext<'_>) -> LookupResult {
        Ok(matches!(node.kind, ExprKind::Variable(_)).then(|| {
            TypeLookupResult::new(TypeDescriptor::class("demo.Guess"), Confidence::LooselyInferred, ctx.scope)
        }))
    }
}

struct Failing;

impl TypeLookup for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn lookup_expr(&self, _: &Expr, _: &ExprQuery, _: &LookupContext<'_>) -> LookupResult {
        Err(LookupError::MissingClass {
            name: "demo.Nowhere".to_string(),
        })
    }
}

#[test]
fn confident_answer_ends_the_chain() {
    let asked = Arc::new(AtomicUsize::new(0));
    let engine = InferenceEngine::new().with_resolvers(vec![Box::new(Pinned), Box::new(Counting(Arc::clone(&asked)))]);
    assert_eq!(engine.resolver_names(), vec!["pinned", "counting", "category", "simple"]);

    let b = AstBuilder::new();
    let magic = b.var("magic");
    let magic_id = magic.id;
    let (_, nodes) = run_with(engine, &script(vec![b.stmt(magic)]));
    let magic = node(&nodes, magic_id);
    assert_eq!(magic.ty, "demo.Magic");
    assert_eq!(magic.confidence, "exact");
    assert_eq!(asked.load(Ordering::SeqCst), 0);
}

#[test]
fn loose_answers_yield_to_better_ones() {
    let engine = InferenceEngine::new().with_resolvers(vec![Box::new(Guessing)]);
    let b = AstBuilder::new();
    let unknown = b.var("mystery");
    let known = b.var("n");
    let (unknown_id, known_id) = (unknown.id, known.id);
    let module = script(vec![b.stmt(unknown), b.stmt(b.declare("n", None, Some(b.int(1)))), b.stmt(known)]);
    let (_, nodes) = run_with(engine, &module);

    let unknown = node(&nodes, unknown_id);
    assert_eq!((unknown.ty.as_str(), unknown.confidence.as_str()), ("demo.Guess", "loosely-inferred"));
    let known = node(&nodes, known_id);
    assert_eq!((known.ty.as_str(), known.confidence.as_str()), ("int", "inferred"));
}

#[test]
fn failing_resolver_is_ignored() {
    let engine = InferenceEngine::new().with_resolvers(vec![Box::new(Failing)]);
    let b = AstBuilder::new();
    let one = b.int(1);
    let one_id = one.id;
    let (_, nodes) = run_with(engine, &script(vec![b.stmt(one)]));
    assert_eq!(node(&nodes, one_id).ty, "int");
}

// ── Diagnostics ──────────────────────────────────────────────────────

#[test]
fn unresolved_references_render_as_warnings() {
    let source = "frob()\n";
    let b = AstBuilder::new();
    let frob = b.at(b.call_implicit("frob", vec![]), 0, 6);
    let module = ModuleNode::new("demo").with_class(
        ClassNode::new("demo.Worker").with_method(MethodNode::new("work", vec![], b.block(vec![b.stmt(frob)]))),
    );
    let (_, nodes) = run(&module);
    let rendered = render_all(&nodes, source, "worker.groovy", &DiagnosticOptions::colorless());
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("cannot infer the type of `frob(..)`"), "{}", rendered[0]);
    assert!(rendered[0].contains("demo.Worker.work"), "{}", rendered[0]);
}
