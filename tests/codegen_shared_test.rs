// Shared artifact emission: type factories, pattern compilation, the
// stdlib tree-shake, and the `?` propagation wrapper.

use tova::compile_source;

fn shared_code(source: &str) -> String {
    let (outputs, diagnostics) = compile_source(source, "app.tova", "app").unwrap();
    assert!(
        !diagnostics
            .iter()
            .any(|d| d.severity == tova::Severity::Error),
        "unexpected errors: {:?}",
        diagnostics
    );
    outputs.shared.expect("expected a shared artifact").code
}

#[test]
fn test_type_variants_become_tagged_factories() {
    let code = shared_code(
        r#"
shared {
    type Shape { Circle(r: Float), Square(s: Float) }
}
"#,
    );
    assert!(code.contains(
        "function Circle(r) { return Object.freeze({ __tag: \"Circle\", r, __values: [r] }); }"
    ));
    assert!(code.contains("const Shape = Object.freeze({ Circle, Square });"));
}

#[test]
fn test_match_compiles_to_tag_dispatch() {
    // Scenario: area(Circle(2)) -> 12.56, area(Square(3)) -> 9
    let code = shared_code(
        r#"
shared {
    type Shape { Circle(r: Float), Square(s: Float) }
    fn area(x) {
        match x {
            Circle(r) => 3.14 * r * r,
            Square(s) => s * s
        }
    }
}
"#,
    );
    assert!(code.contains("((__match) => {"));
    assert!(code.contains("__match.__tag === \"Circle\""));
    assert!(code.contains("const r = __match.__values[0];"));
    assert!(code.contains("return ((3.14 * r) * r);"));
}

#[test]
fn test_string_concat_pattern() {
    let code = shared_code(
        r#"
shared {
    fn kind(s) {
        match s {
            "user:" ++ id => id,
            _ => "unknown"
        }
    }
}
"#,
    );
    assert!(code.contains("__match.startsWith(\"user:\")"));
    assert!(code.contains("const id = __match.slice(5);"));
}

#[test]
fn test_range_and_guard_patterns() {
    let code = shared_code(
        r#"
shared {
    fn bucket(n) {
        match n {
            0 => "zero",
            1..=9 => "digit",
            x if x < 100 => "small",
            _ => "big"
        }
    }
}
"#,
    );
    assert!(code.contains("__match === 0"));
    assert!(code.contains("__match >= 1 && __match <= 9"));
    assert!(code.contains("if ((x < 100)) {"));
}

#[test]
fn test_stdlib_tree_shaking() {
    let with_sorted = shared_code("shared {\n  fn top(xs) { sorted(xs) }\n}");
    assert!(with_sorted.contains("function sorted"));

    let without_sorted = shared_code("shared {\n  fn top(xs) { xs }\n}");
    assert!(!without_sorted.contains("function sorted"));
    // the propagation fragment is always present
    assert!(without_sorted.contains("function __propagate"));
}

#[test]
fn test_propagate_wraps_function_body() {
    let code = shared_code(
        r#"
shared {
    fn load(path) {
        let text = read_file(path)?
        Ok(len(text))
    }
}
"#,
    );
    assert!(code.contains("return __try(() => {"));
    assert!(code.contains("__propagate(read_file(path))"));
}

#[test]
fn test_pub_translates_to_export() {
    let code = shared_code("shared {\n  pub fn visible() { 1 }\n  fn hidden() { 2 }\n}");
    assert!(code.contains("export function visible()"));
    // non-pub names still export for the app's sibling artifacts
    assert!(code.contains("export { hidden,"));
}

#[test]
fn test_pipe_operator_inserts_first_argument() {
    let code = shared_code(
        r#"
shared {
    fn tidy(xs) { xs |> filter(x => x > 0) |> sorted }
}
"#,
    );
    assert!(code.contains("sorted(filter(xs, (x) => ((x > 0))))"));
}

#[test]
fn test_template_strings() {
    let code = shared_code("shared {\n  fn greet(name) { \"hello {name}!\" }\n}");
    assert!(code.contains("return `hello ${name}!`;"));
}

#[test]
fn test_module_file_emits_single_js() {
    let (outputs, _) = compile_source("pub fn helper() { 1 }", "util.tova", "util").unwrap();
    assert!(outputs.is_module);
    let code = outputs.shared.unwrap().code;
    assert!(code.contains("export function helper()"));
    assert!(outputs.server.is_none() && outputs.client.is_none());
}

#[test]
fn test_membership_operator() {
    let code = shared_code("shared {\n  fn has(xs, x) { x in xs }\n}");
    assert!(code.contains("contains(xs, x)"));
    assert!(code.contains("function contains"));
}

#[test]
fn test_test_and_bench_blocks_emit() {
    let source = r#"
shared {
    fn double(n) { n * 2 }
}

test "doubling" {
    print(double(2))
}

bench "double throughput" {
    double(21)
}
"#;
    let (outputs, _) = compile_source(source, "app.tova", "app").unwrap();
    let test_code = outputs.test.unwrap().code;
    assert!(test_code.contains("test(\"doubling\", async () => {"));
    let bench_code = outputs.bench.unwrap().code;
    assert!(bench_code.contains("__bench(\"double throughput\", () => {"));
    assert!(bench_code.contains("TOVA_BENCH_ITERS"));
}
