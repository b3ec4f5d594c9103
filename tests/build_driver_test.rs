// End-to-end build driver tests: on-disk projects in temp directories,
// artifact naming, the incremental cache, import resolution, and
// cross-file visibility.

use std::fs;
use std::path::Path;
use tova::{build, BuildOptions};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn options(root: &Path) -> BuildOptions {
    BuildOptions {
        path: root.join("src"),
        out: root.join("build"),
        strict: false,
        check_only: false,
    }
}

#[test]
fn test_app_file_emits_artifact_set() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/app.tova"),
        r#"
shared {
    fn double(n) { n * 2 }
}

server {
    fn add(a, b) { a + b }
    route POST "/add" => add
}

client {
    state n = 0
    effect { print(double(n)) }
}
"#,
    );

    let summary = build(&options(dir.path())).unwrap();
    assert!(!summary.has_errors(), "diags: {:?}", summary.diagnostics);
    assert_eq!(summary.compiled, 1);

    let out = dir.path().join("build");
    assert!(out.join("app.shared.js").exists());
    assert!(out.join("app.server.js").exists());
    assert!(out.join("app.client.js").exists());
    assert!(out.join("app.shared.js.map").exists());

    // source map footer and v3 map content
    let client = fs::read_to_string(out.join("app.client.js")).unwrap();
    assert!(client.contains("//# sourceMappingURL=app.client.js.map"));
    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("app.client.js.map")).unwrap()).unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["sources"][0], "app.tova");
}

#[test]
fn test_module_file_emits_plain_js() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/util/strings.tova"),
        "pub fn shout(s) { upper(s) }",
    );
    let summary = build(&options(dir.path())).unwrap();
    assert!(!summary.has_errors());
    assert!(dir.path().join("build/util/strings.js").exists());
}

#[test]
fn test_incremental_rebuild_skips_unchanged() {
    // Scenario: second build with no edits reports every unit cached;
    // touching one file recompiles only its group
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/app.tova"),
        "client { state n = 0 }",
    );
    write(
        &dir.path().join("src/lib/util.tova"),
        "pub fn id(x) { x }",
    );

    let first = build(&options(dir.path())).unwrap();
    assert_eq!(first.compiled, 2);
    assert_eq!(first.cached, 0);

    let second = build(&options(dir.path())).unwrap();
    assert_eq!(second.compiled, 0);
    assert_eq!(second.cached, 2);

    write(
        &dir.path().join("src/lib/util.tova"),
        "pub fn id(x) { x }\npub fn twice(x) { x * 2 }",
    );
    let third = build(&options(dir.path())).unwrap();
    assert_eq!(third.compiled, 1);
    assert_eq!(third.cached, 1);
}

#[test]
fn test_directory_group_merges_and_names_by_dir() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/widgets/header.tova"),
        "client { component Header() { <h1>hi</h1> } }",
    );
    write(
        &dir.path().join("src/widgets/footer.tova"),
        "client { component Footer() { <p>bye</p> } }",
    );
    let summary = build(&options(dir.path())).unwrap();
    assert!(!summary.has_errors(), "diags: {:?}", summary.diagnostics);

    let client = dir.path().join("build/widgets/widgets.client.js");
    assert!(client.exists());
    let code = fs::read_to_string(client).unwrap();
    assert!(code.contains("function Header(props)"));
    assert!(code.contains("function Footer(props)"));

    // merged map carries both sources
    let map: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("build/widgets/widgets.client.js.map")).unwrap(),
    )
    .unwrap();
    let sources = map["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
}

#[test]
fn test_merge_conflict_fails_group() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/a.tova"),
        "client { component Header() { <h1>a</h1> } }",
    );
    write(
        &dir.path().join("src/b.tova"),
        "client { component Header() { <h1>b</h1> } }",
    );
    let summary = build(&options(dir.path())).unwrap();
    assert!(summary.has_errors());
    assert_eq!(summary.failed, 1);
    assert!(summary
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Duplicate component 'Header'")));
}

#[test]
fn test_import_rewriting_module_and_app() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/lib/util.tova"),
        "pub fn id(x) { x }",
    );
    write(
        &dir.path().join("src/pages/main.tova"),
        r#"
import { id } from "../lib/util.tova"

client {
    state n = 0
    computed same = id(n)
}
"#,
    );
    let summary = build(&options(dir.path())).unwrap();
    assert!(!summary.has_errors(), "diags: {:?}", summary.diagnostics);
    let code =
        fs::read_to_string(dir.path().join("build/pages/main.client.js")).unwrap();
    assert!(code.contains("import { id } from \"../lib/util.js\";"));
}

#[test]
fn test_private_import_reports_pub_remedy() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/lib/util.tova"),
        "fn secret(x) { x }",
    );
    write(
        &dir.path().join("src/pages/main.tova"),
        "import { secret } from \"../lib/util.tova\"\n\nclient { state n = 0 }",
    );
    let summary = build(&options(dir.path())).unwrap();
    assert!(summary.has_errors());
    let diag = summary
        .diagnostics
        .iter()
        .find(|d| d.code == "E203")
        .expect("private-access diagnostic");
    assert!(diag.fix.as_deref().unwrap().contains("pub"));
}

#[test]
fn test_circular_import_reports_chain() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/a/one.tova"),
        "import { two } from \"../b/two.tova\"\n\npub fn one() { 1 }",
    );
    write(
        &dir.path().join("src/b/two.tova"),
        "import { one } from \"../a/one.tova\"\n\npub fn two() { 2 }",
    );
    let summary = build(&options(dir.path())).unwrap();
    assert!(summary.has_errors());
    let diag = summary
        .diagnostics
        .iter()
        .find(|d| d.code == "E402")
        .expect("circular-import diagnostic");
    assert!(diag.message.contains("circular import"));
    assert!(diag.message.contains("one.tova"));
    assert!(diag.message.contains("two.tova"));
}

#[test]
fn test_check_only_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/app.tova"),
        "client { state n = 0 }",
    );
    let summary = build(&BuildOptions {
        path: dir.path().join("src"),
        out: dir.path().join("build"),
        strict: false,
        check_only: true,
    })
    .unwrap();
    assert!(!summary.has_errors());
    assert!(!dir.path().join("build").exists());
}

#[test]
fn test_strict_mode_promotes_warnings_to_failure() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("src/app.tova"),
        "shared {\n  fn f() {\n    let unused = 1\n    2\n  }\n}",
    );
    let lax = build(&options(dir.path())).unwrap();
    assert!(!lax.has_errors());

    fs::remove_dir_all(dir.path().join("build")).ok();
    let strict = build(&BuildOptions {
        path: dir.path().join("src"),
        out: dir.path().join("build"),
        strict: true,
        check_only: false,
    })
    .unwrap();
    assert!(strict.has_errors());
}

#[test]
fn test_parse_error_is_fatal_for_file_with_snippet() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("src/bad.tova"), "let = 3");
    let summary = build(&options(dir.path())).unwrap();
    assert!(summary.has_errors());
    assert_eq!(summary.failed, 1);
    let diag = summary
        .diagnostics
        .iter()
        .find(|d| d.code == "E102")
        .expect("parse diagnostic");
    assert!(diag.snippet.is_some());
}
