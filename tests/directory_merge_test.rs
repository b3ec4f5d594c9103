// Directory merging: sibling .tova files compile as one unit, with
// cross-file uniqueness validation.

use tova::merger;
use tova::parser::Parser;

fn merge(sources: &[(&str, &str)]) -> merger::MergeResult {
    let files = sources
        .iter()
        .map(|(name, source)| {
            (
                name.to_string(),
                Parser::parse_source(source, name).unwrap(),
            )
        })
        .collect();
    merger::merge_programs(files)
}

#[test]
fn test_merged_program_concatenates_in_order() {
    let result = merge(&[
        ("a.tova", "shared { fn first() { 1 } }"),
        ("b.tova", "shared { fn second() { 2 } }"),
    ]);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.program.body.len(), 2);
}

#[test]
fn test_duplicate_component_reports_both_files_and_lines() {
    // Scenario: two sibling files both declare component Header
    let result = merge(&[
        ("a.tova", "client {\n  component Header() { <h1>a</h1> }\n}"),
        ("b.tova", "client {\n  component Header() { <h1>b</h1> }\n}"),
    ]);
    assert_eq!(result.diagnostics.len(), 1);
    let message = &result.diagnostics[0].message;
    assert!(message.contains("Duplicate component 'Header'"));
    assert!(message.contains("a.tova:2"));
    assert!(message.contains("b.tova:2"));
}

#[test]
fn test_provenance_survives_merge() {
    let result = merge(&[
        ("a.tova", "shared { fn first() { 1 } }"),
        ("b.tova", "shared { fn second() { 2 } }"),
    ]);
    let locs: Vec<&str> = result
        .program
        .body
        .iter()
        .map(|item| item.loc().file.as_str())
        .collect();
    assert_eq!(locs, vec!["a.tova", "b.tova"]);
}

#[test]
fn test_server_singletons_unique_per_label_group() {
    let conflict = merge(&[
        ("a.tova", "server { auth { provider: \"jwt\" } }"),
        ("b.tova", "server { auth { provider: \"session\" } }"),
    ]);
    assert!(conflict
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Duplicate 'auth'")));

    // different labels are different groups
    let clean = merge(&[
        ("a.tova", "server { auth { provider: \"jwt\" } }"),
        ("b.tova", "server \"admin\" { auth { provider: \"session\" } }"),
    ]);
    assert!(clean.diagnostics.is_empty());
}

#[test]
fn test_every_public_export_defined_once() {
    let result = merge(&[
        ("a.tova", "shared { pub fn shared_util() { 1 } }"),
        ("b.tova", "shared { pub fn other_util() { 2 } }"),
    ]);
    assert!(result.diagnostics.is_empty());
    let table = tova::parser::ast::ModuleExportTable::from_program(&result.program);
    assert!(table.public_exports.contains("shared_util"));
    assert!(table.public_exports.contains("other_util"));
}

#[test]
fn test_route_conflict_with_group_prefix() {
    let result = merge(&[
        (
            "a.tova",
            "server {\n  fn a(req) { 1 }\n  routes \"/api\" { route GET \"/x\" => a }\n}",
        ),
        (
            "b.tova",
            "server {\n  fn b(req) { 2 }\n  route GET \"/api/x\" => b\n}",
        ),
    ]);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Duplicate route GET /api/x")));
}
