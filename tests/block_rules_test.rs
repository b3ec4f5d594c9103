// Block directives restrict their permitted forms; violations are parse
// errors naming the block.

use tova::parser::Parser;

#[test]
fn test_state_rejected_outside_client() {
    let err = Parser::parse_source("server {\n  state n = 0\n}", "t.tova").unwrap_err();
    assert!(err.message.contains("'state'"));
    assert!(err.message.contains("server block"));
    assert!(err.hint.is_some());
}

#[test]
fn test_route_rejected_outside_server() {
    let err = Parser::parse_source(
        "client {\n  route GET \"/x\" => handler\n}",
        "t.tova",
    )
    .unwrap_err();
    assert!(err.message.contains("'route'"));
    assert!(err.message.contains("client block"));
}

#[test]
fn test_component_rejected_in_shared() {
    let err = Parser::parse_source(
        "shared {\n  component Header() { <h1>x</h1> }\n}",
        "t.tova",
    )
    .unwrap_err();
    assert!(err.message.contains("'component'"));
    assert!(err.message.contains("shared block"));
}

#[test]
fn test_effect_rejected_at_top_level() {
    let err = Parser::parse_source("effect { print(1) }", "t.tova").unwrap_err();
    assert!(err.message.contains("'effect'"));
    assert!(err.message.contains("top level"));
}

#[test]
fn test_route_requires_known_method() {
    let err = Parser::parse_source(
        "server {\n  route FETCH \"/x\" => handler\n}",
        "t.tova",
    )
    .unwrap_err();
    assert!(err.message.contains("HTTP method"));
}

#[test]
fn test_server_form_words_stay_identifiers_elsewhere() {
    // `cache`, `auth`, `env` are contextual: plain names outside server blocks
    let program = Parser::parse_source(
        "fn f(cache, auth) { cache + auth }\nlet env = 1",
        "t.tova",
    )
    .unwrap();
    assert_eq!(program.body.len(), 2);
}

#[test]
fn test_import_specifier_local_defaults_to_imported() {
    let program =
        Parser::parse_source("import { a, b as c } from \"./m.tova\"", "t.tova").unwrap();
    match &program.body[0] {
        tova::parser::ast::Item::Import(import) => {
            assert_eq!(import.specifiers[0].local, "a");
            assert_eq!(import.specifiers[1].local, "c");
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_every_node_carries_a_location() {
    let program = Parser::parse_source(
        "shared {\n  fn f() { 1 }\n}\n\nclient {\n  state n = 0\n}",
        "t.tova",
    )
    .unwrap();
    for item in &program.body {
        let loc = item.loc();
        assert_eq!(loc.file, "t.tova");
        assert!(loc.line >= 1);
        assert!(loc.column >= 1);
    }
}
