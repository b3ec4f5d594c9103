// Client artifact emission: signal wiring, reactivity, JSX, and the
// RPC bridge surface.

use tova::compile_source;

fn client_code(source: &str) -> String {
    let (outputs, diagnostics) = compile_source(source, "app.tova", "app").unwrap();
    assert!(
        !diagnostics
            .iter()
            .any(|d| d.severity == tova::Severity::Error),
        "unexpected errors: {:?}",
        diagnostics
    );
    outputs.client.expect("expected a client artifact").code
}

#[test]
fn test_state_becomes_signal_pair() {
    let code = client_code("client {\n  state n = 0\n}");
    assert!(code.contains("const [n, __set_n] = create_signal(0);"));
}

#[test]
fn test_signal_reads_and_writes_rewrite() {
    let code = client_code(
        r#"
client {
    state n = 0
    fn bump() { n = n + 1 }
    fn scale() { n *= 2 }
}
"#,
    );
    assert!(code.contains("__set_n((n() + 1))"));
    assert!(code.contains("__set_n(n() * 2)"));
}

#[test]
fn test_computed_is_lazy_and_registered() {
    let code = client_code("client {\n  state n = 1\n  computed doubled = n * 2\n}");
    assert!(code.contains("const doubled = create_computed(() => ((n() * 2)));"));
}

#[test]
fn test_effect_tracks_signal() {
    // Scenario: after mount print(0); after set_n(5) print(5)
    let code = client_code("client {\n  state n = 0\n  effect { print(n) }\n}");
    assert!(code.contains("create_effect(() => {"));
    assert!(code.contains("print(n());"));
}

#[test]
fn test_client_embeds_runtime() {
    let code = client_code("client { state n = 0 }");
    assert!(code.contains("function create_signal"));
    assert!(code.contains("function create_effect"));
    assert!(code.contains("function longest_increasing_subsequence"));
    assert!(code.contains("function hydrate"));
}

#[test]
fn test_component_compiles_to_props_function() {
    let code = client_code(
        r#"
client {
    component Greeting(name) {
        <h1>hello {name}</h1>
    }
}
"#,
    );
    assert!(code.contains("function Greeting(props)"));
    assert!(code.contains("const { name } = props;"));
    assert!(code.contains("h(\"h1\""));
}

#[test]
fn test_jsx_attrs_and_events() {
    let code = client_code(
        r#"
client {
    state count = 0
    fn increment() { count += 1 }
    component Counter() {
        <button on:click={increment} class:active={count > 0}>{count}</button>
    }
}
"#,
    );
    assert!(code.contains("onclick: increment"));
    assert!(code.contains("\"class:active\": () => ((count() > 0))"));
    // dynamic child is a thunk so the runtime re-renders it
    assert!(code.contains("() => (count())"));
}

#[test]
fn test_jsx_for_injects_key() {
    let code = client_code(
        r#"
client {
    state items = []
    component List() {
        <ul>for item in items key={item.id} { <li>{item.name}</li> }</ul>
    }
}
"#,
    );
    assert!(code.contains("key: item.id"));
    assert!(code.contains("Array.from(items()).map((item) =>"));
}

#[test]
fn test_jsx_if_is_dynamic_block() {
    let code = client_code(
        r#"
client {
    state loading = true
    component App() {
        <div>if loading { <span>wait</span> } else { <span>done</span> }</div>
    }
}
"#,
    );
    assert!(code.contains("() => ((loading()) ?"));
}

#[test]
fn test_rpc_call_emission() {
    // Scenario: server.add(2, 3) issues POST /rpc/add with {__args:[2,3]}
    let code = client_code(
        r#"
client {
    fn total() { server.add(2, 3) }
}
"#,
    );
    assert!(code.contains("rpc(\"add\", [2, 3])"));
}

#[test]
fn test_store_compiles_to_module_object() {
    let code = client_code(
        r#"
client {
    store Cart {
        state items = []
        fn add(item) { items = push(items, item) }
    }
}
"#,
    );
    assert!(code.contains("const Cart = (() => {"));
    assert!(code.contains("get items() { return items(); }"));
    assert!(code.contains("set items(__v) { __set_items(__v); }"));
}

#[test]
fn test_app_component_mounts() {
    let code = client_code(
        r#"
client {
    component App() {
        <div>hi</div>
    }
}
"#,
    );
    assert!(code.contains("mount(h(App, {}), __container);"));
    assert!(code.contains("hydrate(h(App, {}), __container);"));
}

#[test]
fn test_bind_directive_pairs_getter_setter() {
    let code = client_code(
        r#"
client {
    state name = ""
    component Form() {
        <input bind:value={name}/>
    }
}
"#,
    );
    assert!(code.contains("\"bind:value\": [name, __set_name]"));
}

#[test]
fn test_labeled_client_block() {
    let source = "client \"admin\" {\n  state n = 0\n}";
    let (outputs, _) = compile_source(source, "app.tova", "app").unwrap();
    assert!(outputs.client.is_none());
    assert!(outputs.clients.contains_key("admin"));
}
