// Server artifact emission: the dispatcher, route tables, RPC
// endpoints, and the environment-driven listener port.

use tova::compile_source;

fn server_code(source: &str) -> String {
    let (outputs, diagnostics) = compile_source(source, "app.tova", "app").unwrap();
    assert!(
        !diagnostics
            .iter()
            .any(|d| d.severity == tova::Severity::Error),
        "unexpected errors: {:?}",
        diagnostics
    );
    outputs.server.expect("expected a server artifact").code
}

#[test]
fn test_route_registration() {
    let code = server_code(
        r#"
server {
    fn list_users(req) { [] }
    route GET "/users" => list_users
}
"#,
    );
    assert!(code.contains("__route(\"GET\", \"/users\", [], list_users);"));
    assert!(code.contains("function __dispatch"));
}

#[test]
fn test_rpc_endpoint_for_every_server_fn() {
    // Scenario: fn add gets POST /rpc/add accepting {__args:[a, b]} and
    // replying {result}
    let code = server_code(
        r#"
server {
    fn add(a, b) { a + b }
    route POST "/add" => add
}
"#,
    );
    assert!(code.contains("__route(\"POST\", \"/rpc/add\", [], __rpc_handler(add));"));
    assert!(code.contains("Array.isArray(body.__args) ? body.__args : [body]"));
    assert!(code.contains("{ __json: { result } }"));
}

#[test]
fn test_default_port_from_env() {
    let code = server_code("server {\n  fn ping(req) { \"pong\" }\n}");
    assert!(code.contains("const __port = Number(process.env.PORT || 3000);"));
    assert!(code.contains("__serve(__port);"));
}

#[test]
fn test_labeled_server_port_and_artifact() {
    let source = "server \"admin\" {\n  fn ping(req) { \"pong\" }\n}";
    let (outputs, _) = compile_source(source, "app.tova", "app").unwrap();
    assert!(outputs.server.is_none());
    let admin = outputs.servers.get("admin").expect("admin server artifact");
    assert!(admin
        .code
        .contains("Number(process.env.PORT_ADMIN || process.env.PORT || 3000)"));
}

#[test]
fn test_middleware_decorator_wraps_route() {
    let code = server_code(
        r#"
server {
    middleware require_auth(req, next) {
        next()
    }
    fn secret(req) { "hidden" }
    @require_auth
    route GET "/secret" => secret
}
"#,
    );
    assert!(code.contains("async function require_auth(req, next)"));
    assert!(code.contains("__route(\"GET\", \"/secret\", [require_auth], secret);"));
    // dispatcher composes middleware in declaration order
    assert!(code.contains("for (let i = route.middleware.length - 1; i >= 0; i--)"));
}

#[test]
fn test_route_group_prefixes() {
    let code = server_code(
        r#"
server {
    fn list(req) { [] }
    fn create(req) { req.body }
    routes "/api" {
        route GET "/items" => list
        route POST "/items" => create
    }
}
"#,
    );
    assert!(code.contains("__route(\"GET\", \"/api/items\", [], list);"));
    assert!(code.contains("__route(\"POST\", \"/api/items\", [], create);"));
}

#[test]
fn test_db_is_lazily_initialized() {
    let code = server_code(
        r#"
server {
    db { provider: "sqlite", file: "app.db" }
    fn all_users(req) { db.query("select * from users") }
}
"#,
    );
    assert!(code.contains("let __db_conn = null;"));
    assert!(code.contains("if (!__db_conn) __db_conn = __tova_connect(__db_config);"));
}

#[test]
fn test_env_declarations() {
    let code = server_code(
        r#"
server {
    env { DATABASE_URL, WORKERS = 4 }
    fn ping(req) { "ok" }
}
"#,
    );
    assert!(code.contains("const DATABASE_URL = process.env.DATABASE_URL;"));
    assert!(code.contains("const WORKERS = process.env.WORKERS ?? 4;"));
}

#[test]
fn test_lifecycle_and_schedule() {
    let code = server_code(
        r#"
server {
    on_start { print("up") }
    schedule "*/5 * * * *" { print("tick") }
    fn ping(req) { "ok" }
}
"#,
    );
    assert!(code.contains("__on_start(async () => {"));
    assert!(code.contains("__schedule(\"*/5 * * * *\", async () => {"));
}

#[test]
fn test_config_singletons() {
    let code = server_code(
        r#"
server {
    cors { origin: "*" }
    rate_limit { window: 60, max: 100 }
    fn ping(req) { "ok" }
}
"#,
    );
    assert!(code.contains("__configure(\"cors\", { origin: \"*\" });"));
    assert!(code.contains("__configure(\"rate_limit\", { window: 60, max: 100 });"));
}

#[test]
fn test_inline_route_handler() {
    let code = server_code(
        r#"
server {
    route GET "/health" => (req) { "ok" }
}
"#,
    );
    assert!(code.contains("__route(\"GET\", \"/health\", [], async (req) => {"));
}

#[test]
fn test_static_and_websocket_registration() {
    let code = server_code(
        r#"
server {
    static "/public" "./public"
    websocket "/live" {
        fn on_open(socket) { print("open") }
        fn on_message(socket, msg) { print(msg) }
    }
    fn ping(req) { "ok" }
}
"#,
    );
    assert!(code.contains("__static(\"/public\", \"./public\");"));
    assert!(code.contains("__websocket(\"/live\", { on_open: async (socket) =>"));
}
