//! Server artifact emission: the generated HTTP dispatcher, route
//! tables, middleware wrapping, the lazy database handle, RPC
//! endpoints, and the auxiliary server forms (websocket, sse,
//! schedules, jobs, lifecycle hooks, env, config singletons).

use super::{js_string, Artifact, CodeGenerator, Emitter};
use crate::lexer::HttpMethod;
use crate::parser::ast::*;
use indoc::indoc;

impl CodeGenerator {
    pub(crate) fn emit_server(
        &mut self,
        program: &Program,
        label: Option<&str>,
        bodies: &[&[Stmt]],
        base: &str,
        shared_names: &[String],
    ) -> Artifact {
        let mut e = Emitter::new();
        e.line("// Generated by the Tova compiler - do not edit.");
        self.emit_shared_import(&mut e, base, shared_names);
        self.emit_imports(&mut e, program);
        e.blank();
        e.push(SERVER_PRELUDE);
        e.blank();

        self.push_scope();
        let mut rpc_functions: Vec<String> = Vec::new();

        for body in bodies {
            for stmt in body.iter() {
                self.emit_server_stmt(&mut e, stmt, &mut rpc_functions);
            }
        }

        // every top-level server function doubles as an RPC endpoint
        if !rpc_functions.is_empty() {
            e.blank();
            for name in &rpc_functions {
                e.line(&format!(
                    "__route(\"POST\", \"/rpc/{}\", [], __rpc_handler({}));",
                    name, name
                ));
            }
        }

        e.blank();
        let port_expr = match label {
            Some(label) => format!(
                "Number(process.env.PORT_{} || process.env.PORT || 3000)",
                label.to_uppercase()
            ),
            None => "Number(process.env.PORT || 3000)".to_string(),
        };
        e.line(&format!("const __port = {};", port_expr));
        e.line("__serve(__port);");

        self.pop_scope();
        e.finish()
    }

    fn emit_server_stmt(&mut self, e: &mut Emitter, stmt: &Stmt, rpc_functions: &mut Vec<String>) {
        match stmt {
            Stmt::Function(decl) => {
                self.emit_function(e, decl);
                rpc_functions.push(decl.name.clone());
            }
            Stmt::Route(route) => self.emit_route(e, route, None),
            Stmt::RouteGroup { prefix, routes, .. } => {
                for route in routes {
                    self.emit_route(e, route, Some(prefix));
                }
            }
            Stmt::Db { config, loc } => {
                e.map(loc);
                let config_js = self.gen_expr(config);
                e.line(&format!("const __db_config = {};", config_js));
                e.line("let __db_conn = null;");
                e.line("const db = new Proxy({}, {");
                e.indent();
                e.line("get(_, prop) {");
                e.indent();
                e.line("if (!__db_conn) __db_conn = __tova_connect(__db_config);");
                e.line("return __db_conn[prop];");
                e.dedent();
                e.line("},");
                e.dedent();
                e.line("});");
            }
            Stmt::Model {
                name, fields, doc, loc,
            } => {
                self.emit_doc(e, doc);
                e.map(loc);
                let field_js: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        format!(
                            "{}: {{ type: {} }}",
                            field.name,
                            js_string(&field.type_.name)
                        )
                    })
                    .collect();
                e.line(&format!(
                    "const {} = Object.freeze({{ __model: {}, fields: {{ {} }} }});",
                    name,
                    js_string(name),
                    field_js.join(", ")
                ));
            }
            Stmt::Middleware {
                name, params, body, loc,
            } => {
                e.map(loc);
                let params_js = if params.is_empty() {
                    "req, next".to_string()
                } else {
                    self.gen_params(params)
                };
                e.line(&format!("async function {}({}) {{", name, params_js));
                e.indent();
                self.push_scope();
                for param in params {
                    self.declare_locals(&param.pattern);
                }
                self.emit_block_stmts(e, body, true);
                self.pop_scope();
                e.dedent();
                e.line("}");
            }
            Stmt::Websocket { path, handlers, loc } => {
                e.map(loc);
                let handler_js: Vec<String> = handlers
                    .iter()
                    .map(|handler| {
                        let body = self.gen_block_to_string(&handler.body, true);
                        let params = self.gen_params(&handler.params);
                        format!("{}: async ({}) => {{\n{}}}", handler.name, params, body)
                    })
                    .collect();
                e.line(&format!(
                    "__websocket({}, {{ {} }});",
                    js_string(path),
                    handler_js.join(", ")
                ));
            }
            Stmt::Sse { path, params, body, loc } => {
                e.map(loc);
                let params_js = if params.is_empty() {
                    "client".to_string()
                } else {
                    self.gen_params(params)
                };
                let body_js = self.gen_block_to_string(body, false);
                e.line(&format!(
                    "__sse({}, async ({}) => {{\n{}}});",
                    js_string(path),
                    params_js,
                    body_js
                ));
            }
            Stmt::Schedule { spec, body, loc } => {
                e.map(loc);
                let body_js = self.gen_block_to_string(body, false);
                e.line(&format!(
                    "__schedule({}, async () => {{\n{}}});",
                    js_string(spec),
                    body_js
                ));
            }
            Stmt::BackgroundJob {
                name, params, body, loc,
            } => {
                e.map(loc);
                let params_js = self.gen_params(params);
                e.line(&format!("async function {}({}) {{", name, params_js));
                e.indent();
                self.push_scope();
                for param in params {
                    self.declare_locals(&param.pattern);
                }
                self.emit_block_stmts(e, body, true);
                self.pop_scope();
                e.dedent();
                e.line("}");
                e.line(&format!("__background({}, {});", js_string(name), name));
            }
            Stmt::LifecycleHook { hook, body, loc } => {
                e.map(loc);
                let register = match hook {
                    LifecycleEvent::Start => "__on_start",
                    LifecycleEvent::Shutdown => "__on_shutdown",
                };
                let body_js = self.gen_block_to_string(body, false);
                e.line(&format!("{}(async () => {{\n{}}});", register, body_js));
            }
            Stmt::Subscribe {
                channel, params, body, loc,
            } => {
                e.map(loc);
                let params_js = if params.is_empty() {
                    "message".to_string()
                } else {
                    self.gen_params(params)
                };
                let body_js = self.gen_block_to_string(body, false);
                e.line(&format!(
                    "__subscribe({}, async ({}) => {{\n{}}});",
                    js_string(channel),
                    params_js,
                    body_js
                ));
            }
            Stmt::StaticDir { route, dir, loc } => {
                e.map(loc);
                e.line(&format!(
                    "__static({}, {});",
                    js_string(route),
                    js_string(dir)
                ));
            }
            Stmt::EnvDecl { names, loc } => {
                e.map(loc);
                for (name, default) in names {
                    match default {
                        Some(default) => {
                            let default_js = self.gen_expr(default);
                            e.line(&format!(
                                "const {} = process.env.{} ?? {};",
                                name, name, default_js
                            ));
                        }
                        None => e.line(&format!("const {} = process.env.{};", name, name)),
                    }
                }
            }
            Stmt::ConfigSingleton { kind, config, loc } => {
                e.map(loc);
                let config_js = self.gen_expr(config);
                e.line(&format!(
                    "__configure({}, {});",
                    js_string(kind.as_str()),
                    config_js
                ));
            }
            other => self.emit_stmt(e, other),
        }
    }

    fn emit_route(&mut self, e: &mut Emitter, route: &RouteDecl, prefix: Option<&str>) {
        e.map(&route.loc);
        let path = match prefix {
            Some(prefix) => format!("{}{}", prefix, route.path),
            None => route.path.clone(),
        };
        let middleware = route.middleware.join(", ");
        let handler_js = match &route.handler {
            RouteHandler::Named(name) => name.clone(),
            RouteHandler::Inline { params, body } => {
                let params_js = if params.is_empty() {
                    "req".to_string()
                } else {
                    self.gen_params(params)
                };
                self.push_scope();
                for param in params {
                    self.declare_locals(&param.pattern);
                }
                let body_js = self.gen_block_to_string(body, true);
                self.pop_scope();
                format!("async ({}) => {{\n{}}}", params_js, body_js)
            }
        };
        e.line(&format!(
            "__route({}, {}, [{}], {});",
            js_string(method_str(route.method)),
            js_string(&path),
            middleware,
            handler_js
        ));
    }
}

fn method_str(method: HttpMethod) -> &'static str {
    method.as_str()
}

/// The dispatcher every server artifact wraps its routes in. Routes
/// register into a table; middleware wraps handlers in declaration
/// order; the listener port comes from the environment.
const SERVER_PRELUDE: &str = indoc! {r#"
    import http from "node:http";
    import fs from "node:fs";
    import path from "node:path";

    const __routes = [];
    const __statics = [];
    const __subscriptions = {};
    const __jobs = {};
    const __websockets = [];
    const __start_hooks = [];
    const __shutdown_hooks = [];
    const __config = {};

    function __configure(key, value) { __config[key] = value; }
    function __on_start(fn) { __start_hooks.push(fn); }
    function __on_shutdown(fn) { __shutdown_hooks.push(fn); }
    function __background(name, fn) { __jobs[name] = fn; }
    function __static(prefix, dir) { __statics.push({ prefix, dir }); }

    function __subscribe(channel, fn) {
      (__subscriptions[channel] = __subscriptions[channel] || []).push(fn);
    }

    function __publish(channel, message) {
      for (const fn of __subscriptions[channel] || []) fn(message);
    }

    function __compile_path(route) {
      const names = [];
      const pattern = route
        .split("/")
        .map((seg) => {
          if (seg.startsWith(":")) {
            names.push(seg.slice(1));
            return "([^/]+)";
          }
          return seg.replace(/[.*+?^${}()|[\]\\]/g, "\\$&");
        })
        .join("/");
      return { regex: new RegExp("^" + pattern + "/?$"), names };
    }

    function __route(method, routePath, middleware, handler) {
      __routes.push({ method, path: routePath, middleware, handler, ...__compile_path(routePath) });
    }

    function __rpc_handler(fn) {
      return async (req) => {
        const body = req.body || {};
        const args = Array.isArray(body.__args) ? body.__args : [body];
        const result = await fn(...args);
        return { __json: { result } };
      };
    }

    function __tova_connect(config) {
      if (globalThis.__tova_db_driver) return globalThis.__tova_db_driver(config);
      throw new Error("no database driver installed; set globalThis.__tova_db_driver");
    }

    function __sse(routePath, handler) {
      __route("GET", routePath, [], (req) => {
        const res = req.__res;
        res.writeHead(200, {
          "Content-Type": "text/event-stream",
          "Cache-Control": "no-cache",
          Connection: "keep-alive",
        });
        const client = {
          send(data) { res.write("data: " + JSON.stringify(data) + "\n\n"); },
          close() { res.end(); },
        };
        handler(client);
        return { __handled: true };
      });
    }

    function __websocket(routePath, handlers) {
      __websockets.push({ path: routePath, handlers });
    }

    function __cron_matches(spec, date) {
      const fields = spec.split(/\s+/);
      if (fields.length !== 5) return false;
      const values = [
        date.getMinutes(),
        date.getHours(),
        date.getDate(),
        date.getMonth() + 1,
        date.getDay(),
      ];
      return fields.every((field, i) => {
        if (field === "*") return true;
        if (field.startsWith("*/")) return values[i] % Number(field.slice(2)) === 0;
        return field.split(",").some((part) => Number(part) === values[i]);
      });
    }

    function __schedule(spec, fn) {
      setInterval(() => {
        if (__cron_matches(spec, new Date())) fn();
      }, 60000);
    }

    function __read_body(req) {
      return new Promise((resolve) => {
        const chunks = [];
        req.on("data", (chunk) => chunks.push(chunk));
        req.on("end", () => {
          const raw = Buffer.concat(chunks).toString("utf8");
          if (!raw) return resolve(undefined);
          const type = req.headers["content-type"] || "";
          if (type.includes("application/json")) {
            try { return resolve(JSON.parse(raw)); } catch { return resolve(raw); }
          }
          resolve(raw);
        });
      });
    }

    function __respond(res, result) {
      if (result && result.__handled) return;
      if (result == null) {
        res.writeHead(204);
        res.end();
        return;
      }
      if (result.__json !== undefined) {
        res.writeHead(result.status || 200, { "Content-Type": "application/json" });
        res.end(JSON.stringify(result.__json));
        return;
      }
      if (typeof result === "object") {
        res.writeHead(200, { "Content-Type": "application/json" });
        res.end(JSON.stringify(result));
        return;
      }
      res.writeHead(200, { "Content-Type": "text/plain" });
      res.end(String(result));
    }

    function __apply_cors(req, res) {
      const cors = __config.cors;
      if (!cors) return false;
      res.setHeader("Access-Control-Allow-Origin", cors.origin || "*");
      res.setHeader("Access-Control-Allow-Methods", cors.methods || "GET,POST,PUT,DELETE,PATCH,HEAD,OPTIONS");
      res.setHeader("Access-Control-Allow-Headers", cors.headers || "Content-Type, X-Tova-CSRF");
      if (req.method === "OPTIONS") {
        res.writeHead(204);
        res.end();
        return true;
      }
      return false;
    }

    function __serve_static(req, res) {
      for (const entry of __statics) {
        if (!req.url.startsWith(entry.prefix)) continue;
        const rel = req.url.slice(entry.prefix.length).replace(/^\/+/, "");
        const file = path.join(entry.dir, rel || "index.html");
        if (!path.resolve(file).startsWith(path.resolve(entry.dir))) continue;
        if (fs.existsSync(file) && fs.statSync(file).isFile()) {
          res.writeHead(200);
          fs.createReadStream(file).pipe(res);
          return true;
        }
      }
      return false;
    }

    async function __dispatch(req, res) {
      if (__apply_cors(req, res)) return;
      if (__serve_static(req, res)) return;
      const url = new URL(req.url, "http://" + (req.headers.host || "localhost"));
      for (const route of __routes) {
        if (route.method !== req.method) continue;
        const match = url.pathname.match(route.regex);
        if (!match) continue;
        const params = {};
        route.names.forEach((name, i) => { params[name] = decodeURIComponent(match[i + 1]); });
        const request = {
          method: req.method,
          url: req.url,
          path: url.pathname,
          params,
          query: Object.fromEntries(url.searchParams),
          headers: req.headers,
          body: await __read_body(req),
          __res: res,
        };
        // middleware wraps the handler in declaration order
        let invoke = () => route.handler(request);
        for (let i = route.middleware.length - 1; i >= 0; i--) {
          const mw = route.middleware[i];
          const next = invoke;
          invoke = () => mw(request, next);
        }
        const result = await invoke();
        __respond(res, result);
        return;
      }
      res.writeHead(404, { "Content-Type": "text/plain" });
      res.end("not found");
    }

    function __serve(port) {
      const server = http.createServer((req, res) => {
        __dispatch(req, res).catch((e) => {
          res.writeHead(500, { "Content-Type": "text/plain" });
          res.end(String((e && e.message) || e));
        });
      });
      if (__websockets.length > 0) {
        import("ws")
          .then(({ WebSocketServer }) => {
            for (const entry of __websockets) {
              const wss = new WebSocketServer({ server, path: entry.path });
              wss.on("connection", (socket) => {
                if (entry.handlers.on_open) entry.handlers.on_open(socket);
                socket.on("message", (data) => {
                  if (entry.handlers.on_message) entry.handlers.on_message(socket, String(data));
                });
                socket.on("close", () => {
                  if (entry.handlers.on_close) entry.handlers.on_close(socket);
                });
              });
            }
          })
          .catch(() => {
            console.warn("[tova] websocket routes declared but the 'ws' package is not installed");
          });
      }
      server.listen(port, async () => {
        console.log("[tova] server listening on :" + port);
        for (const hook of __start_hooks) await hook();
      });
      const shutdown = async () => {
        for (const hook of __shutdown_hooks) await hook();
        server.close(() => process.exit(0));
      };
      process.on("SIGINT", shutdown);
      process.on("SIGTERM", shutdown);
      return server;
    }
"#};
