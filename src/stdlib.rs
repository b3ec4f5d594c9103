//! Built-in standard library.
//!
//! Each built-in is a small JavaScript function body inlined as text into
//! the shared artifact. The generator scans the AST for identifier
//! references, computes the closure over `deps`, and emits only what a
//! program actually reaches (lightweight tree-shaking). The `PROPAGATE`
//! fragment backs the postfix `?` operator and is always present.

use std::collections::BTreeSet;

pub struct StdlibFunction {
    pub name: &'static str,
    /// Other built-ins this body calls
    pub deps: &'static [&'static str],
    pub source: &'static str,
}

/// Error-propagation helper for the postfix `?` operator. Functions whose
/// bodies contain `?` are emitted wrapped in `__try` so an early Err/None
/// becomes the function's return value.
pub const PROPAGATE: &str = r#"class __TovaPropagate { constructor(value) { this.value = value; } }
function __propagate(v) {
  if (v && (v.__tag === "Err" || v.__tag === "None")) throw new __TovaPropagate(v);
  if (v && (v.__tag === "Ok" || v.__tag === "Some")) return v.value;
  return v;
}
function __try(fn) {
  try { return fn(); } catch (e) { if (e instanceof __TovaPropagate) return e.value; throw e; }
}
async function __try_async(fn) {
  try { return await fn(); } catch (e) { if (e instanceof __TovaPropagate) return e.value; throw e; }
}
"#;

pub const STDLIB: &[StdlibFunction] = &[
    StdlibFunction {
        name: "print",
        deps: &[],
        source: r#"function print(...args) { console.log(...args); }"#,
    },
    StdlibFunction {
        name: "len",
        deps: &[],
        source: r#"function len(x) {
  if (x == null) return 0;
  if (typeof x === "string" || Array.isArray(x)) return x.length;
  if (x instanceof Map || x instanceof Set) return x.size;
  return Object.keys(x).length;
}"#,
    },
    StdlibFunction {
        name: "range",
        deps: &[],
        source: r#"function range(start, end, step) {
  if (end === undefined) { end = start; start = 0; }
  if (step === undefined) step = start <= end ? 1 : -1;
  const out = [];
  if (step > 0) { for (let i = start; i < end; i += step) out.push(i); }
  else { for (let i = start; i > end; i += step) out.push(i); }
  return out;
}"#,
    },
    StdlibFunction {
        name: "map",
        deps: &[],
        source: r#"function map(xs, f) { return Array.from(xs).map((x) => f(x)); }"#,
    },
    StdlibFunction {
        name: "filter",
        deps: &[],
        source: r#"function filter(xs, f) { return Array.from(xs).filter((x) => f(x)); }"#,
    },
    StdlibFunction {
        name: "sum",
        deps: &[],
        source: r#"function sum(xs) { let total = 0; for (const x of xs) total += x; return total; }"#,
    },
    StdlibFunction {
        name: "sorted",
        deps: &[],
        source: r#"function sorted(xs, key) {
  const out = Array.from(xs);
  out.sort((a, b) => {
    const ka = key ? key(a) : a;
    const kb = key ? key(b) : b;
    return ka < kb ? -1 : ka > kb ? 1 : 0;
  });
  return out;
}"#,
    },
    StdlibFunction {
        name: "reversed",
        deps: &[],
        source: r#"function reversed(xs) { return Array.from(xs).reverse(); }"#,
    },
    StdlibFunction {
        name: "zip",
        deps: &[],
        source: r#"function zip(a, b) {
  const xs = Array.from(a), ys = Array.from(b);
  const n = Math.min(xs.length, ys.length);
  const out = [];
  for (let i = 0; i < n; i++) out.push([xs[i], ys[i]]);
  return out;
}"#,
    },
    StdlibFunction {
        name: "enumerate",
        deps: &[],
        source: r#"function enumerate(xs) { return Array.from(xs).map((x, i) => [i, x]); }"#,
    },
    StdlibFunction {
        name: "min",
        deps: &[],
        source: r#"function min(...args) {
  const xs = args.length === 1 && Array.isArray(args[0]) ? args[0] : args;
  return xs.reduce((a, b) => (b < a ? b : a));
}"#,
    },
    StdlibFunction {
        name: "max",
        deps: &[],
        source: r#"function max(...args) {
  const xs = args.length === 1 && Array.isArray(args[0]) ? args[0] : args;
  return xs.reduce((a, b) => (b > a ? b : a));
}"#,
    },
    StdlibFunction {
        name: "type_of",
        deps: &[],
        source: r#"function type_of(x) {
  if (x === null || x === undefined) return "nil";
  if (Array.isArray(x)) return "array";
  if (x.__tag !== undefined) return x.__tag;
  return typeof x;
}"#,
    },
    StdlibFunction {
        name: "Ok",
        deps: &[],
        source: r#"function Ok(value) { return Object.freeze({ __tag: "Ok", value }); }"#,
    },
    StdlibFunction {
        name: "Err",
        deps: &[],
        source: r#"function Err(value) { return Object.freeze({ __tag: "Err", value }); }"#,
    },
    StdlibFunction {
        name: "Some",
        deps: &[],
        source: r#"function Some(value) { return Object.freeze({ __tag: "Some", value }); }"#,
    },
    StdlibFunction {
        name: "None",
        deps: &[],
        source: r#"const None = Object.freeze({ __tag: "None" });"#,
    },
    StdlibFunction {
        name: "push",
        deps: &[],
        source: r#"function push(xs, ...items) { xs.push(...items); return xs; }"#,
    },
    StdlibFunction {
        name: "pop",
        deps: &[],
        source: r#"function pop(xs) { return xs.pop(); }"#,
    },
    StdlibFunction {
        name: "keys",
        deps: &[],
        source: r#"function keys(obj) { return obj instanceof Map ? Array.from(obj.keys()) : Object.keys(obj); }"#,
    },
    StdlibFunction {
        name: "values",
        deps: &[],
        source: r#"function values(obj) { return obj instanceof Map ? Array.from(obj.values()) : Object.values(obj); }"#,
    },
    StdlibFunction {
        name: "entries",
        deps: &[],
        source: r#"function entries(obj) { return obj instanceof Map ? Array.from(obj.entries()) : Object.entries(obj); }"#,
    },
    StdlibFunction {
        name: "contains",
        deps: &[],
        source: r#"function contains(xs, item) {
  if (typeof xs === "string") return xs.includes(item);
  if (Array.isArray(xs)) return xs.includes(item);
  if (xs instanceof Map || xs instanceof Set) return xs.has(item);
  return Object.prototype.hasOwnProperty.call(xs, item);
}"#,
    },
    StdlibFunction {
        name: "join",
        deps: &[],
        source: r#"function join(xs, sep) { return Array.from(xs).join(sep === undefined ? "" : sep); }"#,
    },
    StdlibFunction {
        name: "split",
        deps: &[],
        source: r#"function split(s, sep) { return s.split(sep); }"#,
    },
    StdlibFunction {
        name: "trim",
        deps: &[],
        source: r#"function trim(s) { return s.trim(); }"#,
    },
    StdlibFunction {
        name: "upper",
        deps: &[],
        source: r#"function upper(s) { return s.toUpperCase(); }"#,
    },
    StdlibFunction {
        name: "lower",
        deps: &[],
        source: r#"function lower(s) { return s.toLowerCase(); }"#,
    },
    StdlibFunction {
        name: "replace",
        deps: &[],
        source: r#"function replace(s, from, to) { return s.split(from).join(to); }"#,
    },
    StdlibFunction {
        name: "abs",
        deps: &[],
        source: r#"function abs(n) { return Math.abs(n); }"#,
    },
    StdlibFunction {
        name: "round",
        deps: &[],
        source: r#"function round(n) { return Math.round(n); }"#,
    },
    StdlibFunction {
        name: "floor",
        deps: &[],
        source: r#"function floor(n) { return Math.floor(n); }"#,
    },
    StdlibFunction {
        name: "ceil",
        deps: &[],
        source: r#"function ceil(n) { return Math.ceil(n); }"#,
    },
    StdlibFunction {
        name: "sqrt",
        deps: &[],
        source: r#"function sqrt(n) { return Math.sqrt(n); }"#,
    },
    StdlibFunction {
        name: "str",
        deps: &[],
        source: r#"function str(x) { return typeof x === "object" && x !== null ? JSON.stringify(x) : String(x); }"#,
    },
    StdlibFunction {
        name: "int",
        deps: &[],
        source: r#"function int(x) { return Math.trunc(Number(x)); }"#,
    },
    StdlibFunction {
        name: "float",
        deps: &[],
        source: r#"function float(x) { return Number(x); }"#,
    },
    StdlibFunction {
        name: "json_stringify",
        deps: &[],
        source: r#"function json_stringify(x, pretty) { return JSON.stringify(x, null, pretty ? 2 : 0); }"#,
    },
    StdlibFunction {
        name: "json_parse",
        deps: &["Ok", "Err"],
        source: r#"function json_parse(s) {
  try { return Ok(JSON.parse(s)); } catch (e) { return Err(String(e.message || e)); }
}"#,
    },
    StdlibFunction {
        name: "read_file",
        deps: &["Ok", "Err"],
        source: r#"function read_file(path) {
  try { return Ok(require("fs").readFileSync(path, "utf8")); } catch (e) { return Err(String(e.message || e)); }
}"#,
    },
    StdlibFunction {
        name: "write_file",
        deps: &["Ok", "Err"],
        source: r#"function write_file(path, content) {
  try { require("fs").writeFileSync(path, content); return Ok(null); } catch (e) { return Err(String(e.message || e)); }
}"#,
    },
];

pub fn is_builtin(name: &str) -> bool {
    STDLIB.iter().any(|f| f.name == name)
}

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    STDLIB.iter().map(|f| f.name)
}

/// The names `builtins_fragment` would emit for this reference set, in
/// registry order. Sibling artifacts import these from the shared
/// artifact.
pub fn emitted_names(referenced: &BTreeSet<String>) -> Vec<String> {
    let needed = closure(referenced);
    STDLIB
        .iter()
        .filter(|f| needed.contains(f.name))
        .map(|f| f.name.to_string())
        .collect()
}

fn closure(referenced: &BTreeSet<String>) -> BTreeSet<&'static str> {
    let mut needed: BTreeSet<&'static str> = BTreeSet::new();
    let mut stack: Vec<&'static str> = STDLIB
        .iter()
        .filter(|f| referenced.contains(f.name))
        .map(|f| f.name)
        .collect();
    while let Some(name) = stack.pop() {
        if !needed.insert(name) {
            continue;
        }
        if let Some(function) = STDLIB.iter().find(|f| f.name == name) {
            stack.extend(function.deps.iter().copied());
        }
    }
    needed
}

/// Emit the bodies of every referenced built-in plus its transitive
/// dependencies, in registry order so output is deterministic.
pub fn builtins_fragment(referenced: &BTreeSet<String>) -> String {
    let needed = closure(referenced);
    let mut out = String::new();
    for function in STDLIB {
        if needed.contains(function.name) {
            out.push_str(function.source);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("print"));
        assert!(is_builtin("None"));
        assert!(!is_builtin("definitely_not_a_builtin"));
    }

    #[test]
    fn test_tree_shake_closure() {
        let mut referenced = BTreeSet::new();
        referenced.insert("json_parse".to_string());
        let fragment = builtins_fragment(&referenced);
        // json_parse pulls in Ok and Err
        assert!(fragment.contains("function json_parse"));
        assert!(fragment.contains("function Ok"));
        assert!(fragment.contains("function Err"));
        // but nothing unrelated
        assert!(!fragment.contains("function range"));
    }

    #[test]
    fn test_empty_reference_set_emits_nothing() {
        let fragment = builtins_fragment(&BTreeSet::new());
        assert!(fragment.is_empty());
    }
}
