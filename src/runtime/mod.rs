//! Embedded client runtime.
//!
//! The reactive runtime is a JavaScript asset injected verbatim at the
//! top of every client artifact. Its observable semantics (signal
//! propagation, flush ordering, ownership disposal, keyed
//! reconciliation, hydration, the RPC protocol) are a fixed contract
//! the code generator targets.

pub const RUNTIME_JS: &str = include_str!("runtime.js");

/// API surface the generator is allowed to emit calls to.
pub const RUNTIME_EXPORTS: &[&str] = &[
    "create_signal",
    "create_effect",
    "create_computed",
    "create_root",
    "batch",
    "untrack",
    "on_cleanup",
    "on_unmount",
    "on_mount",
    "error_boundary",
    "h",
    "Fragment",
    "render",
    "mount",
    "hydrate",
    "rpc",
    "rpc_intercept",
    "set_csrf_token",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_ships_contract_surface() {
        for export in RUNTIME_EXPORTS {
            let as_function = format!("function {}(", export);
            let as_const = format!("const {} ", export);
            assert!(
                RUNTIME_JS.contains(&as_function) || RUNTIME_JS.contains(&as_const),
                "runtime.js is missing '{}'",
                export
            );
        }
    }

    #[test]
    fn test_flush_guard_and_depth_ordering() {
        assert!(RUNTIME_JS.contains("> 100"));
        assert!(RUNTIME_JS.contains("a.depth - b.depth"));
    }

    #[test]
    fn test_ssr_marker_patterns() {
        assert!(RUNTIME_JS.contains("tova-s:"));
        assert!(RUNTIME_JS.contains("__tovaNodes"));
        assert!(RUNTIME_JS.contains("__tovaOwner"));
    }

    #[test]
    fn test_rpc_contract() {
        assert!(RUNTIME_JS.contains("\"/rpc/\" + name"));
        assert!(RUNTIME_JS.contains("X-Tova-CSRF"));
        assert!(RUNTIME_JS.contains("30000"));
        assert!(RUNTIME_JS.contains("TIMEOUT"));
    }
}
