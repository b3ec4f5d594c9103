/// Error Codes: Tova-specific diagnostic codes and explanations
///
/// This module defines the stable diagnostic code registry (E2xx analysis
/// errors, E4xx merge/import errors, W3xx warnings) and provides a short
/// explanation for each, used by `--explain` style tooling and the docs
/// generator.
use std::collections::HashMap;

// File-level failures
pub const LEX_ERROR: &str = "E101";
pub const PARSE_ERROR: &str = "E102";

// Analysis errors
pub const DUPLICATE_DECLARATION: &str = "E201";
pub const UNRESOLVED_IDENTIFIER: &str = "E202";
pub const PRIVATE_ACCESS: &str = "E203";
pub const ASSIGN_IMMUTABLE: &str = "E204";
pub const FORBIDDEN_BLOCK_FORM: &str = "E205";
pub const DUPLICATE_ROUTE: &str = "E206";

// Merge / import resolution errors
pub const MERGE_CONFLICT: &str = "E401";
pub const CIRCULAR_IMPORT: &str = "E402";
pub const MISSING_MODULE: &str = "E403";

// Warnings (promoted to errors in strict mode)
pub const UNUSED_BINDING: &str = "W301";
pub const SHADOWED_BINDING: &str = "W302";
pub const MATCH_NO_WILDCARD: &str = "W303";
pub const VALUE_IGNORED: &str = "W304";
pub const UNUSED_IMPORT: &str = "W305";

/// One entry in the diagnostic code registry.
#[derive(Debug, Clone)]
pub struct CodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub explanation: &'static str,
}

/// Registry of every stable diagnostic code.
pub struct ErrorCodeRegistry {
    codes: HashMap<&'static str, CodeInfo>,
}

impl ErrorCodeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            codes: HashMap::new(),
        };
        registry.register_all();
        registry
    }

    pub fn lookup(&self, code: &str) -> Option<&CodeInfo> {
        self.codes.get(code)
    }

    pub fn all(&self) -> impl Iterator<Item = &CodeInfo> {
        self.codes.values()
    }

    fn register(&mut self, code: &'static str, title: &'static str, explanation: &'static str) {
        self.codes.insert(
            code,
            CodeInfo {
                code,
                title,
                explanation,
            },
        );
    }

    fn register_all(&mut self) {
        self.register(
            LEX_ERROR,
            "lexical error",
            "The file contains bytes that do not form a valid token: an \
             unterminated string or comment, a malformed number, an invalid \
             escape, or an unrecognized character.",
        );
        self.register(
            PARSE_ERROR,
            "syntax error",
            "The token stream does not match the grammar. The message names \
             what the parser expected at the reported location.",
        );
        self.register(
            DUPLICATE_DECLARATION,
            "duplicate declaration",
            "A name was declared more than once in the same scope. Rename one \
             of the declarations, or use `var` reassignment if you meant to \
             update an existing binding.",
        );
        self.register(
            UNRESOLVED_IDENTIFIER,
            "unresolved identifier",
            "An identifier was referenced that is not declared in any \
             enclosing scope and is not a built-in. Check the spelling, or \
             import the name from the module that defines it.",
        );
        self.register(
            PRIVATE_ACCESS,
            "private import access",
            "An import names a declaration that exists in the target module \
             but is not public. Add the `pub` modifier to the declaration in \
             the target module to export it.",
        );
        self.register(
            ASSIGN_IMMUTABLE,
            "assignment to immutable binding",
            "A `let` binding was reassigned. Declare it with `var` if it \
             needs to change.",
        );
        self.register(
            FORBIDDEN_BLOCK_FORM,
            "form not allowed in this block",
            "Server blocks accept routes, config, and lifecycle forms; client \
             blocks accept state, computed, effect, component, and store \
             declarations; shared blocks accept types, functions, and plain \
             statements. Move the declaration into the right block.",
        );
        self.register(
            DUPLICATE_ROUTE,
            "duplicate route",
            "Two routes in the same server block (or label group) declare the \
             same method and path. Each (method, path) pair must be unique.",
        );
        self.register(
            MERGE_CONFLICT,
            "duplicate declaration across directory group",
            "All .tova files in one directory merge into a single compilation \
             unit; top-level components, state, stores, server functions, \
             models, routes, and shared types must be unique across the whole \
             group.",
        );
        self.register(
            CIRCULAR_IMPORT,
            "circular import",
            "A module transitively imports itself. The full import chain is \
             reported; break the cycle by moving shared declarations into a \
             module both sides can import.",
        );
        self.register(
            MISSING_MODULE,
            "missing module",
            "An import path does not resolve to a .tova file or directory.",
        );
        self.register(
            UNUSED_BINDING,
            "unused binding",
            "A local binding is never read. Prefix it with `_` to silence the \
             warning.",
        );
        self.register(
            SHADOWED_BINDING,
            "shadowed binding",
            "A binding hides another binding of the same name from an outer \
             scope.",
        );
        self.register(
            MATCH_NO_WILDCARD,
            "match without wildcard arm",
            "A match expression has no `_` or binding arm; values that match \
             no arm produce nil at runtime.",
        );
        self.register(
            VALUE_IGNORED,
            "expression value ignored",
            "An expression statement produces a value that is discarded.",
        );
        self.register(
            UNUSED_IMPORT,
            "unused import",
            "An imported name is never referenced in this file.",
        );
    }
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = ErrorCodeRegistry::new();
        let info = registry.lookup("E202").unwrap();
        assert_eq!(info.title, "unresolved identifier");
    }

    #[test]
    fn test_all_codes_registered() {
        let registry = ErrorCodeRegistry::new();
        for code in [
            DUPLICATE_DECLARATION,
            UNRESOLVED_IDENTIFIER,
            PRIVATE_ACCESS,
            ASSIGN_IMMUTABLE,
            FORBIDDEN_BLOCK_FORM,
            DUPLICATE_ROUTE,
            MERGE_CONFLICT,
            CIRCULAR_IMPORT,
            MISSING_MODULE,
            UNUSED_BINDING,
            SHADOWED_BINDING,
            MATCH_NO_WILDCARD,
            VALUE_IGNORED,
            UNUSED_IMPORT,
        ] {
            assert!(registry.lookup(code).is_some(), "missing {}", code);
        }
    }
}
