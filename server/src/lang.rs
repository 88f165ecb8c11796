//! Static language tables for Crag: keywords, builtin functions,
//! constants, and standard headers. These back the tag-based completion,
//! hover, and semantic-token fallbacks.

/// Reserved words of the dialect, including the Crag-specific types.
pub const KEYWORDS: &[&str] = &[
    "break", "case", "const", "continue", "default", "do", "else", "entity", "enum", "float",
    "for", "if", "int", "local", "return", "static", "string", "struct", "switch", "typedef",
    "vec", "void", "while",
];

/// Type names among the keywords (semantic tokens classify these apart).
pub const TYPE_KEYWORDS: &[&str] = &[
    "entity", "float", "int", "string", "vec", "void",
];

/// Dialect keywords that mark a line as Crag-specific syntax (a plain C
/// analyzer will not know them).
pub const DIALECT_KEYWORDS: &[&str] = &["entity", "local", "vec"];

#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub signature: &'static str,
    pub doc: &'static str,
}

/// Builtin library functions.
pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "ceil",
        signature: "float ceil(float v)",
        doc: "Round up to the nearest integer.",
    },
    Builtin {
        name: "fabs",
        signature: "float fabs(float v)",
        doc: "Absolute value.",
    },
    Builtin {
        name: "floor",
        signature: "float floor(float v)",
        doc: "Round down to the nearest integer.",
    },
    Builtin {
        name: "ftos",
        signature: "string ftos(float v)",
        doc: "Format a float as a string.",
    },
    Builtin {
        name: "print",
        signature: "void print(string msg)",
        doc: "Write a message to the game console.",
    },
    Builtin {
        name: "rand",
        signature: "float rand()",
        doc: "Uniform random float in [0, 1).",
    },
    Builtin {
        name: "remove",
        signature: "void remove(entity e)",
        doc: "Destroy an entity and free its slot.",
    },
    Builtin {
        name: "spawn",
        signature: "entity spawn()",
        doc: "Allocate a fresh entity.",
    },
    Builtin {
        name: "sqrt",
        signature: "float sqrt(float v)",
        doc: "Square root.",
    },
    Builtin {
        name: "stof",
        signature: "float stof(string s)",
        doc: "Parse a float from a string.",
    },
    Builtin {
        name: "vcross",
        signature: "vec vcross(vec a, vec b)",
        doc: "Cross product of two vectors.",
    },
    Builtin {
        name: "vdot",
        signature: "float vdot(vec a, vec b)",
        doc: "Dot product of two vectors.",
    },
    Builtin {
        name: "vlen",
        signature: "float vlen(vec v)",
        doc: "Euclidean length of a vector.",
    },
    Builtin {
        name: "vnorm",
        signature: "vec vnorm(vec v)",
        doc: "Normalize a vector to unit length.",
    },
    Builtin {
        name: "vtoangles",
        signature: "vec vtoangles(vec dir)",
        doc: "Convert a direction vector to pitch/yaw/roll angles.",
    },
    Builtin {
        name: "vtos",
        signature: "string vtos(vec v)",
        doc: "Format a vector as a string.",
    },
];

/// Builtin constants.
pub const CONSTANTS: &[(&str, &str)] = &[
    ("FALSE", "Boolean false (0)."),
    ("NULL_ENT", "The empty entity reference."),
    ("TRUE", "Boolean true (1)."),
    ("VEC_DOWN", "Unit vector pointing down: '0 0 -1'."),
    ("VEC_UP", "Unit vector pointing up: '0 0 1'."),
    ("VEC_ZERO", "The zero vector: '0 0 0'."),
];

/// Standard headers offered in `#include` completion.
pub const HEADERS: &[&str] = &["crag.h", "entity.h", "mathlib.h", "world.h"];

/// `vec` component accessors offered after a trailing dot.
pub const COMPONENT_ACCESSORS: &[(&str, &str)] = &[
    ("x", "First vector component."),
    ("y", "Second vector component."),
    ("z", "Third vector component."),
];

#[must_use]
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

#[must_use]
pub fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

#[must_use]
pub fn constant(name: &str) -> Option<&'static str> {
    CONSTANTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, doc)| *doc)
}
