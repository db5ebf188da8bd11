//! Engine Configuration.

/// Per-run flags, read when a context is created.
///
/// Toggling flags between `add` calls is unsupported: a context
/// captures its configuration at creation and never re-interprets
/// bindings made under an earlier setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Enable integer-solve heuristics (gcd/divisibility checks on
    /// Diophantine equalities).
    pub integer_solve: bool,
    /// Narrow unsat cores to the cone of influence of the conflict.
    /// May drop atoms a complete core would keep; a diagnostic is
    /// emitted when the reduction fires.
    pub cone_of_influence: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            integer_solve: true,
            cone_of_influence: false,
        }
    }
}
