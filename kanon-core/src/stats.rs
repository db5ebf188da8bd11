//! Engine Statistics.

/// Counters accumulated over the lifetime of a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Atoms processed by `add`.
    pub atoms: u64,
    /// Atoms found already valid.
    pub valid: u64,
    /// Atoms found inconsistent.
    pub inconsistent: u64,
    /// Variable-class merges in the partition.
    pub merges: u64,
    /// Congruence pairs closed.
    pub congruences: u64,
    /// Bindings composed into solution sets.
    pub compositions: u64,
    /// Name-both-sides fallbacks for unsolvable equalities.
    pub solver_fallbacks: u64,
    /// Domain refinements recorded in `C`.
    pub refinements: u64,
    /// Deductions emitted by the renaming layer.
    pub deductions: u64,
}
