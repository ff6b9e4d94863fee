//! Process-wide options record (§6, §5 "Shared resources").
//!
//! The original library kept verbosity, delimiters, the NaN sentinel
//! string, the database engine choice, the RNG seed counter and the
//! thread count in a single global struct, mutated only at program start
//! and read everywhere else. We keep the same shape but make the
//! read-mostly contract explicit: [`Options`] is constructed once (or
//! defaulted) and installed with [`set_global`]; nothing in the crate
//! mutates it after that point. Persistent-store and CLI-specific fields
//! (db engine/user/password, output append-vs-overwrite) are dropped here
//! because §1 places the SQL/CLI layer out of scope; the fields that
//! govern in-core behavior (verbosity, delimiters, NaN sentinel, RNG seed,
//! thread count, stop-on-warning) are kept.

use std::sync::OnceLock;

/// Verbosity levels, matching the original's 0..3 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No diagnostic output at all.
    Silent = 0,
    /// Warnings only.
    Warnings = 1,
    /// Warnings plus informational messages.
    Informational = 2,
    /// Full per-iteration tracing.
    Trace = 3,
}

/// Process-wide options record. Read-mostly: install once at startup via
/// [`set_global`]; submodules read it through [`global`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Verbosity level; maps onto a `tracing` level filter at startup.
    pub verbosity: Verbosity,
    /// Delimiter set recognized on ingest (out-of-core concern, kept for
    /// callers that still shell out to the text-ingest collaborator).
    pub input_delimiters: Vec<char>,
    /// Delimiter used when printing datasets in delimited form.
    pub output_delimiter: char,
    /// String that stands in for a missing value when printing.
    pub nan_sentinel: String,
    /// Seed counter for RNGs created without an explicit seed. Each draw
    /// of a fresh RNG increments this so repeated runs in one process
    /// don't collide, while a fixed seed makes a single run reproducible.
    pub rng_seed_counter: u64,
    /// Number of worker threads used by the `parallel` feature's pool for
    /// `map`/`map_sum`/KL-over-draws. `1` disables the pool.
    pub thread_count: usize,
    /// Elevates warnings to hard errors.
    pub stop_on_warning: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            verbosity: Verbosity::Warnings,
            input_delimiters: vec!['|', ',', '\t', ' '],
            output_delimiter: '\t',
            nan_sentinel: "NaN".to_string(),
            rng_seed_counter: 0,
            thread_count: 1,
            stop_on_warning: false,
        }
    }
}

static GLOBAL: OnceLock<Options> = OnceLock::new();

/// Install the process-wide options record. Must be called at most once;
/// subsequent calls are ignored (matching the "mutation at program start
/// only" contract) and return `false`.
pub fn set_global(opts: Options) -> bool {
    GLOBAL.set(opts).is_ok()
}

/// Read the process-wide options record, installing the default on first
/// access if nothing was explicitly configured.
pub fn global() -> &'static Options {
    GLOBAL.get_or_init(Options::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let o = Options::default();
        assert_eq!(o.output_delimiter, '\t');
        assert_eq!(o.nan_sentinel, "NaN");
        assert_eq!(o.thread_count, 1);
        assert!(!o.stop_on_warning);
    }
}
