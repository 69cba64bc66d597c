//! Helpers shared by unit and integration tests.

pub mod fixtures;

use std::fmt::Debug;

pub use fixtures::{SyncFixture, grid, header, rows};

/// Check `(label, input, expected)` rows against `f` and report every
/// mismatch in one failure.
pub fn assert_cases<I, E, F>(cases: &[(&str, I, E)], f: F)
where
    I: Debug,
    E: Debug + PartialEq,
    F: Fn(&I) -> E,
{
    let failures: Vec<String> = cases
        .iter()
        .filter_map(|(label, input, expected)| {
            let actual = f(input);
            (actual != *expected)
                .then(|| format!("{label}: {input:?} gave {actual:?}, expected {expected:?}"))
        })
        .collect();
    assert!(
        failures.is_empty(),
        "{} of {} cases failed:\n{}",
        failures.len(),
        cases.len(),
        failures.join("\n")
    );
}
