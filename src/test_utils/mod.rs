//! Shared test utilities for skillhub.

pub mod fixtures;
pub mod logging;

#[cfg(test)]
pub mod arbitrary;

/// Table-driven test case structure.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
}

/// Run table-driven tests, naming the failing case.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F)
where
    I: std::fmt::Debug + Clone,
    E: std::fmt::Debug + PartialEq,
    F: Fn(I) -> E,
{
    for case in cases {
        let actual = test_fn(case.input.clone());
        assert_eq!(
            actual, case.expected,
            "case '{}' failed for input {:?}",
            case.name, case.input
        );
    }
}
