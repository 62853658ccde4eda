//! Integration test suite entry point.

mod cli_tests;
mod fixture;
mod manager_tests;
mod resolver_tests;
mod store_tests;
mod workspace_tests;
