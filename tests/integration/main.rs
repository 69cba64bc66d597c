//! Engine tests against the in-memory remote and a SQLite file.

mod pull_tests;
mod push_tests;
