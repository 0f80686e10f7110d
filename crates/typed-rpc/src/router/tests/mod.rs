//! Router tests

mod builder_tests;
