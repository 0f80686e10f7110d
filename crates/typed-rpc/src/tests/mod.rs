//! Test module for typed-rpc
//!
//! Property-based and scenario tests that cut across modules.



#[cfg(test)]
pub mod gateway_tests;



#[cfg(test)]
pub mod validation_tests;
