//! Terminal output for the `resume-sync` binary. Not part of the library API.

pub mod print;
