//! Shared pieces of the constel command-line tools

pub mod output;
