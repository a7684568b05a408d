//! Search for the minimal set of code units a program needs to retain an
//! observable behavior: generate deletion masks over a factor space, build
//! and evaluate the corresponding program variants, and record the observed
//! responses in an experiment matrix.

#[cfg(test)]
mod test_utils;

pub mod config;
pub mod doe;
pub mod driver;
pub mod error;
pub mod evaluate;
pub mod factor;
pub mod matrix;
pub mod toolchain;
pub mod tree;

pub use error::Error;
