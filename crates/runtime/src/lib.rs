//! Runtime utilities for the CRPT submission binaries.
#![allow(missing_docs)]

pub mod shutdown;
