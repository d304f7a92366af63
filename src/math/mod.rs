//! Mathematical utilities for the STARK engine.
//!
//! This module provides univariate and multivariate polynomial arithmetic,
//! coset FFTs, the composition of constraint quotients and the FRI
//! (Fast Reed-Solomon Interactive Oracle Proof) protocol.

pub mod composition;
pub mod domain;
pub mod fri;
pub mod multivariate;
pub mod polynomial;
