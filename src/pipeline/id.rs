//! Identity types for the pipeline graph.
//!
//! Algorithms live in an arena owned by `Pipeline`; `AlgorithmId` is a
//! newtype over `u32` that serves as a direct index into that arena.

use serde::Serialize;
use std::fmt;

/// Index into `Pipeline::executives`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct AlgorithmId(pub u32);

impl AlgorithmId {
    pub const INVALID: AlgorithmId = AlgorithmId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "AlgorithmId(INVALID)")
        } else {
            write!(f, "AlgorithmId({})", self.0)
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An output port of a producing algorithm: the upstream end of a connection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OutputPort {
    pub algorithm: AlgorithmId,
    pub port: usize,
}

impl OutputPort {
    pub fn new(algorithm: AlgorithmId, port: usize) -> Self {
        Self { algorithm, port }
    }
}

impl fmt::Debug for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputPort(alg={}, port={})", self.algorithm.0, self.port)
    }
}
