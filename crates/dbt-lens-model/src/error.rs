use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum CoverageError {
    UnsupportedCoverageType(String),
    IncompatibleReports(String),
    MalformedDocument(String),
    BelowThreshold { measured: f64, minimum: f64 },
    CoverageRegressed { before: f64, after: f64 },
}

impl Display for CoverageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedCoverageType(requested) => {
                write!(f, "unsupported coverage type {requested:?}; expected doc or test")
            }
            Self::IncompatibleReports(reason) => {
                write!(f, "incompatible coverage reports: {reason}")
            }
            Self::MalformedDocument(reason) => {
                write!(f, "malformed coverage document: {reason}")
            }
            Self::BelowThreshold { measured, minimum } => {
                write!(
                    f,
                    "measured coverage {measured:.3} lower than min required {minimum:.3}"
                )
            }
            Self::CoverageRegressed { before, after } => {
                write!(
                    f,
                    "coverage decreased from {:.2}% to {:.2}%",
                    before * 100.0,
                    after * 100.0
                )
            }
        }
    }
}

impl std::error::Error for CoverageError {}
