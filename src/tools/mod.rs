use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::MethylNormError;

pub mod beta;
pub mod huber;
pub mod normexp;
pub mod swan;

/// Preprocessing modes accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreprocessMethod {
    Raw,
    Noob,
    Swan,
}

impl PreprocessMethod {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Noob => "noob",
            Self::Swan => "swan",
        }
    }
}

impl Display for PreprocessMethod {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PreprocessMethod {
    type Err = MethylNormError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "noob" => Ok(Self::Noob),
            "swan" => Ok(Self::Swan),
            other => {
                Err(MethylNormError::InvalidInput(format!(
                    "invalid preprocessing method '{}', valid values: raw, noob, swan",
                    other
                )))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("noob".parse::<PreprocessMethod>().unwrap(), PreprocessMethod::Noob);
        assert_eq!("SWAN".parse::<PreprocessMethod>().unwrap(), PreprocessMethod::Swan);
        assert_eq!("Raw".parse::<PreprocessMethod>().unwrap(), PreprocessMethod::Raw);
        assert!("illumina".parse::<PreprocessMethod>().is_err());
    }

    #[test]
    fn test_method_roundtrip() {
        for method in [
            PreprocessMethod::Raw,
            PreprocessMethod::Noob,
            PreprocessMethod::Swan,
        ] {
            assert_eq!(method.code().parse::<PreprocessMethod>().unwrap(), method);
        }
    }
}
