use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::MethylNormError;

/// Known Illumina methylation array designs.
///
/// A design is inferred once per physical sample from the probe count of its
/// idat file; the probe layout is fixed per design and never changes during
/// normalization. Counts that match no known layout map to [`Unknown`], and
/// callers decide at the boundary whether to skip or abort — the resolver
/// itself never fails.
///
/// [`Unknown`]: ArrayDesign::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayDesign {
    Illumina27k,
    Illumina450k,
    IlluminaEpic,
    IlluminaEpicV2,
    IlluminaMsa48,
    IlluminaMouse,
    Unknown,
}

impl ArrayDesign {
    /// Infers the array design from the number of probes in an idat file.
    ///
    /// The ranges are disjoint and inclusive; they are checked in a fixed
    /// priority order and any count outside all of them yields
    /// [`ArrayDesign::Unknown`].
    pub fn from_probe_count(probe_count: usize) -> Self {
        if (622_000..=623_000).contains(&probe_count) {
            return Self::Illumina450k;
        }
        if (1_050_000..=1_053_000).contains(&probe_count) {
            return Self::IlluminaEpic;
        }
        if (1_032_000..=1_033_000).contains(&probe_count) {
            return Self::IlluminaEpic;
        }
        if (1_100_000..=1_108_000).contains(&probe_count) {
            return Self::IlluminaEpicV2;
        }
        if (384_400..=384_600).contains(&probe_count) {
            return Self::IlluminaMsa48;
        }
        if (55_200..=55_400).contains(&probe_count) {
            return Self::Illumina27k;
        }
        if (315_000..=362_000).contains(&probe_count) {
            return Self::IlluminaMouse;
        }
        Self::Unknown
    }

    /// Designs the pipeline accepts for analysis.
    pub fn supported() -> &'static [ArrayDesign] {
        &[
            Self::Illumina450k,
            Self::IlluminaEpic,
            Self::IlluminaEpicV2,
            Self::IlluminaMsa48,
        ]
    }

    pub fn is_supported(&self) -> bool {
        Self::supported().contains(self)
    }

    /// Short identifier used in file names and config values.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Illumina27k => "27k",
            Self::Illumina450k => "450k",
            Self::IlluminaEpic => "epic_v1",
            Self::IlluminaEpicV2 => "epic_v2",
            Self::IlluminaMsa48 => "msa48",
            Self::IlluminaMouse => "mouse",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable product name.
    pub fn pretty_name(&self) -> &'static str {
        match self {
            Self::Illumina27k => "HumanMethylation27",
            Self::Illumina450k => "Infinium HumanMethylation450K",
            Self::IlluminaEpic => "Infinium MethylationEPIC v1.0",
            Self::IlluminaEpicV2 => "Infinium MethylationEPIC v2.0",
            Self::IlluminaMsa48 => "Infinium Methylation Screening Array-48",
            Self::IlluminaMouse | Self::Unknown => "Unknown Array Type",
        }
    }
}

impl Display for ArrayDesign {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ArrayDesign {
    type Err = MethylNormError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "27k" | "illumina27k" => Ok(Self::Illumina27k),
            "450k" | "illumina450k" => Ok(Self::Illumina450k),
            "epic_v1" | "epic" | "illuminaepic" => Ok(Self::IlluminaEpic),
            "epic_v2" | "illuminaepicv2" => Ok(Self::IlluminaEpicV2),
            "msa48" | "illuminamsa48" => Ok(Self::IlluminaMsa48),
            "mouse" | "illuminamouse" => Ok(Self::IlluminaMouse),
            "unknown" => Ok(Self::Unknown),
            other => {
                Err(MethylNormError::InvalidInput(format!(
                    "invalid array design '{}', valid values: 27k, 450k, epic_v1, epic_v2, \
                     msa48, mouse, unknown",
                    other
                )))
            },
        }
    }
}
