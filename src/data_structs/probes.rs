use std::collections::HashSet;
use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;

use log::debug;
use polars::prelude::*;

use crate::errors::{MethylNormError, Result};

pub const PROBE_ID_COL: &str = "IlmnID";
pub const PROBE_TYPE_COL: &str = "Probe_Type";
pub const CHANNEL_COL: &str = "Color_Channel";

const REQUIRED_COLUMNS: [&str; 3] = [PROBE_ID_COL, PROBE_TYPE_COL, CHANNEL_COL];

/// Bead chemistry of a probe. Subtype one probes carry a color channel tag,
/// subtype two probes are read from both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeSubtype {
    One,
    Two,
}

impl ProbeSubtype {
    /// Manifest column code for this subtype.
    pub fn code(&self) -> &'static str {
        match self {
            Self::One => "I",
            Self::Two => "II",
        }
    }
}

impl Display for ProbeSubtype {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Color channel of a subtype one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Grn,
}

impl Channel {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Grn => "Grn",
        }
    }
}

impl Display for Channel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Channel {
    type Err = MethylNormError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "red" => Ok(Self::Red),
            "grn" | "green" => Ok(Self::Grn),
            other => {
                Err(MethylNormError::InvalidInput(format!(
                    "invalid channel '{}', valid values: Red, Grn",
                    other
                )))
            },
        }
    }
}

/// Per-subtype probe positions within the methylation probe vector.
///
/// The positions index into the ordered id list returned by
/// [`Manifest::methylation_probes`], not into the raw manifest rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtypeIndices {
    pub one: Vec<usize>,
    pub two: Vec<usize>,
}

/// Probe annotation table for one array design.
///
/// Wraps the vendor manifest as a DataFrame and exposes the partitions the
/// normalization steps need. The table is fixed per design and is never
/// mutated here.
#[derive(Debug, Clone)]
pub struct Manifest {
    data: DataFrame,
}

impl Manifest {
    pub fn new(data: DataFrame) -> Result<Self> {
        for column in REQUIRED_COLUMNS {
            if data.column(column).is_err() {
                return Err(MethylNormError::InvalidInput(format!(
                    "manifest is missing required column '{}'",
                    column
                )));
            }
        }
        debug!("Manifest created with {} probes", data.height());
        Ok(Self { data })
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        let data = CsvReadOptions::default()
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Self::new(data)
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Rows for probes of the given subtype, optionally restricted to one
    /// color channel and to an explicit probe id keep-list.
    pub fn probe_info(
        &self,
        subtype: ProbeSubtype,
        channel: Option<Channel>,
        keep_ids: Option<&[String]>,
    ) -> Result<DataFrame> {
        let types = self
            .data
            .column(PROBE_TYPE_COL)?
            .as_materialized_series()
            .str()?;
        let mut mask = types.equal(subtype.code());

        if let Some(channel) = channel {
            let channels = self
                .data
                .column(CHANNEL_COL)?
                .as_materialized_series()
                .str()?;
            mask = &mask & &channels.equal(channel.code());
        }

        if let Some(keep_ids) = keep_ids {
            let keep: HashSet<&str> = keep_ids.iter().map(String::as_str).collect();
            let ids = self
                .data
                .column(PROBE_ID_COL)?
                .as_materialized_series()
                .str()?;
            let keep_mask: Vec<bool> = ids
                .iter()
                .map(|id| id.map(|v| keep.contains(v)).unwrap_or(false))
                .collect();
            mask = &mask & &BooleanChunked::from_slice("keep".into(), &keep_mask);
        }

        Ok(self.data.filter(&mask)?)
    }

    /// Ids of all methylation probes (subtype one and two) in manifest row
    /// order. Control rows and anything without a subtype tag are skipped.
    pub fn methylation_probes(&self) -> Result<Vec<String>> {
        let ids = self
            .data
            .column(PROBE_ID_COL)?
            .as_materialized_series()
            .str()?;
        let types = self
            .data
            .column(PROBE_TYPE_COL)?
            .as_materialized_series()
            .str()?;

        let probes = ids
            .iter()
            .zip(types.iter())
            .filter_map(|(id, subtype)| {
                match (id, subtype) {
                    (Some(id), Some("I") | Some("II")) => Some(id.to_string()),
                    _ => None,
                }
            })
            .collect();
        Ok(probes)
    }

    /// Positions of each chemistry subtype within the methylation probe
    /// vector, in the same order as [`Manifest::methylation_probes`].
    pub fn subtype_indices(&self) -> Result<SubtypeIndices> {
        let types = self
            .data
            .column(PROBE_TYPE_COL)?
            .as_materialized_series()
            .str()?;

        let mut one = Vec::new();
        let mut two = Vec::new();
        let mut position = 0usize;
        for subtype in types.iter() {
            match subtype {
                Some("I") => {
                    one.push(position);
                    position += 1;
                },
                Some("II") => {
                    two.push(position);
                    position += 1;
                },
                _ => {},
            }
        }
        Ok(SubtypeIndices { one, two })
    }
}
