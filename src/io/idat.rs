use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;

use crate::data_structs::array_design::ArrayDesign;
use crate::errors::{MethylNormError, Result};

const IDAT_MAGIC: &[u8; 4] = b"IDAT";
const SUPPORTED_VERSION: i64 = 3;
/// Field directory code of the probe count.
const FIELD_PROBE_COUNT: u16 = 1000;

/// Reads the probe count from an idat stream without parsing intensities.
///
/// Only the magic, version and field directory are decoded; the stream is
/// then skipped forward to the probe-count field. Works on any reader, so
/// gzip-wrapped files need no seeking.
pub fn read_probe_count<R: Read>(mut reader: R) -> Result<u32> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != IDAT_MAGIC {
        return Err(MethylNormError::MalformedIdat(format!(
            "bad magic {:?}, expected \"IDAT\"",
            magic
        )));
    }

    let version = read_i64(&mut reader)?;
    if version != SUPPORTED_VERSION {
        return Err(MethylNormError::MalformedIdat(format!(
            "unsupported idat version {}",
            version
        )));
    }

    let n_fields = read_i32(&mut reader)?;
    if n_fields <= 0 {
        return Err(MethylNormError::MalformedIdat(format!(
            "invalid field count {}",
            n_fields
        )));
    }

    let mut count_offset = None;
    for _ in 0..n_fields {
        let code = read_u16(&mut reader)?;
        let offset = read_i64(&mut reader)?;
        if code == FIELD_PROBE_COUNT {
            count_offset = Some(offset);
        }
    }
    let count_offset = count_offset.ok_or_else(|| {
        MethylNormError::MalformedIdat("field directory has no probe count entry".to_string())
    })?;

    // Bytes consumed so far: magic + version + field count + directory
    let header_len = 4 + 8 + 4 + 10 * n_fields as i64;
    if count_offset < header_len {
        return Err(MethylNormError::MalformedIdat(format!(
            "probe count offset {} overlaps the header",
            count_offset
        )));
    }
    io::copy(
        &mut reader.by_ref().take((count_offset - header_len) as u64),
        &mut io::sink(),
    )?;

    let count = read_i32(&mut reader)?;
    if count < 0 {
        return Err(MethylNormError::MalformedIdat(format!(
            "negative probe count {}",
            count
        )));
    }
    Ok(count as u32)
}

/// Locates the idat file for a basepath, probing the green channel suffixes
/// the vendor layout uses.
pub fn resolve_idat_path(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    for suffix in ["_Grn.idat", "_Grn.idat.gz"] {
        let candidate = PathBuf::from(format!("{}{}", path.display(), suffix));
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(MethylNormError::MissingIdat(path.to_path_buf()))
}

/// Probe count of the idat file at `path`, decompressing gzip on the fly.
pub fn probe_count_from_path(path: &Path) -> Result<u32> {
    let file = BufReader::new(File::open(path)?);
    let count = if path.extension().is_some_and(|ext| ext == "gz") {
        read_probe_count(GzDecoder::new(file))?
    }
    else {
        read_probe_count(file)?
    };
    debug!("{}: {} probes", path.display(), count);
    Ok(count)
}

/// Infers the array design for a basepath from its idat header alone.
pub fn design_from_idat(path: &Path) -> Result<ArrayDesign> {
    let resolved = resolve_idat_path(path)?;
    let count = probe_count_from_path(&resolved)?;
    Ok(ArrayDesign::from_probe_count(count as usize))
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}
