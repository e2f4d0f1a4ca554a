//! Tar container traversal.

use std::io::Read;

use flate2::read::GzDecoder;
use snow_common::identify_variable;
use tracing::debug;

use crate::error::{DecodeError, DecodeResult};

/// Suffix of the raster members; headers (`.txt.gz`) and anything else are ignored.
pub const DATA_MEMBER_SUFFIX: &str = ".dat.gz";

/// A recognised raster member, decompressed.
#[derive(Debug)]
pub struct RasterMember {
    pub name: String,
    pub variable: &'static str,
    pub payload: Vec<u8>,
}

/// Walk the tarball and hand each recognised raster member to `visit`, in
/// archive order.
///
/// Members are decompressed one at a time so a full-resolution container
/// never holds more than one raw raster in memory.
pub fn for_each_raster<F>(container: &[u8], mut visit: F) -> DecodeResult<()>
where
    F: FnMut(RasterMember) -> DecodeResult<()>,
{
    let mut archive = tar::Archive::new(container);
    let entries = archive
        .entries()
        .map_err(|e| DecodeError::Container(e.to_string()))?;

    for entry in entries {
        let entry = entry.map_err(|e| DecodeError::Container(e.to_string()))?;
        let name = entry
            .path()
            .map_err(|e| DecodeError::Container(e.to_string()))?
            .to_string_lossy()
            .into_owned();

        if !name.ends_with(DATA_MEMBER_SUFFIX) {
            continue;
        }
        let Some(variable) = identify_variable(&name) else {
            debug!(member = %name, "Skipping unrecognised member");
            continue;
        };

        let mut payload = Vec::new();
        GzDecoder::new(entry)
            .read_to_end(&mut payload)
            .map_err(|e| DecodeError::Decompress {
                member: name.clone(),
                message: e.to_string(),
            })?;

        visit(RasterMember {
            name,
            variable,
            payload,
        })?;
    }

    Ok(())
}
