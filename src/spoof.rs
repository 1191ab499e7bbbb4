use std::{fs, path::Path};

use anyhow::{Context, Result};
use arrayvec::ArrayVec;
use log::info;

use crate::{ebml::find_element_by_path, error::FormatError};

pub const WEBM_EXTENSION: &str = "webm";

/// Must be greater than 0.0 and less than 3000.0. The funnier the better.
pub const FAKE_DURATION: f64 = 420.69;

/// Segment/Info/Duration element IDs, with their VINT marker bits stripped.
///
/// See <https://github.com/ietf-wg-cellar/matroska-specification/blob/master/ebml_matroska.xml>.
pub const DURATION_PATH: [u64; 3] = [0x0853_8067, 0x0549_a966, 0x0489];

/// [`FAKE_DURATION`] as an EBML float of `width` bytes (RFC 8794, section 7.3),
/// which is big-endian.
pub fn fake_duration_bytes(width: usize) -> Result<ArrayVec<u8, 8>, FormatError> {
    let mut bytes = ArrayVec::new();
    match width {
        0 => (),
        4 => bytes.extend((FAKE_DURATION as f32).to_be_bytes()),
        8 => bytes.extend(FAKE_DURATION.to_be_bytes()),
        width => return Err(FormatError::UnsupportedWidth(width)),
    }
    Ok(bytes)
}

/// Overwrites the duration payload in place. The payload keeps its width, so
/// no element sizes change and neither does the buffer length.
pub fn spoof_duration(data: &mut [u8]) -> Result<(), FormatError> {
    let span = find_element_by_path(data, &DURATION_PATH)?;
    let fake = fake_duration_bytes(span.len())?;
    data[span].copy_from_slice(&fake);
    Ok(())
}

pub fn spoof_file_duration(source: &Path, result: &Path) -> Result<()> {
    info!("Spoofing duration of {}...", source.display());

    let mut data =
        fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?;
    spoof_duration(&mut data)?;
    fs::write(result, &data).with_context(|| format!("Failed to write {}", result.display()))?;

    Ok(())
}
