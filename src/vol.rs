//! Reader and writer for the `.vol` volume format.
//!
//! ```text
//! X: 64                 ┐
//! Y: 64                 │ ASCII header, one `Key: value` per line
//! Z: 32                 │
//! Voxel-Size: 1         │
//! Version: 2            ┘
//! .                       end of header
//! <X·Y·Z raw bytes>       x fastest, then y, then z
//! ```

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::{
    error::{HeightFieldError, Result},
    volume::Volume,
};

/// Reads an 8-bit `.vol` file.
pub fn read_vol<P: AsRef<Path>>(path: P) -> Result<Volume<u8>> {
    read_vol_from(BufReader::new(File::open(path)?))
}

/// Reads an 8-bit `.vol` stream.
///
/// Unknown header keys are ignored. `X`, `Y` and `Z` are required and
/// `Voxel-Size`, when present, must be `1`.
pub fn read_vol_from<R: BufRead>(mut reader: R) -> Result<Volume<u8>> {
    let mut dims: [Option<usize>; 3] = [None; 3];
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(HeightFieldError::VolFormat("header is not terminated by '.'".into()));
        }
        let entry = line.trim_end_matches(['\r', '\n']);
        if entry.trim() == "." {
            break;
        }
        let Some((key, value)) = entry.split_once(':') else {
            return Err(HeightFieldError::VolFormat(format!("malformed header line {entry:?}")));
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "X" => dims[0] = Some(parse_extent(key, value)?),
            "Y" => dims[1] = Some(parse_extent(key, value)?),
            "Z" => dims[2] = Some(parse_extent(key, value)?),
            "Voxel-Size" if value != "1" => {
                return Err(HeightFieldError::VolFormat(format!("unsupported voxel size {value}")));
            }
            _ => {}
        }
    }

    let [size_x, size_y, size_z] = match dims {
        [Some(x), Some(y), Some(z)] => [x, y, z],
        _ => {
            return Err(HeightFieldError::VolFormat(
                "header must define X, Y and Z".into(),
            ));
        }
    };
    let len = size_x
        .checked_mul(size_y)
        .and_then(|n| n.checked_mul(size_z))
        .ok_or_else(|| HeightFieldError::VolFormat("volume dimensions overflow".into()))?;

    let mut data = Vec::with_capacity(len);
    reader.take(len as u64).read_to_end(&mut data)?;
    if data.len() != len {
        return Err(HeightFieldError::VolFormat(format!(
            "expected {len} voxels, found {}",
            data.len()
        )));
    }

    Volume::from_raw(size_x, size_y, size_z, data)
}

/// Writes `volume` as an 8-bit `.vol` file.
pub fn write_vol<P: AsRef<Path>>(path: P, volume: &Volume<u8>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_vol_to(&mut writer, volume)?;
    writer.flush()?;
    Ok(())
}

/// Writes `volume` as an 8-bit `.vol` stream.
pub fn write_vol_to<W: Write>(writer: &mut W, volume: &Volume<u8>) -> Result<()> {
    let [size_x, size_y, size_z] = volume.dims();
    writeln!(writer, "Center-X: {}", size_x / 2)?;
    writeln!(writer, "Center-Y: {}", size_y / 2)?;
    writeln!(writer, "Center-Z: {}", size_z / 2)?;
    writeln!(writer, "X: {size_x}")?;
    writeln!(writer, "Y: {size_y}")?;
    writeln!(writer, "Z: {size_z}")?;
    writeln!(writer, "Voxel-Size: 1")?;
    writeln!(writer, "Alpha-Color: 0")?;
    writeln!(writer, "Voxel-Endian: 0")?;
    writeln!(writer, "Int-Endian: 0123")?;
    writeln!(writer, "Version: 2")?;
    writeln!(writer, ".")?;

    // `values()` iterates in logical [z, y, x] order, which is the payload order.
    let payload: Vec<u8> = volume.values().iter().copied().collect();
    writer.write_all(&payload)?;
    Ok(())
}

fn parse_extent(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| HeightFieldError::VolFormat(format!("invalid {key} extent {value:?}")))
}
