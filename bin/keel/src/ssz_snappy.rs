//! Files holding one snappy-compressed SSZ object, the format consensus test vectors use.

use std::{fs, path::Path};

use anyhow::anyhow;
use snap::raw::{Decoder, Encoder};
use ssz::{Decode, Encode};

pub fn read_ssz_snappy<T: Decode>(path: &Path) -> anyhow::Result<T> {
    let compressed = fs::read(path)
        .map_err(|err| anyhow!("Failed to read {}: {err}", path.display()))?;
    let ssz_bytes = Decoder::new()
        .decompress_vec(&compressed)
        .map_err(|err| anyhow!("Failed to decompress {}: {err}", path.display()))?;
    T::from_ssz_bytes(&ssz_bytes)
        .map_err(|err| anyhow!("Failed to decode {}: {err:?}", path.display()))
}

pub fn write_ssz_snappy<T: Encode>(path: &Path, value: &T) -> anyhow::Result<()> {
    let compressed = Encoder::new()
        .compress_vec(&value.as_ssz_bytes())
        .map_err(|err| anyhow!("Failed to compress {}: {err}", path.display()))?;
    fs::write(path, compressed)
        .map_err(|err| anyhow!("Failed to write {}: {err}", path.display()))
}
