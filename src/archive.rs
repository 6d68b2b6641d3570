use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZIP_MAGIC)
}

/// Reads every `.class` entry of an in-memory zip/jar, in archive order.
///
/// Directory entries and non-class files are skipped; a class blob carries
/// classes only.
pub fn class_entries(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>, ZipError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().ends_with(".class") {
            continue;
        }
        let name = entry.name().replace('\\', "/");
        // declared sizes are untrusted; grow with what the entry actually yields
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((name, data));
    }
    Ok(entries)
}
