use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::result::{ZipError, ZipResult};
use zip::ZipArchive;

/// Reads a ROM image from disk. Zip archives are unpacked: the first `.gb` or
/// `.gbc` entry wins, otherwise the first file.
pub fn read_rom(path: &Path) -> ZipResult<Vec<u8>> {
    let data = fs::read(path)?;

    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip")) {
        return unzip_archive(&data);
    }
    Ok(data)
}

fn unzip_archive(buffer: &[u8]) -> ZipResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(buffer))?;

    let mut files = Vec::new();
    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        if !file.is_dir() {
            files.push((i, file.name().to_ascii_lowercase()));
        }
    }

    let index = files
        .iter()
        .find(|(_, name)| name.ends_with(".gb") || name.ends_with(".gbc"))
        .or(files.first())
        .map(|(i, _)| *i)
        .ok_or(ZipError::FileNotFound)?;

    let mut file = archive.by_index(index)?;
    let mut rom = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut rom)?;

    Ok(rom)
}
