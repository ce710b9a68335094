use std::io::prelude::*;
use std::io::Cursor;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

pub type PseudoFile = Cursor<Vec<u8>>;

pub const KMZ_DOCUMENT: &str = "doc.kml";

pub fn kmz_to_pseudofile<R: Read + Seek>(reader: R) -> Result<PseudoFile> {
    let mut archive = ZipArchive::new(reader)?;

    let index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .is_ok_and(|f| f.name().to_ascii_lowercase().ends_with(".kml"))
        })
        .ok_or(Error::NoKmlInArchive)?;

    let mut inner_file = archive.by_index(index)?;
    let mut tmp = Cursor::new(Vec::new());
    inner_file.read_to_end(tmp.get_mut())?;

    Ok(tmp)
}

pub fn pseudofile_to_kmz<W: Write + Seek>(writer: W, kml: &[u8]) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(KMZ_DOCUMENT, options)?;
    zip.write_all(kml)?;
    Ok(zip.finish()?)
}

pub fn pseudofile_to_str(file: &PseudoFile) -> Result<&str> {
    Ok(std::str::from_utf8(&file.get_ref()[..])?)
}
