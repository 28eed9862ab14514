//! Reading and writing the files of a directory entry

use crate::error::PlaceError;
use crate::place::dir::entry::{Entry, MetaSpec, ZETTEL_EXT};
use crate::place::Result;
use crate::zettel::header::{parse_header_bytes, parse_meta, write_header, write_meta};
use crate::zettel::keys::{
    KEY_DUPLICATES, KEY_SYNTAX, SYNTAX_NONE, SYNTAX_TEXT, SYNTAX_ZMK, VALUE_TRUE,
};
use crate::zettel::{Content, Meta, Zettel};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Metadata of an entry, completed with the keys derived from its files.
pub fn read_meta(entry: &Entry) -> Result<Meta> {
    let meta = match entry.meta_spec {
        MetaSpec::Unknown => return Err(PlaceError::UnknownId(entry.zid)),
        MetaSpec::None => Meta::new(entry.zid),
        MetaSpec::File => parse_meta(entry.zid, &fs::read_to_string(required(&entry.meta_path, entry)?)?),
        MetaSpec::Header => {
            let data = fs::read(required(&entry.content_path, entry)?)?;
            split_header(entry, &data)?.0
        }
    };
    Ok(complete_meta(entry, meta))
}

/// Metadata and content of an entry.
pub fn read_meta_content(entry: &Entry) -> Result<(Meta, Content)> {
    let (meta, content) = match entry.meta_spec {
        MetaSpec::Unknown => return Err(PlaceError::UnknownId(entry.zid)),
        MetaSpec::None => (Meta::new(entry.zid), read_content(entry)?),
        MetaSpec::File => {
            let meta = parse_meta(entry.zid, &fs::read_to_string(required(&entry.meta_path, entry)?)?);
            (meta, read_content(entry)?)
        }
        MetaSpec::Header => {
            let data = fs::read(required(&entry.content_path, entry)?)?;
            let (meta, rest) = split_header(entry, &data)?;
            (meta, Content::new(rest))
        }
    };
    Ok((complete_meta(entry, meta), content))
}

fn read_content(entry: &Entry) -> Result<Content> {
    match &entry.content_path {
        Some(path) => Ok(Content::new(fs::read(path)?)),
        None => Ok(Content::default()),
    }
}

/// Metadata header and content bytes of a `.zettel` file.
fn split_header<'a>(entry: &Entry, data: &'a [u8]) -> Result<(Meta, &'a [u8])> {
    parse_header_bytes(entry.zid, data)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
}

fn required<'a>(path: &'a Option<PathBuf>, entry: &Entry) -> Result<&'a Path> {
    path.as_deref().ok_or(PlaceError::UnknownId(entry.zid))
}

/// Add a syntax derived from the file extension and mark duplicate content files.
fn complete_meta(entry: &Entry, meta: Meta) -> Meta {
    let needs_syntax = meta.get(KEY_SYNTAX).is_none();
    if !needs_syntax && !entry.duplicates {
        return meta;
    }
    let mut builder = meta.to_builder();
    if needs_syntax {
        builder.set(KEY_SYNTAX, syntax_of_ext(&entry.content_ext));
    }
    if entry.duplicates {
        builder.set(KEY_DUPLICATES, VALUE_TRUE);
    }
    builder.build()
}

fn syntax_of_ext(ext: &str) -> &str {
    match ext {
        ZETTEL_EXT => SYNTAX_ZMK,
        "txt" => SYNTAX_TEXT,
        "" => SYNTAX_NONE,
        other => other,
    }
}

/// Write a zettel according to the layout of the entry, then remove `obsolete` files.
pub fn write_zettel(entry: &Entry, zettel: &Zettel, obsolete: &[PathBuf]) -> Result<()> {
    let meta = zettel.meta.with_zid(entry.zid);
    match entry.meta_spec {
        MetaSpec::Unknown => return Err(PlaceError::UnknownId(entry.zid)),
        MetaSpec::None => {
            write_atomic(required(&entry.content_path, entry)?, zettel.content.as_bytes())?;
        }
        MetaSpec::File => {
            write_atomic(required(&entry.meta_path, entry)?, write_meta(&meta).as_bytes())?;
            if let Some(path) = &entry.content_path {
                write_atomic(path, zettel.content.as_bytes())?;
            }
        }
        MetaSpec::Header => {
            let mut data = write_header(&meta).into_bytes();
            data.extend_from_slice(zettel.content.as_bytes());
            write_atomic(required(&entry.content_path, entry)?, &data)?;
        }
    }
    for path in obsolete {
        remove_file(path)?;
    }
    Ok(())
}

/// Remove all files of an entry. Files that are already gone are fine.
pub fn delete_files(entry: &Entry) -> Result<()> {
    for path in entry.paths() {
        remove_file(path)?;
    }
    Ok(())
}

fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Write through a temporary file in the same directory and rename it into place.
///
/// The temporary name starts with a dot, so it never looks like a zettel file.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid file name"))?;
    let tmp = dir.join(format!(".{}.tmp", name));
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
