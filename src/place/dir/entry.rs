//! Directory entries
//!
//! An entry describes where the files of one zettel live. File names start with the 14
//! digits of the identifier; the extension decides the role of a file: `.meta` files hold
//! metadata, every other file holds content. A `.zettel` content file without a companion
//! `.meta` file carries its metadata as a header.

use crate::zettel::keys::{KEY_SYNTAX, SYNTAX_NONE, SYNTAX_ZETTELMARKUP, SYNTAX_ZMK};
use crate::zettel::{Meta, Zid};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const META_EXT: &str = "meta";
pub const ZETTEL_EXT: &str = "zettel";

/// Where the metadata of a zettel is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaSpec {
    /// Identifier reserved for a zettel whose files are not written yet
    #[default]
    Unknown,
    /// No metadata; it is derived from the content file
    None,
    /// Separate `.meta` file
    File,
    /// Header of the content file
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub zid: Zid,
    pub meta_spec: MetaSpec,
    pub meta_path: Option<PathBuf>,
    pub content_path: Option<PathBuf>,
    pub content_ext: String,
    /// More than one content file exists for the identifier.
    pub duplicates: bool,
}

impl Entry {
    pub fn new(zid: Zid) -> Self {
        Self {
            zid,
            ..Self::default()
        }
    }

    /// The invalid entry stands for "not in this directory".
    pub fn is_valid(&self) -> bool {
        self.zid.is_valid()
    }

    /// Layout for storing a zettel with the given metadata.
    ///
    /// Markup zettel and zettel with a fenced header are stored in one `.zettel` file,
    /// everything else as `<zid>.<syntax>` plus `<zid>.meta`.
    pub fn for_meta(dir: &Path, meta: &Meta) -> Entry {
        let zid = meta.zid();
        match meta.get(KEY_SYNTAX).map(str::trim) {
            Some(syntax) if !meta.yaml_sep() && !is_header_syntax(syntax) && is_safe_ext(syntax) => {
                Entry {
                    zid,
                    meta_spec: MetaSpec::File,
                    meta_path: Some(file_path(dir, zid, META_EXT)),
                    content_path: Some(file_path(dir, zid, syntax)),
                    content_ext: syntax.to_string(),
                    duplicates: false,
                }
            }
            _ => Entry {
                zid,
                meta_spec: MetaSpec::Header,
                meta_path: None,
                content_path: Some(file_path(dir, zid, ZETTEL_EXT)),
                content_ext: ZETTEL_EXT.to_string(),
                duplicates: false,
            },
        }
    }

    /// Same layout under another identifier.
    pub fn renamed(&self, dir: &Path, zid: Zid) -> Entry {
        Entry {
            zid,
            meta_spec: self.meta_spec,
            meta_path: self.meta_path.as_ref().map(|_| file_path(dir, zid, META_EXT)),
            content_path: self
                .content_path
                .as_ref()
                .map(|_| file_path(dir, zid, &self.content_ext)),
            content_ext: self.content_ext.clone(),
            duplicates: false,
        }
    }

    /// All files of the entry
    pub fn paths(&self) -> Vec<&Path> {
        self.meta_path
            .iter()
            .chain(self.content_path.iter())
            .map(PathBuf::as_path)
            .collect()
    }

    /// Files of this entry that `other` does not use.
    pub fn obsolete_paths(&self, other: &Entry) -> Vec<PathBuf> {
        let keep = other.paths();
        self.paths()
            .into_iter()
            .filter(|p| !keep.contains(p))
            .map(Path::to_path_buf)
            .collect()
    }
}

fn is_header_syntax(syntax: &str) -> bool {
    matches!(syntax, SYNTAX_ZMK | SYNTAX_ZETTELMARKUP | SYNTAX_NONE) || syntax == ZETTEL_EXT
}

fn is_safe_ext(syntax: &str) -> bool {
    !syntax.is_empty()
        && syntax != META_EXT
        && syntax.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

pub fn file_path(dir: &Path, zid: Zid, ext: &str) -> PathBuf {
    dir.join(format!("{}.{}", zid, ext))
}

/// Identifier encoded in a file name, if the name starts with 14 digits.
pub fn zid_of_file_name(name: &str) -> Option<Zid> {
    let prefix = name.get(..Zid::LENGTH)?;
    Zid::parse(prefix).ok()
}

/// Read the directory and build entries for every file that follows the naming scheme.
///
/// Files are visited in name order, so of several content files for one identifier the
/// first in name order is used and the entry is marked as having duplicates.
pub fn scan_directory(dir: &Path) -> io::Result<BTreeMap<Zid, Entry>> {
    if !fs::metadata(dir)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} is not a directory", dir.display()),
        ));
    }
    let mut entries: BTreeMap<Zid, Entry> = BTreeMap::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for item in walker {
        let item = item.map_err(|err| {
            err.into_io_error()
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory walk failed"))
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        let Some(name) = item.file_name().to_str() else {
            continue;
        };
        let Some(zid) = zid_of_file_name(name) else {
            continue;
        };
        let ext = item
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let entry = entries.entry(zid).or_insert_with(|| Entry::new(zid));
        if ext == META_EXT {
            entry.meta_spec = MetaSpec::File;
            entry.meta_path = Some(item.path().to_path_buf());
        } else if entry.content_path.is_none() {
            entry.content_path = Some(item.path().to_path_buf());
            entry.content_ext = ext;
        } else {
            entry.duplicates = true;
        }
    }
    for entry in entries.values_mut() {
        if entry.meta_spec != MetaSpec::File {
            entry.meta_spec = if entry.content_ext == ZETTEL_EXT {
                MetaSpec::Header
            } else {
                MetaSpec::None
            };
        }
    }
    Ok(entries)
}
