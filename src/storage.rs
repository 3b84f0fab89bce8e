//! The four fixed storage folders and the file operations on them.
//!
//! Layout on disk:
//! ```text
//! {root}/
//! ├── a/
//! ├── b/
//! ├── c/
//! ├── d/
//! └── history.log
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CommandError, Result};

pub const FOLDER_NAMES: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Folder {
    A,
    B,
    C,
    D,
}

impl Folder {
    pub const ALL: [Folder; 4] = [Folder::A, Folder::B, Folder::C, Folder::D];

    pub fn name(self) -> &'static str {
        match self {
            Folder::A => "a",
            Folder::B => "b",
            Folder::C => "c",
            Folder::D => "d",
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Folder {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "a" => Ok(Folder::A),
            "b" => Ok(Folder::B),
            "c" => Ok(Folder::C),
            "d" => Ok(Folder::D),
            other => Err(CommandError::InvalidFolder(other.to_string())),
        }
    }
}

/// A regular file sitting directly inside one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub folder: Folder,
}

impl StoredFile {
    pub fn size_kb(&self) -> f64 {
        self.size as f64 / 1024.0
    }
}

/// Byte totals per folder, walked recursively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeChart {
    pub folders: Vec<(Folder, u64)>,
}

impl SizeChart {
    pub fn total(&self) -> u64 {
        self.folders.iter().map(|(_, size)| size).sum()
    }

    pub fn size_of(&self, folder: Folder) -> u64 {
        self.folders
            .iter()
            .find(|(f, _)| *f == folder)
            .map_or(0, |(_, size)| *size)
    }

    /// Fixed-shape tree rendering used by `filer chart`.
    pub fn render(&self) -> String {
        let mut out = String::from("File Tree:\n");
        out.push_str(&format!("mother ({:.2} KB)\n", kb(self.total())));
        for (i, folder) in Folder::ALL.iter().enumerate() {
            let branch = if i + 1 == Folder::ALL.len() { "└──" } else { "├──" };
            out.push_str(&format!(
                "{} {} ({:.2} KB)\n",
                branch,
                folder,
                kb(self.size_of(*folder))
            ));
        }
        out
    }
}

fn kb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

#[derive(Debug, Clone)]
pub struct FolderStore {
    root: PathBuf,
}

impl FolderStore {
    /// Open the store at `root`, creating the root and all four folders if missing.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        for folder in Folder::ALL {
            fs::create_dir_all(root.join(folder.name()))?;
        }
        debug!(root = %root.display(), "storage folders ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_path(&self, folder: Folder) -> PathBuf {
        self.root.join(folder.name())
    }

    /// Path of `name` inside `folder`, rejecting anything that is not a single plain component.
    pub fn file_path(&self, folder: Folder, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.folder_path(folder).join(name)),
            _ => Err(CommandError::InvalidName(name.to_string())),
        }
    }

    /// Names of every direct entry of `folder`, sorted.
    pub fn list(&self, folder: Folder) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.folder_path(folder))? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Regular files directly inside `folder`, sorted by name.
    pub fn files(&self, folder: Folder) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.folder_path(folder))? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_file() {
                files.push(StoredFile {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    size: meta.len(),
                    folder,
                });
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Files of every folder, grouped in folder order; empty folders are omitted.
    pub fn list_all(&self) -> Result<Vec<(Folder, Vec<StoredFile>)>> {
        let mut groups = Vec::new();
        for folder in Folder::ALL {
            let files = self.files(folder)?;
            if !files.is_empty() {
                groups.push((folder, files));
            }
        }
        Ok(groups)
    }

    /// Copy `source` into `folder` under a fresh UUID name that keeps the source extension.
    pub fn upload(&self, folder: Folder, source: &Path) -> Result<String> {
        let stored_name = unique_name("", extension_of(source));
        fs::copy(source, self.folder_path(folder).join(&stored_name))?;
        info!(%folder, source = %source.display(), stored = %stored_name, "file uploaded");
        Ok(stored_name)
    }

    /// Full path of an existing file, or `NotFound`.
    pub fn locate(&self, folder: Folder, name: &str) -> Result<PathBuf> {
        let path = self.file_path(folder, name)?;
        if path.exists() {
            Ok(path)
        } else {
            Err(CommandError::NotFound {
                name: name.to_string(),
                folder,
            })
        }
    }

    pub fn delete(&self, folder: Folder, name: &str) -> Result<()> {
        let path = self.locate(folder, name)?;
        fs::remove_file(&path)?;
        info!(%folder, name, "file deleted");
        Ok(())
    }

    /// Move `name` from `from` to `to`. The destination is never overwritten.
    pub fn move_file(&self, name: &str, from: Folder, to: Folder) -> Result<()> {
        let source = self.locate(from, name)?;
        let target = self.file_path(to, name)?;
        if target.exists() {
            return Err(CommandError::Conflict {
                name: name.to_string(),
                folder: to,
            });
        }
        fs::rename(&source, &target)?;
        info!(name, %from, %to, "file moved");
        Ok(())
    }

    /// Remove every regular file directly inside `folder`. Subdirectories stay.
    pub fn clear_folder(&self, folder: Folder) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(self.folder_path(folder))? {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(%folder, removed, "folder cleared");
        Ok(removed)
    }

    pub fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for folder in Folder::ALL {
            removed += self.clear_folder(folder)?;
        }
        Ok(removed)
    }

    pub fn chart(&self) -> Result<SizeChart> {
        let mut chart = SizeChart::default();
        for folder in Folder::ALL {
            chart.folders.push((folder, tree_size(&self.folder_path(folder))?));
        }
        Ok(chart)
    }

    /// Folders whose direct listing contains exactly `name`.
    pub fn search(&self, name: &str) -> Result<Vec<Folder>> {
        let mut hits = Vec::new();
        for folder in Folder::ALL {
            if self.list(folder)?.iter().any(|entry| entry == name) {
                hits.push(folder);
            }
        }
        Ok(hits)
    }
}

fn tree_size(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            total += tree_size(&entry.path())?;
        } else if meta.is_file() {
            total += meta.len();
        }
    }
    Ok(total)
}

/// Extension of `path` including the leading dot, or empty.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// `<prefix><uuid><ext>`; collision-free by construction.
pub fn unique_name(prefix: &str, ext: impl AsRef<str>) -> String {
    format!("{}{}{}", prefix, Uuid::new_v4(), ext.as_ref())
}
