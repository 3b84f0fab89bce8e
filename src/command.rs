//! The terminal's command language.
//!
//! A line is matched once against fixed literal separators (`in fold`, ` to `,
//! ` max `, `sear/("..")`) and turned into a [`Command`]. Folder arguments are
//! kept as raw text here; membership in the fixed folder set is checked by the
//! dispatcher before anything touches the disk or the network.

use tracing::debug;

use crate::error::{CommandError, Result};

pub const DEFAULT_MAX_IMAGES: usize = 5;

const IN_FOLD: &str = " in fold ";

pub const BANNER: &str = r#"
Hello Neo!!! we can take code
============================================================
Available commands:
  - sweet fold <folder> in fold <folder> : List files in a folder
  - add up in fold <folder> : Upload a file to a folder
  - add down <filename> in fold <folder> : Open a file
  - del <filename> in fold <folder> : Delete a file
  - move <filename> to <new_folder> in fold <current_folder> : Move a file
  - del/all/in time : Delete all files in all folders
  - del/fold <folder> in time : Delete all files in a folder
  - filer chart : Show file size chart
  - list : List all files in all folders
  - search <filename> : Search for a file
  - boot/<link> in fold <folder> [max <number>] : Download images from a website
  - sear/("keyword") in fold <folder> : Search web and save links
  - del/code : Clear command history
  - exit : Close the terminal
============================================================
Type a command below and hit Enter to begin!
"#;

pub const UNKNOWN_HELP: &str = "Unknown command. Try: sweet fold <folder> in fold <folder>, \
add up in fold <folder>, add down <filename> in fold <folder>, del <filename> in fold <folder>, \
move <filename> to <new_folder> in fold <current_folder>, del/all/in time, \
del/fold <folder> in time, filer chart, list, search <filename>, \
boot/<link> in fold <folder> [max <number>], sear/(\"keyword\") in fold <folder>, del/code, exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `sweet fold <F> in fold <F2>`; only the second folder is used.
    ListFolder { folder: String },
    Upload { folder: String },
    Open { filename: String, folder: String },
    Delete { filename: String, folder: String },
    Move {
        filename: String,
        current: String,
        new: String,
    },
    DeleteAllInTime,
    DeleteFolderInTime { folder: String },
    Chart,
    ListAll,
    Search { filename: String },
    BootDownload {
        url: String,
        folder: String,
        max: usize,
    },
    WebSearch { keyword: String, folder: String },
    ClearHistory,
    Exit,
    Unknown(String),
}

impl Command {
    /// Parse one trimmed input line.
    ///
    /// Lines that match no verb become [`Command::Unknown`]; lines that start
    /// with a known verb but break its grammar are a [`CommandError::Usage`].
    pub fn parse(line: &str) -> Result<Command> {
        let line = line.trim();
        let command = parse_line(line)?;
        debug!(?command, "parsed command");
        Ok(command)
    }
}

fn parse_line(line: &str) -> Result<Command> {
    if line.starts_with("sweet fold ") {
        return match split_exact(line, IN_FOLD) {
            Some((_, folder)) => Ok(Command::ListFolder {
                folder: folder.trim().to_string(),
            }),
            None => Err(CommandError::usage("sweet fold <folder> in fold <folder>")),
        };
    }

    if line.starts_with("add up in fold ") {
        let folder = line.split(IN_FOLD).nth(1).unwrap_or_default();
        return Ok(Command::Upload {
            folder: folder.trim().to_string(),
        });
    }

    if line.starts_with("add down ") {
        let usage = || CommandError::usage("add down <filename> in fold <folder>");
        let (head, folder) = split_exact(line, IN_FOLD).ok_or_else(usage)?;
        let filename = head["add down".len()..].trim();
        if filename.is_empty() {
            return Err(usage());
        }
        return Ok(Command::Open {
            filename: filename.to_string(),
            folder: folder.trim().to_string(),
        });
    }

    if line.starts_with("del/fold ") {
        let usage = || CommandError::usage("del/fold <folder> in time");
        let (head, _) = split_exact(line, " in time").ok_or_else(usage)?;
        let folder = head["del/fold".len()..].trim();
        return Ok(Command::DeleteFolderInTime {
            folder: folder.to_string(),
        });
    }

    if line == "del/all/in time" {
        return Ok(Command::DeleteAllInTime);
    }

    if line == "del/code" {
        return Ok(Command::ClearHistory);
    }

    if line.starts_with("del ") {
        let usage = || CommandError::usage("del <filename> in fold <folder>");
        let (head, folder) = split_exact(line, IN_FOLD).ok_or_else(usage)?;
        let filename = head["del".len()..].trim();
        if filename.is_empty() {
            return Err(usage());
        }
        return Ok(Command::Delete {
            filename: filename.to_string(),
            folder: folder.trim().to_string(),
        });
    }

    if line.starts_with("move ") {
        let usage = || CommandError::usage("move <filename> to <new_folder> in fold <current_folder>");
        let (head, current) = split_exact(line, IN_FOLD).ok_or_else(usage)?;
        let (name_part, new) = split_exact(head, " to ").ok_or_else(usage)?;
        let filename = name_part["move".len()..].trim();
        if filename.is_empty() {
            return Err(usage());
        }
        return Ok(Command::Move {
            filename: filename.to_string(),
            current: current.trim().to_string(),
            new: new.trim().to_string(),
        });
    }

    if line == "filer chart" {
        return Ok(Command::Chart);
    }

    if line == "list" {
        return Ok(Command::ListAll);
    }

    if let Some(rest) = line.strip_prefix("search ") {
        return Ok(Command::Search {
            filename: rest.trim().to_string(),
        });
    }

    if let Some(rest) = line.strip_prefix("boot/") {
        return parse_boot(rest);
    }

    if let Some(rest) = line.strip_prefix("sear/(\"") {
        return parse_sear(rest);
    }

    if line == "exit" {
        return Ok(Command::Exit);
    }

    Ok(Command::Unknown(line.to_string()))
}

/// `boot/<url> in fold <folder> [max <n>]`, with `boot/` already stripped.
fn parse_boot(rest: &str) -> Result<Command> {
    let (url, tail) = split_exact(rest, IN_FOLD)
        .ok_or_else(|| CommandError::usage("boot/<link> in fold <folder> [max <number>]"))?;

    let (folder, max) = match tail.split_once(" max ") {
        Some((folder, count)) => (folder, parse_max(count.trim())?),
        None => (tail, DEFAULT_MAX_IMAGES),
    };

    let url = url.trim();
    if url.is_empty() {
        return Err(CommandError::usage("boot/<link> in fold <folder> [max <number>]"));
    }
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };

    Ok(Command::BootDownload {
        url,
        folder: folder.trim().to_string(),
        max,
    })
}

fn parse_max(count: &str) -> Result<usize> {
    let n: i64 = count
        .parse()
        .map_err(|_| CommandError::Usage("max <number> must be a valid integer".into()))?;
    if n <= 0 {
        return Err(CommandError::Usage(
            "max <number> must be a positive integer".into(),
        ));
    }
    usize::try_from(n).map_err(|_| CommandError::Usage("max <number> must be a valid integer".into()))
}

/// `sear/("<keyword>") in fold <folder>`, with `sear/("` already stripped.
fn parse_sear(rest: &str) -> Result<Command> {
    let (keyword_part, folder) = split_exact(rest, IN_FOLD)
        .ok_or_else(|| CommandError::usage("sear/(\"keyword\") in fold <folder>"))?;

    let keyword = keyword_part
        .trim()
        .strip_suffix("\")")
        .ok_or_else(|| {
            CommandError::Usage(
                "Keyword must be enclosed in quotes, e.g., sear/(\"keyword\")".into(),
            )
        })?;

    Ok(Command::WebSearch {
        keyword: keyword.to_string(),
        folder: folder.trim().to_string(),
    })
}

/// Split on `sep` only when it occurs exactly once.
fn split_exact<'a>(s: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    let (head, tail) = s.split_once(sep)?;
    if tail.contains(sep) {
        None
    } else {
        Some((head, tail))
    }
}
