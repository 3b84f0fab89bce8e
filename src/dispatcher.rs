//! Executes parsed commands against the folder store and the web helpers.
//!
//! A [`Session`] is created once at startup and owns everything a command can
//! touch. Each submitted line goes through [`Session::submit`], which echoes
//! it, parses it, runs it and turns any failure into a single `Error: ` line.
//! Every printed block is appended to the history log as it is produced.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command::{Command, BANNER};
use crate::config::WebConfig;
use crate::error::{CommandError, Result};
use crate::history::HistoryLog;
use crate::storage::{Folder, FolderStore};
use crate::web::{self, Fetch, ImageOutcome};

/// The interactive pieces a command may need from whoever is driving the session.
pub trait Prompter {
    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&mut self, title: &str, question: &str) -> bool;

    /// Let the user choose a local file to upload.
    fn pick_file(&mut self) -> Option<PathBuf>;

    /// Hand a file to the host's default application.
    fn open_path(&mut self, path: &Path) -> io::Result<()>;
}

/// What the terminal should do after a line was submitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Drop everything currently shown before printing `lines`.
    pub clear_screen: bool,
    /// Printed blocks, in order. A block may span several lines.
    pub lines: Vec<String>,
    pub exit: bool,
}

pub struct Session {
    store: FolderStore,
    history: HistoryLog,
    fetcher: Box<dyn Fetch>,
    web: WebConfig,
}

impl Session {
    pub fn new(store: FolderStore, fetcher: Box<dyn Fetch>, web: WebConfig) -> Self {
        let history = HistoryLog::in_root(store.root());
        Self {
            store,
            history,
            fetcher,
            web,
        }
    }

    pub fn store(&self) -> &FolderStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Replay the previous transcript, then print the banner.
    pub fn start(&self) -> Reply {
        let mut reply = Reply::default();
        match self.history.load() {
            Ok(previous) if !previous.is_empty() => reply.lines.push(previous),
            Ok(_) => {}
            Err(e) => reply.lines.push(format!("Error loading history: {e}")),
        }
        self.emit(&mut reply, BANNER);
        reply
    }

    /// Run one line of input. Empty lines produce an empty reply.
    pub fn submit(&mut self, line: &str, prompter: &mut dyn Prompter) -> Reply {
        let mut reply = Reply::default();
        let line = line.trim();
        if line.is_empty() {
            return reply;
        }

        self.emit(&mut reply, &format!("> {line}"));

        let result = Command::parse(line).and_then(|command| self.execute(command, prompter, &mut reply));
        if let Err(e) = result {
            warn!(command = line, error = %e, "command failed");
            self.emit(&mut reply, &format!("Error: {e}"));
        }
        reply
    }

    fn emit(&self, reply: &mut Reply, text: &str) {
        reply.lines.push(text.to_string());
        if let Err(e) = self.history.append(text) {
            warn!(error = %e, "failed to append to history");
            reply.lines.push(format!("Error saving to history: {e}"));
        }
    }

    fn execute(&mut self, command: Command, prompter: &mut dyn Prompter, reply: &mut Reply) -> Result<()> {
        match command {
            Command::ListFolder { folder } => {
                let folder: Folder = folder.parse()?;
                let entries = self.store.list(folder)?;
                if entries.is_empty() {
                    self.emit(reply, &format!("No files in {folder}."));
                } else {
                    self.emit(reply, &format!("Files in {folder}:"));
                    for entry in entries {
                        self.emit(reply, &format!("  {entry}"));
                    }
                }
            }
            Command::Upload { folder } => {
                let folder: Folder = folder.parse()?;
                if let Some(source) = prompter.pick_file() {
                    let stored = self.store.upload(folder, &source)?;
                    self.emit(reply, &format!("Uploaded file as '{stored}' to '{folder}'"));
                }
            }
            Command::Open { filename, folder } => {
                let folder: Folder = folder.parse()?;
                let path = self.store.locate(folder, &filename)?;
                match prompter.open_path(&path) {
                    Ok(()) => self.emit(reply, &format!("Opening '{filename}' from '{folder}'")),
                    Err(e) => self.emit(reply, &format!("Error opening file: {e}")),
                }
            }
            Command::Delete { filename, folder } => {
                let folder: Folder = folder.parse()?;
                self.store.delete(folder, &filename)?;
                self.emit(reply, &format!("Deleted '{filename}' from '{folder}'"));
            }
            Command::Move {
                filename,
                current,
                new,
            } => {
                let (current, new) = match (current.parse::<Folder>(), new.parse::<Folder>()) {
                    (Ok(current), Ok(new)) => (current, new),
                    _ => return Err(CommandError::InvalidFolders),
                };
                self.store.move_file(&filename, current, new)?;
                self.emit(reply, &format!("Moved '{filename}' from '{current}' to '{new}'"));
            }
            Command::DeleteAllInTime => {
                if prompter.confirm(
                    "Confirm Delete",
                    "Are you sure you want to delete all files in all folders?",
                ) {
                    self.store.clear_all()?;
                    self.emit(reply, "All files deleted from all folders.");
                } else {
                    self.emit(reply, "Delete all files canceled.");
                }
            }
            Command::DeleteFolderInTime { folder } => {
                let folder: Folder = folder.parse()?;
                let question = format!("Are you sure you want to delete all files in folder '{folder}'?");
                if prompter.confirm("Confirm Delete", &question) {
                    self.store.clear_folder(folder)?;
                    self.emit(reply, &format!("All files deleted from folder '{folder}'."));
                } else {
                    self.emit(reply, &format!("Delete files in folder '{folder}' canceled."));
                }
            }
            Command::Chart => {
                let chart = self.store.chart()?;
                self.emit(reply, &chart.render());
            }
            Command::ListAll => {
                let groups = self.store.list_all()?;
                if groups.is_empty() {
                    self.emit(reply, "No files found in any folder.");
                }
                for (folder, files) in groups {
                    self.emit(reply, &format!("Files in {folder}:"));
                    for file in files {
                        self.emit(reply, &format!("  {} ({:.2} KB)", file.name, file.size_kb()));
                    }
                }
            }
            Command::Search { filename } => {
                let hits = self.store.search(&filename)?;
                if hits.is_empty() {
                    return Err(CommandError::NotFoundAnywhere(filename));
                }
                for folder in hits {
                    self.emit(reply, &format!("Found '{filename}' in folder '{folder}'"));
                }
            }
            Command::BootDownload { url, folder, max } => {
                let folder: Folder = folder.parse()?;
                self.boot_download(&url, folder, max, reply)?;
            }
            Command::WebSearch { keyword, folder } => {
                let folder: Folder = folder.parse()?;
                self.web_search(&keyword, folder, reply)?;
            }
            Command::ClearHistory => {
                if prompter.confirm(
                    "Confirm Clear History",
                    "Are you sure you want to clear the command history?",
                ) {
                    self.history.clear()?;
                    reply.lines.clear();
                    reply.clear_screen = true;
                    self.emit(reply, BANNER);
                    self.emit(reply, "Command history cleared successfully.");
                    info!("history cleared");
                } else {
                    self.emit(reply, "Clear history canceled.");
                }
            }
            Command::Exit => {
                reply.exit = true;
            }
            Command::Unknown(raw) => return Err(CommandError::UnknownCommand(raw)),
        }
        Ok(())
    }

    fn boot_download(&self, url: &str, folder: Folder, max: usize, reply: &mut Reply) -> Result<()> {
        self.emit(
            reply,
            &format!("Downloading up to {max} images from {url} to '{folder}'..."),
        );

        let report = web::download_images(
            self.fetcher.as_ref(),
            url,
            &self.store.folder_path(folder),
            max,
        )
        .map_err(|e| CommandError::transport(format!("Failed to access {url}"), e))?;

        if report.found == 0 {
            self.emit(reply, "No supported images (jpg, jpeg, png, gif) found on the website.");
            return Ok(());
        }

        for outcome in &report.outcomes {
            match outcome {
                ImageOutcome::Saved(file_name) => {
                    self.emit(reply, &format!("Downloaded '{file_name}' to '{folder}'"))
                }
                ImageOutcome::Failed { url, reason } => {
                    self.emit(reply, &format!("Failed to download {url} ({reason})"))
                }
            }
        }
        info!(%folder, saved = report.saved(), "image download finished");
        self.emit(
            reply,
            &format!("Completed: {} images downloaded to '{folder}'.", report.saved()),
        );
        Ok(())
    }

    fn web_search(&self, keyword: &str, folder: Folder, reply: &mut Reply) -> Result<()> {
        self.emit(
            reply,
            &format!("Searching for \"{keyword}\" and saving links to a text file in '{folder}'..."),
        );

        let saved = web::search_to_file(
            self.fetcher.as_ref(),
            &self.web,
            keyword,
            &self.store.folder_path(folder),
        )
        .map_err(|e| CommandError::transport("Failed to perform search", e))?;

        match saved {
            Some(saved) => self.emit(
                reply,
                &format!(
                    "Saved {} links to '{}' in '{folder}'",
                    saved.link_count, saved.file_name
                ),
            ),
            None => self.emit(reply, "No relevant links found for the keyword."),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::web::fake::FakeFetcher;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Scripted {
        answer: bool,
        pick: Option<PathBuf>,
        opened: Vec<PathBuf>,
        questions: Vec<String>,
    }

    impl Prompter for Scripted {
        fn confirm(&mut self, _title: &str, question: &str) -> bool {
            self.questions.push(question.to_string());
            self.answer
        }

        fn pick_file(&mut self) -> Option<PathBuf> {
            self.pick.take()
        }

        fn open_path(&mut self, path: &Path) -> io::Result<()> {
            self.opened.push(path.to_path_buf());
            Ok(())
        }
    }

    fn session_with(fetcher: FakeFetcher) -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        let store = FolderStore::open(dir.path().join("MyFiles")).unwrap();
        (dir, Session::new(store, Box::new(fetcher), WebConfig::default()))
    }

    fn session() -> (TempDir, Session) {
        session_with(FakeFetcher::default())
    }

    fn put(session: &Session, folder: Folder, name: &str, bytes: &[u8]) {
        fs::write(session.store().folder_path(folder).join(name), bytes).unwrap();
    }

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.submit(line, &mut Scripted::default()).lines
    }

    #[test]
    fn echo_precedes_output() {
        let (_dir, mut session) = session();
        assert_eq!(
            run(&mut session, "sweet fold x in fold a"),
            vec!["> sweet fold x in fold a", "No files in a."]
        );
    }

    #[test]
    fn blank_line_is_ignored() {
        let (_dir, mut session) = session();
        assert_eq!(session.submit("   ", &mut Scripted::default()), Reply::default());
        assert_eq!(session.history().load().unwrap(), "");
    }

    #[test]
    fn invalid_folder_rejected_everywhere_without_side_effects() {
        let (_dir, mut session) = session();
        put(&session, Folder::A, "keep.txt", b"1");
        let mut prompter = Scripted {
            answer: true,
            ..Default::default()
        };

        for line in [
            "sweet fold a in fold z",
            "add up in fold z",
            "add down keep.txt in fold z",
            "del keep.txt in fold z",
            "del/fold z in time",
            "boot/example.com in fold z",
            "sear/(\"cats\") in fold z",
        ] {
            let reply = session.submit(line, &mut prompter);
            assert_eq!(
                reply.lines.last().unwrap(),
                "Error: Folder must be one of: a, b, c, d",
                "{line}"
            );
        }

        assert!(prompter.questions.is_empty());
        assert_eq!(session.store().list(Folder::A).unwrap(), vec!["keep.txt"]);
    }

    #[test]
    fn move_with_bad_folder_uses_plural_message() {
        let (_dir, mut session) = session();
        put(&session, Folder::A, "keep.txt", b"1");

        for line in ["move keep.txt to z in fold a", "move keep.txt to a in fold z"] {
            assert_eq!(
                run(&mut session, line)[1],
                "Error: Folders must be one of: a, b, c, d",
                "{line}"
            );
        }
        assert_eq!(session.store().list(Folder::A).unwrap(), vec!["keep.txt"]);
    }

    #[test]
    fn invalid_folder_never_hits_the_network() {
        let dir = TempDir::new().unwrap();
        let store = FolderStore::open(dir.path()).unwrap();
        let fetcher = std::rc::Rc::new(FakeFetcher::default());

        struct Shared(std::rc::Rc<FakeFetcher>);
        impl Fetch for Shared {
            fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, crate::error::WebError> {
                self.0.fetch(url)
            }
        }

        let mut session = Session::new(store, Box::new(Shared(fetcher.clone())), WebConfig::default());
        run(&mut session, "boot/example.com in fold q max 2");
        run(&mut session, "boot/example.com in fold a max -1");
        run(&mut session, "sear/(\"cats\") in fold e");
        run(&mut session, "sear/(\"cats in fold a");

        assert!(fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn upload_uses_picked_file() {
        let (dir, mut session) = session();
        let source = dir.path().join("song.mp3");
        fs::write(&source, b"la").unwrap();
        let mut prompter = Scripted {
            pick: Some(source),
            ..Default::default()
        };

        let lines = session.submit("add up in fold c", &mut prompter).lines;

        assert!(lines[1].starts_with("Uploaded file as '"));
        assert!(lines[1].ends_with(".mp3' to 'c'"));
        assert_eq!(session.store().list(Folder::C).unwrap().len(), 1);
    }

    #[test]
    fn upload_cancelled_prints_nothing() {
        let (_dir, mut session) = session();
        assert_eq!(run(&mut session, "add up in fold c"), vec!["> add up in fold c"]);
    }

    #[test]
    fn open_hands_path_to_host() {
        let (_dir, mut session) = session();
        put(&session, Folder::B, "readme.md", b"#");
        let mut prompter = Scripted::default();

        let lines = session.submit("add down readme.md in fold b", &mut prompter).lines;

        assert_eq!(lines[1], "Opening 'readme.md' from 'b'");
        assert_eq!(
            prompter.opened,
            vec![session.store().folder_path(Folder::B).join("readme.md")]
        );

        let lines = session.submit("add down other.md in fold b", &mut prompter).lines;
        assert_eq!(lines[1], "Error: 'other.md' not found in 'b'");
    }

    #[test]
    fn open_failure_is_reported() {
        struct Broken;
        impl Prompter for Broken {
            fn confirm(&mut self, _: &str, _: &str) -> bool {
                false
            }
            fn pick_file(&mut self) -> Option<PathBuf> {
                None
            }
            fn open_path(&mut self, _: &Path) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::Other, "no handler"))
            }
        }

        let (_dir, mut session) = session();
        put(&session, Folder::B, "x.bin", b"0");
        let lines = session.submit("add down x.bin in fold b", &mut Broken).lines;
        assert_eq!(lines[1], "Error opening file: no handler");
    }

    #[test]
    fn delete_and_missing_delete() {
        let (_dir, mut session) = session();
        put(&session, Folder::D, "a.txt", b"a");

        assert_eq!(run(&mut session, "del a.txt in fold d")[1], "Deleted 'a.txt' from 'd'");
        assert_eq!(
            run(&mut session, "del a.txt in fold d")[1],
            "Error: 'a.txt' not found in 'd'"
        );
    }

    #[test]
    fn move_reports_conflict() {
        let (_dir, mut session) = session();
        put(&session, Folder::A, "n.txt", b"new");
        put(&session, Folder::B, "n.txt", b"old");

        assert_eq!(
            run(&mut session, "move n.txt to b in fold a")[1],
            "Error: 'n.txt' already exists in 'b'"
        );
        assert_eq!(
            run(&mut session, "move n.txt to c in fold a")[1],
            "Moved 'n.txt' from 'a' to 'c'"
        );
    }

    #[test]
    fn bulk_delete_needs_confirmation() {
        let (_dir, mut session) = session();
        put(&session, Folder::A, "1", b"1");
        put(&session, Folder::B, "2", b"2");

        let mut no = Scripted::default();
        let lines = session.submit("del/all/in time", &mut no).lines;
        assert_eq!(lines[1], "Delete all files canceled.");
        assert_eq!(session.store().list_all().unwrap().len(), 2);

        let lines = session.submit("del/fold b in time", &mut no).lines;
        assert_eq!(lines[1], "Delete files in folder 'b' canceled.");
        assert_eq!(
            no.questions[1],
            "Are you sure you want to delete all files in folder 'b'?"
        );

        let mut yes = Scripted {
            answer: true,
            ..Default::default()
        };
        let lines = session.submit("del/fold b in time", &mut yes).lines;
        assert_eq!(lines[1], "All files deleted from folder 'b'.");
        assert_eq!(session.store().list(Folder::A).unwrap(), vec!["1"]);

        let lines = session.submit("del/all/in time", &mut yes).lines;
        assert_eq!(lines[1], "All files deleted from all folders.");
        assert!(session.store().list_all().unwrap().is_empty());
    }

    #[test]
    fn list_reports_sizes_in_kb() {
        let (_dir, mut session) = session();
        assert_eq!(run(&mut session, "list")[1], "No files found in any folder.");

        put(&session, Folder::A, "half.bin", &[0u8; 512]);
        put(&session, Folder::C, "big.bin", &[0u8; 3000]);

        assert_eq!(
            run(&mut session, "list"),
            vec![
                "> list",
                "Files in a:",
                "  half.bin (0.50 KB)",
                "Files in c:",
                "  big.bin (2.93 KB)",
            ]
        );
    }

    #[test]
    fn search_lists_every_hit() {
        let (_dir, mut session) = session();
        put(&session, Folder::B, "x.txt", b"");
        put(&session, Folder::D, "x.txt", b"");

        assert_eq!(
            run(&mut session, "search x.txt")[1..],
            [
                "Found 'x.txt' in folder 'b'".to_string(),
                "Found 'x.txt' in folder 'd'".to_string()
            ]
        );
        assert_eq!(
            run(&mut session, "search y.txt")[1],
            "Error: 'y.txt' not found in any folder."
        );
    }

    #[test]
    fn chart_is_one_block() {
        let (_dir, mut session) = session();
        put(&session, Folder::A, "k", &[0u8; 1024]);
        let lines = run(&mut session, "filer chart");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("File Tree:\nmother (1.00 KB)\n├── a (1.00 KB)"));
    }

    #[test]
    fn boot_download_reports_each_image() {
        let fetcher = FakeFetcher::default()
            .with("https://pics.test/", r#"<img src="a.png"><img src="b.gif">"#)
            .with("https://pics.test/a.png", "png")
            .failing("https://pics.test/b.gif", 404);
        let (_dir, mut session) = session_with(fetcher);

        let lines = run(&mut session, "boot/pics.test/ in fold d max 2");

        assert_eq!(lines[1], "Downloading up to 2 images from https://pics.test/ to 'd'...");
        assert!(lines[2].starts_with("Downloaded 'image_") && lines[2].ends_with(".png' to 'd'"));
        assert_eq!(lines[3], "Failed to download https://pics.test/b.gif (Status code: 404)");
        assert_eq!(lines[4], "Completed: 1 images downloaded to 'd'.");
    }

    #[test]
    fn boot_download_page_failure() {
        let fetcher = FakeFetcher::default().failing("https://gone.test/", 500);
        let (_dir, mut session) = session_with(fetcher);

        let lines = run(&mut session, "boot/https://gone.test/ in fold a");

        assert_eq!(
            lines.last().unwrap(),
            "Error: Failed to access https://gone.test/ (Status code: 500)"
        );
        assert!(session.store().list(Folder::A).unwrap().is_empty());
    }

    #[test]
    fn web_search_saves_links() {
        let fetcher = FakeFetcher::default().with(
            "https://www.google.com/search?q=cats",
            r#"<a href="/url?q=https://cats.example/&sa=U">c</a>"#,
        );
        let (_dir, mut session) = session_with(fetcher);

        let lines = run(&mut session, "sear/(\"cats\") in fold b");

        assert_eq!(
            lines[1],
            "Searching for \"cats\" and saving links to a text file in 'b'..."
        );
        assert!(lines[2].starts_with("Saved 1 links to 'search_results_"));
        assert!(lines[2].ends_with(".txt' in 'b'"));
    }

    #[test]
    fn unknown_command_prints_help() {
        let (_dir, mut session) = session();
        let lines = run(&mut session, "format c:");
        assert!(lines[1].starts_with("Error: Unknown command. Try: sweet fold"));
    }

    #[test]
    fn usage_errors_are_rendered() {
        let (_dir, mut session) = session();
        assert_eq!(
            run(&mut session, "boot/example.com in fold a max -1")[1],
            "Error: max <number> must be a positive integer"
        );
        assert_eq!(
            run(&mut session, "move x in fold a")[1],
            "Error: Usage: move <filename> to <new_folder> in fold <current_folder>"
        );
    }

    #[test]
    fn clear_history_round_trip() {
        let (_dir, mut session) = session();
        session.start();
        run(&mut session, "list");

        let mut no = Scripted::default();
        let reply = session.submit("del/code", &mut no);
        assert!(!reply.clear_screen);
        assert_eq!(reply.lines[1], "Clear history canceled.");
        assert!(session.history().load().unwrap().contains("> list"));

        let mut yes = Scripted {
            answer: true,
            ..Default::default()
        };
        let reply = session.submit("del/code", &mut yes);
        assert!(reply.clear_screen);
        assert_eq!(
            reply.lines,
            vec![BANNER.to_string(), "Command history cleared successfully.".to_string()]
        );

        let replay = session.start().lines;
        assert!(!replay[0].contains("> list"));
        assert!(replay[0].starts_with("Hello Neo!!!"));
        assert!(replay[0].ends_with("Command history cleared successfully."));
    }

    #[test]
    fn exit_is_flagged_after_echo() {
        let (_dir, mut session) = session();
        let reply = session.submit("exit", &mut Scripted::default());
        assert!(reply.exit);
        assert_eq!(reply.lines, vec!["> exit"]);
        assert_eq!(session.history().load().unwrap(), "> exit");
    }

    #[test]
    fn transcript_is_mirrored_to_history() {
        let (_dir, mut session) = session();
        put(&session, Folder::A, "f", b"");
        run(&mut session, "sweet fold a in fold a");
        assert_eq!(
            session.history().load().unwrap(),
            "> sweet fold a in fold a\nFiles in a:\n  f"
        );
    }
}
