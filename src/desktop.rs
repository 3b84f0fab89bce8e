//! Native dialogs and the host's default-open mechanism.

use std::io;
use std::path::{Path, PathBuf};

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use tracing::debug;

use crate::dispatcher::Prompter;

/// Blocking rfd dialogs, shown on top of the terminal window.
#[derive(Debug, Default)]
pub struct DesktopPrompter;

impl Prompter for DesktopPrompter {
    fn confirm(&mut self, title: &str, question: &str) -> bool {
        let answer = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(question)
            .set_buttons(MessageButtons::YesNo)
            .show();
        debug!(title, ?answer, "confirmation answered");
        answer == MessageDialogResult::Yes
    }

    fn pick_file(&mut self) -> Option<PathBuf> {
        FileDialog::new().set_title("Select File").pick_file()
    }

    fn open_path(&mut self, path: &Path) -> io::Result<()> {
        open::that(path)
    }
}
