use std::time::{Duration, Instant};

use anyhow::Context;
use filer_terminal::config::{self, Config};
use filer_terminal::desktop::DesktopPrompter;
use filer_terminal::dispatcher::{Reply, Session};
use filer_terminal::logging;
use filer_terminal::storage::FolderStore;
use filer_terminal::terminal::{Entered, LineKind, Terminal};
use filer_terminal::web::HttpFetcher;
use tracing::{info, warn};

const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(0, 0, 0);
const GREEN: egui::Color32 = egui::Color32::from_rgb(0, 255, 0);
const BRIGHT_GREEN: egui::Color32 = egui::Color32::from_rgb(180, 255, 180);
const RED: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);
const BORDER: egui::Color32 = egui::Color32::from_rgb(85, 85, 85);

fn main() -> anyhow::Result<()> {
    let env_file = config::load_env_file();
    let config = Config::load()?;
    logging::init(&config.logging).context("failed to initialize logging")?;
    if let Err(e) = env_file {
        warn!(error = %e, "ignoring malformed .env file");
    }

    let root = config.storage_root()?;
    let store = FolderStore::open(&root)
        .with_context(|| format!("failed to create storage root {}", root.display()))?;
    let fetcher = HttpFetcher::new(&config.web)?;
    let session = Session::new(store, Box::new(fetcher), config.web.clone());
    info!(root = %root.display(), "storage ready");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_title("File Storage Terminal")
            .with_resizable(true),
        ..Default::default()
    };

    let password = config.password.clone();
    eframe::run_native(
        "File Storage Terminal",
        options,
        Box::new(move |cc| {
            // Green-on-black DOS look
            let mut visuals = egui::Visuals::dark();
            visuals.window_fill = BACKGROUND;
            visuals.panel_fill = BACKGROUND;
            visuals.extreme_bg_color = BACKGROUND;
            cc.egui_ctx.set_visuals(visuals);

            Ok(Box::new(TerminalApp::new(session, password)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("terminal window failed: {e}"))
}

struct TerminalApp {
    session: Session,
    prompter: DesktopPrompter,
    terminal: Terminal,
    show_cursor: bool,
    last_cursor_blink: Instant,
    close_requested: bool,
}

impl TerminalApp {
    fn new(session: Session, password: Option<String>) -> Self {
        let mut app = Self {
            session,
            prompter: DesktopPrompter,
            terminal: Terminal::new(password),
            show_cursor: true,
            last_cursor_blink: Instant::now(),
            close_requested: false,
        };
        if !app.terminal.is_locked() {
            app.boot();
        }
        app
    }

    /// Replay the saved transcript and print the banner.
    fn boot(&mut self) {
        let reply = self.session.start();
        self.show_reply(reply);
    }

    fn show_reply(&mut self, reply: Reply) {
        self.terminal.show_reply(&reply);
        if reply.exit {
            info!("exit requested");
            self.close_requested = true;
        }
    }

    fn entered(&mut self, entered: Entered) {
        match entered {
            Entered::Command(line) => {
                let reply = self.session.submit(&line, &mut self.prompter);
                self.show_reply(reply);
            }
            Entered::Password { accepted: true } => self.boot(),
            Entered::Password { accepted: false } => {
                warn!("wrong password entered");
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Error)
                    .set_title("Error")
                    .set_description("Incorrect password!")
                    .show();
                self.close_requested = true;
            }
        }
    }
}

impl eframe::App for TerminalApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.last_cursor_blink.elapsed() > Duration::from_millis(500) {
            self.show_cursor = !self.show_cursor;
            self.last_cursor_blink = Instant::now();
        }
        ctx.request_repaint_after(Duration::from_millis(500));

        // Commands may open native dialogs, so the input lock is released first
        let events = ctx.input(|i| i.events.clone());
        for event in events {
            match event {
                egui::Event::Key {
                    key, pressed: true, ..
                } => {
                    if let Some(entered) = self.terminal.handle_key(key) {
                        self.entered(entered);
                    }
                }
                egui::Event::Text(text) => self.terminal.insert_text(&text),
                egui::Event::Paste(text) => self.terminal.paste(&text),
                _ => {}
            }
        }

        if self.close_requested {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        let font = egui::FontId::monospace(16.0);

        // Input line pinned to the bottom, like a single-line entry box
        egui::TopBottomPanel::bottom("input")
            .frame(
                egui::Frame::none()
                    .fill(BACKGROUND)
                    .stroke(egui::Stroke::new(1.0, BORDER))
                    .inner_margin(egui::Margin::same(5.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("> ").font(font.clone()).color(GREEN));
                    ui.label(
                        egui::RichText::new(self.terminal.input_display(self.show_cursor))
                            .font(font.clone())
                            .color(GREEN),
                    );
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(BACKGROUND))
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(BACKGROUND)
                    .inner_margin(egui::Margin::same(12.0))
                    .show(ui, |ui| {
                        egui::ScrollArea::vertical()
                            .stick_to_bottom(true)
                            .auto_shrink([false, false])
                            .show(ui, |ui| {
                                ui.with_layout(
                                    egui::Layout::top_down_justified(egui::Align::LEFT),
                                    |ui| {
                                        for line in self.terminal.lines() {
                                            let color = match line.kind {
                                                LineKind::Echo => BRIGHT_GREEN,
                                                LineKind::Error => RED,
                                                LineKind::Output => GREEN,
                                            };
                                            ui.label(
                                                egui::RichText::new(&line.text)
                                                    .font(font.clone())
                                                    .color(color),
                                            );
                                        }
                                    },
                                );
                            });
                    });
            });
    }
}
