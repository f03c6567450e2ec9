//! Local live-preview session.
//!
//! [`App`] shares a markdown file through an in-process sync service: an
//! author client submits the file's content as user edits, and a peer
//! client receives them and renders the preview. With watching enabled,
//! every saved change is re-submitted and announced by broadcast.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::client::{ClientError, EditorClient, PumpReport};
use crate::editor::{ChangeSource, EditorBuffer, EditorOptions, Theme};
use crate::preview::HtmlSurface;
use crate::sync::memory::{MemoryConnection, MemoryServer};
use crate::toast::{Toast, ToastStack};
use crate::watcher::SourceWatcher;

/// Client type used for both ends of a local session.
pub type LocalClient = EditorClient<MemoryConnection, EditorBuffer, HtmlSurface, ToastStack>;

const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An author and a peer editing the same document on one server.
#[derive(Debug)]
pub struct Session {
    server: MemoryServer,
    author: LocalClient,
    peer: LocalClient,
}

impl Session {
    /// Start a server and connect both clients to `document`.
    ///
    /// # Errors
    /// Propagates connection or subscription failures of either client.
    pub fn start(document: &str, theme: Theme) -> Result<Self, ClientError> {
        let server = MemoryServer::new();
        let mut author = local_client(document, theme);
        let mut peer = local_client(document, theme);
        author.connect(server.transport())?;
        peer.connect(server.transport())?;
        Ok(Self {
            server,
            author,
            peer,
        })
    }

    /// Make `text` the author's content and let the peer catch up.
    ///
    /// Returns what the peer handled.
    ///
    /// # Errors
    /// Propagates submit and apply failures.
    pub fn publish(&mut self, text: &str, now: Instant) -> Result<PumpReport, ClientError> {
        self.author
            .editor_mut()
            .replace_all(text, ChangeSource::User)?;
        self.author.pump(now)?;
        self.peer.pump(now)
    }

    /// Broadcast `message` to both clients.
    ///
    /// # Errors
    /// Propagates pump failures.
    pub fn announce(&mut self, message: &str, now: Instant) -> Result<(), ClientError> {
        self.server.broadcast(message);
        self.tick(now)
    }

    /// Pump both clients without new input.
    ///
    /// # Errors
    /// Propagates pump failures.
    pub fn tick(&mut self, now: Instant) -> Result<(), ClientError> {
        self.author.pump(now)?;
        self.peer.pump(now)?;
        Ok(())
    }

    pub fn peer_html(&self) -> &str {
        self.peer.preview().html()
    }

    pub fn peer_toasts(&self) -> &[Toast] {
        self.peer.notifications().visible()
    }

    pub const fn author(&self) -> &LocalClient {
        &self.author
    }

    pub const fn peer(&self) -> &LocalClient {
        &self.peer
    }

    pub const fn server(&self) -> &MemoryServer {
        &self.server
    }
}

fn local_client(document: &str, theme: Theme) -> LocalClient {
    EditorClient::new(
        document,
        "local",
        EditorBuffer::new(EditorOptions::plain().with_theme(theme)),
        HtmlSurface::new(),
        ToastStack::new(),
    )
}

/// Main application: shares one file and writes the peer's preview.
#[derive(Debug)]
pub struct App {
    file_path: PathBuf,
    document: Option<String>,
    out: Option<PathBuf>,
    theme: Theme,
    watch_enabled: bool,
}

impl App {
    /// Create a new application for the given file.
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            document: None,
            out: None,
            theme: Theme::default(),
            watch_enabled: false,
        }
    }

    /// Enable or disable file watching.
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    /// Override the shared document name (defaults to the file stem).
    pub fn with_document(mut self, document: Option<String>) -> Self {
        self.document = document;
        self
    }

    /// Write the preview to a file instead of stdout.
    pub fn with_output(mut self, out: Option<PathBuf>) -> Self {
        self.out = out;
        self
    }

    pub const fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// The shared document name.
    pub fn document_name(&self) -> String {
        self.document.clone().unwrap_or_else(|| {
            self.file_path
                .file_stem()
                .map_or_else(|| "untitled".to_string(), |s| s.to_string_lossy().into_owned())
        })
    }

    /// Share the file, write the preview, and keep going while watching.
    ///
    /// # Errors
    /// Fails when the file cannot be read, the session cannot start, or the
    /// preview cannot be written.
    pub fn run(self) -> Result<()> {
        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read {}", self.file_path.display()))?;
        let document = self.document_name();
        let mut session =
            Session::start(&document, self.theme).context("Failed to start session")?;
        session
            .publish(&content, Instant::now())
            .context("Failed to publish content")?;
        self.write_preview(session.peer_html())?;

        if !self.watch_enabled {
            return Ok(());
        }

        let mut watcher = SourceWatcher::new(&self.file_path, WATCH_DEBOUNCE)
            .with_context(|| format!("Failed to watch {}", self.file_path.display()))?;
        info!(file = %watcher.target_path().display(), %document, "watching for changes");

        loop {
            std::thread::sleep(POLL_INTERVAL);
            let now = Instant::now();
            if watcher.poll_settled() {
                self.reload(&mut session, now)?;
            }
            session.tick(now).context("Session error")?;
        }
    }

    fn reload(&self, session: &mut Session, now: Instant) -> Result<()> {
        let text = match fs::read_to_string(&self.file_path) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, file = %self.file_path.display(), "reload failed");
                return Ok(());
            }
        };
        let report = session
            .publish(&text, now)
            .context("Failed to publish change")?;
        if !report.changed() {
            return Ok(());
        }
        session
            .announce(&format!("{} reloaded", display_name(&self.file_path)), now)
            .context("Failed to announce change")?;
        if let Some(toast) = session.peer_toasts().last() {
            info!(toast = %toast.label(), "peer notified");
        }
        self.write_preview(session.peer_html())
    }

    fn write_preview(&self, html: &str) -> Result<()> {
        match &self.out {
            Some(path) => fs::write(path, html)
                .with_context(|| format!("Failed to write preview {}", path.display())),
            None => {
                print!("{html}");
                Ok(())
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorWidget;
    use tempfile::tempdir;

    #[test]
    fn test_publish_reaches_peer_preview() {
        let mut session = Session::start("readme", Theme::Snow).unwrap();
        let report = session.publish("# Hello\n", Instant::now()).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(session.peer_html(), "<h1>Hello</h1>\n");
        assert_eq!(session.peer().editor().text(), "# Hello\n");
    }

    #[test]
    fn test_republish_sends_only_the_difference() {
        let mut session = Session::start("readme", Theme::Snow).unwrap();
        let now = Instant::now();
        session.publish("one\n", now).unwrap();
        session.publish("one\ntwo\n", now).unwrap();
        assert_eq!(
            session.server().text("documents", "readme").as_deref(),
            Some("one\ntwo\n")
        );
        assert_eq!(session.server().version("documents", "readme"), 2);
    }

    #[test]
    fn test_unchanged_publish_reports_no_change() {
        let mut session = Session::start("readme", Theme::Snow).unwrap();
        let now = Instant::now();
        session.publish("same", now).unwrap();
        let report = session.publish("same", now).unwrap();
        assert!(!report.changed());
    }

    #[test]
    fn test_announce_reaches_peer_toasts() {
        let mut session = Session::start("readme", Theme::Bubble).unwrap();
        session
            .announce("readme.md reloaded", Instant::now())
            .unwrap();
        assert_eq!(session.peer_toasts().len(), 1);
        assert_eq!(session.peer_toasts()[0].message, "readme.md reloaded");
        assert_eq!(session.author().editor().options().theme, Theme::Bubble);
    }

    #[test]
    fn test_document_name_defaults_to_file_stem() {
        let app = App::new(PathBuf::from("docs/guide.md"));
        assert_eq!(app.document_name(), "guide");
        let app = app.with_document(Some("custom".to_string()));
        assert_eq!(app.document_name(), "custom");
    }

    #[test]
    fn test_run_writes_preview_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("notes.md");
        let out = dir.path().join("notes.html");
        std::fs::write(&source, "*shared*").unwrap();

        App::new(source)
            .with_output(Some(out.clone()))
            .run()
            .unwrap();

        let html = std::fs::read_to_string(out).unwrap();
        assert_eq!(html, "<p><em>shared</em></p>\n");
    }
}
