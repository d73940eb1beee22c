//! Capture command implementation.
//!
//! Streams frames into an in-memory store while reading line commands from
//! stdin. The run ends on Ctrl-C, `quit`, the frame limit or a disconnect.

use std::io::BufRead;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use indicatif::ProgressBar;
use tennis_core::export::encode_plain;
use tennis_core::store::{SharedStore, lock, shared};
use tennis_core::{CaptureEvent, CaptureHandle, CaptureOptions, DatasetCategory, DatasetStore};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::upload::Uploader;
use crate::cli::{DatasetArgs, DeviceArgs};
use crate::config::{
    Config, resolve_category, resolve_device, resolve_label, resolve_timeout,
};
use crate::format::{format_progress, format_receipt, format_status, format_summary};
use crate::style::{self, format_error, format_info, format_success, format_warning};
use crate::util::{connect_device_with_progress, dataset_file_name, write_dataset};

/// Default connection timeout in seconds, matching the `--timeout` default.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// How often the status line is redrawn.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

const HELP: &str = "Commands: clear (drop all sessions), drop (drop the active session), \
                    status, export, upload, quit";

/// Parsed `capture` arguments.
#[derive(Debug, Clone)]
pub struct CaptureArgs {
    pub device: DeviceArgs,
    pub dataset: DatasetArgs,
    pub count: Option<usize>,
    pub export: bool,
    pub upload: bool,
}

/// A command typed on stdin while capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCommand {
    /// Drop every session.
    Clear,
    /// Drop the active session.
    Drop,
    Status,
    Export,
    Upload,
    Quit,
    Help,
}

impl FromStr for LineCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(Self::Clear),
            "drop" => Ok(Self::Drop),
            "status" => Ok(Self::Status),
            "export" => Ok(Self::Export),
            "upload" => Ok(Self::Upload),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            "help" | "?" => Ok(Self::Help),
            other => Err(format!("Unknown command '{}' (type 'help')", other)),
        }
    }
}

/// State shared by the line commands and the end-of-run actions.
struct CaptureContext {
    store: SharedStore,
    label: String,
    category: DatasetCategory,
    output: Option<PathBuf>,
    uploader: Result<Uploader>,
    spinner: Option<ProgressBar>,
    quiet: bool,
    no_color: bool,
}

impl CaptureContext {
    fn say(&self, message: &str) {
        style::print_suspended(self.spinner.as_ref(), message);
    }

    fn note(&self, message: &str) {
        if !self.quiet {
            self.say(&format_info(message, self.no_color));
        }
    }

    fn fail(&self, error: &anyhow::Error) {
        self.say(&format_error(&format!("{:#}", error), self.no_color));
    }

    fn export_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(dataset_file_name(&self.label)))
    }

    /// Write the plain export and clear the store.
    ///
    /// The store is cleared only once the file is written. An empty store
    /// writes `[]`.
    fn export(&self) -> Result<()> {
        let path = self.export_path();
        let frames = {
            let mut store = lock(&self.store);
            let bytes = encode_plain(store.history()).context("Failed to encode dataset")?;
            write_dataset(&path, &bytes)?;
            let frames = store.len();
            store.clear_all();
            frames
        };
        self.say(&format_success(
            &format!("Exported {} frames to {}", frames, path.display()),
            self.no_color,
        ));
        Ok(())
    }

    /// Sign the store contents and upload them. The store is kept.
    async fn upload(&self) -> Result<()> {
        let uploader = self.uploader.as_ref().map_err(|e| anyhow!("{:#}", e))?;
        let signed = uploader.sign_store(&self.store)?;
        let receipt = uploader.send(self.category, &self.label, &signed).await?;
        self.say(&format_receipt(&receipt, self.no_color));
        Ok(())
    }

    /// End-of-run actions. The export runs even when the upload fails.
    async fn finish(&self, upload: bool, export: bool) -> Result<()> {
        let uploaded = if upload { self.upload().await } else { Ok(()) };
        if export {
            if let Err(e) = self.export() {
                if let Err(upload_error) = &uploaded {
                    self.fail(upload_error);
                }
                return Err(e);
            }
        }
        uploaded
    }

    async fn run(&self, command: LineCommand) {
        match command {
            LineCommand::Clear => {
                lock(&self.store).clear_all();
                self.say(&format_success("Cleared all sessions", self.no_color));
            }
            LineCommand::Drop => {
                let dropped = lock(&self.store).clear_active_session();
                let message = match dropped {
                    Some(key) => format_success(&format!("Dropped session {}", key), self.no_color),
                    None => format_warning("No active session", self.no_color),
                };
                self.say(&message);
            }
            LineCommand::Status => {
                let (stats, sizes) = {
                    let store = lock(&self.store);
                    (store.stats(), store.session_sizes())
                };
                self.say(&format_status(&stats, &sizes));
            }
            LineCommand::Export => {
                if let Err(e) = self.export() {
                    self.fail(&e);
                }
            }
            LineCommand::Upload => {
                if let Err(e) = self.upload().await {
                    self.fail(&e);
                }
            }
            LineCommand::Help => self.say(HELP),
            // Handled by the capture loop.
            LineCommand::Quit => {}
        }
    }

    fn refresh_progress(&self) {
        let Some(spinner) = &self.spinner else {
            return;
        };
        let line = {
            let store = lock(&self.store);
            let stats = store.stats();
            let active = stats
                .active_session
                .as_ref()
                .and_then(|key| store.session(key))
                .map_or(0, <[_]>::len);
            format_progress(&stats, active)
        };
        spinner.set_message(line);
    }
}

/// Read stdin lines on a plain thread.
///
/// A blocking stdin read cannot be cancelled, so it is kept off the runtime;
/// the thread simply dies with the process.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

pub async fn cmd_capture(
    args: CaptureArgs,
    output: Option<&PathBuf>,
    config: &Config,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    let identifier = resolve_device(args.device.device, config);
    let timeout = resolve_timeout(args.device.timeout, config, DEFAULT_TIMEOUT_SECS);

    // Fail before connecting if the upload at the end cannot work.
    let uploader = match Uploader::from_args(args.dataset.api_key, args.dataset.hmac_key, config) {
        Err(e) if args.upload => return Err(e.context("--upload needs ingestion keys")),
        other => other,
    };

    let device = Arc::new(
        connect_device_with_progress(identifier.as_deref(), Duration::from_secs(timeout), !quiet)
            .await?,
    );
    if !quiet {
        eprintln!(
            "{}",
            format_success(
                &format!(
                    "Connected to {} ({})",
                    device.name().unwrap_or("Unknown"),
                    device.address()
                ),
                no_color,
            )
        );
    }

    let store = shared(DatasetStore::new());
    let mut options = CaptureOptions::new();
    if let Some(count) = args.count {
        options = options.max_frames(count);
    }
    let mut handle = CaptureHandle::spawn(device.clone(), store.clone(), options);

    let mut ctx = CaptureContext {
        store: store.clone(),
        label: resolve_label(args.dataset.label, config),
        category: resolve_category(args.dataset.category, config),
        output: output.cloned(),
        uploader,
        spinner: (!quiet).then(style::capture_spinner),
        quiet,
        no_color,
    };
    ctx.note(HELP);

    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(CaptureEvent::SessionOpened(key)) => ctx.note(&format!("Session {} opened", key)),
                Some(CaptureEvent::Rejected { actual }) => debug!(actual, "Skipped malformed buffer"),
                None => break,
            },
            line = lines.recv(), if stdin_open => match line {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match line.parse::<LineCommand>() {
                    Ok(LineCommand::Quit) => handle.stop(),
                    Ok(command) => ctx.run(command).await,
                    Err(message) => ctx.say(&format_warning(&message, no_color)),
                },
                None => stdin_open = false,
            },
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                handle.stop();
            }
            _ = ticker.tick() => ctx.refresh_progress(),
        }
    }

    let summary = handle.join().await?;
    if let Some(spinner) = ctx.spinner.take() {
        spinner.finish_and_clear();
    }
    if !quiet {
        eprintln!("{}", format_summary(&summary));
    }
    if let Err(e) = device.disconnect().await {
        // Expected when the sensor already dropped the link.
        debug!(connected = summary.connected, "Disconnect failed: {}", e);
    }

    ctx.finish(args.upload, args.export).await?;

    let left = lock(&store).len();
    if left > 0 && !args.upload && !quiet {
        eprintln!(
            "{}",
            format_warning(
                &format!("{} frames discarded (use --export to keep them)", left),
                no_color,
            )
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tennis_core::SensorFrame;
    use tennis_core::export::decode_plain;

    fn context(output: Option<PathBuf>) -> CaptureContext {
        CaptureContext {
            store: shared(DatasetStore::new()),
            label: "forehand".to_string(),
            category: DatasetCategory::Training,
            output,
            uploader: Uploader::from_args(None, None, &Config::default()),
            spinner: None,
            quiet: true,
            no_color: true,
        }
    }

    fn fill(store: &SharedStore, positions: &[i32]) {
        let mut store = lock(store);
        for &pos in positions {
            store.ingest(SensorFrame::new([0.0, 0.0, 9.8, 0.0, 0.0, 0.0], pos));
        }
    }

    #[test]
    fn test_parse_line_commands() {
        assert_eq!("clear".parse::<LineCommand>(), Ok(LineCommand::Clear));
        assert_eq!(" DROP \n".parse::<LineCommand>(), Ok(LineCommand::Drop));
        assert_eq!("status".parse::<LineCommand>(), Ok(LineCommand::Status));
        assert_eq!("export".parse::<LineCommand>(), Ok(LineCommand::Export));
        assert_eq!("upload".parse::<LineCommand>(), Ok(LineCommand::Upload));
        assert_eq!("q".parse::<LineCommand>(), Ok(LineCommand::Quit));
        assert_eq!("?".parse::<LineCommand>(), Ok(LineCommand::Help));
        assert!("record".parse::<LineCommand>().unwrap_err().contains("record"));
    }

    #[test]
    fn test_export_path_defaults_to_label() {
        assert_eq!(context(None).export_path(), PathBuf::from("dataset-forehand.json"));
        let explicit = PathBuf::from("/tmp/out.json");
        assert_eq!(context(Some(explicit.clone())).export_path(), explicit);
    }

    #[test]
    fn test_export_writes_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset-forehand.json");
        let ctx = context(Some(path.clone()));
        fill(&ctx.store, &[5, 6, 7, 2, 3]);

        ctx.export().unwrap();

        let frames = decode_plain(&std::fs::read(&path).unwrap()).unwrap();
        let positions: Vec<i32> = frames.iter().map(|f| f.pos).collect();
        assert_eq!(positions, vec![5, 6, 7, 2, 3]);
        assert!(lock(&ctx.store).is_empty());
    }

    #[test]
    fn test_failed_export_keeps_frames() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Some(dir.path().join("missing").join("out.json")));
        fill(&ctx.store, &[1, 2]);

        assert!(ctx.export().is_err());
        assert_eq!(lock(&ctx.store).len(), 2);
    }

    #[test]
    fn test_export_empty_store_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        context(Some(path.clone())).export().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_failed_upload_still_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset-forehand.json");
        let ctx = context(Some(path.clone()));
        fill(&ctx.store, &[1, 2, 3]);

        let err = ctx.finish(true, true).await.unwrap_err();

        assert!(err.to_string().contains("API key"));
        let frames = decode_plain(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(lock(&ctx.store).is_empty());
    }

    #[tokio::test]
    async fn test_finish_without_actions_keeps_frames() {
        let ctx = context(None);
        fill(&ctx.store, &[1, 2]);

        ctx.finish(false, false).await.unwrap();
        assert_eq!(lock(&ctx.store).len(), 2);
    }

    #[tokio::test]
    async fn test_drop_and_clear_commands() {
        let ctx = context(None);
        fill(&ctx.store, &[5, 6, 7, 2, 3]);

        ctx.run(LineCommand::Drop).await;
        assert_eq!(lock(&ctx.store).len(), 3);
        assert_eq!(lock(&ctx.store).active_session_key(), None);

        ctx.run(LineCommand::Clear).await;
        assert!(lock(&ctx.store).is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_keys_reports_error() {
        let ctx = context(None);
        fill(&ctx.store, &[1]);
        let err = ctx.upload().await.unwrap_err();
        assert!(err.to_string().contains("API key"));
        assert_eq!(lock(&ctx.store).len(), 1);
    }
}
