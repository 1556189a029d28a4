use crate::progress::Progress;
use crate::tracker::FileChangeSummary;
use crate::ui::icons::{
    BUILD, CHECK, CROSS, FILE_DEL, FILE_MOD, FILE_NEW, PROGRESS, REVIEW, SPARKLE, WARN,
};
use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

const RULE_WIDTH: usize = 70;

/// Plain console output for an orchestration run.
///
/// Agent prose is streamed as it arrives; everything else is line-oriented.
/// All output goes through one writer so tests can capture it.
pub struct ConsoleUI {
    out: Mutex<Box<dyn Write + Send>>,
    verbose: bool,
    interactive: bool,
    colors: bool,
}

impl ConsoleUI {
    /// Write to stdout; the pause spinner is only drawn on a terminal.
    pub fn stdout(verbose: bool) -> Self {
        Self {
            out: Mutex::new(Box::new(std::io::stdout())),
            verbose,
            interactive: console::Term::stdout().is_term(),
            colors: console::colors_enabled(),
        }
    }

    pub fn with_writer(writer: impl Write + Send + 'static, verbose: bool) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
            verbose,
            interactive: false,
            colors: false,
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    fn paint<D>(&self, val: D) -> StyledObject<D> {
        style(val).force_styling(self.colors)
    }

    fn write_raw(&self, text: &str) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        // Console output is best effort; a closed stdout must not abort the run.
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        self.write_raw(&format!("{}\n", msg.as_ref()));
    }

    pub fn blank(&self) {
        self.print_line("");
    }

    pub fn banner(&self) {
        let rule = "=".repeat(RULE_WIDTH);
        self.print_line(format!("\n{}", rule));
        self.print_line(format!(
            "  {}{}",
            SPARKLE,
            self.paint("AUTO-BUILD: autonomous multi-session coding").bold()
        ));
        self.print_line(rule);
    }

    pub fn run_header(
        &self,
        project_dir: &std::path::Path,
        spec_name: &str,
        model: &str,
        max_iterations: Option<u32>,
    ) {
        let budget = match max_iterations {
            Some(n) => n.to_string(),
            None => "Unlimited (runs until all tests pass)".to_string(),
        };
        self.print_line(format!("\nProject directory: {}", project_dir.display()));
        self.print_line(format!("Spec: {}", self.paint(spec_name).cyan()));
        self.print_line(format!("Model: {}", model));
        self.print_line(format!("Max iterations: {}", budget));
    }

    /// Three-line session banner, e.g. `SESSION 4: CODING`.
    pub fn session_header(&self, session: u32, label: &str, is_qa: bool) {
        let rule = "=".repeat(RULE_WIDTH);
        let icon = if is_qa { &REVIEW } else { &BUILD };
        self.print_line(format!("\n{}", rule));
        self.print_line(format!(
            "  {}{}",
            icon,
            self.paint(format!("SESSION {}: {}", session, label)).bold()
        ));
        self.print_line(format!("{}\n", rule));
    }

    /// Agent prose, flushed immediately so the operator sees it live.
    pub fn agent_text(&self, text: &str) {
        self.write_raw(text);
    }

    pub fn tool_start(&self, emoji: &str, name: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => self.print_line(format!(
                "\n{} {} {}",
                emoji,
                self.paint(format!("[Tool: {}]", name)).yellow(),
                detail
            )),
            None => self.print_line(format!(
                "\n{} {}",
                emoji,
                self.paint(format!("[Tool: {}]", name)).yellow()
            )),
        }
    }

    /// Tool input echo, verbose mode only.
    pub fn tool_input(&self, input: &str) {
        if self.verbose {
            self.print_line(format!("   Input: {}", input));
        }
    }

    /// `preview` is only shown in verbose mode.
    pub fn tool_done(&self, preview: Option<&str>) {
        match preview {
            Some(preview) if self.verbose => {
                self.print_line(format!("   {} {}", self.paint("[Done]").green(), preview))
            }
            _ => self.print_line(format!("   {}", self.paint("[Done]").green())),
        }
    }

    pub fn tool_error(&self, preview: &str) {
        self.print_line(format!("   {} {}", self.paint("[Error]").red(), preview));
    }

    pub fn progress_summary(&self, progress: Progress) {
        if progress.is_uninitialized() {
            self.print_line(format!(
                "\n{}Progress: feature list not initialized yet",
                PROGRESS
            ));
            return;
        }
        self.print_line(format!(
            "\n{}Progress: {} tests passing ({:.1}%)",
            PROGRESS,
            self.paint(progress).cyan(),
            progress.percent()
        ));
    }

    pub fn file_changes(&self, changes: &FileChangeSummary, commits: usize) {
        if changes.is_empty() && commits == 0 {
            self.print_line(format!("   {}", self.paint("No file changes").dim()));
            return;
        }
        self.print_line(format!(
            "   {} commit(s), +{} -{} lines",
            commits, changes.total_lines_added, changes.total_lines_removed
        ));
        for path in &changes.files_added {
            self.print_line(format!("   {}{}", FILE_NEW, path.display()));
        }
        for path in &changes.files_modified {
            self.print_line(format!("   {}{}", FILE_MOD, path.display()));
        }
        for path in &changes.files_deleted {
            self.print_line(format!("   {}{}", FILE_DEL, path.display()));
        }
    }

    pub fn info(&self, msg: &str) {
        self.print_line(msg);
    }

    pub fn success(&self, msg: &str) {
        self.print_line(format!("{}{}", CHECK, self.paint(msg).green()));
    }

    pub fn warn(&self, msg: &str) {
        self.print_line(format!("{}{}", WARN, self.paint(msg).yellow()));
    }

    pub fn error(&self, msg: &str) {
        self.print_line(format!("{}{}", CROSS, self.paint(msg).red()));
    }

    /// Wait between sessions, with a spinner when attached to a terminal.
    pub async fn pause(&self, delay: Duration, msg: &str) {
        if delay.is_zero() {
            return;
        }
        if !self.interactive {
            self.print_line(format!("\n{} ({})", msg, format_duration(delay)));
            tokio::time::sleep(delay).await;
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg} {elapsed}")
                .expect("progress bar template is a valid static string"),
        );
        spinner.set_message(msg.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        tokio::time::sleep(delay).await;
        spinner.finish_and_clear();
    }
}

/// `Xs` below a minute, `Xm Ys` otherwise.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

/// Cloneable in-memory writer for capturing console output in tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct SharedBuffer(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
