//! Terminal rendering and input for the interactive session.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::task::JoinHandle;

use crate::scanner::ScanProgress;
use crate::session::Prompter;

const RULE_WIDTH: usize = 30;

pub const TITLE: &str = "ADB Port Finder and Manager";
pub const DESCRIPTION: &str = "This tool automates the process of identifying available ADB \
(Android Debug Bridge) ports and connecting to an ADB-enabled device. It helps you find an \
open port, connect to the device, install APK files, and disconnect from the device.";

/// Clear the screen if stdout is a terminal.
pub fn clear_console() {
    let mut out = std::io::stdout();
    if out.is_terminal() {
        // Erase display, move cursor home.
        let _ = write!(out, "\x1B[2J\x1B[1;1H");
        let _ = out.flush();
    }
}

pub fn thin_rule() -> String {
    "-".repeat(RULE_WIDTH)
}

pub fn thick_rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn print_banner() {
    println!("{}", TITLE.cyan());
    println!("{}", thin_rule().cyan());
    println!("{}", DESCRIPTION.cyan());
    println!("{}", thick_rule().cyan());
}

/// Print a titled block between two thick rules.
pub fn print_section(title: &str, body: &str, ok: bool) {
    println!("{}", thick_rule().cyan());
    let text = format!("{title}:\n{body}");
    if ok {
        println!("{}", text.green());
    } else {
        println!("{}", text.red());
    }
    println!("{}", thick_rule().cyan());
}

pub fn print_success(line: &str) {
    println!("{}", line.green());
}

pub fn print_error(line: &str) {
    println!("{}", format!("Error: {line}").red());
}

pub fn print_menu() {
    println!("{}", "Options:".yellow());
    println!("{}", "1. Install APK file".yellow());
    println!("{}", "2. Disconnect ADB".yellow());
}

/// Reads answers from stdin, one line per prompt.
pub struct StdinPrompter {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinPrompter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{}", prompt.yellow());
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }
}

/// Progress bar fed from [`ScanProgress`] by a polling task.
pub struct ProgressDisplay {
    bar: ProgressBar,
    ticker: JoinHandle<()>,
}

impl ProgressDisplay {
    pub fn start(progress: ScanProgress) -> Self {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr());
        let style = ProgressStyle::default_bar()
            .template("Progress: {percent:>3}% {wide_bar:.cyan/blue}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);

        let ticked = bar.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(100));
            loop {
                interval.tick().await;
                ticked.set_position((progress.fraction() * 100.0) as u64);
            }
        });
        Self { bar, ticker }
    }

    pub fn finish(self) {
        self.ticker.abort();
        self.bar.finish_and_clear();
    }
}
