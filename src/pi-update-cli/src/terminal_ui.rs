//! Line-based terminal implementation of the update UI.
//!
//! Everything is written to stderr so stdout stays usable for `status`.
//! Input is read one line at a time from stdin.

use std::io::{BufRead, Write, stderr};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pi_update::{LoaderHandle, NotifyLevel, UpdateUi};

#[derive(Debug, Default)]
pub struct TerminalUi;

impl TerminalUi {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UpdateUi for TerminalUi {
    fn show_loader(&self, title: &str) -> LoaderHandle {
        eprintln!("{} (Ctrl+C to stop waiting)", title);

        let abort = CancellationToken::new();
        let token = abort.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });

        LoaderHandle::new(abort).on_done(move || watcher.abort())
    }

    async fn select(&self, title: &str, options: &[String]) -> Option<String> {
        eprintln!("\n{}", title);
        for (i, option) in options.iter().enumerate() {
            eprintln!("  {}) {}", i + 1, option);
        }
        let _ = write!(stderr(), "Choose [1-{}, Enter to close]: ", options.len());
        let _ = stderr().flush();

        let input = read_line().await?;
        parse_choice(&input, options.len()).map(|i| options[i].clone())
    }

    async fn confirm(&self, title: &str, message: &str) -> bool {
        eprintln!("\n{}", title);
        let _ = write!(stderr(), "{} [y/N] ", message);
        let _ = stderr().flush();

        read_line()
            .await
            .is_some_and(|input| input.trim().eq_ignore_ascii_case("y"))
    }

    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Info => eprintln!("{}", message),
            NotifyLevel::Warning => eprintln!("Warning: {}", message),
            NotifyLevel::Error => eprintln!("Error: {}", message),
        }
    }
}

/// Read one line from stdin without blocking the runtime. `None` on EOF or
/// read error.
async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        match std::io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(input),
        }
    })
    .await
    .ok()
    .flatten()
}

/// Parse a 1-based menu selection into an index.
fn parse_choice(input: &str, count: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    (1..=count).contains(&n).then(|| n - 1)
}
