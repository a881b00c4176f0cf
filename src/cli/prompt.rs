//! Line input shared by the shell and the save prompt

use crate::download::SaveDialog;
use crate::error::VidqError;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;

type LineReader = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Prompted line reader.
///
/// One instance owns stdin for the whole process so the shell and the
/// save prompt never read concurrently.
pub struct LineInput {
    lines: Mutex<LineReader>,
}

impl LineInput {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }

    /// Print `prompt` and read one line; `None` at end of input
    pub async fn read_line(&self, prompt: &str) -> Result<Option<String>, VidqError> {
        let mut lines = self.lines.lock().await;
        print!("{}", prompt);
        std::io::stdout().flush()?;
        Ok(lines.next_line().await?)
    }
}

/// Save dialog that asks for a path on the terminal
pub struct TerminalDialog {
    input: Arc<LineInput>,
    default_dir: PathBuf,
}

impl TerminalDialog {
    pub fn new(input: Arc<LineInput>, default_dir: impl Into<PathBuf>) -> Self {
        Self {
            input,
            default_dir: default_dir.into(),
        }
    }
}

#[async_trait]
impl SaveDialog for TerminalDialog {
    async fn choose(&self, suggested_name: &str) -> Result<Option<PathBuf>, VidqError> {
        let proposal = self.default_dir.join(suggested_name);
        let prompt = format!("Save as [{}] (q to cancel): ", proposal.display());
        let answer = self.input.read_line(&prompt).await?;
        Ok(resolve_answer(answer.as_deref(), &self.default_dir, suggested_name))
    }
}

/// Turn a prompt answer into a destination.
///
/// Blank accepts the proposal, `q` or end of input cancels, a relative
/// path is taken from the default directory and a directory receives the
/// suggested name.
pub fn resolve_answer(answer: Option<&str>, default_dir: &Path, suggested_name: &str) -> Option<PathBuf> {
    let answer = answer?.trim();
    if answer.eq_ignore_ascii_case("q") {
        return None;
    }
    if answer.is_empty() {
        return Some(default_dir.join(suggested_name));
    }

    let path = Path::new(answer);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        default_dir.join(path)
    };
    if answer.ends_with(std::path::MAIN_SEPARATOR) || path.is_dir() {
        Some(path.join(suggested_name))
    } else {
        Some(path)
    }
}
