//! Interactive terminal prompt
//!
//! Implements the decision-source port against stdin/stdout. Reads run on
//! a blocking thread so the async runtime is never stalled on an operator
//! thinking.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use deconflict_core::ports::{Decision, IDecisionSource, PairSummary};

use crate::output::format_bytes;

/// Decision source backed by the operator's terminal
#[derive(Debug, Default)]
pub struct InteractivePrompt;

impl InteractivePrompt {
    /// Creates a new `InteractivePrompt`
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl IDecisionSource for InteractivePrompt {
    async fn decide(&self, pair: &PairSummary) -> Result<Decision> {
        println!();
        println!("Conflict: {}", pair.conflicted.display());
        println!(
            "  Original:    {} ({})",
            pair.original.display(),
            format_bytes(pair.size_original)
        );
        println!(
            "  Conflicted:  {} ({})",
            pair.conflicted.display(),
            format_bytes(pair.size_conflicted)
        );
        if let Some(modified) = pair.modified_original {
            println!("  Original modified:    {}", modified.format("%Y-%m-%d %H:%M:%S"));
        }
        if let Some(modified) = pair.modified_conflicted {
            println!("  Conflicted modified:  {}", modified.format("%Y-%m-%d %H:%M:%S"));
        }
        println!("  Reason:      {}", pair.reason);

        loop {
            let answer =
                ask("Keep [o]riginal, keep [c]onflicted, [s]kip, [v]iew diff? [o/c/s/v]: ").await?;
            match parse_choice(&answer) {
                Some(decision) => return Ok(decision),
                None => println!("Please answer o, c, s or v."),
            }
        }
    }

    async fn confirm_delete(&self, path: &Path) -> Result<bool> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let answer = ask(&format!("Delete '{name}'? [y/N]: ")).await?;
        Ok(matches!(answer.as_str(), "y" | "yes"))
    }
}

/// Maps a typed answer to a decision; `None` asks again
fn parse_choice(answer: &str) -> Option<Decision> {
    match answer {
        "o" | "original" | "keep-original" => Some(Decision::KeepOriginal),
        "c" | "conflicted" | "keep-conflicted" => Some(Decision::KeepConflicted),
        "s" | "skip" | "" => Some(Decision::Skip),
        "v" | "view" | "diff" => Some(Decision::View),
        _ => None,
    }
}

/// Prints a prompt and reads one trimmed, lowercased line from stdin
async fn ask(prompt: &str) -> Result<String> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || -> Result<String> {
        print!("{prompt}");
        std::io::stdout().flush().context("flush stdout")?;
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("read from stdin")?;
        Ok(line.trim().to_lowercase())
    })
    .await
    .context("prompt task failed")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice_accepts_short_and_long_forms() {
        assert_eq!(parse_choice("o"), Some(Decision::KeepOriginal));
        assert_eq!(parse_choice("original"), Some(Decision::KeepOriginal));
        assert_eq!(parse_choice("c"), Some(Decision::KeepConflicted));
        assert_eq!(parse_choice("s"), Some(Decision::Skip));
        assert_eq!(parse_choice("v"), Some(Decision::View));
        assert_eq!(parse_choice("view"), Some(Decision::View));
    }

    #[test]
    fn test_parse_choice_empty_means_skip() {
        assert_eq!(parse_choice(""), Some(Decision::Skip));
    }

    #[test]
    fn test_parse_choice_rejects_garbage() {
        assert_eq!(parse_choice("x"), None);
        assert_eq!(parse_choice("yes"), None);
    }
}
