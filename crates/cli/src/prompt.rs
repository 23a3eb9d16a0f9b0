//! Interactive continue prompt.

use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use tracing::warn;

use harvester_core::ContinueDecider;

/// Asks on stdin whether to keep going after a streak of existing
/// descriptors. Re-asks until the answer is Y or N. A closed stdin
/// continues, so unattended runs never stall here.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

#[async_trait]
impl ContinueDecider for StdinPrompt {
    async fn should_continue(&self, streak: u32) -> bool {
        match tokio::task::spawn_blocking(move || ask(streak)).await {
            Ok(Some(answer)) => answer,
            Ok(None) => {
                warn!("No answer on stdin, continuing");
                true
            }
            Err(e) => {
                warn!(error = %e, "Continue prompt failed, continuing");
                true
            }
        }
    }
}

fn ask(streak: u32) -> Option<bool> {
    let stdin = io::stdin();
    let mut stderr = io::stderr();
    loop {
        let _ = write!(
            stderr,
            "Found {} existing files in a row. Do you want to keep downloading? Y/N ",
            streak
        );
        let _ = stderr.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        match parse_answer(&line) {
            Some(answer) => return Some(answer),
            None => {
                let _ = writeln!(stderr, "Invalid input. Please enter \"Y\" or \"N\".");
            }
        }
    }
}

fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_uppercase().as_str() {
        "Y" => Some(true),
        "N" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer(" N "), Some(false));
        assert_eq!(parse_answer("yes"), None);
        assert_eq!(parse_answer(""), None);
    }
}
