//! Confirm/abort gate for memory-risky plans
//!
//! The orchestrator only consults a policy when the estimate is unsafe.
//! Unattended runs use [`AutoReject`]; the CLI can opt into [`PromptPolicy`].

use crate::budget::MemoryEstimate;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::sync::Mutex;
use tracing::{info, warn};

/// Outcome of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Abort,
}

/// Decides whether an unsafe plan may continue
pub trait ConfirmPolicy {
    fn confirm(&self, estimate: &MemoryEstimate) -> Decision;
}

/// Always continue
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAccept;

impl ConfirmPolicy for AutoAccept {
    fn confirm(&self, estimate: &MemoryEstimate) -> Decision {
        warn!(
            estimated_bytes = estimate.estimated_bytes,
            "memory risk accepted by policy"
        );
        Decision::Proceed
    }
}

/// Always abort
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoReject;

impl ConfirmPolicy for AutoReject {
    fn confirm(&self, estimate: &MemoryEstimate) -> Decision {
        info!(
            recommended_percentage = estimate.recommended_percentage,
            "memory risk rejected by policy"
        );
        Decision::Abort
    }
}

/// Ask on `output` and read `y`/`n` from `input`
///
/// Anything other than `y`/`yes` aborts, including end of input.
pub struct PromptPolicy<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead, W: Write> PromptPolicy<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }

    fn ask(input: &mut R, output: &mut W, estimate: &MemoryEstimate) -> std::io::Result<Decision> {
        writeln!(output)?;
        writeln!(output, "WARNING: High memory usage detected!")?;
        writeln!(output, "  Estimated fragment memory: {} MB", to_mb(estimate.estimated_bytes))?;
        if let Some(available) = estimate.available_bytes {
            writeln!(output, "  Available RAM: {} MB", to_mb(available))?;
        }
        if let Some(ratio) = estimate.usage_ratio() {
            writeln!(output, "  Memory usage: {:.1}% of available", ratio * 100.0)?;
        }
        writeln!(output, "  This may cause memory errors during save.")?;
        writeln!(output, "  {}", estimate.recommendation())?;
        write!(output, "  Continue anyway? (y/n) [n]: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Decision::Abort);
        }
        Ok(match line.trim().to_lowercase().as_str() {
            "y" | "yes" => Decision::Proceed,
            _ => Decision::Abort,
        })
    }
}

impl PromptPolicy<std::io::StdinLock<'static>, std::io::Stderr> {
    /// Prompt on the terminal
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> ConfirmPolicy for PromptPolicy<R, W> {
    fn confirm(&self, estimate: &MemoryEstimate) -> Decision {
        let Ok(mut io) = self.io.lock() else {
            return Decision::Abort;
        };
        let (input, output) = &mut *io;
        match Self::ask(input, output, estimate) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "memory risk prompt failed, aborting");
                Decision::Abort
            }
        }
    }
}

/// Configured answer to a memory risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryRiskPolicy {
    /// Ask on the terminal
    Prompt,
    /// Continue regardless
    Accept,
    /// Stop before planning
    #[default]
    Abort,
}

impl MemoryRiskPolicy {
    /// Policy object for this setting
    #[must_use]
    pub fn into_policy(self) -> Box<dyn ConfirmPolicy> {
        match self {
            Self::Prompt => Box::new(PromptPolicy::stdio()),
            Self::Accept => Box::new(AutoAccept),
            Self::Abort => Box::new(AutoReject),
        }
    }
}

impl std::str::FromStr for MemoryRiskPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompt" => Ok(Self::Prompt),
            "accept" => Ok(Self::Accept),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown memory risk policy '{other}' (prompt, accept, abort)")),
        }
    }
}

fn to_mb(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn risky() -> MemoryEstimate {
        crate::budget::estimate(
            crate::budget::DatasetShape {
                trajectories: 100,
                times: 1000,
                variables: 10,
            },
            crate::params::FragmentPercentage::FULL,
            1,
            Some(10_000_000),
        )
    }

    fn prompt(answer: &str) -> (Decision, String) {
        let policy = PromptPolicy::new(Cursor::new(answer.as_bytes().to_vec()), Vec::new());
        let decision = policy.confirm(&risky());
        let (_, out) = policy.io.into_inner().unwrap();
        (decision, String::from_utf8(out).unwrap())
    }

    #[test]
    fn yes_proceeds() {
        let (decision, out) = prompt("y\n");
        assert_eq!(decision, Decision::Proceed);
        assert!(out.contains("Recommended percentage: 25.0%"));
        assert!(out.contains("[n]"));
    }

    #[test]
    fn default_and_eof_abort() {
        assert_eq!(prompt("\n").0, Decision::Abort);
        assert_eq!(prompt("").0, Decision::Abort);
        assert_eq!(prompt("maybe\n").0, Decision::Abort);
        assert_eq!(prompt(" YES \n").0, Decision::Proceed);
    }

    #[test]
    fn auto_policies() {
        assert_eq!(AutoAccept.confirm(&risky()), Decision::Proceed);
        assert_eq!(AutoReject.confirm(&risky()), Decision::Abort);
    }

    #[test]
    fn risk_policy_parses() {
        assert_eq!("accept".parse::<MemoryRiskPolicy>().unwrap(), MemoryRiskPolicy::Accept);
        assert_eq!(MemoryRiskPolicy::default(), MemoryRiskPolicy::Abort);
        assert!("later".parse::<MemoryRiskPolicy>().is_err());
    }
}
