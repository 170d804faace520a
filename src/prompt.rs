//! Interactive database chooser

use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};

use dblogs_collect::{WorkloadChooser, WorkloadInfo};

const MAX_ATTEMPTS: usize = 3;

/// Asks on stderr, reads the answer from stdin
pub struct StdinChooser;

impl WorkloadChooser for StdinChooser {
    fn choose(&self, workloads: &[WorkloadInfo]) -> Result<usize> {
        let stdin = io::stdin();
        prompt_choice(workloads, &mut stdin.lock(), &mut io::stderr())
    }
}

/// List `workloads` and read a selection by number or by name
pub fn prompt_choice<R: BufRead, W: Write>(
    workloads: &[WorkloadInfo],
    input: &mut R,
    output: &mut W,
) -> Result<usize> {
    writeln!(output, "Select a database:")?;
    for (i, workload) in workloads.iter().enumerate() {
        writeln!(
            output,
            "  {:>3}) {} (namespace {})",
            i + 1,
            workload.name,
            workload.namespace
        )?;
    }

    for _ in 0..MAX_ATTEMPTS {
        write!(output, "Database [1-{}]: ", workloads.len())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no selection made");
        }
        let answer = line.trim();

        if let Ok(n) = answer.parse::<usize>() {
            if (1..=workloads.len()).contains(&n) {
                return Ok(n - 1);
            }
        } else if let Some(index) = workloads.iter().position(|w| w.name == answer) {
            return Ok(index);
        }

        writeln!(output, "invalid selection: '{}'", answer)?;
    }

    bail!("no valid selection after {} attempts", MAX_ATTEMPTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workloads() -> Vec<WorkloadInfo> {
        vec![
            WorkloadInfo::new("test", "splice-test"),
            WorkloadInfo::new("prod", "splice-prod"),
        ]
    }

    fn ask(answers: &str) -> (Result<usize>, String) {
        let mut input = answers.as_bytes();
        let mut output = Vec::new();
        let result = prompt_choice(&workloads(), &mut input, &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_select_by_number() {
        let (result, output) = ask("2\n");
        assert_eq!(result.unwrap(), 1);
        assert!(output.contains("  1) test (namespace splice-test)"));
    }

    #[test]
    fn test_select_by_name() {
        let (result, _) = ask("test\n");
        assert_eq!(result.unwrap(), 0);
    }

    #[test]
    fn test_retries_invalid_answers() {
        let (result, output) = ask("9\nnope\n1\n");
        assert_eq!(result.unwrap(), 0);
        assert!(output.contains("invalid selection: '9'"));
        assert!(output.contains("invalid selection: 'nope'"));
    }

    #[test]
    fn test_gives_up_after_attempts() {
        let (result, _) = ask("0\n0\n0\n1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_end_of_input() {
        let (result, _) = ask("");
        assert!(result.unwrap_err().to_string().contains("no selection made"));
    }
}
