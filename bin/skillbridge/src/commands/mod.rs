pub mod code;
pub mod skill;

use skillbridge_core::{Error, ExecutionOutcome};
use std::io::{Read, Write};

/// Whole of stdin as one request document.
pub fn read_request() -> Result<String, Error> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    Ok(input)
}

/// Write the response as a single line on stdout.
pub fn emit(outcome: &ExecutionOutcome) -> anyhow::Result<()> {
    let line = serde_json::to_string(outcome)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()?;
    Ok(())
}
