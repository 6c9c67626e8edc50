//! Sequential console prompts
//!
//! Three prompts, asked in order, validated as a whole once collected.
//! Invalid input aborts with a clear message rather than re-prompting, so
//! behavior stays deterministic when the tool is driven by automation.

use std::io::{BufRead, Write};

use crate::error::{InputError, Result};
use crate::service::ServiceDefinition;

/// Collect and validate the three operator inputs
///
/// Prompts for service name, backend address, and scheme on `output`,
/// reading answers from `input`. End-of-input counts as an empty answer.
pub fn collect_service_definition<R, W>(input: &mut R, output: &mut W) -> Result<ServiceDefinition>
where
    R: BufRead,
    W: Write,
{
    let name = ask(input, output, "Service name: ")?;
    if name.is_empty() {
        return Err(InputError::Empty("service name").into());
    }

    let address = ask(
        input,
        output,
        &format!("Backend address for {} (host:port): ", name),
    )?;
    let scheme = ask(input, output, "Scheme (http or https): ")?;

    Ok(ServiceDefinition::new(&name, &address, &scheme)?)
}

/// Print one prompt and read one trimmed line
fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<String> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
