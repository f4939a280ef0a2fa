use anyhow::Result;
use std::io::{self, BufRead, Write};

use crate::models::request::AnalysisRequest;

/// Maximum line size for session input: 1 MB.
const MAX_LINE_SIZE: usize = 1024 * 1024;

/// Run an NDJSON streaming session: read requests from stdin, process, write responses to stdout.
pub fn run_session(handler: impl Fn(AnalysisRequest) -> Result<serde_json::Value>) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(stdin.lock(), io::BufWriter::new(stdout.lock()), handler)
}

/// One response line per non-blank request line; failures become error lines.
pub fn serve<R: BufRead, W: Write>(
    input: R,
    mut out: W,
    handler: impl Fn(AnalysisRequest) -> Result<serde_json::Value>,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = if trimmed.len() > MAX_LINE_SIZE {
            error_line(
                "INVALID_REQUEST",
                format!(
                    "Input line exceeds maximum size ({} bytes > {} bytes)",
                    trimmed.len(),
                    MAX_LINE_SIZE
                ),
            )
        } else {
            match serde_json::from_str::<AnalysisRequest>(trimmed) {
                Ok(req) => handler(req).unwrap_or_else(|e| error_value(&e)),
                Err(e) => error_line("INVALID_REQUEST", format!("Invalid JSON request: {e}")),
            }
        };

        serde_json::to_writer(&mut out, &response)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    Ok(())
}

/// Error line carrying the domain code when the failure has one.
fn error_value(e: &anyhow::Error) -> serde_json::Value {
    match e.downcast_ref::<crate::error::ChurnError>() {
        Some(ce) => error_line(&ce.code.to_string(), ce.message.clone()),
        None => error_line("IO_ERROR", e.to_string()),
    }
}

fn error_line(code: &str, message: String) -> serde_json::Value {
    serde_json::json!({ "error": { "code": code, "message": message } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChurnError;
    use crate::models::request::Command;

    fn run(input: &str, handler: impl Fn(AnalysisRequest) -> Result<serde_json::Value>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        serve(input.as_bytes(), &mut out, handler).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn one_response_per_request_skipping_blank_lines() {
        let input = "{\"command\":\"doctor\"}\n\n{\"command\":\"hotspots\",\"dir\":\"/repo\"}\n";
        let responses = run(input, |req| {
            Ok(serde_json::json!({ "command": req.command, "dir": req.dir }))
        });
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["command"], "doctor");
        assert_eq!(responses[1]["dir"], "/repo");
    }

    #[test]
    fn malformed_json_is_invalid_request() {
        let responses = run("{not json}\n", |_| Ok(serde_json::Value::Null));
        assert_eq!(responses[0]["error"]["code"], "INVALID_REQUEST");
    }

    #[test]
    fn handler_errors_keep_their_code() {
        let responses = run("{\"command\":\"summary\"}\n", |req| {
            assert_eq!(req.command, Command::Summary);
            Err(ChurnError::repository_access(".", "not a git repository").into())
        });
        assert_eq!(responses[0]["error"]["code"], "REPOSITORY_ACCESS");
    }

    #[test]
    fn oversized_line_is_rejected() {
        let input = format!("{}\n", "x".repeat(MAX_LINE_SIZE + 1));
        let responses = run(&input, |_| Ok(serde_json::Value::Null));
        assert_eq!(responses[0]["error"]["code"], "INVALID_REQUEST");
    }
}
