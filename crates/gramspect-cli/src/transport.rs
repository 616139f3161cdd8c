//! Line-delimited JSON-RPC over stdio.
//!
//! One request object per line: `{ "id": ..., "name": "...",
//! "arguments": {...} }`. Each reply is one line: `{ "id": ...,
//! "result": ... }` or `{ "id": ..., "error": { "message", "details" } }`.
//! Malformed lines produce an error reply and the loop continues; a
//! closed stdin ends the loop cleanly.

use std::io::{BufRead, Write};

use gramspect_lib::Engine;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::tools;

#[derive(Deserialize)]
struct Incoming {
    #[serde(default)]
    id: Value,
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Serves requests until the reader closes.
pub fn serve<R: BufRead, W: Write>(
    engine: &Engine,
    reader: R,
    mut writer: W,
) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(engine, &line);
        serde_json::to_writer(&mut writer, &reply)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(())
}

fn handle_line(engine: &Engine, line: &str) -> Value {
    let request: Incoming = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(error) => {
            log::warn!("malformed request line: {error}");
            return json!({
                "id": Value::Null,
                "error": { "message": format!("malformed request: {error}") },
            });
        }
    };

    log::debug!("handling '{}'", request.name);
    match tools::dispatch(engine, &request.name, request.arguments) {
        Ok(result) => json!({ "id": request.id, "result": result }),
        Err(error) => json!({
            "id": request.id,
            "error": {
                "message": error.to_string(),
                "details": error.errors,
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn serve_lines(input: &str) -> Vec<Value> {
        let engine = Engine::with_defaults();
        let mut output = Vec::new();
        serve(&engine, Cursor::new(input.to_owned()), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn round_trips_a_validate_request() {
        let request = json!({
            "id": 1,
            "name": "validate_grammar",
            "arguments": { "grammarText": "grammar T; a : 'x' ;" },
        });
        let replies = serve_lines(&format!("{request}\n"));
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[0]["result"]["valid"], true);
    }

    #[test]
    fn malformed_line_reports_and_continues() {
        let valid = json!({
            "id": "second",
            "name": "validate_grammar",
            "arguments": { "grammarText": "grammar T; a : 'x' ;" },
        });
        let replies = serve_lines(&format!("not json\n{valid}\n"));
        assert_eq!(replies.len(), 2);
        assert!(replies[0]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("malformed request"));
        assert_eq!(replies[1]["id"], "second");
    }

    #[test]
    fn engine_errors_become_error_replies() {
        let request = json!({
            "id": 7,
            "name": "validate_grammar",
            "arguments": { "grammarText": "" },
        });
        let replies = serve_lines(&format!("{request}\n"));
        assert_eq!(replies[0]["id"], 7);
        let details = replies[0]["error"]["details"].as_array().unwrap();
        assert_eq!(details[0]["kind"], "grammar-load-error");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let replies = serve_lines("\n  \n");
        assert!(replies.is_empty());
    }

    #[test]
    fn stream_of_requests_preserves_order() {
        let mk = |id: u32, grammar: &str| {
            json!({
                "id": id,
                "name": "validate_grammar",
                "arguments": { "grammarText": grammar },
            })
            .to_string()
        };
        let input = format!(
            "{}\n{}\n",
            mk(1, "grammar A; a : 'x' ;"),
            mk(2, "grammar B; b : 'y' ;")
        );
        let replies = serve_lines(&input);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["id"], 2);
        assert_eq!(replies[1]["result"]["grammarName"], "B");
    }
}
