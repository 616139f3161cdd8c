//! Optional SVG rendering through an external `dot` process.
//!
//! The subprocess gets a wall-clock budget; on expiry it is killed and
//! the rendering is skipped (the DOT text is always in the response, so
//! SVG is best-effort).

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Runs `dot -Tsvg` over the DOT text. `None` when graphviz is missing,
/// fails, or exceeds `budget`.
pub fn render_svg(dot: &str, budget: Duration) -> Option<String> {
    let mut child = Command::new("dot")
        .arg("-Tsvg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    child.stdin.take()?.write_all(dot.as_bytes()).ok()?;

    let deadline = Instant::now() + budget;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    return None;
                }
                break;
            }
            Ok(None) => {
                if Instant::now() > deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    log::warn!("dot subprocess exceeded its {budget:?} budget; killed");
                    return None;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(_) => return None,
        }
    }

    let output = child.wait_with_output().ok()?;
    String::from_utf8(output.stdout).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_present_graphviz_is_handled() {
        // Either graphviz renders the trivial graph or it is absent;
        // both are acceptable, panics are not.
        let result = render_svg("digraph g { a -> b; }", Duration::from_secs(5));
        if let Some(svg) = result {
            assert!(svg.contains("<svg"));
        }
    }
}
