//! Terminal rendering of streamed responses.

use std::io::{self, Write};
use vitals_conversation::{ResponseUpdate, SessionError};

/// Writes response increments as they arrive.
pub struct Printer<W> {
    out: W,
    mid_line: bool,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            mid_line: false,
        }
    }

    pub fn update(&mut self, update: &ResponseUpdate) -> io::Result<()> {
        match update {
            ResponseUpdate::Text { delta } => {
                write!(self.out, "{delta}")?;
                self.mid_line = !delta.ends_with('\n');
                self.out.flush()
            }
            ResponseUpdate::Structure { content } => {
                let json = serde_json::to_string_pretty(content).map_err(io::Error::other)?;
                self.line(&json)
            }
            ResponseUpdate::ToolCalled { name, .. } => self.line(&format!("[checking {name}]")),
            ResponseUpdate::ToolCompleted { name, result, .. } => match result {
                Ok(_) => self.line(&format!("[{name} returned data]")),
                Err(e) => self.line(&format!("[{name} failed: {e}]")),
            },
        }
    }

    /// Reports an error surfaced by the session.
    pub fn error(&mut self, err: &SessionError) -> io::Result<()> {
        self.line(&format!("error: {err}"))
    }

    pub fn note(&mut self, text: &str) -> io::Result<()> {
        self.line(text)
    }

    /// Ends the current response.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.mid_line {
            writeln!(self.out)?;
            self.mid_line = false;
        }
        self.out.flush()
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        self.finish()?;
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_conversation::{GenerationError, ToolCallId, ToolError};

    fn render(updates: &[ResponseUpdate]) -> String {
        let mut printer = Printer::new(Vec::new());
        for update in updates {
            printer.update(update).expect("write");
        }
        printer.finish().expect("finish");
        String::from_utf8(printer.into_inner()).expect("utf8")
    }

    #[test]
    fn text_streams_inline_and_tools_get_their_own_lines() {
        let output = render(&[
            ResponseUpdate::Text {
                delta: "Let me check.".to_string(),
            },
            ResponseUpdate::ToolCompleted {
                call_id: ToolCallId::new(),
                name: "blood_pressure".to_string(),
                result: Err(ToolError::MissingData {
                    description: "Missing blood pressure data".to_string(),
                }),
            },
            ResponseUpdate::Text {
                delta: "No ".to_string(),
            },
            ResponseUpdate::Text {
                delta: "readings.".to_string(),
            },
        ]);
        assert_eq!(
            output,
            "Let me check.\n[blood_pressure failed: Missing blood pressure data]\nNo readings.\n"
        );
    }

    #[test]
    fn generation_errors_show_their_category() {
        let mut printer = Printer::new(Vec::new());
        printer
            .error(&SessionError::Generation(GenerationError::Timeout))
            .expect("write");
        let output = String::from_utf8(printer.into_inner()).expect("utf8");
        assert!(output.contains("[timeout]"), "output was {output:?}");
    }
}
