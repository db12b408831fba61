use std::io::{self, Write};

/// Writes revealed text to a terminal incrementally.
///
/// Only the new suffix is written while the text keeps extending what is
/// already on screen. When it does not (a regenerated answer), the output
/// restarts on a fresh line.
pub struct IncrementalPrinter<W: Write> {
    out: W,
    shown: String,
}

impl<W: Write> IncrementalPrinter<W> {
    /// Printer over `out` with nothing shown yet.
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
        }
    }

    /// Bring the output up to date with `text`.
    pub fn render(&mut self, text: &str) -> io::Result<()> {
        if text == self.shown {
            return Ok(());
        }
        match text.strip_prefix(self.shown.as_str()) {
            Some(suffix) => self.out.write_all(suffix.as_bytes())?,
            None => {
                if !self.shown.is_empty() {
                    writeln!(self.out)?;
                }
                self.out.write_all(text.as_bytes())?;
            }
        }
        self.out.flush()?;
        self.shown = text.to_string();
        Ok(())
    }

    /// End the rendered text with a newline.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.shown.is_empty() {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
