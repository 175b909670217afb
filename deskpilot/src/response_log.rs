//! Per-request status lines.
//!
//! Every handler reports what it did by pushing a line here instead of returning a
//! value. A fresh log is created for each request, so two requests never share lines.

use log::info;

#[derive(Debug, Default)]
pub struct ResponseLog {
    lines: Vec<String>,
}

impl ResponseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a status line, mirroring it to the application log.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{}", line);
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut log = ResponseLog::new();
        assert!(log.is_empty());
        log.push("first");
        log.push(String::from("second"));
        assert_eq!(log.lines(), ["first", "second"]);
        assert_eq!(log.into_lines(), vec!["first", "second"]);
    }
}
