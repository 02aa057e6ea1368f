//! Command source: an ordered sequence of raw lines.
//!
//! Lines are kept as supplied; [`CommandSource::commands`] yields the trimmed
//! non-blank ones. There is no quoting or continuation syntax.

use std::fmt;
use std::path::Path;

use crate::error::InputError;

/// A single trimmed, non-empty command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(String);

impl CommandLine {
    /// Trim a raw line; `None` for blank or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered raw lines from a file, buffer or iterator.
#[derive(Debug, Clone, Default)]
pub struct CommandSource {
    lines: Vec<String>,
}

impl CommandSource {
    /// Split a byte buffer on `\n`.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; a trailing `\r` is
    /// removed by trimming.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for end in memchr::memchr_iter(b'\n', data) {
            lines.push(String::from_utf8_lossy(&data[start..end]).into_owned());
            start = end + 1;
        }
        if start < data.len() {
            lines.push(String::from_utf8_lossy(&data[start..]).into_owned());
        }
        Self { lines }
    }

    /// Read a command file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| InputError::CommandSource {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_bytes(&data))
    }

    /// Raw lines as supplied.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Trimmed non-blank command lines, in source order.
    pub fn commands(&self) -> impl Iterator<Item = CommandLine> + '_ {
        self.lines.iter().filter_map(|l| CommandLine::parse(l))
    }

    /// Number of commands that would be dispatched.
    pub fn command_count(&self) -> usize {
        self.commands().count()
    }
}

impl<S: Into<String>> FromIterator<S> for CommandSource {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&str> for CommandSource {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_skipped() {
        let source: CommandSource = ["", "  ", "show version"].into_iter().collect();
        let commands: Vec<_> = source.commands().collect();
        assert_eq!(commands, [CommandLine::parse("show version").unwrap()]);
        assert_eq!(source.lines().len(), 3);
    }

    #[test]
    fn test_from_bytes_handles_crlf_and_missing_newline() {
        let source = CommandSource::from_bytes(b"show clock\r\n\r\n  terminal length 0  \nexit");
        let commands: Vec<_> = source.commands().map(|c| c.to_string()).collect();
        assert_eq!(commands, ["show clock", "terminal length 0", "exit"]);
    }

    #[test]
    fn test_from_bytes_invalid_utf8_is_replaced() {
        let source = CommandSource::from_bytes(b"show \xffrun\n");
        assert_eq!(source.command_count(), 1);
        assert!(source.lines()[0].contains('\u{FFFD}'));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmds.txt");
        std::fs::write(&path, "show version\n\nshow ip int brief\n").unwrap();

        let source = CommandSource::from_path(&path).unwrap();
        assert_eq!(source.command_count(), 2);

        let err = CommandSource::from_path(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, InputError::CommandSource { .. }));
    }

    #[test]
    fn test_parse_keeps_inner_whitespace() {
        let line = CommandLine::parse("\t show  ip route \n").unwrap();
        assert_eq!(line.as_str(), "show  ip route");
        assert!(CommandLine::parse(" \t ").is_none());
    }
}
