//! Procedural code snippets: indented text fragments tagged by the signals
//! they drive.

use crate::ids::SignalId;
use std::collections::BTreeSet;

/// A chunk of procedural code, tagged with the set of signals it drives.
///
/// Snippets accumulate lines while a [`Context`](crate::procedural::ContextFrame)
/// is open and writing into them; at emission time, snippets that share a
/// driven signal are merged into one `always @*` block by the driver
/// union-find (see `rtlgen_verilog`).
#[derive(Debug, Clone, Default)]
pub struct Snippet {
    /// The current indentation, applied to each line as it is appended.
    pub indent_str: String,
    /// Lines of Verilog text, already indented, in emission order.
    pub text_lines: Vec<String>,
    /// The signals this snippet drives (their `SignalId`s, within the
    /// owning module's signal arena).
    pub lvalue_signals: BTreeSet<SignalId>,
}

impl Snippet {
    /// Creates an empty snippet with the base two-space indentation used
    /// inside an `always @*` block.
    pub fn new() -> Self {
        Self {
            indent_str: "    ".to_string(),
            text_lines: Vec::new(),
            lvalue_signals: BTreeSet::new(),
        }
    }

    /// Appends a line at the current indentation, recording any additional
    /// lvalues it drives.
    pub fn add_line(&mut self, line: &str, lvalues: impl IntoIterator<Item = SignalId>) {
        self.lvalue_signals.extend(lvalues);
        self.text_lines.push(format!("{}{}", self.indent_str, line));
    }

    /// Increases indentation by two spaces for subsequently added lines.
    pub fn add_indent(&mut self) {
        self.indent_str.push_str("  ");
    }

    /// Decreases indentation by two spaces.
    pub fn remove_indent(&mut self) {
        let new_len = self.indent_str.len().saturating_sub(2);
        self.indent_str.truncate(new_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_line_records_lvalues() {
        let mut s = Snippet::new();
        s.add_line("x = y;", [SignalId::from_raw(0)]);
        assert_eq!(s.text_lines, vec!["    x = y;".to_string()]);
        assert!(s.lvalue_signals.contains(&SignalId::from_raw(0)));
    }

    #[test]
    fn indent_roundtrip() {
        let mut s = Snippet::new();
        s.add_indent();
        s.add_line("a", []);
        s.remove_indent();
        s.add_line("b", []);
        assert_eq!(s.text_lines[0], "      a");
        assert_eq!(s.text_lines[1], "    b");
    }

    #[test]
    fn remove_indent_floors_at_zero() {
        let mut s = Snippet::new();
        s.indent_str.clear();
        s.remove_indent();
        assert_eq!(s.indent_str, "");
    }
}
