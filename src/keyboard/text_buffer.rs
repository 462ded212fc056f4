//! Committed text accumulation.
//!
//! Each confirmed key appends one element. Backspace pops the last element
//! (a whole label such as `123`), Enter hands the joined line back to the
//! caller and leaves the buffer empty.

// ── Key actions ────────────────────────────────────────────

/// What committing a key does to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction<'a> {
    /// Flush the buffer as a finished line.
    Enter,
    /// Append a single space.
    Space,
    /// Remove the last committed element, if any.
    Backspace,
    /// Append the label text as-is.
    Literal(&'a str),
}

impl<'a> KeyAction<'a> {
    pub fn for_label(label: &'a str) -> Self {
        match label {
            "Enter" => Self::Enter,
            "Space" => Self::Space,
            "Backspace" => Self::Backspace,
            other => Self::Literal(other),
        }
    }
}

// ── Buffer ─────────────────────────────────────────────────

/// Text typed since the last Enter, one element per committed key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    elements: Vec<String>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a committed key. Returns the finished line when the key is Enter.
    pub fn commit(&mut self, label: &str) -> Option<String> {
        match KeyAction::for_label(label) {
            KeyAction::Enter => Some(self.flush()),
            KeyAction::Space => {
                self.elements.push(" ".to_string());
                None
            }
            KeyAction::Backspace => {
                self.elements.pop();
                None
            }
            KeyAction::Literal(text) => {
                self.elements.push(text.to_string());
                None
            }
        }
    }

    /// Take the current contents and clear the buffer.
    pub fn flush(&mut self) -> String {
        let line = self.elements.concat();
        self.elements.clear();
        line
    }

    pub fn text(&self) -> String {
        self.elements.concat()
    }

    /// Number of committed elements (not characters).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_world_flush() {
        let mut buf = TextBuffer::new();
        let keys = ["H", "E", "L", "L", "O", "Space", "W", "O", "R", "L", "D"];
        for k in keys {
            assert_eq!(buf.commit(k), None);
        }
        assert_eq!(buf.text(), "HELLO WORLD");

        assert_eq!(buf.commit("Enter"), Some("HELLO WORLD".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_backspace_on_empty_is_noop() {
        let mut buf = TextBuffer::new();
        assert_eq!(buf.commit("Backspace"), None);
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn test_backspace_removes_last() {
        let mut buf = TextBuffer::new();
        buf.commit("H");
        buf.commit("I");
        buf.commit("Backspace");
        assert_eq!(buf.text(), "H");
    }

    #[test]
    fn test_multichar_label_is_literal() {
        let mut buf = TextBuffer::new();
        buf.commit("123");
        assert_eq!(buf.text(), "123");
        assert_eq!(buf.len(), 1, "a label is a single element");
        buf.commit("Backspace");
        assert_eq!(buf.text(), "", "backspace removes the whole label");
    }

    #[test]
    fn test_backspace_pops_last_element() {
        let mut buf = TextBuffer::new();
        buf.commit("H");
        buf.commit("123");
        buf.commit("Backspace");
        assert_eq!(buf.text(), "H");

        buf.commit("Shift");
        buf.commit("Space");
        buf.commit("Backspace");
        assert_eq!(buf.text(), "HShift");
        buf.commit("Backspace");
        assert_eq!(buf.text(), "H");
    }

    #[test]
    fn test_enter_on_empty_flushes_empty_line() {
        let mut buf = TextBuffer::new();
        assert_eq!(buf.commit("Enter"), Some(String::new()));
    }

    #[test]
    fn test_key_action_lookup() {
        assert_eq!(KeyAction::for_label("Enter"), KeyAction::Enter);
        assert_eq!(KeyAction::for_label("Space"), KeyAction::Space);
        assert_eq!(KeyAction::for_label("Backspace"), KeyAction::Backspace);
        assert_eq!(KeyAction::for_label("Q"), KeyAction::Literal("Q"));
    }
}
