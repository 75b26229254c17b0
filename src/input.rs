/// Editable text the user has typed so far. The whole string is forwarded to
/// the session after every edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputBuffer {
    text: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn write(&mut self, c: char) {
        self.text.push(c);
    }

    /// Removes the last character. Returns false when already empty.
    pub fn backspace(&mut self) -> bool {
        self.text.pop().is_some()
    }

    /// Removes trailing whitespace and then the word before it
    pub fn delete_word(&mut self) -> bool {
        let before = self.text.len();
        let trimmed = self.text.trim_end().len();
        self.text.truncate(trimmed);
        let cut = self
            .text
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        self.text.truncate(cut);
        self.text.len() != before
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}
