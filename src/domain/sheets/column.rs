use std::fmt::Formatter;

/// Zero-based spreadsheet column, displayed with letters (`A`, `B`, ..., `AA`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Column {
    index: u32,
}

impl Column {
    pub fn from_index(index: u32) -> Self {
        Column { index }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the column letters.
    /// # Examples
    /// ```
    /// use snowflake_to_sheets::domain::sheets::column::Column;
    /// assert_eq!(Column::from_index(0).letters(), "A");
    /// assert_eq!(Column::from_index(25).letters(), "Z");
    /// assert_eq!(Column::from_index(26).letters(), "AA");
    /// ```
    pub fn letters(&self) -> String {
        number_to_letters(self.index.saturating_add(1))
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letters())
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Column(index: {}, letters: {})", self.index, self)
    }
}

fn number_to_letters(number: u32) -> String {
    let mut number = number;
    let mut result = String::new();
    while number > 0 {
        let remainder = (number - 1) % 26;
        result.push((remainder as u8 + b'A') as char);
        number = (number - remainder) / 26;
    }
    result.chars().rev().collect()
}
