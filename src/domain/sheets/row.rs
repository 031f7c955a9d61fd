use std::fmt::Formatter;

/// Zero-based spreadsheet row, displayed 1-based.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Row {
    index: u32,
}

impl Row {
    pub fn from_index(index: u32) -> Self {
        Row { index }
    }

    /// Returns the row number as a 1-based index.
    /// # Examples
    /// ```
    /// use snowflake_to_sheets::domain::sheets::row::Row;
    /// let row = Row::from_index(0);
    /// assert_eq!(row.row(), "1");
    /// let row = Row::from_index(25);
    /// assert_eq!(row.row(), "26");
    /// ```
    pub fn row(&self) -> String {
        self.index.saturating_add(1).to_string()
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.row())
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row(index: {}, row: {})", self.index(), self.row())
    }
}
