use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest column a sheet can address (`ZZZ`).
pub const MAX_COLUMN: u16 = 18_278;

/// A 1-based sheet column (A=1, B=2, ..., Z=26, AA=27).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Column(u16);

impl Column {
    pub fn new(index: u16) -> Option<Self> {
        if index == 0 || index > MAX_COLUMN {
            return None;
        }
        Some(Column(index))
    }

    /// Parse column letters, case-insensitively. Surrounding whitespace is ignored.
    pub fn from_letters(letters: &str) -> Option<Self> {
        let letters = letters.trim();
        if letters.is_empty() || letters.len() > 3 {
            return None;
        }
        let mut index: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return None;
            }
            index = index * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        Column::new(u16::try_from(index).ok()?)
    }

    pub fn index(self) -> u16 {
        self.0
    }

    /// 0-based offset, handy for indexing a grid row.
    pub fn offset(self) -> usize {
        self.0 as usize - 1
    }

    pub fn letters(self) -> String {
        let mut n = self.0;
        let mut name = String::new();
        while n > 0 {
            n -= 1;
            name.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        name
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

/// A single cell such as `M12`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: Column,
}

impl CellRef {
    pub fn new(row: u32, col: Column) -> Self {
        CellRef { row, col }
    }

    /// Parse `<letters><digits>`; letters must come first and row 0 is rejected.
    pub fn parse(name: &str) -> Option<Self> {
        let (letters, digits) = split_letters_digits(name.trim())?;
        if digits.is_empty() {
            return None;
        }
        let row = digits.parse::<u32>().ok()?;
        if row == 0 {
            return None;
        }
        Some(CellRef {
            row,
            col: Column::from_letters(letters)?,
        })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}

/// A rectangular range. An open `end_row` runs to the last row of the sheet (`D3:D`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeSpec {
    pub start_col: Column,
    pub start_row: u32,
    pub end_col: Column,
    pub end_row: Option<u32>,
}

impl RangeSpec {
    /// Columns `first..=last` from `start_row` to the end of the sheet.
    pub fn open_ended(first: Column, last: Column, start_row: u32) -> Self {
        RangeSpec {
            start_col: first,
            start_row,
            end_col: last,
            end_row: None,
        }
    }

    pub fn parse(spec: &str) -> Option<Self> {
        let (start, end) = spec.trim().split_once(':')?;
        let start = CellRef::parse(start)?;
        let (letters, digits) = split_letters_digits(end.trim())?;
        let end_col = Column::from_letters(letters)?;
        let end_row = if digits.is_empty() {
            None
        } else {
            Some(digits.parse::<u32>().ok()?)
        };
        if end_col < start.col || end_row.is_some_and(|r| r < start.row) {
            return None;
        }
        Some(RangeSpec {
            start_col: start.col,
            start_row: start.row,
            end_col,
            end_row,
        })
    }

    pub fn contains_row(&self, row: u32) -> bool {
        row >= self.start_row && self.end_row.is_none_or(|end| row <= end)
    }

    pub fn width(&self) -> usize {
        (self.end_col.index() - self.start_col.index() + 1) as usize
    }

    /// Fully qualified A1 notation, quoting the sheet name when it needs it.
    pub fn qualified(&self, sheet_name: &str) -> String {
        format!("{}!{}", quote_sheet_name(sheet_name), self)
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", self.start_col, self.start_row, self.end_col)?;
        if let Some(end) = self.end_row {
            write!(f, "{}", end)?;
        }
        Ok(())
    }
}

/// `Sheet1` stays bare, `Term 1` becomes `'Term 1'`.
pub fn quote_sheet_name(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn split_letters_digits(name: &str) -> Option<(&str, &str)> {
    let split = name
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(name.len());
    let (letters, digits) = name.split_at(split);
    if letters.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((letters, digits))
}
