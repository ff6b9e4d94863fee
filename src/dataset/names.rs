//! The name object (§3.2): five ordered lists attached to a [`super::Dataset`].
//!
//! Lookup is case-insensitive linear scan for row/column/text-column names
//! (the lists are rarely large enough to justify an index), and returns
//! `None` rather than the original's `-1` sentinel.

/// Title, vector-name, and the three ordered column/row name lists that
/// travel with a [`super::Dataset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Names {
    /// Display title for the dataset (or page).
    pub title: String,
    /// Name of the lone vector column, if any.
    pub vector_name: Option<String>,
    /// Names of the matrix columns, in order.
    pub column_names: Vec<String>,
    /// Names of the rows, in order (shared across vector/matrix/text).
    pub row_names: Vec<String>,
    /// Names of the text columns, in order.
    pub text_column_names: Vec<String>,
}

impl Names {
    /// A names object with only a title set.
    pub fn with_title(title: impl Into<String>) -> Self {
        Names { title: title.into(), ..Default::default() }
    }

    /// Case-insensitive lookup of a row name, returning its position.
    pub fn row_position(&self, name: &str) -> Option<usize> {
        self.row_names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive lookup of a matrix column name, returning its position.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive lookup of a text column name, returning its position.
    pub fn text_column_position(&self, name: &str) -> Option<usize> {
        self.text_column_names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Pad the row-name list with empty strings up to `len`, the documented
    /// behavior for "short name lists" in §3.1's invariants.
    pub fn pad_row_names(&mut self, len: usize) {
        while self.row_names.len() < len {
            self.row_names.push(String::new());
        }
    }

    /// Truncate or pad the row-name list to exactly `len` entries, used
    /// after a row-count-changing operation (stack, split, rm_rows).
    pub fn resize_row_names(&mut self, len: usize) {
        self.row_names.truncate(len);
        self.pad_row_names(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut n = Names::with_title("t");
        n.column_names = vec!["Age".into(), "Sex".into()];
        assert_eq!(n.column_position("age"), Some(0));
        assert_eq!(n.column_position("SEX"), Some(1));
        assert_eq!(n.column_position("height"), None);
    }

    #[test]
    fn pad_and_resize_row_names() {
        let mut n = Names::with_title("t");
        n.row_names = vec!["a".into()];
        n.pad_row_names(3);
        assert_eq!(n.row_names, vec!["a".to_string(), "".to_string(), "".to_string()]);
        n.resize_row_names(1);
        assert_eq!(n.row_names, vec!["a".to_string()]);
    }
}
