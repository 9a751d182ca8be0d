use std::fmt;

/// Rows of the contact matrix (`<w{row}c{col}>`).
pub const MATRIX_ROWS: usize = 7;
/// Columns of the contact matrix.
pub const MATRIX_COLS: usize = 5;

/// Column of a line-item row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Item,
    Cantidad,
    Precio,
    Total,
}

impl ItemField {
    pub const ALL: [ItemField; 4] = [
        ItemField::Item,
        ItemField::Cantidad,
        ItemField::Precio,
        ItemField::Total,
    ];

    fn prefix(self) -> &'static str {
        match self {
            ItemField::Item => "item",
            ItemField::Cantidad => "cantidad",
            ItemField::Precio => "precio",
            ItemField::Total => "total",
        }
    }
}

/// A literal token embedded in template text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    /// `<-name->`
    Scalar(String),
    /// `<item{n}>`, `<cantidad{n}>`, `<precio{n}>`, `<total{n}>`, 1-based
    Item { field: ItemField, n: usize },
    /// `<w{row}c{col}>`, 1-based
    Matrix { row: usize, col: usize },
}

impl Marker {
    pub fn scalar(name: impl Into<String>) -> Self {
        Marker::Scalar(name.into())
    }

    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Scalar(name) => write!(f, "<-{}->", name),
            Marker::Item { field, n } => write!(f, "<{}{}>", field.prefix(), n),
            Marker::Matrix { row, col } => write!(f, "<w{}c{}>", row, col),
        }
    }
}

/// Sentinel written in place of the rich-link slot with the given index.
///
/// The `%%` delimiters are reserved for the engine, and the closing
/// delimiter keeps slot 1 from matching inside slot 10.
pub fn sentinel(slot: usize) -> String {
    format!("%%docgen-link-{}%%", slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_tokens() {
        assert_eq!(Marker::scalar("empresa").token(), "<-empresa->");
        assert_eq!(
            Marker::Item {
                field: ItemField::Cantidad,
                n: 3
            }
            .token(),
            "<cantidad3>"
        );
        assert_eq!(Marker::Matrix { row: 7, col: 5 }.token(), "<w7c5>");
    }

    #[test]
    fn test_sentinels_do_not_nest() {
        let one = sentinel(1);
        let ten = sentinel(10);
        assert_ne!(one, ten);
        assert!(!ten.contains(&one));
        assert!(!one.contains(&ten));
    }
}
