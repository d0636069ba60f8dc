//! Qualified column references and the projection label scheme.

use std::fmt;

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Projection label for `column` read through `identifier`.
///
/// This is the contract shared by the SQL projection and the result mapper.
pub fn projection_label(identifier: &str, column: &str) -> String {
    format!("{identifier}_{column}")
}

/// A column read through a table or one of its aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReference {
    table: String,
    alias: Option<String>,
    column: String,
    field_path: Vec<String>,
}

impl ColumnReference {
    /// Reference a column of `table`, identified by the table name itself.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
            column: column.into(),
            field_path: Vec::new(),
        }
    }

    /// Read the column through an alias.
    ///
    /// An empty alias is ignored and the table name stays the identifier.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.alias = (!alias.is_empty()).then_some(alias);
        self
    }

    /// Set the entity field path the value is mapped into.
    pub fn with_field_path(mut self, path: Vec<String>) -> Self {
        self.field_path = path;
        self
    }

    /// Base table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Alias, if one was assigned.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Destination field path, root first.
    pub fn field_path(&self) -> &[String] {
        &self.field_path
    }

    /// The alias if assigned, otherwise the table name.
    pub fn identifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// Qualified name, e.g. `` `author`.`name` ``.
    pub fn sql_notation(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(self.identifier()),
            quote_identifier(&self.column)
        )
    }

    /// Projection label, e.g. `author_name`.
    pub fn alias_notation(&self) -> String {
        projection_label(self.identifier(), &self.column)
    }
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} AS {}",
            self.sql_notation(),
            quote_identifier(&self.alias_notation())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_prefers_alias() {
        let column = ColumnReference::new("user", "name");
        assert_eq!(column.identifier(), "user");
        assert_eq!(column.sql_notation(), "`user`.`name`");
        assert_eq!(column.alias_notation(), "user_name");

        let column = column.with_alias("author");
        assert_eq!(column.identifier(), "author");
        assert_eq!(column.sql_notation(), "`author`.`name`");
        assert_eq!(column.alias_notation(), "author_name");
    }

    #[test]
    fn test_empty_alias_ignored() {
        let column = ColumnReference::new("user", "id").with_alias("");
        assert_eq!(column.alias(), None);
        assert_eq!(column.identifier(), "user");
    }

    #[test]
    fn test_projection_display() {
        let column = ColumnReference::new("post", "title");
        assert_eq!(column.to_string(), "`post`.`title` AS `post_title`");
    }

    #[test]
    fn test_quote_identifier_escapes() {
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }
}
