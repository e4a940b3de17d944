//! Query result tables and template arguments.

use std::collections::HashMap;
use std::fmt::Write;

use crate::directive::{BindingValue, Bindings};
use crate::error::ViewError;
use crate::markup::{OUTPUT_TYPE_BLOCK, escape_attr, escape_text};

/// Something that renders as a storage-format table.
pub trait TableMarkup: Send + Sync {
    /// Storage-format markup for the table.
    ///
    /// The outermost element must carry an `ac:parameter ac:name="id"` child
    /// whose text is `render_id`, so the view can find and clear it later.
    fn to_storage_markup(&self, render_id: &str) -> String;
}

/// Display labels for the standard artifact columns.
pub const ARTIFACT_COLUMNS: &[(&str, &str)] = &[
    ("identifier", "ID"),
    ("artifactName", "Requirement Name"),
    ("primaryText", "Requirement Text"),
    ("keyDrivers", "Key/Driver Indicator"),
    ("systems", "Affected Systems"),
    ("maturity", "Maturity"),
];

/// Table cell content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Plain text, escaped on output.
    Text(String),
    /// Storage-format markup, written verbatim.
    Markup(String),
    /// Plain text values rendered as a bullet list.
    List(Vec<String>),
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Table column: result key and header label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub key: String,
    pub label: String,
}

/// One result row keyed by column key.
pub type Row = HashMap<String, Cell>;

/// Tabular query results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsTable {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl ResultsTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the standard artifact columns.
    #[must_use]
    pub fn artifacts() -> Self {
        ARTIFACT_COLUMNS
            .iter()
            .fold(Self::new(), |table, (key, label)| table.with_column(key, label))
    }

    #[must_use]
    pub fn with_column(mut self, key: &str, label: &str) -> Self {
        self.columns.push(Column {
            key: key.to_owned(),
            label: label.to_owned(),
        });
        self
    }

    #[must_use]
    pub fn with_row<K: Into<String>>(mut self, cells: impl IntoIterator<Item = (K, Cell)>) -> Self {
        self.push_row(cells.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl TableMarkup for ResultsTable {
    fn to_storage_markup(&self, render_id: &str) -> String {
        let mut out = String::with_capacity(1024);
        let _ = write!(
            out,
            r#"<ac:structured-macro ac:name="span" ac:schema-version="1"><ac:parameter ac:name="id">{}</ac:parameter><ac:parameter ac:name="atlassian-macro-output-type">{OUTPUT_TYPE_BLOCK}</ac:parameter><ac:rich-text-body><table><tbody><tr>"#,
            escape_text(render_id)
        );
        for column in &self.columns {
            let _ = write!(out, "<th>{}</th>", escape_text(&column.label));
        }
        out.push_str("</tr>");
        for row in &self.rows {
            out.push_str("<tr>");
            for column in &self.columns {
                out.push_str("<td>");
                if let Some(cell) = row.get(&column.key) {
                    write_cell(cell, &mut out);
                }
                out.push_str("</td>");
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table></ac:rich-text-body></ac:structured-macro>");
        out
    }
}

fn write_cell(cell: &Cell, out: &mut String) {
    match cell {
        Cell::Text(text) => out.push_str(&escape_text(text)),
        Cell::Markup(markup) => out.push_str(markup),
        Cell::List(items) => {
            out.push_str("<ul>");
            for item in items {
                let _ = write!(out, "<li>{}</li>", escape_text(item));
            }
            out.push_str("</ul>");
        }
    }
}

/// Wrap raw HTML in an `html` macro with a CDATA body.
///
/// A `]]>` inside the content is split across two CDATA sections.
#[must_use]
pub fn html_macro(content: &str) -> String {
    format!(
        r#"<ac:structured-macro ac:name="html" ac:schema-version="1"><ac:plain-text-body><![CDATA[{}]]></ac:plain-text-body></ac:structured-macro>"#,
        content.replace("]]>", "]]]]><![CDATA[>")
    )
}

/// Markup cell linking `text` to `url`.
#[must_use]
pub fn link_cell(url: &str, text: &str) -> Cell {
    Cell::Markup(format!(
        r#"<a href="{}">{}</a>"#,
        escape_attr(url),
        escape_text(text)
    ))
}

/// Arguments gathered from a view template definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateArgs(Bindings);

impl TemplateArgs {
    #[must_use]
    pub fn new(args: Bindings) -> Self {
        Self(args)
    }

    /// Assemble arguments from template parameter rows.
    ///
    /// Each row binds `param_key` and `param_value`; rows that also bind
    /// `param_value_is_array` accumulate into a list.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MissingBinding`] for rows without a key or value.
    pub fn from_parameter_rows(rows: &[Bindings]) -> Result<Self, ViewError> {
        let mut args = Bindings::new();
        for row in rows {
            let key = row.require("param_key")?;
            let value = row.require("param_value")?;
            if row.get("param_value_is_array").is_some() {
                args.push(key, value);
            } else {
                args.insert(key, value);
            }
        }
        Ok(Self(args))
    }

    /// The template method name.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::TemplateArgument`] if `templateType` is absent.
    pub fn template_type(&self) -> Result<&str, ViewError> {
        self.str("templateType")
    }

    /// Argument of any shape, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BindingValue> {
        self.0.get(key)
    }

    /// Argument of any shape.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::TemplateArgument`] if the argument is absent.
    pub fn any(&self, key: &str) -> Result<&BindingValue, ViewError> {
        self.0.get(key).ok_or_else(|| ViewError::TemplateArgument {
            key: key.to_owned(),
            problem: "is missing",
        })
    }

    /// String argument.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::TemplateArgument`] if absent or a list.
    pub fn str(&self, key: &str) -> Result<&str, ViewError> {
        match self.any(key)? {
            BindingValue::Single(value) => Ok(value),
            BindingValue::Many(_) => Err(ViewError::TemplateArgument {
                key: key.to_owned(),
                problem: "is not a string",
            }),
        }
    }

    /// List argument.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::TemplateArgument`] if absent or a single value.
    pub fn list(&self, key: &str) -> Result<&[String], ViewError> {
        match self.any(key)? {
            BindingValue::Many(values) => Ok(values),
            BindingValue::Single(_) => Err(ViewError::TemplateArgument {
                key: key.to_owned(),
                problem: "is not a list",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{Document, Predicate};
    use pretty_assertions::assert_eq;

    fn sample() -> ResultsTable {
        ResultsTable::new()
            .with_column("identifier", "ID")
            .with_column("systems", "Systems")
            .with_row([
                ("identifier", Cell::from("R-1")),
                ("systems", Cell::List(vec!["A".to_owned(), "B & C".to_owned()])),
            ])
            .with_row([("identifier", Cell::from("R<2>"))])
    }

    #[test]
    fn test_markup_structure() {
        let markup = sample().to_storage_markup("ve-table-render-x");
        assert_eq!(
            markup,
            concat!(
                r#"<ac:structured-macro ac:name="span" ac:schema-version="1">"#,
                r#"<ac:parameter ac:name="id">ve-table-render-x</ac:parameter>"#,
                r#"<ac:parameter ac:name="atlassian-macro-output-type">BLOCK</ac:parameter>"#,
                r#"<ac:rich-text-body><table><tbody>"#,
                r#"<tr><th>ID</th><th>Systems</th></tr>"#,
                r#"<tr><td>R-1</td><td><ul><li>A</li><li>B &amp; C</li></ul></td></tr>"#,
                r#"<tr><td>R&lt;2&gt;</td><td></td></tr>"#,
                r#"</tbody></table></ac:rich-text-body></ac:structured-macro>"#,
            )
        );
    }

    #[test]
    fn test_markup_parses() {
        let doc = Document::parse(&sample().to_storage_markup("ve-table-render-x")).unwrap();
        assert_eq!(doc.find_all(&Predicate::tag("tr")).len(), 3);
    }

    #[test]
    fn test_artifact_columns() {
        let table = ResultsTable::artifacts();
        let labels: Vec<&str> = table.columns().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels[0], "ID");
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn test_html_macro_splits_cdata_end() {
        let markup = html_macro("<b>a]]>b</b>");
        assert!(markup.contains("<![CDATA[<b>a]]]]><![CDATA[>b</b>]]>"));
        let doc = Document::parse(&markup).unwrap();
        let body = doc.find_first(&Predicate::tag("ac:plain-text-body")).unwrap();
        assert_eq!(doc.get(&body).unwrap().text(), "<b>a]]>b</b>");
    }

    #[test]
    fn test_link_cell_escapes() {
        assert_eq!(
            link_cell("https://x/?a=1&b=2", "A & B"),
            Cell::Markup(r#"<a href="https://x/?a=1&amp;b=2">A &amp; B</a>"#.to_owned())
        );
    }

    #[test]
    fn test_template_args_from_rows() {
        let rows = vec![
            Bindings::new()
                .with("param_key", "templateType")
                .with("param_value", "SystemReqs"),
            Bindings::new()
                .with("param_key", "maturity")
                .with("param_value", "draft")
                .with("param_value_is_array", "true"),
            Bindings::new()
                .with("param_key", "maturity")
                .with("param_value", "approved")
                .with("param_value_is_array", "true"),
        ];
        let args = TemplateArgs::from_parameter_rows(&rows).unwrap();
        assert_eq!(args.template_type().unwrap(), "SystemReqs");
        assert_eq!(args.list("maturity").unwrap(), ["draft", "approved"]);
    }

    #[test]
    fn test_template_args_shape_errors() {
        let args = TemplateArgs::new(Bindings::new().with("level", "L2"));
        assert!(args.str("level").is_ok());
        let err = args.list("level").unwrap_err();
        assert_eq!(err.to_string(), r#"template argument "level" is not a list"#);
        let err = args.template_type().unwrap_err();
        assert_eq!(err.to_string(), r#"template argument "templateType" is missing"#);
    }
}
