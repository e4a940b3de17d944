//! Structured-macro helpers.

use super::tree::{Element, Node};

pub const STRUCTURED_MACRO: &str = "ac:structured-macro";
pub const PARAMETER: &str = "ac:parameter";
pub const RICH_TEXT_BODY: &str = "ac:rich-text-body";
pub const LINK: &str = "ac:link";
pub const RI_PAGE: &str = "ri:page";

pub const OUTPUT_TYPE_INLINE: &str = "INLINE";
pub const OUTPUT_TYPE_BLOCK: &str = "BLOCK";

/// Build `<ac:parameter ac:name="{name}">{value}</ac:parameter>`.
#[must_use]
pub fn parameter(name: &str, value: &str) -> Element {
    let element = Element::new(PARAMETER).with_attr("ac:name", name);
    if value.is_empty() {
        element
    } else {
        element.with_text(value)
    }
}

impl Element {
    /// Value of the `ac:name` attribute.
    #[must_use]
    pub fn macro_name(&self) -> Option<String> {
        self.attr("ac:name").map(std::borrow::Cow::into_owned)
    }

    /// Child index of the `ac:parameter` named `name`.
    #[must_use]
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|node| {
            node.as_element()
                .is_some_and(|e| e.is(PARAMETER) && e.attr("ac:name").as_deref() == Some(name))
        })
    }

    /// The `ac:parameter` child named `name`.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Element> {
        self.parameter_index(name)
            .and_then(|i| self.children[i].as_element())
    }

    /// The `ac:parameter` child named `name`, mutably.
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Element> {
        let index = self.parameter_index(name)?;
        self.children[index].as_element_mut()
    }

    /// Decoded text of the `ac:parameter` child named `name`.
    #[must_use]
    pub fn parameter_text(&self, name: &str) -> Option<String> {
        self.parameter(name).map(Element::text)
    }
}

/// Builder for a `span` structured macro.
#[derive(Debug, Clone, Default)]
pub struct SpanMacro {
    macro_id: Option<String>,
    hidden: bool,
    class: Option<String>,
    id: Option<String>,
    output_type: Option<&'static str>,
    body: Vec<Node>,
}

impl SpanMacro {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `ac:macro-id` attribute.
    #[must_use]
    pub fn with_macro_id(mut self, macro_id: impl Into<String>) -> Self {
        self.macro_id = Some(macro_id.into());
        self
    }

    /// Add a `style` parameter of `display:none;`.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the `atlassian-macro-output-type` parameter.
    #[must_use]
    pub fn with_output_type(mut self, output_type: &'static str) -> Self {
        self.output_type = Some(output_type);
        self
    }

    /// Set the rich-text body content.
    #[must_use]
    pub fn with_body(mut self, body: impl IntoIterator<Item = Node>) -> Self {
        self.body = body.into_iter().collect();
        self
    }

    /// Build the macro element.
    ///
    /// Parameters come in a fixed order: style, class, id, output type.
    #[must_use]
    pub fn build(self) -> Element {
        let mut element = Element::new(STRUCTURED_MACRO)
            .with_attr("ac:name", "span")
            .with_attr("ac:schema-version", "1");
        if let Some(macro_id) = &self.macro_id {
            element.set_attr("ac:macro-id", macro_id);
        }
        if self.hidden {
            element = element.with_child(parameter("style", "display:none;"));
        }
        if let Some(class) = &self.class {
            element = element.with_child(parameter("class", class));
        }
        if let Some(id) = &self.id {
            element = element.with_child(parameter("id", id));
        }
        if let Some(output_type) = self.output_type {
            element = element.with_child(parameter("atlassian-macro-output-type", output_type));
        }
        element.with_child(Element::new(RICH_TEXT_BODY).with_children(self.body))
    }
}
