//! Diagram view: an SVG placeholder at the top of the page.

use super::{View, ViewCore};
use crate::error::ViewError;
use crate::identity::{IdSource, ViewIdentity, ViewKind};
use crate::markup::{Document, Element, OUTPUT_TYPE_INLINE, SpanMacro};

/// Undirected view rendering a diagram placeholder.
pub struct Diagram<'d> {
    core: ViewCore<'d>,
    ids: &'d dyn IdSource,
}

impl<'d> Diagram<'d> {
    /// Diagram with the given view id, or a freshly minted one.
    pub fn new(document: &'d mut Document, view_id: Option<&str>, ids: &'d dyn IdSource) -> Self {
        Self {
            core: ViewCore::new(document, ViewKind::Diagram, view_id, ids),
            ids,
        }
    }
}

impl View for Diagram<'_> {
    type Data = ();

    fn identity(&self) -> &ViewIdentity {
        self.core.identity()
    }

    fn clear(&mut self) -> usize {
        self.core.clear()
    }

    fn render(&mut self, _: &()) -> Result<(), ViewError> {
        let span = SpanMacro::new()
            .with_macro_id(self.ids.macro_id())
            .with_id(self.identity().render_id())
            .with_output_type(OUTPUT_TYPE_INLINE)
            .with_body([Element::new("svg").into()])
            .build();
        self.core.insert_top(span);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SequentialIds;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_at_top() {
        let mut doc = Document::parse("<p>Body</p>").unwrap();
        let ids = SequentialIds::new();
        let mut diagram = Diagram::new(&mut doc, Some("d1"), &ids);
        diagram.clear();
        diagram.render(&()).unwrap();
        assert_eq!(
            doc.serialize(),
            concat!(
                r#"<ac:structured-macro ac:name="span" ac:schema-version="1" ac:macro-id="m1">"#,
                r#"<ac:parameter ac:name="id">ve-diagram-render-d1</ac:parameter>"#,
                r#"<ac:parameter ac:name="atlassian-macro-output-type">INLINE</ac:parameter>"#,
                r#"<ac:rich-text-body><svg/></ac:rich-text-body></ac:structured-macro>"#,
                r#"<p>Body</p>"#,
            )
        );
    }

    #[test]
    fn test_rerender_replaces_previous() {
        let mut doc = Document::parse("<p>Body</p>").unwrap();
        let ids = SequentialIds::new();
        for _ in 0..2 {
            let mut diagram = Diagram::new(&mut doc, Some("d1"), &ids);
            diagram.clear();
            diagram.render(&()).unwrap();
        }
        assert_eq!(doc.root().children.len(), 2);
    }

    #[test]
    fn test_minted_identity() {
        let mut doc = Document::parse("").unwrap();
        let ids = SequentialIds::new();
        let diagram = Diagram::new(&mut doc, None, &ids);
        assert_eq!(diagram.identity().render_id(), "ve-diagram-render-v1");
    }
}
