use serde::{Deserialize, Serialize};

use crate::core::{ElementNode, Node};
use crate::html;
use crate::region::EditableRegion;
use crate::style;

/// The form field that carries the region's markup on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenField {
    value: String,
}

impl HiddenField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Copies the region's markup in. Returns whether the value changed.
    pub fn mirror(&mut self, region: &EditableRegion) -> bool {
        if self.value == region.html() {
            return false;
        }
        self.value = region.html().to_string();
        true
    }
}

const CAPTION_HANDLERS: [&str; 4] = ["contenteditable", "onclick", "oninput", "onblur"];

/// Strips editing affordances from markup about to be published: remove
/// buttons and other `.editor-only` elements go, captions become static and
/// unfilled ones are hidden, and spacer breaks after image containers are
/// dropped.
pub fn clean_for_publish(markup: &str, caption_placeholder: &str) -> String {
    let mut nodes = html::parse_fragment(markup);
    clean_children(&mut nodes, caption_placeholder);
    html::serialize_nodes(&nodes)
}

fn is_editor_only(el: &ElementNode) -> bool {
    el.has_class("editor-only") || el.has_class("remove-inline-image")
}

/// `<div><br></div>` as left behind after an inserted image.
fn is_spacer(node: &Node) -> bool {
    match node {
        Node::Element(el) if el.tag == "br" => true,
        Node::Element(el) if el.tag == "div" => {
            el.attrs.is_empty() && el.children.len() == 1 && el.children[0].is_tag("br")
        }
        _ => false,
    }
}

fn clean_children(children: &mut Vec<Node>, caption_placeholder: &str) {
    children.retain(|node| !node.as_element().is_some_and(is_editor_only));

    let mut ix = 0;
    while ix < children.len() {
        let is_container = children[ix]
            .as_element()
            .is_some_and(|el| el.has_class("inline-image-container"));
        if is_container {
            while children.get(ix + 1).is_some_and(is_spacer) {
                children.remove(ix + 1);
            }
        }
        if let Node::Element(el) = &mut children[ix] {
            if el.has_class("image-caption") {
                clean_caption(el, caption_placeholder);
            }
            clean_children(&mut el.children, caption_placeholder);
        }
        ix += 1;
    }
}

fn clean_caption(caption: &mut ElementNode, placeholder: &str) {
    for attr in CAPTION_HANDLERS {
        caption.attrs.remove(attr);
    }
    caption.remove_class("editable-caption");
    caption.add_class("static-caption");

    let text = caption.text_content();
    let text = text.trim();
    if text.is_empty() || text == placeholder {
        caption.children.clear();
        style::set_style_property(caption, "display", "none");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CAPTION_PLACEHOLDER;

    #[test]
    fn spacers_after_images_are_dropped() {
        let cleaned = clean_for_publish(
            r#"<div class="inline-image-container"><img src="a.png"></div><div><br></div><br><p>after</p>"#,
            CAPTION_PLACEHOLDER,
        );
        assert_eq!(
            cleaned,
            r#"<div class="inline-image-container"><img src="a.png"></div><p>after</p>"#
        );
    }

    #[test]
    fn written_captions_are_kept() {
        let cleaned = clean_for_publish(
            r#"<div class="image-caption editable-caption" contenteditable="true">A cat</div>"#,
            CAPTION_PLACEHOLDER,
        );
        assert_eq!(
            cleaned,
            r#"<div class="image-caption static-caption">A cat</div>"#
        );
    }
}
