//! Inline `style` declarations and font-size resolution.

use crate::core::{Document, ElementNode};

pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name, value.to_string()))
        })
        .collect()
}

pub fn style_property(el: &ElementNode, property: &str) -> Option<String> {
    let style = el.attr("style")?;
    parse_declarations(style)
        .into_iter()
        .rev()
        .find(|(name, _)| name == property)
        .map(|(_, value)| value)
}

pub fn set_style_property(el: &mut ElementNode, property: &str, value: &str) {
    let mut decls: Vec<(String, String)> = el
        .attr("style")
        .map(parse_declarations)
        .unwrap_or_default()
        .into_iter()
        .filter(|(name, _)| name != property)
        .collect();
    decls.push((property.to_string(), value.to_string()));
    el.attrs.insert("style".to_string(), join_declarations(&decls));
}

fn join_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pixel sizes browsers use for `<font size="1">` .. `<font size="7">`.
pub fn legacy_size_px(size: u8) -> f32 {
    match size.clamp(1, 7) {
        1 => 10.0,
        2 => 13.0,
        3 => 16.0,
        4 => 18.0,
        5 => 24.0,
        6 => 32.0,
        _ => 48.0,
    }
}

/// Parses a `size` attribute, relative forms counting from 3.
pub fn parse_legacy_size(value: &str) -> Option<u8> {
    let value = value.trim();
    let n: i32 = if let Some(rest) = value.strip_prefix('+') {
        3 + rest.trim().parse::<i32>().ok()?
    } else if value.starts_with('-') {
        3 + value.parse::<i32>().ok()?
    } else {
        value.parse().ok()?
    };
    Some(n.clamp(1, 7) as u8)
}

/// Closest legacy size for a pixel value.
pub fn px_to_legacy_size(px: f32) -> u8 {
    (1..=7u8)
        .min_by(|a, b| {
            let da = (legacy_size_px(*a) - px).abs();
            let db = (legacy_size_px(*b) - px).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(3)
}

/// An absolute `font-size` value in px, if the value does not depend on the
/// parent's size.
pub fn absolute_font_size_px(value: &str, base_px: f32) -> Option<f32> {
    let value = value.trim().to_ascii_lowercase();
    if let Some(n) = value.strip_suffix("px") {
        return n.trim().parse().ok();
    }
    if let Some(n) = value.strip_suffix("pt") {
        return n.trim().parse::<f32>().ok().map(|pt| pt * 4.0 / 3.0);
    }
    if let Some(n) = value.strip_suffix("rem") {
        return n.trim().parse::<f32>().ok().map(|rem| rem * base_px);
    }
    let scale = match value.as_str() {
        "xx-small" => 0.5625,
        "x-small" => 0.625,
        "small" => 0.8125,
        "medium" => 1.0,
        "large" => 1.125,
        "x-large" => 1.5,
        "xx-large" => 2.0,
        "xxx-large" => 3.0,
        _ => return None,
    };
    Some(base_px * scale)
}

/// Resolves any `font-size` value against the parent's computed size.
pub fn resolve_font_size_px(value: &str, parent_px: f32, base_px: f32) -> Option<f32> {
    if let Some(px) = absolute_font_size_px(value, base_px) {
        return Some(px);
    }
    let value = value.trim().to_ascii_lowercase();
    if let Some(n) = value.strip_suffix("em") {
        return n.trim().parse::<f32>().ok().map(|em| em * parent_px);
    }
    if let Some(n) = value.strip_suffix('%') {
        return n.trim().parse::<f32>().ok().map(|pct| pct / 100.0 * parent_px);
    }
    match value.as_str() {
        "smaller" => Some(parent_px / 1.2),
        "larger" => Some(parent_px * 1.2),
        _ => None,
    }
}

fn default_font_scale(tag: &str) -> Option<f32> {
    match tag {
        "h1" => Some(2.0),
        "h2" => Some(1.5),
        "h3" => Some(1.17),
        "h5" => Some(0.83),
        "h6" => Some(0.67),
        "small" | "sub" | "sup" => Some(0.83),
        _ => None,
    }
}

/// Computed font size of the element at `path`; the root computes to `base_px`.
pub fn computed_font_size_px(doc: &Document, path: &[usize], base_px: f32) -> f32 {
    let mut px = base_px;
    for depth in 1..=path.len() {
        let Some(el) = doc.element(&path[..depth]) else {
            break;
        };
        if let Some(scale) = default_font_scale(&el.tag) {
            px *= scale;
        }
        if el.tag == "font" {
            if let Some(size) = el.attr("size").and_then(parse_legacy_size) {
                px = legacy_size_px(size);
            }
        }
        if let Some(value) = style_property(el, "font-size") {
            if let Some(resolved) = resolve_font_size_px(&value, px, base_px) {
                px = resolved;
            }
        }
    }
    px
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_last_declaration_wins() {
        let el = ElementNode::new("span").with_attr("style", "font-size: 12px; FONT-SIZE:20px");
        assert_eq!(style_property(&el, "font-size").as_deref(), Some("20px"));
    }

    #[test]
    fn resolves_relative_units_against_parent() {
        assert_eq!(resolve_font_size_px("1.5em", 16.0, 16.0), Some(24.0));
        assert_eq!(resolve_font_size_px("50%", 20.0, 16.0), Some(10.0));
        assert_eq!(absolute_font_size_px("12pt", 16.0), Some(16.0));
        assert_eq!(absolute_font_size_px("1.5em", 16.0), None);
    }

    #[test]
    fn legacy_sizes_round_trip_through_px() {
        for size in 1..=7u8 {
            assert_eq!(px_to_legacy_size(legacy_size_px(size)), size);
        }
        assert_eq!(parse_legacy_size("+2"), Some(5));
        assert_eq!(parse_legacy_size("-1"), Some(2));
        assert_eq!(parse_legacy_size("9"), Some(7));
    }
}
