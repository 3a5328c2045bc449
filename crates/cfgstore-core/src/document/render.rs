//! Human readable renderings of a document

use super::tree::{Document, NodeId};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Indented `name value` lines, containers wrapped in braces
///
/// ```text
/// config {
///     interface {
///         name eth0
///     }
/// }
/// ```
pub fn render_text(doc: &Document) -> String {
    let mut out = String::new();
    text_node(doc, doc.root(), 0, &mut out);
    out
}

fn text_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    if doc.is_leaf(id) {
        let _ = writeln!(out, "{}{} {}", pad, doc.name(id), doc.body(id).unwrap_or_default());
        return;
    }
    let _ = writeln!(out, "{}{} {{", pad, doc.name(id));
    for child in doc.child_elements(id) {
        text_node(doc, child, depth + 1, out);
    }
    let _ = writeln!(out, "{}}}", pad);
}

/// XML rendering for display; this format is not read back
pub fn render_xml(doc: &Document) -> String {
    let mut out = String::new();
    xml_node(doc, doc.root(), 0, &mut out);
    out
}

fn xml_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let name = doc.name(id);
    let mut open = format!("<{}", name);
    for (attr, value) in doc.attributes(id) {
        let _ = write!(open, " {}=\"{}\"", attr, escape(value));
    }
    let elements: Vec<NodeId> = doc.child_elements(id).collect();
    match (doc.body(id), elements.is_empty()) {
        (None, true) => {
            let _ = writeln!(out, "{}{}/>", pad, open);
        }
        (Some(body), true) => {
            let _ = writeln!(out, "{}{}>{}</{}>", pad, open, escape(body), name);
        }
        (body, false) => {
            let _ = writeln!(out, "{}{}>", pad, open);
            if let Some(body) = body {
                let _ = writeln!(out, "{}  {}", pad, escape(body));
            }
            for child in elements {
                xml_node(doc, child, depth + 1, out);
            }
            let _ = writeln!(out, "{}</{}>", pad, name);
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::default();
        let root = doc.root();
        let iface = doc.add_element(root, "interface");
        doc.add_leaf(iface, "name", "eth0");
        doc.add_leaf(iface, "description", "a<b");
        doc
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(
            render_text(&sample()),
            "config {\n    interface {\n        name eth0\n        description a<b\n    }\n}\n"
        );
    }

    #[test]
    fn test_xml_rendering_escapes_bodies() {
        let xml = render_xml(&sample());
        assert!(xml.starts_with("<config>\n  <interface>\n"));
        assert!(xml.contains("<description>a&lt;b</description>"));
        assert!(xml.ends_with("</config>\n"));
    }
}
