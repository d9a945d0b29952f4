//! Rendering passes over the [`ViewNode`] model.
//!
//! [`render_html`] emits the nested `div` layout the tree stylesheet expects:
//!
//! ```text
//! div.wrapper | div.entry.sole        one per device
//!   span.label[data-device]           host, info lines
//!   div.branch.lv{depth}
//!     div.entry[.sole]                one per port branch
//!       span.label                    "<port> (macs: N)"
//!       div.branch.lv{depth + 1}      only for uplinks
//!         <nested device>
//! ```
//!
//! [`render_text`] draws the same tree with box-drawing characters for
//! terminals.

use crate::tree::{BranchNode, ViewNode, ROOT_LEVEL};
use std::fmt::Write;

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Splits a device label into display lines. Device info uses `<br>` as its
/// line separator.
fn label_lines(label: &str) -> impl Iterator<Item = &str> {
    label
        .split('\n')
        .flat_map(|line| line.split("<br>"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// Renders one tree as nested HTML.
pub fn render_html(node: &ViewNode) -> String {
    let mut out = String::new();
    write_device(&mut out, node);
    out
}

/// Renders a forest, one tree after another.
pub fn render_forest_html(forest: &[ViewNode]) -> String {
    forest.iter().map(render_html).collect()
}

/// Wraps rendered trees in a standalone page.
pub fn render_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{css}</style>\n</head>\n<body>\n<div id=\"place\">{body}</div>\n</body>\n</html>\n",
        title = escape_html(title),
        css = TREE_CSS,
        body = body,
    )
}

const TREE_CSS: &str = ".label{display:inline-block;border:1px solid #888;border-radius:4px;padding:2px 6px;margin:2px}\
.branch{margin-left:24px;border-left:1px solid #888}\
.entry{position:relative}\
.entry.sole{border-left:none}";

fn write_device(out: &mut String, node: &ViewNode) {
    if node.depth == ROOT_LEVEL {
        out.push_str("<div class=\"wrapper\">");
    } else {
        out.push_str("<div class=\"entry sole\">");
    }

    let lines: Vec<String> = label_lines(&node.label).map(escape_html).collect();
    let _ = write!(
        out,
        "<span class=\"label\" id=\"{}\" data-device=\"{}\">{}</span>",
        escape_html(&node.host),
        escape_html(&node.key),
        lines.join("<br>")
    );

    let _ = write!(out, "<div class=\"branch lv{}\">", node.depth);
    for branch in &node.branches {
        write_branch(out, branch, node.depth);
    }
    out.push_str("</div></div>");
}

fn write_branch(out: &mut String, branch: &BranchNode, depth: usize) {
    if branch.is_sole {
        out.push_str("<div class=\"entry sole\">");
    } else {
        out.push_str("<div class=\"entry\">");
    }
    let _ = write!(
        out,
        "<span class=\"label\">{}</span>",
        escape_html(&branch.label)
    );
    if let Some(nested) = &branch.nested {
        let _ = write!(out, "<div class=\"branch lv{}\">", depth + 1);
        write_device(out, nested);
        out.push_str("</div>");
    }
    out.push_str("</div>");
}

/// Renders one tree as indented text.
///
/// ```
/// use topology_viz::tree::{BranchNode, ViewNode};
/// use topology_viz::render::render_text;
///
/// let node = ViewNode {
///     key: "SW1".into(),
///     host: "SW1".into(),
///     label: "SW1".into(),
///     depth: 1,
///     branches: vec![BranchNode {
///         port_id: "1".into(),
///         label: "ge1 (macs: 3)".into(),
///         mac_count: 3,
///         nested: None,
///         is_sole: false,
///         error: None,
///     }],
/// };
/// assert_eq!(render_text(&node), "SW1\n└── ge1 (macs: 3)\n");
/// ```
pub fn render_text(node: &ViewNode) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", text_label(node));
    write_text_branches(&mut out, node, "");
    out
}

fn text_label(node: &ViewNode) -> String {
    let mut lines = label_lines(&node.label);
    let head = lines.next().unwrap_or(node.host.as_str()).to_string();
    let rest: Vec<&str> = lines.collect();
    if rest.is_empty() {
        head
    } else {
        format!("{} [{}]", head, rest.join(" / "))
    }
}

fn write_text_branches(out: &mut String, node: &ViewNode, prefix: &str) {
    let count = node.branches.len();
    for (i, branch) in node.branches.iter().enumerate() {
        let last = i + 1 == count;
        let connector = if branch.is_sole {
            "─── "
        } else if last {
            "└── "
        } else {
            "├── "
        };
        let _ = write!(out, "{}{}{}", prefix, connector, branch.label);
        if let Some(error) = &branch.error {
            let _ = write!(out, " !! {}", error);
        }
        out.push('\n');

        if let Some(nested) = &branch.nested {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            let _ = writeln!(out, "{}└── {}", child_prefix, text_label(nested));
            write_text_branches(out, nested, &format!("{}    ", child_prefix));
        }
    }
}
