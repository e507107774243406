//! Annotated YAML reference for a schema tree

use serde_json::Value;

use super::node::{ConfigNode, NodeKind};

const INDENT: &str = "    ";

impl ConfigNode {
    /// Render every key with its default value and description, rooted at `root`
    pub fn reference_yaml(&self, root: &str) -> String {
        let mut out = String::new();
        write_node(&mut out, root, self, 0);
        out
    }
}

fn write_node(out: &mut String, name: &str, node: &ConfigNode, depth: usize) {
    let indent = INDENT.repeat(depth);

    if let Some(info) = node.description() {
        for line in info.lines() {
            out.push_str(&format!("{}# {}\n", indent, line));
        }
    }
    if node.is_required() {
        out.push_str(&format!("{}# Required\n", indent));
    }

    let fields: Vec<_> = node.fields().collect();
    match (node.kind(), node.prototype()) {
        (NodeKind::Map, _) if !fields.is_empty() => {
            out.push_str(&format!("{}{}:\n", indent, name));
            for (child_name, child) in fields {
                write_node(out, child_name, child, depth + 1);
            }
        }
        (NodeKind::Map, Some(prototype)) => {
            out.push_str(&format!("{}{}:\n", indent, name));
            out.push_str(&format!("{}{}# Prototype\n", indent, INDENT));
            write_node(out, "name", prototype, depth + 1);
        }
        (NodeKind::Array, Some(prototype)) if prototype.fields().next().is_some() => {
            out.push_str(&format!("{}{}:\n", indent, name));
            out.push_str(&format!("{}{}# Prototype\n", indent, INDENT));
            out.push_str(&format!("{}{}-\n", indent, INDENT));
            for (child_name, child) in prototype.fields() {
                write_node(out, child_name, child, depth + 2);
            }
        }
        _ => {
            let value = node.default_tree().map(|v| inline(&v)).unwrap_or_else(|| "~".to_string());
            out.push_str(&format!("{}{}: {}\n", indent, name, value));
        }
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::Null => "~".to_string(),
        Value::String(s) if !s.is_empty() && !s.contains([':', '#', '%', '{', '[']) => s.clone(),
        other => other.to_string(),
    }
}
