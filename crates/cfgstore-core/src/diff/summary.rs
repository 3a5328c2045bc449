//! Human-readable diff listing

use crate::diff::model::{Diff, DiffOp};
use crate::value::Variable;

/// One line per entry: `-` only in first, `+` only in second, `~` in both
pub fn render_summary(diff: &Diff) -> String {
    let mut out = String::new();
    for entry in diff {
        let line = match entry.op {
            DiffOp::First => format!("- {}{}", entry.key(), vars(&entry.vars1)),
            DiffOp::Second => format!(
                "+ {}{}",
                entry.key2.as_deref().unwrap_or_default(),
                vars(&entry.vars2)
            ),
            DiffOp::Both => {
                let key1 = entry.key1.as_deref().unwrap_or_default();
                let key2 = entry.key2.as_deref().unwrap_or_default();
                let keys = if key1 == key2 {
                    key1.to_string()
                } else {
                    format!("{} -> {}", key1, key2)
                };
                format!("~ {}{} =>{}", keys, vars(&entry.vars1), vars(&entry.vars2))
            }
        };
        out.push_str(&line);
        out.push('\n');
    }
    if diff.is_empty() {
        out.push_str("no differences\n");
    }
    out
}

fn vars(vars: &Option<Vec<Variable>>) -> String {
    let mut out = String::new();
    for var in vars.iter().flatten() {
        out.push(' ');
        if var.unique {
            out.push('!');
        }
        out.push_str(&var.name);
        out.push('=');
        out.push_str(&var.value.to_string());
    }
    out
}
