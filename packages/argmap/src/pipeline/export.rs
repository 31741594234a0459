//! Graphviz exports of an argument map.

use petgraph::dot::{Config, Dot};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ArgmapError, Result};
use crate::types::argmap::{ArgMapEdge, ArgMapNode, ArgumentMap};
use crate::types::claim::Valence;

/// Graphviz layout executable.
pub const DOT_PROGRAM: &str = "dot";

const RENDER_TIMEOUT: Duration = Duration::from_secs(30);
const WRAP_WIDTH: usize = 25;

const SUPPORT_COLOR: &str = "#2e7d32";
const ATTACK_COLOR: &str = "#c62828";

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Greedy word wrap with graphviz line breaks.
fn wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\\n")
}

fn node_attributes(node: &ArgMapNode) -> String {
    let label = format!("[{}]\\n{}", escape(&node.id), wrap(&escape(&node.text), WRAP_WIDTH));
    if node.is_root() {
        format!("label=\"{label}\", shape=box, style=\"rounded,filled\", fillcolor=\"#e3f2fd\"")
    } else {
        format!("label=\"{label}\", shape=box, style=rounded")
    }
}

fn edge_attributes(edge: &ArgMapEdge) -> String {
    let color = match edge.valence {
        Valence::Support => SUPPORT_COLOR,
        Valence::Attack => ATTACK_COLOR,
    };
    let style = if edge.in_forest { "solid" } else { "dashed" };
    format!(
        "color=\"{color}\", style={style}, penwidth={:.2}, tooltip=\"{:.2}\"",
        0.5 + 2.5 * edge.weight.clamp(0.0, 1.0),
        edge.weight
    )
}

/// DOT source of `map`: support edges green, attack edges red, edges outside
/// the spanning structure dashed.
pub fn to_dot(map: &ArgumentMap) -> String {
    let (graph, _) = map.to_graph();
    format!(
        "{:?}",
        Dot::with_attr_getters(
            &graph,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, edge| edge_attributes(edge.weight()),
            &|_, (_, node)| node_attributes(node),
        )
    )
}

/// Render DOT source to SVG with the graphviz `dot` executable.
pub async fn render_svg(dot: &str) -> Result<String> {
    render_svg_with(DOT_PROGRAM, dot).await
}

/// Render DOT source to SVG with the given graphviz executable.
pub async fn render_svg_with(program: &str, dot: &str) -> Result<String> {
    let mut child = Command::new(program)
        .arg("-Tsvg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ArgmapError::Export(format!("graphviz executable `{program}` not found"))
            }
            _ => ArgmapError::Io(e),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(dot.as_bytes()).await?;
    }

    let output = tokio::time::timeout(RENDER_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| ArgmapError::Export(format!("`{program}` timed out")))??;

    if !output.status.success() {
        return Err(ArgmapError::Export(format!(
            "`{program}` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    debug!(bytes = output.stdout.len(), "rendered svg");
    String::from_utf8(output.stdout)
        .map_err(|e| ArgmapError::Export(format!("svg is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::argmap::NodeRole;

    fn map() -> ArgumentMap {
        ArgumentMap {
            nodes: vec![
                ArgMapNode::new("R", "Buy a \"flat\".", NodeRole::Root),
                ArgMapNode::new("A", "Buying builds equity over many years of payments.", NodeRole::Reason),
            ],
            edges: vec![ArgMapEdge::new("A", "R", Valence::Support, 0.9).in_forest(true)],
        }
    }

    #[test]
    fn test_dot_contains_nodes_and_styled_edges() {
        let dot = to_dot(&map());
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("[R]"));
        assert!(dot.contains("Buy a \\\"flat\\\"."));
        assert!(dot.contains(SUPPORT_COLOR));
        assert!(dot.contains("style=solid"));
        assert!(dot.contains("1 -> 0"));
    }

    #[test]
    fn test_wrap_breaks_long_text() {
        assert_eq!(wrap("one two three", 7), "one two\\nthree");
        assert_eq!(wrap("", 7), "");
    }

    #[tokio::test]
    async fn test_missing_executable_is_export_error() {
        let err = render_svg_with("argmap-no-such-graphviz-binary", "digraph {}")
            .await
            .unwrap_err();
        assert!(matches!(err, ArgmapError::Export(_)));
    }
}
