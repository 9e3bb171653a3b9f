use std::path::Path;

use colored::Colorize;
use comfy_table::{Table, presets::UTF8_FULL};

pub fn run(story: &Path) -> Result<(), String> {
    let graph = super::load_story(story)?;

    println!("  {} [{}]", graph.title.bold(), graph.genre.dimmed());
    println!(
        "  start: {} | {} nodes | {} endings\n",
        graph.start,
        graph.node_count(),
        graph.ending_count()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["node", "segments", "choices", "targets"]);

    let mut nodes: Vec<_> = graph.all_nodes().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    for node in nodes {
        let targets: Vec<String> = node
            .choices
            .iter()
            .map(|c| {
                let mut label = c.next_node.to_string();
                if c.required_achievement.is_some() {
                    label.push_str(" (gated)");
                }
                if c.credit_cost() != 1 {
                    label.push_str(&format!(" ({}cr)", c.credit_cost()));
                }
                label
            })
            .collect();
        let kind = if node.is_ending() {
            "ending".to_string()
        } else {
            node.choices.len().to_string()
        };
        table.add_row(vec![
            node.id.to_string(),
            node.segments.len().to_string(),
            kind,
            targets.join(", "),
        ]);
    }

    println!("{table}");
    Ok(())
}
