use std::path::Path;

use colored::Colorize;

pub fn run(story: &Path) -> Result<(), String> {
    let graph = super::load_story(story)?;

    let issues = graph.issues();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  {} {issue}", "broken:".red());
        }
        return Err(format!(
            "{} integrity issue(s) in \"{}\"",
            issues.len(),
            graph.title
        ));
    }

    println!("  All checks passed for \"{}\".", graph.title);
    println!(
        "  {} nodes, {} endings",
        graph.node_count(),
        graph.ending_count()
    );

    Ok(())
}
