use std::io::{self, BufRead, Write};
use std::path::Path;

use chrono::Utc;
use colored::Colorize;

use fw_achievements::AchievementCatalog;
use fw_core::StoryCatalog;
use fw_economy::{EconomyConfig, UserId};
use fw_playback::{EngineEvent, PlaybackError, PlaybackPhase, StoryService};

pub fn run(story_path: &Path, achievements_path: Option<&Path>) -> Result<(), String> {
    let graph = super::load_story(story_path)?;
    let story_id = graph.id.clone();
    let title = graph.title.clone();

    let mut stories = StoryCatalog::new();
    stories.add_story(graph).map_err(|e| e.to_string())?;
    let achievements = match achievements_path {
        Some(path) => super::load_achievements(path)?,
        None => AchievementCatalog::new(),
    };

    let service = StoryService::new(stories, achievements, EconomyConfig::default());
    let user = service.guest(Utc::now());

    println!("  {} {}", "Playing".bold(), title.bold());
    println!("  Guest session. Choices cost credits; they regenerate over time.");
    println!("  Type a choice number, or 'help' for commands.\n");

    let events = service
        .begin_story(user, &story_id, Utc::now())
        .map_err(|e| e.to_string())?;
    print_events(&events);
    render(&service, user)?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // EOF
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "q" => break,
            "help" => {
                println!("  <number>  select a choice");
                println!("  balance   show credits and refill countdown");
                println!("  history   show the playthrough transcript");
                println!("  replay    re-display the current node");
                println!("  restart   restart from the beginning");
                println!("  quit      exit\n");
            }
            "balance" => show_balance(&service, user)?,
            "history" => {
                let history = service.history(user).map_err(|e| e.to_string())?;
                print!("{}", history.export_text());
                println!();
            }
            "replay" => {
                let events = service.replay_node(user, Utc::now()).map_err(|e| e.to_string())?;
                print_events(&events);
                render(&service, user)?;
            }
            "restart" => {
                let events = service
                    .restart_playthrough(user, Utc::now())
                    .map_err(|e| e.to_string())?;
                print_events(&events);
                render(&service, user)?;
            }
            other => match other.parse::<usize>() {
                Ok(number) if number >= 1 => {
                    match service.select_choice(user, number - 1, Utc::now()) {
                        Ok(events) => {
                            print_events(&events);
                            render(&service, user)?;
                        }
                        // Broken content is fatal to the playthrough.
                        Err(PlaybackError::Story(err)) => return Err(err.to_string()),
                        Err(err) => println!("{}\n", err.to_string().yellow()),
                    }
                }
                _ => println!("{}\n", format!("unknown command: {other}").yellow()),
            },
        }
    }

    Ok(())
}

/// Skip through the current node's segments, print its narrative, and list
/// the choices (or the ending banner).
fn render(service: &StoryService, user: UserId) -> Result<(), String> {
    loop {
        let view = service.view(user).map_err(|e| e.to_string())?;
        if view.phase != PlaybackPhase::Playing {
            break;
        }
        let events = service
            .skip_segment(user, Utc::now())
            .map_err(|e| e.to_string())?;
        print_events(&events);
    }

    let view = service.view(user).map_err(|e| e.to_string())?;
    println!("{}\n", view.narrative);

    match view.phase {
        PlaybackPhase::Ended => {
            println!("  {}", "THE END".bold());
            println!("  'restart' to play again, 'quit' to leave.\n");
        }
        PlaybackPhase::AwaitingChoice => {
            for choice in &view.choices {
                let cost = format!("({} cr)", choice.cost);
                if choice.locked {
                    println!(
                        "  [{}] {} {} {}",
                        choice.index + 1,
                        choice.text.dimmed(),
                        cost.dimmed(),
                        "[locked]".yellow()
                    );
                } else {
                    println!("  [{}] {} {}", choice.index + 1, choice.text, cost.dimmed());
                }
            }
            println!();
        }
        PlaybackPhase::Playing => {}
    }
    Ok(())
}

fn show_balance(service: &StoryService, user: UserId) -> Result<(), String> {
    let now = Utc::now();
    let balance = service.balance(user, now).map_err(|e| e.to_string())?;
    let max = service.max_credits(user).map_err(|e| e.to_string())?;
    match service.next_refill_eta(user, now).map_err(|e| e.to_string())? {
        Some(eta_ms) => println!(
            "  credits: {balance}/{max} | next credit in {}s\n",
            eta_ms / 1000
        ),
        None => println!("  credits: {balance}/{max} | full\n"),
    }
    Ok(())
}

fn print_events(events: &[EngineEvent]) {
    for event in events {
        match event {
            EngineEvent::TransactionCommitted { transaction } => {
                println!(
                    "  {}",
                    format!(
                        "{} {} credit(s) ({}) -> {}",
                        transaction.kind,
                        transaction.amount,
                        transaction.source,
                        transaction.balance_after
                    )
                    .dimmed()
                );
            }
            EngineEvent::AchievementUnlocked { achievement, .. } => {
                println!(
                    "  {} {}",
                    "achievement unlocked:".yellow().bold(),
                    achievement
                );
            }
            EngineEvent::EndingReached { .. } => {
                println!("  {}", "You reached an ending.".bold());
            }
            EngineEvent::ChoiceRejected { reason } => {
                println!("  {}", reason.to_string().yellow());
            }
        }
    }
}
