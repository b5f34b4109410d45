use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tile_merge::store::{ScoreDb, ScoreRepository};
use tile_merge::{
    load_game_config, BoardView, Direction, EndingScreen, Game, GameConfig, RoundOutcome,
};

const HELP: &str = "Commands: up|down|left|right (or w|a|s|d) | new | board | continue | save [path] | load [path] | help | quit";

#[derive(Parser, Debug)]
#[command(name = "tile-merge", about = "Sliding tile merge puzzle in the terminal")]
struct Cli {
    /// SQLite file holding the best score and the autosave.
    #[arg(long, default_value = "./tile-merge.db")]
    db: PathBuf,
    /// JSON rules file (grid size, winning value, spawn odds).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for tile spawns.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_game_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config: {}", err);
                std::process::exit(1);
            }
        },
        None => GameConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    let mut game = match Game::new(config) {
        Ok(game) => game,
        Err(err) => {
            eprintln!("Failed to start game: {}", err);
            std::process::exit(1);
        }
    };

    let mut store: Box<dyn ScoreRepository> = match ScoreDb::open(&cli.db) {
        Ok(db) => Box::new(db),
        Err(err) => {
            eprintln!("Failed to open score DB at {}: {}", cli.db.display(), err);
            std::process::exit(1);
        }
    };
    match store.load_best_score() {
        Ok(best) => game.set_best_score(best),
        Err(err) => eprintln!("Failed to load best score: {}", err),
    }
    match store.load_savegame() {
        Ok(Some(savegame)) => match game.restore(&savegame) {
            Ok(()) => println!("Resumed saved game."),
            Err(err) => eprintln!("Ignoring stored savegame: {}", err),
        },
        Ok(None) => {}
        Err(err) => eprintln!("Failed to load savegame: {}", err),
    }

    println!("{}", HELP);
    print_board(&game.view());
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();

        if let Some(direction) = Direction::parse(&cmd) {
            play_round(&mut game, direction);
            persist(store.as_mut(), &game);
            print_board(&game.view());
            continue;
        }

        match cmd.as_str() {
            "quit" | "exit" | "q" => break,
            "help" => println!("{}", HELP),
            "board" => print_board(&game.view()),
            "new" => {
                if let Err(err) = game.new_game() {
                    println!("Failed to start a new game: {}", err);
                }
                persist(store.as_mut(), &game);
                print_board(&game.view());
            }
            "continue" => match game.continue_after_win() {
                Ok(()) => print_board(&game.view()),
                Err(err) => println!("{}", err),
            },
            "save" => {
                let path = parts.next().unwrap_or("./savegame.json");
                match game.save_to_path(path) {
                    Ok(()) => println!("Saved to {}", path),
                    Err(err) => println!("Failed to save {}: {}", path, err),
                }
            }
            "load" => {
                let path = parts.next().unwrap_or("./savegame.json");
                match game.load_from_path(path) {
                    Ok(()) => {
                        persist(store.as_mut(), &game);
                        print_board(&game.view());
                    }
                    Err(err) => println!("Failed to load {}: {}", path, err),
                }
            }
            _ => println!("Unknown command: {}. {}", cmd, HELP),
        }
    }

    persist(store.as_mut(), &game);
}

/// Run one full round. The terminal has no animations, so every move is
/// acknowledged as soon as it is issued.
fn play_round(game: &mut Game, direction: Direction) {
    let Some(report) = game.apply_direction(direction) else {
        match game.state().ending_screen {
            EndingScreen::Win => println!("You won! Type `continue` to keep playing or `new` to restart."),
            EndingScreen::GameOver => println!("Game over. Type `new` to restart."),
            EndingScreen::None => println!("Not ready for input."),
        }
        return;
    };
    if !report.any_moved {
        println!("Nothing moved.");
        return;
    }

    game.settle_pending_moves();
    match game.finalize_round() {
        Ok(RoundOutcome::Won { score, best_score }) => {
            println!("You won! Score {} (best {}).", score, best_score);
        }
        Ok(RoundOutcome::GameOver {
            score, best_score, ..
        }) => {
            println!("Game over. Score {} (best {}).", score, best_score);
        }
        Ok(_) => {}
        Err(err) => eprintln!("Round failed: {}", err),
    }
}

fn persist(store: &mut dyn ScoreRepository, game: &Game) {
    if let Err(err) = store.save_best_score(game.state().best_score) {
        eprintln!("Failed to persist best score: {}", err);
    }
    if let Err(err) = store.save_savegame(&game.snapshot()) {
        eprintln!("Failed to persist savegame: {}", err);
    }
}

fn print_board(view: &BoardView) {
    let border = format!("+{}", "------+".repeat(view.size));
    println!("Score: {}  Best: {}", view.score, view.best_score);
    println!("{}", border);
    for row in &view.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|value| {
                if *value == 0 {
                    "      ".to_string()
                } else {
                    format!("{:^6}", value)
                }
            })
            .collect();
        println!("|{}|", cells.join("|"));
        println!("{}", border);
    }
}
