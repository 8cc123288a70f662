use anyhow::Result;
use clap::Parser;
use minesweeper_ai::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::thread;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "minesweeper-ai")]
#[command(version)]
#[command(about = "Autonomous Minesweeper bot that only moves on proven-safe cells when it can")]
struct Cli {
    /// Number of rows
    #[arg(long, default_value = "8")]
    height: usize,

    /// Number of columns
    #[arg(long, default_value = "8")]
    width: usize,

    /// Number of mines on the board
    #[arg(short, long, default_value = "8")]
    mines: usize,

    /// Seed for the board layout and the bot's guesses
    #[arg(short, long)]
    seed: Option<u64>,

    /// Pause between moves, in milliseconds
    #[arg(long, default_value = "500")]
    delay_ms: u64,

    /// Print the agent's final knowledge
    #[arg(long)]
    dump_knowledge: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    // --- 1. Initialization ---
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut game = Game::new(cli.height, cli.width, cli.mines, &mut rng)?;
    let delay = Duration::from_millis(cli.delay_ms);

    info!(
        height = cli.height,
        width = cli.width,
        mines = cli.mines,
        "starting game"
    );
    println!("--- Autonomous Minesweeper Bot ---");
    println!("Strategy: play cells proven safe, guess otherwise.");
    print_board(&game);

    // --- 2. Game Loop ---
    let mut move_count = 0;
    while let Some(turn) = game.play_turn(&mut rng)? {
        move_count += 1;
        let how = match turn.kind {
            MoveKind::Inferred => "known safe",
            MoveKind::Guess => "guess",
        };
        println!(
            "\n--- Move #{} ({}) reveals ({}, {}) ---",
            move_count, how, turn.point.row, turn.point.col
        );
        print_board(&game);

        thread::sleep(delay);
    }

    // --- 3. Final Result ---
    println!("\n--- Game Over ---");
    match game.game_state {
        GameState::Won => println!("Result: The bot won!"),
        GameState::Lost => println!("Result: The bot hit a mine and lost."),
        GameState::Playing => println!("Result: The bot ran out of moves."),
    }
    println!("\nMine layout:\n{}", game.board);

    if cli.dump_knowledge {
        println!("Knowledge:\n{}", game.agent.knowledge().snapshot());
    }

    Ok(())
}

fn print_board(game: &Game) {
    // Print header
    print!("   ");
    for col in 0..game.board.width() {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(game.board.width()));

    // Print rows
    for (row, tiles) in game.tiles.iter().enumerate() {
        print!("{:^2}|", row);
        for tile in tiles {
            let display = match tile {
                Tile::Hidden => " ■ ".to_string(),
                Tile::Flagged => " F ".to_string(),
                Tile::Revealed(n) => format!(" {} ", n),
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
