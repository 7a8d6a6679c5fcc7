use minesweeper_agent::*;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const HEIGHT: usize = 8;
const WIDTH: usize = 8;
const MINES: usize = 8;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- 1. Initialization ---
    let mut game = Game::new(HEIGHT, WIDTH, MINES);
    let mut agent = Agent::new(HEIGHT, WIDTH);

    println!("--- Knowledge-Based Minesweeper Agent ---");
    println!("Strategy: play proven-safe cells, guess only when logic runs dry.");
    println!("Initial Board:");
    print_board(&game);
    thread::sleep(Duration::from_secs(1));

    // --- 2. Game Loop ---
    let mut move_count = 0;
    while game.game_state == GameState::Playing {
        move_count += 1;
        println!("\n--- Move #{} ---", move_count);

        // --- 3. Agent's Decision Logic ---
        let chosen = match agent.choose_safe_move() {
            Some(cell) => {
                println!("Logic found a guaranteed safe cell.");
                Some(cell)
            }
            None => {
                println!("No safe cell is provable. Guessing...");
                agent.choose_random_move()
            }
        };

        let Some(cell) = chosen else {
            println!("No valid moves left for the agent to make.");
            break;
        };

        // --- 4. Execute the Chosen Move ---
        println!("Agent reveals ({}, {})...", cell.row, cell.col);
        match game.reveal(cell)? {
            Some(count) => {
                agent.observe(cell, count);
                // Flag every mine the agent has proven so far; the game is
                // won once the flags match the mine set.
                let proven: Vec<Point> = agent.known_mines().iter().copied().collect();
                for mine in proven {
                    game.flag(mine);
                }
            }
            None => {
                println!("The guess hit a mine.");
            }
        }
        print_board(&game);

        // Add a delay to make the game watchable
        thread::sleep(Duration::from_millis(500));
    }

    // --- 5. Final Result ---
    println!("\n--- Game Over ---");

    match game.game_state {
        GameState::Won => println!("Result: the agent identified every mine."),
        GameState::Lost => println!("Result: the agent guessed into a mine."),
        GameState::Playing => println!("Result: the game ended unexpectedly."),
    }

    Ok(())
}

fn print_board(game: &Game) {
    let (height, width) = game.dimensions();

    // Print header
    print!("   ");
    for col in 0..width {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(width));

    // Print rows
    for row in 0..height {
        print!("{:^2}|", row);
        for col in 0..width {
            let cell = Point { row, col };
            let display = if game.revealed().contains(&cell) {
                format!(" {} ", game.adjacent_mines(cell))
            } else if game.flagged().contains(&cell) {
                " ⚑ ".to_string()
            } else {
                " ■ ".to_string()
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
