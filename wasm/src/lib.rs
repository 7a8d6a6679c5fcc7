use minesweeper_agent as ms;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn create_game(size: u8, mines: u8) -> Vec<u8> {
    console_error_panic_hook::set_once();

    let game = ms::Game::new(size as usize, size as usize, mines as usize);
    game.serialize()
}

#[wasm_bindgen]
pub fn validate(bts: Vec<u8>) -> bool {
    console_error_panic_hook::set_once();

    let game = ms::Game::deserialize(&bts);
    game.game_state == ms::GameState::Won
}

#[wasm_bindgen]
pub fn choose_cell(bts: Vec<u8>, row: usize, col: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = ms::Game::deserialize(&bts);
    let res = game.reveal(ms::Point { row, col }).map_err(|e| e.to_string())?;
    let mut xs = game.serialize();
    xs.push(if res.is_some() { 0 } else { 1 });
    Ok(xs)
}

/// Rebuilds the agent from the visible board and returns its recommended
/// move as `[row, col]`, or an empty vec when no move remains. The replay
/// order does not matter: deduction reaches the same fixed point.
#[wasm_bindgen]
pub fn suggest_move(bts: Vec<u8>) -> Vec<u32> {
    console_error_panic_hook::set_once();

    let game = ms::Game::deserialize(&bts);
    let (height, width) = game.dimensions();

    let mut agent = ms::Agent::new(height, width);
    let mut revealed: Vec<ms::Point> = game.revealed().iter().copied().collect();
    revealed.sort();
    for cell in revealed {
        agent.observe(cell, game.adjacent_mines(cell));
    }

    match agent.choose_safe_move().or_else(|| agent.choose_random_move()) {
        Some(cell) => vec![cell.row as u32, cell.col as u32],
        None => Vec::new(),
    }
}

#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Vec<i8> {
    console_error_panic_hook::set_once();

    let game = ms::Game::deserialize(&bts);
    let (height, width) = game.dimensions();
    (0..height)
        .flat_map(|row| (0..width).map(move |col| ms::Point { row, col }))
        .map(|cell| {
            if game.revealed().contains(&cell) {
                game.adjacent_mines(cell) as i8
            } else {
                -1
            }
        })
        .collect()
}
