use minesweeper_ai as ms;
use wasm_bindgen::prelude::*;

fn load(bts: &[u8]) -> Result<ms::Game, String> {
    ms::Game::deserialize(bts).map_err(|e| e.to_string())
}

fn store(game: &ms::Game) -> Result<Vec<u8>, String> {
    game.serialize().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn create_game(height: u8, width: u8, mines: u16) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let game = ms::Game::new(
        height as usize,
        width as usize,
        mines as usize,
        &mut rand::rng(),
    )
    .map_err(|e| e.to_string())?;
    store(&game)
}

/// Lets the agent play one move. The returned bytes carry the updated game;
/// an empty result means the agent had nothing left to play.
#[wasm_bindgen]
pub fn play_turn(bts: Vec<u8>) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = load(&bts)?;
    match game.play_turn(&mut rand::rng()).map_err(|e| e.to_string())? {
        Some(_) => store(&game),
        None => Ok(Vec::new()),
    }
}

/// Reveals a cell. The trailing byte is 1 if it was a mine; flagged cells are
/// refused with an error.
#[wasm_bindgen]
pub fn choose_cell(bts: Vec<u8>, row: usize, col: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = load(&bts)?;
    let res = game
        .reveal_cell(ms::Point::new(row, col))
        .map_err(|e| e.to_string())?;
    let mut xs = store(&game)?;
    xs.push(if res { 0 } else { 1 });
    Ok(xs)
}

/// Row-major tiles: -1 hidden, -2 flagged, otherwise the revealed count.
#[wasm_bindgen]
pub fn get_tiles(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let game = load(&bts)?;
    Ok(game
        .tiles
        .into_iter()
        .flatten()
        .map(|tile| match tile {
            ms::Tile::Hidden => -1,
            ms::Tile::Flagged => -2,
            ms::Tile::Revealed(n) => n as i8,
        })
        .collect())
}

/// 0 playing, 1 won, 2 lost.
#[wasm_bindgen]
pub fn game_status(bts: Vec<u8>) -> Result<u8, String> {
    console_error_panic_hook::set_once();

    let game = load(&bts)?;
    Ok(match game.game_state {
        ms::GameState::Playing => 0,
        ms::GameState::Won => 1,
        ms::GameState::Lost => 2,
    })
}

/// The agent's knowledge as readable text.
#[wasm_bindgen]
pub fn knowledge(bts: Vec<u8>) -> Result<String, String> {
    console_error_panic_hook::set_once();

    let game = load(&bts)?;
    Ok(game.agent.knowledge().snapshot().to_string())
}
