use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

pub mod browser;
pub mod camera;
pub mod catalog;
pub mod commerce;
pub mod config;
pub mod engine;
pub mod game;
pub mod interaction;
pub mod movement;
pub mod sprite;
pub mod world;

use engine::{GameLoop, LoopHandle};
use game::PixelBazaar;

thread_local! {
    // the running loop, kept so the page can tear it down
    static LOOP: RefCell<Option<LoopHandle>> = const { RefCell::new(None) };
}

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs panic hook and console logging
/// - loads the bazaar and starts the loop
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
    browser::init_logging(if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    // spawns a new asynchronous task in local thread, for web assembly
    // environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        match GameLoop::start(PixelBazaar::new()).await {
            Ok(handle) => LOOP.with(|slot| *slot.borrow_mut() = Some(handle)),
            Err(err) => log::error!("Could not start game: {:#?}", err),
        }
    });

    Ok(())
}

/// Stop the running game loop. Later calls do nothing.
#[wasm_bindgen]
pub fn stop_game() -> Result<(), JsValue> {
    let handle = LOOP.with(|slot| slot.borrow_mut().take());
    match handle {
        Some(handle) => handle
            .stop()
            .map_err(|err| JsValue::from_str(&format!("{:#}", err))),
        None => Ok(()),
    }
}
