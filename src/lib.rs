pub mod combat;
pub mod config;
pub mod entities;
pub mod error;
pub mod game;
pub mod net;
pub mod scheduler;
pub mod telemetry;
pub mod world;

pub use error::{ConfigError, GameError, GameResult};
pub use game::{Game, World, WorldSettings};

use scheduler::clock::MonotonicClock;
use std::io::BufRead;
use std::sync::Arc;

/// Starts the world and its scheduler, then serves console commands until
/// `shutdown` or end of input.
pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::AppConfig::from_args(args)?;
    let game_config = &config.game;
    telemetry::logging::init(&game_config.log.dir, &game_config.log.level)?;
    if let Some(path) = config.config_path.as_ref() {
        tracing::info!(config = %path.display(), "configuration loaded");
    }

    let map = game_config.build_map().map_err(|err| err.to_string())?;
    tracing::info!(
        map = %map.name,
        tiles = map.tile_count(),
        item_types = map.item_types().len(),
        max_players = game_config.max_players,
        "world loaded"
    );
    let game = Game::new(map, game_config.world_settings(), Arc::new(MonotonicClock::new()));
    let handle = game
        .start()
        .map_err(|err| format!("scheduler thread spawn failed: {}", err))?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|err| format!("console read failed: {}", err))?;
        match line.trim() {
            "" => {}
            "shutdown" => break,
            "status" => {
                let (creatures, players) =
                    game.with_world(|world| (world.creatures.len(), world.creatures.player_count()));
                println!(
                    "creatures={} players={} pending_tasks={}",
                    creatures,
                    players,
                    game.scheduler().pending()
                );
            }
            other => eprintln!("tibia-core: unknown console command '{}'", other),
        }
    }

    tracing::info!("shutting down");
    game.shutdown();
    handle
        .join()
        .map_err(|_| "scheduler thread panicked".to_string())
}
