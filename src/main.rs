//! Chain Reaction entry point
//!
//! Native builds run a headless demo: two peers share a game through an
//! in-process hub and alternate scripted moves, printing the board as they go.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use chain_reaction::consts::SAFETY_TIMEOUT_SECS;
    use chain_reaction::sim::GameStatus;
    use chain_reaction::{
        ChainError, GameId, LocalHub, MoveFrame, MoveOrchestrator, Presenter, Settings, SyncedGame,
    };

    /// Prints each move as the presentation layer would see it
    struct TextPresenter {
        name: &'static str,
    }

    impl Presenter for TextPresenter {
        fn present(&mut self, frame: &MoveFrame<'_>) {
            println!(
                "[{}] {} -> ({}, {}), {} explosions, next: {}",
                self.name,
                frame.mover,
                frame.placed.0,
                frame.placed.1,
                frame.events.len(),
                frame.next_turn()
            );
            print!("{}", frame.state.board);
        }
    }

    /// Fixed frame step for draining playback
    const FRAME_DT: f32 = 1.0 / 60.0;

    pub fn run() -> Result<(), ChainError> {
        let settings = Settings::load();
        let hub = LocalHub::new();
        let mut rng = Pcg32::seed_from_u64(2024);

        let host = SyncedGame::connect(
            hub.clone(),
            MoveOrchestrator::new(settings.clone())?
                .with_presenter(Box::new(TextPresenter { name: "host" })),
            GameId::host(&mut rng),
        )?;
        log::info!("hosted game {}", host.game_id());
        let guest = SyncedGame::join(hub, settings.clone(), host.game_id().clone())?;
        let mut peers = [host, guest];

        // Simple deterministic script: each player feeds their own corner region
        let script = [(0, 0), (8, 5), (0, 0), (8, 5), (0, 1), (8, 4), (0, 1), (8, 4), (1, 0)];
        let cols = settings.cols.min(6);
        for (i, &(row, col)) in script.iter().cycle().take(60).enumerate() {
            let (row, col) = (row.min(settings.rows - 1), col.min(cols - 1));
            let peer = &mut peers[i % 2];
            if !peer.submit_move(row, col)? {
                // Fall back to the first cell this player may use
                let state = peer.state().clone();
                let mover = state.current_player;
                if let Some(((r, c), _)) =
                    state.board.iter().find(|&((r, c), _)| state.can_place(r, c, mover))
                {
                    peer.submit_move(r, c)?;
                }
            }

            let mut waited = 0.0;
            while peer.orchestrator().is_busy() && waited < SAFETY_TIMEOUT_SECS {
                peer.advance(FRAME_DT);
                waited += FRAME_DT;
            }
            for peer in peers.iter_mut() {
                peer.poll();
            }

            if let GameStatus::Won(winner) = peers[0].state().status {
                println!("{} wins after {} moves", winner, peers[0].state().move_count);
                break;
            }
        }

        if peers[0].state() != peers[1].state() {
            log::warn!("peers diverged");
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Chain Reaction (native) starting...");

    if let Err(e) = demo::run() {
        log::error!("demo failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is chain_reaction::web, this is just to satisfy the compiler
}
