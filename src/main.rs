//! Binary entry point that glues the dual-backend store to the TUI: resolve
//! the data directory, load (or default) the configuration, open whichever
//! store backend is available, optionally kick off the background update
//! probe, and drive the Ratatui event loop until the user exits.

use std::sync::mpsc;

use thighpads::config::{self, Config};
use thighpads::store::open_store;
use thighpads::ui::{run_app, App};

fn main() -> anyhow::Result<()> {
    let data_dir = config::ensure_data_dir()?;
    let first_run = config::is_first_run(&data_dir);
    let cfg = if first_run {
        Config::default()
    } else {
        config::load_config(&data_dir)?
    };

    let store = open_store(&data_dir)?;

    let (update_tx, update_rx) = mpsc::channel();
    #[cfg(feature = "self-update")]
    if cfg.auto_check_update {
        thighpads::update::spawn_update_probe(
            thighpads::update::GithubReleaseSource::default(),
            data_dir.clone(),
            false,
            update_tx.clone(),
        );
    }
    // The probe keeps its own clone; the loop only ever reads.
    drop(update_tx);

    let mut app = App::new(store, cfg, data_dir, first_run)?;
    run_app(&mut app, update_rx)
}
