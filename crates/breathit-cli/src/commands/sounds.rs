use std::path::PathBuf;

use breathit_core::sounds::list_cycle_sounds;
use breathit_core::storage::data_dir;
use breathit_core::Config;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum SoundsAction {
    /// List playable cycle sounds (.mp3, .wav, .ogg)
    List {
        /// Directory to scan (defaults to cues.sounds_dir, then <data dir>/sounds)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: SoundsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SoundsAction::List { dir, json } => {
            let dir = match dir {
                Some(dir) => dir,
                None => default_dir()?,
            };
            let sounds = list_cycle_sounds(&dir);
            if json {
                println!("{}", serde_json::json!({ "sounds": sounds }));
            } else if sounds.is_empty() {
                println!("No sounds in {}", dir.display());
            } else {
                for name in &sounds {
                    println!("{name}");
                }
            }
        }
    }
    Ok(())
}

fn default_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    match config.cues.sounds_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(data_dir()?.join("sounds")),
    }
}
