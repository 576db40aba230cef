//! Show or reset stored layout preferences.

use convulse_common::config::AppConfig;
use convulse_composer::preferences::load_layout;
use convulse_composer::JsonFilePreferenceStore;
use convulse_scene_model::SourceKind;

pub fn run(config: &AppConfig, reset: bool) -> anyhow::Result<()> {
    let store = JsonFilePreferenceStore::open(&config.preferences_path);

    if reset {
        store.reset()?;
        println!("Layout preferences reset ({})", store.path().display());
        return Ok(());
    }

    println!("Preferences: {}", store.path().display());
    let entries = store.entries();
    if entries.is_empty() {
        println!("  (none stored)");
    }
    for (key, value) in &entries {
        println!("  {key} = {value}");
    }

    println!();
    println!("Effective layout:");
    let settings = load_layout(&store);
    for kind in SourceKind::DRAW_ORDER {
        let layout = settings.get(kind);
        println!(
            "  {kind}: size {} at position {}",
            layout.size, layout.position
        );
    }
    Ok(())
}
