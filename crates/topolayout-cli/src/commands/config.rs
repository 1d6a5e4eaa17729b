//! Config command implementation.
//!
//! Shows and initializes the layout configuration.

use anyhow::Result;

use crate::config::Config;

/// Show the effective configuration.
pub fn show(config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("Topolayout Configuration");
    println!("{:-<40}", "");
    println!("Frames:              {}", config.frames);
    println!("Frame Timeout:       {} ms", config.frame_timeout_ms);

    let physical = &config.physical;
    println!("\nPhysical layout");
    println!("  Force Multiplier:  {}", physical.global_force_multiplier);
    println!("  Velocity Decay:    {}", physical.velocity_decay);
    println!("  Center Seeking:    {}", physical.force_center_seeking);
    println!("  Rigidity:          {}", physical.coefficient_rigidity);
    println!("  World Scale:       {}", physical.world_scale);
    println!(
        "  Budget:            {} iterations / {} ms",
        physical.budget.max_iterations, physical.budget.time_limit_ms
    );
    println!("  Seed:              {}", seed_label(physical.seed));

    let logical = &config.logical;
    println!("\nLogical layout");
    println!("  Force Multiplier:  {}", logical.force_multiplier);
    println!("  Momentum Decay:    {}", logical.momentum_decay);
    println!("  Equilibrium:       {}", logical.equilibrium_distance);
    println!("  Grouping:          {}", logical.grouping_coefficient);
    println!("  Distortion:        {}", logical.apply_distortion);
    println!(
        "  Budget:            {} iterations / {} ms",
        logical.budget.max_iterations, logical.budget.time_limit_ms
    );
    println!("  Seed:              {}", seed_label(logical.seed));

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Write the default configuration to the config file.
pub fn init(force: bool) -> Result<()> {
    let _ = dotenvy::dotenv();
    if let Some(config_path) = Config::config_file_path() {
        if config_path.exists() && !force {
            anyhow::bail!(
                "Config file already exists at {}. Use --force to overwrite it",
                config_path.display()
            );
        }
    }
    let path = Config::default().save()?;
    println!("✅ Wrote default configuration to {}", path.display());
    Ok(())
}

fn seed_label(seed: Option<u64>) -> String {
    seed.map(|s| s.to_string())
        .unwrap_or_else(|| "(random)".to_string())
}
