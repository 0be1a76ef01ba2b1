use inquire::{CustomType, Select, Text, validator::Validation};
use umbrella_core::{Config, config::LocationSource};

/// Walk the user through the settings worth changing and return the updated config.
pub fn prompt(mut cfg: Config) -> anyhow::Result<Config> {
    println!("Fallback location (used when your position can't be detected)");

    cfg.fallback.latitude = CustomType::<f64>::new("Latitude:")
        .with_default(cfg.fallback.latitude)
        .with_validator(|v: &f64| Ok(within(*v, 90.0, "Latitude must be between -90 and 90")))
        .prompt()?;

    cfg.fallback.longitude = CustomType::<f64>::new("Longitude:")
        .with_default(cfg.fallback.longitude)
        .with_validator(|v: &f64| Ok(within(*v, 180.0, "Longitude must be between -180 and 180")))
        .prompt()?;

    cfg.fallback.label = Text::new("Label:").with_default(&cfg.fallback.label).prompt()?;

    let sources = vec!["ip", "none"];
    let current = match cfg.location.source {
        LocationSource::Ip => 0,
        LocationSource::None => 1,
    };
    cfg.location.source = match Select::new("Detect position from:", sources)
        .with_starting_cursor(current)
        .with_help_message("ip: approximate position from your public IP; none: use the fallback")
        .prompt()?
    {
        "none" => LocationSource::None,
        _ => LocationSource::Ip,
    };

    cfg.timezone = Text::new("Timezone (IANA name, or \"auto\"):")
        .with_default(&cfg.timezone)
        .prompt()?;

    cfg.thresholds.probability_percent = CustomType::<f64>::new("Umbrella from rain chance (%):")
        .with_default(cfg.thresholds.probability_percent)
        .prompt()?;

    cfg.thresholds.rainfall_mm = CustomType::<f64>::new("...or from rainfall (mm):")
        .with_default(cfg.thresholds.rainfall_mm)
        .prompt()?;

    Ok(cfg)
}

fn within(value: f64, bound: f64, message: &str) -> Validation {
    if (-bound..=bound).contains(&value) {
        Validation::Valid
    } else {
        Validation::Invalid(message.into())
    }
}
