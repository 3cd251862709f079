//! Command execution.

use crate::Commands;
use colored::Colorize;
use ledenet_client::{discovery, Bulb};
use ledenet_protocol::{codec, ChannelWrite, DeviceMode, PresetPattern};
use std::net::SocketAddr;
use std::time::Duration;

/// Executes a device command and returns the formatted output.
pub async fn execute(
    bulb: &Bulb,
    addr: SocketAddr,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        // Handled in main before a session exists
        Commands::Scan { .. } | Commands::Presets => unreachable!(),

        Commands::Status => {
            bulb.update_state().await?;
            let state = bulb
                .state()
                .ok_or("controller returned no state snapshot")?;

            let mut out = String::new();
            out.push_str(&format!("{}\n", format!("Controller {addr}").bold()));
            out.push_str(&format!(
                "  Power:      {}\n",
                if state.power_on {
                    "on".green()
                } else {
                    "off".red()
                }
            ));
            out.push_str(&format!(
                "  Mode:       {}\n",
                state.mode.to_string().yellow()
            ));

            match state.mode {
                DeviceMode::Color => {
                    let (r, g, b) = state.rgb();
                    out.push_str(&format!("  Color:      ({r},{g},{b})\n"));
                    out.push_str(&format!(
                        "  Brightness: {}%\n",
                        codec::byte_to_percent(state.brightness())
                    ));
                }
                DeviceMode::WarmWhite => {
                    out.push_str(&format!(
                        "  Warm white: {}%\n",
                        codec::byte_to_percent(state.warm_white)
                    ));
                }
                DeviceMode::Preset => {
                    out.push_str(&format!(
                        "  Pattern:    {} (speed {}%)\n",
                        PresetPattern::name(state.pattern_code).unwrap_or("preset"),
                        state.speed()
                    ));
                }
                DeviceMode::Custom => {
                    out.push_str(&format!("  Pattern:    custom (speed {}%)\n", state.speed()));
                }
                DeviceMode::Sunrise | DeviceMode::Sunset => {}
                DeviceMode::Unknown => {
                    out.push_str(&format!(
                        "  Pattern:    {:#04x} (unrecognized)\n",
                        state.pattern_code
                    ));
                }
            }
            if state.capabilities.dual_white {
                out.push_str(&format!(
                    "  Cold white: {}%\n",
                    codec::byte_to_percent(state.cold_white)
                ));
            }
            if let Some(variant) = bulb.variant() {
                out.push_str(&format!("  Dialect:    {variant:?}"));
            }
            Ok(out)
        }

        Commands::On => {
            bulb.turn_on().await?;
            Ok(format!("{} {}", "Powered on".green(), addr))
        }

        Commands::Off => {
            bulb.turn_off().await?;
            Ok(format!("{} {}", "Powered off".green(), addr))
        }

        Commands::Color {
            red,
            green,
            blue,
            white,
            brightness,
            volatile,
        } => {
            let mut write = ChannelWrite::rgb(red, green, blue).with_persist(!volatile);
            write.warm_white = white;
            if let Some(value) = brightness {
                write = write.with_brightness(value);
            }
            bulb.set_channels(write).await?;

            let mut msg = format!("{} color ({red},{green},{blue})", "Set".green());
            if let Some(w) = white {
                msg.push_str(&format!(" + warm white {w}"));
            }
            if volatile {
                msg.push_str(&format!(" {}", "(volatile)".dimmed()));
            }
            Ok(msg)
        }

        Commands::WarmWhite { percent } => {
            bulb.set_warm_white(percent.min(100)).await?;
            Ok(format!("{} warm white {}%", "Set".green(), percent.min(100)))
        }

        Commands::ColdWhite { level } => {
            bulb.set_cold_white_255(level).await?;
            Ok(format!("{} cold white {level}", "Set".green()))
        }

        Commands::WhiteTemperature { kelvin, brightness } => {
            bulb.set_white_temperature(kelvin, codec::percent_to_byte(brightness))
                .await?;
            Ok(format!(
                "{} white temperature {}K at {}%",
                "Set".green(),
                kelvin.clamp(2700, 6500),
                brightness.min(100)
            ))
        }

        Commands::Preset { pattern, speed } => {
            let code = parse_pattern(&pattern)?;
            bulb.set_preset_pattern(code, speed).await?;
            Ok(format!(
                "{} {} (speed {}%)",
                "Running".green(),
                PresetPattern::name(code).unwrap_or("preset").cyan(),
                speed.min(100)
            ))
        }

        Commands::Custom {
            colors,
            speed,
            transition,
        } => {
            let colors = colors
                .iter()
                .map(|s| parse_color(s))
                .collect::<Result<Vec<_>, _>>()?;
            bulb.set_custom_pattern(&colors, speed, transition).await?;
            Ok(format!(
                "{} custom pattern with {} color(s) (speed {}%)",
                "Running".green(),
                colors.len(),
                speed.min(100)
            ))
        }

        Commands::Timers => {
            let timers = bulb.timers().await?;
            let mut out = format!("{}\n", "Timers".bold());
            for (i, slot) in timers.iter().enumerate() {
                out.push_str(&format!("  {}: {}\n", i + 1, slot));
            }
            out.pop();
            Ok(out)
        }

        Commands::Clock => match bulb.clock().await? {
            Some(dt) => Ok(format!(
                "Device clock: {}",
                dt.format("%Y-%m-%d %H:%M:%S").to_string().cyan()
            )),
            None => Ok("Device clock: unset or invalid".yellow().to_string()),
        },

        Commands::SetClock => {
            let now = chrono::Local::now().naive_local();
            bulb.set_clock(now).await?;
            Ok(format!(
                "{} clock to {}",
                "Synchronized".green(),
                now.format("%Y-%m-%d %H:%M:%S")
            ))
        }
    }
}

/// Broadcasts a discovery scan and prints the results.
pub async fn scan(wait: Duration, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let found = discovery::scan(wait).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }
    if found.is_empty() {
        println!("{}", "No controllers found".yellow());
        return Ok(());
    }
    for bulb in &found {
        println!("{:<16} {:<14} {}", bulb.ip.cyan(), bulb.id, bulb.model);
    }
    Ok(())
}

/// Formats the preset pattern table.
pub fn list_presets() -> String {
    let mut out = format!("{}\n", "Preset patterns".bold());
    for (code, name) in PresetPattern::all() {
        out.push_str(&format!("  {code:#04x}  {name}\n"));
    }
    out.pop();
    out
}

/// Parses a preset argument: a known name, or a numeric code in
/// decimal or 0x-prefixed hex.
fn parse_pattern(arg: &str) -> Result<u8, String> {
    if let Some(code) = PresetPattern::from_name(arg) {
        return Ok(code);
    }
    let parsed = match arg.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    parsed.map_err(|_| format!("unknown pattern '{arg}' (try `ledenet presets`)"))
}

/// Parses one `r,g,b` triple.
fn parse_color(arg: &str) -> Result<(u8, u8, u8), String> {
    let parts: Vec<_> = arg.split(',').collect();
    let invalid = || format!("invalid color '{arg}', expected r,g,b");
    match parts.as_slice() {
        [r, g, b] => Ok((
            r.trim().parse().map_err(|_| invalid())?,
            g.trim().parse().map_err(|_| invalid())?,
            b.trim().parse().map_err(|_| invalid())?,
        )),
        _ => Err(invalid()),
    }
}
