use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wmbus_meters::util::hex::{parse_hex_lenient, pretty_hex};
use wmbus_meters::{decode_telegram, init_logger, DriverRegistry, FieldSink};
use wmbus_meters::manufacturer::id_to_manufacturer;

#[derive(Parser)]
#[command(name = "wmbus-meters")]
#[command(about = "Decode wM-Bus utility meter telegrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a telegram and print its readings as JSON
    Decode {
        /// Telegram bytes in hex; whitespace and separators are ignored
        telegram: String,
        /// Meter name to carry into the output
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Print a byte-by-byte annotation listing of a telegram
    Analyze {
        /// Telegram bytes in hex; whitespace and separators are ignored
        telegram: String,
        /// Print the annotations as JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// List the registered meter drivers
    Drivers,
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    let registry = DriverRegistry::with_defaults()?;

    match cli.command {
        Commands::Decode { telegram, name } => {
            let frame = parse_hex_lenient(&telegram).context("invalid telegram hex")?;
            let mut decoded = decode_telegram(&frame, &registry)?;
            if let Some(name) = name {
                decoded.fields.set_string_value("name", &name);
            }
            println!("{}", serde_json::to_string_pretty(&decoded.fields.to_json())?);
        }
        Commands::Analyze { telegram, json } => {
            let frame = parse_hex_lenient(&telegram).context("invalid telegram hex")?;
            let decoded = decode_telegram(&frame, &registry)?;
            if json {
                println!("{}", serde_json::to_string_pretty(decoded.analysis.notes())?);
            } else {
                println!("{}", pretty_hex(&frame, 16));
                println!();
                println!("{}", decoded.analysis.render());
            }
        }
        Commands::Drivers => {
            for name in registry.registered_drivers() {
                if let Some(driver) = registry.by_name(&name) {
                    let info = driver.info();
                    let modes: Vec<&str> =
                        info.link_modes.iter().map(|mode| mode.name()).collect();
                    println!(
                        "{:<14} {:<10} {}",
                        info.name,
                        info.meter_type.name(),
                        modes.join(",")
                    );
                    println!("{:<14} fields: {}", "", info.default_fields);
                    for detect in info.detects {
                        println!(
                            "{:<14} detects: mfct {} type {:02X} version {:02X}",
                            "",
                            id_to_manufacturer(detect.manufacturer),
                            detect.device_type,
                            detect.version
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
