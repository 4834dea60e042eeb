use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{info, LevelFilter};

use kbdlog::keyboard::event_codes::KEYBOARD_EV_BITS;
use kbdlog::led::LEDS_DIR;
use kbdlog::locator::{DEVICES_FILE, INPUT_DIR, KEYBOARD_EV_TOKEN};
use kbdlog::{Config, KbdlogResult, KeyboardCapability, Keylogger, LineSink};

/// Log the key presses of the system keyboard
#[derive(Parser, Debug)]
#[command(name = "kbdlog")]
#[command(version, about, long_about = None)]
struct Args {
    /// Append key presses to this file instead of printing them
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Read this event device instead of searching for the keyboard
    #[arg(short, long, value_name = "DEVICE")]
    device: Option<PathBuf>,

    /// The input device enumeration file
    #[arg(long, value_name = "PATH", default_value = DEVICES_FILE)]
    devices_file: PathBuf,

    /// The directory holding the event devices
    #[arg(long, value_name = "DIR", default_value = INPUT_DIR)]
    device_dir: PathBuf,

    /// The bitmap token a keyboard must report
    #[arg(long, value_name = "TOKEN", default_value = KEYBOARD_EV_TOKEN)]
    capability: String,

    /// Accept any bitmap containing the SYN, KEY, MSC, LED and REP bits instead of an exact token
    #[arg(long, conflicts_with = "capability")]
    required_bits: bool,

    /// The LED class directory used to read the initial caps lock state
    #[arg(long, value_name = "DIR", default_value = LEDS_DIR)]
    leds_dir: PathBuf,

    /// Do not read the caps lock LED at startup
    #[arg(long)]
    no_led_probe: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Config {
        let capability = if self.required_bits {
            KeyboardCapability::RequiredBits(KEYBOARD_EV_BITS)
        } else {
            KeyboardCapability::Exact(self.capability.clone())
        };

        Config {
            devices_file: self.devices_file.clone(),
            device_dir: self.device_dir.clone(),
            device: self.device.clone(),
            capability,
            leds_dir: (!self.no_led_probe).then(|| self.leds_dir.clone()),
        }
    }
}

async fn run(args: Args) -> KbdlogResult<()> {
    let keylogger = Keylogger::new(args.config());

    let mut sink = match &args.output {
        Some(path) => LineSink::append(path)?.boxed(),
        None => LineSink::stdout().boxed(),
    };

    tokio::select! {
        res = keylogger.capture(&mut sink) => res,
        Ok(()) = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_module_path(false)
        .format_target(false)
        .parse_default_env()
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
