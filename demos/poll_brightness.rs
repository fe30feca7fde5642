//! Example: poll the panel brightness and apply a command.
//!
//! Run with: `cargo run --example poll_brightness -- "set 40"`

use screen_brightness::{BrightnessMeasure, CommandError, DeviceProvider, MeasureOptions};
use std::thread;
use std::time::Duration;

fn run<P: DeviceProvider + 'static>(provider: P) -> Result<(), CommandError> {
    if !provider.is_supported() {
        println!("no brightness device found, continuing in unsupported mode");
    }

    let options = MeasureOptions {
        if_not_supported_action: Some("hide brightness meter".into()),
        ..Default::default()
    };
    let mut measure = BrightnessMeasure::new(provider, options)
        .with_action_runner(|action| println!("host action: {}", action));

    let (max, supported) = measure.reload();
    println!("supported={}, max level={}", supported, max);
    println!("levels: {:?}", measure.controller().state().levels.as_slice());

    // Apply the command given on the command line, if any
    if let Some(bang) = std::env::args().nth(1) {
        measure.execute_bang(&bang)?;
    }

    for _ in 0..3 {
        println!("current: {}", measure.current_value());
        thread::sleep(Duration::from_millis(500));
    }

    Ok(())
}

fn main() -> Result<(), CommandError> {
    // Initialize logging (optional)
    env_logger::init();

    #[cfg(windows)]
    let provider = screen_brightness::LcdProvider::new();
    #[cfg(not(windows))]
    let provider = screen_brightness::MockProvider::new(vec![0, 20, 40, 60, 80, 100], 60);

    run(provider)
}
