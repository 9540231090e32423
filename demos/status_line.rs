//! Status line demo: Log lines scroll past a floating progress cell.
//!
//! Run with `RUST_LOG=cellterm=trace cargo run --example status_line`.
//! Logs are written to `status_line.log` so they stay off the screen.

use cellterm::{OutputOptions, Session};
use std::fs::File;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STEPS: usize = 40;
const BAR_WIDTH: usize = 20;

fn main() {
    if let Ok(file) = File::create("status_line.log") {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    }

    let session = Session::open();
    if !session.is_available() {
        eprintln!("status_line: no usable terminal, nothing will be drawn");
        return;
    }
    session.on_resize(|session| {
        tracing::info!(width = session.width(), height = session.height(), "window resized");
    });

    session.output(
        "\x1b[1mcellterm\x1b[0m status line demo: batches finish above, progress stays below. \
         Long lines wrap with a hanging indent.\n",
        OutputOptions::new().frozen().indent(4),
    );

    let spinner = ['|', '/', '-', '\\'];
    let status = session.output("", OutputOptions::new().floating());
    for step in 0..=STEPS {
        if step > 0 && step % 8 == 0 {
            session.output(
                format!("\x1b[32m✓\x1b[0m finished batch {}\n", step / 8),
                OutputOptions::new().frozen(),
            );
        }
        if step == STEPS / 2 {
            println!("plain stdout lands above the status line too");
        }
        let filled = step * BAR_WIDTH / STEPS;
        status.update(format!(
            "{} [{}{}] {:>3}%\n",
            spinner[step % spinner.len()],
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled),
            step * 100 / STEPS,
        ));
        thread::sleep(Duration::from_millis(60));
    }

    status.update("\x1b[1mdone\x1b[0m\n");
    status.freeze();
    tracing::info!(stats = ?session.stats(), "demo finished");
    session.close();
}
