//! Scribble Example
//!
//! Simulates a stylus stroke arriving on an input thread while the main
//! thread plays the application thread: pumping its dispatcher, committing
//! frames, and watching the flicker-free handoff retire the stroke into
//! the application visual tree.
//!
//! Run with: cargo run -p liveink_renderer --example scribble

use anyhow::Result;
use liveink_core::{batch, Color, InkStyle};
use liveink_renderer::{AppContext, EngineOptions, LiveInk, RegistryMode};
use std::sync::mpsc;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let app = AppContext::for_current_thread();
    let (done_tx, done_rx) = mpsc::channel();

    let ink = LiveInk::builder(app.clone())
        .options(EngineOptions {
            mode: RegistryMode::PerDevice,
            ..Default::default()
        })
        .on_stroke_completed(move |stroke| {
            tracing::info!(
                device = stroke.device,
                samples = stroke.points.len(),
                "stroke handed to the application tree"
            );
            let _ = done_tx.send(());
        })
        .build();

    ink.root_visual()?;
    ink.activate()?;
    ink.set_style(InkStyle::new(Color::from_hex(0x1A6FEB), 3.0))?;

    // Feed a short stroke from an input thread, the way a pen service
    // delivers samples off the UI thread.
    let input_ink = ink.clone();
    let input = std::thread::spawn(move || {
        let down = input_ink.stylus_down(1, 100, &batch(&[(10.0, 10.0)]));
        for (i, point) in [(12.0, 14.0), (16.0, 20.0), (22.0, 26.0), (30.0, 30.0)]
            .into_iter()
            .enumerate()
        {
            std::thread::sleep(Duration::from_millis(4));
            input_ink.stylus_move(1, 110 + (i as i32) * 10, &batch(&[point]));
        }
        std::thread::sleep(Duration::from_millis(4));
        let up = input_ink.stylus_up(1, 200, &batch(&[(32.0, 31.0)]));
        (down, up)
    });

    let (down, up) = input.join().expect("input thread panicked");
    let down = down.expect("down was rejected");
    let up = up.expect("up was rejected");

    // The host confirms routing; the handoff starts on the app thread.
    ink.down_processed(down, true);
    ink.up_processed(up, true);

    // Pump the application thread until the stroke has fully transitioned.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        app.pump();
        app.commit_frame();
        match done_rx.try_recv() {
            Ok(()) => break,
            Err(mpsc::TryRecvError::Empty) => {
                if Instant::now() > deadline {
                    anyhow::bail!("stroke never completed");
                }
                std::thread::sleep(Duration::from_millis(2));
            }
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
    }
    // Completion is queued behind the final frame; drain it.
    app.pump();

    let diagnostics = ink.diagnostics();
    tracing::info!(
        open = diagnostics.open_strokes,
        full_transitions = diagnostics.stats.full_transitions,
        completed = diagnostics.stats.completed,
        "scribble finished"
    );

    ink.deactivate()?;
    Ok(())
}
