//! Test helpers and fixtures for ostinato integration tests
//!
//! Every test drives the engine by hand, one block at a time, from the test
//! thread. No device is involved.

#![allow(dead_code)]

pub mod tolerances;

use ostinato::prelude::*;

/// Sample rate giving round grid numbers at 120 bpm: 500 frames per beat,
/// 2000 per default loop.
pub const TEST_SAMPLE_RATE: u32 = 1_000;

/// Block size for deterministic testing.
pub const TEST_BLOCK: usize = 64;

pub fn test_config() -> EngineConfig {
    EngineConfig::default()
        .with_sample_rate(TEST_SAMPLE_RATE)
        .with_buffer_size(TEST_BLOCK)
}

/// Routes engine logs through the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn test_engine() -> (Model, Engine) {
    init_tracing();
    Model::new(test_config())
}

/// Mono ramp whose frame `i` holds `i + 1`, so every frame is identifiable.
pub fn ramp(frames: usize) -> Vec<f32> {
    (0..frames).map(|i| (i + 1) as f32).collect()
}

/// Adds a channel in `mode` with a `frames`-long ramp loaded.
pub fn ramp_channel(model: &mut Model, mode: SamplePlayerMode, frames: usize) -> Id {
    let ch = model.add_channel(mode).expect("add channel");
    model
        .load_wave(ch, ramp(frames), 1, TEST_SAMPLE_RATE)
        .expect("load wave");
    ch
}

/// Processes one stereo block of silent input and returns the output.
pub fn run_block(engine: &mut Engine) -> Vec<f32> {
    let input = vec![0.0; TEST_BLOCK * 2];
    let mut output = vec![0.0; TEST_BLOCK * 2];
    engine
        .process(&input, &mut output, TEST_BLOCK)
        .expect("process block");
    output
}

/// Processes `blocks` blocks and returns the output of the last one.
pub fn run_blocks(engine: &mut Engine, blocks: usize) -> Vec<f32> {
    let mut last = Vec::new();
    for _ in 0..blocks {
        last = run_block(engine);
    }
    last
}

/// Left channel of an interleaved stereo block.
pub fn left(output: &[f32]) -> Vec<f32> {
    output.iter().step_by(2).copied().collect()
}

pub fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|s| s.abs() < tolerances::SILENCE_THRESHOLD)
}

pub fn status(model: &Model, channel: Id) -> ChannelStatus {
    model.monitor(channel).expect("monitor").status.get()
}
