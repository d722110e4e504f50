//! Channel playback through the full engine: key events, quantized starts,
//! loops waiting for the first beat, mixing rules.

mod helpers;

use approx::assert_relative_eq;
use helpers::tolerances::FLOAT_EPSILON;
use helpers::*;
use ostinato::prelude::*;

#[test]
fn test_one_shot_plays_on_next_block() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);

    assert!(is_silent(&run_block(&mut engine)));

    model.press(ch, MAX_VELOCITY).unwrap();
    let out = left(&run_block(&mut engine));
    assert_eq!(out[0], 1.0);
    assert_eq!(out[63], 64.0);
    assert_eq!(status(&model, ch), ChannelStatus::Play);
    assert_eq!(model.monitor(ch).unwrap().tracker.get(), 64);

    let out = left(&run_block(&mut engine));
    assert_eq!(out[0], 65.0);
}

#[test]
fn test_kill_silences_channel() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);

    model.press(ch, MAX_VELOCITY).unwrap();
    run_block(&mut engine);
    model.kill(ch).unwrap();

    assert!(is_silent(&run_block(&mut engine)));
    assert_eq!(status(&model, ch), ChannelStatus::Off);
}

#[test]
fn test_recorded_kill_cuts_block_at_its_frame() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);
    model.record_sample_action(ch, EventType::NoteOn, 70, 0).unwrap();
    model.record_sample_action(ch, EventType::NoteKill, 100, 0).unwrap();
    model.start();
    model.toggle_read_actions(ch).unwrap();
    assert!(is_silent(&run_block(&mut engine)));

    // Block 64..128: note-on at 6, kill at 36.
    let out = left(&run_block(&mut engine));
    assert!(is_silent(&out[..6]));
    assert_eq!(out[6], 1.0);
    assert_eq!(out[35], 30.0);
    assert!(is_silent(&out[36..]));
    assert_eq!(status(&model, ch), ChannelStatus::Off);
    assert_eq!(model.monitor(ch).unwrap().tracker.get(), 0);

    assert!(is_silent(&run_block(&mut engine)));
}

#[test]
fn test_one_shot_ends_at_wave_end() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 100);

    model.press(ch, MAX_VELOCITY).unwrap();
    run_block(&mut engine);
    let out = left(&run_block(&mut engine));

    assert_eq!(out[35], 100.0);
    assert!(is_silent(&out[36..]));
    assert_eq!(status(&model, ch), ChannelStatus::Off);
}

#[test]
fn test_quantized_press_starts_on_grid() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);
    model.set_quantize(5).unwrap(); // 100-frame grid
    model.start();

    run_blocks(&mut engine, 2);
    model.press(ch, MAX_VELOCITY).unwrap();

    // Armed during 128..192, which holds no grid line.
    assert!(is_silent(&run_block(&mut engine)));
    let monitor = model.monitor(ch).unwrap();
    assert_eq!(monitor.status.get(), ChannelStatus::Off);
    assert!(monitor.quantizing.get());

    // Fires at frame 200, 8 frames into 192..256.
    let out = left(&run_block(&mut engine));
    assert!(is_silent(&out[..8]));
    assert_eq!(out[8], 1.0);
    assert_eq!(monitor.status.get(), ChannelStatus::Play);
    assert!(!monitor.quantizing.get());
}

#[test]
fn test_loop_waits_for_first_beat() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::LoopBasic, 300);
    model.start();
    model.press(ch, MAX_VELOCITY).unwrap();

    // The loop is 2000 frames; frame 2000 lands 16 frames into block 31.
    run_blocks(&mut engine, 31);
    assert_eq!(status(&model, ch), ChannelStatus::Wait);

    let out = left(&run_block(&mut engine));
    assert!(is_silent(&out[..16]));
    assert_eq!(out[16], 1.0);
    assert_eq!(status(&model, ch), ChannelStatus::Play);

    model.stop();
    assert!(is_silent(&run_block(&mut engine)));
    assert_eq!(status(&model, ch), ChannelStatus::Off);
}

#[test]
fn test_gain_pan_and_solo() {
    let (mut model, mut engine) = test_engine();
    let a = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);
    let b = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);
    model.set_volume(a, 0.5).unwrap();
    model.set_pan(a, 0.0).unwrap();

    model.press(a, MAX_VELOCITY).unwrap();
    model.press(b, MAX_VELOCITY).unwrap();
    let out = run_block(&mut engine);
    // a: 0.5 on the left only, b: unity on both sides.
    assert_relative_eq!(out[0], 1.5, epsilon = FLOAT_EPSILON);
    assert_relative_eq!(out[1], 1.0, epsilon = FLOAT_EPSILON);

    model.set_solo(a, true).unwrap();
    let out = run_block(&mut engine);
    assert_relative_eq!(out[0], 65.0 * 0.5, epsilon = FLOAT_EPSILON);
    assert_relative_eq!(out[1], 0.0, epsilon = FLOAT_EPSILON);

    model.set_mute(a, true).unwrap();
    assert!(is_silent(&run_block(&mut engine)));
}

#[test]
fn test_velocity_as_volume() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);
    model.set_velocity_as_vol(ch, true).unwrap();

    model.press(ch, 0).unwrap();
    assert!(is_silent(&run_block(&mut engine)));
}

#[test]
fn test_rendering_off_outputs_silence() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);
    model.set_rendering(false);

    model.press(ch, MAX_VELOCITY).unwrap();
    assert!(is_silent(&run_block(&mut engine)));
}

#[test]
fn test_mono_device_downmixes() {
    let (mut model, mut engine) = Model::new(test_config().with_output_channels(1));
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleBasic, 1_000);
    model.set_pan(ch, 0.0).unwrap();
    model.press(ch, MAX_VELOCITY).unwrap();

    let input = vec![0.0; TEST_BLOCK];
    let mut output = vec![0.0; TEST_BLOCK];
    engine.process(&input, &mut output, TEST_BLOCK).unwrap();

    assert_relative_eq!(output[0], 0.5, epsilon = FLOAT_EPSILON);
    assert_relative_eq!(output[9], 5.0, epsilon = FLOAT_EPSILON);
}

#[test]
fn test_unload_wave_stops_channel() {
    let (mut model, mut engine) = test_engine();
    let ch = ramp_channel(&mut model, SamplePlayerMode::SingleEndless, 1_000);
    model.press(ch, MAX_VELOCITY).unwrap();
    run_block(&mut engine);

    model.unload_wave(ch).unwrap();
    assert!(is_silent(&run_block(&mut engine)));
    assert_eq!(status(&model, ch), ChannelStatus::Off);
    assert!(!model.document().channel(ch).unwrap().player.has_wave());
}

#[test]
fn test_input_peak_is_metered() {
    let (model, mut engine) = test_engine();
    let mut input = vec![0.0; TEST_BLOCK * 2];
    input[7] = -0.25;
    let mut output = vec![0.0; TEST_BLOCK * 2];

    engine.process(&input, &mut output, TEST_BLOCK).unwrap();
    assert_relative_eq!(model.input_peak(), 0.25, epsilon = FLOAT_EPSILON);
}
