//! Tests for the voice.

mod wav_writer;

use subsynth_dsp::controller::Controller;
use subsynth_dsp::envelope::{EnvelopeMode, EnvelopeParameters};
use subsynth_dsp::filter::BandPass;
use subsynth_dsp::filter_bank::Channel;
use subsynth_dsp::legato::{LegatoMode, LegatoNote};
use subsynth_dsp::params::{GlobalFilter, Panning, StartPolicy, SubParameters, MAX_BANDWIDTH};
use subsynth_dsp::utils::random::{Lcg, RandomSource, Silence};
use subsynth_dsp::voice::{ScratchBuffers, SubVoice};
use subsynth_dsp::{ParameterError, SampleRate, MAX_HARMONICS};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZE: usize = 256;

fn note(freq: f32) -> LegatoNote {
    LegatoNote {
        freq,
        velocity: 1.0,
        portamento: false,
        midi_note: 69,
    }
}

fn mono_parameters() -> SubParameters {
    let mut params = SubParameters::default();
    params.stereo = false;
    params.start = StartPolicy::Cold;
    params
}

fn start(
    params: &SubParameters,
    controller: &Controller,
    freq: f32,
    rng: &mut dyn RandomSource,
) -> SubVoice {
    SubVoice::new(
        params,
        controller,
        SampleRate::new(SAMPLE_RATE),
        BLOCK_SIZE,
        note(freq),
        false,
        rng,
    )
    .unwrap()
}

fn coefficients(voice: &SubVoice) -> Vec<BandPass> {
    let bank = voice.filter_bank();
    (0..bank.active())
        .flat_map(|slot| bank.chain(Channel::Left, slot).to_vec())
        .collect()
}

#[test]
fn first_tick_fades_in() {
    let params = mono_parameters();
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 440.0, &mut rng);

    assert!(voice.is_ready());
    assert_eq!(voice.filter_bank().active(), 1);

    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];
    assert!(voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r));

    assert_eq!(out_l[0], 0.0);
    assert!(out_l[1..10].iter().any(|x| *x != 0.0));
    assert_ne!(out_l[10], 0.0);
    assert_eq!(out_l, out_r);
}

#[test]
fn release_fades_out_and_stops() {
    let params = mono_parameters();
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 440.0, &mut rng);

    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];
    for _ in 0..20 {
        voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    }

    voice.release_key();
    let mut ticks = 0;
    while voice.is_enabled() {
        assert!(voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r));
        ticks += 1;
        assert!(ticks < 100);
    }

    assert!(out_l[BLOCK_SIZE - 1].abs() < 1e-3);

    out_l.fill(1.0);
    out_r.fill(1.0);
    assert!(!voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r));
    assert!(out_l.iter().chain(out_r.iter()).all(|x| *x == 0.0));
}

#[test]
fn bandwidth_is_clamped() {
    let mut params = mono_parameters();
    params.bandwidth = 127;
    params.harmonic_bandwidths = [127; MAX_HARMONICS];
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let voice = start(&params, &controller, 440.0, &mut rng);

    for filter in voice.filter_bank().chain(Channel::Left, 0) {
        assert_eq!(filter.bw, 25.0);
        assert_eq!(filter.bw, MAX_BANDWIDTH);
    }
}

#[test]
fn recompute_is_idempotent() {
    let params = mono_parameters();
    let mut controller = Controller::new();
    let mut rng = Lcg::default();
    let mut voice = start(&params, &controller, 440.0, &mut rng);

    controller.pitch_wheel.set(2000);
    voice.compute_current_parameters(&controller);
    let first = coefficients(&voice);
    voice.compute_current_parameters(&controller);
    let second = coefficients(&voice);

    assert_eq!(first, second);
}

#[test]
fn pitch_wheel_retunes_filters() {
    let params = mono_parameters();
    let mut controller = Controller::new();
    let mut rng = Lcg::default();
    let mut voice = start(&params, &controller, 440.0, &mut rng);
    let before = coefficients(&voice);

    controller.pitch_wheel.set(8191);
    voice.compute_current_parameters(&controller);

    assert_ne!(before[0].a1, coefficients(&voice)[0].a1);
}

#[test]
fn harmonics_above_nyquist_are_skipped() {
    let mut params = mono_parameters();
    params.harmonic_magnitudes = [127; MAX_HARMONICS];
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let voice = start(&params, &controller, 2000.0, &mut rng);

    let bank = voice.filter_bank();
    assert!(bank.active() < MAX_HARMONICS);
    for n in bank.positions() {
        assert!(*n as f32 * voice.base_freq() <= SAMPLE_RATE / 2.0);
    }
}

#[test]
fn changed_parameters_are_picked_up() {
    let mut params = mono_parameters();
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 220.0, &mut rng);
    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];

    params.harmonic_magnitudes[1] = 127;
    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert_eq!(voice.filter_bank().active(), 1);

    params.mark_changed();
    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert_eq!(voice.filter_bank().active(), 2);
    assert_eq!(voice.filter_bank().positions(), &[0, 1]);
}

#[test]
fn silent_noise_renders_silence() {
    let params = mono_parameters();
    let controller = Controller::new();
    let mut rng = Silence;
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 440.0, &mut rng);

    let mut out_l = [1.0; BLOCK_SIZE];
    let mut out_r = [1.0; BLOCK_SIZE];
    for _ in 0..10 {
        voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
        assert!(out_l.iter().chain(out_r.iter()).all(|x| *x == 0.0));
    }
}

#[test]
fn stereo_channels_differ() {
    let mut params = SubParameters::default();
    params.stereo = true;
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 440.0, &mut rng);

    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];
    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);

    assert!(voice.filter_bank().is_stereo());
    assert_ne!(out_l, out_r);
}

#[test]
fn odd_block_lengths() {
    let params = mono_parameters();
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 440.0, &mut rng);

    for len in [13, 100, 1, 255, 256] {
        let mut out_l = vec![0.0; len];
        let mut out_r = vec![0.0; len];
        assert!(voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r));
        assert!(out_l.iter().all(|x| x.is_finite()));
    }
}

#[test]
fn invalid_parameters_are_rejected() {
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let sample_rate = SampleRate::new(SAMPLE_RATE);

    let mut params = SubParameters::default();
    params.num_stages = 0;
    let result = SubVoice::new(&params, &controller, sample_rate, BLOCK_SIZE, note(440.0), false, &mut rng);
    assert_eq!(result.err(), Some(ParameterError::StageCount(0)));

    let params = SubParameters::default();
    let result = SubVoice::new(&params, &controller, sample_rate, 0, note(440.0), false, &mut rng);
    assert_eq!(result.err(), Some(ParameterError::BlockSize));

    let result = SubVoice::new(&params, &controller, sample_rate, BLOCK_SIZE, note(-1.0), false, &mut rng);
    assert_eq!(result.err(), Some(ParameterError::Frequency(-1.0)));

    let result = SubVoice::new(
        &params,
        &controller,
        SampleRate::new(0.0),
        BLOCK_SIZE,
        note(440.0),
        false,
        &mut rng,
    );
    assert!(matches!(result.err(), Some(ParameterError::SampleRate(_))));
}

#[test]
fn fixed_frequency() {
    let mut params = mono_parameters();
    params.fixed_freq = true;
    let controller = Controller::new();
    let mut rng = Lcg::default();

    let voice = start(&params, &controller, 220.0, &mut rng);
    assert_eq!(voice.base_freq(), 440.0);

    params.detune.octave = -1;
    let voice = start(&params, &controller, 220.0, &mut rng);
    assert!((voice.base_freq() - 220.0).abs() < 1e-3);
}

#[test]
fn legato_retrigger_cycle() {
    let params = mono_parameters();
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 440.0, &mut rng);
    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);

    voice.legato_note(&params, &controller, &mut rng, note(880.0), true);
    assert_eq!(voice.legato_mode(), LegatoMode::FadeOut);
    assert_eq!(voice.base_freq(), 440.0);

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert_eq!(voice.legato_mode(), LegatoMode::CatchUp);
    assert_eq!(voice.base_freq(), 1760.0);
    assert!(out_l[BLOCK_SIZE - 16..].iter().all(|x| *x == 0.0));

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert_eq!(voice.legato_mode(), LegatoMode::Normal);
    assert_eq!(voice.base_freq(), 880.0);
    assert!(voice.legato().is_silent());
    assert!(out_l.iter().all(|x| *x == 0.0));
}

#[test]
fn silent_voice_fades_in() {
    let params = mono_parameters();
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = SubVoice::new(
        &params,
        &controller,
        SampleRate::new(SAMPLE_RATE),
        BLOCK_SIZE,
        note(440.0),
        true,
        &mut rng,
    )
    .unwrap();
    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert!(out_l.iter().all(|x| *x == 0.0));

    voice.legato_note(&params, &controller, &mut rng, note(660.0), true);
    assert_eq!(voice.legato_mode(), LegatoMode::FadeIn);
    assert_eq!(voice.base_freq(), 660.0);

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert_eq!(voice.legato_mode(), LegatoMode::Normal);
    assert!(out_l.iter().any(|x| *x != 0.0));
}

#[test]
fn legato_during_fade_in_waits() {
    let params = mono_parameters();
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = SubVoice::new(
        &params,
        &controller,
        SampleRate::new(SAMPLE_RATE),
        BLOCK_SIZE,
        note(440.0),
        true,
        &mut rng,
    )
    .unwrap();
    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    voice.legato_note(&params, &controller, &mut rng, note(660.0), true);
    voice.legato_note(&params, &controller, &mut rng, note(990.0), true);
    assert_eq!(voice.legato_mode(), LegatoMode::FadeIn);
    assert_eq!(voice.base_freq(), 660.0);

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert_eq!(voice.legato_mode(), LegatoMode::FadeOut);
    assert_eq!(voice.base_freq(), 660.0);

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert_eq!(voice.legato_mode(), LegatoMode::CatchUp);
    assert_eq!(voice.base_freq(), 1485.0);

    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
    assert_eq!(voice.legato_mode(), LegatoMode::Normal);
    assert_eq!(voice.base_freq(), 990.0);
}

#[test]
fn negative_filter_frequency_stays_stable() {
    let mut params = mono_parameters();
    params.offset_hz = 0;
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 12.0, &mut rng);

    let bank = voice.filter_bank();
    assert!(bank.active() > 0);
    for filter in bank.chain(Channel::Left, 0) {
        assert!(filter.freq < 0.0);
        assert!(filter.a2 <= 1.0);
    }

    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];
    for _ in 0..50 {
        voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
        assert!(out_l.iter().all(|x| x.is_finite()));
    }
}

#[test]
fn stage_count_is_fixed_per_note() {
    let mut params = mono_parameters();
    params.num_stages = 2;
    let controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 440.0, &mut rng);
    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];

    params.num_stages = 4;
    params.mark_changed();
    voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);

    let bank = voice.filter_bank();
    assert_eq!(bank.stages(), 2);
    for filter in bank.chain(Channel::Left, 0) {
        assert_eq!(filter.bw, params.harmonic_bandwidth(0, 440.0, 2));
    }
}

#[test]
fn modulated_voice() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init()
        .ok();

    let mut params = SubParameters::default();
    params.panning = Panning::Random;
    params.start = StartPolicy::RandomAmplitude;
    params.num_stages = 3;
    params.freq_envelope = Some(EnvelopeParameters::asr(
        EnvelopeMode::Frequency,
        -300.0,
        200.0,
        0.0,
        300.0,
        100.0,
    ));
    params.bandwidth_envelope = Some(EnvelopeParameters::asr(
        EnvelopeMode::Bandwidth,
        2.0,
        500.0,
        0.0,
        300.0,
        1.0,
    ));
    params.global_filter = Some(GlobalFilter::default());
    for n in 0..8 {
        params.harmonic_magnitudes[n] = 127 - 12 * n as u8;
    }
    params.mark_changed();

    let mut controller = Controller::new();
    let mut rng = Lcg::default();
    let mut scratch = ScratchBuffers::new(BLOCK_SIZE);
    let mut voice = start(&params, &controller, 110.0, &mut rng);

    let duration = 2.0;
    let blocks = (duration * SAMPLE_RATE / (BLOCK_SIZE as f32)) as usize;
    let mut wav_data_left = Vec::new();
    let mut wav_data_right = Vec::new();
    let mut out_l = [0.0; BLOCK_SIZE];
    let mut out_r = [0.0; BLOCK_SIZE];

    for n in 0..blocks {
        let value = modulation::triangle(n, blocks, 2.0);
        controller.pitch_wheel.set(modulation::to_pitch_wheel(value));
        controller.bandwidth.set(modulation::to_controller(value));
        controller.filter_cutoff.set(modulation::to_controller(-value));
        controller.portamento.update();

        if n == blocks / 2 {
            controller.portamento.start(110.0, 165.0, 0.2, BLOCK_SIZE as f32 / SAMPLE_RATE);
            voice.legato_note(
                &params,
                &controller,
                &mut rng,
                LegatoNote {
                    portamento: true,
                    ..note(165.0)
                },
                false,
            );
        }
        if n == blocks * 3 / 4 {
            voice.release_key();
        }

        let active = voice.render(&params, &controller, &mut rng, &mut scratch, &mut out_l, &mut out_r);
        assert!(out_l.iter().chain(out_r.iter()).all(|x| x.is_finite()));
        wav_data_left.extend_from_slice(&out_l);
        wav_data_right.extend_from_slice(&out_r);

        if !active {
            break;
        }
    }

    wav_writer::write_stereo("voice/modulated.wav", &wav_data_left, &wav_data_right, SAMPLE_RATE)
        .ok();
}
