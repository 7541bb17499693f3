use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use bms_mixdown::{
    ChartRenderer, Stage,
    error::{RenderError, Result},
    mixer::{AudioClip, MasterBuffer},
    render::SampleWriter,
    rng::RngMock,
};
use pretty_assertions::assert_eq;

use super::{MemoryLoader, MemoryResolver, mix, renderer};

const SRC: &str = "#BPM 120\n#WAV01 kick.wav\n#00011:0001";

#[test]
fn one_note_after_one_second() {
    const RATE: usize = 1000;
    let asset = AudioClip::from_interleaved(&[0.5; RATE], 1).expect("mono clip");
    let mixdown = mix(SRC, RngMock([1]), RATE as u32, vec![("kick", asset)]);
    let master = mixdown.timeline.master.frames();

    assert!(master.len() >= 2 * RATE);
    assert!(master[..RATE].iter().all(|frame| *frame == [0.0, 0.0]));
    assert_eq!(master[RATE], [0.5, 0.5]);
    assert_eq!(master[2 * RATE - 1], [0.5, 0.5]);
    assert_eq!(mixdown.notes, 1);
}

#[test]
fn missing_asset_aborts_in_media() {
    let err = renderer(RngMock([1]), 1000, Vec::new())
        .mix_source(SRC, Path::new("chart"))
        .expect_err("asset is missing");
    assert_eq!(err.stage(), Stage::Media);
}

fn write_mono_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create asset");
    for &sample in samples {
        writer.write_sample(sample).expect("write asset");
    }
    writer.finalize().expect("finalize asset");
}

#[test]
fn renders_wav_files_on_disk() {
    const RATE: u32 = 8000;
    let dir = tempfile::tempdir().expect("temp dir");
    // the chart names another extension, the file on disk is found by its stem
    write_mono_wav(&dir.path().join("kick.wav"), RATE, &[16384; RATE as usize]);
    let chart = dir.path().join("chart.bms");
    std::fs::write(&chart, "#TITLE disk\n#BPM 120\n#WAV01 kick.ogg\n#00011:0001\n")
        .expect("write chart");
    let output = dir.path().join("out.wav");

    let summary = ChartRenderer::with_rng(RngMock([1]))
        .render_file(&chart, &output)
        .expect("chart must be rendered");
    assert_eq!(summary.sample_rate, RATE);
    assert_eq!(summary.frames, 2 * RATE as usize);
    assert_eq!(summary.notes, 1);

    let reader = hound::WavReader::open(&output).expect("output must be a WAV");
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(spec.sample_rate, RATE);
    let samples: Vec<f32> = reader
        .into_samples::<f32>()
        .collect::<core::result::Result<_, _>>()
        .expect("float samples");
    assert_eq!(samples.len(), 4 * RATE as usize);
    let frame = 2 * RATE as usize;
    assert_eq!(samples[frame - 2..frame], [0.0, 0.0]);
    assert_eq!(samples[frame..frame + 2], [0.5, 0.5]);
}

#[test]
fn unreadable_chart_aborts_in_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = ChartRenderer::with_rng(RngMock([1]))
        .render_file(&dir.path().join("absent.bms"), &dir.path().join("out.wav"))
        .expect_err("chart does not exist");
    assert!(matches!(err, RenderError::Io { .. }), "{err}");
    assert_eq!(err.stage(), Stage::Load);
    assert!(!dir.path().join("out.wav").exists());
}

/// Keeps what it was asked to write.
#[derive(Clone, Default)]
struct MemoryWriter(Arc<Mutex<Option<(MasterBuffer, u32)>>>);

impl SampleWriter for MemoryWriter {
    fn write(&self, master: &MasterBuffer, sample_rate: u32, _: &Path) -> Result<()> {
        if let Ok(mut written) = self.0.lock() {
            *written = Some((master.clone(), sample_rate));
        }
        Ok(())
    }
}

#[test]
fn writer_receives_the_final_mix() {
    let dir = tempfile::tempdir().expect("temp dir");
    let chart = dir.path().join("chart.bms");
    std::fs::write(&chart, "#BPM 120\n#WAV01 kick.wav\n#00011:0001\n").expect("write chart");
    let loader = MemoryLoader {
        clips: HashMap::from([(dir.path().join("kick.wav"), AudioClip::new(vec![[1.0, 1.0]; 3]))]),
        sample_rate: 10,
    };
    let writer = MemoryWriter::default();

    let summary = ChartRenderer::with_rng(RngMock([1]))
        .with_resolver(MemoryResolver)
        .with_loader(loader)
        .with_writer(writer.clone())
        .render_file(&chart, &dir.path().join("out.wav"))
        .expect("chart must be rendered");
    assert_eq!(summary.frames, 13);
    assert!((summary.duration() - 1.3).abs() < 1e-9);

    let written = writer.0.lock().expect("writer lock").take();
    let (master, sample_rate) = written.expect("writer must be called");
    assert_eq!(sample_rate, 10);
    assert_eq!(master.len(), 13);
    assert_eq!(master.frames()[10], [1.0, 1.0]);
    assert!(!dir.path().join("out.wav").exists());
}

#[test]
fn background_and_note_share_a_frame() {
    // beat 0.5 at 120 BPM is 0.25s, frame 2.5 at 10 Hz
    const SRC: &str = r"
#BPM 120
#WAV01 bgm.wav
#WAV02 key.wav
#00001:0001000000000000
#00011:0002000000000000
";
    let assets = vec![
        ("bgm", AudioClip::new(vec![[0.25, 0.25]])),
        ("key", AudioClip::new(vec![[0.5, 0.5]])),
    ];
    let mixdown = mix(SRC, RngMock([1]), 10, assets);
    assert_eq!(
        mixdown.timeline.master.frames(),
        &[[0.0, 0.0], [0.0, 0.0], [0.0, 0.0], [0.75, 0.75]]
    );
}

#[test]
fn declared_extension_wins_over_other_files() {
    const RATE: u32 = 8000;
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("kick.ogg"), b"not a wave file").expect("write decoy");
    write_mono_wav(&dir.path().join("kick.wav"), RATE, &[16384; 4]);
    let chart = dir.path().join("chart.bms");
    std::fs::write(&chart, "#BPM 120\n#WAV01 kick.wav\n#00011:01\n").expect("write chart");

    let summary = ChartRenderer::with_rng(RngMock([1]))
        .render_file(&chart, &dir.path().join("out.wav"))
        .expect("declared file must be used");
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.notes, 1);
}

#[test]
fn event_past_mix_limit_is_an_error() {
    let assets = || vec![("a", AudioClip::new(vec![[1.0, 1.0]]))];
    let err = renderer(RngMock([1]), 44100, assets())
        .mix_source("#BPM 120\n#WAV01 a.wav\n#00002:1e300\n#00101:01\n", Path::new("chart"))
        .expect_err("background too late");
    assert_eq!(err.stage(), Stage::Timeline);

    let err = renderer(RngMock([1]), 44100, assets())
        .mix_source("#BPM 120\n#WAV01 a.wav\n#00002:1e300\n#00111:01\n", Path::new("chart"))
        .expect_err("note too late");
    assert_eq!(err.stage(), Stage::Render);
}
