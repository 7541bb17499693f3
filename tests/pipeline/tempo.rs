use bms_mixdown::rng::RngMock;

use super::{mix, tone};

const EPSILON: f64 = 1e-9;

fn onsets(src: &str) -> Vec<f64> {
    let mixdown = mix(src, RngMock([1]), 1000, vec![("a", tone(1.0, 1))]);
    let mut onsets: Vec<f64> = mixdown
        .timeline
        .lanes
        .iter()
        .flatten()
        .map(|note| note.onset)
        .collect();
    onsets.sort_by(f64::total_cmp);
    onsets
}

#[test]
fn constant_tempo_onsets_are_linear_in_beats() {
    // 120 BPM: half a second per beat, two seconds per measure
    let src = "#BPM 120\n#WAV01 a.wav\n#00011:01010101\n#00312:000001\n#00513:01";
    let expected = [0.0, 0.5, 1.0, 1.5, 6.0 + 4.0 / 3.0 * 0.5 * 2.0, 10.0];
    let got = onsets(src);
    assert_eq!(got.len(), expected.len());
    for (got, expected) in got.iter().zip(expected) {
        assert!((got - expected).abs() < EPSILON, "{got} != {expected}");
    }
}

#[test]
fn tempo_change_applies_from_its_position() {
    // 60 BPM for two beats, then 0x78 = 120 BPM
    let src = "#BPM 60\n#WAV01 a.wav\n#00003:0078\n#00011:0101\n#00111:01";
    let got = onsets(src);
    assert!((got[0] - 0.0).abs() < EPSILON);
    assert!((got[1] - 2.0).abs() < EPSILON);
    assert!((got[2] - 3.0).abs() < EPSILON, "tempo carries into the next measure: {got:?}");
}

#[test]
fn indexed_tempo_table() {
    let src = "#BPM 120\n#BPM01 60\n#WAV01 a.wav\n#00003:0001\n#00011:00000001";
    let got = onsets(src);
    // two beats at 120, then one beat at 60
    assert!((got[0] - 2.0).abs() < EPSILON, "{got:?}");
}

#[test]
fn beat_count_scales_measure_length() {
    let src = "#BPM 120\n#WAV01 a.wav\n#00002:0.5\n#00111:01";
    let got = onsets(src);
    assert!((got[0] - 1.0).abs() < EPSILON, "{got:?}");
}

#[test]
fn onsets_never_decrease() {
    let src = r"
#BPM 150
#BPM01 90.5
#BPM02 300
#WAV01 a.wav
#00003:00010002
#00011:0101010101010101
#00102:0.75
#00111:010101
#00203:02
#00211:01010101
";
    let mixdown = mix(src, RngMock([1]), 1000, vec![("a", tone(1.0, 1))]);
    let lane = &mixdown.timeline.lanes[0];
    assert_eq!(lane.len(), 15);
    assert!(lane.windows(2).all(|pair| pair[0].onset <= pair[1].onset));
}
