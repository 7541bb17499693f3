use bms_mixdown::{
    command::{Lane, Track},
    lex::lex,
    load::lines,
    measure::decode_measures,
    rng::RngMock,
};
use pretty_assertions::assert_eq;

use super::{id, mix, tone};

#[test]
fn last_measure_is_rendered() {
    const SRC: &str = "#BPM 240\n#WAV01 a.wav\n#00011:01\n#00111:01\n#00211:0001";
    let mixdown = mix(SRC, RngMock([1]), 100, vec![("a", tone(1.0, 1))]);
    let onsets: Vec<f64> = mixdown.timeline.lanes[0]
        .iter()
        .map(|note| note.onset)
        .collect();
    assert_eq!(onsets.len(), 3);
    assert!((onsets[2] - 2.5).abs() < 1e-9, "{onsets:?}");
    assert_eq!(mixdown.notes, 3);
    assert!((mixdown.timeline.end_time - 3.0).abs() < 1e-9);
}

#[test]
fn every_measure_number_is_decoded_once() {
    const SRC: &str = r"
#00311:01
#00112:02
#99999:03
#00311:0004
#00101:05
";
    let lines = lines(SRC);
    let measures = decode_measures(&lex(&lines).expect("valid records")).expect("valid");
    let tracks: Vec<_> = measures.iter().map(|m| m.track).collect();
    assert_eq!(tracks, vec![Track(1), Track(3)]);

    let lane = |i| Lane::new(i).expect("valid lane");
    assert_eq!(measures[0].lane(lane(1)), &[id("02")]);
    assert_eq!(measures[0].bgm, vec![vec![id("05")]]);
    assert_eq!(measures[1].lane(lane(0)), &[id("00"), id("04")]);
}

#[test]
fn notes_without_audio_are_skipped() {
    const SRC: &str = "#BPM 120\n#WAV01 a.wav\n#00011:0102";
    let mixdown = mix(SRC, RngMock([1]), 100, vec![("a", tone(1.0, 1))]);
    assert_eq!(mixdown.timeline.note_count(), 2);
    assert_eq!(mixdown.notes, 1);
}
