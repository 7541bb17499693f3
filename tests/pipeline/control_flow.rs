use bms_mixdown::{
    Stage,
    command::Track,
    lex::{LineToken, Token, lex},
    load::lines,
    reduce::reduce_control_flow,
    rng::{RandRng, RngMock},
};
use pretty_assertions::assert_eq;
use rand::{SeedableRng, rngs::StdRng};

use super::{id, mix, renderer, tone};

const SRC: &str = r"
#BPM 120
#WAV01 one.wav
#WAV02 two.wav
#WAV03 three.wav

#RANDOM 3
#IF 1
    #00011:01
#ENDIF
#IF 2
    #00012:02
#ENDIF
#IF 3
    #00013:03
#ENDIF

#00014:01
";

#[test]
fn only_drawn_branch_survives() {
    let lines = lines(SRC);
    let tokens = lex(&lines).expect("valid records");
    let kept: Vec<_> = reduce_control_flow(tokens, RngMock([2]))
        .expect("valid control flow")
        .into_iter()
        .filter_map(|LineToken { token, .. }| match token {
            Token::Message {
                track,
                channel,
                message,
            } => Some((track, channel, message)),
            _ => None,
        })
        .collect();
    assert_eq!(
        kept,
        vec![(Track(0), "12", "02"), (Track(0), "14", "01")]
    );
}

#[test]
fn drawn_branch_reaches_the_mix() {
    let assets = vec![
        ("one", tone(0.1, 1)),
        ("two", tone(0.2, 1)),
        ("three", tone(0.3, 1)),
    ];
    let mixdown = mix(SRC, RngMock([2]), 100, assets);
    let lanes = &mixdown.timeline.lanes;
    assert!(lanes[0].is_empty());
    assert!(lanes[2].is_empty());
    assert_eq!(
        lanes[1].iter().map(|note| note.slot).collect::<Vec<_>>(),
        vec![id("02")]
    );
    assert_eq!(mixdown.notes, 2);
}

#[test]
fn seeded_draws_are_reproducible() {
    let assets = || {
        vec![
            ("one", tone(0.1, 3)),
            ("two", tone(0.2, 3)),
            ("three", tone(0.3, 3)),
        ]
    };
    let first = mix(SRC, RandRng(StdRng::seed_from_u64(7)), 100, assets());
    let second = mix(SRC, RandRng(StdRng::seed_from_u64(7)), 100, assets());
    assert_eq!(first.timeline.master, second.timeline.master);
}

#[test]
fn malformed_random_aborts_in_reduce() {
    let err = renderer(RngMock([1]), 100, Vec::new())
        .mix_source("#TITLE x\n#RANDOM three", std::path::Path::new("chart"))
        .expect_err("non-numeric #RANDOM");
    assert_eq!(err.stage(), Stage::Reduce);
    assert_eq!(err.line(), Some(2));
}
