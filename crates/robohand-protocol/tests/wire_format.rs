use expect_test::expect;
use robohand_protocol::{
    decode, decode_batch, encode, Command, CommandBatch, ParameterId, ProtocolError,
};

fn sample_batches() -> Vec<CommandBatch> {
    let angles = [-90, -1, 0, 1, 45, 90, 9999, i32::MIN, i32::MAX];
    let mut batches = Vec::new();
    for id in ParameterId::ALL {
        for angle in angles {
            let args = if id == ParameterId::Led {
                vec![angle, 0, 255]
            } else {
                vec![angle]
            };
            batches.push(CommandBatch::from(vec![Command::new(id, args)]));
        }
    }
    let mut full = CommandBatch::new();
    full.push(ParameterId::Rotation, [30])
        .push(ParameterId::RaiseArrow, [-15])
        .push(ParameterId::ExtendArrow, [20])
        .push(ParameterId::Claw, [-10])
        .push(ParameterId::Led, [255, 0, 0]);
    batches.push(full);
    batches.push(CommandBatch::new());
    batches
}

#[test]
fn decode_inverts_encode_for_valid_batches() {
    for batch in sample_batches() {
        let text = encode(&batch);
        assert_eq!(decode_batch(&text), Ok(batch.clone()), "text: {text}");
    }
}

#[test]
fn encoded_batches_end_with_delimiter_and_never_nest_it() {
    for batch in sample_batches() {
        let text = encode(&batch);
        if batch.is_empty() {
            assert!(text.is_empty());
            continue;
        }
        assert!(text.ends_with(';'));
        assert_eq!(text.matches(';').count(), batch.len());
    }
}

#[test]
fn reference_message_layout() {
    let mut batch = CommandBatch::new();
    batch
        .push(ParameterId::Rotation, [30])
        .push(ParameterId::Claw, [-10])
        .push(ParameterId::Led, [255, 0, 0]);
    expect!["rotation|30;claw|-10;led|255|0|0;"].assert_eq(&encode(&batch));
}

#[test]
fn mixed_batch_keeps_good_segments() {
    let decoded = decode("bad|x;rotation|10;claw|;led|1|2|3;");
    let rendered: Vec<String> = decoded
        .iter()
        .map(|result| match result {
            Ok(command) => format!("ok {command}"),
            Err(err) => format!("err {err}"),
        })
        .collect();
    expect![[r#"
        [
            "err invalid argument 'x' in segment 'bad|x'",
            "ok rotation|10",
            "err invalid argument '' in segment 'claw|'",
            "ok led|1|2|3",
        ]
    "#]]
    .assert_debug_eq(&rendered);
}

#[test]
fn strict_decode_reports_first_error() {
    let err = decode_batch("rotation|1;claw|abc;").unwrap_err();
    assert_eq!(
        err,
        ProtocolError::InvalidArgument {
            segment: "claw|abc".into(),
            argument: "abc".into(),
        }
    );
}
