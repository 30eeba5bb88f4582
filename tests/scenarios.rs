use logpp_core::{
    process_msgs, CoreError, Environment, FormatEntryKind, FormatSelector, Level, RawBlock, Tag,
};
use pretty_assertions::assert_eq;

fn header(format_id: f64, level: Level, category: f64, wall: f64) -> [f64; 4] {
    [format_id, level.bits() as f64, category, wall]
}

/// Scenario 1: discard by level.
#[test]
fn discard_by_level() {
    let mut env = Environment::new(Level::INFO, "host", "app");

    let tags = vec![Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::End as u8];
    let data = header(0.0, Level::DEBUG, 1.0, 0.0).to_vec();
    let mut data = data;
    data.push(0.0);
    let raw = RawBlock::new(&tags, &data, &[]);

    let mut spos = 0;
    let done = process_msgs(&mut env, &raw, &mut spos, tags.len(), 0, 0, true, false).unwrap();
    assert!(done);
    env.process_complete();
    assert!(!env.has_work_pending());
}

/// Scenario 2: save and emit simple.
#[test]
fn save_and_emit_simple() {
    let mut env = Environment::new(Level::INFO, "host", "app");
    env.register_format(
        0,
        &[FormatEntryKind::Basic],
        &[FormatSelector::STRING],
        "hello ",
        &["!".to_string()],
        "hello %s!",
    )
    .unwrap();

    let tags = vec![
        Tag::Number as u8,
        Tag::Number as u8,
        Tag::Number as u8,
        Tag::Number as u8,
        Tag::StringIdx as u8,
        Tag::End as u8,
    ];
    let mut data = header(0.0, Level::INFO, 1.0, 0.0).to_vec();
    data.push(0.0); // StringIdx key
    data.push(0.0); // End payload
    let string_data = vec!["world".to_string()];
    let raw = RawBlock::new(&tags, &data, &string_data);

    let mut spos = 0;
    let done = process_msgs(&mut env, &raw, &mut spos, tags.len(), 0, 0, true, false).unwrap();
    assert!(done);
    env.process_complete();

    let out = env.format_sync(false).unwrap();
    assert_eq!(out, "hello \"world\"!\n");
}

/// Scenario 3: structured emit of a nested object/array.
#[test]
fn structured_emit() {
    let mut env = Environment::new(Level::INFO, "host", "app");
    env.register_format(0, &[FormatEntryKind::Basic], &[FormatSelector::GENERAL], "", &[String::new()], "%o")
        .unwrap();

    #[rustfmt::skip]
    let tags = vec![
        Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::Number as u8,
        Tag::LParen as u8,
        Tag::PropertyRecord as u8, Tag::Number as u8,
        Tag::PropertyRecord as u8,
        Tag::LBrack as u8, Tag::Number as u8, Tag::Number as u8, Tag::RBrack as u8,
        Tag::RParen as u8,
        Tag::End as u8,
    ];
    let mut data = header(0.0, Level::INFO, 1.0, 0.0).to_vec();
    data.extend_from_slice(&[
        0.0, // LParen
        0.0, 1.0, // PropertyRecord("a"), Number(1)
        1.0, // PropertyRecord("b")
        0.0, 2.0, 3.0, 0.0, // LBrack, Number(2), Number(3), RBrack
        0.0, // RParen
        0.0, // End
    ]);
    let string_data = vec!["a".to_string(), "b".to_string()];
    let raw = RawBlock::new(&tags, &data, &string_data);

    let mut spos = 0;
    process_msgs(&mut env, &raw, &mut spos, tags.len(), 0, 0, true, false).unwrap();
    env.process_complete();

    let out = env.format_sync(false).unwrap();
    assert_eq!(out, "{\"a\": 1, \"b\": [2, 3]}\n");
}

/// Scenario 4: date emit in the standard prefix.
#[test]
fn date_emit_in_std_prefix() {
    let mut env = Environment::new(Level::INFO, "host", "app");
    env.register_format(0, &[], &[], "x", &[], "x").unwrap();

    let tags = vec![Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::End as u8];
    let mut data = header(0.0, Level::INFO, 1.0, 0.0).to_vec();
    data.push(0.0);
    let raw = RawBlock::new(&tags, &data, &[]);

    let mut spos = 0;
    process_msgs(&mut env, &raw, &mut spos, tags.len(), 0, 0, true, false).unwrap();
    env.process_complete();

    let out = env.format_sync(true).unwrap();
    assert!(out.contains(" @ 1970-01-01T00:00:00.000Z -- "));
}

/// Scenario 5: async abort hands the in-flight block back untouched, and a
/// subsequent sync emit still produces every event in ingest order. Both
/// events are ingested in one `process_msgs` call, so they land in a single
/// saved block — this still exercises the abort/reclaim path and ordering
/// guarantee without depending on the worker's scheduling to land mid-block.
#[test]
fn async_abort_preserves_fifo_order() {
    let mut env = Environment::new(Level::INFO, "host", "app");
    env.register_format(0, &[FormatEntryKind::Basic], &[FormatSelector::NUMBER], "", &[String::new()], "%d")
        .unwrap();

    let event_tags = [Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::End as u8];
    let mut tags = Vec::new();
    let mut data = Vec::new();
    for value in [1.0, 2.0] {
        tags.extend_from_slice(&event_tags);
        data.extend_from_slice(&header(0.0, Level::INFO, 1.0, 0.0));
        data.push(value);
        data.push(0.0);
    }
    let raw = RawBlock::new(&tags, &data, &[]);
    let mut spos = 0;
    process_msgs(&mut env, &raw, &mut spos, tags.len(), 0, 0, true, false).unwrap();
    env.process_complete();
    assert!(env.has_work_pending());

    env.format_async(false, |_| {}).unwrap();
    env.abort_async();

    let out = env.format_sync(false).unwrap();
    assert_eq!(out, "1\n2\n");
}

/// Scenario 6: backpressure holds the batch without advancing `spos`.
#[test]
fn backpressure_holds_batch() {
    let mut env = Environment::new(Level::INFO, "host", "app");
    assert_eq!(env.msg_time_limit_ms(), 500);
    assert_eq!(env.msg_slot_limit(), 4096);

    let tags = vec![Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::Number as u8, Tag::End as u8];
    let mut data = header(0.0, Level::INFO, 1.0, 990.0).to_vec();
    data.push(0.0);
    let raw = RawBlock::new(&tags, &data, &[]);

    let mut spos = 0;
    let done = process_msgs(&mut env, &raw, &mut spos, tags.len(), 1000, 100, false, false).unwrap();
    assert!(!done);
    assert_eq!(spos, 0);
}

#[test]
fn epos_out_of_range_is_a_boundary_error() {
    let mut env = Environment::new(Level::INFO, "host", "app");
    let tags = vec![Tag::End as u8];
    let data = vec![0.0];
    let raw = RawBlock::new(&tags, &data, &[]);
    let mut spos = 0;
    let err = process_msgs(&mut env, &raw, &mut spos, 10, 0, 0, true, true).unwrap_err();
    assert!(matches!(err, CoreError::BadBlockBounds { .. }));
}
