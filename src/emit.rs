use std::sync::atomic::{AtomicBool, Ordering};

use crate::block::SavedBlock;
use crate::context::FormatSource;
use crate::error::CoreError;
use crate::formatter::Formatter;
use crate::level::Level;
use crate::registry::FormatEntry;
use crate::selector::{FormatEntryKind, FormatSelector};
use crate::tag::Tag;

/// Walk `block` against the descriptors in `source`, producing the
/// concatenated output text for every event in the block.
pub fn emit_all(block: &SavedBlock, source: &dyn FormatSource, emit_std_prefix: bool) -> Result<String, CoreError> {
    match emit_all_impl(block, source, emit_std_prefix, None)? {
        Some(text) => Ok(text),
        None => unreachable!("emit_all_impl only returns None when given an abort flag"),
    }
}

/// As [`emit_all`], but polls `abort` between events (not mid-event) and
/// returns `Ok(None)` — discarding whatever partial output had accumulated —
/// the moment it observes the flag set. Used by the background format
/// worker's cooperative cancellation.
pub fn emit_all_cooperative(
    block: &SavedBlock,
    source: &dyn FormatSource,
    emit_std_prefix: bool,
    abort: &AtomicBool,
) -> Result<Option<String>, CoreError> {
    emit_all_impl(block, source, emit_std_prefix, Some(abort))
}

fn emit_all_impl(
    block: &SavedBlock,
    source: &dyn FormatSource,
    emit_std_prefix: bool,
    abort: Option<&AtomicBool>,
) -> Result<Option<String>, CoreError> {
    let tags = block.tags();
    let data = block.data();
    let mut fmtr = Formatter::with_capacity(tags.len() * 4 + 16);
    let mut pos = 0usize;

    while pos < tags.len() {
        if let Some(flag) = abort {
            if flag.load(Ordering::Relaxed) {
                return Ok(None);
            }
        }

        if pos + 4 > tags.len() {
            return Err(CoreError::BadBlockBounds {
                epos: tags.len(),
                len: tags.len(),
            });
        }

        let format_id = data[pos] as i64;
        pos += 1;
        let level = Level::from_bits_truncate_wire(data[pos] as u32);
        pos += 1;
        let category = data[pos] as i64;
        pos += 1;
        let wall_time = data[pos] as i64;
        pos += 1;

        if emit_std_prefix {
            fmtr.emit_literal(level.name());
            fmtr.emit_literal("#");
            fmtr.emit_literal(&source.category_name(category));
            fmtr.emit_literal(" @ ");
            fmtr.emit_date_iso(wall_time, false);
            fmtr.emit_literal(" -- ");
        }

        match source.get_format(format_id) {
            Some(descriptor) => {
                fmtr.emit_literal(&descriptor.initial_segment);
                for entry in &descriptor.entries {
                    emit_entry(&mut fmtr, block, &mut pos, source, entry)?;
                }
            }
            None => {
                tracing::warn!(format_id, "no registered format descriptor for event; emitting sentinel");
                fmtr.emit_sentinel("\"<BadFormat>\"");
            }
        }

        // Defensive resync: a missing descriptor (or a malformed entry list)
        // may leave slots unconsumed before the event's `End`. Skip forward
        // rather than desynchronizing the next event's header.
        while pos < tags.len() && tags[pos] != Tag::End {
            pos += 1;
        }
        if pos >= tags.len() {
            return Err(CoreError::BadBlockBounds {
                epos: tags.len(),
                len: tags.len(),
            });
        }
        pos += 1; // consume End
        fmtr.emit_literal("\n");
    }

    Ok(Some(fmtr.into_string()))
}

fn emit_entry(
    fmtr: &mut Formatter,
    block: &SavedBlock,
    pos: &mut usize,
    source: &dyn FormatSource,
    entry: &FormatEntry,
) -> Result<(), CoreError> {
    match entry.kind {
        FormatEntryKind::Literal => {
            fmtr.emit_literal(if entry.selector == FormatSelector::HASH { "#" } else { "%" });
        }
        FormatEntryKind::Expando => emit_expando(fmtr, block, pos, source, entry.selector),
        FormatEntryKind::Basic | FormatEntryKind::Compound => {
            let tag = block.tags()[*pos];
            if tag == Tag::BadFormat {
                fmtr.emit_sentinel("\"<BadFormat>\"");
                *pos += 1;
            } else if tag.is_opener() {
                emit_structured(fmtr, block, pos);
            } else {
                emit_by_selector(fmtr, block, pos, entry.selector, tag);
            }
        }
    }
    fmtr.emit_literal(&entry.trailing_literal);
    Ok(())
}

fn emit_expando(
    fmtr: &mut Formatter,
    block: &SavedBlock,
    pos: &mut usize,
    source: &dyn FormatSource,
    selector: FormatSelector,
) {
    match selector {
        FormatSelector::HOST => fmtr.emit_json_string(source.host_name()),
        FormatSelector::APP => fmtr.emit_json_string(source.app_name()),
        FormatSelector::SOURCE => {
            let text = string_slot(block, *pos);
            fmtr.emit_json_string(text);
            *pos += 1;
        }
        FormatSelector::WALLCLOCK => {
            let ms = block.data()[*pos] as i64;
            fmtr.emit_date_iso(ms, true);
            *pos += 1;
        }
        FormatSelector::TIMESTAMP | FormatSelector::CALLBACK | FormatSelector::REQUEST => {
            let value = block.data()[*pos] as i64;
            fmtr.emit_literal(&value.to_string());
            *pos += 1;
        }
        _ => {
            fmtr.emit_sentinel("\"<BadFormat>\"");
            *pos += 1;
        }
    }
}

fn emit_by_selector(fmtr: &mut Formatter, block: &SavedBlock, pos: &mut usize, selector: FormatSelector, tag: Tag) {
    match selector {
        FormatSelector::BOOL => {
            fmtr.emit_bool(block.data()[*pos] != 0.0);
            *pos += 1;
        }
        FormatSelector::NUMBER => {
            fmtr.emit_number(block.data()[*pos]);
            *pos += 1;
        }
        FormatSelector::STRING => {
            fmtr.emit_json_string(string_slot(block, *pos));
            *pos += 1;
        }
        FormatSelector::DATEISO => {
            fmtr.emit_date_iso(block.data()[*pos] as i64, true);
            *pos += 1;
        }
        FormatSelector::DATEUTC => {
            fmtr.emit_date_utc(block.data()[*pos] as i64, true);
            *pos += 1;
        }
        FormatSelector::DATELOCAL => {
            fmtr.emit_date_local(block.data()[*pos] as i64, true);
            *pos += 1;
        }
        _ => emit_scalar_by_tag(fmtr, block, pos, tag),
    }
}

fn string_slot(block: &SavedBlock, pos: usize) -> &str {
    let key = block.data()[pos] as i32;
    block.string_at(key).unwrap_or("")
}

/// Emit a value according to its wire tag, for a fallback (`GENERAL`/unknown
/// selector) `Basic`/`Compound` entry, or for any scalar encountered while
/// walking a structured region.
fn emit_scalar_by_tag(fmtr: &mut Formatter, block: &SavedBlock, pos: &mut usize, tag: Tag) {
    match tag {
        Tag::Undefined => fmtr.emit_sentinel("undefined"),
        Tag::Null => fmtr.emit_sentinel("null"),
        Tag::Bool => fmtr.emit_bool(block.data()[*pos] != 0.0),
        Tag::Number => fmtr.emit_number(block.data()[*pos]),
        Tag::StringIdx => fmtr.emit_json_string(string_slot(block, *pos)),
        Tag::Date => fmtr.emit_date_iso(block.data()[*pos] as i64, true),
        Tag::BadFormat => fmtr.emit_sentinel("\"<BadFormat>\""),
        Tag::Cycle => fmtr.emit_sentinel("\"<Cycle>\""),
        Tag::DepthBoundObject => fmtr.emit_sentinel("\"{...}\""),
        Tag::LengthBoundObject => fmtr.emit_literal("\"$rest$\": \"...\""),
        Tag::DepthBoundArray => fmtr.emit_sentinel("\"[...]\""),
        Tag::LengthBoundArray => fmtr.emit_sentinel("\"...\""),
        _ => fmtr.emit_sentinel("\"<OpaqueValue>\""),
    }
    *pos += 1;
}

struct Frame {
    need_comma: bool,
}

/// Iterative walker for a `{…}`/`[…]` region, using an explicit stack rather
/// than host-language recursion (see the crate's design notes on why — a
/// deeply nested structured value must not be able to exhaust the call
/// stack). `*pos` must point at the opening `LParen`/`LBrack`; on return it
/// points just past the matching closer.
fn emit_structured(fmtr: &mut Formatter, block: &SavedBlock, pos: &mut usize) {
    let tags = block.tags();
    let mut stack: Vec<Frame> = Vec::new();

    match tags[*pos] {
        Tag::LParen => fmtr.emit_literal("{"),
        Tag::LBrack => fmtr.emit_literal("["),
        _ => unreachable!("emit_structured called on a non-opener tag"),
    }
    stack.push(Frame { need_comma: false });
    *pos += 1;

    while !stack.is_empty() {
        let tag = tags[*pos];
        let need_comma = stack.last().unwrap().need_comma;

        match tag {
            Tag::RParen | Tag::RBrack => {
                fmtr.emit_literal(if tag == Tag::RParen { "}" } else { "]" });
                *pos += 1;
                stack.pop();
                if let Some(parent) = stack.last_mut() {
                    parent.need_comma = true;
                }
            }
            Tag::PropertyRecord => {
                if need_comma {
                    fmtr.emit_literal(", ");
                }
                fmtr.emit_json_string(string_slot(block, *pos));
                fmtr.emit_literal(": ");
                *pos += 1;
                stack.last_mut().unwrap().need_comma = false;
            }
            Tag::LParen => {
                if need_comma {
                    fmtr.emit_literal(", ");
                }
                fmtr.emit_literal("{");
                *pos += 1;
                stack.push(Frame { need_comma: false });
            }
            Tag::LBrack => {
                if need_comma {
                    fmtr.emit_literal(", ");
                }
                fmtr.emit_literal("[");
                *pos += 1;
                stack.push(Frame { need_comma: false });
            }
            other => {
                if need_comma {
                    fmtr.emit_literal(", ");
                }
                emit_scalar_by_tag(fmtr, block, pos, other);
                stack.last_mut().unwrap().need_comma = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::selector::{FormatEntryKind, FormatSelector};

    fn env_with_format(
        id: i64,
        kinds: &[FormatEntryKind],
        selectors: &[FormatSelector],
        initial: &str,
        trailing: &[&str],
    ) -> Environment {
        let mut env = Environment::new(Level::INFO, "host", "app");
        let trailing: Vec<String> = trailing.iter().map(|s| s.to_string()).collect();
        env.register_format(id, kinds, selectors, initial, &trailing, "test").unwrap();
        env
    }

    fn header(format_id: f64, level: Level, category: f64, wall: f64) -> (Vec<f64>,) {
        (vec![format_id, level.bits() as f64, category, wall],)
    }

    #[test]
    fn save_and_emit_simple_string() {
        let env = env_with_format(
            0,
            &[FormatEntryKind::Basic],
            &[FormatSelector::STRING],
            "hello ",
            &["!"],
        );
        let mut block = SavedBlock::with_capacity(16);
        let (hdr,) = header(0.0, Level::INFO, 1.0, 0.0);
        block.push(Tag::Number, hdr[0]);
        block.push(Tag::Number, hdr[1]);
        block.push(Tag::Number, hdr[2]);
        block.push(Tag::Number, hdr[3]);
        block.push_string(Tag::StringIdx, 0, "world");
        block.push(Tag::End, 0.0);

        let out = emit_all(&block, &env, false).unwrap();
        assert_eq!(out, "hello \"world\"!\n");
    }

    #[test]
    fn structured_emit_object_with_nested_array() {
        let env = env_with_format(
            0,
            &[FormatEntryKind::Basic],
            &[FormatSelector::GENERAL],
            "",
            &[""],
        );
        let mut block = SavedBlock::with_capacity(32);
        for v in [0.0, Level::INFO.bits() as f64, 1.0, 0.0] {
            block.push(Tag::Number, v);
        }
        block.push(Tag::LParen, 0.0);
        block.push_string(Tag::PropertyRecord, 1, "a");
        block.push(Tag::Number, 1.0);
        block.push_string(Tag::PropertyRecord, 2, "b");
        block.push(Tag::LBrack, 0.0);
        block.push(Tag::Number, 2.0);
        block.push(Tag::Number, 3.0);
        block.push(Tag::RBrack, 0.0);
        block.push(Tag::RParen, 0.0);
        block.push(Tag::End, 0.0);

        let out = emit_all(&block, &env, false).unwrap();
        assert_eq!(out, "{\"a\": 1, \"b\": [2, 3]}\n");
    }

    #[test]
    fn std_prefix_carries_iso_date_at_epoch() {
        let env = env_with_format(0, &[], &[], "x", &[]);
        let mut block = SavedBlock::with_capacity(16);
        for v in [0.0, Level::INFO.bits() as f64, 1.0, 0.0] {
            block.push(Tag::Number, v);
        }
        block.push(Tag::End, 0.0);

        let out = emit_all(&block, &env, true).unwrap();
        assert!(out.contains(" @ 1970-01-01T00:00:00.000Z -- "));
    }

    #[test]
    fn missing_descriptor_renders_sentinel_and_resyncs() {
        let env = Environment::new(Level::INFO, "h", "a");
        let mut block = SavedBlock::with_capacity(16);
        for v in [99.0, Level::INFO.bits() as f64, 1.0, 0.0] {
            block.push(Tag::Number, v);
        }
        block.push(Tag::Number, 42.0);
        block.push(Tag::End, 0.0);

        let out = emit_all(&block, &env, false).unwrap();
        assert_eq!(out, "\"<BadFormat>\"\n");
    }

    #[test]
    fn expando_host_and_app_consume_no_slots() {
        let env = env_with_format(
            0,
            &[FormatEntryKind::Expando, FormatEntryKind::Expando],
            &[FormatSelector::HOST, FormatSelector::APP],
            "",
            &[" ", ""],
        );
        let mut block = SavedBlock::with_capacity(16);
        for v in [0.0, Level::INFO.bits() as f64, 1.0, 0.0] {
            block.push(Tag::Number, v);
        }
        block.push(Tag::End, 0.0);

        let out = emit_all(&block, &env, false).unwrap();
        assert_eq!(out, "\"host\" \"app\"\n");
    }
}
