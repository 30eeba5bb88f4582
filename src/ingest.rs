use crate::environment::{Environment, IngestMode};
use crate::error::CoreError;
use crate::level::Level;
use crate::tag::Tag;

/// A view onto the host's raw slot stream for one `process_msgs` call.
///
/// `tags` and `data` are parallel and must have equal length; `string_data`
/// is the host's transient string table, indexed by the integer payload of
/// a `StringIdx`/`PropertyRecord` slot.
pub struct RawBlock<'a> {
    pub tags: &'a [u8],
    pub data: &'a [f64],
    pub string_data: &'a [String],
}

impl<'a> RawBlock<'a> {
    #[must_use]
    pub fn new(tags: &'a [u8], data: &'a [f64], string_data: &'a [String]) -> Self {
        Self {
            tags,
            data,
            string_data,
        }
    }

    fn string_at(&self, idx: i32) -> &str {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.string_data.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Decode a wire tag byte, logging and falling back to [`Tag::Opaque`] on an
/// unrecognized byte rather than failing the batch: ingest is never aborted
/// by value-level malformation.
fn decode_tag(raw: u8, cpos: usize) -> Tag {
    let (tag, known) = Tag::from_wire_or_opaque(raw);
    if !known {
        tracing::warn!(byte = raw, cursor = cpos, "unrecognized tag byte during ingest");
    }
    tag
}

/// Drive the ingest/triage state machine over `raw[*spos..epos]`.
///
/// Returns `Ok(true)` when the producer's announced range was fully
/// consumed, `Ok(false)` when a backpressure threshold held the call back
/// (in which case `*spos` is left at the last fully-processed message
/// boundary).
pub fn process_msgs(
    env: &mut Environment,
    raw: &RawBlock<'_>,
    spos: &mut usize,
    epos: usize,
    msg_count: usize,
    now_ms: i64,
    force_all: bool,
    full_detail: bool,
) -> Result<bool, CoreError> {
    if raw.tags.len() != raw.data.len() {
        return Err(CoreError::BadArguments {
            what: "process_msgs",
            detail: format!(
                "tags ({}) and data ({}) must have equal length",
                raw.tags.len(),
                raw.data.len()
            ),
        });
    }
    if epos > raw.tags.len() {
        return Err(CoreError::BadBlockBounds {
            epos,
            len: raw.tags.len(),
        });
    }
    if *spos > epos {
        return Err(CoreError::BadArguments {
            what: "process_msgs",
            detail: format!("spos {spos} must not exceed epos {epos}"),
        });
    }

    let start_spos = *spos;
    let hint = epos.saturating_sub(start_spos) + 16;
    let mut cpos = *spos;

    tracing::trace!(cpos, epos, msg_count, force_all, full_detail, "process_msgs begin");

    loop {
        if cpos >= epos {
            *spos = cpos;
            return Ok(true);
        }

        match env.mode {
            IngestMode::Normal => {
                // Backpressure gate: only checked at a message boundary.
                if !force_all {
                    if cpos + 4 > epos {
                        // Incomplete header in the announced range; defer.
                        *spos = cpos;
                        return Ok(false);
                    }
                    let t = raw.data[cpos + 3] as i64;
                    if (t + env.msg_time_limit_ms() >= now_ms) && (msg_count <= env.msg_slot_limit()) {
                        *spos = cpos;
                        return Ok(false);
                    }
                }

                if cpos + 4 > epos {
                    *spos = cpos;
                    return Ok(false);
                }

                let level = Level::from_bits_truncate_wire(raw.data[cpos + 1] as u32);
                let category = raw.data[cpos + 2] as i64;

                let discard = !full_detail
                    && (!level.enabled_under(env.emit_level()) || !env.is_category_enabled(category));

                if discard {
                    env.mode = IngestMode::Discarding;
                    tracing::trace!(cpos, level = ?level, category, "message triaged for discard");
                } else {
                    env.ensure_active_block(hint.max(crate::block::INIT_LOG_BLOCK_SIZE));
                    env.mode = IngestMode::Saving;
                }
            }

            IngestMode::Discarding => {
                let mut done = false;
                while cpos < epos {
                    let tag = decode_tag(raw.tags[cpos], cpos);
                    cpos += 1;
                    if tag == Tag::End {
                        done = true;
                        break;
                    }
                }
                if !done {
                    *spos = cpos;
                    return Ok(false);
                }
                env.mode = IngestMode::Normal;
            }

            IngestMode::Saving => {
                let mut done = false;
                while cpos < epos {
                    let tag = decode_tag(raw.tags[cpos], cpos);
                    let data = raw.data[cpos];

                    if tag == Tag::End {
                        let block = env
                            .active_block_mut()
                            .expect("Saving mode implies an active block exists");
                        block.push(Tag::End, 0.0);
                        cpos += 1;
                        done = true;
                        break;
                    } else if tag.carries_string() {
                        let key = data as i32;
                        let text = raw.string_at(key);
                        let block = env
                            .active_block_mut()
                            .expect("Saving mode implies an active block exists");
                        block.push_string(tag, key, text);
                    } else {
                        let block = env
                            .active_block_mut()
                            .expect("Saving mode implies an active block exists");
                        block.push(tag, data);
                    }
                    cpos += 1;
                }
                if !done {
                    *spos = cpos;
                    return Ok(false);
                }
                env.mode = IngestMode::Normal;
            }
        }
    }
}
