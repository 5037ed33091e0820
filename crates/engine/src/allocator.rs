//! Data allocation: decides which sink is responsible for which span of
//! the input.
//!
//! Copy mode hands every byte to every sink. Scatter mode divides the
//! unassigned span evenly across the sinks that are ready and drained,
//! visiting them in table order; the first one visited also absorbs the
//! integer remainder. Line-aligned scatter additionally moves each share
//! boundary to fall immediately after a newline.

use contracts::{EngineError, SplitMode};
use tracing::debug;

use crate::pool::BlockPool;
use crate::sink::Sink;

/// Raise `pos_to_write` on the sinks that should receive freshly read
/// data. `ready` holds the multiplexer's writability verdict per sink for
/// this iteration; `reached_eof` lets line mode close out a trailing
/// fragment that will never gain a newline.
pub(crate) fn assign(
    mode: SplitMode,
    sinks: &mut [Sink],
    ready: &[bool],
    pool: &BlockPool,
    source_pos_read: u64,
    reached_eof: bool,
) -> Result<(), EngineError> {
    if !mode.is_scatter() {
        for sink in sinks.iter_mut() {
            sink.pos_to_write = source_pos_read;
        }
        return Ok(());
    }

    // High-water mark of what is already assigned to some sink, dead or
    // alive: a window lost to a broken pipe is never reassigned.
    let mut pos_assigned = sinks.iter().map(|s| s.pos_to_write).max().unwrap_or(0);

    // Only drained sinks the multiplexer reported writable take part;
    // partially-drained sinks keep their existing window.
    let available_sinks = sinks
        .iter()
        .enumerate()
        .filter(|(i, s)| ready[*i] && s.is_drained())
        .count() as u64;
    if available_sinks == 0 {
        return Ok(());
    }

    let available_data = source_pos_read - pos_assigned;
    let data_per_sink = available_data / available_sinks;
    let remainder = available_data % available_sinks;
    debug!(
        available_data,
        data_per_sink, available_sinks, "assigning scatter shares"
    );

    let mut first = true;
    for (index, sink) in sinks.iter_mut().enumerate() {
        if !ready[index] || !sink.is_drained() {
            continue;
        }
        let share = if first {
            first = false;
            data_per_sink + remainder
        } else {
            data_per_sink
        };

        // Nothing written yet from the fresh window.
        sink.pos_written = pos_assigned;
        if mode.line_aligned() {
            let cut = newline_cut(
                pool,
                pos_assigned,
                share,
                data_per_sink,
                available_data,
                source_pos_read,
                reached_eof,
            )?;
            match cut {
                LineCut::Cut(end) => pos_assigned = end,
                LineCut::Defer => {
                    // No newline in what has arrived so far; park this
                    // sink and wait for more input before assigning
                    // anything further.
                    sink.pos_to_write = pos_assigned;
                    debug!(sink = %sink.name(), pos = pos_assigned, "no newline yet; share deferred");
                    return Ok(());
                }
            }
        } else {
            pos_assigned += share;
        }
        sink.pos_to_write = pos_assigned;
        debug!(
            sink = %sink.name(),
            from = sink.pos_written,
            to = sink.pos_to_write,
            "share assigned"
        );
    }
    Ok(())
}

enum LineCut {
    /// New high-water mark, one past a newline (or at end of input)
    Cut(u64),
    /// No usable boundary yet; stop assigning until more input arrives
    Defer,
}

/// Move a tentative share boundary onto a newline.
///
/// Dense regime (more than half a block pending): assume the share holds
/// many lines and scan backward from its end; a share with no newline at
/// all is fatal because deferring here could never make progress within
/// one block. Sparse regime: scan forward, remembering the last newline,
/// and cut once the accumulated share exceeds the fair size; reaching the
/// end of read data falls back to the last newline seen. With no newline
/// seen the share is deferred, unless the input is exhausted, in which
/// case the unterminated tail becomes the final assignment.
#[allow(clippy::too_many_arguments)]
fn newline_cut(
    pool: &BlockPool,
    start: u64,
    share: u64,
    data_per_sink: u64,
    available_data: u64,
    source_pos_read: u64,
    reached_eof: bool,
) -> Result<LineCut, EngineError> {
    if available_data > pool.block_size() as u64 / 2 {
        if share == 0 {
            return Ok(LineCut::Cut(start));
        }
        let mut pos = start + share - 1;
        loop {
            if pool.byte_at(pos) == b'\n' {
                return Ok(LineCut::Cut(pos + 1));
            }
            if pos == start {
                return Err(EngineError::NoLineBoundary { span: share });
            }
            pos -= 1;
        }
    }

    let mut last_newline = None;
    let mut pos = start;
    loop {
        if pos >= source_pos_read {
            return Ok(match last_newline {
                Some(nl) => LineCut::Cut(nl + 1),
                None if reached_eof => LineCut::Cut(source_pos_read),
                None => LineCut::Defer,
            });
        }
        if pool.byte_at(pos) == b'\n' {
            last_newline = Some(pos);
            if pos - start > data_per_sink {
                return Ok(LineCut::Cut(pos + 1));
            }
        }
        pos += 1;
    }
}
