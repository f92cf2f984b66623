use crate::counter::{Counter, Render, StatsRecord, DISPLAY_ORDER};
use crate::layout::{CacheLayout, ShardId};
use crate::persist::read_onto;
use crate::util::format_size;
use std::fmt::Write as _;

/// Sum the counters across the global record and all 16 shard records.
///
/// Takes no locks: the result is informational and a record observed mid-write
/// is still internally consistent thanks to the atomic rename on the write
/// side. Missing records contribute defaults.
///
/// The global record's max-size slot is excluded from the sum. It is a
/// fallback location, not a real shard, so its quota slot would double-count
/// the whole-cache default.
// TODO: replace the positional special case with an is-global flag on the
// record once the on-disk schema grows a metadata line.
pub fn aggregate(layout: &CacheLayout) -> StatsRecord {
    let mut totals = StatsRecord::default();

    read_onto(&layout.root_record_path(), &mut totals);
    totals[Counter::MaxSizeKib] = 0;

    for shard in ShardId::all() {
        read_onto(&layout.shard_record_path(shard), &mut totals);
    }

    totals
}

/// Render the aggregate counters as the human-readable summary view.
///
/// Counters are listed in display order; a counter is skipped when it is zero
/// unless it is always shown. Size-valued counters render through
/// [`format_size`], everything else as a right-aligned integer.
pub fn format_summary(layout: &CacheLayout) -> String {
    let totals = aggregate(layout);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "cache directory                     {}",
        layout.root().display()
    );

    for kind in DISPLAY_ORDER {
        let value = totals[kind];
        if value == 0 && !kind.always_shown() {
            continue;
        }

        match kind.render() {
            Render::Count => {
                let _ = writeln!(out, "{} {:8}", kind.label(), value);
            }
            Render::Size => {
                let _ = writeln!(out, "{} {:>15}", kind.label(), format_size(value));
            }
        }
    }

    out
}
