use std::ops::{Index, IndexMut};

/// One named statistics counter.
///
/// The discriminant is both the in-memory slot index and the on-disk line
/// number of a persisted record, so the order here is a wire format: new kinds
/// must be appended, never inserted. Readers that know fewer kinds than a
/// writer ignore trailing lines; readers that know more treat missing trailing
/// lines as defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Counter {
    DirectHit = 0,
    PreprocessedHit,
    Miss,
    CalledForLink,
    MultipleSourceFiles,
    CompilerStdout,
    CompilerNoOutput,
    CompilerEmptyOutput,
    CompileFailed,
    InternalError,
    PreprocessorError,
    CompilerNotFound,
    CacheFileMissing,
    BadArguments,
    UnsupportedSourceLanguage,
    AutoconfTest,
    UnsupportedOption,
    OutputToStdout,
    OutputToDevice,
    NoInputFile,
    ExtraFileHashError,
    /// Number of files currently stored in the shard.
    FilesInCache,
    /// Total size of the shard in KiB.
    CacheSizeKib,
    /// Per-shard file-count quota; zero means no quota.
    MaxFiles,
    /// Per-shard size quota in KiB; zero means no quota.
    MaxSizeKib,
}

/// How a counter value is rendered in the summary view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Render {
    /// Plain right-aligned integer.
    Count,
    /// Human-readable byte size (the stored value is a KiB count).
    Size,
}

impl Counter {
    pub const COUNT: usize = 25;

    /// Every counter kind in storage (wire) order.
    pub const ALL: [Counter; Counter::COUNT] = [
        Counter::DirectHit,
        Counter::PreprocessedHit,
        Counter::Miss,
        Counter::CalledForLink,
        Counter::MultipleSourceFiles,
        Counter::CompilerStdout,
        Counter::CompilerNoOutput,
        Counter::CompilerEmptyOutput,
        Counter::CompileFailed,
        Counter::InternalError,
        Counter::PreprocessorError,
        Counter::CompilerNotFound,
        Counter::CacheFileMissing,
        Counter::BadArguments,
        Counter::UnsupportedSourceLanguage,
        Counter::AutoconfTest,
        Counter::UnsupportedOption,
        Counter::OutputToStdout,
        Counter::OutputToDevice,
        Counter::NoInputFile,
        Counter::ExtraFileHashError,
        Counter::FilesInCache,
        Counter::CacheSizeKib,
        Counter::MaxFiles,
        Counter::MaxSizeKib,
    ];

    /// Counters that survive [`zero_all`](crate::zero_all): they describe
    /// current or desired state (cache footprint, quotas) rather than
    /// historical events.
    pub fn survives_zero(self) -> bool {
        matches!(
            self,
            Counter::FilesInCache | Counter::CacheSizeKib | Counter::MaxFiles | Counter::MaxSizeKib
        )
    }

    /// Counters printed in the summary even when zero.
    pub fn always_shown(self) -> bool {
        matches!(
            self,
            Counter::DirectHit
                | Counter::PreprocessedHit
                | Counter::Miss
                | Counter::FilesInCache
                | Counter::CacheSizeKib
        )
    }

    pub fn render(self) -> Render {
        match self {
            Counter::CacheSizeKib | Counter::MaxSizeKib => Render::Size,
            _ => Render::Count,
        }
    }

    /// Fixed-width summary label.
    pub fn label(self) -> &'static str {
        match self {
            Counter::DirectHit => "cache hit (direct)             ",
            Counter::PreprocessedHit => "cache hit (preprocessed)       ",
            Counter::Miss => "cache miss                     ",
            Counter::CalledForLink => "called for link                ",
            Counter::MultipleSourceFiles => "multiple source files          ",
            Counter::CompilerStdout => "compiler produced stdout       ",
            Counter::CompilerNoOutput => "compiler produced no output    ",
            Counter::CompilerEmptyOutput => "compiler produced empty output ",
            Counter::CompileFailed => "compile failed                 ",
            Counter::InternalError => "internal error                 ",
            Counter::PreprocessorError => "preprocessor error             ",
            Counter::CompilerNotFound => "couldn't find the compiler     ",
            Counter::CacheFileMissing => "cache file missing             ",
            Counter::BadArguments => "bad compiler arguments         ",
            Counter::UnsupportedSourceLanguage => "unsupported source language    ",
            Counter::AutoconfTest => "autoconf compile/link          ",
            Counter::UnsupportedOption => "unsupported compiler option    ",
            Counter::OutputToStdout => "output to stdout               ",
            Counter::OutputToDevice => "output to a non-regular file   ",
            Counter::NoInputFile => "no input file                  ",
            Counter::ExtraFileHashError => "error hashing extra file       ",
            Counter::FilesInCache => "files in cache                 ",
            Counter::CacheSizeKib => "cache size                     ",
            Counter::MaxFiles => "max files                      ",
            Counter::MaxSizeKib => "max cache size                 ",
        }
    }
}

/// Summary display order. Currently identical to storage order, but the two
/// are independent: storage order is a wire format, display order is not.
pub const DISPLAY_ORDER: [Counter; Counter::COUNT] = Counter::ALL;

/// The full set of counters persisted in one `stats` file, indexed by
/// [`Counter`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsRecord([u64; Counter::COUNT]);

impl Index<Counter> for StatsRecord {
    type Output = u64;

    fn index(&self, counter: Counter) -> &u64 {
        &self.0[counter as usize]
    }
}

impl IndexMut<Counter> for StatsRecord {
    fn index_mut(&mut self, counter: Counter) -> &mut u64 {
        &mut self.0[counter as usize]
    }
}

impl StatsRecord {
    /// Encode as the on-disk text format: one decimal integer per line, in
    /// storage order, no trailing metadata.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(Counter::COUNT * 8);
        for value in &self.0 {
            out.push_str(&value.to_string());
            out.push('\n');
        }
        out
    }

    /// Best-effort additive decode.
    ///
    /// Parses whitespace-separated decimal integers in storage order and adds
    /// each onto the corresponding slot, stopping at the first token that
    /// fails to parse or when the input runs out. Slots beyond that point keep
    /// their existing values. Returns the number of slots consumed.
    pub fn decode_onto(&mut self, text: &str) -> usize {
        let mut tokens = text.split_ascii_whitespace();
        for (consumed, counter) in Counter::ALL.into_iter().enumerate() {
            let Some(token) = tokens.next() else {
                return consumed;
            };
            let Ok(value) = token.parse::<u64>() else {
                return consumed;
            };
            self[counter] = self[counter].saturating_add(value);
        }
        Counter::COUNT
    }

    /// Add every field of `delta` onto this record.
    pub fn merge(&mut self, delta: &StatsRecord) {
        for (slot, add) in self.0.iter_mut().zip(delta.0.iter()) {
            *slot = slot.saturating_add(*add);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&value| value == 0)
    }
}
