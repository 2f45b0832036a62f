use crate::entity::{Caller, Frame, LogEntity};
use crate::level::Level;
use chrono::Local;
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Default timestamp layout, microsecond precision.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.6f";

/// Crates whose frames are never reported as the origin of a log call.
const INTERNAL_CRATES: &[&str] = &[
    env!("CARGO_CRATE_NAME"),
    "backtrace",
    "tracing",
    "tracing_core",
    "tracing_subscriber",
];

/// Standard library crates that show up between logging frames, e.g.
/// thread-local access in the `tracing` dispatcher.
const RUNTIME_CRATES: &[&str] = &["std", "core", "alloc"];

/// How the caller location is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallerFormat {
    /// File name only, e.g. `main.rs:10`.
    #[default]
    ShortPath,
    /// Path as recorded by the compiler, e.g. `src/bin/main.rs:10`.
    FullPath,
}

impl CallerFormat {
    pub fn render(&self, caller: Caller<'_>) -> String {
        match self {
            CallerFormat::FullPath => caller.to_string(),
            CallerFormat::ShortPath => {
                let file = caller
                    .file
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(caller.file);
                format!("{}:{}", file, caller.line)
            }
        }
    }
}

/// The local half of the adapter: builds entities and renders them.
pub trait LocalBackend: Send + Sync {
    /// Build an entity for a call at `level` made from `caller`.
    fn entity(&self, level: Level, caller: Caller<'_>, message: String) -> LogEntity;

    /// Render the entity to the local output.
    fn render(&self, entity: &LogEntity);

    /// Skip `n` more frames when capturing stacks, to hide wrapper frames.
    fn advance_skip(&mut self, n: usize);
}

/// Options of [`StdBackend`].
#[derive(Debug, Clone)]
pub struct StdOptions {
    pub out_level: Level,
    /// Minimum level at which a stack is captured. `None` disables capture.
    pub stack_level: Option<Level>,
    pub caller_format: CallerFormat,
    /// `chrono` strftime layout.
    pub timestamp_format: String,
    pub caller_skip: usize,
}

impl Default for StdOptions {
    fn default() -> Self {
        Self {
            out_level: Level::Info,
            stack_level: None,
            caller_format: CallerFormat::default(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            caller_skip: 0,
        }
    }
}

/// Line-oriented text backend writing to stdout or any [`Write`].
pub struct StdBackend {
    options: StdOptions,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StdBackend {
    pub fn new(options: StdOptions) -> Self {
        Self::with_writer(options, io::stdout())
    }

    pub fn with_writer(options: StdOptions, writer: impl Write + Send + 'static) -> Self {
        Self {
            options,
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn options(&self) -> &StdOptions {
        &self.options
    }

    fn timestamp(&self) -> String {
        let now = Local::now();
        let mut out = String::new();
        // chrono reports bad layouts as a formatting error.
        if write!(out, "{}", now.format(&self.options.timestamp_format)).is_err() {
            out = now.to_rfc3339();
        }
        out
    }

    fn wants_stack(&self, level: Level) -> bool {
        matches!(self.options.stack_level, Some(min) if level >= min)
    }

    fn capture_frames(&self) -> Vec<Frame> {
        let trace = backtrace::Backtrace::new();
        let frames: Vec<Frame> = trace
            .frames()
            .iter()
            .flat_map(|frame| frame.symbols())
            .filter_map(|symbol| {
                let function = format!("{:#}", symbol.name()?);
                let file = symbol
                    .filename()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                Some(Frame::new(function, file, symbol.lineno().unwrap_or(0)))
            })
            .collect();

        let start = call_site_index(&frames);
        frames
            .into_iter()
            .skip(start)
            .skip(self.options.caller_skip)
            .collect()
    }

    fn format_entity(entity: &LogEntity) -> String {
        let mut line = format!(
            "{}[{}] {} {}\n",
            entity.level, entity.time, entity.caller, entity.message
        );
        if !entity.frames.is_empty() {
            line.push_str("Stack:\n");
            for (i, frame) in entity.frames.iter().enumerate() {
                let _ = writeln!(line, "{}.{}\n\t{}:{}", i + 1, frame.function, frame.file, frame.line);
            }
        }
        line
    }
}

impl LocalBackend for StdBackend {
    fn entity(&self, level: Level, caller: Caller<'_>, message: String) -> LogEntity {
        let frames = if self.wants_stack(level) {
            self.capture_frames()
        } else {
            Vec::new()
        };

        LogEntity {
            level,
            time: self.timestamp(),
            caller: self.options.caller_format.render(caller),
            message,
            frames,
        }
    }

    fn render(&self, entity: &LogEntity) {
        if entity.level < self.options.out_level {
            return;
        }

        let line = Self::format_entity(entity);
        let mut writer = self.writer.lock();
        if let Err(e) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
            tracing::debug!(error = %e, "local log write failed");
        }
    }

    fn advance_skip(&mut self, n: usize) {
        self.options.caller_skip += n;
    }
}

fn frame_crate(function: &str) -> &str {
    let path = function.trim_start_matches('<');
    path.split("::").next().unwrap_or(path)
}

/// Whether a demangled function name belongs to the logging machinery.
fn is_internal(function: &str) -> bool {
    INTERNAL_CRATES.contains(&frame_crate(function))
}

fn is_runtime(function: &str) -> bool {
    RUNTIME_CRATES.contains(&frame_crate(function))
}

/// Index of the first frame past the leading run of logging frames.
/// Standard library frames inside that run are passed through; those
/// after its last logging frame belong to the caller.
fn call_site_index(frames: &[Frame]) -> usize {
    let run = frames
        .iter()
        .position(|f| !is_internal(&f.function) && !is_runtime(&f.function))
        .unwrap_or(frames.len());
    frames[..run]
        .iter()
        .rposition(|f| is_internal(&f.function))
        .map_or(0, |i| i + 1)
}
