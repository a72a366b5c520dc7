/// Log Queue
/// `log` backend that formats records into fixed lines for a console to drain
///
/// Records are queued, never written out directly, so logging from the
/// interrupt path does not touch the console. The owner of the console pops
/// lines from its main loop.

use core::fmt::Write;
use core::sync::atomic::{AtomicUsize, Ordering};

use heapless::{Deque, String};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

pub const LINE_CAPACITY: usize = 128;

/// Lines held until the console drains them
pub const QUEUE_DEPTH: usize = 16;

pub type LogLine = String<LINE_CAPACITY>;

pub struct QueueLogger {
    lines: Mutex<Deque<LogLine, QUEUE_DEPTH>>,
    dropped: AtomicUsize,
}

impl QueueLogger {
    pub const fn new() -> Self {
        QueueLogger {
            lines: Mutex::new(Deque::new()),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Oldest queued line
    pub fn pop(&self) -> Option<LogLine> {
        self.lines.lock().pop_front()
    }

    /// Lines lost to a full queue or a busy lock since the last call
    pub fn take_dropped(&self) -> usize {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

impl Default for QueueLogger {
    fn default() -> Self {
        QueueLogger::new()
    }
}

impl Log for QueueLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let mut line = LogLine::new();
        let written = write!(
            &mut line,
            "[{}] ({}) {}",
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        );
        if written.is_err() {
            while line.len() > LINE_CAPACITY - 3 {
                line.pop();
            }
            let _ = line.push_str("...");
        }

        // Interrupt context must not spin on the console's lock
        let queued = match self.lines.try_lock() {
            Some(mut lines) => lines.push_back(line).is_ok(),
            None => false,
        };
        if !queued {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn flush(&self) {}
}

static LOGGER: QueueLogger = QueueLogger::new();

/// Install the queue as the global logger
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Oldest line waiting for the console
pub fn pop() -> Option<LogLine> {
    LOGGER.pop()
}

pub fn take_dropped() -> usize {
    LOGGER.take_dropped()
}
