//! Log levels emitted while parsing analyzer replies.
//!
//! Installs a process-wide logger, so this file holds a single test.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicUsize, Ordering};
use wellbeing_rs::domains::risk::parse_categories;
use wellbeing_rs::RiskCategory;

struct CountingLogger {
    errors: AtomicUsize,
    debugs: AtomicUsize,
}

impl Log for CountingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        match record.level() {
            Level::Error => {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
            Level::Debug => {
                self.debugs.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    fn flush(&self) {}
}

static LOGGER: CountingLogger = CountingLogger {
    errors: AtomicUsize::new(0),
    debugs: AtomicUsize::new(0),
};

#[test]
fn ordinary_replies_do_not_log_errors() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let (found, unrecognized) = parse_categories("[\"Gambling\"]");
    assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![RiskCategory::Gambling]);
    assert!(unrecognized.is_empty());

    let (found, unrecognized) = parse_categories("None");
    assert!(found.is_empty());
    assert!(unrecognized.is_empty());

    let (found, _) = parse_categories("Gambling, Late-night use");
    assert_eq!(found.len(), 2);

    assert_eq!(LOGGER.errors.load(Ordering::SeqCst), 0);
    // the two plain-text replies fall back to the list split
    assert_eq!(LOGGER.debugs.load(Ordering::SeqCst), 2);
}
