#![cfg(feature = "enable-log")]

use std::{collections::HashSet, fmt, sync::Mutex, thread};

use esp_utils::logging::{LogLevel, Logger, Sink};

const THREADS: usize = 8;
const MESSAGES: usize = 250;

struct Capture(Mutex<Vec<String>>);

impl Sink for Capture {
    fn emit(&self, line: fmt::Arguments<'_>) {
        self.0.lock().unwrap().push(line.to_string());
    }
}

fn expected(t: usize, m: usize) -> String {
    format!("[T{t}][ INFO][stress.rs:0042](worker): message {t}-{m} {}", "x".repeat(t + 1))
}

#[test]
fn concurrent_lines_never_interleave() {
    let logger: Logger<Capture, 128> = Logger::new(LogLevel::Debug, Capture(Mutex::new(Vec::new())));

    thread::scope(|scope| {
        for t in 0..THREADS {
            let logger = &logger;
            scope.spawn(move || {
                let tag = format!("T{t}");
                let pad = "x".repeat(t + 1);
                for m in 0..MESSAGES {
                    logger.print(
                        LogLevel::Info,
                        &tag,
                        "/src/app/stress.rs",
                        42,
                        "worker",
                        format_args!("message {t}-{m} {pad}"),
                    );
                }
            });
        }
    });

    let lines = logger.sink().0.lock().unwrap().clone();
    assert_eq!(lines.len(), THREADS * MESSAGES);

    let all: HashSet<String> = (0..THREADS)
        .flat_map(|t| (0..MESSAGES).map(move |m| expected(t, m)))
        .collect();
    for line in &lines {
        assert!(all.contains(line), "garbled line: {line:?}");
    }

    let unique: HashSet<&String> = lines.iter().collect();
    assert_eq!(unique.len(), lines.len());

    // Each thread's own lines keep their order
    for t in 0..THREADS {
        let prefix = format!("[T{t}]");
        let own: Vec<&String> = lines.iter().filter(|l| l.starts_with(&prefix)).collect();
        for (m, line) in own.iter().enumerate() {
            assert_eq!(**line, expected(t, m));
        }
    }
}

#[test]
fn concurrent_truncation_stays_in_bounds() {
    let logger: Logger<Capture, 16> = Logger::new(LogLevel::Debug, Capture(Mutex::new(Vec::new())));
    let long = "y".repeat(200);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..100 {
                    logger.print(LogLevel::Error, "T", "a.rs", 1, "f", format_args!("{long}"));
                }
            });
        }
    });

    let lines = logger.sink().0.lock().unwrap().clone();
    assert_eq!(lines.len(), 400);
    let expected = format!("[T][ERROR][a.rs:0001](f): {}", "y".repeat(15));
    assert!(lines.iter().all(|l| *l == expected));
}
