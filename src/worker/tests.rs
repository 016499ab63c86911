use super::*;
use crate::histogram::PAYLOAD_LEN;
use std::fs;
use tempfile::TempDir;

fn input_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Channel that accepts a few bytes and then fails.
struct BrokenChannel {
    accepted: usize,
}

impl Write for BrokenChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.accepted >= 16 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"));
        }
        let n = buf.len().min(16 - self.accepted);
        self.accepted += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_publishes_exactly_one_payload() {
    let dir = TempDir::new().unwrap();
    let path = input_file(&dir, "abc.txt", "aabbcc");
    let mut channel = Vec::new();

    let code = WorkerTask::new(0, Assignment::Input(path)).run(&mut channel);

    assert_eq!(code, exit_code::SUCCESS);
    assert_eq!(channel.len(), PAYLOAD_LEN);
    let histogram = Histogram::decode(&channel).unwrap();
    assert_eq!(histogram, Histogram::from_bytes(b"aabbcc"));
}

#[test]
fn test_empty_input_still_publishes() {
    let dir = TempDir::new().unwrap();
    let path = input_file(&dir, "empty.txt", "");
    let mut channel = Vec::new();

    let code = WorkerTask::new(1, Assignment::Input(path)).run(&mut channel);

    assert_eq!(code, exit_code::SUCCESS);
    assert!(Histogram::decode(&channel).unwrap().is_empty());
}

#[test]
fn test_missing_input_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut channel = Vec::new();

    let task = WorkerTask::new(2, Assignment::Input(dir.path().join("missing.txt")));
    let code = task.run(&mut channel);

    assert_eq!(code, exit_code::INPUT_FAILURE);
    assert!(channel.is_empty());
}

#[test]
fn test_broken_channel_is_a_publish_failure() {
    let dir = TempDir::new().unwrap();
    let path = input_file(&dir, "text.txt", "The quick brown fox");
    let mut channel = BrokenChannel { accepted: 0 };

    let code = WorkerTask::new(3, Assignment::Input(path)).run(&mut channel);

    assert_eq!(code, exit_code::PUBLISH_FAILURE);
    assert_eq!(channel.accepted, 16);
}

#[test]
fn test_hold_gives_up_after_limit() {
    let mut channel = Vec::new();
    let task = WorkerTask::new(4, Assignment::Hold).with_hold_limit(Duration::from_millis(20));

    let started = std::time::Instant::now();
    let code = task.run(&mut channel);

    assert_eq!(code, exit_code::SUCCESS);
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert!(channel.is_empty());
}

#[test]
fn test_linger_happens_after_publish() {
    let dir = TempDir::new().unwrap();
    let path = input_file(&dir, "x.txt", "xyz");
    let mut channel = Vec::new();
    let task =
        WorkerTask::new(5, Assignment::Input(path)).with_linger(Duration::from_millis(30));

    let started = std::time::Instant::now();
    assert_eq!(task.run(&mut channel), exit_code::SUCCESS);
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(channel.len(), PAYLOAD_LEN);
}
