use crate::error::{Error, Result};
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;

/// What one worker slot is asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum InputSlot {
    /// Count the letters of this file
    File(PathBuf),
    /// Start a worker that the parent cancels after the grace period
    Cancel,
}

impl InputSlot {
    pub fn from_path(path: PathBuf, cancel_marker: &str) -> Self {
        if path.as_os_str() == OsStr::new(cancel_marker) {
            InputSlot::Cancel
        } else {
            InputSlot::File(path)
        }
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, InputSlot::Cancel)
    }
}

impl fmt::Display for InputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSlot::File(path) => write!(f, "{}", path.display()),
            InputSlot::Cancel => f.write_str("<cancel>"),
        }
    }
}

/// Classify raw inputs in order. An empty list is a setup failure.
pub fn parse_inputs<I>(raw: I, cancel_marker: &str) -> Result<Vec<InputSlot>>
where
    I: IntoIterator,
    I::Item: Into<PathBuf>,
{
    let slots: Vec<InputSlot> = raw
        .into_iter()
        .map(|path| InputSlot::from_path(path.into(), cancel_marker))
        .collect();

    if slots.is_empty() {
        return Err(Error::NoInputs);
    }
    Ok(slots)
}
