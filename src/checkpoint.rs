use std::sync::Arc;

/// Default label of the script whose checkpoints drive navigation.
pub const MONITORED_LABEL: &str = "source";

/// A line-boundary event raised by the execution engine.
///
/// Checkpoints are ephemeral: one is delivered per controller decision and
/// carries just enough to identify the position: the label of the script it
/// originates from and a line number within it. Checkpoints from scripts other
/// than the monitored one are invisible to navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub script: Arc<str>,
    pub line: u32,
}

impl Checkpoint {
    pub fn new(script: impl Into<Arc<str>>, line: u32) -> Self {
        Self {
            script: script.into(),
            line,
        }
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.script, self.line)
    }
}

/// One unit of program text handed to the engine.
///
/// `counted` marks scripts whose checkpoints the pre-run step counter
/// includes when computing the total used to bound jump navigation.
#[derive(Debug, Clone)]
pub struct Script {
    pub label: Arc<str>,
    pub source: String,
    pub counted: bool,
}

impl Script {
    pub fn new(label: impl Into<Arc<str>>, source: impl Into<String>, counted: bool) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            counted,
        }
    }
}

/// A full run: optional support code first, then the user source.
///
/// The `monitored` label selects the script whose checkpoints participate in
/// navigation; everything else is resumed through without counting. Support
/// code runs before the first monitored checkpoint, and a failure there
/// aborts the run during setup.
#[derive(Debug, Clone)]
pub struct Program {
    pub scripts: Vec<Script>,
    pub monitored: Arc<str>,
}

impl Program {
    pub fn new(source: impl Into<String>) -> Self {
        let monitored: Arc<str> = Arc::from(MONITORED_LABEL);
        Self {
            scripts: vec![Script {
                label: monitored.clone(),
                source: source.into(),
                counted: true,
            }],
            monitored,
        }
    }

    pub fn with_support(source: impl Into<String>, support: impl Into<String>) -> Self {
        let monitored: Arc<str> = Arc::from(MONITORED_LABEL);
        Self {
            scripts: vec![
                Script {
                    label: Arc::from("_support"),
                    source: support.into(),
                    counted: false,
                },
                Script {
                    label: monitored.clone(),
                    source: source.into(),
                    counted: true,
                },
            ],
            monitored,
        }
    }
}
