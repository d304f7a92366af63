//! Execution paths: the private witness of an attestation.
//!
//! A path is an ordered list of control transfers. The first step is always
//! the synthetic `start` step landing on the claimed initial node.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cfg::parse_node;
use crate::error::{AttestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Start,
    Jump,
    Call,
    Return,
}

/// One control transfer. `ret` is the return site pushed by a call and is
/// `None` for every other kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub dest: u64,
    pub ret: Option<u64>,
}

impl Step {
    pub fn start(dest: u64) -> Self {
        Self {
            kind: StepKind::Start,
            dest,
            ret: None,
        }
    }

    pub fn jump(dest: u64) -> Self {
        Self {
            kind: StepKind::Jump,
            dest,
            ret: None,
        }
    }

    pub fn call(dest: u64, ret: u64) -> Self {
        Self {
            kind: StepKind::Call,
            dest,
            ret: Some(ret),
        }
    }

    pub fn ret(dest: u64) -> Self {
        Self {
            kind: StepKind::Return,
            dest,
            ret: None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.ret) {
            (StepKind::Start, _) => write!(f, "start {}", self.dest),
            (StepKind::Jump, _) => write!(f, "jump {}", self.dest),
            (StepKind::Call, Some(ret)) => write!(f, "call {} {}", self.dest, ret),
            (StepKind::Call, None) => write!(f, "call {}", self.dest),
            (StepKind::Return, _) => write!(f, "ret {}", self.dest),
        }
    }
}

/// Execution path together with the claimed initial and final nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPath {
    pub start: u64,
    pub end: u64,
    pub steps: Vec<Step>,
}

impl ExecutionPath {
    /// Path that begins with a `start` step on `start` and continues with
    /// `rest`.
    pub fn new(start: u64, end: u64, rest: impl IntoIterator<Item = Step>) -> Self {
        let mut steps = vec![Step::start(start)];
        steps.extend(rest);
        Self { start, end, steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Destinations in visiting order.
    pub fn nodes(&self) -> impl Iterator<Item = u64> + '_ {
        self.steps.iter().map(|step| step.dest)
    }

    /// Checks the structural shape of the path, not its validity in a graph.
    pub fn validate(&self) -> Result<()> {
        let first = self.steps.first().ok_or(AttestError::EmptyPath)?;
        if first.kind != StepKind::Start {
            return Err(AttestError::MalformedPath {
                step: 0,
                reason: "first step must be a start step",
            });
        }
        if first.dest != self.start {
            return Err(AttestError::MalformedPath {
                step: 0,
                reason: "start step does not land on the claimed initial node",
            });
        }
        if let Some(index) = self.steps[1..]
            .iter()
            .position(|step| step.kind == StepKind::Start)
        {
            return Err(AttestError::MalformedPath {
                step: index + 1,
                reason: "start step after the first step",
            });
        }
        if let Some(index) = self
            .steps
            .iter()
            .position(|step| (step.kind == StepKind::Call) != step.ret.is_some())
        {
            return Err(AttestError::MalformedPath {
                step: index,
                reason: "return site given for a non-call step or missing for a call",
            });
        }
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        std::fs::read_to_string(path)?.parse()
    }
}

impl FromStr for ExecutionPath {
    type Err = AttestError;

    /// Parses the textual path format:
    ///
    /// ```text
    /// initial_node=0 final_node=5
    /// call 2 5
    /// jump 4
    /// ret 5
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let mut header: Option<(u64, u64)> = None;
        let mut steps = Vec::new();

        for (lineno, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let lineno = lineno + 1;

            if header.is_none() {
                header = Some(parse_header(line, lineno)?);
                continue;
            }

            let mut tokens = line.split_whitespace();
            let op = tokens.next().unwrap_or_default();
            let args = tokens
                .map(|tok| parse_node(tok, lineno))
                .collect::<Result<Vec<_>>>()?;

            let step = match (op, args.as_slice()) {
                ("jump" | "jmp", &[dest]) => Step::jump(dest),
                ("call", &[dest, ret]) => Step::call(dest, ret),
                ("ret", &[dest]) => Step::ret(dest),
                ("jump" | "jmp" | "ret", _) => {
                    return Err(AttestError::Parse {
                        line: lineno,
                        message: format!("'{op}' expects 1 node"),
                    });
                }
                ("call", _) => {
                    return Err(AttestError::Parse {
                        line: lineno,
                        message: "'call' expects a target and a return node".into(),
                    });
                }
                _ => {
                    return Err(AttestError::Parse {
                        line: lineno,
                        message: format!("unknown opcode '{op}'"),
                    });
                }
            };
            steps.push(step);
        }

        let (start, end) = header.ok_or(AttestError::Parse {
            line: 1,
            message: "missing 'initial_node=<n> final_node=<m>' header".into(),
        })?;
        Ok(Self::new(start, end, steps))
    }
}

fn parse_header(line: &str, lineno: usize) -> Result<(u64, u64)> {
    let mut start = None;
    let mut end = None;
    for token in line.split_whitespace() {
        if let Some(value) = token.strip_prefix("initial_node=") {
            start = Some(parse_node(value, lineno)?);
        } else if let Some(value) = token.strip_prefix("final_node=") {
            end = Some(parse_node(value, lineno)?);
        }
    }
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(AttestError::Parse {
            line: lineno,
            message: "expected 'initial_node=<n> final_node=<m>'".into(),
        }),
    }
}
