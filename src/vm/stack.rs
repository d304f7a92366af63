//! Shadow call-stack simulator.
//!
//! The simulator is a pure transition function over [`ShadowStack`] values:
//! each step consumes the previous state and yields the next state together
//! with the registers the trace records for that step.

use serde::{Deserialize, Serialize};

use crate::error::{AttestError, Result};
use crate::program::{Step, StepKind};

/// How the simulator treats a return that does not match the stack top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnPolicy {
    /// Mismatched or unmatched returns leave the stack as is and are caught
    /// by the stack-consistency constraint.
    #[default]
    Lenient,
    /// Mismatched or unmatched returns abort trace building.
    Strict,
}

/// Registers produced by the simulator for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackOutput {
    /// Top of the stack after the step, 0 when empty.
    pub top: u64,
    pub call: bool,
    pub ret: bool,
}

/// Pending return sites, innermost last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowStack {
    frames: Vec<u64>,
}

impl ShadowStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn top(&self) -> Option<u64> {
        self.frames.last().copied()
    }

    /// Applies one step. `index` is the step position, used for error context.
    pub fn step(mut self, index: usize, step: &Step, policy: ReturnPolicy) -> Result<(Self, StackOutput)> {
        let mut output = StackOutput::default();

        match step.kind {
            StepKind::Call => {
                let ret = step.ret.ok_or(AttestError::MalformedPath {
                    step: index,
                    reason: "call step without a return site",
                })?;
                self.frames.push(ret);
                output.call = true;
            }
            StepKind::Return => {
                output.ret = true;
                match self.top() {
                    Some(top) if top == step.dest => {
                        self.frames.pop();
                    }
                    expected => {
                        if policy == ReturnPolicy::Strict {
                            return Err(AttestError::StackMismatch {
                                step: index,
                                node: step.dest,
                                expected,
                            });
                        }
                        tracing::debug!(
                            step = index,
                            node = step.dest,
                            ?expected,
                            "return does not match shadow stack"
                        );
                    }
                }
            }
            StepKind::Start | StepKind::Jump => {}
        }

        output.top = self.top().unwrap_or(0);
        Ok((self, output))
    }
}

/// Replays `steps` from an empty stack and returns one output per step.
pub fn simulate(steps: &[Step], policy: ReturnPolicy) -> Result<Vec<StackOutput>> {
    steps
        .iter()
        .enumerate()
        .try_fold(
            (ShadowStack::new(), Vec::with_capacity(steps.len())),
            |(stack, mut outputs), (index, step)| {
                let (stack, output) = stack.step(index, step, policy)?;
                outputs.push(output);
                Ok((stack, outputs))
            },
        )
        .map(|(_, outputs)| outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(top: u64, call: bool, ret: bool) -> StackOutput {
        StackOutput { top, call, ret }
    }

    #[test]
    fn call_pushes_and_matching_return_pops() {
        let steps = [Step::start(0), Step::call(2, 5), Step::jump(4), Step::ret(5)];
        let outputs = simulate(&steps, ReturnPolicy::Lenient).unwrap();
        assert_eq!(
            outputs,
            vec![
                out(0, false, false),
                out(5, true, false),
                out(5, false, false),
                out(0, false, true),
            ]
        );
    }

    #[test]
    fn nested_calls_unwind_in_order() {
        let steps = [
            Step::start(0),
            Step::call(1, 9),
            Step::call(2, 8),
            Step::ret(8),
            Step::ret(9),
        ];
        let outputs = simulate(&steps, ReturnPolicy::Strict).unwrap();
        let tops: Vec<u64> = outputs.iter().map(|o| o.top).collect();
        assert_eq!(tops, vec![0, 9, 8, 9, 0]);
    }

    #[test]
    fn mismatched_return_keeps_stack_when_lenient() {
        let steps = [Step::start(0), Step::call(2, 6), Step::ret(5)];
        let outputs = simulate(&steps, ReturnPolicy::Lenient).unwrap();
        assert_eq!(outputs[2], out(6, false, true));
    }

    #[test]
    fn unmatched_return_sets_flag_without_popping() {
        let steps = [Step::start(0), Step::ret(3)];
        let outputs = simulate(&steps, ReturnPolicy::Lenient).unwrap();
        assert_eq!(outputs[1], out(0, false, true));
    }

    #[test]
    fn strict_policy_rejects_bad_returns() {
        let mismatched = [Step::start(0), Step::call(2, 6), Step::ret(5)];
        let err = simulate(&mismatched, ReturnPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            AttestError::StackMismatch {
                step: 2,
                node: 5,
                expected: Some(6)
            }
        ));

        let unmatched = [Step::start(0), Step::ret(3)];
        let err = simulate(&unmatched, ReturnPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            AttestError::StackMismatch { expected: None, .. }
        ));
    }

    #[test]
    fn transitions_are_pure() {
        let stack = ShadowStack::new();
        let (after, _) = stack
            .clone()
            .step(0, &Step::call(1, 4), ReturnPolicy::Lenient)
            .unwrap();
        assert_eq!(stack.depth(), 0);
        assert_eq!(after.top(), Some(4));
    }
}
