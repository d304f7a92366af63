//! Execution trace construction.
//!
//! Records a walk through the CFG as a matrix where columns are registers and
//! rows are execution steps. Row 0 is a synthetic prelude row; the real steps
//! occupy rows `1..=len`.

use ark_ff::PrimeField;
use tracing::instrument;

use crate::cfg::Cfg;
use crate::error::{AttestError, Result};
use crate::program::{ExecutionPath, Step};
use crate::vm::digest::{edge_digest, packing_base};
use crate::vm::layout::{Encoding, RegisterLayout, node_of};
use crate::vm::stack::{ReturnPolicy, simulate};

/// Execution trace: fixed-width rows of field elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTrace<F: PrimeField> {
    rows: Vec<Vec<F>>,
    width: usize,
}

impl<F: PrimeField> ExecutionTrace<F> {
    /// Wraps pre-built rows, checking that every row has the same width.
    ///
    /// # Errors
    ///
    /// [`AttestError::TraceShape`] naming the first row whose width differs
    /// from row 0.
    pub fn from_rows(rows: Vec<Vec<F>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != width)
        {
            return Err(AttestError::TraceShape {
                row,
                expected: width,
                found,
            });
        }
        Ok(Self { rows, width })
    }

    /// Number of rows, prelude included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, index: usize) -> &[F] {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[Vec<F>] {
        &self.rows
    }

    /// All values of one register, top to bottom.
    pub fn column(&self, register: usize) -> Vec<F> {
        self.rows.iter().map(|row| row[register]).collect()
    }

    pub fn register(&self, row: usize, register: usize) -> F {
        self.rows[row][register]
    }

    /// Overwrites one cell. Used to build tampered traces.
    pub fn set(&mut self, row: usize, register: usize, value: F) {
        self.rows[row][register] = value;
    }

    /// Renders the trace as a table with one header per register.
    ///
    /// Cells that hold a small integer are printed as such, anything else
    /// (the nonce, typically) in the field's own formatting.
    pub fn render(&self, layout: &RegisterLayout) -> String {
        let mut out = layout.names().join(" | ");
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|value| match node_of(*value) {
                    Some(small) => small.to_string(),
                    None => value.to_string(),
                })
                .collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        out
    }
}

/// Builds execution traces for one CFG.
#[derive(Debug, Clone, Copy)]
pub struct TraceBuilder<'a> {
    cfg: &'a Cfg,
    policy: ReturnPolicy,
    encoding: Encoding,
}

impl<'a> TraceBuilder<'a> {
    pub fn new(cfg: &'a Cfg) -> Self {
        Self {
            cfg,
            policy: ReturnPolicy::default(),
            encoding: Encoding::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReturnPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Register layout of the traces this builder produces.
    pub fn layout(&self) -> RegisterLayout {
        match self.encoding {
            Encoding::NeighborList => RegisterLayout::neighbor_list(self.cfg.max_adjacency()),
            Encoding::EdgeDigest => RegisterLayout::edge_digest(),
        }
    }

    /// Builds the trace of `path`, stamping `nonce` on every real row.
    ///
    /// # Errors
    ///
    /// * [`AttestError::EmptyPath`] if the path has no steps
    /// * [`AttestError::MalformedPath`] if the path does not open with a
    ///   `start` step on its claimed initial node
    /// * [`AttestError::UnknownNode`] for a destination outside the CFG
    /// * [`AttestError::StackMismatch`] for a bad return under
    ///   [`ReturnPolicy::Strict`]
    /// * [`AttestError::InvalidConfig`] for an edge-digest trace over a graph
    ///   that declares node `u64::MAX`
    #[instrument(skip_all, fields(steps = path.len(), encoding = ?self.encoding))]
    pub fn build<F: PrimeField>(&self, nonce: F, path: &ExecutionPath) -> Result<ExecutionTrace<F>> {
        path.validate()?;
        if let Some((step, node)) = path
            .nodes()
            .enumerate()
            .find(|&(_, node)| !self.cfg.contains(node))
        {
            return Err(AttestError::UnknownNode {
                node,
                step: Some(step),
            });
        }

        let layout = self.layout();
        let stack = simulate(&path.steps, self.policy)?;
        let base = match layout.encoding() {
            Encoding::NeighborList => None,
            Encoding::EdgeDigest => Some(packing_base(self.cfg)?),
        };
        let last = path.len() - 1;

        let mut prelude = vec![F::zero(); layout.width()];
        prelude[layout.initial()] = F::one();

        let mut rows = Vec::with_capacity(path.len() + 1);
        rows.push(prelude);

        for (index, (step, output)) in path.steps.iter().zip(&stack).enumerate() {
            let next = path.steps.get(index + 1).map_or(0, |s: &Step| s.dest);
            let mut row = vec![F::zero(); layout.width()];

            row[RegisterLayout::NONCE] = nonce;
            row[RegisterLayout::CURRENT] = F::from(step.dest);
            row[RegisterLayout::NEXT] = F::from(next);
            match layout.encoding() {
                Encoding::NeighborList => {
                    let neighbors = self.cfg.neighbors(step.dest)?;
                    for (slot, neighbor) in layout.neighbors().zip(neighbors) {
                        row[slot] = F::from(neighbor);
                    }
                }
                Encoding::EdgeDigest => {
                    if let (Some(slot), Some(base)) = (layout.digest(), base) {
                        row[slot] = edge_digest(step.dest, next, base);
                    }
                }
            }
            row[layout.call_stack_top()] = F::from(output.top);
            row[layout.call()] = F::from(output.call);
            row[layout.ret()] = F::from(output.ret);
            row[layout.terminal()] = F::from(index == last);

            rows.push(row);
        }

        tracing::debug!(rows = rows.len(), width = layout.width(), "built execution trace");
        Ok(ExecutionTrace {
            rows,
            width: layout.width(),
        })
    }
}

/// Builds a neighbor-list trace of `steps` under the default return policy.
///
/// `steps` must open with the `start` step on `start`; `end` is carried for
/// the boundary constraints and not checked here.
pub fn build_trace<F: PrimeField>(
    nonce: F,
    start: u64,
    end: u64,
    steps: &[Step],
    cfg: &Cfg,
) -> Result<ExecutionTrace<F>> {
    let path = ExecutionPath {
        start,
        end,
        steps: steps.to_vec(),
    };
    TraceBuilder::new(cfg).build(nonce, &path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::Fr;

    fn diamond() -> Cfg {
        Cfg::from_adjacency([
            (0, vec![1, 2]),
            (1, vec![3]),
            (2, vec![4]),
            (3, vec![5]),
            (4, vec![]),
            (5, vec![]),
        ])
        .unwrap()
    }

    fn fr(v: u64) -> Fr {
        Fr::from(v)
    }

    #[test]
    fn prelude_and_rows_follow_the_walk() {
        let cfg = diamond();
        let path = ExecutionPath::new(0, 5, [Step::jump(1), Step::jump(3), Step::jump(5)]);
        let nonce = fr(77);
        let trace = TraceBuilder::new(&cfg).build(nonce, &path).unwrap();
        let layout = RegisterLayout::neighbor_list(2);

        assert_eq!(trace.len(), 5);
        assert_eq!(trace.width(), layout.width());

        let prelude = trace.row(0);
        for (register, value) in prelude.iter().enumerate() {
            let expected = if register == layout.initial() { fr(1) } else { fr(0) };
            assert_eq!(*value, expected, "prelude register {register}");
        }

        assert_eq!(trace.column(RegisterLayout::CURRENT)[1..], [fr(0), fr(1), fr(3), fr(5)]);
        assert_eq!(trace.column(RegisterLayout::NEXT)[1..], [fr(1), fr(3), fr(5), fr(0)]);
        assert_eq!(trace.row(1)[3..5], [fr(1), fr(2)]);
        assert_eq!(trace.row(2)[3..5], [fr(3), fr(0)]);
        assert!(trace.column(RegisterLayout::NONCE)[1..].iter().all(|n| *n == nonce));
    }

    #[test]
    fn terminal_flag_marks_only_the_last_row() {
        let cfg = diamond();
        let path = ExecutionPath::new(0, 4, [Step::jump(2), Step::jump(4)]);
        let trace: ExecutionTrace<Fr> = TraceBuilder::new(&cfg).build(fr(1), &path).unwrap();
        let terminal = trace.column(RegisterLayout::neighbor_list(2).terminal());
        assert_eq!(terminal, vec![fr(0), fr(0), fr(0), fr(1)]);
        let initial = trace.column(RegisterLayout::neighbor_list(2).initial());
        assert_eq!(initial, vec![fr(1), fr(0), fr(0), fr(0)]);
    }

    #[test]
    fn unknown_destination_reports_step_index() {
        let cfg = diamond();
        let path = ExecutionPath::new(0, 9, [Step::jump(1), Step::jump(9)]);
        let err = TraceBuilder::new(&cfg).build(fr(1), &path).unwrap_err();
        assert!(matches!(
            err,
            AttestError::UnknownNode {
                node: 9,
                step: Some(2)
            }
        ));
    }

    #[test]
    fn empty_and_headless_paths_are_rejected() {
        let cfg = diamond();
        let err = build_trace::<Fr>(fr(1), 0, 0, &[], &cfg).unwrap_err();
        assert!(matches!(err, AttestError::EmptyPath));

        let err = build_trace::<Fr>(fr(1), 0, 1, &[Step::jump(1)], &cfg).unwrap_err();
        assert!(matches!(err, AttestError::MalformedPath { step: 0, .. }));
    }

    #[test]
    fn digest_rows_pack_current_and_next() {
        let cfg = diamond();
        let path = ExecutionPath::new(0, 4, [Step::jump(2), Step::jump(4)]);
        let trace: ExecutionTrace<Fr> = TraceBuilder::new(&cfg)
            .with_encoding(Encoding::EdgeDigest)
            .build(fr(3), &path)
            .unwrap();
        assert_eq!(trace.width(), 9);
        // base = max node + 1 = 6
        assert_eq!(trace.column(3)[1..], [fr(2), fr(2 * 6 + 4), fr(4 * 6)]);
    }

    #[test]
    fn largest_node_id_needs_no_base_for_neighbor_lists() {
        let cfg = Cfg::from_adjacency([(0, vec![u64::MAX]), (u64::MAX, vec![])]).unwrap();
        let path = ExecutionPath::new(0, u64::MAX, [Step::jump(u64::MAX)]);

        let trace: ExecutionTrace<Fr> = TraceBuilder::new(&cfg).build(fr(5), &path).unwrap();
        assert_eq!(trace.register(1, RegisterLayout::NEXT), fr(u64::MAX));
        assert_eq!(trace.register(2, RegisterLayout::CURRENT), fr(u64::MAX));

        let err = TraceBuilder::new(&cfg)
            .with_encoding(Encoding::EdgeDigest)
            .build::<Fr>(fr(5), &path)
            .unwrap_err();
        assert!(matches!(err, AttestError::InvalidConfig(_)));
    }

    #[test]
    fn from_rows_checks_width() {
        let err = ExecutionTrace::from_rows(vec![vec![fr(1), fr(2)], vec![fr(3)]]).unwrap_err();
        assert!(matches!(
            err,
            AttestError::TraceShape {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn render_prints_header_and_rows() {
        let cfg = diamond();
        let path = ExecutionPath::new(0, 1, [Step::jump(1)]);
        let trace: ExecutionTrace<Fr> = TraceBuilder::new(&cfg).build(fr(9), &path).unwrap();
        let table = trace.render(&RegisterLayout::neighbor_list(2));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 1 + trace.len());
        assert!(lines[0].starts_with("nonce | current | next | nbr0 | nbr1"));
        assert_eq!(lines[2], "9 | 0 | 1 | 1 | 2 | 0 | 0 | 0 | 0 | 0");
    }
}
