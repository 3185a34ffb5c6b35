//! Verification suite: run the reference operator over a matrix of key
//! shapes, payload shapes and id widths on an in-process cluster, and check
//! every distributed result against the single-rank oracle.
//!
//! Configuration and communication errors abort the suite. A verification
//! failure only fails its case; the suite moves on to the next one.

use crate::algs::collective::broadcast_values;
use crate::algs::communicator::{RayonComm, run_world};
use crate::algs::context::ExecContext;
use crate::algs::gather::gather_records;
use crate::algs::oracle::{canonicalize, compare_canonical, reconstruct_reference, unrenumber_records};
use crate::algs::transform::{EdgeOperator, LessThanOperator, extract_transform_edges};
use crate::data::property::{PropertyGenerator, PropertyValue};
use crate::data::property_table::VertexPropertyTable;
use crate::data::record::{Payload, PayloadKind, RecordShape};
use crate::graph_error::{GraphError, VerificationError};
use crate::topology::graph::{PartitionedGraph, RawEdgeList, partition_edges};
use crate::topology::key::{Key, KeyKind};
use crate::topology::renumber::HashRenumberer;
use crate::topology::vertex::{EdgeIndex, VertexId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdWidth {
    U32,
    U64,
}

impl fmt::Display for IdWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdWidth::U32 => "u32",
            IdWidth::U64 => "u64",
        })
    }
}

/// Type of the generated vertex property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    #[default]
    I32,
    I64,
    F32,
    F64,
    /// `(i32, f32)`, ordered lexicographically.
    I32F32,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PropertyKind::I32 => "i32",
            PropertyKind::I64 => "i64",
            PropertyKind::F32 => "f32",
            PropertyKind::F64 => "f64",
            PropertyKind::I32F32 => "(i32,f32)",
        })
    }
}

/// One (key shape, payload shape, id widths, property type) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseConfig {
    pub key: KeyKind,
    pub payload: PayloadKind,
    pub vertex_width: IdWidth,
    pub edge_width: IdWidth,
    #[serde(default)]
    pub property: PropertyKind,
}

impl CaseConfig {
    pub fn shape(&self) -> RecordShape {
        RecordShape::new(self.key, self.payload)
    }

    pub fn label(&self) -> String {
        format!(
            "{}/{}v/{}e/{}",
            self.shape(),
            self.vertex_width,
            self.edge_width,
            self.property
        )
    }

    /// Every key and payload shape for the width pairs `(u32, u32)`,
    /// `(u32, u64)` and `(u64, u64)`.
    pub fn standard_matrix() -> Vec<Self> {
        let keys = [KeyKind::Plain, KeyKind::Tagged { tags: 2 }];
        let payloads = [PayloadKind::Empty, PayloadKind::Scalar, PayloadKind::Pair];
        let widths = [
            (IdWidth::U32, IdWidth::U32),
            (IdWidth::U32, IdWidth::U64),
            (IdWidth::U64, IdWidth::U64),
        ];
        let mut cases = Vec::with_capacity(keys.len() * payloads.len() * widths.len());
        for (vertex_width, edge_width) in widths {
            for key in keys {
                for payload in payloads {
                    cases.push(CaseConfig {
                        key,
                        payload,
                        vertex_width,
                        edge_width,
                        property: PropertyKind::I32,
                    });
                }
            }
        }
        cases
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub n_ranks: usize,
    /// Properties are `hash(original id) % bucket_count`.
    pub bucket_count: u64,
    /// Gather and compare against the oracle; otherwise only run the operator.
    pub check_correctness: bool,
    /// Rank receiving gathered results and running the oracle.
    pub root: usize,
    pub recv_timeout_ms: u64,
    pub cases: Vec<CaseConfig>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            n_ranks: 4,
            bucket_count: 5,
            check_correctness: true,
            root: 0,
            recv_timeout_ms: 60_000,
            cases: CaseConfig::standard_matrix(),
        }
    }
}

impl SuiteConfig {
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.n_ranks == 0 {
            return Err(GraphError::ZeroRanks);
        }
        if self.root >= self.n_ranks {
            return Err(GraphError::RankOutOfRange {
                rank: self.root,
                n_ranks: self.n_ranks,
            });
        }
        PropertyGenerator::new(self.bucket_count)?;
        if self.recv_timeout_ms == 0 {
            return Err(GraphError::InvalidShape("receive timeout must be non-zero".into()));
        }
        self.cases.iter().try_for_each(|c| c.shape().validate())
    }

    fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    /// Distributed and reference results are identical multisets.
    Passed { records: usize },
    Failed(VerificationError),
    /// Correctness checking was disabled.
    Unchecked { records: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    pub case: String,
    pub config: CaseConfig,
    /// Records produced by each rank before gathering.
    pub local_records: Vec<usize>,
    /// Verdict as seen by each rank; `None` when unchecked.
    pub rank_verdicts: Vec<Option<Result<(), VerificationError>>>,
    pub outcome: CaseOutcome,
}

impl CaseReport {
    pub fn total_records(&self) -> usize {
        self.local_records.iter().sum()
    }

    pub fn passed(&self) -> bool {
        !matches!(self.outcome, CaseOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &VerificationError> + '_ {
        self.cases.iter().filter_map(|c| match &c.outcome {
            CaseOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }
}

/// An operator the suite can run at every vertex width and property type.
pub trait CaseOperator: Sync {
    fn apply<V: VertexId, P: PropertyValue>(
        &self,
        key: Key<V>,
        dst: V,
        src_prop: &P,
        dst_prop: &P,
    ) -> Option<Payload>;
}

impl CaseOperator for LessThanOperator {
    #[inline]
    fn apply<V: VertexId, P: PropertyValue>(
        &self,
        key: Key<V>,
        dst: V,
        src_prop: &P,
        dst_prop: &P,
    ) -> Option<Payload> {
        EdgeOperator::<V, P, ()>::apply(self, key, dst, src_prop, dst_prop, ())
    }
}

/// Pins a [`CaseOperator`] to one `(V, P)` instantiation.
struct Typed<'a, O>(&'a O);

impl<V: VertexId, P: PropertyValue, O: CaseOperator> EdgeOperator<V, P, ()> for Typed<'_, O> {
    #[inline]
    fn apply(&self, key: Key<V>, dst: V, src_prop: &P, dst_prop: &P, _edge: ()) -> Option<Payload> {
        CaseOperator::apply(self.0, key, dst, src_prop, dst_prop)
    }
}

/// Per-rank result of one case: local record count and, when checked, the
/// verdict as seen by that rank.
type RankResult = (usize, Option<Result<(), VerificationError>>);

const VERDICT_PASS: u8 = 0;
const VERDICT_FAIL: u8 = 1;

fn rank_case<V, E, P, O>(
    comm: &RayonComm,
    cfg: &SuiteConfig,
    case: &CaseConfig,
    graph: &PartitionedGraph<V, E>,
    op: &O,
) -> Result<RankResult, GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    O: CaseOperator,
{
    let ctx = ExecContext::new(comm)?;
    let rank = ctx.rank();
    let local = graph.local(rank).ok_or(GraphError::RankOutOfRange {
        rank,
        n_ranks: graph.n_parts(),
    })?;
    let renumber = graph.renumber();
    let generator = PropertyGenerator::new(cfg.bucket_count)?;
    let table = VertexPropertyTable::generate(local, renumber, |o| generator.value_of::<P>(o))?;

    let shape = case.shape();
    let op = Typed(op);
    let records = extract_transform_edges(&ctx, local, &table, shape, &op)?;
    if !cfg.check_correctness {
        return Ok((records.len(), None));
    }

    let gathered = gather_records(&ctx, cfg.root, shape, &records)?;
    let reference = reconstruct_reference(&ctx, cfg.root, local, &table, renumber)?;
    let label = case.label();
    let verdict = match (gathered, reference) {
        (Some(gathered), Some(reference)) => {
            let expected = canonicalize(reference.run(shape, &op)?);
            let actual = canonicalize(unrenumber_records(&gathered, renumber)?);
            Some(compare_canonical(&label, &expected, &actual))
        }
        _ => None,
    };

    let code = match &verdict {
        Some(Err(_)) => VERDICT_FAIL,
        _ => VERDICT_PASS,
    };
    let shared = broadcast_values(&ctx, cfg.root, &[code])?;
    let verdict = match (verdict, shared.first().copied()) {
        (Some(own), _) => own,
        (None, Some(VERDICT_PASS)) => Ok(()),
        (None, Some(_)) => Err(VerificationError::ReportedByRoot {
            case: label,
            root: cfg.root,
        }),
        (None, None) => return Err(GraphError::comm(cfg.root, "empty verdict broadcast")),
    };
    Ok((records.len(), Some(verdict)))
}

fn run_case_typed<V, E, P, O>(
    cfg: &SuiteConfig,
    case: &CaseConfig,
    raw: &RawEdgeList,
    op: &O,
) -> Result<CaseReport, GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    O: CaseOperator,
{
    let graph = partition_edges::<V, E, _>(raw, cfg.n_ranks, &HashRenumberer)?;
    let per_rank = run_world(cfg.n_ranks, cfg.recv_timeout(), |comm| {
        rank_case::<V, E, P, O>(comm, cfg, case, &graph, op)
    })?;

    let mut local_records = Vec::with_capacity(per_rank.len());
    let mut rank_verdicts = Vec::with_capacity(per_rank.len());
    for result in per_rank {
        let (count, verdict) = result?;
        local_records.push(count);
        rank_verdicts.push(verdict);
    }
    let records = local_records.iter().sum();
    let root_verdict = rank_verdicts.get(cfg.root).cloned().flatten();
    let outcome = match root_verdict {
        None => CaseOutcome::Unchecked { records },
        Some(Ok(())) => CaseOutcome::Passed { records },
        Some(Err(e)) => CaseOutcome::Failed(e),
    };
    Ok(CaseReport {
        case: case.label(),
        config: *case,
        local_records,
        rank_verdicts,
        outcome,
    })
}

fn run_case_widths<P: PropertyValue, O: CaseOperator>(
    cfg: &SuiteConfig,
    case: &CaseConfig,
    raw: &RawEdgeList,
    op: &O,
) -> Result<CaseReport, GraphError> {
    match (case.vertex_width, case.edge_width) {
        (IdWidth::U32, IdWidth::U32) => run_case_typed::<u32, u32, P, O>(cfg, case, raw, op),
        (IdWidth::U32, IdWidth::U64) => run_case_typed::<u32, u64, P, O>(cfg, case, raw, op),
        (IdWidth::U64, IdWidth::U32) => run_case_typed::<u64, u32, P, O>(cfg, case, raw, op),
        (IdWidth::U64, IdWidth::U64) => run_case_typed::<u64, u64, P, O>(cfg, case, raw, op),
    }
}

/// Run one case with `op` on a fresh in-process cluster of `cfg.n_ranks` ranks.
pub fn run_case_with<O: CaseOperator>(
    cfg: &SuiteConfig,
    case: &CaseConfig,
    raw: &RawEdgeList,
    op: &O,
) -> Result<CaseReport, GraphError> {
    match case.property {
        PropertyKind::I32 => run_case_widths::<i32, O>(cfg, case, raw, op),
        PropertyKind::I64 => run_case_widths::<i64, O>(cfg, case, raw, op),
        PropertyKind::F32 => run_case_widths::<f32, O>(cfg, case, raw, op),
        PropertyKind::F64 => run_case_widths::<f64, O>(cfg, case, raw, op),
        PropertyKind::I32F32 => run_case_widths::<(i32, f32), O>(cfg, case, raw, op),
    }
}

/// Run one case with the reference [`LessThanOperator`].
pub fn run_case(cfg: &SuiteConfig, case: &CaseConfig, raw: &RawEdgeList) -> Result<CaseReport, GraphError> {
    run_case_with(cfg, case, raw, &LessThanOperator::new(case.payload))
}

/// Run every configured case over `raw` with the reference [`LessThanOperator`].
pub fn run_suite(cfg: &SuiteConfig, raw: &RawEdgeList) -> Result<SuiteReport, GraphError> {
    run_suite_with(cfg, raw, |case| LessThanOperator::new(case.payload))
}

/// Run every configured case over `raw`, with the operator `make_op` builds
/// for that case.
///
/// The whole configuration is validated before any case starts. A case whose
/// output disagrees with the oracle is recorded as failed and the next case
/// still runs.
pub fn run_suite_with<O, F>(cfg: &SuiteConfig, raw: &RawEdgeList, make_op: F) -> Result<SuiteReport, GraphError>
where
    O: CaseOperator,
    F: Fn(&CaseConfig) -> O,
{
    cfg.validate()?;
    raw.validate()?;
    log::info!(
        "running {} cases on {} ranks ({} edges, bucket count {})",
        cfg.cases.len(),
        cfg.n_ranks,
        raw.len(),
        cfg.bucket_count
    );
    let mut report = SuiteReport::default();
    for case in &cfg.cases {
        let result = run_case_with(cfg, case, raw, &make_op(case))?;
        match &result.outcome {
            CaseOutcome::Failed(e) => log::warn!("{e}"),
            _ => log::info!("{}: {} records, ok", result.case, result.total_records()),
        }
        report.cases.push(result);
    }
    Ok(report)
}
