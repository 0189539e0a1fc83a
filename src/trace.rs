use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, RecordBatch, UInt64Builder};
use arrow::datatypes::{DataType, Field, Schema};
use itertools::Itertools;

use crate::diagnostics::{effective_sample_size, split_rhat, ParameterSummary};

/// State of the chain after one retained iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    /// Iteration index counted from the start of burn-in.
    pub iteration: u64,
    pub params: Box<[f64]>,
    pub log_posterior: f64,
    pub log_likelihood: f64,
    /// Whether the update of each parameter was accepted in this iteration.
    pub accepted: Box<[bool]>,
}

/// Retained draws of one chain, in iteration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    names: &'static [&'static str],
    records: Vec<TraceRecord>,
}

impl Trace {
    pub(crate) fn with_capacity(names: &'static [&'static str], capacity: usize) -> Self {
        Trace {
            names,
            records: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, record: TraceRecord) {
        debug_assert_eq!(record.params.len(), self.names.len());
        self.records.push(record);
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All retained values of the parameter at `index`.
    pub fn column_at(&self, index: usize) -> Vec<f64> {
        self.records.iter().map(|r| r.params[index]).collect()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.names.iter().position(|&n| n == name)?;
        Some(self.column_at(index))
    }

    /// Posterior mean of every parameter, in parameter order. NaN when the
    /// trace is empty.
    pub fn posterior_mean_params(&self) -> Box<[f64]> {
        let n = self.records.len() as f64;
        (0..self.names.len())
            .map(|idx| self.records.iter().map(|r| r.params[idx]).sum::<f64>() / n)
            .collect()
    }

    pub fn summary(&self) -> Vec<ParameterSummary> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, &name)| ParameterSummary::from_draws(name, &self.column_at(idx)))
            .collect()
    }

    /// Fraction of accepted updates over all records and parameters.
    pub fn acceptance_rate(&self) -> f64 {
        let (accepted, total) = self
            .records
            .iter()
            .flat_map(|r| r.accepted.iter())
            .fold((0u64, 0u64), |(a, t), &flag| (a + u64::from(flag), t + 1));
        if total == 0 {
            return 0.;
        }
        accepted as f64 / total as f64
    }

    /// Columnar copy of the trace: `iteration`, one column per parameter,
    /// `log_posterior`, `log_likelihood` and one `accepted_<name>` column per
    /// parameter.
    pub fn to_arrow(&self) -> Result<RecordBatch> {
        let capacity = self.records.len();
        let mut iteration = UInt64Builder::with_capacity(capacity);
        let mut params = (0..self.names.len())
            .map(|_| Float64Builder::with_capacity(capacity))
            .collect_vec();
        let mut log_posterior = Float64Builder::with_capacity(capacity);
        let mut log_likelihood = Float64Builder::with_capacity(capacity);
        let mut accepted = (0..self.names.len())
            .map(|_| BooleanBuilder::with_capacity(capacity))
            .collect_vec();

        for record in &self.records {
            iteration.append_value(record.iteration);
            for (builder, &value) in params.iter_mut().zip(record.params.iter()) {
                builder.append_value(value);
            }
            log_posterior.append_value(record.log_posterior);
            log_likelihood.append_value(record.log_likelihood);
            for (builder, &flag) in accepted.iter_mut().zip(record.accepted.iter()) {
                builder.append_value(flag);
            }
        }

        let mut fields = vec![Field::new("iteration", DataType::UInt64, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(iteration.finish())];
        for (&name, mut builder) in self.names.iter().zip(params) {
            fields.push(Field::new(name, DataType::Float64, false));
            arrays.push(Arc::new(builder.finish()));
        }
        fields.push(Field::new("log_posterior", DataType::Float64, false));
        arrays.push(Arc::new(log_posterior.finish()));
        fields.push(Field::new("log_likelihood", DataType::Float64, false));
        arrays.push(Arc::new(log_likelihood.finish()));
        for (&name, mut builder) in self.names.iter().zip(accepted) {
            fields.push(Field::new(format!("accepted_{}", name), DataType::Boolean, false));
            arrays.push(Arc::new(builder.finish()));
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .context("Could not convert trace to RecordBatch")
    }
}

/// What happened during a run, beyond the retained draws.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDiagnostics {
    /// Acceptance rate over the retained phase, all parameters pooled.
    pub acceptance_rate: f64,
    pub per_param_acceptance: Box<[f64]>,
    /// Proposal scales after adaptation.
    pub final_scales: Box<[f64]>,
    /// Proposals rejected because they left the prior bounds.
    pub prior_rejections: u64,
    /// Proposals outside the natural support of the model.
    pub domain_violations: u64,
    /// Proposals whose likelihood was not finite.
    pub numeric_failures: u64,
    /// Iterations run, burn-in included.
    pub iterations: u64,
    pub stopped_early: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutput {
    pub chain_id: u64,
    pub trace: Trace,
    pub diagnostics: SamplerDiagnostics,
}

/// Output of several independent chains on the same posterior.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiChainTrace {
    chains: Vec<ChainOutput>,
}

impl MultiChainTrace {
    pub(crate) fn new(chains: Vec<ChainOutput>) -> Self {
        MultiChainTrace { chains }
    }

    pub fn chains(&self) -> &[ChainOutput] {
        &self.chains
    }

    pub fn into_chains(self) -> Vec<ChainOutput> {
        self.chains
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        self.chains
            .first()
            .map(|chain| chain.trace.param_names())
            .unwrap_or_default()
    }

    /// Split-R̂ of every parameter, `None` when there are too few chains or draws.
    pub fn rhat(&self) -> Vec<Option<f64>> {
        (0..self.param_names().len())
            .map(|idx| {
                let columns = self
                    .chains
                    .iter()
                    .map(|chain| chain.trace.column_at(idx))
                    .collect_vec();
                let slices = columns.iter().map(Vec::as_slice).collect_vec();
                split_rhat(&slices)
            })
            .collect()
    }

    pub fn max_rhat(&self) -> Option<f64> {
        self.rhat().into_iter().flatten().max_by(f64::total_cmp)
    }

    /// Summary of the pooled draws. The effective sample size is the sum
    /// over chains.
    pub fn summary(&self) -> Vec<ParameterSummary> {
        self.param_names()
            .iter()
            .enumerate()
            .map(|(idx, &name)| {
                let pooled = self
                    .chains
                    .iter()
                    .flat_map(|chain| chain.trace.column_at(idx))
                    .collect_vec();
                let ess: f64 = self
                    .chains
                    .iter()
                    .map(|chain| effective_sample_size(&chain.trace.column_at(idx)))
                    .sum();
                ParameterSummary {
                    ess,
                    ..ParameterSummary::from_draws(name, &pooled)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, BooleanArray, Float64Array, UInt64Array};
    use pretty_assertions::assert_eq;

    const NAMES: &[&str] = &["xi1", "shape"];

    fn record(iteration: u64, xi1: f64, shape: f64, accepted: [bool; 2]) -> TraceRecord {
        TraceRecord {
            iteration,
            params: vec![xi1, shape].into(),
            log_posterior: -(iteration as f64),
            log_likelihood: -(iteration as f64),
            accepted: accepted.into(),
        }
    }

    fn trace() -> Trace {
        let mut trace = Trace::with_capacity(NAMES, 3);
        trace.push(record(10, 1., 4., [true, false]));
        trace.push(record(11, 2., 4., [true, false]));
        trace.push(record(12, 3., 7., [false, true]));
        trace
    }

    #[test]
    fn columns_and_means() {
        let trace = trace();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.column("xi1"), Some(vec![1., 2., 3.]));
        assert_eq!(trace.column("scale"), None);
        assert_eq!(&*trace.posterior_mean_params(), &[2., 5.]);
        assert_eq!(trace.acceptance_rate(), 0.5);
        let summary = trace.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[1].name, "shape");
        assert_eq!(summary[1].q50, 4.);
    }

    #[test]
    fn empty_trace() {
        let trace = Trace::with_capacity(NAMES, 0);
        assert!(trace.is_empty());
        assert!(trace.posterior_mean_params().iter().all(|x| x.is_nan()));
        assert_eq!(trace.acceptance_rate(), 0.);
        assert_eq!(trace.to_arrow().unwrap().num_rows(), 0);
    }

    #[test]
    fn arrow_export_has_one_row_per_record() {
        let batch = trace().to_arrow().unwrap();
        assert_eq!(batch.num_rows(), 3);
        let names = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect_vec();
        assert_eq!(
            names,
            vec![
                "iteration",
                "xi1",
                "shape",
                "log_posterior",
                "log_likelihood",
                "accepted_xi1",
                "accepted_shape"
            ]
        );
        let iteration = batch
            .column(0)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(iteration.values().iter().copied().collect_vec(), vec![10, 11, 12]);
        let shape = batch
            .column(2)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(shape.values().iter().copied().collect_vec(), vec![4., 4., 7.]);
        let accepted = batch
            .column(6)
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert_eq!(accepted.len(), 3);
        assert!(accepted.value(2));
        assert!(!accepted.value(0));
    }

    #[test]
    fn multi_chain_pooling() {
        let diagnostics = SamplerDiagnostics {
            acceptance_rate: 0.5,
            per_param_acceptance: vec![0.5, 0.5].into(),
            final_scales: vec![1., 1.].into(),
            prior_rejections: 0,
            domain_violations: 0,
            numeric_failures: 0,
            iterations: 13,
            stopped_early: false,
        };
        let chains = (0..2)
            .map(|chain_id| ChainOutput {
                chain_id,
                trace: trace(),
                diagnostics: diagnostics.clone(),
            })
            .collect_vec();
        let multi = MultiChainTrace::new(chains);
        assert_eq!(multi.param_names(), NAMES);
        // three draws per chain are too few for split-R̂
        assert_eq!(multi.rhat(), vec![None, None]);
        assert_eq!(multi.max_rhat(), None);
        let summary = multi.summary();
        assert_eq!(summary[0].mean, 2.);
        assert_eq!(summary[0].ess, 6.);
    }
}
