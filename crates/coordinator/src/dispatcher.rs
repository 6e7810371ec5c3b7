//! Executes a plan against the specialist registry.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use synapse_common::{
    Instruction, Plan, Specialist, SpecialistResult, WorkflowType, PANICKED, TIMEOUT, UNROUTABLE,
};
use synapse_specialists::SpecialistRegistry;
use tracing::{debug, error, info, warn};

/// Default per-instruction time budget.
pub const DEFAULT_INSTRUCTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs plans under their declared concurrency policy.
///
/// Failures never abort a plan: an unregistered specialist, a specialist
/// error, a timeout and a panic each become a failed [`SpecialistResult`]
/// for that instruction only.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    instruction_timeout: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTION_TIMEOUT)
    }
}

impl Dispatcher {
    pub fn new(instruction_timeout: Duration) -> Self {
        Self {
            instruction_timeout,
        }
    }

    pub fn instruction_timeout(&self) -> Duration {
        self.instruction_timeout
    }

    /// Dispatch with every directive sent exactly as planned.
    pub async fn dispatch(
        &self,
        plan: &Plan,
        registry: &SpecialistRegistry,
    ) -> Vec<SpecialistResult> {
        self.dispatch_with(plan, registry, |instruction, _| instruction.directive.clone())
            .await
    }

    /// Dispatch a plan, letting `resolver` rewrite each sequential directive
    /// from the results recorded so far.
    ///
    /// Results come back in completion order (parallel) or execution order
    /// (sequential); each carries its instruction index.
    pub async fn dispatch_with<R>(
        &self,
        plan: &Plan,
        registry: &SpecialistRegistry,
        resolver: R,
    ) -> Vec<SpecialistResult>
    where
        R: Fn(&Instruction, &[SpecialistResult]) -> String + Send + Sync,
    {
        info!(
            workflow_type = %plan.workflow_type().as_str(),
            instructions = plan.len(),
            "Dispatching plan"
        );

        let results = match plan.workflow_type() {
            WorkflowType::Parallel => self.run_parallel(plan, registry).await,
            WorkflowType::Sequential => self.run_sequential(plan, registry, resolver).await,
        };

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            completed = results.len(),
            failed = failed,
            "Dispatch finished"
        );
        results
    }

    /// Spawn every routable instruction, then join all of them.
    async fn run_parallel(
        &self,
        plan: &Plan,
        registry: &SpecialistRegistry,
    ) -> Vec<SpecialistResult> {
        let started = Instant::now();
        let mut results = Vec::with_capacity(plan.len());
        let mut pending = FuturesUnordered::new();

        for (index, instruction) in plan.instructions().iter().enumerate() {
            let Some(specialist) = registry.get(&instruction.target_specialist) else {
                results.push(unroutable(index, instruction));
                continue;
            };

            let directive = instruction.directive.clone();
            let handle = tokio::spawn(invoke(
                specialist,
                directive.clone(),
                self.instruction_timeout,
            ));
            let specialist_id = instruction.target_specialist.clone();
            pending.push(async move { (index, specialist_id, directive, handle.await) });
        }

        while let Some((index, specialist_id, directive, joined)) = pending.next().await {
            let result = match joined {
                Ok(invocation) => invocation.into_result(index, specialist_id, directive),
                Err(e) => {
                    error!(specialist = %specialist_id, index = index, error = %e, "Specialist task panicked");
                    SpecialistResult::failure(index, specialist_id, directive, PANICKED)
                        .with_duration_ms(started.elapsed().as_millis() as u64)
                }
            };
            results.push(result);
        }

        results
    }

    /// One instruction at a time in declared order; failures are recorded
    /// and execution continues.
    async fn run_sequential<R>(
        &self,
        plan: &Plan,
        registry: &SpecialistRegistry,
        resolver: R,
    ) -> Vec<SpecialistResult>
    where
        R: Fn(&Instruction, &[SpecialistResult]) -> String + Send + Sync,
    {
        let mut results: Vec<SpecialistResult> = Vec::with_capacity(plan.len());

        for (index, instruction) in plan.instructions().iter().enumerate() {
            let Some(specialist) = registry.get(&instruction.target_specialist) else {
                results.push(unroutable(index, instruction));
                continue;
            };

            let directive = resolver(instruction, &results);
            let started = Instant::now();
            let specialist_id = instruction.target_specialist.clone();

            let handle = tokio::spawn(invoke(
                specialist,
                directive.clone(),
                self.instruction_timeout,
            ));
            let result = match handle.await {
                Ok(invocation) => invocation.into_result(index, specialist_id, directive),
                Err(e) => {
                    error!(specialist = %specialist_id, index = index, error = %e, "Specialist task panicked");
                    SpecialistResult::failure(index, specialist_id, directive, PANICKED)
                        .with_duration_ms(started.elapsed().as_millis() as u64)
                }
            };
            results.push(result);
        }

        results
    }
}

fn unroutable(index: usize, instruction: &Instruction) -> SpecialistResult {
    warn!(
        specialist = %instruction.target_specialist,
        instruction = %instruction.id,
        "No specialist registered for instruction"
    );
    SpecialistResult::failure(
        index,
        instruction.target_specialist.clone(),
        instruction.directive.clone(),
        UNROUTABLE,
    )
}

/// Outcome of one bounded invocation.
struct Invocation {
    outcome: Result<String, String>,
    duration_ms: u64,
}

impl Invocation {
    fn into_result(
        self,
        index: usize,
        specialist_id: synapse_common::SpecialistId,
        directive: String,
    ) -> SpecialistResult {
        let result = match self.outcome {
            Ok(output) => SpecialistResult::success(index, specialist_id, directive, output),
            Err(detail) => SpecialistResult::failure(index, specialist_id, directive, detail),
        };
        result.with_duration_ms(self.duration_ms)
    }
}

async fn invoke(specialist: Arc<dyn Specialist>, directive: String, limit: Duration) -> Invocation {
    let started = Instant::now();
    let id = specialist.id().clone();
    debug!(specialist = %id, "Invoking specialist");

    let outcome = match tokio::time::timeout(limit, specialist.invoke(&directive)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            warn!(specialist = %id, error = %e, "Specialist failed");
            Err(e.to_string())
        }
        Err(_) => {
            warn!(specialist = %id, timeout_ms = limit.as_millis() as u64, "Specialist timed out");
            Err(TIMEOUT.to_string())
        }
    };

    Invocation {
        outcome,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
