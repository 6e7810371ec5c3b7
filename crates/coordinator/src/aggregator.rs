//! Merges per-instruction results into a single resolution.

use synapse_common::{Resolution, ResolutionStatus, SpecialistResult, WorkflowType};

/// Build the resolution for a dispatched plan.
///
/// Results are stable-sorted by instruction index, so the narrative is the
/// same whatever order the specialists finished in. Never fails: an empty or
/// all-failed input still yields a resolution.
pub fn aggregate(
    order_id: Option<String>,
    workflow_type: WorkflowType,
    mut results: Vec<SpecialistResult>,
) -> Resolution {
    results.sort_by_key(|r| r.instruction_index);

    let narrative = results
        .iter()
        .map(SpecialistResult::line)
        .collect::<Vec<_>>()
        .join("\n");

    Resolution {
        order_id,
        status: ResolutionStatus::from_results(&results),
        narrative,
        workflow_type: Some(workflow_type),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_common::SpecialistId;

    fn ok(index: usize, id: SpecialistId, output: &str) -> SpecialistResult {
        SpecialistResult::success(index, id, "directive", output)
    }

    #[test]
    fn orders_by_instruction_index() {
        let results = vec![
            ok(1, SpecialistId::notification_sender(), "Notified"),
            ok(0, SpecialistId::route_finder(), "Route found"),
        ];
        let resolution = aggregate(Some("GF-789".into()), WorkflowType::Parallel, results);

        assert_eq!(
            resolution.narrative,
            "route-finder: Route found\nnotification-sender: Notified"
        );
        assert_eq!(resolution.status, ResolutionStatus::Resolved);
        assert_eq!(resolution.results[0].instruction_index, 0);
        assert_eq!(resolution.order_id.as_deref(), Some("GF-789"));
    }

    #[test]
    fn failures_render_error_detail() {
        let results = vec![
            ok(0, SpecialistId::route_finder(), "Route found"),
            SpecialistResult::failure(1, SpecialistId::from("ghost"), "d", "unroutable"),
        ];
        let resolution = aggregate(None, WorkflowType::Sequential, results);
        assert_eq!(resolution.narrative, "route-finder: Route found\nghost: unroutable");
        assert_eq!(resolution.status, ResolutionStatus::PartiallyResolved);
    }

    #[test]
    fn empty_and_all_failed_are_unresolved() {
        let empty = aggregate(None, WorkflowType::Parallel, Vec::new());
        assert_eq!(empty.narrative, "");
        assert_eq!(empty.status, ResolutionStatus::Unresolved);

        let failed = aggregate(
            None,
            WorkflowType::Parallel,
            vec![SpecialistResult::failure(0, SpecialistId::route_finder(), "d", "timeout")],
        );
        assert_eq!(failed.status, ResolutionStatus::Unresolved);
        assert_eq!(failed.workflow_type, Some(WorkflowType::Parallel));
    }

    #[test]
    fn aggregating_twice_is_byte_identical() {
        let results = vec![
            ok(2, SpecialistId::notification_sender(), "c"),
            ok(0, SpecialistId::route_finder(), "a"),
            ok(1, SpecialistId::merchant_status_checker(), "b"),
        ];
        let first = aggregate(None, WorkflowType::Parallel, results.clone());
        let second = aggregate(None, WorkflowType::Parallel, results);
        assert_eq!(first.narrative.as_bytes(), second.narrative.as_bytes());
    }
}
