use crate::{
    config::{PathStep, StepKind},
    document::DocumentNode,
    FieldError,
};
use tracing::debug;

/// Walks `steps` from `start`. `Ok(None)` means some step matched nothing;
/// later steps are not attempted.
pub fn resolve<N: DocumentNode>(start: N, steps: &[PathStep]) -> Result<Option<N>, FieldError> {
    let mut current = Some(start);

    for (i, step) in steps.iter().enumerate() {
        let Some(node) = current else {
            break;
        };

        current = match &step.kind {
            StepKind::Find => node.find_first(step_tag(i, step)?, step.class_filter())?,
            StepKind::FindAll => {
                let matches = node.find_all(step_tag(i, step)?, step.class_filter())?;
                usize::try_from(step.index)
                    .ok()
                    .and_then(|index| matches.get(index).copied())
            }
            StepKind::Other(kind) => {
                debug!("Ignoring unknown step type '{}' at step {}", kind, i);
                Some(node)
            }
        };
    }

    Ok(current)
}

fn step_tag(i: usize, step: &PathStep) -> Result<&str, FieldError> {
    step.tag.as_deref().ok_or(FieldError::MissingTag(i))
}
