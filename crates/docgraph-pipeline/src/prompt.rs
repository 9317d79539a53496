use docgraph_ai::{GenerationRequest, Message};
use docgraph_core::{JobReason, ParseFailure, UpdateJob};
use docgraph_graph::{GraphBuildReport, ModuleNode};

const SYSTEM_PROMPT: &str = "You maintain per-module developer documentation. \
Given a structural summary of a source module, write a concise markdown section \
describing its purpose, public surface and dependencies. Keep it factual; do \
not invent behavior the summary does not support.";

/// Build the generation request for one job from the graph report.
pub(crate) fn build_request(job: &UpdateJob, report: &GraphBuildReport) -> GenerationRequest {
    let body = match report.graph.node(&job.module) {
        Some(node) => describe_module(node, job.reason, report),
        None => describe_unparseable(&job.module, report.parse_errors.as_slice()),
    };
    GenerationRequest::new(vec![Message::system(SYSTEM_PROMPT), Message::user(body)])
}

fn describe_module(node: &ModuleNode, reason: JobReason, report: &GraphBuildReport) -> String {
    let info = &node.info;
    let mut lines = vec![
        format!("Module: {} ({})", info.module_name, node.id),
        format!("Language: {}", info.language),
        format!(
            "Size: {} lines, {} functions, {} classes/types",
            info.line_count, info.function_count, info.class_count
        ),
    ];
    if !info.exports.is_empty() {
        lines.push(format!("Exports: {}", info.exports.join(", ")));
    }
    let deps = report.graph.dependencies_of(&node.id);
    if !deps.is_empty() {
        lines.push(format!("Depends on: {}", deps.join(", ")));
    }
    let dependents = report.graph.dependents_of(&node.id);
    if !dependents.is_empty() {
        lines.push(format!("Used by: {}", dependents.join(", ")));
    }
    if let Some(doc) = &info.doc_comment {
        lines.push(format!("Existing module comment: {}", doc));
    }
    if reason == JobReason::DependentOfChanged {
        lines.push(
            "Note: this module did not change itself; a module it depends on did. \
Revise only what the dependency change affects."
                .to_string(),
        );
    }
    lines.push("Write the updated documentation section for this module.".to_string());
    lines.join("\n")
}

fn describe_unparseable(module: &str, failures: &[ParseFailure]) -> String {
    let detail = failures
        .iter()
        .find(|f| f.path.to_string_lossy() == module)
        .map(|f| f.message.clone())
        .unwrap_or_else(|| "unknown parse failure".to_string());
    format!(
        "Module: {module}\nThe file changed but no longer parses ({detail}). \
Write a short documentation note stating that the module is in a broken state \
and that its previous documentation may be out of date."
    )
}
