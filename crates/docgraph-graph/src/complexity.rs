use docgraph_core::{ComplexityWeights, ModuleInfo};

/// Weighted complexity score for a module. Monotone in every input
/// (more code or more connections never lowers the score) and always
/// >= 0; weights come from configuration.
pub fn complexity_score(info: &ModuleInfo, degree: usize, weights: &ComplexityWeights) -> f64 {
    let score = info.line_count as f64 * weights.line_weight
        + info.function_count as f64 * weights.function_weight
        + info.class_count as f64 * weights.class_weight
        + info.imports.len() as f64 * weights.import_weight
        + info.exports.len() as f64 * weights.export_weight
        + degree as f64 * weights.edge_penalty;
    (score.max(0.0) * 100.0).round() / 100.0
}
