// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish a goal (evaluating
// a checkpoint, or probing an architecture).
//
// Rules for this layer:
//   - No model maths here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - No direct file-format code (that's Layers 4 and 6)
//   - Only workflow coordination

/// The full evaluation workflow: checkpoint → inference → metrics → export
pub mod evaluate_use_case;

/// Architecture smoke test: random input through a fresh network
pub mod probe_use_case;
