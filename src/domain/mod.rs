// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types describing the core concepts of the system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, and traits (ndarray is allowed
//     as the plain n-dimensional array type — it carries no
//     framework or device state)
//
// Keeping this layer framework-free means the metric maths and
// the report types are testable without a GPU.

/// Network dimensionality (2D slices vs 3D volumes)
pub mod mode;

/// A paired MR/CT scan case loaded from disk
pub mod scan;

/// Per-volume intensity statistics (z-score normalisation)
pub mod stats;

/// Per-case metric rows and the aggregate evaluation report
pub mod report;

/// Core abstractions (traits) that other layers implement
pub mod traits;
