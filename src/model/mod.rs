//! Solver model: typed entities, validation and routing assumptions.
//!
//! Raw solver output enters through [`validate_document`], which either
//! returns a fully typed [`SolverDocument`] or the first structural or
//! referential violation it finds.

pub mod assumptions;
pub mod types;
pub mod validation;

pub use assumptions::resolve_assumptions;
pub use types::{
    site_label, Endpoint, EndpointAddressing, Interface, Link, LinkKind, Node, Route4, Route6,
    RoutingAssumptions, Site, SolverDocument, SUPPORTED_SCHEMA_VERSION,
};
pub use validation::validate_document;
