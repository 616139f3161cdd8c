//! Static analyses over the resolved grammar and its ATN. None of them
//! mutate their inputs.

pub mod callgraph;
pub mod complexity;
pub mod decisions;
pub mod firstfollow;
pub mod leftrec;

pub use callgraph::{CallGraph, call_graph};
pub use complexity::complexity;
pub use decisions::{DecisionSets, decision_lookahead};
pub use firstfollow::{FirstFollow, first_follow};
pub use leftrec::left_recursion_report;
