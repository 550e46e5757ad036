//! Projection & Commutativity Layer (spec §4.5): pure functions from an
//! order (and its booking) to a regulatory report, with the guarantee
//! that `project ∘ normalize = project ∘ book ∘ normalize` on every
//! projected field (the "Master Square").

pub mod booking;
pub mod report;
pub mod uti;

pub use booking::{book_equity_settlement, canonical_form};
pub use report::{project, RegulatoryReport, Regime};
pub use uti::derive_uti;
