//! Transport-layer types shared between the engine crate and the backend.
//! The installment shapes cross several crate boundaries (generator output,
//! lifecycle drafts, handler payloads), so they live here once instead of
//! being mirrored per crate.

mod installment;

pub use installment::{DealInstallmentDto, InstallmentPlanDto, InstallmentTemplate};
