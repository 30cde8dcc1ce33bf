use thiserror::Error;

/// Validation failures raised at construction time for [`crate::order::Order`]
/// and [`crate::order::OrderModify`].
///
/// These are the only errors the core surfaces as `Result`s — admission
/// rejections (duplicate id, unmatchable FAK/FOK) and not-found conditions
/// (cancel/modify on an absent id) are reported in-band (an empty trade list
/// or `false`), not as errors. An attempt to fill an order for more than its
/// remaining quantity is an internal invariant violation, not a validation
/// error, and panics instead of returning `Result` — see
/// [`crate::order::Order::fill`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderError {
    #[error("order quantity must be positive")]
    NonPositiveQuantity,
    #[error("order price must be non-negative")]
    NegativePrice,
}
