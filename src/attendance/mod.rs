pub mod filter;
pub mod reconciler;
pub mod scanner;
pub mod stats;
#[cfg(test)]
pub(crate) mod testing;
pub mod view;
