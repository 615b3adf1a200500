mod store;

pub use store::{GenerationPayment, InMemoryBillingStore};
