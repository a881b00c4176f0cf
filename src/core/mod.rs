//! Core client state for vidq

pub mod lookup;
pub mod meta_store;
pub mod poller;
pub mod progress;
pub mod queue;
pub mod search;
pub mod suggest;
pub mod tasks;

pub use lookup::*;
pub use meta_store::*;
pub use poller::*;
pub use progress::*;
pub use queue::*;
pub use search::*;
pub use suggest::*;
pub use tasks::*;
