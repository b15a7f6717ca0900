//! Per-instrument trading workers.
//!
//! An [`InstrumentWorker`] runs the aggregate / build / detect / reconcile /
//! order pipeline for one symbol; the [`Engine`] supervises one worker per
//! configured instrument. Workers share only the ports and the id allocators.

mod allocator;
mod engine;
mod worker;

pub use allocator::{ClientIdPool, ClientSession, OrderIdAllocator};
pub use engine::{Engine, WorkerOutcome};
pub use worker::{InstrumentWorker, TimeSource, WorkerExit, WorkerPorts, WorkerSettings};
