//! In-process publish/subscribe bus.
//!
//! Handlers use the bus to tell UI and gameplay code that something happened
//! ("login completed", "chat line received") without knowing who listens.
//! The bus has no network dependency.
//!
//! # Immediate vs deferred delivery
//!
//! - [`EventBus::publish_immediate`] calls every subscriber right now, on the
//!   calling thread.
//! - [`EventBus::publish_deferred`] queues the event; the application loop
//!   calls [`EventBus::drain_once`] once per tick to deliver everything queued
//!   so far, in FIFO order.  This is how events raised from other threads
//!   reach single-threaded UI code.
//!
//! # Ownership and teardown
//!
//! A subscription can name an [`OwnerId`] (typically one per UI panel).  When
//! the owner goes away it calls [`EventBus::unsubscribe_by_target`] to drop
//! every subscription it made in one step.  Subscriptions are never released
//! implicitly: an owner that forgets to tear down keeps its callbacks alive.
//!
//! # Locking
//!
//! Every mutation and every dispatch takes the bus mutex.  Dispatch copies
//! the callback list (cheap `Arc` clones) and invokes it after releasing the
//! lock, so a callback may subscribe, unsubscribe or publish re-entrantly.

mod bus;

pub use bus::{Callback, EventBus, OwnerId};
