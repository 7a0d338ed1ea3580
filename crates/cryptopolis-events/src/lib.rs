//! Typed in-process publish/subscribe for the Cryptopolis simulation.
//!
//! The simulation publishes [`Notification`]s while it ticks; external
//! consumers (renderer, audio, narrator, accessibility, end-of-game UI)
//! subscribe with a [`Filter`] and receive them when the tick pipeline
//! flushes the bus at the end of each tick.
//!
//! Publishing only buffers. Delivery happens in [`EventBus::flush`], in
//! publish order, and for each notification in subscription order. A
//! subscriber therefore never observes a half-applied tick.
//!
//! [`Notification`]: cryptopolis_types::Notification

pub mod bus;

pub use bus::{EventBus, Filter, Handler, SubscriptionId};
