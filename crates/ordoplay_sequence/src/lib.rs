// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence playback engine for OrdoPlay.
//!
//! A [`Clip`] holds tracks of timed events:
//! - [`Signal`] events fire once at a point in time
//! - [`Range`] events enter, update every tick, then exit
//!
//! ## Architecture
//!
//! The engine is built on:
//! - Typed payloads: an event's payload type selects its handler
//! - Bindings from payload type to handler type, local or shared
//! - Per-type handler pools, so steady-state playback does not allocate
//! - A [`SequenceController`] that owns playback instances and is driven
//!   by `update(delta_time)` once per frame
//!
//! ```
//! use ordoplay_sequence::{Clip, SequenceController, Signal, Track};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Footstep;
//!
//! let clip = Arc::new(Clip::new("walk").with_track(
//!     Track::new("audio").with_signal(Signal::new(0.25, Footstep)),
//! ));
//!
//! let mut controller = SequenceController::new();
//! controller.bind_signal_callback::<Footstep>(|_| println!("step"));
//! let handle = controller.play(&clip);
//! controller.update(0.5);
//! assert!(handle.is_done());
//! ```

pub mod binding;
pub mod clip;
pub mod config;
pub mod controller;
pub mod event;
pub mod handler;
pub mod playback;
pub mod pool;
pub mod track;

#[cfg(test)]
mod testing;

pub use binding::{BindingRegistry, BindingTable};
pub use clip::{Clip, ClipId, EventRef};
pub use config::{ConfigError, SequenceConfig};
pub use controller::{SequenceController, UnhandledHook};
pub use event::{AnyRange, AnySignal, EventKind, Range, SequenceEvent, Signal};
pub use handler::{
    RangeCallback, RangeCallbacks, RangeHandler, RangeObserver, RangeUpdateCallback,
    SignalCallback, SignalHandler, SignalObserver,
};
pub use playback::{PlaybackId, SequenceHandle, UnhandledEvent};
pub use pool::HandlerPools;
pub use track::{Track, TrackId};
