//! MIL — a multi-modal pointer, gesture and ink recognition engine for
//! SVG-hosted surfaces.
//!
//! ```text
//!                    ┌─────────────────────┐
//!  pointer/touch/ ──▶ │     EventRouter      │  capture table + per-target
//!  pen/mouse events   │   (router module)    │  ring buffers
//!                    └──────────┬───────────┘
//!                               ▼
//!                    ┌─────────────────────┐      ┌──────────────┐
//!                    │   PointerRegistry    │◀────▶│  expression   │
//!                    │   (pointer module)    │      │  compiler     │
//!                    └──────────┬───────────┘      └──────────────┘
//!                               ▼
//!                    ┌─────────────────────┐
//!                    │     recognizer        │  matches live pointers
//!                    │                        │  against GestureSpecs
//!                    └──────────┬───────────┘
//!                               ▼
//!                    ┌─────────────────────┐      ┌──────────────┐
//!                    │   Gesture (gesture)   │◀────▶│  timer        │
//!                    │  Pending→Recognizing   │      │  (cancellable │
//!                    │  →Active→Ending→Ended  │      │   timeouts)   │
//!                    └──────────┬───────────┘      └──────────────┘
//!                               ▼
//!                    ┌─────────────────────┐      ┌──────────────┐
//!                    │    ink engine          │◀────▶│  geometry/    │
//!                    │  (stroke capture,      │      │  shape seams  │
//!                    │   hulls, auto-combine) │      │  (pluggable)  │
//!                    └─────────────────────┘      └──────────────┘
//! ```
//!
//! Everything above is orchestrated by [`host::HostRoot`], the crate's
//! single external entry point — one `HostRoot` per SVG root a host
//! embeds.
//!
//! # Example
//!
//! ```rust,ignore
//! use mil::host::HostRoot;
//! use mil::ids::TargetId;
//! use std::sync::Arc;
//!
//! let host = HostRoot::initialize();
//! let tap = host
//!     .create_gesture("tap")
//!     .with_target(TargetId::new(1))
//!     .with_pointer_type("touch")?
//!     .with_on_start(Arc::new(|g| println!("{} started", g.name())));
//! host.add_gesture(tap);
//! # Ok::<(), mil::error::MilError>(())
//! ```

pub mod error;
pub mod expression;
pub mod geometry;
pub mod gesture;
pub mod host;
pub mod ids;
pub mod ink;
pub mod pointer;
pub mod recognizer;
pub mod router;
pub mod settings;
pub mod shape;
pub mod timer;

/// Re-exports of the types most hosts need, so `use mil::prelude::*;`
/// covers the common surface.
pub mod prelude {
    pub use crate::error::{MilError, MilResult};
    pub use crate::expression::{compile, CompiledExpression, Ordinal, Permutation};
    pub use crate::geometry::{DefaultGeometry, GeometryProvider, Point};
    pub use crate::gesture::{Conditional, Gesture, GestureState, PointerSelector};
    pub use crate::host::HostRoot;
    pub use crate::ids::{InkId, PointerId, TargetId, TimerId};
    pub use crate::ink::{HullKind, Ink};
    pub use crate::pointer::{PointerButtons, PointerEventData, PointerKind, PointerRegistry};
    pub use crate::router::EventRouter;
    pub use crate::settings::{AutoCombineMode, GestureDefaults, Settings};
    pub use crate::shape::{
        DefaultShapeAnalyzer, RadialSwipeMatch, RadialSwipeRecognizer, ShapeMatch, ShapeRecognizer,
        ShapeTemplate,
    };
    pub use crate::timer::{global_timer_service, GestureTimer, GestureTimerService};
}
