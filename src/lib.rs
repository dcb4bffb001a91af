// Agent locomotion core: steering behaviors, waypoint paths,
// movement-driven animation sync, and the shared per-tick scheduler
// extracted from a family of click-to-move browser demos.
//
// Rendering, asset decoding, and input picking stay outside; the crate
// only pushes world matrices out through render-sync hooks and consumes
// targets/models through channels.

pub mod engine;
