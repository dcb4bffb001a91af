// Asset provider seam.
//
// Model/clip loading is external and asynchronous. The core only consumes
// a one-shot handle that eventually yields the drawable parts for an
// already-spawned agent: a render-sync hook plus animation clips. An agent
// whose load fails stays in the simulation as an invisible physics body.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use thiserror::Error;

use super::animation::AnimationClip;
use super::components::RenderSyncFn;

#[derive(Debug, Error)]
pub enum AssetError {
    /// The provider has no model under the requested identifier.
    #[error("unknown model `{0}`")]
    UnknownModel(String),
    /// The provider gave up mid-load (decode error, dropped loader, ...).
    #[error("model `{id}` failed to load: {reason}")]
    LoadFailed { id: String, reason: String },
}

/// Drawable parts of a loaded model, ready to attach to an agent.
pub struct LoadedModel {
    /// Pushes the agent's world matrix to the external visual per tick.
    pub sync: RenderSyncFn,
    /// Clips shipped with the model. The first one (if any) becomes the
    /// agent's walk-cycle link.
    pub clips: Vec<Box<dyn AnimationClip>>,
}

/// Loader side of a [`ModelHandle`].
pub type ModelSender = Sender<Result<LoadedModel, AssetError>>;

/// One-shot promise for a model load. Polled once per tick; yields at most
/// one result, then stays exhausted.
pub struct ModelHandle {
    id: String,
    rx: Receiver<Result<LoadedModel, AssetError>>,
    done: bool,
}

impl ModelHandle {
    /// A pending handle plus the sender a loader thread fulfils it with.
    pub fn channel(id: impl Into<String>) -> (ModelSender, ModelHandle) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            ModelHandle {
                id: id.into(),
                rx,
                done: false,
            },
        )
    }

    /// An already-resolved handle (synchronous providers, tests).
    pub fn ready(id: impl Into<String>, model: LoadedModel) -> ModelHandle {
        let (tx, handle) = Self::channel(id);
        let _ = tx.send(Ok(model));
        handle
    }

    /// An already-failed handle.
    pub fn failed(id: impl Into<String>, error: AssetError) -> ModelHandle {
        let (tx, handle) = Self::channel(id);
        let _ = tx.send(Err(error));
        handle
    }

    /// Non-blocking poll. `None` while the load is still in flight. A
    /// loader that hangs up without answering counts as a failure,
    /// reported once.
    pub fn poll(&mut self) -> Option<Result<LoadedModel, AssetError>> {
        if self.done {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.done = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.done = true;
                Some(Err(AssetError::LoadFailed {
                    id: self.id.clone(),
                    reason: "loader disconnected before completing".into(),
                }))
            }
        }
    }
}

/// External model source. Implementations may resolve immediately (tests,
/// procedural assets) or hand the sender to a loader thread.
pub trait AssetProvider {
    fn load_model(&mut self, id: &str) -> ModelHandle;
}
