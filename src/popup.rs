//! Display lifecycle of a single badge popup.
//!
//! A popup dismisses itself after `display_secs` unless the user dismisses it
//! first. The sequencer is closed only after a further `fade_ms`, so the
//! popup is gone before the next badge starts loading.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::PopupConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupPhase {
    Visible,
    Fading,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    Timeout,
    User,
}

/// Marker returned by the first dismissal; redeem it with
/// [`PopupLifecycle::finish`] once the fade is over.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct CloseEffect(());

#[derive(Debug)]
pub struct PopupLifecycle {
    phase: PopupPhase,
}

impl Default for PopupLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupLifecycle {
    pub fn new() -> Self {
        Self {
            phase: PopupPhase::Visible,
        }
    }

    pub fn phase(&self) -> PopupPhase {
        self.phase
    }

    /// Start fading. Only the first call returns the close effect.
    pub fn dismiss(&mut self) -> Option<CloseEffect> {
        match self.phase {
            PopupPhase::Visible => {
                self.phase = PopupPhase::Fading;
                Some(CloseEffect(()))
            }
            PopupPhase::Fading | PopupPhase::Closed => None,
        }
    }

    /// Fade finished; the caller now closes the sequencer slot.
    pub fn finish(&mut self, _effect: CloseEffect) {
        self.phase = PopupPhase::Closed;
    }
}

/// Run one popup to completion and invoke `on_close` exactly once.
///
/// Every message on `dismissals` is a user dismissal; extra ones are
/// ignored. A closed channel just means the user cannot dismiss early.
pub async fn present_popup<F>(
    config: &PopupConfig,
    dismissals: &mut mpsc::UnboundedReceiver<()>,
    on_close: F,
) -> DismissReason
where
    F: FnOnce(),
{
    let mut popup = PopupLifecycle::new();

    let reason = tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(config.display_secs)) => DismissReason::Timeout,
        Some(()) = dismissals.recv() => DismissReason::User,
    };
    let effect = popup.dismiss();
    tracing::debug!("Popup dismissed ({:?}), fading", reason);

    let fade = tokio::time::sleep(Duration::from_millis(config.fade_ms));
    tokio::pin!(fade);
    loop {
        tokio::select! {
            _ = &mut fade => break,
            Some(()) = dismissals.recv() => {
                if popup.dismiss().is_some() {
                    tracing::warn!("Popup re-entered fading");
                }
            }
        }
    }

    if let Some(effect) = effect {
        popup.finish(effect);
        on_close();
    }
    reason
}
