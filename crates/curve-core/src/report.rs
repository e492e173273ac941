//! Handing a finalized snapshot to a renderer.
//!
//! The renderer may not be listening when the report view opens. When it can
//! announce itself with [`RendererMessage::Ready`], data is sent exactly once
//! in reply. Without that channel the data is sent on open and once more
//! after a fixed delay.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::accumulator::AccumulatedTime;

/// Default delay before the redundant resend.
pub const DEFAULT_RESEND_DELAY: Duration = Duration::from_millis(3_000);

/// Message carrying the full mapping to the renderer.
///
/// Serialized as `{"type":"commitData","data":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "commitData")]
pub struct CommitData {
    pub data: AccumulatedTime,
}

/// Messages a renderer sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RendererMessage {
    /// The renderer finished initializing and can receive data.
    Ready,
}

/// How data reaches the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Wait for `Ready`, then send once.
    Acknowledged,
    /// Send on open and again after `delay`.
    DelayedResend { delay: Duration },
}

/// At-least-once delivery of one [`CommitData`] message.
#[derive(Debug, Clone)]
pub struct ReportDelivery {
    message: CommitData,
    mode: DeliveryMode,
    sends: u8,
}

impl ReportDelivery {
    pub fn new(data: AccumulatedTime, mode: DeliveryMode) -> Self {
        Self {
            message: CommitData { data },
            mode,
            sends: 0,
        }
    }

    /// Called when the report view opens.
    pub fn on_open(&mut self) -> Option<&CommitData> {
        match self.mode {
            DeliveryMode::DelayedResend { .. } if self.sends == 0 => self.send(),
            _ => None,
        }
    }

    /// Called for each message received from the renderer.
    pub fn on_renderer_message(&mut self, message: RendererMessage) -> Option<&CommitData> {
        match (self.mode, message) {
            (DeliveryMode::Acknowledged, RendererMessage::Ready) if self.sends == 0 => self.send(),
            (_, RendererMessage::Ready) => {
                tracing::debug!(sends = self.sends, "renderer ready, nothing left to send");
                None
            }
        }
    }

    /// Called when the resend delay elapses.
    pub fn on_resend_timer(&mut self) -> Option<&CommitData> {
        match self.mode {
            DeliveryMode::DelayedResend { .. } if self.sends == 1 => self.send(),
            _ => None,
        }
    }

    /// How long to wait before calling [`Self::on_resend_timer`], if at all.
    pub const fn resend_delay(&self) -> Option<Duration> {
        match self.mode {
            DeliveryMode::DelayedResend { delay } => Some(delay),
            DeliveryMode::Acknowledged => None,
        }
    }

    /// Number of times the message has been handed out.
    pub const fn sends(&self) -> u8 {
        self.sends
    }

    fn send(&mut self) -> Option<&CommitData> {
        self.sends += 1;
        tracing::debug!(
            files = self.message.data.len(),
            attempt = self.sends,
            "sending commit data"
        );
        Some(&self.message)
    }
}
