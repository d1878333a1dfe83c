//! The Stream value and its state machine.

use serde::{Deserialize, Serialize};

use gb28181_sip_core::sdp::PlayMode;

/// Identifies a stream by the device/channel pair it plays from. A device
/// can have at most one live stream per channel at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamKey {
    pub device_id: String,
    pub channel_id: String,
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_id, self.channel_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    /// Play requested, INVITE not yet sent.
    Requested,
    /// INVITE sent, awaiting the device's final response.
    Invited,
    /// Device answered 200 OK and was ACKed; media should be flowing.
    Playing,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    pub key: StreamKey,
    pub ssrc: u32,
    pub rtp_port: u16,
    pub mode: PlayModeDto,
    pub state: StreamState,
    pub created_at: i64,
    pub last_touched: i64,
    /// Call-ID of the INVITE dialog this stream rides on, so a BYE or
    /// idle-timeout teardown can address the right device dialog.
    pub call_id: String,
}

/// [`PlayMode`] is not `Serialize`; this mirrors it for the `Stream`
/// record without forcing that on the SDP builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayModeDto {
    Live,
    Playback,
}

impl From<PlayMode> for PlayModeDto {
    fn from(mode: PlayMode) -> Self {
        match mode {
            PlayMode::Live => PlayModeDto::Live,
            PlayMode::Playback => PlayModeDto::Playback,
        }
    }
}

impl Stream {
    pub fn touch(&mut self, now: i64) {
        self.last_touched = now;
    }

    pub fn is_idle(&self, now: i64, idle_threshold_secs: i64) -> bool {
        self.state == StreamState::Playing && now - self.last_touched >= idle_threshold_secs
    }
}
