//! Session Description Protocol bodies.
//!
//! The codec does not interpret SDP: it only hands the raw body to
//! whichever handler asked for it. This module is the small, GB28181-shaped
//! SDP builder those handlers use; it knows the `y=<ssrc>` extension and
//! the `s=Play`/`s=Playback` convention, not general-purpose SDP offer/answer
//! negotiation.

use std::fmt;

/// Live vs. historical playback, which changes the session name and
/// whether a `u=`/`t=` playback range is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Live,
    Playback,
}

/// A minimal GB28181 media offer: enough to drive `m=video`, the PS/H264/H265
/// payload types, and the `y=` SSRC line a device expects in an INVITE.
#[derive(Debug, Clone)]
pub struct MediaOffer {
    pub mode: PlayMode,
    pub session_id: u64,
    pub session_version: u64,
    pub local_ip: std::net::IpAddr,
    pub device_id: String,
    pub rtp_port: u16,
    pub ssrc: u32,
    /// `(start, end)` unix seconds; only meaningful for [`PlayMode::Playback`].
    pub range: Option<(u64, u64)>,
}

impl MediaOffer {
    /// Renders the `application/sdp` body exactly as a GB28181 INVITE would
    /// carry it: PS/H264/H265 payload types (96/97/98) and a zero-padded
    /// 10-digit SSRC.
    pub fn render(&self) -> String {
        let mut sdp = String::new();
        sdp.push_str("v=0\r\n");
        sdp.push_str(&format!(
            "o=- {} {} IN IP4 {}\r\n",
            self.session_id, self.session_version, self.local_ip
        ));
        match self.mode {
            PlayMode::Live => sdp.push_str("s=Play\r\n"),
            PlayMode::Playback => sdp.push_str("s=Playback\r\n"),
        }
        sdp.push_str(&format!("c=IN IP4 {}\r\n", self.local_ip));
        match (self.mode, self.range) {
            (PlayMode::Playback, Some((start, end))) => {
                sdp.push_str(&format!("u={}:{}-{}\r\n", self.device_id, start, end));
                sdp.push_str(&format!("t={} {}\r\n", start, end));
            }
            _ => sdp.push_str("t=0 0\r\n"),
        }
        sdp.push_str(&format!("m=video {} RTP/AVP 96 97 98\r\n", self.rtp_port));
        sdp.push_str("a=recvonly\r\n");
        sdp.push_str("a=rtpmap:96 PS/90000\r\n");
        sdp.push_str("a=rtpmap:97 H264/90000\r\n");
        sdp.push_str("a=rtpmap:98 H265/90000\r\n");
        sdp.push_str(&format!("y={:010}\r\n", self.ssrc));
        sdp
    }
}

impl fmt::Display for MediaOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Extracts the media-server-facing RTP port from a device's SDP answer
/// (the `m=video <port> ...` line). Devices echo back the port they intend
/// to send from, which we don't currently act on but do parse for logging.
pub fn answer_rtp_port(sdp: &str) -> Option<u16> {
    sdp.lines()
        .find(|l| l.starts_with("m=video"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|p| p.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_live_offer_with_ssrc() {
        let offer = MediaOffer {
            mode: PlayMode::Live,
            session_id: 123,
            session_version: 456,
            local_ip: "127.0.0.1".parse().unwrap(),
            device_id: "34020000001320000001".to_string(),
            rtp_port: 30000,
            ssrc: 101,
            range: None,
        };
        let sdp = offer.render();
        assert!(sdp.contains("s=Play\r\n"));
        assert!(sdp.contains("m=video 30000 RTP/AVP 96 97 98\r\n"));
        assert!(sdp.contains("y=0000000101\r\n"));
    }

    #[test]
    fn renders_playback_offer_with_range() {
        let offer = MediaOffer {
            mode: PlayMode::Playback,
            session_id: 1,
            session_version: 1,
            local_ip: "127.0.0.1".parse().unwrap(),
            device_id: "34020000001320000001".to_string(),
            rtp_port: 30002,
            ssrc: 5,
            range: Some((1000, 2000)),
        };
        let sdp = offer.render();
        assert!(sdp.contains("s=Playback\r\n"));
        assert!(sdp.contains("u=34020000001320000001:1000-2000\r\n"));
        assert!(sdp.contains("t=1000 2000\r\n"));
    }
}
