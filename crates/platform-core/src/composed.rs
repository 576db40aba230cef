//! The composed stream: canvas video plus harvested audio.

use std::sync::Arc;

use tokio::sync::watch;

use crate::capture::{AudioTrack, FrameReceiver, FrameSender};
use crate::frame::VideoFrame;

/// Canvas output track plus the audio tracks taken from the webcam capture.
///
/// Lives for the whole application, independent of whether a recording is
/// active. Encoder sinks subscribe to it when they are bound.
#[derive(Debug)]
pub struct ComposedStream {
    video: FrameSender,
    audio_tracks: Vec<AudioTrack>,
    width: u32,
    height: u32,
    fps: u32,
}

impl ComposedStream {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        let (video, _) = watch::channel(None);
        Self {
            video,
            audio_tracks: Vec::new(),
            width,
            height,
            fps,
        }
    }

    /// Publish the latest canvas frame.
    pub fn publish(&self, frame: Arc<VideoFrame>) {
        self.video.send_replace(Some(frame));
    }

    /// Subscribe to canvas frames.
    pub fn subscribe_video(&self) -> FrameReceiver {
        self.video.subscribe()
    }

    /// Most recently published canvas frame.
    pub fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        self.video.borrow().clone()
    }

    /// Add an audio track; duplicates are ignored.
    pub fn add_audio_track(&mut self, track: AudioTrack) {
        if !self.audio_tracks.contains(&track) {
            tracing::info!(label = %track.label, "Adding audio track to composed stream");
            self.audio_tracks.push(track);
        }
    }

    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio_tracks
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rate at which canvas frames are published.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_late_subscribers() {
        let stream = ComposedStream::new(8, 8, 30);
        stream.publish(Arc::new(VideoFrame::solid(8, 8, [0, 0, 0, 255])));

        let rx = stream.subscribe_video();
        assert!(rx.borrow().is_some());
        assert!(stream.latest_frame().is_some());
    }

    #[test]
    fn test_audio_tracks_are_deduplicated() {
        let mut stream = ComposedStream::new(8, 8, 30);
        let track = AudioTrack {
            label: "mic".to_string(),
            device: None,
        };
        stream.add_audio_track(track.clone());
        stream.add_audio_track(track);
        assert_eq!(stream.audio_tracks().len(), 1);
    }
}
