//! DyPlayer -- the command façade for one DY-series module.
//!
//! Every public operation funnels into one session exchange, which encodes
//! the frame, writes it, reads the reply for queries, and keeps the
//! [`DeviceState`] in step. The session lock is held for the whole
//! exchange, so at most one command is on the wire at a time.

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use dyplayer_core::error::{Error, ProtocolError, Result};
use dyplayer_core::transport::Transport;
use dyplayer_core::types::*;

use crate::commands::{CombinationName, Command, TrackPath};
use crate::frame::{HEADER_LEN, START, frame_len};
use crate::response::{self, Response};
use crate::state::DeviceState;

struct Session {
    transport: Box<dyn Transport>,
    state: DeviceState,
}

impl Session {
    /// Mark the module disconnected after a failed transport operation.
    fn link_lost(&mut self, command: &Command, err: Error) -> Error {
        warn!(command = %command, error = %err, "link failed, marking module disconnected");
        self.state.mark_disconnected();
        err
    }

    /// Classify a failed clear or read. Only link failures end the session.
    fn fail(&mut self, command: &Command, err: Error) -> Error {
        if err.is_link_failure() {
            self.link_lost(command, err)
        } else {
            err
        }
    }

    /// One command/reply exchange. The caller holds the session lock.
    async fn exchange(
        &mut self,
        command: &Command,
        timeout: Duration,
        max_len: usize,
    ) -> Result<Option<Response>> {
        let frame = command.encode()?;
        if self.state.is_disconnected() {
            return Err(Error::NotConnected);
        }

        debug!(command = %command, code = command.code(), "sending command");

        let cleared = self.transport.clear_input().await;
        if let Err(e) = cleared {
            return Err(self.fail(command, e));
        }
        // Any write failure ends the session, whatever its kind.
        let sent = self.transport.send(&frame).await;
        if let Err(e) = sent {
            return Err(self.link_lost(command, e));
        }
        self.state.mark_connected();

        if !command.expects_reply() {
            self.state.mark_optimistic(command);
            return Ok(None);
        }

        let read = self.read_reply(timeout, max_len).await;
        let bytes = match read {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(command, e)),
        };

        let response = response::parse(&bytes).map_err(|e| {
            warn!(command = %command, reply = ?bytes, error = %e, "invalid reply");
            e
        })?;
        if response.code() != command.code() {
            warn!(command = %command, reply = ?bytes, "reply answers a different query");
            return Err(ProtocolError::UnexpectedResponse {
                expected: command.code(),
                actual: response.code(),
            }
            .into());
        }

        debug!(command = %command, response = ?response, "reply received");
        self.state.apply(&response);
        Ok(Some(response))
    }

    /// Read one reply frame: the header first, then the rest of the frame
    /// as announced by its length byte.
    async fn read_reply(&mut self, timeout: Duration, max_len: usize) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;

        let mut reply = self.transport.receive_exact(HEADER_LEN, timeout).await?;
        if reply.is_empty() {
            return Err(Error::Timeout);
        }

        if reply[0] == START {
            if let Some(total) = frame_len(&reply) {
                let wanted = total.min(max_len).saturating_sub(HEADER_LEN);
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                let rest = self.transport.receive_exact(wanted, remaining).await?;
                reply.extend(rest);
            }
        }
        Ok(reply)
    }
}

/// A DY-series module reached through a [`Transport`].
///
/// Constructed via [`DyPlayerBuilder`](crate::builder::DyPlayerBuilder).
/// Control commands are fire-and-forget and update the state optimistically;
/// queries wait for the module's answer and record it as confirmed.
pub struct DyPlayer {
    session: Mutex<Session>,
    command_timeout: Duration,
    max_response_len: usize,
}

impl DyPlayer {
    /// Called by the builder; use [`DyPlayerBuilder`](crate::builder::DyPlayerBuilder).
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        command_timeout: Duration,
        max_response_len: usize,
    ) -> Self {
        DyPlayer {
            session: Mutex::new(Session {
                transport,
                state: DeviceState::new(),
            }),
            command_timeout,
            max_response_len,
        }
    }

    /// Send one command and, for queries, return the module's reply.
    ///
    /// Nothing is written if the command fails validation or the link is
    /// already known to be down. A failed write marks the module
    /// disconnected and leaves the rest of the state as it was. No retries
    /// are attempted.
    pub async fn send_command(&self, command: Command) -> Result<Option<Response>> {
        let mut session = self.session.lock().await;
        session
            .exchange(&command, self.command_timeout, self.max_response_len)
            .await
    }

    async fn control(&self, command: Command) -> Result<()> {
        self.send_command(command).await.map(|_| ())
    }

    async fn query<T>(&self, command: Command, extract: fn(Response) -> Option<T>) -> Result<T> {
        if !command.expects_reply() {
            return Err(Error::InvalidParameter(format!("{command} is not a query")));
        }
        let expected = command.code();
        let response = self.send_command(command).await?;
        let actual = response.as_ref().map_or(expected, Response::code);
        response
            .and_then(extract)
            .ok_or_else(|| ProtocolError::UnexpectedResponse { expected, actual }.into())
    }

    /// Snapshot of the last-known module state.
    pub async fn state(&self) -> DeviceState {
        self.session.lock().await.state.clone()
    }

    // ---------------------------------------------------------------
    // Playback
    // ---------------------------------------------------------------

    pub async fn play(&self) -> Result<()> {
        self.control(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.control(Command::Pause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.control(Command::Stop).await
    }

    pub async fn next(&self) -> Result<()> {
        self.control(Command::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.control(Command::Previous).await
    }

    /// Jump to the previous folder, starting at its first or last track.
    pub async fn previous_folder(&self, entry: FolderEntry) -> Result<()> {
        self.control(Command::PreviousFolder(entry)).await
    }

    /// Play a track by number (`1` plays `00001.mp3`).
    pub async fn play_track(&self, track: u16) -> Result<()> {
        self.control(Command::PlayTrack(track)).await
    }

    /// Play a file by path, e.g. `play_path(Device::Sd, "/ADS/00001.MP3")`.
    pub async fn play_path(&self, device: Device, path: &str) -> Result<()> {
        let path = TrackPath::new(path)?;
        self.control(Command::PlayPath { device, path }).await
    }

    /// Cue a track by number without starting playback.
    pub async fn select_track(&self, track: u16) -> Result<()> {
        self.control(Command::SelectTrack(track)).await
    }

    /// Interrupt the current track with another one. Playback resumes
    /// afterwards.
    pub async fn play_interlude(&self, device: Device, track: u16) -> Result<()> {
        self.control(Command::PlayInterlude { device, track }).await
    }

    pub async fn play_interlude_path(&self, device: Device, path: &str) -> Result<()> {
        let path = TrackPath::new(path)?;
        self.control(Command::PlayInterludePath { device, path }).await
    }

    pub async fn stop_interlude(&self) -> Result<()> {
        self.control(Command::StopInterlude).await
    }

    /// Play a sequence of sounds from the `ZH` folder, named by two
    /// characters each (`["01", "02"]` plays `ZH/01.mp3` then `ZH/02.mp3`).
    pub async fn combination_play(&self, names: &[&str]) -> Result<()> {
        let names = names
            .iter()
            .map(|n| CombinationName::new(n))
            .collect::<Result<Vec<_>>>()?;
        self.control(Command::CombinationPlay(names)).await
    }

    pub async fn end_combination_play(&self) -> Result<()> {
        self.control(Command::EndCombinationPlay).await
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    /// Set the volume, `0..=30`. Out-of-range values are rejected before
    /// anything is written.
    pub async fn set_volume(&self, level: i32) -> Result<()> {
        let volume = Volume::new(level)?;
        self.control(Command::SetVolume(volume)).await
    }

    pub async fn volume_up(&self) -> Result<()> {
        self.control(Command::VolumeUp).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        self.control(Command::VolumeDown).await
    }

    pub async fn set_equalizer(&self, eq: Equalizer) -> Result<()> {
        self.control(Command::SetEqualizer(eq)).await
    }

    pub async fn set_play_mode(&self, mode: PlayMode) -> Result<()> {
        self.control(Command::SetPlayMode(mode)).await
    }

    /// Number of repeats for the repeat play modes.
    pub async fn set_cycle_times(&self, cycles: u16) -> Result<()> {
        self.control(Command::SetCycleTimes(cycles)).await
    }

    pub async fn set_playing_device(&self, device: Device) -> Result<()> {
        self.control(Command::SetPlayingDevice(device)).await
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub async fn query_play_state(&self) -> Result<PlayState> {
        self.query(Command::QueryPlayState, |r| match r {
            Response::PlayState(s) => Some(s),
            _ => None,
        })
        .await
    }

    /// Current volume. Not every firmware revision answers this query; the
    /// older ones let it time out.
    pub async fn query_volume(&self) -> Result<Volume> {
        self.query(Command::QueryVolume, |r| match r {
            Response::Volume(v) => Some(v),
            _ => None,
        })
        .await
    }

    /// Current equalizer. Same firmware caveat as [`query_volume`](Self::query_volume).
    pub async fn query_equalizer(&self) -> Result<Equalizer> {
        self.query(Command::QueryEqualizer, |r| match r {
            Response::Equalizer(eq) => Some(eq),
            _ => None,
        })
        .await
    }

    /// Device playback comes from, or `None` if the module reports none.
    pub async fn query_playing_device(&self) -> Result<Option<Device>> {
        self.query(Command::QueryPlayingDevice, |r| match r {
            Response::PlayingDevice(d) => Some(d),
            _ => None,
        })
        .await
    }

    pub async fn query_online_devices(&self) -> Result<OnlineDevices> {
        self.query(Command::QueryOnlineDevices, |r| match r {
            Response::OnlineDevices(d) => Some(d),
            _ => None,
        })
        .await
    }

    /// Number of tracks on the current device.
    pub async fn query_track_count(&self) -> Result<u16> {
        self.query(Command::QueryTrackCount, |r| match r {
            Response::TrackCount(n) => Some(n),
            _ => None,
        })
        .await
    }

    pub async fn query_current_track(&self) -> Result<u16> {
        self.query(Command::QueryCurrentTrack, |r| match r {
            Response::CurrentTrack(n) => Some(n),
            _ => None,
        })
        .await
    }

    pub async fn query_folder_first_track(&self) -> Result<u16> {
        self.query(Command::QueryFolderFirstTrack, |r| match r {
            Response::FolderFirstTrack(n) => Some(n),
            _ => None,
        })
        .await
    }

    pub async fn query_folder_track_count(&self) -> Result<u16> {
        self.query(Command::QueryFolderTrackCount, |r| match r {
            Response::FolderTrackCount(n) => Some(n),
            _ => None,
        })
        .await
    }

    /// Confirm play state and current track, then return the updated state.
    pub async fn refresh(&self) -> Result<DeviceState> {
        self.query_play_state().await?;
        self.query_current_track().await?;
        Ok(self.state().await)
    }

    // ---------------------------------------------------------------
    // Connection
    // ---------------------------------------------------------------

    /// Install a fresh transport after the link was lost.
    ///
    /// Playback knowledge is discarded, then the play state is queried on
    /// the new link. The new transport stays installed even if that query
    /// fails.
    pub async fn reconnect(&self, transport: Box<dyn Transport>) -> Result<PlayState> {
        let mut session = self.session.lock().await;
        let closed = session.transport.close().await;
        if let Err(e) = closed {
            warn!(error = %e, "failed to close previous transport");
        }
        session.transport = transport;
        session.state.reset_playback();
        session.state.mark_uninitialized();
        info!("transport replaced, querying play state");

        // Still under the same lock, so no other command reaches the new
        // link before the status query.
        let command = Command::QueryPlayState;
        let response = session
            .exchange(&command, self.command_timeout, self.max_response_len)
            .await?;
        match response {
            Some(Response::PlayState(state)) => Ok(state),
            other => Err(ProtocolError::UnexpectedResponse {
                expected: command.code(),
                actual: other.as_ref().map_or(command.code(), Response::code),
            }
            .into()),
        }
    }

    /// Close the transport. Further commands fail with [`Error::NotConnected`].
    pub async fn close(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session.state.mark_disconnected();
        let result = session.transport.close().await;
        info!("module connection closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ConnectionState, Tracked};
    use dyplayer_core::FrameError;
    use dyplayer_test_harness::MockTransport;

    const QUERY_STATE: &[u8] = &[0xAA, 0x01, 0x00, 0xAB];
    const STATE_PLAYING: &[u8] = &[0xAA, 0x01, 0x01, 0x01, 0xAD];
    const STATE_STOPPED: &[u8] = &[0xAA, 0x01, 0x01, 0x00, 0xAC];
    const PLAY: &[u8] = &[0xAA, 0x02, 0x00, 0xAC];
    const PAUSE: &[u8] = &[0xAA, 0x03, 0x00, 0xAD];
    const SET_VOLUME_15: &[u8] = &[0xAA, 0x13, 0x01, 0x0F, 0xCD];
    const QUERY_VOLUME: &[u8] = &[0xAA, 0x26, 0x00, 0xD0];
    const VOLUME_20: &[u8] = &[0xAA, 0x26, 0x01, 0x14, 0xE5];
    const VOLUME_UP: &[u8] = &[0xAA, 0x14, 0x00, 0xBE];
    const QUERY_CURRENT_TRACK: &[u8] = &[0xAA, 0x0D, 0x00, 0xB7];
    const CURRENT_TRACK_7: &[u8] = &[0xAA, 0x0D, 0x02, 0x00, 0x07, 0xC0];

    fn player(mock: MockTransport) -> DyPlayer {
        DyPlayer::new(Box::new(mock), Duration::from_millis(50), 16)
    }

    /// Wraps a mock: `close()` yields to the scheduler, and `send()` can be
    /// made to time out without touching the inner mock.
    struct Sluggish {
        inner: MockTransport,
        send_times_out: bool,
    }

    #[async_trait::async_trait]
    impl Transport for Sluggish {
        async fn send(&mut self, data: &[u8]) -> Result<()> {
            if self.send_times_out {
                return Err(Error::Timeout);
            }
            self.inner.send(data).await
        }

        async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
            self.inner.receive(buf, timeout).await
        }

        async fn clear_input(&mut self) -> Result<()> {
            self.inner.clear_input().await
        }

        async fn close(&mut self) -> Result<()> {
            tokio::task::yield_now().await;
            self.inner.close().await
        }

        fn is_connected(&self) -> bool {
            self.inner.is_connected()
        }
    }

    fn sluggish(send_times_out: bool) -> DyPlayer {
        let transport = Sluggish {
            inner: MockTransport::new(),
            send_times_out,
        };
        DyPlayer::new(Box::new(transport), Duration::from_millis(50), 16)
    }

    // ---------------------------------------------------------------
    // Parameter validation
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn out_of_range_volume_writes_nothing() {
        // With no expectations loaded, any write would fail and disconnect.
        let p = player(MockTransport::new());

        assert!(matches!(p.set_volume(31).await, Err(Error::InvalidParameter(_))));
        assert!(matches!(p.set_volume(-1).await, Err(Error::InvalidParameter(_))));

        let state = p.state().await;
        assert_eq!(state.connection(), ConnectionState::Uninitialized);
        assert_eq!(state.volume(), &Tracked::Unknown);
    }

    #[tokio::test]
    async fn invalid_path_and_track_write_nothing() {
        let p = player(MockTransport::new());

        assert!(matches!(
            p.play_path(Device::Sd, "no-leading-slash.mp3").await,
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(p.play_track(0).await, Err(Error::InvalidParameter(_))));
        assert!(matches!(
            p.combination_play(&["01", "xyz"]).await,
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            p.combination_play(&[]).await,
            Err(Error::InvalidParameter(_))
        ));

        assert_eq!(p.state().await.connection(), ConnectionState::Uninitialized);
    }

    // ---------------------------------------------------------------
    // Control and query round trips
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn set_volume_then_status_playing() {
        let mut mock = MockTransport::new();
        mock.expect_no_reply(SET_VOLUME_15);
        mock.expect(QUERY_STATE, STATE_PLAYING);
        let p = player(mock);

        p.set_volume(15).await.unwrap();
        let state = p.state().await;
        assert_eq!(state.volume(), &Tracked::Optimistic(Volume::new(15).unwrap()));
        assert_eq!(state.connection(), ConnectionState::Connected);

        assert_eq!(p.query_play_state().await.unwrap(), PlayState::Playing);
        let state = p.state().await;
        assert_eq!(state.play_state(), &Tracked::Confirmed(PlayState::Playing));
        assert_eq!(state.volume(), &Tracked::Optimistic(Volume::new(15).unwrap()));
    }

    #[tokio::test]
    async fn control_commands_are_optimistic() {
        let mut mock = MockTransport::new();
        mock.expect_no_reply(PLAY);
        mock.expect_no_reply(PAUSE);
        mock.expect_no_reply(&Command::SetEqualizer(Equalizer::Pop).encode().unwrap());
        mock.expect_no_reply(&Command::SetPlayMode(PlayMode::RepeatAll).encode().unwrap());
        let p = player(mock);

        p.play().await.unwrap();
        assert_eq!(p.state().await.play_state().get(), Some(PlayState::Playing));
        p.pause().await.unwrap();
        p.set_equalizer(Equalizer::Pop).await.unwrap();
        p.set_play_mode(PlayMode::RepeatAll).await.unwrap();

        let state = p.state().await;
        assert_eq!(state.play_state(), &Tracked::Optimistic(PlayState::Paused));
        assert_eq!(state.equalizer(), &Tracked::Optimistic(Equalizer::Pop));
        assert_eq!(state.play_mode(), &Tracked::Optimistic(PlayMode::RepeatAll));
    }

    #[tokio::test]
    async fn play_path_records_track() {
        let cmd = Command::PlayPath {
            device: Device::Sd,
            path: TrackPath::new("/00001.mp3").unwrap(),
        };
        let mut mock = MockTransport::new();
        mock.expect_no_reply(&cmd.encode().unwrap());
        let p = player(mock);

        p.play_path(Device::Sd, "/00001.mp3").await.unwrap();
        assert_eq!(
            p.state().await.track().value(),
            Some(&TrackRef::Path {
                device: Device::Sd,
                path: "/00001.mp3".into()
            })
        );
    }

    #[tokio::test]
    async fn volume_up_follows_confirmed_volume() {
        let mut mock = MockTransport::new();
        mock.expect(QUERY_VOLUME, VOLUME_20);
        mock.expect_no_reply(VOLUME_UP);
        let p = player(mock);

        assert_eq!(p.query_volume().await.unwrap().level(), 20);
        p.volume_up().await.unwrap();
        assert_eq!(
            p.state().await.volume(),
            &Tracked::Optimistic(Volume::new(21).unwrap())
        );
    }

    #[tokio::test]
    async fn track_queries() {
        let mut mock = MockTransport::new();
        mock.expect(&[0xAA, 0x0C, 0x00, 0xB6], &[0xAA, 0x0C, 0x02, 0x01, 0x2C, 0xE5]);
        mock.expect(QUERY_CURRENT_TRACK, CURRENT_TRACK_7);
        mock.expect(&[0xAA, 0x0A, 0x00, 0xB4], &[0xAA, 0x0A, 0x01, 0xFF, 0xB4]);
        let p = player(mock);

        assert_eq!(p.query_track_count().await.unwrap(), 300);
        assert_eq!(p.query_current_track().await.unwrap(), 7);
        assert_eq!(p.query_playing_device().await.unwrap(), None);

        let state = p.state().await;
        assert_eq!(state.track(), &Tracked::Confirmed(TrackRef::Index(7)));
        assert_eq!(state.playing_device(), &Tracked::Confirmed(None));
    }

    #[tokio::test]
    async fn refresh_confirms_state_and_track() {
        let mut mock = MockTransport::new();
        mock.expect(QUERY_STATE, STATE_PLAYING);
        mock.expect(QUERY_CURRENT_TRACK, CURRENT_TRACK_7);
        let p = player(mock);

        let state = p.refresh().await.unwrap();
        assert_eq!(state.play_state(), &Tracked::Confirmed(PlayState::Playing));
        assert_eq!(state.track(), &Tracked::Confirmed(TrackRef::Index(7)));
    }

    #[tokio::test]
    async fn send_command_returns_raw_response() {
        let mut mock = MockTransport::new();
        mock.expect(QUERY_STATE, STATE_STOPPED);
        mock.expect_no_reply(PLAY);
        let p = player(mock);

        assert_eq!(
            p.send_command(Command::QueryPlayState).await.unwrap(),
            Some(Response::PlayState(PlayState::Stopped))
        );
        assert_eq!(p.send_command(Command::Play).await.unwrap(), None);
    }

    // ---------------------------------------------------------------
    // Bad replies
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn truncated_reply() {
        let mut mock = MockTransport::new();
        mock.expect(QUERY_STATE, &STATE_PLAYING[..4]);
        let p = player(mock);

        let err = p.query_play_state().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::Frame(FrameError::Truncated {
                needed: 5,
                actual: 4
            }))
        ));
        // Partial replies do not break the link.
        let state = p.state().await;
        assert_eq!(state.connection(), ConnectionState::Connected);
        assert_eq!(state.play_state(), &Tracked::Unknown);
    }

    #[tokio::test]
    async fn silence_is_a_timeout() {
        let mut mock = MockTransport::new();
        mock.expect_no_reply(QUERY_VOLUME);
        mock.expect_no_reply(PLAY);
        let p = player(mock);

        assert!(matches!(p.query_volume().await, Err(Error::Timeout)));
        assert_eq!(p.state().await.connection(), ConnectionState::Connected);
        p.play().await.unwrap();
    }

    #[tokio::test]
    async fn corrupted_checksum() {
        let mut mock = MockTransport::new();
        mock.expect(QUERY_STATE, &[0xAA, 0x01, 0x01, 0x01, 0xAE]);
        let p = player(mock);

        assert!(matches!(
            p.query_play_state().await,
            Err(Error::Protocol(ProtocolError::Frame(
                FrameError::ChecksumMismatch { .. }
            )))
        ));
    }

    #[tokio::test]
    async fn bad_start_byte() {
        let mut mock = MockTransport::new();
        mock.expect(QUERY_STATE, &[0x55, 0x01, 0x01, 0x01, 0xAD]);
        let p = player(mock);

        assert!(matches!(
            p.query_play_state().await,
            Err(Error::Protocol(ProtocolError::Frame(FrameError::BadStart(0x55))))
        ));
    }

    #[tokio::test]
    async fn reply_to_another_query() {
        let mut mock = MockTransport::new();
        mock.expect(QUERY_STATE, VOLUME_20);
        let p = player(mock);

        assert!(matches!(
            p.query_play_state().await,
            Err(Error::Protocol(ProtocolError::UnexpectedResponse {
                expected: 0x01,
                actual: 0x26
            }))
        ));
        assert_eq!(p.state().await.volume(), &Tracked::Unknown);
    }

    #[tokio::test]
    async fn oversized_length_is_capped() {
        let mut mock = MockTransport::new();
        mock.expect(QUERY_STATE, &[0xAA, 0x01, 0x20]);
        let p = player(mock);

        assert!(matches!(
            p.query_play_state().await,
            Err(Error::Protocol(ProtocolError::Frame(FrameError::Truncated {
                needed: 36,
                actual: 3
            })))
        ));
    }

    // ---------------------------------------------------------------
    // Connection state
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn failed_write_disconnects_and_keeps_state() {
        let mut mock = MockTransport::new();
        mock.fail_next_send();
        let p = player(mock);

        assert!(matches!(p.play().await, Err(Error::ConnectionLost)));
        let state = p.state().await;
        assert_eq!(state.connection(), ConnectionState::Disconnected);
        assert_eq!(state.play_state(), &Tracked::Unknown);

        assert!(matches!(p.pause().await, Err(Error::NotConnected)));
        assert!(matches!(p.query_play_state().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn reconnect_resets_playback_and_requeries() {
        let mut first = MockTransport::new();
        first.expect_no_reply(SET_VOLUME_15);
        first.expect_no_reply(PLAY);
        let p = player(first);

        p.set_volume(15).await.unwrap();
        // The second expectation is for PLAY, so this mismatched write fails.
        assert!(p.pause().await.is_err());
        assert!(p.state().await.is_disconnected());

        let mut second = MockTransport::new();
        second.expect(QUERY_STATE, STATE_STOPPED);
        second.expect_no_reply(PLAY);

        assert_eq!(p.reconnect(Box::new(second)).await.unwrap(), PlayState::Stopped);
        let state = p.state().await;
        assert_eq!(state.connection(), ConnectionState::Connected);
        assert_eq!(state.play_state(), &Tracked::Confirmed(PlayState::Stopped));
        assert_eq!(state.volume(), &Tracked::Unknown);

        p.play().await.unwrap();
    }

    #[tokio::test]
    async fn reconnect_queries_state_before_waiting_commands() {
        let p = sluggish(false);

        let mut second = MockTransport::new();
        second.expect(QUERY_STATE, STATE_STOPPED);
        second.expect_no_reply(PLAY);

        // play() queues on the lock while close() yields; it must not reach
        // the new link ahead of the status query.
        let (state, played) = tokio::join!(p.reconnect(Box::new(second)), p.play());
        assert_eq!(state.unwrap(), PlayState::Stopped);
        played.unwrap();

        let state = p.state().await;
        assert_eq!(state.connection(), ConnectionState::Connected);
        assert_eq!(state.play_state(), &Tracked::Optimistic(PlayState::Playing));
    }

    #[tokio::test]
    async fn any_write_failure_disconnects() {
        let p = sluggish(true);

        assert!(matches!(p.play().await, Err(Error::Timeout)));
        assert!(p.state().await.is_disconnected());
        assert!(matches!(p.pause().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn query_helper_rejects_control_commands() {
        let p = player(MockTransport::new());

        let result = p.query(Command::Play, |_| Some(())).await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        assert_eq!(p.state().await.connection(), ConnectionState::Uninitialized);
    }

    #[tokio::test]
    async fn reconnect_keeps_transport_when_query_fails() {
        let mut first = MockTransport::new();
        first.fail_next_send();
        let p = player(first);
        assert!(p.play().await.is_err());

        let mut second = MockTransport::new();
        second.expect_no_reply(QUERY_STATE);
        second.expect_no_reply(PLAY);

        assert!(matches!(p.reconnect(Box::new(second)).await, Err(Error::Timeout)));
        p.play().await.unwrap();
        assert_eq!(p.state().await.connection(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn close_disconnects() {
        let p = player(MockTransport::new());
        p.close().await.unwrap();

        assert!(p.state().await.is_disconnected());
        assert!(matches!(p.play().await, Err(Error::NotConnected)));
    }
}
