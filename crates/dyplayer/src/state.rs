//! Last-known module state.
//!
//! The module pushes nothing on its own, so everything the driver knows
//! comes from two sources: what it last told the module to do (optimistic)
//! and what the module last answered to a query (confirmed). [`Tracked`]
//! keeps the two apart so callers can tell a guess from a fact.

use dyplayer_core::{Device, Equalizer, PlayMode, PlayState, TrackRef, Volume};

use crate::commands::Command;
use crate::response::Response;

/// A field value together with how it was learned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Tracked<T> {
    /// Nothing is known.
    #[default]
    Unknown,
    /// Implied by a command that was written successfully.
    Optimistic(T),
    /// Reported by the module.
    Confirmed(T),
}

impl<T> Tracked<T> {
    /// The value, however it was learned.
    pub fn value(&self) -> Option<&T> {
        match self {
            Tracked::Unknown => None,
            Tracked::Optimistic(v) | Tracked::Confirmed(v) => Some(v),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Tracked::Confirmed(_))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Tracked::Unknown)
    }
}

impl<T: Copy> Tracked<T> {
    /// Copy of the value, however it was learned.
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

/// Link status as seen by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Transport installed, nothing written yet.
    #[default]
    Uninitialized,
    /// At least one write succeeded and none has failed since.
    Connected,
    /// A transport operation failed. Only [`reconnect`] leaves this state.
    ///
    /// [`reconnect`]: crate::DyPlayer::reconnect
    Disconnected,
}

/// Snapshot of everything the driver believes about the module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceState {
    connection: ConnectionState,
    play_state: Tracked<PlayState>,
    volume: Tracked<Volume>,
    equalizer: Tracked<Equalizer>,
    play_mode: Tracked<PlayMode>,
    playing_device: Tracked<Option<Device>>,
    track: Tracked<TrackRef>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_disconnected(&self) -> bool {
        self.connection == ConnectionState::Disconnected
    }

    pub fn play_state(&self) -> &Tracked<PlayState> {
        &self.play_state
    }

    pub fn volume(&self) -> &Tracked<Volume> {
        &self.volume
    }

    pub fn equalizer(&self) -> &Tracked<Equalizer> {
        &self.equalizer
    }

    /// Play mode. The module has no query for it, so it is never confirmed.
    pub fn play_mode(&self) -> &Tracked<PlayMode> {
        &self.play_mode
    }

    /// Device playback comes from; `Some(None)` means the module reported
    /// none.
    pub fn playing_device(&self) -> &Tracked<Option<Device>> {
        &self.playing_device
    }

    pub fn track(&self) -> &Tracked<TrackRef> {
        &self.track
    }

    pub(crate) fn mark_connected(&mut self) {
        if self.connection == ConnectionState::Uninitialized {
            self.connection = ConnectionState::Connected;
        }
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.connection = ConnectionState::Disconnected;
    }

    pub(crate) fn mark_uninitialized(&mut self) {
        self.connection = ConnectionState::Uninitialized;
    }

    /// Record a value reported by the module. Only the field the reply is
    /// about changes.
    pub fn apply(&mut self, response: &Response) {
        match response {
            Response::PlayState(s) => self.play_state = Tracked::Confirmed(*s),
            Response::Volume(v) => self.volume = Tracked::Confirmed(*v),
            Response::Equalizer(eq) => self.equalizer = Tracked::Confirmed(*eq),
            Response::PlayingDevice(d) => self.playing_device = Tracked::Confirmed(*d),
            Response::CurrentTrack(n) => self.track = Tracked::Confirmed(TrackRef::Index(*n)),
            // Informational only.
            Response::OnlineDevices(_)
            | Response::TrackCount(_)
            | Response::FolderFirstTrack(_)
            | Response::FolderTrackCount(_) => {}
        }
    }

    /// Record what a successfully written command implies.
    pub fn mark_optimistic(&mut self, command: &Command) {
        match command {
            Command::Play => self.play_state = Tracked::Optimistic(PlayState::Playing),
            Command::Pause => self.play_state = Tracked::Optimistic(PlayState::Paused),
            Command::Stop => self.play_state = Tracked::Optimistic(PlayState::Stopped),
            Command::PlayTrack(n) => {
                self.play_state = Tracked::Optimistic(PlayState::Playing);
                self.track = Tracked::Optimistic(TrackRef::Index(*n));
            }
            Command::PlayPath { device, path } => {
                self.play_state = Tracked::Optimistic(PlayState::Playing);
                self.playing_device = Tracked::Optimistic(Some(*device));
                self.track = Tracked::Optimistic(TrackRef::Path {
                    device: *device,
                    path: path.as_str().to_string(),
                });
            }
            Command::Next | Command::Previous | Command::PreviousFolder(_) => {
                self.play_state = Tracked::Optimistic(PlayState::Playing);
                self.track = Tracked::Unknown;
            }
            Command::SelectTrack(n) => self.track = Tracked::Optimistic(TrackRef::Index(*n)),
            Command::SetVolume(v) => self.volume = Tracked::Optimistic(*v),
            Command::VolumeUp => self.step_volume(Volume::step_up),
            Command::VolumeDown => self.step_volume(Volume::step_down),
            Command::SetEqualizer(eq) => self.equalizer = Tracked::Optimistic(*eq),
            Command::SetPlayMode(mode) => self.play_mode = Tracked::Optimistic(*mode),
            Command::SetPlayingDevice(d) => self.playing_device = Tracked::Optimistic(Some(*d)),
            _ => {}
        }
    }

    /// Forget everything learned about playback. The connection state is
    /// left alone.
    pub fn reset_playback(&mut self) {
        *self = DeviceState {
            connection: self.connection,
            ..DeviceState::default()
        };
    }

    fn step_volume(&mut self, step: fn(Volume) -> Volume) {
        if let Some(v) = self.volume.get() {
            self.volume = Tracked::Optimistic(step(v));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::TrackPath;
    use dyplayer_core::{FolderEntry, OnlineDevices};

    fn volume(level: i32) -> Volume {
        Volume::new(level).unwrap()
    }

    #[test]
    fn starts_unknown_and_uninitialized() {
        let state = DeviceState::new();
        assert_eq!(state.connection(), ConnectionState::Uninitialized);
        assert_eq!(state.play_state(), &Tracked::Unknown);
        assert_eq!(state.volume(), &Tracked::Unknown);
        assert!(!state.track().is_known());
    }

    #[test]
    fn apply_touches_only_its_field() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::SetVolume(volume(15)));
        state.mark_optimistic(&Command::SetEqualizer(Equalizer::Rock));
        let before = state.clone();

        state.apply(&Response::PlayState(PlayState::Playing));

        assert_eq!(state.play_state(), &Tracked::Confirmed(PlayState::Playing));
        assert_eq!(state.volume(), before.volume());
        assert_eq!(state.equalizer(), before.equalizer());
        assert_eq!(state.play_mode(), before.play_mode());
        assert_eq!(state.track(), before.track());
    }

    #[test]
    fn volume_reply_leaves_other_fields_alone() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::SetEqualizer(Equalizer::Rock));
        state.mark_optimistic(&Command::SetPlayMode(PlayMode::Random));
        state.mark_optimistic(&Command::PlayTrack(3));
        let before = state.clone();

        state.apply(&Response::Volume(volume(12)));

        assert_eq!(state.volume(), &Tracked::Confirmed(volume(12)));
        assert_eq!(state.equalizer(), before.equalizer());
        assert_eq!(state.play_mode(), before.play_mode());
        assert_eq!(state.track(), before.track());
        assert_eq!(state.play_state(), before.play_state());
        assert_eq!(state.connection(), before.connection());
    }

    #[test]
    fn informational_replies_change_nothing() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::Play);
        let before = state.clone();

        state.apply(&Response::TrackCount(12));
        state.apply(&Response::OnlineDevices(OnlineDevices::from_bits(0b010)));
        state.apply(&Response::FolderTrackCount(3));

        assert_eq!(state, before);
    }

    #[test]
    fn confirmed_replaces_optimistic() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::SetVolume(volume(10)));
        assert_eq!(state.volume(), &Tracked::Optimistic(volume(10)));

        state.apply(&Response::Volume(volume(12)));
        assert_eq!(state.volume(), &Tracked::Confirmed(volume(12)));
        assert!(state.volume().is_confirmed());
    }

    #[test]
    fn transport_commands_imply_play_state() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::Play);
        assert_eq!(state.play_state().get(), Some(PlayState::Playing));
        state.mark_optimistic(&Command::Pause);
        assert_eq!(state.play_state().get(), Some(PlayState::Paused));
        state.mark_optimistic(&Command::Stop);
        assert_eq!(state.play_state().get(), Some(PlayState::Stopped));
    }

    #[test]
    fn play_track_and_path_set_track() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::PlayTrack(3));
        assert_eq!(state.track(), &Tracked::Optimistic(TrackRef::Index(3)));
        assert_eq!(state.play_state().get(), Some(PlayState::Playing));

        state.mark_optimistic(&Command::PlayPath {
            device: Device::Flash,
            path: TrackPath::new("/ADS/00002.MP3").unwrap(),
        });
        assert_eq!(
            state.track().value(),
            Some(&TrackRef::Path {
                device: Device::Flash,
                path: "/ADS/00002.MP3".into()
            })
        );
        assert_eq!(state.playing_device().get(), Some(Some(Device::Flash)));
    }

    #[test]
    fn skipping_forgets_track() {
        let mut state = DeviceState::new();
        state.apply(&Response::CurrentTrack(4));
        assert_eq!(state.track(), &Tracked::Confirmed(TrackRef::Index(4)));

        state.mark_optimistic(&Command::Next);
        assert_eq!(state.track(), &Tracked::Unknown);

        state.apply(&Response::CurrentTrack(5));
        state.mark_optimistic(&Command::PreviousFolder(FolderEntry::FirstTrack));
        assert_eq!(state.track(), &Tracked::Unknown);
    }

    #[test]
    fn select_track_does_not_start_playback() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::Stop);
        state.mark_optimistic(&Command::SelectTrack(9));
        assert_eq!(state.track().value(), Some(&TrackRef::Index(9)));
        assert_eq!(state.play_state().get(), Some(PlayState::Stopped));
    }

    #[test]
    fn volume_steps_need_a_known_volume() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::VolumeUp);
        assert_eq!(state.volume(), &Tracked::Unknown);

        state.apply(&Response::Volume(volume(30)));
        state.mark_optimistic(&Command::VolumeUp);
        assert_eq!(state.volume(), &Tracked::Optimistic(volume(30)));

        state.mark_optimistic(&Command::VolumeDown);
        assert_eq!(state.volume(), &Tracked::Optimistic(volume(29)));

        state.mark_optimistic(&Command::SetVolume(Volume::MIN));
        state.mark_optimistic(&Command::VolumeDown);
        assert_eq!(state.volume().get(), Some(Volume::MIN));
    }

    #[test]
    fn queries_imply_nothing() {
        let mut state = DeviceState::new();
        state.mark_optimistic(&Command::QueryPlayState);
        state.mark_optimistic(&Command::QueryVolume);
        state.mark_optimistic(&Command::StopInterlude);
        assert_eq!(state, DeviceState::new());
    }

    #[test]
    fn reset_playback_keeps_connection() {
        let mut state = DeviceState::new();
        state.mark_connected();
        state.mark_optimistic(&Command::PlayTrack(1));
        state.mark_optimistic(&Command::SetPlayMode(PlayMode::Random));

        state.reset_playback();

        assert_eq!(state.connection(), ConnectionState::Connected);
        assert_eq!(state.play_state(), &Tracked::Unknown);
        assert_eq!(state.play_mode(), &Tracked::Unknown);
        assert_eq!(state.track(), &Tracked::Unknown);
    }

    #[test]
    fn connection_transitions() {
        let mut state = DeviceState::new();
        state.mark_connected();
        assert_eq!(state.connection(), ConnectionState::Connected);

        state.mark_disconnected();
        state.mark_connected();
        assert!(state.is_disconnected());

        state.mark_uninitialized();
        assert_eq!(state.connection(), ConnectionState::Uninitialized);
    }
}
